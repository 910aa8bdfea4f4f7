use rdfbridge::Pattern;
use test_case::test_case;

// ========== Round trips ==========

#[test_case("http://example.org/paper/@@Papers.id@@")]
#[test_case("@@A.x@@")]
#[test_case("@@A.x@@-@@A.y@@")]
#[test_case("pre @@T.a@@ mid @@T.b@@ post")]
#[test_case("urn:isbn:@@Books.isbn@@")]
fn parse_format_round_trip(template: &str) -> anyhow::Result<()> {
    let parsed = Pattern::parse(template)?;
    let reparsed = Pattern::parse(&parsed.to_string())?;
    assert_eq!(parsed, reparsed);
    Ok(())
}

#[test]
fn whitespace_inside_placeholders_is_not_structural() {
    let spaced = Pattern::parse("x/@@ T.a @@").unwrap();
    let tight = Pattern::parse("x/@@T.a@@").unwrap();
    assert_eq!(spaced.columns(), tight.columns());
    assert_eq!(spaced.literals(), tight.literals());
}

// ========== Matching ==========

#[test]
fn match_and_decompose_agree() {
    let p = Pattern::parse("paper/@@Papers.id@@/section/@@Papers.sec@@").unwrap();
    assert!(p.matches("paper/4/section/2"));
    assert!(!p.matches("paper/4"));
    assert!(!p.matches("article/4/section/2"));

    let parts = p.decompose("paper/4/section/2").unwrap();
    assert_eq!(parts[0].1, "4");
    assert_eq!(parts[1].1, "2");
}

#[test]
fn empty_column_values_match_empty_segments() {
    let p = Pattern::parse("x@@T.a@@y").unwrap();
    assert_eq!(p.decompose("xy").unwrap()[0].1, "");
}

#[test]
fn first_match_wins_on_repeated_delimiters() {
    // The value "a-b-c" against "@@T.x@@-@@T.y@@": the first `-` closes
    // the first column; no backtracking is attempted.
    let p = Pattern::parse("@@T.x@@-@@T.y@@").unwrap();
    let parts = p.decompose("a-b-c").unwrap();
    assert_eq!(parts[0].1, "a");
    assert_eq!(parts[1].1, "b-c");
}

#[test]
fn adjacent_columns_take_the_first_match() {
    let p = Pattern::parse("@@T.a@@@@T.b@@").unwrap();
    let parts = p.decompose("whole").unwrap();
    assert_eq!(parts[0].1, "");
    assert_eq!(parts[1].1, "whole");
}

// ========== Structural cross-checks ==========

#[test]
fn equal_skeletons_align_columns_positionally() {
    let p = Pattern::parse("v/@@T0_A.x@@/w/@@T0_A.y@@").unwrap();
    let q = Pattern::parse("v/@@T1_B.m@@/w/@@T1_B.n@@").unwrap();
    let pairs = p.column_equalities_with(&q).unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0.qualified_name(), "T0_A.x");
    assert_eq!(pairs[0].1.qualified_name(), "T1_B.m");
}

#[test]
fn skeletons_differing_in_any_literal_are_disjoint() {
    let p = Pattern::parse("v/@@A.x@@/w").unwrap();
    let q = Pattern::parse("v/@@B.x@@/z").unwrap();
    assert!(p.column_equalities_with(&q).is_none());
}
