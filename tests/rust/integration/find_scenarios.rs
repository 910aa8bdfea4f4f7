//! Single-pattern matching end to end.

use std::sync::Arc;

use futures_util::StreamExt;
use oxrdf::{NamedNode, Variable};
use rdfbridge::algebra::Attribute;
use rdfbridge::mapping::BridgeBuilder;
use rdfbridge::node_mapper::{ColumnSource, PatternSource};
use rdfbridge::query_planner::{PatternNode, TriplePattern};
use rdfbridge::{GraphMapping, NodeMaker, QueryOptions, SqlValue};

use super::support::{fake_database, FakeConnection};

fn attr(q: &str) -> Attribute {
    Attribute::parse(q).unwrap()
}

fn dc(name: &str) -> NamedNode {
    NamedNode::new(format!("http://purl.org/dc/elements/1.1/{}", name)).unwrap()
}

fn title_mapping(connection: &Arc<FakeConnection>) -> GraphMapping {
    let db = fake_database(Arc::clone(connection));
    let bridge = BridgeBuilder::new(db)
        .subject(NodeMaker::uri(
            Arc::new(PatternSource::parse("http://example.org/paper/@@Papers.id@@").unwrap()),
            true,
        ))
        .predicate(NodeMaker::fixed(dc("title")))
        .object(NodeMaker::plain_literal(
            Arc::new(ColumnSource::new(attr("Papers.title"))),
            true,
        ))
        .build()
        .unwrap();
    GraphMapping::new(vec![bridge])
}

/// Scenario A: `(?x dc:title ?t)` compiles to one statement over Papers;
/// the row (1, "Foo") decodes to exactly one triple.
#[tokio::test]
async fn scenario_a_row_decodes_to_one_triple() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![vec![SqlValue::Integer(1), SqlValue::Text("Foo".into())]],
    );
    let mapping = title_mapping(&connection);
    let pattern = TriplePattern::new(
        Variable::new("x").unwrap(),
        dc("title"),
        Variable::new("t").unwrap(),
    );
    let stream = mapping.find(&pattern, QueryOptions::default()).unwrap();
    let results: Vec<_> = stream.collect().await;

    assert_eq!(connection.executed().len(), 1);
    assert_eq!(
        connection.executed()[0],
        "SELECT DISTINCT Papers.id, Papers.title FROM Papers"
    );
    assert_eq!(results.len(), 1);
    let triple = results[0].as_ref().unwrap();
    assert_eq!(
        triple.to_string(),
        "<http://example.org/paper/1> <http://purl.org/dc/elements/1.1/title> \"Foo\""
    );
}

/// Scenario C: no bridge fits the requested predicate/object; zero
/// statements reach the database and the result is empty, not an error.
#[tokio::test]
async fn scenario_c_zero_candidates_touch_no_database() {
    let connection = FakeConnection::new();
    let mapping = title_mapping(&connection);
    let pattern = TriplePattern::new(
        PatternNode::Any,
        NamedNode::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap(),
        NamedNode::new("http://example.org/Foo").unwrap(),
    );
    let stream = mapping.find(&pattern, QueryOptions::default()).unwrap();
    let results: Vec<_> = stream.collect().await;
    assert!(results.is_empty());
    assert!(connection.executed().is_empty());
}

/// Distinct rows can decode to the same triple; the duplicate filter on
/// the decoded form suppresses the repeat.
#[tokio::test]
async fn decoded_duplicates_are_suppressed() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![
            vec![SqlValue::Integer(1), SqlValue::Text("Foo".into())],
            vec![SqlValue::Integer(1), SqlValue::Text("Foo".into())],
            vec![SqlValue::Integer(2), SqlValue::Text("Bar".into())],
        ],
    );
    let mapping = title_mapping(&connection);
    let pattern = TriplePattern::new(PatternNode::Any, dc("title"), PatternNode::Any);
    let mut stream = mapping.find(&pattern, QueryOptions::default()).unwrap();
    let mut delivered = Vec::new();
    while let Some(item) = stream.next().await {
        delivered.push(item.unwrap());
    }
    assert_eq!(delivered.len(), 2);
    let metrics = stream.metrics();
    assert_eq!(metrics.rows, 3);
    assert_eq!(metrics.delivered, 2);
    assert_eq!(metrics.duplicates, 1);
}

/// NULL in a required column drops the row's triple, never a partial term.
#[tokio::test]
async fn null_columns_produce_no_triples() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![
            vec![SqlValue::Integer(1), SqlValue::Null],
            vec![SqlValue::Integer(2), SqlValue::Text("Bar".into())],
        ],
    );
    let mapping = title_mapping(&connection);
    let pattern = TriplePattern::new(PatternNode::Any, dc("title"), PatternNode::Any);
    let results: Vec<_> = mapping
        .find(&pattern, QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    assert!(results[0]
        .as_ref()
        .unwrap()
        .to_string()
        .contains("paper/2"));
}

/// The request limit caps delivery and still closes the cursor.
#[tokio::test]
async fn limit_caps_delivery() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![
            vec![SqlValue::Integer(1), SqlValue::Text("a".into())],
            vec![SqlValue::Integer(2), SqlValue::Text("b".into())],
            vec![SqlValue::Integer(3), SqlValue::Text("c".into())],
        ],
    );
    let mapping = title_mapping(&connection);
    let pattern = TriplePattern::new(PatternNode::Any, dc("title"), PatternNode::Any);
    let options = QueryOptions {
        limit: Some(2),
        ..QueryOptions::default()
    };
    let results: Vec<_> = mapping.find(&pattern, options).unwrap().collect().await;
    assert_eq!(results.len(), 2);
    assert_eq!(connection.opened(), 1);
    assert_eq!(connection.closed(), 1);
}

/// A join whose target table only supplies join columns is eliminated;
/// the statement scans a single table and the decoded triples read the
/// kept side.
#[tokio::test]
async fn eliminated_join_still_decodes_the_same_triples() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![
            vec![SqlValue::Integer(7), SqlValue::Integer(1)],
            vec![SqlValue::Integer(8), SqlValue::Integer(2)],
        ],
    );
    let db = fake_database(Arc::clone(&connection));
    let bridge = BridgeBuilder::new(db)
        .join(vec![(attr("Papers.author"), attr("Authors.id"))])
        .unwrap()
        .subject(NodeMaker::uri(
            Arc::new(PatternSource::parse("http://example.org/paper/@@Papers.id@@").unwrap()),
            true,
        ))
        .predicate(NodeMaker::fixed(dc("creator")))
        .object(NodeMaker::uri(
            Arc::new(PatternSource::parse("http://example.org/author/@@Authors.id@@").unwrap()),
            true,
        ))
        .build()
        .unwrap();
    let mapping = GraphMapping::new(vec![bridge]);
    let pattern = TriplePattern::new(PatternNode::Any, dc("creator"), PatternNode::Any);
    let results: Vec<_> = mapping
        .find(&pattern, QueryOptions::default())
        .unwrap()
        .collect()
        .await;

    let sql = &connection.executed()[0];
    assert!(!sql.contains("Authors"), "join survived: {}", sql);
    // Projections sort as (Papers.author, Papers.id); row (7, 1) is
    // author 7, paper 1.
    let texts: Vec<String> = results
        .iter()
        .map(|r| r.as_ref().unwrap().to_string())
        .collect();
    assert_eq!(
        texts,
        vec![
            "<http://example.org/paper/1> <http://purl.org/dc/elements/1.1/creator> <http://example.org/author/7>",
            "<http://example.org/paper/2> <http://purl.org/dc/elements/1.1/creator> <http://example.org/author/8>",
        ]
    );
}
