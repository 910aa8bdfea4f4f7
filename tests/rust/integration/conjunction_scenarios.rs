//! Conjunctions: shared variables, constraint propagation, post-join
//! filters.

use std::sync::Arc;

use futures_util::StreamExt;
use oxrdf::{NamedNode, Term, Variable};
use rdfbridge::algebra::Attribute;
use rdfbridge::mapping::BridgeBuilder;
use rdfbridge::node_mapper::{ColumnSource, PatternSource};
use rdfbridge::query_planner::{Binding, BindingFilter, GraphPattern, TriplePattern};
use rdfbridge::{GraphMapping, NodeMaker, QueryOptions, SqlValue};

use super::support::{fake_database, FakeConnection};

fn attr(q: &str) -> Attribute {
    Attribute::parse(q).unwrap()
}

fn dc(name: &str) -> NamedNode {
    NamedNode::new(format!("http://purl.org/dc/elements/1.1/{}", name)).unwrap()
}

fn foaf_name() -> NamedNode {
    NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap()
}

fn papers_authors_mapping(connection: &Arc<FakeConnection>) -> GraphMapping {
    let db = fake_database(Arc::clone(connection));
    let title = BridgeBuilder::new(Arc::clone(&db))
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
    let creator = BridgeBuilder::new(Arc::clone(&db))
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
    let name = BridgeBuilder::new(db)
        .subject(NodeMaker::uri(
            Arc::new(PatternSource::parse("http://example.org/author/@@Authors.id@@").unwrap()),
            true,
        ))
        .predicate(NodeMaker::fixed(foaf_name()))
        .object(NodeMaker::plain_literal(
            Arc::new(ColumnSource::new(attr("Authors.name"))),
            true,
        ))
        .build()
        .unwrap();
    GraphMapping::new(vec![title, creator, name])
}

/// Scenario B: `(?x dc:creator ?y)` and `(?y foaf:name ?n)` compile into
/// ONE joined statement and decode into consistent bindings.
#[tokio::test]
async fn scenario_b_one_joined_statement() {
    // Projections sort as: T0_Papers.author, T0_Papers.id,
    // T1_Authors.id, T1_Authors.name.
    let connection = FakeConnection::new().serve(
        "T1_Authors",
        vec![
            vec![
                SqlValue::Integer(7),
                SqlValue::Integer(1),
                SqlValue::Integer(7),
                SqlValue::Text("Smith".into()),
            ],
            vec![
                SqlValue::Integer(8),
                SqlValue::Integer(2),
                SqlValue::Integer(8),
                SqlValue::Text("Jones".into()),
            ],
        ],
    );
    let mapping = papers_authors_mapping(&connection);
    let x = Variable::new("x").unwrap();
    let y = Variable::new("y").unwrap();
    let n = Variable::new("n").unwrap();
    let bgp = GraphPattern::new(vec![
        TriplePattern::new(x.clone(), dc("creator"), y.clone()),
        TriplePattern::new(y.clone(), foaf_name(), n.clone()),
    ]);
    let results: Vec<_> = mapping
        .query(&bgp, QueryOptions::default())
        .unwrap()
        .collect()
        .await;

    // One statement, not two.
    assert_eq!(connection.executed().len(), 1);
    let sql = &connection.executed()[0];
    assert!(
        sql.contains("T0_Papers.author = T1_Authors.id"),
        "missing shared-variable equality: {}",
        sql
    );

    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    assert_eq!(
        first.get(&x),
        Some(&Term::NamedNode(
            NamedNode::new("http://example.org/paper/1").unwrap()
        ))
    );
    assert_eq!(
        first.get(&y),
        Some(&Term::NamedNode(
            NamedNode::new("http://example.org/author/7").unwrap()
        ))
    );
    assert_eq!(
        first.get(&n).map(|t| t.to_string()),
        Some("\"Smith\"".to_string())
    );
}

/// A shared variable forced to a literal in one pattern and a URI in the
/// other is unsatisfiable: zero SQL statements are executed.
#[tokio::test]
async fn incompatible_shared_variable_executes_nothing() {
    let connection = FakeConnection::new();
    let mapping = papers_authors_mapping(&connection);
    let x = Variable::new("x").unwrap();
    let clash = Variable::new("clash").unwrap();
    let bgp = GraphPattern::new(vec![
        TriplePattern::new(x.clone(), dc("title"), clash.clone()),
        TriplePattern::new(x, dc("creator"), clash),
    ]);
    let results: Vec<_> = mapping
        .query(&bgp, QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert!(results.is_empty());
    assert!(connection.executed().is_empty());
}

#[derive(Debug)]
struct NameIs(&'static str);

impl BindingFilter for NameIs {
    fn evaluate(&self, binding: &Binding) -> Option<bool> {
        let n = Variable::new("n").ok()?;
        let term = binding.get(&n)?;
        Some(term.to_string() == format!("\"{}\"", self.0))
    }
}

/// Post-join filters run on fully bound rows and drop non-matching ones.
#[tokio::test]
async fn binding_filters_apply_when_fully_bound() {
    let connection = FakeConnection::new().serve(
        "T1_Authors",
        vec![
            vec![
                SqlValue::Integer(7),
                SqlValue::Integer(1),
                SqlValue::Integer(7),
                SqlValue::Text("Smith".into()),
            ],
            vec![
                SqlValue::Integer(8),
                SqlValue::Integer(2),
                SqlValue::Integer(8),
                SqlValue::Text("Jones".into()),
            ],
        ],
    );
    let mapping = papers_authors_mapping(&connection);
    let x = Variable::new("x").unwrap();
    let y = Variable::new("y").unwrap();
    let n = Variable::new("n").unwrap();
    let bgp = GraphPattern::new(vec![
        TriplePattern::new(x, dc("creator"), y.clone()),
        TriplePattern::new(y, foaf_name(), n.clone()),
    ])
    .with_filter(Arc::new(NameIs("Smith")));
    let results: Vec<_> = mapping
        .query(&bgp, QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().unwrap().get(&n).map(|t| t.to_string()),
        Some("\"Smith\"".to_string())
    );
}

/// The conjunction-level limit caps binding delivery.
#[tokio::test]
async fn conjunction_limit_applies() {
    let connection = FakeConnection::new().serve(
        "T1_Authors",
        vec![
            vec![
                SqlValue::Integer(7),
                SqlValue::Integer(1),
                SqlValue::Integer(7),
                SqlValue::Text("Smith".into()),
            ],
            vec![
                SqlValue::Integer(8),
                SqlValue::Integer(2),
                SqlValue::Integer(8),
                SqlValue::Text("Jones".into()),
            ],
        ],
    );
    let mapping = papers_authors_mapping(&connection);
    let x = Variable::new("x").unwrap();
    let y = Variable::new("y").unwrap();
    let n = Variable::new("n").unwrap();
    let bgp = GraphPattern::new(vec![
        TriplePattern::new(x, dc("creator"), y.clone()),
        TriplePattern::new(y, foaf_name(), n),
    ])
    .with_limit(1);
    let results: Vec<_> = mapping
        .query(&bgp, QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
}
