//! The LRU result cache in front of the compiler.

use std::sync::Arc;

use futures_util::StreamExt;
use oxrdf::{NamedNode, Variable};
use rdfbridge::algebra::Attribute;
use rdfbridge::mapping::BridgeBuilder;
use rdfbridge::node_mapper::{ColumnSource, PatternSource};
use rdfbridge::query_planner::TriplePattern;
use rdfbridge::{CachedGraph, GraphMapping, NodeMaker, QueryOptions, SqlValue};

use super::support::{fake_database, FakeConnection};

fn attr(q: &str) -> Attribute {
    Attribute::parse(q).unwrap()
}

fn dc_title() -> NamedNode {
    NamedNode::new("http://purl.org/dc/elements/1.1/title").unwrap()
}

fn cached_graph(connection: &Arc<FakeConnection>) -> CachedGraph {
    let db = fake_database(Arc::clone(connection));
    let bridge = BridgeBuilder::new(db)
        .subject(NodeMaker::uri(
            Arc::new(PatternSource::parse("http://example.org/paper/@@Papers.id@@").unwrap()),
            true,
        ))
        .predicate(NodeMaker::fixed(dc_title()))
        .object(NodeMaker::plain_literal(
            Arc::new(ColumnSource::new(attr("Papers.title"))),
            true,
        ))
        .build()
        .unwrap();
    CachedGraph::with_defaults(Arc::new(GraphMapping::new(vec![bridge])))
}

fn title_pattern() -> TriplePattern {
    TriplePattern::new(
        Variable::new("x").unwrap(),
        dc_title(),
        Variable::new("t").unwrap(),
    )
}

#[tokio::test]
async fn repeated_requests_compile_and_execute_once() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![vec![SqlValue::Integer(1), SqlValue::Text("Foo".into())]],
    );
    let graph = cached_graph(&connection);

    let first: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(first.len(), 1);
    assert_eq!(connection.executed().len(), 1);

    let second: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(second.len(), 1);
    // Replayed from cache, no second round trip.
    assert_eq!(connection.executed().len(), 1);
    assert_eq!(
        first[0].as_ref().unwrap().to_string(),
        second[0].as_ref().unwrap().to_string()
    );
    assert_eq!(graph.cache_metrics().hits, 1);
}

#[tokio::test]
async fn invalidation_forces_a_fresh_execution() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![vec![SqlValue::Integer(1), SqlValue::Text("Foo".into())]],
    );
    let graph = cached_graph(&connection);

    let _: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    graph.invalidate();
    let _: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(connection.executed().len(), 2);
}

#[tokio::test]
async fn cancelled_streams_do_not_populate_the_cache() {
    // Enough rows that the producer is guaranteed to block on the bounded
    // channel and observe the cancellation before finishing.
    let rows: Vec<Vec<SqlValue>> = (0..50)
        .map(|i| vec![SqlValue::Integer(i), SqlValue::Text(format!("t{}", i))])
        .collect();
    let connection = FakeConnection::new().serve("FROM Papers", rows);
    let graph = cached_graph(&connection);

    let options = QueryOptions {
        buffer: 1,
        ..QueryOptions::default()
    };
    let mut stream = graph.find(&title_pattern(), options).unwrap();
    let _ = stream.next().await;
    drop(stream);

    // Wait for the worker to notice the cancellation.
    for _ in 0..100 {
        if connection.closed() == connection.opened() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // The aborted run must not have cached a truncated answer.
    let complete: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(complete.len(), 50);
    assert_eq!(connection.executed().len(), 2);
}

/// Requests with different limits are distinct cache entries.
#[tokio::test]
async fn limit_is_part_of_the_cache_key() {
    let connection = FakeConnection::new().serve(
        "FROM Papers",
        vec![
            vec![SqlValue::Integer(1), SqlValue::Text("a".into())],
            vec![SqlValue::Integer(2), SqlValue::Text("b".into())],
        ],
    );
    let graph = cached_graph(&connection);

    let limited: Vec<_> = graph
        .find(
            &title_pattern(),
            QueryOptions {
                limit: Some(1),
                ..QueryOptions::default()
            },
        )
        .unwrap()
        .collect()
        .await;
    assert_eq!(limited.len(), 1);

    let full: Vec<_> = graph
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(full.len(), 2);
    assert_eq!(connection.executed().len(), 2);
}
