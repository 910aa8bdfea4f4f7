//! Cancellation, deadlines, and error surfacing; cursors must close on
//! every exit path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use oxrdf::{NamedNode, Variable};
use rdfbridge::algebra::Attribute;
use rdfbridge::mapping::BridgeBuilder;
use rdfbridge::node_mapper::{ColumnSource, PatternSource};
use rdfbridge::query_planner::TriplePattern;
use rdfbridge::{
    Database, DatabaseCapabilities, DriverError, ErrorCode, GraphMapping, NodeMaker, QueryOptions,
    RowCursor, SqlConnection, SqlValue,
};

use super::support::{fake_database, FakeConnection};

fn attr(q: &str) -> Attribute {
    Attribute::parse(q).unwrap()
}

fn dc_title() -> NamedNode {
    NamedNode::new("http://purl.org/dc/elements/1.1/title").unwrap()
}

fn title_mapping_on(db: Arc<Database>) -> GraphMapping {
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
    GraphMapping::new(vec![bridge])
}

fn title_pattern() -> TriplePattern {
    TriplePattern::new(
        Variable::new("x").unwrap(),
        dc_title(),
        Variable::new("t").unwrap(),
    )
}

fn many_rows(n: i64) -> Vec<Vec<SqlValue>> {
    (0..n)
        .map(|i| vec![SqlValue::Integer(i), SqlValue::Text(format!("title {}", i))])
        .collect()
}

/// Closing the consumer mid-iteration propagates to the worker, which
/// closes its cursor: open/close counts balance.
#[tokio::test]
async fn cancellation_closes_the_cursor() {
    let connection = FakeConnection::new().serve("FROM Papers", many_rows(500));
    let mapping = title_mapping_on(fake_database(Arc::clone(&connection)));
    let options = QueryOptions {
        buffer: 1,
        ..QueryOptions::default()
    };
    let mut stream = mapping.find(&title_pattern(), options).unwrap();
    let first = stream.next().await;
    assert!(first.is_some());
    drop(stream);

    for _ in 0..100 {
        if connection.closed() == connection.opened() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(connection.opened(), 1);
    assert_eq!(connection.closed(), 1);
}

/// Normal exhaustion also balances open/close.
#[tokio::test]
async fn exhaustion_closes_the_cursor() {
    let connection = FakeConnection::new().serve("FROM Papers", many_rows(3));
    let mapping = title_mapping_on(fake_database(Arc::clone(&connection)));
    let results: Vec<_> = mapping
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 3);
    assert_eq!(connection.opened(), 1);
    assert_eq!(connection.closed(), 1);
}

/// The optional deadline cancels the pipeline externally; the consumer
/// sees a TIMEOUT-coded error and the cursor still closes.
#[tokio::test(start_paused = true)]
async fn deadline_cancels_with_a_timeout_error() {
    let connection = FakeConnection::new()
        .serve("FROM Papers", many_rows(10))
        .delay_rows(Duration::from_millis(100));
    let mapping = title_mapping_on(fake_database(Arc::clone(&connection)));
    let options = QueryOptions {
        timeout: Some(Duration::from_millis(150)),
        ..QueryOptions::default()
    };
    let results: Vec<_> = mapping
        .find(&title_pattern(), options)
        .unwrap()
        .collect()
        .await;

    let last = results.last().unwrap();
    match last {
        Err(error) => assert_eq!(error.code(), ErrorCode::Timeout),
        Ok(triple) => panic!("expected timeout error, got triple {}", triple),
    }
    assert_eq!(connection.opened(), 1);
    assert_eq!(connection.closed(), 1);
}

#[derive(Debug)]
struct FailingConnection;

#[async_trait]
impl SqlConnection for FailingConnection {
    async fn execute(&self, _sql: &str) -> Result<Box<dyn RowCursor>, DriverError> {
        Err(DriverError::new("connection refused"))
    }
}

/// Driver failures surface as coded errors carrying the original cause;
/// nothing is retried.
#[tokio::test]
async fn driver_errors_are_wrapped_not_retried() {
    let db = Arc::new(Database::new(
        "failing_db",
        Arc::new(FailingConnection),
        DatabaseCapabilities::default(),
    ));
    let mapping = title_mapping_on(db);
    let results: Vec<_> = mapping
        .find(&title_pattern(), QueryOptions::default())
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    match &results[0] {
        Err(error) => {
            assert_eq!(error.code(), ErrorCode::DriverFailure);
            assert!(error.to_string().contains("connection refused"));
        }
        Ok(triple) => panic!("expected driver error, got {}", triple),
    }
}

/// Backpressure: with a tiny buffer the producer cannot run ahead of the
/// consumer by more than the channel capacity.
#[tokio::test]
async fn bounded_buffer_limits_prefetch() {
    let connection = FakeConnection::new().serve("FROM Papers", many_rows(100));
    let mapping = title_mapping_on(fake_database(Arc::clone(&connection)));
    let options = QueryOptions {
        buffer: 1,
        ..QueryOptions::default()
    };
    let mut stream = mapping.find(&title_pattern(), options).unwrap();
    let _ = stream.next().await;
    // Give the producer a chance to run ahead if it (wrongly) could.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let metrics = stream.metrics();
    // Delivered = 1 consumed; the producer can be at most a couple of
    // sends ahead (one queued, one in flight).
    assert!(
        metrics.delivered <= 3,
        "producer ran ahead: {:?}",
        metrics
    );
    drop(stream);
}
