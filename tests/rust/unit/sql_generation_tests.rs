use std::sync::Arc;

use async_trait::async_trait;
use rdfbridge::algebra::Attribute;
use rdfbridge::mapping::BridgeBuilder;
use rdfbridge::node_mapper::{ColumnSource, PatternSource};
use rdfbridge::query_planner::{PatternCompiler, PatternNode, TriplePattern};
use rdfbridge::{
    ColumnType, Database, DatabaseCapabilities, DateLiteralStyle, DriverError, GraphMapping,
    NodeMaker, RowCursor, SqlConnection,
};

use oxrdf::{NamedNode, Variable};

#[derive(Debug)]
struct NoopConnection;

#[async_trait]
impl SqlConnection for NoopConnection {
    async fn execute(&self, _sql: &str) -> Result<Box<dyn RowCursor>, DriverError> {
        Err(DriverError::new("no database in SQL generation tests"))
    }
}

fn database(caps: DatabaseCapabilities) -> Arc<Database> {
    Arc::new(Database::new("papers_db", Arc::new(NoopConnection), caps))
}

fn attr(q: &str) -> Attribute {
    Attribute::parse(q).unwrap()
}

fn dc_title() -> NamedNode {
    NamedNode::new("http://purl.org/dc/elements/1.1/title").unwrap()
}

fn title_mapping(db: &Arc<Database>) -> GraphMapping {
    let bridge = BridgeBuilder::new(Arc::clone(db))
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

#[test]
fn scenario_a_sql_shape() {
    let db = database(DatabaseCapabilities::default());
    let mapping = title_mapping(&db);
    let pattern = TriplePattern::new(
        Variable::new("x").unwrap(),
        dc_title(),
        Variable::new("t").unwrap(),
    );
    let compiled = PatternCompiler::new(&mapping).compile_find(&pattern).unwrap();
    assert_eq!(compiled.statements.len(), 1);
    assert_eq!(
        compiled.statements[0].sql.as_deref(),
        Some("SELECT DISTINCT Papers.id, Papers.title FROM Papers")
    );
}

#[test]
fn distinct_dropped_when_a_projected_column_cannot_compare() {
    let db = Arc::new(
        Database::new(
            "papers_db",
            Arc::new(NoopConnection),
            DatabaseCapabilities {
                distinct_on_all_columns: false,
                ..DatabaseCapabilities::default()
            },
        )
        .with_column_type("Papers.title", ColumnType::LargeText),
    );
    let mapping = title_mapping(&db);
    let pattern = TriplePattern::new(PatternNode::Any, dc_title(), PatternNode::Any);
    let compiled = PatternCompiler::new(&mapping).compile_find(&pattern).unwrap();
    let sql = compiled.statements[0].sql.as_deref().unwrap();
    assert!(!sql.contains("DISTINCT"), "got: {}", sql);
}

#[test]
fn numeric_and_date_literals_quote_per_column_type() {
    let db = Arc::new(
        Database::new(
            "papers_db",
            Arc::new(NoopConnection),
            DatabaseCapabilities {
                date_literal_style: DateLiteralStyle::Odbc,
                ..DatabaseCapabilities::default()
            },
        )
        .with_column_type("Papers.id", ColumnType::Numeric),
    );
    let mapping = title_mapping(&db);
    let pattern = TriplePattern::new(
        NamedNode::new("http://example.org/paper/42").unwrap(),
        dc_title(),
        PatternNode::Any,
    );
    let compiled = PatternCompiler::new(&mapping).compile_find(&pattern).unwrap();
    let sql = compiled.statements[0].sql.as_deref().unwrap();
    assert!(sql.contains("Papers.id = 42"), "got: {}", sql);
    assert!(!sql.contains("'42'"), "got: {}", sql);
}

#[test]
fn hostile_lexical_forms_stay_quoted() {
    let db = Arc::new(
        Database::new(
            "papers_db",
            Arc::new(NoopConnection),
            DatabaseCapabilities::default(),
        )
        .with_column_type("Papers.id", ColumnType::Numeric),
    );
    let mapping = title_mapping(&db);
    let pattern = TriplePattern::new(
        NamedNode::new("http://example.org/paper/1;DROP%20TABLE").unwrap(),
        dc_title(),
        PatternNode::Any,
    );
    let compiled = PatternCompiler::new(&mapping).compile_find(&pattern).unwrap();
    let sql = compiled.statements[0].sql.as_deref().unwrap();
    // The non-numeric lexical form is forced into a quoted literal.
    assert!(sql.contains("Papers.id = '1;DROP%20TABLE'"), "got: {}", sql);
}
