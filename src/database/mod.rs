//! Database handle boundary.
//!
//! The compiler needs three things from a database: a way to run a SELECT
//! and fetch rows ([`SqlConnection`]), a column type lookup for literal
//! quoting, and capability flags for dialect differences. Connection
//! pooling, retries, and reconnection live behind the driver, outside this
//! crate.
//!
//! A single connection handle per mapped database is shared by all query
//! executions without additional locking; thread safety is the driver's
//! contract.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub mod errors;

pub use errors::DriverError;

/// Declared type of a mapped column, driving literal quoting and DISTINCT
/// eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Timestamp,
    Boolean,
    /// Large character column (CLOB-like); excluded from DISTINCT on
    /// databases that cannot compare it.
    LargeText,
    /// Binary column (BLOB-like); excluded from DISTINCT.
    Binary,
}

impl ColumnType {
    /// Whether a column of this type may appear in a `SELECT DISTINCT` list.
    pub fn supports_distinct(self) -> bool {
        !matches!(self, ColumnType::LargeText | ColumnType::Binary)
    }
}

/// Date literal syntax used by the backing database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateLiteralStyle {
    /// ANSI `DATE '2024-01-15'` / `TIMESTAMP '...'`.
    Ansi,
    /// ODBC escape form `{d '2024-01-15'}` / `{ts '...'}`.
    Odbc,
}

/// Per-database capability flags.
///
/// Deserializable so callers can carry them in whatever configuration
/// format they already use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCapabilities {
    /// Whether `SELECT DISTINCT` works across all column types. When false,
    /// DISTINCT is still emitted as long as every projected column type
    /// supports it individually.
    pub distinct_on_all_columns: bool,
    pub date_literal_style: DateLiteralStyle,
    /// Whether the dialect accepts a trailing `LIMIT n`.
    pub supports_limit: bool,
    /// Whether table identifiers compare case-insensitively.
    pub case_insensitive_identifiers: bool,
}

impl Default for DatabaseCapabilities {
    fn default() -> Self {
        DatabaseCapabilities {
            distinct_on_all_columns: true,
            date_literal_style: DateLiteralStyle::Ansi,
            supports_limit: true,
            case_insensitive_identifiers: false,
        }
    }
}

/// A single value fetched from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Lexical form used to build graph terms. `None` for NULL: a NULL in
    /// any required column means no term, never a partial one.
    pub fn as_lexical(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Boolean(b) => Some(b.to_string()),
            SqlValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(t) => Some(t.format("%Y-%m-%dT%H:%M:%S").to_string()),
            SqlValue::Bytes(b) => Some(hex_lower(b)),
        }
    }

    /// Truthiness of a boolean-valued SELECT column, used to gate merged
    /// bridge conditions.
    pub fn is_true(&self) -> bool {
        match self {
            SqlValue::Boolean(b) => *b,
            SqlValue::Integer(i) => *i != 0,
            SqlValue::Float(f) => *f != 0.0,
            SqlValue::Text(s) => s == "1" || s.eq_ignore_ascii_case("true") || s == "t",
            _ => false,
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// One fetched row, with values positionally aligned to the statement's
/// SELECT list and a shared label → position index.
#[derive(Debug, Clone)]
pub struct ResultRow {
    index: Arc<HashMap<String, usize>>,
    values: Vec<SqlValue>,
}

impl ResultRow {
    pub fn new(index: Arc<HashMap<String, usize>>, values: Vec<SqlValue>) -> Self {
        ResultRow { index, values }
    }

    /// Row with no columns, used to decode constant-only bridges that need
    /// no SQL at all.
    pub fn empty() -> Self {
        ResultRow {
            index: Arc::new(HashMap::new()),
            values: Vec::new(),
        }
    }

    /// Look a value up by SELECT-list label (an attribute's qualified name
    /// or a generated expression alias).
    pub fn value(&self, label: &str) -> Option<&SqlValue> {
        self.index.get(label).and_then(|i| self.values.get(*i))
    }

    pub fn value_at(&self, position: usize) -> Option<&SqlValue> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Streaming cursor over one executed statement.
///
/// `close` must be idempotent; the executor closes on exhaustion,
/// cancellation, and error paths alike.
#[async_trait]
pub trait RowCursor: Send {
    async fn next_row(&mut self) -> Result<Option<Vec<SqlValue>>, DriverError>;
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Object-safe connection boundary. One statement at a time, read-only.
#[async_trait]
pub trait SqlConnection: fmt::Debug + Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Box<dyn RowCursor>, DriverError>;
}

/// A mapped database: connection accessor, column type lookup, capabilities.
#[derive(Clone)]
pub struct Database {
    name: String,
    connection: Arc<dyn SqlConnection>,
    column_types: HashMap<String, ColumnType>,
    capabilities: DatabaseCapabilities,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Database {
    pub fn new(
        name: impl Into<String>,
        connection: Arc<dyn SqlConnection>,
        capabilities: DatabaseCapabilities,
    ) -> Self {
        Database {
            name: name.into(),
            connection,
            column_types: HashMap::new(),
            capabilities,
        }
    }

    /// Declare the type of a column, keyed by its qualified name
    /// (`table.column` or `schema.table.column`).
    pub fn with_column_type(mut self, qualified_name: impl Into<String>, ty: ColumnType) -> Self {
        self.column_types
            .insert(normalize_key(&qualified_name.into()), ty);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> Arc<dyn SqlConnection> {
        Arc::clone(&self.connection)
    }

    pub fn capabilities(&self) -> &DatabaseCapabilities {
        &self.capabilities
    }

    /// Declared type of a column; undeclared columns default to text, the
    /// conservative quoting choice.
    pub fn column_type(&self, qualified_name: &str) -> ColumnType {
        self.column_types
            .get(&normalize_key(qualified_name))
            .copied()
            .unwrap_or(ColumnType::Text)
    }

    /// Databases are compared by identity of their connection handle; two
    /// bridges share a database iff they share a handle.
    pub fn same_as(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.connection, &other.connection)
    }
}

fn normalize_key(qualified_name: &str) -> String {
    qualified_name.to_ascii_lowercase()
}
