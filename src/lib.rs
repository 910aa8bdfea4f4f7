//! rdfbridge - Virtual RDF graph layer over relational databases
//!
//! This crate exposes a relational database as a read-only graph of
//! subject-predicate-object statements, without materializing it, through:
//! - Bridge definitions mapping tables and columns to graph terms
//! - Triple-pattern matching compiled to SQL at query time
//! - Cross-pattern constraint propagation and join elimination
//! - Streaming, cancellable result delivery with a cached front
//!
//! Parsing mapping files, driver lifecycle, and query-language front ends
//! are external collaborators: callers hand in an already-parsed
//! [`mapping::GraphMapping`] and drive it with
//! [`query_planner::TriplePattern`] / [`query_planner::GraphPattern`]
//! requests.

pub mod algebra;
pub mod database;
pub mod executor;
pub mod mapping;
pub mod node_mapper;
pub mod optimizer;
pub mod query_planner;
pub mod sql_generator;

pub use database::{
    ColumnType, Database, DatabaseCapabilities, DateLiteralStyle, DriverError, ResultRow,
    RowCursor, SqlConnection, SqlValue,
};
pub use executor::{
    find, query, BindingStream, CachedGraph, ErrorCode, ExecutionError, ExecutionMetrics,
    FindCache, FindCacheConfig, QueryOptions, TripleStream,
};
pub use mapping::{BridgeBuilder, GraphMapping, MappingError, TriplePosition, TripleRelation};
pub use node_mapper::{NodeMaker, NodeMapperError, Pattern, ValueSource, ValueTranslator};
pub use query_planner::{
    Binding, BindingFilter, CompileError, GraphPattern, PatternCompiler, PatternNode,
    TriplePattern,
};
