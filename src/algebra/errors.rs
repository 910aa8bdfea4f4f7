use thiserror::Error;

/// Errors raised while building algebra values from a mapping fragment.
///
/// These are compile-time errors in the mapping sense: they surface when
/// the offending fragment is constructed and are fatal to that fragment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlgebraError {
    #[error("malformed join condition: {reason}")]
    MalformedJoin { reason: String },
    #[error("table `{table}` already has alias `{existing}`, cannot also alias it as `{duplicate}`")]
    DuplicateAlias {
        table: String,
        existing: String,
        duplicate: String,
    },
    #[error("alias `{alias}` is bound to both `{first}` and `{second}`")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("malformed qualified column name `{name}` (expected `table.column` or `schema.table.column`)")]
    MalformedAttribute { name: String },
}
