use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlGenerationError {
    #[error("cannot generate SQL for the empty relation")]
    EmptyRelation,
    #[error("cannot generate SQL for a relation without tables")]
    NoTables,
    #[error("relation has no projections; the SELECT list would be empty")]
    NoProjections,
}
