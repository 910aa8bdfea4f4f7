use thiserror::Error;

use crate::algebra::AlgebraError;
use crate::node_mapper::NodeMapperError;

/// Errors raised while assembling bridges into a mapping. All of these
/// surface eagerly at construction and are fatal to the offending
/// fragment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("bridge is missing its {position} node maker")]
    MissingNodeMaker { position: &'static str },
    #[error("bridge references no database")]
    MissingDatabase,
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    #[error(transparent)]
    NodeMapper(#[from] NodeMapperError),
}
