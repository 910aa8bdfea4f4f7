use thiserror::Error;

use crate::algebra::AlgebraError;
use crate::sql_generator::SqlGenerationError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    SqlGeneration(#[from] SqlGenerationError),
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}
