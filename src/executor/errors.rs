use std::fmt;

use thiserror::Error;

use crate::database::DriverError;
use crate::query_planner::CompileError;

/// Stable error codes surfaced alongside execution failures, so callers
/// can branch without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DriverFailure,
    Timeout,
    CompileFailure,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::DriverFailure => "DRIVER_FAILURE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::CompileFailure => "COMPILE_FAILURE",
        };
        write!(f, "{}", code)
    }
}

/// A failed execution. Driver errors carry the original cause; nothing is
/// retried silently.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("SQL execution failed [DRIVER_FAILURE]: {source}")]
    Driver {
        #[source]
        source: DriverError,
    },
    #[error("query deadline exceeded [TIMEOUT] after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl ExecutionError {
    pub fn driver(source: DriverError) -> Self {
        ExecutionError::Driver { source }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ExecutionError::Driver { .. } => ErrorCode::DriverFailure,
            ExecutionError::Timeout { .. } => ErrorCode::Timeout,
            ExecutionError::Compile(_) => ErrorCode::CompileFailure,
        }
    }
}
