use thiserror::Error;

/// Error raised by a database driver behind the [`SqlConnection`] boundary.
///
/// Concrete drivers map their native error type into this one; the crate
/// never retries on its own.
///
/// [`SqlConnection`]: super::SqlConnection
#[derive(Debug, Error)]
#[error("database driver error: {message}")]
pub struct DriverError {
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        DriverError {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DriverError {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
