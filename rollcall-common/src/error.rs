//! Common error types for rollcall

use thiserror::Error;

/// Common result type for rollcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across rollcall crates
///
/// `InvalidInput` and `Config` raised by sources or startup fail the run.
/// `Oracle` is recoverable at the mentee boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error (including missing credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed roster or attendance data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External oracle (language model) failure
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Embedding cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error points at bad input or a defect rather than a
    /// flaky external service
    ///
    /// The reconciliation loop still isolates such errors to the mentee that
    /// raised them; they are logged at `error` instead of `warn`.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::InvalidInput(_) | Error::Io(_) | Error::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_classification() {
        assert!(Error::Config("missing key".to_string()).is_unexpected());
        assert!(Error::InvalidInput("line 3".to_string()).is_unexpected());
        assert!(!Error::Oracle("timeout".to_string()).is_unexpected());
        assert!(!Error::Cache("corrupt".to_string()).is_unexpected());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = Error::InvalidInput("roster.csv line 4: empty 'name'".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input: roster.csv line 4: empty 'name'"
        );
    }
}
