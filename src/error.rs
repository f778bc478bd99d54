//! Error types for the query pipeline and chart configuration.

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced to the connection and HTTP layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Historical range could not be parsed, or does not end after it starts.
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Relative token ends in something other than `s`, `m`, `h` or `d`.
    #[error("Invalid time range unit in '{0}'")]
    InvalidUnit(String),

    /// Relative token's numeric part does not parse.
    #[error("Invalid time range amount in '{0}'")]
    InvalidAmount(String),

    /// A returned variable has no configured measurement.
    #[error("No measurement configured for variable '{0}'")]
    UnknownMeasurement(String),

    /// The store call failed.
    #[error("Query failed: {0}")]
    QueryExecution(#[from] StoreError),

    /// The store call did not finish in time.
    #[error("Query timed out after {0:?}")]
    QueryTimeout(Duration),

    /// A configuration update was rejected.
    #[error("Invalid chart configuration: {0}")]
    Validation(String),

    /// The chart configuration file could not be written.
    #[error("Failed to persist chart configuration: {0}")]
    Persistence(String),
}

impl Error {
    /// Whether the error was caused by bad client input rather than a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTimeRange(_)
                | Error::InvalidUnit(_)
                | Error::InvalidAmount(_)
                | Error::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::InvalidUnit("-5x".into()).is_client_error());
        assert!(Error::Validation("bad".into()).is_client_error());
        assert!(!Error::Persistence("disk full".into()).is_client_error());
        assert!(!Error::QueryTimeout(Duration::from_secs(1)).is_client_error());
    }

    #[test]
    fn test_store_error_converts() {
        let err: Error = StoreError::Timeout.into();
        assert!(matches!(err, Error::QueryExecution(StoreError::Timeout)));
    }
}
