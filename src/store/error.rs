//! Error types for store access.

use thiserror::Error;

/// Errors that can occur when querying the time-series store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The store answered with a non-success status.
    #[error("Store returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The query itself failed inside the store.
    #[error("Query error: {0}")]
    Query(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() {
            StoreError::Connection(err.to_string())
        } else if err.is_decode() {
            StoreError::Parse(err.to_string())
        } else {
            StoreError::Http(err.to_string())
        }
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Parse(err.to_string())
    }
}
