//! Error types for sigtrade-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid order id: {0}")]
    InvalidOrderId(String),

    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
