//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Expected 4 fields, found {found}: {line}")]
    TooFewFields { line: String, found: usize },

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid pair: {0}")]
    InvalidPair(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
