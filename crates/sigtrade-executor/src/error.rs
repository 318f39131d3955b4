//! Executor error types.

use rust_decimal::Decimal;
use sigtrade_core::{CoreError, OrderId, RequestId};
use thiserror::Error;

/// Trade parameters rejected before anything is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Asset is empty")]
    EmptyAsset,

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Amount {amount} below minimum {minimum}")]
    AmountBelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid expiry: {0} minutes")]
    InvalidExpiry(i64),

    #[error("No active account")]
    NoActiveAccount,
}

impl ValidationError {
    /// Label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyAsset => "empty_asset",
            Self::UnknownAsset(_) => "unknown_asset",
            Self::AmountBelowMinimum { .. } => "amount_below_minimum",
            Self::InvalidDirection(_) => "invalid_direction",
            Self::InvalidExpiry(_) => "invalid_expiry",
            Self::NoActiveAccount => "no_active_account",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("Request id already pending: {0}")]
    DuplicateKey(RequestId),

    #[error("Request id not registered: {0}")]
    UnknownKey(RequestId),

    #[error("Order id not tracked: {0}")]
    UnknownOrder(OrderId),
}

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Order submission failed: {0}")]
    Submission(String),

    #[error("Confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("Order build failed: {0}")]
    Order(#[from] CoreError),
}

pub type ExecutorResult<T> = Result<T, TradeError>;
