//! Scheduler error types.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Trade amount must be positive: {0}")]
    InvalidAmount(Decimal),

    #[error("Gale multiplier must be at least 1: {0}")]
    InvalidGaleMultiplier(Decimal),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
