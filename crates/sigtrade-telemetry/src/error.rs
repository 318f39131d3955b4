//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Log subscriber already installed: {0}")]
    SubscriberInstalled(String),

    #[error("Metrics encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
