//! Prometheus metrics and structured logging for the signal trading engine.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for orders, confirmations and trade outcomes
//! - End-of-session statistics summary

pub mod error;
pub mod logging;
pub mod metrics;
pub mod session_stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with};
pub use metrics::Metrics;
pub use session_stats::{SessionStats, SessionStatsReporter};
