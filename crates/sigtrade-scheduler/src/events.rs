//! Progress notifications for a scheduling session.

use crate::report::Report;
use chrono::NaiveDateTime;
use sigtrade_core::{SessionId, Signal};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Signals were bucketed.
    Scheduled {
        session: SessionId,
        buckets: usize,
        signals: usize,
    },
    /// Sleeping until the next bucket.
    Waiting {
        at: NaiveDateTime,
        delay: Duration,
        signals: usize,
    },
    /// A bucket is due and its trades are launching.
    Releasing {
        at: NaiveDateTime,
        signals: Vec<Signal>,
    },
    /// A trade ended in an error and is left out of the report.
    TradeFailed { signal: Signal, error: String },
    Finished { report: Report },
}
