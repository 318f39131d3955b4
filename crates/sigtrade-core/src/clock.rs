//! Time sources.
//!
//! Scheduling works on local wall-clock time (signals say "03:40"), order
//! expiration works on epoch milliseconds. Both come from one `Clock` so tests
//! can substitute a clock that moves with tokio's paused timer.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, Utc};
use tokio::time::Instant;

/// Trait for obtaining current time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Returns the current local wall-clock time.
    fn now_local(&self) -> NaiveDateTime;
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }

    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a fixed wall-clock start and advanced by tokio's
/// monotonic timer.
///
/// Under `#[tokio::test(start_paused = true)]` time only moves when every task
/// is idle, so sleeps computed from this clock land exactly on their target.
/// Epoch milliseconds treat the start as UTC.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    start_local: NaiveDateTime,
    started_at: Instant,
}

impl AnchoredClock {
    pub fn new(start_local: NaiveDateTime) -> Self {
        Self {
            start_local,
            started_at: Instant::now(),
        }
    }

    fn elapsed(&self) -> ChronoDuration {
        ChronoDuration::from_std(self.started_at.elapsed()).unwrap_or(ChronoDuration::zero())
    }
}

impl Clock for AnchoredClock {
    fn now_ms(&self) -> u64 {
        let start_ms = self.start_local.and_utc().timestamp_millis();
        (start_ms + self.elapsed().num_milliseconds()).max(0) as u64
    }

    fn now_local(&self) -> NaiveDateTime {
        self.start_local + self.elapsed()
    }
}
