//! Request id generation.

use sigtrade_core::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request ids, never repeated within a process.
///
/// Seeded from a timestamp so ids from a restarted process do not collide
/// with acknowledgements still in flight for the previous one.
#[derive(Debug)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    pub fn next(&self) -> RequestId {
        RequestId::new(self.counter.fetch_add(1, Ordering::AcqRel).to_string())
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
