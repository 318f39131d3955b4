//! Liveness tracking for the push channel.
//!
//! The brokerage pushes frames continuously while a session is active, so a
//! ping is only sent after `interval_ms` of silence. A ping left unanswered
//! for `timeout_ms` marks the connection dead.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Liveness {
    last_frame: DateTime<Utc>,
    ping_sent: Option<DateTime<Utc>>,
}

/// Heartbeat monitor for one connection.
pub struct HeartbeatManager {
    interval_ms: u64,
    timeout_ms: u64,
    inner: Mutex<Liveness>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            inner: Mutex::new(Liveness {
                last_frame: Utc::now(),
                ping_sent: None,
            }),
        }
    }

    /// Reset on every new connection.
    pub fn reset(&self) {
        *self.inner.lock() = Liveness {
            last_frame: Utc::now(),
            ping_sent: None,
        };
    }

    pub fn record_ping(&self) {
        self.inner.lock().ping_sent = Some(Utc::now());
    }

    pub fn record_pong(&self) {
        let mut inner = self.inner.lock();
        let now = Utc::now();
        if let Some(sent) = inner.ping_sent.take() {
            debug!(rtt_ms = (now - sent).num_milliseconds(), "Received pong");
        }
        inner.last_frame = now;
    }

    /// Any inbound frame proves liveness.
    pub fn record_frame(&self) {
        self.inner.lock().last_frame = Utc::now();
    }

    pub fn awaiting_pong(&self) -> bool {
        self.inner.lock().ping_sent.is_some()
    }

    pub fn is_timed_out(&self) -> bool {
        match self.inner.lock().ping_sent {
            Some(sent) => (Utc::now() - sent).num_milliseconds() > self.timeout_ms as i64,
            None => false,
        }
    }

    pub fn should_send_ping(&self) -> bool {
        let inner = self.inner.lock();
        inner.ping_sent.is_none()
            && (Utc::now() - inner.last_frame).num_milliseconds() >= self.interval_ms as i64
    }

    /// Sleep until the next liveness check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(Duration::from_millis((self.interval_ms / 2).max(1))).await;
    }
}
