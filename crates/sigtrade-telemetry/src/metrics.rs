//! Prometheus metrics for the signal trading engine.
//!
//! Covers the whole trade path:
//! - Signal parsing and scheduling
//! - Order submission and placement confirmation
//! - Push message routing and the confirmation registry
//! - Trade outcomes and session profit
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Encoder, Gauge, Histogram, IntCounter, IntGauge, TextEncoder,
};

/// Parsed signals.
/// Labels: result (accepted/rejected)
pub static SIGNALS_PARSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_signals_parsed_total",
        "Total signal lines parsed",
        &["result"]
    )
    .unwrap()
});

/// Time buckets released by the scheduler.
pub static BUCKETS_RELEASED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sigtrade_buckets_released_total",
        "Total scheduling buckets released for execution"
    )
    .unwrap()
});

/// Signals launched for execution.
pub static SIGNALS_LAUNCHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sigtrade_signals_launched_total",
        "Total signals launched for execution"
    )
    .unwrap()
});

/// Order submissions.
/// Labels: result (accepted/disconnected/error)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_orders_submitted_total",
        "Total order submissions by sink result",
        &["result"]
    )
    .unwrap()
});

/// Trade validation failures.
/// Labels: reason
pub static VALIDATION_FAILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_validation_failed_total",
        "Total trade requests failing validation",
        &["reason"]
    )
    .unwrap()
});

/// Placement confirmations.
/// Labels: outcome (placed/rejected/timeout)
pub static PLACEMENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_placement_total",
        "Total placement confirmations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Time from submission to placement acknowledgement.
pub static PLACEMENT_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "sigtrade_placement_latency_ms",
        "Submission to placement acknowledgement latency in milliseconds",
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Terminal trade outcomes.
/// Labels: outcome (win/loss/timeout/rejected)
pub static TRADE_OUTCOME_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_trade_outcome_total",
        "Total trades by terminal outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Follow-up attempts after a loss.
pub static GALE_ATTEMPTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "sigtrade_gale_attempts_total",
        "Total follow-up attempts placed after a loss"
    )
    .unwrap()
});

/// Running profit of settled trades.
pub static SESSION_PNL: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("sigtrade_session_pnl", "Cumulative pnl of settled trades").unwrap()
});

/// Orders currently tracked by the confirmation registry.
pub static PENDING_CONFIRMATIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "sigtrade_pending_confirmations",
        "Orders currently awaiting placement or closure"
    )
    .unwrap()
});

/// Decoded push messages.
/// Labels: kind (time_sync/profile/placement/closure)
pub static PUSH_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_push_messages_total",
        "Total push messages routed by kind",
        &["kind"]
    )
    .unwrap()
});

/// Push messages that matched no tracked order.
/// Labels: reason (unknown_request/stale/not_closed/parked_expired/parked_overflow)
pub static PUSH_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigtrade_push_dropped_total",
        "Total push messages dropped by the confirmation registry",
        &["reason"]
    )
    .unwrap()
});

/// Metrics helper struct.
pub struct Metrics;

impl Metrics {
    /// Record parse results in bulk.
    pub fn signals_parsed(accepted: u64, rejected: u64) {
        SIGNALS_PARSED_TOTAL
            .with_label_values(&["accepted"])
            .inc_by(accepted as f64);
        SIGNALS_PARSED_TOTAL
            .with_label_values(&["rejected"])
            .inc_by(rejected as f64);
    }

    /// Record a bucket release with its signal count.
    pub fn bucket_released(signals: usize) {
        BUCKETS_RELEASED_TOTAL.inc();
        SIGNALS_LAUNCHED_TOTAL.inc_by(signals as u64);
    }

    /// Record an order submission result.
    pub fn order_submitted(result: &str) {
        ORDERS_SUBMITTED_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record a validation failure.
    pub fn validation_failed(reason: &str) {
        VALIDATION_FAILED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a placement outcome.
    pub fn placement(outcome: &str) {
        PLACEMENT_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record placement latency.
    pub fn placement_latency(latency_ms: f64) {
        PLACEMENT_LATENCY_MS.observe(latency_ms);
    }

    /// Record a terminal trade outcome and its pnl.
    pub fn trade_finished(outcome: &str, pnl: f64) {
        TRADE_OUTCOME_TOTAL.with_label_values(&[outcome]).inc();
        SESSION_PNL.add(pnl);
    }

    /// Record a follow-up attempt.
    pub fn gale_attempt() {
        GALE_ATTEMPTS_TOTAL.inc();
    }

    /// Set the number of tracked orders.
    pub fn pending_confirmations(count: usize) {
        PENDING_CONFIRMATIONS.set(count as i64);
    }

    /// Record a routed push message.
    pub fn push_received(kind: &str) {
        PUSH_MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a dropped push message.
    pub fn push_dropped(reason: &str) {
        PUSH_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text() -> crate::TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
