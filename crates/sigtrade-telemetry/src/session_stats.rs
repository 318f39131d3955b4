//! End-of-session statistics.
//!
//! Reads the process-wide counters and logs one summary block:
//! - placement outcomes and latency percentiles (P50/P95/P99)
//! - trade outcomes and cumulative pnl
//! - dropped push messages

use crate::metrics::{
    GALE_ATTEMPTS_TOTAL, PLACEMENT_LATENCY_MS, PLACEMENT_TOTAL, PUSH_DROPPED_TOTAL,
    SESSION_PNL, TRADE_OUTCOME_TOTAL,
};
use prometheus::core::Collector;
use std::time::Instant;
use tracing::info;

/// Snapshot of the session counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub placed: u64,
    pub rejected: u64,
    pub placement_timeouts: u64,
    pub wins: u64,
    pub losses: u64,
    pub trade_timeouts: u64,
    pub gale_attempts: u64,
    pub pnl: f64,
    pub dropped_pushes: u64,
    pub placement_p50_ms: f64,
    pub placement_p95_ms: f64,
    pub placement_p99_ms: f64,
}

/// Session statistics reporter.
pub struct SessionStatsReporter {
    started: Instant,
}

impl Default for SessionStatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStatsReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Collect the current counter values.
    pub fn collect(&self) -> SessionStats {
        let (p50, p95, p99) = histogram_percentiles(&PLACEMENT_LATENCY_MS);
        SessionStats {
            placed: counter(&PLACEMENT_TOTAL, "placed"),
            rejected: counter(&PLACEMENT_TOTAL, "rejected"),
            placement_timeouts: counter(&PLACEMENT_TOTAL, "timeout"),
            wins: counter(&TRADE_OUTCOME_TOTAL, "win"),
            losses: counter(&TRADE_OUTCOME_TOTAL, "loss"),
            trade_timeouts: counter(&TRADE_OUTCOME_TOTAL, "timeout"),
            gale_attempts: GALE_ATTEMPTS_TOTAL.get(),
            pnl: SESSION_PNL.get(),
            dropped_pushes: counter_total(&PUSH_DROPPED_TOTAL),
            placement_p50_ms: p50,
            placement_p95_ms: p95,
            placement_p99_ms: p99,
        }
    }

    /// Log the session summary.
    pub fn output_summary(&self) {
        let s = self.collect();
        let elapsed = self.started.elapsed().as_secs();

        info!("========== Session Statistics Summary ==========");
        info!("Duration: {}m {}s", elapsed / 60, elapsed % 60);
        info!(
            "  Placements: placed={}, rejected={}, timeout={}",
            s.placed, s.rejected, s.placement_timeouts
        );
        info!(
            "  Placement latency (ms): P50={:.1}, P95={:.1}, P99={:.1}",
            s.placement_p50_ms, s.placement_p95_ms, s.placement_p99_ms
        );
        info!(
            "  Trades: wins={}, losses={}, timeout={}, gales={}",
            s.wins, s.losses, s.trade_timeouts, s.gale_attempts
        );
        info!("  PnL: {:.2}", s.pnl);
        info!("  Dropped pushes: {}", s.dropped_pushes);
        info!("================================================");
    }
}

fn counter(vec: &prometheus::CounterVec, label: &str) -> u64 {
    vec.with_label_values(&[label]).get() as u64
}

fn counter_total(vec: &prometheus::CounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Returns (p50, p95, p99), zero when empty.
fn histogram_percentiles(histogram: &prometheus::Histogram) -> (f64, f64, f64) {
    for mf in histogram.collect() {
        if let Some(m) = mf.get_metric().first() {
            let h = m.get_histogram();
            let count = h.get_sample_count();
            if count == 0 {
                return (0.0, 0.0, 0.0);
            }
            let buckets = h.get_bucket();
            return (
                percentile_from_buckets(buckets, count, 0.50),
                percentile_from_buckets(buckets, count, 0.95),
                percentile_from_buckets(buckets, count, 0.99),
            );
        }
    }
    (0.0, 0.0, 0.0)
}

/// Linear interpolation inside the first bucket reaching the target rank.
fn percentile_from_buckets(
    buckets: &[prometheus::proto::Bucket],
    total_count: u64,
    percentile: f64,
) -> f64 {
    let target = (total_count as f64 * percentile) as u64;
    let mut prev_bound = 0.0;
    let mut prev_count = 0u64;

    for bucket in buckets {
        let upper_bound = bucket.get_upper_bound();
        let cumulative_count = bucket.get_cumulative_count();

        if cumulative_count >= target {
            let bucket_count = cumulative_count - prev_count;
            if bucket_count == 0 {
                return upper_bound;
            }
            let position = (target - prev_count) as f64 / bucket_count as f64;
            return prev_bound + position * (upper_bound - prev_bound);
        }

        prev_bound = upper_bound;
        prev_count = cumulative_count;
    }

    buckets.last().map(|b| b.get_upper_bound()).unwrap_or(0.0)
}
