//! Bucketing scheduler.

use crate::error::{SchedulerError, SchedulerResult};
use crate::events::SessionEvent;
use crate::report::Report;
use crate::runner::DynTradeRunner;
use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use sigtrade_core::{Clock, SessionId, Signal};
use sigtrade_executor::TradeRequest;
use sigtrade_telemetry::Metrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A signal pinned to an absolute instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSignal {
    pub at: NaiveDateTime,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    NoSignals,
    Completed(Report),
}

/// Next occurrence of `time`: today unless already passed, else tomorrow.
pub fn next_occurrence(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today < now {
        today + ChronoDuration::days(1)
    } else {
        today
    }
}

/// Group signals by instant, ascending. Input order is kept inside a bucket.
pub fn plan(
    signals: Vec<Signal>,
    now: NaiveDateTime,
) -> BTreeMap<NaiveDateTime, Vec<ScheduledSignal>> {
    let mut buckets: BTreeMap<NaiveDateTime, Vec<ScheduledSignal>> = BTreeMap::new();
    for signal in signals {
        let at = next_occurrence(now, signal.time);
        buckets
            .entry(at)
            .or_default()
            .push(ScheduledSignal { at, signal });
    }
    buckets
}

pub struct Scheduler {
    runner: DynTradeRunner,
    clock: Arc<dyn Clock>,
    amount: Decimal,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Scheduler {
    pub fn new(
        runner: DynTradeRunner,
        clock: Arc<dyn Clock>,
        amount: Decimal,
    ) -> SchedulerResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(SchedulerError::InvalidAmount(amount));
        }
        Ok(Self {
            runner,
            clock,
            amount,
            events: None,
        })
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Release every bucket on time, then wait for all trades and report.
    ///
    /// Failed trades are logged and left out of the report; they never stop
    /// the session or their siblings.
    pub async fn schedule_and_run(&self, signals: Vec<Signal>) -> SessionOutcome {
        if signals.is_empty() {
            info!("No signals to schedule");
            return SessionOutcome::NoSignals;
        }

        let session = SessionId::new();
        let signal_count = signals.len();
        let buckets = plan(signals, self.clock.now_local());
        info!(%session, buckets = buckets.len(), signals = signal_count, "Session scheduled");
        self.emit(SessionEvent::Scheduled {
            session: session.clone(),
            buckets: buckets.len(),
            signals: signal_count,
        });

        let mut launched = Vec::with_capacity(signal_count);
        for (at, bucket) in buckets {
            self.wait_until(at, bucket.len()).await;

            info!(%session, %at, signals = bucket.len(), "Releasing bucket");
            Metrics::bucket_released(bucket.len());
            self.emit(SessionEvent::Releasing {
                at,
                signals: bucket.iter().map(|s| s.signal.clone()).collect(),
            });

            for scheduled in bucket {
                let runner = self.runner.clone();
                let request = TradeRequest::from_signal(&scheduled.signal, self.amount);
                let handle = tokio::spawn(async move { runner.run(request).await });
                launched.push((scheduled.signal, handle));
            }
        }

        let (signals, handles): (Vec<_>, Vec<_>) = launched.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let mut results = Vec::with_capacity(signals.len());
        for (signal, outcome) in signals.into_iter().zip(outcomes) {
            let failure = match outcome {
                Ok(Ok(result)) => {
                    results.push(result);
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(%session, signal = %signal, error = %e, "Trade failed");
                    e.to_string()
                }
                Err(e) => {
                    error!(%session, signal = %signal, error = %e, "Trade task aborted");
                    e.to_string()
                }
            };
            self.emit(SessionEvent::TradeFailed {
                signal,
                error: failure,
            });
        }

        let report = Report::from_results(results);
        info!(
            %session,
            wins = report.wins,
            losses = report.losses,
            timeouts = report.timeouts,
            rejected = report.rejected,
            profit = %report.total_profit,
            "Session finished"
        );
        self.emit(SessionEvent::Finished {
            report: report.clone(),
        });
        SessionOutcome::Completed(report)
    }

    /// Sleep until the clock reads `at` or later.
    async fn wait_until(&self, at: NaiveDateTime, signals: usize) {
        let mut announced = false;
        loop {
            let now = self.clock.now_local();
            if now >= at {
                return;
            }
            let delay = (at - now).to_std().unwrap_or(Duration::ZERO);
            if !announced {
                debug!(%at, delay_ms = delay.as_millis() as u64, "Waiting for bucket");
                self.emit(SessionEvent::Waiting {
                    at,
                    delay,
                    signals,
                });
                announced = true;
            }
            tokio::time::sleep(delay).await;
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TradeRunner;
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use sigtrade_core::{AnchoredClock, Direction, OrderId, TradeResult};
    use sigtrade_executor::{BoxFuture, ExecutorResult, TradeError};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn signal(h: u32, m: u32, pair: &str, direction: Direction) -> Signal {
        Signal::new(hm(h, m), pair, direction, 5)
    }

    /// Records launch times and settles each trade after `hold`.
    struct Recorder {
        clock: Arc<dyn Clock>,
        hold: Duration,
        launches: Mutex<Vec<(String, NaiveDateTime)>>,
    }

    impl TradeRunner for Recorder {
        fn run(&self, request: TradeRequest) -> BoxFuture<'_, ExecutorResult<TradeResult>> {
            Box::pin(async move {
                self.launches
                    .lock()
                    .push((request.asset.clone(), self.clock.now_local()));
                tokio::time::sleep(self.hold).await;
                if request.asset == "FAIL" {
                    return Err(TradeError::Submission("transport disconnected".to_string()));
                }
                let pnl = if request.direction == "call" {
                    dec!(10)
                } else {
                    dec!(-5)
                };
                Ok(TradeResult::settled(
                    request.asset,
                    request.direction.parse().unwrap(),
                    request.amount,
                    OrderId::new(1),
                    pnl,
                ))
            })
        }
    }

    fn setup(start: NaiveDateTime, hold: Duration) -> (Arc<Recorder>, Scheduler) {
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(start));
        let recorder = Arc::new(Recorder {
            clock: clock.clone(),
            hold,
            launches: Mutex::new(Vec::new()),
        });
        let scheduler = Scheduler::new(recorder.clone(), clock, dec!(1)).unwrap();
        (recorder, scheduler)
    }

    #[test]
    fn test_next_occurrence() {
        let now = day().and_hms_opt(3, 39, 30).unwrap();
        assert_eq!(next_occurrence(now, hm(3, 40)), day().and_time(hm(3, 40)));
        assert_eq!(
            next_occurrence(now, hm(3, 39)),
            day().succ_opt().unwrap().and_time(hm(3, 39))
        );
        let exact = day().and_hms_opt(3, 40, 0).unwrap();
        assert_eq!(next_occurrence(exact, hm(3, 40)), exact);
    }

    #[test]
    fn test_plan_buckets_ascending() {
        let now = day().and_hms_opt(12, 0, 0).unwrap();
        let buckets = plan(
            vec![
                signal(13, 0, "B", Direction::Put),
                signal(3, 40, "TOMORROW", Direction::Call),
                signal(12, 30, "A1", Direction::Call),
                signal(12, 30, "A2", Direction::Put),
            ],
            now,
        );
        let keys: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                day().and_time(hm(12, 30)),
                day().and_time(hm(13, 0)),
                day().succ_opt().unwrap().and_time(hm(3, 40)),
            ]
        );
        let first: Vec<_> = buckets[&keys[0]]
            .iter()
            .map(|s| s.signal.pair.as_str())
            .collect();
        assert_eq!(first, vec!["A1", "A2"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (_, scheduler) = setup(day().and_hms_opt(3, 0, 0).unwrap(), Duration::ZERO);
        assert_eq!(
            scheduler.schedule_and_run(Vec::new()).await,
            SessionOutcome::NoSignals
        );
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new(day().and_hms_opt(3, 0, 0).unwrap()));
        let recorder = Arc::new(Recorder {
            clock: clock.clone(),
            hold: Duration::ZERO,
            launches: Mutex::new(Vec::new()),
        });
        assert!(matches!(
            Scheduler::new(recorder, clock, dec!(0)),
            Err(SchedulerError::InvalidAmount(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buckets_release_on_time_without_waiting_for_trades() {
        let start = day().and_hms_opt(3, 39, 0).unwrap();
        // Trades outlive the gap between buckets.
        let (recorder, scheduler) = setup(start, Duration::from_secs(300));

        let outcome = scheduler
            .schedule_and_run(vec![
                signal(3, 41, "LATER", Direction::Call),
                signal(3, 40, "EURAUD", Direction::Call),
                signal(3, 40, "GBPUSD", Direction::Put),
            ])
            .await;

        let launches = recorder.launches.lock().clone();
        assert_eq!(
            launches,
            vec![
                ("EURAUD".to_string(), day().and_time(hm(3, 40))),
                ("GBPUSD".to_string(), day().and_time(hm(3, 40))),
                ("LATER".to_string(), day().and_time(hm(3, 41))),
            ]
        );

        let SessionOutcome::Completed(report) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 1);
        assert_eq!(report.total_profit, dec!(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trade_is_isolated() {
        let start = day().and_hms_opt(3, 39, 59).unwrap();
        let (_, scheduler) = setup(start, Duration::from_secs(1));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = scheduler.with_events(tx);

        let outcome = scheduler
            .schedule_and_run(vec![
                signal(3, 40, "EURAUD", Direction::Call),
                signal(3, 40, "FAIL", Direction::Put),
                signal(3, 40, "GBPUSD", Direction::Put),
            ])
            .await;

        let SessionOutcome::Completed(report) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(report.len(), 2);
        assert_eq!(report.to_string().lines().last(), Some("Total Profit: $5.00"));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], SessionEvent::Scheduled { buckets: 1, signals: 3, .. }));
        assert!(matches!(
            events[1],
            SessionEvent::Waiting { delay, signals: 3, .. } if delay == Duration::from_secs(1)
        ));
        assert!(matches!(events[2], SessionEvent::Releasing { .. }));
        assert!(matches!(
            &events[3],
            SessionEvent::TradeFailed { signal, .. } if signal.pair == "FAIL"
        ));
        assert!(matches!(events[4], SessionEvent::Finished { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_passed_time_runs_tomorrow() {
        let start = day().and_hms_opt(3, 41, 0).unwrap();
        let (recorder, scheduler) = setup(start, Duration::ZERO);
        scheduler
            .schedule_and_run(vec![signal(3, 40, "EURAUD", Direction::Call)])
            .await;
        assert_eq!(
            recorder.launches.lock()[0].1,
            day().succ_opt().unwrap().and_time(hm(3, 40))
        );
    }
}
