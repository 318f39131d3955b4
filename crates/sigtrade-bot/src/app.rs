//! Main application orchestration.
//!
//! One `run` is one session:
//! - connect the push channel and route its messages
//! - wait for an active account balance
//! - schedule the signals through the gale-wrapped trade executor
//! - log the session summary and return the report

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::push_router::PushRouter;
use sigtrade_core::{Clock, Signal, SystemClock};
use sigtrade_executor::{ConfirmationRegistry, DynOrderSink, TradeExecutor, WsOrderSink};
use sigtrade_registry::{AccountState, AssetCatalog};
use sigtrade_scheduler::{DynTradeRunner, GaleExecutor, Scheduler, SessionEvent, SessionOutcome};
use sigtrade_telemetry::{Metrics, SessionStatsReporter};
use sigtrade_ws::{ConnectionManager, PushMessage, WsWriteHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const PUSH_CHANNEL_CAPACITY: usize = 1000;

/// How long the transport gets to close after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Main application.
pub struct Application {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    catalog: Arc<AssetCatalog>,
    account: Arc<AccountState>,
    registry: Arc<ConfirmationRegistry>,
    stats: SessionStatsReporter,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create with an injected clock for scheduling and expiration math.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        config.validate()?;

        let catalog = Arc::new(AssetCatalog::from_map(
            config.assets.iter().map(|(name, id)| (name, *id)),
        ));
        if catalog.is_empty() {
            warn!("No assets configured, every trade will fail validation");
        }

        let account = Arc::new(AccountState::new(
            config.account.mode,
            config.account.balance_id,
            clock.clone(),
        ));
        let registry = Arc::new(ConfirmationRegistry::new(config.confirmation_config()));

        Ok(Self {
            config,
            clock,
            catalog,
            account,
            registry,
            stats: SessionStatsReporter::new(),
        })
    }

    pub fn account(&self) -> &Arc<AccountState> {
        &self.account
    }

    pub fn registry(&self) -> &Arc<ConfirmationRegistry> {
        &self.registry
    }

    /// Run one session over `signals` until every trade is finished.
    ///
    /// Ctrl-C ends the session early with `AppError::Shutdown`.
    pub async fn run(self, signals: Vec<Signal>) -> AppResult<SessionOutcome> {
        if signals.is_empty() {
            info!("No valid signals to process");
            return Ok(SessionOutcome::NoSignals);
        }

        info!(
            signals = signals.len(),
            mode = ?self.config.account.mode,
            ws_url = %self.config.ws_url,
            "Starting session"
        );

        let (push_tx, push_rx) = mpsc::channel::<PushMessage>(PUSH_CHANNEL_CAPACITY);
        let connection = Arc::new(ConnectionManager::new(
            self.config.connection_config(),
            push_tx,
        ));

        let connection_clone = connection.clone();
        let mut ws_handle = tokio::spawn(async move {
            if let Err(e) = connection_clone.connect().await {
                error!(?e, "Push channel connection failed");
            }
        });

        let router = PushRouter::new(self.account.clone(), self.registry.clone());
        let router_handle = tokio::spawn(router.run(push_rx));

        let result = tokio::select! {
            outcome = self.session(signals, connection.write_handle()) => outcome,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Err(AppError::Shutdown)
            }
        };

        connection.shutdown();
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut ws_handle).await.is_err() {
            warn!("Push channel did not close in time");
            ws_handle.abort();
        }
        router_handle.abort();

        self.finish();
        result
    }

    async fn session(
        &self,
        signals: Vec<Signal>,
        write_handle: WsWriteHandle,
    ) -> AppResult<SessionOutcome> {
        let balance_id = self.account.wait_ready(self.config.ready_timeout()).await?;
        info!(balance_id, "Account ready");

        let sink: DynOrderSink = Arc::new(WsOrderSink::new(write_handle));
        let executor = Arc::new(TradeExecutor::new(
            self.config.executor_config(),
            self.catalog.clone(),
            self.account.clone(),
            self.registry.clone(),
            sink,
        ));
        let runner: DynTradeRunner =
            Arc::new(GaleExecutor::new(executor, self.config.gale_config())?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let logger = tokio::spawn(log_events(events_rx));

        let scheduler = Scheduler::new(
            runner,
            self.clock.clone(),
            self.config.trading.default_amount,
        )?
        .with_events(events_tx);
        let outcome = scheduler.schedule_and_run(signals).await;

        // Closing the event channel lets the logger drain and stop.
        drop(scheduler);
        let _ = logger.await;

        Ok(outcome)
    }

    fn finish(&self) {
        info!("Final statistics summary:");
        self.stats.output_summary();

        let Some(path) = &self.config.telemetry.metrics_dump_path else {
            return;
        };
        match Metrics::gather_text() {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    warn!(%path, error = %e, "Failed to write metrics dump");
                } else {
                    info!(%path, "Metrics written");
                }
            }
            Err(e) => warn!(error = %e, "Failed to gather metrics"),
        }
    }
}

/// Log session progress as it happens.
async fn log_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Scheduled {
                session,
                buckets,
                signals,
            } => {
                info!(%session, buckets, signals, "Found {signals} signals, scheduling trades");
            }
            SessionEvent::Waiting { at, delay, signals } => {
                info!(%at, wait_secs = delay.as_secs(), signals, "Waiting for next bucket");
            }
            SessionEvent::Releasing { at, signals } => {
                let lines: Vec<String> = signals.iter().map(Signal::to_line).collect();
                info!(%at, signals = ?lines, "Executing trades");
            }
            SessionEvent::TradeFailed { signal, error } => {
                warn!(signal = %signal, %error, "Trade failed");
            }
            SessionEvent::Finished { report } => {
                info!(
                    trades = report.len(),
                    wins = report.wins,
                    losses = report.losses,
                    profit = %report.total_profit,
                    "All trades finished"
                );
            }
        }
    }
}
