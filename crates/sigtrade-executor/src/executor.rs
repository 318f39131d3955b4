//! Trade executor.
//!
//! Drives one order from validation to a terminal `TradeResult`.
//!
//! # Validation (in `TradeExecutor::validate`)
//!
//! 1. Asset empty -> EmptyAsset
//! 2. Amount below minimum -> AmountBelowMinimum
//! 3. Direction not call/put -> InvalidDirection
//! 4. Expiry < 1 minute -> InvalidExpiry
//! 5. Asset not in catalog -> UnknownAsset
//! 6. No active balance -> NoActiveAccount
//!
//! Nothing is registered or sent until all checks pass.

use crate::confirmation::{ClosureOutcome, ConfirmationRegistry, PlacementOutcome};
use crate::error::{ExecutorResult, TradeError, ValidationError};
use crate::order::{expiration_timestamp, time_to_expiration, DigitalOptionOrder, PlaceOrder};
use crate::request_id::RequestIdGenerator;
use crate::sink::{DynOrderSink, SubmitResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sigtrade_core::{Direction, Signal, TradeResult};
use sigtrade_registry::{AccountState, AssetCatalog};
use sigtrade_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Unvalidated trade parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub asset: String,
    pub amount: Decimal,
    /// `call` or `put`, any case.
    pub direction: String,
    pub expiry_minutes: i64,
}

impl TradeRequest {
    pub fn from_signal(signal: &Signal, amount: Decimal) -> Self {
        Self {
            asset: signal.pair.clone(),
            amount,
            direction: signal.direction.as_lower().to_string(),
            expiry_minutes: i64::from(signal.expiry_minutes),
        }
    }

    /// Same trade with a different stake.
    pub fn with_amount(&self, amount: Decimal) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub min_amount: Decimal,
    pub placement_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::ONE,
            placement_timeout: Duration::from_secs(10),
        }
    }
}

/// Trade parameters after validation.
#[derive(Debug, Clone)]
struct ValidatedTrade {
    asset: String,
    asset_id: u32,
    amount: Decimal,
    direction: Direction,
    expiry_minutes: u32,
    balance_id: u64,
}

pub struct TradeExecutor {
    config: ExecutorConfig,
    catalog: Arc<AssetCatalog>,
    account: Arc<AccountState>,
    registry: Arc<ConfirmationRegistry>,
    sink: DynOrderSink,
    request_ids: RequestIdGenerator,
}

impl TradeExecutor {
    pub fn new(
        config: ExecutorConfig,
        catalog: Arc<AssetCatalog>,
        account: Arc<AccountState>,
        registry: Arc<ConfirmationRegistry>,
        sink: DynOrderSink,
    ) -> Self {
        let seed = account.server_time_ms();
        Self {
            config,
            catalog,
            account,
            registry,
            sink,
            request_ids: RequestIdGenerator::new(seed),
        }
    }

    pub fn registry(&self) -> &Arc<ConfirmationRegistry> {
        &self.registry
    }

    /// Execute one trade to a terminal result.
    ///
    /// Rejections and timeouts are results, not errors. Errors mean the trade
    /// never reached the brokerage (validation, transport, duplicate key).
    pub async fn execute(&self, request: &TradeRequest) -> ExecutorResult<TradeResult> {
        let trade = self.validate(request).map_err(|e| {
            Metrics::validation_failed(e.reason());
            warn!(asset = %request.asset, error = %e, "Trade validation failed");
            e
        })?;

        let server_time_ms = self.account.server_time_ms();
        let expiration = expiration_timestamp(server_time_ms, trade.expiry_minutes);
        let payload = DigitalOptionOrder::new(
            trade.balance_id,
            trade.asset_id,
            trade.amount,
            trade.direction,
            trade.expiry_minutes,
            expiration,
        )?;

        if !self.sink.is_ready() {
            Metrics::order_submitted(SubmitResult::Disconnected.label());
            warn!(asset = %trade.asset, "Order sink not ready, trade skipped");
            return Err(TradeError::Submission("transport not ready".to_string()));
        }

        let request_id = self.request_ids.next();
        self.registry.register(request_id.clone())?;

        info!(
            %request_id,
            asset = %trade.asset,
            direction = %trade.direction,
            amount = %trade.amount,
            instrument = payload.instrument_id(),
            "Submitting order"
        );

        let submitted_at = Instant::now();
        let submit = self
            .sink
            .submit(PlaceOrder {
                request_id: request_id.clone(),
                asset: trade.asset.clone(),
                expiration,
                payload,
            })
            .await;
        Metrics::order_submitted(submit.label());
        match submit {
            SubmitResult::Accepted => {}
            SubmitResult::Disconnected => {
                self.registry.abandon(&request_id);
                return Err(TradeError::Submission("transport disconnected".to_string()));
            }
            SubmitResult::Error(e) => {
                self.registry.abandon(&request_id);
                return Err(TradeError::Submission(e));
            }
        }

        let placement = self
            .registry
            .wait_for_placement(&request_id, self.config.placement_timeout)
            .await?;

        let order_id = match placement {
            PlacementOutcome::Placed(order_id) => {
                Metrics::placement("placed");
                Metrics::placement_latency(submitted_at.elapsed().as_secs_f64() * 1000.0);
                order_id
            }
            PlacementOutcome::Rejected(reason) => {
                Metrics::placement("rejected");
                warn!(%request_id, asset = %trade.asset, %reason, "Order rejected");
                return Ok(finish(TradeResult::rejected(
                    trade.asset,
                    trade.direction,
                    trade.amount,
                    reason,
                )));
            }
            PlacementOutcome::Timeout => {
                Metrics::placement("timeout");
                return Ok(finish(TradeResult::timed_out(
                    trade.asset,
                    trade.direction,
                    trade.amount,
                    None,
                )));
            }
        };

        let remaining = time_to_expiration(self.account.server_time_ms(), expiration);
        info!(%order_id, asset = %trade.asset, remaining_secs = remaining.as_secs(), "Order placed, awaiting closure");

        let result = match self.registry.wait_for_closure(order_id, remaining).await? {
            ClosureOutcome::Closed { pnl } => {
                TradeResult::settled(trade.asset, trade.direction, trade.amount, order_id, pnl)
            }
            ClosureOutcome::Timeout => TradeResult::timed_out(
                trade.asset,
                trade.direction,
                trade.amount,
                Some(order_id),
            ),
        };
        Ok(finish(result))
    }

    fn validate(&self, request: &TradeRequest) -> Result<ValidatedTrade, ValidationError> {
        let asset = request.asset.trim();
        if asset.is_empty() {
            return Err(ValidationError::EmptyAsset);
        }
        if request.amount < self.config.min_amount {
            return Err(ValidationError::AmountBelowMinimum {
                amount: request.amount,
                minimum: self.config.min_amount,
            });
        }
        let direction: Direction = request
            .direction
            .parse()
            .map_err(|_| ValidationError::InvalidDirection(request.direction.clone()))?;
        let expiry_minutes = u32::try_from(request.expiry_minutes)
            .ok()
            .filter(|m| *m >= 1)
            .ok_or(ValidationError::InvalidExpiry(request.expiry_minutes))?;
        let asset_id = self
            .catalog
            .resolve(asset)
            .map_err(|_| ValidationError::UnknownAsset(asset.to_string()))?;
        let balance_id = self
            .account
            .active_balance_id()
            .map_err(|_| ValidationError::NoActiveAccount)?;

        Ok(ValidatedTrade {
            asset: asset.to_ascii_uppercase(),
            asset_id,
            amount: request.amount,
            direction,
            expiry_minutes,
            balance_id,
        })
    }
}

fn finish(result: TradeResult) -> TradeResult {
    Metrics::trade_finished(result.outcome.label(), result.pnl.to_f64().unwrap_or(0.0));
    info!(
        asset = %result.asset,
        direction = %result.direction,
        outcome = %result.outcome,
        pnl = %result.pnl,
        "Trade finished"
    );
    result
}
