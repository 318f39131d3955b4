//! Gale (martingale) follow-ups.
//!
//! After a LOSS the same trade is placed again with the stake multiplied, up
//! to `max_gales` times. WIN, TIMEOUT and REJECTED end the chain. The final
//! result carries the last attempt's outcome, the number of follow-ups and
//! the pnl summed over every attempt.

use crate::error::{SchedulerError, SchedulerResult};
use crate::runner::{DynTradeRunner, TradeRunner};
use rust_decimal::Decimal;
use sigtrade_core::TradeResult;
use sigtrade_executor::{BoxFuture, ExecutorResult, TradeRequest};
use sigtrade_telemetry::Metrics;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaleConfig {
    /// Follow-ups allowed after the first attempt.
    pub max_gales: u32,
    pub multiplier: Decimal,
}

impl Default for GaleConfig {
    fn default() -> Self {
        Self {
            max_gales: 0,
            multiplier: Decimal::TWO,
        }
    }
}

pub struct GaleExecutor {
    inner: DynTradeRunner,
    config: GaleConfig,
}

impl GaleExecutor {
    pub fn new(inner: DynTradeRunner, config: GaleConfig) -> SchedulerResult<Self> {
        if config.multiplier < Decimal::ONE {
            return Err(SchedulerError::InvalidGaleMultiplier(config.multiplier));
        }
        Ok(Self { inner, config })
    }

    async fn run_chain(&self, request: TradeRequest) -> ExecutorResult<TradeResult> {
        let mut last = self.inner.run(request.clone()).await?;
        let mut total_pnl = last.pnl;
        let mut gales = 0;
        let mut amount = request.amount;

        while last.is_loss() && gales < self.config.max_gales {
            amount *= self.config.multiplier;
            gales += 1;
            Metrics::gale_attempt();
            info!(asset = %request.asset, gale = gales, %amount, "Placing gale");

            match self.inner.run(request.with_amount(amount)).await {
                Ok(result) if result.outcome.is_settled() => {
                    total_pnl += result.pnl;
                    last = result;
                }
                Ok(result) => {
                    total_pnl += result.pnl;
                    warn!(asset = %request.asset, gale = gales, outcome = %result.outcome, "Gale did not settle, keeping previous result");
                    gales -= 1;
                    break;
                }
                Err(e) => {
                    warn!(asset = %request.asset, gale = gales, error = %e, "Gale failed, keeping previous result");
                    gales -= 1;
                    break;
                }
            }
        }

        last.pnl = total_pnl;
        last.gales = gales;
        Ok(last)
    }
}

impl TradeRunner for GaleExecutor {
    fn run(&self, request: TradeRequest) -> BoxFuture<'_, ExecutorResult<TradeResult>> {
        Box::pin(self.run_chain(request))
    }
}
