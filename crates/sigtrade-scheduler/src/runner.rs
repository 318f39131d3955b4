//! Seam between the scheduler and trade execution.

use sigtrade_core::TradeResult;
use sigtrade_executor::{BoxFuture, ExecutorResult, TradeExecutor, TradeRequest};
use std::sync::Arc;

/// Runs one trade to a terminal result.
pub trait TradeRunner: Send + Sync {
    fn run(&self, request: TradeRequest) -> BoxFuture<'_, ExecutorResult<TradeResult>>;
}

/// Arc wrapper for TradeRunner trait objects.
pub type DynTradeRunner = Arc<dyn TradeRunner>;

impl TradeRunner for TradeExecutor {
    fn run(&self, request: TradeRequest) -> BoxFuture<'_, ExecutorResult<TradeResult>> {
        Box::pin(async move { self.execute(&request).await })
    }
}
