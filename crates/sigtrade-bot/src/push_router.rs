//! Routes decoded pushes to their owners.
//!
//! Order events go to the confirmation registry, account pushes to the
//! account state.

use sigtrade_executor::{ConfirmationRegistry, DispatchOutcome};
use sigtrade_registry::AccountState;
use sigtrade_telemetry::Metrics;
use sigtrade_ws::PushMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

pub struct PushRouter {
    account: Arc<AccountState>,
    registry: Arc<ConfirmationRegistry>,
}

impl PushRouter {
    pub fn new(account: Arc<AccountState>, registry: Arc<ConfirmationRegistry>) -> Self {
        Self { account, registry }
    }

    /// Apply one push.
    pub fn route(&self, msg: PushMessage) {
        Metrics::push_received(msg.kind());
        match msg {
            PushMessage::TimeSync { server_time_ms } => {
                trace!(server_time_ms, "Time sync");
                self.account.sync_server_time(server_time_ms);
            }
            PushMessage::Profile { balances } => {
                let active = self.account.apply_profile(&balances);
                info!(balances = balances.len(), ?active, "Profile received");
            }
            PushMessage::Order(event) => {
                let outcome = self.registry.dispatch(&event);
                if outcome != DispatchOutcome::Applied {
                    debug!(kind = event.kind(), ?outcome, "Order push not applied");
                }
            }
        }
    }

    /// Route until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<PushMessage>) {
        while let Some(msg) = rx.recv().await {
            self.route(msg);
        }
        debug!("Push channel closed, router stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sigtrade_core::{
        AnchoredClock, Balance, OrderEvent, OrderId, PlacementResult, PositionStatus, RequestId,
    };
    use sigtrade_executor::OrderPhase;
    use sigtrade_registry::AccountMode;

    fn router() -> (PushRouter, Arc<AccountState>, Arc<ConfirmationRegistry>) {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(3, 39, 0)
            .unwrap();
        let account = Arc::new(AccountState::new(
            AccountMode::Practice,
            None,
            Arc::new(AnchoredClock::new(start)),
        ));
        let registry = Arc::new(ConfirmationRegistry::default());
        (
            PushRouter::new(account.clone(), registry.clone()),
            account,
            registry,
        )
    }

    #[tokio::test]
    async fn test_account_pushes() {
        let (router, account, _) = router();
        router.route(PushMessage::TimeSync {
            server_time_ms: 1_772_422_805_000,
        });
        router.route(PushMessage::Profile {
            balances: vec![
                Balance {
                    id: 11,
                    kind: 1,
                    currency: None,
                },
                Balance {
                    id: 44,
                    kind: 4,
                    currency: Some("USD".to_string()),
                },
            ],
        });

        assert!(account.is_time_synced());
        assert_eq!(account.active_balance_id().unwrap(), 44);
    }

    #[tokio::test]
    async fn test_order_pushes_reach_registry() {
        let (router, _, registry) = router();
        let key = RequestId::new("7");
        registry.register(key.clone()).unwrap();

        router.route(PushMessage::Order(OrderEvent::Placement {
            request_id: key.clone(),
            result: PlacementResult::Accepted(OrderId::new(900)),
        }));
        router.route(PushMessage::Order(OrderEvent::Closure {
            order_id: OrderId::new(900),
            status: PositionStatus::Closed,
            pnl: dec!(0.85),
        }));

        assert_eq!(
            registry.phase(&key),
            Some(OrderPhase::Closed {
                order_id: OrderId::new(900),
                pnl: dec!(0.85),
            })
        );
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let (router, account, _) = router();
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(router.run(rx));

        tx.send(PushMessage::TimeSync {
            server_time_ms: 1_772_422_805_000,
        })
        .await
        .unwrap();
        drop(tx);

        handle.await.unwrap();
        assert!(account.is_time_synced());
    }
}
