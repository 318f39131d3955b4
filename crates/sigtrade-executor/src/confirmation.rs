//! Confirmation registry.
//!
//! Correlates the unordered push stream with the trades waiting on it. Every
//! submission owns one slot holding a `watch` channel of its `OrderPhase`:
//!
//! ```text
//! AwaitingPlacement ──placement(id)──▶ Placed(id) ──closure──▶ Closed
//!        │
//!        ├──placement(reason)──▶ Rejected
//!        └──deadline──▶ Expired
//! ```
//!
//! Slots are indexed by request id until the placement is read, and by order
//! id from the placement push until the closure is read. Phases only move
//! forward; late or repeated pushes are ignored.
//!
//! The slot and its sender exist from `register` on, so a push that lands
//! before the trade starts waiting is kept as the channel's current value.

use crate::error::ConfirmationError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sigtrade_core::{OrderEvent, OrderId, PlacementResult, RequestId};
use sigtrade_telemetry::Metrics;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Lifecycle of one submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPhase {
    AwaitingPlacement,
    Placed(OrderId),
    Rejected(String),
    Closed { order_id: OrderId, pnl: Decimal },
    /// The placement wait gave up; later placement pushes are stale.
    Expired,
}

impl OrderPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Closed { .. } | Self::Expired)
    }
}

/// Result of waiting for a placement acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed(OrderId),
    Rejected(String),
    Timeout,
}

/// Result of waiting for a position to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureOutcome {
    Closed { pnl: Decimal },
    Timeout,
}

/// What `dispatch` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A slot moved forward.
    Applied,
    /// The event matched a slot but could not move it (duplicate, stale,
    /// or a non-closing position update).
    Ignored,
    /// No slot is registered under the event's key.
    UnknownKey,
    /// Closure for an order id not seen yet, held for a later placement.
    Parked,
}

#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Added to the time to expiry when waiting for closure.
    pub closure_grace: Duration,
    /// How long an early closure is held.
    pub early_closure_ttl: Duration,
    pub early_closure_capacity: usize,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            closure_grace: Duration::from_secs(3),
            early_closure_ttl: Duration::from_secs(30),
            early_closure_capacity: 1024,
        }
    }
}

struct Slot {
    request_id: RequestId,
    tx: watch::Sender<OrderPhase>,
}

impl Slot {
    fn phase(&self) -> OrderPhase {
        self.tx.borrow().clone()
    }
}

struct ParkedClosure {
    order_id: OrderId,
    pnl: Decimal,
    parked_at: Instant,
}

pub struct ConfirmationRegistry {
    config: ConfirmationConfig,
    by_request: DashMap<RequestId, Arc<Slot>>,
    by_order: DashMap<OrderId, Arc<Slot>>,
    parked: Mutex<VecDeque<ParkedClosure>>,
}

impl Default for ConfirmationRegistry {
    fn default() -> Self {
        Self::new(ConfirmationConfig::default())
    }
}

impl ConfirmationRegistry {
    pub fn new(config: ConfirmationConfig) -> Self {
        Self {
            config,
            by_request: DashMap::new(),
            by_order: DashMap::new(),
            parked: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Create an `AwaitingPlacement` slot for `key`.
    ///
    /// # Errors
    /// `DuplicateKey` while an unresolved slot holds the key.
    pub fn register(&self, key: RequestId) -> Result<(), ConfirmationError> {
        match self.by_request.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().phase().is_terminal() {
                    return Err(ConfirmationError::DuplicateKey(key));
                }
                entry.insert(new_slot(key));
            }
            Entry::Vacant(entry) => {
                entry.insert(new_slot(key));
            }
        }
        self.update_gauge();
        Ok(())
    }

    /// Apply a decoded order push.
    pub fn dispatch(&self, event: &OrderEvent) -> DispatchOutcome {
        match event {
            OrderEvent::Placement { request_id, result } => {
                self.apply_placement(request_id, result)
            }
            OrderEvent::Closure {
                order_id,
                status,
                pnl,
            } => {
                if !status.is_closed() {
                    trace!(%order_id, %status, "Position update ignored");
                    Metrics::push_dropped("not_closed");
                    return DispatchOutcome::Ignored;
                }
                self.apply_closure(*order_id, *pnl)
            }
        }
    }

    fn apply_placement(&self, request_id: &RequestId, result: &PlacementResult) -> DispatchOutcome {
        let Some(slot) = self.by_request.get(request_id).map(|s| s.clone()) else {
            debug!(%request_id, "Placement for unknown request id");
            Metrics::push_dropped("unknown_request");
            return DispatchOutcome::UnknownKey;
        };
        self.place_slot(&slot, result)
    }

    /// Move a slot out of `AwaitingPlacement`.
    ///
    /// The order id is indexed before the waiter is woken, so the waiter can
    /// look it up as soon as it sees `Placed`. If the slot already moved on
    /// (expired or resolved) the index entry is taken back.
    fn place_slot(&self, slot: &Arc<Slot>, result: &PlacementResult) -> DispatchOutcome {
        let request_id = &slot.request_id;
        let (next, order_id) = match result {
            PlacementResult::Accepted(id) => (OrderPhase::Placed(*id), Some(*id)),
            PlacementResult::Rejected(reason) => (OrderPhase::Rejected(reason.clone()), None),
        };
        let indexed = order_id.is_some_and(|id| self.index_order(id, slot));

        let applied = slot.tx.send_if_modified(|phase| {
            if *phase == OrderPhase::AwaitingPlacement {
                *phase = next.clone();
                true
            } else {
                false
            }
        });
        if !applied {
            if let (true, Some(order_id)) = (indexed, order_id) {
                self.by_order
                    .remove_if(&order_id, |_, current| Arc::ptr_eq(current, slot));
            }
            debug!(%request_id, phase = ?slot.phase(), "Placement for already resolved request");
            Metrics::push_dropped("stale");
            self.update_gauge();
            return DispatchOutcome::Ignored;
        }

        match order_id {
            Some(order_id) => {
                debug!(%request_id, %order_id, "Order placed");
                self.claim_parked(slot, order_id);
            }
            None => debug!(%request_id, "Order rejected"),
        }
        self.update_gauge();
        DispatchOutcome::Applied
    }

    /// Index `slot` under `order_id`. False when it already was.
    fn index_order(&self, order_id: OrderId, slot: &Arc<Slot>) -> bool {
        match self.by_order.entry(order_id) {
            Entry::Occupied(entry) if Arc::ptr_eq(entry.get(), slot) => false,
            Entry::Occupied(mut entry) => {
                entry.insert(slot.clone());
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(slot.clone());
                true
            }
        }
    }

    fn apply_closure(&self, order_id: OrderId, pnl: Decimal) -> DispatchOutcome {
        let Some(slot) = self.by_order.get(&order_id).map(|s| s.clone()) else {
            self.park(order_id, pnl);
            return DispatchOutcome::Parked;
        };
        if close_slot(&slot, order_id, pnl) {
            debug!(%order_id, %pnl, "Order closed");
            return DispatchOutcome::Applied;
        }
        if slot.phase() == OrderPhase::AwaitingPlacement {
            // Indexed but the placement has not been applied yet.
            self.park(order_id, pnl);
            self.claim_parked(&slot, order_id);
            return DispatchOutcome::Parked;
        }
        Metrics::push_dropped("stale");
        DispatchOutcome::Ignored
    }

    /// Close a placed slot from a parked closure, if one is waiting.
    fn claim_parked(&self, slot: &Slot, order_id: OrderId) {
        if slot.phase() != OrderPhase::Placed(order_id) {
            return;
        }
        if let Some(pnl) = self.take_parked(order_id) {
            debug!(%order_id, %pnl, "Applying early closure");
            close_slot(slot, order_id, pnl);
        }
    }

    /// Wait until `key` is placed or rejected, at most `timeout`.
    ///
    /// The request id is released on return; a placed order stays tracked
    /// under its order id for `wait_for_closure`.
    pub async fn wait_for_placement(
        &self,
        key: &RequestId,
        timeout: Duration,
    ) -> Result<PlacementOutcome, ConfirmationError> {
        let slot = self
            .by_request
            .get(key)
            .map(|s| s.clone())
            .ok_or_else(|| ConfirmationError::UnknownKey(key.clone()))?;
        let mut rx = slot.tx.subscribe();

        let resolved = match tokio::time::timeout(
            timeout,
            rx.wait_for(|phase| *phase != OrderPhase::AwaitingPlacement),
        )
        .await
        {
            Ok(Ok(phase)) => Some(phase.clone()),
            _ => None,
        };

        self.by_request.remove(key);
        let outcome = match resolved {
            Some(OrderPhase::Placed(order_id)) | Some(OrderPhase::Closed { order_id, .. }) => {
                PlacementOutcome::Placed(order_id)
            }
            Some(OrderPhase::Rejected(reason)) => PlacementOutcome::Rejected(reason),
            Some(OrderPhase::AwaitingPlacement) | Some(OrderPhase::Expired) | None => {
                let expired = slot.tx.send_if_modified(|phase| {
                    if *phase == OrderPhase::AwaitingPlacement {
                        *phase = OrderPhase::Expired;
                        true
                    } else {
                        false
                    }
                });
                // Otherwise a placement landed after the deadline fired and
                // has already indexed its order id.
                if !expired {
                    if let OrderPhase::Placed(order_id) | OrderPhase::Closed { order_id, .. } =
                        slot.phase()
                    {
                        self.by_order.remove(&order_id);
                    }
                }
                warn!(request_id = %key, timeout_ms = timeout.as_millis() as u64, "Placement timed out");
                PlacementOutcome::Timeout
            }
        };
        self.update_gauge();
        Ok(outcome)
    }

    /// Wait until `order_id` closes, at most `time_to_expiry` plus the grace
    /// period. The order is released on return.
    pub async fn wait_for_closure(
        &self,
        order_id: OrderId,
        time_to_expiry: Duration,
    ) -> Result<ClosureOutcome, ConfirmationError> {
        let slot = self
            .by_order
            .get(&order_id)
            .map(|s| s.clone())
            .ok_or(ConfirmationError::UnknownOrder(order_id))?;
        let mut rx = slot.tx.subscribe();
        let deadline = time_to_expiry + self.config.closure_grace;

        let closed = match tokio::time::timeout(
            deadline,
            rx.wait_for(|phase| matches!(phase, OrderPhase::Closed { .. })),
        )
        .await
        {
            Ok(Ok(phase)) => match &*phase {
                OrderPhase::Closed { pnl, .. } => Some(*pnl),
                _ => None,
            },
            _ => None,
        };

        self.by_order.remove(&order_id);
        self.update_gauge();
        Ok(match closed {
            Some(pnl) => ClosureOutcome::Closed { pnl },
            None => {
                warn!(%order_id, deadline_ms = deadline.as_millis() as u64, "Closure timed out");
                ClosureOutcome::Timeout
            }
        })
    }

    /// Drop a slot whose submission never went out.
    pub fn abandon(&self, key: &RequestId) {
        if let Some((_, slot)) = self.by_request.remove(key) {
            if let OrderPhase::Placed(order_id) = slot.phase() {
                self.by_order.remove(&order_id);
            }
            debug!(request_id = %key, "Slot abandoned");
        }
        self.update_gauge();
    }

    /// Current phase of a slot still tracked by request id.
    pub fn phase(&self, key: &RequestId) -> Option<OrderPhase> {
        self.by_request.get(key).map(|s| s.phase())
    }

    /// Current phase of a slot tracked by order id.
    pub fn order_phase(&self, order_id: OrderId) -> Option<OrderPhase> {
        self.by_order.get(&order_id).map(|s| s.phase())
    }

    pub fn is_tracked(&self, key: &RequestId) -> bool {
        self.by_request.contains_key(key)
    }

    /// Number of distinct orders still tracked.
    pub fn pending_count(&self) -> usize {
        let placed_only = self
            .by_order
            .iter()
            .filter(|e| !self.by_request.contains_key(&e.value().request_id))
            .count();
        self.by_request.len() + placed_only
    }

    pub fn parked_count(&self) -> usize {
        let mut parked = self.parked.lock();
        self.purge_expired(&mut parked);
        parked.len()
    }

    fn park(&self, order_id: OrderId, pnl: Decimal) {
        let mut parked = self.parked.lock();
        self.purge_expired(&mut parked);
        if parked.len() >= self.config.early_closure_capacity {
            parked.pop_front();
            Metrics::push_dropped("parked_overflow");
        }
        debug!(%order_id, %pnl, "Closure for unknown order parked");
        parked.push_back(ParkedClosure {
            order_id,
            pnl,
            parked_at: Instant::now(),
        });
    }

    fn take_parked(&self, order_id: OrderId) -> Option<Decimal> {
        let mut parked = self.parked.lock();
        self.purge_expired(&mut parked);
        let idx = parked.iter().position(|p| p.order_id == order_id)?;
        parked.remove(idx).map(|p| p.pnl)
    }

    fn purge_expired(&self, parked: &mut VecDeque<ParkedClosure>) {
        let ttl = self.config.early_closure_ttl;
        while parked
            .front()
            .is_some_and(|p| p.parked_at.elapsed() >= ttl)
        {
            if let Some(expired) = parked.pop_front() {
                debug!(order_id = %expired.order_id, "Parked closure expired");
                Metrics::push_dropped("parked_expired");
            }
        }
    }

    fn update_gauge(&self) {
        Metrics::pending_confirmations(self.pending_count());
    }
}

fn new_slot(request_id: RequestId) -> Arc<Slot> {
    let (tx, _) = watch::channel(OrderPhase::AwaitingPlacement);
    Arc::new(Slot { request_id, tx })
}

/// `Placed(order_id)` to `Closed`. Returns false for any other phase.
fn close_slot(slot: &Slot, order_id: OrderId, pnl: Decimal) -> bool {
    slot.tx.send_if_modified(|phase| {
        if *phase == OrderPhase::Placed(order_id) {
            *phase = OrderPhase::Closed { order_id, pnl };
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sigtrade_core::PositionStatus;
    use tokio_test::{assert_pending, assert_ready};

    fn placed(key: &str, id: u64) -> OrderEvent {
        OrderEvent::Placement {
            request_id: RequestId::new(key),
            result: PlacementResult::Accepted(OrderId::new(id)),
        }
    }

    fn rejected(key: &str, reason: &str) -> OrderEvent {
        OrderEvent::Placement {
            request_id: RequestId::new(key),
            result: PlacementResult::Rejected(reason.to_string()),
        }
    }

    fn closed(id: u64, pnl: Decimal) -> OrderEvent {
        OrderEvent::Closure {
            order_id: OrderId::new(id),
            status: PositionStatus::Closed,
            pnl,
        }
    }

    #[test]
    fn test_duplicate_register() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("1");
        registry.register(key.clone()).unwrap();
        assert_eq!(
            registry.register(key.clone()),
            Err(ConfirmationError::DuplicateKey(key))
        );
    }

    #[test]
    fn test_register_after_terminal_slot() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("1");
        registry.register(key.clone()).unwrap();
        registry.dispatch(&rejected("1", "market closed"));
        assert_eq!(
            registry.phase(&key),
            Some(OrderPhase::Rejected("market closed".to_string()))
        );
        registry.register(key.clone()).unwrap();
        assert_eq!(registry.phase(&key), Some(OrderPhase::AwaitingPlacement));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("7");
        registry.register(key.clone()).unwrap();
        assert_eq!(registry.phase(&key), Some(OrderPhase::AwaitingPlacement));
        assert_eq!(registry.pending_count(), 1);

        assert_eq!(registry.dispatch(&placed("7", 900)), DispatchOutcome::Applied);
        assert_eq!(
            registry.phase(&key),
            Some(OrderPhase::Placed(OrderId::new(900)))
        );
        assert_eq!(registry.pending_count(), 1);

        let placement = registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(placement, PlacementOutcome::Placed(OrderId::new(900)));
        assert!(!registry.is_tracked(&key));

        assert_eq!(registry.dispatch(&closed(900, dec!(10))), DispatchOutcome::Applied);
        assert_eq!(
            registry.order_phase(OrderId::new(900)),
            Some(OrderPhase::Closed {
                order_id: OrderId::new(900),
                pnl: dec!(10)
            })
        );

        let closure = registry
            .wait_for_closure(OrderId::new(900), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(closure, ClosureOutcome::Closed { pnl: dec!(10) });
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_is_woken_by_dispatch() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("w");
        registry.register(key.clone()).unwrap();

        let mut wait =
            tokio_test::task::spawn(registry.wait_for_placement(&key, Duration::from_secs(10)));
        assert_pending!(wait.poll());

        registry.dispatch(&placed("w", 5));
        assert!(wait.is_woken());
        let outcome = assert_ready!(wait.poll()).unwrap();
        assert_eq!(outcome, PlacementOutcome::Placed(OrderId::new(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_timeout_releases_key() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("t");
        registry.register(key.clone()).unwrap();

        let started = Instant::now();
        let outcome = registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, PlacementOutcome::Timeout);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert!(!registry.is_tracked(&key));

        // A late acknowledgement finds nothing.
        assert_eq!(registry.dispatch(&placed("t", 1)), DispatchOutcome::UnknownKey);
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_racing_the_deadline_is_not_indexed() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("late");
        registry.register(key.clone()).unwrap();
        // Dispatch already fetched the slot when the deadline fires.
        let slot = registry.by_request.get(&key).map(|s| s.clone()).unwrap();

        let outcome = registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome, PlacementOutcome::Timeout);
        assert_eq!(slot.phase(), OrderPhase::Expired);

        let accepted = PlacementResult::Accepted(OrderId::new(5));
        assert_eq!(registry.place_slot(&slot, &accepted), DispatchOutcome::Ignored);
        assert!(registry.order_phase(OrderId::new(5)).is_none());
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_closure_between_index_and_placement_is_kept() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("x");
        registry.register(key.clone()).unwrap();
        let slot = registry.by_request.get(&key).map(|s| s.clone()).unwrap();

        assert!(registry.index_order(OrderId::new(8), &slot));
        assert_eq!(registry.dispatch(&closed(8, dec!(2))), DispatchOutcome::Parked);

        let accepted = PlacementResult::Accepted(OrderId::new(8));
        assert_eq!(registry.place_slot(&slot, &accepted), DispatchOutcome::Applied);
        assert_eq!(
            registry.order_phase(OrderId::new(8)),
            Some(OrderPhase::Closed {
                order_id: OrderId::new(8),
                pnl: dec!(2)
            })
        );
        assert_eq!(registry.parked_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_resolves_wait() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("r");
        registry.register(key.clone()).unwrap();
        registry.dispatch(&rejected("r", "insufficient funds"));

        let outcome = registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PlacementOutcome::Rejected("insufficient funds".to_string())
        );
        assert!(!registry.is_tracked(&key));
    }

    #[test]
    fn test_phases_only_move_forward() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("f");
        registry.register(key.clone()).unwrap();
        registry.dispatch(&placed("f", 1));

        assert_eq!(registry.dispatch(&placed("f", 2)), DispatchOutcome::Ignored);
        assert_eq!(
            registry.dispatch(&rejected("f", "late")),
            DispatchOutcome::Ignored
        );
        assert_eq!(registry.phase(&key), Some(OrderPhase::Placed(OrderId::new(1))));
        assert!(registry.order_phase(OrderId::new(2)).is_none());
    }

    #[test]
    fn test_open_position_update_is_ignored() {
        let registry = ConfirmationRegistry::default();
        registry.register(RequestId::new("o")).unwrap();
        registry.dispatch(&placed("o", 3));

        let update = OrderEvent::Closure {
            order_id: OrderId::new(3),
            status: PositionStatus::Open,
            pnl: dec!(0.4),
        };
        assert_eq!(registry.dispatch(&update), DispatchOutcome::Ignored);
        assert_eq!(
            registry.order_phase(OrderId::new(3)),
            Some(OrderPhase::Placed(OrderId::new(3)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_timeout_includes_grace() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("c");
        registry.register(key.clone()).unwrap();
        registry.dispatch(&placed("c", 44));
        registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();

        let started = Instant::now();
        let outcome = registry
            .wait_for_closure(OrderId::new(44), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(outcome, ClosureOutcome::Timeout);
        assert_eq!(started.elapsed(), Duration::from_secs(63));
        assert!(registry.order_phase(OrderId::new(44)).is_none());
    }

    #[tokio::test]
    async fn test_early_closure_is_parked_then_applied() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("e");
        registry.register(key.clone()).unwrap();

        assert_eq!(registry.dispatch(&closed(55, dec!(-5))), DispatchOutcome::Parked);
        assert_eq!(registry.parked_count(), 1);

        registry.dispatch(&placed("e", 55));
        assert_eq!(registry.parked_count(), 0);
        assert_eq!(
            registry.phase(&key),
            Some(OrderPhase::Closed {
                order_id: OrderId::new(55),
                pnl: dec!(-5)
            })
        );

        let placement = registry
            .wait_for_placement(&key, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(placement, PlacementOutcome::Placed(OrderId::new(55)));
        let closure = registry
            .wait_for_closure(OrderId::new(55), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(closure, ClosureOutcome::Closed { pnl: dec!(-5) });
    }

    #[tokio::test(start_paused = true)]
    async fn test_parked_closure_expires() {
        let registry = ConfirmationRegistry::default();
        registry.dispatch(&closed(66, dec!(1)));
        assert_eq!(registry.parked_count(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(registry.parked_count(), 0);

        registry.register(RequestId::new("x")).unwrap();
        registry.dispatch(&placed("x", 66));
        assert_eq!(
            registry.phase(&RequestId::new("x")),
            Some(OrderPhase::Placed(OrderId::new(66)))
        );
    }

    #[test]
    fn test_parked_capacity_is_bounded() {
        let registry = ConfirmationRegistry::new(ConfirmationConfig {
            early_closure_capacity: 2,
            ..ConfirmationConfig::default()
        });
        registry.dispatch(&closed(1, dec!(1)));
        registry.dispatch(&closed(2, dec!(1)));
        registry.dispatch(&closed(3, dec!(1)));
        assert_eq!(registry.parked_count(), 2);
    }

    #[test]
    fn test_abandon_and_unknown_keys() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("a");
        registry.register(key.clone()).unwrap();
        registry.abandon(&key);
        assert!(!registry.is_tracked(&key));
        assert_eq!(registry.dispatch(&placed("a", 1)), DispatchOutcome::UnknownKey);
    }

    #[tokio::test]
    async fn test_wait_on_unregistered_key() {
        let registry = ConfirmationRegistry::default();
        let key = RequestId::new("none");
        assert_eq!(
            registry
                .wait_for_placement(&key, Duration::from_secs(1))
                .await,
            Err(ConfirmationError::UnknownKey(key))
        );
        assert_eq!(
            registry
                .wait_for_closure(OrderId::new(1), Duration::from_secs(1))
                .await,
            Err(ConfirmationError::UnknownOrder(OrderId::new(1)))
        );
    }
}
