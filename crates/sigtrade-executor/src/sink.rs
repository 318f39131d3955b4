//! Order submission seam.
//!
//! `OrderSink::submit` only confirms the order left the process. Whether the
//! brokerage accepted it arrives later as a push message.

use crate::order::PlaceOrder;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// Handed to the transport.
    Accepted,
    /// Transport not connected.
    Disconnected,
    Error(String),
}

impl SubmitResult {
    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Disconnected => "disconnected",
            Self::Error(_) => "error",
        }
    }
}

pub trait OrderSink: Send + Sync {
    fn submit(&self, order: PlaceOrder) -> BoxFuture<'_, SubmitResult>;

    fn is_ready(&self) -> bool;
}

/// Arc wrapper for OrderSink trait objects.
pub type DynOrderSink = Arc<dyn OrderSink>;

/// Recording sink for tests.
#[derive(Debug)]
pub struct MockOrderSink {
    orders: parking_lot::Mutex<Vec<PlaceOrder>>,
    next_result: parking_lot::Mutex<SubmitResult>,
    ready: AtomicBool,
}

impl Default for MockOrderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrderSink {
    pub fn new() -> Self {
        Self {
            orders: parking_lot::Mutex::new(Vec::new()),
            next_result: parking_lot::Mutex::new(SubmitResult::Accepted),
            ready: AtomicBool::new(true),
        }
    }

    pub fn set_next_result(&self, result: SubmitResult) {
        *self.next_result.lock() = result;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<PlaceOrder> {
        self.orders.lock().clone()
    }
}

impl OrderSink for MockOrderSink {
    fn submit(&self, order: PlaceOrder) -> BoxFuture<'_, SubmitResult> {
        Box::pin(async move {
            self.orders.lock().push(order);
            self.next_result.lock().clone()
        })
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
