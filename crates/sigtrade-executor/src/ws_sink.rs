//! `OrderSink` over the push channel socket.

use crate::order::{DigitalOptionOrder, PlaceOrder};
use crate::sink::{BoxFuture, OrderSink, SubmitResult};
use serde::Serialize;
use sigtrade_ws::{SendError, WsWriteHandle};
use tracing::{debug, error};

/// Envelope the brokerage expects around every outbound request.
#[derive(Serialize)]
struct SendMessage<'a> {
    name: &'static str,
    request_id: &'a str,
    msg: &'a DigitalOptionOrder,
}

pub struct WsOrderSink {
    handle: WsWriteHandle,
}

impl WsOrderSink {
    pub fn new(handle: WsWriteHandle) -> Self {
        Self { handle }
    }
}

impl OrderSink for WsOrderSink {
    fn submit(&self, order: PlaceOrder) -> BoxFuture<'_, SubmitResult> {
        Box::pin(async move {
            let frame = SendMessage {
                name: "sendMessage",
                request_id: order.request_id.as_str(),
                msg: &order.payload,
            };
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = ?e, "Order serialization failed");
                    return SubmitResult::Error(format!("serialization: {e}"));
                }
            };

            match self.handle.send_text(text).await {
                Ok(()) => {
                    debug!(request_id = %order.request_id, asset = %order.asset, "Order queued");
                    SubmitResult::Accepted
                }
                Err(SendError::NotConnected) | Err(SendError::ChannelClosed) => {
                    SubmitResult::Disconnected
                }
            }
        })
    }

    fn is_ready(&self) -> bool {
        self.handle.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use rust_decimal_macros::dec;
    use sigtrade_core::{Direction, RequestId};
    use sigtrade_ws::ConnectionState;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn order() -> PlaceOrder {
        PlaceOrder {
            request_id: RequestId::new("17"),
            asset: "EURAUD".to_string(),
            expiration: 1_772_423_100,
            payload: DigitalOptionOrder::new(4242, 108, dec!(1), Direction::Put, 5, 1_772_423_100)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_submit_wraps_send_message() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = Arc::new(RwLock::new(ConnectionState::Connected));
        let sink = WsOrderSink::new(WsWriteHandle::new(tx, state));
        assert!(sink.is_ready());

        assert_eq!(sink.submit(order()).await, SubmitResult::Accepted);

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["name"], "sendMessage");
        assert_eq!(frame["request_id"], "17");
        assert_eq!(frame["msg"]["name"], "digital-options.place-digital-option");
        assert_eq!(frame["msg"]["body"]["asset_id"], 108);
        assert_eq!(frame["msg"]["body"]["amount"], "1");
    }

    #[tokio::test]
    async fn test_submit_while_disconnected() {
        let (tx, _rx) = mpsc::channel(4);
        let state = Arc::new(RwLock::new(ConnectionState::Reconnecting));
        let sink = WsOrderSink::new(WsWriteHandle::new(tx, state));
        assert!(!sink.is_ready());
        assert_eq!(sink.submit(order()).await, SubmitResult::Disconnected);
    }
}
