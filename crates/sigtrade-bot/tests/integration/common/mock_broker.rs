//! Scripted brokerage for integration tests.
//!
//! A WebSocket server that:
//! - pushes a profile and a timeSync frame on accept
//! - answers every `sendMessage` order according to a per-asset script
//! - records every text frame it receives

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

pub const PRACTICE_BALANCE_ID: u64 = 4004;
pub const REAL_BALANCE_ID: u64 = 1001;
pub const SERVER_TIME_MS: u64 = 1_772_422_799_000;

/// What the broker does with an order for one asset id.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Place the order, then close it right away with `pnl`.
    Settle { order_id: u64, pnl: f64 },
    /// Decline the order with a message.
    Reject(String),
    /// Never answer.
    Silent,
}

type Script = Arc<HashMap<u32, Reply>>;
type Writer = SplitSink<WebSocketStream<TcpStream>, Message>;

pub struct MockBroker {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl MockBroker {
    pub async fn start(script: HashMap<u32, Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let script: Script = Arc::new(script);

        let messages_clone = messages.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            script.clone(),
                            messages_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Received `sendMessage` frames, parsed.
    pub async fn orders(&self) -> Vec<Value> {
        self.received_messages()
            .await
            .iter()
            .filter_map(|text| serde_json::from_str::<Value>(text).ok())
            .filter(|frame| frame["name"] == "sendMessage")
            .collect()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, script: Script, messages: Arc<Mutex<Vec<String>>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let profile = json!({
        "name": "profile",
        "msg": {
            "balances": [
                {"id": REAL_BALANCE_ID, "type": 1, "currency": "USD"},
                {"id": PRACTICE_BALANCE_ID, "type": 4, "currency": "USD"},
            ]
        }
    });
    let time_sync = json!({"name": "timeSync", "msg": SERVER_TIME_MS});
    send(&mut write, time_sync).await;
    send(&mut write, profile).await;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                messages.lock().await.push(text.clone());
                if let Ok(frame) = serde_json::from_str::<Value>(&text) {
                    if frame["name"] == "sendMessage" {
                        answer_order(&mut write, &script, &frame).await;
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }
}

async fn answer_order(write: &mut Writer, script: &HashMap<u32, Reply>, frame: &Value) {
    let request_id = frame["request_id"].clone();
    let asset_id = frame["msg"]["body"]["asset_id"].as_u64().unwrap_or(0) as u32;

    match script.get(&asset_id).cloned().unwrap_or(Reply::Silent) {
        Reply::Settle { order_id, pnl } => {
            send(
                write,
                json!({
                    "name": "digital-option-placed",
                    "request_id": request_id,
                    "msg": {"id": order_id},
                }),
            )
            .await;
            // An open update first, as the brokerage sends one on placement.
            send(write, position_changed(order_id, "open", 0.0)).await;
            send(write, position_changed(order_id, "closed", pnl)).await;
        }
        Reply::Reject(reason) => {
            send(
                write,
                json!({
                    "name": "digital-option-placed",
                    "request_id": request_id,
                    "msg": {"message": reason},
                }),
            )
            .await;
        }
        Reply::Silent => {}
    }
}

fn position_changed(order_id: u64, status: &str, pnl: f64) -> Value {
    json!({
        "name": "position-changed",
        "msg": {
            "status": status,
            "pnl": pnl,
            "raw_event": {"order_ids": [order_id.to_string()]},
        }
    })
}

async fn send(write: &mut Writer, frame: Value) {
    let _ = write.send(Message::Text(frame.to_string())).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_broker_starts() {
        let broker = MockBroker::start(HashMap::new()).await;
        assert!(broker.url().starts_with("ws://127.0.0.1:"));
        broker.shutdown().await;
    }
}
