//! Push frame decoding.
//!
//! Every frame from the brokerage has the shape
//! `{"name": ..., "request_id"?: ..., "msg": ..., "status"?: ...}`.
//! Only the names the engine acts on are decoded; everything else maps to
//! `None` and is ignored by the caller.

use crate::error::{WsError, WsResult};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sigtrade_core::{
    Balance, OrderEvent, OrderId, PlacementResult, PositionStatus, RequestId,
};
use std::str::FromStr;

/// Frame envelope as received.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub name: String,
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(default)]
    pub msg: Value,
    #[serde(default)]
    pub status: Option<i64>,
}

/// Push message the engine acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    /// Brokerage clock, epoch milliseconds.
    TimeSync { server_time_ms: u64 },
    /// Account profile with its balances.
    Profile { balances: Vec<Balance> },
    /// Order placement or position update.
    Order(OrderEvent),
}

impl PushMessage {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TimeSync { .. } => "time_sync",
            Self::Profile { .. } => "profile",
            Self::Order(event) => event.kind(),
        }
    }
}

/// Decode a text frame.
///
/// Returns `Ok(None)` for frames the engine does not handle and an error for
/// handled frames with a broken body.
pub fn decode_push(text: &str) -> WsResult<Option<PushMessage>> {
    let frame: RawFrame = serde_json::from_str(text)?;
    decode_frame(frame)
}

/// Decode an already parsed envelope.
pub fn decode_frame(frame: RawFrame) -> WsResult<Option<PushMessage>> {
    let message = match frame.name.as_str() {
        "timeSync" => {
            let server_time_ms = frame
                .msg
                .as_u64()
                .ok_or_else(|| WsError::MalformedFrame(format!("timeSync msg: {}", frame.msg)))?;
            PushMessage::TimeSync { server_time_ms }
        }
        "profile" => {
            let balances = match frame.msg.get("balances") {
                Some(v) => serde_json::from_value::<Vec<Balance>>(v.clone())?,
                None => Vec::new(),
            };
            PushMessage::Profile { balances }
        }
        "digital-option-placed" => PushMessage::Order(decode_placement(&frame)?),
        "position-changed" => PushMessage::Order(decode_position(&frame.msg)?),
        _ => return Ok(None),
    };
    Ok(Some(message))
}

fn decode_placement(frame: &RawFrame) -> WsResult<OrderEvent> {
    let request_id = match &frame.request_id {
        Some(Value::String(s)) if !s.is_empty() => RequestId::new(s.clone()),
        Some(Value::Number(n)) => RequestId::new(n.to_string()),
        _ => {
            return Err(WsError::MalformedFrame(
                "digital-option-placed without request_id".to_string(),
            ))
        }
    };

    let result = match frame.msg.get("id").and_then(order_id_from_value) {
        Some(order_id) => PlacementResult::Accepted(order_id),
        None => {
            let reason = frame
                .msg
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("order rejected without message")
                .to_string();
            PlacementResult::Rejected(reason)
        }
    };

    Ok(OrderEvent::Placement { request_id, result })
}

fn decode_position(msg: &Value) -> WsResult<OrderEvent> {
    let order_id = msg
        .get("raw_event")
        .and_then(|e| e.get("order_ids"))
        .and_then(|ids| ids.get(0))
        .and_then(order_id_from_value)
        .ok_or_else(|| WsError::MalformedFrame(format!("position-changed without order id: {msg}")))?;

    let status = msg
        .get("status")
        .and_then(Value::as_str)
        .map(PositionStatus::from)
        .unwrap_or_else(|| PositionStatus::Other(String::new()));

    let pnl = match msg.get("pnl") {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(v) => decimal_from_value(v)
            .ok_or_else(|| WsError::MalformedFrame(format!("position-changed pnl: {v}")))?,
    };

    Ok(OrderEvent::Closure {
        order_id,
        status,
        pnl,
    })
}

/// Order ids arrive as numbers or as numeric strings.
fn order_id_from_value(v: &Value) -> Option<OrderId> {
    match v {
        Value::Number(n) => n.as_u64().map(OrderId::new),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn decimal_from_value(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
