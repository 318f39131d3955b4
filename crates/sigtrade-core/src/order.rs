//! Order identifiers, push events and trade results.

use crate::error::CoreError;
use crate::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Caller-assigned correlation key for one order submission.
///
/// Unique for the lifetime of the in-flight submission. The brokerage echoes
/// it back on the placement acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Brokerage-assigned id of an accepted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(u64);

impl OrderId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidOrderId(s.to_string()))
    }
}

/// Identifier for one scheduling session, used to tag logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Format: `sess_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("sess_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Push events
// ============================================================================

/// Result carried by a placement acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementResult {
    /// Order accepted under this id.
    Accepted(OrderId),
    /// Order declined with the brokerage's message.
    Rejected(String),
}

/// Position status reported by a position update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
    Other(String),
}

impl PositionStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<&str> for PositionStatus {
    fn from(s: &str) -> Self {
        match s {
            "open" => Self::Open,
            "closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Order lifecycle push, keyed by whichever id the brokerage sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    /// Answer to a submission, keyed by request id.
    Placement {
        request_id: RequestId,
        result: PlacementResult,
    },
    /// Position update for an accepted order, keyed by order id.
    Closure {
        order_id: OrderId,
        status: PositionStatus,
        pnl: Decimal,
    },
}

impl OrderEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Placement { .. } => "placement",
            Self::Closure { .. } => "closure",
        }
    }
}

/// One balance entry from an account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub id: u64,
    /// Brokerage balance type (4 = practice, 1 = real).
    #[serde(rename = "type")]
    pub kind: u32,
    #[serde(default)]
    pub currency: Option<String>,
}

// ============================================================================
// Trade results
// ============================================================================

/// Terminal outcome of one executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
    /// No placement or closure arrived before the deadline.
    Timeout,
    /// The brokerage declined the order.
    Rejected(String),
}

impl TradeOutcome {
    /// Outcome for a closed position: strictly positive pnl wins.
    pub fn from_pnl(pnl: Decimal) -> Self {
        if pnl > Decimal::ZERO {
            Self::Win
        } else {
            Self::Loss
        }
    }

    /// True for WIN and LOSS, the outcomes that carry real pnl.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Win | Self::Loss)
    }

    /// Lowercase label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Timeout => "timeout",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => write!(f, "WIN"),
            Self::Loss => write!(f, "LOSS"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Rejected(_) => write!(f, "REJECTED"),
        }
    }
}

/// Immutable record of one executed signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeResult {
    pub asset: String,
    pub direction: Direction,
    /// Stake of the last attempt.
    pub amount: Decimal,
    pub outcome: TradeOutcome,
    /// Net profit; zero unless the outcome is settled.
    pub pnl: Decimal,
    /// Number of follow-up attempts after the first.
    pub gales: u32,
    pub order_id: Option<OrderId>,
}

impl TradeResult {
    /// Result for a closed position.
    pub fn settled(
        asset: impl Into<String>,
        direction: Direction,
        amount: Decimal,
        order_id: OrderId,
        pnl: Decimal,
    ) -> Self {
        Self {
            asset: asset.into(),
            direction,
            amount,
            outcome: TradeOutcome::from_pnl(pnl),
            pnl,
            gales: 0,
            order_id: Some(order_id),
        }
    }

    /// Result for a trade that never resolved.
    pub fn timed_out(
        asset: impl Into<String>,
        direction: Direction,
        amount: Decimal,
        order_id: Option<OrderId>,
    ) -> Self {
        Self {
            asset: asset.into(),
            direction,
            amount,
            outcome: TradeOutcome::Timeout,
            pnl: Decimal::ZERO,
            gales: 0,
            order_id,
        }
    }

    /// Result for an order the brokerage declined.
    pub fn rejected(
        asset: impl Into<String>,
        direction: Direction,
        amount: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            asset: asset.into(),
            direction,
            amount,
            outcome: TradeOutcome::Rejected(reason.into()),
            pnl: Decimal::ZERO,
            gales: 0,
            order_id: None,
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome == TradeOutcome::Win
    }

    pub fn is_loss(&self) -> bool {
        self.outcome == TradeOutcome::Loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_id_from_str() {
        assert_eq!("12345".parse::<OrderId>().unwrap(), OrderId::new(12345));
        assert_eq!(" 7 ".parse::<OrderId>().unwrap(), OrderId::new(7));
        assert!("abc".parse::<OrderId>().is_err());
        assert!("-1".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_session_id_format() {
        let id = SessionId::new();
        assert!(id.as_str().starts_with("sess_"));
        assert_ne!(id, SessionId::new());
    }

    #[test]
    fn test_outcome_from_pnl() {
        assert_eq!(TradeOutcome::from_pnl(dec!(10)), TradeOutcome::Win);
        assert_eq!(TradeOutcome::from_pnl(dec!(0)), TradeOutcome::Loss);
        assert_eq!(TradeOutcome::from_pnl(dec!(-5)), TradeOutcome::Loss);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TradeOutcome::Win.to_string(), "WIN");
        assert_eq!(TradeOutcome::Timeout.to_string(), "TIMEOUT");
        assert_eq!(
            TradeOutcome::Rejected("no funds".to_string()).to_string(),
            "REJECTED"
        );
        assert!(!TradeOutcome::Timeout.is_settled());
        assert!(TradeOutcome::Loss.is_settled());
    }

    #[test]
    fn test_position_status_from_str() {
        assert!(PositionStatus::from("closed").is_closed());
        assert_eq!(PositionStatus::from("open"), PositionStatus::Open);
        assert_eq!(
            PositionStatus::from("pending"),
            PositionStatus::Other("pending".to_string())
        );
    }

    #[test]
    fn test_trade_result_constructors() {
        let win = TradeResult::settled("EURUSD", Direction::Call, dec!(1), OrderId::new(9), dec!(0.85));
        assert!(win.is_win());
        assert_eq!(win.order_id, Some(OrderId::new(9)));

        let timeout = TradeResult::timed_out("EURUSD", Direction::Put, dec!(1), None);
        assert_eq!(timeout.pnl, Decimal::ZERO);
        assert!(!timeout.is_win() && !timeout.is_loss());

        let rejected = TradeResult::rejected("EURUSD", Direction::Put, dec!(1), "closed market");
        assert_eq!(
            rejected.outcome,
            TradeOutcome::Rejected("closed market".to_string())
        );
    }
}
