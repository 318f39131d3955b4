//! Core domain types for the signal trading engine.
//!
//! This crate provides the types shared by every other crate:
//! - `Signal`, `Direction`: a parsed trading instruction
//! - `RequestId`, `OrderId`: correlation keys for the push channel
//! - `OrderEvent`: order-related push messages, already decoded
//! - `TradeOutcome`, `TradeResult`: the terminal record of one trade
//! - `Clock`: injectable time source for scheduling and expiration

pub mod clock;
pub mod error;
pub mod order;
pub mod signal;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use error::{CoreError, Result};
pub use order::{
    Balance, OrderEvent, OrderId, PlacementResult, PositionStatus, RequestId, SessionId,
    TradeOutcome, TradeResult,
};
pub use signal::{Direction, Signal};
