//! Order execution for the signal trading engine.
//!
//! One trade walks submission, placement and closure:
//!
//! 1. `TradeExecutor` validates the request and builds the digital-option
//!    payload
//! 2. The request id is registered with the `ConfirmationRegistry`
//! 3. The order goes out through an `OrderSink`
//! 4. Push messages dispatched into the registry wake the waiting trade,
//!    first by request id (placement), then by order id (closure)
//!
//! # Key Components
//!
//! - [`ConfirmationRegistry`]: per-order lifecycle slots with `watch` wakeups
//! - [`TradeExecutor`]: validation and the placement/closure waits
//! - [`OrderSink`]: submission seam, with [`MockOrderSink`] and [`WsOrderSink`]
//! - [`RequestIdGenerator`]: correlation keys for submissions

pub mod confirmation;
pub mod error;
pub mod executor;
pub mod order;
pub mod request_id;
pub mod sink;
pub mod ws_sink;

pub use confirmation::{
    ClosureOutcome, ConfirmationConfig, ConfirmationRegistry, DispatchOutcome, OrderPhase,
    PlacementOutcome,
};
pub use error::{ConfirmationError, ExecutorResult, TradeError, ValidationError};
pub use executor::{ExecutorConfig, TradeExecutor, TradeRequest};
pub use order::{
    expiration_timestamp, instrument_id, time_to_expiration, DigitalOptionOrder, PlaceOrder,
};
pub use request_id::RequestIdGenerator;
pub use sink::{BoxFuture, DynOrderSink, MockOrderSink, OrderSink, SubmitResult};
pub use ws_sink::WsOrderSink;
