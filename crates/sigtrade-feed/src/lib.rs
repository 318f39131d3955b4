//! Trading signal text parsing.
//!
//! Turns loosely formatted channel text (`03:40;EURAUD;CALL;5`, possibly with
//! OCR noise) into validated `Signal`s. Bad lines are dropped and logged.

pub mod error;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use parser::{clean_line, ParseStats, SignalParser};
