//! Scheduling and aggregation of parsed signals.
//!
//! Signals are grouped into buckets by their next absolute occurrence. Each
//! bucket is released when its instant arrives, one task per signal, and the
//! scheduler moves straight on to the next bucket. After the last bucket all
//! trades are awaited and folded into a `Report`.

pub mod error;
pub mod events;
pub mod gale;
pub mod report;
pub mod runner;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use events::SessionEvent;
pub use gale::{GaleConfig, GaleExecutor};
pub use report::Report;
pub use runner::{DynTradeRunner, TradeRunner};
pub use scheduler::{next_occurrence, plan, ScheduledSignal, Scheduler, SessionOutcome};
