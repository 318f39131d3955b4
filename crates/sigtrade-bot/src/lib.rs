//! Signal trading bot.
//!
//! Wires the components into one session:
//! - Push channel connection and routing of decoded pushes
//! - Account and asset registries
//! - Trade execution with confirmation tracking and gale retries
//! - Time-bucketed scheduling and the final report

pub mod app;
pub mod config;
pub mod error;
pub mod push_router;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use push_router::PushRouter;
