//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable balance before the ready timeout.
    #[error("Account error: {0}")]
    Account(#[from] sigtrade_registry::RegistryError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] sigtrade_scheduler::SchedulerError),

    #[error("Session interrupted by shutdown signal")]
    Shutdown,
}

impl From<::config::ConfigError> for AppError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
