//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("No active account balance")]
    NoActiveAccount,

    #[error("Account not ready after {0}ms")]
    NotReady(u64),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
