//! Shared lookup state for trade execution.
//!
//! - `AssetCatalog`: instrument name to brokerage asset id
//! - `AccountState`: active balance and brokerage clock offset, fed by pushes

pub mod account;
pub mod asset_catalog;
pub mod error;

pub use account::{AccountMode, AccountState};
pub use asset_catalog::AssetCatalog;
pub use error::{RegistryError, RegistryResult};
