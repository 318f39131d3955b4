//! Instrument name to brokerage asset id.

use crate::error::{RegistryError, RegistryResult};
use dashmap::DashMap;
use tracing::debug;

/// Catalog of tradable instruments.
///
/// Keys are normalized: trimmed, uppercased, `/` removed. `EUR/usd` and
/// `EURUSD` resolve to the same entry.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    assets: DashMap<String, u32>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: AsRef<str>,
    {
        let catalog = Self::new();
        for (name, id) in entries {
            catalog.insert(name.as_ref(), id);
        }
        catalog
    }

    /// Insert or replace an instrument.
    pub fn insert(&self, name: &str, asset_id: u32) {
        let key = normalize(name);
        if let Some(previous) = self.assets.insert(key.clone(), asset_id) {
            if previous != asset_id {
                debug!(asset = %key, previous, asset_id, "Asset id replaced");
            }
        }
    }

    pub fn resolve(&self, name: &str) -> RegistryResult<u32> {
        self.assets
            .get(&normalize(name))
            .map(|id| *id)
            .ok_or_else(|| RegistryError::UnknownAsset(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase().replace('/', "")
}
