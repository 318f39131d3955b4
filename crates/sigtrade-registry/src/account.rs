//! Active account and brokerage clock.
//!
//! Fed by `profile` and `timeSync` pushes. Trade execution reads the active
//! balance id and the brokerage's notion of "now" for expiration math.
//!
//! # Offset Convention
//! `server_offset_ms = server_time - local_time`
//! - Positive: server clock is ahead of local
//! - Negative: server clock is behind local

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use sigtrade_core::{Balance, Clock};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Which balance of the profile to trade with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    #[default]
    Practice,
    Real,
}

impl AccountMode {
    /// Brokerage balance type for this mode.
    pub fn balance_type(&self) -> u32 {
        match self {
            Self::Practice => 4,
            Self::Real => 1,
        }
    }
}

pub struct AccountState {
    mode: AccountMode,
    /// Fixed balance id from configuration; profiles cannot override it.
    configured_balance: Option<u64>,
    /// 0 = none selected yet.
    balance_id: AtomicU64,
    server_offset_ms: AtomicI64,
    time_synced: AtomicBool,
    clock: Arc<dyn Clock>,
    ready_tx: watch::Sender<bool>,
}

impl AccountState {
    pub fn new(mode: AccountMode, configured_balance: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        let (ready_tx, _) = watch::channel(configured_balance.is_some());
        Self {
            mode,
            configured_balance,
            balance_id: AtomicU64::new(configured_balance.unwrap_or(0)),
            server_offset_ms: AtomicI64::new(0),
            time_synced: AtomicBool::new(false),
            clock,
            ready_tx,
        }
    }

    pub fn mode(&self) -> AccountMode {
        self.mode
    }

    /// Select the balance matching the configured mode.
    ///
    /// Returns the active balance id after the update.
    pub fn apply_profile(&self, balances: &[Balance]) -> Option<u64> {
        if let Some(id) = self.configured_balance {
            debug!(balance_id = id, "Profile ignored, balance id is configured");
            return Some(id);
        }

        let wanted = self.mode.balance_type();
        match balances.iter().find(|b| b.kind == wanted) {
            Some(balance) => {
                let previous = self.balance_id.swap(balance.id, Ordering::AcqRel);
                if previous != balance.id {
                    info!(
                        balance_id = balance.id,
                        mode = ?self.mode,
                        currency = balance.currency.as_deref().unwrap_or("-"),
                        "Active balance selected"
                    );
                }
                self.ready_tx.send_replace(true);
                Some(balance.id)
            }
            None => {
                warn!(
                    mode = ?self.mode,
                    balances = balances.len(),
                    "Profile has no balance for the configured mode"
                );
                self.active_balance_id().ok()
            }
        }
    }

    pub fn active_balance_id(&self) -> RegistryResult<u64> {
        match self.balance_id.load(Ordering::Acquire) {
            0 => Err(RegistryError::NoActiveAccount),
            id => Ok(id),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Wait until a balance is active.
    pub async fn wait_ready(&self, timeout: Duration) -> RegistryResult<u64> {
        let mut rx = self.ready_tx.subscribe();
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        );
        if !ready {
            return Err(RegistryError::NotReady(timeout.as_millis() as u64));
        }
        self.active_balance_id()
    }

    /// Record the brokerage clock from a `timeSync` push.
    pub fn sync_server_time(&self, server_time_ms: u64) {
        let offset = server_time_ms as i64 - self.clock.now_ms() as i64;
        self.server_offset_ms.store(offset, Ordering::Release);
        if !self.time_synced.swap(true, Ordering::AcqRel) {
            debug!(offset_ms = offset, "First server time sync");
        }
    }

    pub fn is_time_synced(&self) -> bool {
        self.time_synced.load(Ordering::Acquire)
    }

    /// Approximate brokerage time: local clock plus the last known offset.
    pub fn server_time_ms(&self) -> u64 {
        let local = self.clock.now_ms();
        let offset = self.server_offset_ms.load(Ordering::Acquire);
        if offset >= 0 {
            local.saturating_add(offset as u64)
        } else {
            local.saturating_sub(offset.unsigned_abs())
        }
    }

    pub fn server_offset_ms(&self) -> i64 {
        self.server_offset_ms.load(Ordering::Acquire)
    }
}
