//! Application configuration.

use crate::error::{AppError, AppResult};
use ::config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sigtrade_executor::{ConfirmationConfig, ExecutorConfig};
use sigtrade_registry::AccountMode;
use sigtrade_scheduler::GaleConfig;
use sigtrade_ws::{ConnectionConfig, ReconnectPolicy};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment overrides look like `SIGTRADE__TRADING__DEFAULT_AMOUNT=5`.
const ENV_PREFIX: &str = "SIGTRADE";
const ENV_SEPARATOR: &str = "__";

/// WebSocket configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Raw frames sent after every (re)connect, e.g. the session handshake.
    #[serde(default)]
    pub on_connect: Vec<String>,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_heartbeat_interval_ms() -> u64 {
    45_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            on_connect: Vec::new(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: String::new(), // Set separately
            on_connect: cfg.on_connect,
            reconnect: ReconnectPolicy {
                max_attempts: cfg.max_reconnect_attempts,
                base_delay: Duration::from_millis(cfg.reconnect_base_delay_ms),
                max_delay: Duration::from_millis(cfg.reconnect_max_delay_ms),
            },
            ping_after: Duration::from_millis(cfg.heartbeat_interval_ms),
            pong_within: Duration::from_millis(cfg.heartbeat_timeout_ms),
        }
    }
}

/// Stake and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Stake of every first attempt. Default: 1.
    #[serde(default = "default_amount")]
    pub default_amount: Decimal,
    /// Smallest stake the brokerage accepts. Default: 1.
    #[serde(default = "default_amount")]
    pub min_amount: Decimal,
    /// Follow-ups after a loss. Default: 0 (single attempt).
    #[serde(default)]
    pub max_gales: u32,
    /// Stake multiplier per follow-up. Default: 2.
    #[serde(default = "default_gale_multiplier")]
    pub gale_multiplier: Decimal,
}

fn default_amount() -> Decimal {
    Decimal::ONE
}

fn default_gale_multiplier() -> Decimal {
    Decimal::TWO
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_amount: default_amount(),
            min_amount: default_amount(),
            max_gales: 0,
            gale_multiplier: default_gale_multiplier(),
        }
    }
}

/// Confirmation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    /// Wait for the placement acknowledgement (ms). Default: 10,000.
    #[serde(default = "default_placement_timeout_ms")]
    pub placement_timeout_ms: u64,
    /// Added to the time to expiry when waiting for closure (ms). Default: 3,000.
    #[serde(default = "default_closure_grace_ms")]
    pub closure_grace_ms: u64,
    /// How long a closure for a not-yet-placed order is held (ms). Default: 30,000.
    #[serde(default = "default_early_closure_ttl_ms")]
    pub early_closure_ttl_ms: u64,
    #[serde(default = "default_early_closure_capacity")]
    pub early_closure_capacity: usize,
}

fn default_placement_timeout_ms() -> u64 {
    10_000
}

fn default_closure_grace_ms() -> u64 {
    3_000
}

fn default_early_closure_ttl_ms() -> u64 {
    30_000
}

fn default_early_closure_capacity() -> usize {
    1024
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            placement_timeout_ms: default_placement_timeout_ms(),
            closure_grace_ms: default_closure_grace_ms(),
            early_closure_ttl_ms: default_early_closure_ttl_ms(),
            early_closure_capacity: default_early_closure_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub mode: AccountMode,
    /// Fixed balance id. When set, profile pushes are not needed to trade.
    #[serde(default)]
    pub balance_id: Option<u64>,
    /// Wait for an active balance before scheduling (ms). Default: 15,000.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

fn default_ready_timeout_ms() -> u64 {
    15_000
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            mode: AccountMode::Practice,
            balance_id: None,
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Write the Prometheus text exposition here at shutdown.
    #[serde(default)]
    pub metrics_dump_path: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Push channel endpoint URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub confirmation: ConfirmationSettings,
    #[serde(default)]
    pub account: AccountConfig,
    /// Instrument name to brokerage asset id.
    #[serde(default)]
    pub assets: BTreeMap<String, u32>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_ws_url() -> String {
    "wss://iqoption.com/echo/websocket".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            websocket: WsConfig::default(),
            trading: TradingConfig::default(),
            confirmation: ConfirmationSettings::default(),
            account: AccountConfig::default(),
            assets: BTreeMap::new(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, then apply `SIGTRADE__*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .ignore_empty(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without environment overrides.
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.ws_url.trim().is_empty() {
            return Err(AppError::Config("ws_url must not be empty".to_string()));
        }
        let trading = &self.trading;
        if trading.min_amount <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "trading.min_amount must be positive, got {}",
                trading.min_amount
            )));
        }
        if trading.default_amount < trading.min_amount {
            return Err(AppError::Config(format!(
                "trading.default_amount {} is below min_amount {}",
                trading.default_amount, trading.min_amount
            )));
        }
        if trading.gale_multiplier < Decimal::ONE {
            return Err(AppError::Config(format!(
                "trading.gale_multiplier must be at least 1, got {}",
                trading.gale_multiplier
            )));
        }
        if self.confirmation.placement_timeout_ms == 0 {
            return Err(AppError::Config(
                "confirmation.placement_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        let mut ws_config: ConnectionConfig = self.websocket.clone().into();
        ws_config.url = self.ws_url.clone();
        ws_config
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            min_amount: self.trading.min_amount,
            placement_timeout: Duration::from_millis(self.confirmation.placement_timeout_ms),
        }
    }

    pub fn confirmation_config(&self) -> ConfirmationConfig {
        ConfirmationConfig {
            closure_grace: Duration::from_millis(self.confirmation.closure_grace_ms),
            early_closure_ttl: Duration::from_millis(self.confirmation.early_closure_ttl_ms),
            early_closure_capacity: self.confirmation.early_closure_capacity,
        }
    }

    pub fn gale_config(&self) -> GaleConfig {
        GaleConfig {
            max_gales: self.trading.max_gales,
            multiplier: self.trading.gale_multiplier,
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.account.ready_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const SAMPLE: &str = r#"
ws_url = "ws://127.0.0.1:9000"

[websocket]
max_reconnect_attempts = 3
on_connect = ['{"name":"ssid","msg":"token"}']

[trading]
default_amount = 5
max_gales = 2
gale_multiplier = 2.5

[account]
mode = "real"
balance_id = 42

[assets]
EURAUD = 108
GBPUSD = 5
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.default_amount, dec!(1));
        assert_eq!(config.trading.max_gales, 0);
        assert_eq!(config.account.mode, AccountMode::Practice);
        assert_eq!(config.executor_config().placement_timeout, Duration::from_secs(10));
        assert_eq!(config.confirmation_config().closure_grace, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_sections() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.ws_url, "ws://127.0.0.1:9000");
        assert_eq!(config.trading.default_amount, dec!(5));
        assert_eq!(config.trading.min_amount, dec!(1));
        assert_eq!(config.gale_config().max_gales, 2);
        assert_eq!(config.gale_config().multiplier, dec!(2.5));
        assert_eq!(config.account.mode, AccountMode::Real);
        assert_eq!(config.account.balance_id, Some(42));
        assert_eq!(config.assets.len(), 2);

        let conn = config.connection_config();
        assert_eq!(conn.url, "ws://127.0.0.1:9000");
        assert_eq!(conn.reconnect.max_attempts, 3);
        assert_eq!(conn.ping_after, Duration::from_secs(45));
        assert_eq!(conn.on_connect.len(), 1);
    }

    #[test]
    fn test_amount_below_minimum_rejected() {
        let err = AppConfig::from_toml_str("[trading]\ndefault_amount = 0.5\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_gale_multiplier_below_one_rejected() {
        let err = AppConfig::from_toml_str("[trading]\ngale_multiplier = 0.5\n").unwrap_err();
        assert!(err.to_string().contains("gale_multiplier"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.account.balance_id, Some(42));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("does/not/exist.toml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("ws_url"));
        assert!(toml_str.contains("[trading]"));
    }
}
