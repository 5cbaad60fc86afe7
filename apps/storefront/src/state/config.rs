//! # Configuration State
//!
//! Storefront configuration, loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LAYERLINE_DB_PATH=/srv/layerline.db                                │
//! │     LAYERLINE_GATEWAY_SURCHARGE_BPS=1200                               │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     $LAYERLINE_CONFIG, else                                             │
//! │     ~/.config/layerline/layerline.toml (Linux)                         │
//! │     ~/Library/Application Support/com.layerline.storefront/ (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Layerline"
//! currency_code = "ARS"
//! currency_symbol = "$"
//!
//! [checkout]
//! gateway_surcharge_bps = 1000
//! transfer_discount_bps = 500
//!
//! [payments]
//! functions_url = "https://project.example.com/functions/v1"
//! storage_url = "https://project.example.com/storage/v1"
//! proof_bucket = "payment-proofs"
//!
//! [server]
//! bind_addr = "127.0.0.1:8787"
//! ```
//!
//! ## Thread Safety
//! Read-only after initialization, so no mutex needed.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use layerline_core::money::{Money, Rate};
use layerline_core::pricing::AdjustmentRates;
use layerline_core::validation::validate_rate_bps;
use layerline_core::CART_STORAGE_KEY;
use layerline_payments::PaymentsConfig;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_FILE: &str = "layerline.toml";
const DB_FILE: &str = "layerline.db";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub name: String,

    /// ISO 4217 code.
    pub currency_code: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "Layerline".to_string(),
            currency_code: "USD".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckoutSection {
    /// Added to gateway payments. 1000 = 10%.
    pub gateway_surcharge_bps: u32,

    /// Taken off bank transfers. 500 = 5%.
    pub transfer_discount_bps: u32,

    /// Key the cart is saved under.
    pub storage_key: String,
}

impl Default for CheckoutSection {
    fn default() -> Self {
        CheckoutSection {
            gateway_surcharge_bps: 1000,
            transfer_discount_bps: 500,
            storage_key: CART_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Unset means the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsSection {
    pub functions_url: String,
    pub storage_url: String,
    pub proof_bucket: String,

    #[serde(deserialize_with = "secret")]
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

impl Default for PaymentsSection {
    fn default() -> Self {
        PaymentsSection {
            functions_url: "http://127.0.0.1:54321/functions/v1".to_string(),
            storage_url: "http://127.0.0.1:54321/storage/v1".to_string(),
            proof_bucket: "payment-proofs".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

fn secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|k| !k.is_empty()).map(SecretString::from))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            bind_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

// =============================================================================
// StoreConfig
// =============================================================================

/// Storefront configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub store: StoreSection,
    pub checkout: CheckoutSection,
    pub database: DatabaseSection,
    pub payments: PaymentsSection,
    pub server: ServerSection,
}

impl StoreConfig {
    /// Loads defaults, then the config file (if any), then `LAYERLINE_*`
    /// variables, and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LAYERLINE_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(path = %path.display(), "No config file, using defaults");
                StoreConfig::default()
            }
            None => StoreConfig::default(),
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file. Missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies `LAYERLINE_*` overrides read through `lookup`.
    ///
    /// ## Variables
    /// - `LAYERLINE_STORE_NAME`
    /// - `LAYERLINE_GATEWAY_SURCHARGE_BPS`, `LAYERLINE_TRANSFER_DISCOUNT_BPS`
    /// - `LAYERLINE_STORAGE_KEY`
    /// - `LAYERLINE_DB_PATH`
    /// - `LAYERLINE_FUNCTIONS_URL`, `LAYERLINE_STORAGE_URL`,
    ///   `LAYERLINE_PROOF_BUCKET`, `LAYERLINE_API_KEY`
    /// - `LAYERLINE_BIND_ADDR`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bps = |name: &str| -> Result<Option<u32>, ConfigError> {
            lookup(name)
                .map(|raw| {
                    raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidEnv {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        if let Some(name) = lookup("LAYERLINE_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(value) = bps("LAYERLINE_GATEWAY_SURCHARGE_BPS")? {
            self.checkout.gateway_surcharge_bps = value;
        }
        if let Some(value) = bps("LAYERLINE_TRANSFER_DISCOUNT_BPS")? {
            self.checkout.transfer_discount_bps = value;
        }
        if let Some(key) = lookup("LAYERLINE_STORAGE_KEY") {
            self.checkout.storage_key = key;
        }
        if let Some(path) = lookup("LAYERLINE_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("LAYERLINE_FUNCTIONS_URL") {
            self.payments.functions_url = url;
        }
        if let Some(url) = lookup("LAYERLINE_STORAGE_URL") {
            self.payments.storage_url = url;
        }
        if let Some(bucket) = lookup("LAYERLINE_PROOF_BUCKET") {
            self.payments.proof_bucket = bucket;
        }
        if let Some(key) = lookup("LAYERLINE_API_KEY").filter(|k| !k.is_empty()) {
            self.payments.api_key = Some(SecretString::from(key));
        }
        if let Some(addr) = lookup("LAYERLINE_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        Ok(())
    }

    /// Rejects rates over 100%, an empty storage key, non-http(s) payment
    /// URLs and an unparseable bind address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: layerline_core::ValidationError| ConfigError::Invalid(e.to_string());
        validate_rate_bps("gateway_surcharge_bps", self.checkout.gateway_surcharge_bps)
            .map_err(invalid)?;
        validate_rate_bps("transfer_discount_bps", self.checkout.transfer_discount_bps)
            .map_err(invalid)?;

        if self.checkout.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".into()));
        }

        for (field, value) in [
            ("functions_url", &self.payments.functions_url),
            ("storage_url", &self.payments.storage_url),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{} '{}': {}", field, value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "{} must use http or https",
                    field
                )));
            }
        }

        self.bind_addr()?;
        Ok(())
    }

    pub fn rates(&self) -> AdjustmentRates {
        AdjustmentRates {
            gateway_surcharge: Rate::from_bps(self.checkout.gateway_surcharge_bps),
            transfer_discount: Rate::from_bps(self.checkout.transfer_discount_bps),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("bind_addr '{}': {}", self.server.bind_addr, e))
        })
    }

    /// The configured database path, else `layerline.db` in the platform
    /// data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs()
            .ok_or_else(|| ConfigError::Invalid("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().join(DB_FILE))
    }

    pub fn payments_config(&self) -> PaymentsConfig {
        let payments = &self.payments;
        PaymentsConfig {
            functions_url: payments.functions_url.clone(),
            storage_url: payments.storage_url.clone(),
            proof_bucket: payments.proof_bucket.clone(),
            api_key: payments.api_key.clone(),
            timeout: Duration::from_secs(payments.timeout_secs),
        }
    }

    /// Formats an amount in the store currency.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = StoreConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(1234)), "$12.34");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let store = &self.store;
        let cents = amount.cents();
        let divisor = 10_i64.pow(u32::from(store.currency_decimals));
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if store.currency_decimals > 0 {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                store.currency_symbol,
                whole,
                frac,
                width = usize::from(store.currency_decimals)
            )
        } else {
            format!("{}{}{}", sign, store.currency_symbol, whole)
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "layerline", "storefront")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Managed configuration state.
#[derive(Debug, Clone)]
pub struct ConfigState {
    config: StoreConfig,
}

impl ConfigState {
    pub fn new(config: StoreConfig) -> Self {
        ConfigState { config }
    }

    pub fn get(&self) -> &StoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rates(), AdjustmentRates::default());
        assert_eq!(config.checkout.storage_key, "layerline-cart");
        assert_eq!(config.bind_addr().unwrap().port(), 8787);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StoreConfig::from_toml(
            r#"
            [checkout]
            transfer_discount_bps = 800

            [payments]
            api_key = "sk_test"
            "#,
        )
        .unwrap();

        assert_eq!(config.checkout.transfer_discount_bps, 800);
        assert_eq!(config.checkout.gateway_surcharge_bps, 1000);
        assert!(config.payments.api_key.is_some());
        assert_eq!(config.store.name, "Layerline");
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LAYERLINE_GATEWAY_SURCHARGE_BPS", "1200"),
            ("LAYERLINE_DB_PATH", "/tmp/shop.db"),
            ("LAYERLINE_STORE_NAME", "Print Shop"),
        ]);
        let mut config = StoreConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.checkout.gateway_surcharge_bps, 1200);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.store.name, "Print Shop");
    }

    #[test]
    fn test_env_rejects_garbage_rate() {
        let mut config = StoreConfig::default();
        let result = config.apply_env(|name| {
            (name == "LAYERLINE_TRANSFER_DISCOUNT_BPS").then(|| "five".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = StoreConfig::default();
        config.checkout.gateway_surcharge_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.checkout.storage_key = "  ".into();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.payments.storage_url = "s3://bucket".into();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.server.bind_addr = "localhost".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = StoreConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(1234)), "$12.34");
        assert_eq!(config.format_currency(Money::from_cents(5)), "$0.05");
        assert_eq!(config.format_currency(Money::from_cents(-1234)), "-$12.34");

        let mut config = StoreConfig::default();
        config.store.currency_decimals = 0;
        assert_eq!(config.format_currency(Money::from_cents(950)), "$950");
    }
}
