//! Tariff engine configuration
//!
//! Sources, later ones win: defaults, `.env`, optional `solclean.toml`,
//! `SOLCLEAN__*` environment variables, then the platform `PORT` variable.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file (without extension)
pub const CONFIG_FILE_ENV: &str = "SOLCLEAN_CONFIG";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TarifConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
    /// JSON catalog seeding the in-memory store
    pub catalog_path: Option<String>,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Quote settings
    pub pricing: PricingSettings,
}

impl Default for TarifConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8086,
            catalog_path: None,
            log_json: false,
            pricing: PricingSettings::default(),
        }
    }
}

impl TarifConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "solclean".to_string());
        let mut cfg = Self::load_from(&file)?;

        // Platform-provided PORT takes priority
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        Ok(cfg)
    }

    /// Load from an optional config file plus `SOLCLEAN__*` variables
    pub fn load_from(file: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("SOLCLEAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(cfg)
    }
}

/// Quote settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// ISO 4217 currency of every amount
    pub currency: String,
    /// Decimal places of quoted money amounts
    pub money_scale: u32,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            currency: solclean_common::DEFAULT_CURRENCY.to_string(),
            money_scale: solclean_common::DEFAULT_MONEY_SCALE,
        }
    }
}
