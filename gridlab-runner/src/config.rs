//! Serializable backtest configuration.
//!
//! A run is described by a small TOML file:
//!
//! ```toml
//! [backtest]
//! symbol = "XAUUSD"
//! data = "data/xauusd_h1.csv"
//! initial_cash = 100000.0
//! contract_size = 100.0
//!
//! [strategy]
//! grid_size = 25.0
//! base_lots = 10.0
//! rearm_buffer_levels = 1
//! ```
//!
//! Every field except `symbol` has a default, so a two-line file is a valid
//! config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridlab_core::{ConfigError as CoreConfigError, EngineConfig, StrategyConfig};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a run config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] CoreConfigError),
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
}

/// `[backtest]`: instrument, data source and account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    /// CSV file with `date,open,high,low,close`. Overridden by `--data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
}

/// `[strategy]`: grid re-arm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default = "default_base_lots")]
    pub base_lots: f64,
    #[serde(default = "default_rearm_buffer_levels")]
    pub rearm_buffer_levels: u32,
}

fn default_initial_cash() -> f64 {
    100_000.0
}

fn default_contract_size() -> f64 {
    100.0
}

fn default_grid_size() -> f64 {
    25.0
}

fn default_base_lots() -> f64 {
    10.0
}

fn default_rearm_buffer_levels() -> u32 {
    1
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            base_lots: default_base_lots(),
            rearm_buffer_levels: default_rearm_buffer_levels(),
        }
    }
}

impl BacktestConfig {
    /// Config with default account and strategy parameters for `symbol`.
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                data: None,
                initial_cash: default_initial_cash(),
                contract_size: default_contract_size(),
            },
            strategy: StrategySection::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Values are validated here so a bad
    /// file fails before any data is loaded.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.to_engine_config()?;
        Ok(config)
    }

    /// Build the validated core strategy config.
    pub fn to_strategy_config(&self) -> Result<StrategyConfig, ConfigError> {
        Ok(StrategyConfig::new(
            self.strategy.grid_size,
            self.strategy.base_lots,
            self.strategy.rearm_buffer_levels,
        )?)
    }

    /// Build the validated core engine config.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(EngineConfig::new(
            self.to_strategy_config()?,
            self.backtest.initial_cash,
            self.backtest.contract_size,
        )?)
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// BLAKE3 over canonical JSON (sorted keys) of the symbol, account and
    /// strategy parameters. The data path is not part of the ID; data
    /// identity lives in the result's dataset hash.
    pub fn run_id(&self) -> RunId {
        let json = self.identity_json().to_string();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    fn identity_json(&self) -> serde_json::Value {
        serde_json::json!({
            "symbol": self.backtest.symbol,
            "initial_cash": self.backtest.initial_cash,
            "contract_size": self.backtest.contract_size,
            "strategy": {
                "grid_size": self.strategy.grid_size,
                "base_lots": self.strategy.base_lots,
                "rearm_buffer_levels": self.strategy.rearm_buffer_levels,
            },
        })
    }

    /// Copy of this config with different strategy parameters.
    pub fn with_strategy(&self, grid_size: f64, base_lots: f64, rearm_buffer_levels: u32) -> Self {
        let mut config = self.clone();
        config.strategy = StrategySection {
            grid_size,
            base_lots,
            rearm_buffer_levels,
        };
        config
    }
}
