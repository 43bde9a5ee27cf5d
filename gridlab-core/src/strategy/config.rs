//! Strategy configuration and construction-time validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
///
/// A bad grid size corrupts every level computed from it, so configs are
/// rejected at construction instead of degrading later.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
}

/// Require `value` to be finite and strictly positive.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

/// Grid re-arm strategy parameters.
///
/// Deserialization runs the same validation as [`StrategyConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStrategyConfig")]
pub struct StrategyConfig {
    /// Spacing between grid levels, in price units.
    pub grid_size: f64,
    /// Lots bought per depth level on a trigger.
    pub base_lots: f64,
    /// How many grid levels below the armed level price may fall before the
    /// setup is abandoned. Zero is allowed.
    pub rearm_buffer_levels: u32,
}

impl StrategyConfig {
    pub fn new(
        grid_size: f64,
        base_lots: f64,
        rearm_buffer_levels: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            grid_size,
            base_lots,
            rearm_buffer_levels,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("grid_size", self.grid_size)?;
        require_positive("base_lots", self.base_lots)?;
        Ok(())
    }

    /// Distance below the armed level that disarms the setup.
    pub fn buffer(&self) -> f64 {
        f64::from(self.rearm_buffer_levels) * self.grid_size
    }
}

#[derive(Deserialize)]
struct RawStrategyConfig {
    grid_size: f64,
    base_lots: f64,
    rearm_buffer_levels: u32,
}

impl TryFrom<RawStrategyConfig> for StrategyConfig {
    type Error = ConfigError;

    fn try_from(raw: RawStrategyConfig) -> Result<Self, Self::Error> {
        Self::new(raw.grid_size, raw.base_lots, raw.rearm_buffer_levels)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            grid_size: 25.0,
            base_lots: 10.0,
            rearm_buffer_levels: 1,
        }
    }
}
