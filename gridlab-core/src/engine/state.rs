//! Engine configuration and the records produced by a run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::strategy::config::{require_positive, ConfigError, StrategyConfig};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub strategy: StrategyConfig,
    pub initial_cash: f64,
    /// Monetary value of a one-point move per lot.
    pub contract_size: f64,
}

impl EngineConfig {
    pub fn new(
        strategy: StrategyConfig,
        initial_cash: f64,
        contract_size: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            strategy,
            initial_cash,
            contract_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        require_positive("initial_cash", self.initial_cash)?;
        require_positive("contract_size", self.contract_size)?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            initial_cash: 100_000.0,
            contract_size: 100.0,
        }
    }
}

/// What happened to the book on a trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    /// Grid entry appended to the book.
    Entry,
    /// Whole book closed at `wap + grid_size`.
    TakeProfit,
}

/// One line of the trade log.
///
/// For entries, `wap` and `total_lots` are the post-fill values. For
/// take-profits, `wap` is the average that was closed and `total_lots` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub date: NaiveDateTime,
    pub action: TradeAction,
    pub price: f64,
    pub lots: f64,
    pub depth_levels: Option<u32>,
    pub wap: Option<f64>,
    pub total_lots: f64,
    pub realised_pnl: f64,
    pub cash: f64,
}

/// One row of the per-bar equity ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityRow {
    pub date: NaiveDateTime,
    pub cash: f64,
    pub total_lots: f64,
    pub wap: Option<f64>,
    pub equity_close: f64,
    pub equity_worst: f64,
    pub drawdown_worst_pct: f64,
}

/// Everything one bar produced, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct BarOutcome {
    pub events: Vec<TradeEvent>,
    pub row: EquityRow,
}

/// Scalar results of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_equity_worst: f64,
    pub peak_equity_worst: f64,
    pub max_drawdown_worst_pct: f64,
    pub final_equity_close: f64,
    pub final_cash: f64,
    pub bar_count: usize,
    pub entry_count: usize,
    pub exit_count: usize,
}

/// Complete output of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub summary: RunSummary,
    pub trades: Vec<TradeEvent>,
    pub equity_curve: Vec<EquityRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_cash() {
        let err = EngineConfig::new(StrategyConfig::default(), 0.0, 100.0).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotPositive {
                field: "initial_cash",
                value: 0.0
            }
        );
    }

    #[test]
    fn rejects_non_positive_contract_size() {
        let err = EngineConfig::new(StrategyConfig::default(), 1e5, -1.0).unwrap_err();
        assert!(err.to_string().contains("contract_size"));
    }

    #[test]
    fn validates_nested_strategy() {
        let mut cfg = EngineConfig::default();
        cfg.strategy.grid_size = 0.0;
        assert!(cfg.validate().is_err());
    }
}
