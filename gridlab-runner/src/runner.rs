//! Backtest runner: wires together config, data, engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: resolves and loads bars, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. Used by sweeps and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use gridlab_core::{run_backtest, Bar, EngineError, EquityRow, RunSummary, TradeEvent};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_bars, LoadError, LoadOptions};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub config: BacktestConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub summary: RunSummary,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeEvent>,
    pub equity_curve: Vec<EquityRow>,
}

/// Default schema version for JSON written before the field existed.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// First and last bar dates, if any bars were processed.
    pub fn period(&self) -> Option<(String, String)> {
        let first = self.equity_curve.first()?;
        let last = self.equity_curve.last()?;
        Some((first.date.to_string(), last.date.to_string()))
    }
}

/// Run a single backtest from a config, loading bars per `opts`.
pub fn run_single_backtest(
    config: &BacktestConfig,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    let loaded = load_bars(config, opts)?;
    run_backtest_from_data(config, &loaded.bars, &loaded.dataset_hash, loaded.has_synthetic)
}

/// Run a backtest with pre-loaded bars. Does no I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    bars: &[Bar],
    dataset_hash: &str,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    let engine_config = config.to_engine_config()?;
    let run_id = config.run_id();
    let symbol = config.backtest.symbol.clone();

    info!(
        symbol = %symbol,
        run_id = %&run_id[..12],
        bars = bars.len(),
        grid_size = engine_config.strategy.grid_size,
        base_lots = engine_config.strategy.base_lots,
        buffer = engine_config.strategy.rearm_buffer_levels,
        "backtest started"
    );
    if has_synthetic {
        warn!(symbol = %symbol, "running on synthetic data");
    }

    let result = run_backtest(engine_config, bars)?;
    let metrics = PerformanceMetrics::compute(
        &result.equity_curve,
        &result.trades,
        engine_config.initial_cash,
    );

    info!(
        symbol = %symbol,
        entries = result.summary.entry_count,
        exits = result.summary.exit_count,
        final_equity_worst = result.summary.final_equity_worst,
        max_drawdown_worst_pct = result.summary.max_drawdown_worst_pct,
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol,
        config: config.clone(),
        dataset_hash: dataset_hash.to_string(),
        has_synthetic,
        summary: result.summary,
        metrics,
        trades: result.trades,
        equity_curve: result.equity_curve,
    })
}
