//! Parameter sweep over grid size, base lots and re-arm buffer.
//!
//! Every combination runs on its own engine over the same bars, in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use gridlab_core::{run_backtest, Bar};

use crate::config::BacktestConfig;
use crate::runner::RunError;

/// Values to try on each strategy axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub grid_sizes: Vec<f64>,
    pub base_lots: Vec<f64>,
    pub buffers: Vec<u32>,
}

impl SweepGrid {
    pub fn new(grid_sizes: Vec<f64>, base_lots: Vec<f64>, buffers: Vec<u32>) -> Self {
        Self {
            grid_sizes,
            base_lots,
            buffers,
        }
    }

    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.grid_sizes.len() * self.base_lots.len() * self.buffers.len()
    }

    /// Generates all configurations in the grid, keeping the base config's
    /// symbol and account settings.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &grid in &self.grid_sizes {
            for &lots in &self.base_lots {
                for &buffer in &self.buffers {
                    configs.push(base.with_strategy(grid, lots, buffer));
                }
            }
        }
        configs
    }
}

/// One ranked sweep result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub grid_size: f64,
    pub base_lots: f64,
    pub rearm_buffer_levels: u32,
    pub final_equity_worst: f64,
    pub peak_equity_worst: f64,
    pub max_drawdown_worst_pct: f64,
    pub final_equity_close: f64,
    pub final_cash: f64,
    pub entry_count: usize,
    pub exit_count: usize,
}

/// Run every combination in `grid` over `bars`.
///
/// Rows are sorted by the lowest max worst-case drawdown, then by the highest
/// final worst-case equity. Any invalid combination or bad bar fails the
/// whole sweep.
pub fn run_sweep(
    base: &BacktestConfig,
    grid: &SweepGrid,
    bars: &[Bar],
) -> Result<Vec<SweepRow>, RunError> {
    let configs = grid.generate_configs(base);
    info!(
        symbol = %base.backtest.symbol,
        combinations = configs.len(),
        bars = bars.len(),
        "sweep started"
    );

    let mut rows = configs
        .par_iter()
        .map(|config| run_one(config, bars))
        .collect::<Result<Vec<_>, RunError>>()?;

    rows.sort_by(|a, b| {
        a.max_drawdown_worst_pct
            .total_cmp(&b.max_drawdown_worst_pct)
            .then_with(|| b.final_equity_worst.total_cmp(&a.final_equity_worst))
    });

    info!(rows = rows.len(), "sweep finished");
    Ok(rows)
}

fn run_one(config: &BacktestConfig, bars: &[Bar]) -> Result<SweepRow, RunError> {
    let engine_config = config.to_engine_config()?;
    let summary = run_backtest(engine_config, bars)?.summary;
    Ok(SweepRow {
        grid_size: config.strategy.grid_size,
        base_lots: config.strategy.base_lots,
        rearm_buffer_levels: config.strategy.rearm_buffer_levels,
        final_equity_worst: summary.final_equity_worst,
        peak_equity_worst: summary.peak_equity_worst,
        max_drawdown_worst_pct: summary.max_drawdown_worst_pct,
        final_equity_close: summary.final_equity_close,
        final_cash: summary.final_cash,
        entry_count: summary.entry_count,
        exit_count: summary.exit_count,
    })
}
