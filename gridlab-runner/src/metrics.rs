//! Performance metrics: pure functions over the engine's logs.
//!
//! Every metric is a pure function: equity curve and/or trade log in, scalar
//! out. No dependencies on the runner, data pipeline, or engine state.

use serde::{Deserialize, Serialize};

use gridlab_core::{EquityRow, TradeAction, TradeEvent};

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Final close-marked equity over initial cash, minus one.
    pub total_return: f64,
    /// Deepest drawdown of the close-marked curve, as a negative fraction.
    pub max_drawdown_close: f64,
    /// Deepest drawdown of the worst-case curve, as a negative fraction.
    pub max_drawdown_worst: f64,
    /// How much deeper the worst-case drawdown runs than the close-based one.
    pub drawdown_gap: f64,
    pub entry_count: usize,
    pub exit_count: usize,
    pub max_lots_held: f64,
    pub max_depth_levels: u32,
    pub total_realised_pnl: f64,
    /// Mean entries per completed take-profit cycle.
    pub avg_entries_per_cycle: f64,
    /// Fraction of bars that ended with an open book.
    pub exposure: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from the equity log and trade log.
    pub fn compute(equity: &[EquityRow], trades: &[TradeEvent], initial_cash: f64) -> Self {
        let close_curve = with_initial(initial_cash, equity.iter().map(|r| r.equity_close));
        let worst_curve = with_initial(initial_cash, equity.iter().map(|r| r.equity_worst));
        let max_drawdown_close = max_drawdown(&close_curve);
        let max_drawdown_worst = max_drawdown(&worst_curve);

        Self {
            total_return: total_return(&close_curve),
            max_drawdown_close,
            max_drawdown_worst,
            drawdown_gap: max_drawdown_close - max_drawdown_worst,
            entry_count: count_action(trades, TradeAction::Entry),
            exit_count: count_action(trades, TradeAction::TakeProfit),
            max_lots_held: max_lots_held(equity),
            max_depth_levels: max_depth_levels(trades),
            total_realised_pnl: total_realised_pnl(trades),
            avg_entries_per_cycle: avg_entries_per_cycle(trades),
            exposure: exposure(equity),
        }
    }
}

fn with_initial(initial: f64, rest: impl Iterator<Item = f64>) -> Vec<f64> {
    std::iter::once(initial).chain(rest).collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (final_eq - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g. -0.15 for a 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

pub fn count_action(trades: &[TradeEvent], action: TradeAction) -> usize {
    trades.iter().filter(|t| t.action == action).count()
}

/// Largest book carried at the end of any bar.
pub fn max_lots_held(equity: &[EquityRow]) -> f64 {
    equity.iter().map(|r| r.total_lots).fold(0.0, f64::max)
}

/// Deepest V an entry was sized for.
pub fn max_depth_levels(trades: &[TradeEvent]) -> u32 {
    trades
        .iter()
        .filter_map(|t| t.depth_levels)
        .max()
        .unwrap_or(0)
}

pub fn total_realised_pnl(trades: &[TradeEvent]) -> f64 {
    trades.iter().fold(0.0, |acc, t| acc + t.realised_pnl)
}

/// Mean number of entries stacked before each take-profit. Entries still
/// open at the end of the run are not a completed cycle.
pub fn avg_entries_per_cycle(trades: &[TradeEvent]) -> f64 {
    let mut cycles = 0usize;
    let mut entries_in_cycles = 0usize;
    let mut open_entries = 0usize;

    for trade in trades {
        match trade.action {
            TradeAction::Entry => open_entries += 1,
            TradeAction::TakeProfit => {
                cycles += 1;
                entries_in_cycles += open_entries;
                open_entries = 0;
            }
        }
    }

    if cycles == 0 {
        0.0
    } else {
        entries_in_cycles as f64 / cycles as f64
    }
}

/// Fraction of bars that ended holding lots.
pub fn exposure(equity: &[EquityRow]) -> f64 {
    if equity.is_empty() {
        return 0.0;
    }
    let held = equity.iter().filter(|r| r.total_lots > 0.0).count();
    held as f64 / equity.len() as f64
}
