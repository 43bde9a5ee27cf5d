//! Bar-by-bar backtest loop.
//!
//! Each bar runs to completion before the next one is read:
//! 1. Strategy: `on_bar`, and on BUY append the fill to the book
//! 2. Exit: close the whole book at `wap + grid_size` if the high reaches it
//! 3. Mark: snapshot the book at close (standard) and low (worst case)
//! 4. Drawdown: update the worst-case peak and drawdown
//! 5. Record the equity row
//!
//! An entry and an exit can both happen on one bar. They see the book in
//! that order.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Bar, PositionBook};
use crate::strategy::{ConfigError, ReArmStrategy};

use super::accounting::EquityTracker;
use super::state::{
    BarOutcome, EngineConfig, EquityRow, RunResult, RunSummary, TradeAction, TradeEvent,
};

/// Errors that abort a run. Bars are never skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("bar {index} at {date} failed OHLC sanity check")]
    InvalidBar { index: usize, date: NaiveDateTime },

    #[error("bar {index} at {date} is not after the previous bar at {previous}")]
    OutOfOrder {
        index: usize,
        date: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Single-instrument grid backtest engine.
///
/// Owns its book and strategy exclusively. Running another configuration
/// means building another engine.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: EngineConfig,
    strategy: ReArmStrategy,
    book: PositionBook,
    accounting: EquityTracker,
    trades: Vec<TradeEvent>,
    equity_curve: Vec<EquityRow>,
    last_date: Option<NaiveDateTime>,
    bar_index: usize,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            strategy: ReArmStrategy::new(config.strategy)?,
            book: PositionBook::new(config.contract_size)?,
            accounting: EquityTracker::new(config.initial_cash),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_date: None,
            bar_index: 0,
        })
    }

    /// Process one bar. The returned outcome is also appended to the logs.
    pub fn process_bar(&mut self, bar: &Bar) -> Result<BarOutcome, EngineError> {
        self.check_bar(bar)?;

        let mut events = Vec::new();

        // ─── Entry ───
        let signal = self.strategy.on_bar(bar.open, bar.high, bar.low, bar.close);
        if let Some(entry_level) = signal.entry_level.filter(|_| signal.is_buy()) {
            self.book.add_fill(entry_level, signal.lots);
            let total_lots = self.book.total_lots();
            let wap = self.book.wap();
            debug!(
                date = %bar.date,
                price = entry_level,
                lots = signal.lots,
                depth = signal.depth_levels,
                wap = ?wap,
                total_lots,
                "grid entry filled"
            );
            events.push(TradeEvent {
                date: bar.date,
                action: TradeAction::Entry,
                price: entry_level,
                lots: signal.lots,
                depth_levels: Some(signal.depth_levels),
                wap,
                total_lots,
                realised_pnl: 0.0,
                cash: self.accounting.cash(),
            });
        }

        // ─── Take profit ───
        if let Some(event) = self.try_take_profit(bar) {
            events.push(event);
        }

        // ─── Mark to market ───
        let snapshot = self.book.snapshot(bar.close, bar.low);
        let mark = self.accounting.mark(&snapshot);
        let row = EquityRow {
            date: bar.date,
            cash: self.accounting.cash(),
            total_lots: snapshot.total_lots,
            wap: snapshot.wap,
            equity_close: mark.equity_close,
            equity_worst: mark.equity_worst,
            drawdown_worst_pct: mark.drawdown_worst_pct,
        };

        self.trades.extend_from_slice(&events);
        self.equity_curve.push(row);
        self.last_date = Some(bar.date);
        self.bar_index += 1;

        Ok(BarOutcome { events, row })
    }

    /// Run every bar in order, then return the full result.
    pub fn run(mut self, bars: &[Bar]) -> Result<RunResult, EngineError> {
        for bar in bars {
            self.process_bar(bar)?;
        }
        Ok(self.finish())
    }

    /// Run every bar, handing each outcome to `sink` as soon as it exists.
    pub fn run_with<F>(&mut self, bars: &[Bar], mut sink: F) -> Result<(), EngineError>
    where
        F: FnMut(&BarOutcome),
    {
        for bar in bars {
            let outcome = self.process_bar(bar)?;
            sink(&outcome);
        }
        Ok(())
    }

    /// Consume the engine into its logs and summary.
    pub fn finish(self) -> RunResult {
        let summary = self.summary();
        RunResult {
            summary,
            trades: self.trades,
            equity_curve: self.equity_curve,
        }
    }

    pub fn summary(&self) -> RunSummary {
        let last = self.equity_curve.last();
        let count = |action: TradeAction| {
            self.trades.iter().filter(|t| t.action == action).count()
        };
        RunSummary {
            final_equity_worst: last.map_or(self.config.initial_cash, |r| r.equity_worst),
            peak_equity_worst: self.accounting.peak_equity_worst(),
            max_drawdown_worst_pct: self.accounting.max_drawdown_worst_pct(),
            final_equity_close: last.map_or(self.config.initial_cash, |r| r.equity_close),
            final_cash: self.accounting.cash(),
            bar_count: self.equity_curve.len(),
            entry_count: count(TradeAction::Entry),
            exit_count: count(TradeAction::TakeProfit),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn strategy(&self) -> &ReArmStrategy {
        &self.strategy
    }

    pub fn cash(&self) -> f64 {
        self.accounting.cash()
    }

    pub fn peak_equity_worst(&self) -> f64 {
        self.accounting.peak_equity_worst()
    }

    pub fn max_drawdown_worst_pct(&self) -> f64 {
        self.accounting.max_drawdown_worst_pct()
    }

    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityRow] {
        &self.equity_curve
    }

    fn check_bar(&self, bar: &Bar) -> Result<(), EngineError> {
        let index = self.bar_index;
        if !bar.is_sane() {
            return Err(EngineError::InvalidBar {
                index,
                date: bar.date,
            });
        }
        if let Some(previous) = self.last_date {
            if bar.date <= previous {
                return Err(EngineError::OutOfOrder {
                    index,
                    date: bar.date,
                    previous,
                });
            }
        }
        Ok(())
    }

    /// Close the whole book at `wap + grid_size` if this bar's high reaches it.
    fn try_take_profit(&mut self, bar: &Bar) -> Option<TradeEvent> {
        let total_lots = self.book.total_lots();
        let wap = self.book.wap().filter(|_| total_lots > 0.0)?;
        let tp = wap + self.config.strategy.grid_size;
        if bar.high < tp {
            return None;
        }

        let realised = (tp - wap) * total_lots * self.config.contract_size;
        self.accounting.realise(realised);
        self.book.clear();

        let cash = self.accounting.cash();
        info!(
            date = %bar.date,
            price = tp,
            lots = total_lots,
            wap,
            realised,
            cash,
            "take profit, book closed"
        );
        Some(TradeEvent {
            date: bar.date,
            action: TradeAction::TakeProfit,
            price: tp,
            lots: total_lots,
            depth_levels: None,
            wap: Some(wap),
            total_lots: 0.0,
            realised_pnl: realised,
            cash,
        })
    }
}

/// Build an engine for `config` and run it over `bars`.
pub fn run_backtest(config: EngineConfig, bars: &[Bar]) -> Result<RunResult, EngineError> {
    BacktestEngine::new(config)?.run(bars)
}
