//! Backtesting engine: bar-by-bar loop, cash accounting, worst-case drawdown.
//!
//! The engine consumes chronologically ordered bars and, per bar:
//!
//! 1. Asks the re-arm strategy for an entry and fills it into the book
//! 2. Closes the whole book at the fixed take-profit if the high reaches it
//! 3. Marks the book at the close (standard) and at the low (worst case)
//! 4. Tracks the peak and drawdown of the worst-case equity curve

pub mod accounting;
pub mod loop_runner;
pub mod state;

pub use accounting::{drawdown_pct, EquityMark, EquityTracker};
pub use loop_runner::{run_backtest, BacktestEngine, EngineError};
pub use state::{
    BarOutcome, EngineConfig, EquityRow, RunResult, RunSummary, TradeAction, TradeEvent,
};
