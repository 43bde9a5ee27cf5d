//! GridLab Core: position book, grid re-arm strategy, worst-case equity engine.
//!
//! This crate contains the heart of the grid backtester:
//! - Domain types (bars, fills, signals) and the weighted-average position book
//! - Grid level locator and the re-arm entry state machine
//! - Bar-by-bar engine with fixed take-profit exits, cash accounting, and
//!   peak-to-trough drawdown on the worst-case (bar low) equity curve

pub mod domain;
pub mod engine;
pub mod strategy;

pub use domain::{Bar, BookSnapshot, Fill, PositionBook, Signal, SignalAction};
pub use engine::{
    run_backtest, BacktestEngine, EngineConfig, EngineError, EquityRow, RunResult, RunSummary,
    TradeAction, TradeEvent,
};
pub use strategy::{ConfigError, ReArmStrategy, StrategyConfig, StrategyState};
