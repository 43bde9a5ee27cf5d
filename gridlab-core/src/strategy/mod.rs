//! Grid re-arm strategy: configuration, level locator, state machine.

pub mod config;
pub mod grid;
pub mod rearm;

pub use config::{ConfigError, StrategyConfig};
pub use grid::nearest_level;
pub use rearm::{ReArmStrategy, StrategyState};
