//! Entry signal emitted by the strategy once per bar.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Buy,
    None,
}

/// Per-bar strategy output. Consumed immediately by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub entry_level: Option<f64>,
    pub lots: f64,
    pub depth_levels: u32,
}

impl Signal {
    /// No entry this bar.
    pub fn none() -> Self {
        Self {
            action: SignalAction::None,
            entry_level: None,
            lots: 0.0,
            depth_levels: 0,
        }
    }

    /// Buy `lots` at `entry_level`, sized by `depth_levels`.
    pub fn buy(entry_level: f64, lots: f64, depth_levels: u32) -> Self {
        Self {
            action: SignalAction::Buy,
            entry_level: Some(entry_level),
            lots,
            depth_levels,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.action == SignalAction::Buy
    }
}
