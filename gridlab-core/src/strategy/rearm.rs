//! V-shape re-arm strategy.
//!
//! State machine with two states:
//! - `Disarmed`: waiting for a bar whose low touches the grid level nearest
//!   its close. That bar arms the strategy and emits nothing.
//! - `Armed { level, lowest }`: tracking the deepest low since arming. A low
//!   at or below `level - buffer` abandons the setup. Otherwise a high back
//!   at `level` triggers a BUY sized by how many grid levels price fell.
//!
//! The strategy never looks at the position book. Re-arming after a trigger
//! is allowed while exposure is open, which is how entries pyramid into a
//! falling market.

use serde::{Deserialize, Serialize};

use crate::domain::Signal;

use super::config::{ConfigError, StrategyConfig};
use super::grid::nearest_level;

/// Internal state of the re-arm machine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum StrategyState {
    #[default]
    Disarmed,
    Armed {
        /// Grid level that must be reclaimed to trigger.
        level: f64,
        /// Lowest low seen since arming.
        lowest: f64,
    },
}

/// Grid re-arm entry generator.
#[derive(Debug, Clone)]
pub struct ReArmStrategy {
    config: StrategyConfig,
    state: StrategyState,
}

impl ReArmStrategy {
    /// Starts disarmed. Rejects a config that bypassed `StrategyConfig::new`.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: StrategyState::Disarmed,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, StrategyState::Armed { .. })
    }

    pub fn reset(&mut self) {
        self.state = StrategyState::Disarmed;
    }

    /// Evaluate one bar and return at most one entry signal.
    ///
    /// Arming, disarming and triggering are mutually exclusive within a
    /// call. When a bar both breaches the buffer and reclaims the level, the
    /// breach wins.
    pub fn on_bar(&mut self, _open: f64, high: f64, low: f64, close: f64) -> Signal {
        let grid = self.config.grid_size;

        match self.state {
            StrategyState::Disarmed => {
                let level = nearest_level(close, grid);
                if low <= level {
                    self.state = StrategyState::Armed { level, lowest: low };
                }
                Signal::none()
            }
            StrategyState::Armed { level, lowest } => {
                let lowest = lowest.min(low);

                if low <= level - self.config.buffer() {
                    self.reset();
                    return Signal::none();
                }

                if high >= level {
                    let depth = depth(level, lowest, grid);
                    let lots = self.config.base_lots * depth;
                    self.reset();
                    // The buffer check bounds depth to buffer + 1, so the cast fits.
                    return Signal::buy(level, lots, depth as u32);
                }

                self.state = StrategyState::Armed { level, lowest };
                Signal::none()
            }
        }
    }
}

/// Whole grid steps between `level` and `lowest`, plus one. Never below 1.
fn depth(level: f64, lowest: f64, grid: f64) -> f64 {
    ((level - lowest) / grid).floor().max(0.0) + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalAction;

    fn strategy(buffer: u32) -> ReArmStrategy {
        ReArmStrategy::new(StrategyConfig::new(25.0, 10.0, buffer).unwrap()).unwrap()
    }

    /// Arms at 4450: close rounds to 4450 and the low touches it.
    fn arm_at_4450(s: &mut ReArmStrategy) {
        let sig = s.on_bar(4460.0, 4462.0, 4445.0, 4448.0);
        assert_eq!(sig.action, SignalAction::None);
        assert_eq!(
            s.state(),
            StrategyState::Armed {
                level: 4450.0,
                lowest: 4445.0
            }
        );
    }

    #[test]
    fn starts_disarmed() {
        let s = strategy(1);
        assert_eq!(s.state(), StrategyState::Disarmed);
        assert!(!s.is_armed());
    }

    #[test]
    fn stays_disarmed_when_low_above_level() {
        let mut s = strategy(1);
        // close 4482 -> level 4475, low 4480 above it
        let sig = s.on_bar(4485.0, 4490.0, 4480.0, 4482.0);
        assert_eq!(sig, Signal::none());
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn arming_bar_never_triggers() {
        let mut s = strategy(1);
        // high well above the level on the arming bar itself
        let sig = s.on_bar(4440.0, 4500.0, 4440.0, 4449.0);
        assert_eq!(sig.action, SignalAction::None);
        assert!(s.is_armed());
    }

    #[test]
    fn triggers_on_reclaim_with_depth_one() {
        let mut s = strategy(1);
        arm_at_4450(&mut s);
        let sig = s.on_bar(4435.0, 4452.0, 4430.0, 4451.0);
        assert_eq!(sig.action, SignalAction::Buy);
        assert_eq!(sig.entry_level, Some(4450.0));
        assert_eq!(sig.depth_levels, 1);
        assert_eq!(sig.lots, 10.0);
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn depth_counts_grid_steps_below_level() {
        // armed 4450, lowest 4375, grid 25 -> floor(75/25) + 1 = 4
        let mut s = strategy(4);
        arm_at_4450(&mut s);
        let sig = s.on_bar(4400.0, 4405.0, 4375.0, 4380.0);
        assert_eq!(sig.action, SignalAction::None);
        assert_eq!(
            s.state(),
            StrategyState::Armed {
                level: 4450.0,
                lowest: 4375.0
            }
        );

        let sig = s.on_bar(4390.0, 4455.0, 4390.0, 4452.0);
        assert_eq!(sig.action, SignalAction::Buy);
        assert_eq!(sig.depth_levels, 4);
        assert_eq!(sig.lots, 40.0);
    }

    #[test]
    fn lowest_tracks_minimum_low() {
        let mut s = strategy(4);
        arm_at_4450(&mut s);
        s.on_bar(4430.0, 4440.0, 4410.0, 4420.0);
        s.on_bar(4420.0, 4440.0, 4420.0, 4430.0);
        assert_eq!(
            s.state(),
            StrategyState::Armed {
                level: 4450.0,
                lowest: 4410.0
            }
        );
    }

    #[test]
    fn disarms_when_buffer_breached() {
        let mut s = strategy(1);
        arm_at_4450(&mut s);
        let sig = s.on_bar(4440.0, 4440.0, 4425.0, 4430.0);
        assert_eq!(sig, Signal::none());
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn disarm_takes_precedence_over_trigger() {
        let mut s = strategy(1);
        arm_at_4450(&mut s);
        // low breaches 4425 and high reclaims 4450 on the same bar
        let sig = s.on_bar(4440.0, 4460.0, 4420.0, 4455.0);
        assert_eq!(sig.action, SignalAction::None);
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn zero_buffer_disarms_on_any_touch() {
        let mut s = strategy(0);
        arm_at_4450(&mut s);
        let sig = s.on_bar(4455.0, 4470.0, 4450.0, 4465.0);
        assert_eq!(sig.action, SignalAction::None);
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn waits_while_armed_below_level() {
        let mut s = strategy(2);
        arm_at_4450(&mut s);
        let sig = s.on_bar(4440.0, 4445.0, 4430.0, 4440.0);
        assert_eq!(sig.action, SignalAction::None);
        assert!(s.is_armed());
    }

    #[test]
    fn can_rearm_after_trigger() {
        let mut s = strategy(1);
        arm_at_4450(&mut s);
        assert!(s.on_bar(4435.0, 4452.0, 4430.0, 4451.0).is_buy());
        // next bar re-arms at 4425
        s.on_bar(4440.0, 4442.0, 4420.0, 4430.0);
        assert_eq!(
            s.state(),
            StrategyState::Armed {
                level: 4425.0,
                lowest: 4420.0
            }
        );
    }

    #[test]
    fn reset_discards_state() {
        let mut s = strategy(1);
        arm_at_4450(&mut s);
        s.reset();
        assert_eq!(s.state(), StrategyState::Disarmed);
    }

    #[test]
    fn depth_helper() {
        assert_eq!(depth(4450.0, 4375.0, 25.0), 4.0);
        assert_eq!(depth(4450.0, 4450.0, 25.0), 1.0);
        assert_eq!(depth(4450.0, 4426.0, 25.0), 1.0);
        assert_eq!(depth(4450.0, 4460.0, 25.0), 1.0);
    }

    #[test]
    fn depth_is_not_capped_at_u32() {
        // 4450 / 1e-6 steps is past u32::MAX
        let d = depth(4450.0, 0.0, 1e-6);
        assert!(d > f64::from(u32::MAX));
        assert_eq!(d as u32, u32::MAX);
    }

    #[test]
    fn deep_trigger_sizes_lots_from_depth() {
        let cfg = StrategyConfig::new(1.0, 2.5, 1_000).unwrap();
        let mut s = ReArmStrategy::new(cfg).unwrap();
        s.on_bar(4450.0, 4450.0, 4450.0, 4450.0);
        s.on_bar(4450.0, 4449.0, 3950.0, 3960.0);
        let sig = s.on_bar(3960.0, 4450.0, 3960.0, 4440.0);
        assert!(sig.is_buy());
        assert_eq!(sig.depth_levels, 501);
        assert_eq!(sig.lots, 2.5 * 501.0);
    }

    #[test]
    fn rejects_unvalidated_config() {
        let cfg = StrategyConfig {
            grid_size: 0.0,
            base_lots: -10.0,
            rearm_buffer_levels: 1,
        };
        let err = ReArmStrategy::new(cfg).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotPositive {
                field: "grid_size",
                value: 0.0
            }
        );
    }
}
