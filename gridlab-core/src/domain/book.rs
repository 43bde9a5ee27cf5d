//! Position book: aggregates fills into one weighted-average exposure.
//!
//! The book is long-only and holds a single instrument. Valuation is kept
//! apart from the fill ledger: both PnL methods take the mark price as an
//! argument and never mutate state, so the worst-case curve can be marked at
//! the bar low while the standard curve is marked at the close.

use serde::{Deserialize, Serialize};

use super::fill::Fill;
use crate::strategy::config::{require_positive, ConfigError};

/// Point-in-time valuation of the book for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub total_lots: f64,
    pub wap: Option<f64>,
    pub unrealised_pnl: f64,
    pub worst_case_unrealised_pnl: f64,
}

/// Fill ledger for one instrument.
#[derive(Debug, Clone)]
pub struct PositionBook {
    /// Monetary value of a one-point move per lot.
    contract_size: f64,
    fills: Vec<Fill>,
}

impl PositionBook {
    /// Empty book. `contract_size` must be finite and positive.
    pub fn new(contract_size: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            contract_size: require_positive("contract_size", contract_size)?,
            fills: Vec::new(),
        })
    }

    /// Append a fill. Non-positive (or NaN) lots are silently dropped.
    pub fn add_fill(&mut self, price: f64, lots: f64) {
        if lots.is_nan() || lots <= 0.0 {
            return;
        }
        self.fills.push(Fill { price, lots });
    }

    /// Remove every fill at once.
    pub fn clear(&mut self) {
        self.fills.clear();
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn contract_size(&self) -> f64 {
        self.contract_size
    }

    /// Sum of held lots. A flat book reports `+0.0`.
    pub fn total_lots(&self) -> f64 {
        self.fills.iter().fold(0.0, |acc, f| acc + f.lots)
    }

    pub fn is_flat(&self) -> bool {
        self.fills.is_empty()
    }

    /// Weighted-average entry price, `None` when there is no exposure.
    pub fn wap(&self) -> Option<f64> {
        let total_lots = self.total_lots();
        if total_lots <= 0.0 {
            return None;
        }
        let notional = self.fills.iter().fold(0.0, |acc, f| acc + f.price * f.lots);
        Some(notional / total_lots)
    }

    /// PnL if the whole book is marked at `mark_price`.
    pub fn unrealised_pnl(&self, mark_price: f64) -> f64 {
        self.value_at(mark_price, self.total_lots(), self.wap())
    }

    /// PnL marked at a pessimistic price. For a long book that is the bar low.
    pub fn worst_case_unrealised_pnl(&self, worst_price: f64) -> f64 {
        self.value_at(worst_price, self.total_lots(), self.wap())
    }

    /// Both valuations against the same WAP and lot total.
    pub fn snapshot(&self, close_price: f64, worst_price: f64) -> BookSnapshot {
        let total_lots = self.total_lots();
        let wap = self.wap();
        BookSnapshot {
            total_lots,
            wap,
            unrealised_pnl: self.value_at(close_price, total_lots, wap),
            worst_case_unrealised_pnl: self.value_at(worst_price, total_lots, wap),
        }
    }

    fn value_at(&self, mark: f64, total_lots: f64, wap: Option<f64>) -> f64 {
        match wap {
            Some(wap) if total_lots > 0.0 => (mark - wap) * total_lots * self.contract_size,
            _ => 0.0,
        }
    }
}
