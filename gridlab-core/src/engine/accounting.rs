use crate::domain::BookSnapshot;

/// Drawdown in percent of `peak`. Zero when the peak is not positive.
pub fn drawdown_pct(peak: f64, equity: f64) -> f64 {
    if peak <= 0.0 {
        return 0.0;
    }
    (peak - equity) / peak * 100.0
}

/// Equity values for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityMark {
    pub equity_close: f64,
    pub equity_worst: f64,
    pub drawdown_worst_pct: f64,
}

/// Cash, realised PnL and worst-case peak/drawdown tracker
#[derive(Debug, Clone)]
pub struct EquityTracker {
    initial_cash: f64,
    cash: f64,
    realised_pnl: f64,
    peak_equity_worst: f64,
    max_drawdown_worst_pct: f64,
}

impl EquityTracker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            realised_pnl: 0.0,
            peak_equity_worst: initial_cash,
            max_drawdown_worst_pct: 0.0,
        }
    }

    /// Book realised PnL into cash.
    pub fn realise(&mut self, pnl: f64) {
        self.cash += pnl;
        self.realised_pnl += pnl;
    }

    /// Mark the book against cash and update the running peak and max drawdown.
    pub fn mark(&mut self, snapshot: &BookSnapshot) -> EquityMark {
        let equity_close = self.cash + snapshot.unrealised_pnl;
        let equity_worst = self.cash + snapshot.worst_case_unrealised_pnl;

        self.peak_equity_worst = self.peak_equity_worst.max(equity_worst);
        let drawdown_worst_pct = drawdown_pct(self.peak_equity_worst, equity_worst);
        self.max_drawdown_worst_pct = self.max_drawdown_worst_pct.max(drawdown_worst_pct);

        EquityMark {
            equity_close,
            equity_worst,
            drawdown_worst_pct,
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realised_pnl(&self) -> f64 {
        self.realised_pnl
    }

    pub fn peak_equity_worst(&self) -> f64 {
        self.peak_equity_worst
    }

    pub fn max_drawdown_worst_pct(&self) -> f64 {
        self.max_drawdown_worst_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(unrealised: f64, worst: f64) -> BookSnapshot {
        BookSnapshot {
            total_lots: 1.0,
            wap: Some(100.0),
            unrealised_pnl: unrealised,
            worst_case_unrealised_pnl: worst,
        }
    }

    #[test]
    fn test_realise_moves_cash() {
        let mut tracker = EquityTracker::new(10_000.0);
        tracker.realise(250.0);
        assert_eq!(tracker.cash(), 10_250.0);
        assert_eq!(tracker.realised_pnl(), 250.0);
        assert_eq!(tracker.initial_cash(), 10_000.0);
    }

    #[test]
    fn test_peak_starts_at_initial_cash() {
        let mut tracker = EquityTracker::new(10_000.0);
        let mark = tracker.mark(&snapshot(-100.0, -500.0));
        assert_eq!(tracker.peak_equity_worst(), 10_000.0);
        assert_eq!(mark.equity_close, 9_900.0);
        assert_eq!(mark.equity_worst, 9_500.0);
        assert!((mark.drawdown_worst_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_follows_new_highs() {
        let mut tracker = EquityTracker::new(10_000.0);
        tracker.mark(&snapshot(0.0, 2_000.0));
        assert_eq!(tracker.peak_equity_worst(), 12_000.0);
        let mark = tracker.mark(&snapshot(0.0, -1_600.0));
        assert_eq!(tracker.peak_equity_worst(), 12_000.0);
        assert!((mark.drawdown_worst_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_drawdown_is_running_maximum() {
        let mut tracker = EquityTracker::new(10_000.0);
        tracker.mark(&snapshot(0.0, -2_000.0));
        tracker.mark(&snapshot(0.0, -500.0));
        assert!((tracker.max_drawdown_worst_pct() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_drawdown_guard_for_non_positive_peak() {
        assert_eq!(drawdown_pct(0.0, -10.0), 0.0);
        assert_eq!(drawdown_pct(-5.0, -10.0), 0.0);
        assert_eq!(drawdown_pct(100.0, 100.0), 0.0);
    }
}
