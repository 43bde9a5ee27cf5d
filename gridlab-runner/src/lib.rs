//! GridLab Runner: backtest orchestration around `gridlab-core`.
//!
//! This crate provides:
//! - TOML run configuration with deterministic run IDs
//! - Bar loading from CSV with a synthetic fallback for smoke runs
//! - Single-backtest runner with metrics and provenance
//! - Parallel parameter sweeps
//! - JSON/CSV/Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{
    dataset_hash, generate_synthetic_bars, load_bars, load_bars_csv, DataSource, LoadError,
    LoadOptions, LoadedData,
};
pub use export::{export_json, import_json, save_artifacts, save_sweep};
pub use metrics::PerformanceMetrics;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};
pub use sweep::{run_sweep, SweepGrid, SweepRow};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<SweepGrid>();
        assert_sync::<SweepGrid>();
        assert_send::<SweepRow>();
        assert_sync::<SweepRow>();
    }
}
