//! Artifact bundle tests: directory layout, manifest reload, sweep export.

use std::path::PathBuf;

use gridlab_runner::config::BacktestConfig;
use gridlab_runner::data_loader::{load_bars_csv, LoadOptions};
use gridlab_runner::export::{
    artifact_dir_name, export_json, load_artifacts, save_artifacts, save_sweep,
};
use gridlab_runner::runner::{run_single_backtest, BacktestResult, SCHEMA_VERSION};
use gridlab_runner::sweep::{run_sweep, SweepGrid};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/xauusd_h1_sample.csv")
}

fn fixture_result() -> BacktestResult {
    let opts = LoadOptions {
        data: Some(fixture_path()),
        synthetic: false,
    };
    run_single_backtest(&BacktestConfig::for_symbol("XAUUSD"), &opts).unwrap()
}

#[test]
fn save_artifacts_writes_full_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let result = fixture_result();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    assert_eq!(run_dir, dir.path().join(artifact_dir_name(&result)));
    for file in ["manifest.json", "trades.csv", "equity.csv", "summary.md"] {
        assert!(run_dir.join(file).is_file(), "missing {file}");
    }

    let trades = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), 1 + result.trades.len());

    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), 1 + result.equity_curve.len());

    let summary = std::fs::read_to_string(run_dir.join("summary.md")).unwrap();
    assert!(summary.contains("XAUUSD"));
    assert!(summary.contains("68.75%"));
}

#[test]
fn manifest_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let result = fixture_result();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.dataset_hash, result.dataset_hash);
    assert_eq!(loaded.trades, result.trades);
    assert_eq!(loaded.summary, result.summary);
}

#[test]
fn same_config_reuses_directory() {
    let dir = tempfile::tempdir().unwrap();
    let result = fixture_result();
    let first = save_artifacts(&result, dir.path()).unwrap();
    let second = save_artifacts(&result, dir.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn newer_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut result = fixture_result();
    result.schema_version = SCHEMA_VERSION + 1;
    std::fs::write(dir.path().join("manifest.json"), export_json(&result).unwrap()).unwrap();
    assert!(load_artifacts(dir.path()).is_err());
}

#[test]
fn sweep_csv_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let bars = load_bars_csv(&fixture_path()).unwrap();
    let grid = SweepGrid::new(vec![25.0, 50.0], vec![10.0], vec![1, 2]);
    let rows = run_sweep(&BacktestConfig::for_symbol("XAUUSD"), &grid, &bars).unwrap();

    let out = dir.path().join("sweeps");
    let path = save_sweep(&rows, &out).unwrap();
    assert_eq!(path, out.join("sweep.csv"));

    let csv = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + 4);
    assert!(lines[0].starts_with("rank,grid_size,base_lots"));
    assert!(lines[1].starts_with("1,"));
}
