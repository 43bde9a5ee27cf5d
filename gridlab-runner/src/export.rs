//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade log, equity ledger and sweep table for external tools
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use gridlab_core::{EquityRow, TradeAction, TradeEvent};

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepRow;

/// Length of the run ID prefix used in artifact directory names.
const RUN_ID_PREFIX_LEN: usize = 12;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt_cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}

fn action_label(action: TradeAction) -> &'static str {
    match action {
        TradeAction::Entry => "ENTRY",
        TradeAction::TakeProfit => "TAKE_PROFIT",
    }
}

/// Export the trade log as CSV.
///
/// Columns: date, action, price, lots, depth_levels, wap, total_lots,
/// realised_pnl, cash. `depth_levels` and `wap` are empty cells when absent.
pub fn export_trades_csv(trades: &[TradeEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "action",
        "price",
        "lots",
        "depth_levels",
        "wap",
        "total_lots",
        "realised_pnl",
        "cash",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.date.to_string(),
            action_label(t.action),
            &format!("{:.6}", t.price),
            &format!("{:.4}", t.lots),
            &t.depth_levels.map_or_else(String::new, |d| d.to_string()),
            &opt_cell(t.wap, 6),
            &format!("{:.4}", t.total_lots),
            &format!("{:.2}", t.realised_pnl),
            &format!("{:.2}", t.cash),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the per-bar equity ledger as CSV. An empty book has an empty `wap`.
pub fn export_equity_csv(equity_curve: &[EquityRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "cash",
        "total_lots",
        "wap",
        "equity_close",
        "equity_worst",
        "drawdown_worst_pct",
    ])?;
    for row in equity_curve {
        wtr.write_record([
            &row.date.to_string(),
            &format!("{:.2}", row.cash),
            &format!("{:.4}", row.total_lots),
            &opt_cell(row.wap, 6),
            &format!("{:.2}", row.equity_close),
            &format!("{:.2}", row.equity_worst),
            &format!("{:.4}", row.drawdown_worst_pct),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export ranked sweep rows as CSV, keeping their order.
pub fn export_sweep_csv(rows: &[SweepRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "grid_size",
        "base_lots",
        "rearm_buffer_levels",
        "final_equity_worst",
        "peak_equity_worst",
        "max_drawdown_worst_pct",
        "final_equity_close",
        "final_cash",
        "entry_count",
        "exit_count",
    ])?;
    for (i, r) in rows.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &r.grid_size.to_string(),
            &r.base_lots.to_string(),
            &r.rearm_buffer_levels.to_string(),
            &format!("{:.2}", r.final_equity_worst),
            &format!("{:.2}", r.peak_equity_worst),
            &format!("{:.4}", r.max_drawdown_worst_pct),
            &format!("{:.2}", r.final_equity_close),
            &format!("{:.2}", r.final_cash),
            &r.entry_count.to_string(),
            &r.exit_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run: `{symbol}_{run_id prefix}`.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    let prefix_len = RUN_ID_PREFIX_LEN.min(result.run_id.len());
    format!("{}_{}", result.symbol, &result.run_id[..prefix_len])
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade log
/// - `equity.csv`: bar-by-bar equity ledger
/// - `summary.md`: markdown report
///
/// Re-running the same config overwrites the same directory. Returns the
/// path to the directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write_file(
        &run_dir.join("trades.csv"),
        &export_trades_csv(&result.trades)?,
    )?;
    write_file(
        &run_dir.join("equity.csv"),
        &export_equity_csv(&result.equity_curve)?,
    )?;
    write_file(&run_dir.join("summary.md"), &generate_report(result))?;

    Ok(run_dir)
}

/// Write `sweep.csv` under `output_dir` and return its path.
pub fn save_sweep(rows: &[SweepRow], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = output_dir.join("sweep.csv");
    write_file(&path, &export_sweep_csv(rows)?)?;
    Ok(path)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let s = &result.summary;
    let m = &result.metrics;
    let cfg = &result.config;

    md.push_str("# Grid Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Run ID | `{}` |\n", result.run_id));
    if let Some((start, end)) = result.period() {
        md.push_str(&format!("| Period | {start} to {end} |\n"));
    }
    md.push_str(&format!("| Bars | {} |\n", s.bar_count));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Parameters\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Grid Size | {} |\n", cfg.strategy.grid_size));
    md.push_str(&format!("| Base Lots | {} |\n", cfg.strategy.base_lots));
    md.push_str(&format!(
        "| Re-arm Buffer | {} levels |\n",
        cfg.strategy.rearm_buffer_levels
    ));
    md.push_str(&format!(
        "| Initial Cash | ${:.0} |\n",
        cfg.backtest.initial_cash
    ));
    md.push_str(&format!(
        "| Contract Size | {} |\n",
        cfg.backtest.contract_size
    ));
    md.push('\n');

    md.push_str("## Worst-Case Equity\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Final Equity (worst) | ${:.2} |\n",
        s.final_equity_worst
    ));
    md.push_str(&format!(
        "| Peak Equity (worst) | ${:.2} |\n",
        s.peak_equity_worst
    ));
    md.push_str(&format!(
        "| Max Drawdown (worst) | {:.2}% |\n",
        s.max_drawdown_worst_pct
    ));
    md.push_str(&format!(
        "| Final Equity (close) | ${:.2} |\n",
        s.final_equity_close
    ));
    md.push_str(&format!("| Final Cash | ${:.2} |\n", s.final_cash));
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!(
        "| Max Drawdown (close) | {:.2}% |\n",
        m.max_drawdown_close * 100.0
    ));
    md.push_str(&format!(
        "| Drawdown Gap (worst vs close) | {:.2}% |\n",
        m.drawdown_gap * 100.0
    ));
    md.push_str(&format!("| Realised PnL | ${:.2} |\n", m.total_realised_pnl));
    md.push_str(&format!("| Entries | {} |\n", m.entry_count));
    md.push_str(&format!("| Take Profits | {} |\n", m.exit_count));
    md.push_str(&format!(
        "| Entries per Cycle | {:.2} |\n",
        m.avg_entries_per_cycle
    ));
    md.push_str(&format!("| Max Lots Held | {} |\n", m.max_lots_held));
    md.push_str(&format!("| Max Depth | {} levels |\n", m.max_depth_levels));
    md.push_str(&format!("| Exposure | {:.1}% |\n", m.exposure * 100.0));
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Recent Trades\n\n");
        md.push_str("| Date | Action | Price | Lots | Depth | WAP | Realised |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
        let skip = result.trades.len().saturating_sub(10);
        for t in result.trades.iter().skip(skip) {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {} | {} | {} | ${:+.2} |\n",
                t.date,
                action_label(t.action),
                t.price,
                t.lots,
                t.depth_levels.map_or_else(|| "-".to_string(), |d| d.to_string()),
                t.wap.map_or_else(|| "-".to_string(), |w| format!("{w:.2}")),
                t.realised_pnl,
            ));
        }
        md.push('\n');
    }

    md
}
