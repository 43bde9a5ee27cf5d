//! GridLab CLI: run and sweep commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config and save its artifacts
//! - `sweep`: run a grid of strategy parameters over the same bars

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gridlab_runner::data_loader::load_bars;
use gridlab_runner::runner::{run_backtest_from_data, BacktestResult};
use gridlab_runner::{
    run_sweep, save_artifacts, save_sweep, BacktestConfig, LoadOptions, SweepGrid, SweepRow,
};

/// Rows of the sweep ranking printed to stdout.
const SWEEP_TOP_N: usize = 20;

#[derive(Parser)]
#[command(
    name = "gridlab",
    about = "GridLab CLI: grid re-arm backtester with worst-case equity"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file. Overrides `data` in the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data when no data file is given.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep grid size, base lots and re-arm buffer over the same bars.
    Sweep {
        /// Path to a TOML config file (symbol, data and account settings).
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file. Overrides `data` in the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Use synthetic data when no data file is given.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Grid sizes to test, e.g. 20,25,30.
        #[arg(long, value_delimiter = ',', required = true)]
        grid_sizes: Vec<f64>,

        /// Base lot sizes to test, e.g. 5,10.
        #[arg(long, value_delimiter = ',', required = true)]
        base_lots: Vec<f64>,

        /// Re-arm buffers (in grid levels) to test, e.g. 0,1,2.
        #[arg(long, value_delimiter = ',', required = true)]
        buffers: Vec<u32>,

        /// Output directory for sweep.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            synthetic,
            output_dir,
        } => run_backtest_cmd(config, LoadOptions { data, synthetic }, output_dir),
        Commands::Sweep {
            config,
            data,
            synthetic,
            grid_sizes,
            base_lots,
            buffers,
            output_dir,
        } => run_sweep_cmd(
            config,
            LoadOptions { data, synthetic },
            SweepGrid::new(grid_sizes, base_lots, buffers),
            output_dir,
        ),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridlab=info,gridlab_core=info,gridlab_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_backtest_cmd(config_path: PathBuf, opts: LoadOptions, output_dir: PathBuf) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let loaded = load_bars(&config, &opts)?;

    let result = run_backtest_from_data(
        &config,
        &loaded.bars,
        &loaded.dataset_hash,
        loaded.has_synthetic,
    )?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    info!(path = %run_dir.display(), "artifacts saved");
    println!();
    println!("Artifacts:      {}", run_dir.display());
    Ok(())
}

fn run_sweep_cmd(
    config_path: PathBuf,
    opts: LoadOptions,
    grid: SweepGrid,
    output_dir: PathBuf,
) -> Result<()> {
    if grid.size() == 0 {
        bail!("sweep grid is empty: every axis needs at least one value");
    }

    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let loaded = load_bars(&config, &opts)?;

    let rows = run_sweep(&config, &grid, &loaded.bars)?;
    print_sweep(&config.backtest.symbol, &rows, loaded.has_synthetic);

    let path = save_sweep(&rows, &output_dir)?;
    info!(path = %path.display(), rows = rows.len(), "sweep saved");
    println!();
    println!("Sweep CSV:      {}", path.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    let m = &result.metrics;
    let cfg = &result.config.strategy;

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    if let Some((start, end)) = result.period() {
        println!("Period:         {start} to {end}");
    }
    println!("Bars:           {}", s.bar_count);
    println!(
        "Grid:           {} (base lots {}, buffer {} levels)",
        cfg.grid_size, cfg.base_lots, cfg.rearm_buffer_levels
    );
    println!("Entries:        {}", s.entry_count);
    println!("Take Profits:   {}", s.exit_count);
    println!();
    println!("--- Worst-Case Equity ---");
    println!("Final (worst):  {:.2}", s.final_equity_worst);
    println!("Peak (worst):   {:.2}", s.peak_equity_worst);
    println!("Max DD (worst): {:.2}%", s.max_drawdown_worst_pct);
    println!("Final (close):  {:.2}", s.final_equity_close);
    println!("Final Cash:     {:.2}", s.final_cash);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Max DD (close): {:.2}%", m.max_drawdown_close * 100.0);
    println!("Realised PnL:   {:.2}", m.total_realised_pnl);
    println!("Max Lots Held:  {}", m.max_lots_held);
    println!("Max Depth:      {} levels", m.max_depth_levels);
    println!("Entries/Cycle:  {:.2}", m.avg_entries_per_cycle);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_sweep(symbol: &str, rows: &[SweepRow], has_synthetic: bool) {
    println!();
    println!("=== Sweep: {symbol} ({} combinations) ===", rows.len());
    println!(
        "{:>4} {:>8} {:>8} {:>6} {:>14} {:>14} {:>10} {:>7} {:>6}",
        "rank", "grid", "lots", "buffer", "final_worst", "peak_worst", "max_dd%", "entries", "exits"
    );
    for (i, r) in rows.iter().take(SWEEP_TOP_N).enumerate() {
        println!(
            "{:>4} {:>8} {:>8} {:>6} {:>14.2} {:>14.2} {:>10.2} {:>7} {:>6}",
            i + 1,
            r.grid_size,
            r.base_lots,
            r.rearm_buffer_levels,
            r.final_equity_worst,
            r.peak_equity_worst,
            r.max_drawdown_worst_pct,
            r.entry_count,
            r.exit_count
        );
    }
    if rows.len() > SWEEP_TOP_N {
        println!("... {} more rows in sweep.csv", rows.len() - SWEEP_TOP_N);
    }
    if has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
