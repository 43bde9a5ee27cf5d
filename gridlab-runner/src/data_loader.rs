//! Bar loading and data resolution for the runner.
//!
//! Bars come from a CSV file with a `date,open,high,low,close` header. The
//! resolution order is:
//! 1. An explicit data path (the `--data` flag)
//! 2. The `data` path in the config
//! 3. Synthetic bars, only when `--synthetic` is set
//! 4. Otherwise fail with a clear error
//!
//! Synthetic data is a developer-only smoke mode. Results produced on
//! synthetic data are tagged as such.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use gridlab_core::Bar;

use crate::config::BacktestConfig;

/// Synthetic series length when no data file is available.
pub const SYNTHETIC_BAR_COUNT: usize = 5_000;
/// Synthetic series starting price.
pub const SYNTHETIC_START_PRICE: f64 = 2_000.0;
/// Largest close-to-close move of a synthetic bar, in price units.
pub const SYNTHETIC_STEP: f64 = 8.0;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d"];

const COLUMNS: [&str; 5] = ["date", "open", "high", "low", "close"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: cannot parse date '{value}'")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: cannot parse {column} value '{value}'")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("no bars found")]
    Empty,

    #[error("no data file for '{symbol}' (pass --data <csv> or use --synthetic for synthetic data)")]
    NoData { symbol: String },
}

/// Where a loaded series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic,
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the config's data path.
    pub data: Option<PathBuf>,
    /// If true, generate synthetic bars when no data path is available.
    pub synthetic: bool,
}

/// Result of loading bars, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over all bar data.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Resolve and load the bars for a run.
pub fn load_bars(config: &BacktestConfig, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let symbol = &config.backtest.symbol;
    let path = opts.data.as_ref().or(config.backtest.data.as_ref());

    let (bars, source) = match path {
        Some(path) => {
            let bars = load_bars_csv(path)?;
            info!(symbol = %symbol, path = %path.display(), bars = bars.len(), "loaded bars");
            (bars, DataSource::Csv(path.clone()))
        }
        None if opts.synthetic => {
            warn!(symbol = %symbol, "generating synthetic data, results will be tagged as synthetic");
            let bars = generate_synthetic_bars(
                symbol,
                synthetic_start(),
                SYNTHETIC_BAR_COUNT,
                SYNTHETIC_START_PRICE,
                SYNTHETIC_STEP,
            );
            (bars, DataSource::Synthetic)
        }
        None => {
            return Err(LoadError::NoData {
                symbol: symbol.clone(),
            })
        }
    };

    let has_synthetic = source == DataSource::Synthetic;
    Ok(LoadedData {
        dataset_hash: dataset_hash(&bars),
        bars,
        source,
        has_synthetic,
    })
}

/// Read bars from a CSV file.
///
/// Rows are returned in file order. Ordering and OHLC sanity are enforced by
/// the engine, not here.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    read_bars(reader)
}

/// Read bars from any CSV source with a header row.
pub fn load_bars_from_reader<R: Read>(rdr: R) -> Result<Vec<Bar>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);
    read_bars(reader)
}

fn read_bars<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Bar>, LoadError> {
    let headers = reader.headers()?.clone();
    let mut idx = [0usize; 5];
    for (slot, name) in idx.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))?;
    }
    let [date_i, open_i, high_i, low_i, close_i] = idx;

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |i: usize| record.get(i).unwrap_or("");

        let raw_date = field(date_i);
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: raw_date.to_string(),
        })?;

        let number = |i: usize, column: &'static str| -> Result<f64, LoadError> {
            let raw = field(i);
            raw.parse::<f64>().map_err(|_| LoadError::InvalidNumber {
                line,
                column,
                value: raw.to_string(),
            })
        };

        bars.push(Bar::new(
            date,
            number(open_i, "open")?,
            number(high_i, "high")?,
            number(low_i, "low")?,
            number(close_i, "close")?,
        ));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(bars)
}

/// Parse a bar timestamp. Date-only values map to midnight.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.date.and_utc().timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn synthetic_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate an hourly random walk for smoke runs.
///
/// Seeded from the symbol, so the same symbol always yields the same series.
/// Every bar satisfies `low <= open, close <= high` and stays above zero.
pub fn generate_synthetic_bars(
    symbol: &str,
    start: NaiveDateTime,
    count: usize,
    start_price: f64,
    step: f64,
) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let floor = step.abs().max(f64::EPSILON);
    let mut price = start_price.max(floor);
    let mut bars = Vec::with_capacity(count);

    for i in 0..count {
        let open = price;
        let close = (open + rng.gen_range(-1.0..1.0) * step).max(floor);
        let high = open.max(close) + rng.gen_range(0.0..0.5) * step.abs();
        let low = (open.min(close) - rng.gen_range(0.0..0.5) * step.abs()).max(floor * 0.5);

        bars.push(Bar::new(
            start + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
        ));
        price = close;
    }

    bars
}
