//! Backtest runner: wires together loading, indicators, engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads and cleans a CSV, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. Used by sweeps, which
//!   share one bar series across many configurations.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn};

use kijunlab_core::config::{ConfigError, TradingConfig};
use kijunlab_core::domain::{Bar, ExtendedBar, Position, Trade};
use kijunlab_core::engine::{run_extended, EngineError, EngineEvent};
use kijunlab_core::indicators::{compute_indicators, DataError};

use crate::config::{run_fingerprint, RunId};
use crate::data_loader::{clean_bars, dataset_hash, load_bars_csv, CleanReport, LoadError};
use crate::metrics::Summary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub config: TradingConfig,
    pub summary: Summary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub events: Vec<EngineEvent>,
    /// Position still open after the last bar.
    pub open_position: Option<Position>,
    pub bar_count: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Set when the run was skipped, e.g. too few bars for the indicator windows.
    pub warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// A backtest result plus the indicator-augmented bars it ran on.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: BacktestResult,
    pub extended: Vec<ExtendedBar>,
}

/// Everything the CLI needs from a single CSV run.
#[derive(Debug, Clone)]
pub struct SingleRun {
    pub output: RunOutput,
    pub clean: CleanReport,
}

/// Load, clean, and backtest a CSV file.
pub fn run_single_backtest(
    csv_path: &Path,
    config: &TradingConfig,
    cancel: Option<&AtomicBool>,
) -> Result<SingleRun, RunError> {
    config.validate()?;
    let raw = load_bars_csv(csv_path)?;
    let clean = clean_bars(raw);
    let output = run_backtest_from_bars(&clean.bars, config, cancel)?;
    Ok(SingleRun { output, clean })
}

/// Run a backtest over pre-loaded, cleaned bars. No I/O.
///
/// Too few bars for the longest indicator window is not an error: the run is
/// reported as empty (no trades, final value = starting equity) with a warning.
pub fn run_backtest_from_bars(
    bars: &[Bar],
    config: &TradingConfig,
    cancel: Option<&AtomicBool>,
) -> Result<RunOutput, RunError> {
    config.validate()?;
    let run_id = run_fingerprint(config)?;
    let _span = info_span!("backtest", ticker = %config.ticker, run_id = %&run_id[..12]).entered();
    let dataset_hash = dataset_hash(bars);

    let extended = match compute_indicators(bars, &config.indicator_params()) {
        Ok(extended) => extended,
        Err(DataError::InsufficientBars { required, available }) => {
            warn!(required, available, "not enough bars for the longest indicator window");
            let result = BacktestResult {
                warnings: vec![format!(
                    "insufficient bars: longest window needs {required}, got {available}"
                )],
                ..BacktestResult::empty(run_id, dataset_hash, config, bars)
            };
            let extended = bars.iter().cloned().map(ExtendedBar::bare).collect();
            return Ok(RunOutput { result, extended });
        }
        Err(e) => return Err(e.into()),
    };

    let run = run_extended(&extended, config, cancel)?;
    let summary = Summary::compute(&run.equity_curve, &run.trades, config.starting_equity);
    info!(
        trades = summary.total_trades,
        final_value = summary.final_value,
        pnl = summary.pnl,
        "backtest complete"
    );

    let result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash,
        config: config.clone(),
        summary,
        trades: run.trades,
        equity_curve: run.equity_curve,
        events: run.events,
        open_position: run.open_position,
        bar_count: run.bar_count,
        start: bars.first().map(|b| b.timestamp),
        end: bars.last().map(|b| b.timestamp),
        warnings: Vec::new(),
    };
    Ok(RunOutput { result, extended })
}

impl BacktestResult {
    /// A run that never reached the bar loop.
    pub fn empty(run_id: RunId, dataset_hash: String, config: &TradingConfig, bars: &[Bar]) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            dataset_hash,
            config: config.clone(),
            summary: Summary::empty(config.starting_equity),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            events: Vec::new(),
            open_position: None,
            bar_count: bars.len(),
            start: bars.first().map(|b| b.timestamp),
            end: bars.last().map(|b| b.timestamp),
            warnings: Vec::new(),
        }
    }
}
