//! KijunLab Runner: configuration, data loading, orchestration, and export.
//!
//! This crate builds on `kijunlab-core` to provide:
//! - TOML application config and run fingerprinting
//! - CSV bar loading and cleaning
//! - Single-backtest runner with summary metrics
//! - Parallel parameter sweeps
//! - CSV/JSON/Markdown artifact export
//! - Deterministic synthetic bars

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{run_fingerprint, AppConfig, AppConfigError, LoggingConfig, OutputConfig, RunId};
pub use data_loader::{clean_bars, dataset_hash, load_bars_csv, read_bars_csv, CleanReport, LoadError};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use metrics::Summary;
pub use runner::{
    run_backtest_from_bars, run_single_backtest, BacktestResult, RunError, RunOutput, SingleRun,
    SCHEMA_VERSION,
};
pub use sweep::{run_sweep, ParamGrid, SweepEntry, SweepResults};
pub use synthetic::generate_synthetic_bars;
