//! KijunLab CLI: run, indicator export, and parameter sweep commands.
//!
//! Commands:
//! - `run`: backtest a CSV (or synthetic bars) and save the artifact set
//! - `indicators`: write bars plus every indicator column to a CSV file
//! - `sweep`: run a parameter grid in parallel and print the top results

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kijunlab_core::indicators::compute_indicators;
use kijunlab_runner::data_loader::{clean_bars, load_bars_csv, CleanReport};
use kijunlab_runner::export::{export_input_csv, save_artifacts};
use kijunlab_runner::runner::{run_backtest_from_bars, BacktestResult};
use kijunlab_runner::sweep::{run_sweep, ParamGrid, SweepResults};
use kijunlab_runner::synthetic::generate_synthetic_bars;
use kijunlab_runner::AppConfig;

/// Environment variable consulted when `--log-level` is absent.
const LOG_ENV: &str = "KIJUNLAB_LOG";

#[derive(Parser)]
#[command(
    name = "kijunlab",
    about = "KijunLab CLI: Gaussian/Kijun trend backtesting engine"
)]
struct Cli {
    /// Log filter, e.g. "debug" or "kijunlab_core=debug". Overrides KIJUNLAB_LOG and the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest a bar file and save CSV/JSON/Markdown artifacts.
    Run {
        /// OHLCV CSV file.
        #[arg(long, required_unless_present = "synthetic")]
        csv: Option<PathBuf>,

        /// Generate this many synthetic bars instead of reading a CSV.
        #[arg(long, conflicts_with = "csv")]
        synthetic: Option<usize>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Defaults to `[output] dir` from the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Compute indicators and write bars plus indicator columns to CSV.
    Indicators {
        /// OHLCV CSV file.
        #[arg(long)]
        csv: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a parameter grid in parallel and rank the results by pnl.
    Sweep {
        /// OHLCV CSV file.
        #[arg(long)]
        csv: PathBuf,

        /// Path to a TOML config file supplying the base parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// TOML file with `gaussian_periods`, `kijun_periods`,
        /// `trailing_atr_mults`, `adx_thresholds`. Defaults to a small grid.
        #[arg(long)]
        grid: Option<PathBuf>,

        /// Number of results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Run { config, .. }
        | Commands::Indicators { config, .. }
        | Commands::Sweep { config, .. } => config.clone(),
    };
    let app = load_app_config(config_path.as_deref())?;
    init_tracing(cli.log_level.as_deref(), &app.logging.level)?;

    match cli.command {
        Commands::Run {
            csv,
            synthetic,
            output_dir,
            ..
        } => run_cmd(&app, csv, synthetic, output_dir),
        Commands::Indicators { csv, out, .. } => indicators_cmd(&app, &csv, &out),
        Commands::Sweep { csv, grid, top, .. } => sweep_cmd(&app, &csv, grid.as_deref(), top),
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

/// Filter precedence: `--log-level`, then `KIJUNLAB_LOG`, then `[logging] level`.
fn init_tracing(cli_level: Option<&str>, config_level: &str) -> Result<()> {
    let directive = match cli_level {
        Some(level) => level.to_string(),
        None => std::env::var(LOG_ENV).unwrap_or_else(|_| config_level.to_string()),
    };
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {directive:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_clean(csv: &Path) -> Result<CleanReport> {
    let raw = load_bars_csv(csv).with_context(|| format!("failed to load {}", csv.display()))?;
    let report = clean_bars(raw);
    if report.bars.is_empty() {
        bail!("no usable bars in {} after cleaning", csv.display());
    }
    Ok(report)
}

fn run_cmd(
    app: &AppConfig,
    csv: Option<PathBuf>,
    synthetic: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let trading = &app.trading;
    let bars = match (csv, synthetic) {
        (Some(path), _) => load_clean(&path)?.bars,
        (None, Some(count)) => {
            let minutes = trading.timeframe_minutes()?;
            info!(count, minutes, "generating synthetic bars");
            generate_synthetic_bars(&trading.ticker, count, minutes)
        }
        (None, None) => bail!("one of --csv or --synthetic is required"),
    };

    let cancel = AtomicBool::new(false);
    let output = run_backtest_from_bars(&bars, trading, Some(&cancel))?;
    print_summary(&output.result);

    let dir = output_dir.unwrap_or_else(|| app.output.dir.clone());
    let dir = save_artifacts(&output, &dir)?;
    println!("Artifacts saved to: {}", dir.display());
    Ok(())
}

fn indicators_cmd(app: &AppConfig, csv: &Path, out: &Path) -> Result<()> {
    let report = load_clean(csv)?;
    let extended = compute_indicators(&report.bars, &app.trading.indicator_params())
        .context("indicator computation failed")?;
    let contents = export_input_csv(&extended)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} bars to {}", extended.len(), out.display());
    Ok(())
}

fn sweep_cmd(app: &AppConfig, csv: &Path, grid_path: Option<&Path>, top: usize) -> Result<()> {
    let grid = match grid_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml_grid(&contents).with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => ParamGrid::default(),
    };
    if grid.size() == 0 {
        bail!("parameter grid is empty");
    }

    let report = load_clean(csv)?;
    let cancel = AtomicBool::new(false);
    let results = run_sweep(&report.bars, &grid, &app.trading, &cancel)?;
    print_sweep(&results, top);
    Ok(())
}

fn toml_grid(contents: &str) -> Result<ParamGrid> {
    Ok(toml::from_str(contents)?)
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Ticker:         {}", result.config.ticker);
    if let (Some(start), Some(end)) = (result.start, result.end) {
        println!("Period:         {start} to {end}");
    }
    println!("Bars:           {}", result.bar_count);
    println!("Trades:         {}", s.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", s.final_value);
    println!("PnL:            {:.2} ({:.2}%)", s.pnl, s.pnl_percent);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown_percent);
    println!("Profitable:     {:.1}%", s.percent_profitable);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    if let Some(pos) = &result.open_position {
        println!();
        println!(
            "Open position:  {} {} @ {:.2} (stop {:.2})",
            pos.side,
            pos.size,
            pos.entry_price,
            pos.stop_price()
        );
    }
    for w in &result.warnings {
        println!("Warning:        {w}");
    }
    println!();
}

fn print_sweep(results: &SweepResults, top: usize) {
    println!();
    println!("=== Sweep: {} runs ===", results.len());
    println!(
        "{:<4} {:>6} {:>6} {:>6} {:>6} {:>12} {:>8} {:>7} {:>8}",
        "#", "gauss", "kijun", "atr_x", "adx", "pnl", "pnl%", "trades", "maxDD%"
    );
    println!("{}", "-".repeat(72));
    for (rank, e) in results.top_n(top).iter().enumerate() {
        println!(
            "{:<4} {:>6} {:>6} {:>6.2} {:>6.1} {:>12.2} {:>8.2} {:>7} {:>8.2}",
            rank + 1,
            e.gaussian_period,
            e.kijun_period,
            e.trailing_atr_mult,
            e.adx_threshold,
            e.summary.pnl,
            e.summary.pnl_percent,
            e.summary.total_trades,
            e.summary.max_drawdown_percent
        );
    }
    println!();
}
