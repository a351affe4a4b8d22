//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! A saved run directory holds:
//! - `backtest_input.csv`: bars plus every indicator column
//! - `backtest_summary.csv`: one-row summary
//! - `trades_detailed.csv`: one row per closed trade
//! - `equity.csv`: bar-by-bar equity curve
//! - `result.json`: the full `BacktestResult`
//! - `report.md`: human-readable summary
//!
//! `result.json` carries a `schema_version`. Newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

use kijunlab_core::domain::{ExtendedBar, Trade};

use crate::metrics::Summary;
use crate::runner::{BacktestResult, RunOutput, SCHEMA_VERSION};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Undefined indicator values are written as empty cells.
fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

fn fmt_ratio(v: f64) -> String {
    if v.is_infinite() {
        "inf".to_string()
    } else {
        format!("{v:.4}")
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
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

/// Export bars with every indicator column.
///
/// Columns: timestamp, open, high, low, close, volume, gauss, gauss_upper,
/// gauss_lower, kijun, vapi, vapi_trend, adx, atr, smma, swing_high, swing_low
pub fn export_input_csv(bars: &[ExtendedBar]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "gauss",
        "gauss_upper",
        "gauss_lower",
        "kijun",
        "vapi",
        "vapi_trend",
        "adx",
        "atr",
        "smma",
        "swing_high",
        "swing_low",
    ])?;

    for eb in bars {
        let b = &eb.bar;
        wtr.write_record([
            fmt_ts(&b.timestamp),
            format!("{:.6}", b.open),
            format!("{:.6}", b.high),
            format!("{:.6}", b.low),
            format!("{:.6}", b.close),
            format!("{:.2}", b.volume),
            fmt_opt(eb.gauss),
            fmt_opt(eb.gauss_upper),
            fmt_opt(eb.gauss_lower),
            fmt_opt(eb.kijun),
            fmt_opt(eb.vapi),
            eb.vapi_trend.map(|t| t.as_str().to_string()).unwrap_or_default(),
            fmt_opt(eb.adx),
            fmt_opt(eb.atr),
            fmt_opt(eb.smma),
            fmt_opt(eb.swing_high),
            fmt_opt(eb.swing_low),
        ])?;
    }

    finish(wtr)
}

/// Export the run summary as a one-row CSV.
pub fn export_summary_csv(summary: &Summary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "final_value",
        "pnl",
        "pnl_percent",
        "max_drawdown_percent",
        "total_trades",
        "percent_profitable",
        "profit_factor",
    ])?;
    wtr.write_record([
        format!("{:.2}", summary.final_value),
        format!("{:.2}", summary.pnl),
        format!("{:.4}", summary.pnl_percent),
        format!("{:.4}", summary.max_drawdown_percent),
        summary.total_trades.to_string(),
        format!("{:.2}", summary.percent_profitable),
        fmt_ratio(summary.profit_factor),
    ])?;
    finish(wtr)
}

/// Export closed trades, one row each.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "trade_id",
        "side",
        "entry_bar",
        "entry_timestamp",
        "entry_price",
        "exit_bar",
        "exit_timestamp",
        "exit_price",
        "size",
        "duration_bars",
        "duration_hours",
        "pnl",
        "commission",
        "pnl_after_costs",
        "pnl_percent",
        "is_winner",
        "close_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.trade_id.to_string(),
            t.side.label().to_string(),
            t.entry_bar.to_string(),
            fmt_ts(&t.entry_timestamp),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            fmt_ts(&t.exit_timestamp),
            format!("{:.6}", t.exit_price),
            t.size.to_string(),
            t.duration_bars.to_string(),
            format!("{:.2}", t.duration_hours),
            format!("{:.2}", t.pnl),
            format!("{:.2}", t.commission),
            format!("{:.2}", t.pnl_after_costs),
            format!("{:.4}", t.pnl_percent),
            t.is_winner.to_string(),
            t.close_reason.clone(),
        ])?;
    }

    finish(wtr)
}

/// Export an equity curve as CSV with bar_index and equity columns.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{eq:.2}")])?;
    }
    finish(wtr)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let cfg = &result.config;
    let s = &result.summary;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Ticker | {} |\n", cfg.ticker));
    md.push_str(&format!("| Timeframe | {} |\n", cfg.timeframe));
    if let (Some(start), Some(end)) = (&result.start, &result.end) {
        md.push_str(&format!("| Period | {} to {} |\n", fmt_ts(start), fmt_ts(end)));
    }
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!("| Starting Equity | {:.2} |\n", cfg.starting_equity));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push('\n');

    md.push_str("## Parameters\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Gaussian Period | {} |\n", cfg.gaussian_period));
    md.push_str(&format!("| Kijun Period | {} |\n", cfg.kijun_period));
    md.push_str(&format!("| VAPI Period | {} |\n", cfg.vapi_period));
    md.push_str(&format!("| ADX Period / Threshold | {} / {:.1} |\n", cfg.adx_period, cfg.adx_threshold));
    md.push_str(&format!("| ATR Period | {} |\n", cfg.atr_period));
    md.push_str(&format!("| SMMA Period | {} |\n", cfg.smma_period));
    md.push_str(&format!("| Swing Order | {} |\n", cfg.swing_order));
    md.push_str(&format!("| Trailing ATR Mult | {:.2} |\n", cfg.trailing_atr_mult));
    md.push_str(&format!("| TP R-Multiple | {:.2} |\n", cfg.tp_r_multiple));
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Value | {:.2} |\n", s.final_value));
    md.push_str(&format!("| PnL | {:.2} ({:.2}%) |\n", s.pnl, s.pnl_percent));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", s.max_drawdown_percent));
    md.push_str(&format!("| Total Trades | {} |\n", s.total_trades));
    md.push_str(&format!("| Percent Profitable | {:.1}% |\n", s.percent_profitable));
    md.push_str(&format!("| Profit Factor | {} |\n", fmt_ratio(s.profit_factor)));
    md.push('\n');

    if let Some(pos) = &result.open_position {
        md.push_str("## Open Position\n\n");
        md.push_str(&format!(
            "{} {} @ {:.2}, stop {:.2}\n\n",
            pos.side,
            pos.size,
            pos.entry_price,
            pos.stop_price()
        ));
    }

    if !result.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for w in &result.warnings {
            md.push_str(&format!("- {w}\n"));
        }
        md.push('\n');
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set for a run into `output_dir`.
///
/// Creates the directory if needed and overwrites existing files. Returns
/// the directory.
pub fn save_artifacts(output: &RunOutput, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let result = &output.result;
    let files = [
        ("backtest_input.csv", export_input_csv(&output.extended)?),
        ("backtest_summary.csv", export_summary_csv(&result.summary)?),
        ("trades_detailed.csv", export_trades_csv(&result.trades)?),
        ("equity.csv", export_equity_csv(&result.equity_curve)?),
        ("result.json", export_json(result)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kijunlab_core::config::TradingConfig;
    use kijunlab_core::domain::{Bar, PositionSide, Trend, TradeId};

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sample_trade() -> Trade {
        Trade {
            trade_id: TradeId(1),
            side: PositionSide::Long,
            entry_bar: 10,
            entry_timestamp: ts(9, 30),
            entry_price: 120.5,
            exit_bar: 14,
            exit_timestamp: ts(11, 30),
            exit_price: 124.25,
            size: 40,
            duration_bars: 4,
            duration_hours: 2.0,
            pnl: 150.0,
            commission: 2.5,
            pnl_after_costs: 147.5,
            pnl_percent: 3.112,
            is_winner: true,
            close_reason: "Trendbreak LONG (close under Kijun)".into(),
        }
    }

    fn sample_output() -> RunOutput {
        let bars: Vec<Bar> = (0..3)
            .map(|i| Bar {
                timestamp: ts(9, 30) + chrono::Duration::minutes(30 * i),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 1_000.0,
            })
            .collect();
        let config = TradingConfig::default();
        let mut result = BacktestResult::empty("ab".repeat(32), "cd".repeat(32), &config, &bars);
        result.trades = vec![sample_trade()];
        result.equity_curve = vec![100_000.0, 100_050.0, 100_147.5];
        result.summary = Summary::compute(&result.equity_curve, &result.trades, 100_000.0);

        let mut extended: Vec<ExtendedBar> = bars.into_iter().map(ExtendedBar::bare).collect();
        extended[2].kijun = Some(100.25);
        extended[2].vapi_trend = Some(Trend::Up);
        RunOutput { result, extended }
    }

    // ─── JSON ───────────────────────────────────────────────────────

    #[test]
    fn json_roundtrip_keeps_infinite_profit_factor() {
        let original = sample_output().result;
        let json = export_json(&original).unwrap();
        assert!(json.contains("\"profit_factor\": \"inf\""));
        let restored = import_json(&json).unwrap();
        assert_eq!(restored.summary, original.summary);
        assert_eq!(restored.trades, original.trades);
        assert_eq!(restored.config, original.config);
        assert_eq!(restored.dataset_hash, original.dataset_hash);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_output().result;
        result.schema_version = 99;
        let json = export_json(&result).unwrap();
        let msg = import_json(&json).unwrap_err().to_string();
        assert!(msg.contains("unsupported schema version 99"));
    }

    // ─── CSV ────────────────────────────────────────────────────────

    #[test]
    fn input_csv_leaves_undefined_cells_empty() {
        let out = sample_output();
        let csv = export_input_csv(&out.extended).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].split(',').count(), 17);
        assert_eq!(lines[1], "2024-03-04 09:30:00,100.000000,101.000000,99.000000,100.500000,1000.00,,,,,,,,,,,");
        assert!(lines[3].contains(",100.250000,,up,"));
    }

    #[test]
    fn summary_csv_writes_inf() {
        let s = Summary::empty(100_000.0);
        let csv = export_summary_csv(&s).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "final_value,pnl,pnl_percent,max_drawdown_percent,total_trades,percent_profitable,profit_factor"
        );
        assert_eq!(lines[1], "100000.00,0.00,0.0000,0.0000,0,0.00,inf");
    }

    #[test]
    fn trades_csv_content() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split(',').count(), 17);
        let row = lines[1];
        assert!(row.starts_with("1,LONG,10,2024-03-04 09:30:00,120.500000,14,"));
        assert!(row.contains(",147.50,"));
        assert!(row.ends_with(",true,Trendbreak LONG (close under Kijun)"));
    }

    #[test]
    fn trades_csv_empty_is_header_only() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn equity_csv_basic() {
        let csv = export_equity_csv(&[100_000.0, 101_000.0, 99_500.0]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["bar_index,equity", "0,100000.00", "1,101000.00", "2,99500.00"]);
    }

    // ─── Markdown ───────────────────────────────────────────────────

    #[test]
    fn report_has_sections() {
        let mut result = sample_output().result;
        result.warnings.push("insufficient bars".into());
        let md = generate_report(&result);
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("| Ticker | KC=F |"));
        assert!(md.contains("| Kijun Period | 125 |"));
        assert!(md.contains("| Total Trades | 1 |"));
        assert!(md.contains("| Profit Factor | inf |"));
        assert!(md.contains("- insufficient bars"));
        assert!(!md.contains("## Open Position"));
    }

    // ─── Artifacts ──────────────────────────────────────────────────

    #[test]
    fn save_load_artifacts_roundtrip() {
        let output = sample_output();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&output, &dir.path().join("reports")).unwrap();

        for name in [
            "backtest_input.csv",
            "backtest_summary.csv",
            "trades_detailed.csv",
            "equity.csv",
            "result.json",
            "report.md",
        ] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert_eq!(loaded.run_id, output.result.run_id);
        assert_eq!(loaded.trades.len(), 1);
    }
}
