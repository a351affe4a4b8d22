//! Bar loading and cleaning for the runner.
//!
//! Bars come from a CSV file with a header row. Column names are matched
//! case-insensitively; the time column may be called `timestamp`, `datetime`,
//! `date` or `time`. Empty and `NaN` numeric cells load as NaN so the cleaning
//! step can drop those rows, while text that is not a number is a hard error.
//!
//! Cleaning then removes:
//! 1. Rows with a non-finite field
//! 2. Rows with zero (or negative) volume and rows where high == low
//! 3. Rows beyond mean ± 5σ, checked column by column on open/high/low/close
//! 4. Duplicate timestamps (first occurrence kept) after a stable sort
//!
//! Gaps in the timeline are preserved; nothing is forward-filled.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::{info, warn};

use kijunlab_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: unparseable timestamp {value:?}")]
    Timestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' is not a number: {value:?}")]
    Number {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Outcome of the cleaning step: surviving bars plus drop counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub bars: Vec<Bar>,
    pub input_rows: usize,
    pub dropped_invalid: usize,
    pub dropped_outliers: usize,
    pub dropped_duplicates: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid + self.dropped_outliers + self.dropped_duplicates
    }
}

const TIME_ALIASES: [&str; 4] = ["timestamp", "datetime", "date", "time"];
const NUMERIC_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Timestamp formats tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Load raw bars from a CSV file. The result is not cleaned.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars_csv(file)?;
    info!(path = %path.display(), rows = bars.len(), "loaded bars from CSV");
    Ok(bars)
}

/// Parse raw bars from any CSV reader.
pub fn read_bars_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_ascii_lowercase()).collect();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let time_idx = TIME_ALIASES
        .iter()
        .find_map(|alias| find(alias))
        .ok_or(LoadError::MissingColumn("timestamp"))?;
    let mut numeric_idx = [0usize; 5];
    for (slot, name) in numeric_idx.iter_mut().zip(NUMERIC_COLUMNS) {
        *slot = find(name).ok_or(LoadError::MissingColumn(name))?;
    }

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Row numbers are 1-based and count the header line.
        let row = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let raw_ts = field(time_idx);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::Timestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0f64; 5];
        for ((value, &idx), column) in values.iter_mut().zip(&numeric_idx).zip(NUMERIC_COLUMNS) {
            *value = parse_number(field(idx)).ok_or_else(|| LoadError::Number {
                row,
                column,
                value: field(idx).to_string(),
            })?;
        }
        let [open, high, low, close, volume] = values;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

/// Parse a timestamp in any accepted format. Date-only values map to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Empty and NaN cells become NaN; anything else must parse as a float.
fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Some(f64::NAN);
    }
    raw.parse::<f64>().ok()
}

/// Clean raw bars into a strictly increasing, finite, non-degenerate series.
pub fn clean_bars(raw: Vec<Bar>) -> CleanReport {
    let input_rows = raw.len();

    let mut bars: Vec<Bar> = raw
        .into_iter()
        .filter(|b| {
            let finite = [b.open, b.high, b.low, b.close, b.volume]
                .iter()
                .all(|v| v.is_finite());
            finite && b.volume > 0.0 && b.high != b.low
        })
        .collect();
    let dropped_invalid = input_rows - bars.len();
    if dropped_invalid > 0 {
        warn!(dropped = dropped_invalid, "dropped rows with NaN or invalid values (high == low or volume == 0)");
    }

    let before_outliers = bars.len();
    let columns: [fn(&Bar) -> f64; 4] = [|b| b.open, |b| b.high, |b| b.low, |b| b.close];
    for column in columns {
        if let Some((mean, std)) = mean_and_sample_std(bars.iter().map(column)) {
            if std > 0.0 {
                let (lo, hi) = (mean - 5.0 * std, mean + 5.0 * std);
                bars.retain(|b| (lo..=hi).contains(&column(b)));
            }
        }
    }
    let dropped_outliers = before_outliers - bars.len();
    if dropped_outliers > 0 {
        warn!(dropped = dropped_outliers, "removed outliers beyond 5 standard deviations");
    }

    bars.sort_by_key(|b| b.timestamp);
    let before_dedup = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    let dropped_duplicates = before_dedup - bars.len();
    if dropped_duplicates > 0 {
        warn!(dropped = dropped_duplicates, "dropped duplicate timestamps");
    }

    info!(rows = bars.len(), input_rows, "data cleaning complete");

    CleanReport {
        bars,
        input_rows,
        dropped_invalid,
        dropped_outliers,
        dropped_duplicates,
    }
}

/// Mean and sample standard deviation (n − 1). None for fewer than two values.
fn mean_and_sample_std(values: impl Iterator<Item = f64> + Clone) -> Option<(f64, f64)> {
    let n = values.clone().count();
    if n < 2 {
        return None;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some((mean, var.sqrt()))
}

/// Deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
