//! Indicator pipeline.
//!
//! Every indicator is a pure function of the bar history: the full series goes
//! in, a series of the same length comes out. `None` marks warm-up and any
//! index whose inputs are undefined. Indicators are computed once, before the
//! bar loop, and attached to the bars as `ExtendedBar` fields by
//! [`pipeline::compute_indicators`].
//!
//! # Look-ahead contamination guard
//! No value at bar t may depend on bar t+1 or later. Swing levels go further
//! and exclude bar t itself. `tests/lookahead_test.rs` checks every field on a
//! truncated-vs-full series.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod gaussian;
pub mod kijun;
pub mod pipeline;
pub mod smma;
pub mod swing;
pub mod vapi;

pub use adx::Adx;
pub use atr::Atr;
pub use gaussian::Gaussian;
pub use kijun::Kijun;
pub use pipeline::{compute_indicators, DataError};
pub use smma::Smma;
pub use swing::{Swing, SwingSide};
pub use vapi::{vapi_trend, Vapi};

use crate::domain::Bar;

/// An indicator output: one optional value per input bar.
pub type Series = Vec<Option<f64>>;

/// Trait for single-series indicators.
///
/// The first `lookback()` values are `None`. Periods are validated by
/// `TradingConfig::validate`; a zero or oversized period yields an
/// all-`None` series rather than an error.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "kijun_125", "atr_14").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Series;
}

/// Undefine every value before `lookback`.
pub(crate) fn mask_warmup(series: &mut Series, lookback: usize) {
    for v in series.iter_mut().take(lookback) {
        *v = None;
    }
}

/// Lift a raw price column into a series, treating NaN as undefined.
pub(crate) fn column(bars: &[Bar], f: impl Fn(&Bar) -> f64) -> Series {
    bars.iter()
        .map(|b| {
            let v = f(b);
            if v.is_nan() {
                None
            } else {
                Some(v)
            }
        })
        .collect()
}

/// Create synthetic 30-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(30 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::minutes(30 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
