//! Exponential Moving Average, recursively seeded.
//!
//! EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (span + 1).
//! Seed: EMA[0] = x[0] (no SMA seed window), so the raw recursion is defined
//! from the first input. Callers mask indices before `span - 1` as warm-up.

use super::Series;

/// Smoothing factor for a span.
pub fn alpha_for_span(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Raw recursive EMA over an optional series.
///
/// Leading `None`s are skipped and the recursion seeds on the first defined
/// value. A `None` after the seed taints the rest of the series.
pub fn ema_of_series(values: &[Option<f64>], span: usize) -> Series {
    let n = values.len();
    let mut result = vec![None; n];
    if span == 0 {
        return result;
    }

    let alpha = alpha_for_span(span);
    let mut prev: Option<f64> = None;

    for (i, v) in values.iter().enumerate() {
        match (*v, prev) {
            (Some(x), None) => {
                result[i] = Some(x);
                prev = Some(x);
            }
            (Some(x), Some(p)) => {
                let ema = alpha * x + (1.0 - alpha) * p;
                result[i] = Some(ema);
                prev = Some(ema);
            }
            (None, None) => {}
            (None, Some(_)) => return result,
        }
    }

    result
}
