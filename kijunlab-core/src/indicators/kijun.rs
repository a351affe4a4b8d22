//! Kijun-sen: midpoint of the highest high and lowest low over a window.
//!
//! kijun[t] = (max(high[t-period+1..=t]) + min(low[t-period+1..=t])) / 2
//! Lookback: period - 1.

use super::{column, Indicator, Series};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Kijun {
    period: usize,
    name: String,
}

impl Kijun {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("kijun_{period}"),
        }
    }
}

/// Rolling extreme over the window ending at each index (inclusive).
/// Undefined until the window is full, and wherever the window holds an
/// undefined value.
pub(crate) fn rolling_extreme(values: &[Option<f64>], period: usize, pick: fn(f64, f64) -> f64) -> Series {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        result[i] = window
            .iter()
            .try_fold(None::<f64>, |acc, v| {
                let v = (*v)?;
                Some(Some(acc.map_or(v, |a| pick(a, v))))
            })
            .flatten();
    }

    result
}

impl Indicator for Kijun {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let highs = rolling_extreme(&column(bars, |b| b.high), self.period, f64::max);
        let lows = rolling_extreme(&column(bars, |b| b.low), self.period, f64::min);
        highs
            .iter()
            .zip(&lows)
            .map(|(h, l)| Some((h.as_ref()? + l.as_ref()?) / 2.0))
            .collect()
    }
}
