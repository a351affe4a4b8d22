//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (EMA with alpha = 1/period).
//! Lookback: period (TR[0] has no previous close and is left undefined).

use super::{Indicator, Series};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

fn defined(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Series {
    let n = bars.len();
    let mut tr = vec![None; n];

    if n == 0 {
        return tr;
    }

    tr[0] = defined(bars[0].high - bars[0].low);

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = Some((h - l).max((h - pc).abs()).max((l - pc).abs()));
    }

    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
/// Seed: mean of the first run of `period` consecutive defined values, placed
/// at the last index of that run. An undefined value after the seed taints
/// the rest of the series.
pub fn wilder_smooth(values: &[Option<f64>], period: usize) -> Series {
    let n = values.len();
    let mut result = vec![None; n];

    if n < period || period == 0 {
        return result;
    }

    // First index that closes a run of `period` defined values.
    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_some() {
            run += 1;
            if run == period {
                seed_end = Some(i + 1);
                break;
            }
        } else {
            run = 0;
        }
    }

    let seed_end = match seed_end {
        Some(e) => e,
        None => return result,
    };

    let seed: f64 = values[seed_end - period..seed_end].iter().flatten().sum::<f64>() / period as f64;
    result[seed_end - 1] = Some(seed);

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in seed_end..n {
        match values[i] {
            Some(v) => {
                let smoothed = alpha * v + (1.0 - alpha) * prev;
                result[i] = Some(smoothed);
                prev = smoothed;
            }
            None => return result,
        }
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let mut tr = true_range(bars);
        // TR[0] is only high-low; start the Wilder seed at TR[1].
        if let Some(first) = tr.first_mut() {
            *first = None;
        }
        wilder_smooth(&tr, self.period)
    }
}
