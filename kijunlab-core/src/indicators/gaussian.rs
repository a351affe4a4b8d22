//! Gaussian trend line: three chained EMAs of close with the same span.
//!
//! gauss = EMA(EMA(EMA(close))). Each stage uses the first-value seed from
//! `ema_of_series`; the result is masked before index `span - 1`.
//! Channel bands are gauss ± ATR × multiplier.
//! Lookback: span - 1.

use super::ema::ema_of_series;
use super::{column, mask_warmup, Indicator, Series};
use crate::domain::Bar;

/// ATR multiple for the channel bands.
pub const BAND_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct Gaussian {
    span: usize,
    name: String,
}

impl Gaussian {
    pub fn new(span: usize) -> Self {
        Self {
            span,
            name: format!("gauss_{span}"),
        }
    }
}

impl Indicator for Gaussian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.span.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        if self.span == 0 || bars.len() < self.span {
            return vec![None; bars.len()];
        }
        let closes = column(bars, |b| b.close);
        let e1 = ema_of_series(&closes, self.span);
        let e2 = ema_of_series(&e1, self.span);
        let mut e3 = ema_of_series(&e2, self.span);
        mask_warmup(&mut e3, self.lookback());
        e3
    }
}

/// Upper and lower channel bands: gauss ± atr × multiplier.
/// Undefined wherever either input is undefined.
pub fn channel_bands(gauss: &[Option<f64>], atr: &[Option<f64>], multiplier: f64) -> (Series, Series) {
    gauss
        .iter()
        .zip(atr)
        .map(|(g, a)| match (g, a) {
            (Some(g), Some(a)) => (Some(g + a * multiplier), Some(g - a * multiplier)),
            _ => (None, None),
        })
        .unzip()
}
