//! VAPI: volume-weighted price average on an EMA basis.
//!
//! vapi[t] = EMA(close × volume)[t] / EMA(volume)[t], both EMAs seeded with
//! their first value (same recursion as the Gaussian line). Undefined where
//! the volume EMA is zero.
//! Lookback: span - 1.

use super::ema::ema_of_series;
use super::{column, mask_warmup, Indicator, Series};
use crate::domain::{Bar, Trend};

#[derive(Debug, Clone)]
pub struct Vapi {
    span: usize,
    name: String,
}

impl Vapi {
    pub fn new(span: usize) -> Self {
        Self {
            span,
            name: format!("vapi_{span}"),
        }
    }
}

impl Indicator for Vapi {
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
        let pv = column(bars, |b| b.close * b.volume);
        let vol = column(bars, |b| b.volume);
        let ema_pv = ema_of_series(&pv, self.span);
        let ema_vol = ema_of_series(&vol, self.span);

        let mut out: Series = ema_pv
            .iter()
            .zip(&ema_vol)
            .map(|(pv, v)| match (pv, v) {
                (Some(pv), Some(v)) if *v != 0.0 => Some(pv / v),
                _ => None,
            })
            .collect();
        mask_warmup(&mut out, self.lookback());
        out
    }
}

/// Direction of VAPI against the previous bar. Undefined at index 0 and
/// wherever either value is undefined.
pub fn vapi_trend(vapi: &[Option<f64>]) -> Vec<Option<Trend>> {
    let mut out = vec![None; vapi.len()];
    for i in 1..vapi.len() {
        if let (Some(prev), Some(cur)) = (vapi[i - 1], vapi[i]) {
            out[i] = Some(Trend::between(prev, cur));
        }
    }
    out
}
