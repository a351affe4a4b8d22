//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1 (DX is first defined at `period`, ADX seeds
//! over the next `period` DX values).

use super::atr::{true_range, wilder_smooth};
use super::{Indicator, Series};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

/// +DM and -DM per bar. Index 0 is undefined.
fn directional_movement(bars: &[Bar]) -> (Series, Series) {
    let n = bars.len();
    let mut plus_dm = vec![None; n];
    let mut minus_dm = vec![None; n];

    for i in 1..n {
        let (cur, prev) = (&bars[i], &bars[i - 1]);
        if cur.high.is_nan() || cur.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
            continue;
        }
        let high_diff = cur.high - prev.high;
        let low_diff = prev.low - cur.low;

        plus_dm[i] = Some(if high_diff > low_diff && high_diff > 0.0 {
            high_diff
        } else {
            0.0
        });
        minus_dm[i] = Some(if low_diff > high_diff && low_diff > 0.0 {
            low_diff
        } else {
            0.0
        });
    }

    (plus_dm, minus_dm)
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        (2 * self.period).saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let n = bars.len();
        if n < 2 || self.period == 0 {
            return vec![None; n];
        }

        let (plus_dm, minus_dm) = directional_movement(bars);

        // TR[0] is aligned with DM[0]: undefined.
        let mut tr = true_range(bars);
        tr[0] = None;
        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus_dm = wilder_smooth(&plus_dm, self.period);
        let smooth_minus_dm = wilder_smooth(&minus_dm, self.period);

        let dx: Series = (0..n)
            .map(|i| {
                let (tr, pdm, mdm) = match (smooth_tr[i], smooth_plus_dm[i], smooth_minus_dm[i]) {
                    (Some(tr), Some(p), Some(m)) if tr != 0.0 => (tr, p, m),
                    _ => return None,
                };
                let plus_di = 100.0 * pdm / tr;
                let minus_di = 100.0 * mdm / tr;
                let di_sum = plus_di + minus_di;
                if di_sum == 0.0 {
                    Some(0.0)
                } else {
                    Some(100.0 * (plus_di - minus_di).abs() / di_sum)
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }
}
