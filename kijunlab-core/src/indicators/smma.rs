//! Smoothed Moving Average (SMMA) of close.
//!
//! Seed: SMMA[period-1] = SMA of the first `period` closes.
//! Recursive: SMMA[t] = (SMMA[t-1] * (period - 1) + close[t]) / period.
//! Lookback: period - 1.

use super::{column, Indicator, Series};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Smma {
    period: usize,
    name: String,
}

impl Smma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("smma_{period}"),
        }
    }
}

impl Indicator for Smma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let n = bars.len();
        let mut result = vec![None; n];
        if self.period == 0 || n < self.period {
            return result;
        }

        let closes = column(bars, |b| b.close);
        let seed_window: Option<Vec<f64>> = closes[..self.period].iter().copied().collect();
        let seed = match seed_window {
            Some(w) => w.iter().sum::<f64>() / self.period as f64,
            None => return result,
        };
        result[self.period - 1] = Some(seed);

        let p = self.period as f64;
        let mut prev = seed;
        for i in self.period..n {
            let Some(close) = closes[i] else {
                return result;
            };
            let smma = (prev * (p - 1.0) + close) / p;
            result[i] = Some(smma);
            prev = smma;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn smma_3_known_values() {
        // Seed at 2: mean(10, 11, 12) = 11
        // [3] = (11*2 + 14) / 3 = 12
        // [4] = (12*2 + 9) / 3 = 11
        let bars = make_bars(&[10.0, 11.0, 12.0, 14.0, 9.0]);
        let result = Smma::new(3).compute(&bars);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_approx(result[2].unwrap(), 11.0, DEFAULT_EPSILON);
        assert_approx(result[3].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[4].unwrap(), 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn smma_constant_input_is_constant_after_seed() {
        let bars = make_bars(&[42.0; 30]);
        let result = Smma::new(10).compute(&bars);
        for (i, v) in result.iter().enumerate() {
            if i < 9 {
                assert_eq!(*v, None);
            } else {
                assert_approx(v.unwrap(), 42.0, DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn smma_too_few_bars() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(Smma::new(3).compute(&bars).iter().all(Option::is_none));
    }
}
