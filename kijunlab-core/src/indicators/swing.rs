//! Swing levels: extreme high / low over the bars strictly before t.
//!
//! swing_high[t] = max(high[t-order..=t-1])
//! swing_low[t]  = min(low[t-order..=t-1])
//!
//! Bar t is never part of its own window, so the level can serve as a stop
//! on the bar that triggers the entry.
//! Lookback: order.

use super::kijun::rolling_extreme;
use super::{column, Indicator, Series};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingSide {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct Swing {
    order: usize,
    side: SwingSide,
    name: String,
}

impl Swing {
    pub fn high(order: usize) -> Self {
        Self {
            order,
            side: SwingSide::High,
            name: format!("swing_high_{order}"),
        }
    }

    pub fn low(order: usize) -> Self {
        Self {
            order,
            side: SwingSide::Low,
            name: format!("swing_low_{order}"),
        }
    }
}

impl Indicator for Swing {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.order
    }

    fn compute(&self, bars: &[Bar]) -> Series {
        let n = bars.len();
        let inclusive = match self.side {
            SwingSide::High => rolling_extreme(&column(bars, |b| b.high), self.order, f64::max),
            SwingSide::Low => rolling_extreme(&column(bars, |b| b.low), self.order, f64::min),
        };
        // Shift by one: the window ending at t-1 belongs to t.
        let mut result = vec![None; n];
        for i in 1..n {
            result[i] = inclusive[i - 1];
        }
        result
    }
}
