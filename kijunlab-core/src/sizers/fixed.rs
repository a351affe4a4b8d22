//! Fixed-notional sizer
//!
//! Spends a fixed cash amount per entry, regardless of stop distance.

use super::{whole_contracts, Sizer};

/// # Formula
/// ```text
/// quantity = max(1, floor(notional / entry_price))
/// ```
/// The floor of 1 applies only when both notional and entry price are positive.
#[derive(Debug, Clone)]
pub struct FixedSizer {
    notional: f64,
}

impl FixedSizer {
    pub fn new(notional: f64) -> Self {
        Self { notional }
    }
}

impl Sizer for FixedSizer {
    fn size(&self, entry_price: f64, _stop_price: f64, _equity: f64) -> u64 {
        if !(self.notional > 0.0 && entry_price > 0.0) {
            return 0;
        }
        whole_contracts(self.notional / entry_price).max(1)
    }

    fn name(&self) -> &str {
        "fixed_notional"
    }
}
