//! Risk-percentage sizer
//!
//! Risks a fixed fraction of equity between entry and the initial stop.

use super::{whole_contracts, Sizer};

/// # Formula
/// ```text
/// risk_dollars  = equity * risk_pct
/// stop_distance = |entry - stop|
/// quantity      = floor(risk_dollars / (stop_distance * contract_multiplier))
/// ```
///
/// # Example
/// - Equity: $100,000, risk 0.9% ($900)
/// - Entry 100, stop 90 (distance 10), multiplier 1
/// - Quantity: 900 / 10 = 90 contracts
#[derive(Debug, Clone)]
pub struct RiskPctSizer {
    /// Risk fraction per trade (e.g., 0.009 = 0.9%)
    risk_pct: f64,

    /// Currency value of a one-point move per contract
    contract_multiplier: f64,
}

impl RiskPctSizer {
    pub fn new(risk_pct: f64, contract_multiplier: f64) -> Self {
        Self {
            risk_pct,
            contract_multiplier,
        }
    }
}

impl Sizer for RiskPctSizer {
    fn size(&self, entry_price: f64, stop_price: f64, equity: f64) -> u64 {
        let distance = (entry_price - stop_price).abs();
        if !(distance > 0.0) || !(self.contract_multiplier > 0.0) {
            return 0;
        }
        let risk_dollars = equity * self.risk_pct;
        whole_contracts(risk_dollars / (distance * self.contract_multiplier))
    }

    fn name(&self) -> &str {
        "risk_percent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_example() {
        let sizer = RiskPctSizer::new(0.009, 1.0);
        assert_eq!(sizer.size(100.0, 90.0, 100_000.0), 90);
    }

    #[test]
    fn stop_above_entry_uses_distance() {
        let sizer = RiskPctSizer::new(0.009, 1.0);
        assert_eq!(sizer.size(90.0, 100.0, 100_000.0), 90);
    }

    #[test]
    fn multiplier_scales_down() {
        let sizer = RiskPctSizer::new(0.009, 50.0);
        // 900 / (10 * 50) = 1.8 → 1
        assert_eq!(sizer.size(100.0, 90.0, 100_000.0), 1);
    }

    #[test]
    fn degenerate_inputs_size_zero() {
        let sizer = RiskPctSizer::new(0.009, 1.0);
        assert_eq!(sizer.size(100.0, 100.0, 100_000.0), 0);
        assert_eq!(RiskPctSizer::new(0.009, 0.0).size(100.0, 90.0, 100_000.0), 0);
        // 0.9 contracts floors to zero
        assert_eq!(sizer.size(100.0, 90.0, 1_000.0), 0);
    }
}
