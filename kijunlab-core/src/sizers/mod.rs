//! Position Sizers: determine trade quantity
//!
//! Sizers translate a notional amount or a risk budget into a whole number of
//! contracts. They never fail: degenerate inputs size to 0, and the state
//! machine skips an entry that sizes to 0.

pub mod fixed;
pub mod risk_pct;

pub use fixed::FixedSizer;
pub use risk_pct::RiskPctSizer;

use serde::{Deserialize, Serialize};

/// Position sizing logic
///
/// # Responsibilities
/// - Convert equity + entry price + stop price → contract quantity
///
/// # Non-Responsibilities
/// - Sizers do NOT decide entry/exit (that's the state machine's job)
/// - Sizers do NOT choose order types
pub trait Sizer: Send + Sync {
    /// Contracts to trade. 0 means "do not enter".
    fn size(&self, entry_price: f64, stop_price: f64, equity: f64) -> u64;

    /// Sizer name for logging
    fn name(&self) -> &str;
}

/// Sizing policy selected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// floor(notional / entry_price), at least 1.
    FixedNotional { notional: f64 },
    /// floor(equity × risk_pct / (|entry − stop| × contract_multiplier)).
    RiskPercent { risk_pct: f64, contract_multiplier: f64 },
}

impl Sizer for SizingPolicy {
    fn size(&self, entry_price: f64, stop_price: f64, equity: f64) -> u64 {
        match *self {
            SizingPolicy::FixedNotional { notional } => {
                FixedSizer::new(notional).size(entry_price, stop_price, equity)
            }
            SizingPolicy::RiskPercent {
                risk_pct,
                contract_multiplier,
            } => RiskPctSizer::new(risk_pct, contract_multiplier).size(entry_price, stop_price, equity),
        }
    }

    fn name(&self) -> &str {
        match self {
            SizingPolicy::FixedNotional { .. } => "fixed_notional",
            SizingPolicy::RiskPercent { .. } => "risk_percent",
        }
    }
}

/// Floor a non-negative finite quantity to whole contracts.
pub(crate) fn whole_contracts(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.floor() as u64
    } else {
        0
    }
}
