//! Summary metrics: pure functions that reduce a run to end-of-run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! No dependencies on the runner, data pipeline, or engine loop.

use serde::{Deserialize, Serialize};

use kijunlab_core::domain::Trade;

/// Aggregate performance of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub final_value: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    /// Largest peak-to-trough decline, as a positive percent.
    pub max_drawdown_percent: f64,
    pub total_trades: usize,
    pub percent_profitable: f64,
    /// `+∞` when no trade lost money. Serialized as the string `"inf"`.
    #[serde(with = "infinite_as_string")]
    pub profit_factor: f64,
}

impl Summary {
    /// Compute the summary from an equity curve and the closed trades.
    ///
    /// An empty curve means the run never reached the bar loop: the final
    /// value is the starting equity.
    pub fn compute(equity_curve: &[f64], trades: &[Trade], starting_equity: f64) -> Self {
        let final_value = equity_curve.last().copied().unwrap_or(starting_equity);
        let pnl = final_value - starting_equity;
        Self {
            final_value,
            pnl,
            pnl_percent: percent_of(pnl, starting_equity),
            max_drawdown_percent: max_drawdown_percent(equity_curve, starting_equity),
            total_trades: trades.len(),
            percent_profitable: percent_profitable(trades),
            profit_factor: profit_factor(trades),
        }
    }

    /// Summary of a run with no bars and no trades.
    pub fn empty(starting_equity: f64) -> Self {
        Self::compute(&[], &[], starting_equity)
    }
}

// ─── Individual metric functions ────────────────────────────────────

fn percent_of(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        value / base * 100.0
    }
}

/// Largest peak-to-trough decline of the curve, as a positive percent.
///
/// The starting equity counts as the first peak.
pub fn max_drawdown_percent(equity_curve: &[f64], starting_equity: f64) -> f64 {
    let mut peak = starting_equity;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Share of trades with positive P&L after costs, in percent. 0 for no trades.
pub fn percent_profitable(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.pnl_after_costs > 0.0).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Gross winning P&L after costs over the absolute gross losing P&L.
///
/// `+∞` when there is no losing P&L, including the zero-trade case.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.pnl_after_costs > 0.0)
        .map(|t| t.pnl_after_costs)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl_after_costs < 0.0)
        .map(|t| t.pnl_after_costs.abs())
        .sum();

    if gross_loss == 0.0 {
        return f64::INFINITY;
    }
    gross_profit / gross_loss
}

/// JSON has no infinity; write it as `"inf"` and read it back.
mod infinite_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrInf {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match NumberOrInf::deserialize(deserializer)? {
            NumberOrInf::Number(v) => Ok(v),
            NumberOrInf::Text(s) if s == "inf" => Ok(f64::INFINITY),
            NumberOrInf::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"inf\", got {s:?}"
            ))),
        }
    }
}
