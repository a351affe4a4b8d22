//! Trade: a completed round trip, created when a position fully closes.

use super::ids::TradeId;
use super::position::PositionSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_timestamp: NaiveDateTime,
    /// Size-weighted average over every exit fill (partial and final).
    pub exit_price: f64,

    /// Entry quantity.
    pub size: u64,

    // ── Duration ──
    pub duration_bars: usize,
    pub duration_hours: f64,

    // ── PnL ──
    pub pnl: f64,
    pub commission: f64,
    pub pnl_after_costs: f64,
    pub pnl_percent: f64,
    pub is_winner: bool,

    pub close_reason: String,
}

impl Trade {
    /// Gross P&L as a percentage of entry notional.
    pub fn percent_of_notional(pnl: f64, entry_price: f64, size: u64) -> f64 {
        let notional = entry_price * size as f64;
        if notional == 0.0 {
            return 0.0;
        }
        pnl / notional * 100.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl_after_costs < 0.0
    }
}
