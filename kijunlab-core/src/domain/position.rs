//! Position state held by the state machine while a trade is open.

use crate::position_management::RatchetState;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a position was closed. Exactly one per closed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss { side: PositionSide, stop_price: f64 },
    TrendBreak { side: PositionSide },
}

impl CloseReason {
    pub fn is_stop_loss(&self) -> bool {
        matches!(self, CloseReason::StopLoss { .. })
    }

    pub fn is_trend_break(&self) -> bool {
        matches!(self, CloseReason::TrendBreak { .. })
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::StopLoss { side, stop_price } => {
                write!(f, "Stop loss {} at {:.2}", side, stop_price)
            }
            CloseReason::TrendBreak { side: PositionSide::Long } => {
                f.write_str("Trendbreak LONG (close under Kijun)")
            }
            CloseReason::TrendBreak { side: PositionSide::Short } => {
                f.write_str("Trendbreak SHORT (close over Kijun)")
            }
        }
    }
}

/// An open position and its risk envelope.
///
/// `size` is the live quantity: it starts at the entry size and drops when the
/// partial take-profit fills, so it always matches the broker's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub size: u64,
    pub entry_price: f64,
    /// Stop level; only ever tightens.
    pub stop: RatchetState,
    pub initial_atr: f64,
    /// |entry_price - initial stop|, always > 0.
    pub entry_risk: f64,
    pub tp_price: f64,
    pub breakeven_active: bool,
    /// Set once the trailing stop has tightened the stop at least once.
    pub trailing_active: bool,
    /// Highest high since entry (long) or lowest low since entry (short).
    pub extreme_price: f64,
    pub partial_submitted: bool,
    pub entry_bar: usize,
    pub entry_timestamp: NaiveDateTime,
}

impl Position {
    pub fn stop_price(&self) -> f64 {
        self.stop.level()
    }

    /// Price at which the stop moves to entry.
    pub fn breakeven_trigger(&self, fraction: f64) -> f64 {
        self.entry_price + self.side.sign() * fraction * self.entry_risk
    }

    /// True if `close` is through the stop (inclusive).
    pub fn stop_hit(&self, close: f64) -> bool {
        match self.side {
            PositionSide::Long => close <= self.stop_price(),
            PositionSide::Short => close >= self.stop_price(),
        }
    }

    /// True if `close` is on the wrong side of the Kijun line.
    pub fn trend_broken(&self, close: f64, kijun: f64) -> bool {
        match self.side {
            PositionSide::Long => close < kijun,
            PositionSide::Short => close > kijun,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.size as f64
    }
}
