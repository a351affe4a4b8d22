//! Engine events: the structured log of everything a run decided.
//!
//! Every bar step returns the events it produced; the run result keeps them
//! in order. `tracing` output mirrors them for diagnostics but is never the
//! source of truth.

use crate::domain::{CloseReason, Fill, PositionSide, TradeId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Entered {
        bar: usize,
        timestamp: NaiveDateTime,
        side: PositionSide,
        size: u64,
        price: f64,
        stop_price: f64,
        tp_price: f64,
    },
    /// Breakeven latched; `stop_price` is the stop after the move.
    BreakevenArmed { bar: usize, stop_price: f64 },
    /// Trailing stop tightened a long.
    StopRaised { bar: usize, from: f64, to: f64 },
    /// Trailing stop tightened a short.
    StopLowered { bar: usize, from: f64, to: f64 },
    PartialExitSubmitted {
        bar: usize,
        quantity: u64,
        limit_price: f64,
    },
    ExitRequested { bar: usize, reason: CloseReason },
    Filled { fill: Fill },
    TradeClosed {
        bar: usize,
        trade_id: TradeId,
        pnl: f64,
        close_reason: String,
    },
}

impl EngineEvent {
    /// Bar index the event belongs to.
    pub fn bar(&self) -> usize {
        match self {
            EngineEvent::Entered { bar, .. }
            | EngineEvent::BreakevenArmed { bar, .. }
            | EngineEvent::StopRaised { bar, .. }
            | EngineEvent::StopLowered { bar, .. }
            | EngineEvent::PartialExitSubmitted { bar, .. }
            | EngineEvent::ExitRequested { bar, .. }
            | EngineEvent::TradeClosed { bar, .. } => *bar,
            EngineEvent::Filled { fill } => fill.bar_index,
        }
    }
}
