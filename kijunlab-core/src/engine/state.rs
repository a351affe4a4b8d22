//! Run result types.

use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Position, Trade};
use crate::engine::broker::BrokerState;
use crate::engine::events::EngineEvent;

/// Result of a complete engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub starting_equity: f64,
    /// Equity value at each bar close.
    pub equity_curve: Vec<f64>,
    /// All fills generated during the run.
    pub fills: Vec<Fill>,
    /// Completed round-trip trades, in closing order.
    pub trades: Vec<Trade>,
    /// Every engine event, in the order it happened.
    pub events: Vec<EngineEvent>,
    /// Final equity value (starting equity if no bars were processed).
    pub final_equity: f64,
    /// Total number of bars processed.
    pub bar_count: usize,
    /// Position still open after the last bar, marked to market.
    pub open_position: Option<Position>,
    pub broker: BrokerState,
}

impl RunResult {
    /// A run that never reached the bar loop.
    pub fn empty(starting_equity: f64) -> Self {
        Self {
            starting_equity,
            equity_curve: Vec::new(),
            fills: Vec::new(),
            trades: Vec::new(),
            events: Vec::new(),
            final_equity: starting_equity,
            bar_count: 0,
            open_position: None,
            broker: BrokerState {
                cash: starting_equity,
                position_qty: 0,
                avg_entry_price: 0.0,
                realized_pnl: 0.0,
                commission_paid: 0.0,
                open_orders: Vec::new(),
            },
        }
    }
}
