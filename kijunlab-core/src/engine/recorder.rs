//! Trade recorder: folds fills into closed-trade records.
//!
//! Tracks the fills of the current position. A Trade is emitted only when the
//! position's quantity returns to zero; partial exits accumulate into it.

use crate::domain::{CloseReason, Fill, IdGen, OrderSide, PositionSide, Trade};
use chrono::NaiveDateTime;

/// State for the position being tracked.
#[derive(Debug, Clone)]
struct OpenTrade {
    side: PositionSide,
    entry_bar: usize,
    entry_timestamp: NaiveDateTime,
    entry_price: f64,
    size: u64,
    remaining: u64,
    exit_qty: u64,
    exit_notional: f64,
    pnl: f64,
    commission: f64,
}

#[derive(Debug, Clone)]
pub struct TradeRecorder {
    open: Option<OpenTrade>,
    ids: IdGen,
    minutes_per_bar: u32,
}

impl TradeRecorder {
    pub fn new(minutes_per_bar: u32) -> Self {
        Self {
            open: None,
            ids: IdGen::default(),
            minutes_per_bar,
        }
    }

    pub fn has_open_trade(&self) -> bool {
        self.open.is_some()
    }

    /// Record a fill. Returns the closed trade if this fill flattened the
    /// position. `reason` is the close reason in effect for that position.
    pub fn on_fill(&mut self, fill: &Fill, reason: Option<&CloseReason>) -> Option<Trade> {
        if self.open.is_none() {
            self.open = Some(OpenTrade {
                side: match fill.side {
                    OrderSide::Buy => PositionSide::Long,
                    OrderSide::Sell => PositionSide::Short,
                },
                entry_bar: fill.bar_index,
                entry_timestamp: fill.timestamp,
                entry_price: fill.price,
                size: fill.quantity,
                remaining: fill.quantity,
                exit_qty: 0,
                exit_notional: 0.0,
                pnl: 0.0,
                commission: fill.commission,
            });
            return None;
        }
        let open = self.open.as_mut()?;

        let qty = fill.quantity.min(open.remaining);
        open.remaining -= qty;
        open.exit_qty += qty;
        open.exit_notional += fill.price * qty as f64;
        open.pnl += (fill.price - open.entry_price) * qty as f64 * open.side.sign();
        open.commission += fill.commission;

        if open.remaining > 0 {
            return None;
        }

        let open = self.open.take()?;
        Some(self.close(open, fill, reason))
    }

    fn close(&mut self, open: OpenTrade, last: &Fill, reason: Option<&CloseReason>) -> Trade {
        let duration_bars = last.bar_index - open.entry_bar;
        let exit_price = if open.exit_qty > 0 {
            open.exit_notional / open.exit_qty as f64
        } else {
            last.price
        };
        Trade {
            trade_id: self.ids.next_trade_id(),
            side: open.side,
            entry_bar: open.entry_bar,
            entry_timestamp: open.entry_timestamp,
            entry_price: open.entry_price,
            exit_bar: last.bar_index,
            exit_timestamp: last.timestamp,
            exit_price,
            size: open.size,
            duration_bars,
            duration_hours: duration_bars as f64 * self.minutes_per_bar as f64 / 60.0,
            pnl: open.pnl,
            commission: open.commission,
            pnl_after_costs: open.pnl - open.commission,
            pnl_percent: Trade::percent_of_notional(open.pnl, open.entry_price, open.size),
            is_winner: open.pnl > 0.0,
            close_reason: reason.map_or_else(|| "Unknown".to_string(), ToString::to_string),
        }
    }
}
