//! Broker model: turns orders into fills against the decision bar.
//!
//! Orders are processed in submission order. Market orders fill at the bar's
//! close; limit sells fill at the limit when high >= limit, limit buys when
//! low <= limit. A close-all order closes whatever is left after earlier
//! fills in the same bar. Pending limits are cancelled once the position is
//! flat. Cash and position change only through fills.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, Fill, Order, OrderKind, OrderPurpose, OrderSide};

/// Account state. `position_qty` is signed: positive long, negative short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerState {
    pub cash: f64,
    pub position_qty: i64,
    pub avg_entry_price: f64,
    pub realized_pnl: f64,
    pub commission_paid: f64,
    /// Pending orders, in submission order.
    pub open_orders: Vec<Order>,
}

#[derive(Debug, Clone)]
pub struct Broker {
    state: BrokerState,
    commission_rate: f64,
}

impl Broker {
    pub fn new(starting_cash: f64, commission_rate: f64) -> Self {
        Self {
            state: BrokerState {
                cash: starting_cash,
                position_qty: 0,
                avg_entry_price: 0.0,
                realized_pnl: 0.0,
                commission_paid: 0.0,
                open_orders: Vec::new(),
            },
            commission_rate,
        }
    }

    pub fn state(&self) -> &BrokerState {
        &self.state
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn position_qty(&self) -> i64 {
        self.state.position_qty
    }

    pub fn is_flat(&self) -> bool {
        self.state.position_qty == 0
    }

    /// Mark-to-market equity: cash + signed quantity × price.
    pub fn equity(&self, price: f64) -> f64 {
        self.state.cash + self.state.position_qty as f64 * price
    }

    /// Open profit against the average entry price; zero when flat.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.state.position_qty as f64 * (price - self.state.avg_entry_price)
    }

    /// Queue orders behind any still-pending ones.
    pub fn submit(&mut self, orders: impl IntoIterator<Item = Order>) {
        self.state.open_orders.extend(orders);
    }

    /// Process every pending order against `bar`. Returns fills in order.
    pub fn process_bar(&mut self, bar_index: usize, bar: &Bar) -> Vec<Fill> {
        let pending = std::mem::take(&mut self.state.open_orders);
        let mut fills = Vec::new();
        let mut still_pending = Vec::new();

        for order in pending {
            let quantity = match order.purpose {
                OrderPurpose::CloseAll => self.state.position_qty.unsigned_abs(),
                OrderPurpose::PartialExit => order.quantity.min(self.state.position_qty.unsigned_abs()),
                OrderPurpose::Entry => order.quantity,
            };
            if quantity == 0 {
                debug!(bar = bar_index, order = %order.id, "nothing left to fill, dropping order");
                continue;
            }

            let price = match order.kind {
                OrderKind::Market => Some(bar.close),
                OrderKind::Limit { limit_price } => limit_fill_price(order.side, limit_price, bar),
            };

            match price {
                Some(price) => {
                    let fill = Fill {
                        order_id: order.id,
                        bar_index,
                        timestamp: bar.timestamp,
                        side: order.side,
                        kind: order.kind,
                        price,
                        quantity,
                        commission: self.commission_rate * price * quantity as f64,
                    };
                    self.apply_fill(&fill);
                    fills.push(fill);
                }
                None => still_pending.push(order),
            }
        }

        if self.is_flat() && !still_pending.is_empty() {
            debug!(bar = bar_index, cancelled = still_pending.len(), "position flat, cancelling pending orders");
            still_pending.retain(|o| o.purpose == OrderPurpose::Entry);
        }
        self.state.open_orders = still_pending;
        fills
    }

    fn apply_fill(&mut self, fill: &Fill) {
        let qty = fill.quantity as i64;
        let signed = match fill.side {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        };

        match fill.side {
            OrderSide::Buy => self.state.cash -= fill.notional() + fill.commission,
            OrderSide::Sell => self.state.cash += fill.notional() - fill.commission,
        }
        self.state.commission_paid += fill.commission;

        let current = self.state.position_qty;
        if current == 0 || current.signum() == signed.signum() {
            // Opening or adding: weighted average entry.
            let total = current.abs() + qty;
            self.state.avg_entry_price =
                (self.state.avg_entry_price * current.abs() as f64 + fill.price * qty as f64) / total as f64;
        } else {
            // Reducing.
            let closed = qty.min(current.abs());
            let sign = current.signum() as f64;
            self.state.realized_pnl += (fill.price - self.state.avg_entry_price) * closed as f64 * sign;
        }

        self.state.position_qty = current + signed;
        if self.state.position_qty == 0 {
            self.state.avg_entry_price = 0.0;
        }
    }
}

/// Fill price for a limit order, if the bar's range reaches it.
fn limit_fill_price(side: OrderSide, limit: f64, bar: &Bar) -> Option<f64> {
    let reached = match side {
        OrderSide::Sell => bar.high >= limit,
        OrderSide::Buy => bar.low <= limit,
    };
    reached.then_some(limit)
}
