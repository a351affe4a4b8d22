use crate::domain::ids::OrderId;
use crate::domain::order::{OrderKind, OrderSide};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fill record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub price: f64,
    pub quantity: u64,
    pub commission: f64,
}

impl Fill {
    /// Signed quantity: positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity as f64
    }

    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }
}
