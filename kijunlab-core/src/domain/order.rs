//! Order requests emitted by the position state machine.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// How an order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Fill at the decision bar's close.
    Market,
    /// Fill at `limit_price` once the bar's range reaches it.
    Limit { limit_price: f64 },
}

/// What the order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderPurpose {
    Entry,
    PartialExit,
    /// Close whatever quantity is left when the order is processed.
    CloseAll,
}

/// An order handed to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub purpose: OrderPurpose,
    /// Requested quantity. Ignored for `CloseAll`.
    pub quantity: u64,
    pub created_bar: usize,
}

impl Order {
    pub fn market(id: OrderId, side: OrderSide, quantity: u64, purpose: OrderPurpose, bar: usize) -> Self {
        Self {
            id,
            side,
            kind: OrderKind::Market,
            purpose,
            quantity,
            created_bar: bar,
        }
    }

    pub fn limit(id: OrderId, side: OrderSide, quantity: u64, limit_price: f64, bar: usize) -> Self {
        Self {
            id,
            side,
            kind: OrderKind::Limit { limit_price },
            purpose: OrderPurpose::PartialExit,
            quantity,
            created_bar: bar,
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }
}
