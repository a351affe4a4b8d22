//! Domain types for KijunLab

pub mod bar;
pub mod extended_bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use extended_bar::{ExtendedBar, Trend};
pub use fill::Fill;
pub use ids::{IdGen, OrderId, TradeId};
pub use order::{Order, OrderKind, OrderPurpose, OrderSide};
pub use position::{CloseReason, Position, PositionSide};
pub use trade::Trade;
