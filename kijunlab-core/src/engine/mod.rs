//! Backtesting engine: bar-by-bar event loop and supporting infrastructure.
//!
//! The engine consumes bars that already carry their indicator fields and
//! runs one decision per bar:
//!
//! 1. The position state machine emits orders and events
//! 2. The broker fills orders against the same bar
//! 3. The recorder turns fills into closed trades
//! 4. Equity is marked to market at the close

pub mod broker;
pub mod events;
pub mod loop_runner;
pub mod recorder;
pub mod state;

use thiserror::Error;

use crate::config::ConfigError;
use crate::indicators::DataError;

pub use broker::{Broker, BrokerState};
pub use events::EngineEvent;
pub use loop_runner::{run_backtest, run_extended};
pub use recorder::TradeRecorder;
pub use state::RunResult;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("run cancelled")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
}
