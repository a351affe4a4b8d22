//! KijunLab Core: indicator pipeline, position state machine, broker model.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, extended bars, orders, fills, positions, trades)
//! - Causal indicator pipeline (Gaussian channel, Kijun, ATR, ADX, VAPI, SMMA, swings)
//! - Position state machine with entry gates, layered exits and the ratchet invariant
//! - Position sizers
//! - Broker model and bar-by-bar engine loop

pub mod config;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod position_management;
pub mod sizers;

pub use config::{ConfigError, IndicatorParams, TradingConfig};
pub use engine::{run_backtest, run_extended, EngineError, RunResult};
