//! Bar-by-bar loop: the heart of the backtesting engine.
//!
//! Per bar:
//! 1. Cancellation check
//! 2. State machine decides on the bar (entry gates or position management)
//! 3. Broker fills the decision's orders against the same bar
//! 4. Fills flow back to the state machine and the recorder folds them into trades
//! 5. Mark-to-market equity at the close

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, info_span};

use super::broker::Broker;
use super::events::EngineEvent;
use super::recorder::TradeRecorder;
use super::state::RunResult;
use super::EngineError;
use crate::config::TradingConfig;
use crate::domain::{Bar, ExtendedBar};
use crate::indicators::compute_indicators;
use crate::position_management::{PositionStateMachine, StrategyRules};

/// Validate `config`, run the indicator pipeline over `bars`, then simulate.
pub fn run_backtest(
    bars: &[Bar],
    config: &TradingConfig,
    cancel: Option<&AtomicBool>,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    let extended = compute_indicators(bars, &config.indicator_params())?;
    run_extended(&extended, config, cancel)
}

/// Simulate over bars that already carry their indicator fields.
pub fn run_extended(
    bars: &[ExtendedBar],
    config: &TradingConfig,
    cancel: Option<&AtomicBool>,
) -> Result<RunResult, EngineError> {
    let minutes_per_bar = config.timeframe_minutes()?;
    let _span = info_span!("engine", ticker = %config.ticker, bars = bars.len()).entered();

    let mut machine = PositionStateMachine::new(StrategyRules::from_config(config));
    let mut broker = Broker::new(config.starting_equity, config.commission_rate);
    let mut recorder = TradeRecorder::new(minutes_per_bar);

    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut fills = Vec::new();
    let mut trades = Vec::new();
    let mut events = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!(bar = i, "run cancelled");
            return Err(EngineError::Cancelled);
        }

        let close = bar.close();
        let prev = i.checked_sub(1).map(|p| &bars[p]);
        let decision = machine.on_bar(i, bar, prev, broker.equity(close));
        events.extend(decision.events);

        broker.submit(decision.orders);
        for fill in broker.process_bar(i, &bar.bar) {
            events.push(EngineEvent::Filled { fill: fill.clone() });
            machine.on_fill(&fill);
            let reason = machine.last_close_reason();
            if let Some(trade) = recorder.on_fill(&fill, reason.as_ref()) {
                debug!(
                    trade_id = %trade.trade_id,
                    pnl = trade.pnl,
                    reason = %trade.close_reason,
                    "trade closed"
                );
                events.push(EngineEvent::TradeClosed {
                    bar: i,
                    trade_id: trade.trade_id,
                    pnl: trade.pnl,
                    close_reason: trade.close_reason.clone(),
                });
                trades.push(trade);
            }
            fills.push(fill);
        }

        equity_curve.push(broker.equity(close));
    }

    let final_equity = equity_curve.last().copied().unwrap_or(config.starting_equity);
    let unrealized_pnl = bars.last().map_or(0.0, |b| broker.unrealized_pnl(b.close()));
    info!(
        trades = trades.len(),
        final_equity,
        open = !broker.is_flat(),
        unrealized_pnl,
        "run finished"
    );

    Ok(RunResult {
        starting_equity: config.starting_equity,
        equity_curve,
        fills,
        trades,
        events,
        final_equity,
        bar_count: bars.len(),
        open_position: machine.position().cloned(),
        broker: broker.state().clone(),
    })
}
