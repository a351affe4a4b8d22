//! Position state machine: one position at a time, one bar at a time.
//!
//! ```text
//! FLAT ──entry──▶ OPEN(initial risk) ──0.4R──▶ OPEN(breakeven) ──trail──▶ OPEN(trailing)
//!   ▲                                                                        │
//!   └──────────────── CLOSED (stop loss | trend break) ◀─────────────────────┘
//! ```
//!
//! A partial take-profit can fire once from any OPEN phase. The machine never
//! touches cash: it emits orders and events, the broker turns orders into
//! fills, and exit-side fills are folded back through `on_fill` so the open
//! position's size tracks the broker's quantity.

use tracing::debug;

use super::daily_counter::DailyCounter;
use super::ratchet::RatchetState;
use crate::config::TradingConfig;
use crate::domain::{
    CloseReason, ExtendedBar, Fill, IdGen, Order, OrderPurpose, OrderSide, Position, PositionSide,
    Trend,
};
use crate::engine::events::EngineEvent;
use crate::sizers::{Sizer, SizingPolicy};

/// Stop moves to entry once price is this many R in favour.
pub const BREAKEVEN_R: f64 = 0.4;
/// Fraction of the entry size taken off at the take-profit level.
pub const PARTIAL_FRACTION: f64 = 0.4;
/// Take-profit distance for shorts, in R.
pub const SHORT_TP_R: f64 = 0.5;

/// Entry and management thresholds, extracted from `TradingConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRules {
    pub tp_r_multiple: f64,
    pub trailing_atr_mult: f64,
    pub adx_threshold: f64,
    pub min_bars: usize,
    pub max_trades_per_day: u32,
    pub sizing: SizingPolicy,
}

impl StrategyRules {
    pub fn from_config(cfg: &TradingConfig) -> Self {
        Self {
            tp_r_multiple: cfg.tp_r_multiple,
            trailing_atr_mult: cfg.trailing_atr_mult,
            adx_threshold: cfg.adx_threshold,
            min_bars: cfg.min_bars,
            max_trades_per_day: cfg.max_trades_per_day,
            sizing: cfg.sizing_policy(),
        }
    }
}

/// Coarse lifecycle phase, for diagnostics and invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Flat,
    InitialRisk,
    Breakeven,
    Trailing,
}

/// Output of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarDecision {
    /// Orders in submission order.
    pub orders: Vec<Order>,
    pub events: Vec<EngineEvent>,
}

/// Signal fields an entry needs, all defined.
struct EntryInputs {
    close: f64,
    gauss: f64,
    prev_gauss: f64,
    trend: Trend,
    smma: f64,
    kijun: f64,
    atr: f64,
    swing_high: f64,
    swing_low: f64,
}

impl EntryInputs {
    fn gather(bar: &ExtendedBar, prev: Option<&ExtendedBar>) -> Option<Self> {
        Some(Self {
            close: bar.close(),
            gauss: bar.gauss?,
            prev_gauss: prev?.gauss?,
            trend: bar.vapi_trend?,
            smma: bar.smma?,
            kijun: bar.kijun?,
            atr: bar.atr?,
            swing_high: bar.swing_high?,
            swing_low: bar.swing_low?,
        })
    }

    fn long_setup(&self) -> bool {
        self.gauss > self.prev_gauss
            && self.trend == Trend::Up
            && self.close > self.smma
            && self.close > self.kijun
            && self.swing_low < self.close
    }

    fn short_setup(&self) -> bool {
        self.gauss < self.prev_gauss
            && self.trend == Trend::Down
            && self.close < self.smma
            && self.close < self.kijun
            && self.swing_high > self.close
    }
}

#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    rules: StrategyRules,
    position: Option<Position>,
    daily: DailyCounter,
    last_close_reason: Option<CloseReason>,
    ids: IdGen,
}

impl PositionStateMachine {
    pub fn new(rules: StrategyRules) -> Self {
        let daily = DailyCounter::new(rules.max_trades_per_day);
        Self {
            rules,
            position: None,
            daily,
            last_close_reason: None,
            ids: IdGen::default(),
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Reason the most recent position closed; cleared on the next entry.
    pub fn last_close_reason(&self) -> Option<CloseReason> {
        self.last_close_reason
    }

    pub fn trades_today(&self) -> u32 {
        self.daily.count()
    }

    pub fn phase(&self) -> Phase {
        match &self.position {
            None => Phase::Flat,
            Some(p) if p.trailing_active => Phase::Trailing,
            Some(p) if p.breakeven_active => Phase::Breakeven,
            Some(_) => Phase::InitialRisk,
        }
    }

    /// Evaluate bar `index`. `prev` is bar `index - 1`, `equity` the broker's
    /// mark-to-market equity before this bar's orders.
    pub fn on_bar(
        &mut self,
        index: usize,
        bar: &ExtendedBar,
        prev: Option<&ExtendedBar>,
        equity: f64,
    ) -> BarDecision {
        self.daily.observe(bar.bar.trading_date());

        let mut decision = BarDecision::default();
        if self.position.is_some() {
            self.manage(index, bar, &mut decision);
        } else {
            self.try_enter(index, bar, prev, equity, &mut decision);
        }
        decision
    }

    /// Fold a broker fill into the open position. Exit-side fills (the
    /// partial take-profit) reduce `size`; entry fills and fills arriving
    /// while flat leave it alone.
    pub fn on_fill(&mut self, fill: &Fill) {
        let Some(pos) = self.position.as_mut() else {
            return;
        };
        if fill.side == exit_side(pos.side) {
            pos.size = pos.size.saturating_sub(fill.quantity);
            debug!(
                bar = fill.bar_index,
                filled = fill.quantity,
                remaining = pos.size,
                "position reduced"
            );
        }
    }

    fn try_enter(
        &mut self,
        index: usize,
        bar: &ExtendedBar,
        prev: Option<&ExtendedBar>,
        equity: f64,
        decision: &mut BarDecision,
    ) {
        if index + 1 < self.rules.min_bars {
            return;
        }
        match bar.adx {
            Some(adx) if adx > self.rules.adx_threshold => {}
            _ => return,
        }
        if !self.daily.can_enter() {
            return;
        }
        let Some(inputs) = EntryInputs::gather(bar, prev) else {
            return;
        };

        if inputs.long_setup() {
            let size = self.rules.sizing.size(inputs.close, inputs.swing_low, equity);
            if size > 0 {
                let risk = inputs.close - inputs.swing_low;
                let tp = inputs.close + self.rules.tp_r_multiple * risk;
                self.open(
                    index,
                    bar,
                    PositionSide::Long,
                    size,
                    inputs.swing_low,
                    tp,
                    inputs.atr,
                    decision,
                );
                return;
            }
        }

        if inputs.short_setup() {
            let size = self.rules.sizing.size(inputs.close, inputs.swing_high, equity);
            if size > 0 {
                let risk = inputs.swing_high - inputs.close;
                let tp = inputs.close - SHORT_TP_R * risk;
                self.open(
                    index,
                    bar,
                    PositionSide::Short,
                    size,
                    inputs.swing_high,
                    tp,
                    inputs.atr,
                    decision,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn open(
        &mut self,
        index: usize,
        bar: &ExtendedBar,
        side: PositionSide,
        size: u64,
        stop: f64,
        tp: f64,
        atr: f64,
        decision: &mut BarDecision,
    ) {
        let close = bar.close();
        let order_side = match side {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        };
        decision.orders.push(Order::market(
            self.ids.next_order_id(),
            order_side,
            size,
            OrderPurpose::Entry,
            index,
        ));
        decision.events.push(EngineEvent::Entered {
            bar: index,
            timestamp: bar.bar.timestamp,
            side,
            size,
            price: close,
            stop_price: stop,
            tp_price: tp,
        });
        debug!(bar = index, %side, size, price = close, stop, tp, "entry");

        self.position = Some(Position {
            side,
            size,
            entry_price: close,
            stop: RatchetState::with_initial_level(side, stop),
            initial_atr: atr,
            entry_risk: (close - stop).abs(),
            tp_price: tp,
            breakeven_active: false,
            trailing_active: false,
            extreme_price: close,
            partial_submitted: false,
            entry_bar: index,
            entry_timestamp: bar.bar.timestamp,
        });
        self.last_close_reason = None;
        self.daily.record_entry();
    }

    fn manage(&mut self, index: usize, bar: &ExtendedBar, decision: &mut BarDecision) {
        let Some(kijun) = bar.kijun else {
            return;
        };
        let trailing_mult = self.rules.trailing_atr_mult;
        let Some(pos) = self.position.as_mut() else {
            return;
        };
        let close = bar.bar.close;

        // 1. Extreme since entry.
        pos.extreme_price = match pos.side {
            PositionSide::Long => pos.extreme_price.max(bar.bar.high),
            PositionSide::Short => pos.extreme_price.min(bar.bar.low),
        };

        // 2. Breakeven.
        if !pos.breakeven_active {
            let trigger = pos.breakeven_trigger(BREAKEVEN_R);
            let reached = match pos.side {
                PositionSide::Long => close >= trigger,
                PositionSide::Short => close <= trigger,
            };
            if reached {
                pos.breakeven_active = true;
                pos.stop.apply(pos.entry_price);
                decision.events.push(EngineEvent::BreakevenArmed {
                    bar: index,
                    stop_price: pos.stop_price(),
                });
                debug!(bar = index, stop = pos.stop_price(), "breakeven armed");
            }
        }

        // 3. Trailing stop from the extreme, ratcheted.
        let from = pos.stop_price();
        let candidate = pos.extreme_price - pos.side.sign() * pos.initial_atr * trailing_mult;
        if pos.stop.apply(candidate) {
            pos.trailing_active = true;
            let to = pos.stop_price();
            decision.events.push(match pos.side {
                PositionSide::Long => EngineEvent::StopRaised { bar: index, from, to },
                PositionSide::Short => EngineEvent::StopLowered { bar: index, from, to },
            });
            debug!(bar = index, from, to, "trailing stop tightened");
        }

        // 4. Partial take-profit, once per position.
        if !pos.partial_submitted {
            let touched = match pos.side {
                PositionSide::Long => bar.bar.high >= pos.tp_price,
                PositionSide::Short => bar.bar.low <= pos.tp_price,
            };
            let quantity = (pos.size as f64 * PARTIAL_FRACTION).floor() as u64;
            if touched && quantity > 0 {
                let side = exit_side(pos.side);
                decision.orders.push(Order::limit(
                    self.ids.next_order_id(),
                    side,
                    quantity,
                    pos.tp_price,
                    index,
                ));
                decision.events.push(EngineEvent::PartialExitSubmitted {
                    bar: index,
                    quantity,
                    limit_price: pos.tp_price,
                });
                pos.partial_submitted = true;
                debug!(bar = index, quantity, limit = pos.tp_price, "partial exit submitted");
            }
        }

        // 5. Exit: stop loss takes precedence over trend break.
        let reason = if pos.stop_hit(close) {
            Some(CloseReason::StopLoss {
                side: pos.side,
                stop_price: pos.stop_price(),
            })
        } else if pos.trend_broken(close, kijun) {
            Some(CloseReason::TrendBreak { side: pos.side })
        } else {
            None
        };

        if let Some(reason) = reason {
            decision.orders.push(Order::market(
                self.ids.next_order_id(),
                exit_side(pos.side),
                pos.size,
                OrderPurpose::CloseAll,
                index,
            ));
            decision.events.push(EngineEvent::ExitRequested { bar: index, reason });
            debug!(bar = index, %reason, "exit requested");
            self.last_close_reason = Some(reason);
            self.position = None;
        }
    }
}

fn exit_side(side: PositionSide) -> OrderSide {
    match side {
        PositionSide::Long => OrderSide::Sell,
        PositionSide::Short => OrderSide::Buy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, OrderKind};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(30 * i as i64)
    }

    fn rules() -> StrategyRules {
        StrategyRules {
            tp_r_multiple: 0.75,
            trailing_atr_mult: 3.0,
            adx_threshold: 25.0,
            min_bars: 1,
            max_trades_per_day: 5,
            sizing: SizingPolicy::FixedNotional { notional: 20_000.0 },
        }
    }

    /// A bar satisfying every long-entry condition at close 102.
    fn long_ready(i: usize, gauss: f64) -> ExtendedBar {
        ExtendedBar {
            bar: Bar {
                timestamp: ts(i),
                open: 101.0,
                high: 103.0,
                low: 100.5,
                close: 102.0,
                volume: 1000.0,
            },
            gauss: Some(gauss),
            gauss_upper: None,
            gauss_lower: None,
            kijun: Some(100.5),
            vapi: Some(101.0),
            vapi_trend: Some(Trend::Up),
            adx: Some(30.0),
            atr: Some(2.0),
            smma: Some(100.0),
            swing_high: Some(110.0),
            swing_low: Some(95.0),
        }
    }

    fn with_ohlc(mut b: ExtendedBar, high: f64, low: f64, close: f64) -> ExtendedBar {
        b.bar.high = high;
        b.bar.low = low;
        b.bar.close = close;
        b.bar.open = close;
        b
    }

    fn enter_long(sm: &mut PositionStateMachine) {
        let b0 = long_ready(0, 100.0);
        let b1 = long_ready(1, 100.5);
        assert!(sm.on_bar(0, &b0, None, 100_000.0).orders.is_empty());
        let d = sm.on_bar(1, &b1, Some(&b0), 100_000.0);
        assert_eq!(d.orders.len(), 1);
    }

    #[test]
    fn long_entry_levels() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);
        let p = sm.position().unwrap();
        assert_eq!(p.side, PositionSide::Long);
        assert_eq!(p.entry_price, 102.0);
        assert_eq!(p.stop_price(), 95.0);
        assert_eq!(p.entry_risk, 7.0);
        assert!((p.tp_price - 107.25).abs() < 1e-10);
        assert_eq!(p.size, 196);
        assert_eq!(sm.phase(), Phase::InitialRisk);
        assert_eq!(sm.trades_today(), 1);
    }

    #[test]
    fn short_entry_uses_half_r_target() {
        let mut sm = PositionStateMachine::new(rules());
        let mk = |i: usize, gauss: f64| {
            let mut b = long_ready(i, gauss);
            b.bar.close = 98.0;
            b.bar.low = 97.0;
            b.vapi_trend = Some(Trend::Down);
            b.smma = Some(100.0);
            b.kijun = Some(99.5);
            b.swing_high = Some(104.0);
            b
        };
        let b0 = mk(0, 100.0);
        let b1 = mk(1, 99.5);
        sm.on_bar(0, &b0, None, 100_000.0);
        let d = sm.on_bar(1, &b1, Some(&b0), 100_000.0);
        assert_eq!(d.orders[0].side, OrderSide::Sell);
        let p = sm.position().unwrap();
        assert_eq!(p.side, PositionSide::Short);
        assert_eq!(p.entry_risk, 6.0);
        assert!((p.tp_price - 95.0).abs() < 1e-10);
    }

    #[test]
    fn warmup_gate_blocks_entry() {
        let mut sm = PositionStateMachine::new(StrategyRules {
            min_bars: 3,
            ..rules()
        });
        let b0 = long_ready(0, 100.0);
        let b1 = long_ready(1, 100.5);
        sm.on_bar(0, &b0, None, 100_000.0);
        assert!(sm.on_bar(1, &b1, Some(&b0), 100_000.0).orders.is_empty());
        assert!(sm.is_flat());
    }

    #[test]
    fn weak_adx_blocks_entry() {
        let mut sm = PositionStateMachine::new(rules());
        let b0 = long_ready(0, 100.0);
        let mut b1 = long_ready(1, 100.5);
        b1.adx = Some(25.0);
        sm.on_bar(0, &b0, None, 100_000.0);
        assert!(sm.on_bar(1, &b1, Some(&b0), 100_000.0).orders.is_empty());
        b1.adx = None;
        assert!(sm.on_bar(1, &b1, Some(&b0), 100_000.0).orders.is_empty());
    }

    #[test]
    fn undefined_swing_blocks_entry() {
        let mut sm = PositionStateMachine::new(rules());
        let b0 = long_ready(0, 100.0);
        let mut b1 = long_ready(1, 100.5);
        b1.swing_low = None;
        sm.on_bar(0, &b0, None, 100_000.0);
        assert!(sm.on_bar(1, &b1, Some(&b0), 100_000.0).orders.is_empty());
    }

    #[test]
    fn breakeven_then_trail() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);

        // close 105 > entry + 0.4R (104.8) → stop to entry. Trail: 105.5 - 6 = 99.5 < 102.
        let d = sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 105.5, 104.0, 105.0), None, 0.0);
        assert!(d.events.contains(&EngineEvent::BreakevenArmed { bar: 2, stop_price: 102.0 }));
        assert_eq!(sm.phase(), Phase::Breakeven);

        // High 110 → trail 104 > 102.
        let d = sm.on_bar(3, &with_ohlc(long_ready(3, 101.5), 110.0, 106.0, 106.0), None, 0.0);
        assert!(d.events.contains(&EngineEvent::StopRaised {
            bar: 3,
            from: 102.0,
            to: 104.0
        }));
        assert_eq!(sm.phase(), Phase::Trailing);
    }

    #[test]
    fn partial_exit_submitted_once() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);

        let d = sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 108.0, 104.0, 106.0), None, 0.0);
        let partial: Vec<_> = d
            .orders
            .iter()
            .filter(|o| o.purpose == OrderPurpose::PartialExit)
            .collect();
        assert_eq!(partial.len(), 1);
        // floor(196 * 0.4) = 78
        assert_eq!(partial[0].quantity, 78);
        assert_eq!(partial[0].kind, OrderKind::Limit { limit_price: 107.25 });

        let d = sm.on_bar(3, &with_ohlc(long_ready(3, 101.0), 109.0, 105.0, 106.0), None, 0.0);
        assert!(d.orders.iter().all(|o| o.purpose != OrderPurpose::PartialExit));
    }

    fn fill(bar_index: usize, side: OrderSide, quantity: u64, price: f64) -> Fill {
        Fill {
            order_id: crate::domain::OrderId(bar_index as u64),
            bar_index,
            timestamp: ts(bar_index),
            side,
            kind: OrderKind::Market,
            price,
            quantity,
            commission: 0.0,
        }
    }

    #[test]
    fn partial_fill_shrinks_position_and_final_close() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);
        sm.on_fill(&fill(1, OrderSide::Buy, 196, 102.0));
        assert_eq!(sm.position().unwrap().size, 196);

        sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 108.0, 104.0, 106.0), None, 0.0);
        sm.on_fill(&fill(2, OrderSide::Sell, 78, 107.25));
        assert_eq!(sm.position().unwrap().size, 118);

        let d = sm.on_bar(3, &with_ohlc(long_ready(3, 101.0), 102.0, 99.0, 100.0), None, 0.0);
        let close = d.orders.last().unwrap();
        assert_eq!(close.purpose, OrderPurpose::CloseAll);
        assert_eq!(close.quantity, 118);

        // Fills after the close leave the flat machine untouched.
        sm.on_fill(&fill(3, OrderSide::Sell, 118, 100.0));
        assert!(sm.is_flat());
    }

    #[test]
    fn stop_loss_wins_over_trend_break() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);

        // The trail lifts the stop to 102 - 6 = 96 first; close 94 is below
        // both the stop and kijun (100.5).
        let d = sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 102.0, 93.0, 94.0), None, 0.0);
        let reason = CloseReason::StopLoss {
            side: PositionSide::Long,
            stop_price: 96.0,
        };
        assert!(d.events.contains(&EngineEvent::ExitRequested { bar: 2, reason }));
        assert_eq!(d.orders.last().unwrap().purpose, OrderPurpose::CloseAll);
        assert!(sm.is_flat());
        assert_eq!(sm.last_close_reason(), Some(reason));
    }

    #[test]
    fn trend_break_exit() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);
        let d = sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 102.0, 99.0, 100.0), None, 0.0);
        assert!(d.events.contains(&EngineEvent::ExitRequested {
            bar: 2,
            reason: CloseReason::TrendBreak {
                side: PositionSide::Long
            }
        }));
    }

    #[test]
    fn no_reentry_on_closing_bar() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);
        let b1 = long_ready(1, 100.5);
        // Entry conditions hold again but the position closes on this bar.
        let mut b2 = with_ohlc(long_ready(2, 101.0), 102.0, 99.0, 100.0);
        b2.kijun = Some(100.5);
        let d = sm.on_bar(2, &b2, Some(&b1), 100_000.0);
        assert_eq!(d.orders.len(), 1);
        assert!(sm.is_flat());
    }

    #[test]
    fn undefined_kijun_skips_management() {
        let mut sm = PositionStateMachine::new(rules());
        enter_long(&mut sm);
        let mut b2 = with_ohlc(long_ready(2, 101.0), 102.0, 90.0, 91.0);
        b2.kijun = None;
        let d = sm.on_bar(2, &b2, None, 0.0);
        assert!(d.orders.is_empty() && d.events.is_empty());
        assert!(!sm.is_flat());
    }

    #[test]
    fn daily_cap_blocks_further_entries() {
        let mut sm = PositionStateMachine::new(StrategyRules {
            max_trades_per_day: 1,
            ..rules()
        });
        enter_long(&mut sm);
        // Close out via trend break, then try to re-enter the same day.
        sm.on_bar(2, &with_ohlc(long_ready(2, 101.0), 102.0, 99.0, 100.0), None, 0.0);
        let b3 = long_ready(3, 101.5);
        let b4 = long_ready(4, 102.0);
        sm.on_bar(3, &b3, Some(&with_ohlc(long_ready(2, 101.0), 102.0, 99.0, 100.0)), 100_000.0);
        assert!(sm.on_bar(4, &b4, Some(&b3), 100_000.0).orders.is_empty());
        assert!(sm.is_flat());
    }
}
