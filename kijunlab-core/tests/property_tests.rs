//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Ratchet monotonicity: stops may only tighten, never loosen
//! 2. Single position: at most one entry between closes
//! 3. Daily cap: entries per calendar date never exceed the cap
//! 4. Sizing: risk-percentage sizing never risks more than the budget
//! 5. SMMA of a constant series is that constant

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::HashMap;

use kijunlab_core::domain::{Bar, PositionSide};
use kijunlab_core::engine::{run_backtest, EngineEvent};
use kijunlab_core::indicators::{Indicator, Smma};
use kijunlab_core::position_management::RatchetState;
use kijunlab_core::sizers::{RiskPctSizer, Sizer};
use kijunlab_core::TradingConfig;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_side() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

/// Random walk of 30-minute bars built from per-bar returns.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-0.02..0.02_f64, 0.001..0.01_f64, 500.0..5000.0_f64), 120..260).prop_map(|steps| {
        let base = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut price = 100.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (ret, wick, volume))| {
                let open = price;
                price *= 1.0 + ret;
                let close = price;
                Bar {
                    timestamp: base + chrono::Duration::minutes(30 * i as i64),
                    open,
                    high: open.max(close) * (1.0 + wick),
                    low: open.min(close) * (1.0 - wick),
                    close,
                    volume,
                }
            })
            .collect()
    })
}

/// Short windows so random walks actually trade.
fn fast_config(max_trades_per_day: u32) -> TradingConfig {
    TradingConfig {
        gaussian_period: 5,
        kijun_period: 20,
        vapi_period: 5,
        adx_period: 5,
        atr_period: 5,
        smma_period: 20,
        swing_order: 10,
        adx_threshold: 0.0,
        min_bars: 30,
        max_trades_per_day,
        ..TradingConfig::default()
    }
}

// ── 1. Ratchet monotonicity ──────────────────────────────────────────

proptest! {
    /// A ratchet's level never moves against the position, whatever is proposed.
    #[test]
    fn ratchet_never_loosens(
        side in arb_side(),
        initial in arb_price(),
        proposals in prop::collection::vec(arb_price(), 1..50),
    ) {
        let mut ratchet = RatchetState::with_initial_level(side, initial);
        let mut prev = ratchet.level();
        for p in proposals {
            let tightened = ratchet.apply(p);
            let level = ratchet.level();
            match side {
                PositionSide::Long => prop_assert!(level >= prev),
                PositionSide::Short => prop_assert!(level <= prev),
            }
            prop_assert_eq!(tightened, level != prev);
            prev = level;
        }
    }

    /// Stop events emitted by a full run always move the stop the right way.
    #[test]
    fn engine_stop_events_only_tighten(bars in arb_bars()) {
        let result = run_backtest(&bars, &fast_config(5), None).unwrap();
        for e in &result.events {
            match e {
                EngineEvent::StopRaised { from, to, .. } => prop_assert!(to > from),
                EngineEvent::StopLowered { from, to, .. } => prop_assert!(to < from),
                _ => {}
            }
        }
    }
}

// ── 2. Single position ───────────────────────────────────────────────

proptest! {
    /// Entries and closes alternate, and the broker never holds more than
    /// the entry size.
    #[test]
    fn one_position_at_a_time(bars in arb_bars()) {
        let result = run_backtest(&bars, &fast_config(5), None).unwrap();

        let mut open = false;
        for e in &result.events {
            match e {
                EngineEvent::Entered { .. } => {
                    prop_assert!(!open, "entry while a position is open");
                    open = true;
                }
                EngineEvent::ExitRequested { .. } => {
                    prop_assert!(open, "exit while flat");
                    open = false;
                }
                _ => {}
            }
        }
        prop_assert_eq!(open, result.open_position.is_some());
        prop_assert_eq!(result.equity_curve.len(), bars.len());

        for t in &result.trades {
            prop_assert!(t.exit_bar > t.entry_bar);
        }
    }
}

// ── 3. Daily cap ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn entries_per_day_respect_cap(bars in arb_bars(), cap in 1u32..4) {
        let result = run_backtest(&bars, &fast_config(cap), None).unwrap();

        let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
        for e in &result.events {
            if let EngineEvent::Entered { timestamp, .. } = e {
                *per_day.entry(timestamp.date()).or_default() += 1;
            }
        }
        for (day, count) in per_day {
            prop_assert!(count <= cap, "{} entries on {}", count, day);
        }
    }
}

// ── 4. Sizing ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn risk_sizing_stays_within_budget(
        entry in arb_price(),
        distance in 0.01..50.0_f64,
        equity in 1_000.0..1_000_000.0_f64,
        risk_pct in 0.001..0.05_f64,
        multiplier in 1.0..100.0_f64,
    ) {
        let stop = entry - distance;
        let qty = RiskPctSizer::new(risk_pct, multiplier).size(entry, stop, equity);
        let risked = qty as f64 * (entry - stop).abs() * multiplier;
        prop_assert!(risked <= equity * risk_pct + 1e-6);
        // One more contract would exceed the budget.
        let next = (qty + 1) as f64 * (entry - stop).abs() * multiplier;
        prop_assert!(next > equity * risk_pct - 1e-6);
    }
}

// ── 5. SMMA constant ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn smma_of_constant_is_constant(price in arb_price(), period in 1usize..30, extra in 0usize..40) {
        let n = period + extra;
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar {
                timestamp: base + chrono::Duration::minutes(30 * i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1000.0,
            })
            .collect();

        let smma = Smma::new(period).compute(&bars);
        for (i, v) in smma.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(v.is_none());
            } else {
                let v = v.unwrap();
                prop_assert!((v - price).abs() < 1e-9 * price.max(1.0));
            }
        }
    }
}
