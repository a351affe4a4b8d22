//! Property tests for bar cleaning.

use chrono::{Duration, NaiveDate};
use kijunlab_core::domain::Bar;
use kijunlab_runner::data_loader::clean_bars;
use proptest::prelude::*;

fn arb_bar() -> impl Strategy<Value = Bar> {
    (
        0i64..300,
        1.0f64..200.0,
        0.0f64..3.0,
        0.0f64..3.0,
        0.0f64..1.0,
        prop_oneof![4 => 1.0f64..10_000.0, 1 => Just(0.0), 1 => Just(f64::NAN)],
    )
        .prop_map(|(offset, open, up, down, close_frac, volume)| {
            let base = NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let high = open + up;
            let low = open - down;
            Bar {
                timestamp: base + Duration::minutes(30 * offset),
                open,
                high,
                low,
                close: low + (high - low) * close_frac,
                volume,
            }
        })
}

proptest! {
    #[test]
    fn cleaned_bars_are_valid_and_strictly_increasing(raw in prop::collection::vec(arb_bar(), 0..120)) {
        let input = raw.len();
        let report = clean_bars(raw);

        prop_assert_eq!(report.input_rows, input);
        prop_assert_eq!(report.bars.len() + report.dropped(), input);
        for b in &report.bars {
            prop_assert!(b.volume > 0.0);
            prop_assert!(b.high != b.low);
            prop_assert!([b.open, b.high, b.low, b.close, b.volume].iter().all(|v| v.is_finite()));
        }
        for pair in report.bars.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn recleaning_finds_no_invalid_or_duplicate_rows(raw in prop::collection::vec(arb_bar(), 0..120)) {
        let once = clean_bars(raw).bars;
        let twice = clean_bars(once.clone());
        prop_assert_eq!(twice.dropped_invalid, 0);
        prop_assert_eq!(twice.dropped_duplicates, 0);
        prop_assert!(twice.bars.len() <= once.len());
    }
}
