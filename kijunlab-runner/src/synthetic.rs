//! Deterministic synthetic bars for demos, sweeps, and tests.
//!
//! The RNG is seeded from the blake3 hash of the symbol, so the same symbol
//! always yields the same series.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kijunlab_core::domain::Bar;

/// First bar of every synthetic series: 2024-01-02 00:00.
fn series_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate `count` random-walk bars spaced `minutes` apart.
///
/// Every bar passes cleaning: positive volume and `high > low`.
pub fn generate_synthetic_bars(symbol: &str, count: usize, minutes: u32) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = Duration::minutes(i64::from(minutes.max(1)));
    let mut timestamp = series_start();
    let mut price = 100.0_f64;
    let mut bars = Vec::with_capacity(count);

    for _ in 0..count {
        let bar_return: f64 = rng.gen_range(-0.006..0.006);
        let open = price;
        let close = (price * (1.0 + bar_return)).max(1.0);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0005..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0005..0.004));
        let volume = rng.gen_range(100..5_000u32);

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: f64::from(volume),
        });

        price = close;
        timestamp += step;
    }

    bars
}
