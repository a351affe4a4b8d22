//! Parameter sweep over a grid of trading configurations.
//!
//! Every configuration runs against the same immutable bar slice. Runs are
//! independent and execute in parallel on the rayon pool; each owns its
//! broker, position, and trade log. A shared cancel flag aborts every run
//! still in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kijunlab_core::config::TradingConfig;
use kijunlab_core::domain::Bar;

use crate::config::RunId;
use crate::metrics::Summary;
use crate::runner::{run_backtest_from_bars, RunError};

/// Parameter grid specification.
///
/// Defines the values to try for each swept parameter. Every other parameter
/// comes from the base configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub gaussian_periods: Vec<usize>,
    pub kijun_periods: Vec<usize>,
    pub trailing_atr_mults: Vec<f64>,
    pub adx_thresholds: Vec<f64>,
}

impl Default for ParamGrid {
    /// A small grid around the default configuration.
    fn default() -> Self {
        Self {
            gaussian_periods: vec![21, 34, 55],
            kijun_periods: vec![60, 125],
            trailing_atr_mults: vec![2.0, 3.0, 4.0],
            adx_thresholds: vec![20.0, 25.0],
        }
    }
}

impl ParamGrid {
    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.gaussian_periods.len()
            * self.kijun_periods.len()
            * self.trailing_atr_mults.len()
            * self.adx_thresholds.len()
    }

    /// Generates all configurations in the grid, skipping those that fail
    /// validation.
    pub fn generate_configs(&self, base: &TradingConfig) -> Vec<TradingConfig> {
        let mut configs = Vec::with_capacity(self.size());

        for &gaussian_period in &self.gaussian_periods {
            for &kijun_period in &self.kijun_periods {
                for &trailing_atr_mult in &self.trailing_atr_mults {
                    for &adx_threshold in &self.adx_thresholds {
                        let config = TradingConfig {
                            gaussian_period,
                            kijun_period,
                            trailing_atr_mult,
                            adx_threshold,
                            ..base.clone()
                        };
                        if config.validate().is_ok() {
                            configs.push(config);
                        } else {
                            debug!(gaussian_period, kijun_period, "skipping invalid grid point");
                        }
                    }
                }
            }
        }

        configs
    }
}

/// One grid point's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub run_id: RunId,
    pub gaussian_period: usize,
    pub kijun_period: usize,
    pub trailing_atr_mult: f64,
    pub adx_threshold: f64,
    pub summary: Summary,
}

/// Run every grid configuration over `bars` in parallel.
///
/// Fails fast on the first error; setting `cancel` makes every in-flight run
/// return `EngineError::Cancelled`.
pub fn run_sweep(
    bars: &[Bar],
    grid: &ParamGrid,
    base: &TradingConfig,
    cancel: &AtomicBool,
) -> Result<SweepResults, RunError> {
    let configs = grid.generate_configs(base);
    let total = configs.len();
    let done = AtomicUsize::new(0);
    info!(total, bars = bars.len(), "starting parameter sweep");

    let entries = configs
        .par_iter()
        .map(|config| {
            let output = run_backtest_from_bars(bars, config, Some(cancel))?;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(finished, total, pnl = output.result.summary.pnl, "sweep run finished");
            Ok(SweepEntry {
                run_id: output.result.run_id,
                gaussian_period: config.gaussian_period,
                kijun_period: config.kijun_period,
                trailing_atr_mult: config.trailing_atr_mult,
                adx_threshold: config.adx_threshold,
                summary: output.result.summary,
            })
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    info!(runs = entries.len(), "parameter sweep complete");
    Ok(SweepResults::new(entries))
}

/// Results from a parameter sweep.
#[derive(Debug, Clone)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
    by_run_id: HashMap<RunId, usize>,
}

impl SweepResults {
    fn new(entries: Vec<SweepEntry>) -> Self {
        let by_run_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.run_id.clone(), i))
            .collect();
        Self { entries, by_run_id }
    }

    /// Returns all entries in grid order.
    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets an entry by RunId.
    pub fn get(&self, run_id: &str) -> Option<&SweepEntry> {
        self.by_run_id.get(run_id).map(|&i| &self.entries[i])
    }

    /// Returns entries sorted by pnl (descending).
    pub fn ranked_by_pnl(&self) -> Vec<&SweepEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.summary.pnl.total_cmp(&a.summary.pnl));
        sorted
    }

    /// Returns the top N entries by pnl.
    pub fn top_n(&self, n: usize) -> Vec<&SweepEntry> {
        self.ranked_by_pnl().into_iter().take(n).collect()
    }

    /// Returns the best entry by pnl.
    pub fn best(&self) -> Option<&SweepEntry> {
        self.ranked_by_pnl().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate_synthetic_bars;
    use kijunlab_core::engine::EngineError;

    fn small_base() -> TradingConfig {
        TradingConfig {
            vapi_period: 5,
            adx_period: 5,
            atr_period: 5,
            smma_period: 20,
            swing_order: 10,
            min_bars: 30,
            ..TradingConfig::default()
        }
    }

    fn small_grid() -> ParamGrid {
        ParamGrid {
            gaussian_periods: vec![5, 8],
            kijun_periods: vec![10, 20],
            trailing_atr_mults: vec![2.0, 3.0],
            adx_thresholds: vec![0.0],
        }
    }

    #[test]
    fn grid_size_is_product() {
        assert_eq!(ParamGrid::default().size(), 36);
        assert_eq!(small_grid().size(), 8);
    }

    #[test]
    fn invalid_grid_points_are_skipped() {
        let grid = ParamGrid {
            gaussian_periods: vec![0, 5],
            ..small_grid()
        };
        let configs = grid.generate_configs(&small_base());
        assert_eq!(configs.len(), 4);
        assert!(configs.iter().all(|c| c.gaussian_period == 5));
    }

    #[test]
    fn sweep_runs_every_grid_point() {
        let bars = generate_synthetic_bars("SWEEP", 400, 30);
        let cancel = AtomicBool::new(false);
        let results = run_sweep(&bars, &small_grid(), &small_base(), &cancel).unwrap();

        assert_eq!(results.len(), 8);
        let ranked = results.ranked_by_pnl();
        for pair in ranked.windows(2) {
            assert!(pair[0].summary.pnl >= pair[1].summary.pnl);
        }
        let best = results.best().unwrap();
        assert_eq!(results.get(&best.run_id), Some(best));
        assert_eq!(results.top_n(3).len(), 3);
    }

    #[test]
    fn sweep_is_deterministic() {
        let bars = generate_synthetic_bars("SWEEP", 300, 30);
        let cancel = AtomicBool::new(false);
        let a = run_sweep(&bars, &small_grid(), &small_base(), &cancel).unwrap();
        let b = run_sweep(&bars, &small_grid(), &small_base(), &cancel).unwrap();
        assert_eq!(a.all(), b.all());
    }

    #[test]
    fn cancelled_sweep_fails() {
        let bars = generate_synthetic_bars("SWEEP", 300, 30);
        let cancel = AtomicBool::new(true);
        let err = run_sweep(&bars, &small_grid(), &small_base(), &cancel).unwrap_err();
        assert!(matches!(err, RunError::Engine(EngineError::Cancelled)));
    }
}
