//! Trading parameters shared by the pipeline, the sizer and the state machine.
//!
//! `TradingConfig` is the `[trading]` table of the runner's TOML file. Every
//! field has a default, so a partial table is valid. `validate()` is the single
//! place where parameter ranges are checked; the engine calls it before the
//! first bar.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sizers::SizingPolicy;

/// Invalid trading parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value}")]
    NonPositivePeriod { name: &'static str, value: usize },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidAmount { name: &'static str, value: f64 },

    #[error("{name} must be finite and positive, got {value}")]
    NonPositiveAmount { name: &'static str, value: f64 },

    #[error("unparseable timeframe {0:?} (expected e.g. \"30m\", \"1h\", \"1d\")")]
    Timeframe(String),
}

/// Window lengths consumed by the indicator pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub gaussian_period: usize,
    pub kijun_period: usize,
    pub vapi_period: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub smma_period: usize,
    pub swing_order: usize,
}

impl IndicatorParams {
    /// The longest window; the pipeline needs at least this many bars.
    pub fn max_period(&self) -> usize {
        [
            self.gaussian_period,
            self.kijun_period,
            self.vapi_period,
            self.adx_period,
            self.atr_period,
            self.smma_period,
            self.swing_order,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("gaussian_period", self.gaussian_period),
            ("kijun_period", self.kijun_period),
            ("vapi_period", self.vapi_period),
            ("adx_period", self.adx_period),
            ("atr_period", self.atr_period),
            ("smma_period", self.smma_period),
            ("swing_order", self.swing_order),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ConfigError::NonPositivePeriod { name, value });
            }
        }
        Ok(())
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        TradingConfig::default().indicator_params()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TradingConfig {
    pub ticker: String,
    pub timeframe: String,

    // ── Indicator windows ──
    pub gaussian_period: usize,
    pub kijun_period: usize,
    pub vapi_period: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub smma_period: usize,
    pub swing_order: usize,

    // ── Entry / exit ──
    pub tp_r_multiple: f64,
    pub trailing_atr_mult: f64,
    pub adx_threshold: f64,
    pub min_bars: usize,
    pub max_trades_per_day: u32,

    // ── Sizing / money ──
    pub risk_pct: f64,
    /// Notional per entry. Zero selects risk-percentage sizing.
    pub fixed_position_size: f64,
    pub contract_multiplier: f64,
    pub starting_equity: f64,
    pub commission_rate: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            ticker: "KC=F".into(),
            timeframe: "30m".into(),
            gaussian_period: 34,
            kijun_period: 125,
            vapi_period: 13,
            adx_period: 14,
            atr_period: 14,
            smma_period: 200,
            swing_order: 55,
            tp_r_multiple: 0.75,
            trailing_atr_mult: 3.0,
            adx_threshold: 25.0,
            min_bars: 200,
            max_trades_per_day: 5,
            risk_pct: 0.009,
            fixed_position_size: 20_000.0,
            contract_multiplier: 1.0,
            starting_equity: 100_000.0,
            commission_rate: 0.0,
        }
    }
}

impl TradingConfig {
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            gaussian_period: self.gaussian_period,
            kijun_period: self.kijun_period,
            vapi_period: self.vapi_period,
            adx_period: self.adx_period,
            atr_period: self.atr_period,
            smma_period: self.smma_period,
            swing_order: self.swing_order,
        }
    }

    /// `fixed_position_size > 0` selects fixed-notional sizing.
    pub fn sizing_policy(&self) -> SizingPolicy {
        if self.fixed_position_size > 0.0 {
            SizingPolicy::FixedNotional {
                notional: self.fixed_position_size,
            }
        } else {
            SizingPolicy::RiskPercent {
                risk_pct: self.risk_pct,
                contract_multiplier: self.contract_multiplier,
            }
        }
    }

    /// Bar length in minutes, parsed from `timeframe`.
    pub fn timeframe_minutes(&self) -> Result<u32, ConfigError> {
        parse_timeframe_minutes(&self.timeframe)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicator_params().validate()?;
        if self.min_bars == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "min_bars",
                value: 0,
            });
        }
        self.timeframe_minutes()?;

        let non_negative = [
            ("tp_r_multiple", self.tp_r_multiple),
            ("trailing_atr_mult", self.trailing_atr_mult),
            ("adx_threshold", self.adx_threshold),
            ("risk_pct", self.risk_pct),
            ("fixed_position_size", self.fixed_position_size),
            ("commission_rate", self.commission_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidAmount { name, value });
            }
        }

        let positive = [
            ("starting_equity", self.starting_equity),
            ("contract_multiplier", self.contract_multiplier),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveAmount { name, value });
            }
        }
        Ok(())
    }
}

/// Parse "30m", "15min", "1h", "4h", "1d" into minutes.
pub fn parse_timeframe_minutes(raw: &str) -> Result<u32, ConfigError> {
    let s = raw.trim().to_ascii_lowercase();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ConfigError::Timeframe(raw.to_string()))?;
    let (num, unit) = s.split_at(split);
    let n: u32 = num
        .parse()
        .map_err(|_| ConfigError::Timeframe(raw.to_string()))?;
    if n == 0 {
        return Err(ConfigError::Timeframe(raw.to_string()));
    }
    let scale = match unit {
        "m" | "min" => 1,
        "h" => 60,
        "d" => 1440,
        _ => return Err(ConfigError::Timeframe(raw.to_string())),
    };
    Ok(n * scale)
}
