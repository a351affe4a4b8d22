//! ExtendedBar: a bar plus every derived signal field.

use serde::{Deserialize, Serialize};

use super::bar::Bar;

/// Direction of the VAPI line relative to the previous bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    /// Compare a value against its predecessor. Ties are neutral.
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Trend::Up
        } else if current < previous {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Neutral => "neutral",
        }
    }
}

/// A bar with the indicator pipeline's output attached.
///
/// `None` means "undefined at this index" (warm-up, or a missing input).
/// Every field at index `i` is derived from bars `0..=i`; the swing fields
/// from bars `0..i` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedBar {
    pub bar: Bar,
    pub gauss: Option<f64>,
    pub gauss_upper: Option<f64>,
    pub gauss_lower: Option<f64>,
    pub kijun: Option<f64>,
    pub vapi: Option<f64>,
    pub vapi_trend: Option<Trend>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub smma: Option<f64>,
    pub swing_high: Option<f64>,
    pub swing_low: Option<f64>,
}

impl ExtendedBar {
    /// An extended bar with every derived field undefined.
    pub fn bare(bar: Bar) -> Self {
        Self {
            bar,
            gauss: None,
            gauss_upper: None,
            gauss_lower: None,
            kijun: None,
            vapi: None,
            vapi_trend: None,
            adx: None,
            atr: None,
            smma: None,
            swing_high: None,
            swing_low: None,
        }
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}
