//! Pipeline: bars in, extended bars out.

use thiserror::Error;
use tracing::debug;

use super::gaussian::{channel_bands, BAND_MULTIPLIER};
use super::{vapi_trend, Adx, Atr, Gaussian, Indicator, Kijun, Smma, Swing, Vapi};
use crate::config::IndicatorParams;
use crate::domain::{Bar, ExtendedBar};

/// The bar sequence cannot feed the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("bar sequence is empty")]
    Empty,

    #[error("insufficient bars: longest window needs {required}, got {available}")]
    InsufficientBars { required: usize, available: usize },
}

/// Attach every derived field to every bar.
///
/// Fails on an empty sequence or when fewer bars than the longest configured
/// window are supplied. Periods must already be validated.
pub fn compute_indicators(bars: &[Bar], params: &IndicatorParams) -> Result<Vec<ExtendedBar>, DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty);
    }
    let required = params.max_period();
    if bars.len() < required {
        return Err(DataError::InsufficientBars {
            required,
            available: bars.len(),
        });
    }

    let atr = Atr::new(params.atr_period).compute(bars);
    let gauss = Gaussian::new(params.gaussian_period).compute(bars);
    let (gauss_upper, gauss_lower) = channel_bands(&gauss, &atr, BAND_MULTIPLIER);
    let kijun = Kijun::new(params.kijun_period).compute(bars);
    let vapi = Vapi::new(params.vapi_period).compute(bars);
    let trend = vapi_trend(&vapi);
    let adx = Adx::new(params.adx_period).compute(bars);
    let smma = Smma::new(params.smma_period).compute(bars);
    let swing_high = Swing::high(params.swing_order).compute(bars);
    let swing_low = Swing::low(params.swing_order).compute(bars);

    debug!(bars = bars.len(), required, "computed indicator pipeline");

    Ok(bars
        .iter()
        .enumerate()
        .map(|(i, bar)| ExtendedBar {
            bar: bar.clone(),
            gauss: gauss[i],
            gauss_upper: gauss_upper[i],
            gauss_lower: gauss_lower[i],
            kijun: kijun[i],
            vapi: vapi[i],
            vapi_trend: trend[i],
            adx: adx[i],
            atr: atr[i],
            smma: smma[i],
            swing_high: swing_high[i],
            swing_low: swing_low[i],
        })
        .collect())
}
