//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N).
//! Warmup: first (n-1) closes are `None`.

use crate::domain::indicator::{SignalSource, calculate_sma, calculate_stddev};
use crate::domain::ohlcv::{Bar, closes};
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bollinger(closes: &[f64], period: usize, mult: f64) -> Vec<Option<Bands>> {
    let sma = calculate_sma(closes, period);
    let sd = calculate_stddev(closes, period);
    sma.into_iter()
        .zip(sd)
        .map(|(middle, sd)| {
            let (middle, sd) = (middle?, sd?);
            Some(Bands {
                upper: middle + mult * sd,
                middle,
                lower: middle - mult * sd,
            })
        })
        .collect()
}

/// Buy below the lower band, sell above the upper band.
pub struct BollingerSignal;

impl SignalSource for BollingerSignal {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        params.bb_window.saturating_sub(1)
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        let closes = closes(bars);
        calculate_bollinger(&closes, params.bb_window, params.bb_std)
            .into_iter()
            .zip(&closes)
            .map(|(bands, &close)| {
                let b = bands?;
                Some(SignalPair::new(close < b.lower, close > b.upper))
            })
            .collect()
    }
}
