//! ATR (Average True Range) and the ATR channel signal.
//!
//! TR[0] = high - low, TR[i] = max(high-low, |high-prev_close|, |low-prev_close|).
//! Seed: mean of the first n TR values, then Wilder smoothing
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are `None`.

use crate::domain::indicator::{SignalSource, calculate_sma};
use crate::domain::ohlcv::{Bar, closes};
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => bar.high - bar.low,
            _ => bar.true_range(bars[i - 1].close),
        })
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    for (i, &range) in tr.iter().enumerate().skip(period) {
        atr = (atr * (period - 1) as f64 + range) / period as f64;
        out[i] = Some(atr);
    }
    out
}

/// Channel of `atr_mult` ATRs around SMA(close, `atr_window`): buy on a
/// close below the channel, sell on a close above it.
pub struct AtrChannelSignal;

impl SignalSource for AtrChannelSignal {
    fn name(&self) -> &str {
        "atr"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        params.atr_window.saturating_sub(1)
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        let closes = closes(bars);
        let atr = calculate_atr(bars, params.atr_window);
        let mid = calculate_sma(&closes, params.atr_window);

        closes
            .iter()
            .zip(atr.iter().zip(&mid))
            .map(|(&close, (atr, mid))| {
                let band = params.atr_mult * (*atr)?;
                let mid = (*mid)?;
                Some(SignalPair::new(close < mid - band, close > mid + band))
            })
            .collect()
    }
}
