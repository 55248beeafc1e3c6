//! RSI (Relative Strength Index).
//!
//! Wilder's smoothing of gains and losses:
//! - First average: simple mean over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)), 100 when avg_loss == 0.
//! Warmup: first n closes are `None`.
//!
//! Signal: buy when RSI < `rsi_lower`, sell when RSI > `rsi_upper`.

use crate::domain::indicator::SignalSource;
use crate::domain::ohlcv::{Bar, closes};
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for (i, (gain, loss)) in gains.iter().zip(&losses).enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub struct RsiSignal;

impl SignalSource for RsiSignal {
    fn name(&self) -> &str {
        "rsi"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        params.rsi_window
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        calculate_rsi(&closes(bars), params.rsi_window)
            .into_iter()
            .map(|rsi| {
                let rsi = rsi?;
                Some(SignalPair::new(rsi < params.rsi_lower, rsi > params.rsi_upper))
            })
            .collect()
    }
}
