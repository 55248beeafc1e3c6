//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: max(fast, slow) - 1 + signal - 1 closes.
//!
//! Signal: buy when the line is above the signal line, sell when below.

use crate::domain::indicator::{SignalSource, calculate_ema};
use crate::domain::ohlcv::{Bar, closes};
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<Option<MacdPoint>> {
    let mut out = vec![None; closes.len()];
    if fast == 0 || slow == 0 || signal_period == 0 {
        return out;
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let Some(start) = line.iter().position(Option::is_some) else {
        return out;
    };
    let defined: Vec<f64> = line[start..].iter().flatten().copied().collect();
    let signal_line = calculate_ema(&defined, signal_period);

    for (offset, signal) in signal_line.into_iter().enumerate() {
        if let (Some(line), Some(signal)) = (defined.get(offset).copied(), signal) {
            out[start + offset] = Some(MacdPoint {
                line,
                signal,
                histogram: line - signal,
            });
        }
    }
    out
}

pub struct MacdSignal;

impl SignalSource for MacdSignal {
    fn name(&self) -> &str {
        "macd"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        (params.macd_fast.max(params.macd_slow) + params.macd_signal).saturating_sub(2)
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        calculate_macd(
            &closes(bars),
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        )
        .into_iter()
        .map(|point| {
            let p = point?;
            Some(SignalPair::new(p.line > p.signal, p.line < p.signal))
        })
        .collect()
    }
}
