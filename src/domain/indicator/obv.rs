//! OBV (On-Balance Volume).

use crate::domain::indicator::{SignalSource, calculate_sma, vote_where_defined};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// Otherwise OBV[i] = OBV[i-1]
///
/// No warmup; every bar has a value.
pub fn calculate_obv(bars: &[Bar]) -> Vec<f64> {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        match prev_close {
            None => obv = bar.volume,
            Some(prev) if bar.close > prev => obv += bar.volume,
            Some(prev) if bar.close < prev => obv -= bar.volume,
            Some(_) => {}
        }
        prev_close = Some(bar.close);
        values.push(obv);
    }
    values
}

/// Buy when OBV is above its SMA(`obv_window`), sell when below.
pub struct ObvSignal;

impl SignalSource for ObvSignal {
    fn name(&self) -> &str {
        "obv"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        params.obv_window.saturating_sub(1)
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        let obv = calculate_obv(bars);
        let average = calculate_sma(&obv, params.obv_window);
        let obv: Vec<Option<f64>> = obv.into_iter().map(Some).collect();
        vote_where_defined(&obv, &average, |value, avg| {
            SignalPair::new(value > avg, value < avg)
        })
    }
}
