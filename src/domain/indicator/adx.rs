//! ADX with directional indicators (Wilder).
//!
//! +DM = high - prev_high when it exceeds prev_low - low and is positive,
//! -DM the mirror. TR, +DM and -DM are Wilder-smoothed over n bars:
//! first value is the sum of bars 1..=n, then S = S - S/n + x.
//! +DI = 100 * S(+DM) / S(TR), -DI likewise.
//! DX = 100 * |+DI - -DI| / (+DI + -DI).
//! ADX seeds with the mean of the first n DX values, then
//! ADX = (ADX_prev * (n-1) + DX) / n.
//! Warmup: first (2n - 1) bars are `None`.

use crate::domain::indicator::SignalSource;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::SignalPair;
use crate::domain::strategy::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dmi {
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: f64,
}

pub fn calculate_dmi(bars: &[Bar], period: usize) -> Vec<Option<Dmi>> {
    let n = bars.len();
    let mut out = vec![None; n];
    if period == 0 || n < 2 * period {
        return out;
    }

    let mut tr = vec![0.0; n];
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
        tr[i] = bars[i].true_range(bars[i - 1].close);
    }

    let p = period as f64;
    let mut s_tr: f64 = tr[1..=period].iter().sum();
    let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut s_minus: f64 = minus_dm[1..=period].iter().sum();
    let mut dx_sum = 0.0;
    let mut adx: Option<f64> = None;

    for i in period..n {
        if i > period {
            s_tr = s_tr - s_tr / p + tr[i];
            s_plus = s_plus - s_plus / p + plus_dm[i];
            s_minus = s_minus - s_minus / p + minus_dm[i];
        }

        let (plus_di, minus_di) = if s_tr > 0.0 {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        let count = i - period + 1;
        adx = match adx {
            Some(prev) => Some((prev * (p - 1.0) + dx) / p),
            None => {
                dx_sum += dx;
                (count == period).then_some(dx_sum / p)
            }
        };

        if let Some(adx) = adx {
            out[i] = Some(Dmi {
                plus_di,
                minus_di,
                adx,
            });
        }
    }
    out
}

/// Trend-strength filter: buy when ADX exceeds `adx_threshold` with +DI
/// above -DI, sell when it exceeds the threshold with -DI above +DI.
pub struct AdxSignal;

impl SignalSource for AdxSignal {
    fn name(&self) -> &str {
        "adx"
    }

    fn warmup(&self, params: &StrategyParams) -> usize {
        (2 * params.adx_window).saturating_sub(1)
    }

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>> {
        calculate_dmi(bars, params.adx_window)
            .into_iter()
            .map(|dmi| {
                let d = dmi?;
                let trending = d.adx > params.adx_threshold;
                Some(SignalPair::new(
                    trending && d.plus_di > d.minus_di,
                    trending && d.minus_di > d.plus_di,
                ))
            })
            .collect()
    }
}
