//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are `None`.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for (i, &x) in values.iter().enumerate().skip(period) {
        ema = x * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}
