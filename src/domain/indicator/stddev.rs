//! Rolling mean and population standard deviation.
//!
//! SMA(n)[i] = sum(x[i-n+1..=i]) / n
//! STDDEV(n)[i] = sqrt(sum((x[j] - SMA(n)[i])^2) / n)
//! Warmup: first (n-1) values are `None`.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, mean)
}

pub fn calculate_stddev(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        let m = mean(window);
        let variance =
            window.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / window.len() as f64;
        variance.sqrt()
    })
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for (i, window) in values.windows(period).enumerate() {
        out[i + period - 1] = Some(f(window));
    }
    out
}
