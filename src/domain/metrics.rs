//! Performance metrics over a portfolio value series.
//!
//! Returns are simple per-bar percentage changes (first bar dropped).
//! Annualization multiplies by `periods_per_year` (8760 for hourly bars).
//! Standard deviation is the sample deviation (n - 1).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};

use super::backtest::BacktestResult;
use super::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    /// `count(r > 0) / count(r != 0)` over per-bar returns; 0 when every
    /// return is zero.
    pub win_rate: f64,
    pub total_trades: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, periods_per_year: f64) -> Self {
        let mut metrics = Metrics::from_values(&result.values, periods_per_year);
        metrics.total_trades = result.total_trades();
        metrics
    }

    pub fn from_values(values: &[f64], periods_per_year: f64) -> Self {
        let returns = simple_returns(values);
        let annualized_return = annualized_return(&returns, periods_per_year);
        let max_drawdown = max_drawdown(values);

        let total_return = match (values.first(), values.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        Metrics {
            final_value: values.last().copied().unwrap_or(0.0),
            total_return,
            annualized_return,
            sharpe_ratio: annualized_sharpe(&returns, periods_per_year),
            sortino_ratio: annualized_sortino(&returns, periods_per_year),
            calmar_ratio: annualized_calmar(annualized_return, max_drawdown),
            max_drawdown,
            win_rate: win_rate(&returns),
            total_trades: 0,
        }
    }
}

/// `values[i] / values[i-1] - 1` for each consecutive pair.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    mean(returns) * periods_per_year
}

/// Zero when the annualized return is not positive or the returns have no
/// dispersion.
pub fn annualized_sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    let ann = annualized_return(returns, periods_per_year);
    if ann <= 0.0 {
        return 0.0;
    }
    let denom = sample_std(returns) * periods_per_year.sqrt();
    if denom > 0.0 { ann / denom } else { 0.0 }
}

/// `sqrt(mean(r^2))` over the negative returns only; 0 when there are none.
pub fn downside_deviation(returns: &[f64]) -> f64 {
    let negatives: Vec<f64> = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).collect();
    mean(&negatives).sqrt()
}

/// Zero when the annualized return is not positive or there is no
/// downside.
pub fn annualized_sortino(returns: &[f64], periods_per_year: f64) -> f64 {
    let ann = annualized_return(returns, periods_per_year);
    if ann <= 0.0 {
        return 0.0;
    }
    let denom = downside_deviation(returns) * periods_per_year.sqrt();
    if denom > 0.0 { ann / denom } else { 0.0 }
}

/// Largest peak-to-trough decline as a fraction of the running peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}

/// Zero when there is no drawdown; negative for losing runs.
pub fn annualized_calmar(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        0.0
    } else {
        annualized_return / max_drawdown
    }
}

pub fn win_rate(returns: &[f64]) -> f64 {
    let moved = returns.iter().filter(|r| **r != 0.0).count();
    if moved == 0 {
        return 0.0;
    }
    let up = returns.iter().filter(|r| **r > 0.0).count();
    up as f64 / moved as f64
}

/// `last_close / first_close - 1`; 0 for fewer than two bars.
pub fn buy_and_hold_return(bars: &[Bar]) -> f64 {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if bars.len() > 1 && first.close > 0.0 => {
            last.close / first.close - 1.0
        }
        _ => 0.0,
    }
}

/// Calendar bucket for [`period_returns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Quarter,
    Year,
}

impl Period {
    /// `(year, index)` where index is the month, the quarter, or 0.
    fn key(self, timestamp: &NaiveDateTime) -> (i32, u32) {
        let year = timestamp.year();
        match self {
            Period::Month => (year, timestamp.month()),
            Period::Quarter => (year, (timestamp.month() - 1) / 3 + 1),
            Period::Year => (year, 0),
        }
    }
}

/// Compounded return of one calendar bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodReturn {
    pub period: Period,
    pub year: i32,
    /// Month (1-12) or quarter (1-4); 0 for a whole year.
    pub index: u32,
    pub value: f64,
}

impl fmt::Display for PeriodReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Period::Month => write!(f, "{}-{:02}", self.year, self.index),
            Period::Quarter => write!(f, "{}-Q{}", self.year, self.index),
            Period::Year => write!(f, "{}", self.year),
        }
    }
}

/// Per-bar returns compounded within each calendar bucket:
/// `prod(1 + r) - 1`.
///
/// A return belongs to the bucket of the bar it ends on. The first bar
/// opens its bucket with no return. Buckets without bars are omitted.
pub fn period_returns(
    timestamps: &[NaiveDateTime],
    values: &[f64],
    period: Period,
) -> Vec<PeriodReturn> {
    let mut growth: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    if let Some(first) = timestamps.first().filter(|_| !values.is_empty()) {
        growth.insert(period.key(first), 1.0);
    }

    let returns = simple_returns(values);
    for (timestamp, r) in timestamps.iter().skip(1).zip(returns) {
        *growth.entry(period.key(timestamp)).or_insert(1.0) *= 1.0 + r;
    }

    growth
        .into_iter()
        .map(|((year, index), g)| PeriodReturn {
            period,
            year,
            index,
            value: g - 1.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn returns_drop_first_bar() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn empty_series() {
        let m = Metrics::from_values(&[], 8760.0);
        assert_eq!(m.final_value, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert_eq!(m.win_rate, 0.0);
    }

    #[test]
    fn annualized_return_scales_mean() {
        let r = [0.01, 0.03];
        assert_relative_eq!(annualized_return(&r, 100.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_positive() {
        let r = [0.01, 0.03];
        // mean 0.02, sample std sqrt(0.0002), ann 0.02 * 4 over std * 2
        let expected = 0.08 / (0.0002_f64.sqrt() * 2.0);
        assert_relative_eq!(annualized_sharpe(&r, 4.0), expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_zero_for_non_positive_return() {
        assert_eq!(annualized_sharpe(&[0.01, -0.02], 8760.0), 0.0);
        assert_eq!(annualized_sharpe(&[0.0, 0.0], 8760.0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_positive_returns() {
        assert_eq!(annualized_sharpe(&[0.5, 0.5, 0.5], 8760.0), 0.0);
    }

    #[test]
    fn downside_uses_negative_returns_only() {
        let r = [0.05, -0.03, -0.04, 0.02];
        let expected = ((0.0009 + 0.0016) / 2.0_f64).sqrt();
        assert_relative_eq!(downside_deviation(&r), expected, epsilon = 1e-12);
    }

    #[test]
    fn sortino_positive() {
        let r = [0.05, -0.01];
        // ann = 0.02 * 4 = 0.08, downside 0.01 * 2
        assert_relative_eq!(annualized_sortino(&r, 4.0), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn sortino_zero_cases() {
        assert_eq!(annualized_sortino(&[-0.01, -0.02], 8760.0), 0.0);
        assert_eq!(annualized_sortino(&[0.01, 0.02], 8760.0), 0.0);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert_relative_eq!(dd, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_rising_series_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[5.0, 5.0]), 0.0);
    }

    #[test]
    fn calmar_zero_without_drawdown() {
        let m = Metrics::from_values(&[100.0, 101.0, 102.0], 8760.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
    }

    #[test]
    fn calmar_can_be_negative() {
        let m = Metrics::from_values(&[100.0, 90.0, 95.0], 1.0);
        assert!(m.calmar_ratio < 0.0);
    }

    #[test]
    fn calmar_ratio() {
        assert_relative_eq!(annualized_calmar(0.5, 0.25), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_ignores_flat_bars() {
        assert_relative_eq!(win_rate(&[0.1, 0.0, -0.1, 0.2]), 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(win_rate(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn total_return_and_final_value() {
        let m = Metrics::from_values(&[1000.0, 1100.0, 1050.0], 8760.0);
        assert_relative_eq!(m.total_return, 0.05, epsilon = 1e-12);
        assert_eq!(m.final_value, 1050.0);
    }

    #[test]
    fn buy_and_hold() {
        let bars: Vec<Bar> = [100.0, 90.0, 125.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::from_millis(i as i64 * 3_600_000, c, c, c, c, 1.0).unwrap()
            })
            .collect();
        assert_relative_eq!(buy_and_hold_return(&bars), 0.25, epsilon = 1e-12);
        assert_eq!(buy_and_hold_return(&bars[..1]), 0.0);
    }

    fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn monthly_returns_split_at_month_boundary() {
        let timestamps = [
            at(2024, 1, 31, 22),
            at(2024, 1, 31, 23),
            at(2024, 2, 1, 0),
            at(2024, 2, 1, 1),
        ];
        let values = [100.0, 110.0, 121.0, 108.9];

        let months = period_returns(&timestamps, &values, Period::Month);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].index), (2024, 1));
        assert_eq!((months[1].year, months[1].index), (2024, 2));
        assert_relative_eq!(months[0].value, 0.10, epsilon = 1e-12);
        // 1.1 * 0.9 - 1
        assert_relative_eq!(months[1].value, -0.01, epsilon = 1e-12);
        assert_eq!(months[1].to_string(), "2024-02");

        let quarters = period_returns(&timestamps, &values, Period::Quarter);
        assert_eq!(quarters.len(), 1);
        assert_eq!(quarters[0].to_string(), "2024-Q1");
        assert_relative_eq!(quarters[0].value, 0.089, epsilon = 1e-12);
    }

    #[test]
    fn period_returns_compound_to_total_return() {
        let timestamps = [
            at(2023, 12, 31, 23),
            at(2024, 3, 31, 23),
            at(2024, 4, 1, 0),
            at(2025, 1, 1, 0),
        ];
        let values = [100.0, 80.0, 90.0, 99.0];

        let quarters = period_returns(&timestamps, &values, Period::Quarter);
        let labels: Vec<String> = quarters.iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["2023-Q4", "2024-Q1", "2024-Q2", "2025-Q1"]);
        assert_eq!(quarters[0].value, 0.0);

        let years = period_returns(&timestamps, &values, Period::Year);
        let compounded: f64 = years.iter().map(|p| 1.0 + p.value).product();
        assert_relative_eq!(compounded - 1.0, -0.01, epsilon = 1e-12);
        assert_eq!(years.len(), 3);
    }

    #[test]
    fn period_returns_empty_series() {
        assert!(period_returns(&[], &[], Period::Month).is_empty());
    }
}
