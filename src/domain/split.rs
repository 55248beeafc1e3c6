//! Contiguous train/test/validation split of a bar series.

use super::error::WftraderError;
use super::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train_pct: f64,
    pub test_pct: f64,
    pub validation_pct: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        SplitRatios {
            train_pct: 60.0,
            test_pct: 20.0,
            validation_pct: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSplit<'a> {
    pub train: &'a [Bar],
    pub test: &'a [Bar],
    pub validation: &'a [Bar],
}

/// Cut `bars` into three consecutive segments sized by percentage.
///
/// Percentages must be non-negative and sum to 100. Segment boundaries are
/// floored; the validation segment takes whatever remains.
pub fn split_bars(bars: &[Bar], ratios: SplitRatios) -> Result<BarSplit<'_>, WftraderError> {
    let SplitRatios {
        train_pct,
        test_pct,
        validation_pct,
    } = ratios;
    if [train_pct, test_pct, validation_pct]
        .iter()
        .any(|p| !(p.is_finite() && *p >= 0.0))
    {
        return Err(WftraderError::config_invalid(
            "split",
            "pct",
            "percentages must be non-negative",
        ));
    }
    let total = train_pct + test_pct + validation_pct;
    if (total - 100.0).abs() > 1e-9 {
        return Err(WftraderError::config_invalid(
            "split",
            "pct",
            format!("percentages sum to {total}, expected 100"),
        ));
    }

    let n = bars.len();
    let train_end = (n as f64 * train_pct / 100.0).floor() as usize;
    let test_len = (n as f64 * test_pct / 100.0).floor() as usize;
    let test_end = (train_end + test_len).min(n);

    Ok(BarSplit {
        train: &bars[..train_end],
        test: &bars[train_end..test_end],
        validation: &bars[test_end..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::bars_from_closes;

    fn sample_bars(n: usize) -> Vec<Bar> {
        bars_from_closes(&vec![100.0; n])
    }

    #[test]
    fn default_is_sixty_twenty_twenty() {
        let bars = sample_bars(10);
        let split = split_bars(&bars, SplitRatios::default()).unwrap();
        assert_eq!(split.train.len(), 6);
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.validation.len(), 2);
    }

    #[test]
    fn test_boundary_floors_each_share_separately() {
        let bars = sample_bars(9);
        let split = split_bars(&bars, SplitRatios::default()).unwrap();
        assert_eq!(split.train.len(), 5);
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.validation.len(), 3);
    }

    #[test]
    fn segments_are_contiguous() {
        let bars = sample_bars(7);
        let split = split_bars(&bars, SplitRatios::default()).unwrap();
        assert_eq!(
            split.train.len() + split.test.len() + split.validation.len(),
            7
        );
        if let (Some(a), Some(b)) = (split.train.last(), split.test.first()) {
            assert!(a.timestamp < b.timestamp);
        }
    }

    #[test]
    fn ratios_must_sum_to_hundred() {
        let bars = sample_bars(10);
        let ratios = SplitRatios {
            train_pct: 50.0,
            test_pct: 20.0,
            validation_pct: 20.0,
        };
        assert!(split_bars(&bars, ratios).unwrap_err().is_configuration_error());
    }

    #[test]
    fn negative_ratio_rejected() {
        let bars = sample_bars(10);
        let ratios = SplitRatios {
            train_pct: 120.0,
            test_pct: -20.0,
            validation_pct: 0.0,
        };
        assert!(split_bars(&bars, ratios).is_err());
    }

    #[test]
    fn empty_series_splits_empty() {
        let split = split_bars(&[], SplitRatios::default()).unwrap();
        assert!(split.train.is_empty());
        assert!(split.validation.is_empty());
    }
}
