//! Walk-forward evaluation over expanding-window temporal folds.
//!
//! The series is cut into `k + 1` equal blocks (remainder absorbed by the
//! first training window); fold `i` tests block `i + 1` and trains on
//! everything before it. Only test windows are simulated. Folds are
//! independent runs and are evaluated in parallel.

use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, warn};

use super::backtest::{BacktestConfig, CancelToken, run_strategy};
use super::error::WftraderError;
use super::indicator::IndicatorSet;
use super::metrics::Metrics;
use super::ohlcv::Bar;
use super::strategy::StrategyParams;

pub const DEFAULT_FOLDS: usize = 5;

/// Bar index ranges of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSpec {
    pub index: usize,
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Lay out `n_folds` expanding-window folds over `total_bars` bars.
pub fn create_folds(total_bars: usize, n_folds: usize) -> Result<Vec<FoldSpec>, WftraderError> {
    if n_folds == 0 {
        return Err(WftraderError::config_invalid(
            "walk_forward",
            "folds",
            "must be at least 1",
        ));
    }
    let test_size = total_bars / (n_folds + 1);
    if test_size == 0 {
        return Err(WftraderError::config_invalid(
            "walk_forward",
            "folds",
            format!("{n_folds} folds leave no bars per fold out of {total_bars}"),
        ));
    }

    let first_test = total_bars - n_folds * test_size;
    Ok((0..n_folds)
        .map(|index| {
            let start = first_test + index * test_size;
            FoldSpec {
                index,
                train: 0..start,
                test: start..start + test_size,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldScore {
    pub fold: FoldSpec,
    pub calmar: f64,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldFailure {
    pub fold: FoldSpec,
    pub error: WftraderError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardResult {
    pub scores: Vec<FoldScore>,
    pub failures: Vec<FoldFailure>,
}

impl WalkForwardResult {
    /// Mean Calmar over completed folds; negative infinity when none
    /// completed.
    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NEG_INFINITY;
        }
        self.scores.iter().map(|s| s.calmar).sum::<f64>() / self.scores.len() as f64
    }

    pub fn all_failed(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Run `params` on every fold's test window and collect per-fold Calmar.
///
/// A fold that fails (too short for the indicator warmup, invalid
/// parameters) is reported in `failures` and left out of the mean. Fails
/// outright only when the fold layout itself is invalid.
pub fn walk_forward(
    bars: &[Bar],
    params: &StrategyParams,
    n_folds: usize,
    config: &BacktestConfig,
    sources: &IndicatorSet,
    cancel: Option<&CancelToken>,
) -> Result<WalkForwardResult, WftraderError> {
    let folds = create_folds(bars.len(), n_folds)?;

    let outcomes: Vec<(FoldSpec, Result<Metrics, WftraderError>)> = folds
        .into_par_iter()
        .map(|fold| {
            let outcome = run_strategy(&bars[fold.test.clone()], params, config, sources, cancel)
                .map(|result| Metrics::compute(&result, config.periods_per_year));
            (fold, outcome)
        })
        .collect();

    let mut scores = Vec::new();
    let mut failures = Vec::new();
    for (fold, outcome) in outcomes {
        match outcome {
            Ok(metrics) => {
                debug!(
                    fold = fold.index,
                    calmar = metrics.calmar_ratio,
                    "fold completed"
                );
                scores.push(FoldScore {
                    fold,
                    calmar: metrics.calmar_ratio,
                    metrics,
                });
            }
            Err(error) => {
                warn!(fold = fold.index, %error, "fold failed");
                failures.push(FoldFailure { fold, error });
            }
        }
    }

    Ok(WalkForwardResult { scores, failures })
}
