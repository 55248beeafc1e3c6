//! Scoring entry points for parameter search.
//!
//! An [`Evaluator`] owns the bar series, run configuration and signal
//! sources, and maps a [`StrategyParams`] candidate to a scalar score. Any
//! error becomes `f64::NEG_INFINITY` so a bad trial never aborts a search.

use tracing::warn;

use super::backtest::{BacktestConfig, BacktestResult, CancelToken, run_strategy};
use super::error::WftraderError;
use super::indicator::IndicatorSet;
use super::metrics::Metrics;
use super::ohlcv::Bar;
use super::strategy::StrategyParams;
use super::walk_forward::{WalkForwardResult, walk_forward};

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub result: BacktestResult,
    pub metrics: Metrics,
}

pub struct Evaluator {
    bars: Vec<Bar>,
    config: BacktestConfig,
    sources: IndicatorSet,
    cancel: Option<CancelToken>,
}

impl Evaluator {
    pub fn new(bars: Vec<Bar>, config: BacktestConfig, sources: IndicatorSet) -> Self {
        Evaluator {
            bars,
            config,
            sources,
            cancel: None,
        }
    }

    /// Abort in-flight and future runs once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Full-series backtest with metrics.
    pub fn run(&self, params: &StrategyParams) -> Result<RunReport, WftraderError> {
        let result = run_strategy(
            &self.bars,
            params,
            &self.config,
            &self.sources,
            self.cancel.as_ref(),
        )?;
        let metrics = Metrics::compute(&result, self.config.periods_per_year);
        Ok(RunReport { result, metrics })
    }

    /// Full-series Calmar ratio.
    pub fn evaluate(&self, params: &StrategyParams) -> f64 {
        match self.run(params) {
            Ok(report) => report.metrics.calmar_ratio,
            Err(error) => {
                warn!(%error, "evaluation failed");
                f64::NEG_INFINITY
            }
        }
    }

    pub fn walk_forward(
        &self,
        params: &StrategyParams,
        n_folds: usize,
    ) -> Result<WalkForwardResult, WftraderError> {
        walk_forward(
            &self.bars,
            params,
            n_folds,
            &self.config,
            &self.sources,
            self.cancel.as_ref(),
        )
    }

    /// Calmar averaged over `n_folds` walk-forward test windows.
    pub fn evaluate_walk_forward(&self, params: &StrategyParams, n_folds: usize) -> f64 {
        match self.walk_forward(params, n_folds) {
            Ok(result) => {
                if !result.failures.is_empty() {
                    warn!(
                        failed = result.failures.len(),
                        completed = result.scores.len(),
                        "walk-forward folds excluded from score"
                    );
                }
                result.mean_score()
            }
            Err(error) => {
                warn!(%error, "walk-forward evaluation failed");
                f64::NEG_INFINITY
            }
        }
    }
}
