//! Backtest engine and per-bar event loop.
//!
//! For each bar carrying a defined signal, in order:
//! 1. close open positions whose bracket the close breaches
//! 2. open a long on buy and a short on sell, cash permitting
//! 3. record the marked-to-market portfolio value
//!
//! After the last bar every open position is liquidated at its close and
//! the final recorded value becomes the realized cash.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use super::error::WftraderError;
use super::execution::{
    DEFAULT_COMMISSION, DEFAULT_PERIODS_PER_YEAR, EntryResult, ExecutionConfig, close_due,
    liquidate, open_on_signal,
};
use super::indicator::IndicatorSet;
use super::ohlcv::{Bar, is_strictly_ordered};
use super::portfolio::SimulationState;
use super::position::{Bracket, ClosedTrade, ExitBoundary};
use super::signal::{SignalPair, defined_bars};
use super::strategy::StrategyParams;

pub const DEFAULT_INITIAL_CASH: f64 = 1_000_000.0;
pub const DEFAULT_QUORUM: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub commission: f64,
    pub borrow_rate: f64,
    pub periods_per_year: f64,
    /// Minimum number of agreeing sources for an aggregate buy or sell.
    pub quorum: usize,
    pub exit_boundary: ExitBoundary,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            commission: DEFAULT_COMMISSION,
            borrow_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            quorum: DEFAULT_QUORUM,
            exit_boundary: ExitBoundary::Inclusive,
        }
    }
}

impl BacktestConfig {
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission: self.commission,
            borrow_rate: self.borrow_rate,
            periods_per_year: self.periods_per_year,
            exit_boundary: self.exit_boundary,
        }
    }

    pub fn validate(&self) -> Result<(), WftraderError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(WftraderError::config_invalid(
                "backtest",
                "initial_cash",
                "must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.commission) {
            return Err(WftraderError::config_invalid(
                "backtest",
                "commission",
                "must be in [0, 1)",
            ));
        }
        if !(self.borrow_rate.is_finite() && self.borrow_rate >= 0.0) {
            return Err(WftraderError::config_invalid(
                "backtest",
                "borrow_rate",
                "must be non-negative",
            ));
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(WftraderError::config_invalid(
                "backtest",
                "periods_per_year",
                "must be positive",
            ));
        }
        if self.quorum == 0 {
            return Err(WftraderError::config_invalid(
                "backtest",
                "quorum",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag checked before each bar.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Timestamp of each simulated bar.
    pub timestamps: Vec<NaiveDateTime>,
    /// Portfolio value after each simulated bar; the last entry is the
    /// cash left after liquidation.
    pub values: Vec<f64>,
    pub closed_trades: Vec<ClosedTrade>,
    pub final_cash: f64,
    /// Lowest cash balance observed during the run.
    pub min_cash: f64,
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(self.final_cash)
    }

    pub fn total_trades(&self) -> usize {
        self.closed_trades.len()
    }
}

fn validate_bars(bars: &[Bar]) -> Result<(), WftraderError> {
    if bars.is_empty() {
        return Err(WftraderError::InsufficientData {
            bars: 0,
            minimum: 1,
        });
    }
    if !is_strictly_ordered(bars) {
        return Err(WftraderError::DataParse {
            reason: "bar timestamps are not strictly increasing".into(),
        });
    }
    if let Some(bar) = bars
        .iter()
        .find(|b| !(b.close.is_finite() && b.close > 0.0))
    {
        return Err(WftraderError::DataParse {
            reason: format!("non-positive close {} at {}", bar.close, bar.timestamp),
        });
    }
    Ok(())
}

/// Simulate `bars` against their aggregate `signals`.
///
/// Both slices hold only bars with a defined signal and must be the same
/// length. The run is deterministic: identical inputs give bit-identical
/// results.
pub fn run_backtest(
    bars: &[Bar],
    signals: &[SignalPair],
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<BacktestResult, WftraderError> {
    simulate(bars, signals, params, config, None)
}

/// [`run_backtest`] that stops with [`WftraderError::Cancelled`] once
/// `cancel` is set.
pub fn run_backtest_cancellable(
    bars: &[Bar],
    signals: &[SignalPair],
    params: &StrategyParams,
    config: &BacktestConfig,
    cancel: &CancelToken,
) -> Result<BacktestResult, WftraderError> {
    simulate(bars, signals, params, config, Some(cancel))
}

fn simulate(
    bars: &[Bar],
    signals: &[SignalPair],
    params: &StrategyParams,
    config: &BacktestConfig,
    cancel: Option<&CancelToken>,
) -> Result<BacktestResult, WftraderError> {
    params.validate()?;
    config.validate()?;
    validate_bars(bars)?;
    if signals.len() != bars.len() {
        return Err(WftraderError::SignalMisaligned {
            source_name: "aggregate".into(),
            expected: bars.len(),
            actual: signals.len(),
        });
    }

    let run = step_bars(bars, signals, Bracket::from(params), config, cancel)?;

    Ok(BacktestResult {
        timestamps: bars.iter().map(|b| b.timestamp).collect(),
        values: run.values,
        closed_trades: run.state.closed_trades,
        final_cash: run.state.cash,
        min_cash: run.min_cash,
    })
}

/// Simulation state after the last bar and its liquidation.
struct SteppedRun {
    state: SimulationState,
    values: Vec<f64>,
    min_cash: f64,
}

/// Walk validated, aligned `bars` and `signals`, then liquidate at the last
/// close. Every position is closed when this returns `Ok`.
fn step_bars(
    bars: &[Bar],
    signals: &[SignalPair],
    bracket: Bracket,
    config: &BacktestConfig,
    cancel: Option<&CancelToken>,
) -> Result<SteppedRun, WftraderError> {
    let exec = config.execution();
    let mut state = SimulationState::new(config.initial_cash);
    let mut values = Vec::with_capacity(bars.len());
    let mut min_cash = state.cash;

    debug!(
        bars = bars.len(),
        initial_cash = config.initial_cash,
        "backtest started"
    );

    for (i, (bar, &signal)) in bars.iter().zip(signals).enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            debug!(bar = i, "backtest cancelled");
            return Err(WftraderError::Cancelled { bar: i });
        }

        close_due(&mut state, i, bar, &exec);
        min_cash = min_cash.min(state.cash);

        let outcome = open_on_signal(&mut state, i, bar, signal, bracket, &exec)?;
        for entry in [outcome.long, outcome.short] {
            if let EntryResult::InsufficientCash {
                required,
                available,
            } = entry
            {
                trace!(bar = i, required, available, "entry skipped");
            }
        }
        min_cash = min_cash.min(state.cash);

        values.push(state.value(bar.close, i, &exec));
    }

    if let Some(bar) = bars.last() {
        let liquidated = liquidate(&mut state, bars.len() - 1, bar, &exec);
        if let Some(value) = values.last_mut() {
            *value = state.cash;
        }
        debug!(
            final_cash = state.cash,
            trades = state.closed_trades.len(),
            liquidated,
            "backtest finished"
        );
    }

    Ok(SteppedRun {
        state,
        values,
        min_cash,
    })
}

/// Bars that carry an aggregate signal, paired with that signal.
pub fn prepare_signals(
    bars: &[Bar],
    params: &StrategyParams,
    quorum: usize,
    sources: &IndicatorSet,
) -> Result<(Vec<Bar>, Vec<SignalPair>), WftraderError> {
    params.validate()?;
    let table = sources.build_table(bars, params)?;
    let aggregated = table.aggregate(quorum)?;
    let (kept, signals): (Vec<Bar>, Vec<SignalPair>) = defined_bars(&aggregated)
        .into_iter()
        .map(|(i, signal)| (bars[i].clone(), signal))
        .unzip();

    if kept.is_empty() {
        return Err(WftraderError::InsufficientData {
            bars: bars.len(),
            minimum: sources.warmup(params) + 1,
        });
    }
    Ok((kept, signals))
}

/// Compute signals for `bars` with `sources`, then simulate the bars that
/// carry a defined aggregate signal.
pub fn run_strategy(
    bars: &[Bar],
    params: &StrategyParams,
    config: &BacktestConfig,
    sources: &IndicatorSet,
    cancel: Option<&CancelToken>,
) -> Result<BacktestResult, WftraderError> {
    let (kept, signals) = prepare_signals(bars, params, config.quorum, sources)?;
    simulate(&kept, &signals, params, config, cancel)
}
