//! Configuration loading and validation.
//!
//! Every section is read and checked before any run starts, so a bad value
//! surfaces as a configuration error rather than a failed trial.

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CASH, DEFAULT_QUORUM};
use crate::domain::error::WftraderError;
use crate::domain::execution::{DEFAULT_COMMISSION, DEFAULT_PERIODS_PER_YEAR};
use crate::domain::position::ExitBoundary;
use crate::domain::split::SplitRatios;
use crate::domain::strategy::StrategyParams;
use crate::domain::walk_forward::DEFAULT_FOLDS;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_TRIALS: usize = 50;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_DATA_DIR: &str = "data";

pub fn parse_exit_boundary(value: &str) -> Result<ExitBoundary, WftraderError> {
    match value.trim().to_lowercase().as_str() {
        "inclusive" => Ok(ExitBoundary::Inclusive),
        "strict" => Ok(ExitBoundary::Strict),
        other => Err(WftraderError::config_invalid(
            "backtest",
            "exit_boundary",
            format!("expected inclusive or strict, got {other:?}"),
        )),
    }
}

/// `[backtest]` section.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, WftraderError> {
    let exit_boundary = match config.get_string("backtest", "exit_boundary") {
        Some(value) => parse_exit_boundary(&value)?,
        None => ExitBoundary::default(),
    };

    let bt = BacktestConfig {
        initial_cash: config.get_number("backtest", "initial_cash", DEFAULT_INITIAL_CASH)?,
        commission: config.get_number("backtest", "commission", DEFAULT_COMMISSION)?,
        borrow_rate: config.get_number("backtest", "borrow_rate", 0.0)?,
        periods_per_year: config.get_number(
            "backtest",
            "periods_per_year",
            DEFAULT_PERIODS_PER_YEAR,
        )?,
        quorum: config.get_count("backtest", "quorum", DEFAULT_QUORUM)?,
        exit_boundary,
    };
    bt.validate()?;
    Ok(bt)
}

/// `[strategy]` section; absent keys keep their defaults.
pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, WftraderError> {
    let d = StrategyParams::default();
    let s = "strategy";
    let params = StrategyParams {
        rsi_window: config.get_count(s, "rsi_window", d.rsi_window)?,
        rsi_lower: config.get_number(s, "rsi_lower", d.rsi_lower)?,
        rsi_upper: config.get_number(s, "rsi_upper", d.rsi_upper)?,
        macd_fast: config.get_count(s, "macd_fast", d.macd_fast)?,
        macd_slow: config.get_count(s, "macd_slow", d.macd_slow)?,
        macd_signal: config.get_count(s, "macd_signal", d.macd_signal)?,
        bb_window: config.get_count(s, "bb_window", d.bb_window)?,
        bb_std: config.get_number(s, "bb_std", d.bb_std)?,
        obv_window: config.get_count(s, "obv_window", d.obv_window)?,
        atr_window: config.get_count(s, "atr_window", d.atr_window)?,
        atr_mult: config.get_number(s, "atr_mult", d.atr_mult)?,
        adx_window: config.get_count(s, "adx_window", d.adx_window)?,
        adx_threshold: config.get_number(s, "adx_threshold", d.adx_threshold)?,
        stop_loss: config.get_number(s, "stop_loss", d.stop_loss)?,
        take_profit: config.get_number(s, "take_profit", d.take_profit)?,
        n_shares: config.get_number(s, "n_shares", d.n_shares)?,
    };
    params.validate()?;
    Ok(params)
}

/// `[walk_forward] folds`, at least 1.
pub fn load_walk_forward_folds(config: &dyn ConfigPort) -> Result<usize, WftraderError> {
    let folds = config.get_count("walk_forward", "folds", DEFAULT_FOLDS)?;
    if folds == 0 {
        return Err(WftraderError::config_invalid(
            "walk_forward",
            "folds",
            "must be at least 1",
        ));
    }
    Ok(folds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub trials: usize,
    pub seed: u64,
}

/// `[search]` section.
pub fn load_search_settings(config: &dyn ConfigPort) -> Result<SearchSettings, WftraderError> {
    let trials = config.get_count("search", "trials", DEFAULT_TRIALS)?;
    if trials == 0 {
        return Err(WftraderError::config_invalid(
            "search",
            "trials",
            "must be at least 1",
        ));
    }
    let seed = config.get_count("search", "seed", DEFAULT_SEED as usize)? as u64;
    Ok(SearchSettings { trials, seed })
}

/// `[split]` percentages; validated when the split is taken.
pub fn load_split_ratios(config: &dyn ConfigPort) -> Result<SplitRatios, WftraderError> {
    let d = SplitRatios::default();
    Ok(SplitRatios {
        train_pct: config.get_number("split", "train_pct", d.train_pct)?,
        test_pct: config.get_number("split", "test_pct", d.test_pct)?,
        validation_pct: config.get_number("split", "validation_pct", d.validation_pct)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSettings {
    pub directory: PathBuf,
    pub symbol: String,
}

/// `[data]` section. Command-line overrides take precedence over both keys.
pub fn load_data_settings(
    config: &dyn ConfigPort,
    directory_override: Option<PathBuf>,
    symbol_override: Option<String>,
) -> Result<DataSettings, WftraderError> {
    let directory = directory_override
        .or_else(|| config.get_string("data", "directory").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let symbol = symbol_override
        .or_else(|| config.get_string("data", "symbol"))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| WftraderError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })?;
    Ok(DataSettings { directory, symbol })
}
