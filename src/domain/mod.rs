//! Core domain types and logic.

pub mod ohlcv;
pub mod strategy;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod signal;
pub mod indicator;
pub mod backtest;
pub mod metrics;
pub mod walk_forward;
pub mod split;
pub mod evaluator;
pub mod search;
pub mod config_validation;
pub mod error;
