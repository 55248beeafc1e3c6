//! Parameter search port trait.
//!
//! The search algorithm is a black box that proposes candidates and
//! receives a scalar score to maximize. Non-finite scores mark failed
//! trials.

use crate::domain::error::WftraderError;
use crate::domain::search::SearchOutcome;
use crate::domain::strategy::StrategyParams;

/// Score function handed to a search. Called concurrently.
pub type Objective<'a> = &'a (dyn Fn(&StrategyParams) -> f64 + Sync);

pub trait ParamSearch {
    fn optimize(&self, objective: Objective<'_>) -> Result<SearchOutcome, WftraderError>;
}
