//! Seeded random search over a [`ParamSpace`].
//!
//! Trial `i` draws its candidate from `StdRng::seed_from_u64(seed + i)`, so
//! the proposed parameters do not depend on evaluation order and trials can
//! run in parallel.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::error::WftraderError;
use crate::domain::search::{ParamSpace, SearchOutcome, Trial};
use crate::ports::search_port::{Objective, ParamSearch};

#[derive(Debug, Clone)]
pub struct RandomSearch {
    pub space: ParamSpace,
    pub trials: usize,
    pub seed: u64,
}

impl RandomSearch {
    pub fn new(space: ParamSpace, trials: usize, seed: u64) -> Self {
        RandomSearch {
            space,
            trials,
            seed,
        }
    }

    fn trial_rng(&self, number: usize) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(number as u64))
    }
}

impl ParamSearch for RandomSearch {
    fn optimize(&self, objective: Objective<'_>) -> Result<SearchOutcome, WftraderError> {
        self.space.validate()?;
        if self.trials == 0 {
            return Err(WftraderError::config_invalid(
                "search",
                "trials",
                "must be at least 1",
            ));
        }

        let trials: Vec<Trial> = (0..self.trials)
            .into_par_iter()
            .map(|number| {
                let params = self.space.sample(&mut self.trial_rng(number));
                let score = objective(&params);
                debug!(trial = number, score, "trial evaluated");
                Trial {
                    number,
                    params,
                    score,
                }
            })
            .collect();

        let outcome = SearchOutcome::from_trials(trials);
        let failed = outcome.failed_count();
        if failed > 0 {
            warn!(failed, total = self.trials, "search trials failed");
        }
        match &outcome.best {
            Some(best) => info!(trial = best.number, score = best.score, "best trial"),
            None => warn!("no search trial produced a finite score"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::{FloatRange, IntRange};
    use crate::domain::strategy::StrategyParams;

    fn rsi_objective(p: &StrategyParams) -> f64 {
        p.rsi_window as f64
    }

    #[test]
    fn same_seed_same_outcome() {
        let search = RandomSearch::new(ParamSpace::default(), 16, 42);
        let a = search.optimize(&rsi_objective).unwrap();
        let b = search.optimize(&rsi_objective).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.trials.len(), 16);
    }

    #[test]
    fn trials_are_numbered_in_order() {
        let search = RandomSearch::new(ParamSpace::default(), 8, 1);
        let outcome = search.optimize(&rsi_objective).unwrap();
        let numbers: Vec<usize> = outcome.trials.iter().map(|t| t.number).collect();
        assert_eq!(numbers, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn best_is_the_maximum_score() {
        let search = RandomSearch::new(ParamSpace::default(), 32, 9);
        let outcome = search.optimize(&rsi_objective).unwrap();
        let max = outcome
            .trials
            .iter()
            .map(|t| t.score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(outcome.best.map(|t| t.score), Some(max));
    }

    #[test]
    fn failing_objective_yields_no_best() {
        let search = RandomSearch::new(ParamSpace::default(), 4, 0);
        let outcome = search.optimize(&|_| f64::NEG_INFINITY).unwrap();
        assert!(outcome.best.is_none());
        assert_eq!(outcome.failed_count(), 4);
    }

    #[test]
    fn partial_failures_do_not_abort() {
        let search = RandomSearch::new(ParamSpace::default(), 20, 3);
        let outcome = search
            .optimize(&|p| {
                if p.rsi_window % 2 == 0 {
                    f64::NEG_INFINITY
                } else {
                    p.rsi_window as f64
                }
            })
            .unwrap();
        assert_eq!(outcome.trials.len(), 20);
        if let Some(best) = outcome.best {
            assert_eq!(best.params.rsi_window % 2, 1);
        }
    }

    #[test]
    fn invalid_space_rejected() {
        let space = ParamSpace {
            stop_loss: FloatRange::new(0.05, 0.01),
            ..ParamSpace::default()
        };
        let search = RandomSearch::new(space, 4, 0);
        assert!(search.optimize(&rsi_objective).unwrap_err().is_configuration_error());
    }

    #[test]
    fn zero_trials_rejected() {
        let search = RandomSearch::new(ParamSpace::default(), 0, 0);
        assert!(search.optimize(&rsi_objective).is_err());
    }

    #[test]
    fn fixed_space_proposes_fixed_params() {
        let space = ParamSpace {
            rsi_window: IntRange::new(14, 14),
            ..ParamSpace::default()
        };
        let search = RandomSearch::new(space, 5, 11);
        let outcome = search.optimize(&rsi_objective).unwrap();
        assert!(outcome.trials.iter().all(|t| t.params.rsi_window == 14));
    }
}
