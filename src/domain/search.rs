//! Parameter ranges and search results.

use rand::Rng;

use super::error::WftraderError;
use super::strategy::StrategyParams;

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: usize,
    pub max: usize,
}

/// Inclusive float bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
}

impl IntRange {
    pub const fn new(min: usize, max: usize) -> Self {
        IntRange { min, max }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.min..=self.max)
    }
}

impl FloatRange {
    pub const fn new(min: f64, max: f64) -> Self {
        FloatRange { min, max }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Search bounds for every [`StrategyParams`] field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpace {
    pub rsi_window: IntRange,
    pub rsi_lower: FloatRange,
    pub rsi_upper: FloatRange,
    pub macd_fast: IntRange,
    pub macd_slow: IntRange,
    pub macd_signal: IntRange,
    pub bb_window: IntRange,
    pub bb_std: FloatRange,
    pub obv_window: IntRange,
    pub atr_window: IntRange,
    pub atr_mult: FloatRange,
    pub adx_window: IntRange,
    pub adx_threshold: FloatRange,
    pub stop_loss: FloatRange,
    pub take_profit: FloatRange,
    pub n_shares: FloatRange,
}

impl Default for ParamSpace {
    fn default() -> Self {
        ParamSpace {
            rsi_window: IntRange::new(10, 30),
            rsi_lower: FloatRange::new(25.0, 35.0),
            rsi_upper: FloatRange::new(65.0, 75.0),
            macd_fast: IntRange::new(5, 12),
            macd_slow: IntRange::new(20, 40),
            macd_signal: IntRange::new(9, 18),
            bb_window: IntRange::new(20, 50),
            bb_std: FloatRange::new(1.0, 3.0),
            obv_window: IntRange::new(20, 50),
            atr_window: IntRange::new(10, 30),
            atr_mult: FloatRange::new(1.0, 2.5),
            adx_window: IntRange::new(10, 30),
            adx_threshold: FloatRange::new(20.0, 30.0),
            stop_loss: FloatRange::new(0.02, 0.05),
            take_profit: FloatRange::new(0.04, 0.15),
            n_shares: FloatRange::new(0.5, 5.0),
        }
    }
}

impl ParamSpace {
    fn int_ranges(&self) -> [(&'static str, IntRange); 8] {
        [
            ("rsi_window", self.rsi_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_window", self.bb_window),
            ("obv_window", self.obv_window),
            ("atr_window", self.atr_window),
            ("adx_window", self.adx_window),
        ]
    }

    fn float_ranges(&self) -> [(&'static str, FloatRange); 8] {
        [
            ("rsi_lower", self.rsi_lower),
            ("rsi_upper", self.rsi_upper),
            ("bb_std", self.bb_std),
            ("atr_mult", self.atr_mult),
            ("adx_threshold", self.adx_threshold),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("n_shares", self.n_shares),
        ]
    }

    /// Every range must be non-empty with finite bounds.
    pub fn validate(&self) -> Result<(), WftraderError> {
        for (field, r) in self.int_ranges() {
            if r.min > r.max {
                return Err(WftraderError::config_invalid(
                    "search",
                    field,
                    format!("min {} exceeds max {}", r.min, r.max),
                ));
            }
        }
        for (field, r) in self.float_ranges() {
            if !(r.min.is_finite() && r.max.is_finite() && r.min <= r.max) {
                return Err(WftraderError::config_invalid(
                    "search",
                    field,
                    format!("invalid range {}..={}", r.min, r.max),
                ));
            }
        }
        Ok(())
    }

    /// Draw one candidate uniformly from every range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> StrategyParams {
        StrategyParams {
            rsi_window: self.rsi_window.sample(rng),
            rsi_lower: self.rsi_lower.sample(rng),
            rsi_upper: self.rsi_upper.sample(rng),
            macd_fast: self.macd_fast.sample(rng),
            macd_slow: self.macd_slow.sample(rng),
            macd_signal: self.macd_signal.sample(rng),
            bb_window: self.bb_window.sample(rng),
            bb_std: self.bb_std.sample(rng),
            obv_window: self.obv_window.sample(rng),
            atr_window: self.atr_window.sample(rng),
            atr_mult: self.atr_mult.sample(rng),
            adx_window: self.adx_window.sample(rng),
            adx_threshold: self.adx_threshold.sample(rng),
            stop_loss: self.stop_loss.sample(rng),
            take_profit: self.take_profit.sample(rng),
            n_shares: self.n_shares.sample(rng),
        }
    }
}

/// One evaluated candidate. A non-finite score marks a failed trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub number: usize,
    pub params: StrategyParams,
    pub score: f64,
}

impl Trial {
    pub fn succeeded(&self) -> bool {
        self.score.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Highest-scoring successful trial; `None` when every trial failed.
    pub best: Option<Trial>,
    pub trials: Vec<Trial>,
}

impl SearchOutcome {
    pub fn from_trials(trials: Vec<Trial>) -> Self {
        let best = trials
            .iter()
            .filter(|t| t.succeeded())
            .fold(None::<&Trial>, |best, t| match best {
                Some(b) if b.score >= t.score => Some(b),
                _ => Some(t),
            })
            .cloned();
        SearchOutcome { best, trials }
    }

    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| !t.succeeded()).count()
    }
}
