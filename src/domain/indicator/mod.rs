//! Technical indicators and the signal sources built on them.
//!
//! Each indicator is a pure function over a bar (or close) slice returning
//! one `Option` per input, `None` during warmup. A [`SignalSource`] turns an
//! indicator into buy/sell votes; [`IndicatorSet`] runs a collection of them
//! into a [`SignalTable`].

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stddev;

pub use adx::{AdxSignal, Dmi, calculate_dmi};
pub use atr::{AtrChannelSignal, calculate_atr};
pub use bollinger::{Bands, BollingerSignal, calculate_bollinger};
pub use ema::calculate_ema;
pub use macd::{MacdPoint, MacdSignal, calculate_macd};
pub use obv::{ObvSignal, calculate_obv};
pub use rsi::{RsiSignal, calculate_rsi};
pub use stddev::{calculate_sma, calculate_stddev};

use super::error::WftraderError;
use super::ohlcv::Bar;
use super::signal::{SignalPair, SignalTable};
use super::strategy::StrategyParams;

/// Produces one vote per bar from price data and strategy parameters.
///
/// Implementations must return exactly `bars.len()` values with the first
/// `warmup(params)` entries `None`.
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    /// Number of leading bars without a defined signal.
    fn warmup(&self, params: &StrategyParams) -> usize;

    fn signals(&self, bars: &[Bar], params: &StrategyParams) -> Vec<Option<SignalPair>>;
}

/// Ordered collection of signal sources.
pub struct IndicatorSet {
    sources: Vec<Box<dyn SignalSource>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        IndicatorSet {
            sources: Vec::new(),
        }
    }

    /// RSI, MACD, Bollinger, OBV, ATR channel and ADX.
    pub fn standard() -> Self {
        IndicatorSet::new()
            .with(RsiSignal)
            .with(MacdSignal)
            .with(BollingerSignal)
            .with(ObvSignal)
            .with(AtrChannelSignal)
            .with(AdxSignal)
    }

    pub fn with(mut self, source: impl SignalSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Longest warmup across all sources.
    pub fn warmup(&self, params: &StrategyParams) -> usize {
        self.sources
            .iter()
            .map(|s| s.warmup(params))
            .max()
            .unwrap_or(0)
    }

    /// Run every source over `bars` and collect the aligned columns.
    pub fn build_table(
        &self,
        bars: &[Bar],
        params: &StrategyParams,
    ) -> Result<SignalTable, WftraderError> {
        let mut table = SignalTable::new(bars.len());
        for source in &self.sources {
            table.push(source.name(), source.signals(bars, params))?;
        }
        Ok(table)
    }
}

impl Default for IndicatorSet {
    fn default() -> Self {
        IndicatorSet::standard()
    }
}

/// Combine two indicator series into votes with `vote`, `None` wherever
/// either input is undefined.
pub(crate) fn vote_where_defined<A: Copy, B: Copy>(
    a: &[Option<A>],
    b: &[Option<B>],
    vote: impl Fn(A, B) -> SignalPair,
) -> Vec<Option<SignalPair>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| Some(vote((*x)?, (*y)?)))
        .collect()
}
