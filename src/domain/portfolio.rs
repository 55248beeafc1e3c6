//! Simulation state and mark-to-market valuation.

use super::execution::{ExecutionConfig, accrued_borrow};
use super::position::{ClosedTrade, Position, Side};

/// Cash and open positions of a single backtest run.
///
/// Owned by one orchestrator invocation; never shared between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub cash: f64,
    pub open_longs: Vec<Position>,
    pub open_shorts: Vec<Position>,
    pub closed_trades: Vec<ClosedTrade>,
}

impl SimulationState {
    pub fn new(initial_cash: f64) -> Self {
        SimulationState {
            cash: initial_cash,
            open_longs: Vec::new(),
            open_shorts: Vec::new(),
            closed_trades: Vec::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        match position.side {
            Side::Long => self.open_longs.push(position),
            Side::Short => self.open_shorts.push(position),
        }
    }

    pub fn open_count(&self) -> usize {
        self.open_longs.len() + self.open_shorts.len()
    }

    pub fn has_open_positions(&self) -> bool {
        self.open_count() > 0
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    /// Portfolio value at `price`: cash plus every open position marked to
    /// market, shorts net of the commission an immediate close would pay.
    pub fn value(&self, price: f64, bar_index: usize, config: &ExecutionConfig) -> f64 {
        let long_value: f64 = self
            .open_longs
            .iter()
            .map(|pos| pos.market_value(price, config.commission))
            .sum();
        let short_value: f64 = self
            .open_shorts
            .iter()
            .map(|pos| {
                pos.market_value(price, config.commission) - accrued_borrow(pos, bar_index, config)
            })
            .sum();
        self.cash + long_value + short_value
    }
}
