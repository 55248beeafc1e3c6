//! Bracket positions and closed-trade records.

use chrono::NaiveDateTime;

use super::error::WftraderError;
use super::strategy::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

/// Whether a close exactly on the stop or target triggers the exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitBoundary {
    /// `close >= target` / `close <= stop` (mirrored for shorts).
    #[default]
    Inclusive,
    /// `close > target` / `close < stop` (mirrored for shorts).
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Liquidation,
}

/// Stop/target distances (fractions of the entry price) and size of a new
/// position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub stop_frac: f64,
    pub target_frac: f64,
    pub size: f64,
}

impl From<&StrategyParams> for Bracket {
    fn from(params: &StrategyParams) -> Self {
        Bracket {
            stop_frac: params.stop_loss,
            target_frac: params.take_profit,
            size: params.n_shares,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub open_bar: usize,
    pub open_time: NaiveDateTime,
    pub open_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub size: f64,
    /// Cash debited at entry, commission included.
    pub entry_cost: f64,
}

impl Position {
    /// Open a bracket at `price` with stop/target set as fractions of it.
    pub fn open(
        side: Side,
        open_bar: usize,
        open_time: NaiveDateTime,
        price: f64,
        bracket: Bracket,
        commission: f64,
    ) -> Result<Self, WftraderError> {
        let Bracket {
            stop_frac,
            target_frac,
            size,
        } = bracket;
        if !(size.is_finite() && size > 0.0) {
            return Err(WftraderError::invalid_params("n_shares", "must be positive"));
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(WftraderError::DataParse {
                reason: format!("non-positive close price {price}"),
            });
        }

        // price ± price * frac: 100 + 100 * 0.1 == 110 exactly
        let stop_offset = price * stop_frac;
        let target_offset = price * target_frac;
        let (stop_loss, take_profit) = match side {
            Side::Long => (price - stop_offset, price + target_offset),
            Side::Short => (price + stop_offset, price - target_offset),
        };

        let ordered = match side {
            Side::Long => stop_loss < price && price < take_profit,
            Side::Short => take_profit < price && price < stop_loss,
        };
        if !ordered {
            return Err(WftraderError::invalid_params(
                "stop_loss",
                format!("bracket {stop_loss}/{take_profit} does not straddle entry {price}"),
            ));
        }

        Ok(Position {
            side,
            open_bar,
            open_time,
            open_price: price,
            stop_loss,
            take_profit,
            size,
            entry_cost: price * size * (1.0 + commission),
        })
    }

    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn notional(&self) -> f64 {
        self.open_price * self.size
    }

    pub fn should_stop_loss(&self, price: f64, boundary: ExitBoundary) -> bool {
        match (self.side, boundary) {
            (Side::Long, ExitBoundary::Inclusive) => price <= self.stop_loss,
            (Side::Long, ExitBoundary::Strict) => price < self.stop_loss,
            (Side::Short, ExitBoundary::Inclusive) => price >= self.stop_loss,
            (Side::Short, ExitBoundary::Strict) => price > self.stop_loss,
        }
    }

    pub fn should_take_profit(&self, price: f64, boundary: ExitBoundary) -> bool {
        match (self.side, boundary) {
            (Side::Long, ExitBoundary::Inclusive) => price >= self.take_profit,
            (Side::Long, ExitBoundary::Strict) => price > self.take_profit,
            (Side::Short, ExitBoundary::Inclusive) => price <= self.take_profit,
            (Side::Short, ExitBoundary::Strict) => price < self.take_profit,
        }
    }

    /// Stop and target sit on opposite sides of the entry, so at most one
    /// of them can be breached by a single close.
    pub fn exit_reason(&self, price: f64, boundary: ExitBoundary) -> Option<ExitReason> {
        if self.should_take_profit(price, boundary) {
            Some(ExitReason::TakeProfit)
        } else if self.should_stop_loss(price, boundary) {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }

    /// Cash returned by closing at `price`.
    ///
    /// Long: `price * size * (1 - commission)`.
    /// Short: escrowed notional plus the price difference net of commission.
    pub fn settlement(&self, price: f64, commission: f64) -> f64 {
        match self.side {
            Side::Long => price * self.size * (1.0 - commission),
            Side::Short => {
                let notional = self.notional();
                notional + (notional - price * self.size) * (1.0 - commission)
            }
        }
    }

    /// Mark-to-market contribution at `price`. Longs are marked gross;
    /// shorts are marked at their settlement value.
    pub fn market_value(&self, price: f64, commission: f64) -> f64 {
        match self.side {
            Side::Long => price * self.size,
            Side::Short => self.settlement(price, commission),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub side: Side,
    pub open_time: NaiveDateTime,
    pub close_time: NaiveDateTime,
    pub open_price: f64,
    pub close_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}
