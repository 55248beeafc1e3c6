//! Position lifecycle: bracket exits, cash-checked entries and final
//! liquidation.
//!
//! Each bar runs [`close_due`] before [`open_on_signal`], so exits are
//! judged on the bar's close before any new entry is taken at that close.

use tracing::trace;

use super::error::WftraderError;
use super::ohlcv::Bar;
use super::portfolio::SimulationState;
use super::position::{Bracket, ClosedTrade, ExitBoundary, ExitReason, Position, Side};
use super::signal::SignalPair;

/// Commission 0.125% per side.
pub const DEFAULT_COMMISSION: f64 = 0.00125;
/// Hourly bars.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 8760.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    /// Fraction of notional charged on entry and on exit.
    pub commission: f64,
    /// Annual borrow rate charged on short notional.
    pub borrow_rate: f64,
    pub periods_per_year: f64,
    pub exit_boundary: ExitBoundary,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission: DEFAULT_COMMISSION,
            borrow_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            exit_boundary: ExitBoundary::Inclusive,
        }
    }
}

/// Cash required to open `size` shares at `price`.
pub fn entry_cost(price: f64, size: f64, commission: f64) -> f64 {
    price * size * (1.0 + commission)
}

/// Borrow charge accrued by a short from its entry bar to `bar_index`.
/// Always zero for longs.
pub fn accrued_borrow(position: &Position, bar_index: usize, config: &ExecutionConfig) -> f64 {
    if position.is_long() || config.borrow_rate == 0.0 {
        return 0.0;
    }
    let bars_held = bar_index.saturating_sub(position.open_bar) as f64;
    position.notional() * config.borrow_rate * bars_held / config.periods_per_year
}

/// Settle `position` at `bar`'s close and record the trade.
fn settle(
    state: &mut SimulationState,
    position: Position,
    bar_index: usize,
    bar: &Bar,
    reason: ExitReason,
    config: &ExecutionConfig,
) {
    let proceeds = position.settlement(bar.close, config.commission)
        - accrued_borrow(&position, bar_index, config);
    state.cash += proceeds;

    trace!(
        bar = bar_index,
        side = ?position.side,
        ?reason,
        price = bar.close,
        proceeds,
        "position closed"
    );

    state.record_trade(ClosedTrade {
        side: position.side,
        open_time: position.open_time,
        close_time: bar.timestamp,
        open_price: position.open_price,
        close_price: bar.close,
        size: position.size,
        pnl: proceeds - position.entry_cost,
        reason,
    });
}

/// Close every open position whose stop or target is breached by the bar's
/// close.
///
/// Two passes: the open sets are first split into due and remaining
/// positions, then each due position is settled. Returns the number closed.
pub fn close_due(
    state: &mut SimulationState,
    bar_index: usize,
    bar: &Bar,
    config: &ExecutionConfig,
) -> usize {
    let price = bar.close;
    let boundary = config.exit_boundary;

    let mut due: Vec<(Position, ExitReason)> = Vec::new();
    for book in [&mut state.open_longs, &mut state.open_shorts] {
        let (closing, remaining): (Vec<Position>, Vec<Position>) = std::mem::take(book)
            .into_iter()
            .partition(|pos| pos.exit_reason(price, boundary).is_some());
        *book = remaining;
        due.extend(closing.into_iter().filter_map(|pos| {
            let reason = pos.exit_reason(price, boundary)?;
            Some((pos, reason))
        }));
    }

    let count = due.len();
    for (position, reason) in due {
        settle(state, position, bar_index, bar, reason, config);
    }
    count
}

/// Force-close every open position at `bar`'s close.
pub fn liquidate(
    state: &mut SimulationState,
    bar_index: usize,
    bar: &Bar,
    config: &ExecutionConfig,
) -> usize {
    let mut open = std::mem::take(&mut state.open_longs);
    open.append(&mut state.open_shorts);
    let count = open.len();
    for position in open {
        settle(state, position, bar_index, bar, ExitReason::Liquidation, config);
    }
    count
}

/// Outcome of one entry attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryResult {
    NoSignal,
    Entered { cost: f64 },
    /// Cash did not strictly exceed the entry cost; the entry is skipped.
    InsufficientCash { required: f64, available: f64 },
}

impl EntryResult {
    pub fn entered(&self) -> bool {
        matches!(self, EntryResult::Entered { .. })
    }
}

/// Entry attempts for both sides of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOutcome {
    pub long: EntryResult,
    pub short: EntryResult,
}

fn try_enter(
    state: &mut SimulationState,
    side: Side,
    bar_index: usize,
    bar: &Bar,
    bracket: Bracket,
    config: &ExecutionConfig,
) -> Result<EntryResult, WftraderError> {
    let required = entry_cost(bar.close, bracket.size, config.commission);
    if !(state.cash > required) {
        return Ok(EntryResult::InsufficientCash {
            required,
            available: state.cash,
        });
    }

    let position = Position::open(
        side,
        bar_index,
        bar.timestamp,
        bar.close,
        bracket,
        config.commission,
    )?;
    state.cash -= position.entry_cost;

    trace!(
        bar = bar_index,
        ?side,
        price = bar.close,
        stop = position.stop_loss,
        target = position.take_profit,
        "position opened"
    );

    let cost = position.entry_cost;
    state.add_position(position);
    Ok(EntryResult::Entered { cost })
}

/// Open a long on a buy signal and a short on a sell signal.
///
/// The sides are independent: both may open on the same bar when both
/// signals fire and cash covers both, the long being attempted first.
pub fn open_on_signal(
    state: &mut SimulationState,
    bar_index: usize,
    bar: &Bar,
    signal: SignalPair,
    bracket: Bracket,
    config: &ExecutionConfig,
) -> Result<OpenOutcome, WftraderError> {
    let long = if signal.buy {
        try_enter(state, Side::Long, bar_index, bar, bracket, config)?
    } else {
        EntryResult::NoSignal
    };
    let short = if signal.sell {
        try_enter(state, Side::Short, bar_index, bar, bracket, config)?
    } else {
        EntryResult::NoSignal
    };
    Ok(OpenOutcome { long, short })
}
