//! Price data access port trait.

use crate::domain::error::WftraderError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// All bars for `symbol`, ordered by strictly increasing timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, WftraderError>;
}
