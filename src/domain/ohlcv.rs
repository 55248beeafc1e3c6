//! OHLCV bar representation.

use chrono::{DateTime, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Build a bar from an epoch-milliseconds timestamp.
    pub fn from_millis(
        millis: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Option<Self> {
        let timestamp = DateTime::from_timestamp_millis(millis)?.naive_utc();
        Some(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Close prices in bar order.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// True when timestamps strictly increase.
pub fn is_strictly_ordered(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
