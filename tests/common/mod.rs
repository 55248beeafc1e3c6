#![allow(dead_code)]

use std::collections::HashMap;

use wftrader::domain::error::WftraderError;
use wftrader::domain::indicator::SignalSource;
pub use wftrader::domain::ohlcv::Bar;
use wftrader::domain::signal::SignalPair;
use wftrader::domain::strategy::StrategyParams;
use wftrader::ports::data_port::DataPort;

pub const START_MS: i64 = 1_704_067_200_000;
pub const HOUR_MS: i64 = 3_600_000;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, WftraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(WftraderError::DataParse {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(WftraderError::NoData {
                source_name: symbol.to_string(),
            }),
        }
    }
}

/// Hourly bar `hour` hours after 2024-01-01 with a flat range at `close`.
pub fn make_bar(hour: i64, close: f64) -> Bar {
    Bar::from_millis(START_MS + hour * HOUR_MS, close, close, close, close, 1000.0).unwrap()
}

/// Hourly bars with high/low one unit around each close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Bar::from_millis(START_MS + i as i64 * HOUR_MS, c, c + 1.0, c - 1.0, c, 1000.0)
                .unwrap()
        })
        .collect()
}

/// Deterministic zig-zag series long enough for the default warmups.
pub fn wavy_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            100.0 + 10.0 * (x / 7.0).sin() + 3.0 * (x / 3.0).cos()
        })
        .collect()
}

/// Closes compounding each per-bar `moves` fraction from `start`.
pub fn closes_from_moves(start: f64, moves: &[f64]) -> Vec<f64> {
    let mut closes = Vec::with_capacity(moves.len() + 1);
    let mut price = start;
    closes.push(price);
    for m in moves {
        price *= 1.0 + m;
        closes.push(price);
    }
    closes
}

pub fn csv_content(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.and_utc().timestamp_millis(),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

pub const BUY: SignalPair = SignalPair {
    buy: true,
    sell: false,
};
pub const SELL: SignalPair = SignalPair {
    buy: false,
    sell: true,
};
pub const BOTH: SignalPair = SignalPair {
    buy: true,
    sell: true,
};
pub const NONE: SignalPair = SignalPair {
    buy: false,
    sell: false,
};

/// Signal source replaying a precomputed column, trimmed or padded with
/// `None` to the requested length.
pub struct FixedSignals {
    pub name: String,
    pub column: Vec<Option<SignalPair>>,
}

impl FixedSignals {
    pub fn new(name: &str, column: Vec<Option<SignalPair>>) -> Self {
        Self {
            name: name.to_string(),
            column,
        }
    }

    /// Same pair on every bar.
    pub fn constant(name: &str, pair: SignalPair, len: usize) -> Self {
        Self::new(name, vec![Some(pair); len])
    }
}

impl SignalSource for FixedSignals {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self, _params: &StrategyParams) -> usize {
        self.column.iter().take_while(|s| s.is_none()).count()
    }

    fn signals(&self, bars: &[Bar], _params: &StrategyParams) -> Vec<Option<SignalPair>> {
        (0..bars.len())
            .map(|i| self.column.get(i).copied().flatten())
            .collect()
    }
}
