//! CSV file data adapter.
//!
//! Reads `<base>/<SYMBOL>.csv` exports with a header row naming at least
//! `timestamp,open,high,low,close,volume` (timestamp in epoch
//! milliseconds). Extra columns are ignored.

use crate::domain::error::WftraderError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_error(reason: String) -> WftraderError {
    WftraderError::DataParse { reason }
}

fn column<'r>(
    record: &'r csv::StringRecord,
    index: &[usize; 6],
    col: usize,
    row: usize,
) -> Result<&'r str, WftraderError> {
    record
        .get(index[col])
        .ok_or_else(|| parse_error(format!("row {row}: missing {}", COLUMNS[col])))
}

fn number(
    record: &csv::StringRecord,
    index: &[usize; 6],
    col: usize,
    row: usize,
) -> Result<f64, WftraderError> {
    let raw = column(record, index, col, row)?;
    raw.parse::<f64>()
        .map_err(|e| parse_error(format!("row {row}: invalid {} {raw:?}: {e}", COLUMNS[col])))
}

/// Parse CSV content into bars sorted by timestamp.
pub fn parse_bars(content: &str) -> Result<Vec<Bar>, WftraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| parse_error(format!("CSV header error: {e}")))?
        .clone();
    let mut index = [0usize; 6];
    for (slot, name) in index.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| parse_error(format!("missing {name} column")))?;
    }

    let mut bars = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| parse_error(format!("CSV parse error: {e}")))?;
        let raw_ts = column(&record, &index, 0, row)?;
        let millis: i64 = raw_ts
            .parse()
            .map_err(|e| parse_error(format!("row {row}: invalid timestamp {raw_ts:?}: {e}")))?;
        let bar = Bar::from_millis(
            millis,
            number(&record, &index, 1, row)?,
            number(&record, &index, 2, row)?,
            number(&record, &index, 3, row)?,
            number(&record, &index, 4, row)?,
            number(&record, &index, 5, row)?,
        )
        .ok_or_else(|| parse_error(format!("row {row}: timestamp {millis} out of range")))?;
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(parse_error(format!(
            "duplicate timestamp {}",
            pair[0].timestamp
        )));
    }
    Ok(bars)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, WftraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => WftraderError::NoData {
                source_name: path.display().to_string(),
            },
            _ => WftraderError::Io(format!("failed to read {}: {e}", path.display())),
        })?;

        let bars = parse_bars(&content)?;
        if bars.is_empty() {
            return Err(WftraderError::NoData {
                source_name: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}
