//! Per-bar signals and quorum aggregation.
//!
//! Every signal source yields one `Option<SignalPair>` per bar; `None` marks
//! a bar where the source is still warming up. The aggregate buy (sell) is
//! true when at least `quorum` sources vote buy (sell) on that bar. Bars on
//! which any source is undefined carry no aggregate signal.

use super::error::WftraderError;

/// Buy/sell votes for one bar. Both may be true at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalPair {
    pub buy: bool,
    pub sell: bool,
}

impl SignalPair {
    pub fn new(buy: bool, sell: bool) -> Self {
        SignalPair { buy, sell }
    }
}

/// Signals of several sources aligned to the same bar sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalTable {
    len: usize,
    /// One column of per-bar votes per source.
    columns: Vec<Vec<Option<SignalPair>>>,
}

impl SignalTable {
    /// Empty table for `len` bars.
    pub fn new(len: usize) -> Self {
        SignalTable {
            len,
            columns: Vec::new(),
        }
    }

    /// Append a source's column. Its length must equal the bar count.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<SignalPair>>,
    ) -> Result<(), WftraderError> {
        if values.len() != self.len {
            return Err(WftraderError::SignalMisaligned {
                source_name: name.into(),
                expected: self.len,
                actual: values.len(),
            });
        }
        self.columns.push(values);
        Ok(())
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn source_count(&self) -> usize {
        self.columns.len()
    }

    /// Combine the columns bar by bar under `quorum`.
    ///
    /// Fails when the quorum is zero or exceeds the number of sources.
    pub fn aggregate(&self, quorum: usize) -> Result<Vec<Option<SignalPair>>, WftraderError> {
        validate_quorum(quorum, self.columns.len())?;

        let aggregated = (0..self.len)
            .map(|bar| {
                let mut buys = 0;
                let mut sells = 0;
                for column in &self.columns {
                    let pair = column[bar]?;
                    buys += usize::from(pair.buy);
                    sells += usize::from(pair.sell);
                }
                Some(SignalPair {
                    buy: buys >= quorum,
                    sell: sells >= quorum,
                })
            })
            .collect();
        Ok(aggregated)
    }
}

/// A quorum must be in `1..=sources`.
pub fn validate_quorum(quorum: usize, sources: usize) -> Result<(), WftraderError> {
    if quorum == 0 {
        return Err(WftraderError::config_invalid(
            "backtest",
            "quorum",
            "must be at least 1",
        ));
    }
    if quorum > sources {
        return Err(WftraderError::config_invalid(
            "backtest",
            "quorum",
            format!("{quorum} exceeds the {sources} configured signal sources"),
        ));
    }
    Ok(())
}

/// Indices and signals of the bars that carry an aggregate signal.
pub fn defined_bars(aggregated: &[Option<SignalPair>]) -> Vec<(usize, SignalPair)> {
    aggregated
        .iter()
        .enumerate()
        .filter_map(|(i, pair)| pair.map(|p| (i, p)))
        .collect()
}
