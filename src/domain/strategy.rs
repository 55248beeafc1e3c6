//! Strategy parameters: the contract between a parameter source and the
//! simulation core.
//!
//! A search trial and a replay of stored parameters both produce the same
//! `StrategyParams` value. Invalid combinations are rejected by
//! [`StrategyParams::validate`] before any bar is simulated; nothing is
//! silently corrected.

use super::error::WftraderError;

/// Smallest stop or target fraction that still moves the bracket off the
/// entry price in `f64`.
pub const MIN_BRACKET_FRACTION: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub rsi_window: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_window: usize,
    pub bb_std: f64,
    pub obv_window: usize,
    pub atr_window: usize,
    pub atr_mult: f64,
    pub adx_window: usize,
    pub adx_threshold: f64,
    /// Stop distance as a fraction of the entry price.
    pub stop_loss: f64,
    /// Target distance as a fraction of the entry price.
    pub take_profit: f64,
    /// Shares per entry, may be fractional.
    pub n_shares: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            rsi_window: 14,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_window: 20,
            bb_std: 2.0,
            obv_window: 20,
            atr_window: 14,
            atr_mult: 1.5,
            adx_window: 14,
            adx_threshold: 25.0,
            stop_loss: 0.03,
            take_profit: 0.08,
            n_shares: 1.0,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), WftraderError> {
        let windows = [
            ("rsi_window", self.rsi_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_window", self.bb_window),
            ("obv_window", self.obv_window),
            ("atr_window", self.atr_window),
            ("adx_window", self.adx_window),
        ];
        for (field, window) in windows {
            if window == 0 {
                return Err(WftraderError::invalid_params(field, "window must be at least 1"));
            }
        }

        if self.macd_slow <= self.macd_fast {
            return Err(WftraderError::invalid_params(
                "macd_slow",
                format!(
                    "slow window {} must exceed fast window {}",
                    self.macd_slow, self.macd_fast
                ),
            ));
        }

        for (field, value) in [("rsi_lower", self.rsi_lower), ("rsi_upper", self.rsi_upper)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(WftraderError::invalid_params(field, "must be within [0, 100]"));
            }
        }
        if self.rsi_lower >= self.rsi_upper {
            return Err(WftraderError::invalid_params(
                "rsi_lower",
                "must be below rsi_upper",
            ));
        }

        for (field, value) in [
            ("bb_std", self.bb_std),
            ("atr_mult", self.atr_mult),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(WftraderError::invalid_params(field, "must be positive"));
            }
        }
        if !(0.0..=100.0).contains(&self.adx_threshold) {
            return Err(WftraderError::invalid_params(
                "adx_threshold",
                "must be within [0, 100]",
            ));
        }

        // bracket prices must stay positive and strictly straddle the entry
        for (field, value) in [("stop_loss", self.stop_loss), ("take_profit", self.take_profit)] {
            if !(MIN_BRACKET_FRACTION..1.0).contains(&value) {
                return Err(WftraderError::invalid_params(
                    field,
                    format!("must be within [{MIN_BRACKET_FRACTION:e}, 1)"),
                ));
            }
        }

        if !(self.n_shares.is_finite() && self.n_shares > 0.0) {
            return Err(WftraderError::invalid_params("n_shares", "must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(StrategyParams::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let params = StrategyParams {
            bb_window: 0,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, WftraderError::InvalidParams { field, .. } if field == "bb_window"));
    }

    #[test]
    fn slow_not_above_fast_rejected() {
        let params = StrategyParams {
            macd_fast: 20,
            macd_slow: 20,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, WftraderError::InvalidParams { field, .. } if field == "macd_slow"));
    }

    #[test]
    fn rsi_thresholds_must_be_ordered() {
        let params = StrategyParams {
            rsi_lower: 70.0,
            rsi_upper: 30.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn non_positive_size_rejected() {
        for n_shares in [0.0, -1.0, f64::NAN] {
            let params = StrategyParams {
                n_shares,
                ..Default::default()
            };
            let err = params.validate().unwrap_err();
            assert!(err.is_configuration_error());
        }
    }

    #[test]
    fn fractional_size_accepted() {
        let params = StrategyParams {
            n_shares: 0.5,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn bracket_fractions_bounded() {
        for (stop_loss, take_profit) in [(0.0, 0.1), (0.05, 1.0), (1.2, 0.1)] {
            let params = StrategyParams {
                stop_loss,
                take_profit,
                ..Default::default()
            };
            assert!(params.validate().is_err());
        }
    }

    #[test]
    fn vanishing_bracket_fractions_rejected() {
        for field in ["stop_loss", "take_profit"] {
            let mut params = StrategyParams::default();
            match field {
                "stop_loss" => params.stop_loss = 1e-17,
                _ => params.take_profit = 1e-17,
            }
            let err = params.validate().unwrap_err();
            assert!(err.is_configuration_error());
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn smallest_bracket_fraction_accepted() {
        let params = StrategyParams {
            stop_loss: MIN_BRACKET_FRACTION,
            take_profit: MIN_BRACKET_FRACTION,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
