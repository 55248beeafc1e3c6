//! INI file configuration adapter.

use crate::domain::error::WftraderError;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WftraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| WftraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, WftraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| WftraderError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

/// Render `params` as a `[strategy]` section loadable by
/// `load_strategy_params`.
pub fn strategy_params_to_ini(params: &StrategyParams) -> String {
    let mut ini = Ini::new();
    let fields: [(&str, String); 16] = [
        ("rsi_window", params.rsi_window.to_string()),
        ("rsi_lower", params.rsi_lower.to_string()),
        ("rsi_upper", params.rsi_upper.to_string()),
        ("macd_fast", params.macd_fast.to_string()),
        ("macd_slow", params.macd_slow.to_string()),
        ("macd_signal", params.macd_signal.to_string()),
        ("bb_window", params.bb_window.to_string()),
        ("bb_std", params.bb_std.to_string()),
        ("obv_window", params.obv_window.to_string()),
        ("atr_window", params.atr_window.to_string()),
        ("atr_mult", params.atr_mult.to_string()),
        ("adx_window", params.adx_window.to_string()),
        ("adx_threshold", params.adx_threshold.to_string()),
        ("stop_loss", params.stop_loss.to_string()),
        ("take_profit", params.take_profit.to_string()),
        ("n_shares", params.n_shares.to_string()),
    ];
    for (key, value) in fields {
        ini.set("strategy", key, Some(value));
    }
    ini.writes()
}
