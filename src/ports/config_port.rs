//! Configuration access port trait.

use crate::domain::error::WftraderError;

/// Section/key lookups over a configuration source.
///
/// Implementors only supply raw string lookup; the typed getters fall back
/// to `default` when the key is absent and report values that do not parse.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Non-negative integer such as a window length or fold count.
    fn get_count(&self, section: &str, key: &str, default: usize) -> Result<usize, WftraderError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                WftraderError::config_invalid(
                    section,
                    key,
                    format!("expected a non-negative integer, got {raw:?}"),
                )
            }),
        }
    }

    fn get_number(&self, section: &str, key: &str, default: f64) -> Result<f64, WftraderError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                WftraderError::config_invalid(section, key, format!("expected a number, got {raw:?}"))
            }),
        }
    }
}
