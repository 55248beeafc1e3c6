//! Domain error types.
//!
//! Configuration errors are raised before a run starts; data errors mean
//! the requested bars cannot produce a defined signal. Neither is raised
//! from inside the per-bar loop.

/// Top-level error type for wftrader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WftraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy parameter {field}: {reason}")]
    InvalidParams { field: String, reason: String },

    #[error("no data for {source_name}")]
    NoData { source_name: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("data parse error: {reason}")]
    DataParse { reason: String },

    #[error("signal source {source_name} produced {actual} values for {expected} bars")]
    SignalMisaligned {
        source_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("run cancelled before bar {bar}")]
    Cancelled { bar: usize },

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WftraderError {
    fn from(err: std::io::Error) -> Self {
        WftraderError::Io(err.to_string())
    }
}

impl WftraderError {
    pub fn invalid_params(field: &str, reason: impl Into<String>) -> Self {
        WftraderError::InvalidParams {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        WftraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Invalid parameter combinations and malformed configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            WftraderError::ConfigParse { .. }
                | WftraderError::ConfigMissing { .. }
                | WftraderError::ConfigInvalid { .. }
                | WftraderError::InvalidParams { .. }
        )
    }

    /// Missing, malformed or too-short price data.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            WftraderError::NoData { .. }
                | WftraderError::InsufficientData { .. }
                | WftraderError::DataParse { .. }
                | WftraderError::SignalMisaligned { .. }
        )
    }
}

impl From<&WftraderError> for std::process::ExitCode {
    fn from(err: &WftraderError) -> Self {
        let code: u8 = match err {
            WftraderError::Io(_) => 1,
            WftraderError::ConfigParse { .. }
            | WftraderError::ConfigMissing { .. }
            | WftraderError::ConfigInvalid { .. }
            | WftraderError::InvalidParams { .. } => 2,
            WftraderError::NoData { .. }
            | WftraderError::InsufficientData { .. }
            | WftraderError::DataParse { .. }
            | WftraderError::SignalMisaligned { .. } => 5,
            WftraderError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
