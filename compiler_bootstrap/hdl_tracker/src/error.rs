//! Error taxonomy for the analyzer mixins.

use hdl_common::HdlError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("invalid time range: {message}")]
    InvalidTimeRange { message: String },

    #[error("invalid ignore/anchor pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Trigger(#[from] hdl_trigger::TriggerError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn invalid_time_range(message: impl Into<String>) -> Self {
        Self::InvalidTimeRange { message: message.into() }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern { pattern: pattern.into(), message: message.into() }
    }
}

impl From<TrackerError> for HdlError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::InvalidTimeRange { message } => HdlError::semantic_error(message),
            TrackerError::InvalidPattern { pattern, message } => {
                HdlError::invalid_input(message, pattern, "expected a valid regular expression")
            }
            TrackerError::Trigger(e) => e.into(),
        }
    }
}
