//! Error taxonomy for the trigger FSM family.

use hdl_common::HdlError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("trigger is armed: {message}")]
    Armed { message: String },

    #[error("trigger is not armed: {message}")]
    NotArmed { message: String },

    #[error("invalid trigger descriptor {descriptor:?}: {message}")]
    InvalidDescriptor { descriptor: String, message: String },

    #[error("trigger configuration error: {message}")]
    Config { message: String },
}

pub type TriggerResult<T> = Result<T, TriggerError>;

impl TriggerError {
    pub fn armed(message: impl Into<String>) -> Self {
        Self::Armed { message: message.into() }
    }

    pub fn not_armed(message: impl Into<String>) -> Self {
        Self::NotArmed { message: message.into() }
    }

    pub fn invalid_descriptor(descriptor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDescriptor { descriptor: descriptor.into(), message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

impl From<TriggerError> for HdlError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::Armed { message } | TriggerError::NotArmed { message } => HdlError::trigger_state_error(message),
            TriggerError::InvalidDescriptor { descriptor, message } => {
                HdlError::invalid_input(message, descriptor, "expected `scope::name[hi:lo] == value` or `!=`")
            }
            TriggerError::Config { message } => HdlError::semantic_error(message),
        }
    }
}

impl From<hdl_common::HdlError> for TriggerError {
    fn from(err: hdl_common::HdlError) -> Self {
        TriggerError::config(err.to_string())
    }
}
