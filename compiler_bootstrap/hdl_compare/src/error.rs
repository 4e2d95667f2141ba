//! Error taxonomy for the VCD comparator.

use hdl_common::HdlError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error(transparent)]
    Vcd(#[from] hdl_vcd::VcdError),
}

pub type CompareResult<T> = Result<T, CompareError>;

impl CompareError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io { message: message.into() }
    }
}

impl From<std::io::Error> for CompareError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<CompareError> for HdlError {
    fn from(err: CompareError) -> Self {
        match err {
            CompareError::Io { message } => HdlError::parse_error(message),
            CompareError::Vcd(err) => err.into(),
        }
    }
}
