//! Error taxonomy for the VCD parser and binary signal store.

use hdl_common::HdlError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VcdError {
    #[error("VCD parse error at line {line}: {message}")]
    Parse { message: String, line: u32 },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("unknown variable id {id:?}")]
    UnknownVariable { id: String },

    #[error("bit index {index} out of range for width {width}")]
    BitOutOfRange { index: u32, width: u32 },

    #[error("compact VCD format error: {message}")]
    CompactFormat { message: String },
}

pub type VcdResult<T> = Result<T, VcdError>;

impl VcdError {
    pub fn parse(message: impl Into<String>, line: u32) -> Self {
        Self::Parse { message: message.into(), line }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn unknown_variable(id: impl Into<String>) -> Self {
        Self::UnknownVariable { id: id.into() }
    }

    pub fn compact_format(message: impl Into<String>) -> Self {
        Self::CompactFormat { message: message.into() }
    }
}

impl From<VcdError> for HdlError {
    fn from(err: VcdError) -> Self {
        match err {
            VcdError::Parse { message, line } => HdlError::parse_error_at(message, line, ""),
            VcdError::Io { message } => HdlError::parse_error(message),
            VcdError::UnknownVariable { id } => HdlError::lookup_failure(format!("unknown variable id {id:?}")),
            VcdError::BitOutOfRange { index, width } => {
                HdlError::semantic_error(format!("bit index {index} out of range for width {width}"))
            }
            VcdError::CompactFormat { message } => HdlError::semantic_error(message),
        }
    }
}

impl From<std::io::Error> for VcdError {
    fn from(err: std::io::Error) -> Self {
        VcdError::io(err.to_string())
    }
}
