//! Failure kinds for the register-description grammar and builder, per
//! spec section 4.10.

use hdl_common::HdlError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MmapError {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("semantic error: {message}")]
    Semantic { message: String },

    #[error("unknown name '{name}'")]
    Name { name: String },

    #[error("runtime error: {message}")]
    Runtime { message: String },
}

impl MmapError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic { message: message.into() }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name { name: name.into() }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }
}

pub type MmapResult<T> = Result<T, MmapError>;

impl From<MmapError> for HdlError {
    fn from(err: MmapError) -> Self {
        match err {
            MmapError::Parse { message } => HdlError::parse_error(message),
            MmapError::Semantic { message } => HdlError::semantic_error(message),
            MmapError::Name { name } => HdlError::semantic_error(format!("unknown name '{name}'")),
            MmapError::Runtime { message } => HdlError::semantic_error(message),
        }
    }
}

impl From<hdl_common::HdlError> for MmapError {
    fn from(err: HdlError) -> Self {
        MmapError::semantic(err.to_string())
    }
}

impl From<hdl_expr::ExprError> for MmapError {
    fn from(err: hdl_expr::ExprError) -> Self {
        MmapError::semantic(err.to_string())
    }
}
