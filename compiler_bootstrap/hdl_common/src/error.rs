//! Error taxonomy for the HDL toolkit.

use thiserror::Error;

/// The error kinds shared across every crate in the toolkit.
///
/// Propagation differs by kind per the error handling design: parse and
/// semantic errors abort the in-flight operation, invalid-input errors
/// carry enough context to render a complete help message, lookup
/// failures are raised only by explicit `get_*`-style accessors (search
/// methods return `Option`/`None` instead), and timeouts are handled
/// locally by trigger callbacks and never surfaced through this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HdlError {
    #[error("parse error: {message}")]
    ParseError {
        message: String,
        line: Option<u32>,
        excerpt: Option<String>,
    },

    #[error("semantic error: {message}")]
    SemanticError {
        message: String,
        node: Option<String>,
        parameter: Option<String>,
    },

    #[error("invalid input {input:?}: {message}\n{help}")]
    InvalidInput {
        message: String,
        input: String,
        help: String,
    },

    #[error("lookup failed: {message}")]
    LookupFailure { message: String },

    #[error("trigger state error: {message}")]
    TriggerStateError { message: String },

    #[error("timeout: {message}")]
    Timeout { message: String },
}

pub type HdlResult<T> = Result<T, HdlError>;

impl HdlError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            line: None,
            excerpt: None,
        }
    }

    pub fn parse_error_at(message: impl Into<String>, line: u32, excerpt: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            line: Some(line),
            excerpt: Some(excerpt.into()),
        }
    }

    pub fn semantic_error(message: impl Into<String>) -> Self {
        Self::SemanticError {
            message: message.into(),
            node: None,
            parameter: None,
        }
    }

    pub fn semantic_error_for(
        message: impl Into<String>,
        node: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self::SemanticError {
            message: message.into(),
            node: Some(node.into()),
            parameter: Some(parameter.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>, input: impl Into<String>, help: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            input: input.into(),
            help: help.into(),
        }
    }

    pub fn lookup_failure(message: impl Into<String>) -> Self {
        Self::LookupFailure { message: message.into() }
    }

    pub fn trigger_state_error(message: impl Into<String>) -> Self {
        Self::TriggerStateError { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }
}
