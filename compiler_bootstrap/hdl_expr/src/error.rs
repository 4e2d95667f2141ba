//! Expression-algebra failure kinds (spec section 4.1/4.2): these are
//! finer-grained than the toolkit-wide [`hdl_common::HdlError`] taxonomy and
//! map onto it only at crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("name error: undefined identifier {name:?}")]
    NameError { name: String },

    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("value error: {message}")]
    ValueError { message: String },
}

pub type ExprResult<T> = Result<T, ExprError>;

impl From<ExprError> for hdl_common::HdlError {
    fn from(err: ExprError) -> Self {
        match err {
            ExprError::NameError { name } => {
                hdl_common::HdlError::lookup_failure(format!("undefined identifier {name:?}"))
            }
            ExprError::TypeError { message } => hdl_common::HdlError::semantic_error(message),
            ExprError::DivisionByZero => hdl_common::HdlError::semantic_error("division by zero"),
            ExprError::ValueError { message } => hdl_common::HdlError::invalid_input(
                message,
                String::new(),
                "expected a non-negative integer expression".to_string(),
            ),
        }
    }
}
