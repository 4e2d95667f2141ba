//! Integer constants, vector descriptors, and the expression algebra
//! (spec components A and B).

pub mod builtin;
pub mod constant;
pub mod error;
pub mod expr;
pub mod vector;

pub use constant::IntegerConstant;
pub use error::{ExprError, ExprResult};
pub use expr::{BinaryOp, Expr, Scope, ScopeValue, UnaryOp};
pub use vector::VectorDescriptor;
