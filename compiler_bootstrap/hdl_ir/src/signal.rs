//! Signals and signal slices (spec component C).

use crate::arena::Id;
use hdl_expr::{Expr, VectorDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Combinational,
    Register,
    Constant,
    Variable,
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub kind: SignalKind,
    /// Optional for constants (a constant may be sized implicitly by its value).
    pub vector: Option<VectorDescriptor>,
    pub default: Option<Expr>,
}

impl Signal {
    pub fn new(name: impl Into<String>, kind: SignalKind, vector: Option<VectorDescriptor>) -> Self {
        Self { name: name.into(), kind, vector, default: None }
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }
}

/// A reference to a parent signal plus a vector sub-range.
#[derive(Debug, Clone)]
pub struct SignalSlice {
    pub signal: Id<Signal>,
    pub slice: VectorDescriptor,
}
