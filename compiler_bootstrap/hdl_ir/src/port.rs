//! Module ports (spec component C/D).

use crate::arena::Id;
use crate::signal::Signal;
use hdl_expr::VectorDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Inout,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub direction: Direction,
    pub name: String,
    pub vector: VectorDescriptor,
    pub signal: Id<Signal>,
}

/// A typed port used for behavioral output; it carries a free-form type
/// name rather than a sized vector.
#[derive(Debug, Clone)]
pub struct TypedPort {
    pub direction: Direction,
    pub name: String,
    pub ptype: String,
    pub signal: Id<Signal>,
}

impl Port {
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }
}
