//! The intermediate representation (spec components C, D, E): signals,
//! ports, scopes and statements, modules and instances, and registers /
//! the memory-mapped interface. All cross-references are arena [`Id`]s,
//! never raw borrows.

pub mod arena;
pub mod instance;
pub mod module;
pub mod port;
pub mod register;
pub mod scope;
pub mod signal;

pub use arena::{Arena, Id};
pub use instance::Instance;
pub use module::{IrGraph, Module, Parameter};
pub use port::{Direction, Port, TypedPort};
pub use register::{
    Access, AddrMode, FieldDefault, FlagPort, MemoryMappedInterface, Register, RegisterDefault, RegisterField,
};
pub use scope::{Scope, ScopeCategory, Statement, StatementKind, StmtCategory};
pub use signal::{Signal, SignalKind, SignalSlice};
