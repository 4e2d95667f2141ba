//! Shared error types, source positions, and diagnostics used across the
//! HDL toolkit crates.
//!
//! - Error types and the shared error-kind taxonomy
//! - Line/column source location tracking for the VCD and expression
//!   parsers
//! - A diagnostics collection for passes that want to keep going after
//!   the first failure (the MMAP builder)

pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::*;
pub use error::*;
pub use span::*;
