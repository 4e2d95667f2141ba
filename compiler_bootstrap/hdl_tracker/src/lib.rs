//! Analyzer mixins over the VCD parser (spec component K): scope
//! hierarchy, time restriction, pre/post-condition gating, a value
//! tracker, and an event tracker — composed as plain structs a caller
//! drives from parser hooks, rather than as Python-style mixins.

pub mod conditions;
pub mod error;
pub mod event_tracker;
pub mod hierarchy;
pub mod time_window;
pub mod value_tracker;

pub use conditions::{ConditionEvent, ConditionGate};
pub use error::{TrackerError, TrackerResult};
pub use event_tracker::EventTracker;
pub use hierarchy::{ScopeHierarchy, TrackedVariable};
pub use time_window::TimeWindow;
pub use value_tracker::{HistoryEntry, HistoryLog, ValueTracker, ValueTrackerConfig};
