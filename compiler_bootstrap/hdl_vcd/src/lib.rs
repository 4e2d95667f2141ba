//! Streaming VCD parser, binary signal store, and compact VCD persistence
//! (spec components H and I).

pub mod compact;
pub mod error;
pub mod parser;
pub mod storage;
pub mod timescale;

pub use compact::{read_compact, write_compact, CompactMode, CompactRecord, TimeSliceRecord, VariableRecord};
pub use error::{VcdError, VcdResult};
pub use parser::{AbortHandle, NoopHandlers, ParserState, StreamingVcdParser, VcdHandlers};
pub use storage::{BinarySignalValue, SignalState, TimeIndexedHistory, VariableIndex, VcdStorage, VcdVariable};
pub use timescale::{Timescale, TimescaleUnit};
