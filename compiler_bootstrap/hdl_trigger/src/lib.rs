//! Trigger FSM family (spec component J): ordered (`SimpleTrigger`) and
//! unordered (`ConditionTableTrigger`) variable-change triggers, plus the
//! `scope::name[hi:lo] (==|!=) value` descriptor mini-language.

pub mod condtable;
pub mod descriptor;
pub mod error;
pub mod fsm;
pub mod simple;

pub use condtable::ConditionTableTrigger;
pub use descriptor::{ChainMode, TriggerDescriptor, parse_descriptor_chain};
pub use error::{TriggerError, TriggerResult};
pub use fsm::{EventId, FsmCore, FsmSnapshot, TriggerEvent, TriggerEventKind};
pub use simple::SimpleTrigger;
