//! Event tracker: composes many events on a single trigger and re-arms
//! after every fire, grounded on `hdltools/vcd/event.py`'s
//! `VCDEventTracker`. Per-event counts, cycle totals, and the serialized
//! history are supplemental additions spec.md section 4.9 calls for that
//! the source's single-shot tracker doesn't keep.

use std::collections::HashMap;

use hdl_trigger::{SimpleTrigger, TriggerDescriptor, TriggerEvent, TriggerEventKind, TriggerResult};

use crate::conditions::{ConditionEvent, ConditionGate};
use crate::error::TrackerResult;
use crate::time_window::TimeWindow;

pub struct EventTracker {
    events: Vec<TriggerDescriptor>,
    trigger: SimpleTrigger,
    time_window: TimeWindow,
    conditions: Option<ConditionGate>,
    counts: HashMap<usize, u64>,
    cycle_total: u64,
    history: Vec<TriggerEvent>,
    aborted: bool,
}

impl EventTracker {
    pub fn new(
        events: Vec<TriggerDescriptor>,
        time_range: Option<(u64, u64)>,
        preconditions: Option<Vec<TriggerDescriptor>>,
        postconditions: Option<Vec<TriggerDescriptor>>,
    ) -> TrackerResult<Self> {
        let mut trigger = SimpleTrigger::new();
        trigger.add_trigger_level(events.clone())?;
        trigger.arm_trigger()?;
        let conditions = if preconditions.is_some() || postconditions.is_some() {
            Some(ConditionGate::new(preconditions, postconditions)?)
        } else {
            None
        };
        Ok(Self {
            events,
            trigger,
            time_window: TimeWindow::new(time_range)?,
            conditions,
            counts: HashMap::new(),
            cycle_total: 0,
            history: Vec::new(),
            aborted: false,
        })
    }

    pub fn on_value_change(&mut self, scope: &[String], name: &str, value: &str, vcd_var: Option<&str>, full_width: Option<u32>, time: u64) {
        let time_valid = self.time_window.is_valid(time);
        let waiting_precondition = self.conditions.as_ref().map(ConditionGate::waiting_precondition).unwrap_or(false);
        if let Some(gate) = self.conditions.as_mut() {
            if gate.on_value_change(scope, name, value, vcd_var, full_width, time) == ConditionEvent::PostconditionMet {
                self.aborted = true;
            }
        }
        if !time_valid || waiting_precondition {
            return;
        }

        let fired = self.trigger.match_and_advance(scope, name, value, vcd_var, full_width, time);
        if !fired {
            return;
        }

        self.cycle_total += 1;
        for evt in self.trigger.trigger_history() {
            if evt.kind == TriggerEventKind::Condition {
                if let Some(descriptor) = &evt.descriptor {
                    if let Some(idx) = self.events.iter().position(|e| e == descriptor) {
                        *self.counts.entry(idx).or_insert(0) += 1;
                    }
                }
            }
        }
        self.history.extend(self.trigger.trigger_history().iter().cloned());

        let _ = self.rearm();
    }

    fn rearm(&mut self) -> TriggerResult<()> {
        self.trigger.trigger_reset()?;
        self.trigger.add_trigger_level(self.events.clone())?;
        self.trigger.arm_trigger()
    }

    pub fn should_abort(&self) -> bool {
        self.aborted
    }

    pub fn counts(&self) -> &HashMap<usize, u64> {
        &self.counts
    }

    pub fn count_for(&self, event_index: usize) -> u64 {
        self.counts.get(&event_index).copied().unwrap_or(0)
    }

    pub fn cycle_total(&self) -> u64 {
        self.cycle_total
    }

    pub fn history(&self) -> &[TriggerEvent] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(expr: &str) -> TriggerDescriptor {
        TriggerDescriptor::parse(expr).unwrap()
    }

    #[test]
    fn rearms_and_accumulates_counts_across_cycles() {
        let mut t = EventTracker::new(vec![cond("top::a==1"), cond("top::b==1")], None, None, None).unwrap();

        t.on_value_change(&["top".into()], "a", "1", None, None, 10);
        assert_eq!(t.cycle_total(), 1);

        t.on_value_change(&["top".into()], "b", "1", None, None, 20);
        assert_eq!(t.cycle_total(), 2);

        assert_eq!(t.count_for(0), 1);
        assert_eq!(t.count_for(1), 1);
        assert_eq!(t.history().len(), 4);
    }
}
