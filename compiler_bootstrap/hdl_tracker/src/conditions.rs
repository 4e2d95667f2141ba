//! Pre/post-condition gating, grounded on
//! `hdltools/vcd/mixins/conditions.py`'s `VCDConditionMixin`.
//!
//! The source arms a `SimpleTrigger` against the preconditions and swaps
//! in a new callback that reconfigures the trigger for the postconditions
//! once preconditions are met, relying on Python closures holding a
//! reference to `self`. Here the gate drives its own internal
//! `SimpleTrigger` directly and reports transitions back to the caller
//! as a [`ConditionEvent`] rather than firing a callback into itself.

use hdl_trigger::{SimpleTrigger, TriggerDescriptor, TriggerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NoConditions,
    WaitingPrecondition,
    WaitingPostcondition,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionEvent {
    None,
    PreconditionMet,
    PostconditionMet,
}

pub struct ConditionGate {
    postconditions: Vec<TriggerDescriptor>,
    trigger: SimpleTrigger,
    phase: Phase,
}

impl ConditionGate {
    /// `None` for either side means tracking starts immediately and never
    /// ends early on a postcondition.
    pub fn new(preconditions: Option<Vec<TriggerDescriptor>>, postconditions: Option<Vec<TriggerDescriptor>>) -> TriggerResult<Self> {
        let postconditions = postconditions.unwrap_or_default();
        let mut trigger = SimpleTrigger::new();
        let phase = match preconditions {
            Some(preconds) if !preconds.is_empty() => {
                for cond in preconds {
                    trigger.add_trigger_level(vec![cond])?;
                }
                trigger.arm_trigger()?;
                Phase::WaitingPrecondition
            }
            _ => Phase::NoConditions,
        };
        Ok(Self { postconditions, trigger, phase })
    }

    pub fn waiting_precondition(&self) -> bool {
        self.phase == Phase::WaitingPrecondition
    }

    pub fn waiting_postcondition(&self) -> bool {
        self.phase == Phase::WaitingPostcondition
    }

    /// Feed a variable change to whichever trigger is currently armed and
    /// report the phase transition, if any.
    pub fn on_value_change(
        &mut self,
        scope: &[String],
        name: &str,
        value: &str,
        vcd_var: Option<&str>,
        full_width: Option<u32>,
        time: u64,
    ) -> ConditionEvent {
        match self.phase {
            Phase::WaitingPrecondition => {
                let fired = self.trigger.match_and_advance(scope, name, value, vcd_var, full_width, time);
                if !fired {
                    return ConditionEvent::None;
                }
                if self.postconditions.is_empty() {
                    self.phase = Phase::Done;
                } else {
                    let _ = self.trigger.trigger_reset();
                    for cond in self.postconditions.clone() {
                        let _ = self.trigger.add_trigger_level(vec![cond]);
                    }
                    let _ = self.trigger.arm_trigger();
                    self.phase = Phase::WaitingPostcondition;
                }
                ConditionEvent::PreconditionMet
            }
            Phase::WaitingPostcondition => {
                let fired = self.trigger.match_and_advance(scope, name, value, vcd_var, full_width, time);
                if !fired {
                    return ConditionEvent::None;
                }
                self.phase = Phase::Done;
                ConditionEvent::PostconditionMet
            }
            Phase::NoConditions | Phase::Done => ConditionEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(expr: &str) -> TriggerDescriptor {
        TriggerDescriptor::parse(expr).unwrap()
    }

    #[test]
    fn no_conditions_never_gates() {
        let mut gate = ConditionGate::new(None, None).unwrap();
        assert!(!gate.waiting_precondition());
        assert_eq!(gate.on_value_change(&["top".into()], "a", "1", None, None, 0), ConditionEvent::None);
    }

    #[test]
    fn precondition_then_postcondition_transitions() {
        let mut gate = ConditionGate::new(Some(vec![cond("top::a==1")]), Some(vec![cond("top::b==1")])).unwrap();
        assert!(gate.waiting_precondition());

        let evt = gate.on_value_change(&["top".into()], "a", "1", None, None, 0);
        assert_eq!(evt, ConditionEvent::PreconditionMet);
        assert!(!gate.waiting_precondition());
        assert!(gate.waiting_postcondition());

        let evt = gate.on_value_change(&["top".into()], "b", "1", None, None, 10);
        assert_eq!(evt, ConditionEvent::PostconditionMet);
        assert!(!gate.waiting_postcondition());
    }

    #[test]
    fn precondition_only_reaches_done_without_postcondition_phase() {
        let mut gate = ConditionGate::new(Some(vec![cond("top::a==1")]), None).unwrap();
        let evt = gate.on_value_change(&["top".into()], "a", "1", None, None, 0);
        assert_eq!(evt, ConditionEvent::PreconditionMet);
        assert!(!gate.waiting_precondition());
        assert!(!gate.waiting_postcondition());
    }
}
