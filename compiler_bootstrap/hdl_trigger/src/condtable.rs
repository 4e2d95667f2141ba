//! Unordered ("condition table") trigger: every condition must be true
//! simultaneously, in any order, grounded on
//! `hdltools/vcd/trigger/condtable.py`'s `ConditionTableTrigger`.
//!
//! The source's `match_and_advance` rebuilds the whole condition table on
//! every call, keeping only entries for the variable that just changed —
//! which silently drops every other condition's tracked state on every
//! update. spec.md section 4.8 is explicit that updating one condition
//! must leave the others untouched, so this implementation only mutates
//! the matching entry and keeps the rest as they were.

use crate::descriptor::TriggerDescriptor;
use crate::error::{TriggerError, TriggerResult};
use crate::fsm::{FsmCore, FsmSnapshot};

pub struct ConditionTableTrigger {
    core: FsmCore,
    table: Vec<(TriggerDescriptor, bool)>,
}

impl Default for ConditionTableTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionTableTrigger {
    pub fn new() -> Self {
        Self { core: FsmCore::new(), table: Vec::new() }
    }

    pub fn armed(&self) -> bool {
        self.core.armed()
    }

    pub fn triggered(&self) -> bool {
        self.core.triggered()
    }

    pub fn snapshot(&self) -> FsmSnapshot {
        self.core.snapshot()
    }

    pub fn set_trigger_cb(&mut self, cb: Box<dyn FnMut(FsmSnapshot)>) -> TriggerResult<()> {
        self.core.set_trigger_cb(cb)
    }

    fn reject_if_armed(&self, what: &str) -> TriggerResult<()> {
        if self.core.armed() {
            Err(TriggerError::armed(format!("cannot {what} while armed")))
        } else {
            Ok(())
        }
    }

    pub fn add_condition(&mut self, descriptor: TriggerDescriptor) -> TriggerResult<()> {
        self.reject_if_armed("add a condition")?;
        if self.table.iter().any(|(d, _)| *d == descriptor) {
            return Err(TriggerError::config("condition already present"));
        }
        self.table.push((descriptor, false));
        Ok(())
    }

    pub fn remove_condition(&mut self, descriptor: &TriggerDescriptor) -> TriggerResult<()> {
        self.reject_if_armed("remove a condition")?;
        let before = self.table.len();
        self.table.retain(|(d, _)| d != descriptor);
        if self.table.len() == before {
            return Err(TriggerError::config("condition not present"));
        }
        Ok(())
    }

    pub fn trigger_reset(&mut self) -> TriggerResult<()> {
        self.core.reset()?;
        for (_, met) in self.table.iter_mut() {
            *met = false;
        }
        Ok(())
    }

    pub fn conditions(&self) -> impl Iterator<Item = &TriggerDescriptor> {
        self.table.iter().map(|(d, _)| d)
    }

    pub fn conditions_met(&self) -> usize {
        self.table.iter().filter(|(_, met)| *met).count()
    }

    pub fn unmet_conditions(&self) -> usize {
        self.table.iter().filter(|(_, met)| !*met).count()
    }

    pub fn arm_trigger(&mut self) -> TriggerResult<()> {
        self.core.arm()
    }

    pub fn disarm_trigger(&mut self) -> TriggerResult<()> {
        self.core.disarm()
    }

    /// Update every condition matching this variable change, leave all
    /// others untouched, and fire once none remain unmet.
    pub fn match_and_advance(
        &mut self,
        scope: &[String],
        name: &str,
        value: &str,
        vcd_var: Option<&str>,
        full_width: Option<u32>,
    ) -> bool {
        if !self.core.armed() {
            return false;
        }
        let mut any_matched = false;
        for (descriptor, met) in self.table.iter_mut() {
            if descriptor.match_var(scope, name, vcd_var) {
                any_matched = true;
                *met = descriptor.match_value(value, full_width);
            }
        }
        if !any_matched {
            return false;
        }
        if self.unmet_conditions() == 0 {
            self.core.fire_trigger(true);
            true
        } else {
            false
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
    fn fires_only_once_all_conditions_are_met() {
        let mut t = ConditionTableTrigger::new();
        t.add_condition(cond("top::a==1")).unwrap();
        t.add_condition(cond("top::b==1")).unwrap();
        t.arm_trigger().unwrap();

        assert!(!t.match_and_advance(&["top".into()], "a", "1", None, None));
        assert_eq!(t.conditions_met(), 1);
        assert!(t.match_and_advance(&["top".into()], "b", "1", None, None));
        assert!(t.triggered());
    }

    #[test]
    fn updating_one_condition_does_not_clear_others() {
        let mut t = ConditionTableTrigger::new();
        t.add_condition(cond("top::a==1")).unwrap();
        t.add_condition(cond("top::b==1")).unwrap();
        t.arm_trigger().unwrap();

        t.match_and_advance(&["top".into()], "a", "1", None, None);
        assert_eq!(t.conditions_met(), 1);
        // An unrelated variable changing must not reset `a`'s tracked state.
        t.match_and_advance(&["top".into()], "c", "0", None, None);
        assert_eq!(t.conditions_met(), 1);
    }

    #[test]
    fn rejects_duplicate_and_missing_conditions() {
        let mut t = ConditionTableTrigger::new();
        t.add_condition(cond("top::a==1")).unwrap();
        assert!(t.add_condition(cond("top::a==1")).is_err());
        assert!(t.remove_condition(&cond("top::z==1")).is_err());
    }
}
