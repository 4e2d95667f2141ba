//! Ordered ("simple") trigger: a sequence of condition levels that must be
//! matched in order, grounded on `hdltools/vcd/trigger/fsm.py`'s
//! `SimpleTrigger`.

use crate::descriptor::TriggerDescriptor;
use crate::error::{TriggerError, TriggerResult};
use crate::fsm::{FsmCore, FsmSnapshot, TriggerEvent, TriggerEventKind};

pub struct SimpleTrigger {
    core: FsmCore,
    levels: Vec<Vec<TriggerDescriptor>>,
    current_level: usize,
    history: Vec<TriggerEvent>,
    last_change: u64,
    state_timeout: Option<u64>,
}

impl Default for SimpleTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleTrigger {
    pub fn new() -> Self {
        Self {
            core: FsmCore::new(),
            levels: Vec::new(),
            current_level: 0,
            history: Vec::new(),
            last_change: 0,
            state_timeout: None,
        }
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

    pub fn set_event_timeout_cb(&mut self, cb: Box<dyn FnMut(FsmSnapshot)>) -> TriggerResult<()> {
        self.core.set_event_timeout_cb(cb)
    }

    /// The source silences a separate end callback for `SimpleTrigger`: a
    /// level sequence ends exactly when it fires, so there is no distinct
    /// "event end" moment to report.
    pub fn set_event_end_cb(&mut self, _cb: Box<dyn FnMut(FsmSnapshot)>) -> TriggerResult<()> {
        Ok(())
    }

    fn reject_if_armed(&self, what: &str) -> TriggerResult<()> {
        if self.core.armed() {
            Err(TriggerError::armed(format!("cannot {what} while armed")))
        } else {
            Ok(())
        }
    }

    pub fn add_trigger_level(&mut self, conditions: Vec<TriggerDescriptor>) -> TriggerResult<()> {
        self.reject_if_armed("add a trigger level")?;
        self.levels.push(conditions);
        Ok(())
    }

    pub fn remove_trigger_level(&mut self, index: usize) -> TriggerResult<()> {
        self.reject_if_armed("remove a trigger level")?;
        if index >= self.levels.len() {
            return Err(TriggerError::config(format!("no trigger level {index}")));
        }
        self.levels.remove(index);
        Ok(())
    }

    pub fn trigger_reset(&mut self) -> TriggerResult<()> {
        self.core.reset()?;
        self.current_level = 0;
        self.history.clear();
        Ok(())
    }

    pub fn current_trigger_level(&self) -> usize {
        self.current_level
    }

    pub fn current_trigger(&self) -> Option<&[TriggerDescriptor]> {
        self.levels.get(self.current_level).map(Vec::as_slice)
    }

    pub fn trigger_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn trigger_history(&self) -> &[TriggerEvent] {
        &self.history
    }

    pub fn last_change(&self) -> u64 {
        self.last_change
    }

    pub fn state_timeout(&self) -> Option<u64> {
        self.state_timeout
    }

    pub fn set_state_timeout(&mut self, timeout: Option<u64>) -> TriggerResult<()> {
        self.reject_if_armed("change state_timeout")?;
        self.state_timeout = timeout;
        Ok(())
    }

    /// Every descriptor across every level, deduplicated.
    pub fn global_sensitivity_list(&self) -> Vec<&TriggerDescriptor> {
        let mut seen: Vec<&TriggerDescriptor> = Vec::new();
        for level in &self.levels {
            for d in level {
                if !seen.contains(&d) {
                    seen.push(d);
                }
            }
        }
        seen
    }

    /// Descriptors relevant at the current level only.
    pub fn sensitivity_list(&self) -> &[TriggerDescriptor] {
        self.current_trigger().unwrap_or(&[])
    }

    pub fn arm_trigger(&mut self) -> TriggerResult<()> {
        self.core.arm()?;
        self.current_level = 0;
        Ok(())
    }

    pub fn disarm_trigger(&mut self) -> TriggerResult<()> {
        self.core.disarm()
    }

    pub fn check_timeout(&mut self, time: u64) {
        if self.current_level == 0 {
            return;
        }
        if let Some(timeout) = self.state_timeout {
            if time.saturating_sub(self.last_change) > timeout {
                self.current_level = 0;
                self.core.event_timeout();
            }
        }
    }

    /// Test a value change against the current level's conditions, advancing
    /// on a match and firing once every level has matched in order. VCD
    /// binary values carry a `b` prefix the pattern matcher doesn't expect.
    pub fn match_and_advance(
        &mut self,
        scope: &[String],
        name: &str,
        value: &str,
        vcd_var: Option<&str>,
        full_width: Option<u32>,
        time: u64,
    ) -> bool {
        self.check_timeout(time);
        if !self.core.armed() {
            return false;
        }
        let value = value.strip_prefix('b').unwrap_or(value);

        let matched_descriptor = self
            .current_trigger()
            .and_then(|conds| conds.iter().find(|c| c.match_condition(scope, name, value, vcd_var, full_width)))
            .cloned();

        let Some(descriptor) = matched_descriptor else {
            return false;
        };

        self.last_change = time;
        self.history.push(TriggerEvent {
            kind: TriggerEventKind::Condition,
            time,
            descriptor: Some(descriptor),
        });
        self.core.event_starts();
        self.current_level += 1;

        if self.current_level >= self.levels.len() {
            self.history.push(TriggerEvent { kind: TriggerEventKind::Trigger, time, descriptor: None });
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
    fn fires_after_all_levels_match_in_order() {
        let mut t = SimpleTrigger::new();
        t.add_trigger_level(vec![cond("top::a==1")]).unwrap();
        t.add_trigger_level(vec![cond("top::b==1")]).unwrap();
        t.arm_trigger().unwrap();

        assert!(!t.match_and_advance(&["top".into()], "b", "1", None, None, 10));
        assert_eq!(t.current_trigger_level(), 0);

        assert!(!t.match_and_advance(&["top".into()], "a", "1", None, None, 20));
        assert_eq!(t.current_trigger_level(), 1);

        assert!(t.match_and_advance(&["top".into()], "b", "1", None, None, 30));
        assert!(t.triggered());
        assert!(!t.armed());
    }

    #[test]
    fn cannot_edit_levels_while_armed() {
        let mut t = SimpleTrigger::new();
        t.add_trigger_level(vec![cond("top::a==1")]).unwrap();
        t.arm_trigger().unwrap();
        assert!(t.add_trigger_level(vec![cond("top::b==1")]).is_err());
    }

    #[test]
    fn timeout_resets_level_to_zero() {
        let mut t = SimpleTrigger::new();
        t.add_trigger_level(vec![cond("top::a==1")]).unwrap();
        t.add_trigger_level(vec![cond("top::b==1")]).unwrap();
        t.set_state_timeout(Some(5)).unwrap();
        t.arm_trigger().unwrap();

        t.match_and_advance(&["top".into()], "a", "1", None, None, 0);
        assert_eq!(t.current_trigger_level(), 1);

        t.check_timeout(10);
        assert_eq!(t.current_trigger_level(), 0);
    }
}
