//! Shared trigger FSM state, arming, and event-id machinery (spec
//! component J), grounded on `hdltools/vcd/trigger/__init__.py`'s
//! `VCDTriggerFSM` and `hdltools/vcd/trigger/event.py`'s `VCDTriggerEvent`.
//!
//! The source passes the FSM instance itself into callbacks (`cb(self)`),
//! relying on Python's reference semantics to let a callback read and even
//! rearm the FSM mid-callback. Rust's borrow checker won't allow a callback
//! held by `&mut self` to also receive `&mut self`, so callbacks here
//! receive an [`FsmSnapshot`] — a plain copy of the FSM's public state —
//! taken just before the call. Event ids replace the source's `uuid4()`
//! with a per-process monotonic counter, since no UUID crate is part of
//! this toolkit's dependency stack.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{TriggerError, TriggerResult};

pub type EventId = u64;

fn next_event_id() -> EventId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A trigger condition match or a trigger firing, kept in a trigger's
/// history for post-hoc inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEventKind {
    Condition,
    Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub kind: TriggerEventKind,
    pub time: u64,
    pub descriptor: Option<crate::descriptor::TriggerDescriptor>,
}

/// Read-only view of an FSM's state, passed to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsmSnapshot {
    pub trigger_id: u64,
    pub current_evt: Option<EventId>,
    pub last_evt: Option<EventId>,
    pub armed: bool,
    pub triggered: bool,
    pub event_ending: bool,
}

type Callback = Box<dyn FnMut(FsmSnapshot)>;

#[derive(Default)]
pub struct TriggerCallbacks {
    pub event_start_cb: Option<Callback>,
    pub event_end_cb: Option<Callback>,
    pub event_timeout_cb: Option<Callback>,
    pub trigger_cb: Option<Callback>,
}

/// The part of `VCDTriggerFSM` shared by every trigger flavor: arming,
/// event-id lifecycle, and callback dispatch.
pub struct FsmCore {
    trigger_id: u64,
    armed: bool,
    triggered: bool,
    evt_start_fired: bool,
    current_evt: Option<EventId>,
    last_evt: Option<EventId>,
    event_ends_now: bool,
    callbacks: TriggerCallbacks,
}

impl Default for FsmCore {
    fn default() -> Self {
        Self::new()
    }
}

impl FsmCore {
    pub fn new() -> Self {
        static TRIGGER_IDS: AtomicU64 = AtomicU64::new(1);
        Self {
            trigger_id: TRIGGER_IDS.fetch_add(1, Ordering::Relaxed),
            armed: false,
            triggered: false,
            evt_start_fired: false,
            current_evt: None,
            last_evt: None,
            event_ends_now: false,
            callbacks: TriggerCallbacks::default(),
        }
    }

    pub fn trigger_id(&self) -> u64 {
        self.trigger_id
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn current_evt(&self) -> Option<EventId> {
        self.current_evt
    }

    pub fn last_evt(&self) -> Option<EventId> {
        self.last_evt
    }

    pub fn event_ending(&self) -> bool {
        self.event_ends_now
    }

    pub fn snapshot(&self) -> FsmSnapshot {
        FsmSnapshot {
            trigger_id: self.trigger_id,
            current_evt: self.current_evt,
            last_evt: self.last_evt,
            armed: self.armed,
            triggered: self.triggered,
            event_ending: self.event_ends_now,
        }
    }

    fn reject_if_armed(&self, what: &str) -> TriggerResult<()> {
        if self.armed {
            Err(TriggerError::armed(format!("cannot {what} while armed")))
        } else {
            Ok(())
        }
    }

    pub fn set_event_start_cb(&mut self, cb: Callback) -> TriggerResult<()> {
        self.reject_if_armed("change event_start_cb")?;
        self.callbacks.event_start_cb = Some(cb);
        Ok(())
    }

    pub fn set_event_end_cb(&mut self, cb: Callback) -> TriggerResult<()> {
        self.reject_if_armed("change event_end_cb")?;
        self.callbacks.event_end_cb = Some(cb);
        Ok(())
    }

    pub fn set_event_timeout_cb(&mut self, cb: Callback) -> TriggerResult<()> {
        self.reject_if_armed("change event_timeout_cb")?;
        self.callbacks.event_timeout_cb = Some(cb);
        Ok(())
    }

    pub fn set_trigger_cb(&mut self, cb: Callback) -> TriggerResult<()> {
        self.reject_if_armed("change trigger_callback")?;
        self.callbacks.trigger_cb = Some(cb);
        Ok(())
    }

    pub fn has_timeout(&self) -> bool {
        self.callbacks.event_timeout_cb.is_some()
    }

    pub fn arm(&mut self) -> TriggerResult<()> {
        if self.armed {
            return Err(TriggerError::armed("already armed"));
        }
        self.evt_start_fired = false;
        self.event_ends_now = false;
        self.triggered = false;
        self.armed = true;
        Ok(())
    }

    pub fn disarm(&mut self) -> TriggerResult<()> {
        if !self.armed {
            return Err(TriggerError::not_armed("not armed"));
        }
        self.armed = false;
        Ok(())
    }

    pub fn reset(&mut self) -> TriggerResult<()> {
        self.reject_if_armed("reset trigger configuration")?;
        self.callbacks.trigger_cb = None;
        self.triggered = false;
        Ok(())
    }

    /// Fires the trigger: marks `triggered`, mints an event id if advancing
    /// never did, invokes `trigger_cb`, and — unless a separate end
    /// callback is configured — ends the event immediately.
    pub fn fire_trigger(&mut self, disarm: bool) {
        if disarm {
            self.armed = false;
        }
        self.triggered = true;
        if self.current_evt.is_none() {
            self.current_evt = Some(next_event_id());
        }
        let ends_now = self.callbacks.event_end_cb.is_none();
        if ends_now {
            self.event_ends_now = true;
        }
        if self.callbacks.trigger_cb.is_some() {
            let snapshot = self.snapshot_for_callback();
            if let Some(cb) = self.callbacks.trigger_cb.as_mut() {
                cb(snapshot);
            }
        }
        if ends_now {
            self.last_evt = self.current_evt;
            self.current_evt = None;
        }
    }

    /// First advance past level zero: mints the event id and fires
    /// `event_start_cb`, but only once per armed cycle.
    pub fn event_starts(&mut self) {
        if self.callbacks.event_start_cb.is_some() && !self.evt_start_fired {
            self.current_evt = Some(next_event_id());
            self.evt_start_fired = true;
            if let Some(cb) = self.callbacks.event_start_cb.as_mut() {
                let snapshot = FsmSnapshot {
                    trigger_id: self.trigger_id,
                    current_evt: self.current_evt,
                    last_evt: self.last_evt,
                    armed: self.armed,
                    triggered: self.triggered,
                    event_ending: self.event_ends_now,
                };
                cb(snapshot);
            }
        }
    }

    pub fn event_ends(&mut self) -> TriggerResult<()> {
        self.disarm()?;
        self.event_ends_now = true;
        if let Some(cb) = self.callbacks.event_end_cb.as_mut() {
            let snapshot = FsmSnapshot {
                trigger_id: self.trigger_id,
                current_evt: self.current_evt,
                last_evt: self.last_evt,
                armed: self.armed,
                triggered: self.triggered,
                event_ending: self.event_ends_now,
            };
            cb(snapshot);
        }
        self.last_evt = self.current_evt;
        self.current_evt = None;
        Ok(())
    }

    pub fn event_timeout(&mut self) {
        if let Some(cb) = self.callbacks.event_timeout_cb.as_mut() {
            let snapshot = FsmSnapshot {
                trigger_id: self.trigger_id,
                current_evt: self.current_evt,
                last_evt: self.last_evt,
                armed: self.armed,
                triggered: self.triggered,
                event_ending: self.event_ends_now,
            };
            cb(snapshot);
        }
    }

    fn snapshot_for_callback(&self) -> FsmSnapshot {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_disarm_round_trips_and_rejects_double_arm() {
        let mut fsm = FsmCore::new();
        fsm.arm().unwrap();
        assert!(fsm.armed());
        assert!(fsm.arm().is_err());
        fsm.disarm().unwrap();
        assert!(!fsm.armed());
        assert!(fsm.disarm().is_err());
    }

    #[test]
    fn configuring_callbacks_while_armed_is_rejected() {
        let mut fsm = FsmCore::new();
        fsm.arm().unwrap();
        assert!(fsm.set_trigger_cb(Box::new(|_| {})).is_err());
    }

    #[test]
    fn fire_trigger_mints_event_and_invokes_callback() {
        let mut fsm = FsmCore::new();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(None));
        let fired2 = fired.clone();
        fsm.set_trigger_cb(Box::new(move |snap| *fired2.borrow_mut() = Some(snap))).unwrap();
        fsm.arm().unwrap();
        fsm.fire_trigger(true);
        assert!(fsm.triggered());
        assert!(!fsm.armed());
        let snap = fired.borrow().unwrap();
        assert!(snap.triggered);
        assert!(snap.current_evt.is_some());
    }
}
