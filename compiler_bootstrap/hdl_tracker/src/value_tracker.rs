//! Value tracker: follows a tagged value through the design hierarchy,
//! grounded on `hdltools/vcd/tracker.py`'s `VCDValueTracker`.

use hdl_pattern::Pattern;
use regex::Regex;

use crate::conditions::ConditionGate;
use crate::error::{TrackerError, TrackerResult};
use crate::time_window::TimeWindow;

/// One recorded sighting of a tracked or watched signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub scope: Vec<String>,
    pub signal: String,
    pub time: u64,
}

#[derive(Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn push(&mut self, scope: Vec<String>, signal: impl Into<String>, time: u64) -> usize {
        self.entries.push(HistoryEntry { scope, signal: signal.into(), time });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&HistoryEntry> {
        self.entries.get(idx)
    }

    pub fn entries_in_range(&self, start: u64, end: u64) -> Vec<&HistoryEntry> {
        self.entries.iter().filter(|e| e.time >= start && e.time <= end).collect()
    }

    pub fn at_time(&self, time: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.time == time)
    }
}

fn scope_contains(parent: &[String], child: &[String]) -> bool {
    child.len() >= parent.len() && child[..parent.len()] == *parent
}

fn compile_patterns(patterns: Option<&[String]>) -> TrackerResult<Vec<Regex>> {
    patterns
        .unwrap_or(&[])
        .iter()
        .map(|p| Regex::new(p).map_err(|e| TrackerError::invalid_pattern(p, e.to_string())))
        .collect()
}

pub struct ValueTrackerConfig {
    pub track: Pattern,
    pub track_all: bool,
    pub restrict_src: Option<Vec<String>>,
    pub restrict_dest: Option<Vec<String>>,
    pub inclusive_src: bool,
    pub inclusive_dest: bool,
    pub src_oneshot: bool,
    pub ignore_signals: Option<Vec<String>>,
    pub ignore_scopes: Option<Vec<String>>,
    pub anchors: Option<(Option<String>, Option<String>)>,
    pub time_range: Option<(u64, u64)>,
    pub preconditions: Option<Vec<hdl_trigger::TriggerDescriptor>>,
    pub postconditions: Option<Vec<hdl_trigger::TriggerDescriptor>>,
}

pub struct ValueTracker {
    track_value: Pattern,
    track_all: bool,
    restrict_src: Option<Vec<String>>,
    restrict_dest: Option<Vec<String>>,
    inclusive_src: bool,
    inclusive_dest: bool,
    oneshot_src: bool,
    ignore_signals: Vec<Regex>,
    #[allow(dead_code)]
    ignore_scopes: Vec<Regex>,
    src_anchor: Option<Regex>,
    dest_anchor: Option<Regex>,
    time_window: TimeWindow,
    conditions: Option<ConditionGate>,
    full_history: HistoryLog,
    value_history: HistoryLog,
    tracked_history: HistoryLog,
    maybe_src: Option<usize>,
    maybe_dest: Option<usize>,
    aborted: bool,
}

impl ValueTracker {
    pub fn new(config: ValueTrackerConfig) -> TrackerResult<Self> {
        let (src_anchor, dest_anchor) = match config.anchors {
            Some((src, dest)) => (
                src.map(|p| Regex::new(&p).map_err(|e| TrackerError::invalid_pattern(p, e.to_string()))).transpose()?,
                dest.map(|p| Regex::new(&p).map_err(|e| TrackerError::invalid_pattern(p, e.to_string()))).transpose()?,
            ),
            None => (None, None),
        };
        let conditions = if config.preconditions.is_some() || config.postconditions.is_some() {
            Some(ConditionGate::new(config.preconditions, config.postconditions)?)
        } else {
            None
        };
        Ok(Self {
            track_value: config.track,
            track_all: config.track_all,
            restrict_src: config.restrict_src,
            restrict_dest: config.restrict_dest,
            inclusive_src: config.inclusive_src,
            inclusive_dest: config.inclusive_dest,
            oneshot_src: config.src_oneshot,
            ignore_signals: compile_patterns(config.ignore_signals.as_deref())?,
            ignore_scopes: compile_patterns(config.ignore_scopes.as_deref())?,
            src_anchor,
            dest_anchor,
            time_window: TimeWindow::new(config.time_range)?,
            conditions,
            full_history: HistoryLog::default(),
            value_history: HistoryLog::default(),
            tracked_history: HistoryLog::default(),
            maybe_src: None,
            maybe_dest: None,
            aborted: false,
        })
    }

    pub fn on_initial_value(&mut self, scope: &[String], name: &str, value: &str) {
        if self.track_all {
            self.full_history.push(scope.to_vec(), name, 0);
        }
        if self.track_value.matches(value) {
            self.tracked_history.push(scope.to_vec(), name, 0);
            self.value_history.push(scope.to_vec(), name, 0);
        }
    }

    pub fn on_value_change(&mut self, scope: &[String], name: &str, value: &str, vcd_var: Option<&str>, full_width: Option<u32>, time: u64) {
        if self.track_all {
            self.full_history.push(scope.to_vec(), name, time);
        }
        if self.track_value.matches(value) {
            self.value_history.push(scope.to_vec(), name, time);
        }

        if self.time_window.should_abort(time) {
            self.aborted = true;
        }

        let time_valid = self.time_window.is_valid(time);
        let waiting_precondition = self.conditions.as_ref().map(ConditionGate::waiting_precondition).unwrap_or(false);
        if let Some(gate) = self.conditions.as_mut() {
            if gate.on_value_change(scope, name, value, vcd_var, full_width, time) == crate::conditions::ConditionEvent::PostconditionMet {
                self.aborted = true;
            }
        }

        if !time_valid || waiting_precondition {
            return;
        }

        let var_scope = scope.to_vec();
        let in_src_scope = self.restrict_src.as_ref().map_or(false, |r| {
            *r == var_scope || (self.inclusive_src && scope_contains(r, &var_scope))
        });
        let in_dest_scope = self.restrict_dest.as_ref().map_or(false, |r| {
            *r == var_scope || (self.inclusive_dest && scope_contains(r, &var_scope))
        });

        if self.restrict_src.is_some() && !in_src_scope && self.restrict_dest.is_some() && !in_dest_scope {
            return;
        }

        if !self.track_value.matches(value) {
            return;
        }
        if self.ignore_signals.iter().any(|re| re.is_match(name)) {
            return;
        }

        let idx = self.tracked_history.push(scope.to_vec(), name, time);

        if in_src_scope && self.maybe_dest.is_none() {
            let matches_anchor = self.src_anchor.as_ref().map_or(true, |re| re.is_match(name));
            if matches_anchor && (!self.oneshot_src || self.maybe_src.is_none()) {
                self.maybe_src = Some(idx);
            }
        }

        if in_dest_scope && self.maybe_dest.is_none() && self.maybe_src.is_some() {
            let matches_anchor = self.dest_anchor.as_ref().map_or(true, |re| re.is_match(name));
            if matches_anchor {
                self.maybe_dest = Some(idx);
            }
        }
    }

    /// True once a postcondition fired or the time window closed; the
    /// caller driving the parser should stop feeding it further changes.
    pub fn should_abort(&self) -> bool {
        self.aborted
    }

    pub fn full_history(&self) -> &HistoryLog {
        &self.full_history
    }

    pub fn value_history(&self) -> &HistoryLog {
        &self.value_history
    }

    pub fn tracked_history(&self) -> &HistoryLog {
        &self.tracked_history
    }

    pub fn maybe_src(&self) -> Option<&HistoryEntry> {
        self.maybe_src.and_then(|i| self.tracked_history.get(i))
    }

    pub fn maybe_dest(&self) -> Option<&HistoryEntry> {
        self.maybe_dest.and_then(|i| self.tracked_history.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(track: &str) -> ValueTracker {
        ValueTracker::new(ValueTrackerConfig {
            track: Pattern::parse(track).unwrap(),
            track_all: false,
            restrict_src: Some(vec!["top".into(), "src".into()]),
            restrict_dest: Some(vec!["top".into(), "dst".into()]),
            inclusive_src: false,
            inclusive_dest: false,
            src_oneshot: false,
            ignore_signals: None,
            ignore_scopes: None,
            anchors: None,
            time_range: None,
            preconditions: None,
            postconditions: None,
        })
        .unwrap()
    }

    #[test]
    fn records_source_then_destination_sighting() {
        let mut t = tracker("1");
        t.on_value_change(&["top".into(), "src".into()], "a", "1", None, None, 10);
        assert!(t.maybe_src().is_some());
        assert!(t.maybe_dest().is_none());

        t.on_value_change(&["top".into(), "dst".into()], "b", "1", None, None, 20);
        assert!(t.maybe_dest().is_some());
        assert_eq!(t.maybe_dest().unwrap().time, 20);
    }

    #[test]
    fn unrelated_scope_is_ignored_when_both_sides_restricted() {
        let mut t = tracker("1");
        t.on_value_change(&["top".into(), "other".into()], "z", "1", None, None, 5);
        assert!(t.maybe_src().is_none());
        assert!(t.tracked_history().is_empty());
    }

    #[test]
    fn ignored_signal_names_are_skipped() {
        let mut t = ValueTracker::new(ValueTrackerConfig {
            track: Pattern::parse("1").unwrap(),
            track_all: false,
            restrict_src: None,
            restrict_dest: None,
            inclusive_src: false,
            inclusive_dest: false,
            src_oneshot: false,
            ignore_signals: Some(vec!["^noise".to_string()]),
            ignore_scopes: None,
            anchors: None,
            time_range: None,
            preconditions: None,
            postconditions: None,
        })
        .unwrap();
        t.on_value_change(&["top".into()], "noise_sig", "1", None, None, 1);
        assert!(t.tracked_history().is_empty());
    }
}
