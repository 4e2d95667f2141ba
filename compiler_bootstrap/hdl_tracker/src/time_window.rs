//! Simulation-time restriction, grounded on
//! `hdltools/vcd/mixins/time.py`'s `VCDTimeRestrictionMixin`.

use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindow {
    start: Option<u64>,
    end: Option<u64>,
}

impl TimeWindow {
    pub fn unrestricted() -> Self {
        Self { start: None, end: None }
    }

    pub fn new(range: Option<(u64, u64)>) -> TrackerResult<Self> {
        match range {
            None => Ok(Self::unrestricted()),
            Some((start, end)) => {
                if start > end {
                    return Err(TrackerError::invalid_time_range(format!("start {start} is after end {end}")));
                }
                Ok(Self { start: Some(start), end: Some(end) })
            }
        }
    }

    pub fn start(&self) -> Option<u64> {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn is_valid(&self, current_time: u64) -> bool {
        if let Some(start) = self.start {
            if current_time < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if current_time > end {
                return false;
            }
        }
        true
    }

    /// True once simulation has advanced past the window's end — the
    /// caller should abort parsing at this point.
    pub fn should_abort(&self, current_time: u64) -> bool {
        matches!(self.end, Some(end) if current_time > end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_respects_both_bounds() {
        let w = TimeWindow::new(Some((10, 20))).unwrap();
        assert!(!w.is_valid(5));
        assert!(w.is_valid(15));
        assert!(!w.is_valid(25));
    }

    #[test]
    fn abort_fires_only_past_the_end() {
        let w = TimeWindow::new(Some((10, 20))).unwrap();
        assert!(!w.should_abort(20));
        assert!(w.should_abort(21));
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(TimeWindow::new(Some((20, 10))).is_err());
    }
}
