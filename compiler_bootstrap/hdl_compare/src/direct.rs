//! Direct comparator: parse both files fully, then diff signal-by-signal.
//! Grounded on `hdltools/vcd/compare.py`'s `VCDComparator`.

use std::collections::BTreeSet;
use std::path::Path;

use crate::collect::{collect_changes, ChangeMap};
use crate::error::CompareResult;
use crate::model::{ComparisonResult, SignalDetail};

pub struct DirectComparator {
    time_tolerance: f64,
}

impl DirectComparator {
    pub fn new(time_tolerance: f64) -> Self {
        Self { time_tolerance }
    }

    pub fn compare_files(&self, path1: &Path, path2: &Path) -> CompareResult<ComparisonResult> {
        let (changes1, _) = collect_changes(path1)?;
        let (changes2, _) = collect_changes(path2)?;
        Ok(self.compare_changes(&changes1, &changes2))
    }

    /// Compare already-normalized, already-sorted per-signal change lists.
    /// Grounded on `compare_signal_changes`.
    pub fn compare_changes(&self, changes1: &ChangeMap, changes2: &ChangeMap) -> ComparisonResult {
        let mut all_signals: BTreeSet<String> = changes1.keys().cloned().collect();
        all_signals.extend(changes2.keys().cloned());

        let mut mismatches = Vec::new();
        let mut detailed = std::collections::BTreeMap::new();

        for signal in &all_signals {
            let c1 = changes1.get(signal).map(Vec::as_slice).unwrap_or(&[]);
            let c2 = changes2.get(signal).map(Vec::as_slice).unwrap_or(&[]);
            let mut detail = SignalDetail { file1_changes: c1.len(), file2_changes: c2.len(), matches: true };

            if c1.len() != c2.len() {
                detail.matches = false;
                mismatches.push(format!(
                    "Signal '{signal}': different number of changes (File1: {}, File2: {})",
                    c1.len(),
                    c2.len()
                ));
            } else {
                for (i, ((t1, v1), (t2, v2))) in c1.iter().zip(c2.iter()).enumerate() {
                    if (t1 - t2).abs() > self.time_tolerance {
                        detail.matches = false;
                        mismatches.push(format!(
                            "Signal '{signal}' change {i}: time mismatch (File1: {t1}, File2: {t2})"
                        ));
                    }
                    if v1 != v2 {
                        detail.matches = false;
                        mismatches.push(format!(
                            "Signal '{signal}' at time {t1}: value mismatch (File1: '{v1}', File2: '{v2}')"
                        ));
                    }
                }
            }
            detailed.insert(signal.clone(), detail);
        }

        ComparisonResult {
            equivalent: mismatches.is_empty(),
            mismatches,
            detailed,
            file1_signals: changes1.keys().cloned().collect(),
            file2_signals: changes2.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_vcd(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{body}").unwrap();
        f
    }

    const A: &str = "\
$timescale 1ns $end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
$end
#10
1!
";

    const B_EQUIVALENT: &str = "\
$timescale 1ps $end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
$end
#10000
1!
";

    const B_DIFFERS: &str = "\
$timescale 1ns $end
$scope module top $end
$var wire 1 ! clk $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
$end
#20
1!
";

    #[test]
    fn identical_signals_under_different_timescales_are_equivalent() {
        let f1 = write_vcd(A);
        let f2 = write_vcd(B_EQUIVALENT);
        let result = DirectComparator::new(1e-9).compare_files(f1.path(), f2.path()).unwrap();
        assert!(result.is_equivalent());
    }

    #[test]
    fn a_later_change_time_is_reported_as_a_mismatch() {
        let f1 = write_vcd(A);
        let f2 = write_vcd(B_DIFFERS);
        let result = DirectComparator::new(1e-9).compare_files(f1.path(), f2.path()).unwrap();
        assert!(!result.is_equivalent());
        assert!(!result.detailed["clk"].matches);
    }

    #[test]
    fn signal_missing_from_one_side_reports_a_count_mismatch() {
        let mut c1 = ChangeMap::new();
        c1.insert("a".to_string(), vec![(0.0, "1".to_string())]);
        let c2 = ChangeMap::new();

        let result = DirectComparator::new(1e-9).compare_changes(&c1, &c2);
        assert!(!result.is_equivalent());
        assert_eq!(result.detailed["a"].file1_changes, 1);
        assert_eq!(result.detailed["a"].file2_changes, 0);
    }
}
