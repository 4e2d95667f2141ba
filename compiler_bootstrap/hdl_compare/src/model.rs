//! Comparison result types, grounded on `hdltools/vcd/compare.py`'s
//! `VCDComparisonResult`.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDetail {
    pub file1_changes: usize,
    pub file2_changes: usize,
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub equivalent: bool,
    pub mismatches: Vec<String>,
    pub detailed: BTreeMap<String, SignalDetail>,
    pub file1_signals: Vec<String>,
    pub file2_signals: Vec<String>,
}

impl ComparisonResult {
    pub fn is_equivalent(&self) -> bool {
        self.equivalent
    }

    /// A multi-line human summary, mirroring the source's `print_summary`.
    pub fn summary(&self, max_mismatches: usize) -> String {
        let mut out = String::new();
        out.push_str("VCD Comparison Summary:\n");
        out.push_str(&format!("  File 1 signals: {}\n", self.file1_signals.len()));
        out.push_str(&format!("  File 2 signals: {}\n", self.file2_signals.len()));
        out.push_str(&format!("  Equivalent: {}\n", self.equivalent));

        if self.equivalent {
            return out;
        }

        out.push_str(&format!("\nMismatches found ({}):\n", self.mismatches.len()));
        for (i, mismatch) in self.mismatches.iter().take(max_mismatches).enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, mismatch));
        }
        if self.mismatches.len() > max_mismatches {
            out.push_str(&format!("  ... and {} more\n", self.mismatches.len() - max_mismatches));
        }

        out.push_str("\nSignal-by-signal comparison:\n");
        for (signal, detail) in &self.detailed {
            let status = if detail.matches { "match" } else { "DIFFERS" };
            out.push_str(&format!(
                "  [{status}] {signal}: File1={} File2={}\n",
                detail.file1_changes, detail.file2_changes
            ));
        }
        out
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.equivalent {
            write!(f, "VCD files are equivalent ({} signals compared)", self.file1_signals.len())
        } else {
            write!(f, "VCD files differ ({} mismatches found)", self.mismatches.len())
        }
    }
}
