//! Full-file change collection shared by the direct comparator and the
//! reference (file1) side of the streaming comparator, grounded on
//! `VCDComparator.parse_vcd_file`: signal changes are keyed by variable
//! *name* (not full scope path), so two variables sharing a name after
//! [`normalize_signal_name`] collapse into one change list, matching the
//! source's `normalized_changes1[norm_signal].extend(...)` merge.

use std::collections::HashMap;
use std::path::Path;

use hdl_vcd::{BinarySignalValue, NoopHandlers, StreamingVcdParser, Timescale};

use crate::error::CompareResult;
use crate::normalize::{normalize_signal_name, normalize_time, normalize_value};

pub type ChangeMap = HashMap<String, Vec<(f64, String)>>;

fn raw_bits(value: &BinarySignalValue) -> String {
    // `to_vcd_string` always renders a `b`-prefixed, width-padded string;
    // strip the prefix so normalization sees the same raw digit string the
    // source's line-based parser would have captured.
    value.to_vcd_string()[1..].to_string()
}

/// Parse `path` fully and return its per-signal, normalized, time-sorted
/// change lists plus the file's own timescale (for callers that need it).
pub fn collect_changes(path: &Path) -> CompareResult<(ChangeMap, Option<Timescale>)> {
    let mut parser = StreamingVcdParser::new(NoopHandlers);
    parser.parse_file(path)?;
    let timescale = parser.timescale;

    let mut changes: ChangeMap = HashMap::new();
    for var in parser.storage.variables.values() {
        let name = normalize_signal_name(&var.name);
        let entry = changes.entry(name).or_default();
        for (ticks, value) in var.history.all_changes() {
            let time_ns = normalize_time(ticks, timescale.as_ref());
            entry.push((time_ns, normalize_value(&raw_bits(value))));
        }
    }
    for entries in changes.values_mut() {
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    }
    Ok((changes, timescale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
$timescale 1ns $end
$scope module top $end
$var wire 1 ! clk $end
$var wire 4 \" count $end
$upscope $end
$enddefinitions $end
$dumpvars
0!
b0000 \"
$end
#10
1!
b0011 \"
";

    #[test]
    fn collects_and_normalizes_per_signal_changes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{SAMPLE}").unwrap();
        let (changes, ts) = collect_changes(f.path()).unwrap();
        assert_eq!(ts.unwrap().to_ns(10), 10.0);

        let clk = changes.get("clk").unwrap();
        assert_eq!(clk, &vec![(0.0, "0".to_string()), (10.0, "1".to_string())]);

        let count = changes.get("count").unwrap();
        assert_eq!(count, &vec![(0.0, "0".to_string()), (10.0, "11".to_string())]);
    }
}
