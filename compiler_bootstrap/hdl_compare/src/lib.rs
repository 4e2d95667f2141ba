//! VCD equivalence comparator (spec component L): direct and streaming
//! modes over normalized signal names, values, and times.

pub mod collect;
pub mod direct;
pub mod error;
pub mod model;
pub mod normalize;
pub mod streaming;

pub use direct::DirectComparator;
pub use error::{CompareError, CompareResult};
pub use model::{ComparisonResult, SignalDetail};
pub use normalize::{normalize_signal_name, normalize_time, normalize_value};
pub use streaming::StreamingComparator;

use std::path::Path;

/// Compare two VCD files, auto-selecting direct or streaming mode from their
/// combined size unless `use_streaming` forces one. Grounded on
/// `compare.py`'s top-level `compare_vcd_files` convenience function.
pub fn compare_vcd_files(
    path1: &Path,
    path2: &Path,
    time_tolerance: f64,
    use_streaming: Option<bool>,
    max_memory_mb: u64,
) -> CompareResult<ComparisonResult> {
    match use_streaming {
        Some(true) => StreamingComparator::new(time_tolerance, max_memory_mb).compare_files(path1, path2),
        Some(false) => DirectComparator::new(time_tolerance).compare_files(path1, path2),
        None => {
            let size1 = std::fs::metadata(path1).map(|m| m.len()).unwrap_or(0);
            let size2 = std::fs::metadata(path2).map(|m| m.len()).unwrap_or(0);
            let total_mb = (size1 + size2) as f64 / (1024.0 * 1024.0);
            if total_mb > max_memory_mb as f64 {
                StreamingComparator::new(time_tolerance, max_memory_mb).compare_files(path1, path2)
            } else {
                DirectComparator::new(time_tolerance).compare_files(path1, path2)
            }
        }
    }
}
