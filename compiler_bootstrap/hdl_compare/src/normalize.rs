//! Signal-name, value, and timescale normalization, grounded on
//! `hdltools/vcd/compare.py`'s `VCDComparator.normalize_*` methods.
//!
//! Time normalization reuses [`hdl_vcd::Timescale`] instead of porting the
//! source's `"fs" in timescale` substring matching: the source's own
//! `$timescale` parser already exists in this workspace and handles the
//! magnitude correctly (`"10 ps"`, not just `"1 ps"`), which the original's
//! integer division by a hardcoded `1_000`/`1_000_000` factor does not.

use hdl_vcd::Timescale;

/// Strip a trailing `[hi:lo]` or `[bit]` array-index suffix so VHDL
/// `count[3:0]` compares equal to Verilog `count`.
pub fn normalize_signal_name(name: &str) -> String {
    match name.find('[') {
        Some(idx) if name.contains(']') => name[..idx].to_string(),
        _ => name.to_string(),
    }
}

/// Collapse any-case `u`/`x`/`z`/`-` (and all-unknown vectors such as
/// `"xxxx"` or VHDL `"UUUU"`) to a single `x`; strip leading zeros from a
/// multi-bit binary value while keeping a lone `0` for all-zero; otherwise
/// lowercase and trim.
pub fn normalize_value(value: &str) -> String {
    if value.chars().all(|c| matches!(c.to_ascii_uppercase(), 'U' | 'X' | 'Z' | '-')) {
        return "x".to_string();
    }

    if value.len() > 1 && value.chars().all(|c| matches!(c, '0' | '1')) {
        let trimmed = value.trim_start_matches('0');
        return if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() };
    }

    value.to_ascii_lowercase().trim().to_string()
}

/// Convert a raw tick count to nanoseconds via the file's own timescale, or
/// treat ticks as already-nanoseconds when no `$timescale` was declared.
pub fn normalize_time(ticks: u64, timescale: Option<&Timescale>) -> f64 {
    timescale.map(|ts| ts.to_ns(ticks)).unwrap_or(ticks as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_vcd::TimescaleUnit;

    #[test]
    fn strips_array_suffix_only_when_bracket_pair_present() {
        assert_eq!(normalize_signal_name("count[3:0]"), "count");
        assert_eq!(normalize_signal_name("count"), "count");
        assert_eq!(normalize_signal_name("weird[unclosed"), "weird[unclosed");
    }

    #[test]
    fn collapses_unknown_states_to_single_x() {
        assert_eq!(normalize_value("x"), "x");
        assert_eq!(normalize_value("Z"), "x");
        assert_eq!(normalize_value("-"), "x");
        assert_eq!(normalize_value("xxxx"), "x");
        assert_eq!(normalize_value("UUUU"), "x");
    }

    #[test]
    fn strips_leading_zeros_but_keeps_one_for_all_zero() {
        assert_eq!(normalize_value("0011"), "11");
        assert_eq!(normalize_value("0000"), "0");
        assert_eq!(normalize_value("1010"), "1010");
    }

    #[test]
    fn time_conversion_uses_the_parsed_timescale() {
        let ts = Timescale::new(10, TimescaleUnit::Ps);
        assert!((normalize_time(100, Some(&ts)) - 1.0).abs() < 1e-9);
        assert_eq!(normalize_time(42, None), 42.0);
    }
}
