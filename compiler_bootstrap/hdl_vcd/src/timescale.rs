//! VCD `$timescale` parsing and normalization to a common unit (nanoseconds).

use crate::error::{VcdError, VcdResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimescaleUnit {
    Fs,
    Ps,
    Ns,
    Us,
}

impl TimescaleUnit {
    /// Multiplier to convert a raw count in this unit to nanoseconds,
    /// per spec.md section 4.6: fs -> 1e-6 ns, ps -> 1e-3 ns, ns -> 1, us -> 1e3.
    pub fn ns_multiplier(self) -> f64 {
        match self {
            TimescaleUnit::Fs => 1e-6,
            TimescaleUnit::Ps => 1e-3,
            TimescaleUnit::Ns => 1.0,
            TimescaleUnit::Us => 1e3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timescale {
    pub magnitude: u64,
    pub unit: TimescaleUnit,
}

impl Timescale {
    pub fn new(magnitude: u64, unit: TimescaleUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Parse a `$timescale` body such as `"1ns"`, `"10 ps"`, `"100us"`.
    pub fn parse(body: &str) -> VcdResult<Self> {
        let body = body.trim();
        let split_at = body
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| VcdError::parse(format!("malformed timescale {body:?}: missing unit"), 0))?;
        let (num_str, unit_str) = body.split_at(split_at);
        let num_str = num_str.trim();
        let unit_str = unit_str.trim();
        let magnitude: u64 = num_str
            .parse()
            .map_err(|_| VcdError::parse(format!("invalid timescale magnitude {num_str:?}"), 0))?;
        let unit = match unit_str {
            "fs" => TimescaleUnit::Fs,
            "ps" => TimescaleUnit::Ps,
            "ns" => TimescaleUnit::Ns,
            "us" => TimescaleUnit::Us,
            other => return Err(VcdError::parse(format!("unknown timescale unit {other:?}"), 0)),
        };
        Ok(Self { magnitude, unit })
    }

    /// Convert a raw tick count recorded under this timescale into nanoseconds.
    pub fn to_ns(self, ticks: u64) -> f64 {
        ticks as f64 * self.magnitude as f64 * self.unit.ns_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(Timescale::parse("1ns").unwrap(), Timescale::new(1, TimescaleUnit::Ns));
        assert_eq!(Timescale::parse("10 ps").unwrap(), Timescale::new(10, TimescaleUnit::Ps));
        assert_eq!(Timescale::parse("100us").unwrap(), Timescale::new(100, TimescaleUnit::Us));
    }

    #[test]
    fn normalizes_to_nanoseconds() {
        let ts = Timescale::new(1, TimescaleUnit::Fs);
        assert!((ts.to_ns(1_000_000) - 1.0).abs() < 1e-9);
        let ts = Timescale::new(10, TimescaleUnit::Ps);
        assert!((ts.to_ns(100) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(Timescale::parse("1s").is_err());
    }
}
