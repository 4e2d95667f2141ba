//! Multi-radix pattern parsing and don't-care bit matching (spec component G).

use hdl_common::{HdlError, HdlResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A normalized binary string over `{0, 1, x}` (case is folded to lowercase
/// `x` at construction so that `Pattern(str(p)) == p` holds).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    bits: String,
}

const HELP_MESSAGE: &str = "supported pattern formats:\n  \
    decimal digits only, e.g. \"15\" -> binary 1111\n  \
    0x / 0X prefix, hexadecimal with nibble-wide don't-cares, e.g. \"0xFx\" -> 1111xxxx\n  \
    h / H suffix, hexadecimal, e.g. \"FFh\" -> 11111111\n  \
    0b / 0B or b / B prefix, binary with bit-wide don't-cares, e.g. \"b10x1\" -> 10x1\n  \
    pure don't-care, e.g. \"xxxx\" -> xxxx";

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() > suffix.len() && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        Some(&s[..s.len() - suffix.len()])
    } else {
        None
    }
}

fn hex_nibble_to_bin(c: char, input: &str) -> HdlResult<String> {
    if c == 'x' || c == 'X' {
        return Ok("xxxx".to_string());
    }
    match c.to_digit(16) {
        Some(d) => Ok(format!("{d:04b}")),
        None => Err(HdlError::invalid_input(
            format!("invalid hexadecimal digit {c:?}"),
            input.to_string(),
            HELP_MESSAGE.to_string(),
        )),
    }
}

fn hex_to_bin(hex: &str, original: &str) -> HdlResult<String> {
    if hex.is_empty() {
        return Err(HdlError::invalid_input(
            "empty hexadecimal pattern",
            original.to_string(),
            HELP_MESSAGE.to_string(),
        ));
    }
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        out.push_str(&hex_nibble_to_bin(c, original)?);
    }
    Ok(out)
}

fn validate_binary(bits: &str, original: &str) -> HdlResult<String> {
    if bits.is_empty() {
        return Err(HdlError::invalid_input(
            "empty binary pattern",
            original.to_string(),
            HELP_MESSAGE.to_string(),
        ));
    }
    for c in bits.chars() {
        if !matches!(c, '0' | '1' | 'x' | 'X') {
            return Err(HdlError::invalid_input(
                format!("invalid binary digit {c:?}"),
                original.to_string(),
                HELP_MESSAGE.to_string(),
            ));
        }
    }
    Ok(bits.chars().map(|c| if c == 'X' { 'x' } else { c }).collect())
}

impl Pattern {
    pub fn from_integer(value: u64) -> Self {
        Pattern { bits: format!("{value:b}") }
    }

    /// Construction algorithm per spec section 4.5.
    pub fn parse(input: &str) -> HdlResult<Self> {
        if input.is_empty() {
            return Err(HdlError::invalid_input(
                "pattern of zero length is not allowed",
                input.to_string(),
                HELP_MESSAGE.to_string(),
            ));
        }

        let bits = if let Some(rest) = strip_prefix_ci(input, "0x") {
            hex_to_bin(rest, input)?
        } else if let Some(rest) = strip_prefix_ci(input, "0b") {
            validate_binary(rest, input)?
        } else if let Some(rest) = strip_suffix_ci(input, "h") {
            hex_to_bin(rest, input)?
        } else if let Some(rest) = strip_prefix_ci(input, "b") {
            validate_binary(rest, input)?
        } else if input.chars().all(|c| c.is_ascii_digit()) {
            let value: u64 = input.parse().map_err(|_| {
                HdlError::invalid_input("decimal value out of range", input.to_string(), HELP_MESSAGE.to_string())
            })?;
            format!("{value:b}")
        } else if input.chars().all(|c| c == 'x' || c == 'X') {
            "x".repeat(input.len())
        } else {
            return Err(HdlError::invalid_input(
                "ambiguous pattern format",
                input.to_string(),
                HELP_MESSAGE.to_string(),
            ));
        };

        Ok(Pattern { bits })
    }

    pub fn as_str(&self) -> &str {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        !self.bits.chars().any(|c| c == 'x')
    }

    pub fn to_integer(&self) -> HdlResult<u64> {
        if !self.is_numeric() {
            return Err(HdlError::semantic_error("pattern has don't-care bits and is not numeric"));
        }
        u64::from_str_radix(&self.bits, 2)
            .map_err(|e| HdlError::semantic_error(format!("pattern does not fit a 64-bit integer: {e}")))
    }

    fn zero_extend<'a>(a: &'a str, b: &'a str) -> (String, String) {
        let width = a.len().max(b.len());
        (format!("{:0>width$}", a, width = width), format!("{:0>width$}", b, width = width))
    }

    /// Bitwise match: zero-extend the shorter side, then compare bit by
    /// bit, ignoring positions where either side is `x`.
    pub fn matches(&self, value: &str) -> bool {
        let value_norm: String = value.chars().map(|c| if c == 'X' { 'x' } else { c }).collect();
        let (pat, val) = Self::zero_extend(&self.bits, &value_norm);
        pat.chars().zip(val.chars()).all(|(p, v)| p == 'x' || v == 'x' || p == v)
    }

    pub fn compare(&self, value: &str, op: CompareOp) -> HdlResult<bool> {
        match op {
            CompareOp::Eq => Ok(self.matches(value)),
            CompareOp::Ne => Ok(!self.matches(value)),
            _ => {
                if !self.is_numeric() {
                    return Err(HdlError::semantic_error(
                        "ordering comparisons require a pattern with no don't-care bits",
                    ));
                }
                let value_pattern = Pattern { bits: value.to_string() };
                if !value_pattern.is_numeric() {
                    return Err(HdlError::semantic_error(
                        "ordering comparisons require a value with no don't-care bits",
                    ));
                }
                let lhs = self.to_integer()?;
                let rhs = value_pattern.to_integer()?;
                Ok(match op {
                    CompareOp::Lt => lhs < rhs,
                    CompareOp::Le => lhs <= rhs,
                    CompareOp::Gt => lhs > rhs,
                    CompareOp::Ge => lhs >= rhs,
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                })
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dont_care_match_examples() {
        assert!(!Pattern::parse("1x1x").unwrap().matches("1010"));
        assert!(Pattern::parse("1x1x").unwrap().matches("1111"));
        assert!(Pattern::parse("0xFF").unwrap().matches("11111111"));
        assert!(Pattern::parse("15").unwrap().matches("1111"));
    }

    #[test]
    fn zero_length_rejected() {
        assert!(Pattern::parse("").is_err());
    }

    #[test]
    fn ambiguous_format_gives_help() {
        let err = Pattern::parse("1g0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("supported pattern formats"));
    }

    #[test]
    fn round_trip_via_display() {
        let p = Pattern::parse("0xAx").unwrap();
        let round_tripped = Pattern::parse(&format!("0b{p}")).unwrap();
        assert_eq!(p, round_tripped);
    }

    #[test]
    fn numeric_comparisons() {
        let p = Pattern::parse("15").unwrap();
        assert!(p.compare("1110", CompareOp::Gt).unwrap());
        assert!(Pattern::parse("1x1x").unwrap().compare("0", CompareOp::Lt).is_err());
    }
}
