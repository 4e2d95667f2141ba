//! Trigger condition descriptors and the trigger-condition mini-language
//! (spec.md section 6), grounded on `hdltools/vcd/trigger/__init__.py`'s
//! `VCDTriggerDescriptor`.

use hdl_pattern::Pattern;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{TriggerError, TriggerResult};

/// One atomic trigger condition: a scoped variable compared against a
/// pattern, optionally restricted to a bit slice of the full signal.
#[derive(Debug, Clone)]
pub struct TriggerDescriptor {
    scope: Vec<String>,
    name: String,
    value: Pattern,
    slice: Option<(u32, u32)>,
    vcd_var: Option<String>,
    negate: bool,
}

impl TriggerDescriptor {
    pub fn new(scope: Vec<String>, name: impl Into<String>, value: Pattern) -> Self {
        Self { scope, name: name.into(), value, slice: None, vcd_var: None, negate: false }
    }

    pub fn with_slice(mut self, hi: u32, lo: u32) -> Self {
        self.slice = Some((hi, lo));
        self
    }

    pub fn with_vcd_var(mut self, vcd_var: impl Into<String>) -> Self {
        self.vcd_var = Some(vcd_var.into());
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Pattern {
        &self.value
    }

    pub fn slice(&self) -> Option<(u32, u32)> {
        self.slice
    }

    pub fn vcd_var(&self) -> Option<&str> {
        self.vcd_var.as_deref()
    }

    pub fn inverted(&self) -> bool {
        self.negate
    }

    /// `scope::name` descriptor syntax: `scope::scope::name[hi:lo] == value`
    /// (or `!=`). The slice is stored on the descriptor; expanding it into
    /// a don't-care-padded full-width pattern happens in [`Self::match_value`]
    /// once the target signal's width is known.
    pub fn parse(descriptor: &str) -> TriggerResult<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^\s*([A-Za-z0-9_:]+?)(?:\[(\d+):(\d+)\])?\s*(==|!=)\s*([A-Za-z0-9xX]+h?)\s*$").unwrap()
        });

        let caps = re
            .captures(descriptor)
            .ok_or_else(|| TriggerError::invalid_descriptor(descriptor, "does not match scope::name[hi:lo] (==|!=) value"))?;

        let path = &caps[1];
        let mut fragments: Vec<&str> = path.split("::").collect();
        let name = fragments
            .pop()
            .ok_or_else(|| TriggerError::invalid_descriptor(descriptor, "missing variable name"))?
            .to_string();
        let scope: Vec<String> = fragments.into_iter().map(str::to_string).collect();

        let slice = match (caps.get(2), caps.get(3)) {
            (Some(hi), Some(lo)) => {
                let hi: u32 = hi.as_str().parse().map_err(|_| TriggerError::invalid_descriptor(descriptor, "invalid slice high bit"))?;
                let lo: u32 = lo.as_str().parse().map_err(|_| TriggerError::invalid_descriptor(descriptor, "invalid slice low bit"))?;
                Some((hi, lo))
            }
            _ => None,
        };

        let negate = &caps[4] == "!=";
        let value = Pattern::parse(&caps[5]).map_err(|e| TriggerError::invalid_descriptor(descriptor, e.to_string()))?;

        Ok(Self { scope, name, value, slice, vcd_var: None, negate })
    }

    /// Match variable identity: prefer the VCD variable id when both sides
    /// carry one, otherwise compare scope and name.
    pub fn match_var(&self, scope: &[String], name: &str, vcd_var: Option<&str>) -> bool {
        if let (Some(a), Some(b)) = (vcd_var, self.vcd_var.as_deref()) {
            return a == b;
        }
        self.scope == scope && self.name == name
    }

    /// Match a raw value string, expanding `self.value` into a don't-care
    /// padded full-width pattern first when a bit slice was specified.
    pub fn match_value(&self, value: &str, full_width: Option<u32>) -> bool {
        let matched = match (self.slice, full_width) {
            (Some((hi, lo)), Some(width)) => {
                let padded = pad_to_slice(self.value.as_str(), hi, lo, width);
                Pattern::parse(&format!("0b{padded}")).map(|p| p.matches(value)).unwrap_or(false)
            }
            _ => self.value.matches(value),
        };
        if self.negate {
            !matched
        } else {
            matched
        }
    }

    pub fn match_condition(&self, scope: &[String], name: &str, value: &str, vcd_var: Option<&str>, full_width: Option<u32>) -> bool {
        self.match_var(scope, name, vcd_var) && self.match_value(value, full_width)
    }

    /// Identity used for dedup/lookup: scope, name, and value only (the
    /// source's `__eq__`/`__hash__` ignore `vcd_var` and `negate`).
    fn identity(&self) -> (&[String], &str, &str) {
        (&self.scope, &self.name, self.value.as_str())
    }
}

impl PartialEq for TriggerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}
impl Eq for TriggerDescriptor {}

impl std::hash::Hash for TriggerDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

fn pad_to_slice(literal: &str, hi: u32, lo: u32, width: u32) -> String {
    let slice_width = (hi - lo + 1) as usize;
    let literal = if literal.len() < slice_width {
        format!("{}{}", "0".repeat(slice_width - literal.len()), literal)
    } else {
        literal[literal.len() - slice_width..].to_string()
    };
    let high_x = width.saturating_sub(hi + 1);
    let low_x = lo;
    format!("{}{}{}", "x".repeat(high_x as usize), literal, "x".repeat(low_x as usize))
}

/// Whether a chain of conditions combines with `&&` (condition-table
/// semantics: all in any order) or `=>` (ordered: simple-trigger levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    All,
    Ordered,
}

/// Parse `cond (&&|=>) cond …`. The connective must be used consistently
/// throughout the chain.
pub fn parse_descriptor_chain(source: &str) -> TriggerResult<(ChainMode, Vec<TriggerDescriptor>)> {
    let has_and = source.contains("&&");
    let has_arrow = source.contains("=>");
    if has_and && has_arrow {
        return Err(TriggerError::invalid_descriptor(source, "mixed `&&` and `=>` connectives in one chain"));
    }
    let (mode, sep) = if has_arrow { (ChainMode::Ordered, "=>") } else { (ChainMode::All, "&&") };

    let conds = source
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(TriggerDescriptor::parse)
        .collect::<TriggerResult<Vec<_>>>()?;

    if conds.is_empty() {
        return Err(TriggerError::invalid_descriptor(source, "empty condition chain"));
    }
    Ok((mode, conds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_equality() {
        let d = TriggerDescriptor::parse("top::cpu::clk==1").unwrap();
        assert_eq!(d.scope(), &["top".to_string(), "cpu".to_string()]);
        assert_eq!(d.name(), "clk");
        assert!(!d.inverted());
        assert!(d.match_value("1", None));
    }

    #[test]
    fn parses_negated_with_slice() {
        let d = TriggerDescriptor::parse("top::data[3:0]!=Fh").unwrap();
        assert_eq!(d.slice(), Some((3, 0)));
        assert!(d.inverted());
        // slice [3:0] over an 8-bit signal pads don't-cares in bits 7..4.
        assert!(!d.match_value("00001111", Some(8))); // matches 0xF in low nibble -> negate => false
        assert!(d.match_value("00000000", Some(8)));
    }

    #[test]
    fn chain_mode_detection_and_rejection_of_mixed_connectives() {
        let (mode, conds) = parse_descriptor_chain("a::b==1 && c::d==0").unwrap();
        assert_eq!(mode, ChainMode::All);
        assert_eq!(conds.len(), 2);

        let (mode, conds) = parse_descriptor_chain("a::b==1 => c::d==0").unwrap();
        assert_eq!(mode, ChainMode::Ordered);
        assert_eq!(conds.len(), 2);

        assert!(parse_descriptor_chain("a::b==1 && c::d==0 => e::f==1").is_err());
    }

    #[test]
    fn identity_ignores_vcd_var_and_negate() {
        let a = TriggerDescriptor::parse("a::b==1").unwrap();
        let b = TriggerDescriptor::parse("a::b==1").unwrap().with_vcd_var("v1").negated(true);
        assert_eq!(a, b);
    }
}
