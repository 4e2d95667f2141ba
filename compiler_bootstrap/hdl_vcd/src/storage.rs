//! Binary signal store and time-indexed history (spec component I).
//!
//! Grounded on `hdltools/vcd/efficient_storage.py`: values are packed two
//! bits per state (`SignalState`) instead of kept as VCD value strings, and
//! history lookups use binary search over a sorted time axis rather than a
//! linear scan.

use std::collections::HashMap;

use crate::error::{VcdError, VcdResult};

/// One bit of a VCD signal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalState {
    Zero = 0b00,
    One = 0b01,
    Unknown = 0b10,
    HighZ = 0b11,
}

impl SignalState {
    fn from_char(c: char) -> Self {
        match c {
            '0' => SignalState::Zero,
            '1' => SignalState::One,
            'z' | 'Z' => SignalState::HighZ,
            _ => SignalState::Unknown,
        }
    }

    fn to_char(self) -> char {
        match self {
            SignalState::Zero => '0',
            SignalState::One => '1',
            SignalState::Unknown => 'x',
            SignalState::HighZ => 'z',
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => SignalState::Zero,
            0b01 => SignalState::One,
            0b10 => SignalState::Unknown,
            _ => SignalState::HighZ,
        }
    }
}

/// A multi-bit signal value, two bits per state, packed four states per byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinarySignalValue {
    width: u32,
    packed: Vec<u8>,
}

impl BinarySignalValue {
    pub fn new(width: u32) -> Self {
        Self { width, packed: vec![0u8; ((width + 3) / 4) as usize] }
    }

    /// Parse a VCD value string: `"b1010"`/`"h2a"`/`"o17"` (explicit radix
    /// prefix) or a bare string of `{0,1,x,X,z,Z}` (scalar changes).
    pub fn from_vcd_str(width: u32, value: &str) -> VcdResult<Self> {
        let bits: String = if let Some(rest) = value.strip_prefix('b') {
            rest.to_string()
        } else if let Some(rest) = value.strip_prefix('h') {
            let n = u64::from_str_radix(rest, 16)
                .map_err(|_| VcdError::parse(format!("invalid hex value {value:?}"), 0))?;
            format!("{n:b}")
        } else if let Some(rest) = value.strip_prefix('o') {
            let n = u64::from_str_radix(rest, 8)
                .map_err(|_| VcdError::parse(format!("invalid octal value {value:?}"), 0))?;
            format!("{n:b}")
        } else {
            value.to_string()
        };
        let mut out = Self::new(width);
        // Pad on the left (most-significant) with zero to width, then set
        // least-significant-first, matching the source's `zfill` + reversed-iteration.
        let padded = if (bits.len() as u32) < width {
            format!("{}{}", "0".repeat((width - bits.len() as u32) as usize), bits)
        } else {
            bits
        };
        for (i, c) in padded.chars().rev().enumerate() {
            if i as u32 >= width {
                break;
            }
            out.set_bit(i as u32, SignalState::from_char(c));
        }
        Ok(out)
    }

    pub fn from_int(width: u32, value: u64) -> Self {
        let mut out = Self::new(width);
        for i in 0..width {
            if (value >> i) & 1 == 1 {
                out.set_bit(i, SignalState::One);
            }
        }
        out
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_bit(&mut self, index: u32, state: SignalState) {
        assert!(index < self.width, "bit index {index} out of range for width {}", self.width);
        let byte_idx = (index / 4) as usize;
        let bit_idx = (index % 4) * 2;
        self.packed[byte_idx] &= !(0b11 << bit_idx);
        self.packed[byte_idx] |= (state as u8) << bit_idx;
    }

    pub fn get_bit(&self, index: u32) -> VcdResult<SignalState> {
        if index >= self.width {
            return Err(VcdError::BitOutOfRange { index, width: self.width });
        }
        let byte_idx = (index / 4) as usize;
        let bit_idx = (index % 4) * 2;
        Ok(SignalState::from_bits(self.packed[byte_idx] >> bit_idx))
    }

    /// Integer value, or `None` if any bit is unknown/high-Z.
    pub fn to_int(&self) -> Option<u64> {
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get_bit(i).unwrap() {
                SignalState::Zero => {}
                SignalState::One => result |= 1 << i,
                _ => return None,
            }
        }
        Some(result)
    }

    /// VCD-style `b<bits>` rendering, most-significant bit first.
    pub fn to_vcd_string(&self) -> String {
        let mut chars = String::with_capacity(self.width as usize + 1);
        chars.push('b');
        for i in (0..self.width).rev() {
            chars.push(self.get_bit(i).unwrap().to_char());
        }
        chars
    }
}

/// Sorted-time history for one signal, with binary-search point/range queries.
#[derive(Debug, Clone, Default)]
pub struct TimeIndexedHistory {
    times: Vec<u64>,
    values: Vec<BinarySignalValue>,
}

impl TimeIndexedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value at `time` if it matches the last entry; otherwise
    /// insert it in sorted order via binary search.
    pub fn add_change(&mut self, time: u64, value: BinarySignalValue) {
        match self.times.binary_search(&time) {
            Ok(idx) => self.values[idx] = value,
            Err(idx) => {
                self.times.insert(idx, time);
                self.values.insert(idx, value);
            }
        }
    }

    /// Value at `time`: the value from the latest change at or before `time`,
    /// or `None` if `time` precedes the first change.
    pub fn get_value_at(&self, time: u64) -> Option<&BinarySignalValue> {
        let idx = match self.times.binary_search(&time) {
            Ok(idx) => idx,
            Err(idx) => {
                if idx == 0 {
                    return None;
                }
                idx - 1
            }
        };
        self.values.get(idx)
    }

    pub fn get_changes_in_range(&self, start: u64, end: u64) -> Vec<(u64, &BinarySignalValue)> {
        let start_idx = self.times.partition_point(|&t| t < start);
        let end_idx = self.times.partition_point(|&t| t <= end);
        (start_idx..end_idx).map(|i| (self.times[i], &self.values[i])).collect()
    }

    pub fn all_changes(&self) -> impl Iterator<Item = (u64, &BinarySignalValue)> {
        self.times.iter().copied().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One declared VCD variable: identity, width, scope, and its change history.
#[derive(Debug, Clone)]
pub struct VcdVariable {
    pub id: String,
    pub name: String,
    pub var_type: String,
    pub width: u32,
    pub scope_path: Vec<String>,
    pub aliases: Vec<(Vec<String>, String)>,
    pub history: TimeIndexedHistory,
    pub current_value: Option<BinarySignalValue>,
    pub last_changed: u64,
}

impl VcdVariable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, var_type: impl Into<String>, width: u32, scope_path: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            var_type: var_type.into(),
            width,
            scope_path,
            aliases: Vec::new(),
            history: TimeIndexedHistory::new(),
            current_value: None,
            last_changed: 0,
        }
    }

    pub fn reference(&self) -> String {
        let mut parts = self.scope_path.clone();
        parts.push(self.name.clone());
        parts.join(".")
    }

    pub fn get_value_at(&self, time: u64) -> Option<&BinarySignalValue> {
        self.history.get_value_at(time)
    }

    pub fn get_changes_in_range(&self, start: u64, end: u64) -> Vec<(u64, &BinarySignalValue)> {
        self.history.get_changes_in_range(start, end)
    }
}

/// Name / scope-prefix / full-path lookup tables over declared variables.
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    name_index: HashMap<String, Vec<String>>,
    scope_index: HashMap<String, Vec<String>>,
    full_path_index: HashMap<String, String>,
}

impl VariableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, var_id: &str, name: &str, scope_path: &[String]) {
        self.name_index.entry(name.to_string()).or_default().push(var_id.to_string());

        for i in 0..scope_path.len() {
            let partial = scope_path[..=i].join(".");
            self.scope_index.entry(partial).or_default().push(var_id.to_string());
        }
        if scope_path.is_empty() {
            self.scope_index.entry(String::new()).or_default().push(var_id.to_string());
        }

        let mut full = scope_path.to_vec();
        full.push(name.to_string());
        self.full_path_index.insert(full.join("."), var_id.to_string());
    }

    pub fn find_by_name(&self, name: &str) -> &[String] {
        self.name_index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_by_scope(&self, scope: &str) -> &[String] {
        self.scope_index.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Glob search over full-path keys only (`*` any run, `?` one char).
    pub fn find_by_pattern(&self, pattern: &str) -> Vec<String> {
        self.full_path_index
            .iter()
            .filter(|(path, _)| glob_match(pattern, path))
            .map(|(_, id)| id.clone())
            .collect()
    }
}

/// Minimal shell-glob matcher (`*`, `?`) over full-path strings.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_rec(&p, &t)
}

fn glob_match_rec(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => glob_match_rec(&p[1..], t) || (!t.is_empty() && glob_match_rec(p, &t[1..])),
        Some('?') => !t.is_empty() && glob_match_rec(&p[1..], &t[1..]),
        Some(c) => t.first() == Some(c) && glob_match_rec(&p[1..], &t[1..]),
    }
}

/// Owns all declared variables for one parse, keyed by VCD variable id.
#[derive(Debug, Clone, Default)]
pub struct VcdStorage {
    pub variables: HashMap<String, VcdVariable>,
    pub index: VariableIndex,
    conversion_cache: HashMap<(u32, String), BinarySignalValue>,
}

impl VcdStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, id: &str, name: &str, var_type: &str, width: u32, scope_path: Vec<String>) -> &mut VcdVariable {
        self.index.add_variable(id, name, &scope_path);
        self.variables.insert(id.to_string(), VcdVariable::new(id, name, var_type, width, scope_path));
        self.variables.get_mut(id).unwrap()
    }

    pub fn set_value_str(&mut self, id: &str, time: u64, value: &str) -> VcdResult<()> {
        let width = match self.variables.get(id) {
            Some(v) => v.width,
            None => return Err(VcdError::unknown_variable(id)),
        };
        let key = (width, value.to_string());
        let binary = if let Some(cached) = self.conversion_cache.get(&key) {
            cached.clone()
        } else {
            let parsed = BinarySignalValue::from_vcd_str(width, value)?;
            self.conversion_cache.insert(key, parsed.clone());
            parsed
        };
        self.set_value(id, time, binary)
    }

    pub fn set_value(&mut self, id: &str, time: u64, value: BinarySignalValue) -> VcdResult<()> {
        let var = self.variables.get_mut(id).ok_or_else(|| VcdError::unknown_variable(id))?;
        var.history.add_change(time, value.clone());
        var.current_value = Some(value);
        var.last_changed = time;
        Ok(())
    }

    pub fn get_value(&self, id: &str, time: Option<u64>) -> Option<&BinarySignalValue> {
        let var = self.variables.get(id)?;
        match time {
            None => var.current_value.as_ref(),
            Some(t) => var.get_value_at(t),
        }
    }

    pub fn find_variables(&self, name: Option<&str>, scope: Option<&str>, pattern: Option<&str>) -> Vec<&VcdVariable> {
        let ids: Vec<String> = if let Some(pattern) = pattern {
            self.index.find_by_pattern(pattern)
        } else if let (Some(name), Some(scope)) = (name, scope) {
            let by_name: std::collections::HashSet<&String> = self.index.find_by_name(name).iter().collect();
            let by_scope: std::collections::HashSet<&String> = self.index.find_by_scope(scope).iter().collect();
            by_name.intersection(&by_scope).map(|s| (*s).clone()).collect()
        } else if let Some(name) = name {
            self.index.find_by_name(name).to_vec()
        } else if let Some(scope) = scope {
            self.index.find_by_scope(scope).to_vec()
        } else {
            self.variables.keys().cloned().collect()
        };
        ids.iter().filter_map(|id| self.variables.get(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_value_round_trips_through_vcd_string() {
        let v = BinarySignalValue::from_vcd_str(8, "b1010").unwrap();
        assert_eq!(v.to_int(), Some(0b1010));
        assert_eq!(v.to_vcd_string(), "b00001010");
    }

    #[test]
    fn unknown_bit_makes_integer_conversion_fail() {
        let v = BinarySignalValue::from_vcd_str(4, "b10x1").unwrap();
        assert_eq!(v.to_int(), None);
    }

    #[test]
    fn history_overwrites_same_time_and_binary_searches_others() {
        let mut h = TimeIndexedHistory::new();
        h.add_change(0, BinarySignalValue::from_int(1, 0));
        h.add_change(10, BinarySignalValue::from_int(1, 1));
        h.add_change(10, BinarySignalValue::from_int(1, 0));
        h.add_change(20, BinarySignalValue::from_int(1, 1));
        assert_eq!(h.len(), 3);
        assert_eq!(h.get_value_at(5).unwrap().to_int(), Some(0));
        assert_eq!(h.get_value_at(10).unwrap().to_int(), Some(0));
        assert_eq!(h.get_value_at(15).unwrap().to_int(), Some(0));
        assert!(h.get_value_at(1_000_000).is_some());
    }

    #[test]
    fn range_query_is_inclusive_of_both_ends() {
        let mut h = TimeIndexedHistory::new();
        h.add_change(0, BinarySignalValue::from_int(1, 0));
        h.add_change(10, BinarySignalValue::from_int(1, 1));
        h.add_change(20, BinarySignalValue::from_int(1, 0));
        let changes = h.get_changes_in_range(10, 20);
        assert_eq!(changes.iter().map(|(t, _)| *t).collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn index_supports_name_scope_and_glob_lookups() {
        let mut idx = VariableIndex::new();
        idx.add_variable("v1", "clk", &["top".to_string(), "cpu".to_string()]);
        idx.add_variable("v2", "clk", &["top".to_string(), "gpu".to_string()]);
        assert_eq!(idx.find_by_name("clk").len(), 2);
        assert_eq!(idx.find_by_scope("top.cpu"), &["v1".to_string()]);
        assert_eq!(idx.find_by_pattern("top.*.clk").len(), 2);
        assert_eq!(idx.find_by_pattern("top.cpu.clk"), vec!["v1".to_string()]);
    }
}
