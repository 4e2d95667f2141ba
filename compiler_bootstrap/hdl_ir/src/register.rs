//! Register fields, registers, and the memory-mapped interface (spec
//! component E).

use hdl_common::{HdlError, HdlResult};
use hdl_expr::{BinaryOp, Expr};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    R,
    W,
    Rw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    Integer(u64),
    Expression(Expr),
}

#[derive(Debug, Clone)]
pub struct RegisterField {
    pub name: String,
    pub high: u32,
    pub low: u32,
    pub access: Access,
    pub default: FieldDefault,
    pub properties: HashMap<String, String>,
}

impl RegisterField {
    pub fn new_bit(name: impl Into<String>, bit: u32, access: Access, default: FieldDefault) -> Self {
        Self { name: name.into(), high: bit, low: bit, access, default, properties: HashMap::new() }
    }

    pub fn new_range(
        name: impl Into<String>,
        high: u32,
        low: u32,
        access: Access,
        default: FieldDefault,
    ) -> HdlResult<Self> {
        if high < low {
            return Err(HdlError::semantic_error(format!("field high bit {high} is below low bit {low}")));
        }
        Ok(Self { name: name.into(), high, low, access, default, properties: HashMap::new() })
    }

    pub fn range(&self) -> Vec<u32> {
        (self.low..=self.high).collect()
    }

    pub fn slice_size(&self) -> u32 {
        self.high - self.low + 1
    }

    pub fn dumps_slice(&self) -> String {
        if self.high == self.low {
            format!("[{}]", self.high)
        } else {
            format!("[{}:{}]", self.high, self.low)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Register {
    pub name: String,
    pub width: u32,
    pub address: u64,
    pub fields: Vec<RegisterField>,
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterDefault {
    Integer(u64),
    Expression(Expr),
}

impl Register {
    pub fn new(name: impl Into<String>, width: u32, address: u64) -> Self {
        Self { name: name.into(), width, address, fields: Vec::new(), properties: HashMap::new() }
    }

    pub fn used_bits(&self) -> HashSet<u32> {
        self.fields.iter().flat_map(|f| f.range()).collect()
    }

    /// Returns the subset of `bits` that clash with an existing field, or
    /// `None` if there is no overlap.
    pub fn check_bit_clash(&self, bits: &[u32]) -> Option<Vec<u32>> {
        let used = self.used_bits();
        let clash: Vec<u32> = bits.iter().copied().filter(|b| used.contains(b)).collect();
        if clash.is_empty() {
            None
        } else {
            Some(clash)
        }
    }

    pub fn add_field(&mut self, field: RegisterField) -> HdlResult<()> {
        if let Some(clash) = self.check_bit_clash(&field.range()) {
            return Err(HdlError::semantic_error(format!(
                "field {:?} clashes with existing fields at bits {clash:?}",
                field.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn get_field(&self, name: &str) -> HdlResult<&RegisterField> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| HdlError::lookup_failure(format!("field {name:?} not found in register {:?}", self.name)))
    }

    /// OR of `1 << bit` for every bit belonging to a non-read-only field.
    pub fn write_mask(&self) -> u64 {
        self.fields
            .iter()
            .filter(|f| f.access != Access::R)
            .flat_map(|f| f.range())
            .fold(0u64, |mask, bit| mask | (1u64 << bit))
    }

    /// Read mask from the `read_mask` property, defaulting to all ones.
    pub fn read_mask(&self) -> u64 {
        self.properties
            .get("read_mask")
            .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .unwrap_or(u64::MAX)
    }

    pub fn apply_read_mask(&self, value: u64) -> u64 {
        value & self.read_mask()
    }

    /// Integer default when every field carries an integer default,
    /// otherwise a concatenation expression built from each field's
    /// default (integer or expression) shifted into place, highest field
    /// first.
    pub fn default_value(&self) -> RegisterDefault {
        if self.fields.iter().all(|f| matches!(f.default, FieldDefault::Integer(_))) {
            let value = self.fields.iter().fold(0u64, |acc, f| match f.default {
                FieldDefault::Integer(d) => acc | (d << f.low),
                FieldDefault::Expression(_) => acc,
            });
            return RegisterDefault::Integer(value);
        }

        let mut sorted: Vec<&RegisterField> = self.fields.iter().collect();
        sorted.sort_by(|a, b| b.high.cmp(&a.high));

        let mut acc: Option<Expr> = None;
        for field in sorted {
            let default_expr = match &field.default {
                FieldDefault::Integer(v) => Expr::literal(*v as i64),
                FieldDefault::Expression(e) => e.clone(),
            };
            let shifted = if field.low == 0 {
                default_expr
            } else {
                Expr::combine(&default_expr, BinaryOp::Shl, &Expr::literal(field.low as i64))
            };
            acc = Some(match acc {
                None => shifted,
                Some(prev) => Expr::combine(&prev, BinaryOp::Or, &shifted),
            });
        }
        RegisterDefault::Expression(acc.unwrap_or(Expr::literal(0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Byte,
    Word,
}

#[derive(Debug, Clone)]
pub struct FlagPort {
    pub name: String,
    pub direction: crate::port::Direction,
    pub target_register: String,
    pub target_field: Option<String>,
    pub is_trigger: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryMappedInterface {
    pub reg_size: u32,
    pub addr_mode: AddrMode,
    pub addr_offset: u32,
    pub registers: HashMap<String, Register>,
    pub ports: HashMap<String, FlagPort>,
    pub parameters: HashMap<String, crate::module::Parameter>,
}

impl MemoryMappedInterface {
    pub fn new(reg_size: u32, addr_mode: AddrMode) -> Self {
        let addr_offset = match addr_mode {
            AddrMode::Byte => reg_size / 8,
            AddrMode::Word => 1,
        };
        Self {
            reg_size,
            addr_mode,
            addr_offset,
            registers: HashMap::new(),
            ports: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    pub fn add_register(&mut self, register: Register) -> HdlResult<()> {
        if self.registers.contains_key(&register.name) {
            return Err(HdlError::semantic_error(format!("duplicate register name {:?}", register.name)));
        }
        self.registers.insert(register.name.clone(), register);
        Ok(())
    }

    pub fn get_register(&self, name: &str) -> HdlResult<&Register> {
        self.registers
            .get(name)
            .ok_or_else(|| HdlError::lookup_failure(format!("register {name:?} not found")))
    }

    pub fn add_port(&mut self, port: FlagPort) -> HdlResult<()> {
        if self.ports.contains_key(&port.name) {
            return Err(HdlError::semantic_error(format!("duplicate port name {:?}", port.name)));
        }
        self.ports.insert(port.name.clone(), port);
        Ok(())
    }

    pub fn add_parameter(&mut self, param: crate::module::Parameter) -> HdlResult<()> {
        if self.parameters.contains_key(&param.name) {
            return Err(HdlError::semantic_error(format!("duplicate parameter name {:?}", param.name)));
        }
        self.parameters.insert(param.name.clone(), param);
        Ok(())
    }

    /// `next_available_address`: the smallest offset aligned to
    /// `addr_offset` not already occupied, or `max + addr_offset` if none
    /// is free below the current maximum.
    pub fn next_available_address(&self) -> u64 {
        let mut used: Vec<u64> = self.registers.values().map(|r| r.address).collect();
        used.sort_unstable();
        let offset = self.addr_offset.max(1) as u64;
        let mut candidate = 0u64;
        for addr in &used {
            if candidate < *addr {
                return candidate;
            }
            if candidate == *addr {
                candidate += offset;
            }
        }
        candidate
    }

    pub fn dumps(&self) -> String {
        let mut out = format!("mmap(reg_size={}, addr_mode={:?})\n", self.reg_size, self.addr_mode);
        let mut names: Vec<&String> = self.registers.keys().collect();
        names.sort();
        for name in names {
            let reg = &self.registers[name];
            out.push_str(&format!("  register {} @ 0x{:x} width={}\n", reg.name, reg.address, reg.width));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_fields_are_rejected() {
        let mut reg = Register::new("CTRL", 32, 0);
        reg.add_field(RegisterField::new_range("a", 3, 0, Access::Rw, FieldDefault::Integer(0)).unwrap())
            .unwrap();
        let clash = reg.add_field(RegisterField::new_range("b", 5, 2, Access::Rw, FieldDefault::Integer(0)).unwrap());
        assert!(clash.is_err());
    }

    #[test]
    fn write_mask_excludes_read_only_bits() {
        let mut reg = Register::new("STATUS", 8, 0);
        reg.add_field(RegisterField::new_bit("busy", 0, Access::R, FieldDefault::Integer(0))).unwrap();
        reg.add_field(RegisterField::new_bit("enable", 1, Access::Rw, FieldDefault::Integer(0))).unwrap();
        assert_eq!(reg.write_mask(), 0b10);
    }

    #[test]
    fn empty_register_reads_as_all_ones_mask_by_default() {
        let reg = Register::new("EMPTY", 8, 0);
        assert_eq!(reg.apply_read_mask(0xff), 0xff);
    }

    #[test]
    fn next_available_address_fills_gaps() {
        let mut mmap = MemoryMappedInterface::new(32, AddrMode::Byte);
        mmap.add_register(Register::new("A", 32, 0)).unwrap();
        mmap.add_register(Register::new("C", 32, 8)).unwrap();
        assert_eq!(mmap.next_available_address(), 4);
    }
}
