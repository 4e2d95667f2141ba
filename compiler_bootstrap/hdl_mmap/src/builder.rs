//! The two-pass memory-map builder (spec section 4.10): `expand_generates`
//! unrolls `generate` statements by deep-copying their body once per loop
//! value and substituting `{var}` template fragments; `build` then walks
//! the flattened statement list in declaration order, assigning addresses,
//! resolving templates, and producing a [`hdl_ir::MemoryMappedInterface`].

use crate::ast::*;
use crate::error::{MmapError, MmapResult};
use hdl_expr::{Expr, Scope as ExprScope};
use hdl_ir::{
    AddrMode, FieldDefault, FlagPort, MemoryMappedInterface, Parameter as IrParameter, Register, RegisterField,
};
use std::collections::HashMap;

#[derive(Default)]
pub struct Builder {
    register_size: Option<u32>,
    addr_mode: Option<AddrMode>,
    parameters: HashMap<String, i64>,
    param_replace: HashMap<String, i64>,
    templates: HashMap<String, (Vec<(String, PropertyValue)>, Vec<FieldDecl>)>,
    registers: Vec<(String, Register)>,
    ports: Vec<FlagPort>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides for parameter values supplied by the caller (e.g. a CLI
    /// `--param` flag); these take precedence over `param` declarations.
    pub fn with_param_replacements(mut self, values: HashMap<String, i64>) -> Self {
        self.param_replace = values;
        self
    }

    fn param_value(&self, name: &str) -> Option<i64> {
        self.param_replace.get(name).or_else(|| self.parameters.get(name)).copied()
    }

    fn scope(&self) -> ExprScope {
        let mut scope = ExprScope::with_builtins();
        for (name, value) in &self.parameters {
            scope.bind(name.clone(), *value);
        }
        for (name, value) in &self.param_replace {
            scope.bind(name.clone(), *value);
        }
        scope
    }

    /// Deep-copies every `generate` body once per loop value, binding the
    /// loop variable as a parameter during each copy's expansion.
    pub fn expand_generates(stmts: Vec<Stmt>) -> MmapResult<Vec<Stmt>> {
        let mut out = Vec::new();
        for stmt in stmts {
            match stmt {
                Stmt::Generate(gen) => {
                    if gen.end < gen.start {
                        return Err(MmapError::semantic(format!(
                            "generate range {}..{} is empty or inverted",
                            gen.start, gen.end
                        )));
                    }
                    for value in gen.start..gen.end {
                        for inner in Self::expand_generates(gen.body.clone())? {
                            out.push(substitute_stmt(&inner, &gen.var, value));
                        }
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    /// Consumes the flattened, generate-expanded statement list and
    /// produces a [`MemoryMappedInterface`].
    pub fn build(mut self, stmts: Vec<Stmt>) -> MmapResult<MemoryMappedInterface> {
        for stmt in &stmts {
            if let Stmt::RegisterSize(width) = stmt {
                self.register_size = Some(*width);
            }
        }
        if self.register_size.is_none() {
            log::warn!("register size not defined, using 32 bits");
            self.register_size = Some(32);
        }

        for stmt in &stmts {
            if let Stmt::AddrMode(mode) = stmt {
                self.addr_mode = Some(if mode == "byte" { AddrMode::Byte } else { AddrMode::Word });
            }
        }
        if self.addr_mode.is_none() {
            log::warn!("addressing mode not defined, using 'byte'");
            self.addr_mode = Some(AddrMode::Byte);
        }

        let reg_size = self.register_size.unwrap();
        let addr_mode = self.addr_mode.unwrap();
        let mut mmap = MemoryMappedInterface::new(reg_size, addr_mode);

        for stmt in stmts {
            match stmt {
                Stmt::RegisterSize(_) | Stmt::AddrMode(_) => {}
                Stmt::Parameter { name, value } => {
                    self.parameters.insert(name, value);
                }
                Stmt::Template(decl) => {
                    if self.templates.contains_key(&decl.name) {
                        return Err(MmapError::runtime(format!("re-defining template '{}'", decl.name)));
                    }
                    self.templates.insert(decl.name.clone(), (decl.properties, decl.fields));
                }
                Stmt::Register(decl) => self.visit_register(&mut mmap, decl)?,
                Stmt::Port(decl) => self.visit_port(&mut mmap, decl)?,
                Stmt::Generate(_) => {
                    return Err(MmapError::semantic("generate statement survived expansion"));
                }
            }
        }

        for (name, value) in &self.parameters {
            let resolved = self.param_replace.get(name).copied().unwrap_or(*value);
            mmap.add_parameter(IrParameter::new(name.clone(), "integer", Some(Expr::literal(resolved))))
                .map_err(MmapError::from)?;
        }

        Ok(mmap)
    }

    fn visit_register(&mut self, mmap: &mut MemoryMappedInterface, decl: RegisterDecl) -> MmapResult<()> {
        let address = match &decl.address {
            Some(expr) => expr.evaluate(&self.scope())? as u64,
            None => mmap.next_available_address(),
        };

        let (mut properties, fields) = if let Some(template_name) = &decl.template {
            let (props, fields) = self
                .templates
                .get(template_name)
                .ok_or_else(|| MmapError::semantic(format!("unknown template '{template_name}'")))?
                .clone();
            (props, fields)
        } else {
            (Vec::new(), Vec::new())
        };
        properties.extend(decl.properties);
        let fields: Vec<FieldDecl> = fields.into_iter().chain(decl.fields).collect();

        let reg_size = self.register_size.unwrap();
        let mut register = Register::new(decl.name.clone(), reg_size, address);
        for (key, value) in properties {
            register.properties.insert(key, property_to_string(&value));
        }
        for field in fields {
            register.add_field(self.build_field(&field)?).map_err(MmapError::from)?;
        }

        mmap.add_register(register).map_err(MmapError::from)
    }

    fn build_field(&self, decl: &FieldDecl) -> MmapResult<RegisterField> {
        let slice_size = decl.high - decl.low + 1;
        let default = match &decl.default {
            None => FieldDefault::Integer(0),
            Some(DefaultValue::Integer(v)) => {
                let needed = hdl_expr::IntegerConstant::minimum_value_size(*v);
                if slice_size < needed {
                    return Err(MmapError::semantic(format!(
                        "default value 0x{v:x} does not fit in field '{}' with size {slice_size}",
                        decl.name
                    )));
                }
                FieldDefault::Integer(*v)
            }
            Some(DefaultValue::Name(name)) => {
                if self.param_value(name).is_none() {
                    return Err(MmapError::name(name.clone()));
                }
                FieldDefault::Expression(Expr::name(name.clone()))
            }
        };

        let mut field = RegisterField::new_range(decl.name.clone(), decl.high, decl.low, decl.access, default)
            .map_err(MmapError::from)?;
        for (key, value) in &decl.properties {
            field.properties.insert(key.clone(), property_to_string(value));
        }
        Ok(field)
    }

    fn visit_port(&mut self, mmap: &mut MemoryMappedInterface, decl: PortDecl) -> MmapResult<()> {
        let register = mmap
            .get_register(&decl.source_register)
            .map_err(|_| MmapError::semantic(format!("invalid register: {}", decl.source_register)))?;
        if let Some(field_name) = &decl.source_field {
            if !register.has_field(field_name) {
                return Err(MmapError::semantic(format!("invalid field: {field_name}")));
            }
        }
        let port = FlagPort {
            name: decl.name,
            direction: match decl.direction {
                PortDirection::In => hdl_ir::Direction::In,
                PortDirection::Out => hdl_ir::Direction::Out,
            },
            target_register: decl.source_register,
            target_field: decl.source_field,
            is_trigger: decl.is_trigger && decl.direction == PortDirection::Out,
        };
        mmap.add_port(port).map_err(MmapError::from)
    }
}

fn property_to_string(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Str(s) => s.clone(),
        PropertyValue::Int(v) => v.to_string(),
    }
}

/// Replaces every standalone occurrence of `var` and every `{var}`
/// template fragment inside names and string properties with `value`.
fn substitute_stmt(stmt: &Stmt, var: &str, value: i64) -> Stmt {
    match stmt {
        Stmt::Register(decl) => Stmt::Register(RegisterDecl {
            name: substitute_name(&decl.name, var, value),
            address: decl.address.as_ref().map(|e| substitute_expr(e, var, value)),
            template: decl.template.clone(),
            properties: substitute_properties(&decl.properties, var, value),
            fields: decl.fields.iter().map(|f| substitute_field(f, var, value)).collect(),
        }),
        Stmt::Template(decl) => Stmt::Template(TemplateDecl {
            name: substitute_name(&decl.name, var, value),
            properties: substitute_properties(&decl.properties, var, value),
            fields: decl.fields.iter().map(|f| substitute_field(f, var, value)).collect(),
        }),
        Stmt::Port(decl) => Stmt::Port(PortDecl {
            direction: decl.direction,
            is_trigger: decl.is_trigger,
            name: substitute_name(&decl.name, var, value),
            source_register: substitute_name(&decl.source_register, var, value),
            source_field: decl.source_field.clone(),
        }),
        Stmt::Parameter { name, value: v } => Stmt::Parameter { name: name.clone(), value: *v },
        Stmt::RegisterSize(w) => Stmt::RegisterSize(*w),
        Stmt::AddrMode(m) => Stmt::AddrMode(m.clone()),
        Stmt::Generate(gen) => Stmt::Generate(GenerateDecl {
            var: gen.var.clone(),
            start: gen.start,
            end: gen.end,
            body: gen.body.iter().map(|s| substitute_stmt(s, var, value)).collect(),
        }),
    }
}

fn substitute_field(field: &FieldDecl, var: &str, value: i64) -> FieldDecl {
    FieldDecl {
        name: substitute_name(&field.name, var, value),
        high: field.high,
        low: field.low,
        access: field.access,
        default: field.default.clone(),
        properties: substitute_properties(&field.properties, var, value),
    }
}

fn substitute_properties(
    properties: &[(String, PropertyValue)],
    var: &str,
    value: i64,
) -> Vec<(String, PropertyValue)> {
    properties
        .iter()
        .map(|(k, v)| {
            let v = match v {
                PropertyValue::Str(s) => PropertyValue::Str(substitute_name(s, var, value)),
                PropertyValue::Int(i) => PropertyValue::Int(*i),
            };
            (k.clone(), v)
        })
        .collect()
}

fn substitute_name(name: &str, var: &str, value: i64) -> String {
    name.replace(&format!("{{{var}}}"), &value.to_string())
}

fn substitute_expr(expr: &Expr, var: &str, value: i64) -> Expr {
    match expr {
        Expr::Name(name) if name == var => Expr::literal(value),
        Expr::Binary { op, lhs, rhs, width } => Expr::Binary {
            op: *op,
            lhs: Box::new(substitute_expr(lhs, var, value)),
            rhs: Box::new(substitute_expr(rhs, var, value)),
            width: *width,
        },
        Expr::Unary { op, operand, width } => {
            Expr::Unary { op: *op, operand: Box::new(substitute_expr(operand, var, value)), width: *width }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Parser;

    #[test]
    fn builds_a_simple_register_with_fields() {
        let src = r#"
            #register_size 32;
            #addr_mode byte;
            register CTRL {
                field ENABLE {
                    position = [0:0];
                    access = RW;
                    default = 0;
                }
                field MODE {
                    position = [3:1];
                    access = RW;
                    default = 2;
                }
            }
        "#;
        let stmts = Parser::parse_program(src).unwrap();
        let mmap = Builder::new().build(stmts).unwrap();
        let reg = mmap.get_register("CTRL").unwrap();
        assert_eq!(reg.address, 0);
        assert!(reg.has_field("ENABLE"));
        assert!(reg.has_field("MODE"));
    }

    #[test]
    fn generate_expands_and_templates_addresses() {
        let src = r#"
            #register_size 32;
            #addr_mode byte;
            generate i in 0..3 {
                register "CH{i}" @ (i * 4) {
                    field VALUE { position=[7:0]; access=RW; default=0; }
                }
            }
        "#;
        let stmts = Parser::parse_program(src).unwrap();
        let expanded = Builder::expand_generates(stmts).unwrap();
        let mmap = Builder::new().build(expanded).unwrap();
        assert_eq!(mmap.get_register("CH0").unwrap().address, 0);
        assert_eq!(mmap.get_register("CH1").unwrap().address, 4);
        assert_eq!(mmap.get_register("CH2").unwrap().address, 8);
    }

    #[test]
    fn overlapping_field_positions_are_rejected() {
        let src = r#"
            #register_size 32;
            register CTRL {
                field A { position=[3:0]; access=RW; default=0; }
                field B { position=[4:2]; access=RW; default=0; }
            }
        "#;
        let stmts = Parser::parse_program(src).unwrap();
        assert!(Builder::new().build(stmts).is_err());
    }

    #[test]
    fn default_value_overflow_is_rejected() {
        let src = r#"
            #register_size 32;
            register CTRL {
                field A { position=[1:0]; access=RW; default=7; }
            }
        "#;
        let stmts = Parser::parse_program(src).unwrap();
        assert!(Builder::new().build(stmts).is_err());
    }

    #[test]
    fn port_referencing_unknown_field_is_rejected() {
        let src = r#"
            #register_size 32;
            register CTRL {
                field A { position=[0:0]; access=RW; default=0; }
            }
            out DONE = CTRL.MISSING;
        "#;
        let stmts = Parser::parse_program(src).unwrap();
        assert!(Builder::new().build(stmts).is_err());
    }
}
