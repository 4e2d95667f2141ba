//! The module container (spec component D): ports, parameters, constants,
//! a top-level scope, and an instance registry.

use crate::arena::{Arena, Id};
use crate::instance::Instance;
use crate::port::{Port, TypedPort};
use crate::scope::{self, Scope, ScopeCategory, Statement, StmtCategory, StatementKind};
use crate::signal::Signal;
use hdl_common::{HdlError, HdlResult};
use hdl_expr::{Expr, Scope as ExprScope};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub param_type: String,
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, default: Option<Expr>) -> Self {
        Self { name: name.into(), param_type: param_type.into(), default }
    }
}

/// All arena-owned node kinds for one module, grouped so that scope
/// operations (which need both the statement and scope tables) can be
/// threaded through a single borrow.
#[derive(Debug, Default)]
pub struct IrGraph {
    pub signals: Arena<Signal>,
    pub ports: Arena<Port>,
    pub typed_ports: Arena<TypedPort>,
    pub statements: Arena<Statement>,
    pub scopes: Arena<Scope>,
    pub instances: Arena<Instance>,
}

pub struct Module {
    pub name: String,
    pub graph: IrGraph,
    pub parameters: Vec<Parameter>,
    pub port_ids: Vec<Id<Port>>,
    pub typed_port_ids: Vec<Id<TypedPort>>,
    pub constants: Vec<Id<Signal>>,
    pub top_scope: Id<Scope>,
    pub instance_names: HashMap<String, Id<Instance>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = IrGraph::default();
        let top_scope = graph.scopes.alloc(Scope::new(ScopeCategory::Par));
        Self {
            name: name.into(),
            graph,
            parameters: Vec::new(),
            port_ids: Vec::new(),
            typed_port_ids: Vec::new(),
            constants: Vec::new(),
            top_scope,
            instance_names: HashMap::new(),
        }
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.port_ids.iter().any(|&id| self.graph.ports.get(id).name == name)
            || self.typed_port_ids.iter().any(|&id| self.graph.typed_ports.get(id).name == name)
    }

    pub fn add_port(&mut self, port: Port) -> HdlResult<Id<Port>> {
        if self.has_port(&port.name) {
            return Err(HdlError::semantic_error(format!("duplicate port name {:?}", port.name)));
        }
        let id = self.graph.ports.alloc(port);
        self.port_ids.push(id);
        Ok(id)
    }

    pub fn add_typed_port(&mut self, port: TypedPort) -> HdlResult<Id<TypedPort>> {
        if self.has_port(&port.name) {
            return Err(HdlError::semantic_error(format!("duplicate port name {:?}", port.name)));
        }
        let id = self.graph.typed_ports.alloc(port);
        self.typed_port_ids.push(id);
        Ok(id)
    }

    pub fn get_port(&self, name: &str) -> HdlResult<Id<Port>> {
        self.port_ids
            .iter()
            .copied()
            .find(|&id| self.graph.ports.get(id).name == name)
            .ok_or_else(|| HdlError::lookup_failure(format!("port {name:?} not found in module {:?}", self.name)))
    }

    pub fn add_parameter(&mut self, param: Parameter) -> HdlResult<()> {
        if self.parameters.iter().any(|p| p.name == param.name) {
            return Err(HdlError::semantic_error(format!("duplicate parameter name {:?}", param.name)));
        }
        self.parameters.push(param);
        Ok(())
    }

    pub fn get_parameter(&self, name: &str) -> HdlResult<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| HdlError::lookup_failure(format!("parameter {name:?} not found in module {:?}", self.name)))
    }

    pub fn add_constant(&mut self, signal: Id<Signal>) -> HdlResult<()> {
        if self.constants.contains(&signal) {
            return Err(HdlError::semantic_error("duplicate constant signal"));
        }
        self.constants.push(signal);
        Ok(())
    }

    /// Add an instance, registering it both in `instance_names` and as a
    /// tagged instance statement (`"_inst_" + name`) in the top scope.
    pub fn add_instance(&mut self, instance: Instance) -> HdlResult<Id<Instance>> {
        if self.instance_names.contains_key(&instance.name) {
            return Err(HdlError::semantic_error(format!("duplicate instance name {:?}", instance.name)));
        }
        let tag = format!("_inst_{}", instance.name);
        let name = instance.name.clone();
        let inst_id = self.graph.instances.alloc(instance);
        let stmt = self
            .graph
            .statements
            .alloc(Statement::new(StmtCategory::Par, StatementKind::Instance(inst_id)).with_tag(tag));
        scope::add(&mut self.graph.scopes, &self.graph.statements, self.top_scope, &[stmt])?;
        self.instance_names.insert(name, inst_id);
        Ok(inst_id)
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<(Id<Scope>, usize, Id<Statement>)> {
        scope::find_by_tag(&self.graph.scopes, &self.graph.statements, self.top_scope, tag)
    }

    /// Parameter scope merged with the builtin scope (`ceil`, `log2`,
    /// `clog2`), used when evaluating port/field expressions.
    pub fn full_scope(&self) -> ExprScope {
        let mut scope = ExprScope::with_builtins();
        for param in &self.parameters {
            if let Some(default) = &param.default {
                if let Ok(v) = default.evaluate(&ExprScope::with_builtins()) {
                    scope.bind(param.name.clone(), v);
                }
            }
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalKind;
    use hdl_expr::VectorDescriptor;

    #[test]
    fn duplicate_port_names_rejected() {
        let mut module = Module::new("top");
        let sig = module.graph.signals.alloc(Signal::new("a", SignalKind::Combinational, None));
        let vector = VectorDescriptor::with_left(Expr::literal(0)).unwrap();
        module
            .add_port(Port { direction: crate::port::Direction::In, name: "a".into(), vector: vector.clone(), signal: sig })
            .unwrap();
        let err = module
            .add_port(Port { direction: crate::port::Direction::Out, name: "a".into(), vector, signal: sig })
            .unwrap_err();
        assert!(matches!(err, HdlError::SemanticError { .. }));
    }

    #[test]
    fn instance_requires_declared_parameter_and_port() {
        let mut leaf = Module::new("leaf");
        leaf.add_parameter(Parameter::new("WIDTH", "integer", Some(Expr::literal(8)))).unwrap();
        let sig = leaf.graph.signals.alloc(Signal::new("clk", SignalKind::Combinational, None));
        leaf.add_port(Port {
            direction: crate::port::Direction::In,
            name: "clk".into(),
            vector: VectorDescriptor::with_left(Expr::literal(0)).unwrap(),
            signal: sig,
        })
        .unwrap();

        let mut inst = Instance::new("u0", &leaf);
        assert!(inst.attach_parameter_value(&leaf, "WIDTH", Expr::literal(16)).is_ok());
        assert!(inst.attach_parameter_value(&leaf, "MISSING", Expr::literal(1)).is_err());
        assert!(inst.connect_port(&leaf, "clk", "sys_clk").is_ok());
        assert!(inst.connect_port(&leaf, "missing_port", "sys_clk").is_err());
    }
}
