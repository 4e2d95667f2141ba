//! Module instances (spec component D).

use crate::module::Module;
use hdl_common::{HdlError, HdlResult};
use hdl_expr::Expr;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub module_name: String,
    pub params: HashMap<String, Expr>,
    pub ports: HashMap<String, String>,
}

impl Instance {
    pub fn new(name: impl Into<String>, module_type: &Module) -> Self {
        Self {
            name: name.into(),
            module_name: module_type.name.clone(),
            params: HashMap::new(),
            ports: HashMap::new(),
        }
    }

    /// Attach a value to a parameter; the referenced module must declare it.
    pub fn attach_parameter_value(&mut self, module_type: &Module, param_name: &str, value: Expr) -> HdlResult<()> {
        if !module_type.parameters.iter().any(|p| p.name == param_name) {
            return Err(HdlError::lookup_failure(format!(
                "parameter {param_name:?} not found in module {:?}",
                module_type.name
            )));
        }
        self.params.insert(param_name.to_string(), value);
        Ok(())
    }

    /// Connect an instance port to a signal name in the instantiating scope.
    pub fn connect_port(&mut self, module_type: &Module, port_name: &str, signal_name: &str) -> HdlResult<()> {
        if !module_type.has_port(port_name) {
            return Err(HdlError::lookup_failure(format!(
                "port {port_name:?} not found in module {:?}",
                module_type.name
            )));
        }
        self.ports.insert(port_name.to_string(), signal_name.to_string());
        Ok(())
    }
}
