//! The register-description AST (spec section 6's "register-description
//! grammar"), produced by [`crate::grammar::parse_program`].

use hdl_expr::Expr;
use hdl_ir::Access;

#[derive(Debug, Clone)]
pub enum DefaultValue {
    Integer(u64),
    Name(String),
}

#[derive(Debug, Clone)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub high: u32,
    pub low: u32,
    pub access: Access,
    pub default: Option<DefaultValue>,
    pub properties: Vec<(String, PropertyValue)>,
}

#[derive(Debug, Clone)]
pub struct RegisterDecl {
    pub name: String,
    /// An unevaluated address expression; `None` means "next available".
    pub address: Option<Expr>,
    pub template: Option<String>,
    pub properties: Vec<(String, PropertyValue)>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
pub struct TemplateDecl {
    pub name: String,
    pub properties: Vec<(String, PropertyValue)>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    In,
    Out,
}

#[derive(Debug, Clone)]
pub struct PortDecl {
    pub direction: PortDirection,
    pub is_trigger: bool,
    pub name: String,
    pub source_register: String,
    pub source_field: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerateDecl {
    pub var: String,
    pub start: i64,
    pub end: i64,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    RegisterSize(u32),
    AddrMode(String),
    Parameter { name: String, value: i64 },
    Template(TemplateDecl),
    Register(RegisterDecl),
    Port(PortDecl),
    Generate(GenerateDecl),
}
