//! Statements and scopes (spec component C).
//!
//! A scope is an ordered list of statement ids; statements carry an
//! optional tag and, for compound forms, one or more child scope ids.
//! Lookup/insert-by-tag operations walk this structure by index rather
//! than by pointer, per the arena design in spec section 9.

use crate::arena::Id;
use crate::instance::Instance;
use crate::signal::Signal;
use hdl_expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeCategory {
    Seq,
    Par,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtCategory {
    Seq,
    Par,
    Null,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Assignment { lhs: Expr, rhs: Expr },
    IfElse { cond: Expr, then_scope: Id<Scope>, else_scope: Option<Id<Scope>> },
    Switch { selector: Expr, cases: Vec<(Expr, Id<Scope>)>, default: Option<Id<Scope>> },
    ForLoop { var: String, range: (Expr, Expr), body: Id<Scope> },
    SeqBlock { sensitivity: Vec<String>, body: Id<Scope> },
    ParBlock { body: Id<Scope> },
    Comment(String),
    Macro(String),
    SignalDecl(Id<Signal>),
    Instance(Id<Instance>),
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub category: StmtCategory,
    pub tag: Option<String>,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(category: StmtCategory, kind: StatementKind) -> Self {
        Self { category, tag: None, kind }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Child scopes exposed by this statement, in source order. If-else
    /// exposes up to two (then, else); switch exposes one per case plus
    /// an optional default; loops and blocks expose exactly one.
    pub fn child_scopes(&self) -> Vec<Id<Scope>> {
        match &self.kind {
            StatementKind::IfElse { then_scope, else_scope, .. } => {
                let mut v = vec![*then_scope];
                if let Some(e) = else_scope {
                    v.push(*e);
                }
                v
            }
            StatementKind::Switch { cases, default, .. } => {
                let mut v: Vec<_> = cases.iter().map(|(_, s)| *s).collect();
                if let Some(d) = default {
                    v.push(*d);
                }
                v
            }
            StatementKind::ForLoop { body, .. }
            | StatementKind::SeqBlock { body, .. }
            | StatementKind::ParBlock { body, .. } => vec![*body],
            _ => vec![],
        }
    }

    pub fn dump(&self) -> String {
        match &self.kind {
            StatementKind::Assignment { lhs, rhs } => format!("{} = {};", lhs.dump(), rhs.dump()),
            StatementKind::IfElse { cond, .. } => format!("if ({}) {{ .. }}", cond.dump()),
            StatementKind::Switch { selector, .. } => format!("switch ({}) {{ .. }}", selector.dump()),
            StatementKind::ForLoop { var, range, .. } => {
                format!("for {} in {}..{} {{ .. }}", var, range.0.dump(), range.1.dump())
            }
            StatementKind::SeqBlock { sensitivity, .. } => {
                format!("always @({}) {{ .. }}", sensitivity.join(", "))
            }
            StatementKind::ParBlock { .. } => "par { .. }".to_string(),
            StatementKind::Comment(text) => format!("// {text}"),
            StatementKind::Macro(text) => format!("`{text}"),
            StatementKind::SignalDecl(_) => "signal decl".to_string(),
            StatementKind::Instance(_) => "instance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub category: Option<ScopeCategory>,
    pub statements: Vec<Id<Statement>>,
}

impl Scope {
    pub fn new(category: ScopeCategory) -> Self {
        Self { category: Some(category), statements: Vec::new() }
    }

    fn accepts(&self, stmt_category: StmtCategory) -> bool {
        match (self.category, stmt_category) {
            (_, StmtCategory::Null) => true,
            (Some(ScopeCategory::Seq), StmtCategory::Seq) => true,
            (Some(ScopeCategory::Par), StmtCategory::Par) => true,
            _ => false,
        }
    }
}

/// Finds a tagged statement starting from `root`, walking statement
/// bodies depth-first in source order (spec section 4.3).
pub fn find_by_tag(
    scopes: &crate::arena::Arena<Scope>,
    statements: &crate::arena::Arena<Statement>,
    root: Id<Scope>,
    tag: &str,
) -> Option<(Id<Scope>, usize, Id<Statement>)> {
    let scope = scopes.get(root);
    for (index, &stmt_id) in scope.statements.iter().enumerate() {
        let stmt = statements.get(stmt_id);
        if stmt.tag.as_deref() == Some(tag) {
            return Some((root, index, stmt_id));
        }
        for child in stmt.child_scopes() {
            if let Some(found) = find_by_tag(scopes, statements, child, tag) {
                return Some(found);
            }
        }
    }
    None
}

pub fn get_tags(scopes: &crate::arena::Arena<Scope>, statements: &crate::arena::Arena<Statement>, scope: Id<Scope>) -> Vec<String> {
    scopes
        .get(scope)
        .statements
        .iter()
        .filter_map(|&id| statements.get(id).tag.clone())
        .collect()
}

/// Appends statements to a scope, rejecting any whose category mismatches
/// (sequential into parallel or vice versa); null-category statements
/// (comments, macros, signal declarations) are accepted by either.
pub fn add(
    scopes: &mut crate::arena::Arena<Scope>,
    statements: &crate::arena::Arena<Statement>,
    scope: Id<Scope>,
    new_statements: &[Id<Statement>],
) -> hdl_common::HdlResult<()> {
    for &stmt_id in new_statements {
        let stmt = statements.get(stmt_id);
        if !scopes.get(scope).accepts(stmt.category) {
            return Err(hdl_common::HdlError::semantic_error(format!(
                "cannot add a {:?} statement into a {:?} scope",
                stmt.category,
                scopes.get(scope).category
            )));
        }
    }
    for &stmt_id in new_statements {
        scopes.get_mut(scope).statements.push(stmt_id);
    }
    Ok(())
}

pub fn insert_before(
    scopes: &mut crate::arena::Arena<Scope>,
    statements: &crate::arena::Arena<Statement>,
    root: Id<Scope>,
    tag: &str,
    new_statements: &[Id<Statement>],
) -> hdl_common::HdlResult<()> {
    let (scope, index, _) = find_by_tag(scopes, statements, root, tag)
        .ok_or_else(|| hdl_common::HdlError::lookup_failure(format!("tag {tag:?} not found")))?;
    for (offset, &stmt_id) in new_statements.iter().enumerate() {
        scopes.get_mut(scope).statements.insert(index + offset, stmt_id);
    }
    Ok(())
}

pub fn insert_after(
    scopes: &mut crate::arena::Arena<Scope>,
    statements: &crate::arena::Arena<Statement>,
    root: Id<Scope>,
    tag: &str,
    new_statements: &[Id<Statement>],
) -> hdl_common::HdlResult<()> {
    let (scope, index, _) = find_by_tag(scopes, statements, root, tag)
        .ok_or_else(|| hdl_common::HdlError::lookup_failure(format!("tag {tag:?} not found")))?;
    for (offset, &stmt_id) in new_statements.iter().enumerate() {
        scopes.get_mut(scope).statements.insert(index + 1 + offset, stmt_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn rejects_mismatched_category() {
        let mut scopes = Arena::new();
        let mut statements = Arena::new();
        let seq_scope = scopes.alloc(Scope::new(ScopeCategory::Seq));
        let par_stmt = statements.alloc(Statement::new(StmtCategory::Par, StatementKind::Comment("x".into())));
        let result = add(&mut scopes, &statements, seq_scope, &[par_stmt]);
        assert!(result.is_err());
    }

    #[test]
    fn null_statements_accepted_anywhere() {
        let mut scopes = Arena::new();
        let mut statements = Arena::new();
        let par_scope = scopes.alloc(Scope::new(ScopeCategory::Par));
        let comment = statements.alloc(Statement::new(StmtCategory::Null, StatementKind::Comment("hi".into())));
        assert!(add(&mut scopes, &statements, par_scope, &[comment]).is_ok());
    }

    #[test]
    fn find_by_tag_recurses_into_child_scopes() {
        let mut scopes = Arena::new();
        let mut statements = Arena::new();
        let inner = scopes.alloc(Scope::new(ScopeCategory::Seq));
        let tagged = statements
            .alloc(Statement::new(StmtCategory::Seq, StatementKind::Comment("inner".into())).with_tag("found"));
        scopes.get_mut(inner).statements.push(tagged);

        let outer = scopes.alloc(Scope::new(ScopeCategory::Seq));
        let if_stmt = statements.alloc(Statement::new(
            StmtCategory::Seq,
            StatementKind::IfElse {
                cond: hdl_expr::Expr::literal(1),
                then_scope: inner,
                else_scope: None,
            },
        ));
        scopes.get_mut(outer).statements.push(if_stmt);

        let found = find_by_tag(&scopes, &statements, outer, "found");
        assert_eq!(found, Some((inner, 0, tagged)));
        assert!(find_by_tag(&scopes, &statements, outer, "missing").is_none());
    }

    #[test]
    fn insert_before_missing_tag_is_lookup_failure() {
        let mut scopes = Arena::new();
        let statements = Arena::new();
        let scope = scopes.alloc(Scope::new(ScopeCategory::Seq));
        let err = insert_before(&mut scopes, &statements, scope, "nope", &[]).unwrap_err();
        assert!(matches!(err, hdl_common::HdlError::LookupFailure { .. }));
    }
}
