//! Scope hierarchy tracking and variable registration, grounded on
//! `hdltools/vcd/mixins/hierarchy.py`'s `VCDHierarchyAnalysisMixin`.

use std::collections::{HashMap, HashSet};

/// A declared VCD variable, keyed by its VCD short id, with the scope
/// it was first declared under and any aliases registered afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVariable {
    pub id: String,
    pub scope: Vec<String>,
    pub name: String,
    pub aliases: Vec<(Vec<String>, String)>,
}

impl TrackedVariable {
    pub fn new(id: impl Into<String>, scope: Vec<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), scope, name: name.into(), aliases: Vec::new() }
    }
}

/// Nested scope tree built from `$scope`/`$upscope` pairs, plus the
/// registry of declared variables and alias-aware search.
#[derive(Default)]
pub struct ScopeHierarchy {
    stack: Vec<String>,
    children: HashMap<Vec<String>, HashSet<String>>,
    variables: HashMap<String, TrackedVariable>,
}

impl ScopeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_scope(&self) -> &[String] {
        &self.stack
    }

    pub fn current_scope_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn enter_scope(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.children.entry(self.stack.clone()).or_default().insert(name.clone());
        self.stack.push(name);
    }

    pub fn exit_scope(&mut self) {
        self.stack.pop();
    }

    pub fn children_of(&self, scope: &[String]) -> impl Iterator<Item = &String> {
        self.children.get(scope).into_iter().flatten()
    }

    /// Record a `$var` declaration under the current scope; a repeated id
    /// is an alias of an already-declared variable, per the source.
    pub fn declare_variable(&mut self, id: &str, name: impl Into<String>) {
        let scope = self.stack.clone();
        let name = name.into();
        if let Some(existing) = self.variables.get_mut(id) {
            existing.aliases.push((scope, name));
        } else {
            self.variables.insert(id.to_string(), TrackedVariable::new(id, scope, name));
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &TrackedVariable> {
        self.variables.values()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedVariable> {
        self.variables.get(id)
    }

    /// Search declared variables (and optionally their aliases) by name,
    /// narrowed to a scope when one is given.
    pub fn variable_search(&self, name: &str, scope: Option<&[String]>, aliases: bool) -> Vec<&TrackedVariable> {
        let mut candidates = Vec::new();
        for var in self.variables.values() {
            if aliases {
                for (alias_scope, alias_name) in &var.aliases {
                    if let Some(scope) = scope {
                        if alias_scope.as_slice() != scope {
                            continue;
                        }
                    }
                    if alias_name == name {
                        candidates.push(var);
                        break;
                    }
                }
            }
            if let Some(scope) = scope {
                if var.scope.as_slice() != scope {
                    continue;
                }
            }
            if var.name == name {
                candidates.push(var);
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_nested_scopes_and_variables() {
        let mut h = ScopeHierarchy::new();
        h.enter_scope("top");
        h.enter_scope("cpu");
        h.declare_variable("!", "clk");
        assert_eq!(h.current_scope(), &["top".to_string(), "cpu".to_string()]);
        h.exit_scope();
        assert_eq!(h.current_scope(), &["top".to_string()]);

        let found = h.variable_search("clk", None, false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].scope, vec!["top".to_string(), "cpu".to_string()]);
    }

    #[test]
    fn repeated_id_becomes_an_alias() {
        let mut h = ScopeHierarchy::new();
        h.enter_scope("top");
        h.declare_variable("#", "a");
        h.enter_scope("sub");
        h.declare_variable("#", "b");
        let var = h.get("#").unwrap();
        assert_eq!(var.name, "a");
        assert_eq!(var.aliases, vec![(vec!["top".to_string(), "sub".to_string()], "b".to_string())]);
    }
}
