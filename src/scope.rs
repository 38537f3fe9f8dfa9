//! Lexical scopes of a single worklet.
//!
//! The tree is rooted at the worklet function itself. Nothing outside it is
//! modelled: a name that is not bound somewhere between the reference and the
//! root is free, module-level bindings included, since the target context
//! shares no memory with the defining module.

use oxc_ast::ast::{BindingIdentifier, BindingPattern, Expression, FormalParameters};
use oxc_ast_visit::Visit;
use std::collections::HashMap;

pub type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Parameter,
    Local,
    FunctionName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Bound(BindingKind),
    Free,
}

#[derive(Debug, Default)]
pub struct Scope {
    pub bindings: HashMap<String, BindingKind>,
    /// Lookup-only link; scopes are owned by the tree's arena.
    pub parent: Option<ScopeId>,
    /// Function scopes receive hoisted `var` declarations.
    pub is_function: bool,
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub const ROOT: ScopeId = 0;

    /// A tree holding only the worklet's own function scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                is_function: true,
                ..Scope::default()
            }],
        }
    }

    pub fn push(&mut self, parent: ScopeId, is_function: bool) -> ScopeId {
        self.scopes.push(Scope {
            bindings: HashMap::new(),
            parent: Some(parent),
            is_function,
        });
        self.scopes.len() - 1
    }

    /// Records a binding. A name already bound in the same scope keeps its
    /// first kind, so a parameter redeclared with `var` stays a parameter.
    pub fn declare(&mut self, scope: ScopeId, name: &str, kind: BindingKind) {
        if let Some(s) = self.scopes.get_mut(scope) {
            s.bindings.entry(name.to_string()).or_insert(kind);
        }
    }

    /// Declares a `var` binding in the nearest enclosing function scope.
    pub fn declare_var(&mut self, scope: ScopeId, name: &str) {
        let mut current = scope;
        while let Some(s) = self.scopes.get(current) {
            if s.is_function {
                break;
            }
            match s.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.declare(current, name, BindingKind::Local);
    }

    pub fn resolve(&self, name: &str, from: ScopeId) -> Resolution {
        let mut current = Some(from);
        while let Some(id) = current {
            let Some(scope) = self.scopes.get(id) else {
                break;
            };
            if let Some(kind) = scope.bindings.get(name) {
                return Resolution::Bound(*kind);
            }
            current = scope.parent;
        }
        Resolution::Free
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects the names a pattern binds. Default values are skipped: any
/// bindings inside them belong to nested functions, not to this pattern.
struct PatternBindings {
    names: Vec<String>,
}

impl<'a> Visit<'a> for PatternBindings {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.push(ident.name.to_string());
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>) {}
}

pub fn pattern_names(pattern: &BindingPattern<'_>) -> Vec<String> {
    let mut collector = PatternBindings { names: vec![] };
    collector.visit_binding_pattern(pattern);
    collector.names
}

pub fn parameter_names(params: &FormalParameters<'_>) -> Vec<String> {
    let mut collector = PatternBindings { names: vec![] };
    collector.visit_formal_parameters(params);
    collector.names
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn test_resolve_walks_parents() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeTree::ROOT, "x", BindingKind::Parameter);
        let block = tree.push(ScopeTree::ROOT, false);
        let inner = tree.push(block, true);
        tree.declare(block, "y", BindingKind::Local);

        assert_eq!(tree.resolve("x", inner), Resolution::Bound(BindingKind::Parameter));
        assert_eq!(tree.resolve("y", inner), Resolution::Bound(BindingKind::Local));
        assert_eq!(tree.resolve("y", ScopeTree::ROOT), Resolution::Free);
        assert_eq!(tree.resolve("z", inner), Resolution::Free);
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let mut tree = ScopeTree::new();
        let block = tree.push(ScopeTree::ROOT, false);
        let nested_block = tree.push(block, false);
        tree.declare_var(nested_block, "v");

        assert_eq!(tree.resolve("v", ScopeTree::ROOT), Resolution::Bound(BindingKind::Local));

        let func = tree.push(nested_block, true);
        let body_block = tree.push(func, false);
        tree.declare_var(body_block, "w");
        assert_eq!(tree.resolve("w", body_block), Resolution::Bound(BindingKind::Local));
        assert_eq!(tree.resolve("w", nested_block), Resolution::Free);
    }

    #[test]
    fn test_first_declaration_kind_wins() {
        let mut tree = ScopeTree::new();
        tree.declare(ScopeTree::ROOT, "a", BindingKind::Parameter);
        tree.declare_var(ScopeTree::ROOT, "a");
        assert_eq!(
            tree.resolve("a", ScopeTree::ROOT),
            Resolution::Bound(BindingKind::Parameter)
        );
    }

    #[test]
    fn test_parameter_names_skip_defaults() {
        let allocator = Allocator::default();
        let source = "function f(a, { b, c: [d] }, e = (g) => g, ...rest) {}";
        let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
        let Statement::FunctionDeclaration(func) = &ret.program.body[0] else {
            panic!("expected a function declaration");
        };
        let names = parameter_names(&func.params);
        assert_eq!(names, vec!["a", "b", "d", "e", "rest"]);
    }
}
