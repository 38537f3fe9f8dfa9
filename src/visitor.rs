//! Free-variable collection for one worklet.
//!
//! `ClosureVisitor` walks the worklet function once, mirroring its lexical
//! scopes into a [`ScopeTree`] and recording every identifier read together
//! with the longest capturable member chain rooted at it. References are
//! resolved only after the walk, so hoisted and later declarations in the same
//! scope bind correctly.

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;

use crate::capture::{CaptureTrie, MemberChain};
use crate::classify::WorkletNode;
use crate::config::Globals;
use crate::scope::{parameter_names, pattern_names, BindingKind, Resolution, ScopeId, ScopeTree};
use crate::tables::WORKLET_DIRECTIVE;

/// A resolved read of a name bound outside the worklet.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeVariable {
    pub name: String,
    pub span: Span,
    /// Capturable properties read through this reference; `x.y.z` gives `[y, z]`.
    pub chain: Vec<String>,
}

impl FreeVariable {
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.chain.len() + 1);
        path.push(self.name.clone());
        path.extend(self.chain.iter().cloned());
        path
    }
}

#[derive(Debug, Default)]
pub struct ClosureAnalysis {
    /// In reference order; a name may appear once per reference site.
    pub free_variables: Vec<FreeVariable>,
    /// Every `'worklet'` directive inside the function, nested ones included.
    pub worklet_directives: Vec<Span>,
}

impl ClosureAnalysis {
    pub fn capture_trie(&self) -> CaptureTrie {
        let mut trie = CaptureTrie::new();
        for variable in &self.free_variables {
            tracing::trace!(name = %variable.name, chain = ?variable.chain, "capture path");
            trie.insert(&variable.path());
        }
        trie
    }
}

struct PendingReference {
    name: String,
    span: Span,
    scope: ScopeId,
    chain: Vec<String>,
}

pub struct ClosureVisitor<'g> {
    globals: &'g Globals,
    tree: ScopeTree,
    current: ScopeId,
    references: Vec<PendingReference>,
    directives: Vec<Span>,
}

impl<'g> ClosureVisitor<'g> {
    pub fn new(globals: &'g Globals) -> Self {
        ClosureVisitor {
            globals,
            tree: ScopeTree::new(),
            current: ScopeTree::ROOT,
            references: vec![],
            directives: vec![],
        }
    }

    pub fn analyze(mut self, node: WorkletNode<'_, '_>) -> ClosureAnalysis {
        if let Some(name) = node.name() {
            self.tree.declare(ScopeTree::ROOT, name, BindingKind::FunctionName);
        }
        for name in parameter_names(node.params()) {
            self.tree.declare(ScopeTree::ROOT, &name, BindingKind::Parameter);
        }
        self.visit_formal_parameters(node.params());
        self.visit_function_body(node.body());
        self.finish()
    }

    fn finish(self) -> ClosureAnalysis {
        let free_variables = self
            .references
            .into_iter()
            .filter(|r| !self.globals.contains(&r.name))
            .filter(|r| self.tree.resolve(&r.name, r.scope) == Resolution::Free)
            .map(|r| FreeVariable {
                name: r.name,
                span: r.span,
                chain: r.chain,
            })
            .collect();
        ClosureAnalysis {
            free_variables,
            worklet_directives: self.directives,
        }
    }

    fn record(&mut self, name: &str, span: Span, chain: Vec<String>) {
        self.references.push(PendingReference {
            name: name.to_string(),
            span,
            scope: self.current,
            chain,
        });
    }

    fn enter(&mut self, is_function: bool) -> ScopeId {
        let parent = self.current;
        self.current = self.tree.push(parent, is_function);
        parent
    }

    fn leave(&mut self, parent: ScopeId) {
        self.current = parent;
    }
}

impl<'a> Visit<'a> for ClosureVisitor<'_> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.record(ident.name.as_str(), ident.span, vec![]);
    }

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        match MemberChain::from_expression(expr) {
            Some(chain) => {
                let path = chain.capture_path();
                self.record(chain.root.name.as_str(), chain.root.span, path[1..].to_vec());
                for computed in chain.computed_expressions() {
                    self.visit_expression(computed);
                }
            }
            None => walk::walk_expression(self, expr),
        }
    }

    fn visit_directive(&mut self, directive: &Directive<'a>) {
        if directive.expression.value.as_str() == WORKLET_DIRECTIVE {
            self.directives.push(directive.span);
        }
    }

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        let is_declaration = matches!(func.r#type, FunctionType::FunctionDeclaration);
        if let (true, Some(id)) = (is_declaration, &func.id) {
            self.tree.declare(self.current, id.name.as_str(), BindingKind::Local);
        }
        let parent = self.enter(true);
        if let (false, Some(id)) = (is_declaration, &func.id) {
            self.tree.declare(self.current, id.name.as_str(), BindingKind::FunctionName);
        }
        for name in parameter_names(&func.params) {
            self.tree.declare(self.current, &name, BindingKind::Parameter);
        }
        self.visit_formal_parameters(&func.params);
        if let Some(body) = &func.body {
            self.visit_function_body(body);
        }
        self.leave(parent);
    }

    fn visit_arrow_function_expression(&mut self, func: &ArrowFunctionExpression<'a>) {
        let parent = self.enter(true);
        for name in parameter_names(&func.params) {
            self.tree.declare(self.current, &name, BindingKind::Parameter);
        }
        self.visit_formal_parameters(&func.params);
        self.visit_function_body(&func.body);
        self.leave(parent);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        let parent = self.enter(false);
        walk::walk_block_statement(self, block);
        self.leave(parent);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let parent = self.enter(false);
        if let Some(param) = &clause.param {
            for name in pattern_names(&param.pattern) {
                self.tree.declare(self.current, &name, BindingKind::Local);
            }
        }
        walk::walk_catch_clause(self, clause);
        self.leave(parent);
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let parent = self.enter(false);
        walk::walk_for_statement(self, stmt);
        self.leave(parent);
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let parent = self.enter(false);
        walk::walk_for_in_statement(self, stmt);
        self.leave(parent);
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let parent = self.enter(false);
        walk::walk_for_of_statement(self, stmt);
        self.leave(parent);
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        for declarator in &decl.declarations {
            for name in pattern_names(&declarator.id) {
                if decl.kind == VariableDeclarationKind::Var {
                    self.tree.declare_var(self.current, &name);
                } else {
                    self.tree.declare(self.current, &name, BindingKind::Local);
                }
            }
        }
        walk::walk_variable_declaration(self, decl);
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if let Some(id) = &class.id {
            self.tree.declare(self.current, id.name.as_str(), BindingKind::Local);
        }
        walk::walk_class(self, class);
    }

    // Type positions never reach the target context.
    fn visit_ts_type(&mut self, _ty: &TSType<'a>) {}
}
