//! Optimization flags.
//!
//! The runtime may take a fast path for worklets that call nothing but known
//! safe helpers, or that contain no branching statements. Analysis is
//! conservative: anything not positively known to be safe clears the bit.

use bitflags::bitflags;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

use crate::classify::{worklet_arguments, WorkletNode};
use crate::tables::KNOWN_SAFE_CALLS;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptimizationFlags: u32 {
        /// Only calls to known-safe helpers.
        const FUNCTIONLESS = 0b01;
        /// No `if`, `switch` or conditional expression.
        const STATEMENTLESS = 0b10;
    }
}

/// Walks one worklet. Nested worklets are analyzed on their own and are
/// opaque here.
pub struct FlagAnalyzer {
    flags: OptimizationFlags,
    opaque: HashSet<u32>,
}

impl FlagAnalyzer {
    pub fn analyze(node: WorkletNode<'_, '_>) -> OptimizationFlags {
        let mut analyzer = FlagAnalyzer {
            flags: OptimizationFlags::all(),
            opaque: HashSet::new(),
        };
        analyzer.visit_formal_parameters(node.params());
        analyzer.visit_function_body(node.body());
        analyzer.flags
    }

    fn is_opaque(&self, node: WorkletNode<'_, '_>) -> bool {
        self.opaque.contains(&node.span().start) || node.has_worklet_directive()
    }
}

impl<'a> Visit<'a> for FlagAnalyzer {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        let safe = matches!(
            &call.callee,
            Expression::Identifier(ident) if KNOWN_SAFE_CALLS.contains(ident.name.as_str())
        );
        if !safe {
            self.flags.remove(OptimizationFlags::FUNCTIONLESS);
        }
        for argument in worklet_arguments(call) {
            self.opaque.insert(argument.node.span().start);
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_if_statement(&mut self, stmt: &IfStatement<'a>) {
        self.flags.remove(OptimizationFlags::STATEMENTLESS);
        walk::walk_if_statement(self, stmt);
    }

    fn visit_switch_statement(&mut self, stmt: &SwitchStatement<'a>) {
        self.flags.remove(OptimizationFlags::STATEMENTLESS);
        walk::walk_switch_statement(self, stmt);
    }

    fn visit_conditional_expression(&mut self, expr: &ConditionalExpression<'a>) {
        self.flags.remove(OptimizationFlags::STATEMENTLESS);
        walk::walk_conditional_expression(self, expr);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        match WorkletNode::from_function(func) {
            Some(node) if self.is_opaque(node) => {}
            _ => walk::walk_function(self, func, flags),
        }
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        if !self.is_opaque(WorkletNode::Arrow(arrow)) {
            walk::walk_arrow_function_expression(self, arrow);
        }
    }
}
