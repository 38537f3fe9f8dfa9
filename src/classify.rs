//! Worklet classification.
//!
//! A function becomes a worklet through one of three routes:
//! 1. its body opens with a `'worklet'` directive,
//! 2. it sits at a listed argument position of a listed callee,
//! 3. it is a property value of an object literal passed first to an object hook.
//!
//! Every route funnels into [`WorkletClassifier::push_site`], which processes a
//! function node at most once no matter how many routes reach it.

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

use crate::codegen::{build_worklet, WorkletUnit};
use crate::tables::{OBJECT_HOOKS, WORKLET_ARGUMENTS, WORKLET_DIRECTIVE};
use crate::transform::FileContext;
use crate::validate::CompilerError;

// ═══════════════════════════════════════════════════════════════════════════════
// WORKLET NODES
// ═══════════════════════════════════════════════════════════════════════════════

/// A function definition that can be processed as a worklet.
#[derive(Debug, Clone, Copy)]
pub enum WorkletNode<'n, 'a> {
    Function {
        func: &'n Function<'a>,
        body: &'n FunctionBody<'a>,
    },
    Arrow(&'n ArrowFunctionExpression<'a>),
}

impl<'n, 'a> WorkletNode<'n, 'a> {
    /// `None` for bodiless declarations (`declare function f(): void`).
    pub fn from_function(func: &'n Function<'a>) -> Option<Self> {
        func.body
            .as_deref()
            .map(|body| WorkletNode::Function { func, body })
    }

    pub fn from_expression(expr: &'n Expression<'a>) -> Option<Self> {
        match expr {
            Expression::FunctionExpression(func) => Self::from_function(func),
            Expression::ArrowFunctionExpression(arrow) => Some(WorkletNode::Arrow(arrow)),
            Expression::ParenthesizedExpression(paren) => Self::from_expression(&paren.expression),
            _ => None,
        }
    }

    pub fn span(self) -> Span {
        match self {
            WorkletNode::Function { func, .. } => func.span,
            WorkletNode::Arrow(arrow) => arrow.span,
        }
    }

    pub fn name(self) -> Option<&'n str> {
        match self {
            WorkletNode::Function { func, .. } => func.id.as_ref().map(|id| id.name.as_str()),
            WorkletNode::Arrow(_) => None,
        }
    }

    pub fn params(self) -> &'n FormalParameters<'a> {
        match self {
            WorkletNode::Function { func, .. } => &func.params,
            WorkletNode::Arrow(arrow) => &arrow.params,
        }
    }

    pub fn body(self) -> &'n FunctionBody<'a> {
        match self {
            WorkletNode::Function { body, .. } => body,
            WorkletNode::Arrow(arrow) => &arrow.body,
        }
    }

    /// The expression of a concise arrow body (`x => x + 1`).
    pub fn expression_body(self) -> Option<&'n Expression<'a>> {
        match self {
            WorkletNode::Arrow(arrow) if arrow.expression => {
                match arrow.body.statements.first() {
                    Some(Statement::ExpressionStatement(stmt)) => Some(&stmt.expression),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn is_async(self) -> bool {
        match self {
            WorkletNode::Function { func, .. } => func.r#async,
            WorkletNode::Arrow(arrow) => arrow.r#async,
        }
    }

    pub fn is_generator(self) -> bool {
        match self {
            WorkletNode::Function { func, .. } => func.generator,
            WorkletNode::Arrow(_) => false,
        }
    }

    /// Spans of this function's own `'worklet'` directives.
    pub fn own_directives(self) -> Vec<Span> {
        self.body()
            .directives
            .iter()
            .filter(|d| d.expression.value.as_str() == WORKLET_DIRECTIVE)
            .map(|d| d.span)
            .collect()
    }

    pub fn has_worklet_directive(self) -> bool {
        self.body()
            .directives
            .iter()
            .any(|d| d.expression.value.as_str() == WORKLET_DIRECTIVE)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALL-SITE ROUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkletRoute {
    Directive,
    Argument { callee: String, index: usize },
    ObjectHook { callee: String, key: String },
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedArgument<'n, 'a> {
    pub node: WorkletNode<'n, 'a>,
    pub index: usize,
    /// Set for object-hook properties.
    pub property: Option<&'n ObjectProperty<'a>>,
}

/// `useDerivedValue` for both `useDerivedValue(...)` and `Reanimated.useDerivedValue(...)`.
pub fn callee_name<'n>(callee: &'n Expression<'_>) -> Option<&'n str> {
    match callee {
        Expression::Identifier(ident) => Some(ident.name.as_str()),
        Expression::StaticMemberExpression(member) => Some(member.property.name.as_str()),
        _ => None,
    }
}

fn property_key_name(property: &ObjectProperty<'_>) -> String {
    match &property.key {
        PropertyKey::StaticIdentifier(ident) => ident.name.to_string(),
        PropertyKey::StringLiteral(lit) => lit.value.to_string(),
        _ => String::from("[computed]"),
    }
}

/// Route taken by a classified argument of `call`.
pub fn argument_route(
    call: &CallExpression<'_>,
    argument: &ClassifiedArgument<'_, '_>,
) -> WorkletRoute {
    let callee = callee_name(&call.callee).unwrap_or_default().to_string();
    match argument.property {
        Some(property) => WorkletRoute::ObjectHook {
            callee,
            key: property_key_name(property),
        },
        None => WorkletRoute::Argument {
            callee,
            index: argument.index,
        },
    }
}

/// Function arguments of `call` that must be processed as worklets.
///
/// An object hook whose first argument is an object literal classifies that
/// object's function-valued properties; otherwise the argument table applies.
/// Non-function values at listed positions are not worklets.
pub fn worklet_arguments<'n, 'a>(call: &'n CallExpression<'a>) -> Vec<ClassifiedArgument<'n, 'a>> {
    let Some(name) = callee_name(&call.callee) else {
        return vec![];
    };

    if OBJECT_HOOKS.contains(name) {
        let first = call.arguments.first().and_then(|arg| arg.as_expression());
        if let Some(Expression::ObjectExpression(object)) = first {
            return object
                .properties
                .iter()
                .filter_map(|prop| match prop {
                    ObjectPropertyKind::ObjectProperty(property)
                        if matches!(property.kind, PropertyKind::Init) =>
                    {
                        WorkletNode::from_expression(&property.value).map(|node| {
                            ClassifiedArgument {
                                node,
                                index: 0,
                                property: Some(&**property),
                            }
                        })
                    }
                    _ => None,
                })
                .collect();
        }
    }

    let Some(indexes) = WORKLET_ARGUMENTS.get(name) else {
        return vec![];
    };
    indexes
        .iter()
        .filter_map(|&index| {
            let expr = call.arguments.get(index)?.as_expression()?;
            WorkletNode::from_expression(expr).map(|node| ClassifiedArgument {
                node,
                index,
                property: None,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SITES
// ═══════════════════════════════════════════════════════════════════════════════

/// How the emitted worklet takes the definition's place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Named declaration in statement position: `const name = <worklet>;`
    Declaration { name: String },
    /// Any expression position, and declarations that cannot bind: `export
    /// default`, or a single-statement slot such as `if (c) function f() {}`.
    Expression,
    /// Object-literal method shorthand: `key: <worklet>`.
    Method { key: String },
}

#[derive(Debug, Clone)]
pub struct WorkletSite {
    /// Span of the function node itself; identifies the site.
    pub node_span: Span,
    /// Source range replaced by the emitted code.
    pub region: Span,
    pub placement: Placement,
    pub route: WorkletRoute,
    /// Source range rendered as the private function value, after `function_prefix`.
    pub function_region: Span,
    pub function_prefix: String,
    pub unit: WorkletUnit,
}

pub struct WorkletClassifier<'c> {
    ctx: &'c FileContext<'c>,
    seen: HashSet<u32>,
    /// Declarations sitting directly in a statement list or a named export.
    bindable: HashSet<u32>,
    sites: Vec<WorkletSite>,
    error: Option<CompilerError>,
}

impl<'c> WorkletClassifier<'c> {
    pub fn new(ctx: &'c FileContext<'c>) -> Self {
        WorkletClassifier {
            ctx,
            seen: HashSet::new(),
            bindable: HashSet::new(),
            sites: vec![],
            error: None,
        }
    }

    /// Sites in source order; outer worklets precede the ones nested in them.
    pub fn classify(mut self, program: &Program<'_>) -> Result<Vec<WorkletSite>, CompilerError> {
        self.visit_program(program);
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.sites),
        }
    }

    fn push_site(
        &mut self,
        node: WorkletNode<'_, '_>,
        route: WorkletRoute,
        placement: Placement,
        region: Span,
        function_region: Span,
        function_prefix: String,
    ) {
        if self.error.is_some() || !self.seen.insert(node.span().start) {
            return;
        }
        tracing::trace!(file = self.ctx.file_path, offset = node.span().start, route = ?route, "worklet site");
        match build_worklet(node, self.ctx) {
            Ok(unit) => self.sites.push(WorkletSite {
                node_span: node.span(),
                region,
                placement,
                route,
                function_region,
                function_prefix,
                unit,
            }),
            Err(err) => self.error = Some(err),
        }
    }

    fn push_expression(&mut self, node: WorkletNode<'_, '_>, route: WorkletRoute) {
        let span = node.span();
        self.push_site(node, route, Placement::Expression, span, span, String::new());
    }

    fn push_method(
        &mut self,
        node: WorkletNode<'_, '_>,
        property: &ObjectProperty<'_>,
        route: WorkletRoute,
    ) {
        let key_span = property.key.span();
        let key_text = &self.ctx.source[key_span.start as usize..key_span.end as usize];
        let key = if property.computed {
            format!("[{}]", key_text)
        } else {
            key_text.to_string()
        };
        let prefix = format!(
            "{}function{} ",
            if node.is_async() { "async " } else { "" },
            if node.is_generator() { "*" } else { "" }
        );
        let function_region = Span::new(node.params().span.start, node.body().span.end);
        self.push_site(
            node,
            route,
            Placement::Method { key },
            property.span,
            function_region,
            prefix,
        );
    }

    fn skip(&mut self, span: Span, reason: &str) {
        if self.seen.insert(span.start) {
            tracing::debug!(
                file = self.ctx.file_path,
                offset = span.start,
                reason,
                "worklet directive ignored"
            );
        }
    }
}

impl<'a> Visit<'a> for WorkletClassifier<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        for argument in worklet_arguments(call) {
            let route = argument_route(call, &argument);
            match argument.property {
                Some(property) if property.method => {
                    self.push_method(argument.node, property, route)
                }
                _ => self.push_expression(argument.node, route),
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_object_property(&mut self, property: &ObjectProperty<'a>) {
        if let Some(node) = WorkletNode::from_expression(&property.value) {
            if node.has_worklet_directive() {
                if !matches!(property.kind, PropertyKind::Init) {
                    self.skip(node.span(), "accessor");
                } else if property.method {
                    self.push_method(node, property, WorkletRoute::Directive);
                }
            }
        }
        walk::walk_object_property(self, property);
    }

    fn visit_method_definition(&mut self, def: &MethodDefinition<'a>) {
        if let Some(node) = WorkletNode::from_function(&def.value) {
            if node.has_worklet_directive() {
                self.skip(node.span(), "class member");
            }
        }
        walk::walk_method_definition(self, def);
    }

    fn visit_statements(&mut self, stmts: &oxc_allocator::Vec<'a, Statement<'a>>) {
        for stmt in stmts.iter() {
            if let Statement::FunctionDeclaration(func) = stmt {
                self.bindable.insert(func.span.start);
            }
        }
        walk::walk_statements(self, stmts);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(Declaration::FunctionDeclaration(func)) = &decl.declaration {
            self.bindable.insert(func.span.start);
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if let Some(node) = WorkletNode::from_function(func) {
            if node.has_worklet_directive() {
                let binds = matches!(func.r#type, FunctionType::FunctionDeclaration)
                    && self.bindable.contains(&func.span.start);
                match (&func.id, binds) {
                    (Some(id), true) => self.push_site(
                        node,
                        WorkletRoute::Directive,
                        Placement::Declaration {
                            name: id.name.to_string(),
                        },
                        func.span,
                        func.span,
                        String::new(),
                    ),
                    _ => self.push_expression(node, WorkletRoute::Directive),
                }
            }
        }
        walk::walk_function(self, func, flags);
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let node = WorkletNode::Arrow(arrow);
        if node.has_worklet_directive() {
            self.push_expression(node, WorkletRoute::Directive);
        }
        walk::walk_arrow_function_expression(self, arrow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn routes(code: &str) -> Vec<WorkletRoute> {
        let allocator = Allocator::default();
        let expr = Parser::new(&allocator, code, SourceType::mjs())
            .parse_expression()
            .unwrap();
        let Expression::CallExpression(call) = &expr else {
            panic!("expected a call");
        };
        worklet_arguments(call)
            .iter()
            .map(|argument| argument_route(call, argument))
            .collect()
    }

    fn argument(callee: &str, index: usize) -> WorkletRoute {
        WorkletRoute::Argument {
            callee: callee.to_string(),
            index,
        }
    }

    #[test]
    fn test_listed_index_is_classified() {
        assert_eq!(
            routes("withSpring(1, {}, () => {})"),
            vec![argument("withSpring", 2)]
        );
        assert!(routes("withSpring(() => {}, {}, 1)").is_empty());
    }

    #[test]
    fn test_function_expressions_and_parens() {
        assert_eq!(
            routes("useDerivedValue((function () { return 1; }))"),
            vec![argument("useDerivedValue", 0)]
        );
    }

    #[test]
    fn test_unknown_callee() {
        assert!(routes("useCallback(() => {})").is_empty());
        assert!(routes("obj[name](() => {})").is_empty());
    }

    #[test]
    fn test_object_hook_keys() {
        assert_eq!(
            routes("useAnimatedScrollHandler({ onScroll: (e) => {}, 'onEnd': function () {}, n: 1 })"),
            vec![
                WorkletRoute::ObjectHook {
                    callee: "useAnimatedScrollHandler".to_string(),
                    key: "onScroll".to_string(),
                },
                WorkletRoute::ObjectHook {
                    callee: "useAnimatedScrollHandler".to_string(),
                    key: "onEnd".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_object_hook_falls_back_to_argument_table() {
        assert_eq!(
            routes("useAnimatedScrollHandler((e) => {})"),
            vec![argument("useAnimatedScrollHandler", 0)]
        );
        assert!(routes("useAnimatedGestureHandler({})").is_empty());
    }
}
