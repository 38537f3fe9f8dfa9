//! Worklet serialization.
//!
//! Produces the self-contained source text the remote runtime evaluates:
//!
//! ```text
//! function <name>(<params>){const {a, c} = jsThis._closure;<body>}
//! ```
//!
//! The text is re-parsed, stripped of types and printed minified, so two
//! worklets with the same meaning in different formatting share one hash.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, Span};
use oxc_transformer::{JsxOptions, TransformOptions as OxcTransformOptions, Transformer};
use std::path::Path;

use crate::capture::CaptureTrie;
use crate::classify::WorkletNode;
use crate::emit::{splice, Edit};
use crate::optimize::{FlagAnalyzer, OptimizationFlags};
use crate::tables::{CLOSURE_HOLDER, CLOSURE_PROPERTY, PRIVATE_FUNCTION};
use crate::transform::FileContext;
use crate::validate::{CompilerError, SourceLocation, ERR_SERIALIZE};
use crate::visitor::ClosureVisitor;

/// Everything the emitter needs to know about one worklet.
#[derive(Debug, Clone)]
pub struct WorkletUnit {
    pub name: String,
    pub closure: CaptureTrie,
    pub source_text: String,
    pub content_hash: u64,
    pub location: String,
    pub flags: OptimizationFlags,
    /// Directives removed from the emitted function value.
    pub own_directives: Vec<Span>,
}

pub fn build_worklet(
    node: WorkletNode<'_, '_>,
    ctx: &FileContext<'_>,
) -> Result<WorkletUnit, CompilerError> {
    let analysis = ClosureVisitor::new(ctx.globals).analyze(node);
    let closure = analysis.capture_trie();
    let flags = FlagAnalyzer::analyze(node);
    let name = node.name().unwrap_or(PRIVATE_FUNCTION).to_string();

    let raw = worklet_source(node, ctx.source, &name, &closure, &analysis.worklet_directives);
    let source_text = serialize(&raw, &name, node.span().start, ctx)?;
    let content_hash = string_hash_64(&source_text);
    let location = location_tag(ctx, node.span());

    tracing::debug!(
        name = %name,
        location = %location,
        hash = content_hash,
        captured = closure.roots().len(),
        flags = flags.bits(),
        "worklet built"
    );

    Ok(WorkletUnit {
        name,
        closure,
        source_text,
        content_hash,
        location,
        flags,
        own_directives: node.own_directives(),
    })
}

/// `file(line:col)` of the definition start.
pub fn location_tag(ctx: &FileContext<'_>, span: Span) -> String {
    let loc = SourceLocation::from_offset(ctx.source, span.start);
    format!("{}({}:{})", ctx.file_path, loc.line, loc.column)
}

/// Destructures captured roots from the closure holder. Empty when nothing
/// is captured.
pub fn closure_prologue(closure: &CaptureTrie) -> String {
    let roots = closure.roots();
    if roots.is_empty() {
        return String::new();
    }
    format!(
        "const {{{}}} = {}.{};",
        roots.join(", "),
        CLOSURE_HOLDER,
        CLOSURE_PROPERTY
    )
}

fn directive_removals(directives: &[Span]) -> Vec<Edit> {
    directives
        .iter()
        .map(|span| Edit {
            span: *span,
            text: String::new(),
        })
        .collect()
}

fn parameter_source(source: &str, params: Span) -> String {
    let text = &source[params.start as usize..params.end as usize];
    if text.starts_with('(') {
        text.to_string()
    } else {
        format!("({})", text)
    }
}

/// Unnormalized serialized text.
fn worklet_source(
    node: WorkletNode<'_, '_>,
    source: &str,
    name: &str,
    closure: &CaptureTrie,
    directives: &[Span],
) -> String {
    let edits = directive_removals(directives);
    let body = match node.expression_body() {
        Some(expr) => format!("return ({});", splice(source, expr.span(), &edits)),
        None => {
            let block = node.body().span;
            splice(source, Span::new(block.start + 1, block.end - 1), &edits)
        }
    };
    format!(
        "{}function{} {}{}{{{}{}}}",
        if node.is_async() { "async " } else { "" },
        if node.is_generator() { "*" } else { "" },
        name,
        parameter_source(source, node.params().span),
        closure_prologue(closure),
        body
    )
}

/// Parses, strips types and prints minified.
/// Normalizes `raw`, reporting a failure at `offset` in the original file.
fn serialize(raw: &str, name: &str, offset: u32, ctx: &FileContext<'_>) -> Result<String, CompilerError> {
    normalize(raw, ctx).map_err(|reason| {
        CompilerError::at_offset(
            ERR_SERIALIZE,
            &format!("Could not serialize worklet '{}': {}", name, reason),
            ctx.file_path,
            ctx.source,
            offset,
        )
        .with_context(raw.to_string())
    })
}

fn normalize(raw: &str, ctx: &FileContext<'_>) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, raw, ctx.source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let reason = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked".to_string());
        return Err(reason);
    }
    let mut program = ret.program;

    if ctx.source_type.is_typescript() {
        let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
        // Types only. JSX stays as written for the runtime's own transform.
        let options = OxcTransformOptions { jsx: JsxOptions::disable(), ..OxcTransformOptions::default() };
        let ret = Transformer::new(&allocator, Path::new(ctx.file_path), &options)
            .build_with_scoping(scoping, &mut program);
        if let Some(err) = ret.errors.first() {
            return Err(err.to_string());
        }
    }

    let code = Codegen::new()
        .with_options(CodegenOptions::minify())
        .build(&program)
        .code;
    Ok(code.trim().to_string())
}

/// 64-bit content hash over UTF-16 code units, compatible with the
/// `string-hash-64` package the runtime uses to key its worklet cache.
pub fn string_hash_64(text: &str) -> u64 {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut high: i32 = 5381;
    let mut low: i32 = 52711;
    for &unit in units.iter().rev() {
        high = high.wrapping_mul(33) ^ unit as i32;
        low = low.wrapping_mul(33) ^ unit as i32;
    }
    (high as u32) as u64 * 4096 + (low as u32) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Globals;
    use oxc_ast::ast::{Expression, Statement};
    use oxc_span::SourceType;

    fn build(source: &str, file_path: &str) -> WorkletUnit {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(file_path).unwrap_or_default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        let globals = Globals::builtin();
        let ctx = FileContext {
            source,
            file_path,
            source_type,
            globals: &globals,
        };
        let node = match ret.program.body.first() {
            Some(Statement::FunctionDeclaration(func)) => WorkletNode::from_function(func),
            Some(Statement::ExpressionStatement(stmt)) => match &stmt.expression {
                Expression::ArrowFunctionExpression(arrow) => Some(WorkletNode::Arrow(arrow)),
                _ => None,
            },
            _ => None,
        }
        .expect("expected a function");
        build_worklet(node, &ctx).unwrap()
    }

    #[test]
    fn test_hash_of_empty_string() {
        assert_eq!(string_hash_64(""), 22093287);
    }

    #[test]
    fn test_hash_known_values() {
        assert_eq!(string_hash_64("a"), 729205414);
        assert_eq!(string_hash_64("hello world"), 10719102826919);
        assert_eq!(string_hash_64("function _f(){return 1}"), 1529216762112);
    }

    #[test]
    fn test_prologue_lists_roots() {
        let mut trie = CaptureTrie::new();
        trie.insert(&["a".to_string(), "b".to_string()]);
        trie.insert(&["c".to_string()]);
        assert_eq!(closure_prologue(&trie), "const {a, c} = jsThis._closure;");
        assert_eq!(closure_prologue(&CaptureTrie::new()), "");
    }

    #[test]
    fn test_source_text_is_normalized() {
        let unit = build(
            "function   style(p)  {\n  'worklet';\n  return {  width : a.b + p  };\n}",
            "App.js",
        );
        assert_eq!(unit.name, "style");
        assert!(unit.source_text.starts_with("function style(p){"));
        assert!(unit.source_text.contains("jsThis._closure"));
        assert!(!unit.source_text.contains("worklet"));
        assert_eq!(unit.closure.closure_source(), "{a: {b: a.b}}");
        assert_eq!(unit.content_hash, string_hash_64(&unit.source_text));
    }

    #[test]
    fn test_formatting_does_not_change_hash() {
        let a = build("function f() { 'worklet'; return x + 1; }", "a.js");
        let b = build("function f(){\n    'worklet'\n    return x+1\n}", "a.js");
        assert_eq!(a.source_text, b.source_text);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_expression_arrow_gets_return() {
        let unit = build("(v) => v * 2;", "a.js");
        assert_eq!(unit.name, "_f");
        assert!(unit.source_text.starts_with("function _f(v){"));
        assert!(unit.source_text.contains("return v*2"));
        assert!(unit.closure.is_empty());
    }

    #[test]
    fn test_bare_arrow_parameter_is_wrapped() {
        let unit = build("v => v;", "a.js");
        assert!(unit.source_text.starts_with("function _f(v)"));
    }

    #[test]
    fn test_types_are_stripped() {
        let unit = build(
            "function f(p: number): number { 'worklet'; const k: number = p; return k; }",
            "a.ts",
        );
        assert!(!unit.source_text.contains("number"));
        assert!(unit.source_text.starts_with("function f(p){"));
    }

    #[test]
    fn test_async_and_generator_are_kept() {
        assert!(build("async function f() { 'worklet'; }", "a.js")
            .source_text
            .starts_with("async function f("));
        let generator = build("function* g() { 'worklet'; yield 1; }", "a.js");
        assert!(generator.source_text.starts_with("function*"));
        assert!(generator.source_text.contains("yield 1"));
    }

    #[test]
    fn test_unparsable_text_reports_definition_site() {
        let source = "const k = 1;\n  function f(p) { 'worklet'; return p; }";
        let globals = Globals::builtin();
        let ctx = FileContext {
            source,
            file_path: "src/App.js",
            source_type: SourceType::mjs(),
            globals: &globals,
        };
        let offset = source.find("function").unwrap() as u32;
        let err = serialize("function f(p) { return p +; }", "f", offset, &ctx).unwrap_err();
        assert_eq!(err.code, ERR_SERIALIZE);
        assert_eq!(err.file, "src/App.js");
        assert_eq!((err.line, err.column), (2, 2));
        assert!(err.message.contains("'f'"));
        assert_eq!(err.context.as_deref(), Some("function f(p) { return p +; }"));
    }

    #[test]
    fn test_location_tag() {
        let unit = build("\n\n  function f() { 'worklet'; }", "src/App.js");
        assert_eq!(unit.location, "src/App.js(3:2)");
    }
}
