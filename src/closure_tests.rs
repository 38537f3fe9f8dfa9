//! Closure capture tests
//!
//! Free-variable resolution and capture-trie shape for single worklets,
//! without emission.

#[cfg(test)]
mod tests {
    use crate::classify::WorkletNode;
    use crate::config::{Globals, TransformOptions};
    use crate::visitor::{ClosureAnalysis, ClosureVisitor};
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn analyze(source: &str, source_type: SourceType, globals: &Globals) -> ClosureAnalysis {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        let Some(Statement::FunctionDeclaration(func)) = ret.program.body.first() else {
            panic!("expected a function declaration");
        };
        let node = WorkletNode::from_function(func).unwrap();
        ClosureVisitor::new(globals).analyze(node)
    }

    fn capture(source: &str) -> String {
        analyze(source, SourceType::mjs(), &Globals::builtin())
            .capture_trie()
            .closure_source()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Minimal capture
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_reads_only_needed_properties() {
        assert_eq!(
            capture("function fn() { 'worklet'; return a.b + c; }"),
            "{a: {b: a.b}, c: c}"
        );
    }

    #[test]
    fn test_direct_read_captures_whole_root() {
        assert_eq!(capture("function fn() { 'worklet'; return a.b + a; }"), "{a: a}");
        assert_eq!(capture("function fn() { 'worklet'; return a + a.b.c; }"), "{a: a}");
    }

    #[test]
    fn test_sibling_paths_merge() {
        assert_eq!(
            capture("function fn() { 'worklet'; return a.b.c + a.b.d + a.e; }"),
            "{a: {b: {c: a.b.c, d: a.b.d}, e: a.e}}"
        );
    }

    #[test]
    fn test_computed_access_stops_chain() {
        assert_eq!(
            capture("function fn() { 'worklet'; return a.b[i].c; }"),
            "{a: {b: a.b}, i: i}"
        );
    }

    #[test]
    fn test_value_and_methods_stop_chain() {
        assert_eq!(
            capture("function fn() { 'worklet'; return sv.value + list.map(g); }"),
            "{sv: sv, list: list, g: g}"
        );
    }

    #[test]
    fn test_optional_link_stops_chain() {
        assert_eq!(capture("function fn() { 'worklet'; return a?.b.c; }"), "{a: a}");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Exclusions
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_bound_names_are_not_captured() {
        let source = "function fn(x, { y }, [z]) {
            'worklet';
            const k = 1;
            let w;
            var v;
            function g() {}
            class K {}
            return fn + x + y + z + k + w + v + g + K + q;
        }";
        assert_eq!(capture(source), "{q: q}");
    }

    #[test]
    fn test_hoisted_var_declared_later_is_bound() {
        assert_eq!(
            capture("function fn() { 'worklet'; later = 2; if (x) { var later = 1; } }"),
            "{x: x}"
        );
    }

    #[test]
    fn test_block_bindings_do_not_escape() {
        assert_eq!(
            capture("function fn() { 'worklet'; { const t = 1; } return t; }"),
            "{t: t}"
        );
        assert_eq!(
            capture("function fn() { 'worklet'; for (let i = 0; i < n; i++) {} }"),
            "{n: n}"
        );
        assert_eq!(
            capture("function fn() { 'worklet'; try {} catch (e) { log(e); } }"),
            "{log: log}"
        );
    }

    #[test]
    fn test_nested_function_scopes() {
        assert_eq!(
            capture("function fn() { 'worklet'; return (x) => x + y; }"),
            "{y: y}"
        );
        assert_eq!(
            capture("function fn() { 'worklet'; const g = function h() { return h; }; return g; }"),
            "{}"
        );
    }

    #[test]
    fn test_builtins_are_not_captured() {
        assert_eq!(
            capture("function fn() { 'worklet'; console.log(Math.max(a, Date.now())); }"),
            "{a: a}"
        );
    }

    #[test]
    fn test_configured_globals_are_not_captured() {
        let options = TransformOptions::default().with_globals(["hostFn"]);
        let globals = Globals::from_options(&options).unwrap();
        let analysis = analyze(
            "function fn() { 'worklet'; return hostFn(a); }",
            SourceType::mjs(),
            &globals,
        );
        assert_eq!(analysis.capture_trie().closure_source(), "{a: a}");
    }

    #[test]
    fn test_property_names_and_keys_are_not_references() {
        assert_eq!(
            capture("function fn() { 'worklet'; return { k: x.y, z }; }"),
            "{x: {y: x.y}, z: z}"
        );
    }

    #[test]
    fn test_assignment_captures_object_not_new_property() {
        assert_eq!(
            capture("function fn() { 'worklet'; a.b.c = 1; }"),
            "{a: {b: a.b}}"
        );
    }

    #[test]
    fn test_type_positions_are_ignored() {
        let analysis = analyze(
            "function fn(p: Props): Result<Shape> { 'worklet'; const q: Other = p; return q as Cast; }",
            SourceType::ts(),
            &Globals::builtin(),
        );
        assert!(analysis.free_variables.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Analysis details
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_every_reference_is_reported() {
        let analysis = analyze(
            "function fn() { 'worklet'; return a.b + a.b; }",
            SourceType::mjs(),
            &Globals::builtin(),
        );
        assert_eq!(analysis.free_variables.len(), 2);
        assert_eq!(analysis.free_variables[0].path(), vec!["a", "b"]);
        assert_eq!(analysis.capture_trie().roots(), vec!["a"]);
    }

    #[test]
    fn test_nested_directives_are_collected() {
        let analysis = analyze(
            "function fn() { 'worklet'; const g = () => { 'worklet'; return 1; }; }",
            SourceType::mjs(),
            &Globals::builtin(),
        );
        assert_eq!(analysis.worklet_directives.len(), 2);
    }
}
