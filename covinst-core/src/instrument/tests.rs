//! Scenario tests for the program driver

use super::*;
use crate::coverage::BranchKind;
use crate::location::{Location, Position};
use crate::parser::parse_source;
use pretty_assertions::assert_eq;
use std::sync::Mutex;
use swc_common::sync::Lrc;
use swc_common::DUMMY_SP;
use swc_ecma_ast::{BlockStmtOrExpr, Expr, ExprStmt};

struct Parsed {
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
    program: Program,
}

fn parse(src: &str, filename: &str) -> Parsed {
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();
    let program = parse_source(src, &cm, &comments, filename).unwrap();
    Parsed {
        cm,
        comments,
        program,
    }
}

impl Parsed {
    fn instrument(
        &mut self,
        path: &str,
        options: &InstrumentOptions,
        batch: &BatchContext,
    ) -> Result<InstrumentOutput, InstrumentError> {
        let source = SourceContext {
            path,
            source_map: &self.cm,
            comments: &self.comments,
        };
        instrument_program(&mut self.program, &source, options, batch)
    }

    fn script_body(&self) -> &[Stmt] {
        match &self.program {
            Program::Script(script) => &script.body,
            Program::Module(_) => panic!("expected a script"),
        }
    }
}

fn run_named(src: &str, filename: &str) -> (Parsed, InstrumentOutput) {
    let mut parsed = parse(src, filename);
    let output = parsed
        .instrument(filename, &InstrumentOptions::default(), &BatchContext::new())
        .unwrap();
    (parsed, output)
}

fn run(src: &str) -> (Parsed, InstrumentOutput) {
    run_named(src, "a.js")
}

fn loc(start: (u32, u32), end: (u32, u32)) -> Location {
    Location::new(Position::new(start.0, start.1), Position::new(end.0, end.1))
}

fn is_counter(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(**expr, Expr::Update(_)))
}

#[test]
fn test_if_else_function() {
    let (_, output) = run("function f(x) { if (x) { return 1; } else { return 2; } }");
    let cov = &output.file_coverage;

    assert_eq!(output.status, PassStatus::Instrumented);
    assert_eq!(cov.path, "a.js");
    assert_eq!(cov.fn_map.len(), 1);
    assert_eq!(cov.fn_map[0].name, "f");
    assert_eq!(cov.fn_map[0].decl, loc((1, 9), (1, 10)));
    // the two returns; the `if` is a branch, not a statement
    assert_eq!(cov.statement_map.len(), 2);
    assert_eq!(cov.statement_map[0], loc((1, 25), (1, 34)));
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].kind, BranchKind::If);
    assert_eq!(cov.branch_map[0].locations.len(), 2);
    assert_eq!(cov.s, vec![0, 0]);
    assert_eq!(cov.f, vec![0]);
    assert_eq!(cov.b, vec![vec![0, 0]]);
    assert!(cov.hash.is_some());
}

#[test]
fn test_if_without_else_still_has_two_paths() {
    let (_, output) = run("if (x) a();");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.branch_map[0].locations.len(), 2);
    assert_eq!(cov.branch_map[0].locations[0], cov.branch_map[0].loc);
}

#[test]
fn test_expression_arrow_gets_block_body() {
    let (parsed, output) = run("const g = (x) => x + 1;");
    let cov = &output.file_coverage;

    assert_eq!(cov.fn_map.len(), 1);
    assert_eq!(cov.fn_map[0].name, "(anonymous_0)");
    assert_eq!(cov.statement_map.len(), 2);
    assert_eq!(cov.statement_map[0], loc((1, 10), (1, 22)));
    assert_eq!(cov.statement_map[1], loc((1, 17), (1, 22)));

    let body = parsed.script_body();
    assert_eq!(body.len(), 3);
    assert!(is_counter(&body[1]));
    let Stmt::Decl(Decl::Var(decl)) = &body[2] else {
        panic!("expected the declaration last");
    };
    let Some(Expr::Arrow(arrow)) = decl.decls[0].init.as_deref() else {
        panic!("arrow initializer must stay unwrapped");
    };
    let BlockStmtOrExpr::BlockStmt(block) = &*arrow.body else {
        panic!("expected block body");
    };
    assert_eq!(block.stmts.len(), 3);
    assert!(is_counter(&block.stmts[0]));
    assert!(is_counter(&block.stmts[1]));
    assert!(matches!(block.stmts[2], Stmt::Return(_)));
}

#[test]
fn test_function_initializer_is_hoisted() {
    let (parsed, output) = run("const h = function () {};");
    assert_eq!(output.file_coverage.statement_map.len(), 1);
    assert_eq!(output.file_coverage.fn_map.len(), 1);

    let body = parsed.script_body();
    assert_eq!(body.len(), 3);
    assert!(is_counter(&body[1]));
    let Stmt::Decl(Decl::Var(decl)) = &body[2] else {
        panic!("expected the declaration last");
    };
    assert!(matches!(decl.decls[0].init.as_deref(), Some(Expr::Fn(_))));
}

#[test]
fn test_plain_initializer_is_wrapped() {
    let (parsed, _) = run("let n = compute();");
    let Stmt::Decl(Decl::Var(decl)) = &parsed.script_body()[1] else {
        panic!("expected the declaration after the bootstrap");
    };
    let Some(Expr::Paren(paren)) = decl.decls[0].init.as_deref() else {
        panic!("expected a parenthesized sequence");
    };
    assert!(matches!(*paren.expr, Expr::Seq(_)));
}

#[test]
fn test_logical_chain_is_one_branch() {
    let (_, output) = run("a && b && c;");
    let cov = &output.file_coverage;
    assert_eq!(cov.branch_map.len(), 1);
    let branch = &cov.branch_map[0];
    assert_eq!(branch.kind, BranchKind::BinaryExpr);
    let columns: Vec<u32> = branch.locations.iter().map(|l| l.start.column).collect();
    assert_eq!(columns, vec![0, 5, 10]);
    assert_eq!(cov.b, vec![vec![0, 0, 0]]);
}

#[test]
fn test_parenthesized_chain_is_not_double_counted() {
    let (_, output) = run("x = a || (b && c);");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.branch_map.len(), 1);
    let columns: Vec<u32> = cov.branch_map[0]
        .locations
        .iter()
        .map(|l| l.start.column)
        .collect();
    assert_eq!(columns, vec![4, 10, 15]);
}

#[test]
fn test_ternary_inside_logical_gets_own_branch() {
    let (_, output) = run("x = a || (b ? c : d);");
    let cov = &output.file_coverage;
    assert_eq!(cov.branch_map.len(), 2);
    assert_eq!(cov.branch_map[0].kind, BranchKind::BinaryExpr);
    assert_eq!(cov.branch_map[0].locations.len(), 2);
    assert_eq!(cov.branch_map[1].kind, BranchKind::CondExpr);
    assert_eq!(cov.branch_map[1].locations.len(), 2);
}

#[test]
fn test_ternary() {
    let (_, output) = run("x ? y : z;");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].kind, BranchKind::CondExpr);
    assert_eq!(cov.branch_map[0].locations[0], loc((1, 4), (1, 5)));
    assert_eq!(cov.branch_map[0].locations[1], loc((1, 8), (1, 9)));
}

#[test]
fn test_switch_cases() {
    let (parsed, output) = run("switch (k) { case 1: a(); break; default: b(); }");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 4);
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].kind, BranchKind::Switch);
    assert_eq!(cov.branch_map[0].locations.len(), 2);

    let body = parsed.script_body();
    let Stmt::Switch(switch) = &body[2] else {
        panic!("expected the switch after its counter");
    };
    for case in &switch.cases {
        assert!(is_counter(&case.cons[0]));
    }
}

#[test]
fn test_ignore_next_skips_only_its_node() {
    let src = "/* istanbul ignore next */\nfunction skip() { return 1; }\nfunction keep() { return 2; }";
    let (_, output) = run(src);
    let cov = &output.file_coverage;
    assert_eq!(cov.fn_map.len(), 1);
    assert_eq!(cov.fn_map[0].name, "keep");
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.statement_map[0].start.line, 3);
}

#[test]
fn test_ignore_else_and_if() {
    let (_, output) = run("/* istanbul ignore else */\nif (x) { a(); } else { b(); }");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.statement_map[0].start.line, 2);
    assert_eq!(cov.statement_map[0].start.column, 9);
    assert_eq!(cov.branch_map[0].locations.len(), 1);

    let (_, output) = run("/* istanbul ignore if */\nif (x) { a(); } else { b(); }");
    let cov = &output.file_coverage;
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.statement_map[0].start.column, 23);
    assert_eq!(cov.branch_map[0].locations.len(), 1);
}

#[test]
fn test_ignore_next_inside_logical_chain() {
    let (_, output) = run("x = a || /* istanbul ignore next */ b;");
    let cov = &output.file_coverage;
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].locations.len(), 1);
}

#[test]
fn test_ignore_next_on_same_line_as_brace() {
    let (_, output) = run("function f() { /* istanbul ignore next */ if (a) { b(); } c(); }");
    let cov = &output.file_coverage;
    assert_eq!(cov.fn_map.len(), 1);
    assert!(cov.branch_map.is_empty());
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.statement_map[0], loc((1, 58), (1, 62)));
}

#[test]
fn test_ignore_next_before_case_on_same_line() {
    let src = "switch (k) { /* istanbul ignore next */ case 1: a(); break; case 2: b(); break; default: c(); }";
    let (_, output) = run(src);
    let cov = &output.file_coverage;
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].locations.len(), 2);
    // the switch, then b(), break and c()
    assert_eq!(cov.statement_map.len(), 4);
}

#[test]
fn test_hinted_sub_chain_contributes_no_paths() {
    let (_, output) = run("x = a || /* istanbul ignore next */ (b && c);");
    let cov = &output.file_coverage;
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].locations, vec![loc((1, 4), (1, 5))]);
}

#[test]
fn test_default_argument() {
    let (_, output) = run("function d(a = 1) { return a; }");
    let cov = &output.file_coverage;
    assert_eq!(cov.fn_map.len(), 1);
    assert_eq!(cov.statement_map.len(), 1);
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].kind, BranchKind::DefaultArg);
    assert_eq!(cov.branch_map[0].locations, vec![loc((1, 15), (1, 16))]);
}

#[test]
fn test_ignore_file_leaves_tree_unmodified() {
    let mut parsed = parse("/* istanbul ignore file */\nfunction f() { return 1; }", "a.js");
    let before = format!("{:?}", parsed.program);
    let output = parsed
        .instrument("a.js", &InstrumentOptions::default(), &BatchContext::new())
        .unwrap();
    assert_eq!(output.status, PassStatus::Ignored);
    assert!(output.file_coverage.is_empty());
    assert!(output.file_coverage.hash.is_some());
    assert_eq!(format!("{:?}", parsed.program), before);
}

#[test]
fn test_second_pass_is_a_no_op() {
    let (mut parsed, first) = run("function f(x) { if (x) { return 1; } else { return 2; } }");
    let after_first = format!("{:?}", parsed.program);

    let second = parsed
        .instrument("a.js", &InstrumentOptions::default(), &BatchContext::new())
        .unwrap();
    assert_eq!(second.status, PassStatus::AlreadyInstrumented);
    assert!(second.file_coverage.is_empty());
    assert_eq!(format!("{:?}", parsed.program), after_first);
    assert_eq!(first.file_coverage.statement_map.len(), 2);
    assert_eq!(first.file_coverage.branch_map[0].locations.len(), 2);
}

#[test]
fn test_for_init_is_not_counted() {
    let (_, output) = run("for (var i = 0; i < 3; i++) { x(); }");
    assert_eq!(output.file_coverage.statement_map.len(), 2);
}

#[test]
fn test_directive_prologue_stays_first() {
    let (parsed, output) = run("\"use strict\";\nfoo();");
    assert_eq!(output.file_coverage.statement_map.len(), 1);
    let body = parsed.script_body();
    assert!(crate::instrument::counters::is_directive(&body[0]));
    assert!(matches!(body[1], Stmt::Decl(Decl::Var(_))));
}

#[test]
fn test_function_directive_prologue() {
    let (parsed, output) = run("function f() { 'use strict'; return 1; }");
    assert_eq!(output.file_coverage.statement_map.len(), 1);
    let Stmt::Decl(Decl::Fn(func)) = &parsed.script_body()[1] else {
        panic!("expected the function after the bootstrap");
    };
    let stmts = &func.function.body.as_ref().unwrap().stmts;
    assert!(crate::instrument::counters::is_directive(&stmts[0]));
    assert!(is_counter(&stmts[1]));
}

#[test]
fn test_labeled_loop_counters_precede_label() {
    let (parsed, output) = run("outer: for (;;) { break outer; }");
    assert_eq!(output.file_coverage.statement_map.len(), 3);
    let body = parsed.script_body();
    assert_eq!(body.len(), 4);
    assert!(is_counter(&body[1]));
    assert!(is_counter(&body[2]));
    assert!(matches!(body[3], Stmt::Labeled(_)));
}

#[test]
fn test_fingerprint_depends_on_path() {
    let src = "foo();";
    let (_, a1) = run_named(src, "a.js");
    let (_, a2) = run_named(src, "a.js");
    let (_, b) = run_named(src, "b.js");
    assert_eq!(a1.file_coverage.hash, a2.file_coverage.hash);
    assert_ne!(a1.file_coverage.hash, b.file_coverage.hash);
}

#[test]
fn test_fingerprint_tracks_moved_statement() {
    let (_, before) = run("foo();");
    let (_, after) = run(" foo();");
    assert_eq!(before.file_coverage.statement_map.len(), 1);
    assert_eq!(after.file_coverage.statement_map[0].start.column, 1);
    assert_ne!(before.file_coverage.hash, after.file_coverage.hash);
}

#[test]
fn test_class_heritage_is_parenthesized() {
    let (parsed, output) = run("class A extends B {}");
    assert!(output.file_coverage.statement_map.is_empty());
    let Stmt::Decl(Decl::Class(class)) = &parsed.script_body()[1] else {
        panic!("expected the class after the bootstrap");
    };
    assert!(matches!(class.class.super_class.as_deref(), Some(Expr::Paren(_))));
}

#[test]
fn test_ignored_class_methods() {
    let mut parsed = parse("class A { render() { return 1; } other() { return 2; } }", "a.js");
    let options = InstrumentOptions {
        ignore_class_methods: vec!["render".to_string()],
        ..InstrumentOptions::default()
    };
    let output = parsed.instrument("a.js", &options, &BatchContext::new()).unwrap();
    let cov = &output.file_coverage;
    assert_eq!(cov.fn_map.len(), 1);
    assert_eq!(cov.fn_map[0].name, "other");
    assert_eq!(cov.statement_map.len(), 1);
}

#[test]
fn test_object_methods_and_accessors() {
    let (_, output) = run("const o = { m() { return 1; }, get g() { return 2; }, set g(v) {} };");
    let names: Vec<&str> = output
        .file_coverage
        .fn_map
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["m", "g", "g"]);
    assert_eq!(output.file_coverage.statement_map.len(), 3);
}

#[test]
fn test_overload_signatures_are_not_functions() {
    let src = "class A { m(): void; m(x?: number) { return x; } }";
    let (_, output) = run_named(src, "a.ts");
    assert_eq!(output.file_coverage.fn_map.len(), 1);
    assert_eq!(output.file_coverage.statement_map.len(), 1);
}

#[test]
fn test_on_cover_sees_every_snapshot() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = InstrumentOptions {
        on_cover: Some(Arc::new(move |path: &str, cov: &FileCoverage| {
            sink.lock().unwrap().push((path.to_string(), cov.statement_map.len()));
        })),
        ..InstrumentOptions::default()
    };
    let batch = BatchContext::new();

    parse("a(); b();", "a.js").instrument("a.js", &options, &batch).unwrap();
    parse("// istanbul ignore file\nc();", "b.js")
        .instrument("b.js", &options, &batch)
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![("a.js".to_string(), 2), ("b.js".to_string(), 0)]);
}

#[test]
fn test_git_info_injected_once_per_batch() {
    let batch = BatchContext::with_git_info(GitInfo {
        commit_hash: "abc123".to_string(),
        ..GitInfo::default()
    });
    let options = InstrumentOptions::default();

    let mut first = parse("foo();", "a.js");
    first.instrument("a.js", &options, &batch).unwrap();
    let mut second = parse("foo();", "b.js");
    second.instrument("b.js", &options, &batch).unwrap();

    assert!(batch.git_info_claimed());
    assert_eq!(first.script_body().len(), 4);
    assert!(matches!(first.script_body()[1], Stmt::Expr(_)));
    assert_eq!(second.script_body().len(), 3);
}

#[test]
fn test_switch_without_registered_branch_fails() {
    let mut parsed = parse("switch (k) { case 1: a(); }", "a.js");
    if let Program::Script(script) = &mut parsed.program {
        if let Stmt::Switch(switch) = &mut script.body[0] {
            switch.span = DUMMY_SP;
        }
    }
    let err = parsed
        .instrument("a.js", &InstrumentOptions::default(), &BatchContext::new())
        .unwrap_err();
    assert!(matches!(err, InstrumentError::MissingSwitchBranch { location: Some(_) }));
}

#[test]
fn test_source_mapping_url() {
    let (_, output) = run("foo(); //# sourceMappingURL=foo.js.map");
    assert_eq!(output.source_mapping_url.as_deref(), Some("foo.js.map"));

    let (_, output) = run("foo();\n//# sourceMappingURL=data:application/json;base64,e30=\n");
    assert_eq!(
        output.source_mapping_url.as_deref(),
        Some("data:application/json;base64,e30=")
    );

    let (_, output) = run("foo();");
    assert_eq!(output.source_mapping_url, None);
}

#[test]
fn test_input_source_map_is_attached() {
    let mut parsed = parse("foo();", "a.js");
    let options = InstrumentOptions {
        input_source_map: Some(serde_json::json!({
            "version": 3,
            "file": "/tmp/build/a.js",
            "sources": ["/home/dev/src/a.js"],
            "mappings": ""
        })),
        ..InstrumentOptions::default()
    };
    let output = parsed
        .instrument("src/a.js", &options, &BatchContext::new())
        .unwrap();
    assert_eq!(
        output.file_coverage.input_source_map,
        Some(serde_json::json!({"version": 3, "file": "a.js", "sources": ["a.js"], "mappings": ""}))
    );
}

#[test]
fn test_module_exports_are_covered() {
    let mut parsed = parse("export const v = 1;\nexport function f() { return v; }", "a.mjs");
    let output = parsed
        .instrument("a.mjs", &InstrumentOptions::default(), &BatchContext::new())
        .unwrap();
    assert_eq!(output.file_coverage.statement_map.len(), 2);
    assert_eq!(output.file_coverage.fn_map.len(), 1);
    let Program::Module(module) = &parsed.program else {
        panic!("expected a module");
    };
    assert!(matches!(module.body[0], ModuleItem::Stmt(Stmt::Decl(Decl::Var(_)))));
}
