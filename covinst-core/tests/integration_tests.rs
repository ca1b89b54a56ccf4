//! Integration tests for instrumenting fixture files and trees

use covinst_core::config::load_and_resolve;
use covinst_core::coverage::BranchKind;
use covinst_core::git::GitInfo;
use covinst_core::paths::{PathLocation, STORE_PREFIX_TEMPLATE};
use covinst_core::{
    instrument_file, instrument_tree, BatchContext, CoverageReport, InstrumentOptions, PassStatus,
    PathStyle, ResolvedConfig,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn instrument_fixture(name: &str, options: &InstrumentOptions) -> covinst_core::InstrumentOutput {
    instrument_file(&fixture_path(name), name, options, &BatchContext::new()).unwrap()
}

#[test]
fn test_simple_functions() {
    let output = instrument_fixture("simple.js", &InstrumentOptions::default());
    let cov = &output.file_coverage;

    assert_eq!(output.status, PassStatus::Instrumented);
    assert_eq!(cov.path, "simple.js");
    let names: Vec<&str> = cov.fn_map.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["add", "(anonymous_1)"]);
    assert_eq!(cov.statement_map.len(), 4);
    assert!(cov.branch_map.is_empty());
    assert_eq!(cov.fn_map[0].decl.start.line, 1);
    assert_eq!(cov.fn_map[1].line, 5);
}

#[test]
fn test_every_branch_kind() {
    let output = instrument_fixture("branches.js", &InstrumentOptions::default());
    let cov = &output.file_coverage;

    let kinds: Vec<BranchKind> = cov.branch_map.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BranchKind::DefaultArg,
            BranchKind::If,
            BranchKind::If,
            BranchKind::BinaryExpr,
            BranchKind::Switch,
            BranchKind::CondExpr,
        ]
    );
    let paths: Vec<usize> = cov.b.iter().map(Vec::len).collect();
    assert_eq!(paths, vec![1, 2, 2, 3, 2, 2]);
    assert_eq!(cov.statement_map.len(), 6);
    assert_eq!(cov.fn_map.len(), 1);

    let lines: Vec<u32> = cov.branch_map.iter().map(|b| b.line).collect();
    assert_eq!(lines, vec![1, 2, 4, 7, 8, 10]);
}

#[test]
fn test_ignored_file() {
    let output = instrument_fixture("ignored.js", &InstrumentOptions::default());
    assert_eq!(output.status, PassStatus::Ignored);
    assert!(output.file_coverage.is_empty());
}

#[test]
fn test_ignore_hints() {
    let output = instrument_fixture("hints.js", &InstrumentOptions::default());
    let cov = &output.file_coverage;
    let names: Vec<&str> = cov.fn_map.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "render", "update"]);
    assert_eq!(cov.statement_map.len(), 3);
    assert_eq!(cov.b, vec![vec![0]]);

    let options = InstrumentOptions {
        ignore_class_methods: vec!["render".to_string()],
        ..InstrumentOptions::default()
    };
    let output = instrument_fixture("hints.js", &options);
    let names: Vec<&str> = output
        .file_coverage
        .fn_map
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["main", "update"]);
    assert_eq!(output.file_coverage.statement_map.len(), 2);
}

#[test]
fn test_typescript_module() {
    let output = instrument_fixture("typed.ts", &InstrumentOptions::default());
    let cov = &output.file_coverage;
    let names: Vec<&str> = cov.fn_map.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["constructor", "area", "scale", "(anonymous_3)"]);
    assert_eq!(cov.statement_map.len(), 4);
    assert_eq!(cov.branch_map.len(), 1);
    assert_eq!(cov.branch_map[0].kind, BranchKind::BinaryExpr);
    assert_eq!(cov.branch_map[0].locations.len(), 2);
}

#[test]
fn test_coverage_json_layout() {
    let output = instrument_fixture("branches.js", &InstrumentOptions::default());
    let json = serde_json::to_value(&output.file_coverage).unwrap();

    for key in ["path", "statementMap", "fnMap", "branchMap", "s", "f", "b", "hash"] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["branchMap"]["0"]["type"], "default-arg");
    assert_eq!(json["branchMap"]["3"]["locations"].as_array().unwrap().len(), 3);
    assert_eq!(json["s"]["5"], 0);
    assert!(json["s"].get("6").is_none());
    assert_eq!(json["statementMap"]["0"]["start"]["line"], 3);
    assert!(json.get("inputSourceMap").is_none());
}

#[test]
fn test_instrumentation_is_deterministic() {
    let first = instrument_fixture("typed.ts", &InstrumentOptions::default());
    let second = instrument_fixture("typed.ts", &InstrumentOptions::default());
    assert_eq!(first.file_coverage, second.file_coverage);
}

#[test]
fn test_project_tree_with_config() {
    let root = fixture_path("project");
    let config = load_and_resolve(&root, None).unwrap();
    assert!(config.config_path.is_some());

    let tree = instrument_tree(
        &root,
        &config,
        &config.instrument_options(),
        &BatchContext::new(),
        &PathStyle::relative(),
    )
    .unwrap();

    let paths: Vec<&str> = tree.files.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["src/index.js", "src/util.ts"]);
    assert_eq!(tree.skipped, 1);

    let index = &tree.files["src/index.js"];
    assert_eq!(index.statement_map.len(), 2);
    assert!(index.fn_map.is_empty());

    let util = &tree.files["src/util.ts"];
    assert_eq!(util.fn_map.len(), 1);
    assert_eq!(util.statement_map.len(), 2);
    assert_eq!(util.branch_map.len(), 2);
}

#[test]
fn test_single_file_tree() {
    let config = ResolvedConfig::defaults().unwrap();
    let tree = instrument_tree(
        &fixture_path("simple.js"),
        &config,
        &InstrumentOptions::default(),
        &BatchContext::new(),
        &PathStyle::relative(),
    )
    .unwrap();
    let paths: Vec<&str> = tree.files.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["simple.js"]);
    assert_eq!(tree.skipped, 0);
}

#[test]
fn test_prefixed_tree_report() {
    let root = fixture_path("project");
    let config = load_and_resolve(&root, None).unwrap();
    let git = GitInfo {
        branch: "main".to_string(),
        project_name: "demo".to_string(),
        ..GitInfo::default()
    };
    let style = PathStyle::resolve(PathLocation::Relative, Some(STORE_PREFIX_TEMPLATE), Some(&git));
    let batch = BatchContext::with_git_info(git);

    let tree = instrument_tree(&root, &config, &config.instrument_options(), &batch, &style).unwrap();
    let paths: Vec<&str> = tree.files.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["store/demo/main/code/src/index.js", "store/demo/main/code/src/util.ts"]
    );
    assert!(batch.git_info_claimed());

    let report = CoverageReport::new(tree.files)
        .with_git_info(batch.git_info().cloned())
        .with_relative_path_prefix(style.prefix().map(str::to_string));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["branch"], "main");
    assert_eq!(json["relative_path_prefix"], "store/demo/main/code");
    assert_eq!(
        json["data"]["store/demo/main/code/src/util.ts"]["path"],
        "store/demo/main/code/src/util.ts"
    );
}
