//! Program driver
//!
//! One call instruments one parsed file in place:
//! file-ignore check, already-instrumented check, a single traversal,
//! freeze and fingerprint, then the runtime prelude.
//!
//! Global invariants enforced:
//! - A pass traverses the tree at most once and freezes its map exactly once
//! - Ignored and already-instrumented files are returned unmodified
//! - Git metadata is injected into at most one file per batch

mod adapters;
mod branches;
pub(crate) mod counters;
mod dispatch;
mod state;
mod visitor;

use crate::bootstrap::{self, CoverageBootstrap};
use crate::coverage::{CoverageMap, FileCoverage};
use crate::directives::DirectiveScanner;
use crate::error::InstrumentError;
use crate::fingerprint::{self, COVERAGE_SCHEMA};
use crate::git::GitInfo;
use crate::ident::generate_identifier;
use crate::node::{NodeKey, NodeKind};
use serde::Serialize;
use serde_json::Value;
use state::VisitState;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use swc_common::comments::SingleThreadedComments;
use swc_common::{SourceMap, Spanned};
use swc_ecma_ast::{Decl, ModuleDecl, ModuleItem, Pat, Program, Stmt};
use swc_ecma_visit::VisitMutWith;
use visitor::CoverageVisitor;

/// Global variable holding the per-path coverage registry
pub const DEFAULT_COVERAGE_VARIABLE: &str = "__coverage__";

/// Called with the path and final snapshot of every instrumented or ignored file
pub type CoverCallback = Arc<dyn Fn(&str, &FileCoverage) + Send + Sync>;

#[derive(Clone)]
pub struct InstrumentOptions {
    pub coverage_variable: String,
    /// Class and object methods (and named function expressions) never counted
    pub ignore_class_methods: Vec<String>,
    /// Source map of the code before this pass; `file` and `sources` are
    /// rewritten to the recorded path's basename
    pub input_source_map: Option<Value>,
    pub on_cover: Option<CoverCallback>,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        InstrumentOptions {
            coverage_variable: DEFAULT_COVERAGE_VARIABLE.to_string(),
            ignore_class_methods: Vec::new(),
            input_source_map: None,
            on_cover: None,
        }
    }
}

impl fmt::Debug for InstrumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentOptions")
            .field("coverage_variable", &self.coverage_variable)
            .field("ignore_class_methods", &self.ignore_class_methods)
            .field("input_source_map", &self.input_source_map.is_some())
            .field("on_cover", &self.on_cover.is_some())
            .finish()
    }
}

/// The file being instrumented, as the parser left it
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    /// Canonical path recorded in the coverage map
    pub path: &'a str,
    pub source_map: &'a SourceMap,
    pub comments: &'a SingleThreadedComments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Instrumented,
    /// Skipped by an `istanbul ignore file` comment
    Ignored,
    /// The program already binds this file's coverage identifier
    AlreadyInstrumented,
}

#[derive(Debug, Clone)]
pub struct InstrumentOutput {
    pub status: PassStatus,
    pub file_coverage: FileCoverage,
    pub source_mapping_url: Option<String>,
}

/// State shared by every pass of one batch
#[derive(Debug, Default)]
pub struct BatchContext {
    git_info: Option<GitInfo>,
    git_info_claimed: AtomicBool,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_git_info(git_info: GitInfo) -> Self {
        BatchContext {
            git_info: Some(git_info),
            git_info_claimed: AtomicBool::new(false),
        }
    }

    /// Git metadata of the batch, claimed or not
    pub fn git_info(&self) -> Option<&GitInfo> {
        self.git_info.as_ref()
    }

    /// Git metadata for the first caller only
    pub fn claim_git_info(&self) -> Option<&GitInfo> {
        let info = self.git_info.as_ref()?;
        self.git_info_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| info)
    }

    pub fn git_info_claimed(&self) -> bool {
        self.git_info_claimed.load(Ordering::Acquire)
    }
}

/// Instrument one program in place
///
/// # Errors
///
/// Returns the first fatal [`InstrumentError`] met during traversal. The tree
/// may be partially instrumented in that case and should be discarded.
pub fn instrument_program(
    program: &mut Program,
    source: &SourceContext<'_>,
    options: &InstrumentOptions,
    batch: &BatchContext,
) -> Result<InstrumentOutput, InstrumentError> {
    let scanner = DirectiveScanner::new(source.comments, source.source_map);
    let identifier = generate_identifier(source.path);
    let mut coverage = CoverageMap::new(source.path);
    if let Some(map) = &options.input_source_map {
        let mut map = map.clone();
        crate::paths::rebase_source_map(&mut map, source.path);
        coverage.set_input_source_map(map);
    }

    if scanner.file_ignored() {
        tracing::debug!(path = source.path, "file ignored by directive");
        return finish_untouched(coverage, PassStatus::Ignored, options);
    }

    if binds_identifier(program, &identifier) {
        tracing::debug!(path = source.path, %identifier, "file already instrumented");
        coverage.freeze()?;
        return Ok(InstrumentOutput {
            status: PassStatus::AlreadyInstrumented,
            file_coverage: coverage.snapshot(),
            source_mapping_url: None,
        });
    }

    let state = VisitState::new(identifier, coverage, options.ignore_class_methods.clone());
    let mut visitor = CoverageVisitor::new(state, scanner, source.source_map);
    for span in directive_prologue(program) {
        visitor
            .state_mut()
            .attrs
            .mark_skip_all(NodeKey::new(NodeKind::ExpressionStatement, span));
    }
    program.visit_mut_with(&mut visitor);

    let mut state = visitor.into_state();
    if let Some(err) = state.take_error() {
        return Err(err);
    }
    let program_span = program.span();
    let trailer_scanner = DirectiveScanner::new(source.comments, source.source_map);
    let trailer = trailer_scanner
        .source_map_url(program_span)
        .or_else(|| trailer_scanner.trailing_source_map_url(program_span.hi));
    if let Some(url) = trailer {
        state.source_mapping_url = Some(url);
    }

    let VisitState {
        identifier,
        mut coverage,
        source_mapping_url,
        ..
    } = state;
    coverage.freeze()?;
    let snapshot = coverage.snapshot();
    let initial = fingerprint::tagged_payload(&snapshot, COVERAGE_SCHEMA)?;
    let hash = coverage.hash().unwrap_or_default();

    let mut prelude = vec![bootstrap::coverage_bootstrap(&CoverageBootstrap {
        identifier: &identifier,
        path: source.path,
        hash,
        coverage_variable: &options.coverage_variable,
        data: &initial,
    })];
    if let Some(info) = batch.claim_git_info() {
        prelude.push(bootstrap::git_info_bootstrap(info)?);
    }
    bootstrap::prepend(program, prelude);

    tracing::debug!(
        path = source.path,
        statements = snapshot.statement_map.len(),
        functions = snapshot.fn_map.len(),
        branches = snapshot.branch_map.len(),
        "instrumented"
    );
    let output = InstrumentOutput {
        status: PassStatus::Instrumented,
        file_coverage: snapshot,
        source_mapping_url,
    };
    notify(options, &output);
    Ok(output)
}

fn finish_untouched(
    mut coverage: CoverageMap,
    status: PassStatus,
    options: &InstrumentOptions,
) -> Result<InstrumentOutput, InstrumentError> {
    coverage.freeze()?;
    let output = InstrumentOutput {
        status,
        file_coverage: coverage.snapshot(),
        source_mapping_url: None,
    };
    notify(options, &output);
    Ok(output)
}

fn notify(options: &InstrumentOptions, output: &InstrumentOutput) {
    if let Some(on_cover) = &options.on_cover {
        on_cover(&output.file_coverage.path, &output.file_coverage);
    }
}

/// Spans of the program's directive prologue
fn directive_prologue(program: &Program) -> Vec<swc_common::Span> {
    match program {
        Program::Module(module) => module
            .body
            .iter()
            .map_while(|item| match item {
                ModuleItem::Stmt(stmt) if counters::is_directive(stmt) => Some(stmt.span()),
                _ => None,
            })
            .collect(),
        Program::Script(script) => script
            .body
            .iter()
            .take_while(|stmt| counters::is_directive(stmt))
            .map(|stmt| stmt.span())
            .collect(),
    }
}

/// Whether the program's top level already declares `name`
fn binds_identifier(program: &Program, name: &str) -> bool {
    match program {
        Program::Module(module) => module.body.iter().any(|item| match item {
            ModuleItem::Stmt(stmt) => stmt_binds(stmt, name),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => decl_binds(&export.decl, name),
            ModuleItem::ModuleDecl(_) => false,
        }),
        Program::Script(script) => script.body.iter().any(|stmt| stmt_binds(stmt, name)),
    }
}

fn stmt_binds(stmt: &Stmt, name: &str) -> bool {
    match stmt {
        Stmt::Decl(decl) => decl_binds(decl, name),
        _ => false,
    }
}

fn decl_binds(decl: &Decl, name: &str) -> bool {
    match decl {
        Decl::Var(var) => var
            .decls
            .iter()
            .any(|d| matches!(&d.name, Pat::Ident(binding) if &*binding.id.sym == name)),
        Decl::Fn(func) => &*func.ident.sym == name,
        Decl::Class(class) => &*class.ident.sym == name,
        _ => false,
    }
}

#[cfg(test)]
#[path = "instrument/tests.rs"]
mod tests;
