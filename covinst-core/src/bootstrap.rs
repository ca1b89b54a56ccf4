//! Runtime prelude injected at the top of an instrumented program
//!
//! The coverage bootstrap binds the file's identifier to the shared per-path
//! coverage object:
//!
//! ```text
//! var cov_x = (function () {
//!     var path = "...", hash = "...", Function = (function () {}).constructor,
//!         global = (new Function("return this"))(), gcv = "__coverage__",
//!         coverageData = {...}, coverage = global[gcv] || (global[gcv] = {});
//!     if (coverage[path] && coverage[path].hash === hash) { return coverage[path]; }
//!     coverageData.hash = hash;
//!     return coverage[path] = coverageData;
//! })();
//! ```
//!
//! The git bootstrap publishes repository metadata as `global["__git_info__"]`.

use crate::git::GitInfo;
use crate::instrument::counters::is_directive;
use crate::synth::{
    assign_member, bin, call, computed, declarator, expr_stmt, function_expr, ident_expr,
    json_to_expr, member, new_expr, paren, str_lit, var_stmt,
};
use serde_json::Value;
use swc_common::{SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{BinaryOp, BlockStmt, Expr, IfStmt, ModuleItem, ObjectLit, Program, ReturnStmt, Stmt};

/// Global property holding repository metadata
pub const GIT_INFO_GLOBAL: &str = "__git_info__";

/// Inputs of the coverage bootstrap
#[derive(Debug)]
pub struct CoverageBootstrap<'a> {
    pub identifier: &'a str,
    pub path: &'a str,
    pub hash: &'a str,
    pub coverage_variable: &'a str,
    /// Initial coverage object, without its hash
    pub data: &'a Value,
}

/// `(new Function("return this"))()`
fn global_this() -> Expr {
    call(
        paren(new_expr(ident_expr("Function"), vec![str_lit("return this")])),
        vec![],
    )
}

fn returning(arg: Expr) -> Stmt {
    Stmt::Return(ReturnStmt {
        span: DUMMY_SP,
        arg: Some(Box::new(arg)),
    })
}

/// `var <identifier> = (function () { ... })();`
pub fn coverage_bootstrap(params: &CoverageBootstrap<'_>) -> Stmt {
    let coverage_of_path = || computed(ident_expr("coverage"), ident_expr("path"));

    let locals = var_stmt(vec![
        declarator("path", str_lit(params.path)),
        declarator("hash", str_lit(params.hash)),
        declarator(
            "Function",
            Expr::Member(member(paren(function_expr(vec![])), "constructor")),
        ),
        declarator("global", global_this()),
        declarator("gcv", str_lit(params.coverage_variable)),
        declarator("coverageData", json_to_expr(params.data)),
        declarator(
            "coverage",
            bin(
                BinaryOp::LogicalOr,
                Expr::Member(computed(ident_expr("global"), ident_expr("gcv"))),
                paren(assign_member(
                    computed(ident_expr("global"), ident_expr("gcv")),
                    Expr::Object(ObjectLit {
                        span: DUMMY_SP,
                        props: vec![],
                    }),
                )),
            ),
        ),
    ]);

    let reuse_existing = Stmt::If(IfStmt {
        span: DUMMY_SP,
        test: Box::new(bin(
            BinaryOp::LogicalAnd,
            Expr::Member(coverage_of_path()),
            bin(
                BinaryOp::EqEqEq,
                Expr::Member(member(Expr::Member(coverage_of_path()), "hash")),
                ident_expr("hash"),
            ),
        )),
        cons: Box::new(Stmt::Block(BlockStmt {
            span: DUMMY_SP,
            ctxt: SyntaxContext::empty(),
            stmts: vec![returning(Expr::Member(coverage_of_path()))],
        })),
        alt: None,
    });

    let stamp_hash = expr_stmt(assign_member(
        member(ident_expr("coverageData"), "hash"),
        ident_expr("hash"),
    ));
    let publish = returning(assign_member(coverage_of_path(), ident_expr("coverageData")));

    let init = call(
        paren(function_expr(vec![locals, reuse_existing, stamp_hash, publish])),
        vec![],
    );
    var_stmt(vec![declarator(params.identifier, init)])
}

/// `(function () { var gitInfo = {...}, global = ...; global["__git_info__"] = gitInfo; })();`
pub fn git_info_bootstrap(info: &GitInfo) -> Result<Stmt, serde_json::Error> {
    let value = serde_json::to_value(info)?;
    let locals = var_stmt(vec![
        declarator("gitInfo", json_to_expr(&value)),
        declarator("global", global_this()),
    ]);
    let publish = expr_stmt(assign_member(
        computed(ident_expr("global"), str_lit(GIT_INFO_GLOBAL)),
        ident_expr("gitInfo"),
    ));
    Ok(expr_stmt(call(paren(function_expr(vec![locals, publish])), vec![])))
}

/// Insert the prelude at the top of the program, after its directive prologue
pub fn prepend(program: &mut Program, prelude: Vec<Stmt>) {
    match program {
        Program::Module(module) => {
            let at = module
                .body
                .iter()
                .take_while(|item| matches!(item, ModuleItem::Stmt(stmt) if is_directive(stmt)))
                .count();
            module
                .body
                .splice(at..at, prelude.into_iter().map(ModuleItem::Stmt));
        }
        Program::Script(script) => {
            let at = script.body.iter().take_while(|stmt| is_directive(stmt)).count();
            script.body.splice(at..at, prelude);
        }
    }
}
