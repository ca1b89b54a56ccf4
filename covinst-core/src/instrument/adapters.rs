//! Node-shape adapters
//!
//! Each adapter normalizes a node so counters have a place to go. All of them
//! leave an already normalized node untouched, so running one twice is the
//! same as running it once.

use swc_common::util::take::Take;
use swc_common::{Spanned, SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{ArrowExpr, BlockStmt, BlockStmtOrExpr, Expr, ParenExpr, ReturnStmt, Stmt};

/// Turn an expression-bodied arrow into a block body returning the expression
pub fn to_block_body(arrow: &mut ArrowExpr) {
    let BlockStmtOrExpr::Expr(expr) = &mut *arrow.body else {
        return;
    };
    let span = expr.span();
    let value = Take::take(&mut **expr);
    *arrow.body = BlockStmtOrExpr::BlockStmt(BlockStmt {
        span,
        ctxt: SyntaxContext::empty(),
        stmts: vec![Stmt::Return(ReturnStmt {
            span,
            arg: Some(Box::new(value)),
        })],
    });
}

/// Wrap a non-block statement in a block carrying the statement's span
pub fn ensure_block(stmt: &mut Box<Stmt>) {
    if matches!(**stmt, Stmt::Block(_)) {
        return;
    }
    let inner = Take::take(&mut **stmt);
    **stmt = Stmt::Block(BlockStmt {
        span: inner.span(),
        ctxt: SyntaxContext::empty(),
        stmts: vec![inner],
    });
}

/// Like [`ensure_block`], creating an empty synthetic block when absent
pub fn ensure_block_opt(stmt: &mut Option<Box<Stmt>>) {
    match stmt {
        Some(stmt) => ensure_block(stmt),
        None => {
            *stmt = Some(Box::new(Stmt::Block(BlockStmt {
                span: DUMMY_SP,
                ctxt: SyntaxContext::empty(),
                stmts: Vec::new(),
            })));
        }
    }
}

/// Parenthesize a class heritage expression
pub fn parenthesize(expr: &mut Option<Box<Expr>>) {
    let Some(expr) = expr else {
        return;
    };
    if matches!(**expr, Expr::Paren(_)) {
        return;
    }
    let inner = Take::take(&mut **expr);
    **expr = Expr::Paren(ParenExpr {
        span: DUMMY_SP,
        expr: Box::new(inner),
    });
}
