//! Counter expressions and where they go
//!
//! A counter lands in one of three places:
//! - first statement of a block
//! - a statement queued before the statement being covered
//! - a parenthesized sequence `(counter, expr)` replacing an expression
//!
//! Function-valued initializers of variable declaration statements are the
//! exception to the last rule: their counter is queued before the declaration
//! so the function keeps its inferred name.

use super::visitor::CoverageVisitor;
use crate::error::InstrumentError;
use crate::node::{NodeKey, NodeKind};
use crate::synth;
use swc_common::util::take::Take;
use swc_common::{Span, Spanned, DUMMY_SP};
use swc_ecma_ast::{
    BlockStmt, Expr, ExprStmt, Lit, ParenExpr, SeqExpr, Stmt, UpdateExpr, UpdateOp,
};

/// One slot of the runtime counter object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    Statement(usize),
    Function(usize),
    Branch { branch: usize, path: usize },
}

/// `<identifier>.s[i]++`, `<identifier>.f[i]++` or `<identifier>.b[i][j]++`
pub(crate) fn increase(identifier: &str, counter: Counter) -> Expr {
    let index = |i: usize| synth::num_lit(i as f64);
    let table = |name: &str| Expr::Member(synth::member(synth::ident_expr(identifier), name));
    let target = match counter {
        Counter::Statement(i) => synth::computed(table("s"), index(i)),
        Counter::Function(i) => synth::computed(table("f"), index(i)),
        Counter::Branch { branch, path } => synth::computed(
            Expr::Member(synth::computed(table("b"), index(branch))),
            index(path),
        ),
    };
    Expr::Update(UpdateExpr {
        span: DUMMY_SP,
        op: UpdateOp::PlusPlus,
        prefix: false,
        arg: Box::new(Expr::Member(target)),
    })
}

/// Replace `expr` with `(increment, expr)`
pub(crate) fn wrap_in_sequence(expr: &mut Expr, increment: Expr) {
    let original = Take::take(expr);
    *expr = Expr::Paren(ParenExpr {
        span: DUMMY_SP,
        expr: Box::new(Expr::Seq(SeqExpr {
            span: DUMMY_SP,
            exprs: vec![Box::new(increment), Box::new(original)],
        })),
    });
}

/// Function, arrow, and class values, possibly parenthesized
pub(crate) fn needs_hoisting(expr: &Expr) -> bool {
    match expr {
        Expr::Fn(_) | Expr::Arrow(_) | Expr::Class(_) => true,
        Expr::Paren(paren) => needs_hoisting(&paren.expr),
        _ => false,
    }
}

/// A string-literal expression statement at the head of a body
pub(crate) fn is_directive(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(**expr, Expr::Lit(Lit::Str(_))))
}

pub(crate) fn directive_prologue_len(stmts: &[Stmt]) -> usize {
    stmts.iter().take_while(|stmt| is_directive(stmt)).count()
}

/// Where a counter goes
pub(super) enum Placement<'n> {
    Block(&'n mut BlockStmt),
    BeforeStatement { kind: NodeKind, span: Span },
    Expression { expr: &'n mut Expr, hoistable: bool },
}

/// A function-like node reduced to what function coverage needs
pub(super) struct FunctionTarget<'n> {
    pub(super) kind: NodeKind,
    pub(super) name: Option<String>,
    pub(super) name_span: Option<Span>,
    pub(super) span: Span,
    pub(super) body: Option<&'n mut BlockStmt>,
}

impl CoverageVisitor<'_> {
    pub(super) fn insert_counter(&mut self, placement: Placement<'_>, increment: Expr) -> Result<(), InstrumentError> {
        match placement {
            Placement::Block(block) => {
                block.stmts.insert(0, synth::expr_stmt(increment));
                Ok(())
            }
            Placement::BeforeStatement { kind, span } => {
                if self.insert_before_current(synth::expr_stmt(increment)) {
                    Ok(())
                } else {
                    Err(InstrumentError::UnsupportedNode {
                        kind,
                        location: self.location(span),
                    })
                }
            }
            Placement::Expression { expr, hoistable } => {
                if hoistable && needs_hoisting(expr) && !self.pending.is_empty() {
                    self.insert_before_current(synth::expr_stmt(increment));
                    return Ok(());
                }
                wrap_in_sequence(expr, increment);
                Ok(())
            }
        }
    }

    /// Count a statement with a counter queued before it
    pub(super) fn cover_statement(&mut self, kind: NodeKind, span: Span) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(span) else {
            return Ok(());
        };
        let index = self.state.coverage.new_statement(loc)?;
        let increment = increase(&self.state.identifier, Counter::Statement(index));
        self.insert_counter(Placement::BeforeStatement { kind, span }, increment)
    }

    /// Count an expression evaluated as a statement (variable initializers)
    pub(super) fn cover_expression(&mut self, expr: &mut Expr, hoistable: bool) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(expr.span()) else {
            return Ok(());
        };
        let index = self.state.coverage.new_statement(loc)?;
        let increment = increase(&self.state.identifier, Counter::Statement(index));
        self.insert_counter(Placement::Expression { expr, hoistable }, increment)
    }

    /// Register a function and count its entry at the top of its body
    ///
    /// Bodiless declarations (overload signatures, `declare`) have nothing to
    /// count and get no record.
    pub(super) fn cover_function(&mut self, target: FunctionTarget<'_>) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(target.span) else {
            return Ok(());
        };
        let Some(body) = target.body else {
            tracing::debug!(kind = %target.kind, at = %loc, "function without body left uncounted");
            return Ok(());
        };
        let decl = target
            .name_span
            .and_then(|span| self.location(span))
            .unwrap_or_else(|| loc.first_column());
        let body_loc = self.location(body.span).unwrap_or(loc);
        let index = self
            .state
            .coverage
            .new_function(target.name.as_deref(), decl, body_loc)?;

        let prologue = directive_prologue_len(&body.stmts);
        for stmt in &body.stmts[..prologue] {
            self.state
                .attrs
                .mark_skip_all(NodeKey::new(NodeKind::ExpressionStatement, stmt.span()));
        }
        let increment = increase(&self.state.identifier, Counter::Function(index));
        body.stmts.insert(prologue, synth::expr_stmt(increment));
        Ok(())
    }
}
