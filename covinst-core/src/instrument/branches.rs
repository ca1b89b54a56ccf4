//! Branch records for if/else, switch, ternaries, short-circuit chains, and
//! default values

use super::counters::{increase, wrap_in_sequence, Counter, Placement};
use super::visitor::CoverageVisitor;
use crate::coverage::BranchKind;
use crate::directives::{DirectiveScanner, IgnoreHint};
use crate::error::InstrumentError;
use crate::location::Location;
use crate::node::{is_logical, is_logical_op, NodeKey, NodeKind};
use swc_common::{Span, Spanned};
use swc_ecma_ast::{BinExpr, CondExpr, Expr, IfStmt, Stmt, SwitchCase, SwitchStmt};

impl CoverageVisitor<'_> {
    /// Add a path to `branch` and build its counter
    fn branch_increment(&mut self, branch: usize, loc: Location) -> Result<Expr, InstrumentError> {
        let path = self.state.coverage.add_branch_path(branch, loc)?;
        Ok(increase(&self.state.identifier, Counter::Branch { branch, path }))
    }

    /// Both paths of an `if` are located at the `if` itself
    pub(super) fn cover_if_branches(&mut self, node: &mut IfStmt) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(node.span) else {
            return Ok(());
        };
        let hint = self.scanner.hint_for(node.span);
        let branch = self.state.coverage.new_branch(BranchKind::If, loc)?;

        self.cover_if_side(&mut node.cons, branch, loc, hint == Some(IgnoreHint::If))?;
        match node.alt.as_deref_mut() {
            Some(alt) => self.cover_if_side(alt, branch, loc, hint == Some(IgnoreHint::Else)),
            None => Ok(()),
        }
    }

    fn cover_if_side(
        &mut self,
        side: &mut Stmt,
        branch: usize,
        loc: Location,
        ignored: bool,
    ) -> Result<(), InstrumentError> {
        let Stmt::Block(block) = side else {
            return Err(InstrumentError::UnsupportedNode {
                kind: NodeKind::If,
                location: Some(loc),
            });
        };
        if ignored {
            self.state
                .attrs
                .mark_skip_all(NodeKey::new(NodeKind::Block, block.span));
            return Ok(());
        }
        let increment = self.branch_increment(branch, loc)?;
        self.insert_counter(Placement::Block(block), increment)
    }

    /// Create the switch's branch record; its cases add the paths
    pub(super) fn create_switch_branch(&mut self, node: &SwitchStmt) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(node.span) else {
            return Ok(());
        };
        let branch = self.state.coverage.new_branch(BranchKind::Switch, loc)?;
        self.state
            .attrs
            .set_branch(NodeKey::new(NodeKind::Switch, node.span), branch);
        Ok(())
    }

    pub(super) fn cover_switch_case(&mut self, node: &mut SwitchCase, switch: NodeKey) -> Result<(), InstrumentError> {
        let location = self.location(node.span);
        let branch = self
            .state
            .attrs
            .branch(switch)
            .ok_or(InstrumentError::MissingSwitchBranch { location })?;
        let Some(loc) = location else {
            return Ok(());
        };
        let increment = self.branch_increment(branch, loc)?;
        node.cons.insert(0, crate::synth::expr_stmt(increment));
        Ok(())
    }

    pub(super) fn cover_ternary(&mut self, node: &mut CondExpr) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(node.span) else {
            return Ok(());
        };
        let branch = self.state.coverage.new_branch(BranchKind::CondExpr, loc)?;
        self.cover_expression_path(&mut node.cons, branch)?;
        self.cover_expression_path(&mut node.alt, branch)
    }

    /// Flatten the whole chain under an outermost logical expression into
    /// one branch with a path per leaf operand
    pub(super) fn cover_logical(&mut self, node: &mut BinExpr) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(node.span) else {
            return Ok(());
        };
        let branch = self.state.coverage.new_branch(BranchKind::BinaryExpr, loc)?;

        let mut leaves = Vec::new();
        collect_leaves(&self.scanner, &mut node.left, &mut leaves);
        collect_leaves(&self.scanner, &mut node.right, &mut leaves);

        for leaf in leaves {
            self.cover_expression_path(leaf, branch)?;
        }
        Ok(())
    }

    /// Default value of a parameter or destructuring target
    pub(super) fn cover_default_value(&mut self, span: Span, value: &mut Expr) -> Result<(), InstrumentError> {
        let Some(loc) = self.location(span) else {
            return Ok(());
        };
        let branch = self.state.coverage.new_branch(BranchKind::DefaultArg, loc)?;
        let Some(value_loc) = self.location(value.span()) else {
            return Ok(());
        };
        let increment = self.branch_increment(branch, value_loc)?;
        self.insert_counter(
            Placement::Expression {
                expr: value,
                hoistable: false,
            },
            increment,
        )
    }

    /// One path for an expression operand, unless it is hinted away or synthetic
    fn cover_expression_path(&mut self, expr: &mut Expr, branch: usize) -> Result<(), InstrumentError> {
        if self.scanner.hint_for_expr(expr) == Some(IgnoreHint::Next) {
            return Ok(());
        }
        let Some(loc) = self.location(expr.span()) else {
            return Ok(());
        };
        let increment = self.branch_increment(branch, loc)?;
        wrap_in_sequence(expr, increment);
        Ok(())
    }
}

/// Leaf operands of a short-circuit chain, left to right
///
/// Descends through nested logical operators of any kind and through
/// parentheses around them. A sub-chain hinted `istanbul ignore next`
/// contributes no leaves.
fn collect_leaves<'e>(scanner: &DirectiveScanner<'_>, expr: &'e mut Expr, out: &mut Vec<&'e mut Expr>) {
    // Some(true): descend, Some(false): hinted away, None: leaf
    let descend = match &*expr {
        Expr::Bin(bin) if is_logical_op(bin.op) => Some(scanner.hint_for(bin.span) != Some(IgnoreHint::Next)),
        Expr::Paren(paren) if is_logical_chain(&paren.expr) => {
            Some(scanner.hint_for(paren.span) != Some(IgnoreHint::Next))
        }
        _ => None,
    };
    match descend {
        None => out.push(expr),
        Some(false) => {}
        Some(true) => match expr {
            Expr::Bin(bin) => {
                collect_leaves(scanner, &mut bin.left, out);
                collect_leaves(scanner, &mut bin.right, out);
            }
            Expr::Paren(paren) => collect_leaves(scanner, &mut paren.expr, out),
            _ => {}
        },
    }
}

fn is_logical_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Bin(bin) => is_logical(bin),
        Expr::Paren(paren) => is_logical_chain(&paren.expr),
        _ => false,
    }
}
