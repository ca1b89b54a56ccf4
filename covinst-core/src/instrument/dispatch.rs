//! Dispatch table: which actions run for which node kind
//!
//! `apply` is an exhaustive match, so a new node kind cannot be added to
//! [`NodeMut`] without deciding its actions.

use super::adapters;
use super::counters::FunctionTarget;
use super::visitor::CoverageVisitor;
use crate::error::InstrumentError;
use crate::node::{fn_expr_span, method_prop_span, NodeKey, NodeKind};
use swc_common::Spanned;
use swc_ecma_ast::{
    ArrowExpr, AssignPat, AssignPatProp, BinExpr, BlockStmt, BlockStmtOrExpr, BreakStmt, ClassDecl,
    ClassMethod, CondExpr, Constructor, ContinueStmt, DebuggerStmt, DoWhileStmt, ExprStmt, FnDecl,
    FnExpr, ForInStmt, ForOfStmt, ForStmt, GetterProp, IfStmt, LabeledStmt, MethodProp,
    ParenExpr, PrivateMethod, PropName, ReturnStmt, SetterProp, SwitchCase, SwitchStmt,
    ThrowStmt, TryStmt, VarDecl, VarDeclOrExpr, VarDeclarator, WhileStmt, WithStmt,
};

/// Mutable handle on a dispatched node
pub(super) enum NodeMut<'n> {
    Arrow(&'n mut ArrowExpr),
    AssignPat(&'n mut AssignPat),
    AssignPatProp(&'n mut AssignPatProp),
    Block(&'n mut BlockStmt),
    ClassMethod(&'n mut ClassMethod),
    PrivateMethod(&'n mut PrivateMethod),
    Constructor(&'n mut Constructor),
    MethodProp(&'n mut MethodProp),
    Getter(&'n mut GetterProp),
    Setter(&'n mut SetterProp),
    ClassDecl(&'n mut ClassDecl),
    ExprStmt(&'n mut ExprStmt),
    Break(&'n mut BreakStmt),
    Continue(&'n mut ContinueStmt),
    Debugger(&'n mut DebuggerStmt),
    Return(&'n mut ReturnStmt),
    Throw(&'n mut ThrowStmt),
    Try(&'n mut TryStmt),
    Labeled(&'n mut LabeledStmt),
    VarDecl(&'n mut VarDecl),
    VarDeclarator {
        node: &'n mut VarDeclarator,
        hoistable: bool,
    },
    If(&'n mut IfStmt),
    For(&'n mut ForStmt),
    ForIn(&'n mut ForInStmt),
    ForOf(&'n mut ForOfStmt),
    While(&'n mut WhileStmt),
    DoWhile(&'n mut DoWhileStmt),
    With(&'n mut WithStmt),
    Switch(&'n mut SwitchStmt),
    SwitchCase {
        node: &'n mut SwitchCase,
        switch: NodeKey,
    },
    FnDecl(&'n mut FnDecl),
    FnExpr(&'n mut FnExpr),
    Cond(&'n mut CondExpr),
    Logical {
        node: &'n mut BinExpr,
        outermost: bool,
    },
    Paren(&'n mut ParenExpr),
}

impl NodeMut<'_> {
    pub(super) fn key(&self) -> NodeKey {
        let (kind, span) = match self {
            NodeMut::Arrow(n) => (NodeKind::ArrowFunction, n.span),
            NodeMut::AssignPat(n) => (NodeKind::AssignmentPattern, n.span),
            NodeMut::AssignPatProp(n) => (NodeKind::AssignmentProperty, n.span),
            NodeMut::Block(n) => (NodeKind::Block, n.span),
            NodeMut::ClassMethod(n) => (NodeKind::ClassMethod, n.span),
            NodeMut::PrivateMethod(n) => (NodeKind::ClassPrivateMethod, n.span),
            NodeMut::Constructor(n) => (NodeKind::Constructor, n.span),
            NodeMut::MethodProp(n) => (NodeKind::ObjectMethod, method_prop_span(n)),
            NodeMut::Getter(n) => (NodeKind::Getter, n.span),
            NodeMut::Setter(n) => (NodeKind::Setter, n.span),
            NodeMut::ClassDecl(n) => (NodeKind::ClassDeclaration, n.class.span),
            NodeMut::ExprStmt(n) => (NodeKind::ExpressionStatement, n.span),
            NodeMut::Break(n) => (NodeKind::Break, n.span),
            NodeMut::Continue(n) => (NodeKind::Continue, n.span),
            NodeMut::Debugger(n) => (NodeKind::Debugger, n.span),
            NodeMut::Return(n) => (NodeKind::Return, n.span),
            NodeMut::Throw(n) => (NodeKind::Throw, n.span),
            NodeMut::Try(n) => (NodeKind::Try, n.span),
            NodeMut::Labeled(n) => (NodeKind::Labeled, n.span),
            NodeMut::VarDecl(n) => (NodeKind::VariableDeclaration, n.span),
            NodeMut::VarDeclarator { node, .. } => (NodeKind::VariableDeclarator, node.span),
            NodeMut::If(n) => (NodeKind::If, n.span),
            NodeMut::For(n) => (NodeKind::For, n.span),
            NodeMut::ForIn(n) => (NodeKind::ForIn, n.span),
            NodeMut::ForOf(n) => (NodeKind::ForOf, n.span),
            NodeMut::While(n) => (NodeKind::While, n.span),
            NodeMut::DoWhile(n) => (NodeKind::DoWhile, n.span),
            NodeMut::With(n) => (NodeKind::With, n.span),
            NodeMut::Switch(n) => (NodeKind::Switch, n.span),
            NodeMut::SwitchCase { node, .. } => (NodeKind::SwitchCase, node.span),
            NodeMut::FnDecl(n) => (NodeKind::FunctionDeclaration, n.function.span),
            NodeMut::FnExpr(n) => (NodeKind::FunctionExpression, fn_expr_span(n)),
            NodeMut::Cond(n) => (NodeKind::Conditional, n.span),
            NodeMut::Logical { node, .. } => (NodeKind::Logical, node.span),
            NodeMut::Paren(n) => (NodeKind::Parenthesized, n.span),
        };
        NodeKey::new(kind, span)
    }

    /// Name checked against the ignored class-method list
    pub(super) fn method_name(&self) -> Option<String> {
        match self {
            NodeMut::ClassMethod(n) => prop_name_text(&n.key),
            NodeMut::MethodProp(n) => prop_name_text(&n.key),
            NodeMut::FnExpr(n) => n.ident.as_ref().map(|id| id.sym.to_string()),
            _ => None,
        }
    }
}

pub(super) fn prop_name_text(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(str_lit) => Some(str_lit.value.to_atom_lossy().to_string()),
        PropName::Num(num) => Some(num.to_string()),
        _ => None,
    }
}

impl CoverageVisitor<'_> {
    /// Run the actions registered for a node kind, in order
    pub(super) fn apply(&mut self, node: NodeMut<'_>) -> Result<(), InstrumentError> {
        match node {
            NodeMut::Arrow(n) => {
                adapters::to_block_body(n);
                let span = n.span;
                let body = match &mut *n.body {
                    BlockStmtOrExpr::BlockStmt(block) => Some(block),
                    BlockStmtOrExpr::Expr(_) => None,
                };
                self.cover_function(FunctionTarget {
                    kind: NodeKind::ArrowFunction,
                    name: None,
                    name_span: None,
                    span,
                    body,
                })
            }
            NodeMut::FnDecl(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::FunctionDeclaration,
                name: Some(n.ident.sym.to_string()),
                name_span: Some(n.ident.span),
                span: n.function.span,
                body: n.function.body.as_mut(),
            }),
            NodeMut::FnExpr(n) => {
                let span = fn_expr_span(n);
                self.cover_function(FunctionTarget {
                    kind: NodeKind::FunctionExpression,
                    name: n.ident.as_ref().map(|id| id.sym.to_string()),
                    name_span: n.ident.as_ref().map(|id| id.span),
                    span,
                    body: n.function.body.as_mut(),
                })
            }
            NodeMut::ClassMethod(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::ClassMethod,
                name: prop_name_text(&n.key),
                name_span: Some(n.key.span()),
                span: n.span,
                body: n.function.body.as_mut(),
            }),
            NodeMut::PrivateMethod(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::ClassPrivateMethod,
                name: Some(format!("#{}", n.key.name)),
                name_span: Some(n.key.span),
                span: n.span,
                body: n.function.body.as_mut(),
            }),
            NodeMut::Constructor(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::Constructor,
                name: Some("constructor".to_string()),
                name_span: Some(n.key.span()),
                span: n.span,
                body: n.body.as_mut(),
            }),
            NodeMut::MethodProp(n) => {
                let span = method_prop_span(n);
                self.cover_function(FunctionTarget {
                    kind: NodeKind::ObjectMethod,
                    name: prop_name_text(&n.key),
                    name_span: Some(n.key.span()),
                    span,
                    body: n.function.body.as_mut(),
                })
            }
            NodeMut::Getter(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::Getter,
                name: prop_name_text(&n.key),
                name_span: Some(n.key.span()),
                span: n.span,
                body: n.body.as_mut(),
            }),
            NodeMut::Setter(n) => self.cover_function(FunctionTarget {
                kind: NodeKind::Setter,
                name: prop_name_text(&n.key),
                name_span: Some(n.key.span()),
                span: n.span,
                body: n.body.as_mut(),
            }),
            NodeMut::AssignPat(n) => self.cover_default_value(n.span, &mut n.right),
            NodeMut::AssignPatProp(n) => match n.value.as_deref_mut() {
                Some(value) => self.cover_default_value(n.span, value),
                None => Ok(()),
            },
            NodeMut::ClassDecl(n) => {
                adapters::parenthesize(&mut n.class.super_class);
                Ok(())
            }
            NodeMut::Block(_) | NodeMut::VarDecl(_) | NodeMut::Paren(_) => Ok(()),
            NodeMut::ExprStmt(n) => self.cover_statement(NodeKind::ExpressionStatement, n.span),
            NodeMut::Break(n) => self.cover_statement(NodeKind::Break, n.span),
            NodeMut::Continue(n) => self.cover_statement(NodeKind::Continue, n.span),
            NodeMut::Debugger(n) => self.cover_statement(NodeKind::Debugger, n.span),
            NodeMut::Return(n) => self.cover_statement(NodeKind::Return, n.span),
            NodeMut::Throw(n) => self.cover_statement(NodeKind::Throw, n.span),
            NodeMut::Try(n) => self.cover_statement(NodeKind::Try, n.span),
            NodeMut::Labeled(n) => self.cover_statement(NodeKind::Labeled, n.span),
            NodeMut::VarDeclarator { node, hoistable } => match node.init.as_deref_mut() {
                Some(init) => self.cover_expression(init, hoistable),
                None => Ok(()),
            },
            NodeMut::If(n) => {
                adapters::ensure_block(&mut n.cons);
                adapters::ensure_block_opt(&mut n.alt);
                self.cover_if_branches(n)
            }
            NodeMut::For(n) => {
                adapters::ensure_block(&mut n.body);
                self.skip_for_init(n);
                self.cover_statement(NodeKind::For, n.span)
            }
            NodeMut::ForIn(n) => {
                adapters::ensure_block(&mut n.body);
                self.cover_statement(NodeKind::ForIn, n.span)
            }
            NodeMut::ForOf(n) => {
                adapters::ensure_block(&mut n.body);
                self.cover_statement(NodeKind::ForOf, n.span)
            }
            NodeMut::While(n) => {
                adapters::ensure_block(&mut n.body);
                self.cover_statement(NodeKind::While, n.span)
            }
            NodeMut::DoWhile(n) => {
                adapters::ensure_block(&mut n.body);
                self.cover_statement(NodeKind::DoWhile, n.span)
            }
            NodeMut::With(n) => {
                adapters::ensure_block(&mut n.body);
                self.cover_statement(NodeKind::With, n.span)
            }
            NodeMut::Switch(n) => {
                self.create_switch_branch(n)?;
                self.cover_statement(NodeKind::Switch, n.span)
            }
            NodeMut::SwitchCase { node, switch } => self.cover_switch_case(node, switch),
            NodeMut::Cond(n) => self.cover_ternary(n),
            NodeMut::Logical { node, outermost } => {
                if outermost {
                    self.cover_logical(node)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The init clause of a `for` loop is never counted
    fn skip_for_init(&mut self, node: &ForStmt) {
        let key = match &node.init {
            Some(VarDeclOrExpr::VarDecl(decl)) => {
                Some(NodeKey::new(NodeKind::VariableDeclaration, decl.span))
            }
            Some(VarDeclOrExpr::Expr(expr)) => crate::node::expr_key(expr),
            None => None,
        };
        if let Some(key) = key {
            self.state.attrs.mark_skip_all(key);
        }
    }
}

