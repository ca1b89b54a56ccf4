//! Node kinds the instrumenter reacts to, and node identity
//!
//! Global invariants enforced:
//! - A node is identified by its kind plus its source span
//! - Synthetic nodes (dummy span) have no identity and carry no attributes

use std::fmt;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{BinExpr, BinaryOp, Expr, FnExpr, MethodProp};

/// Every node kind that has an entry in the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    ArrowFunction,
    AssignmentPattern,
    AssignmentProperty,
    Block,
    ClassMethod,
    ClassPrivateMethod,
    Constructor,
    ObjectMethod,
    Getter,
    Setter,
    ClassDeclaration,
    ExpressionStatement,
    Break,
    Continue,
    Debugger,
    Return,
    Throw,
    Try,
    VariableDeclaration,
    VariableDeclarator,
    If,
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
    Switch,
    SwitchCase,
    With,
    FunctionDeclaration,
    FunctionExpression,
    Labeled,
    Conditional,
    Logical,
    Parenthesized,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ArrowFunction => "ArrowFunctionExpression",
            NodeKind::AssignmentPattern => "AssignmentPattern",
            NodeKind::AssignmentProperty => "AssignmentProperty",
            NodeKind::Block => "BlockStatement",
            NodeKind::ClassMethod => "ClassMethod",
            NodeKind::ClassPrivateMethod => "ClassPrivateMethod",
            NodeKind::Constructor => "ClassConstructor",
            NodeKind::ObjectMethod => "ObjectMethod",
            NodeKind::Getter => "Getter",
            NodeKind::Setter => "Setter",
            NodeKind::ClassDeclaration => "ClassDeclaration",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::Break => "BreakStatement",
            NodeKind::Continue => "ContinueStatement",
            NodeKind::Debugger => "DebuggerStatement",
            NodeKind::Return => "ReturnStatement",
            NodeKind::Throw => "ThrowStatement",
            NodeKind::Try => "TryStatement",
            NodeKind::VariableDeclaration => "VariableDeclaration",
            NodeKind::VariableDeclarator => "VariableDeclarator",
            NodeKind::If => "IfStatement",
            NodeKind::For => "ForStatement",
            NodeKind::ForIn => "ForInStatement",
            NodeKind::ForOf => "ForOfStatement",
            NodeKind::While => "WhileStatement",
            NodeKind::DoWhile => "DoWhileStatement",
            NodeKind::Switch => "SwitchStatement",
            NodeKind::SwitchCase => "SwitchCase",
            NodeKind::With => "WithStatement",
            NodeKind::FunctionDeclaration => "FunctionDeclaration",
            NodeKind::FunctionExpression => "FunctionExpression",
            NodeKind::Labeled => "LabeledStatement",
            NodeKind::Conditional => "ConditionalExpression",
            NodeKind::Logical => "LogicalExpression",
            NodeKind::Parenthesized => "ParenthesizedExpression",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a node for the duration of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub span: Span,
}

impl NodeKey {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        NodeKey { kind, span }
    }

    pub fn is_synthetic(&self) -> bool {
        self.span.is_dummy()
    }
}

pub fn is_logical_op(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
    )
}

pub fn is_logical(bin: &BinExpr) -> bool {
    is_logical_op(bin.op)
}

/// Span of a function expression, which lives on its inner function
pub fn fn_expr_span(node: &FnExpr) -> Span {
    node.function.span
}

/// Span of an object method, from the start of its key to the end of its body
pub fn method_prop_span(node: &MethodProp) -> Span {
    let key = node.key.span();
    if key.is_dummy() {
        return node.function.span;
    }
    Span::new(key.lo, node.function.span.hi)
}

/// Key of an expression if its kind is one the dispatcher handles
pub fn expr_key(expr: &Expr) -> Option<NodeKey> {
    let (kind, span) = match expr {
        Expr::Arrow(arrow) => (NodeKind::ArrowFunction, arrow.span),
        Expr::Fn(func) => (NodeKind::FunctionExpression, fn_expr_span(func)),
        Expr::Cond(cond) => (NodeKind::Conditional, cond.span),
        Expr::Bin(bin) if is_logical(bin) => (NodeKind::Logical, bin.span),
        Expr::Paren(paren) => (NodeKind::Parenthesized, paren.span),
        _ => return None,
    };
    Some(NodeKey::new(kind, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::DUMMY_SP;
    use swc_ecma_ast::{Ident, ParenExpr};

    #[test]
    fn test_kind_names() {
        assert_eq!(NodeKind::If.to_string(), "IfStatement");
        assert_eq!(NodeKind::Logical.as_str(), "LogicalExpression");
    }

    #[test]
    fn test_expr_key_only_for_dispatched_kinds() {
        let ident = Expr::Ident(Ident::new_no_ctxt("a".into(), DUMMY_SP));
        assert_eq!(expr_key(&ident), None);

        let paren = Expr::Paren(ParenExpr {
            span: DUMMY_SP,
            expr: Box::new(ident),
        });
        let key = expr_key(&paren).expect("parenthesized expressions are dispatched");
        assert_eq!(key.kind, NodeKind::Parenthesized);
        assert!(key.is_synthetic());
    }

    #[test]
    fn test_logical_operators() {
        assert!(is_logical_op(BinaryOp::LogicalAnd));
        assert!(is_logical_op(BinaryOp::NullishCoalescing));
        assert!(!is_logical_op(BinaryOp::Add));
    }
}
