//! Builders for synthesized syntax
//!
//! Everything built here carries a dummy span, which is how the traversal
//! recognizes injected code and leaves it uncounted.

use serde_json::Value;
use swc_common::{SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{
    ArrayLit, AssignExpr, AssignOp, AssignTarget, BinExpr, BinaryOp, BindingIdent, BlockStmt, Bool,
    CallExpr, Callee, ComputedPropName, Decl, Expr, ExprOrSpread, ExprStmt, FnExpr, Function,
    Ident, IdentName, KeyValueProp, Lit, MemberExpr, MemberProp, NewExpr, Null, Number, ObjectLit,
    ParenExpr, Pat, Prop, PropName, PropOrSpread, SimpleAssignTarget, Stmt, Str, UnaryExpr,
    UnaryOp, VarDecl, VarDeclKind, VarDeclarator,
};

pub fn ident(name: &str) -> Ident {
    Ident::new(name.into(), DUMMY_SP, SyntaxContext::empty())
}

pub fn ident_expr(name: &str) -> Expr {
    Expr::Ident(ident(name))
}

pub fn str_node(value: &str) -> Str {
    Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    }
}

pub fn str_lit(value: &str) -> Expr {
    Expr::Lit(Lit::Str(str_node(value)))
}

pub fn num_lit(value: f64) -> Expr {
    if value < 0.0 {
        return Expr::Unary(UnaryExpr {
            span: DUMMY_SP,
            op: UnaryOp::Minus,
            arg: Box::new(num_lit(-value)),
        });
    }
    Expr::Lit(Lit::Num(Number {
        span: DUMMY_SP,
        value,
        raw: None,
    }))
}

pub fn paren(expr: Expr) -> Expr {
    Expr::Paren(ParenExpr {
        span: DUMMY_SP,
        expr: Box::new(expr),
    })
}

/// `obj.name`
pub fn member(obj: Expr, name: &str) -> MemberExpr {
    MemberExpr {
        span: DUMMY_SP,
        obj: Box::new(obj),
        prop: MemberProp::Ident(IdentName::new(name.into(), DUMMY_SP)),
    }
}

/// `obj[key]`
pub fn computed(obj: Expr, key: Expr) -> MemberExpr {
    MemberExpr {
        span: DUMMY_SP,
        obj: Box::new(obj),
        prop: MemberProp::Computed(ComputedPropName {
            span: DUMMY_SP,
            expr: Box::new(key),
        }),
    }
}

pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Bin(BinExpr {
        span: DUMMY_SP,
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `target = value` where target is a member expression
pub fn assign_member(target: MemberExpr, value: Expr) -> Expr {
    Expr::Assign(AssignExpr {
        span: DUMMY_SP,
        op: AssignOp::Assign,
        left: AssignTarget::Simple(SimpleAssignTarget::Member(target)),
        right: Box::new(value),
    })
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(callee)),
        args: args.into_iter().map(arg).collect(),
        type_args: None,
    })
}

pub fn new_expr(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::New(NewExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Box::new(callee),
        args: Some(args.into_iter().map(arg).collect()),
        type_args: None,
    })
}

fn arg(expr: Expr) -> ExprOrSpread {
    ExprOrSpread {
        spread: None,
        expr: Box::new(expr),
    }
}

/// `function () { ...stmts }`
pub fn function_expr(stmts: Vec<Stmt>) -> Expr {
    Expr::Fn(FnExpr {
        ident: None,
        function: Box::new(Function {
            params: Vec::new(),
            decorators: Vec::new(),
            span: DUMMY_SP,
            ctxt: SyntaxContext::empty(),
            body: Some(BlockStmt {
                span: DUMMY_SP,
                ctxt: SyntaxContext::empty(),
                stmts,
            }),
            is_generator: false,
            is_async: false,
            type_params: None,
            return_type: None,
        }),
    })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(ExprStmt {
        span: DUMMY_SP,
        expr: Box::new(expr),
    })
}

pub fn declarator(name: &str, init: Expr) -> VarDeclarator {
    VarDeclarator {
        span: DUMMY_SP,
        name: Pat::Ident(BindingIdent {
            id: ident(name),
            type_ann: None,
        }),
        init: Some(Box::new(init)),
        definite: false,
    }
}

/// `var a = ..., b = ...;`
pub fn var_stmt(decls: Vec<VarDeclarator>) -> Stmt {
    Stmt::Decl(Decl::Var(Box::new(VarDecl {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        kind: VarDeclKind::Var,
        declare: false,
        decls,
    })))
}

/// Object, array, and literal syntax equivalent to a JSON value
pub fn json_to_expr(value: &Value) -> Expr {
    match value {
        Value::Null => Expr::Lit(Lit::Null(Null { span: DUMMY_SP })),
        Value::Bool(value) => Expr::Lit(Lit::Bool(Bool {
            span: DUMMY_SP,
            value: *value,
        })),
        Value::Number(number) => num_lit(number.as_f64().unwrap_or_default()),
        Value::String(value) => str_lit(value),
        Value::Array(items) => Expr::Array(ArrayLit {
            span: DUMMY_SP,
            elems: items.iter().map(|item| Some(arg(json_to_expr(item)))).collect(),
        }),
        Value::Object(entries) => Expr::Object(ObjectLit {
            span: DUMMY_SP,
            props: entries
                .iter()
                .map(|(key, value)| {
                    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
                        key: PropName::Str(str_node(key)),
                        value: Box::new(json_to_expr(value)),
                    })))
                })
                .collect(),
        }),
    }
}
