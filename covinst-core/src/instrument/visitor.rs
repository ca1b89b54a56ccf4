//! Depth-first traversal
//!
//! Every dispatched node goes through the same sequence: `enter` (bookkeeping,
//! then the node's actions unless it is ignored), its children, then `exit`.
//! Statements queued "before" a statement are held per statement list and
//! spliced in once the list has been walked.

use super::dispatch::NodeMut;
use super::state::VisitState;
use crate::directives::{DirectiveScanner, IgnoreHint};
use crate::location::Location;
use crate::node::{is_logical_op, NodeKey, NodeKind};
use swc_common::{SourceMap, Span};
use swc_ecma_ast::{
    ArrowExpr, AssignPat, AssignPatProp, BlockStmt, BreakStmt, ClassDecl, ClassMethod, CondExpr,
    Constructor, ContinueStmt, DebuggerStmt, Decl, DoWhileStmt, ExportDecl, Expr, ExprStmt,
    FnDecl, FnExpr, ForInStmt, ForOfStmt, ForStmt, GetterProp, IfStmt, LabeledStmt, MethodProp,
    ModuleDecl, ModuleItem, PrivateMethod, ReturnStmt, SetterProp, Stmt, SwitchStmt, ThrowStmt,
    TryStmt, VarDecl, WhileStmt, WithStmt,
};
use swc_ecma_visit::{VisitMut, VisitMutWith};

/// Handed out by `enter` and returned to `exit`
pub(super) struct Entered {
    key: NodeKey,
    depth: usize,
}

pub(crate) struct CoverageVisitor<'a> {
    pub(super) state: VisitState,
    pub(super) scanner: DirectiveScanner<'a>,
    source_map: &'a SourceMap,
    /// Statements to insert before the item currently walked, one frame per open list
    pub(super) pending: Vec<Vec<Stmt>>,
    /// Set while walking the operands of a logical expression
    logical_parent: bool,
    /// Set while the current list item is a variable declaration statement
    hoist_declarators: bool,
}

impl<'a> CoverageVisitor<'a> {
    pub(crate) fn new(state: VisitState, scanner: DirectiveScanner<'a>, source_map: &'a SourceMap) -> Self {
        CoverageVisitor {
            state,
            scanner,
            source_map,
            pending: Vec::new(),
            logical_parent: false,
            hoist_declarators: false,
        }
    }

    pub(crate) fn state_mut(&mut self) -> &mut VisitState {
        &mut self.state
    }

    pub(crate) fn into_state(self) -> VisitState {
        self.state
    }

    pub(super) fn location(&self, span: Span) -> Option<Location> {
        Location::from_span(span, self.source_map)
    }

    /// Synthetic nodes and suppressed subtrees get no actions
    fn should_ignore(&self, span: Span) -> bool {
        self.state.is_suppressed() || span.is_dummy()
    }

    fn enter(&mut self, node: NodeMut<'_>) -> Entered {
        let key = node.key();
        let depth = self.state.descend();

        if let Some(url) = self.scanner.source_map_url(key.span) {
            self.state.source_mapping_url = Some(url);
        }

        if !self.state.is_suppressed() {
            let hinted = self.scanner.hint_for(key.span) == Some(IgnoreHint::Next);
            let ignored_method = node
                .method_name()
                .is_some_and(|name| self.state.ignores_method(&name));
            if hinted || ignored_method || self.state.attrs.skip_all(key) {
                tracing::trace!(kind = %key.kind, "suppressing subtree");
                self.state.suppress(key, depth);
            }
        }

        if !self.state.failed() && !self.should_ignore(key.span) {
            if let Err(err) = self.apply(node) {
                self.state.fail(err);
            }
        }

        Entered { key, depth }
    }

    fn exit(&mut self, entered: Entered) {
        self.state.ascend(entered.key, entered.depth);
    }

    /// Queue a statement before the statement-list item being walked
    pub(super) fn insert_before_current(&mut self, stmt: Stmt) -> bool {
        match self.pending.last_mut() {
            Some(frame) => {
                frame.push(stmt);
                true
            }
            None => false,
        }
    }

    /// Walk a list item in its own insertion frame and return what was queued before it
    fn walk_list_item<N: VisitMutWith<Self>>(&mut self, item: &mut N, hoist: bool) -> Vec<Stmt> {
        self.pending.push(Vec::new());
        self.hoist_declarators = hoist;
        item.visit_mut_with(self);
        self.hoist_declarators = false;
        self.pending.pop().unwrap_or_default()
    }
}

fn is_var_stmt(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Decl(Decl::Var(_)))
}

fn is_var_item(item: &ModuleItem) -> bool {
    match item {
        ModuleItem::Stmt(stmt) => is_var_stmt(stmt),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
            decl: Decl::Var(_), ..
        })) => true,
        ModuleItem::ModuleDecl(_) => false,
    }
}

impl VisitMut for CoverageVisitor<'_> {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        let original = std::mem::take(items);
        let mut planned = Vec::with_capacity(original.len());
        for mut item in original {
            let hoist = is_var_item(&item);
            let before = self.walk_list_item(&mut item, hoist);
            planned.extend(before.into_iter().map(ModuleItem::Stmt));
            planned.push(item);
        }
        *items = planned;
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        let original = std::mem::take(stmts);
        let mut planned = Vec::with_capacity(original.len());
        for mut stmt in original {
            let hoist = is_var_stmt(&stmt);
            let before = self.walk_list_item(&mut stmt, hoist);
            planned.extend(before);
            planned.push(stmt);
        }
        *stmts = planned;
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Paren(paren) => {
                let entered = self.enter(NodeMut::Paren(paren));
                paren.visit_mut_children_with(self);
                self.exit(entered);
            }
            Expr::Bin(bin) if is_logical_op(bin.op) => {
                let outermost = !self.logical_parent;
                let entered = self.enter(NodeMut::Logical { node: bin, outermost });
                let saved = std::mem::replace(&mut self.logical_parent, true);
                bin.visit_mut_children_with(self);
                self.logical_parent = saved;
                self.exit(entered);
            }
            _ => {
                let saved = std::mem::replace(&mut self.logical_parent, false);
                expr.visit_mut_children_with(self);
                self.logical_parent = saved;
            }
        }
    }

    fn visit_mut_arrow_expr(&mut self, node: &mut ArrowExpr) {
        let entered = self.enter(NodeMut::Arrow(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_fn_decl(&mut self, node: &mut FnDecl) {
        let entered = self.enter(NodeMut::FnDecl(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_fn_expr(&mut self, node: &mut FnExpr) {
        let entered = self.enter(NodeMut::FnExpr(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_class_method(&mut self, node: &mut ClassMethod) {
        let entered = self.enter(NodeMut::ClassMethod(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_private_method(&mut self, node: &mut PrivateMethod) {
        let entered = self.enter(NodeMut::PrivateMethod(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_constructor(&mut self, node: &mut Constructor) {
        let entered = self.enter(NodeMut::Constructor(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_method_prop(&mut self, node: &mut MethodProp) {
        let entered = self.enter(NodeMut::MethodProp(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_getter_prop(&mut self, node: &mut GetterProp) {
        let entered = self.enter(NodeMut::Getter(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_setter_prop(&mut self, node: &mut SetterProp) {
        let entered = self.enter(NodeMut::Setter(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_class_decl(&mut self, node: &mut ClassDecl) {
        let entered = self.enter(NodeMut::ClassDecl(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_assign_pat(&mut self, node: &mut AssignPat) {
        let entered = self.enter(NodeMut::AssignPat(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_assign_pat_prop(&mut self, node: &mut AssignPatProp) {
        let entered = self.enter(NodeMut::AssignPatProp(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_block_stmt(&mut self, node: &mut BlockStmt) {
        let entered = self.enter(NodeMut::Block(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_expr_stmt(&mut self, node: &mut ExprStmt) {
        let entered = self.enter(NodeMut::ExprStmt(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_break_stmt(&mut self, node: &mut BreakStmt) {
        let entered = self.enter(NodeMut::Break(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_continue_stmt(&mut self, node: &mut ContinueStmt) {
        let entered = self.enter(NodeMut::Continue(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_debugger_stmt(&mut self, node: &mut DebuggerStmt) {
        let entered = self.enter(NodeMut::Debugger(node));
        self.exit(entered);
    }

    fn visit_mut_return_stmt(&mut self, node: &mut ReturnStmt) {
        let entered = self.enter(NodeMut::Return(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_throw_stmt(&mut self, node: &mut ThrowStmt) {
        let entered = self.enter(NodeMut::Throw(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_try_stmt(&mut self, node: &mut TryStmt) {
        let entered = self.enter(NodeMut::Try(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_labeled_stmt(&mut self, node: &mut LabeledStmt) {
        let entered = self.enter(NodeMut::Labeled(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_var_decl(&mut self, node: &mut VarDecl) {
        let hoistable = std::mem::take(&mut self.hoist_declarators);
        let entered = self.enter(NodeMut::VarDecl(node));
        for decl in node.decls.iter_mut() {
            let declarator = self.enter(NodeMut::VarDeclarator {
                node: decl,
                hoistable,
            });
            decl.visit_mut_children_with(self);
            self.exit(declarator);
        }
        self.exit(entered);
    }

    fn visit_mut_if_stmt(&mut self, node: &mut IfStmt) {
        let entered = self.enter(NodeMut::If(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_for_stmt(&mut self, node: &mut ForStmt) {
        let entered = self.enter(NodeMut::For(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_for_in_stmt(&mut self, node: &mut ForInStmt) {
        let entered = self.enter(NodeMut::ForIn(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_for_of_stmt(&mut self, node: &mut ForOfStmt) {
        let entered = self.enter(NodeMut::ForOf(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_while_stmt(&mut self, node: &mut WhileStmt) {
        let entered = self.enter(NodeMut::While(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_do_while_stmt(&mut self, node: &mut DoWhileStmt) {
        let entered = self.enter(NodeMut::DoWhile(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_with_stmt(&mut self, node: &mut WithStmt) {
        let entered = self.enter(NodeMut::With(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }

    fn visit_mut_switch_stmt(&mut self, node: &mut SwitchStmt) {
        let entered = self.enter(NodeMut::Switch(node));
        node.discriminant.visit_mut_with(self);
        let switch = NodeKey::new(NodeKind::Switch, node.span);
        for case in node.cases.iter_mut() {
            let case_entered = self.enter(NodeMut::SwitchCase { node: case, switch });
            case.visit_mut_children_with(self);
            self.exit(case_entered);
        }
        self.exit(entered);
    }

    fn visit_mut_cond_expr(&mut self, node: &mut CondExpr) {
        let entered = self.enter(NodeMut::Cond(node));
        node.visit_mut_children_with(self);
        self.exit(entered);
    }
}
