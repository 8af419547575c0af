//! Aggressive inlining of let bindings.
//!
//! Every use of a let-bound name is replaced by the (recursively inlined)
//! bound value and the let itself is dropped. Loop variables hide outer
//! bindings of the same name while their body is visited. The bound value
//! may not reference a name that was rebound more recently than the let
//! itself; the substitution logic refuses those cases.
//!
//! The backwards solver runs on let-free trees produced by this pass, so its
//! rewrite rules never have to look through bindings.

use crate::{
    ir::{Expr, ExprKind, Stmt, StmtKind},
    scope::Scope,
    visit::{mutate_children_expr, mutate_children_stmt, walk_expr, Mutator, Visitor},
};

/// The inliner's per-kind behaviour, reusable by mutators that extend it.
pub(crate) trait InlineCore: Mutator {
    fn inline_scope(&mut self) -> &mut Scope<Option<Expr>>;
}

pub(crate) fn inline_variable<M: InlineCore>(m: &mut M, e: &Expr) -> Expr {
    let name = e.as_variable().unwrap();
    let Some(binding) = m.inline_scope().get(name).cloned() else {
        return e.clone();
    };
    match binding {
        Some(replacement) => {
            if let Some(vname) = replacement.as_variable() {
                // The replacement is itself a variable; substitute only if
                // that variable has not been shadowed since.
                if m.inline_scope().contains(vname)
                    && m.inline_scope().depth(vname) >= m.inline_scope().depth(name)
                {
                    return e.clone();
                }
            }
            replacement
        }
        None => e.clone(),
    }
}

pub(crate) fn inline_let_expr<M: InlineCore>(m: &mut M, e: &Expr) -> Expr {
    let ExprKind::Let { name, value, body } = e.kind() else {
        unreachable!()
    };
    let value = m.mutate_expr(value);
    m.inline_scope().push(name.clone(), Some(value));
    let body = m.mutate_expr(body);
    m.inline_scope().pop(name);
    // Every use has been substituted; the binding is gone.
    body
}

pub(crate) fn inline_let_stmt<M: InlineCore>(m: &mut M, s: &Stmt) -> Stmt {
    let StmtKind::LetStmt { name, value, body } = s.kind() else {
        unreachable!()
    };
    let value = m.mutate_expr(value);
    m.inline_scope().push(name.clone(), Some(value));
    let body = m.mutate_stmt(body);
    m.inline_scope().pop(name);
    body
}

pub(crate) fn inline_for<M: InlineCore>(m: &mut M, s: &Stmt) -> Stmt {
    let StmtKind::For { name, .. } = s.kind() else {
        unreachable!()
    };
    let name = name.clone();
    m.inline_scope().push(name.clone(), None);
    let result = mutate_children_stmt(m, s);
    m.inline_scope().pop(&name);
    result
}

pub struct InlineLet {
    scope: Scope<Option<Expr>>,
}

impl Default for InlineLet {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineLet {
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
        }
    }
}

impl InlineCore for InlineLet {
    fn inline_scope(&mut self) -> &mut Scope<Option<Expr>> {
        &mut self.scope
    }
}

impl Mutator for InlineLet {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::Variable { .. } => inline_variable(self, e),
            ExprKind::Let { .. } => inline_let_expr(self, e),
            _ => mutate_children_expr(self, e),
        }
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        match s.kind() {
            StmtKind::LetStmt { .. } => inline_let_stmt(self, s),
            StmtKind::For { .. } => inline_for(self, s),
            _ => mutate_children_stmt(self, s),
        }
    }
}

pub fn inline_lets(e: &Expr) -> Expr {
    InlineLet::new().mutate_expr(e)
}

pub fn inline_lets_stmt(s: &Stmt) -> Stmt {
    InlineLet::new().mutate_stmt(s)
}

/// Every variable occurrence in `e`, in visit order, repeats included.
pub fn variable_occurrences(e: &Expr) -> Vec<String> {
    struct Collect {
        names: Vec<String>,
    }
    impl Visitor for Collect {
        fn visit_expr(&mut self, e: &Expr) {
            if let Some(name) = e.as_variable() {
                self.names.push(name.to_owned());
            }
            walk_expr(self, e);
        }
    }
    let mut collect = Collect { names: Vec::new() };
    collect.visit_expr(e);
    collect.names
}
