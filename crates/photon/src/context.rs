//! Context management for scope-sensitive analyses.
//!
//! A context is an integer naming a position in the tree distinguished by
//! the path of binding-introducing ancestors; the same subtree under two
//! different binders gets two different contexts, so `(context, node)` is a
//! sound cache key. Context 0 is invalid, context 1 is the root.
//!
//! Binding-introducing nodes are `Let`, `LetStmt`, `For`, `TargetVar` and
//! `StmtTargetVar`. The first three need two contexts: one for the defining
//! node itself (its non-body children — the bound value, loop bounds — are
//! interpreted there, in terms of the enclosing bindings) and one for the
//! body. The binding is recorded in the body context and names the defining
//! context, so a lookup from inside the body resolves to the defining node,
//! and `go` can jump there to examine the bound value.
//!
//! An entire pass must use one manager so that context ids stay consistent;
//! analyses that nest (the solver consulting bounds analysis, which consults
//! the simplifier) share the manager through their common
//! [`CompilerContext`].

use ahash::AHashMap;

use crate::{
    ctx::CompilerContext,
    ir::{Expr, ExprKind, IRHandle, Stmt, StmtKind},
};

pub type ContextId = u32;

pub const INVALID_CONTEXT: ContextId = 0;
pub const ROOT_CONTEXT: ContextId = 1;

/// How many child contexts a manager may accumulate before the last user
/// releasing it triggers a reset.
const RESET_THRESHOLD: usize = 20;

/// The node that created a context, together with the context enclosing that
/// node. The root context has no defining node.
#[derive(Debug, Clone)]
pub struct DefiningNode {
    pub context: ContextId,
    pub node: Option<IRHandle>,
}

impl DefiningNode {
    fn root() -> Self {
        Self {
            context: INVALID_CONTEXT,
            node: None,
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.node.as_ref().and_then(IRHandle::as_expr)
    }

    pub fn stmt(&self) -> Option<&Stmt> {
        self.node.as_ref().and_then(IRHandle::as_stmt)
    }
}

#[derive(Debug, Default)]
struct BindingMap {
    map: AHashMap<(ContextId, String), ContextId>,
}

impl BindingMap {
    fn bind(&mut self, context: ContextId, name: &str, defining: ContextId) {
        self.map.insert((context, name.to_owned()), defining);
    }

    fn get(&self, context: ContextId, name: &str) -> Option<ContextId> {
        self.map.get(&(context, name.to_owned())).copied()
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

pub struct ContextManager {
    current: ContextId,
    next: ContextId,
    current_definition: DefiningNode,
    /// (enclosing context, node) -> child context.
    child: AHashMap<(ContextId, usize), ContextId>,
    /// context -> the node that defined it. Holding the node here also keeps
    /// every pointer used in `child` keys alive, so ids cannot be reused.
    defining: AHashMap<ContextId, DefiningNode>,
    parent: Vec<ContextId>,
    variables: BindingMap,
    targets: BindingMap,
    user_count: u32,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    pub fn new() -> Self {
        let mut mgr = Self {
            current: ROOT_CONTEXT,
            next: ROOT_CONTEXT + 1,
            current_definition: DefiningNode::root(),
            child: AHashMap::new(),
            defining: AHashMap::new(),
            parent: Vec::new(),
            variables: BindingMap::default(),
            targets: BindingMap::default(),
            user_count: 0,
        };
        mgr.clear();
        mgr
    }

    /// Discard every context and binding and return to the root.
    pub fn clear(&mut self) {
        self.current = ROOT_CONTEXT;
        self.next = ROOT_CONTEXT + 1;
        self.current_definition = DefiningNode::root();
        self.child.clear();
        self.defining.clear();
        self.parent.clear();
        self.set_parent(ROOT_CONTEXT, INVALID_CONTEXT);
        self.defining.insert(ROOT_CONTEXT, DefiningNode::root());
        self.variables.clear();
        self.targets.clear();
    }

    pub fn add_user(&mut self) {
        self.user_count += 1;
    }

    pub fn remove_user(&mut self) {
        assert!(self.user_count > 0, "Negative user count for ContextManager");
        self.user_count -= 1;
        if self.user_count == 0 && self.child.len() > RESET_THRESHOLD {
            self.clear();
        }
    }

    pub fn current_context(&self) -> ContextId {
        self.current
    }

    pub fn context_count(&self) -> usize {
        self.child.len()
    }

    fn set_parent(&mut self, context: ContextId, parent: ContextId) {
        let index = context as usize;
        if self.parent.len() <= index {
            self.parent.resize(index + 1, INVALID_CONTEXT);
        }
        self.parent[index] = parent;
    }

    pub fn parent(&self, context: ContextId) -> ContextId {
        assert!(
            context > INVALID_CONTEXT && (context as usize) < self.parent.len(),
            "No parent for context {context}"
        );
        self.parent[context as usize]
    }

    /// Enter the child context for `node`, creating it on first visit.
    /// Re-entering the same (parent, node) pair lands in the same child.
    pub fn push(&mut self, node: IRHandle) {
        if let Some(current) = &self.current_definition.node {
            assert!(
                !current.same_as(&node),
                "Invalid recursive push of same defining node"
            );
        }
        let parent = self.current;
        let key = (parent, node.ptr_id());
        let child = match self.child.get(&key) {
            Some(&c) => c,
            None => {
                let c = self.next;
                self.next += 1;
                self.child.insert(key, c);
                c
            }
        };
        self.current_definition = DefiningNode {
            context: parent,
            node: Some(node),
        };
        self.defining.insert(child, self.current_definition.clone());
        self.set_parent(child, parent);
        self.current = child;
    }

    /// Leave the context entered for `node` and verify the pairing.
    pub fn pop(&mut self, node: &IRHandle) {
        let parent = self.parent(self.current);
        assert!(
            parent != INVALID_CONTEXT,
            "Undefined parent of current context"
        );
        let recorded = self.child.get(&(parent, node.ptr_id())).copied();
        assert!(
            recorded == Some(self.current),
            "Context pop does not match push"
        );
        // Restore the defining node of the parent so it becomes legal to
        // re-enter the context we just left.
        self.current_definition = self
            .defining
            .get(&parent)
            .expect("Cannot find defining node for popped context")
            .clone();
        self.current = parent;
    }

    /// Switch into the existing child context for `node` if one was created
    /// before; do not create one. Returns whether a context was entered.
    pub fn enter(&mut self, node: &IRHandle) -> bool {
        match self.child.get(&(self.current, node.ptr_id())).copied() {
            Some(child) => {
                assert!(
                    child != self.current,
                    "Child context the same as current context"
                );
                self.current_definition = self
                    .defining
                    .get(&child)
                    .expect("Cannot find defining node for child context")
                    .clone();
                self.current = child;
                true
            }
            None => false,
        }
    }

    pub fn leave(&mut self, entered: bool, node: &IRHandle) {
        if entered {
            self.pop(node);
        }
    }

    /// Teleport to a context and return its defining node. Used to evaluate
    /// a variable's defining expression in the right surroundings.
    pub fn go(&mut self, context: ContextId) -> DefiningNode {
        let node = self
            .defining
            .get(&context)
            .expect("Attempt to go to undefined context")
            .clone();
        self.current = context;
        self.current_definition = node.clone();
        node
    }

    /// Record that `name` is bound in the current context with its defining
    /// node reachable through `defining`.
    pub fn bind(&mut self, name: &str, defining: ContextId) {
        self.variables.bind(self.current, name, defining);
    }

    /// Record a solve target binding in the current context.
    pub fn target(&mut self, name: &str, defining: ContextId) {
        self.targets.bind(self.current, name, defining);
    }

    fn lookup(
        map: &mut BindingMap,
        parent: &[ContextId],
        name: &str,
        search: ContextId,
    ) -> ContextId {
        let mut context = search;
        while context != INVALID_CONTEXT {
            if let Some(result) = map.get(context, name) {
                // Cache transitive results in the search context; an
                // INVALID_CONTEXT entry caches "unbound" too.
                if context != search {
                    map.bind(search, name, result);
                }
                return result;
            }
            context = parent[context as usize];
        }
        map.bind(search, name, INVALID_CONTEXT);
        INVALID_CONTEXT
    }

    /// Walk the parent chain from the current context for a variable
    /// binding; returns the defining context or 0 when unbound.
    pub fn find_variable(&mut self, name: &str) -> ContextId {
        Self::lookup(&mut self.variables, &self.parent, name, self.current)
    }

    /// Like [`Self::find_variable`] for solve targets.
    pub fn find_target(&mut self, name: &str) -> ContextId {
        Self::lookup(&mut self.targets, &self.parent, name, self.current)
    }

    /// Is `name` a live target binding as seen from `search`? A target that
    /// has been rebound between `search` and the current context no longer
    /// counts.
    pub fn is_target(&mut self, name: &str, search: ContextId) -> bool {
        let found = Self::lookup(&mut self.targets, &self.parent, name, search);
        if found == INVALID_CONTEXT {
            return false;
        }
        let current = Self::lookup(&mut self.targets, &self.parent, name, self.current);
        current == found
    }
}

/// Scope-tracking adaptor used by traversals.
///
/// `enter_*`/`leave_*` bracket every step of a walk: they switch into the
/// node's context if one exists, and lazily create contexts and bindings the
/// first time a binding-introducing node is seen. `call`/`ret` jump to a
/// variable's defining context and back.
pub struct LazyScope<'c> {
    cc: &'c CompilerContext,
    returns: Vec<ContextId>,
}

impl<'c> LazyScope<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        cc.context_mut().add_user();
        Self {
            cc,
            returns: Vec::new(),
        }
    }

    pub fn cc(&self) -> &'c CompilerContext {
        self.cc
    }

    pub fn current_context(&self) -> ContextId {
        self.cc.context_mut().current_context()
    }

    pub fn enter_expr(&mut self, e: &Expr) -> bool {
        let mut mgr = self.cc.context_mut();
        let handle: IRHandle = e.clone().into();
        let entered = if mgr.enter(&handle) {
            true
        } else if matches!(
            e.kind(),
            ExprKind::Let { .. } | ExprKind::TargetVar { .. }
        ) {
            mgr.push(handle);
            true
        } else {
            false
        };
        if entered {
            // Record the binding and the body context. This runs on every
            // entry, not just the first: a binder sitting directly in body
            // position of another binder has its context pre-created by the
            // parent, and would otherwise never get its own binding. The
            // operations are idempotent.
            match e.kind() {
                ExprKind::Let { name, body, .. } => {
                    let defining = mgr.current_context();
                    let body_handle: IRHandle = body.clone().into();
                    mgr.push(body_handle.clone());
                    mgr.bind(name, defining);
                    mgr.pop(&body_handle);
                }
                ExprKind::TargetVar { name, .. } => {
                    let defining = mgr.current_context();
                    mgr.target(name, defining);
                }
                _ => {}
            }
        }
        entered
    }

    pub fn leave_expr(&mut self, entered: bool, e: &Expr) {
        if entered {
            self.cc.context_mut().pop(&e.clone().into());
        }
    }

    pub fn enter_stmt(&mut self, s: &Stmt) -> bool {
        let mut mgr = self.cc.context_mut();
        let handle: IRHandle = s.clone().into();
        let entered = if mgr.enter(&handle) {
            true
        } else if matches!(
            s.kind(),
            StmtKind::LetStmt { .. } | StmtKind::For { .. } | StmtKind::StmtTargetVar { .. }
        ) {
            mgr.push(handle);
            true
        } else {
            false
        };
        if entered {
            match s.kind() {
                StmtKind::LetStmt { name, body, .. } | StmtKind::For { name, body, .. } => {
                    let defining = mgr.current_context();
                    let body_handle: IRHandle = body.clone().into();
                    mgr.push(body_handle.clone());
                    mgr.bind(name, defining);
                    mgr.pop(&body_handle);
                }
                StmtKind::StmtTargetVar { name, .. } => {
                    let defining = mgr.current_context();
                    mgr.target(name, defining);
                }
                _ => {}
            }
        }
        entered
    }

    pub fn leave_stmt(&mut self, entered: bool, s: &Stmt) {
        if entered {
            self.cc.context_mut().pop(&s.clone().into());
        }
    }

    pub fn find_variable(&self, name: &str) -> ContextId {
        self.cc.context_mut().find_variable(name)
    }

    pub fn find_target(&self, name: &str) -> ContextId {
        self.cc.context_mut().find_target(name)
    }

    pub fn is_target(&self, name: &str, search: ContextId) -> bool {
        self.cc.context_mut().is_target(name, search)
    }

    /// Jump to a defining context, remembering where we came from.
    pub fn call(&mut self, context: ContextId) -> DefiningNode {
        let mut mgr = self.cc.context_mut();
        self.returns.push(mgr.current_context());
        mgr.go(context)
    }

    /// Return from the most recent [`Self::call`].
    pub fn ret(&mut self, context: ContextId) {
        let back = self.returns.pop().expect("ret without matching call");
        let mut mgr = self.cc.context_mut();
        assert!(
            mgr.current_context() == context,
            "ret from unexpected context"
        );
        mgr.go(back);
    }
}

impl Drop for LazyScope<'_> {
    fn drop(&mut self) {
        self.cc.context_mut().remove_user();
    }
}

/// A per-pass memo keyed by `(context, node identity)`. Entries retain the
/// node handle so the keyed pointer stays valid for the cache's lifetime.
pub struct NodeCache<T> {
    map: AHashMap<(ContextId, usize), (IRHandle, T)>,
}

impl<T> Default for NodeCache<T> {
    fn default() -> Self {
        Self {
            map: AHashMap::new(),
        }
    }
}

impl<T: Clone> NodeCache<T> {
    pub fn get_expr(&self, context: ContextId, e: &Expr) -> Option<T> {
        self.map
            .get(&(context, e.ptr_id()))
            .map(|(_, v)| v.clone())
    }

    pub fn insert_expr(&mut self, context: ContextId, e: &Expr, value: T) {
        self.map
            .insert((context, e.ptr_id()), (e.clone().into(), value));
    }

    pub fn get_stmt(&self, context: ContextId, s: &Stmt) -> Option<T> {
        self.map
            .get(&(context, s.ptr_id()))
            .map(|(_, v)| v.clone())
    }

    pub fn insert_stmt(&mut self, context: ContextId, s: &Stmt, value: T) {
        self.map
            .insert((context, s.ptr_id()), (s.clone().into(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_node_same_context() {
        let mut mgr = ContextManager::new();
        let body = Expr::var("x") + 1;
        let e = Expr::let_in("x", Expr::int(3), body);
        let handle: IRHandle = e.clone().into();

        mgr.push(handle.clone());
        let first = mgr.current_context();
        mgr.pop(&handle);
        assert_eq!(mgr.current_context(), ROOT_CONTEXT);

        assert!(mgr.enter(&handle));
        assert_eq!(mgr.current_context(), first);
        mgr.leave(true, &handle);
    }

    #[test]
    fn bindings_resolve_from_the_body() {
        let cc = CompilerContext::new();
        let body = Expr::var("x") + 1;
        let e = Expr::let_in("x", Expr::int(3), body.clone());

        let mut scope = LazyScope::new(&cc);
        let entered = scope.enter_expr(&e);
        assert!(entered);
        let entered_body = scope.enter_expr(&body);
        assert!(entered_body);

        let defining = scope.find_variable("x");
        assert_ne!(defining, INVALID_CONTEXT);
        let def = scope.call(defining);
        assert!(def.expr().unwrap().same_as(&e));
        scope.ret(defining);

        scope.leave_expr(entered_body, &body);
        scope.leave_expr(entered, &e);
        assert_eq!(scope.current_context(), ROOT_CONTEXT);
    }

    #[test]
    fn rebinding_shadows_in_inner_context_only() {
        let cc = CompilerContext::new();
        let inner_body = Expr::var("x") * 2;
        let inner = Expr::let_in("x", Expr::int(5), inner_body.clone());
        let outer = Expr::let_in("x", Expr::int(3), inner.clone());

        let mut scope = LazyScope::new(&cc);
        let e0 = scope.enter_expr(&outer);
        let e1 = scope.enter_expr(&inner);
        let outer_def = scope.find_variable("x");

        let e2 = scope.enter_expr(&inner_body);
        let inner_def = scope.find_variable("x");
        assert_ne!(outer_def, inner_def);
        let def = scope.call(inner_def);
        assert!(def.expr().unwrap().same_as(&inner));
        scope.ret(inner_def);

        scope.leave_expr(e2, &inner_body);
        scope.leave_expr(e1, &inner);
        scope.leave_expr(e0, &outer);
    }

    #[test]
    #[should_panic(expected = "pop does not match push")]
    fn mismatched_pop_panics() {
        let mut mgr = ContextManager::new();
        let a = Expr::let_in("x", Expr::int(1), Expr::var("x"));
        let b = Expr::let_in("y", Expr::int(2), Expr::var("y"));
        mgr.push(a.into());
        mgr.pop(&b.into());
    }

    #[test]
    fn reset_on_last_user() {
        let cc = CompilerContext::new();
        {
            let mut scope = LazyScope::new(&cc);
            // Create enough contexts to cross the reset threshold.
            let mut lets = Vec::new();
            for i in 0..30 {
                let e = Expr::let_in(format!("v{i}"), Expr::int(i), Expr::var(format!("v{i}")));
                let entered = scope.enter_expr(&e);
                lets.push((entered, e));
            }
            for (entered, e) in lets.iter().rev() {
                scope.leave_expr(*entered, e);
            }
            assert!(cc.context_mut().context_count() > RESET_THRESHOLD);
        }
        // Dropping the last user resets the grown table.
        assert_eq!(cc.context_mut().context_count(), 0);
    }
}
