//! Tree traversal disciplines.
//!
//! Three traits, all dispatching by a match over the node kind:
//!
//! - [`Visitor`]: read-only walk; the default implementation recurses into
//!   children via [`walk_expr`]/[`walk_stmt`]. Implementations that need to
//!   know whether a node fell through to the default keep their own
//!   `defaulted` flag and set it in the catch-all arm.
//! - [`Mutator`]: rebuilding walk with structural sharing — when no child
//!   changed, the original handle is returned so pointer identity survives
//!   and fixed points are detectable with `same_as`.
//! - [`Process`]: like `Visitor`, but child recursion goes through a single
//!   `process_*` entry point so a scope-tracking layer can intercept every
//!   step of the recursion.
//!
//! Solver markers: `Solve` intervals and `TargetVar`/`StmtTargetVar` sources
//! are data, not children, and are never traversed.

use crate::ir::{Expr, ExprKind, Stmt, StmtKind};

pub trait Visitor: Sized {
    fn visit_expr(&mut self, e: &Expr) {
        walk_expr(self, e);
    }

    fn visit_stmt(&mut self, s: &Stmt) {
        walk_stmt(self, s);
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, e: &Expr) {
    use ExprKind as K;
    match e.kind() {
        K::IntImm(_) | K::FloatImm(_) | K::Variable { .. } | K::Infinity { .. } => {}
        K::Cast(a) | K::Not(a) | K::Broadcast { value: a, .. } => v.visit_expr(a),
        K::Add(a, b)
        | K::Sub(a, b)
        | K::Mul(a, b)
        | K::Div(a, b)
        | K::Mod(a, b)
        | K::Min(a, b)
        | K::Max(a, b)
        | K::Eq(a, b)
        | K::Ne(a, b)
        | K::Lt(a, b)
        | K::Le(a, b)
        | K::Gt(a, b)
        | K::Ge(a, b)
        | K::And(a, b)
        | K::Or(a, b) => {
            v.visit_expr(a);
            v.visit_expr(b);
        }
        K::Select {
            condition,
            true_value,
            false_value,
        } => {
            v.visit_expr(condition);
            v.visit_expr(true_value);
            v.visit_expr(false_value);
        }
        K::Load { index, .. } => v.visit_expr(index),
        K::Ramp { base, stride, .. } => {
            v.visit_expr(base);
            v.visit_expr(stride);
        }
        K::Call { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        K::Let { value, body, .. } => {
            v.visit_expr(value);
            v.visit_expr(body);
        }
        K::Clamp {
            value,
            min,
            max,
            tile,
            clamp,
        } => {
            v.visit_expr(value);
            v.visit_expr(min);
            v.visit_expr(max);
            if *clamp == crate::ir::ClampKind::Tile {
                v.visit_expr(tile);
            }
        }
        K::Solve { body, .. } | K::TargetVar { body, .. } => v.visit_expr(body),
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, s: &Stmt) {
    use StmtKind as K;
    match s.kind() {
        K::LetStmt { value, body, .. } => {
            v.visit_expr(value);
            v.visit_stmt(body);
        }
        K::AssertStmt { condition, .. } => v.visit_expr(condition),
        K::PrintStmt { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        K::Pipeline {
            produce,
            update,
            consume,
            ..
        } => {
            v.visit_stmt(produce);
            if let Some(u) = update {
                v.visit_stmt(u);
            }
            v.visit_stmt(consume);
        }
        K::For {
            min, extent, body, ..
        } => {
            v.visit_expr(min);
            v.visit_expr(extent);
            v.visit_stmt(body);
        }
        K::Store { value, index, .. } => {
            v.visit_expr(value);
            v.visit_expr(index);
        }
        K::Provide { value, args, .. } => {
            v.visit_expr(value);
            for a in args {
                v.visit_expr(a);
            }
        }
        K::Allocate { size, body, .. } => {
            v.visit_expr(size);
            v.visit_stmt(body);
        }
        K::Free { .. } => {}
        K::Realize { bounds, body, .. } => {
            for (min, extent) in bounds {
                v.visit_expr(min);
                v.visit_expr(extent);
            }
            v.visit_stmt(body);
        }
        K::Block { first, rest } => {
            v.visit_stmt(first);
            if let Some(r) = rest {
                v.visit_stmt(r);
            }
        }
        K::StmtTargetVar { body, .. } => v.visit_stmt(body),
    }
}

pub trait Mutator: Sized {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        mutate_children_expr(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        mutate_children_stmt(self, s)
    }
}

/// Rebuild `e` from mutated children, sharing the original node when nothing
/// changed.
pub fn mutate_children_expr<M: Mutator>(m: &mut M, e: &Expr) -> Expr {
    use ExprKind as K;

    // Binary nodes all rebuild the same way.
    macro_rules! binary {
        ($a:expr, $b:expr, $make:path) => {{
            let na = m.mutate_expr($a);
            let nb = m.mutate_expr($b);
            if na.same_as($a) && nb.same_as($b) {
                e.clone()
            } else {
                $make(na, nb)
            }
        }};
    }

    match e.kind() {
        K::IntImm(_) | K::FloatImm(_) | K::Variable { .. } | K::Infinity { .. } => e.clone(),
        K::Cast(v) => {
            let nv = m.mutate_expr(v);
            if nv.same_as(v) {
                e.clone()
            } else {
                Expr::cast(e.ty(), nv)
            }
        }
        K::Not(a) => {
            let na = m.mutate_expr(a);
            if na.same_as(a) {
                e.clone()
            } else {
                Expr::not(na)
            }
        }
        K::Add(a, b) => binary!(a, b, Expr::add),
        K::Sub(a, b) => binary!(a, b, Expr::sub),
        K::Mul(a, b) => binary!(a, b, Expr::mul),
        K::Div(a, b) => binary!(a, b, Expr::div),
        K::Mod(a, b) => binary!(a, b, Expr::modulo),
        K::Min(a, b) => binary!(a, b, Expr::min),
        K::Max(a, b) => binary!(a, b, Expr::max),
        K::Eq(a, b) => binary!(a, b, Expr::eq),
        K::Ne(a, b) => binary!(a, b, Expr::ne),
        K::Lt(a, b) => binary!(a, b, Expr::lt),
        K::Le(a, b) => binary!(a, b, Expr::le),
        K::Gt(a, b) => binary!(a, b, Expr::gt),
        K::Ge(a, b) => binary!(a, b, Expr::ge),
        K::And(a, b) => binary!(a, b, Expr::and),
        K::Or(a, b) => binary!(a, b, Expr::or),
        K::Select {
            condition,
            true_value,
            false_value,
        } => {
            let nc = m.mutate_expr(condition);
            let nt = m.mutate_expr(true_value);
            let nf = m.mutate_expr(false_value);
            if nc.same_as(condition) && nt.same_as(true_value) && nf.same_as(false_value) {
                e.clone()
            } else {
                Expr::select(nc, nt, nf)
            }
        }
        K::Load {
            name,
            index,
            image,
            param,
        } => {
            let ni = m.mutate_expr(index);
            if ni.same_as(index) {
                e.clone()
            } else {
                Expr::load(e.ty(), name.clone(), ni, image.clone(), param.clone())
            }
        }
        K::Ramp { base, stride, width } => {
            let nb = m.mutate_expr(base);
            let ns = m.mutate_expr(stride);
            if nb.same_as(base) && ns.same_as(stride) {
                e.clone()
            } else {
                Expr::ramp(nb, ns, *width)
            }
        }
        K::Broadcast { value, width } => {
            let nv = m.mutate_expr(value);
            if nv.same_as(value) {
                e.clone()
            } else {
                Expr::broadcast(nv, *width)
            }
        }
        K::Call { args, .. } => {
            let mut changed = false;
            let new_args: Vec<Expr> = args
                .iter()
                .map(|a| {
                    let na = m.mutate_expr(a);
                    changed |= !na.same_as(a);
                    na
                })
                .collect();
            if changed {
                Expr::call_like(e, new_args)
            } else {
                e.clone()
            }
        }
        K::Let { name, value, body } => {
            let nv = m.mutate_expr(value);
            let nb = m.mutate_expr(body);
            if nv.same_as(value) && nb.same_as(body) {
                e.clone()
            } else {
                Expr::let_in(name.clone(), nv, nb)
            }
        }
        K::Clamp {
            clamp,
            value,
            min,
            max,
            tile,
        } => {
            let nv = m.mutate_expr(value);
            let nmin = m.mutate_expr(min);
            let nmax = m.mutate_expr(max);
            let ntile = if *clamp == crate::ir::ClampKind::Tile {
                m.mutate_expr(tile)
            } else {
                tile.clone()
            };
            if nv.same_as(value) && nmin.same_as(min) && nmax.same_as(max) && ntile.same_as(tile) {
                e.clone()
            } else {
                Expr::clamp(*clamp, nv, nmin, nmax, ntile)
            }
        }
        K::Solve { body, intervals } => {
            let nb = m.mutate_expr(body);
            if nb.same_as(body) {
                e.clone()
            } else {
                Expr::solve(nb, intervals.iter().cloned())
            }
        }
        K::TargetVar { name, body, source } => {
            let nb = m.mutate_expr(body);
            if nb.same_as(body) {
                e.clone()
            } else {
                Expr::target_var(name.clone(), nb, source.clone())
            }
        }
    }
}

pub fn mutate_children_stmt<M: Mutator>(m: &mut M, s: &Stmt) -> Stmt {
    use StmtKind as K;
    match s.kind() {
        K::LetStmt { name, value, body } => {
            let nv = m.mutate_expr(value);
            let nb = m.mutate_stmt(body);
            if nv.same_as(value) && nb.same_as(body) {
                s.clone()
            } else {
                Stmt::let_stmt(name.clone(), nv, nb)
            }
        }
        K::AssertStmt { condition, message } => {
            let nc = m.mutate_expr(condition);
            if nc.same_as(condition) {
                s.clone()
            } else {
                Stmt::assert_stmt(nc, message.clone())
            }
        }
        K::PrintStmt { prefix, args } => {
            let mut changed = false;
            let new_args: Vec<Expr> = args
                .iter()
                .map(|a| {
                    let na = m.mutate_expr(a);
                    changed |= !na.same_as(a);
                    na
                })
                .collect();
            if changed {
                Stmt::print_stmt(prefix.clone(), new_args)
            } else {
                s.clone()
            }
        }
        K::Pipeline {
            name,
            produce,
            update,
            consume,
        } => {
            let np = m.mutate_stmt(produce);
            let nu = update.as_ref().map(|u| m.mutate_stmt(u));
            let nc = m.mutate_stmt(consume);
            let update_changed = match (&nu, update) {
                (Some(a), Some(b)) => !a.same_as(b),
                (None, None) => false,
                _ => true,
            };
            if np.same_as(produce) && nc.same_as(consume) && !update_changed {
                s.clone()
            } else {
                Stmt::pipeline(name.clone(), np, nu, nc)
            }
        }
        K::For {
            name,
            min,
            extent,
            for_kind,
            partition,
            body,
        } => {
            let nmin = m.mutate_expr(min);
            let nextent = m.mutate_expr(extent);
            let nbody = m.mutate_stmt(body);
            if nmin.same_as(min) && nextent.same_as(extent) && nbody.same_as(body) {
                s.clone()
            } else {
                Stmt::for_loop_partitioned(
                    name.clone(),
                    nmin,
                    nextent,
                    *for_kind,
                    partition.clone(),
                    nbody,
                )
            }
        }
        K::Store { name, value, index } => {
            let nv = m.mutate_expr(value);
            let ni = m.mutate_expr(index);
            if nv.same_as(value) && ni.same_as(index) {
                s.clone()
            } else {
                Stmt::store(name.clone(), nv, ni)
            }
        }
        K::Provide { name, value, args } => {
            let nv = m.mutate_expr(value);
            let mut changed = !nv.same_as(value);
            let new_args: Vec<Expr> = args
                .iter()
                .map(|a| {
                    let na = m.mutate_expr(a);
                    changed |= !na.same_as(a);
                    na
                })
                .collect();
            if changed {
                Stmt::provide(name.clone(), nv, new_args)
            } else {
                s.clone()
            }
        }
        K::Allocate {
            name,
            ty,
            size,
            body,
        } => {
            let ns = m.mutate_expr(size);
            let nb = m.mutate_stmt(body);
            if ns.same_as(size) && nb.same_as(body) {
                s.clone()
            } else {
                Stmt::allocate(name.clone(), *ty, ns, nb)
            }
        }
        K::Free { .. } => s.clone(),
        K::Realize {
            name,
            ty,
            bounds,
            body,
        } => {
            let mut changed = false;
            let new_bounds: Vec<(Expr, Expr)> = bounds
                .iter()
                .map(|(min, extent)| {
                    let nmin = m.mutate_expr(min);
                    let nextent = m.mutate_expr(extent);
                    changed |= !nmin.same_as(min) || !nextent.same_as(extent);
                    (nmin, nextent)
                })
                .collect();
            let nb = m.mutate_stmt(body);
            changed |= !nb.same_as(body);
            if changed {
                Stmt::realize(name.clone(), *ty, new_bounds, nb)
            } else {
                s.clone()
            }
        }
        K::Block { first, rest } => {
            let nf = m.mutate_stmt(first);
            let nr = rest.as_ref().map(|r| m.mutate_stmt(r));
            let rest_changed = match (&nr, rest) {
                (Some(a), Some(b)) => !a.same_as(b),
                (None, None) => false,
                _ => true,
            };
            if nf.same_as(first) && !rest_changed {
                s.clone()
            } else {
                Stmt::block(nf, nr)
            }
        }
        K::StmtTargetVar { name, body, source } => {
            let nb = m.mutate_stmt(body);
            if nb.same_as(body) {
                s.clone()
            } else {
                Stmt::stmt_target_var(name.clone(), nb, source.clone())
            }
        }
    }
}

/// Visitor variant whose child recursion goes through `process_*`, so that a
/// scope-tracking layer can observe every descent before per-kind logic runs.
pub trait Process: Sized {
    fn process_expr(&mut self, e: &Expr) {
        self.process_visit_expr(e);
    }

    fn process_stmt(&mut self, s: &Stmt) {
        self.process_visit_stmt(s);
    }

    fn process_visit_expr(&mut self, e: &Expr) {
        process_children_expr(self, e);
    }

    fn process_visit_stmt(&mut self, s: &Stmt) {
        process_children_stmt(self, s);
    }
}

pub fn process_children_expr<P: Process>(p: &mut P, e: &Expr) {
    use ExprKind as K;
    match e.kind() {
        K::IntImm(_) | K::FloatImm(_) | K::Variable { .. } | K::Infinity { .. } => {}
        K::Cast(a) | K::Not(a) | K::Broadcast { value: a, .. } => p.process_expr(a),
        K::Add(a, b)
        | K::Sub(a, b)
        | K::Mul(a, b)
        | K::Div(a, b)
        | K::Mod(a, b)
        | K::Min(a, b)
        | K::Max(a, b)
        | K::Eq(a, b)
        | K::Ne(a, b)
        | K::Lt(a, b)
        | K::Le(a, b)
        | K::Gt(a, b)
        | K::Ge(a, b)
        | K::And(a, b)
        | K::Or(a, b) => {
            p.process_expr(a);
            p.process_expr(b);
        }
        K::Select {
            condition,
            true_value,
            false_value,
        } => {
            p.process_expr(condition);
            p.process_expr(true_value);
            p.process_expr(false_value);
        }
        K::Load { index, .. } => p.process_expr(index),
        K::Ramp { base, stride, .. } => {
            p.process_expr(base);
            p.process_expr(stride);
        }
        K::Call { args, .. } => {
            for a in args {
                p.process_expr(a);
            }
        }
        K::Let { value, body, .. } => {
            p.process_expr(value);
            p.process_expr(body);
        }
        K::Clamp {
            value,
            min,
            max,
            tile,
            clamp,
        } => {
            p.process_expr(value);
            p.process_expr(min);
            p.process_expr(max);
            if *clamp == crate::ir::ClampKind::Tile {
                p.process_expr(tile);
            }
        }
        K::Solve { body, .. } | K::TargetVar { body, .. } => p.process_expr(body),
    }
}

pub fn process_children_stmt<P: Process>(p: &mut P, s: &Stmt) {
    use StmtKind as K;
    match s.kind() {
        K::LetStmt { value, body, .. } => {
            p.process_expr(value);
            p.process_stmt(body);
        }
        K::AssertStmt { condition, .. } => p.process_expr(condition),
        K::PrintStmt { args, .. } => {
            for a in args {
                p.process_expr(a);
            }
        }
        K::Pipeline {
            produce,
            update,
            consume,
            ..
        } => {
            p.process_stmt(produce);
            if let Some(u) = update {
                p.process_stmt(u);
            }
            p.process_stmt(consume);
        }
        K::For {
            min, extent, body, ..
        } => {
            p.process_expr(min);
            p.process_expr(extent);
            p.process_stmt(body);
        }
        K::Store { value, index, .. } => {
            p.process_expr(value);
            p.process_expr(index);
        }
        K::Provide { value, args, .. } => {
            p.process_expr(value);
            for a in args {
                p.process_expr(a);
            }
        }
        K::Allocate { size, body, .. } => {
            p.process_expr(size);
            p.process_stmt(body);
        }
        K::Free { .. } => {}
        K::Realize { bounds, body, .. } => {
            for (min, extent) in bounds {
                p.process_expr(min);
                p.process_expr(extent);
            }
            p.process_stmt(body);
        }
        K::Block { first, rest } => {
            p.process_stmt(first);
            if let Some(r) = rest {
                p.process_stmt(r);
            }
        }
        K::StmtTargetVar { body, .. } => p.process_stmt(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::equal;

    struct CountVars {
        count: usize,
    }

    impl Visitor for CountVars {
        fn visit_expr(&mut self, e: &Expr) {
            if matches!(e.kind(), ExprKind::Variable { .. }) {
                self.count += 1;
            }
            walk_expr(self, e);
        }
    }

    #[test]
    fn visitor_reaches_all_children() {
        let x = Expr::var("x");
        let e = crate::ops::select(
            crate::ops::lt(x.clone(), 3),
            x.clone() + 1,
            x.clone() * 2,
        );
        let mut v = CountVars { count: 0 };
        v.visit_expr(&e);
        assert_eq!(v.count, 3);
    }

    struct RenameVar;

    impl Mutator for RenameVar {
        fn mutate_expr(&mut self, e: &Expr) -> Expr {
            if e.as_variable() == Some("x") {
                Expr::var("y")
            } else {
                mutate_children_expr(self, e)
            }
        }
    }

    #[test]
    fn mutator_shares_untouched_subtrees() {
        let x = Expr::var("x");
        let z = Expr::var("z");
        let untouched = z.clone() * 3;
        let e = (x + 1) + untouched.clone();
        let r = RenameVar.mutate_expr(&e);
        assert!(equal(&r, &(Expr::var("y") + 1 + untouched.clone())));
        // The subtree without x is shared, not rebuilt.
        let (_, rb) = r.as_add().unwrap();
        assert!(rb.same_as(&untouched));

        // No change at all returns the original handle.
        let e2 = untouched.clone() + 1;
        let r2 = RenameVar.mutate_expr(&e2);
        assert!(r2.same_as(&e2));
    }
}
