//! Bounds-driven simplification.
//!
//! A caching, scope-tracking mutator that consults [`BoundsAnalysis`] to
//! elide operations a conservative bound proves redundant: a modulus whose
//! dividend already lies in the residue range, a clamp whose limits lie
//! outside the value's range, a min/max with a provably dominant side, and a
//! select with a provably constant condition.
//!
//! Each distinct `(context, node)` pair is rewritten at most once per pass.

use crate::{
    context::{LazyScope, NodeCache},
    ctx::CompilerContext,
    bounds::BoundsAnalysis,
    ir::{ClampKind, Expr, ExprKind, Stmt},
    ops::{ge, gt, is_one, is_zero, le},
    simplify::proved,
    visit::{mutate_children_expr, mutate_children_stmt, Mutator},
};

pub fn bounds_simplify(cc: &CompilerContext, e: &Expr) -> Expr {
    BoundsSimplify::new(cc).mutate_expr(e)
}

pub fn bounds_simplify_stmt(cc: &CompilerContext, s: &Stmt) -> Stmt {
    BoundsSimplify::new(cc).mutate_stmt(s)
}

pub struct BoundsSimplify<'c> {
    scope: LazyScope<'c>,
    bounds: BoundsAnalysis<'c>,
    expr_cache: NodeCache<Expr>,
    stmt_cache: NodeCache<Stmt>,
}

impl<'c> BoundsSimplify<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        Self {
            scope: LazyScope::new(cc),
            bounds: BoundsAnalysis::new(cc),
            expr_cache: NodeCache::default(),
            stmt_cache: NodeCache::default(),
        }
    }

    fn cc(&self) -> &'c CompilerContext {
        self.scope.cc()
    }

    fn visit(&mut self, e: &Expr) -> Expr {
        use ExprKind as K;
        match e.kind() {
            K::Mod(a, b) => {
                let bounds_a = self.bounds.bounds(a);
                let bounds_b = self.bounds.bounds(b);
                let cc = self.cc();
                if proved(cc, &gt(bounds_b.min.clone(), bounds_a.max.clone()))
                    && proved(cc, &ge(bounds_a.min.clone(), 0))
                {
                    // The dividend always lies inside the positive modulus.
                    self.mutate_expr(a)
                } else if proved(cc, &crate::ops::lt(bounds_b.max.clone(), bounds_a.min.clone()))
                    && proved(cc, &le(bounds_a.max.clone(), 0))
                {
                    // The dividend always lies inside the negative modulus.
                    self.mutate_expr(a)
                } else {
                    mutate_children_expr(self, e)
                }
            }
            K::Clamp {
                clamp, value, min, max, ..
            } => {
                let bounds_a = self.bounds.bounds(value);
                let bounds_min = self.bounds.bounds(min);
                let bounds_max = self.bounds.bounds(max);
                let cc = self.cc();
                if *clamp == ClampKind::None
                    || (proved(cc, &le(bounds_min.max.clone(), bounds_a.min.clone()))
                        && proved(cc, &ge(bounds_max.min.clone(), bounds_a.max.clone())))
                {
                    // The value never leaves the clamped region.
                    self.mutate_expr(value)
                } else {
                    mutate_children_expr(self, e)
                }
            }
            K::Min(a, b) => {
                let bounds_a = self.bounds.bounds(a);
                let bounds_b = self.bounds.bounds(b);
                let cc = self.cc();
                if proved(cc, &le(bounds_a.max.clone(), bounds_b.min.clone())) {
                    self.mutate_expr(a)
                } else if proved(cc, &le(bounds_b.max.clone(), bounds_a.min.clone())) {
                    self.mutate_expr(b)
                } else {
                    mutate_children_expr(self, e)
                }
            }
            K::Max(a, b) => {
                let bounds_a = self.bounds.bounds(a);
                let bounds_b = self.bounds.bounds(b);
                let cc = self.cc();
                if proved(cc, &ge(bounds_a.min.clone(), bounds_b.max.clone())) {
                    self.mutate_expr(a)
                } else if proved(cc, &ge(bounds_b.min.clone(), bounds_a.max.clone())) {
                    self.mutate_expr(b)
                } else {
                    mutate_children_expr(self, e)
                }
            }
            K::Select {
                condition,
                true_value,
                false_value,
            } => {
                let bounds_cond = self.bounds.bounds(condition);
                if is_one(&bounds_cond.min) {
                    // Provably always true.
                    self.mutate_expr(true_value)
                } else if is_zero(&bounds_cond.max) {
                    self.mutate_expr(false_value)
                } else {
                    mutate_children_expr(self, e)
                }
            }
            _ => mutate_children_expr(self, e),
        }
    }
}

impl Mutator for BoundsSimplify<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        let context = self.scope.current_context();
        if let Some(hit) = self.expr_cache.get_expr(context, e) {
            return hit;
        }
        let entered = self.scope.enter_expr(e);
        let result = self.visit(e);
        self.scope.leave_expr(entered, e);
        self.expr_cache.insert_expr(context, e, result.clone());
        result
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        let context = self.scope.current_context();
        if let Some(hit) = self.stmt_cache.get_stmt(context, s) {
            return hit;
        }
        let entered = self.scope.enter_stmt(s);
        let result = mutate_children_stmt(self, s);
        self.scope.leave_stmt(entered, s);
        self.stmt_cache.insert_stmt(context, s, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        equality::equal_stmt,
        ir::{ForKind, StmtKind},
        ops::{abs, clamp, clamp_none, clamp_of, lt, min, select},
        ty::Type,
    };

    fn check_stmt(a: Stmt, b: Stmt, lo: i32, hi: i32) {
        let cc = CompilerContext::new();
        let wrapped = Stmt::for_loop(
            "x",
            Expr::int(lo),
            Expr::int(hi - lo + 1),
            ForKind::Serial,
            a.clone(),
        );
        let simpler = bounds_simplify_stmt(&cc, &wrapped);
        let StmtKind::For { body, .. } = simpler.kind() else {
            panic!("loop disappeared")
        };
        assert!(
            equal_stmt(body, &b),
            "bounds simplification failure\n  input: {a}  where x in [{lo}, {hi}]\n  output: {body}  expected: {b}"
        );
    }

    fn check(a: Expr, b: Expr) {
        check_with_range(a, b, 0, 10);
    }

    fn check_with_range(a: Expr, b: Expr, lo: i32, hi: i32) {
        check_stmt(
            Stmt::store("buf", a, Expr::int(0)),
            Stmt::store("buf", b, Expr::int(0)),
            lo,
            hi,
        );
    }

    #[test]
    fn select_collapse() {
        let x = Expr::var("x");
        check(select(lt(x.clone(), 11), x.clone() * 2, x.clone() * 3), x.clone() * 2);
    }

    #[test]
    fn min_elision() {
        let x = Expr::var("x");
        // x in [0, 10]: min against 9 can clip, min against 10 cannot.
        check(min(x.clone(), 9), min(x.clone(), 9));
        check(min(x.clone(), 10), x.clone());
    }

    #[test]
    fn clamp_elision() {
        let x = Expr::var("x");
        check(clamp(x.clone(), 1, 5), clamp(x.clone(), 1, 5));
        check(clamp(x.clone(), -1, 15), x.clone());
        check(clamp(x.clone() - 1, -1, 9), x.clone() - 1);
        check(clamp_of(ClampKind::Wrap, x.clone(), 0, 10), x.clone());
        check(clamp_none(x.clone()), x.clone());
    }

    #[test]
    fn elision_through_calls() {
        let x = Expr::var("x");
        let site = |e: Expr| Expr::call_extern(Type::I32, "input", [e]);
        check(abs(min(x.clone(), 10)), abs(x.clone()));
        check(
            abs(site(min(x.clone(), 10))),
            abs(site(x.clone())),
        );
    }

    #[test]
    fn mod_elision() {
        let x = Expr::var("x");
        check(x.clone() % 11, x.clone());
        check(x.clone() % 7, x.clone() % 7);
    }

    #[test]
    fn full_loop_rewrite() {
        let x = Expr::var("x");
        let input = |e: Expr| Expr::call_extern(Type::I32, "input", [e]);
        let loop_ = Stmt::for_loop(
            "x",
            Expr::int(3),
            Expr::int(10), // 3 to 12 inclusive
            ForKind::Serial,
            Stmt::provide(
                "output",
                input(clamp(x.clone(), 0, 15)) + input(clamp(x.clone() + 1, 0, 15)),
                [x.clone() + 1],
            ),
        );
        let expected = Stmt::for_loop(
            "x",
            Expr::int(3),
            Expr::int(10),
            ForKind::Serial,
            Stmt::provide(
                "output",
                input(x.clone()) + input(x.clone() + 1),
                [x.clone() + 1],
            ),
        );
        let cc = CompilerContext::new();
        let got = bounds_simplify_stmt(&cc, &loop_);
        assert!(
            equal_stmt(&got, &expected),
            "got:\n{got}\nexpected:\n{expected}"
        );
    }
}
