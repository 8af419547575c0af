//! Forward bounds analysis.
//!
//! Infers a [`DomInterval`] containing every value an expression can take in
//! the current context. Variables resolve through the context manager: the
//! analysis jumps to the defining node (a `For` gives `[min, min+extent-1]`,
//! a `Let`/`LetStmt` the bounds of its value) and returns. Results are
//! memoised per `(context, node)`.
//!
//! The result is a superset: for every substitution of free variables by
//! in-range constants, the expression's value lies inside the inferred
//! interval. Unresolvable constructs widen to the bounds of their type;
//! 32-bit integers (and all floats) are treated as unbounded.
//!
//! The analysis must never be handed an expression that already contains
//! Infinity nodes; intervals are where infinities live, not input trees.

use crate::{
    context::{LazyScope, NodeCache},
    ctx::CompilerContext,
    diag::trace,
    equality::equal,
    interval::DomInterval,
    ir::{Expr, ExprKind, Stmt, StmtKind},
    ops::{
        const_false_of, const_true_of, ge, gt, is_one, is_zero, le, lt, make_infinity,
    },
    simplify::proved,
    ty::Type,
    visit::Process,
};

/// Bounds of `e` in the root context of a fresh walk.
pub fn bounds(cc: &CompilerContext, e: &Expr) -> DomInterval {
    BoundsAnalysis::new(cc).bounds(e)
}

pub struct BoundsAnalysis<'c> {
    scope: LazyScope<'c>,
    cache: NodeCache<DomInterval>,
    interval: DomInterval,
}

impl<'c> BoundsAnalysis<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        Self {
            scope: LazyScope::new(cc),
            cache: NodeCache::default(),
            interval: DomInterval::infinite(Type::I32),
        }
    }

    fn cc(&self) -> &'c CompilerContext {
        self.scope.cc()
    }

    /// The bounds of `e` in the current context.
    pub fn bounds(&mut self, e: &Expr) -> DomInterval {
        let context = self.scope.current_context();
        if let Some(hit) = self.cache.get_expr(context, e) {
            return hit;
        }
        self.process_expr(e);
        let result = self.interval.clone();
        self.cache.insert_expr(context, e, result.clone());
        trace!(self.cc(), 4, "BOUNDS", "bounds({e}): {result}");
        result
    }

    fn bounds_of_type(&self, t: Type) -> DomInterval {
        if t.is_uint() {
            if t.bits <= 31 {
                DomInterval::new(crate::ops::type_min(t), crate::ops::type_max(t), true)
            } else {
                // 32-bit unsigned is treated as unbounded above; zero is
                // still a sound lower bound.
                DomInterval::new(crate::ops::type_min(t), make_infinity(t, 1), true)
            }
        } else if t.is_int() {
            if t.bits <= 31 {
                DomInterval::new(crate::ops::type_min(t), crate::ops::type_max(t), true)
            } else {
                // 32-bit signed is treated as unbounded.
                DomInterval::infinite(t)
            }
        } else {
            // Floats are unbounded for analysis purposes.
            DomInterval::infinite(t)
        }
    }

    fn boolean_range(&self, width: u16, can_be_false: bool, can_be_true: bool) -> DomInterval {
        let lo = if can_be_false {
            const_false_of(width)
        } else {
            const_true_of(width)
        };
        let hi = if can_be_true {
            const_true_of(width)
        } else {
            const_false_of(width)
        };
        DomInterval::new(lo, hi, true)
    }

    fn visit_variable(&mut self, e: &Expr) {
        let name = e.as_variable().unwrap().to_owned();
        let found = self.scope.find_variable(&name);
        if found == crate::context::INVALID_CONTEXT {
            // No definition in scope; keep the name so symbolic reasoning
            // can still cancel it.
            self.interval = DomInterval::new(e.clone(), e.clone(), true);
            return;
        }
        let def = self.scope.call(found);
        match def.node.as_ref() {
            Some(crate::ir::IRHandle::Stmt(s)) => match s.kind() {
                StmtKind::For { min, extent, .. } => {
                    let min_bounds = self.bounds(min);
                    let last = min.clone() + (extent.clone() - 1);
                    let max_bounds = self.bounds(&last);
                    let exact = min_bounds.exact && max_bounds.exact;
                    self.interval = DomInterval::new(min_bounds.min, max_bounds.max, exact);
                }
                StmtKind::LetStmt { value, .. } => {
                    self.interval = self.bounds(value);
                }
                _ => panic!("Unknown defining statement for variable {name}"),
            },
            Some(crate::ir::IRHandle::Expr(d)) => match d.kind() {
                ExprKind::Let { value, .. } => {
                    self.interval = self.bounds(value);
                }
                _ => panic!("Unknown defining expression for variable {name}"),
            },
            None => panic!("Unknown defining node for variable {name}"),
        }
        self.scope.ret(found);
    }
}

impl Process for BoundsAnalysis<'_> {
    fn process_expr(&mut self, e: &Expr) {
        let entered = self.scope.enter_expr(e);
        self.process_visit_expr(e);
        self.scope.leave_expr(entered, e);
    }

    fn process_stmt(&mut self, s: &Stmt) {
        let entered = self.scope.enter_stmt(s);
        self.process_visit_stmt(s);
        self.scope.leave_stmt(entered, s);
    }

    fn process_visit_stmt(&mut self, _s: &Stmt) {
        // Statements have no value.
        self.interval = DomInterval::infinite(Type::I32);
    }

    fn process_visit_expr(&mut self, e: &Expr) {
        use ExprKind as K;
        match e.kind() {
            K::IntImm(_) | K::FloatImm(_) => {
                self.interval = DomInterval::point(e.clone());
            }
            K::Cast(v) => {
                // Assume the cast does not overflow.
                let value = self.bounds(v);
                let t = e.ty();
                self.interval = DomInterval::new(
                    crate::ops::cast(t, value.min),
                    crate::ops::cast(t, value.max),
                    value.exact,
                );
            }
            K::Variable { .. } => self.visit_variable(e),
            K::Add(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.add(self.cc(), &bb);
            }
            K::Sub(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.sub(self.cc(), &bb);
            }
            K::Mul(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.mul(self.cc(), &bb);
            }
            K::Div(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.div(self.cc(), &bb);
            }
            K::Mod(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.rem(self.cc(), &bb);
            }
            K::Min(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.min_with(self.cc(), &bb);
            }
            K::Max(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                self.interval = ba.max_with(self.cc(), &bb);
            }
            K::Clamp {
                value, min, max, ..
            } => {
                // The result is no wider than the clamped expression and no
                // wider than the span of the two limits.
                let bv = self.bounds(value);
                let bmin = self.bounds(min);
                let bmax = self.bounds(max);
                let limits = bmin.union(self.cc(), &bmax);
                self.interval = bv.intersect(self.cc(), &limits);
            }
            K::Eq(a, b) => {
                let width = e.ty().width;
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                let cc = self.cc();
                if proved(cc, &lt(ba.max.clone(), bb.min.clone()))
                    || proved(cc, &gt(ba.min.clone(), bb.max.clone()))
                {
                    // Disjoint intervals disprove equality.
                    self.interval = self.boolean_range(width, true, false);
                } else if equal(&ba.min, &ba.max)
                    && equal(&ba.min, &bb.min)
                    && equal(&ba.min, &bb.max)
                {
                    // Both sides are the same unique constant.
                    self.interval = self.boolean_range(width, false, true);
                } else {
                    self.interval = self.boolean_range(width, true, true);
                }
            }
            K::Ne(a, b) => {
                let flipped = Expr::not(Expr::eq(a.clone(), b.clone()));
                self.interval = self.bounds(&flipped);
            }
            K::Lt(a, b) => {
                let width = e.ty().width;
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                let cc = self.cc();
                if proved(cc, &lt(ba.max.clone(), bb.min.clone())) {
                    self.interval = self.boolean_range(width, false, true);
                } else if proved(cc, &ge(ba.min.clone(), bb.max.clone())) {
                    self.interval = self.boolean_range(width, true, false);
                } else {
                    self.interval = self.boolean_range(width, true, true);
                }
            }
            K::Le(a, b) => {
                let width = e.ty().width;
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                let cc = self.cc();
                if proved(cc, &le(ba.max.clone(), bb.min.clone())) {
                    self.interval = self.boolean_range(width, false, true);
                } else if proved(cc, &gt(ba.min.clone(), bb.max.clone())) {
                    self.interval = self.boolean_range(width, true, false);
                } else {
                    self.interval = self.boolean_range(width, true, true);
                }
            }
            K::Gt(a, b) => {
                let flipped = Expr::lt(b.clone(), a.clone());
                self.interval = self.bounds(&flipped);
            }
            K::Ge(a, b) => {
                let flipped = Expr::le(b.clone(), a.clone());
                self.interval = self.bounds(&flipped);
            }
            K::And(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                let width = e.ty().width;
                self.interval = if is_zero(&ba.max) {
                    ba
                } else if is_zero(&bb.max) {
                    bb
                } else if is_one(&ba.min) {
                    bb
                } else if is_one(&bb.min) {
                    ba
                } else {
                    self.boolean_range(width, true, true)
                };
            }
            K::Or(a, b) => {
                let (ba, bb) = (self.bounds(a), self.bounds(b));
                let width = e.ty().width;
                self.interval = if is_one(&ba.min) {
                    ba
                } else if is_one(&bb.min) {
                    bb
                } else if is_zero(&ba.max) {
                    bb
                } else if is_zero(&bb.max) {
                    ba
                } else {
                    self.boolean_range(width, true, true)
                };
            }
            K::Not(a) => {
                let ba = self.bounds(a);
                let width = e.ty().width;
                self.interval = if is_one(&ba.min) {
                    self.boolean_range(width, true, false)
                } else if is_zero(&ba.max) {
                    self.boolean_range(width, false, true)
                } else {
                    self.boolean_range(width, true, true)
                };
            }
            K::Select {
                condition,
                true_value,
                false_value,
            } => {
                let bc = self.bounds(condition);
                if is_one(&bc.min) {
                    self.interval = self.bounds(true_value);
                } else if is_zero(&bc.max) {
                    self.interval = self.bounds(false_value);
                } else {
                    let (bt, bf) = (self.bounds(true_value), self.bounds(false_value));
                    self.interval = bt.union(self.cc(), &bf);
                }
            }
            K::Load { .. } => {
                // Without knowledge of the producing function this is the
                // best available.
                self.interval = self.bounds_of_type(e.ty());
            }
            K::Ramp { base, stride, width } => {
                // A ramp of intervals: the bounds of each lane.
                let bb = self.bounds(base);
                let bs = self.bounds(stride);
                let exact = bb.exact && bs.exact;
                self.interval = DomInterval::new(
                    Expr::ramp(bb.min, bs.min, *width),
                    Expr::ramp(bb.max, bs.max, *width),
                    exact,
                );
            }
            K::Broadcast { value, width } => {
                let bv = self.bounds(value);
                self.interval = DomInterval::new(
                    Expr::broadcast(bv.min, *width),
                    Expr::broadcast(bv.max, *width),
                    bv.exact,
                );
            }
            K::Call { .. } => {
                self.interval = self.bounds_of_type(e.ty());
            }
            K::Let { body, .. } => {
                self.interval = self.bounds(body);
            }
            K::Solve { body, .. } | K::TargetVar { body, .. } => {
                self.interval = self.bounds(body);
            }
            K::Infinity { .. } => {
                panic!("Infinity node found in parse tree by bounds analysis")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ForKind;

    fn check_bounds(got: &DomInterval, lo: i32, hi: i32) {
        assert_eq!(
            (got.imin(), got.imax()),
            (lo, hi),
            "expected [{lo}, {hi}], got {got}"
        );
    }

    /// Enter the context of a serial loop `x in [lo, hi]` and compute the
    /// bounds of `e` there.
    fn bounds_under_loop(e: &Expr, lo: i32, hi: i32) -> DomInterval {
        let cc = CompilerContext::new();
        let body = Stmt::store("buf", e.clone(), Expr::int(0));
        let loop_ = Stmt::for_loop("x", Expr::int(lo), Expr::int(hi - lo + 1), ForKind::Serial, body.clone());
        let mut scope = LazyScope::new(&cc);
        let entered_loop = scope.enter_stmt(&loop_);
        let entered_body = scope.enter_stmt(&body);
        let mut analysis = BoundsAnalysis::new(&cc);
        let result = analysis.bounds(e);
        drop(analysis);
        scope.leave_stmt(entered_body, &body);
        scope.leave_stmt(entered_loop, &loop_);
        result
    }

    #[test]
    fn loop_variable_bounds() {
        let x = Expr::var("x");
        check_bounds(&bounds_under_loop(&x, 0, 100), 0, 100);
        check_bounds(&bounds_under_loop(&(x.clone() + 4), 0, 100), 4, 104);
        check_bounds(&bounds_under_loop(&(x.clone() * 2), 0, 10), 0, 20);
        check_bounds(&bounds_under_loop(&crate::ops::min(x.clone(), 5), 0, 10), 0, 5);
        check_bounds(&bounds_under_loop(&crate::ops::clamp(x.clone(), 2, 7), 0, 10), 2, 7);
    }

    #[test]
    fn let_bound_variable() {
        let cc = CompilerContext::new();
        let x = Expr::var("x");
        let body = x.clone() * 3;
        let e = Expr::let_in("x", Expr::int(7), body.clone());
        let mut scope = LazyScope::new(&cc);
        let e0 = scope.enter_expr(&e);
        let e1 = scope.enter_expr(&body);
        let mut analysis = BoundsAnalysis::new(&cc);
        let r = analysis.bounds(&body);
        check_bounds(&r, 21, 21);
        drop(analysis);
        scope.leave_expr(e1, &body);
        scope.leave_expr(e0, &e);
    }

    #[test]
    fn free_variables_stay_symbolic() {
        let cc = CompilerContext::new();
        let x = Expr::var("x");
        let r = bounds(&cc, &(x.clone() + 4));
        assert!(equal(&r.min, &(x.clone() + 4)));
        assert!(equal(&r.max, &(x + 4)));
        assert!(r.exact);
    }

    #[test]
    fn narrow_types_bound_loads() {
        let cc = CompilerContext::new();
        let load = Expr::load(Type::uint(8), "img", Expr::var("i"), None, None);
        let r = bounds(&cc, &load);
        assert_eq!(r.imin(), 0);
        assert_eq!(r.imax(), 255);
        // 32-bit integers are deliberately unbounded.
        let wide = Expr::load(Type::I32, "img", Expr::var("i"), None, None);
        let r = bounds(&cc, &wide);
        assert!(crate::ops::infinity_count(&r.min) < 0);
        assert!(crate::ops::infinity_count(&r.max) > 0);
    }

    #[test]
    fn boolean_bounds() {
        let x = Expr::var("x");
        // Inside the loop x is [0, 10], so x < 11 is provable.
        let r = bounds_under_loop(&lt(x.clone(), 11), 0, 10);
        assert!(is_one(&r.min));
        let r = bounds_under_loop(&lt(x.clone(), 5), 0, 10);
        assert!(is_zero(&r.min));
        assert!(is_one(&r.max));
    }

    #[test]
    #[should_panic(expected = "Infinity node")]
    fn infinity_in_input_aborts() {
        let cc = CompilerContext::new();
        let _ = bounds(&cc, &Expr::infinity(Type::I32, 1));
    }
}
