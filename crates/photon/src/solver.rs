//! The backwards interval solver.
//!
//! A `Solve(e, intervals)` marker asks: for which values of the target
//! variables does `e` land inside the intervals? The solver is the
//! simplifier extended with rules that push `Solve` markers through
//! arithmetic and border-handling operators, inverting each one, until the
//! marker sits on a bare variable. `TargetVar` markers declare which names
//! are targets; everything not mentioning a live target is a constant for
//! solving purposes.
//!
//! Termination: every rule strictly reduces the number of operators between
//! the outermost `Solve` and a bare variable, and [`domain_solver`] iterates
//! the pass to a fixed point detected by pointer identity.
//!
//! Solutions are harvested afterwards by [`extract_solutions`]: each
//! `Solve` whose body is a bare target variable contributes its interval
//! vector, keyed by the variable's `TargetVar` source.

use smallvec::SmallVec;

use crate::{
    bounds::BoundsAnalysis,
    context::{ContextId, LazyScope, INVALID_CONTEXT},
    ctx::CompilerContext,
    diag::trace,
    domain::{DomainType, MAX_DOMAINS},
    equality::equal,
    inline_let::variable_occurrences,
    interval::DomInterval,
    ir::{ClampKind, Expr, ExprKind, Stmt},
    modulus::ModulusRemainder,
    ops::{self, ge, le, make_infinity, select},
    scope::Scope,
    simplify::{dispatch_expr, dispatch_stmt, SimplifyCore},
    ty::Type,
    visit::{process_children_expr, walk_expr, Mutator, Process, Visitor},
};

/// Is `e` constant with respect to an explicit list of free variable names?
/// A `Let` that rebinds one of the names hides it within its body.
pub fn is_constant_expr(varlist: &[String], e: &Expr) -> bool {
    struct HasVariable<'a> {
        varlist: &'a [String],
        found: bool,
    }
    impl Visitor for HasVariable<'_> {
        fn visit_expr(&mut self, e: &Expr) {
            if self.found {
                return;
            }
            match e.kind() {
                ExprKind::Variable { name, .. } => {
                    self.found = self.varlist.iter().any(|v| v == name);
                }
                ExprKind::Let { name, value, body } => {
                    self.visit_expr(value);
                    if self.found {
                        return;
                    }
                    if self.varlist.iter().any(|v| v == name) {
                        // The name is rebound inside; search the body with
                        // it removed from the list.
                        let reduced: Vec<String> = self
                            .varlist
                            .iter()
                            .filter(|v| *v != name)
                            .cloned()
                            .collect();
                        let mut sub = HasVariable {
                            varlist: &reduced,
                            found: false,
                        };
                        sub.visit_expr(body);
                        self.found = sub.found;
                    } else {
                        self.visit_expr(body);
                    }
                }
                _ => walk_expr(self, e),
            }
        }
    }
    let mut search = HasVariable {
        varlist,
        found: false,
    };
    search.visit_expr(e);
    !search.found
}

/// Determines whether an expression mentions any live solve target, using
/// the context manager's target bindings.
pub(crate) struct HasTarget<'c> {
    scope: LazyScope<'c>,
    search_context: ContextId,
    found: bool,
}

impl<'c> HasTarget<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        Self {
            scope: LazyScope::new(cc),
            search_context: INVALID_CONTEXT,
            found: false,
        }
    }

    /// True when `e` mentions no target visible from the current context.
    pub fn is_constant_expr(&mut self, e: &Expr) -> bool {
        self.found = false;
        self.search_context = self.scope.current_context();
        self.process_expr(e);
        !self.found
    }
}

impl Process for HasTarget<'_> {
    fn process_expr(&mut self, e: &Expr) {
        if self.found {
            return;
        }
        let entered = self.scope.enter_expr(e);
        self.process_visit_expr(e);
        self.scope.leave_expr(entered, e);
    }

    fn process_stmt(&mut self, s: &Stmt) {
        if self.found {
            return;
        }
        let entered = self.scope.enter_stmt(s);
        self.process_visit_stmt(s);
        self.scope.leave_stmt(entered, s);
    }

    fn process_visit_expr(&mut self, e: &Expr) {
        if let Some(name) = e.as_variable() {
            self.found = self.scope.is_target(name, self.search_context);
        } else {
            process_children_expr(self, e);
        }
    }
}

/// One extracted solution: a target variable, the source node its
/// `TargetVar` recorded, and the solved interval vector.
#[derive(Debug, Clone)]
pub struct Solution {
    pub var: String,
    pub expr_source: Option<Expr>,
    pub stmt_source: Option<Stmt>,
    pub intervals: SmallVec<[DomInterval; 2]>,
}

pub struct Solver<'c> {
    cc: &'c CompilerContext,
    scope: Scope<Option<Expr>>,
    alignment: Scope<ModulusRemainder>,
    lazy: LazyScope<'c>,
    targets: HasTarget<'c>,
    bounds: BoundsAnalysis<'c>,
}

impl<'c> Solver<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        Self {
            cc,
            scope: Scope::new(),
            alignment: Scope::new(),
            lazy: LazyScope::new(cc),
            targets: HasTarget::new(cc),
            bounds: BoundsAnalysis::new(cc),
        }
    }

    fn is_constant(&mut self, e: &Expr) -> bool {
        self.targets.is_constant_expr(e)
    }

    /// Interval of a target-free expression, for threading through the
    /// interval inverses. Free symbols stay symbolic points.
    fn constant_bounds(&mut self, e: &Expr) -> DomInterval {
        self.bounds.bounds(e)
    }
}

impl SimplifyCore for Solver<'_> {
    fn cc(&self) -> &CompilerContext {
        self.cc
    }

    fn scope_mut(&mut self) -> &mut Scope<Option<Expr>> {
        &mut self.scope
    }

    fn alignment_mut(&mut self) -> &mut Scope<ModulusRemainder> {
        &mut self.alignment
    }
}

impl Mutator for Solver<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        let entered = self.lazy.enter_expr(e);
        let result = match e.kind() {
            ExprKind::Solve { .. } => visit_solve(self, e),
            ExprKind::Add(..) => solver_add(self, e),
            ExprKind::Sub(..) => solver_sub(self, e),
            ExprKind::Mul(..) => solver_mul(self, e),
            ExprKind::Div(..) => solver_div(self, e),
            _ => dispatch_expr(self, e),
        };
        self.lazy.leave_expr(entered, e);
        result
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        let entered = self.lazy.enter_stmt(s);
        let result = dispatch_stmt(self, s);
        self.lazy.leave_stmt(entered, s);
        result
    }
}

/// Run one solver pass.
pub fn solver_pass(cc: &CompilerContext, e: &Expr) -> Expr {
    Solver::new(cc).mutate_expr(e)
}

/// Rewrite Solve markers until nothing changes.
pub fn domain_solver(cc: &CompilerContext, e: &Expr) -> Expr {
    let mut current = e.clone();
    loop {
        let next = Solver::new(cc).mutate_expr(&current);
        if next.same_as(&current) {
            trace!(cc, 3, "SOLVER", "fixed point: {next}");
            return next;
        }
        current = next;
    }
}

/// Statement form of [`domain_solver`].
pub fn domain_solver_stmt(cc: &CompilerContext, s: &Stmt) -> Stmt {
    let mut current = s.clone();
    loop {
        let next = Solver::new(cc).mutate_stmt(&current);
        if next.same_as(&current) {
            return next;
        }
        current = next;
    }
}

/// Border-handler inference over a full interval vector.
///
/// A limit is effective when it lies inside the Valid interval: everything
/// beyond it is mapped back in, so the Computable domain becomes unbounded
/// at that end, while the Valid domain tightens to the limit. Operators that
/// cannot be partially effective require both limits to be effective
/// together. Limits that are not imposed at all are passed as `None` and
/// leave their end untouched.
pub(crate) fn solve_clamp_limits(
    cc: &CompilerContext,
    v: &[DomInterval],
    t: Type,
    op_min: Option<&Expr>,
    op_max: Option<&Expr>,
    partially_effective: bool,
) -> SmallVec<[DomInterval; 2]> {
    let valid = v[DomainType::Valid as usize].clone();
    let mut result: SmallVec<[DomInterval; 2]> = v.iter().cloned().collect();

    let mut effective_min = op_min.map(|lo| ge(lo.clone(), valid.min.clone()));
    let mut effective_max = op_max.map(|hi| le(hi.clone(), valid.max.clone()));
    if !partially_effective {
        if let (Some(emin), Some(emax)) = (&effective_min, &effective_max) {
            // Both ends or neither.
            let both = ops::and(emin.clone(), emax.clone());
            effective_min = Some(both.clone());
            effective_max = Some(both);
        }
    }

    if let Some(lo) = op_min {
        let tightened = ops::max(lo.clone(), valid.min.clone());
        result[DomainType::Computable as usize].min = crate::simplify::simplify(
            cc,
            &select(effective_min.unwrap(), make_infinity(t, -1), tightened.clone()),
        );
        result[DomainType::Valid as usize].min = crate::simplify::simplify(cc, &tightened);
    }
    if let Some(hi) = op_max {
        let tightened = ops::min(hi.clone(), valid.max.clone());
        result[DomainType::Computable as usize].max = crate::simplify::simplify(
            cc,
            &select(effective_max.unwrap(), make_infinity(t, 1), tightened.clone()),
        );
        result[DomainType::Valid as usize].max = crate::simplify::simplify(cc, &tightened);
    }
    result
}

fn solve_with(body: Expr, intervals: impl IntoIterator<Item = DomInterval>) -> Expr {
    Expr::solve(body, intervals)
}

fn visit_solve(m: &mut Solver, e: &Expr) -> Expr {
    let (op_body, intervals) = {
        let (b, iv) = e.as_solve().unwrap();
        (b.clone(), iv.to_vec())
    };
    let cc = m.cc;
    let body = m.mutate_expr(&op_body);
    trace!(cc, 3, "SOLVER", "solve {body}");

    // Nested markers merge on the intersection of their intervals.
    if let Some((inner, inner_intervals)) = body.as_solve() {
        assert!(
            inner_intervals.len() == intervals.len(),
            "Nested Solve markers with different domain counts"
        );
        let merged: Vec<DomInterval> = intervals
            .iter()
            .zip(inner_intervals.iter())
            .map(|(u, w)| u.intersect(cc, w))
            .collect();
        let inner = inner.clone();
        return m.mutate_expr(&solve_with(inner, merged));
    }

    if let Some((aa, ab)) = body.as_add() {
        if m.is_constant(ab) {
            let (aa, ab) = (aa.clone(), ab.clone());
            let k = m.constant_bounds(&ab);
            let moved: Vec<DomInterval> =
                intervals.iter().map(|v| v.inverse_add(cc, &k)).collect();
            return m.mutate_expr(&(solve_with(aa, moved) + ab));
        }
    }
    if let Some((sa, sb)) = body.as_sub() {
        if m.is_constant(sb) {
            let (sa, sb) = (sa.clone(), sb.clone());
            let k = m.constant_bounds(&sb);
            let moved: Vec<DomInterval> =
                intervals.iter().map(|v| v.inverse_sub(cc, &k)).collect();
            return m.mutate_expr(&(solve_with(sa, moved) - sb));
        }
        if m.is_constant(sa) {
            // solve(k - v) becomes -solve(v - k) with negated intervals.
            let (sa, sb) = (sa.clone(), sb.clone());
            let negated: Vec<DomInterval> = intervals.iter().map(|v| v.neg(cc)).collect();
            return m.mutate_expr(&(-solve_with(sb - sa, negated)));
        }
    }
    if let Some((ma, mb)) = body.as_mul() {
        if m.is_constant(mb) {
            // Find every integer that multiplies back into the interval.
            let (ma, mb) = (ma.clone(), mb.clone());
            let moved: Vec<DomInterval> =
                intervals.iter().map(|v| v.decimate(cc, &mb)).collect();
            return m.mutate_expr(&(solve_with(ma, moved) * mb));
        }
    }
    if let Some((da, db)) = body.as_div() {
        if m.is_constant(db) {
            // Find every integer that divides back into the interval.
            let (da, db) = (da.clone(), db.clone());
            let moved: Vec<DomInterval> = intervals.iter().map(|v| v.zoom(cc, &db)).collect();
            return m.mutate_expr(&(solve_with(da, moved) / db));
        }
    }
    if let Some((ka, vb)) = body.as_min() {
        // Min against a constant limit is a border handler at the upper end.
        let (const_a, const_b) = (m.is_constant(ka), m.is_constant(vb));
        if const_a != const_b {
            let (k, v) = if const_a {
                (ka.clone(), vb.clone())
            } else {
                (vb.clone(), ka.clone())
            };
            let moved = solve_min_intervals(m, &intervals, &k);
            let solved = solve_with(v, moved);
            let rebuilt = if const_a {
                Expr::min(k, solved)
            } else {
                Expr::min(solved, k)
            };
            return m.mutate_expr(&rebuilt);
        }
    }
    if let Some((ka, vb)) = body.as_max() {
        let (const_a, const_b) = (m.is_constant(ka), m.is_constant(vb));
        if const_a != const_b {
            let (k, v) = if const_a {
                (ka.clone(), vb.clone())
            } else {
                (vb.clone(), ka.clone())
            };
            let moved = solve_max_intervals(m, &intervals, &k);
            let solved = solve_with(v, moved);
            let rebuilt = if const_a {
                Expr::max(k, solved)
            } else {
                Expr::max(solved, k)
            };
            return m.mutate_expr(&rebuilt);
        }
    }
    if let ExprKind::Mod(a, b) = body.kind() {
        if m.is_constant(b) {
            let (a, b) = (a.clone(), b.clone());
            let moved: Vec<DomInterval> =
                intervals.iter().map(|v| v.inverse_mod(cc, &b)).collect();
            return m.mutate_expr(&(solve_with(a, moved) % b));
        }
    }
    if let ExprKind::Clamp {
        clamp,
        value,
        min,
        max,
        tile,
    } = body.kind()
    {
        if intervals.len() == MAX_DOMAINS {
            match clamp {
                ClampKind::None => {
                    // Disallow access outside the valid region: the valid
                    // interval becomes the computable one too.
                    let valid = intervals[DomainType::Valid as usize].clone();
                    let moved = vec![valid.clone(), valid];
                    let (value, min, max, tile) =
                        (value.clone(), min.clone(), max.clone(), tile.clone());
                    return m.mutate_expr(&Expr::clamp(
                        ClampKind::None,
                        solve_with(value, moved),
                        min,
                        max,
                        tile,
                    ));
                }
                _ => {
                    if m.is_constant(min) && m.is_constant(max) {
                        // Only plain clamping can be effective at a single
                        // end; the wrapping and reflecting kinds map an
                        // overshoot at one end to the other.
                        let partially = *clamp == ClampKind::Replicate;
                        let moved = solve_clamp_limits(
                            cc,
                            &intervals,
                            value.ty(),
                            Some(min),
                            Some(max),
                            partially,
                        );
                        let (clamp, value, min, max, tile) = (
                            *clamp,
                            value.clone(),
                            min.clone(),
                            max.clone(),
                            tile.clone(),
                        );
                        return m.mutate_expr(&Expr::clamp(
                            clamp,
                            solve_with(value, moved),
                            min,
                            max,
                            tile,
                        ));
                    }
                }
            }
        }
    }

    if body.same_as(&op_body) {
        e.clone()
    } else {
        solve_with(body, intervals)
    }
}

fn solve_min_intervals(
    m: &mut Solver,
    intervals: &[DomInterval],
    k: &Expr,
) -> Vec<DomInterval> {
    let cc = m.cc;
    if intervals.len() == MAX_DOMAINS {
        solve_clamp_limits(cc, intervals, k.ty(), None, Some(k), true).into_vec()
    } else {
        let bounds = m.constant_bounds(k);
        intervals
            .iter()
            .map(|v| v.inverse_min(cc, &bounds))
            .collect()
    }
}

fn solve_max_intervals(
    m: &mut Solver,
    intervals: &[DomInterval],
    k: &Expr,
) -> Vec<DomInterval> {
    let cc = m.cc;
    if intervals.len() == MAX_DOMAINS {
        solve_clamp_limits(cc, intervals, k.ty(), Some(k), None, true).into_vec()
    } else {
        let bounds = m.constant_bounds(k);
        intervals
            .iter()
            .map(|v| v.inverse_max(cc, &bounds))
            .collect()
    }
}

// The solver's arithmetic visits keep the simplifier's behaviour but
// additionally pull target-free subexpressions outside expressions that
// mention targets, so Solve markers sink towards bare variables. The rules
// are chosen so the plain simplifier does not immediately reverse them.

fn solver_add(m: &mut Solver, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_add().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let const_a = m.is_constant(&a);
    let const_b = m.is_constant(&b);

    if !const_a && !const_b {
        if let Some((aa, ab)) = a.as_add() {
            let (aa, ab) = (aa.clone(), ab.clone());
            if m.is_constant(&ab) {
                // (v + k) + w --> (v + w) + k
                return m.mutate_expr(&((aa + b) + ab));
            }
            if m.is_constant(&aa) {
                // (k + v) + w --> (v + w) + k
                return m.mutate_expr(&((ab + b) + aa));
            }
        }
        if let Some((ba, bb)) = b.as_add() {
            let (ba, bb) = (ba.clone(), bb.clone());
            if m.is_constant(&bb) {
                // v + (w + k) --> (v + w) + k
                return m.mutate_expr(&((a + ba) + bb));
            }
            if m.is_constant(&ba) {
                // v + (k + w) --> (v + w) + k
                return m.mutate_expr(&((a + bb) + ba));
            }
        }
        if let Some((sa, sb)) = a.as_sub() {
            let (sa, sb) = (sa.clone(), sb.clone());
            if m.is_constant(&sa) {
                // (k - v) + w --> (w - v) + k
                return m.mutate_expr(&((b - sb) + sa));
            }
            if m.is_constant(&sb) {
                // (v - k) + w --> (v + w) - k
                return m.mutate_expr(&((sa + b) - sb));
            }
        }
        if let Some((ba, bb)) = b.as_sub() {
            let (ba, bb) = (ba.clone(), bb.clone());
            if m.is_constant(&ba) {
                // v + (k - w) --> (v - w) + k
                return m.mutate_expr(&((a - bb) + ba));
            }
            if m.is_constant(&bb) {
                // v + (w - k) --> (v + w) - k
                return m.mutate_expr(&((a + ba) - bb));
            }
        }
    }
    dispatch_expr(m, e)
}

fn solver_sub(m: &mut Solver, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_sub().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let const_a = m.is_constant(&a);
    let const_b = m.is_constant(&b);

    if !const_a && !const_b {
        if let Some((aa, ab)) = a.as_add() {
            let (aa, ab) = (aa.clone(), ab.clone());
            if m.is_constant(&ab) {
                // (v + k) - w --> (v - w) + k
                return m.mutate_expr(&((aa - b) + ab));
            }
        }
        if let Some((ba, bb)) = b.as_add() {
            let (ba, bb) = (ba.clone(), bb.clone());
            if m.is_constant(&bb) {
                // v - (w + k) --> (v - w) - k
                return m.mutate_expr(&((a - ba) - bb));
            }
        }
        if let Some((sa, sb)) = a.as_sub() {
            let (sa, sb) = (sa.clone(), sb.clone());
            if m.is_constant(&sa) {
                // (k - v) - w --> k - (v + w)
                return m.mutate_expr(&(sa - (b + sb)));
            }
            if m.is_constant(&sb) {
                // (v - k) - w --> (v - w) - k
                return m.mutate_expr(&((sa - b) - sb));
            }
        }
        if let Some((ba, bb)) = b.as_sub() {
            let (ba, bb) = (ba.clone(), bb.clone());
            if m.is_constant(&ba) {
                // v - (k - w) --> (v + w) - k
                return m.mutate_expr(&((a + bb) - ba));
            }
            if m.is_constant(&bb) {
                // v - (w - k) --> (v - w) + k
                return m.mutate_expr(&((a - ba) + bb));
            }
        }
    }
    dispatch_expr(m, e)
}

fn solver_mul(m: &mut Solver, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_mul().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let const_a = m.is_constant(&a);
    let const_b = m.is_constant(&b);
    let integer_types = e.ty().is_int() || e.ty().is_uint();

    if !(const_a && const_b) {
        // Cancelling a division. These produce the particular solution that
        // assumes the shared term is nonzero, and apply whether or not the
        // term is constant.
        if let Some((da, db)) = a.as_div() {
            if equal(db, &b) {
                // (v / b) * b --> v
                return da.clone();
            }
        }
        if let Some((da, db)) = b.as_div() {
            if equal(db, &a) {
                // a * (v / a) --> v
                return da.clone();
            }
        }
        if !const_a && !const_b {
            if let Some((maa, mab)) = a.as_mul() {
                let (maa, mab) = (maa.clone(), mab.clone());
                if m.is_constant(&mab) {
                    // (v * k) * w --> (v * w) * k
                    return m.mutate_expr(&((maa * b) * mab));
                }
                if m.is_constant(&maa) {
                    // (k * v) * w --> (v * w) * k
                    return m.mutate_expr(&((mab * b) * maa));
                }
            }
            if let Some((mba, mbb)) = b.as_mul() {
                let (mba, mbb) = (mba.clone(), mbb.clone());
                if m.is_constant(&mbb) {
                    // v * (w * k) --> (v * w) * k
                    return m.mutate_expr(&((a * mba) * mbb));
                }
                if m.is_constant(&mba) {
                    // v * (k * w) --> (v * w) * k
                    return m.mutate_expr(&((a * mbb) * mba));
                }
            }
            if !integer_types {
                // Real division commutes with multiplication; integer floor
                // division does not.
                if let Some((da, db)) = a.as_div() {
                    let (da, db) = (da.clone(), db.clone());
                    if m.is_constant(&db) {
                        // (v / k) * w --> (v * w) / k
                        return m.mutate_expr(&((da * b) / db));
                    }
                }
                if let Some((da, db)) = b.as_div() {
                    let (da, db) = (da.clone(), db.clone());
                    if m.is_constant(&db) {
                        // v * (w / k) --> (v * w) / k
                        return m.mutate_expr(&((a * da) / db));
                    }
                }
            }
        }
    }
    dispatch_expr(m, e)
}

fn solver_div(m: &mut Solver, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_div().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let const_a = m.is_constant(&a);
    let const_b = m.is_constant(&b);

    if !(const_a && const_b) {
        // Cancellation rules assuming the shared term is nonzero.
        if let Some((maa, mab)) = a.as_mul() {
            if equal(mab, &b) {
                // (v * b) / b --> v
                return maa.clone();
            }
            if equal(maa, &b) {
                // (b * v) / b --> v
                return mab.clone();
            }
        }
        if let Some((aa, ab)) = a.as_add() {
            if equal(ab, &b) {
                // (v + b) / b --> v / b + 1
                let (aa, one) = (aa.clone(), ops::make_one(b.ty()));
                return m.mutate_expr(&(aa / b + one));
            }
            if equal(aa, &b) {
                // (b + v) / b --> v / b + 1
                let (ab, one) = (ab.clone(), ops::make_one(b.ty()));
                return m.mutate_expr(&(ab / b + one));
            }
        }
        if let Some((sa, sb)) = a.as_sub() {
            if equal(sb, &b) {
                // (v - b) / b --> v / b - 1
                let (sa, one) = (sa.clone(), ops::make_one(b.ty()));
                return m.mutate_expr(&(sa / b - one));
            }
            if equal(sa, &b) {
                // (b - v) / b --> 1 - v / b
                let (sb, one) = (sb.clone(), ops::make_one(b.ty()));
                return m.mutate_expr(&(one - sb / b));
            }
        }
        if let Some((da, db)) = a.as_div() {
            let (da, db) = (da.clone(), db.clone());
            if m.is_constant(&db) && !const_b {
                // (v / k) / w --> (v / w) / k
                return m.mutate_expr(&((da / b) / db));
            }
        }
    }
    dispatch_expr(m, e)
}

/// Walks a solved tree and harvests solutions for one variable.
struct ExtractSolutions<'c> {
    scope: LazyScope<'c>,
    var: String,
    expr_source: Option<Expr>,
    stmt_source: Option<Stmt>,
    solutions: Vec<Solution>,
    /// Set when the variable occurs inside a Solve whose body could not be
    /// reduced to a bare variable: its intervals are then untrustworthy.
    inexact: bool,
}

impl Process for ExtractSolutions<'_> {
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

    fn process_visit_expr(&mut self, e: &Expr) {
        let ExprKind::Solve { body, intervals } = e.kind() else {
            process_children_expr(self, e);
            return;
        };
        self.process_expr(body);

        // Look through any nested markers the solver left unmerged.
        let mut inner = body;
        while let Some((next, _)) = inner.as_solve() {
            inner = next;
        }

        if let Some(name) = inner.as_variable() {
            if name != self.var {
                return;
            }
            let found = self.scope.find_target(name);
            if found == INVALID_CONTEXT {
                return;
            }
            let def = self.scope.call(found);
            match def.node.as_ref() {
                Some(crate::ir::IRHandle::Expr(t)) => {
                    if let ExprKind::TargetVar { source, .. } = t.kind() {
                        if source_matches(&self.expr_source, source) {
                            self.solutions.push(Solution {
                                var: name.to_owned(),
                                expr_source: source.clone(),
                                stmt_source: None,
                                intervals: intervals.clone(),
                            });
                        }
                    }
                }
                Some(crate::ir::IRHandle::Stmt(t)) => {
                    if let crate::ir::StmtKind::StmtTargetVar { source, .. } = t.kind() {
                        if stmt_source_matches(&self.stmt_source, source) {
                            self.solutions.push(Solution {
                                var: name.to_owned(),
                                expr_source: None,
                                stmt_source: source.clone(),
                                intervals: intervals.clone(),
                            });
                        }
                    }
                }
                None => {}
            }
            self.scope.ret(found);
        } else {
            // The marker never reached a bare variable. Any live target in
            // its body has no extractable interval here.
            let context = self.scope.current_context();
            for name in variable_occurrences(body) {
                if name == self.var && self.scope.is_target(&name, context) {
                    self.inexact = true;
                }
            }
        }
    }
}

fn source_matches(wanted: &Option<Expr>, found: &Option<Expr>) -> bool {
    match (wanted, found) {
        (None, _) => true,
        (Some(w), Some(f)) => w.same_as(f),
        (Some(_), None) => false,
    }
}

fn stmt_source_matches(wanted: &Option<Stmt>, found: &Option<Stmt>) -> bool {
    match (wanted, found) {
        (None, _) => true,
        (Some(w), Some(f)) => w.same_as(f),
        (Some(_), None) => false,
    }
}

/// Solutions for `var` within a solved expression, filtered by the source
/// expression its `TargetVar` recorded (pass `None` to accept any).
pub fn extract_solutions(
    cc: &CompilerContext,
    var: &str,
    source: Option<&Expr>,
    solved: &Expr,
) -> Vec<Solution> {
    extract_solutions_with_exact(cc, var, source, solved).0
}

/// As [`extract_solutions`], also reporting whether every occurrence of the
/// variable was fully solved.
pub fn extract_solutions_with_exact(
    cc: &CompilerContext,
    var: &str,
    source: Option<&Expr>,
    solved: &Expr,
) -> (Vec<Solution>, bool) {
    let mut extract = ExtractSolutions {
        scope: LazyScope::new(cc),
        var: var.to_owned(),
        expr_source: source.cloned(),
        stmt_source: None,
        solutions: Vec::new(),
        inexact: false,
    };
    extract.process_expr(solved);
    (extract.solutions, !extract.inexact)
}

/// Statement form of [`extract_solutions`].
pub fn extract_solutions_stmt(
    cc: &CompilerContext,
    var: &str,
    source: Option<&Stmt>,
    solved: &Stmt,
) -> Vec<Solution> {
    let mut extract = ExtractSolutions {
        scope: LazyScope::new(cc),
        var: var.to_owned(),
        expr_source: None,
        stmt_source: source.cloned(),
        solutions: Vec::new(),
        inexact: false,
    };
    extract.process_stmt(solved);
    extract.solutions
}
