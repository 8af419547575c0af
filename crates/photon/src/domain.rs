//! Domains and domain inference.
//!
//! A [`Domain`] is one interval per function dimension; every function
//! carries one domain per [`DomainType`]. The Valid domain holds the caller
//! indices that produce meaningful output; the Computable domain the indices
//! for which the function can be evaluated at all — often wider, because an
//! effective border handler extends computability to infinity.
//!
//! [`domain_inference`] derives both domains for a pure definition: every
//! call argument is wrapped in a `Solve` marker carrying the callee's
//! per-dimension intervals, the whole expression is wrapped in one
//! `TargetVar` per pure argument, the backwards solver runs to a fixed
//! point, and the surviving markers are harvested per variable.
//!
//! [`backwards_interval`] is the single-expression form of the same
//! question, answered by direct structural inversion; single-expression callers use
//! it to invert one index expression against one callee interval vector.

use smallvec::{smallvec, SmallVec};
use strum::{Display, IntoStaticStr};

use crate::{
    ctx::CompilerContext,
    diag::trace,
    inline_let::{
        inline_for, inline_let_expr, inline_let_stmt, inline_variable, variable_occurrences,
        InlineCore,
    },
    interval::DomInterval,
    ir::{CallKind, ClampKind, Expr, ExprKind, Stmt, StmtKind},
    ops::{self, is_const, make_infinity},
    scope::Scope,
    simplify::simplify,
    solver::{
        domain_solver, extract_solutions_with_exact, is_constant_expr, solve_clamp_limits,
    },
    ty::Type,
    visit::{mutate_children_expr, mutate_children_stmt, walk_expr, Mutator, Visitor},
};

/// The domain kinds tracked per function, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum DomainType {
    Valid = 0,
    Computable = 1,
}

pub const MAX_DOMAINS: usize = 2;

pub const DOMAIN_TYPES: [DomainType; MAX_DOMAINS] = [DomainType::Valid, DomainType::Computable];

/// Per-dimension intervals plus a lock. Once a domain has been read for
/// further inference it must not change, so reads lock it.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    pub intervals: SmallVec<[DomInterval; 4]>,
    locked: bool,
}

impl Domain {
    pub fn new(intervals: impl IntoIterator<Item = DomInterval>) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
            locked: false,
        }
    }

    /// An unbounded, exact domain of the given dimensionality.
    pub fn infinite(dimensions: usize) -> Self {
        Self::new((0..dimensions).map(|_| DomInterval::infinite(Type::I32)))
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn dimensions(&self) -> usize {
        self.intervals.len()
    }

    /// Per-dimension intersection with another domain of the same
    /// dimensionality.
    pub fn intersection(&self, cc: &CompilerContext, other: &Self) -> Self {
        assert!(
            self.intervals.len() == other.intervals.len(),
            "Intersection of domains - must have the same dimensionality"
        );
        Self::new(
            self.intervals
                .iter()
                .zip(other.intervals.iter())
                .map(|(a, b)| a.intersect(cc, b)),
        )
    }

    pub fn min(&self, index: usize) -> Expr {
        self.intervals[index].min.clone()
    }

    pub fn max(&self, index: usize) -> Expr {
        self.intervals[index].max.clone()
    }

    pub fn exact(&self, index: usize) -> bool {
        self.intervals[index].exact
    }

    pub fn extent(&self, cc: &CompilerContext, index: usize) -> Expr {
        simplify(
            cc,
            &(self.intervals[index].max.clone() + 1 - self.intervals[index].min.clone()),
        )
    }

    pub fn imin(&self, index: usize) -> i32 {
        self.intervals[index].imin()
    }

    pub fn imax(&self, index: usize) -> i32 {
        self.intervals[index].imax()
    }

    pub fn iextent(&self, cc: &CompilerContext, index: usize) -> i32 {
        ops::get_const_int(&self.extent(cc, index))
            .expect("Domain extent value is not an integer constant")
    }
}

/// The callee interval vector for dimension `i` of a call, one entry per
/// domain type. Image-backed calls have identical valid and computable
/// domains.
fn callee_intervals(cc: &CompilerContext, call: &Expr, i: usize) -> SmallVec<[DomInterval; 2]> {
    let ExprKind::Call {
        call: kind,
        func,
        image,
        param,
        ..
    } = call.kind()
    else {
        unreachable!()
    };
    match kind {
        CallKind::Image => {
            let interval = if let Some(image) = image {
                DomInterval::new(
                    image.min(i),
                    simplify(cc, &(image.min(i) + image.extent(i) - 1)),
                    true,
                )
            } else if let Some(param) = param {
                DomInterval::new(
                    param.min(i),
                    simplify(cc, &(param.min(i) + param.extent(i) - 1)),
                    true,
                )
            } else {
                unreachable!("Call to Image is neither image nor image parameter")
            };
            smallvec![interval.clone(), interval]
        }
        CallKind::Pipeline => func
            .expect("Call to undefined pipeline function")
            .domain_intervals(cc, i),
        CallKind::Extern => unreachable!("extern calls carry no domain"),
    }
}

/// Inlines lets and wraps every Image/pipeline call argument in a `Solve`
/// marker carrying the callee's intervals.
struct PreSolver<'a, 'c> {
    cc: &'c CompilerContext,
    scope: Scope<Option<Expr>>,
    variables: &'a [String],
}

impl<'a, 'c> PreSolver<'a, 'c> {
    fn new(cc: &'c CompilerContext, variables: &'a [String]) -> Self {
        Self {
            cc,
            scope: Scope::new(),
            variables,
        }
    }

    fn presolve(&mut self, e: &Expr) -> Expr {
        let mut m = self.mutate_expr(e);
        for var in self.variables {
            m = Expr::target_var(var.clone(), m, Some(e.clone()));
        }
        m
    }
}

impl InlineCore for PreSolver<'_, '_> {
    fn inline_scope(&mut self) -> &mut Scope<Option<Expr>> {
        &mut self.scope
    }
}

impl Mutator for PreSolver<'_, '_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        match e.kind() {
            ExprKind::Variable { .. } => inline_variable(self, e),
            ExprKind::Let { .. } => inline_let_expr(self, e),
            ExprKind::Call { call, args, .. }
                if *call == CallKind::Image || *call == CallKind::Pipeline =>
            {
                let args = args.clone();
                let new_args: Vec<Expr> = args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        let domain = callee_intervals(self.cc, e, i);
                        Expr::solve(self.mutate_expr(arg), domain)
                    })
                    .collect();
                Expr::call_like(e, new_args)
            }
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

/// Infer the caller's domains for a pure definition over `variables`.
pub fn domain_inference(cc: &CompilerContext, variables: &[String], e: &Expr) -> Vec<Domain> {
    trace!(cc, 1, "DOMINF", "domain_inference: {e}");

    let pre = PreSolver::new(cc, variables).presolve(e);
    trace!(cc, 2, "DOMINF", "pre-solve: {pre}");

    let solved = domain_solver(cc, &pre);
    trace!(cc, 2, "DOMINF", "solved: {solved}");

    let mut result = Vec::with_capacity(MAX_DOMAINS);
    for dt in DOMAIN_TYPES {
        let mut intervals: SmallVec<[DomInterval; 4]> = SmallVec::new();
        for var in variables {
            let (solutions, exact) = extract_solutions_with_exact(cc, var, None, &solved);
            let mut interval = DomInterval {
                min: make_infinity(Type::I32, -1),
                max: make_infinity(Type::I32, 1),
                exact,
            };
            for solution in &solutions {
                assert!(
                    solution.intervals.len() > dt as usize,
                    "Solution intervals vector is not large enough"
                );
                interval = interval.intersect(cc, &solution.intervals[dt as usize]);
            }
            trace!(cc, 3, "DOMINF", "{dt} {var}: {interval}");
            intervals.push(interval);
        }
        result.push(Domain::new(intervals));
    }
    result
}

/// Public wrapper over a list of argument names.
pub fn domain_inference_named(cc: &CompilerContext, variables: &[&str], e: &Expr) -> Vec<Domain> {
    let names: Vec<String> = variables.iter().map(|v| (*v).to_owned()).collect();
    domain_inference(cc, &names, e)
}

/// Result of inverting a single argument expression.
pub struct BackwardsResult {
    pub intervals: SmallVec<[DomInterval; 2]>,
    /// The variable the intervals constrain; empty when the expression
    /// constrained no recognised variable.
    pub varname: String,
}

/// Direct backwards inference: which values of one caller variable keep `e`
/// inside the callee intervals?
///
/// `domains` are the caller's domains under construction; when a second
/// variable is found in the expression, that variable's entry is flagged
/// inexact in place. Contains the kernel-semantics special case: an
/// expression that is exactly one occurrence of one implicit variable
/// adopts the callee's valid interval, narrowed by computability.
pub fn backwards_interval(
    cc: &CompilerContext,
    varlist: &[String],
    domains: &mut [Domain],
    e: &Expr,
    callee: SmallVec<[DomInterval; 2]>,
) -> BackwardsResult {
    assert!(
        callee.len() == MAX_DOMAINS,
        "Incorrect number of callee intervals"
    );
    let original_callee = callee.clone();

    let simplified = simplify(cc, e);
    let mut infers = BackwardInterval {
        cc,
        varlist,
        domains,
        callee,
        varname: String::new(),
        defaulted: false,
    };
    infers.visit_expr(&simplified);

    let defaulted = infers.defaulted;
    let varname = infers.varname;
    let mut result = infers.callee;
    for interval in &mut result {
        if defaulted {
            // An unhandled node kind means the inversion is incomplete.
            interval.exact = false;
        }
        if !interval.exact {
            // Whatever was computed may be incomplete; keep only the flag.
            let t = interval.min.ty();
            interval.min = make_infinity(t, -1);
            interval.max = make_infinity(t, 1);
        }
    }

    // Kernel semantics: a kernel shares the valid domain of its single
    // input, so a lone implicit-variable argument copies the callee's valid
    // interval and narrows it by what is computable.
    let occurrences = variable_occurrences(e);
    let kernel = occurrences.len() == 1 && occurrences[0].starts_with("iv.");
    if kernel {
        let valid = original_callee[DomainType::Valid as usize]
            .intersect(cc, &result[DomainType::Computable as usize]);
        result[DomainType::Valid as usize] = valid;
    }

    BackwardsResult {
        intervals: result,
        varname,
    }
}

/// [`backwards_interval`] with the same interval for every domain type and
/// scratch caller domains; the form exercised by single-expression callers.
pub fn backwards_interval_single(
    cc: &CompilerContext,
    varlist: &[String],
    e: &Expr,
    interval: DomInterval,
) -> BackwardsResult {
    let callee: SmallVec<[DomInterval; 2]> = smallvec![interval.clone(), interval];
    let mut domains: Vec<Domain> = DOMAIN_TYPES
        .iter()
        .map(|_| Domain::infinite(varlist.len()))
        .collect();
    backwards_interval(cc, varlist, &mut domains, e, callee)
}

struct BackwardInterval<'a, 'c> {
    cc: &'c CompilerContext,
    varlist: &'a [String],
    domains: &'a mut [Domain],
    callee: SmallVec<[DomInterval; 2]>,
    varname: String,
    defaulted: bool,
}

impl BackwardInterval<'_, '_> {
    fn is_constant(&self, e: &Expr) -> bool {
        is_constant_expr(self.varlist, e)
    }

    fn set_exact_false(&mut self) {
        for interval in &mut self.callee {
            interval.exact = false;
        }
    }

    fn apply<F>(&mut self, f: F)
    where
        F: Fn(&DomInterval, &CompilerContext) -> DomInterval,
    {
        for interval in &mut self.callee {
            *interval = f(interval, self.cc);
        }
    }

    /// Border-handler treatment shared by Clamp, Min and Max.
    fn clamp_limits(
        &mut self,
        a: &Expr,
        op_min: Option<&Expr>,
        op_max: Option<&Expr>,
        partially_effective: bool,
    ) {
        self.callee = solve_clamp_limits(
            self.cc,
            &self.callee,
            a.ty(),
            op_min,
            op_max,
            partially_effective,
        );
        self.visit_expr(a);
    }
}

impl Visitor for BackwardInterval<'_, '_> {
    fn visit_expr(&mut self, e: &Expr) {
        use ExprKind as K;
        match e.kind() {
            K::Variable { name, .. } => {
                let index = self.varlist.iter().position(|v| v == name);
                let Some(index) = index else {
                    // Probably a constant expression from a parameter; it
                    // cannot pin down an interval.
                    trace!(
                        self.cc,
                        1,
                        "DOMINF",
                        "skipping unrecognised variable {name}"
                    );
                    self.set_exact_false();
                    return;
                };
                if !self.varname.is_empty() {
                    // A second variable occurrence; the inversion holds for
                    // neither variable.
                    self.set_exact_false();
                    if self.varname != *name {
                        for domain in self.domains.iter_mut() {
                            domain.intervals[index].exact = false;
                        }
                    }
                    return;
                }
                self.varname = name.clone();
            }
            K::Add(a, b) => {
                if self.is_constant(b) {
                    // e = x + k, so x = e - k.
                    let b = b.clone();
                    self.apply(|v, cc| v.inverse_add_expr(cc, &b));
                    self.visit_expr(&a.clone());
                } else if self.is_constant(a) {
                    let flipped = Expr::add(b.clone(), a.clone());
                    self.visit_expr(&flipped);
                } else {
                    // Unsimplified branches on both sides; still recurse so
                    // every variable gets its inexact mark.
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Sub(a, b) => {
                assert!(
                    !is_const(b),
                    "Simplify did not convert subtraction of a constant into addition"
                );
                if self.is_constant(a) {
                    // e = k - x, so x = k - e.
                    let a = a.clone();
                    self.apply(|v, cc| v.inverse_sub_from(cc, &a));
                    self.visit_expr(&b.clone());
                } else if self.is_constant(b) {
                    // e = x - k, so x = e + k.
                    let b = b.clone();
                    self.apply(|v, cc| v.inverse_sub_expr(cc, &b));
                    self.visit_expr(&a.clone());
                } else {
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Mul(a, b) => {
                assert!(
                    !is_const(a),
                    "Simplify did not move the constant to the right of a multiplication"
                );
                if self.is_constant(b) {
                    // e = x * k: as a range, ceil(min/k) to floor(max/k).
                    let b = b.clone();
                    self.apply(|v, cc| v.inverse_mul_expr(cc, &b));
                    self.visit_expr(&a.clone());
                } else if self.is_constant(a) {
                    let flipped = Expr::mul(b.clone(), a.clone());
                    self.visit_expr(&flipped);
                } else {
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Div(a, b) => {
                if self.is_constant(b) {
                    // e = x / k: every integer that divides back in.
                    let b = b.clone();
                    self.apply(|v, cc| v.zoom(cc, &b));
                    self.visit_expr(&a.clone());
                } else {
                    // k / x is not a linear transformation.
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Mod(a, b) => {
                if self.is_constant(b) {
                    let b = b.clone();
                    self.apply(|v, cc| v.inverse_mod(cc, &b));
                    self.visit_expr(&a.clone());
                } else {
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Clamp {
                clamp,
                value,
                min,
                max,
                ..
            } => {
                if *clamp == ClampKind::None {
                    // Disallow access outside the valid region: the valid
                    // domain becomes the computable one.
                    self.callee[DomainType::Computable as usize] =
                        self.callee[DomainType::Valid as usize].clone();
                    self.visit_expr(&value.clone());
                } else {
                    let (value, min, max) = (value.clone(), min.clone(), max.clone());
                    self.clamp_limits(
                        &value,
                        Some(&min),
                        Some(&max),
                        *clamp == ClampKind::Replicate,
                    );
                }
            }
            K::Max(a, b) => {
                // max(x, k) clamps x from below: a border handler at the
                // lower end, possibly partially effective.
                if self.is_constant(b) {
                    let (a, b) = (a.clone(), b.clone());
                    self.clamp_limits(&a, Some(&b), None, true);
                } else if self.is_constant(a) {
                    let (a, b) = (a.clone(), b.clone());
                    self.clamp_limits(&b, Some(&a), None, true);
                } else {
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            K::Min(a, b) => {
                if self.is_constant(b) {
                    let (a, b) = (a.clone(), b.clone());
                    self.clamp_limits(&a, None, Some(&b), true);
                } else if self.is_constant(a) {
                    let (a, b) = (a.clone(), b.clone());
                    self.clamp_limits(&b, None, Some(&a), true);
                } else {
                    self.set_exact_false();
                    walk_expr(self, e);
                }
            }
            _ => {
                // Constants, calls and anything else provide no invertible
                // constraint.
                self.defaulted = true;
                walk_expr(self, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{equality::equal, ops::sin};

    fn check_interval(
        varlist: &[&str],
        e: Expr,
        xmin: i32,
        xmax: i32,
        correct_exact: bool,
        correct_min: i32,
        correct_max: i32,
        correct_varname: &str,
    ) {
        let cc = CompilerContext::new();
        let names: Vec<String> = varlist.iter().map(|v| (*v).to_owned()).collect();
        let result = backwards_interval_single(
            &cc,
            &names,
            &e,
            DomInterval::new(xmin, xmax, true),
        );
        let valid = &result.intervals[DomainType::Valid as usize];
        assert_eq!(
            valid.exact, correct_exact,
            "wrong exactness for {e}: got {valid}"
        );
        if correct_exact {
            assert!(
                equal(&valid.min, &Expr::int(correct_min))
                    && equal(&valid.max, &Expr::int(correct_max)),
                "wrong interval for {e}: got {valid}, expected [{correct_min}, {correct_max}]"
            );
            assert_eq!(result.varname, correct_varname, "wrong variable for {e}");
        }
    }

    #[test]
    fn linear_inversions() {
        let vars = ["x", "y", "z", "w"];
        let x = Expr::var("x");
        check_interval(&vars, x.clone(), 0, 100, true, 0, 100, "x");
        check_interval(&vars, x.clone() + 1, 0, 100, true, -1, 99, "x");
        check_interval(&vars, 1 + x.clone(), 0, 100, true, -1, 99, "x");
        check_interval(&vars, 1 + x.clone() + 1, 0, 100, true, -2, 98, "x");
        check_interval(&vars, x.clone() - 1, 0, 100, true, 1, 101, "x");
        check_interval(&vars, 1 - x.clone(), 0, 100, true, -99, 1, "x");
    }

    #[test]
    fn scaled_inversions() {
        let vars = ["x", "y", "z", "w"];
        let x = Expr::var("x");
        check_interval(&vars, 2 * x.clone(), 10, 100, true, 5, 50, "x");
        check_interval(&vars, x.clone() * 2, 10, 100, true, 5, 50, "x");
        check_interval(&vars, x.clone() / 2, 10, 100, true, 20, 201, "x");
        check_interval(&vars, (x.clone() + 1) / 2, 10, 100, true, 19, 200, "x");
        check_interval(&vars, (x.clone() + 2) / 2, 10, 100, true, 18, 199, "x");
        // (2x + 4) / 2 simplifies to x + 2 before inversion.
        check_interval(&vars, (2 * x.clone() + 4) / 2, 10, 100, true, 8, 98, "x");
        check_interval(&vars, (2 * x.clone() + 5) / 2, 10, 100, true, 8, 98, "x");
        check_interval(&vars, (3 * x.clone() + 5) / 2, 10, 100, true, 5, 65, "x");
        check_interval(&vars, (3 * x.clone() + 5) / 2 - 2, 10, 100, true, 7, 66, "x");
    }

    #[test]
    fn inexact_cases() {
        let vars = ["x", "y", "z", "w"];
        let x = Expr::var("x");
        let y = Expr::var("y");
        // Pure constants put no constraint on any variable.
        check_interval(&vars, Expr::int(5) + 7, 0, 100, false, 0, 0, "");
        check_interval(&vars, Expr::int(105), 0, 100, false, 0, 0, "");
        // An uninvertible call gives up.
        check_interval(&vars, sin(x.clone()), 10, 100, false, 0, 0, "");
        // Two variables cannot be separated.
        check_interval(&vars, x.clone() + y.clone(), 0, 100, false, 0, 0, "");
    }

    #[test]
    fn inexact_intervals_are_widened() {
        let cc = CompilerContext::new();
        let names = vec!["x".to_owned(), "y".to_owned()];
        let x = Expr::var("x");
        let y = Expr::var("y");
        let result = backwards_interval_single(
            &cc,
            &names,
            &(x + y),
            DomInterval::new(0, 100, true),
        );
        let valid = &result.intervals[DomainType::Valid as usize];
        assert!(!valid.exact);
        assert!(ops::infinity_count(&valid.min) < 0);
        assert!(ops::infinity_count(&valid.max) > 0);
    }

    #[test]
    fn kernel_semantics_copies_valid() {
        let cc = CompilerContext::new();
        let names = vec!["iv.0".to_owned()];
        let iv = Expr::var("iv.0");
        let result = backwards_interval_single(
            &cc,
            &names,
            &iv,
            DomInterval::new(0, 19, true),
        );
        let valid = &result.intervals[DomainType::Valid as usize];
        assert_eq!((valid.imin(), valid.imax()), (0, 19));
        assert!(valid.exact);
    }

    #[test]
    fn domain_intersection_and_lock() {
        let cc = CompilerContext::new();
        let a = Domain::new([DomInterval::new(0, 10, true), DomInterval::new(5, 25, true)]);
        let b = Domain::new([DomInterval::new(3, 20, true), DomInterval::new(0, 9, true)]);
        let i = a.intersection(&cc, &b);
        assert_eq!((i.imin(0), i.imax(0)), (3, 10));
        assert_eq!((i.imin(1), i.imax(1)), (5, 9));
        assert_eq!(i.iextent(&cc, 0), 8);

        let mut d = Domain::infinite(2);
        assert!(!d.is_locked());
        d.lock();
        assert!(d.is_locked());
    }
}
