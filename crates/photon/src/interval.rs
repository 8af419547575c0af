//! Interval algebra over symbolic bounds.
//!
//! Three flavours share the `(min, max, extent, exact)` story:
//!
//! - [`Interval`]: bounds may be undefined, infinities are forbidden.
//! - [`Range`]: `min`/`extent` form, everything defined, no infinities.
//! - [`DomInterval`]: bounds always defined but may be [`Infinity`] nodes;
//!   carries an `exact` flag recording whether the bound was certified
//!   during inference.
//!
//! All arithmetic is conservative: the result of `op(A, B)` contains
//! `op(a, b)` for every `a ∈ A, b ∈ B`. The zoom/decimate/unzoom family
//! provides the integer-exact inverses of index scaling used by the
//! backwards solver.
//!
//! [`Infinity`]: crate::ir::ExprKind::Infinity

use crate::{
    ctx::CompilerContext,
    ir::Expr,
    ops::{self, ge, gt, le, lt, make_infinity, make_zero, select},
    simplify::{proved, simplify},
    ty::Type,
};

/// An inclusive interval whose bounds may be undefined.
#[derive(Debug, Clone, Default)]
pub struct Interval {
    pub min: Option<Expr>,
    pub max: Option<Expr>,
    pub exact: bool,
}

impl Interval {
    pub fn new(min: impl Into<Expr>, max: impl Into<Expr>) -> Self {
        Self::with_exact(Some(min.into()), Some(max.into()), true)
    }

    pub fn with_exact(min: Option<Expr>, max: Option<Expr>, exact: bool) -> Self {
        if let Some(m) = &min {
            assert!(ops::infinity_count(m) == 0, "Infinity not permitted in Interval");
        }
        if let Some(m) = &max {
            assert!(ops::infinity_count(m) == 0, "Infinity not permitted in Interval");
        }
        if let (Some(a), Some(b)) = (&min, &max) {
            assert!(a.ty() == b.ty(), "Interval of mismatched types");
        }
        Self { min, max, exact }
    }

    /// The interval with no known bounds. Not exact.
    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn to_range(&self, cc: &CompilerContext) -> Range {
        let min = self.min.clone().expect("Interval with undefined min has no Range form");
        let max = self.max.clone().expect("Interval with undefined max has no Range form");
        let extent = simplify(cc, &(&max + 1 - &min));
        Range {
            min,
            extent,
            exact: self.exact,
        }
    }

    /// Widen to a `DomInterval`, turning undefined bounds into infinities of
    /// type `t`.
    pub fn to_dom(&self, t: Type) -> DomInterval {
        let t = self
            .min
            .as_ref()
            .or(self.max.as_ref())
            .map_or(t, |e| e.ty());
        let min = self.min.clone().unwrap_or_else(|| make_infinity(t, -1));
        let max = self.max.clone().unwrap_or_else(|| make_infinity(t, 1));
        DomInterval::new(min, max, self.exact)
    }
}

/// A single-dimensional span: all values from `min` to `min + extent - 1`.
#[derive(Debug, Clone)]
pub struct Range {
    pub min: Expr,
    pub extent: Expr,
    pub exact: bool,
}

impl Range {
    pub fn new(min: impl Into<Expr>, extent: impl Into<Expr>) -> Self {
        let (min, extent) = (min.into(), extent.into());
        assert!(ops::infinity_count(&min) == 0, "Infinity not permitted in Range");
        assert!(ops::infinity_count(&extent) == 0, "Infinity not permitted in Range");
        assert!(min.ty() == extent.ty(), "Range min and extent must have same type");
        Self {
            min,
            extent,
            exact: true,
        }
    }

    pub fn to_interval(&self, cc: &CompilerContext) -> Interval {
        // extent = (max + 1) - min, so max = (extent + min) - 1; the two
        // compositions cancel under simplification.
        let max = simplify(cc, &(&self.extent + &self.min - 1));
        Interval::with_exact(Some(self.min.clone()), Some(max), self.exact)
    }

    pub fn to_dom(&self, cc: &CompilerContext) -> DomInterval {
        self.to_interval(cc).to_dom(self.extent.ty())
    }
}

/// An inclusive interval with defined, possibly infinite bounds, tagged with
/// exactness of the inference that produced it.
#[derive(Debug, Clone)]
pub struct DomInterval {
    pub min: Expr,
    pub max: Expr,
    pub exact: bool,
}

impl Default for DomInterval {
    fn default() -> Self {
        Self::infinite(Type::I32)
    }
}

impl DomInterval {
    pub fn new(min: impl Into<Expr>, max: impl Into<Expr>, exact: bool) -> Self {
        let (min, max) = (min.into(), max.into());
        assert!(min.ty() == max.ty(), "DomInterval of mismatched types");
        Self { min, max, exact }
    }

    /// The whole line of the given type, exactly known.
    pub fn infinite(t: Type) -> Self {
        Self::new(make_infinity(t, -1), make_infinity(t, 1), true)
    }

    /// A single point.
    pub fn point(e: impl Into<Expr>) -> Self {
        let e = e.into();
        Self::new(e.clone(), e, true)
    }

    pub fn ty(&self) -> Type {
        self.min.ty()
    }

    fn is_float(&self, b: &Expr) -> bool {
        b.ty().is_float() || self.min.ty().is_float() || self.max.ty().is_float()
    }

    pub fn imin(&self) -> i32 {
        ops::get_const_int(&self.min).expect("Expected an integer value in the DomInterval")
    }

    pub fn imax(&self) -> i32 {
        ops::get_const_int(&self.max).expect("Expected an integer value in the DomInterval")
    }

    /// Narrow to an `Interval`, dropping infinite bounds to undefined.
    pub fn to_interval(&self) -> Interval {
        let min = (ops::infinity_count(&self.min) == 0).then(|| self.min.clone());
        let max = (ops::infinity_count(&self.max) == 0).then(|| self.max.clone());
        Interval::with_exact(min, max, self.exact)
    }

    pub fn to_range(&self, cc: &CompilerContext) -> Range {
        self.to_interval().to_range(cc)
    }

    // ---- operations against a single expression ----

    pub fn add_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        Self::new(
            simplify(cc, &(&self.min + b.clone())),
            simplify(cc, &(&self.max + b.clone())),
            self.exact,
        )
    }

    pub fn sub_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        Self::new(
            simplify(cc, &(&self.min - b.clone())),
            simplify(cc, &(&self.max - b.clone())),
            self.exact,
        )
    }

    pub fn neg(&self, cc: &CompilerContext) -> Self {
        Self::new(
            simplify(cc, &(-&self.max)),
            simplify(cc, &(-&self.min)),
            self.exact,
        )
    }

    /// Multiply both bounds; a negative multiplier flips the interval.
    pub fn mul_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        let zero = make_zero(b.ty());
        let lo = select(ge(b.clone(), zero.clone()), &self.min * b.clone(), &self.max * b.clone());
        let hi = select(ge(b.clone(), zero), &self.max * b.clone(), &self.min * b.clone());
        Self::new(simplify(cc, &lo), simplify(cc, &hi), self.exact)
    }

    /// Divide both bounds (floor division); a negative divisor flips.
    pub fn div_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        let zero = make_zero(b.ty());
        let lo = select(ge(b.clone(), zero.clone()), &self.min / b.clone(), &self.max / b.clone());
        let hi = select(ge(b.clone(), zero), &self.max / b.clone(), &self.min / b.clone());
        Self::new(simplify(cc, &lo), simplify(cc, &hi), self.exact)
    }

    /// The largest interval that floor-divides by `b` back onto `self`: each
    /// integer of the original becomes `|b|` integers.
    ///
    /// `zoom([3,5], 2) = [6,11]`; `zoom([3,5], -2) = [-11,-6]`.
    pub fn zoom(&self, cc: &CompilerContext, b: &Expr) -> Self {
        if self.is_float(b) {
            // Scaling a real interval has no replication semantics.
            return self.mul_expr(cc, b);
        }
        let zero = make_zero(b.ty());
        let lo = select(
            ge(b.clone(), zero.clone()),
            &self.min * b.clone(),
            &self.max * b.clone() + (b.clone() + 1),
        );
        let hi = select(
            ge(b.clone(), zero),
            &self.max * b.clone() + (b.clone() - 1),
            &self.min * b.clone(),
        );
        Self::new(simplify(cc, &lo), simplify(cc, &hi), self.exact)
    }

    /// The largest interval that multiplies by `b` without leaving `self`:
    /// the surviving indices when every `|b|`'th element is kept.
    ///
    /// `decimate([4,11], 3) = [2,3]` because `[2,3] * 3 = [6,9] ⊆ [4,11]`.
    pub fn decimate(&self, cc: &CompilerContext, b: &Expr) -> Self {
        if self.is_float(b) {
            return self.div_expr(cc, b);
        }
        let zero = make_zero(b.ty());
        let lo = select(
            ge(b.clone(), zero.clone()),
            pos_ceil(&self.min, b),
            neg_ceil(&self.max, b),
        );
        let hi = select(
            ge(b.clone(), zero),
            &self.max / b.clone(),
            &self.min / b.clone(),
        );
        Self::new(simplify(cc, &lo), simplify(cc, &hi), self.exact)
    }

    /// The largest interval whose [`zoom`](Self::zoom) by `b` stays inside
    /// `self`. Since zoom expands as far as it can, unzoom must shrink where
    /// zoom would overshoot.
    ///
    /// `unzoom([4,11], 3) = [2,3]`; `unzoom([4,10], 3) = [2,2]`.
    pub fn unzoom(&self, cc: &CompilerContext, b: &Expr) -> Self {
        if self.is_float(b) {
            return self.div_expr(cc, b);
        }
        let zero = make_zero(b.ty());
        let lo = select(
            ge(b.clone(), zero.clone()),
            pos_ceil(&self.min, b),
            neg_ceil(&self.max, b),
        );
        let hi = select(
            ge(b.clone(), zero),
            (&self.max + 1) / b.clone() - 1,
            (&self.min - 1) / b.clone() - 1,
        );
        Self::new(simplify(cc, &lo), simplify(cc, &hi), self.exact)
    }

    /// Interval such that adding `b` yields `self`.
    pub fn inverse_add_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        self.sub_expr(cc, b)
    }

    /// Interval such that subtracting `b` yields `self`.
    pub fn inverse_sub_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        self.add_expr(cc, b)
    }

    /// Interval `r` such that `a - r` yields `self`.
    pub fn inverse_sub_from(&self, cc: &CompilerContext, a: &Expr) -> Self {
        Self::new(
            simplify(cc, &(a.clone() - &self.max)),
            simplify(cc, &(a.clone() - &self.min)),
            self.exact,
        )
    }

    /// Interval such that multiplying by `b` stays inside `self`.
    pub fn inverse_mul_expr(&self, cc: &CompilerContext, b: &Expr) -> Self {
        self.decimate(cc, b)
    }

    /// The largest interval whose modulus by `b` lands in `self`.
    ///
    /// When `self` covers the whole residue range `[0, b-1]` the modulus puts
    /// no constraint at all on its operand. Otherwise the full solution set
    /// is a union of slices; the canonical slice `self ∩ [0, b-1]` is kept
    /// and the result is flagged inexact.
    pub fn inverse_mod(&self, cc: &CompilerContext, b: &Expr) -> Self {
        let t = self.ty();
        let zero = make_zero(t);
        let top = if t.is_float() {
            b.clone()
        } else {
            simplify(cc, &(b.clone() - 1))
        };
        if proved(cc, &le(self.min.clone(), zero.clone()))
            && proved(cc, &ge(self.max.clone(), top.clone()))
        {
            return Self::new(make_infinity(t, -1), make_infinity(t, 1), self.exact);
        }
        let slice = Self::new(zero, top, self.exact);
        let mut r = self.intersect(cc, &slice);
        r.exact = false;
        r
    }

    // ---- operations on pairs of intervals ----

    pub fn add(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &(&self.min + v.min.clone())),
            simplify(cc, &(&self.max + v.max.clone())),
            self.exact && v.exact,
        )
    }

    pub fn sub(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &(&self.min - v.max.clone())),
            simplify(cc, &(&self.max - v.min.clone())),
            self.exact && v.exact,
        )
    }

    pub fn mul(&self, cc: &CompilerContext, v: &Self) -> Self {
        let exact = self.exact && v.exact;
        // A unique-constant operand avoids the four-product form entirely.
        if ops::is_const(&self.min) && crate::equality::equal(&self.min, &self.max) {
            let mut r = v.mul_const_sorted(cc, &self.min);
            r.exact = exact;
            return r;
        }
        if ops::is_const(&v.min) && crate::equality::equal(&v.min, &v.max) {
            let mut r = self.mul_const_sorted(cc, &v.min);
            r.exact = exact;
            return r;
        }
        let a = &self.min * v.min.clone();
        let b = &self.min * v.max.clone();
        let c = &self.max * v.min.clone();
        let d = &self.max * v.max.clone();
        let rmin = ops::min(ops::min(a.clone(), b.clone()), ops::min(c.clone(), d.clone()));
        let rmax = ops::max(ops::max(a, b), ops::max(c, d));
        Self::new(simplify(cc, &rmin), simplify(cc, &rmax), exact)
    }

    fn mul_const_sorted(&self, cc: &CompilerContext, k: &Expr) -> Self {
        let (lo, hi) = if ops::is_negative_const(k) {
            (&self.max, &self.min)
        } else {
            (&self.min, &self.max)
        };
        Self::new(
            simplify(cc, &(lo.clone() * k.clone())),
            simplify(cc, &(hi.clone() * k.clone())),
            self.exact,
        )
    }

    pub fn div(&self, cc: &CompilerContext, v: &Self) -> Self {
        let exact = self.exact && v.exact;
        if ops::is_const(&v.min) && crate::equality::equal(&v.min, &v.max) {
            let (lo, hi) = if ops::is_negative_const(&v.min) {
                (&self.max, &self.min)
            } else {
                (&self.min, &self.max)
            };
            return Self::new(
                simplify(cc, &(lo.clone() / v.min.clone())),
                simplify(cc, &(hi.clone() / v.min.clone())),
                exact,
            );
        }
        // Unless the divisor provably avoids zero, the quotient is unbounded.
        let min_positive = proved(cc, &gt(v.min.clone(), make_zero(v.min.ty())));
        let max_negative = proved(cc, &lt(v.max.clone(), make_zero(v.max.ty())));
        if !min_positive && !max_negative {
            let t = self.ty();
            return Self::new(make_infinity(t, -1), make_infinity(t, 1), false);
        }
        let a = &self.min / v.min.clone();
        let b = &self.min / v.max.clone();
        let c = &self.max / v.min.clone();
        let d = &self.max / v.max.clone();
        let rmin = ops::min(ops::min(a.clone(), b.clone()), ops::min(c.clone(), d.clone()));
        let rmax = ops::max(ops::max(a, b), ops::max(c, d));
        Self::new(simplify(cc, &rmin), simplify(cc, &rmax), exact)
    }

    pub fn rem(&self, cc: &CompilerContext, v: &Self) -> Self {
        let exact = self.exact && v.exact;
        let zero = make_zero(self.ty());
        // A dividend already inside the residue range passes through.
        if proved(cc, &ge(self.min.clone(), zero.clone()))
            && proved(cc, &lt(self.max.clone(), v.min.clone()))
        {
            return Self::new(self.min.clone(), self.max.clone(), exact);
        }
        if proved(cc, &le(self.max.clone(), zero.clone()))
            && proved(cc, &gt(self.min.clone(), v.max.clone()))
        {
            return Self::new(self.min.clone(), self.max.clone(), exact);
        }
        let rmax = if v.max.ty().is_float() {
            v.max.clone()
        } else {
            v.max.clone() - 1
        };
        Self::new(zero, simplify(cc, &rmax), exact)
    }

    pub fn min_with(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &ops::min(self.min.clone(), v.min.clone())),
            simplify(cc, &ops::min(self.max.clone(), v.max.clone())),
            self.exact && v.exact,
        )
    }

    pub fn max_with(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &ops::max(self.min.clone(), v.min.clone())),
            simplify(cc, &ops::max(self.max.clone(), v.max.clone())),
            self.exact && v.exact,
        )
    }

    pub fn intersect(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &ops::max(self.min.clone(), v.min.clone())),
            simplify(cc, &ops::min(self.max.clone(), v.max.clone())),
            self.exact && v.exact,
        )
    }

    pub fn union(&self, cc: &CompilerContext, v: &Self) -> Self {
        Self::new(
            simplify(cc, &ops::min(self.min.clone(), v.min.clone())),
            simplify(cc, &ops::max(self.max.clone(), v.max.clone())),
            self.exact && v.exact,
        )
    }

    /// Interval `r` with `r + k ⊆ self` for every choice in `k`.
    pub fn inverse_add(&self, cc: &CompilerContext, k: &Self) -> Self {
        Self::new(
            simplify(cc, &(&self.min - k.min.clone())),
            simplify(cc, &(&self.max - k.max.clone())),
            self.exact && k.exact,
        )
    }

    /// Interval `r` with `r - k ⊆ self` for every choice in `k`. The
    /// subtrahend's endpoints cross over: `r.min - k.max` must stay above
    /// `self.min`.
    pub fn inverse_sub(&self, cc: &CompilerContext, k: &Self) -> Self {
        Self::new(
            simplify(cc, &(&self.min + k.max.clone())),
            simplify(cc, &(&self.max + k.min.clone())),
            self.exact && k.exact,
        )
    }

    /// Inverse of `min(·, k)`: once the upper bound reaches the clamp value
    /// the operand is unconstrained above.
    pub fn inverse_min(&self, cc: &CompilerContext, k: &Self) -> Self {
        let t = self.max.ty();
        let hi = select(
            ge(self.max.clone(), k.max.clone()),
            make_infinity(t, 1),
            self.max.clone(),
        );
        Self::new(self.min.clone(), simplify(cc, &hi), self.exact && k.exact)
    }

    /// Inverse of `max(·, k)`: once the lower bound reaches the clamp value
    /// the operand is unconstrained below.
    pub fn inverse_max(&self, cc: &CompilerContext, k: &Self) -> Self {
        let t = self.min.ty();
        let lo = select(
            le(self.min.clone(), k.min.clone()),
            make_infinity(t, -1),
            self.min.clone(),
        );
        Self::new(simplify(cc, &lo), self.max.clone(), self.exact && k.exact)
    }
}

/// Ceiling division of `a` by positive `b`: `pos_ceil(10, 3) = 4`.
fn pos_ceil(a: &Expr, b: &Expr) -> Expr {
    (a - 1) / b.clone() + 1
}

/// Ceiling division of `a` by negative `b`: `neg_ceil(10, -3) = -3`.
fn neg_ceil(a: &Expr, b: &Expr) -> Expr {
    (a + 1) / b.clone() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::equal;

    fn di(min: i32, max: i32) -> DomInterval {
        DomInterval::new(min, max, true)
    }

    fn check_eq(label: &str, got: &DomInterval, want: &DomInterval) {
        assert!(
            equal(&got.min, &want.min) && equal(&got.max, &want.max),
            "{label}: got [{}, {}], want [{}, {}]",
            got.min,
            got.max,
            want.min,
            want.max
        );
    }

    #[test]
    fn zoom_examples() {
        let cc = CompilerContext::new();
        check_eq("zoom up", &di(3, 5).zoom(&cc, &Expr::int(2)), &di(6, 11));
        check_eq("zoom down", &di(3, 5).zoom(&cc, &Expr::int(-2)), &di(-11, -6));
    }

    #[test]
    fn decimate_examples() {
        let cc = CompilerContext::new();
        check_eq("decimate", &di(4, 11).decimate(&cc, &Expr::int(3)), &di(2, 3));
        check_eq(
            "decimate negative",
            &di(4, 11).decimate(&cc, &Expr::int(-3)),
            &di(-3, -2),
        );
    }

    #[test]
    fn unzoom_examples() {
        let cc = CompilerContext::new();
        check_eq("unzoom", &di(4, 11).unzoom(&cc, &Expr::int(3)), &di(2, 3));
        check_eq("unzoom shrinks", &di(4, 10).unzoom(&cc, &Expr::int(3)), &di(2, 2));
    }

    // Round-trip laws over all divisors of magnitude 1..=8 and a spread of
    // intervals around multiples of 8.
    fn zoom_fixture() -> Vec<DomInterval> {
        vec![
            di(5, 1282),
            di(6, 1281),
            di(7, 1280),
            di(8, 1279),
            di(9, 1278),
            di(10, 1277),
            di(11, 1276),
        ]
    }

    #[test]
    fn zoom_of_unzoom_is_contained() {
        let cc = CompilerContext::new();
        for a in zoom_fixture() {
            for div in [-8, -5, -3, -2, -1, 1, 2, 3, 5, 8] {
                let b = Expr::int(div);
                let r = a.unzoom(&cc, &b).zoom(&cc, &b);
                let absdiv = div.abs();
                assert!(
                    r.imin() >= a.imin()
                        && r.imax() <= a.imax()
                        && r.imin() < a.imin() + absdiv
                        && r.imax() > a.imax() - absdiv,
                    "zoom(unzoom([{}, {}], {div}), {div}) = [{}, {}]",
                    a.imin(),
                    a.imax(),
                    r.imin(),
                    r.imax()
                );
            }
        }
    }

    #[test]
    fn decimate_times_divisor_is_contained() {
        let cc = CompilerContext::new();
        for a in zoom_fixture() {
            for div in [-8, -4, -2, -1, 1, 2, 4, 8] {
                let b = Expr::int(div);
                let r = a.decimate(&cc, &b).mul_expr(&cc, &b);
                let absdiv = div.abs();
                assert!(
                    r.imin() >= a.imin()
                        && r.imax() <= a.imax()
                        && r.imin() < a.imin() + absdiv
                        && r.imax() > a.imax() - absdiv,
                    "decimate([{}, {}], {div}) * {div} = [{}, {}]",
                    a.imin(),
                    a.imax(),
                    r.imin(),
                    r.imax()
                );
            }
        }
    }

    #[test]
    fn zoom_then_divide_restores() {
        let cc = CompilerContext::new();
        for a in zoom_fixture() {
            for div in [-8, -3, -1, 1, 3, 8] {
                let b = Expr::int(div);
                let z = a.zoom(&cc, &b);
                let r = z.div_expr(&cc, &b);
                // Zoom replicates each index |div| times...
                let lz = z.imax() - z.imin() + 1;
                let la = a.imax() - a.imin() + 1;
                assert_eq!(lz, la * div.abs(), "zoom([{}, {}], {div})", a.imin(), a.imax());
                // ...and dividing brings the original interval back.
                check_eq("zoomdiv", &r, &a);
            }
        }
    }

    #[test]
    fn inverse_add_and_sub() {
        let cc = CompilerContext::new();
        let a = di(5, 1282);
        let b = di(6, 1281);
        let z = a.add(&cc, &b);
        check_eq("inverse add", &z.inverse_add(&cc, &b), &a);
        let z = a.sub(&cc, &b);
        check_eq("inverse sub", &z.inverse_sub(&cc, &b), &a);
    }

    #[test]
    fn division_by_zero_spanning_interval_is_unbounded() {
        let cc = CompilerContext::new();
        let r = di(1, 10).div(&cc, &di(-2, 2));
        assert!(!r.exact);
        assert!(ops::infinity_count(&r.min) < 0);
        assert!(ops::infinity_count(&r.max) > 0);
    }

    #[test]
    fn modulus_passthrough_and_default() {
        let cc = CompilerContext::new();
        // In range of the (positive) modulus: passes through.
        check_eq("mod pass", &di(1, 3).rem(&cc, &di(5, 7)), &di(1, 3));
        // Otherwise the result covers the residue range.
        check_eq("mod slice", &di(-4, 9).rem(&cc, &di(5, 5)), &di(0, 4));
    }

    #[test]
    fn conversions_round_trip() {
        let cc = CompilerContext::new();
        let j = Expr::var("j");
        let k = Expr::var("k");

        let i = Interval::new(j.clone(), k.clone());
        let r = i.to_range(&cc);
        let back = r.to_interval(&cc);
        assert!(equal(back.min.as_ref().unwrap(), &j));
        assert!(equal(back.max.as_ref().unwrap(), &k));

        let d = Range::new(3, 5).to_dom(&cc);
        check_eq("range to dom", &d, &di(3, 7));

        let d = Interval::new(3, 6).to_dom(Type::I32);
        check_eq("interval to dom", &d, &di(3, 6));
        assert!(d.exact);

        let undef = Interval::undefined().to_dom(Type::I32);
        assert!(ops::infinity_count(&undef.min) < 0);
        assert!(ops::infinity_count(&undef.max) > 0);
        assert!(!undef.exact);

        let i = di(5, 8).to_interval();
        assert!(equal(i.min.as_ref().unwrap(), &Expr::int(5)));
        assert!(equal(i.max.as_ref().unwrap(), &Expr::int(8)));

        let i = DomInterval::infinite(Type::I32).to_interval();
        assert!(i.min.is_none() && i.max.is_none());
    }
}
