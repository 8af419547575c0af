//! The algebraic simplifier.
//!
//! A [`Mutator`] that constant-folds and rewrites expressions bottom-up:
//! children are simplified first, then commutative operands are normalised
//! (constants to the right), then the per-kind rule list is tried in order.
//! Structural sharing makes a no-op simplification return the original
//! handle, so callers can detect fixed points with `same_as`.
//!
//! Constant folding happens in 32-bit two's complement. Narrower types fold
//! through [`int_cast_constant`]; unsigned types fold with unsigned
//! semantics. Integer division and modulus round toward negative infinity.
//!
//! Infinity operands short-circuit each binary operator through a table over
//! the operand classes {finite, +inf, -inf}; meaningless combinations (such
//! as `inf + -inf`) abort.
//!
//! The simplifier is written as free functions generic over [`SimplifyCore`]
//! so the backwards solver can override individual visits while inheriting
//! everything else.

use crate::{
    ctx::CompilerContext,
    diag::trace,
    equality::equal,
    ir::{Expr, ExprKind, Stmt, StmtKind},
    modulus::{modulus_remainder, ModulusRemainder},
    ops::{
        self, const_false_of, const_true_of, div_imp, div_imp_f32, ge, infinity_count,
        int_cast_constant, is_const, is_negative_const, is_one, is_positive_const, is_zero, lt,
        make_const, make_one, make_zero, mod_imp, mod_imp_f32,
    },
    scope::Scope,
    ty::Type,
    visit::{mutate_children_expr, mutate_children_stmt, Mutator},
};

/// Simplify an expression.
pub fn simplify(cc: &CompilerContext, e: &Expr) -> Expr {
    Simplify::new(cc).mutate_expr(e)
}

/// Simplify a statement.
pub fn simplify_stmt(cc: &CompilerContext, s: &Stmt) -> Stmt {
    Simplify::new(cc).mutate_stmt(s)
}

/// Simplify, passing an undefined expression through.
pub fn simplify_undef(cc: &CompilerContext, e: Option<Expr>) -> Option<Expr> {
    e.map(|e| simplify(cc, &e))
}

/// Simplify, passing an undefined statement through.
pub fn simplify_undef_stmt(cc: &CompilerContext, s: Option<Stmt>) -> Option<Stmt> {
    s.map(|s| simplify_stmt(cc, &s))
}

/// Is the proposition provably true? Simplifies and tests for literal truth.
pub fn proved(cc: &CompilerContext, e: &Expr) -> bool {
    proved_with_disproof(cc, e).0
}

/// `(proved, disproved)`: the proposition simplified to literal true /
/// literal false. Both false means unknown.
pub fn proved_with_disproof(cc: &CompilerContext, e: &Expr) -> (bool, bool) {
    let b = Simplify::new(cc).mutate_expr(e);
    let result = (is_one(&b), is_zero(&b));
    trace!(cc, 2, "SIMPLIFY", "prove {e} ==> {b} ==> {result:?}");
    result
}

/// State shared by the simplifier and the analyses layered on top of it.
pub(crate) trait SimplifyCore: Mutator {
    fn cc(&self) -> &CompilerContext;
    fn scope_mut(&mut self) -> &mut Scope<Option<Expr>>;
    fn alignment_mut(&mut self) -> &mut Scope<ModulusRemainder>;
}

pub struct Simplify<'c> {
    cc: &'c CompilerContext,
    scope: Scope<Option<Expr>>,
    alignment: Scope<ModulusRemainder>,
}

impl<'c> Simplify<'c> {
    pub fn new(cc: &'c CompilerContext) -> Self {
        Self {
            cc,
            scope: Scope::new(),
            alignment: Scope::new(),
        }
    }
}

impl Mutator for Simplify<'_> {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        dispatch_expr(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        dispatch_stmt(self, s)
    }
}

impl SimplifyCore for Simplify<'_> {
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

pub(crate) fn dispatch_expr<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    use ExprKind as K;
    match e.kind() {
        K::Cast(_) => visit_cast(m, e),
        K::Variable { .. } => visit_variable(m, e),
        K::Add(..) => visit_add(m, e),
        K::Sub(..) => visit_sub(m, e),
        K::Mul(..) => visit_mul(m, e),
        K::Div(..) => visit_div(m, e),
        K::Mod(..) => visit_mod(m, e),
        K::Min(..) => visit_min(m, e),
        K::Max(..) => visit_max(m, e),
        K::Eq(..) => visit_eq(m, e),
        K::Ne(a, b) => m.mutate_expr(&Expr::not(Expr::eq(a.clone(), b.clone()))),
        K::Lt(..) => visit_lt(m, e),
        K::Le(a, b) => m.mutate_expr(&Expr::not(Expr::lt(b.clone(), a.clone()))),
        K::Gt(a, b) => m.mutate_expr(&Expr::lt(b.clone(), a.clone())),
        K::Ge(a, b) => m.mutate_expr(&Expr::not(Expr::lt(a.clone(), b.clone()))),
        K::And(..) => visit_and(m, e),
        K::Or(..) => visit_or(m, e),
        K::Not(_) => visit_not(m, e),
        K::Select { .. } => visit_select(m, e),
        K::Let { .. } => visit_let(m, e),
        _ => mutate_children_expr(m, e),
    }
}

pub(crate) fn dispatch_stmt<M: SimplifyCore>(m: &mut M, s: &Stmt) -> Stmt {
    match s.kind() {
        StmtKind::LetStmt { .. } => visit_let_stmt(m, s),
        StmtKind::For { .. } => visit_for(m, s),
        _ => mutate_children_stmt(m, s),
    }
}

/// A constant that is not hidden behind a cast; these are the constants the
/// operand-normalisation and grouping rules move around freely.
pub(crate) fn is_simple_const(e: &Expr) -> bool {
    is_const(e) && e.as_cast().is_none()
}

fn const_int(e: &Expr) -> Option<i32> {
    e.as_int_imm()
}

fn const_float(e: &Expr) -> Option<f32> {
    e.as_float_imm()
}

/// Recognise an integer or cast-integer constant of at most 32 bits and
/// fetch its canonical value.
fn const_castint(e: &Expr) -> Option<i32> {
    if let Some(v) = e.as_int_imm() {
        return Some(v);
    }
    if let ExprKind::Cast(inner) = e.kind() {
        let t = e.ty();
        if (t.is_int() || t.is_uint()) && t.bits <= 32 {
            if let Some(v) = inner.as_int_imm() {
                return Some(int_cast_constant(t, v));
            }
        }
    }
    None
}

// Operand classes for the infinity tables: N = -inf, F = finite, P = +inf,
// named left-class-then-right-class.
const NN: u32 = 1;
const NF: u32 = 2;
const NP: u32 = 4;
const FN: u32 = 8;
#[expect(dead_code, reason = "completes the operand-class table")]
const FF: u32 = 16;
const FP: u32 = 32;
const PN: u32 = 64;
const PF: u32 = 128;
const PP: u32 = 256;

fn infinity_code(a: &Expr, b: &Expr) -> u32 {
    let count_a = infinity_count(a);
    let count_b = infinity_count(b);
    let mut bit = 0;
    if count_a > 0 {
        bit += 6;
    } else if count_a == 0 {
        bit += 3;
    }
    if count_b > 0 {
        bit += 2;
    } else if count_b == 0 {
        bit += 1;
    }
    1 << bit
}

/// Is a constant representable as the given type; fold an int through it.
fn do_indirect_int_cast(t: Type, x: i32) -> i32 {
    if t == Type::BOOL {
        i32::from(x != 0)
    } else if t.is_int() || t.is_uint() {
        int_cast_constant(t, x)
    } else if t.is_float() {
        x
    } else {
        panic!("Can't do an indirect int cast via this type")
    }
}

fn visit_cast<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let op_value = e.as_cast().unwrap().clone();
    let value = m.mutate_expr(&op_value);
    let t = e.ty();

    if value.ty() == t {
        return value;
    }
    if t == Type::I32 {
        if let Some(f) = const_float(&value) {
            return Expr::int(f as i32);
        }
    }
    if t == Type::F32 {
        if let Some(i) = const_int(&value) {
            return Expr::float(i as f32);
        }
    }
    if t == Type::I32 {
        // Cast to something then back to int.
        if let ExprKind::Cast(inner) = value.kind() {
            if let Some(i) = const_int(inner) {
                return Expr::int(do_indirect_int_cast(value.ty(), i));
            }
        }
    }
    if !t.is_float() && t.bits <= 32 {
        if let Some(i) = const_int(&value) {
            if do_indirect_int_cast(t, i) != i {
                // Use the canonical value under the cast so later peephole
                // matching that looks through casts is not confused.
                return Expr::cast(t, Expr::int(do_indirect_int_cast(t, i)));
            }
        }
    }
    if value.same_as(&op_value) {
        e.clone()
    } else {
        Expr::cast(t, value)
    }
}

fn visit_variable<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let name = e.as_variable().unwrap().to_owned();
    let Some(replacement) = m.scope_mut().get(&name).cloned() else {
        // Never bound by a visited let: a free symbol, leave it alone.
        return e.clone();
    };
    match replacement {
        Some(r) => {
            assert!(r.ty() == e.ty(), "Let binding changes the type of {name}");
            if let Some(vname) = r.as_variable() {
                if m.scope_mut().contains(vname) {
                    if m.scope_mut().depth(vname) < m.scope_mut().depth(&name) {
                        r
                    } else {
                        // The variable it refers to has been shadowed by a
                        // more recent binding of the same name; hands off.
                        e.clone()
                    }
                } else {
                    r
                }
            } else {
                r
            }
        }
        // Bound but not substitutable.
        None => e.clone(),
    }
}

fn visit_add<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_add().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let mut a = m.mutate_expr(&op_a);
    let mut b = m.mutate_expr(&op_b);
    trace!(m.cc(), 3, "SIMPLIFY", "add {a} + {b}");

    // Rearrange const + varying to varying + const to cut down on cases.
    if is_simple_const(&a) && !is_simple_const(&b) {
        std::mem::swap(&mut a, &mut b);
    }

    let inf = infinity_code(&a, &b);
    if inf & (PP | PF | NN | NF) != 0 {
        return a; // Left infinity dominates.
    }
    if inf & (FN | FP) != 0 {
        return b; // Right infinity dominates.
    }
    if inf & (PN | NP) != 0 {
        panic!("Conflicting infinity in addition");
    }

    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        return Expr::int(ia.wrapping_add(ib));
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(fa + fb);
    }
    if is_zero(&b) {
        return a;
    }
    if is_zero(&a) {
        return b;
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if e.ty().is_uint() {
            make_const(e.ty(), (ia as u32).wrapping_add(ib as u32) as i32)
        } else {
            make_const(e.ty(), ia.wrapping_add(ib))
        };
    }
    if let (Some((ba, sa, w)), Some((bb, sb, _))) = (a.as_ramp(), b.as_ramp()) {
        return m.mutate_expr(&Expr::ramp(ba + bb.clone(), sa + sb.clone(), w));
    }
    if let (Some((ba, sa, w)), Some((vb, _))) = (a.as_ramp(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::ramp(ba + vb.clone(), sa.clone(), w));
    }
    if let (Some((va, _)), Some((bb, sb, w))) = (a.as_broadcast(), b.as_ramp()) {
        return m.mutate_expr(&Expr::ramp(va + bb.clone(), sb.clone(), w));
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        let inner = m.mutate_expr(&(va + vb.clone()));
        return Expr::broadcast(inner, w);
    }
    if equal(&a, &b) {
        // Adding an expression to itself is a doubling.
        return m.mutate_expr(&(a.clone() * 2));
    }
    if let Some((aa, ab)) = a.as_add() {
        if is_simple_const(ab) {
            // In ternary expressions, pull constants outside.
            return if is_simple_const(&b) {
                m.mutate_expr(&(aa.clone() + (ab.clone() + b)))
            } else {
                m.mutate_expr(&((aa.clone() + b) + ab.clone()))
            };
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if is_simple_const(bb) {
            return m.mutate_expr(&((a + ba.clone()) + bb.clone()));
        }
    }
    if let Some((sa, sb)) = a.as_sub() {
        if is_simple_const(sa) {
            // (k - x) + y --> (k + y) - x
            return m.mutate_expr(&((sa.clone() + b) - sb.clone()));
        }
    }
    if let Some((sa, sb)) = a.as_sub() {
        if equal(&b, sb) {
            // Additions that cancel an inner term.
            return sa.clone();
        }
    }
    if let Some((ba, bb)) = b.as_sub() {
        if equal(&a, bb) {
            return ba.clone();
        }
    }
    if let (Some((maa, mab)), Some((mba, mbb))) = (a.as_mul(), b.as_mul()) {
        // Pull out common factors: a*x + b*x --> (a + b)*x.
        if equal(maa, mba) {
            return m.mutate_expr(&(maa.clone() * (mab.clone() + mbb.clone())));
        }
        if equal(mab, mba) {
            return m.mutate_expr(&(mab.clone() * (maa.clone() + mbb.clone())));
        }
        if equal(mab, mbb) {
            return m.mutate_expr(&(mab.clone() * (maa.clone() + mba.clone())));
        }
        if equal(maa, mbb) {
            return m.mutate_expr(&(maa.clone() * (mab.clone() + mba.clone())));
        }
    }
    if let Some((maa, mab)) = a.as_mul() {
        if equal(maa, &b) && !is_const(&b) {
            return m.mutate_expr(&(b.clone() * (mab.clone() + 1)));
        }
        if equal(mab, &b) && !is_const(&b) {
            return m.mutate_expr(&(b.clone() * (maa.clone() + 1)));
        }
    }
    if let Some((mba, mbb)) = b.as_mul() {
        if equal(mba, &a) && !is_const(&a) {
            return m.mutate_expr(&(a.clone() * (mbb.clone() + 1)));
        }
        if equal(mbb, &a) && !is_const(&a) {
            return m.mutate_expr(&(a.clone() * (mba.clone() + 1)));
        }
    }
    if (b.as_max().is_some() || b.as_min().is_some())
        && !(a.as_max().is_some() || a.as_min().is_some())
    {
        // Push min/max to the LHS of the add to reduce cases elsewhere.
        return m.mutate_expr(&(b + a));
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::add(a, b)
    }
}

fn visit_sub<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_sub().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);

    let inf = infinity_code(&a, &b);
    if inf & (PN | PF | NP | NF) != 0 {
        return a; // Left infinity dominates.
    }
    if inf & (FN | FP) != 0 {
        // Right infinity dominates, negated.
        return Expr::infinity(b.ty(), -infinity_count(&b));
    }
    if inf & (PP | NN) != 0 {
        panic!("Conflicting infinity in subtraction");
    }

    if is_zero(&b) {
        return a;
    }
    if equal(&a, &b) {
        return make_zero(e.ty());
    }
    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        return Expr::int(ia.wrapping_sub(ib));
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(fa - fb);
    }
    if let Some(ib) = const_int(&b) {
        return m.mutate_expr(&(a + ib.wrapping_neg()));
    }
    if let Some(fb) = const_float(&b) {
        return m.mutate_expr(&(a + (-fb)));
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if e.ty().is_uint() {
            make_const(e.ty(), (ia as u32).wrapping_sub(ib as u32) as i32)
        } else {
            make_const(e.ty(), ia.wrapping_sub(ib))
        };
    }
    if let (Some((ba, sa, w)), Some((bb, sb, _))) = (a.as_ramp(), b.as_ramp()) {
        return m.mutate_expr(&Expr::ramp(ba - bb.clone(), sa - sb.clone(), w));
    }
    if let (Some((ba, sa, w)), Some((vb, _))) = (a.as_ramp(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::ramp(ba - vb.clone(), sa.clone(), w));
    }
    if let (Some((va, _)), Some((bb, sb, w))) = (a.as_broadcast(), b.as_ramp()) {
        let neg_stride = make_zero(sb.ty()) - sb.clone();
        return m.mutate_expr(&Expr::ramp(va - bb.clone(), neg_stride, w));
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        let inner = m.mutate_expr(&(va - vb.clone()));
        return Expr::broadcast(inner, w);
    }
    if let Some((aa, ab)) = a.as_add() {
        // Ternary expressions where a term cancels.
        if equal(ab, &b) {
            return aa.clone();
        }
        if equal(aa, &b) {
            return ab.clone();
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if equal(bb, &a) {
            return m.mutate_expr(&(make_zero(ba.ty()) - ba.clone()));
        }
        if equal(ba, &a) {
            return m.mutate_expr(&(make_zero(bb.ty()) - bb.clone()));
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        if is_simple_const(ab) {
            return if is_simple_const(&b) {
                m.mutate_expr(&(aa.clone() + (ab.clone() - b)))
            } else {
                m.mutate_expr(&((aa.clone() - b) + ab.clone()))
            };
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if is_simple_const(bb) {
            // ka - (x + kb) --> (ka - kb) - x; a - (x + kb) --> (a - x) - kb
            return if is_simple_const(&a) {
                m.mutate_expr(&((a - bb.clone()) - ba.clone()))
            } else {
                m.mutate_expr(&((a - ba.clone()) - bb.clone()))
            };
        }
    }
    if let Some((sa, sb)) = a.as_sub() {
        if is_simple_const(sa) && is_simple_const(&b) {
            return m.mutate_expr(&((sa.clone() - b) - sb.clone()));
        }
    }
    if let Some((ba, bb)) = b.as_sub() {
        if is_simple_const(bb) {
            // ka - (x - kb) --> (ka + kb) - x; a - (x - kb) --> (a - x) + kb
            return if is_simple_const(&a) {
                m.mutate_expr(&((a + bb.clone()) - ba.clone()))
            } else {
                m.mutate_expr(&((a - ba.clone()) + bb.clone()))
            };
        }
        if is_simple_const(ba) {
            // ka - (kb - x) --> x + (ka - kb); a - (kb - x) --> (a + x) - kb
            return if is_simple_const(&a) {
                m.mutate_expr(&(bb.clone() + (a - ba.clone())))
            } else {
                m.mutate_expr(&((a + bb.clone()) - ba.clone()))
            };
        }
    }
    if let (Some((maa, mab)), Some((mba, mbb))) = (a.as_mul(), b.as_mul()) {
        if equal(maa, mba) {
            return m.mutate_expr(&(maa.clone() * (mab.clone() - mbb.clone())));
        }
        if equal(mab, mba) {
            return m.mutate_expr(&(mab.clone() * (maa.clone() - mbb.clone())));
        }
        if equal(mab, mbb) {
            return m.mutate_expr(&(mab.clone() * (maa.clone() - mba.clone())));
        }
        if equal(maa, mbb) {
            return m.mutate_expr(&(maa.clone() * (mab.clone() - mba.clone())));
        }
    }
    if let Some((maa, mab)) = a.as_mul() {
        if equal(maa, &b) && !is_const(&b) {
            return m.mutate_expr(&(b.clone() * (mab.clone() - 1)));
        }
        if equal(mab, &b) && !is_const(&b) {
            return m.mutate_expr(&(b.clone() * (maa.clone() - 1)));
        }
    }
    if let Some((mba, mbb)) = b.as_mul() {
        if equal(mba, &a) && !is_const(&a) {
            return m.mutate_expr(&(a.clone() * (1 - mbb.clone())));
        }
        if equal(mbb, &a) && !is_const(&a) {
            return m.mutate_expr(&(a.clone() * (1 - mba.clone())));
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::sub(a, b)
    }
}

fn visit_mul<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_mul().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let mut a = m.mutate_expr(&op_a);
    let mut b = m.mutate_expr(&op_b);

    if is_simple_const(&a) {
        std::mem::swap(&mut a, &mut b);
    }

    let inf = infinity_code(&a, &b);
    if inf & (PP | NP) != 0 {
        return a;
    }
    if inf & PN != 0 {
        return b;
    }
    if inf & (PF | NF) != 0 && is_positive_const(&b) {
        return a;
    }
    if inf & (PF | NF) != 0 && is_negative_const(&b) {
        return Expr::infinity(a.ty(), -infinity_count(&a));
    }

    if is_zero(&b) {
        return b;
    }
    if is_one(&b) {
        return a;
    }
    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        return Expr::int(ia.wrapping_mul(ib));
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(fa * fb);
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if e.ty().is_uint() {
            make_const(e.ty(), (ia as u32).wrapping_mul(ib as u32) as i32)
        } else {
            make_const(e.ty(), ia.wrapping_mul(ib))
        };
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        let inner = m.mutate_expr(&(va * vb.clone()));
        return Expr::broadcast(inner, w);
    }
    if let (Some((ba, sa, w)), Some((vb, _))) = (a.as_ramp(), b.as_broadcast()) {
        let mult = vb.clone();
        return m.mutate_expr(&Expr::ramp(ba * mult.clone(), sa * mult, w));
    }
    if let (Some((va, _)), Some((bb, sb, w))) = (a.as_broadcast(), b.as_ramp()) {
        let mult = va.clone();
        return m.mutate_expr(&Expr::ramp(mult.clone() * bb.clone(), mult * sb.clone(), w));
    }
    if let Some((aa, ab)) = a.as_add() {
        if is_simple_const(ab) && is_simple_const(&b) {
            return m.mutate_expr(&(aa.clone() * b.clone() + ab.clone() * b.clone()));
        }
    }
    if let Some((maa, mab)) = a.as_mul() {
        if is_simple_const(mab) && is_simple_const(&b) {
            return m.mutate_expr(&(maa.clone() * (mab.clone() * b)));
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::mul(a, b)
    }
}

fn visit_div<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_div().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);

    let inf = infinity_code(&a, &b);
    if inf & (PP | NP | PN | NN) != 0 {
        panic!("Conflicting infinity in division");
    }
    if inf & (FP | FN) != 0 {
        // Division by infinity yields zero.
        return make_zero(a.ty());
    }
    if inf & (PF | NF) != 0 && is_positive_const(&b) {
        return a;
    }
    if inf & (PF | NF) != 0 && is_negative_const(&b) {
        return Expr::infinity(a.ty(), -infinity_count(&a));
    }

    if is_zero(&a) {
        return a;
    }
    if is_one(&b) {
        return a;
    }
    if equal(&a, &b) {
        return make_one(a.ty());
    }
    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        if ib != 0 {
            return Expr::int(div_imp(ia, ib));
        }
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(div_imp_f32(fa, fb));
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        if ib != 0 {
            return if e.ty().is_uint() {
                make_const(e.ty(), ((ia as u32) / (ib as u32)) as i32)
            } else {
                make_const(e.ty(), div_imp(ia, ib))
            };
        }
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::broadcast(va / vb.clone(), w));
    }
    if let (Some((base, stride, w)), Some((vb, _))) = (a.as_ramp(), b.as_broadcast()) {
        if let (Some(ib), Some(ia)) = (const_int(vb), const_int(stride)) {
            if ib != 0 && ia % ib == 0 {
                // ramp(x, s*b, w) / broadcast(b, w) --> ramp(x/b, s, w)
                return m.mutate_expr(&Expr::ramp(base / ib, Expr::int(ia / ib), w));
            }
        }
    }
    if let Some((da, db)) = a.as_div() {
        if let (Some(ia), Some(ib)) = (const_int(db), const_int(&b)) {
            // (x / 3) / 4 --> x / 12
            return m.mutate_expr(&(da.clone() / ia.wrapping_mul(ib)));
        }
    }
    if let Some((ma, mb)) = a.as_mul() {
        if let (Some(ia), Some(ib)) = (const_int(mb), const_int(&b)) {
            if ia != 0 && ib != 0 && (ia % ib == 0 || ib % ia == 0) {
                return if ia % ib == 0 {
                    // (x * 4) / 2 --> x * 2
                    m.mutate_expr(&(ma.clone() * (ia / ib)))
                } else {
                    // (x * 2) / 4 --> x / 2
                    m.mutate_expr(&(ma.clone() / (ib / ia)))
                };
            }
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        // Pull terms that are a multiple of the divisor out.
        if let Some((maa, mab)) = aa.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mab), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (x*4 + y) / 2 --> x*2 + y/2
                    return m.mutate_expr(&(maa.clone() * (ia / ib) + ab.clone() / b.clone()));
                }
            }
        }
        if let Some((mba, mbb)) = ab.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mbb), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (y + x*4) / 2 --> y/2 + x*2
                    return m.mutate_expr(&(aa.clone() / b.clone() + mba.clone() * (ia / ib)));
                }
            }
        }
    }
    if let Some((sa, sb)) = a.as_sub() {
        if let Some((maa, mab)) = sa.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mab), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (x*4 - y) / 2 --> x*2 - y/2
                    return m.mutate_expr(&(maa.clone() * (ia / ib) - sb.clone() / b.clone()));
                }
            }
        }
        if let Some((mba, mbb)) = sb.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mbb), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (y - x*4) / 2 --> y/2 - x*2
                    return m.mutate_expr(&(sa.clone() / b.clone() - mba.clone() * (ia / ib)));
                }
            }
        }
    }
    if b.ty().is_float() && is_simple_const(&b) {
        // Const float division becomes multiplication: x / 2 --> x * 0.5.
        return m.mutate_expr(&(a * (make_one(b.ty()) / b)));
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::div(a, b)
    }
}

fn visit_mod<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = match e.kind() {
        ExprKind::Mod(a, b) => (a.clone(), b.clone()),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);

    let inf = infinity_code(&a, &b);
    if inf & FP != 0 && (is_positive_const(&a) || is_zero(&a)) {
        // a mod +inf is a for non-negative a.
        return a;
    }
    if inf & FN != 0 && (is_negative_const(&a) || is_zero(&a)) {
        return a;
    }
    if inf & (PP | NN) != 0 {
        return a;
    }
    if inf & (NP | PN | NF | PF) != 0 {
        panic!("Conflicting infinity in modulus");
    }

    // With a constant modulus, modular-arithmetic facts about the dividend
    // can collapse the whole operation.
    let mut mod_rem = ModulusRemainder::unknown();
    if let Some(_ib) = const_int(&b) {
        if a.ty() == Type::I32 {
            mod_rem = modulus_remainder(&a, m.alignment_mut());
        }
    }

    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        if ib != 0 {
            return Expr::int(mod_imp(ia, ib));
        }
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(mod_imp_f32(fa, fb));
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        if ib != 0 {
            return if e.ty().is_uint() {
                make_const(e.ty(), ((ia as u32) % (ib as u32)) as i32)
            } else {
                Expr::cast(e.ty(), Expr::int(mod_imp(ia, ib)))
            };
        }
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::broadcast(va.clone() % vb.clone(), w));
    }
    if let Some((_, mb)) = a.as_mul() {
        if let (Some(ib), Some(ia)) = (const_int(&b), const_int(mb)) {
            if ib != 0 && ia % ib == 0 {
                // (x * (b*a)) % b --> 0
                return make_zero(a.ty());
            }
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        if let Some((_, mab)) = aa.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mab), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (x * (b*a) + y) % b --> y % b
                    return m.mutate_expr(&(ab.clone() % ib));
                }
            }
        }
        if let Some((_, mbb)) = ab.as_mul() {
            if let (Some(ia), Some(ib)) = (const_int(mbb), const_int(&b)) {
                if ib != 0 && ia % ib == 0 {
                    // (y + x * (b*a)) % b --> y % b
                    return m.mutate_expr(&(aa.clone() % ib));
                }
            }
        }
    }
    if let Some(ib) = const_int(&b) {
        if a.ty() == Type::I32 && ib != 0 && mod_rem.modulus % i64::from(ib) == 0 {
            // ((a*b)*x + c) % a --> c % a
            return Expr::int(mod_imp(mod_rem.remainder as i32, ib));
        }
    }
    if let (Some((base, stride, w)), Some((vb, _))) = (a.as_ramp(), b.as_broadcast()) {
        if let (Some(ia), Some(ib)) = (const_int(stride), const_int(vb)) {
            if ib != 0 && ia % ib == 0 {
                // ramp(x, 4, w) % broadcast(2, w) --> broadcast(x % 2, w)
                return m.mutate_expr(&Expr::broadcast(base.clone() % ib, w));
            }
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::modulo(a, b)
    }
}

/// Compare two ramp/broadcast vectors end to end; a decisive answer is a
/// broadcast boolean.
fn compare_lt<M: SimplifyCore>(
    m: &mut M,
    base_a: &Expr,
    stride_a: &Expr,
    base_b: &Expr,
    stride_b: &Expr,
    width: u16,
) -> Option<Expr> {
    let first = simplify(m.cc(), &lt(base_a.clone(), base_b.clone()));
    let last = simplify(
        m.cc(),
        &lt(
            base_a.clone() + stride_a.clone() * (i32::from(width) - 1),
            base_b.clone() + stride_b.clone() * (i32::from(width) - 1),
        ),
    );
    if equal(&first, &last) {
        Some(m.mutate_expr(&Expr::broadcast(first, width)))
    } else {
        // Possible that part of the vector compares one way and part the
        // other; leave the comparison alone.
        None
    }
}

struct VecParts {
    base: Expr,
    stride: Expr,
}

fn vector_parts(e: &Expr) -> Option<(VecParts, u16)> {
    if let Some((base, stride, w)) = e.as_ramp() {
        return Some((
            VecParts {
                base: base.clone(),
                stride: stride.clone(),
            },
            w,
        ));
    }
    if let Some((value, w)) = e.as_broadcast() {
        return Some((
            VecParts {
                base: value.clone(),
                stride: make_zero(value.ty()),
            },
            w,
        ));
    }
    None
}

fn vector_min<M: SimplifyCore>(m: &mut M, a: &Expr, b: &Expr) -> Option<Expr> {
    let (pa, w) = vector_parts(a)?;
    let (pb, _) = vector_parts(b)?;
    if let Some(r) = compare_lt(m, &pa.base, &pa.stride, &pb.base, &pb.stride, w) {
        if is_zero(&r) {
            return Some(b.clone()); // a >= b everywhere
        }
        if is_one(&r) {
            return Some(a.clone()); // a < b everywhere
        }
    }
    if let Some(r) = compare_lt(m, &pb.base, &pb.stride, &pa.base, &pa.stride, w) {
        if is_zero(&r) {
            return Some(a.clone()); // b >= a everywhere
        }
    }
    None
}

fn vector_max<M: SimplifyCore>(m: &mut M, a: &Expr, b: &Expr) -> Option<Expr> {
    let (pa, w) = vector_parts(a)?;
    let (pb, _) = vector_parts(b)?;
    if let Some(r) = compare_lt(m, &pa.base, &pa.stride, &pb.base, &pb.stride, w) {
        if is_zero(&r) {
            return Some(a.clone());
        }
        if is_one(&r) {
            return Some(b.clone());
        }
    }
    if let Some(r) = compare_lt(m, &pb.base, &pb.stride, &pa.base, &pa.stride, w) {
        if is_zero(&r) {
            return Some(b.clone());
        }
    }
    None
}

fn visit_min<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_min().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let mut a = m.mutate_expr(&op_a);
    let mut b = m.mutate_expr(&op_b);

    // Move constants to the right.
    if is_simple_const(&a) && !is_simple_const(&b) {
        std::mem::swap(&mut a, &mut b);
    }

    let inf = infinity_code(&a, &b);
    if inf & (PP | FP | NP | NF | NN) != 0 {
        return a; // The first operand is the minimum.
    }
    if inf & (PF | PN | FN) != 0 {
        return b;
    }

    if equal(&a, &b) {
        return a;
    }
    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        return Expr::int(ia.min(ib));
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(fa.min(fb));
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if e.ty().is_uint() {
            make_const(e.ty(), (ia as u32).min(ib as u32) as i32)
        } else {
            make_const(e.ty(), ia.min(ib))
        };
    }
    if let Some(ib) = const_castint(&b) {
        // min against the extrema of the type.
        if ib == b.ty().imax() {
            return a;
        }
        if ib == b.ty().imin() {
            return b;
        }
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::broadcast(Expr::min(va.clone(), vb.clone()), w));
    }
    if vector_parts(&a).is_some() && vector_parts(&b).is_some() {
        if let Some(r) = vector_min(m, &a, &b) {
            return r;
        }
        return if a.same_as(&op_a) && b.same_as(&op_b) {
            e.clone()
        } else {
            Expr::min(a, b)
        };
    }
    if let (Some((aa, ab)), Some((ba, bb))) = (a.as_add(), b.as_add()) {
        if let (Some(ia), Some(ib)) = (const_int(ab), const_int(bb)) {
            if equal(aa, ba) {
                // min(x + 3, x - 2) --> x - 2
                return if ia > ib { b.clone() } else { a.clone() };
            }
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        if let Some(ia) = const_int(ab) {
            if equal(aa, &b) {
                // min(x + 5, x)
                return if ia > 0 { b.clone() } else { a.clone() };
            }
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if let Some(ib) = const_int(bb) {
            if equal(ba, &a) {
                // min(x, x + 5)
                return if ib > 0 { a.clone() } else { b.clone() };
            }
        }
    }
    if let Some((maa, mab)) = a.as_min() {
        if is_simple_const(mab) && is_simple_const(&b) {
            // min(min(x, 4), 5) --> min(x, 4)
            let folded = m.mutate_expr(&Expr::min(mab.clone(), b.clone()));
            return Expr::min(maa.clone(), folded);
        }
    }
    if m.cc().options.simplify_nested_clamp {
        if let Some((aa, ab)) = a.as_add() {
            if let (Some(ia), Some(ib)) = (const_int(ab), const_int(&b)) {
                // min(e + k1, k2) --> min(e, k2 - k1) + k1, pushing the
                // addition down where it may combine with others.
                return Expr::add(
                    Expr::min(aa.clone(), Expr::int(ib.wrapping_sub(ia))),
                    Expr::int(ia),
                );
            }
        }
    }
    if let Some((maa, mab)) = a.as_min() {
        if equal(mab, &b) || equal(maa, &b) {
            // min(min(x, y), y) --> min(x, y)
            return a.clone();
        }
    }
    if let Some((mba, mbb)) = b.as_min() {
        if equal(mbb, &a) || equal(mba, &a) {
            return b.clone();
        }
    }
    // Absorption through chains of nested mins, up to depth four.
    {
        let mut inner = a.as_min().map(|(x, _)| x);
        for _ in 0..3 {
            let Some(x) = inner else { break };
            if let Some((xa, xb)) = x.as_min() {
                if equal(xb, &b) {
                    return a.clone();
                }
                inner = Some(xa);
            } else {
                break;
            }
        }
    }
    if m.cc().options.simplify_nested_clamp {
        if let Some((_, mab)) = a.as_max() {
            if let (Some(k1), Some(k2)) = (const_int(mab), const_int(&b)) {
                if k2 <= k1 {
                    // min(max(x, k1), k2) --> k2 when k1 >= k2
                    return b.clone();
                }
            }
        }
        if let Some((max_a_a, max_a_b)) = a.as_max() {
            if let Some((min_x, min_k)) = max_a_a.as_min() {
                if let (Some(k3), Some(k2), Some(k1)) =
                    (const_int(&b), const_int(max_a_b), const_int(min_k))
                {
                    if k3 > k2 && k2 < k1 {
                        // min(max(min(x, k1), k2), k3): x is limited to
                        // (k2, min(k1, k3)).
                        return Expr::min(
                            Expr::max(min_x.clone(), Expr::int(k2)),
                            Expr::int(k3.min(k1)),
                        );
                    }
                }
            }
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::min(a, b)
    }
}

fn visit_max<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = e.as_max().unwrap();
    let (op_a, op_b) = (op_a.clone(), op_b.clone());
    let mut a = m.mutate_expr(&op_a);
    let mut b = m.mutate_expr(&op_b);

    let inf = infinity_code(&a, &b);
    if inf & (PP | FP | NP | NF | NN) != 0 {
        return b; // The second operand is the maximum.
    }
    if inf & (PF | PN | FN) != 0 {
        return a;
    }

    if is_simple_const(&a) && !is_simple_const(&b) {
        std::mem::swap(&mut a, &mut b);
    }

    if equal(&a, &b) {
        return a;
    }
    if let (Some(ia), Some(ib)) = (const_int(&a), const_int(&b)) {
        return Expr::int(ia.max(ib));
    }
    if let (Some(fa), Some(fb)) = (const_float(&a), const_float(&b)) {
        return Expr::float(fa.max(fb));
    }
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if e.ty().is_uint() {
            make_const(e.ty(), (ia as u32).max(ib as u32) as i32)
        } else {
            make_const(e.ty(), ia.max(ib))
        };
    }
    if let Some(ib) = const_castint(&b) {
        if ib == b.ty().imin() {
            return a;
        }
        if ib == b.ty().imax() {
            return b;
        }
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::broadcast(Expr::max(va.clone(), vb.clone()), w));
    }
    if vector_parts(&a).is_some() && vector_parts(&b).is_some() {
        if let Some(r) = vector_max(m, &a, &b) {
            return r;
        }
        return if a.same_as(&op_a) && b.same_as(&op_b) {
            e.clone()
        } else {
            Expr::max(a, b)
        };
    }
    if let (Some((aa, ab)), Some((ba, bb))) = (a.as_add(), b.as_add()) {
        if let (Some(ia), Some(ib)) = (const_int(ab), const_int(bb)) {
            if equal(aa, ba) {
                return if ia > ib { a.clone() } else { b.clone() };
            }
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        if let Some(ia) = const_int(ab) {
            if equal(aa, &b) {
                return if ia > 0 { a.clone() } else { b.clone() };
            }
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if let Some(ib) = const_int(bb) {
            if equal(ba, &a) {
                return if ib > 0 { b.clone() } else { a.clone() };
            }
        }
    }
    if let Some((maa, mab)) = a.as_max() {
        if is_simple_const(mab) && is_simple_const(&b) {
            // max(max(x, 4), 5) --> max(x, 5)
            let folded = m.mutate_expr(&Expr::max(mab.clone(), b.clone()));
            return Expr::max(maa.clone(), folded);
        }
    }
    if m.cc().options.simplify_nested_clamp {
        if let Some((aa, ab)) = a.as_add() {
            if let (Some(ia), Some(ib)) = (const_int(ab), const_int(&b)) {
                // max(e + k1, k2) --> max(e, k2 - k1) + k1
                return Expr::add(
                    Expr::max(aa.clone(), Expr::int(ib.wrapping_sub(ia))),
                    Expr::int(ia),
                );
            }
        }
    }
    if let Some((maa, mab)) = a.as_max() {
        if equal(mab, &b) || equal(maa, &b) {
            return a.clone();
        }
    }
    if let Some((mba, mbb)) = b.as_max() {
        if equal(mbb, &a) || equal(mba, &a) {
            return b.clone();
        }
    }
    {
        let mut inner = a.as_max().map(|(x, _)| x);
        for _ in 0..3 {
            let Some(x) = inner else { break };
            if let Some((xa, xb)) = x.as_max() {
                if equal(xb, &b) {
                    return a.clone();
                }
                inner = Some(xa);
            } else {
                break;
            }
        }
    }
    if m.cc().options.simplify_nested_clamp {
        if let Some((_, mab)) = a.as_min() {
            if let (Some(k1), Some(k2)) = (const_int(mab), const_int(&b)) {
                if k2 >= k1 {
                    // max(min(x, k1), k2) --> k2 when k1 <= k2
                    return b.clone();
                }
            }
        }
        if let Some((min_a_a, min_a_b)) = a.as_min() {
            if let Some((max_x, max_k)) = min_a_a.as_max() {
                if let (Some(k3), Some(k2), Some(k1)) =
                    (const_int(&b), const_int(min_a_b), const_int(max_k))
                {
                    if k3 < k2 && k2 > k1 {
                        // max(min(max(x, k1), k2), k3): x is limited to
                        // (max(k1, k3), k2).
                        return Expr::max(
                            Expr::min(max_x.clone(), Expr::int(k2)),
                            Expr::int(k3.max(k1)),
                        );
                    }
                }
            }
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::max(a, b)
    }
}

fn visit_eq<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = match e.kind() {
        ExprKind::Eq(a, b) => (a.clone(), b.clone()),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let width = e.ty().width;

    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if a.ty().is_uint() {
            ops::make_bool((ia as u32) == (ib as u32), width)
        } else {
            ops::make_bool(ia == ib, width)
        };
    }

    let delta = m.mutate_expr(&(a.clone() - b.clone()));
    if is_zero(&delta) {
        return const_true_of(width);
    }
    if is_simple_const(&delta) {
        return const_false_of(width);
    }
    if is_simple_const(&a) && !is_simple_const(&b) {
        // Move constants to the right.
        return m.mutate_expr(&Expr::eq(b, a));
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        // Push broadcasts outwards.
        return m.mutate_expr(&Expr::broadcast(Expr::eq(va.clone(), vb.clone()), w));
    }
    if let (Some((ba, sa, w)), Some((bb, sb, _))) = (a.as_ramp(), b.as_ramp()) {
        if equal(sa, sb) {
            // Ramps with matching stride.
            let bases = Expr::eq(ba.clone(), bb.clone());
            return m.mutate_expr(&Expr::broadcast(bases, w));
        }
    }
    if let (Some((aa, ab)), Some((ba, bb))) = (a.as_add(), b.as_add()) {
        // Subtract a term from both sides.
        if equal(aa, ba) {
            return m.mutate_expr(&Expr::eq(ab.clone(), bb.clone()));
        }
        if equal(aa, bb) {
            return m.mutate_expr(&Expr::eq(ab.clone(), ba.clone()));
        }
        if equal(ab, ba) {
            return m.mutate_expr(&Expr::eq(aa.clone(), bb.clone()));
        }
        if equal(ab, bb) {
            return m.mutate_expr(&Expr::eq(aa.clone(), ba.clone()));
        }
    }
    if let (Some((sa, sb)), Some((ta, tb))) = (a.as_sub(), b.as_sub()) {
        // Add a term to both sides.
        if equal(sa, ta) {
            return m.mutate_expr(&Expr::eq(sb.clone(), tb.clone()));
        }
        if equal(sb, tb) {
            return m.mutate_expr(&Expr::eq(sa.clone(), ta.clone()));
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        // Move all adds and subs to the rhs to cut down on further cases.
        return m.mutate_expr(&Expr::eq(aa.clone(), b - ab.clone()));
    }
    if let Some((sa, sb)) = a.as_sub() {
        return m.mutate_expr(&Expr::eq(sa.clone(), b + sb.clone()));
    }
    if let Some((ba, bb)) = b.as_add() {
        if equal(ba, &a) {
            // Subtract a term from both sides.
            return m.mutate_expr(&Expr::eq(make_zero(bb.ty()), bb.clone()));
        }
        if equal(bb, &a) {
            return m.mutate_expr(&Expr::eq(make_zero(ba.ty()), ba.clone()));
        }
    }
    if let Some((ba, bb)) = b.as_sub() {
        if equal(ba, &a) {
            // Add a term to both sides.
            return m.mutate_expr(&Expr::eq(make_zero(bb.ty()), bb.clone()));
        }
    }
    if let (Some((maa, mab)), Some((mba, mbb))) = (a.as_mul(), b.as_mul()) {
        if is_simple_const(mab) && is_simple_const(mbb) && equal(mab, mbb) {
            // Divide both sides by a constant.
            assert!(
                !is_zero(mab),
                "Multiplication by zero survived constant folding"
            );
            return m.mutate_expr(&Expr::eq(maa.clone(), mba.clone()));
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::eq(a, b)
    }
}

fn visit_lt<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = match e.kind() {
        ExprKind::Lt(a, b) => (a.clone(), b.clone()),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    let width = e.ty().width;

    let inf = infinity_code(&a, &b);
    if inf & (FP | NP | NF) != 0 {
        return const_true_of(width);
    }
    if inf & (PF | PN | FN) != 0 {
        return const_false_of(width);
    }
    if inf & (PP | NN) != 0 {
        panic!("Conflicting infinity in comparison");
    }

    let delta = m.mutate_expr(&(a.clone() - b.clone()));

    // Explicit comparison of cast constants first; the delta form can wrap
    // for large unsigned values.
    if let (Some(ia), Some(ib)) = (const_castint(&a), const_castint(&b)) {
        return if a.ty().is_uint() {
            ops::make_bool((ia as u32) < (ib as u32), width)
        } else {
            ops::make_bool(ia < ib, width)
        };
    }
    if let Some(ia) = const_castint(&a) {
        if ia == a.ty().imax() {
            // max-of-type < x can never hold.
            return const_false_of(width);
        }
    }
    if let Some(ib) = const_castint(&b) {
        if ib == b.ty().imin() {
            // x < min-of-type can never hold.
            return const_false_of(width);
        }
    }
    if is_zero(&delta) || is_positive_const(&delta) {
        return const_false_of(width);
    }
    if is_negative_const(&delta) {
        return const_true_of(width);
    }
    if let (Some((va, w)), Some((vb, _))) = (a.as_broadcast(), b.as_broadcast()) {
        return m.mutate_expr(&Expr::broadcast(Expr::lt(va.clone(), vb.clone()), w));
    }
    if let (Some((ba, sa, w)), Some((bb, sb, _))) = (a.as_ramp(), b.as_ramp()) {
        if equal(sa, sb) {
            let bases = Expr::lt(ba.clone(), bb.clone());
            return m.mutate_expr(&Expr::broadcast(bases, w));
        }
    }
    if vector_parts(&a).is_some() && vector_parts(&b).is_some() {
        let (pa, w) = vector_parts(&a).unwrap();
        let (pb, _) = vector_parts(&b).unwrap();
        if let Some(r) = compare_lt(m, &pa.base, &pa.stride, &pb.base, &pb.stride, w) {
            return r;
        }
        return if a.same_as(&op_a) && b.same_as(&op_b) {
            e.clone()
        } else {
            Expr::lt(a, b)
        };
    }
    if is_const(&a) {
        if let Some((ba, bb)) = b.as_add() {
            if is_const(bb) {
                // Constant on the left, add of constant on the right.
                return m.mutate_expr(&lt(a - bb.clone(), ba.clone()));
            }
        }
        if let Some((ba, bb)) = b.as_sub() {
            if is_const(bb) {
                return m.mutate_expr(&lt(a + bb.clone(), ba.clone()));
            }
            if is_const(ba) {
                return m.mutate_expr(&lt(bb.clone(), ba.clone() - a));
            }
        }
    }
    if let (Some((aa, ab)), Some((ba, bb))) = (a.as_add(), b.as_add()) {
        // Subtract a term from both sides.
        if equal(aa, ba) {
            return m.mutate_expr(&Expr::lt(ab.clone(), bb.clone()));
        }
        if equal(aa, bb) {
            return m.mutate_expr(&Expr::lt(ab.clone(), ba.clone()));
        }
        if equal(ab, ba) {
            return m.mutate_expr(&Expr::lt(aa.clone(), bb.clone()));
        }
        if equal(ab, bb) {
            return m.mutate_expr(&Expr::lt(aa.clone(), ba.clone()));
        }
    }
    if let (Some((sa, sb)), Some((ta, tb))) = (a.as_sub(), b.as_sub()) {
        // Add a term to both sides.
        if equal(sa, ta) {
            return m.mutate_expr(&Expr::lt(tb.clone(), sb.clone()));
        }
        if equal(sb, tb) {
            return m.mutate_expr(&Expr::lt(sa.clone(), ta.clone()));
        }
    }
    let a_is_minmax = a.as_min().is_some() || a.as_max().is_some();
    let b_is_minmax = b.as_min().is_some() || b.as_max().is_some();
    if let Some((ba, bb)) = b.as_add() {
        if !a_is_minmax && (ba.as_min().is_some() || ba.as_max().is_some()) {
            // Push the add to the other side to expose the min/max.
            return m.mutate_expr(&lt(a - bb.clone(), ba.clone()));
        }
    }
    if let Some((ba, bb)) = b.as_sub() {
        if !a_is_minmax && (ba.as_min().is_some() || ba.as_max().is_some()) {
            return m.mutate_expr(&lt(a + bb.clone(), ba.clone()));
        }
        if !a_is_minmax && (bb.as_min().is_some() || bb.as_max().is_some()) {
            return m.mutate_expr(&lt(bb.clone(), ba.clone() - a));
        }
    }
    if let Some((aa, ab)) = a.as_add() {
        if !b_is_minmax {
            // Move adds and subs to the rhs; min/max on the rhs keeps them
            // away to preserve the rules below.
            return m.mutate_expr(&lt(aa.clone(), b - ab.clone()));
        }
    }
    if let Some((sa, sb)) = a.as_sub() {
        if !b_is_minmax {
            return m.mutate_expr(&lt(sa.clone(), b + sb.clone()));
        }
    }
    if let Some((ba, bb)) = b.as_add() {
        if equal(ba, &a) {
            return m.mutate_expr(&lt(make_zero(bb.ty()), bb.clone()));
        }
        if equal(bb, &a) {
            return m.mutate_expr(&lt(make_zero(ba.ty()), ba.clone()));
        }
    }
    if let Some((ba, bb)) = b.as_sub() {
        if equal(ba, &a) {
            return m.mutate_expr(&lt(bb.clone(), make_zero(bb.ty())));
        }
    }
    if let (Some((maa, mab)), Some((mba, mbb))) = (a.as_mul(), b.as_mul()) {
        if is_positive_const(mab) && is_positive_const(mbb) && equal(mab, mbb) {
            // Divide both sides by a positive constant.
            return m.mutate_expr(&Expr::lt(maa.clone(), mba.clone()));
        }
    }
    // Inequality reasoning through min/max. A failed proof's disproof feeds
    // the complementary rule.
    if let Some((maa, mab)) = a.as_min() {
        let (p, disproved) = proved_with_disproof(m.cc(), &lt(mab.clone(), b.clone()));
        if p || proved(m.cc(), &lt(maa.clone(), b.clone())) {
            // min(x, y) < b holds if either arm is below b.
            return const_true_of(width);
        }
        if disproved && proved(m.cc(), &ge(maa.clone(), b.clone())) {
            // Both arms at or above b.
            return const_false_of(width);
        }
    }
    if let Some((mba, mbb)) = b.as_min() {
        let (p, disproved) = proved_with_disproof(m.cc(), &ge(a.clone(), mbb.clone()));
        if p || proved(m.cc(), &ge(a.clone(), mba.clone())) {
            // a >= one arm of min(x, y) disproves a < min(x, y).
            return const_false_of(width);
        }
        if disproved && proved(m.cc(), &lt(a.clone(), mba.clone())) {
            return const_true_of(width);
        }
    }
    if let Some((maa, mab)) = a.as_max() {
        let (p, disproved) = proved_with_disproof(m.cc(), &ge(mab.clone(), b.clone()));
        if p || proved(m.cc(), &ge(maa.clone(), b.clone())) {
            // max(x, y) >= b disproves max(x, y) < b.
            return const_false_of(width);
        }
        if disproved && proved(m.cc(), &lt(maa.clone(), b.clone())) {
            return const_true_of(width);
        }
    }
    if let Some((mba, mbb)) = b.as_max() {
        let (p, disproved) = proved_with_disproof(m.cc(), &lt(a.clone(), mbb.clone()));
        if p {
            // a below one arm puts it below the max.
            return const_true_of(width);
        }
        if disproved && proved(m.cc(), &ge(a.clone(), mba.clone())) {
            return const_false_of(width);
        }
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::lt(a, b)
    }
}

fn visit_and<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = match e.kind() {
        ExprKind::And(a, b) => (a.clone(), b.clone()),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    if is_one(&a) {
        return b;
    }
    if is_one(&b) {
        return a;
    }
    if is_zero(&a) {
        return a;
    }
    if is_zero(&b) {
        return b;
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::and(a, b)
    }
}

fn visit_or<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_a, op_b) = match e.kind() {
        ExprKind::Or(a, b) => (a.clone(), b.clone()),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    let b = m.mutate_expr(&op_b);
    if is_one(&a) {
        return a;
    }
    if is_one(&b) {
        return b;
    }
    if is_zero(&a) {
        return b;
    }
    if is_zero(&b) {
        return a;
    }
    if a.same_as(&op_a) && b.same_as(&op_b) {
        e.clone()
    } else {
        Expr::or(a, b)
    }
}

fn visit_not<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let op_a = match e.kind() {
        ExprKind::Not(a) => a.clone(),
        _ => unreachable!(),
    };
    let a = m.mutate_expr(&op_a);
    if is_one(&a) {
        return make_zero(a.ty());
    }
    if is_zero(&a) {
        return make_one(a.ty());
    }
    // Negate a comparison by flipping it rather than wrapping it.
    match a.kind() {
        ExprKind::Not(inner) => return inner.clone(),
        ExprKind::Le(x, y) => return Expr::lt(y.clone(), x.clone()),
        ExprKind::Ge(x, y) => return Expr::lt(x.clone(), y.clone()),
        ExprKind::Lt(x, y) => return Expr::le(y.clone(), x.clone()),
        ExprKind::Gt(x, y) => return Expr::le(x.clone(), y.clone()),
        ExprKind::Ne(x, y) => return Expr::eq(x.clone(), y.clone()),
        ExprKind::Eq(x, y) => return Expr::ne(x.clone(), y.clone()),
        ExprKind::Broadcast { value, width } => {
            return m.mutate_expr(&Expr::broadcast(Expr::not(value.clone()), *width));
        }
        _ => {}
    }
    if a.same_as(&op_a) {
        e.clone()
    } else {
        Expr::not(a)
    }
}

fn visit_select<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let (op_c, op_t, op_f) = match e.kind() {
        ExprKind::Select {
            condition,
            true_value,
            false_value,
        } => (condition.clone(), true_value.clone(), false_value.clone()),
        _ => unreachable!(),
    };
    let condition = m.mutate_expr(&op_c);
    let true_value = m.mutate_expr(&op_t);
    let false_value = m.mutate_expr(&op_f);

    if is_one(&condition) {
        return true_value;
    }
    if is_zero(&condition) {
        return false_value;
    }
    if equal(&true_value, &false_value) {
        return true_value;
    }
    match condition.kind() {
        ExprKind::Ne(x, y) => {
            // Normalise to a select on ==, arms swapped.
            return m.mutate_expr(&Expr::select(
                Expr::eq(x.clone(), y.clone()),
                false_value,
                true_value,
            ));
        }
        ExprKind::Le(x, y) => {
            // Normalise to a select on <, arms swapped.
            return m.mutate_expr(&Expr::select(
                Expr::lt(y.clone(), x.clone()),
                false_value,
                true_value,
            ));
        }
        _ => {}
    }
    if condition.same_as(&op_c) && true_value.same_as(&op_t) && false_value.same_as(&op_f) {
        e.clone()
    } else {
        Expr::select(condition, true_value, false_value)
    }
}

enum LetBody {
    Expr(Expr),
    Stmt(Stmt),
}

/// Shared Let/LetStmt handling. Simple constants and variable aliases are
/// pushed into scope for substitution; ramp and broadcast values have their
/// scalar part hoisted into a wrapper let (`name.base.N` / `name.value.N`) so
/// the vectorised form can be recognised at every use site.
fn simplify_let<M: SimplifyCore>(m: &mut M, name: &str, op_value: &Expr, body: LetBody) -> LetBody {
    let value = m.mutate_expr(op_value);
    let mut wrapper: Option<(String, Expr)> = None;

    if is_simple_const(&value) {
        m.scope_mut().push(name, Some(value.clone()));
    } else if let Some((base, stride, width)) = value.as_ramp() {
        if is_simple_const(stride) {
            let wrapper_name = format!("{name}.base{}", m.cc().unique_name('.'));
            let var = Expr::var_typed(base.ty(), wrapper_name.clone());
            // A multiplied base keeps the multiply inside the ramp.
            let (wrapper_value, val) = if let Some((mul_a, mul_b)) = base.as_mul() {
                if mul_b.as_int_imm().is_some() {
                    (
                        mul_a.clone(),
                        Expr::ramp(var * mul_b.clone(), stride.clone(), width),
                    )
                } else {
                    (base.clone(), Expr::ramp(var, stride.clone(), width))
                }
            } else {
                (base.clone(), Expr::ramp(var, stride.clone(), width))
            };
            m.scope_mut().push(name, Some(val));
            wrapper = Some((wrapper_name, wrapper_value));
        } else {
            m.scope_mut().push(name, None);
        }
    } else if let Some((inner, width)) = value.as_broadcast() {
        let wrapper_name = format!("{name}.value{}", m.cc().unique_name('.'));
        let var = Expr::var_typed(inner.ty(), wrapper_name.clone());
        m.scope_mut().push(name, Some(Expr::broadcast(var, width)));
        wrapper = Some((wrapper_name, inner.clone()));
    } else if value.as_variable().is_some() {
        // An alias to another variable substitutes only if that variable is
        // still visible at the use site; checked when the use is visited.
        m.scope_mut().push(name, Some(value.clone()));
    } else {
        // Hide anything else with the same name until this goes out of
        // scope.
        m.scope_mut().push(name, None);
    }

    let mut wrapper_tracked = false;
    if let Some((wname, wvalue)) = &wrapper {
        if wvalue.ty() == Type::I32 {
            let fact = modulus_remainder(wvalue, m.alignment_mut());
            m.alignment_mut().push(wname.clone(), fact);
            wrapper_tracked = true;
        }
    }
    let mut value_tracked = false;
    if value.ty() == Type::I32 {
        let fact = modulus_remainder(&value, m.alignment_mut());
        m.alignment_mut().push(name, fact);
        value_tracked = true;
    }

    let new_body = match &body {
        LetBody::Expr(b) => LetBody::Expr(m.mutate_expr(b)),
        LetBody::Stmt(b) => LetBody::Stmt(m.mutate_stmt(b)),
    };

    if value_tracked {
        m.alignment_mut().pop(name);
    }
    if let Some((wname, _)) = &wrapper {
        if wrapper_tracked {
            m.alignment_mut().pop(wname);
        }
    }
    m.scope_mut().pop(name);

    match (new_body, body) {
        (LetBody::Expr(nb), LetBody::Expr(ob)) => {
            if let Some((wname, wvalue)) = wrapper {
                LetBody::Expr(Expr::let_in(
                    wname.clone(),
                    wvalue,
                    Expr::let_in(name, value, nb),
                ))
            } else if nb.same_as(&ob) && value.same_as(op_value) {
                LetBody::Expr(Expr::let_in(name, value, nb))
            } else {
                LetBody::Expr(Expr::let_in(name, value, nb))
            }
        }
        (LetBody::Stmt(nb), LetBody::Stmt(ob)) => {
            if let Some((wname, wvalue)) = wrapper {
                LetBody::Stmt(Stmt::let_stmt(
                    wname.clone(),
                    wvalue,
                    Stmt::let_stmt(name, value, nb),
                ))
            } else if nb.same_as(&ob) && value.same_as(op_value) {
                LetBody::Stmt(Stmt::let_stmt(name, value, nb))
            } else {
                LetBody::Stmt(Stmt::let_stmt(name, value, nb))
            }
        }
        _ => unreachable!(),
    }
}

fn visit_let<M: SimplifyCore>(m: &mut M, e: &Expr) -> Expr {
    let ExprKind::Let { name, value, body } = e.kind() else {
        unreachable!()
    };
    let (name, value, body) = (name.clone(), value.clone(), body.clone());
    match simplify_let(m, &name, &value, LetBody::Expr(body.clone())) {
        LetBody::Expr(r) => {
            // Share the original node when nothing changed.
            if let ExprKind::Let {
                value: nv,
                body: nb,
                ..
            } = r.kind()
            {
                if nv.same_as(&value) && nb.same_as(&body) {
                    return e.clone();
                }
            }
            r
        }
        LetBody::Stmt(_) => unreachable!(),
    }
}

fn visit_let_stmt<M: SimplifyCore>(m: &mut M, s: &Stmt) -> Stmt {
    let StmtKind::LetStmt { name, value, body } = s.kind() else {
        unreachable!()
    };
    let (name, value, body) = (name.clone(), value.clone(), body.clone());
    match simplify_let(m, &name, &value, LetBody::Stmt(body.clone())) {
        LetBody::Stmt(r) => {
            if let StmtKind::LetStmt {
                value: nv,
                body: nb,
                ..
            } = r.kind()
            {
                if nv.same_as(&value) && nb.same_as(&body) {
                    return s.clone();
                }
            }
            r
        }
        LetBody::Expr(_) => unreachable!(),
    }
}

fn visit_for<M: SimplifyCore>(m: &mut M, s: &Stmt) -> Stmt {
    if m.cc().options.lift_let {
        if let StmtKind::For {
            name,
            min,
            extent,
            for_kind,
            partition,
            body,
        } = s.kind()
        {
            // A let directly inside the loop that does not rebind the loop
            // variable moves outside.
            if let StmtKind::LetStmt {
                name: let_name,
                value,
                body: let_body,
            } = body.kind()
            {
                if let_name != name {
                    let lifted = Stmt::let_stmt(
                        let_name.clone(),
                        value.clone(),
                        Stmt::for_loop_partitioned(
                            name.clone(),
                            min.clone(),
                            extent.clone(),
                            *for_kind,
                            partition.clone(),
                            let_body.clone(),
                        ),
                    );
                    return m.mutate_stmt(&lifted);
                }
            }
        }
    }
    mutate_children_stmt(m, s)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq as pa_assert_eq;

    use super::*;
    use crate::ops::{cast, clamp, const_false, const_true, le, max, min, select};

    fn check_with(cc: &CompilerContext, a: Expr, b: Expr) {
        let simpler = simplify(cc, &a);
        assert!(
            equal(&simpler, &b),
            "simplification failure\n  input: {a}\n  output: {simpler}\n  expected: {b}"
        );
    }

    fn check(a: Expr, b: Expr) {
        check_with(&CompilerContext::new(), a, b);
    }

    fn check_proved(e: Expr) {
        let cc = CompilerContext::new();
        assert!(
            proved(&cc, &e),
            "could not prove {e}; simplified to {}",
            simplify(&cc, &e)
        );
    }

    #[test]
    fn cast_folding() {
        let x = Expr::var("x");
        check(
            Expr::cast(Type::I32, Expr::cast(Type::I32, x.clone())),
            x.clone(),
        );
        check(Expr::cast(Type::F32, Expr::int(3)), Expr::float(3.0));
        check(Expr::cast(Type::I32, Expr::float(5.0)), Expr::int(5));
        check(
            Expr::cast(Type::I32, Expr::cast(Type::int(8), Expr::int(3))),
            Expr::int(3),
        );
        check(
            Expr::cast(Type::I32, Expr::cast(Type::int(8), Expr::int(1232))),
            Expr::int(-48),
        );
        check(
            cast(Type::uint(16), Expr::int(-1)),
            cast(Type::uint(16), Expr::int(65535)),
        );
    }

    #[test]
    fn cast_constant_arithmetic() {
        let u16t = Type::uint(16);
        let i16t = Type::int(16);
        let i8t = Type::int(8);
        check(
            cast(u16t, Expr::int(53)) + cast(u16t, Expr::int(87)),
            cast(u16t, Expr::int(140)),
        );
        check(
            cast(i8t, Expr::int(127)) + cast(i8t, Expr::int(1)),
            cast(i8t, Expr::int(-128)),
        );
        check(
            cast(u16t, Expr::int(-1)) - cast(u16t, Expr::int(1)),
            cast(u16t, Expr::int(65534)),
        );
        check(
            cast(i16t, Expr::int(4)) * cast(i16t, Expr::int(-5)),
            cast(i16t, Expr::int(-20)),
        );
        check(
            cast(i16t, Expr::int(16)) / cast(i16t, Expr::int(4)),
            cast(i16t, Expr::int(4)),
        );
        check(
            cast(i16t, Expr::int(23)) % cast(i16t, Expr::int(5)),
            cast(i16t, Expr::int(3)),
        );
        check(
            min(cast(i16t, Expr::int(30000)), cast(i16t, Expr::int(-123))),
            cast(i16t, Expr::int(-123)),
        );
        check(
            max(cast(i16t, Expr::int(30000)), cast(i16t, Expr::int(65000))),
            cast(i16t, Expr::int(30000)),
        );
        check(
            ops::eq(cast(u16t, Expr::int(-1)), cast(u16t, Expr::int(65535))),
            const_true(),
        );
        check(
            ops::eq(cast(u16t, Expr::int(65)), cast(u16t, Expr::int(66))),
            const_false(),
        );
        check(
            lt(cast(u16t, Expr::int(-1)), cast(u16t, Expr::int(65535))),
            const_false(),
        );
        check(
            lt(cast(u16t, Expr::int(65)), cast(u16t, Expr::int(66))),
            const_true(),
        );
    }

    #[test]
    fn unsigned_32_bit_arithmetic_is_unsigned() {
        // 4 billion fits u32 but is negative as an i32 bit pattern.
        let u32t = Type::uint(32);
        let big = 4_000_000_000u32 as i32;
        check(
            cast(u32t, Expr::int(big)) + cast(u32t, Expr::int(5)),
            cast(u32t, Expr::int(4_000_000_005u32 as i32)),
        );
        check(
            cast(u32t, Expr::int(big)) - cast(u32t, Expr::int(5)),
            cast(u32t, Expr::int(3_999_999_995u32 as i32)),
        );
        check(
            cast(u32t, Expr::int(big)) / cast(u32t, Expr::int(5)),
            cast(u32t, Expr::int(800_000_000)),
        );
        check(
            cast(u32t, Expr::int(800_000_000)) * cast(u32t, Expr::int(5)),
            cast(u32t, Expr::int(big)),
        );
        check(
            cast(u32t, Expr::int(4_000_000_023u32 as i32)) % cast(u32t, Expr::int(100)),
            cast(u32t, Expr::int(23)),
        );
        check(
            min(cast(u32t, Expr::int(4_000_000_023u32 as i32)), cast(u32t, Expr::int(1000))),
            cast(u32t, Expr::int(1000)),
        );
        check(
            max(cast(u32t, Expr::int(4_000_000_023u32 as i32)), cast(u32t, Expr::int(1000))),
            cast(u32t, Expr::int(4_000_000_023u32 as i32)),
        );
        check(
            lt(cast(u32t, Expr::int(4_000_000_023u32 as i32)), cast(u32t, Expr::int(1000))),
            const_false(),
        );
        check(
            ops::eq(cast(u32t, Expr::int(4_000_000_023u32 as i32)), cast(u32t, Expr::int(1000))),
            const_false(),
        );
    }

    #[test]
    fn division_rounds_toward_negative_infinity() {
        check(Expr::int(23) / Expr::int(4), Expr::int(5));
        check(Expr::int(-23) / Expr::int(4), Expr::int(-6));
        check(Expr::int(-23) / Expr::int(-4), Expr::int(5));
        check(Expr::int(23) / Expr::int(-4), Expr::int(-6));
        check(
            Expr::int(-2_000_000_000) / Expr::int(1_000_000_001),
            Expr::int(-2),
        );
        check(Expr::int(23) % Expr::int(4), Expr::int(3));
        check(Expr::int(-23) % Expr::int(4), Expr::int(1));
        check(Expr::int(-23) % Expr::int(-4), Expr::int(-3));
        check(Expr::int(23) % Expr::int(-4), Expr::int(-1));
        check(
            Expr::int(-2_000_000_000) % Expr::int(1_000_000_001),
            Expr::int(2),
        );
    }

    #[test]
    fn addition_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let z = Expr::var("z");
        check(3 + x.clone(), x.clone() + 3);
        check(Expr::int(3) + Expr::int(8), Expr::int(11));
        check(Expr::float(3.25) + Expr::float(7.75), Expr::float(11.0));
        check(x.clone() + 0, x.clone());
        check(0 + x.clone(), x.clone());
        check(
            Expr::ramp(x.clone(), Expr::int(2), 3) + Expr::ramp(y.clone(), Expr::int(4), 3),
            Expr::ramp(x.clone() + y.clone(), Expr::int(6), 3),
        );
        check(
            Expr::broadcast(Expr::int(3), 3) + Expr::broadcast(Expr::int(1), 3),
            Expr::broadcast(Expr::int(4), 3),
        );
        check((x.clone() + 3) + 4, x.clone() + 7);
        check(4 + (3 + x.clone()), x.clone() + 7);
        check((x.clone() + 3) + y.clone(), (x.clone() + y.clone()) + 3);
        check(y.clone() + (x.clone() + 3), (y.clone() + x.clone()) + 3);
        check((3 - x.clone()) + x.clone(), Expr::int(3));
        check(x.clone() + (3 - x.clone()), Expr::int(3));
        check(1 - (x.clone() + 2), -1 - x.clone());
        check(1 - (x.clone() - 2), 3 - x.clone());
        check(0 - (x.clone() + -4), 4 - x.clone());
        check(
            x.clone() * y.clone() + x.clone() * z.clone(),
            x.clone() * (y.clone() + z.clone()),
        );
        check(
            x.clone() * y.clone() + z.clone() * x.clone(),
            x.clone() * (y.clone() + z.clone()),
        );
        check(
            y.clone() * x.clone() + x.clone() * z.clone(),
            x.clone() * (y.clone() + z.clone()),
        );
        check(
            y.clone() * x.clone() + z.clone() * x.clone(),
            x.clone() * (y.clone() + z.clone()),
        );
    }

    #[test]
    fn subtraction_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let z = Expr::var("z");
        check(x.clone() - 0, x.clone());
        check(
            (x.clone() / y.clone()) - (x.clone() / y.clone()),
            Expr::int(0),
        );
        check(x.clone() - 2, x.clone() + (-2));
        check(
            Expr::ramp(x.clone(), Expr::int(2), 3) - Expr::ramp(y.clone(), Expr::int(4), 3),
            Expr::ramp(x.clone() - y.clone(), Expr::int(-2), 3),
        );
        check(
            Expr::broadcast(Expr::int(3), 3) - Expr::broadcast(Expr::int(1), 3),
            Expr::broadcast(Expr::int(2), 3),
        );
        check((x.clone() + y.clone()) - x.clone(), y.clone());
        check((x.clone() + y.clone()) - y.clone(), x.clone());
        check(x.clone() - (x.clone() + y.clone()), 0 - y.clone());
        check(x.clone() - (y.clone() + x.clone()), 0 - y.clone());
        check((x.clone() + 3) - 2, x.clone() + 1);
        check((x.clone() + 3) - y.clone(), (x.clone() - y.clone()) + 3);
        check((x.clone() - 3) - y.clone(), (x.clone() - y.clone()) + (-3));
        check(x.clone() - (y.clone() - 2), (x.clone() - y.clone()) + 2);
        check(3 - (y.clone() - 2), 5 - y.clone());
        check(
            x.clone() * y.clone() - x.clone() * z.clone(),
            x.clone() * (y.clone() - z.clone()),
        );
        check(
            y.clone() * x.clone() - z.clone() * x.clone(),
            x.clone() * (y.clone() - z.clone()),
        );
    }

    #[test]
    fn multiplication_rules() {
        let x = Expr::var("x");
        check(x.clone() * 0, Expr::int(0));
        check(0 * x.clone(), Expr::int(0));
        check(x.clone() * 1, x.clone());
        check(1 * x.clone(), x.clone());
        check(Expr::float(2.0) * 4.0, Expr::float(8.0));
        check(Expr::int(2) * 4, Expr::int(8));
        check((3 * x.clone()) * 4, x.clone() * 12);
        check(4 * (3 + x.clone()), x.clone() * 4 + 12);
        check(
            Expr::broadcast(Expr::int(3), 3) * Expr::broadcast(Expr::int(2), 3),
            Expr::broadcast(Expr::int(6), 3),
        );
    }

    #[test]
    fn division_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let xf = cast(Type::F32, x.clone());
        check(0 / x.clone(), Expr::int(0));
        check(x.clone() / 1, x.clone());
        check(x.clone() / x.clone(), Expr::int(1));
        check(Expr::int(7) / 3, Expr::int(2));
        check(Expr::float(6.0) / 2.0, Expr::float(3.0));
        check((x.clone() / 3) / 4, x.clone() / 12);
        check((x.clone() * 4) / 2, x.clone() * 2);
        check((x.clone() * 2) / 4, x.clone() / 2);
        check((x.clone() * 4 + y.clone()) / 2, x.clone() * 2 + y.clone() / 2);
        check((y.clone() + x.clone() * 4) / 2, y.clone() / 2 + x.clone() * 2);
        check((x.clone() * 4 - y.clone()) / 2, x.clone() * 2 - y.clone() / 2);
        check((y.clone() - x.clone() * 4) / 2, y.clone() / 2 - x.clone() * 2);
        check(xf.clone() / 4.0f32, xf * 0.25f32);
        check(
            Expr::broadcast(y.clone(), 4) / Expr::broadcast(x.clone(), 4),
            Expr::broadcast(y.clone() / x.clone(), 4),
        );
        check(
            Expr::ramp(x.clone(), Expr::int(4), 4) / Expr::broadcast(Expr::int(2), 4),
            Expr::ramp(x.clone() / 2, Expr::int(2), 4),
        );
    }

    #[test]
    fn modulus_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        check(Expr::int(7) % 2, Expr::int(1));
        check(Expr::float(7.25) % 2.0f32, Expr::float(1.25));
        check(Expr::float(-7.25) % 2.0f32, Expr::float(0.75));
        check(Expr::float(-7.25) % -2.0f32, Expr::float(-1.25));
        check(Expr::float(7.25) % -2.0f32, Expr::float(-0.75));
        check(
            Expr::broadcast(x.clone(), 4) % Expr::broadcast(y.clone(), 4),
            Expr::broadcast(x.clone() % y.clone(), 4),
        );
        check((x.clone() * 8) % 4, Expr::int(0));
        check((x.clone() * 8 + y.clone()) % 4, y.clone() % 4);
        check((y.clone() + x.clone() * 8) % 4, y.clone() % 4);
        check((y.clone() * 16 + 13) % 2, Expr::int(1));
        check(
            Expr::ramp(x.clone(), Expr::int(2), 4) % Expr::broadcast(Expr::int(2), 4),
            Expr::broadcast(x.clone() % 2, 4),
        );
        check(
            Expr::ramp(2 * x.clone() + 1, Expr::int(4), 4) % Expr::broadcast(Expr::int(2), 4),
            Expr::broadcast(Expr::int(1), 4),
        );
    }

    #[test]
    fn min_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        check(min(7, 3), Expr::int(3));
        check(min(4.25f32, 1.25f32), Expr::float(1.25));
        check(
            min(Expr::broadcast(x.clone(), 4), Expr::broadcast(y.clone(), 4)),
            Expr::broadcast(min(x.clone(), y.clone()), 4),
        );
        check(min(x.clone(), x.clone() + 3), x.clone());
        check(min(x.clone() + 4, x.clone()), x.clone());
        check(min(x.clone() - 1, x.clone() + 2), x.clone() + (-1));
        check(min(7, min(x.clone(), 3)), min(x.clone(), 3));
        check(min(min(x.clone(), y.clone()), x.clone()), min(x.clone(), y.clone()));
        check(min(min(x.clone(), y.clone()), y.clone()), min(x.clone(), y.clone()));
        check(min(x.clone(), min(x.clone(), y.clone())), min(x.clone(), y.clone()));
        check(min(y.clone(), min(x.clone(), y.clone())), min(x.clone(), y.clone()));
    }

    #[test]
    fn nested_clamp_collapse() {
        let options = crate::options::Options {
            simplify_nested_clamp: true,
            ..Default::default()
        };
        let cc = CompilerContext::with_options(options);
        let x = Expr::var("x");
        check_with(
            &cc,
            min(max(min(x.clone(), 18), 7), 21),
            min(max(x.clone(), 7), 18),
        );
        check_with(&cc, min(max(x.clone(), 5), 3), Expr::int(3));
        check_with(
            &cc,
            max(min(max(x.clone(), 5), 15), 7),
            max(min(x.clone(), 15), 7),
        );
        check_with(&cc, max(min(x.clone(), 7), 9), Expr::int(9));
    }

    #[test]
    fn max_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        check(max(7, 3), Expr::int(7));
        check(max(4.25f32, 1.25f32), Expr::float(4.25));
        check(
            max(Expr::broadcast(x.clone(), 4), Expr::broadcast(y.clone(), 4)),
            Expr::broadcast(max(x.clone(), y.clone()), 4),
        );
        check(max(x.clone(), x.clone() + 3), x.clone() + 3);
        check(max(x.clone() + 4, x.clone()), x.clone() + 4);
        check(max(x.clone() - 1, x.clone() + 2), x.clone() + 2);
        check(max(7, max(x.clone(), 3)), max(x.clone(), 7));
        check(max(max(x.clone(), y.clone()), x.clone()), max(x.clone(), y.clone()));
        check(max(max(x.clone(), y.clone()), y.clone()), max(x.clone(), y.clone()));
        check(max(x.clone(), max(x.clone(), y.clone())), max(x.clone(), y.clone()));
        check(max(y.clone(), max(x.clone(), y.clone())), max(x.clone(), y.clone()));
    }

    #[test]
    fn type_extrema() {
        let x = Expr::var("x");
        check(le(x.clone(), i32::MAX), const_true());
        check(
            ge(cast(Type::int(16), x.clone()), Type::int(16).imin()),
            const_true(),
        );
        check(lt(x.clone(), i32::MIN), const_false());
        check(
            min(cast(Type::uint(16), x.clone()), cast(Type::uint(16), Expr::int(65535))),
            cast(Type::uint(16), x.clone()),
        );
        check(min(x.clone(), i32::MAX), x.clone());
        check(min(i32::MIN, x.clone()), Expr::int(i32::MIN));
        check(
            max(cast(Type::int(8), x.clone()), cast(Type::int(8), Expr::int(-128))),
            cast(Type::int(8), x.clone()),
        );
        check(max(x.clone(), i32::MIN), x.clone());
        check(max(x.clone(), i32::MAX), Expr::int(i32::MAX));
        // A near-extreme must not trigger the rule.
        check(
            max(cast(Type::int(8), x.clone()), cast(Type::int(8), Expr::int(-127))),
            max(cast(Type::int(8), x.clone()), cast(Type::int(8), Expr::int(-127))),
        );
    }

    #[test]
    fn equality_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let z = Expr::var("z");
        let t = const_true();
        let f = const_false();
        check(ops::eq(x.clone(), x.clone()), t.clone());
        check(ops::eq(x.clone(), x.clone() + 1), f.clone());
        check(ops::eq(x.clone() - 2, y.clone() + 3), ops::eq(x.clone(), y.clone() + 5));
        check(ops::eq(x.clone() + y.clone(), y.clone() + z.clone()), ops::eq(x.clone(), z.clone()));
        check(ops::eq(y.clone() + x.clone(), y.clone() + z.clone()), ops::eq(x.clone(), z.clone()));
        check(
            ops::eq((y.clone() + x.clone()) * 17, (z.clone() + y.clone()) * 17),
            ops::eq(x.clone(), z.clone()),
        );
        check(ops::eq(x.clone() * 0, y.clone() * 0), t.clone());
        check(ops::eq(x.clone(), x.clone() + y.clone()), ops::eq(y.clone(), 0));
        check(ops::eq(x.clone() + y.clone(), x.clone()), ops::eq(y.clone(), 0));
    }

    #[test]
    fn comparison_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let z = Expr::var("z");
        let t = const_true();
        let f = const_false();
        check(lt(x.clone(), x.clone()), f.clone());
        check(lt(x.clone(), x.clone() + 1), t.clone());
        check(lt(x.clone() - 2, y.clone() + 3), lt(x.clone(), y.clone() + 5));
        check(lt(x.clone() + y.clone(), y.clone() + z.clone()), lt(x.clone(), z.clone()));
        check(
            lt((y.clone() + x.clone()) * 17, (z.clone() + y.clone()) * 17),
            lt(x.clone(), z.clone()),
        );
        check(lt(x.clone() * 0, y.clone() * 0), f.clone());
        check(lt(x.clone(), x.clone() + y.clone()), lt(0, y.clone()));
        check(lt(x.clone() + y.clone(), x.clone()), lt(y.clone(), 0));
    }

    #[test]
    fn vector_comparisons() {
        check(
            lt(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::broadcast(Expr::int(8), 8),
            ),
            const_true_of(8),
        );
        check(
            ops::gt(
                Expr::ramp(Expr::int(0), Expr::int(-1), 8),
                Expr::broadcast(Expr::int(1), 8),
            ),
            const_false_of(8),
        );
        check(
            min(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::ramp(Expr::int(2), Expr::int(1), 8),
            ),
            Expr::ramp(Expr::int(0), Expr::int(1), 8),
        );
        check(
            min(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::broadcast(Expr::int(0), 8),
            ),
            Expr::broadcast(Expr::int(0), 8),
        );
        check(
            max(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::ramp(Expr::int(2), Expr::int(1), 8),
            ),
            Expr::ramp(Expr::int(2), Expr::int(1), 8),
        );
        check(
            max(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::broadcast(Expr::int(0), 8),
            ),
            Expr::ramp(Expr::int(0), Expr::int(1), 8),
        );
        // Partially overlapping vectors cannot be resolved.
        check(
            max(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::broadcast(Expr::int(1), 8),
            ),
            max(
                Expr::ramp(Expr::int(0), Expr::int(1), 8),
                Expr::broadcast(Expr::int(1), 8),
            ),
        );
    }

    #[test]
    fn select_rules() {
        let x = Expr::var("x");
        check(select(lt(x.clone(), 3), 2, 2), Expr::int(2));
        check(select(lt(x.clone(), x.clone() + 1), 9, 2), Expr::int(9));
        check(select(ops::gt(x.clone(), x.clone() + 1), 9, 2), Expr::int(2));
        // Selects of comparisons normalise to selects of LT or EQ.
        check(
            select(ops::ne(x.clone(), 5), 2, 3),
            select(ops::eq(x.clone(), 5), 3, 2),
        );
        check(
            select(ge(x.clone(), 5), 2, 3),
            select(lt(x.clone(), 5), 3, 2),
        );
        check(
            select(le(x.clone(), 5), 2, 3),
            select(lt(5, x.clone()), 3, 2),
        );
        check(
            select(ops::gt(x.clone(), 5), 2, 3),
            select(lt(5, x.clone()), 2, 3),
        );
    }

    #[test]
    fn boolean_rules() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let t = const_true();
        let f = const_false();
        check(!f.clone(), t.clone());
        check(!t.clone(), f.clone());
        check(!lt(x.clone(), y.clone()), le(y.clone(), x.clone()));
        check(!ops::gt(x.clone(), y.clone()), le(x.clone(), y.clone()));
        check(!ge(x.clone(), y.clone()), lt(x.clone(), y.clone()));
        check(!le(x.clone(), y.clone()), lt(y.clone(), x.clone()));
        check(!ops::eq(x.clone(), y.clone()), ops::ne(x.clone(), y.clone()));
        check(!ops::ne(x.clone(), y.clone()), ops::eq(x.clone(), y.clone()));
        check(!!ops::eq(x.clone(), 0), ops::eq(x.clone(), 0));
        check(
            !Expr::broadcast(ops::gt(x.clone(), y.clone()), 4),
            Expr::broadcast(le(x.clone(), y.clone()), 4),
        );
        check(ops::and(t.clone(), lt(x.clone(), 0)), lt(x.clone(), 0));
        check(ops::and(f.clone(), lt(x.clone(), 0)), f.clone());
        check(ops::or(t.clone(), lt(x.clone(), 0)), t.clone());
        check(ops::or(f.clone(), lt(x.clone(), 0)), lt(x.clone(), 0));
    }

    #[test]
    fn let_substitution() {
        let x = Expr::var("x");
        check(
            Expr::let_in("x", Expr::int(3), x.clone() + 4),
            Expr::let_in("x", Expr::int(3), Expr::int(7)),
        );
        // Values must not jump into inner lets that rebind the name.
        let y = Expr::var("y");
        check(
            Expr::let_in(
                "x",
                Expr::int(3),
                Expr::let_in("x", y.clone(), x.clone() + 4) + x.clone(),
            ),
            Expr::let_in(
                "x",
                Expr::int(3),
                Expr::let_in("x", y.clone(), y.clone() + 4) + 3,
            ),
        );
    }

    #[test]
    fn let_vector_values_push_inwards() {
        let x = Expr::var("x");
        let vec = Expr::var_typed(Type::I32.vector_of(4), "vec");

        // Ramp values get a wrapper let for the scalar base.
        let cc = CompilerContext::new();
        let e = Expr::let_in(
            "vec",
            Expr::ramp(x.clone() * 2 + 7, Expr::int(3), 4),
            vec.clone() + Expr::broadcast(Expr::int(2), 4),
        );
        let expected = Expr::let_in(
            "vec.base.0",
            x.clone() * 2 + 7,
            Expr::let_in(
                "vec",
                Expr::ramp(x.clone() * 2 + 7, Expr::int(3), 4),
                Expr::ramp(Expr::var("vec.base.0") + 2, Expr::int(3), 4),
            ),
        );
        check_with(&cc, e, expected);

        // Broadcast values get a wrapper let for the scalar value.
        let cc = CompilerContext::new();
        let e = Expr::let_in(
            "vec",
            Expr::broadcast(x.clone(), 4),
            vec.clone() + Expr::broadcast(Expr::int(2), 4),
        );
        let expected = Expr::let_in(
            "vec.value.0",
            x.clone(),
            Expr::let_in(
                "vec",
                Expr::broadcast(x.clone(), 4),
                Expr::broadcast(Expr::var("vec.value.0") + 2, 4),
            ),
        );
        check_with(&cc, e, expected);
    }

    #[test]
    fn lift_let_hoists_out_of_loops() {
        let options = crate::options::Options {
            lift_let: true,
            ..Default::default()
        };
        let cc = CompilerContext::with_options(options);
        let x = Expr::var("x");
        let t = Expr::var("t");
        let s = Stmt::for_loop(
            "i",
            Expr::int(0),
            Expr::int(10),
            crate::ir::ForKind::Serial,
            Stmt::let_stmt("t", x.clone() + 1, Stmt::store("buf", t.clone(), Expr::int(0))),
        );
        let r = simplify_stmt(&cc, &s);
        let expected = Stmt::let_stmt(
            "t",
            x.clone() + 1,
            Stmt::for_loop(
                "i",
                Expr::int(0),
                Expr::int(10),
                crate::ir::ForKind::Serial,
                Stmt::store("buf", t.clone(), Expr::int(0)),
            ),
        );
        assert!(crate::equality::equal_stmt(&r, &expected), "got:\n{r}");

        // The loop variable's own binding must not move.
        let s = Stmt::for_loop(
            "i",
            Expr::int(0),
            Expr::int(10),
            crate::ir::ForKind::Serial,
            Stmt::let_stmt("i", x.clone() + 1, Stmt::store("buf", t.clone(), Expr::int(0))),
        );
        let r = simplify_stmt(&cc, &s);
        assert!(matches!(r.kind(), StmtKind::For { .. }));
    }

    #[test]
    fn proved_inequalities() {
        let x = Expr::var("x");
        check_proved(le(min(max(x.clone(), 1), 10), 10));
        check_proved(ge(min(max(x.clone(), 1), 10), 1));
        check_proved(le(min(x.clone(), 1953) + -2 + -1, x.clone() + -1));
    }

    #[test]
    fn proved_reports_disproof() {
        let cc = CompilerContext::new();
        let (p, d) = proved_with_disproof(&cc, &lt(Expr::int(3), Expr::int(2)));
        assert!(!p);
        assert!(d);
        let (p, d) = proved_with_disproof(&cc, &lt(Expr::var("x"), Expr::int(2)));
        pa_assert_eq!((p, d), (false, false));
    }

    #[test]
    fn clamp_is_untouched_without_bounds() {
        // The pure simplifier leaves border handlers alone; eliding them
        // needs bounds analysis.
        let x = Expr::var("x");
        let e = clamp(x.clone(), 0, 10);
        let cc = CompilerContext::new();
        let r = simplify(&cc, &e);
        assert!(r.same_as(&e));
    }

    #[test]
    #[should_panic(expected = "Conflicting infinity")]
    fn conflicting_infinities_abort() {
        let cc = CompilerContext::new();
        let e = Expr::infinity(Type::I32, 1) + Expr::infinity(Type::I32, -1);
        let _ = simplify(&cc, &e);
    }

    #[test]
    fn infinity_arithmetic() {
        let cc = CompilerContext::new();
        let x = Expr::var("x");
        let pos = Expr::infinity(Type::I32, 1);
        let neg = Expr::infinity(Type::I32, -1);
        assert!(equal(&simplify(&cc, &(x.clone() + pos.clone())), &pos));
        assert!(equal(&simplify(&cc, &(x.clone() - pos.clone())), &neg));
        assert!(equal(&simplify(&cc, &min(x.clone(), neg.clone())), &neg));
        assert!(equal(&simplify(&cc, &max(x.clone(), pos.clone())), &pos));
        assert!(equal(&simplify(&cc, &min(x.clone(), pos.clone())), &x));
        assert!(equal(&simplify(&cc, &max(x.clone(), neg.clone())), &x));
        check(lt(x.clone(), Expr::infinity(Type::I32, 1)), const_true());
        check(lt(Expr::infinity(Type::I32, 1), x.clone()), const_false());
        check(
            simplify(&cc, &(pos.clone() * Expr::int(-3))),
            neg.clone(),
        );
        check(simplify(&cc, &(x.clone() / pos.clone())), Expr::int(0));
    }
}
