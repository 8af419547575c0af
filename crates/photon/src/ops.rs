//! Operator overloads and expression-building helpers.
//!
//! The node constructors in [`crate::ir`] demand exact type agreement; the
//! functions here are the ergonomic layer that coerces operand types
//! ([`match_types`]) before constructing nodes, plus the constant predicates
//! and folding primitives shared by every analysis.
//!
//! Integer division and modulus round toward negative infinity, so the
//! remainder always carries the sign of the divisor.

use num_integer::Integer;

use crate::{
    ir::{ClampKind, Expr, ExprKind},
    ty::{Type, TypeKind},
};

/// Is the expression a constant (possibly under casts, ramps, broadcasts)?
pub fn is_const(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::IntImm(_) | ExprKind::FloatImm(_) => true,
        ExprKind::Cast(v) => is_const(v),
        ExprKind::Ramp { base, stride, .. } => is_const(base) && is_const(stride),
        ExprKind::Broadcast { value, .. } => is_const(value),
        _ => false,
    }
}

fn is_const_value(e: &Expr, value: i32) -> bool {
    match e.kind() {
        ExprKind::IntImm(v) => *v == value,
        ExprKind::FloatImm(v) => *v == value as f32,
        ExprKind::Cast(v) => is_const_value(v, value),
        ExprKind::Broadcast { value: v, .. } => is_const_value(v, value),
        _ => false,
    }
}

pub fn is_zero(e: &Expr) -> bool {
    is_const_value(e, 0)
}

pub fn is_one(e: &Expr) -> bool {
    is_const_value(e, 1)
}

pub fn is_two(e: &Expr) -> bool {
    is_const_value(e, 2)
}

pub fn is_positive_const(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::IntImm(v) => *v > 0,
        ExprKind::FloatImm(v) => *v > 0.0,
        ExprKind::Cast(v) => is_positive_const(v),
        // Conservative for ramps: both ends positive.
        ExprKind::Ramp { base, stride, .. } => is_positive_const(base) && is_positive_const(stride),
        ExprKind::Broadcast { value, .. } => is_positive_const(value),
        _ => false,
    }
}

pub fn is_negative_const(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::IntImm(v) => *v < 0,
        ExprKind::FloatImm(v) => *v < 0.0,
        ExprKind::Cast(v) => is_negative_const(v),
        ExprKind::Ramp { base, stride, .. } => is_negative_const(base) && is_negative_const(stride),
        ExprKind::Broadcast { value, .. } => is_negative_const(value),
        _ => false,
    }
}

/// Fetch an integer constant, looking through casts (canonicalising the value
/// to the cast type), integral float constants and broadcasts.
pub fn get_const_int(e: &Expr) -> Option<i32> {
    match e.kind() {
        ExprKind::IntImm(v) => Some(*v),
        ExprKind::FloatImm(v) => {
            let ival = *v as i32;
            (ival as f32 == *v).then_some(ival)
        }
        ExprKind::Cast(v) => {
            let inner = get_const_int(v)?;
            let t = e.ty();
            if t.is_int() || t.is_uint() {
                let cval = int_cast_constant(t, inner);
                // A 32-bit unsigned constant above i32::MAX has no faithful
                // canonical int form.
                if t.is_uint() && cval < 0 {
                    return None;
                }
                Some(cval)
            } else if t.is_float() {
                Some(inner)
            } else {
                None
            }
        }
        ExprKind::Broadcast { value, .. } => get_const_int(value),
        _ => None,
    }
}

/// Force an integer constant into the canonical range of an integer type
/// using two's-complement truncation (mask for unsigned, sign extension for
/// signed).
pub fn int_cast_constant(t: Type, val: i32) -> i32 {
    match t.kind {
        TypeKind::UInt => {
            if t.bits < 32 {
                val & ((1i32 << t.bits) - 1)
            } else {
                val
            }
        }
        TypeKind::Int => {
            if t.bits < 32 {
                (val << (32 - t.bits)) >> (32 - t.bits)
            } else {
                val
            }
        }
        _ => panic!("Cast of integer to non-integer not available here"),
    }
}

/// Floor division: quotient rounds toward negative infinity.
pub fn div_imp(a: i32, b: i32) -> i32 {
    a.div_floor(&b)
}

/// Floor modulus: result has the sign of the divisor.
pub fn mod_imp(a: i32, b: i32) -> i32 {
    a.mod_floor(&b)
}

pub fn div_imp_f32(a: f32, b: f32) -> f32 {
    a / b
}

/// Float modulus with the same convention as the integer one: the result has
/// the sign of the divisor.
pub fn mod_imp_f32(a: f32, b: f32) -> f32 {
    a - (a / b).floor() * b
}

/// A constant of the given type. Vector types broadcast; non-i32/f32 scalars
/// are canonicalised casts of the scalar constant.
pub fn make_const(t: Type, val: i32) -> Expr {
    if t == Type::I32 {
        return Expr::int(val);
    }
    if t == Type::F32 {
        return Expr::float(val as f32);
    }
    if t.is_vector() {
        return Expr::broadcast(make_const(t.element_of(), val), t.width);
    }
    if t.is_int() || t.is_uint() {
        return Expr::cast(t, Expr::int(int_cast_constant(t, val)));
    }
    Expr::cast(t, Expr::int(val))
}

pub fn make_zero(t: Type) -> Expr {
    make_const(t, 0)
}

pub fn make_one(t: Type) -> Expr {
    make_const(t, 1)
}

pub fn make_two(t: Type) -> Expr {
    make_const(t, 2)
}

pub fn make_bool(val: bool, width: u16) -> Expr {
    make_const(Type::bool_of(width), i32::from(val))
}

pub fn const_true() -> Expr {
    make_bool(true, 1)
}

pub fn const_false() -> Expr {
    make_bool(false, 1)
}

pub fn const_true_of(width: u16) -> Expr {
    make_bool(true, width)
}

pub fn const_false_of(width: u16) -> Expr {
    make_bool(false, width)
}

/// Infinity of the given type and direction. Infinity is native to all
/// types, including vectors.
pub fn make_infinity(t: Type, count: i32) -> Expr {
    Expr::infinity(t, count)
}

/// The type's largest representable value as a constant of the type.
pub fn type_max(t: Type) -> Expr {
    make_const(t, t.imax())
}

/// The type's smallest representable value as a constant of the type.
pub fn type_min(t: Type) -> Expr {
    make_const(t, t.imin())
}

/// Recognise an Infinity node (possibly under casts and broadcasts) and
/// return its signed count; zero if the expression is not an infinity.
pub fn infinity_count(e: &Expr) -> i32 {
    match e.kind() {
        ExprKind::Infinity { count } => *count,
        ExprKind::Cast(v) => infinity_count(v),
        ExprKind::Broadcast { value, .. } => infinity_count(value),
        _ => 0,
    }
}

/// Coerce two operands to a common type before constructing a binary node.
///
/// Scalars broadcast against vectors; Infinity adopts the other operand's
/// type; ints widen to floats; constants adopt the non-constant operand's
/// integer type; otherwise the wider integer wins, signed if the kinds mix.
pub fn match_types(a: Expr, b: Expr) -> (Expr, Expr) {
    let (mut a, mut b) = (a, b);
    if a.ty() == b.ty() {
        return (a, b);
    }

    if a.ty().is_scalar() && b.ty().is_vector() {
        a = Expr::broadcast(a, b.ty().width);
    } else if a.ty().is_vector() && b.ty().is_scalar() {
        b = Expr::broadcast(b, a.ty().width);
    } else {
        assert!(
            a.ty().width == b.ty().width,
            "Can't match types of differing widths"
        );
    }

    let (ta, tb) = (a.ty(), b.ty());
    if ta == tb {
        return (a, b);
    }

    if infinity_count(&a) != 0 {
        // The type of Infinity is weak and gives way to the other type.
        (cast(tb, a), b)
    } else if infinity_count(&b) != 0 {
        let t = ta;
        (a, cast(t, b))
    } else if !ta.is_float() && tb.is_float() {
        (cast(tb, a), b)
    } else if ta.is_float() && !tb.is_float() {
        let t = ta;
        (a, cast(t, b))
    } else if ta.is_float() && tb.is_float() {
        if ta.bits > tb.bits {
            let t = ta;
            (a, cast(t, b))
        } else {
            (cast(tb, a), b)
        }
    } else if is_const(&b) {
        let t = ta;
        (a, cast(t, b))
    } else if is_const(&a) {
        (cast(tb, a), b)
    } else if ta.is_uint() && tb.is_uint() {
        if ta.bits > tb.bits {
            let t = ta;
            (a, cast(t, b))
        } else {
            (cast(tb, a), b)
        }
    } else {
        let bits = ta.bits.max(tb.bits);
        let t = Type::int(bits).vector_of(ta.width);
        (cast(t, a), cast(t, b))
    }
}

/// Cast, short-circuiting identity casts and broadcasting a scalar into a
/// vector target type.
pub fn cast(t: Type, e: Expr) -> Expr {
    if e.ty() == t {
        return e;
    }
    if t.is_vector() && e.ty().is_scalar() {
        return Expr::broadcast(cast(t.element_of(), e), t.width);
    }
    Expr::cast(t, e)
}

pub fn min(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::min(a, b)
}

pub fn max(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::max(a, b)
}

/// The ordinary clamp border handler: values outside `[lo, hi]` move to the
/// nearest limit.
pub fn clamp(a: impl Into<Expr>, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Expr {
    let a = a.into();
    let t = a.ty();
    let lo = cast(t, lo.into());
    let hi = cast(t, hi.into());
    let zero = make_zero(t);
    Expr::clamp(ClampKind::Replicate, a, lo, hi, zero)
}

/// A clamp node of the given border kind with the same limit handling as
/// [`clamp`].
pub fn clamp_of(kind: ClampKind, a: impl Into<Expr>, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Expr {
    let a = a.into();
    let t = a.ty();
    let lo = cast(t, lo.into());
    let hi = cast(t, hi.into());
    let zero = make_zero(t);
    Expr::clamp(kind, a, lo, hi, zero)
}

/// The no-op border handler: domain inference copies the valid domain into
/// the computable slot.
pub fn clamp_none(a: impl Into<Expr>) -> Expr {
    let a = a.into();
    let t = a.ty();
    let zero = make_zero(t);
    Expr::clamp(ClampKind::None, a, zero.clone(), zero.clone(), zero)
}

pub fn select(condition: impl Into<Expr>, t: impl Into<Expr>, f: impl Into<Expr>) -> Expr {
    let (t, f) = match_types(t.into(), f.into());
    Expr::select(condition.into(), t, f)
}

pub fn eq(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::eq(a, b)
}

pub fn ne(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::ne(a, b)
}

pub fn lt(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::lt(a, b)
}

pub fn le(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::le(a, b)
}

pub fn gt(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::gt(a, b)
}

pub fn ge(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    let (a, b) = match_types(a.into(), b.into());
    Expr::ge(a, b)
}

pub fn and(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::and(a.into(), b.into())
}

pub fn or(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::or(a.into(), b.into())
}

/// Absolute value, expressed as a call to the externally defined kernel for
/// the operand type.
pub fn abs(e: impl Into<Expr>) -> Expr {
    let e = e.into();
    let t = e.ty();
    let name = if t.is_float() {
        format!("abs_f{}", t.bits)
    } else {
        format!("abs_i{}", t.bits)
    };
    Expr::call_extern(t, name, [e])
}

/// Sine over a float operand; integer operands are widened to `Float(32)`.
pub fn sin(e: impl Into<Expr>) -> Expr {
    let e = e.into();
    let e = if e.ty().is_float() { e } else { cast(Type::F32, e) };
    let t = e.ty();
    Expr::call_extern(t, format!("sin_f{}", t.bits), [e])
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $build:path) => {
        impl<T: Into<Expr>> std::ops::$trait<T> for Expr {
            type Output = Expr;
            fn $method(self, rhs: T) -> Expr {
                let (a, b) = match_types(self, rhs.into());
                $build(a, b)
            }
        }

        impl<T: Into<Expr>> std::ops::$trait<T> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: T) -> Expr {
                let (a, b) = match_types(self.clone(), rhs.into());
                $build(a, b)
            }
        }

        impl std::ops::$trait<Expr> for i32 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                let (a, b) = match_types(Expr::int(self), rhs);
                $build(a, b)
            }
        }

        impl std::ops::$trait<&Expr> for i32 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                let (a, b) = match_types(Expr::int(self), rhs.clone());
                $build(a, b)
            }
        }

        impl std::ops::$trait<Expr> for f32 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                let (a, b) = match_types(Expr::float(self), rhs);
                $build(a, b)
            }
        }
    };
}

binary_op!(Add, add, Expr::add);
binary_op!(Sub, sub, Expr::sub);
binary_op!(Mul, mul, Expr::mul);
binary_op!(Div, div, Expr::div);
binary_op!(Rem, rem, Expr::modulo);

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        let zero = make_zero(self.ty());
        Expr::sub(zero, self)
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        -self.clone()
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::not(self)
    }
}

impl std::ops::Not for &Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::not(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn floor_division() {
        assert_eq!(div_imp(23, 4), 5);
        assert_eq!(div_imp(-23, 4), -6);
        assert_eq!(div_imp(-23, -4), 5);
        assert_eq!(div_imp(23, -4), -6);
        assert_eq!(mod_imp(23, 4), 3);
        assert_eq!(mod_imp(-23, 4), 1);
        assert_eq!(mod_imp(-23, -4), -3);
        assert_eq!(mod_imp(23, -4), -1);
    }

    #[test]
    fn narrowing_casts() {
        assert_eq!(int_cast_constant(Type::int(8), 128), -128);
        assert_eq!(int_cast_constant(Type::uint(8), -1), 255);
        assert_eq!(int_cast_constant(Type::int(16), 65000), -536);
        assert_eq!(int_cast_constant(Type::uint(16), 128000), 62464);
        assert_eq!(int_cast_constant(Type::uint(16), -53), 65483);
        assert_eq!(int_cast_constant(Type::uint(32), -53), -53);
        assert_eq!(int_cast_constant(Type::int(32), -53), -53);
    }

    #[test]
    fn float_modulus_has_divisor_sign() {
        assert_eq!(mod_imp_f32(7.25, 2.0), 1.25);
        assert_eq!(mod_imp_f32(-7.25, 2.0), 0.75);
        assert_eq!(mod_imp_f32(-7.25, -2.0), -1.25);
        assert_eq!(mod_imp_f32(7.25, -2.0), -0.75);
    }

    #[test]
    fn type_coercion() {
        let x = Expr::var("x");
        let e = x + 1;
        assert_eq!(e.ty(), Type::I32);
        let v = Expr::broadcast(Expr::int(0), 4);
        let e = v + 1;
        assert_eq!(e.ty(), Type::I32.vector_of(4));
    }

    #[quickcheck]
    fn div_mod_reconstructs(a: i32, b: i32) -> bool {
        if b == 0 || (a == i32::MIN && b == -1) {
            return true;
        }
        div_imp(a, b).wrapping_mul(b).wrapping_add(mod_imp(a, b)) == a
    }

    #[quickcheck]
    fn mod_sign_follows_divisor(a: i32, b: i32) -> bool {
        if b == 0 || (a == i32::MIN && b == -1) {
            return true;
        }
        let m = mod_imp(a, b);
        if b > 0 { (0..b).contains(&m) } else { m <= 0 && m > b }
    }

    #[quickcheck]
    fn narrowing_is_idempotent(v: i32) -> bool {
        for t in [Type::int(8), Type::uint(8), Type::int(16), Type::uint(16)] {
            let once = int_cast_constant(t, v);
            if int_cast_constant(t, once) != once {
                return false;
            }
        }
        true
    }
}
