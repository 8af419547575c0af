//! Modular-arithmetic facts about integer expressions.
//!
//! A [`ModulusRemainder`] states that an expression is congruent to
//! `remainder` modulo `modulus`. `modulus == 0` means the value is exactly
//! `remainder`; `modulus == 1` means nothing is known. The simplifier keeps
//! these facts for integer `Let` values and uses them to elide modulus
//! operations such as `(x*8 + 3) % 4`.

use num_integer::Integer;

use crate::{ir::ExprKind, ops, scope::Scope, Expr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulusRemainder {
    pub modulus: i64,
    pub remainder: i64,
}

impl ModulusRemainder {
    pub fn new(modulus: i64, remainder: i64) -> Self {
        Self { modulus, remainder }
    }

    /// The "know nothing" element.
    pub fn unknown() -> Self {
        Self::new(1, 0)
    }

    fn constant(v: i64) -> Self {
        Self::new(0, v)
    }

    fn reduce(modulus: i64, remainder: i64) -> Self {
        let modulus = modulus.abs();
        if modulus == 0 {
            Self::new(0, remainder)
        } else {
            Self::new(modulus, remainder.mod_floor(&modulus))
        }
    }
}

fn gcd3(a: i64, b: i64, c: i64) -> i64 {
    a.abs().gcd(&b.abs()).gcd(&c.abs())
}

/// Compute the modulus/remainder fact for `e`, consulting `scope` for facts
/// about let-bound names. Sound for any input; unknown constructs yield
/// `(1, 0)`.
pub fn modulus_remainder(e: &Expr, scope: &Scope<ModulusRemainder>) -> ModulusRemainder {
    match e.kind() {
        ExprKind::IntImm(v) => ModulusRemainder::constant(i64::from(*v)),
        ExprKind::Variable { name, .. } => scope
            .get(name)
            .copied()
            .unwrap_or_else(ModulusRemainder::unknown),
        ExprKind::Add(a, b) => {
            let ma = modulus_remainder(a, scope);
            let mb = modulus_remainder(b, scope);
            if ma.modulus == 0 && mb.modulus == 0 {
                ModulusRemainder::constant(ma.remainder + mb.remainder)
            } else {
                ModulusRemainder::reduce(
                    ma.modulus.gcd(&mb.modulus),
                    ma.remainder + mb.remainder,
                )
            }
        }
        ExprKind::Sub(a, b) => {
            let ma = modulus_remainder(a, scope);
            let mb = modulus_remainder(b, scope);
            if ma.modulus == 0 && mb.modulus == 0 {
                ModulusRemainder::constant(ma.remainder - mb.remainder)
            } else {
                ModulusRemainder::reduce(
                    ma.modulus.gcd(&mb.modulus),
                    ma.remainder - mb.remainder,
                )
            }
        }
        ExprKind::Mul(a, b) => {
            let ma = modulus_remainder(a, scope);
            let mb = modulus_remainder(b, scope);
            if ma.modulus == 0 && mb.modulus == 0 {
                ModulusRemainder::constant(ma.remainder * mb.remainder)
            } else {
                // a = ma·x + ra, b = mb·y + rb, so
                // a·b ≡ ra·rb (mod gcd(ma·mb, ma·rb, mb·ra)).
                ModulusRemainder::reduce(
                    gcd3(
                        ma.modulus * mb.modulus,
                        ma.modulus * mb.remainder,
                        mb.modulus * ma.remainder,
                    ),
                    ma.remainder * mb.remainder,
                )
            }
        }
        ExprKind::Div(a, b) => {
            let ma = modulus_remainder(a, scope);
            let mb = modulus_remainder(b, scope);
            if ma.modulus == 0 && mb.modulus == 0 && mb.remainder != 0 {
                ModulusRemainder::constant(ma.remainder.div_floor(&mb.remainder))
            } else {
                ModulusRemainder::unknown()
            }
        }
        ExprKind::Mod(a, b) => {
            let ma = modulus_remainder(a, scope);
            let mb = modulus_remainder(b, scope);
            if ma.modulus == 0 && mb.modulus == 0 && mb.remainder != 0 {
                ModulusRemainder::constant(ma.remainder.mod_floor(&mb.remainder))
            } else {
                ModulusRemainder::unknown()
            }
        }
        ExprKind::Cast(v) if e.ty() == crate::ty::Type::I32 => modulus_remainder(v, scope),
        _ => {
            // Constants under casts still carry their value.
            match ops::get_const_int(e) {
                Some(v) => ModulusRemainder::constant(i64::from(v)),
                None => ModulusRemainder::unknown(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expr;

    fn mr(e: &Expr) -> ModulusRemainder {
        modulus_remainder(e, &Scope::new())
    }

    #[test]
    fn linear_facts() {
        let x = Expr::var("x");
        assert_eq!(mr(&Expr::int(7)), ModulusRemainder::new(0, 7));
        assert_eq!(mr(&(x.clone() * 8)), ModulusRemainder::new(8, 0));
        assert_eq!(mr(&(x.clone() * 8 + 3)), ModulusRemainder::new(8, 3));
        assert_eq!(mr(&(x.clone() * 16 + 13)), ModulusRemainder::new(16, 13));
        // (x*6 + 1) + (x*4 + 2) is congruent to 3 mod 2.
        let e = (x.clone() * 6 + 1) + (x * 4 + 2);
        let got = mr(&e);
        assert_eq!(got.modulus, 2);
        assert_eq!(got.remainder, 1);
    }

    #[test]
    fn scoped_facts() {
        let mut scope = Scope::new();
        scope.push("a", ModulusRemainder::new(4, 1));
        let a = Expr::var("a");
        let got = modulus_remainder(&(a * 2 + 1), &scope);
        assert_eq!(got, ModulusRemainder::new(8, 3));
    }
}
