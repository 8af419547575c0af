//! Structural equality over IR trees.
//!
//! Pointer identity is the fast path; otherwise kind, type and children are
//! compared recursively. Solver intervals compare their bound expressions and
//! exactness; `TargetVar` sources are back-references, not children, and are
//! ignored.

use crate::{
    interval::DomInterval,
    ir::{Expr, ExprKind, Stmt, StmtKind},
};

pub fn equal(a: &Expr, b: &Expr) -> bool {
    if a.same_as(b) {
        return true;
    }
    if a.ty() != b.ty() {
        return false;
    }
    use ExprKind as K;
    match (a.kind(), b.kind()) {
        (K::IntImm(x), K::IntImm(y)) => x == y,
        (K::FloatImm(x), K::FloatImm(y)) => x == y,
        (K::Cast(x), K::Cast(y)) => equal(x, y),
        (K::Variable { name: x, .. }, K::Variable { name: y, .. }) => x == y,
        (K::Add(xa, xb), K::Add(ya, yb))
        | (K::Sub(xa, xb), K::Sub(ya, yb))
        | (K::Mul(xa, xb), K::Mul(ya, yb))
        | (K::Div(xa, xb), K::Div(ya, yb))
        | (K::Mod(xa, xb), K::Mod(ya, yb))
        | (K::Min(xa, xb), K::Min(ya, yb))
        | (K::Max(xa, xb), K::Max(ya, yb))
        | (K::Eq(xa, xb), K::Eq(ya, yb))
        | (K::Ne(xa, xb), K::Ne(ya, yb))
        | (K::Lt(xa, xb), K::Lt(ya, yb))
        | (K::Le(xa, xb), K::Le(ya, yb))
        | (K::Gt(xa, xb), K::Gt(ya, yb))
        | (K::Ge(xa, xb), K::Ge(ya, yb))
        | (K::And(xa, xb), K::And(ya, yb))
        | (K::Or(xa, xb), K::Or(ya, yb)) => equal(xa, ya) && equal(xb, yb),
        (K::Not(x), K::Not(y)) => equal(x, y),
        (
            K::Select {
                condition: xc,
                true_value: xt,
                false_value: xf,
            },
            K::Select {
                condition: yc,
                true_value: yt,
                false_value: yf,
            },
        ) => equal(xc, yc) && equal(xt, yt) && equal(xf, yf),
        (
            K::Load {
                name: xn, index: xi, ..
            },
            K::Load {
                name: yn, index: yi, ..
            },
        ) => xn == yn && equal(xi, yi),
        (
            K::Ramp {
                base: xb,
                stride: xs,
                width: xw,
            },
            K::Ramp {
                base: yb,
                stride: ys,
                width: yw,
            },
        ) => xw == yw && equal(xb, yb) && equal(xs, ys),
        (
            K::Broadcast {
                value: xv,
                width: xw,
            },
            K::Broadcast {
                value: yv,
                width: yw,
            },
        ) => xw == yw && equal(xv, yv),
        (
            K::Call {
                name: xn,
                args: xa,
                call: xc,
                func: xf,
                ..
            },
            K::Call {
                name: yn,
                args: ya,
                call: yc,
                func: yf,
                ..
            },
        ) => {
            xn == yn
                && xc == yc
                && xf == yf
                && xa.len() == ya.len()
                && xa.iter().zip(ya.iter()).all(|(x, y)| equal(x, y))
        }
        (
            K::Let {
                name: xn,
                value: xv,
                body: xb,
            },
            K::Let {
                name: yn,
                value: yv,
                body: yb,
            },
        ) => xn == yn && equal(xv, yv) && equal(xb, yb),
        (
            K::Clamp {
                clamp: xk,
                value: xv,
                min: xmin,
                max: xmax,
                tile: xt,
            },
            K::Clamp {
                clamp: yk,
                value: yv,
                min: ymin,
                max: ymax,
                tile: yt,
            },
        ) => {
            xk == yk
                && equal(xv, yv)
                && equal(xmin, ymin)
                && equal(xmax, ymax)
                && equal(xt, yt)
        }
        (
            K::Solve {
                body: xb,
                intervals: xi,
            },
            K::Solve {
                body: yb,
                intervals: yi,
            },
        ) => {
            equal(xb, yb)
                && xi.len() == yi.len()
                && xi.iter().zip(yi.iter()).all(|(x, y)| equal_interval(x, y))
        }
        (
            K::TargetVar {
                name: xn, body: xb, ..
            },
            K::TargetVar {
                name: yn, body: yb, ..
            },
        ) => xn == yn && equal(xb, yb),
        (K::Infinity { count: x }, K::Infinity { count: y }) => x.signum() == y.signum(),
        _ => false,
    }
}

pub fn equal_interval(a: &DomInterval, b: &DomInterval) -> bool {
    a.exact == b.exact && equal(&a.min, &b.min) && equal(&a.max, &b.max)
}

pub fn equal_stmt(a: &Stmt, b: &Stmt) -> bool {
    if a.same_as(b) {
        return true;
    }
    use StmtKind as K;
    match (a.kind(), b.kind()) {
        (
            K::LetStmt {
                name: xn,
                value: xv,
                body: xb,
            },
            K::LetStmt {
                name: yn,
                value: yv,
                body: yb,
            },
        ) => xn == yn && equal(xv, yv) && equal_stmt(xb, yb),
        (
            K::AssertStmt {
                condition: xc,
                message: xm,
            },
            K::AssertStmt {
                condition: yc,
                message: ym,
            },
        ) => xm == ym && equal(xc, yc),
        (
            K::PrintStmt {
                prefix: xp,
                args: xa,
            },
            K::PrintStmt {
                prefix: yp,
                args: ya,
            },
        ) => {
            xp == yp && xa.len() == ya.len() && xa.iter().zip(ya.iter()).all(|(x, y)| equal(x, y))
        }
        (
            K::Pipeline {
                name: xn,
                produce: xp,
                update: xu,
                consume: xc,
            },
            K::Pipeline {
                name: yn,
                produce: yp,
                update: yu,
                consume: yc,
            },
        ) => {
            xn == yn
                && equal_stmt(xp, yp)
                && equal_stmt(xc, yc)
                && match (xu, yu) {
                    (Some(x), Some(y)) => equal_stmt(x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        (
            K::For {
                name: xn,
                min: xm,
                extent: xe,
                for_kind: xk,
                body: xb,
                ..
            },
            K::For {
                name: yn,
                min: ym,
                extent: ye,
                for_kind: yk,
                body: yb,
                ..
            },
        ) => xn == yn && xk == yk && equal(xm, ym) && equal(xe, ye) && equal_stmt(xb, yb),
        (
            K::Store {
                name: xn,
                value: xv,
                index: xi,
            },
            K::Store {
                name: yn,
                value: yv,
                index: yi,
            },
        ) => xn == yn && equal(xv, yv) && equal(xi, yi),
        (
            K::Provide {
                name: xn,
                value: xv,
                args: xa,
            },
            K::Provide {
                name: yn,
                value: yv,
                args: ya,
            },
        ) => {
            xn == yn
                && equal(xv, yv)
                && xa.len() == ya.len()
                && xa.iter().zip(ya.iter()).all(|(x, y)| equal(x, y))
        }
        (
            K::Allocate {
                name: xn,
                ty: xt,
                size: xs,
                body: xb,
            },
            K::Allocate {
                name: yn,
                ty: yt,
                size: ys,
                body: yb,
            },
        ) => xn == yn && xt == yt && equal(xs, ys) && equal_stmt(xb, yb),
        (K::Free { name: xn }, K::Free { name: yn }) => xn == yn,
        (
            K::Realize {
                name: xn,
                ty: xt,
                bounds: xbs,
                body: xb,
            },
            K::Realize {
                name: yn,
                ty: yt,
                bounds: ybs,
                body: yb,
            },
        ) => {
            xn == yn
                && xt == yt
                && xbs.len() == ybs.len()
                && xbs
                    .iter()
                    .zip(ybs.iter())
                    .all(|((xm, xe), (ym, ye))| equal(xm, ym) && equal(xe, ye))
                && equal_stmt(xb, yb)
        }
        (
            K::Block {
                first: xf,
                rest: xr,
            },
            K::Block {
                first: yf,
                rest: yr,
            },
        ) => {
            equal_stmt(xf, yf)
                && match (xr, yr) {
                    (Some(x), Some(y)) => equal_stmt(x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        (
            K::StmtTargetVar {
                name: xn, body: xb, ..
            },
            K::StmtTargetVar {
                name: yn, body: yb, ..
            },
        ) => xn == yn && equal_stmt(xb, yb),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_and_pointer_equality() {
        let x = Expr::var("x");
        let a = Expr::add(x.clone(), Expr::int(1));
        let b = Expr::add(Expr::var("x"), Expr::int(1));
        assert!(!a.same_as(&b));
        assert!(equal(&a, &b));
        assert!(!equal(&a, &Expr::add(x, Expr::int(2))));
    }
}
