//! End-to-end domain inference over image expressions: pre-solve, solver
//! fixed point, extraction, and the interplay with function definitions.

use photon::{
    clamp_none, domain_inference_named, equal, max, min, sin, CompilerContext, Domain,
    DomainType, Expr, Function, Image, Type,
};

fn valid(domains: &[Domain]) -> &Domain {
    &domains[DomainType::Valid as usize]
}

fn computable(domains: &[Domain]) -> &Domain {
    &domains[DomainType::Computable as usize]
}

fn check_valid(domains: &[Domain], expected: &[(i32, i32)]) {
    let v = valid(domains);
    assert_eq!(v.dimensions(), expected.len());
    for (i, (lo, hi)) in expected.iter().enumerate() {
        assert!(
            v.exact(i),
            "dimension {i} should be exact, got {}",
            v.intervals[i]
        );
        assert_eq!(
            (v.imin(i), v.imax(i)),
            (*lo, *hi),
            "dimension {i}: got {}, expected [{lo}, {hi}]",
            v.intervals[i]
        );
    }
}

#[test]
fn whole_image_domain() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let domains = domain_inference_named(&cc, &["iv.0", "iv.1"], &img.implicit());
    check_valid(&domains, &[(0, 19), (0, 39)]);
    let c = computable(&domains);
    assert_eq!((c.imin(0), c.imax(0)), (0, 19));
}

#[test]
fn shifted_access() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let e = img.at([x.clone() - 2, y.clone()]);
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(2, 21), (0, 39)]);
}

#[test]
fn overlapping_accesses_intersect() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let e = img.at([x.clone() - 2, y.clone()]) + img.at([x.clone(), y.clone()]);
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(2, 19), (0, 39)]);

    let e = img.at([x.clone() - 2, y.clone()])
        + img.at([x.clone(), y.clone()])
        + img.at([x.clone(), y.clone() + 5]);
    let cc = CompilerContext::new();
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(2, 19), (0, 34)]);
}

#[test]
fn clamped_access_tightens_valid_and_frees_computable() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    // min(y + 5, 15) keeps the upper access in bounds, so above 15 the
    // computable region is unconstrained while validity stops at y = 10.
    let e = img.at([x.clone() - 2, y.clone()])
        + img.at([x.clone(), y.clone()])
        + img.at([x.clone(), min(y.clone() + 5, 15)]);
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(2, 19), (0, 10)]);
    // The computable domain in y is not narrowed by the clamped access.
    let c = computable(&domains);
    assert_eq!((c.imin(1), c.imax(1)), (0, 39));
}

#[test]
fn border_handlers_on_both_axes() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let e = img.at([x.clone() - 2, max(y.clone(), 1)])
        + img.at([max(x.clone(), 0), y.clone()])
        + img.at([min(x.clone(), 9), y.clone() + 5]);
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(2, 9), (1, 34)]);
}

#[test]
fn swapped_indices_swap_the_domain() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let domains = domain_inference_named(&cc, &["x", "y"], &img.at([y.clone(), x.clone()]));
    check_valid(&domains, &[(0, 39), (0, 19)]);
}

#[test]
fn extern_calls_are_transparent() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let domains = domain_inference_named(&cc, &["x", "y"], &sin(img.at([x.clone(), y.clone()])));
    check_valid(&domains, &[(0, 19), (0, 39)]);
}

#[test]
fn repeated_variable_uses_intersect() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let x = Expr::var("x");
    let domains = domain_inference_named(&cc, &["x"], &img.at([x.clone(), x.clone()]));
    check_valid(&domains, &[(0, 19)]);
}

#[test]
fn inseparable_variables_are_inexact() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let domains = domain_inference_named(&cc, &["x", "y"], &img.at([x.clone() + y.clone(), y.clone()]));
    let v = valid(&domains);
    // x cannot be separated from y in the first index.
    assert!(!v.exact(0));
    assert!(photon::infinity_count(&v.min(0)) < 0);
    assert!(photon::infinity_count(&v.max(0)) > 0);
    // y still gets its interval from the second index, but the unsolved
    // occurrence taints its exactness.
    assert!(!v.exact(1));
    assert_eq!((v.imin(1), v.imax(1)), (0, 39));
}

#[test]
fn constant_expressions_have_infinite_domains() {
    let cc = CompilerContext::new();
    let domains = domain_inference_named(&cc, &["x", "y"], &Expr::int(3));
    let v = valid(&domains);
    assert_eq!(v.dimensions(), 2);
    for i in 0..2 {
        assert!(v.exact(i));
        assert!(photon::infinity_count(&v.min(i)) < 0);
        assert!(photon::infinity_count(&v.max(i)) > 0);
    }
}

#[test]
fn free_symbols_act_as_constants() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));
    let ext = Expr::var("fff.extent.0");
    let domains = domain_inference_named(&cc, &["x", "y"], &img.at([x.clone() - ext.clone(), y.clone()]));
    let v = valid(&domains);
    assert!(v.exact(0));
    assert!(equal(&v.min(0), &ext));
    assert!(equal(&v.max(0), &(ext.clone() + 19)));
    assert_eq!((v.imin(1), v.imax(1)), (0, 39));
}

#[test]
fn function_domains_chain_through_calls() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20, 40]);
    let (x, y) = (Expr::var("x"), Expr::var("y"));

    // f(x, y) = in(x-1, y) - in(x, y) has valid x in [1, 19].
    let f = Function::declare(&cc, "f");
    f.define(
        &cc,
        &["x", "y"],
        img.at([x.clone() - 1, y.clone()]) - img.at([x.clone(), y.clone()]),
    );
    let fd = f.domain(&cc, DomainType::Valid);
    assert_eq!((fd.imin(0), fd.imax(0)), (1, 19));
    assert_eq!((fd.imin(1), fd.imax(1)), (0, 39));

    // Evaluating f at (x, y-1) shifts the y domain.
    let e = f.at(&cc, [x.clone(), y.clone() - 1]);
    let domains = domain_inference_named(&cc, &["x", "y"], &e);
    check_valid(&domains, &[(1, 19), (1, 40)]);
}

#[test]
fn clamp_none_restricts_computable_to_valid() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20]);
    let x = Expr::var("x");
    let e = img.at([clamp_none(x.clone() - 2)]);
    let domains = domain_inference_named(&cc, &["x"], &e);
    check_valid(&domains, &[(2, 21)]);
    let c = computable(&domains);
    assert_eq!((c.imin(0), c.imax(0)), (2, 21));
}

#[test]
fn lets_are_inlined_before_solving() {
    let cc = CompilerContext::new();
    let img = Image::new("in", Type::uint(8), &[20]);
    let x = Expr::var("x");
    let t = Expr::var("t");
    let e = Expr::let_in("t", x.clone() - 3, img.at([t.clone()]));
    let domains = domain_inference_named(&cc, &["x"], &e);
    check_valid(&domains, &[(3, 22)]);
}
