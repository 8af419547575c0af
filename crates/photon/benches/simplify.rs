use criterion::{black_box, criterion_group, criterion_main, Criterion};
use photon::{clamp, le, max, min, proved, simplify, CompilerContext, Expr};

fn representative_expressions() -> Vec<Expr> {
    let x = Expr::var("x");
    let y = Expr::var("y");
    vec![
        (x.clone() + 3) + 4,
        (x.clone() + 3) + y.clone(),
        x.clone() * y.clone() + x.clone() * 3,
        (x.clone() * 4 + y.clone()) / 2,
        (x.clone() * 8 + y.clone()) % 4,
        min(max(x.clone(), 1), 10),
        min(x.clone(), min(x.clone(), y.clone())),
        Expr::ramp(x.clone() * 2 + 7, Expr::int(3), 8) + Expr::broadcast(Expr::int(2), 8),
        clamp(x.clone() - 1, 0, 255),
        le(min(x.clone(), 1953) + -2 + -1, x.clone() + -1),
    ]
}

fn bench_simplify(c: &mut Criterion) {
    let cc = CompilerContext::new();
    let exprs = representative_expressions();
    c.bench_function("simplify_mix", |b| {
        b.iter(|| {
            for e in &exprs {
                black_box(simplify(&cc, e));
            }
        })
    });

    let x = Expr::var("x");
    let proposition = le(min(max(x.clone(), 1), 10), 10);
    c.bench_function("proved", |b| {
        b.iter(|| black_box(proved(&cc, &proposition)))
    });
}

criterion_group!(benches, bench_simplify);
criterion_main!(benches);
