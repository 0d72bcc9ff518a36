// ─────────────────────────────────────────────────────────────────────
// Plume Assimilation Core — Factorization Benchmarks
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use plume_math::{Cholesky, LuSolver};
use std::hint::black_box;

/// Extended subdomain problem size for a 16×16 subdomain: (16+2)².
const N: usize = 324;

fn dominant_matrix(n: usize) -> Array2<f64> {
    let mut a = Array2::from_shape_fn((n, n), |(i, j)| (((i * 31 + j * 17) as f64) * 0.73).sin());
    for i in 0..n {
        let row_sum: f64 = (0..n).filter(|&j| j != i).map(|j| a[[i, j]].abs()).sum();
        a[[i, i]] = row_sum + 1.0;
    }
    a
}

fn bench_lu(c: &mut Criterion) {
    let a = dominant_matrix(N);
    let b = Array1::from_shape_fn(N, |i| (i as f64 * 0.37).cos());

    let mut group = c.benchmark_group("lu");
    group.sample_size(20);

    group.bench_function("factor_324", |bench| {
        let mut lu = LuSolver::new();
        bench.iter(|| {
            lu.factor(black_box(&a)).expect("factorization should succeed");
        })
    });

    group.bench_function("factor_solve_324", |bench| {
        let mut lu = LuSolver::new();
        bench.iter(|| {
            lu.factor(black_box(&a)).expect("factorization should succeed");
            black_box(lu.solve(b.view()));
        })
    });

    group.finish();
}

fn bench_cholesky(c: &mut Criterion) {
    let g = dominant_matrix(N);
    let s = g.dot(&g.t()) + Array2::<f64>::eye(N);
    let b = Array1::from_shape_fn(N, |i| (i as f64 * 0.11).sin());

    let mut group = c.benchmark_group("cholesky");
    group.sample_size(20);

    group.bench_function("factor_solve_324", |bench| {
        let mut chol = Cholesky::new();
        bench.iter(|| {
            chol.factor(black_box(&s)).expect("SPD factorization should succeed");
            black_box(chol.solve(b.view()));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_lu, bench_cholesky);
criterion_main!(benches);
