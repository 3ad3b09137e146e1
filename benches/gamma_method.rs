use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pvf_obs::{weighted_mean, Ar1, GammaOpts};

fn gamma_benchmark(c: &mut Criterion) {
    let chain = Ar1 {
        mean: 0.5,
        sigma: 0.1,
        rho: 0.6,
    };
    let obs = chain.observable(42, "bench", 4, 500).expect("observable");

    c.bench_function("gamma/ar1_4x500", |b| {
        b.iter(|| {
            let mut fresh = black_box(&obs).clone();
            fresh.gamma_method_with(&GammaOpts::default()).dvalue
        });
    });

    let candidates: Vec<(Vec<_>, f64)> = (0..16)
        .map(|i| (vec![&obs * (1.0 + 0.01 * i as f64)], 0.1 * i as f64))
        .collect();
    c.bench_function("gamma/weighted_mean_16", |b| {
        b.iter(|| weighted_mean(black_box(&candidates)).expect("mean"));
    });
}

criterion_group!(benches, gamma_benchmark);
criterion_main!(benches);
