use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pvf_fit::{least_squares, total_least_squares, BetaInterpolation, FitOpts, Linear, Model};
use pvf_obs::{Ar1, Obs};

fn measured(target: f64, seed: u64, ensemble: &str) -> Obs {
    let noise = Ar1 {
        mean: 0.0,
        sigma: 0.02,
        rho: 0.3,
    }
    .observable(seed, ensemble, 1, 200)
    .expect("noise");
    noise.affine(1.0, target - noise.value())
}

fn fit_benchmark(c: &mut Criterion) {
    let x: Vec<f64> = (1..=6).map(|nx| 1.0 / f64::from(8 * nx).powi(4)).collect();
    let y: Vec<Obs> = x
        .iter()
        .enumerate()
        .map(|(i, x)| measured(0.5 - 40.0 * x, i as u64, &format!("L{i}")))
        .collect();
    c.bench_function("fit/linear_6", |b| {
        b.iter(|| {
            least_squares(black_box(&x), black_box(&y), &Linear, &FitOpts::default()).expect("fit")
        });
    });

    let model = BetaInterpolation::default();
    let truth = [-0.2, 0.01, 0.002, -0.0001];
    let g2: Vec<Obs> = (1..=8)
        .map(|i| measured(f64::from(i), 100 + i as u64, &format!("b{i}")))
        .collect();
    let beta: Vec<Obs> = (1..=8)
        .map(|i| measured(model.eval(&truth, f64::from(i)), 200 + i as u64, &format!("b{i}")))
        .collect();
    c.bench_function("fit/beta_interpolation_8", |b| {
        b.iter(|| {
            total_least_squares(black_box(&g2), black_box(&beta), &model, &FitOpts::default())
                .expect("fit")
        });
    });
}

criterion_group!(benches, fit_benchmark);
criterion_main!(benches);
