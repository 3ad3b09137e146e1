use pvf_fit::{
    error_band, least_squares, total_least_squares, BetaInterpolation, FitMethod, FitOpts, Linear,
    Model, PowerLaw,
};
use pvf_obs::{Ar1, Obs};

/// Observable with central value `target` and fluctuations of size `sigma`.
fn measured(target: f64, sigma: f64, seed: u64, ensemble: &str) -> Obs {
    let noise = Ar1 {
        mean: 0.0,
        sigma,
        rho: 0.2,
    }
    .observable(seed, ensemble, 1, 60)
    .expect("noise");
    noise.affine(1.0, target - noise.value())
}

#[test]
fn linear_fit_matches_the_closed_form_weighted_solution() {
    let x = [0.1, 0.2, 0.3, 0.4, 0.5];
    let y: Vec<Obs> = x
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let target = 1.0 + 2.0 * x + 0.01 * (i as f64 - 2.0).powi(2);
            measured(target, 0.05, i as u64, &format!("L{i}"))
        })
        .collect();

    let result = least_squares(&x, &y, &Linear, &FitOpts::default()).expect("fit");
    assert_eq!(result.method, FitMethod::LevenbergMarquardt);
    assert_eq!(result.dof, 3);

    let w: Vec<f64> = y.iter().map(|obs| 1.0 / obs.dvalue().powi(2)).collect();
    let s: f64 = w.iter().sum();
    let sx: f64 = w.iter().zip(&x).map(|(w, x)| w * x).sum();
    let sxx: f64 = w.iter().zip(&x).map(|(w, x)| w * x * x).sum();
    let sy: Obs = w.iter().zip(&y).map(|(w, y)| y * *w).sum();
    let sxy: Obs = w.iter().zip(&x).zip(&y).map(|((w, x), y)| y * (w * x)).sum();
    let delta = s * sxx - sx * sx;
    let intercept = (&sy * sxx - &sxy * sx) / delta;
    let slope = (&sxy * s - &sy * sx) / delta;

    for (fitted, exact) in result.params.iter().zip([intercept, slope]) {
        assert!((fitted.value() - exact.value()).abs() < 1e-8);
        assert!((fitted.dvalue() - exact.dvalue()).abs() < 1e-6 * exact.dvalue());
    }
    let chi2: f64 = x
        .iter()
        .zip(&y)
        .zip(&w)
        .map(|((x, y), w)| w * (y.value() - Linear.eval(&result.values(), *x)).powi(2))
        .sum();
    assert!((result.chisquare - chi2).abs() < 1e-8);
    assert!((result.aic() - (result.chisquare_by_dof + 4.0)).abs() < 1e-12);
}

#[test]
fn power_law_recovers_the_critical_mass() {
    let truth = [-1.0, 2.0, 1.2];
    let masses = [-0.9, -0.8, -0.7, -0.6, -0.5, -0.4];
    let y: Vec<Obs> = masses
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let value = PowerLaw.eval(&truth, *m);
            measured(value, 0.01 * value, 100 + i as u64, &format!("m{i}"))
        })
        .collect();
    let opts = FitOpts::with_initial_guess(PowerLaw::INITIAL_GUESS);
    let result = least_squares(&masses, &y, &PowerLaw, &opts).expect("fit");
    assert!((result.params[0].value() - truth[0]).abs() < 1e-5);
    assert!(result.params[0].dvalue() > 0.0);
    assert!(result.chisquare < 1e-8);
}

#[test]
fn orthogonal_fit_recovers_exact_curves() {
    let model = BetaInterpolation { order: 2 };
    let truth = [-0.3, 0.05];
    let points = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let x: Vec<Obs> = points
        .iter()
        .enumerate()
        .map(|(i, g2)| measured(*g2, 0.02, 200 + i as u64, &format!("b{i}")))
        .collect();
    let y: Vec<Obs> = points
        .iter()
        .enumerate()
        .map(|(i, g2)| measured(model.eval(&truth, *g2), 0.05, 300 + i as u64, &format!("b{i}")))
        .collect();

    let result = total_least_squares(&x, &y, &model, &FitOpts::default()).expect("fit");
    assert_eq!(result.method, FitMethod::Odr);
    assert_eq!(result.dof, 4);
    for (param, expected) in result.params.iter().zip(truth) {
        assert!((param.value() - expected).abs() < 1e-6);
        assert!(param.dvalue() > 0.0);
    }

    let band = error_band(&[0.5, 3.0], &model, &result.params).expect("band");
    assert!(band.iter().all(|width| width.is_finite() && *width > 0.0));
}

#[test]
fn exact_data_cannot_be_fitted() {
    let y = vec![Obs::constant(1.0); 4];
    let err = least_squares(&[0.0, 1.0, 2.0, 3.0], &y, &Linear, &FitOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "zero-uncertainty");
}

#[test]
fn fits_need_more_points_than_parameters() {
    let y: Vec<Obs> = (0..2)
        .map(|i| measured(1.0, 0.1, i, &format!("e{i}")))
        .collect();
    let err = least_squares(&[0.0, 1.0], &y, &Linear, &FitOpts::default()).unwrap_err();
    assert_eq!(err.info().code, "too-few-points");
}
