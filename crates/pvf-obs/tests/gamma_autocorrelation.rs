use pvf_obs::{Ar1, GammaOpts, Obs};

#[test]
fn ar1_chain_recovers_the_exact_autocorrelation_time() {
    let chain = Ar1 {
        mean: 0.25,
        sigma: 1.0,
        rho: 0.5,
    };
    let obs = chain.observable(2024, "ar1", 2, 4000).expect("observable");
    let analysis = obs.gamma_method();
    let ensemble = &analysis.ensembles["ar1"];

    assert_eq!(ensemble.n_samples, 8000);
    assert!(
        (ensemble.tauint - chain.tauint()).abs() < 0.3 * chain.tauint(),
        "tauint {} vs {}",
        ensemble.tauint,
        chain.tauint()
    );
    let exact = chain.error_of_mean(8000);
    assert!(
        (analysis.dvalue - exact).abs() < 0.25 * exact,
        "error {} vs {exact}",
        analysis.dvalue
    );
    assert!((obs.value() - chain.mean).abs() < 5.0 * exact);
}

#[test]
fn ignoring_autocorrelation_underestimates_the_error() {
    let chain = Ar1 {
        mean: 0.0,
        sigma: 1.0,
        rho: 0.8,
    };
    let mut obs = chain.observable(11, "ar1", 1, 3000).expect("observable");
    let automatic = obs.dvalue();
    let naive = obs.gamma_method_with(&GammaOpts::with_s(0.0)).dvalue;
    assert!(naive < automatic);
    assert_eq!(obs.tauint("ar1"), Some(0.5));
}

#[test]
fn independent_ensembles_add_in_quadrature() {
    let chain = Ar1 {
        mean: 1.0,
        sigma: 0.3,
        rho: 0.2,
    };
    let a = chain.observable(1, "a", 1, 500).expect("a");
    let b = chain.observable(2, "b", 1, 500).expect("b");
    let sum = &a + &b;
    let expected = (a.dvalue().powi(2) + b.dvalue().powi(2)).sqrt();
    assert!((sum.dvalue() - expected).abs() < 1e-12);
    assert_eq!(sum.ensembles().len(), 2);
}

#[test]
fn covariance_diagonal_matches_the_errors() {
    let chain = Ar1 {
        mean: 2.0,
        sigma: 0.5,
        rho: 0.1,
    };
    let a = chain.observable(5, "ens", 1, 400).expect("a");
    let b = &a * 2.0;
    let other = chain.observable(6, "other", 1, 400).expect("other");
    let cov = pvf_obs::covariance(&[a.clone(), b.clone(), other.clone()]);
    assert!((cov[(0, 0)] - a.dvalue().powi(2)).abs() < 1e-12);
    assert!((cov[(0, 1)] - 2.0 * a.dvalue().powi(2)).abs() < 1e-10);
    assert!(cov[(0, 2)].abs() < 1e-12);
}

#[test]
fn gapped_replicas_are_analysed_on_their_stride() {
    let samples: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64).collect();
    let idl: Vec<usize> = (0..40).map(|i| 10 + 5 * i).collect();
    let strided =
        Obs::new(vec![samples.clone()], vec!["ens".into()], Some(vec![idl])).expect("strided");
    let dense = Obs::from_samples(samples, "ens").expect("dense");
    assert!((strided.dvalue() - dense.dvalue()).abs() < 1e-12);
}

#[test]
fn anticorrelated_chains_keep_the_naive_error() {
    for rho in [-0.3, -0.7] {
        let chain = Ar1 {
            mean: 1.0,
            sigma: 1.0,
            rho,
        };
        let mut obs = chain.observable(11, "ens", 1, 1000).expect("observable");
        let automatic = obs.dvalue();
        assert!(obs.tauint("ens").expect("tauint") >= 0.5);
        let naive = obs.gamma_method_with(&GammaOpts::with_s(0.0)).dvalue;
        assert!(naive > 0.02);
        assert!(
            (automatic - naive).abs() < 0.05 * naive,
            "rho {rho}: {automatic} vs {naive}"
        );
    }
}
