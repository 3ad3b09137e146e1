//! Autocorrelation-aware error analysis (Wolff, hep-lat/0306017).

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::obs::{ensemble_name, Obs, Series};

/// Default windowing parameter of the automatic window procedure.
pub const DEFAULT_S: f64 = 2.0;

/// Options of the Gamma method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaOpts {
    /// Windowing parameter applied to every ensemble.
    #[serde(default = "default_s")]
    pub s: f64,
    /// Per-ensemble overrides of `s`.
    #[serde(default)]
    pub ensemble_s: BTreeMap<String, f64>,
}

fn default_s() -> f64 {
    DEFAULT_S
}

impl Default for GammaOpts {
    fn default() -> Self {
        Self {
            s: DEFAULT_S,
            ensemble_s: BTreeMap::new(),
        }
    }
}

impl GammaOpts {
    /// Options with a single windowing parameter.
    pub fn with_s(s: f64) -> Self {
        Self {
            s,
            ..Self::default()
        }
    }

    fn s_for(&self, ensemble: &str) -> f64 {
        self.ensemble_s.get(ensemble).copied().unwrap_or(self.s)
    }
}

/// Error analysis of one ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleAnalysis {
    /// Statistical error contributed by the ensemble.
    pub dvalue: f64,
    /// Error of the error.
    pub ddvalue: f64,
    /// Integrated autocorrelation time at the chosen window.
    pub tauint: f64,
    /// Error of the integrated autocorrelation time.
    pub dtauint: f64,
    /// Summation window.
    pub window: usize,
    /// Number of configurations over all replicas.
    pub n_samples: usize,
    /// Normalised autocorrelation function up to `w_max`.
    pub rho: Vec<f64>,
}

impl EnsembleAnalysis {
    fn constant(n_samples: usize) -> Self {
        Self {
            dvalue: 0.0,
            ddvalue: 0.0,
            tauint: 0.5,
            dtauint: 0.0,
            window: 0,
            n_samples,
            rho: Vec::new(),
        }
    }
}

/// Combined error analysis of an observable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GammaAnalysis {
    /// Total statistical error, ensembles added in quadrature.
    pub dvalue: f64,
    /// Error of the error.
    pub ddvalue: f64,
    /// Per-ensemble details.
    pub ensembles: BTreeMap<String, EnsembleAnalysis>,
}

struct Grid {
    values: Vec<f64>,
    mask: Vec<f64>,
}

impl Grid {
    fn new(series: &Series) -> Self {
        let idl = series.idl();
        let first = idl.first().copied().unwrap_or(0);
        let gap = idl
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(0, gcd)
            .max(1);
        let span = idl.last().map_or(0, |last| (last - first) / gap + 1);
        let mut values = vec![0.0; span];
        let mut mask = vec![0.0; span];
        for (index, delta) in idl.iter().zip(series.deltas()) {
            let slot = (index - first) / gap;
            values[slot] = *delta;
            mask[slot] = 1.0;
        }
        Self { values, mask }
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn autocorrelation(data: &[f64], w_max: usize, into: &mut [f64]) {
    for (lag, slot) in into.iter_mut().enumerate().take(w_max) {
        if lag >= data.len() {
            break;
        }
        *slot += data[..data.len() - lag]
            .iter()
            .zip(&data[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>();
    }
}

fn analyse_ensemble(replicas: &[&Series], s: f64) -> EnsembleAnalysis {
    let n_samples: usize = replicas.iter().map(|series| series.len()).sum();
    let grids: Vec<Grid> = replicas.iter().map(|series| Grid::new(series)).collect();
    let w_max = grids.iter().map(Grid::len).max().unwrap_or(0) / 2;
    if w_max == 0 || n_samples == 0 {
        return EnsembleAnalysis::constant(n_samples);
    }

    let mut gamma = vec![0.0; w_max];
    let mut pairs = vec![0.0; w_max];
    for grid in &grids {
        autocorrelation(&grid.values, w_max, &mut gamma);
        autocorrelation(&grid.mask, w_max, &mut pairs);
    }
    for (value, count) in gamma.iter_mut().zip(&pairs) {
        *value /= count.max(1.0);
    }

    let gamma0 = gamma[0];
    if gamma0 <= 0.0 {
        return EnsembleAnalysis::constant(n_samples);
    }
    let n = n_samples as f64;
    let rho: Vec<f64> = gamma.iter().map(|value| value / gamma0).collect();

    if s == 0.0 {
        let dvalue = (gamma0 / (n - 1.0).max(1.0)).sqrt();
        return EnsembleAnalysis {
            dvalue,
            ddvalue: dvalue * (0.5 / n).sqrt(),
            tauint: 0.5,
            dtauint: 0.0,
            window: 0,
            n_samples,
            rho,
        };
    }

    // τ_int below 1/2 makes the window criterion undefined.
    let floor = 0.5 + f64::EPSILON;
    let mut n_tauint = Vec::with_capacity(w_max);
    let mut running = 0.5;
    n_tauint.push(running);
    for value in &rho[1..] {
        running += value;
        n_tauint.push(running.max(floor));
    }
    let n_dtauint: Vec<f64> = n_tauint
        .iter()
        .enumerate()
        .map(|(window, tau)| 2.0 * tau * ((window as f64 + 0.5 - tau).abs() / n).sqrt())
        .collect();

    let mut window = w_max.saturating_sub(1);
    for candidate in 1..w_max {
        let tauint = n_tauint[candidate];
        let tau = s / ((2.0 * tauint + 1.0) / (2.0 * tauint - 1.0)).ln();
        let g_w = (-(candidate as f64) / tau).exp() - tau / (candidate as f64 * n).sqrt();
        if g_w < 0.0 || candidate >= w_max - 1 {
            window = candidate;
            break;
        }
    }

    // Bias correction, hep-lat/0306017 eq. (49).
    let tauint = n_tauint[window] * (1.0 + (2.0 * window as f64 + 1.0) / n) / (1.0 + 1.0 / n);
    let dvalue = (2.0 * tauint * gamma0 * (1.0 + 1.0 / n) / n).max(0.0).sqrt();
    EnsembleAnalysis {
        dvalue,
        ddvalue: dvalue * ((window as f64 + 0.5) / n).sqrt(),
        tauint,
        dtauint: n_dtauint[window],
        window,
        n_samples,
        rho,
    }
}

fn analyse(obs: &Obs, opts: &GammaOpts) -> GammaAnalysis {
    let mut by_ensemble: BTreeMap<&str, Vec<&Series>> = BTreeMap::new();
    for (name, series) in obs.series() {
        by_ensemble
            .entry(ensemble_name(name))
            .or_default()
            .push(series);
    }

    let mut ensembles = BTreeMap::new();
    let mut variance = 0.0;
    let mut dd_variance = 0.0;
    for (ensemble, replicas) in by_ensemble {
        let analysis = analyse_ensemble(&replicas, opts.s_for(ensemble));
        variance += analysis.dvalue.powi(2);
        dd_variance += (analysis.dvalue * analysis.ddvalue).powi(2);
        ensembles.insert(ensemble.to_string(), analysis);
    }
    let dvalue = variance.sqrt();
    let ddvalue = if dvalue > 0.0 {
        dd_variance.sqrt() / dvalue
    } else {
        0.0
    };
    GammaAnalysis {
        dvalue,
        ddvalue,
        ensembles,
    }
}

impl Obs {
    /// Error analysis with the default options, computed on first use.
    pub fn gamma_method(&self) -> &GammaAnalysis {
        self.analysis
            .get_or_init(|| analyse(self, &GammaOpts::default()))
    }

    /// Recomputes the error analysis with explicit options.
    pub fn gamma_method_with(&mut self, opts: &GammaOpts) -> &GammaAnalysis {
        self.analysis.take();
        let analysis = analyse(self, opts);
        self.analysis.get_or_init(|| analysis)
    }

    /// Statistical error.
    pub fn dvalue(&self) -> f64 {
        self.gamma_method().dvalue
    }

    /// Error of the statistical error.
    pub fn ddvalue(&self) -> f64 {
        self.gamma_method().ddvalue
    }

    /// Integrated autocorrelation time on one ensemble.
    pub fn tauint(&self, ensemble: &str) -> Option<f64> {
        self.gamma_method()
            .ensembles
            .get(ensemble)
            .map(|analysis| analysis.tauint)
    }
}

/// Covariance matrix of a list of observables.
///
/// Off-diagonal entries follow from the Gamma-method variances of pairwise
/// sums, `(var(a + b) - var(a) - var(b)) / 2`, so the diagonal matches
/// [`Obs::dvalue`] squared.
pub fn covariance(observables: &[Obs]) -> DMatrix<f64> {
    let n = observables.len();
    let mut matrix = DMatrix::zeros(n, n);
    for i in 0..n {
        let var_i = observables[i].dvalue().powi(2);
        matrix[(i, i)] = var_i;
        for j in (i + 1)..n {
            let var_j = observables[j].dvalue().powi(2);
            let sum = &observables[i] + &observables[j];
            let cov = (sum.dvalue().powi(2) - var_i - var_j) / 2.0;
            matrix[(i, j)] = cov;
            matrix[(j, i)] = cov;
        }
    }
    matrix
}
