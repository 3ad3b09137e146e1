use pvf_core::PvfError;
use pvf_obs::Obs;
use serde::{Deserialize, Serialize};

use crate::fit_error;
use crate::lm::minimise;
use crate::model::Model;
use crate::propagate::parameter_sensitivity;

fn default_max_iters() -> usize {
    1000
}

fn default_tolerance() -> f64 {
    1e-12
}

/// Minimiser configuration shared by all fits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitOpts {
    /// Starting point; each fit kind has its own default.
    #[serde(default)]
    pub initial_guess: Option<Vec<f64>>,
    /// Maximum Levenberg-Marquardt iterations.
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
    /// Relative tolerance on the chi-square decrease and on the step size.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for FitOpts {
    fn default() -> Self {
        Self {
            initial_guess: None,
            max_iters: default_max_iters(),
            tolerance: default_tolerance(),
        }
    }
}

impl FitOpts {
    /// Options starting from an explicit initial guess.
    pub fn with_initial_guess(guess: impl Into<Vec<f64>>) -> Self {
        Self {
            initial_guess: Some(guess.into()),
            ..Self::default()
        }
    }

    fn initial(&self, n_params: usize, fallback: f64) -> Result<Vec<f64>, PvfError> {
        match &self.initial_guess {
            Some(guess) if guess.len() != n_params => Err(fit_error(
                "initial-guess-length",
                format!(
                    "initial guess has {} entries for {n_params} parameters",
                    guess.len()
                ),
            )),
            Some(guess) => Ok(guess.clone()),
            None => Ok(vec![fallback; n_params]),
        }
    }
}

/// Fit kind recorded with every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    /// Uncorrelated least squares in `y`.
    LevenbergMarquardt,
    /// Orthogonal distance regression with errors in `x` and `y`.
    Odr,
}

impl FitMethod {
    /// Label stored in result descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            FitMethod::LevenbergMarquardt => "Levenberg-Marquardt",
            FitMethod::Odr => "ODR",
        }
    }
}

/// Fitted parameters with goodness-of-fit information.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Parameters carrying the propagated fluctuations of the data.
    pub params: Vec<Obs>,
    /// Chi-square at the minimum.
    pub chisquare: f64,
    /// Degrees of freedom.
    pub dof: usize,
    /// `chisquare / dof`.
    pub chisquare_by_dof: f64,
    /// Fit kind.
    pub method: FitMethod,
    /// Minimiser iterations.
    pub iterations: usize,
}

impl FitResult {
    /// Central values of the parameters.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(Obs::value).collect()
    }

    /// Akaike information criterion `χ²/dof + 2k`.
    pub fn aic(&self) -> f64 {
        crate::aic(self.chisquare_by_dof, self.params.len(), 0)
    }
}

fn uncertainties(data: &[Obs], axis: &str) -> Result<Vec<f64>, PvfError> {
    data.iter()
        .enumerate()
        .map(|(index, obs)| {
            let sigma = obs.dvalue();
            if sigma.is_finite() && sigma > 0.0 {
                Ok(sigma)
            } else {
                Err(fit_error(
                    "zero-uncertainty",
                    format!("{axis} value {index} ({}) has no uncertainty", obs.value()),
                ))
            }
        })
        .collect()
}

fn check_counts(n_data: usize, n_params: usize) -> Result<usize, PvfError> {
    if n_data <= n_params {
        return Err(fit_error(
            "too-few-points",
            format!("{n_data} data points cannot constrain {n_params} parameters"),
        ));
    }
    Ok(n_data - n_params)
}

/// Uncorrelated least-squares fit of `model` to `y(x)`.
///
/// The parameters are returned as observables whose fluctuations follow from
/// those of `y`. Default initial guess is `0.1` for every parameter.
pub fn least_squares<M: Model>(
    x: &[f64],
    y: &[Obs],
    model: &M,
    opts: &FitOpts,
) -> Result<FitResult, PvfError> {
    if x.len() != y.len() {
        return Err(fit_error(
            "length-mismatch",
            format!("{} x values but {} y values", x.len(), y.len()),
        ));
    }
    let n_params = model.n_params();
    let dof = check_counts(y.len(), n_params)?;
    let sigma = uncertainties(y, "y")?;
    let y_values: Vec<f64> = y.iter().map(Obs::value).collect();

    let residuals = |params: &[f64]| -> Vec<f64> {
        x.iter()
            .zip(&y_values)
            .zip(&sigma)
            .map(|((x, y), s)| (y - model.eval(params, *x)) / s)
            .collect()
    };
    let minimum = minimise(
        residuals,
        &opts.initial(n_params, 0.1)?,
        opts.max_iters,
        opts.tolerance,
    )?;

    let objective = |params: &[f64], data: &[f64]| -> f64 {
        x.iter()
            .zip(data)
            .zip(&sigma)
            .map(|((x, y), s)| ((y - model.eval(params, *x)) / s).powi(2))
            .sum()
    };
    let sensitivity = parameter_sensitivity(objective, &minimum.params, &y_values)?;
    let inputs: Vec<&Obs> = y.iter().collect();
    let params = minimum
        .params
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let gradient: Vec<f64> = sensitivity.row(row).iter().copied().collect();
            Obs::linear(&inputs, *value, &gradient)
        })
        .collect();

    tracing::debug!(
        model = %model.name(),
        chisquare = minimum.chisquare,
        dof,
        iterations = minimum.iterations,
        "least-squares fit converged"
    );
    Ok(FitResult {
        params,
        chisquare: minimum.chisquare,
        dof,
        chisquare_by_dof: minimum.chisquare / dof as f64,
        method: FitMethod::LevenbergMarquardt,
        iterations: minimum.iterations,
    })
}

/// Total least-squares (orthogonal distance) fit with errors on both axes.
///
/// The latent `x` positions are fitted alongside the parameters and the
/// fluctuations of both `x` and `y` propagate into the result. Default
/// initial guess is `1.0` for every parameter.
pub fn total_least_squares<M: Model>(
    x: &[Obs],
    y: &[Obs],
    model: &M,
    opts: &FitOpts,
) -> Result<FitResult, PvfError> {
    if x.len() != y.len() {
        return Err(fit_error(
            "length-mismatch",
            format!("{} x values but {} y values", x.len(), y.len()),
        ));
    }
    let n_params = model.n_params();
    let n = y.len();
    let dof = check_counts(n, n_params)?;
    let sigma_x = uncertainties(x, "x")?;
    let sigma_y = uncertainties(y, "y")?;
    let data: Vec<f64> = x.iter().chain(y).map(Obs::value).collect();

    let chi_terms = |params: &[f64], data: &[f64]| -> Vec<f64> {
        let (coefficients, latent) = params.split_at(n_params);
        let (x_data, y_data) = data.split_at(n);
        latent
            .iter()
            .zip(y_data)
            .zip(&sigma_y)
            .map(|((u, y), s)| (y - model.eval(coefficients, *u)) / s)
            .chain(
                latent
                    .iter()
                    .zip(x_data)
                    .zip(&sigma_x)
                    .map(|((u, x), s)| (x - u) / s),
            )
            .collect()
    };

    let mut initial = opts.initial(n_params, 1.0)?;
    initial.extend(x.iter().map(Obs::value));
    let minimum = minimise(
        |params: &[f64]| chi_terms(params, &data),
        &initial,
        opts.max_iters,
        opts.tolerance,
    )?;

    let objective = |params: &[f64], data: &[f64]| -> f64 {
        chi_terms(params, data).iter().map(|r| r * r).sum()
    };
    let sensitivity = parameter_sensitivity(objective, &minimum.params, &data)?;
    let inputs: Vec<&Obs> = x.iter().chain(y).collect();
    let params = minimum.params[..n_params]
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let gradient: Vec<f64> = sensitivity.row(row).iter().copied().collect();
            Obs::linear(&inputs, *value, &gradient)
        })
        .collect();

    tracing::debug!(
        model = %model.name(),
        chisquare = minimum.chisquare,
        dof,
        iterations = minimum.iterations,
        "total least-squares fit converged"
    );
    Ok(FitResult {
        params,
        chisquare: minimum.chisquare,
        dof,
        chisquare_by_dof: minimum.chisquare / dof as f64,
        method: FitMethod::Odr,
        iterations: minimum.iterations,
    })
}
