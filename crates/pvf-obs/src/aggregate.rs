//! Combination of independent fit results into a single estimate.

use pvf_core::PvfError;

use crate::obs::{stats_error, Obs};

/// Combines parameter vectors with Akaike weights `exp(-aic)`.
///
/// Weights are taken relative to the smallest AIC; the normalised weights are
/// unchanged but cannot all underflow. Fluctuations are propagated linearly,
/// so correlations between results built on the same configurations are kept.
pub fn weighted_mean<P: AsRef<[Obs]>>(results: &[(P, f64)]) -> Result<Vec<Obs>, PvfError> {
    let (first, _) = results
        .first()
        .ok_or_else(|| stats_error("empty-input", "no results to average"))?;
    let n_params = first.as_ref().len();
    let mut aic_min = f64::INFINITY;
    for (params, aic) in results {
        if params.as_ref().len() != n_params {
            return Err(stats_error(
                "parameter-count",
                format!(
                    "results with {} and {n_params} parameters cannot be averaged",
                    params.as_ref().len()
                ),
            ));
        }
        if !aic.is_finite() {
            return Err(stats_error("non-finite-aic", format!("AIC {aic} is not finite")));
        }
        aic_min = aic_min.min(*aic);
    }

    let weights: Vec<f64> = results
        .iter()
        .map(|(_, aic)| (-(aic - aic_min)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    let normalised: Vec<f64> = weights.iter().map(|weight| weight / total).collect();

    let combined = (0..n_params)
        .map(|index| {
            let inputs: Vec<&Obs> = results
                .iter()
                .map(|(params, _)| &params.as_ref()[index])
                .collect();
            let value = inputs
                .iter()
                .zip(&normalised)
                .map(|(obs, weight)| obs.value() * weight)
                .sum();
            let mean = Obs::linear(&inputs, value, &normalised);
            mean.gamma_method();
            mean
        })
        .collect();
    Ok(combined)
}

/// Inverse-variance weighted mean `Σ(o_i/σ_i²) / Σ(1/σ_i²)`.
///
/// The `σ_i` enter as plain numbers; the inputs are assumed uncorrelated.
pub fn weighted_mean_by_uncertainty(results: &[Obs]) -> Result<Obs, PvfError> {
    if results.is_empty() {
        return Err(stats_error("empty-input", "no results to average"));
    }
    let mut inverse_variances = Vec::with_capacity(results.len());
    for result in results {
        let sigma = result.dvalue();
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(stats_error(
                "zero-uncertainty",
                format!("result {} has uncertainty {sigma}", result.value()),
            ));
        }
        inverse_variances.push(1.0 / (sigma * sigma));
    }
    let total: f64 = inverse_variances.iter().sum();
    let weights: Vec<f64> = inverse_variances.iter().map(|w| w / total).collect();
    let value = results
        .iter()
        .zip(&weights)
        .map(|(obs, weight)| obs.value() * weight)
        .sum();
    let inputs: Vec<&Obs> = results.iter().collect();
    let mean = Obs::linear(&inputs, value, &weights);
    mean.gamma_method();
    Ok(mean)
}
