use pvf_core::PvfError;
use pvf_obs::{covariance, Obs};

use crate::fit_error;
use crate::model::Model;

/// One-sigma uncertainty of the model curve, `sqrt(gᵀ C g)` at every `x`.
///
/// `g` is the parameter gradient of the model and `C` the covariance of the
/// fitted parameters.
pub fn error_band<M: Model>(xs: &[f64], model: &M, params: &[Obs]) -> Result<Vec<f64>, PvfError> {
    if params.len() != model.n_params() {
        return Err(fit_error(
            "parameter-count",
            format!(
                "{} parameters given for a model with {}",
                params.len(),
                model.n_params()
            ),
        ));
    }
    let values: Vec<f64> = params.iter().map(Obs::value).collect();
    let cov = covariance(params);
    Ok(xs
        .iter()
        .map(|x| {
            let gradient = nalgebra::DVector::from_vec(model.gradient(&values, *x));
            let variance = (gradient.transpose() * &cov * &gradient)[(0, 0)];
            variance.max(0.0).sqrt()
        })
        .collect())
}
