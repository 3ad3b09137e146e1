//! Levenberg-Marquardt minimisation of a sum of squared residuals.

use nalgebra::{DMatrix, DVector};
use pvf_core::PvfError;

use crate::fit_error;

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e16;

/// Outcome of a minimisation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Minimum {
    pub params: Vec<f64>,
    pub chisquare: f64,
    pub iterations: usize,
}

fn chisquare(residuals: &[f64]) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

fn jacobian<R>(residuals: &R, params: &[f64], base: &[f64]) -> DMatrix<f64>
where
    R: Fn(&[f64]) -> Vec<f64>,
{
    let mut jac = DMatrix::zeros(base.len(), params.len());
    let mut shifted = params.to_vec();
    for col in 0..params.len() {
        let step = 1e-7 * params[col].abs().max(1e-3);
        shifted[col] = params[col] + step;
        let up = residuals(&shifted);
        shifted[col] = params[col] - step;
        let down = residuals(&shifted);
        shifted[col] = params[col];
        for row in 0..base.len() {
            let derivative = (up[row] - down[row]) / (2.0 * step);
            // Fall back to a one-sided difference when the lower point is outside the domain.
            jac[(row, col)] = if derivative.is_finite() {
                derivative
            } else {
                (up[row] - base[row]) / step
            };
        }
    }
    jac
}

/// Minimises `Σ r_i(p)²` starting from `initial`.
pub(crate) fn minimise<R>(
    residuals: R,
    initial: &[f64],
    max_iters: usize,
    tolerance: f64,
) -> Result<Minimum, PvfError>
where
    R: Fn(&[f64]) -> Vec<f64>,
{
    let mut params = initial.to_vec();
    let mut current = residuals(&params);
    let mut chi2 = chisquare(&current);
    if !chi2.is_finite() {
        return Err(fit_error(
            "invalid-initial-guess",
            format!("chi-square is not finite at the initial guess {initial:?}"),
        ));
    }

    let mut lambda = LAMBDA_START;
    for iteration in 1..=max_iters {
        let jac = jacobian(&residuals, &params, &current);
        let jt = jac.transpose();
        let normal = &jt * &jac;
        let gradient = &jt * DVector::from_column_slice(&current);

        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = normal.clone();
            for i in 0..params.len() {
                damped[(i, i)] += lambda * normal[(i, i)].max(1e-12);
            }
            let Some(step) = damped.lu().solve(&(-&gradient)) else {
                lambda *= 10.0;
                continue;
            };
            let trial: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
            let trial_residuals = residuals(&trial);
            let trial_chi2 = chisquare(&trial_residuals);
            if trial_chi2.is_finite() && trial_chi2 <= chi2 {
                let decrease = chi2 - trial_chi2;
                let step_norm = step.norm();
                let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
                params = trial;
                current = trial_residuals;
                chi2 = trial_chi2;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;
                if decrease <= tolerance * (chi2 + tolerance)
                    || step_norm <= tolerance * (param_norm + tolerance)
                {
                    return Ok(Minimum {
                        params,
                        chisquare: chi2,
                        iterations: iteration,
                    });
                }
                break;
            }
            lambda *= 10.0;
        }
        if !accepted {
            // No downhill step at any damping: the current point is a minimum to machine precision.
            return Ok(Minimum {
                params,
                chisquare: chi2,
                iterations: iteration,
            });
        }
    }

    tracing::warn!(max_iters, chisquare = chi2, "minimisation did not converge");
    Err(fit_error(
        "not-converged",
        format!("minimisation did not converge within {max_iters} iterations"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosenbrock_valley_is_found() {
        let residuals = |p: &[f64]| vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]];
        let minimum = minimise(residuals, &[-1.2, 1.0], 1000, 1e-14).expect("minimum");
        assert!((minimum.params[0] - 1.0).abs() < 1e-5);
        assert!((minimum.params[1] - 1.0).abs() < 1e-5);
        assert!(minimum.chisquare < 1e-10);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let residuals = |p: &[f64]| vec![(p[0]).sqrt()];
        let err = minimise(residuals, &[-1.0], 10, 1e-12).unwrap_err();
        assert_eq!(err.info().code, "invalid-initial-guess");
    }
}
