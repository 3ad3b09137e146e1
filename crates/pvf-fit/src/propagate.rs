//! Error propagation from the data to the fitted parameters.
//!
//! At the minimum, `∂χ²/∂p = 0` for every value of the data `d`, so the
//! implicit-function theorem gives `∂p/∂d = -H_pp⁻¹ H_pd` with `H` the
//! Hessian of `χ²(p, d)`.

use nalgebra::DMatrix;
use pvf_core::PvfError;

use crate::fit_error;

fn step_for(value: f64) -> f64 {
    1e-4 * value.abs().max(1e-3)
}

fn second_derivative<F>(
    eval: &F,
    point: &mut [f64],
    centre: f64,
    steps: &[f64],
    a: usize,
    b: usize,
) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let (base_a, base_b) = (point[a], point[b]);
    let (h_a, h_b) = (steps[a], steps[b]);
    if a == b {
        point[a] = base_a + h_a;
        let up = eval(point);
        point[a] = base_a - h_a;
        let down = eval(point);
        point[a] = base_a;
        return (up - 2.0 * centre + down) / (h_a * h_a);
    }
    let mut corner = |sa: f64, sb: f64| {
        point[a] = base_a + sa * h_a;
        point[b] = base_b + sb * h_b;
        let value = eval(point);
        point[a] = base_a;
        point[b] = base_b;
        value
    };
    (corner(1.0, 1.0) - corner(1.0, -1.0) - corner(-1.0, 1.0) + corner(-1.0, -1.0))
        / (4.0 * h_a * h_b)
}

/// Returns `∂p/∂d` as a `params × data` matrix.
pub(crate) fn parameter_sensitivity<F>(
    objective: F,
    params: &[f64],
    data: &[f64],
) -> Result<DMatrix<f64>, PvfError>
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    let n_p = params.len();
    let n_d = data.len();
    let mut point: Vec<f64> = params.iter().chain(data).copied().collect();
    let steps: Vec<f64> = point.iter().map(|value| step_for(*value)).collect();
    let eval = |point: &[f64]| objective(&point[..n_p], &point[n_p..]);
    let centre = eval(&point);

    let mut h_pp = DMatrix::zeros(n_p, n_p);
    for a in 0..n_p {
        for b in a..n_p {
            let value = second_derivative(&eval, &mut point, centre, &steps, a, b);
            h_pp[(a, b)] = value;
            h_pp[(b, a)] = value;
        }
    }
    let mut h_pd = DMatrix::zeros(n_p, n_d);
    for a in 0..n_p {
        for j in 0..n_d {
            h_pd[(a, j)] = second_derivative(&eval, &mut point, centre, &steps, a, n_p + j);
        }
    }

    if h_pp.iter().chain(h_pd.iter()).any(|value| !value.is_finite()) {
        return Err(fit_error(
            "non-finite-hessian",
            "chi-square Hessian is not finite at the minimum",
        ));
    }
    let inverse = h_pp.try_inverse().ok_or_else(|| {
        fit_error(
            "singular-hessian",
            "chi-square Hessian is singular at the minimum; parameters are degenerate",
        )
    })?;
    Ok(-(inverse * h_pd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_mean_sensitivity_is_the_weight() {
        // chi2 = Σ ((d_i - p)/σ_i)², minimum at the inverse-variance mean.
        let sigmas = [1.0, 2.0];
        let objective = |p: &[f64], d: &[f64]| {
            d.iter()
                .zip(&sigmas)
                .map(|(d, s)| ((d - p[0]) / s).powi(2))
                .sum::<f64>()
        };
        let data = [1.0, 3.0];
        let weights = [1.0, 0.25];
        let mean = (data[0] * weights[0] + data[1] * weights[1]) / 1.25;
        let sensitivity = parameter_sensitivity(objective, &[mean], &data).expect("sensitivity");
        assert!((sensitivity[(0, 0)] - 0.8).abs() < 1e-6);
        assert!((sensitivity[(0, 1)] - 0.2).abs() < 1e-6);
    }
}
