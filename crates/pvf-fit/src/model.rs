//! Fit models.

use std::fmt;

/// Function of one variable with a fixed number of parameters.
pub trait Model {
    /// Number of fit parameters.
    fn n_params(&self) -> usize;

    /// Evaluates the model at `x`.
    fn eval(&self, params: &[f64], x: f64) -> f64;

    /// Short label used in logs and result descriptions.
    fn name(&self) -> String {
        "model".to_string()
    }

    /// Central-difference gradient with respect to the parameters.
    fn gradient(&self, params: &[f64], x: f64) -> Vec<f64> {
        let mut shifted = params.to_vec();
        (0..params.len())
            .map(|index| {
                let step = 1e-6 * params[index].abs().max(1e-3);
                shifted[index] = params[index] + step;
                let up = self.eval(&shifted, x);
                shifted[index] = params[index] - step;
                let down = self.eval(&shifted, x);
                shifted[index] = params[index];
                (up - down) / (2.0 * step)
            })
            .collect()
    }
}

impl<M: Model + ?Sized> Model for &M {
    fn n_params(&self) -> usize {
        (**self).n_params()
    }

    fn eval(&self, params: &[f64], x: f64) -> f64 {
        (**self).eval(params, x)
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn gradient(&self, params: &[f64], x: f64) -> Vec<f64> {
        (**self).gradient(params, x)
    }
}

/// Model backed by a closure.
pub struct FnModel<F> {
    n_params: usize,
    name: String,
    f: F,
}

impl<F: Fn(&[f64], f64) -> f64> FnModel<F> {
    /// Wraps `f` as a model with `n_params` parameters.
    pub fn new(name: impl Into<String>, n_params: usize, f: F) -> Self {
        Self {
            n_params,
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnModel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("n_params", &self.n_params)
            .finish()
    }
}

impl<F: Fn(&[f64], f64) -> f64> Model for FnModel<F> {
    fn n_params(&self) -> usize {
        self.n_params
    }

    fn eval(&self, params: &[f64], x: f64) -> f64 {
        (self.f)(params, x)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// `a0 + a1 x`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Linear;

impl Model for Linear {
    fn n_params(&self) -> usize {
        2
    }

    fn eval(&self, params: &[f64], x: f64) -> f64 {
        params[0] + params[1] * x
    }

    fn name(&self) -> String {
        "linear".to_string()
    }

    fn gradient(&self, _params: &[f64], x: f64) -> Vec<f64> {
        vec![1.0, x]
    }
}

/// `a0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant;

impl Model for Constant {
    fn n_params(&self) -> usize {
        1
    }

    fn eval(&self, params: &[f64], _x: f64) -> f64 {
        params[0]
    }

    fn name(&self) -> String {
        "constant".to_string()
    }

    fn gradient(&self, _params: &[f64], _x: f64) -> Vec<f64> {
        vec![1.0]
    }
}

/// `B (m - m0)^C` with parameters `[m0, B, C]`.
///
/// Used for the PCAC mass as a function of the bare mass; `m0` is the
/// critical mass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerLaw;

impl PowerLaw {
    /// Initial guess that converges for typical PCAC data.
    pub const INITIAL_GUESS: [f64; 3] = [-2.0, 1.0, 1.0];

    /// Bare mass at which the model takes the value `y`.
    pub fn inverse(params: &[f64], y: f64) -> f64 {
        params[0] + (y / params[1]).powf(1.0 / params[2])
    }
}

impl Model for PowerLaw {
    fn n_params(&self) -> usize {
        3
    }

    fn eval(&self, params: &[f64], m: f64) -> f64 {
        params[1] * (m - params[0]).powf(params[2])
    }

    fn name(&self) -> String {
        "power_law".to_string()
    }
}

/// `x² Σ_{i<order} a_i xⁱ`, the interpolating form of the beta function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaInterpolation {
    /// Number of coefficients.
    pub order: usize,
}

impl Default for BetaInterpolation {
    fn default() -> Self {
        Self { order: 4 }
    }
}

impl Model for BetaInterpolation {
    fn n_params(&self) -> usize {
        self.order
    }

    fn eval(&self, params: &[f64], x: f64) -> f64 {
        let polynomial = params
            .iter()
            .rev()
            .fold(0.0, |acc, coefficient| acc * x + coefficient);
        x * x * polynomial
    }

    fn name(&self) -> String {
        format!("beta_interpolation_{}", self.order)
    }

    fn gradient(&self, params: &[f64], x: f64) -> Vec<f64> {
        let mut power = x * x;
        params
            .iter()
            .map(|_| {
                let value = power;
                power *= x;
                value
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_inverse_round_trips() {
        let params = [0.3, 2.0, 1.5];
        let y = PowerLaw.eval(&params, 0.7);
        assert!((PowerLaw::inverse(&params, y) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn beta_interpolation_matches_explicit_sum() {
        let model = BetaInterpolation { order: 3 };
        let params = [1.0, -0.5, 0.25];
        let x: f64 = 1.7;
        let expected = x.powi(2) * (1.0 - 0.5 * x + 0.25 * x * x);
        assert!((model.eval(&params, x) - expected).abs() < 1e-12);
    }

    #[test]
    fn numerical_gradient_agrees_with_the_analytic_one() {
        let model = BetaInterpolation::default();
        let params = [0.4, -0.1, 0.02, 0.003];
        let closure = FnModel::new("copy", 4, |p: &[f64], x: f64| model.eval(p, x));
        let numeric = closure.gradient(&params, 2.5);
        for (a, b) in numeric.iter().zip(model.gradient(&params, 2.5)) {
            assert!((a - b).abs() < 1e-6 * b.abs().max(1.0));
        }
    }
}
