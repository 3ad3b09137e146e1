//! Synthetic Monte Carlo histories with known autocorrelation.

use pvf_core::{PvfError, RngHandle};

use crate::obs::Obs;

/// Parameters of a first-order autoregressive chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ar1 {
    /// Stationary mean.
    pub mean: f64,
    /// Stationary standard deviation.
    pub sigma: f64,
    /// Lag-one autocorrelation, in `(-1, 1)`.
    pub rho: f64,
}

impl Ar1 {
    /// Exact integrated autocorrelation time `(1 + ρ) / (2 (1 - ρ))`.
    pub fn tauint(&self) -> f64 {
        0.5 * (1.0 + self.rho) / (1.0 - self.rho)
    }

    /// Exact error of the mean of `n` measurements, large-`n` limit.
    pub fn error_of_mean(&self, n: usize) -> f64 {
        (2.0 * self.tauint() * self.sigma * self.sigma / n as f64).sqrt()
    }

    /// Draws a history of `len` measurements started from equilibrium.
    pub fn history(&self, rng: &mut RngHandle, len: usize) -> Vec<f64> {
        let innovation = (1.0 - self.rho * self.rho).sqrt();
        let mut state = rng.standard_normal();
        let mut history = Vec::with_capacity(len);
        for _ in 0..len {
            history.push(self.mean + self.sigma * state);
            state = self.rho * state + innovation * rng.standard_normal();
        }
        history
    }

    /// Observable built from `replicas` independent chains of `len` measurements.
    pub fn observable(
        &self,
        seed: u64,
        ensemble: &str,
        replicas: usize,
        len: usize,
    ) -> Result<Obs, PvfError> {
        let samples: Vec<Vec<f64>> = (0..replicas)
            .map(|replica| self.history(&mut RngHandle::for_replica(seed, replica as u64), len))
            .collect();
        let names = if replicas == 1 {
            vec![ensemble.to_string()]
        } else {
            (0..replicas).map(|r| format!("{ensemble}|r{r}")).collect()
        };
        Obs::new(samples, names, None)
    }
}
