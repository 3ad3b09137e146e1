//! Gradient-flow coupling in a finite periodic box.

use std::f64::consts::PI;

use pvf_core::PvfError;
use pvf_obs::{Corr, DerivVariant};

fn theta3_series(q: f64) -> f64 {
    let mut sum = 1.0;
    for n in 1.. {
        let term = 2.0 * q.powi(n * n);
        sum += term;
        if term < f64::EPSILON * sum {
            break;
        }
    }
    sum
}

/// Jacobi theta function `θ₃(0, e^{-a})` for `a > 0`.
///
/// Small `a` is mapped through `θ₃(0, e^{-a}) = sqrt(π/a) θ₃(0, e^{-π²/a})`
/// so the series always converges quickly.
pub fn jacobi_theta3(a: f64) -> f64 {
    if !(a > 0.0) || a.is_infinite() {
        return 1.0;
    }
    if a < PI {
        (PI / a).sqrt() * theta3_series((-PI * PI / a).exp())
    } else {
        theta3_series((-a).exp())
    }
}

/// `δ(t) + 1` of arXiv:1208.1051 eq. 1.3 for an `L⁴` box.
pub fn finite_volume_factor(time: f64, extent: f64) -> f64 {
    if time <= 0.0 {
        return 1.0;
    }
    -64.0 * time * time * PI * PI / (3.0 * extent.powi(4))
        + jacobi_theta3(extent * extent / (8.0 * time)).powi(4)
}

/// Normalisation turning `t²E` into `g²_GF` at each flow time.
pub fn coupling_coefficients(times: &[f64], nc: f64, extent: f64) -> Vec<f64> {
    times
        .iter()
        .map(|time| {
            128.0 * PI * PI / (3.0 * (nc * nc - 1.0) * finite_volume_factor(*time, extent))
        })
        .collect()
}

/// `g²_GF(t) = 128π² t²E(t) / (3 (Nc² - 1) (δ(t) + 1))`.
pub fn normalize_coupling(
    t2e: &Corr,
    times: &[f64],
    nc: f64,
    extent: f64,
) -> Result<Corr, PvfError> {
    t2e.partial_mult(&coupling_coefficients(times, nc, extent))
}

/// Logarithmic flow-time derivative `t d/dt` with step `h`.
pub fn t_d_dt(corr: &Corr, times: &[f64], h: f64, variant: DerivVariant) -> Result<Corr, PvfError> {
    (corr.deriv(variant)? / h).partial_mult(times)
}
