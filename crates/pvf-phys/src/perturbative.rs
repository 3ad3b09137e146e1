//! Perturbative running of the coupling.
//!
//! Coefficients follow hep-ph/9701390 eq. 8 with `T_F` replaced by the trace
//! normalisation of the fermion representation (arXiv:1912.13302).

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use pvf_core::{ErrorInfo, PvfError};
use serde::{Deserialize, Serialize};

/// Representation of the dynamical fermions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Adjoint.
    #[default]
    Adj,
    /// Fundamental.
    Fun,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Adj => write!(f, "adj"),
            Representation::Fun => write!(f, "fun"),
        }
    }
}

impl FromStr for Representation {
    type Err = PvfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adj" => Ok(Representation::Adj),
            "fun" => Ok(Representation::Fun),
            other => Err(PvfError::Parse(ErrorInfo::new(
                "unknown-representation",
                format!("no fermion representation named {other}"),
            ))),
        }
    }
}

impl Representation {
    /// Quadratic Casimir `C_R` of SU(Nc).
    pub fn quadratic_casimir(&self, nc: f64) -> f64 {
        match self {
            Representation::Adj => nc,
            Representation::Fun => (nc * nc - 1.0) / (2.0 * nc),
        }
    }

    /// Trace normalisation `T_R` of SU(Nc).
    pub fn trace_normalisation(&self, nc: f64) -> f64 {
        match self {
            Representation::Adj => nc,
            Representation::Fun => 0.5,
        }
    }
}

/// Maximum loop order available.
pub const MAX_LOOPS: usize = 3;

/// `b₀`, `b₁` and `b₂` for `nf` Dirac flavours.
pub fn beta_coefficients(rep: Representation, nf: f64, nc: f64) -> [f64; MAX_LOOPS] {
    let ca = Representation::Adj.quadratic_casimir(nc);
    let cr = rep.quadratic_casimir(nc);
    let tr = rep.trace_normalisation(nc);
    [
        11.0 / 3.0 * ca - 4.0 / 3.0 * tr * nf,
        34.0 / 3.0 * ca.powi(2) - 4.0 * cr * tr * nf - 20.0 / 3.0 * ca * tr * nf,
        2857.0 / 54.0 * ca.powi(3) + 2.0 * cr.powi(2) * tr * nf
            - 205.0 / 9.0 * cr * ca * tr * nf
            - 1415.0 / 27.0 * ca.powi(2) * tr * nf
            + 44.0 / 9.0 * cr * tr.powi(2) * nf.powi(2)
            + 158.0 / 27.0 * ca * tr.powi(2) * nf.powi(2),
    ]
}

/// `β(g²) = -(4π)² Σ_{n<loops} b_n (g²/(4π)²)^{n+2}`.
///
/// `loops` is clamped to [`MAX_LOOPS`].
pub fn perturbative_beta(g2: f64, loops: usize, rep: Representation, nf: f64, nc: f64) -> f64 {
    let scale = (4.0 * PI).powi(2);
    let x = g2 / scale;
    -scale
        * beta_coefficients(rep, nf, nc)
            .iter()
            .take(loops.min(MAX_LOOPS))
            .enumerate()
            .map(|(n, b)| b * x.powi(n as i32 + 2))
            .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_gauge_one_loop_coefficient() {
        let [b0, b1, _] = beta_coefficients(Representation::Fun, 0.0, 3.0);
        assert!((b0 - 11.0).abs() < 1e-12);
        assert!((b1 - 102.0).abs() < 1e-12);
    }

    #[test]
    fn two_adjoint_flavours_of_su2() {
        // b0 = 22/3 - 16/3 = 2 for Nc = 2, Nf = 2 adjoint.
        let [b0, b1, _] = beta_coefficients(Representation::Adj, 2.0, 2.0);
        assert!((b0 - 2.0).abs() < 1e-12);
        assert!((b1 - (136.0 / 3.0 - 32.0 - 160.0 / 3.0)).abs() < 1e-12);
        let g2 = 3.0;
        let expected = -b0 * g2 * g2 / (4.0 * PI).powi(2);
        assert!((perturbative_beta(g2, 1, Representation::Adj, 2.0, 2.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn higher_loops_are_clamped() {
        let three = perturbative_beta(5.0, 3, Representation::Adj, 2.0, 2.0);
        let many = perturbative_beta(5.0, 7, Representation::Adj, 2.0, 2.0);
        assert_eq!(three, many);
    }
}
