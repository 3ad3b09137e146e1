//! Interpolation of the finite-lattice-spacing beta function.

use pvf_core::{describe_inputs, ErrorInfo, Metadata, PvfError};
use pvf_fit::{least_squares, total_least_squares, BetaInterpolation, FitOpts, FitResult};
use pvf_obs::Obs;
use pvf_read::FitRecord;

use crate::flow_obs::Scale;

/// Key under which the coefficients are stored.
pub const BETA_INTERPOLATION_KEY: &str = "beta_interpolation";

const DESCRIPTION: &str = "Interpolating form for beta function at finite lattice spacing.";
const SPECIFIC_KEYS: [&str; 2] = ["filename", "beta"];
const CONSISTENT_KEYS: [&str; 5] = ["Npv", "mpv", "time", "Nc", "operator"];

/// Fitted beta function with the stored description.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaFit {
    /// Coefficients `a_i` of `g⁴ Σ a_i g²ⁱ`.
    pub fit: FitResult,
    /// Provenance of the fit.
    pub description: Metadata,
}

/// Infinite-volume `(g²_GF, β_GF)` of each extrapolation result.
pub fn extrapolated_points(records: &[FitRecord]) -> Result<(Vec<Obs>, Vec<Obs>), PvfError> {
    let mut coupling = Vec::with_capacity(records.len());
    let mut beta = Vec::with_capacity(records.len());
    for record in records {
        coupling.push(intercept(record, Scale::CouplingSquared)?);
        beta.push(intercept(record, Scale::Beta)?);
    }
    Ok((coupling, beta))
}

fn intercept(record: &FitRecord, scale: Scale) -> Result<Obs, PvfError> {
    let entry = record.entry(scale.key())?;
    entry.first().cloned().ok_or_else(|| {
        PvfError::Parse(
            ErrorInfo::new("empty-entry", format!("{scale} holds no observables"))
                .with_context("filename", record.filename.clone()),
        )
    })
}

/// Fits `β_GF(g²_GF)` across bare couplings with errors on both axes.
pub fn fit_beta_function(records: &[FitRecord], order: usize) -> Result<BetaFit, PvfError> {
    let (coupling, beta) = extrapolated_points(records)?;
    let model = BetaInterpolation { order };
    // Start from the ordinary fit at the central couplings.
    let centres: Vec<f64> = coupling.iter().map(Obs::value).collect();
    let start = least_squares(&centres, &beta, &model, &FitOpts::default())?;
    let fit = total_least_squares(
        &coupling,
        &beta,
        &model,
        &FitOpts::with_initial_guess(start.values()),
    )?;
    let mut extra = Metadata::new();
    extra.insert("order".to_string(), order.into());
    let description =
        describe_inputs(records, DESCRIPTION, &SPECIFIC_KEYS, &CONSISTENT_KEYS, extra)?;
    Ok(BetaFit { fit, description })
}
