//! Infinite-volume extrapolation of the flow coupling at fixed flow time.

use std::collections::BTreeMap;

use pvf_core::{consistent_metadata, describe_inputs, Metadata, PvfError};
use pvf_fit::{least_squares, zip_combinations, FitOpts, FitResult, Linear};
use pvf_obs::{weighted_mean, Obs};
use pvf_read::Operator;

use crate::flow_obs::{FlowObservables, Scale};

/// Smallest number of volumes entering one linear fit.
pub const MIN_VOLUMES: usize = 3;

const DESCRIPTION: &str = "Infinite volume extrapolation for gradient flow data.";
const ENSEMBLE_KEYS: [&str; 6] = ["filename", "NX", "NY", "NZ", "NT", "reader"];
const CONSISTENT_KEYS: [&str; 4] = ["Npv", "mpv", "beta", "Nc"];

/// Extrapolated intercept and slope per scale, with the stored description.
#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteVolume {
    /// `[a0, a1]` of `a0 + a1 / L⁴` per scale key.
    pub results: BTreeMap<String, Vec<Obs>>,
    /// Provenance of the extrapolation.
    pub description: Metadata,
}

/// `(1/L⁴, value)` pairs of one scale at flow time `time`.
pub fn finite_volume_points(
    data: &[FlowObservables],
    scale: Scale,
    time: f64,
) -> Result<(Vec<f64>, Vec<Obs>), PvfError> {
    let mut x = Vec::with_capacity(data.len());
    let mut y = Vec::with_capacity(data.len());
    for datum in data {
        x.push(datum.spatial_extent()?.powi(4).recip());
        y.push(datum.at_time(scale, time)?.clone());
    }
    Ok((x, y))
}

fn aic_of(fit: &FitResult) -> f64 {
    // Eq. 7 of arXiv:2402.18038.
    pvf_fit::aic(fit.chisquare_by_dof, fit.params.len(), 0)
}

/// Fits every subset of at least [`MIN_VOLUMES`] volumes and averages with AIC weights.
pub fn fit_scale(data: &[FlowObservables], scale: Scale, time: f64) -> Result<Vec<Obs>, PvfError> {
    let (x, y) = finite_volume_points(data, scale, time)?;
    let fits = zip_combinations(&x, &y, MIN_VOLUMES)
        .into_iter()
        .map(|(x_subset, y_subset)| {
            let fit = least_squares(&x_subset, &y_subset, &Linear, &FitOpts::default())?;
            let aic = aic_of(&fit);
            Ok((fit.params, aic))
        })
        .collect::<Result<Vec<_>, PvfError>>()?;
    tracing::debug!(%scale, time, fits = fits.len(), "combining volume subsets");
    weighted_mean(&fits)
}

/// Extrapolates `g²_GF` and `β_GF` at flow time `time` to infinite volume.
///
/// All inputs must share a single bare coupling.
pub fn extrapolate_infinite_volume(
    data: &[FlowObservables],
    time: f64,
    operator: Operator,
) -> Result<InfiniteVolume, PvfError> {
    consistent_metadata(data, "beta")?;

    let mut results = BTreeMap::new();
    for scale in Scale::EXTRAPOLATED {
        results.insert(scale.key().to_string(), fit_scale(data, scale, time)?);
    }

    let mut extra = Metadata::new();
    extra.insert("operator".to_string(), operator.to_string().into());
    extra.insert("time".to_string(), time.into());
    let description = describe_inputs(data, DESCRIPTION, &ENSEMBLE_KEYS, &CONSISTENT_KEYS, extra)?;
    Ok(InfiniteVolume {
        results,
        description,
    })
}
