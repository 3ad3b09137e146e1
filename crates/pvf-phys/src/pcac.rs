//! PCAC mass from axial and pseudoscalar two-point functions.

use pvf_core::{ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_fit::{least_squares, Constant, FitOpts, FitResult};
use pvf_obs::{weighted_mean, Corr, DerivVariant, Obs};
use pvf_read::MesonCorrelators;

/// Pseudoscalar channel.
pub const PP_CHANNEL: &str = "g5";
/// Axial-pseudoscalar channel.
pub const AP_CHANNEL: &str = "g5_g0g5_re";
/// First time slice of any fit window.
pub const MIN_TMIN: usize = 4;

const DESCRIPTION: &str = "PCAC mass for ensemble as detailed below.";

/// `m(t) = ∂_t C_AP(t) / (2 C_PP(t))` with the symmetric derivative.
pub fn pcac_eff_mass(correlators: &MesonCorrelators) -> Result<Corr, PvfError> {
    let pp = correlators.correlator(PP_CHANNEL)?;
    let ap = correlators.correlator(AP_CHANNEL)?;
    ap.deriv(DerivVariant::Symmetric)?.div_corr(&(pp * 2.0))
}

/// Constant fit to the effective mass on `tmin..=tmax`.
pub fn fit_pcac(eff_mass: &Corr, tmin: usize, tmax: usize) -> Result<FitResult, PvfError> {
    let x: Vec<f64> = (tmin..=tmax).map(|t| t as f64).collect();
    let y = (tmin..=tmax)
        .map(|t| eff_mass.require(t).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    least_squares(&x, &y, &Constant, &FitOpts::default())
}

/// Fit windows `tmin ∈ [4, NT/2 - 1)`, `tmax ∈ (tmin, NT/2)`.
pub fn pcac_windows(nt: usize) -> Vec<(usize, usize)> {
    let half = nt / 2;
    (MIN_TMIN..half.saturating_sub(1))
        .flat_map(|tmin| (tmin + 1..half).map(move |tmax| (tmin, tmax)))
        .collect()
}

/// One fit window and its Akaike weight exponent.
#[derive(Debug, Clone, PartialEq)]
pub struct PcacWindow {
    /// First fitted slice.
    pub tmin: usize,
    /// Last fitted slice.
    pub tmax: usize,
    /// Constant fit over the window.
    pub fit: FitResult,
    /// `χ²/dof + 2k + 2 N_cut` with `N_cut = NT + tmax - tmin`.
    pub aic: f64,
}

/// Model-averaged PCAC mass of one ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct PcacMass {
    /// Averaged mass.
    pub mass: Obs,
    /// Effective mass the windows were fitted to.
    pub eff_mass: Corr,
    /// Every window in fit order.
    pub windows: Vec<PcacWindow>,
    /// Provenance stored with the result.
    pub description: Metadata,
}

/// Fits every window and averages the constants with AIC weights.
///
/// `extra` (typically `Npv` and `mpv`) is stored with the ensemble metadata.
pub fn mpcac(correlators: &MesonCorrelators, extra: Metadata) -> Result<PcacMass, PvfError> {
    let masses = correlators.valence_masses();
    if masses.len() != 1 {
        return Err(PvfError::Metadata(
            ErrorInfo::new(
                "valence-mass-count",
                format!("This code expects 1 valence mass; {} found", masses.len()),
            )
            .with_context("filename", correlators.filename.clone()),
        ));
    }
    let eff_mass = pcac_eff_mass(correlators)?;
    let nt = correlators.nt;
    let windows = pcac_windows(nt)
        .into_iter()
        .map(|(tmin, tmax)| {
            let fit = fit_pcac(&eff_mass, tmin, tmax)?;
            let n_cut = nt + (tmax - tmin);
            let aic = pvf_fit::aic(fit.chisquare_by_dof, fit.params.len(), n_cut);
            Ok(PcacWindow {
                tmin,
                tmax,
                fit,
                aic,
            })
        })
        .collect::<Result<Vec<_>, PvfError>>()?;
    let weighted: Vec<(&[Obs], f64)> = windows
        .iter()
        .map(|window| (window.fit.params.as_slice(), window.aic))
        .collect();
    let mass = weighted_mean(&weighted)?.into_iter().next().ok_or_else(|| {
        PvfError::Fit(ErrorInfo::new("empty-fit", "window fits returned no parameters"))
    })?;

    let mut description = Metadata::new();
    description.insert("description".to_string(), DESCRIPTION.into());
    description.insert(
        "input_filename".to_string(),
        MetaValue::from(correlators.filename.clone()),
    );
    description.extend(correlators.metadata.clone());
    description.extend(extra);
    Ok(PcacMass {
        mass,
        eff_mass,
        windows,
        description,
    })
}
