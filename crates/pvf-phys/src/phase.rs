//! Plaquette phase diagram over bare couplings and masses.

use std::io::Write;
use std::path::{Path, PathBuf};

use pvf_core::{ErrorInfo, PvfError};
use pvf_obs::Obs;
use pvf_read::{read_hmc_log, HmcOpts, HmcStream};
use serde::{Deserialize, Serialize};

/// Pauli-Villars content of a scan line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvSpec {
    /// Number of Pauli-Villars fields.
    pub npv: u32,
    /// Their mass; absent without Pauli-Villars fields.
    #[serde(default)]
    pub mpv: Option<f64>,
}

fn default_raw_data() -> PathBuf {
    PathBuf::from("raw_data")
}

fn default_subdir() -> String {
    "phasediagram".to_string()
}

fn default_betas() -> Vec<f64> {
    (14..=28).map(|tenths| tenths as f64 / 10.0).collect()
}

fn default_masses() -> Vec<f64> {
    let mut masses: Vec<f64> = (-29..=-10).map(|tenths| tenths as f64 / 10.0).collect();
    masses.extend((-19..=-11).map(|twentieths| twentieths as f64 / 20.0));
    masses.extend([-0.5, -0.45, -0.4, -0.35, -0.3, -0.2, -0.1]);
    masses.extend((0..=10).map(|tenths| tenths as f64 / 10.0));
    masses
}

fn default_pv_specs() -> Vec<PvSpec> {
    let mut specs = vec![PvSpec { npv: 0, mpv: None }];
    for npv in [5, 10, 15] {
        for mpv in [0.5, 1.0] {
            specs.push(PvSpec {
                npv,
                mpv: Some(mpv),
            });
        }
    }
    specs
}

/// Points to scan and where to find their HMC logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseScan {
    /// Root of the log tree.
    #[serde(default = "default_raw_data")]
    pub raw_data: PathBuf,
    /// Subdirectory holding this scan.
    #[serde(default = "default_subdir")]
    pub subdir: String,
    /// Bare couplings.
    #[serde(default = "default_betas")]
    pub betas: Vec<f64>,
    /// Bare fermion masses.
    #[serde(default = "default_masses")]
    pub masses: Vec<f64>,
    /// Pauli-Villars settings.
    #[serde(default = "default_pv_specs")]
    pub pv_specs: Vec<PvSpec>,
    /// Cuts applied to each HMC stream.
    #[serde(default)]
    pub hmc: HmcOpts,
    /// Title written above the figures.
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for PhaseScan {
    fn default() -> Self {
        Self {
            raw_data: default_raw_data(),
            subdir: default_subdir(),
            betas: default_betas(),
            masses: default_masses(),
            pv_specs: default_pv_specs(),
            hmc: HmcOpts::default(),
            title: None,
        }
    }
}

impl PhaseScan {
    /// Loads a scan definition from YAML; missing fields take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, PvfError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| PvfError::io("read-failed", path, err))?;
        serde_yaml::from_str(&text).map_err(|err| {
            PvfError::Serde(ErrorInfo::new("invalid-scan", err.to_string()).with_path(path))
        })
    }

    /// Glob matching every stream of one point.
    pub fn pattern(&self, spec: &PvSpec, beta: f64, mass: f64) -> String {
        let mpv_slug = match (spec.npv, spec.mpv) {
            (0, _) | (_, None) => String::new(),
            (_, Some(mpv)) => format!("_mpv{mpv:?}"),
        };
        let name = format!("out_hmc_{}pv_beta{beta:?}_m{mass:?}{mpv_slug}_*", spec.npv);
        self.raw_data.join(&self.subdir).join(name).display().to_string()
    }
}

/// Plaquette at one point of the phase diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasePoint {
    /// Number of Pauli-Villars fields.
    pub npv: u32,
    /// Pauli-Villars mass.
    pub mpv: Option<f64>,
    /// Bare coupling.
    pub beta: f64,
    /// Bare fermion mass.
    pub mass: f64,
    /// Log the plaquette was taken from.
    pub filename: String,
    /// Plaquette after thermalisation.
    pub plaquette: Obs,
}

#[derive(Debug, Serialize)]
struct PhaseRow<'a> {
    npv: u32,
    mpv: Option<f64>,
    beta: f64,
    mass: f64,
    plaquette_value: f64,
    plaquette_error: f64,
    filename: &'a str,
}

fn effective_samples(stream: &HmcStream) -> f64 {
    let n = stream.plaquette.n_samples() as f64;
    match stream.plaquette.tauint(&stream.filename) {
        Some(tauint) if tauint > 0.0 => n / tauint,
        _ => n,
    }
}

/// Stream with the smallest `N / τ_int`; the first one wins ties.
pub fn best_stream(streams: Vec<HmcStream>) -> Option<HmcStream> {
    streams
        .into_iter()
        .min_by(|a, b| effective_samples(a).total_cmp(&effective_samples(b)))
}

fn glob_error(pattern: &str, err: impl std::fmt::Display) -> PvfError {
    PvfError::Io(ErrorInfo::new("glob-failed", err.to_string()).with_context("pattern", pattern))
}

/// Best usable stream of one point, if any.
pub fn point_plaquette(
    scan: &PhaseScan,
    spec: &PvSpec,
    beta: f64,
    mass: f64,
) -> Result<Option<HmcStream>, PvfError> {
    let pattern = scan.pattern(spec, beta, mass);
    let mut streams = Vec::new();
    for entry in glob::glob(&pattern).map_err(|err| glob_error(&pattern, err))? {
        let path = entry.map_err(|err| glob_error(&pattern, err))?;
        if let Some(stream) = read_hmc_log(&path, &scan.hmc)? {
            streams.push(stream);
        }
    }
    Ok(best_stream(streams))
}

/// Scans every point; points without a usable stream are left out.
pub fn scan_phase_diagram(scan: &PhaseScan) -> Result<Vec<PhasePoint>, PvfError> {
    let mut points = Vec::new();
    for spec in &scan.pv_specs {
        for &beta in &scan.betas {
            for &mass in &scan.masses {
                let Some(stream) = point_plaquette(scan, spec, beta, mass)? else {
                    continue;
                };
                points.push(PhasePoint {
                    npv: spec.npv,
                    mpv: spec.mpv,
                    beta,
                    mass,
                    filename: stream.filename,
                    plaquette: stream.plaquette,
                });
            }
        }
    }
    tracing::info!(points = points.len(), "phase diagram scanned");
    Ok(points)
}

/// Points of one Pauli-Villars setting and coupling, ordered by mass.
pub fn select<'a>(points: &'a [PhasePoint], spec: &PvSpec, beta: f64) -> Vec<&'a PhasePoint> {
    let mut selected: Vec<&PhasePoint> = points
        .iter()
        .filter(|point| point.npv == spec.npv && point.beta == beta)
        .filter(|point| spec.mpv.is_none() || point.mpv == spec.mpv)
        .collect();
    selected.sort_by(|a, b| a.mass.total_cmp(&b.mass));
    selected
}

/// Writes the scanned plaquettes as CSV.
pub fn write_phase_table<W: Write>(points: &[PhasePoint], writer: W) -> Result<(), PvfError> {
    let csv_error =
        |err: csv::Error| PvfError::Serde(ErrorInfo::new("csv-write-failed", err.to_string()));
    let mut out = csv::Writer::from_writer(writer);
    for point in points {
        out.serialize(PhaseRow {
            npv: point.npv,
            mpv: point.mpv,
            beta: point.beta,
            mass: point.mass,
            plaquette_value: point.plaquette.value(),
            plaquette_error: point.plaquette.dvalue(),
            filename: &point.filename,
        })
        .map_err(csv_error)?;
    }
    out.flush()
        .map_err(|err| PvfError::Serde(ErrorInfo::new("csv-write-failed", err.to_string())))
}
