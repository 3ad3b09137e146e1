//! Critical bare mass from the vanishing of the PCAC mass.

use std::io::Write;

use pvf_core::{require_consistent, ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_fit::{least_squares, FitOpts, FitResult, PowerLaw};
use pvf_obs::Obs;
use pvf_read::ObsRecord;
use serde::Serialize;

const DESCRIPTION: &str = "Critical bare fermion mass for set of ensembles described below.";

/// Keys every PCAC input must agree on.
pub const CONSISTENT_KEYS: [&str; 7] = [
    "group_family",
    "Nc",
    "beta",
    "valence_representation",
    "dynamical_representation",
    "Npv",
    "mpv",
];

/// Power-law fit of the PCAC mass against the bare mass.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalMassFit {
    /// Number of lightest masses left out.
    pub skip: usize,
    /// Bare masses that entered the fit, ascending.
    pub masses: Vec<f64>,
    /// PCAC masses that entered the fit.
    pub pcac: Vec<Obs>,
    /// Fit with parameters `[m0, B, C]`.
    pub fit: FitResult,
}

impl CriticalMassFit {
    /// Critical mass `m0`.
    pub fn critical_mass(&self) -> Result<&Obs, PvfError> {
        self.fit.params.first().ok_or_else(|| {
            PvfError::Fit(ErrorInfo::new("empty-fit", "fit returned no parameters"))
        })
    }
}

/// Bare valence mass of a PCAC result.
pub fn valence_mass(record: &ObsRecord) -> Result<f64, PvfError> {
    record
        .metadata
        .get("valence_masses")
        .and_then(MetaValue::as_list)
        .and_then(|masses| masses.first())
        .and_then(MetaValue::as_f64)
        .ok_or_else(|| {
            PvfError::Metadata(
                ErrorInfo::new("missing-key", "result has no valence mass")
                    .with_context("key", "valence_masses")
                    .with_context("filename", record.filename.clone()),
            )
        })
}

/// Metadata shared by every input, failing when any key differs.
pub fn consistent_ensemble_metadata(records: &[ObsRecord]) -> Result<Metadata, PvfError> {
    require_consistent(records, &CONSISTENT_KEYS)
}

/// Fits `B (m - m0)^C` to the PCAC masses, leaving out the `skip` lightest.
pub fn fit_critical_mass(records: &[ObsRecord], skip: usize) -> Result<CriticalMassFit, PvfError> {
    let mut points = records
        .iter()
        .map(|record| Ok((valence_mass(record)?, record.first()?.clone())))
        .collect::<Result<Vec<_>, PvfError>>()?;
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (masses, pcac): (Vec<f64>, Vec<Obs>) = points.into_iter().skip(skip).unzip();

    let fit = least_squares(
        &masses,
        &pcac,
        &PowerLaw,
        &FitOpts::with_initial_guess(PowerLaw::INITIAL_GUESS),
    )?;
    Ok(CriticalMassFit {
        skip,
        masses,
        pcac,
        fit,
    })
}

/// Description stored with a critical mass.
pub fn critical_mass_description(
    fit: &FitResult,
    filenames: &[String],
    metadata: Metadata,
) -> Metadata {
    let mut description = Metadata::new();
    description.insert("description".to_string(), DESCRIPTION.into());
    description.insert(
        "input_filenames".to_string(),
        MetaValue::List(filenames.iter().map(|name| name.as_str().into()).collect()),
    );
    description.insert("chisquare".to_string(), fit.chisquare.into());
    description.insert("dof".to_string(), fit.dof.into());
    description.insert("method".to_string(), fit.method.label().into());
    description.extend(metadata);
    description
}

/// One row of the critical mass summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollatedRow {
    #[serde(rename = "Npv")]
    pub npv: Option<i64>,
    pub mpv: Option<f64>,
    pub beta: Option<f64>,
    pub chisquare_per_dof: f64,
    pub value_critical_mass: f64,
    pub error_critical_mass: f64,
}

fn number(record: &ObsRecord, key: &str) -> Result<f64, PvfError> {
    record
        .metadata
        .get(key)
        .and_then(MetaValue::as_f64)
        .ok_or_else(|| {
            PvfError::Metadata(
                ErrorInfo::new("missing-key", format!("result has no numeric {key}"))
                    .with_context("key", key)
                    .with_context("filename", record.filename.clone()),
            )
        })
}

/// Summarises stored critical masses, one row per file.
pub fn collate_critical_masses(records: &[ObsRecord]) -> Result<Vec<CollatedRow>, PvfError> {
    records
        .iter()
        .map(|record| {
            let mass = record.first()?;
            let get = |key: &str| record.metadata.get(key);
            Ok(CollatedRow {
                npv: get("Npv").and_then(MetaValue::as_i64),
                mpv: get("mpv").and_then(MetaValue::as_f64),
                beta: get("beta").and_then(MetaValue::as_f64),
                chisquare_per_dof: number(record, "chisquare")? / number(record, "dof")?,
                value_critical_mass: mass.value(),
                error_critical_mass: mass.dvalue(),
            })
        })
        .collect()
}

/// Writes the summary as CSV with a header row.
pub fn write_collated_csv<W: Write>(rows: &[CollatedRow], writer: W) -> Result<(), PvfError> {
    let csv_error =
        |err: csv::Error| PvfError::Serde(ErrorInfo::new("csv-write-failed", err.to_string()));
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row).map_err(csv_error)?;
    }
    out.flush()
        .map_err(|err| PvfError::Serde(ErrorInfo::new("csv-write-failed", err.to_string())))
}
