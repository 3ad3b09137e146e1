//! Plaquette histories from HiRep HMC logs.

use std::path::Path;

use pvf_core::{ErrorInfo, PvfError};
use pvf_obs::Obs;
use serde::{Deserialize, Serialize};

use crate::hirep::{numbered_lines, parse_error};

const MD_PREFIX: &str = "[MD_INT][10]MD parameters:";
const TRAJECTORY_PREFIX: &str = "[MAIN][0]Trajectory #";
const PLAQUETTE_PREFIX: &str = "[MAIN][0]Plaquette:";
const ACCEPT_PREFIX: &str = "[HMC][10]Configuration";

fn default_therm() -> usize {
    100
}

fn default_min_trajectories() -> usize {
    21
}

fn default_acceptance_threshold() -> f64 {
    0.2
}

/// Quality cuts applied to HMC streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmcOpts {
    /// Trajectories discarded for thermalisation.
    #[serde(default = "default_therm")]
    pub therm: usize,
    /// Streams with fewer plaquette measurements are skipped.
    #[serde(default = "default_min_trajectories")]
    pub min_trajectories: usize,
    /// Streams accepting a smaller fraction of trajectories are skipped.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,
}

impl Default for HmcOpts {
    fn default() -> Self {
        Self {
            therm: default_therm(),
            min_trajectories: default_min_trajectories(),
            acceptance_threshold: default_acceptance_threshold(),
        }
    }
}

/// Usable HMC stream.
#[derive(Debug, Clone, PartialEq)]
pub struct HmcStream {
    /// Path of the log.
    pub filename: String,
    /// Molecular dynamics trajectory length.
    pub tlen: Option<f64>,
    /// Molecular dynamics steps per trajectory.
    pub nsteps: Option<usize>,
    /// Fraction of accepted trajectories.
    pub acceptance: f64,
    /// Plaquette after thermalisation, indexed by trajectory number.
    pub plaquette: Obs,
}

fn md_value<T: std::str::FromStr>(token: Option<&str>) -> Option<T> {
    token?.split('=').nth(1)?.parse().ok()
}

fn inconsistent(path: &Path, line: usize, key: &str) -> PvfError {
    PvfError::Parse(
        ErrorInfo::new("inconsistent-md-parameters", format!("inconsistent {key}"))
            .with_path(path)
            .with_context("line", (line + 1).to_string()),
    )
}

/// Reads one HMC log.
///
/// Returns `Ok(None)` with a warning when the stream fails a quality cut.
/// A trajectory number lower than the previous one ends the read.
pub fn read_hmc_log(path: &Path, opts: &HmcOpts) -> Result<Option<HmcStream>, PvfError> {
    let mut tlen: Option<f64> = None;
    let mut nsteps: Option<usize> = None;
    let mut trajectory: Option<usize> = None;
    let mut trajectories: Vec<usize> = Vec::new();
    let mut plaquettes: Vec<f64> = Vec::new();
    let mut accepts: Vec<bool> = Vec::new();

    for entry in numbered_lines(path)? {
        let (number, line) = entry?;
        if line.starts_with(MD_PREFIX) {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let read_tlen: f64 = md_value(tokens.get(3).copied())
                .ok_or_else(|| parse_error(path, number, "unreadable trajectory length"))?;
            let read_nsteps: usize = md_value(tokens.get(4).copied())
                .ok_or_else(|| parse_error(path, number, "unreadable step count"))?;
            if tlen.map_or(false, |tlen| tlen != read_tlen) {
                return Err(inconsistent(path, number, "tlen"));
            }
            if nsteps.map_or(false, |nsteps| nsteps != read_nsteps) {
                return Err(inconsistent(path, number, "nsteps"));
            }
            tlen = Some(read_tlen);
            nsteps = Some(read_nsteps);
        } else if line.starts_with(TRAJECTORY_PREFIX) {
            let number_token = line
                .split_whitespace()
                .nth(1)
                .map(|token| token.trim_matches(|c| c == '#' || c == ':' || c == '.'));
            trajectory = Some(
                number_token
                    .and_then(|token| token.parse().ok())
                    .ok_or_else(|| parse_error(path, number, "unreadable trajectory number"))?,
            );
        } else if line.starts_with(PLAQUETTE_PREFIX) {
            let current = trajectory
                .ok_or_else(|| parse_error(path, number, "plaquette before any trajectory"))?;
            if trajectories.last().map_or(false, |last| current < *last) {
                tracing::warn!(
                    path = %path.display(),
                    line = number,
                    "trajectory numbering goes backwards; ignoring the rest of the log"
                );
                break;
            }
            let plaquette = line
                .split_whitespace()
                .nth(1)
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| parse_error(path, number, "unreadable plaquette"))?;
            trajectories.push(current);
            plaquettes.push(plaquette);
        } else if line.starts_with(ACCEPT_PREFIX) {
            accepts.push(line.split_whitespace().nth(1) == Some("accepted."));
        }
    }

    if plaquettes.len() < opts.min_trajectories {
        tracing::warn!(
            path = %path.display(),
            trajectories = plaquettes.len(),
            "skipping stream with too few trajectories"
        );
        return Ok(None);
    }
    let acceptance = if accepts.is_empty() {
        0.0
    } else {
        accepts.iter().filter(|accepted| **accepted).count() as f64 / accepts.len() as f64
    };
    if acceptance < opts.acceptance_threshold {
        tracing::warn!(path = %path.display(), acceptance, "skipping stream with low acceptance");
        return Ok(None);
    }

    let start = opts.therm.min(plaquettes.len());
    let plaquette = match Obs::new(
        vec![plaquettes[start..].to_vec()],
        vec![path.display().to_string()],
        Some(vec![trajectories[start..].to_vec()]),
    ) {
        Ok(plaquette) => plaquette,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "skipping stream with insufficient independent samples"
            );
            return Ok(None);
        }
    };

    Ok(Some(HmcStream {
        filename: path.display().to_string(),
        tlen,
        nsteps,
        acceptance,
        plaquette,
    }))
}
