//! Gradient-flow histories from HiRep logs.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pvf_core::{Described, ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_obs::{Corr, Obs};
use serde::{Deserialize, Serialize};

use crate::filename::metadata_from_filename;
use crate::hirep::{
    numbered_lines, parse_configuration_line, parse_error, parse_gauge_group, parse_global_size,
};

const FLOW_PREFIX: &str = "[WILSONFLOW][0]WF";
const TIME_TOLERANCE: f64 = 1e-9;

/// Log format understood by [`read_flows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// HiRep `WILSONFLOW` output.
    #[default]
    Hirep,
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderKind::Hirep => write!(f, "hirep"),
        }
    }
}

impl FromStr for ReaderKind {
    type Err = PvfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hirep" | "hp" => Ok(ReaderKind::Hirep),
            other => Err(PvfError::Parse(
                ErrorInfo::new("unknown-reader", format!("no flow reader named {other}"))
                    .with_hint("available readers: hirep (alias hp)"),
            )),
        }
    }
}

/// Discretisation of the action density measured along the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Wilson plaquette.
    Plaq,
    /// Symmetric clover.
    #[default]
    Sym,
}

impl Operator {
    /// Label used in figure titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            Operator::Plaq => "Plaquette",
            Operator::Sym => "Symmetric",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Plaq => write!(f, "plaq"),
            Operator::Sym => write!(f, "sym"),
        }
    }
}

impl FromStr for Operator {
    type Err = PvfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plaq" => Ok(Operator::Plaq),
            "sym" => Ok(Operator::Sym),
            other => Err(PvfError::Parse(
                ErrorInfo::new("unknown-operator", format!("no flow operator named {other}"))
                    .with_hint("available operators: plaq, sym"),
            )),
        }
    }
}

/// Flow history of a single configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfiguration {
    /// Run the configuration belongs to.
    pub run: String,
    /// Position in the Monte Carlo chain.
    pub index: usize,
    /// Average plaquette of the unflowed configuration.
    pub plaquette: f64,
    /// Plaquette action density at each flow time.
    pub e_plaq: Vec<f64>,
    /// Clover action density at each flow time.
    pub e_sym: Vec<f64>,
    /// Topological charge at each flow time; empty when not measured.
    #[serde(default)]
    pub topological_charge: Vec<f64>,
}

/// All flow histories of one log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flows {
    /// Path the flows were read from.
    pub filename: String,
    /// Reader that produced them.
    pub reader: ReaderKind,
    /// Ensemble name shared by every replica.
    pub ensemble: String,
    /// Ensemble parameters.
    pub metadata: Metadata,
    /// Flow times, starting at zero.
    pub times: Vec<f64>,
    /// Flow time step.
    pub h: f64,
    /// Configurations in file order.
    pub configurations: Vec<FlowConfiguration>,
}

impl Described for Flows {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl Flows {
    /// Names of the runs in order of first appearance.
    pub fn runs(&self) -> Vec<&str> {
        let mut runs: Vec<&str> = Vec::new();
        for config in &self.configurations {
            if !runs.contains(&config.run.as_str()) {
                runs.push(&config.run);
            }
        }
        runs
    }

    /// Replica name of a run.
    pub fn replica_name(&self, run: &str) -> String {
        if self.runs().len() == 1 {
            self.ensemble.clone()
        } else {
            format!("{}|{run}", self.ensemble)
        }
    }

    fn grouped(&self) -> Vec<(String, Vec<&FlowConfiguration>)> {
        self.runs()
            .into_iter()
            .map(|run| {
                let mut configs: Vec<&FlowConfiguration> = self
                    .configurations
                    .iter()
                    .filter(|config| config.run == run)
                    .collect();
                configs.sort_by_key(|config| config.index);
                (self.replica_name(run), configs)
            })
            .collect()
    }

    fn corr_from<'a>(
        &'a self,
        column: impl Fn(&'a FlowConfiguration) -> &'a [f64],
    ) -> Result<Corr, PvfError> {
        let grouped = self.grouped();
        let names: Vec<String> = grouped.iter().map(|(name, _)| name.clone()).collect();
        let idl: Vec<Vec<usize>> = grouped
            .iter()
            .map(|(_, configs)| configs.iter().map(|config| config.index).collect())
            .collect();
        (0..self.times.len())
            .map(|t| {
                let samples = grouped
                    .iter()
                    .map(|(_, configs)| configs.iter().map(|config| column(*config)[t]).collect())
                    .collect();
                Obs::new(samples, names.clone(), Some(idl.clone())).map(Some)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Corr::new)
    }

    /// Action density `E(t)` for the chosen discretisation.
    pub fn energy_density(&self, operator: Operator) -> Result<Corr, PvfError> {
        self.corr_from(|config| match operator {
            Operator::Plaq => config.e_plaq.as_slice(),
            Operator::Sym => config.e_sym.as_slice(),
        })
    }

    /// Topological charge `Q(t)`.
    pub fn topological_charge(&self) -> Result<Corr, PvfError> {
        if self
            .configurations
            .iter()
            .any(|config| config.topological_charge.len() != self.times.len())
        {
            return Err(PvfError::Parse(
                ErrorInfo::new(
                    "missing-topological-charge",
                    "log does not record the topological charge for every configuration",
                )
                .with_context("filename", self.filename.clone()),
            ));
        }
        self.corr_from(|config| config.topological_charge.as_slice())
    }

    /// Average plaquette of the unflowed configurations.
    pub fn plaquette(&self) -> Result<Obs, PvfError> {
        let grouped = self.grouped();
        let names = grouped.iter().map(|(name, _)| name.clone()).collect();
        let idl = grouped
            .iter()
            .map(|(_, configs)| configs.iter().map(|config| config.index).collect())
            .collect();
        let samples = grouped
            .iter()
            .map(|(_, configs)| configs.iter().map(|config| config.plaquette).collect())
            .collect();
        Obs::new(samples, names, Some(idl))
    }
}

#[derive(Debug)]
struct PartialConfiguration {
    config: FlowConfiguration,
    times: Vec<f64>,
    line: usize,
}

struct FlowLine {
    time: f64,
    e_plaq: f64,
    e_sym: f64,
    charge: Option<f64>,
}

fn parse_flow_line(line: &str) -> Option<FlowLine> {
    let (_, values) = line.strip_prefix(FLOW_PREFIX)?.split_once(") =")?;
    let numbers = values
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    // ncnfg t E t2*E Esym t2*Esym [TC]
    if numbers.len() < 6 {
        return None;
    }
    Some(FlowLine {
        time: numbers[1],
        e_plaq: numbers[2],
        e_sym: numbers[4],
        charge: numbers.get(6).copied(),
    })
}

fn same_times(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= TIME_TOLERANCE)
}

/// Reads a HiRep gradient-flow log.
///
/// Configurations whose flow stops early are dropped with a warning.
/// Returns `Ok(None)` when the log holds no complete configuration.
pub fn read_flows_hirep(path: &Path) -> Result<Option<Flows>, PvfError> {
    let mut metadata = Metadata::new();
    let mut partial: Vec<PartialConfiguration> = Vec::new();

    for entry in numbered_lines(path)? {
        let (number, line) = entry?;
        if let Some(config) = parse_configuration_line(&line) {
            partial.push(PartialConfiguration {
                config: FlowConfiguration {
                    run: config.run,
                    index: config.index,
                    plaquette: config.plaquette,
                    e_plaq: Vec::new(),
                    e_sym: Vec::new(),
                    topological_charge: Vec::new(),
                },
                times: Vec::new(),
                line: number,
            });
        } else if line.starts_with(FLOW_PREFIX) {
            let flow = parse_flow_line(&line)
                .ok_or_else(|| parse_error(path, number, "unreadable flow measurement"))?;
            let current = partial.last_mut().ok_or_else(|| {
                parse_error(path, number, "flow measurement before any configuration")
            })?;
            current.times.push(flow.time);
            current.config.e_plaq.push(flow.e_plaq);
            current.config.e_sym.push(flow.e_sym);
            if let Some(charge) = flow.charge {
                current.config.topological_charge.push(charge);
            }
        } else if !metadata.contains_key("NT") {
            if let Some([nt, nx, ny, nz]) = parse_global_size(&line) {
                for (key, extent) in [("NT", nt), ("NX", nx), ("NY", ny), ("NZ", nz)] {
                    metadata.insert(key.to_string(), extent.into());
                }
            }
        }
        if !metadata.contains_key("Nc") {
            if let Some(nc) = parse_gauge_group(&line) {
                metadata.insert("Nc".to_string(), nc.into());
            }
        }
    }

    let Some(reference) = partial.iter().map(|p| p.times.len()).max() else {
        tracing::warn!(path = %path.display(), "no configurations found in flow log");
        return Ok(None);
    };
    let Some(times) = partial
        .iter()
        .find(|p| p.times.len() == reference)
        .map(|p| p.times.clone())
    else {
        return Ok(None);
    };

    let mut configurations = Vec::with_capacity(partial.len());
    for p in partial {
        if same_times(&p.times, &times) {
            configurations.push(p.config);
        } else {
            tracing::warn!(
                path = %path.display(),
                line = p.line + 1,
                run = %p.config.run,
                index = p.config.index,
                measured = p.times.len(),
                expected = times.len(),
                "dropping incomplete flow"
            );
        }
    }
    if times.len() < 2 {
        tracing::warn!(path = %path.display(), "flow log holds fewer than two flow times");
        return Ok(None);
    }
    let partial_charge = configurations.iter().any(|config| {
        !config.topological_charge.is_empty() && config.topological_charge.len() != times.len()
    });
    if partial_charge {
        for config in &mut configurations {
            config.topological_charge.clear();
        }
    }

    let h = times[1] - times[0];
    let ensemble = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Some(Flows {
        filename: path.display().to_string(),
        reader: ReaderKind::Hirep,
        ensemble,
        metadata,
        times,
        h,
        configurations,
    }))
}

/// Reads a flow log with the chosen reader and completes its metadata.
///
/// Parameters encoded in the file name override those found in the log;
/// entries of `extra` that are not null override both.
pub fn read_flows(
    path: &Path,
    reader: ReaderKind,
    extra: &Metadata,
) -> Result<Option<Flows>, PvfError> {
    let flows = match reader {
        ReaderKind::Hirep => read_flows_hirep(path)?,
    };
    let Some(mut flows) = flows else {
        return Ok(None);
    };
    flows.metadata.extend(metadata_from_filename(path)?);
    flows.metadata.extend(
        extra
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    if !flows.metadata.contains_key("Nc") {
        return Err(PvfError::Metadata(
            ErrorInfo::new("missing-key", "number of colours not found in the log")
                .with_path(path)
                .with_context("key", "Nc")
                .with_hint("pass Nc as extra metadata"),
        ));
    }
    flows
        .metadata
        .insert("reader".to_string(), MetaValue::from(reader.to_string()));
    Ok(Some(flows))
}
