//! Coupling and beta function measured along the flow of one ensemble.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pvf_core::{Described, ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_obs::{Corr, DerivVariant, Obs};
use pvf_read::{FlowCache, Flows, Operator, ReaderKind};

use crate::coupling::{normalize_coupling, t_d_dt};

/// Flow-time dependent quantity of a [`FlowObservables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scale {
    /// `t² E(t)`.
    T2E,
    /// `g²_GF(t)`.
    CouplingSquared,
    /// `β_GF(t) = -t dg²_GF/dt`.
    Beta,
}

impl Scale {
    /// Scales extrapolated to infinite volume.
    pub const EXTRAPOLATED: [Scale; 2] = [Scale::CouplingSquared, Scale::Beta];

    /// Key used in result files.
    pub fn key(&self) -> &'static str {
        match self {
            Scale::T2E => "t2E",
            Scale::CouplingSquared => "gGF^2",
            Scale::Beta => "betaGF",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scale {
    type Err = PvfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t2E" => Ok(Scale::T2E),
            "gGF^2" => Ok(Scale::CouplingSquared),
            "betaGF" => Ok(Scale::Beta),
            other => Err(PvfError::Parse(ErrorInfo::new(
                "unknown-scale",
                format!("no flow scale named {other}"),
            ))),
        }
    }
}

fn numeric(metadata: &Metadata, key: &str, filename: &str) -> Result<f64, PvfError> {
    metadata.get(key).and_then(MetaValue::as_f64).ok_or_else(|| {
        PvfError::Metadata(
            ErrorInfo::new("missing-key", format!("numeric metadata key {key} is not present"))
                .with_context("key", key)
                .with_context("filename", filename),
        )
    })
}

/// Flow observables of one ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowObservables {
    /// Ensemble parameters plus `filename`, `h` and `reader`.
    pub metadata: Metadata,
    /// Flow times.
    pub times: Vec<f64>,
    /// Flow time step.
    pub h: f64,
    /// `t² E(t)`.
    pub t2e: Corr,
    /// `g²_GF(t)`.
    pub coupling: Corr,
    /// `β_GF(t)`.
    pub beta: Corr,
}

impl Described for FlowObservables {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl FlowObservables {
    /// Derives the coupling and its flow-time derivative from measured flows.
    pub fn from_flows(flows: &Flows, operator: Operator) -> Result<Self, PvfError> {
        let nc = numeric(&flows.metadata, "Nc", &flows.filename)?;
        let extent = numeric(&flows.metadata, "NX", &flows.filename)?;
        let squared: Vec<f64> = flows.times.iter().map(|t| t * t).collect();

        let t2e = flows.energy_density(operator)?.partial_mult(&squared)?;
        let coupling = normalize_coupling(&t2e, &flows.times, nc, extent)?;
        let beta = -t_d_dt(&coupling, &flows.times, flows.h, DerivVariant::Improved)?;

        let mut metadata = flows.metadata.clone();
        metadata.insert("filename".to_string(), flows.filename.clone().into());
        metadata.insert("h".to_string(), flows.h.into());
        metadata.insert("reader".to_string(), flows.reader.to_string().into());
        Ok(Self {
            metadata,
            times: flows.times.clone(),
            h: flows.h,
            t2e,
            coupling,
            beta,
        })
    }

    /// Correlator of one scale.
    pub fn scale(&self, scale: Scale) -> &Corr {
        match scale {
            Scale::T2E => &self.t2e,
            Scale::CouplingSquared => &self.coupling,
            Scale::Beta => &self.beta,
        }
    }

    /// Flow-time index of `time`, truncated towards zero.
    pub fn index_at(&self, time: f64) -> usize {
        (time / self.h) as usize
    }

    /// Value of `scale` at flow time `time`.
    pub fn at_time(&self, scale: Scale, time: f64) -> Result<&Obs, PvfError> {
        let index = self.index_at(time);
        self.scale(scale).require(index).map_err(|err| {
            PvfError::Stats(
                ErrorInfo::new(
                    err.info().code.clone(),
                    format!("{scale} is not available at flow time {time}"),
                )
                .with_context("index", index.to_string())
                .with_context("filename", self.filename()),
            )
        })
    }

    /// Spatial extent `NX`.
    pub fn spatial_extent(&self) -> Result<f64, PvfError> {
        numeric(&self.metadata, "NX", &self.filename())
    }

    /// Path of the flow log.
    pub fn filename(&self) -> String {
        self.metadata
            .get("filename")
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Reads every flow log and derives its observables, skipping empty logs.
pub fn read_all_flow_observables<P: AsRef<Path>>(
    paths: &[P],
    reader: ReaderKind,
    operator: Operator,
    extra: &Metadata,
    cache: &FlowCache,
) -> Result<Vec<FlowObservables>, PvfError> {
    let mut result = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(flows) = cache.read_flows(path.as_ref(), reader, extra)? else {
            continue;
        };
        result.push(FlowObservables::from_flows(&flows, operator)?);
    }
    tracing::debug!(read = result.len(), requested = paths.len(), "read flow observables");
    Ok(result)
}
