//! Meson two-point functions from HiRep measurement logs.

use std::collections::BTreeMap;
use std::path::Path;

use pvf_core::{Described, ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_obs::{Corr, Obs};

use crate::hirep::{
    configuration_name, configuration_tags, numbered_lines, parse_error, parse_gauge_group,
    parse_global_size, representation_name,
};

const CONF_MARKER: &str = "conf #";

/// Source and channel identifying a measured correlator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MesonKey {
    /// Source type, e.g. `DEFAULT_SEMWALL`.
    pub source: String,
    /// Channel, e.g. `g5` or `g5_g0g5_re`.
    pub channel: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Measurements {
    configurations: Vec<usize>,
    values: Vec<Vec<f64>>,
}

/// Correlators of one ensemble, at a single valence mass or several.
#[derive(Debug, Clone, PartialEq)]
pub struct MesonCorrelators {
    /// Path of the log.
    pub filename: String,
    /// Ensemble name used for the observables.
    pub ensemble: String,
    /// Ensemble parameters.
    pub metadata: Metadata,
    /// Temporal extent.
    pub nt: usize,
    measurements: BTreeMap<(String, MesonKey), Measurements>,
}

impl Described for MesonCorrelators {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl MesonCorrelators {
    /// Valence masses in order of first appearance.
    pub fn valence_masses(&self) -> Vec<f64> {
        self.metadata
            .get("valence_masses")
            .and_then(MetaValue::as_list)
            .map(|masses| masses.iter().filter_map(MetaValue::as_f64).collect())
            .unwrap_or_default()
    }

    /// Every measured source and channel.
    pub fn keys(&self) -> Vec<&MesonKey> {
        let mut keys: Vec<&MesonKey> = self.measurements.keys().map(|(_, key)| key).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Correlator of `channel` at the only valence mass and source.
    pub fn correlator(&self, channel: &str) -> Result<Corr, PvfError> {
        let matching: Vec<&(String, MesonKey)> = self
            .measurements
            .keys()
            .filter(|(_, key)| key.channel == channel)
            .collect();
        match matching.as_slice() {
            [] => Err(PvfError::Parse(
                ErrorInfo::new("missing-channel", format!("channel {channel} not measured"))
                    .with_context("filename", self.filename.clone()),
            )),
            [(mass, key)] => self.correlator_for(mass, key),
            _ => Err(PvfError::Parse(
                ErrorInfo::new(
                    "ambiguous-channel",
                    format!("channel {channel} measured for several masses or sources"),
                )
                .with_context("filename", self.filename.clone())
                .with_hint("select the mass and source explicitly"),
            )),
        }
    }

    /// Correlator of one source and channel at the valence mass written as `mass`.
    pub fn correlator_for(&self, mass: &str, key: &MesonKey) -> Result<Corr, PvfError> {
        let measurements = self
            .measurements
            .get(&(mass.to_string(), key.clone()))
            .ok_or_else(|| {
                PvfError::Parse(
                    ErrorInfo::new(
                        "missing-channel",
                        format!("{} {} not measured", key.source, key.channel),
                    )
                    .with_context("mass", mass.to_string()),
                )
            })?;
        let mut order: Vec<usize> = (0..measurements.configurations.len()).collect();
        order.sort_by_key(|&i| measurements.configurations[i]);
        let idl: Vec<usize> = order.iter().map(|&i| measurements.configurations[i]).collect();
        (0..self.nt)
            .map(|t| {
                let samples = order.iter().map(|&i| measurements.values[i][t]).collect();
                Obs::new(
                    vec![samples],
                    vec![self.ensemble.clone()],
                    Some(vec![idl.clone()]),
                )
                .map(Some)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Corr::new)
    }
}

struct MesonLine<'a> {
    configuration: usize,
    mass: &'a str,
    source: &'a str,
    channel: &'a str,
    values: Vec<f64>,
}

fn parse_meson_line(line: &str) -> Option<MesonLine<'_>> {
    let (_, rest) = line.split_once(CONF_MARKER)?;
    let mut tokens = rest.split_whitespace();
    let configuration = tokens.next()?.parse().ok()?;
    let mass = tokens.next()?.strip_prefix("mass=")?;
    let source = tokens.next()?;
    let channel = tokens.find(|token| token.ends_with('='))?.trim_end_matches('=');
    let values = tokens.map(str::parse).collect::<Result<Vec<f64>, _>>().ok()?;
    Some(MesonLine {
        configuration,
        mass,
        source,
        channel,
        values,
    })
}

fn insert_tag(metadata: &mut Metadata, tag: &str, value: &str) {
    let entry = match tag {
        "b" => value.parse::<f64>().ok().map(|beta| ("beta", MetaValue::from(beta))),
        "nf" => value.parse::<i64>().ok().map(|nf| ("Nf", MetaValue::from(nf))),
        "nc" => value.parse::<i64>().ok().map(|nc| ("Nc", MetaValue::from(nc))),
        "r" => Some(("dynamical_representation", MetaValue::from(representation_name(value)))),
        _ => None,
    };
    if let Some((key, value)) = entry {
        metadata.entry(key.to_string()).or_insert(value);
    }
}

/// Reads every meson measurement of a HiRep log.
///
/// Lines have the form `conf #<n> mass=<m> <source> [<flavour>...] <channel>= v0 v1 ...`.
/// Ensemble parameters come from the geometry and gauge group lines and from
/// the names of the configurations read.
pub fn read_correlators_hirep(path: &Path) -> Result<MesonCorrelators, PvfError> {
    let mut metadata = Metadata::new();
    let mut masses: Vec<String> = Vec::new();
    let mut measurements: BTreeMap<(String, MesonKey), Measurements> = BTreeMap::new();
    let mut nt: Option<usize> = None;

    for entry in numbered_lines(path)? {
        let (number, line) = entry?;
        if let Some(meson) = parse_meson_line(&line) {
            let expected = *nt.get_or_insert(meson.values.len());
            if meson.values.len() != expected {
                return Err(parse_error(
                    path,
                    number,
                    format!("{} values where {expected} were expected", meson.values.len()),
                ));
            }
            if !masses.iter().any(|mass| mass == meson.mass) {
                masses.push(meson.mass.to_string());
            }
            let key = MesonKey {
                source: meson.source.to_string(),
                channel: meson.channel.to_string(),
            };
            let slot = measurements.entry((meson.mass.to_string(), key)).or_default();
            slot.configurations.push(meson.configuration);
            slot.values.push(meson.values);
        } else if let Some(name) = configuration_name(&line) {
            for (tag, value) in configuration_tags(name) {
                insert_tag(&mut metadata, tag, value);
            }
        } else if let Some([t, x, y, z]) = parse_global_size(&line) {
            nt.get_or_insert(t);
            for (key, extent) in [("NT", t), ("NX", x), ("NY", y), ("NZ", z)] {
                metadata.entry(key.to_string()).or_insert(extent.into());
            }
        } else if let Some(nc) = parse_gauge_group(&line) {
            metadata.entry("Nc".to_string()).or_insert(nc.into());
            metadata
                .entry("group_family".to_string())
                .or_insert("SU".into());
        } else if let Some((_, repr)) = line.split_once("Fermion representation:") {
            if let Some(tag) = repr.split_whitespace().next() {
                metadata
                    .entry("dynamical_representation".to_string())
                    .or_insert(representation_name(tag).into());
            }
        }
    }

    let Some(nt) = nt.filter(|_| !measurements.is_empty()) else {
        return Err(PvfError::Parse(
            ErrorInfo::new("no-measurements", "log holds no meson measurements").with_path(path),
        ));
    };
    if let Some(representation) = metadata.get("dynamical_representation").cloned() {
        metadata
            .entry("valence_representation".to_string())
            .or_insert(representation);
    }
    let valence: Vec<MetaValue> = masses
        .iter()
        .map(|mass| {
            mass.parse::<f64>()
                .map_or_else(|_| MetaValue::from(mass.as_str()), MetaValue::from)
        })
        .collect();
    metadata.insert("valence_masses".to_string(), valence.into());
    metadata.insert("NT".to_string(), nt.into());

    let ensemble = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(MesonCorrelators {
        filename: path.display().to_string(),
        ensemble,
        metadata,
        nt,
        measurements,
    })
}
