//! Observable files in the pyerrors JSON layout, optionally gzip compressed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pvf_core::{ErrorInfo, MetaValue, Metadata, PvfError, RunProvenance};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::obs::{ensemble_name, merge_idl, Obs, Series};

const OBSDICT_KEY: &str = "OBSDICT";
const PLACEHOLDER_PREFIX: &str = "#pvf_";

#[derive(Debug, Serialize, Deserialize)]
struct FileLayout {
    #[serde(flatten)]
    provenance: RunProvenance,
    #[serde(default)]
    description: MetaValue,
    obsdata: Vec<EntryLayout>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryLayout {
    #[serde(rename = "type")]
    kind: String,
    layout: String,
    value: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    data: Vec<EnsembleLayout>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EnsembleLayout {
    id: String,
    replica: Vec<ReplicaLayout>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReplicaLayout {
    name: String,
    deltas: Vec<Vec<Value>>,
}

/// Contents of an observable file.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsFile {
    /// Header of the producing run.
    pub provenance: RunProvenance,
    /// Free-form description.
    pub description: MetaValue,
    /// One list of observables per stored entry.
    pub obsdata: Vec<Vec<Obs>>,
}

/// Contents of a dictionary dump.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsDict {
    /// Header of the producing run.
    pub provenance: RunProvenance,
    /// Description stored next to the dictionary.
    pub description: MetaValue,
    /// Named observable lists.
    pub entries: BTreeMap<String, Vec<Obs>>,
}

fn serde_error(code: &str, path: &Path, err: impl std::fmt::Display) -> PvfError {
    PvfError::Serde(ErrorInfo::new(code, err.to_string()).with_path(path))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

fn program() -> String {
    format!("pvflow {}", env!("CARGO_PKG_VERSION"))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PvfError> {
    let file = File::create(path).map_err(|err| PvfError::io("write-failed", path, err))?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(bytes)
            .and_then(|_| encoder.finish().map(|_| ()))
            .map_err(|err| PvfError::io("write-failed", path, err))
    } else {
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes)
            .and_then(|_| writer.flush())
            .map_err(|err| PvfError::io("write-failed", path, err))
    }
}

/// Reads a file, transparently decompressing `.gz` files.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, PvfError> {
    let file = File::open(path).map_err(|err| PvfError::io("read-failed", path, err))?;
    let mut bytes = Vec::new();
    let result = if is_gzip(path) {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut bytes)
    } else {
        BufReader::new(file).read_to_end(&mut bytes)
    };
    result.map_err(|err| PvfError::io("read-failed", path, err))?;
    Ok(bytes)
}

fn entry_from_list(observables: &[Obs]) -> EntryLayout {
    let mut names: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for obs in observables {
        for name in obs.names() {
            let replicas = names.entry(ensemble_name(name)).or_default();
            if !replicas.contains(&name) {
                replicas.push(name);
            }
        }
    }

    let data = names
        .into_iter()
        .map(|(ensemble, mut replicas)| {
            replicas.sort_unstable();
            let replica = replicas
                .into_iter()
                .map(|name| {
                    let present: Vec<Option<&Series>> =
                        observables.iter().map(|obs| obs.series().get(name)).collect();
                    let idl = merge_idl(present.iter().flatten().map(|series| series.idl()));
                    let columns: Vec<Vec<f64>> = present
                        .iter()
                        .map(|series| match series {
                            Some(series) => series
                                .expand_to(&idl)
                                .into_iter()
                                .map(|delta| delta + series.offset())
                                .collect(),
                            None => vec![0.0; idl.len()],
                        })
                        .collect();
                    let deltas = idl
                        .iter()
                        .enumerate()
                        .map(|(row, index)| {
                            std::iter::once(Value::from(*index as u64))
                                .chain(columns.iter().map(|column| Value::from(column[row])))
                                .collect()
                        })
                        .collect();
                    ReplicaLayout {
                        name: name.to_string(),
                        deltas,
                    }
                })
                .collect();
            EnsembleLayout {
                id: ensemble.to_string(),
                replica,
            }
        })
        .collect();

    EntryLayout {
        kind: if observables.len() == 1 { "Obs" } else { "List" }.to_string(),
        layout: observables.len().to_string(),
        value: observables.iter().map(Obs::value).collect(),
        data,
    }
}

fn parse_error(path: &Path, message: impl Into<String>) -> PvfError {
    PvfError::Parse(ErrorInfo::new("malformed-obs-file", message.into()).with_path(path))
}

fn list_from_entry(entry: &EntryLayout, path: &Path) -> Result<Vec<Obs>, PvfError> {
    let count: usize = entry
        .layout
        .trim()
        .parse()
        .map_err(|_| parse_error(path, format!("unsupported layout {}", entry.layout)))?;
    if count != entry.value.len() {
        return Err(parse_error(
            path,
            format!("layout {count} does not match {} values", entry.value.len()),
        ));
    }

    let mut series: Vec<BTreeMap<String, Series>> = vec![BTreeMap::new(); count];
    for ensemble in &entry.data {
        for replica in &ensemble.replica {
            let mut idl = Vec::with_capacity(replica.deltas.len());
            let mut columns = vec![Vec::with_capacity(replica.deltas.len()); count];
            for row in &replica.deltas {
                if row.len() != count + 1 {
                    return Err(parse_error(
                        path,
                        format!("replica {} has a row of width {}", replica.name, row.len()),
                    ));
                }
                let index = row[0]
                    .as_u64()
                    .or_else(|| {
                        row[0]
                            .as_f64()
                            .filter(|x| x.fract() == 0.0 && *x >= 0.0)
                            .map(|x| x as u64)
                    })
                    .ok_or_else(|| {
                        parse_error(path, format!("invalid configuration index {}", row[0]))
                    })?;
                idl.push(index as usize);
                for (column, value) in columns.iter_mut().zip(&row[1..]) {
                    column.push(value.as_f64().ok_or_else(|| {
                        parse_error(path, format!("invalid delta {value}"))
                    })?);
                }
            }
            if idl.is_empty() || idl.windows(2).any(|pair| pair[1] <= pair[0]) {
                return Err(parse_error(
                    path,
                    format!("replica {} has invalid configuration indices", replica.name),
                ));
            }
            for (target, column) in series.iter_mut().zip(columns) {
                let mean = column.iter().sum::<f64>() / column.len() as f64;
                let deltas = column.iter().map(|value| value - mean).collect();
                target.insert(replica.name.clone(), Series::new(idl.clone(), deltas, mean));
            }
        }
    }

    Ok(entry
        .value
        .iter()
        .zip(series)
        .map(|(value, series)| Obs::from_parts(*value, series))
        .collect())
}

fn write_layout(path: &Path, layout: &FileLayout) -> Result<(), PvfError> {
    let bytes =
        serde_json::to_vec(layout).map_err(|err| serde_error("encode-failed", path, err))?;
    write_bytes(path, &bytes)?;
    tracing::debug!(
        path = %path.display(),
        entries = layout.obsdata.len(),
        "wrote observable file"
    );
    Ok(())
}

fn read_layout(path: &Path) -> Result<FileLayout, PvfError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|err| serde_error("decode-failed", path, err))
}

/// Writes lists of observables, one file entry per list.
pub fn dump_obs(path: &Path, obsdata: &[Vec<Obs>], description: MetaValue) -> Result<(), PvfError> {
    let layout = FileLayout {
        provenance: RunProvenance::capture(program()),
        description,
        obsdata: obsdata.iter().map(|list| entry_from_list(list)).collect(),
    };
    write_layout(path, &layout)
}

/// Reads every entry of an observable file.
pub fn load_obs(path: &Path) -> Result<ObsFile, PvfError> {
    let layout = read_layout(path)?;
    let obsdata = layout
        .obsdata
        .iter()
        .map(|entry| list_from_entry(entry, path))
        .collect::<Result<_, _>>()?;
    Ok(ObsFile {
        provenance: layout.provenance,
        description: layout.description,
        obsdata,
    })
}

/// Writes named observable lists with the lookup table kept in the description.
pub fn dump_dict(
    path: &Path,
    entries: &BTreeMap<String, Vec<Obs>>,
    description: MetaValue,
) -> Result<(), PvfError> {
    let mut placeholders = Metadata::new();
    let mut obsdata = Vec::with_capacity(entries.len());
    for (index, (key, list)) in entries.iter().enumerate() {
        placeholders.insert(key.clone(), format!("{PLACEHOLDER_PREFIX}{index}").into());
        obsdata.push(entry_from_list(list));
    }
    let mut wrapped = Metadata::new();
    wrapped.insert("description".to_string(), description);
    wrapped.insert(OBSDICT_KEY.to_string(), placeholders.into());
    let layout = FileLayout {
        provenance: RunProvenance::capture(program()),
        description: wrapped.into(),
        obsdata,
    };
    write_layout(path, &layout)
}

/// Reads a dictionary dump written by [`dump_dict`].
pub fn load_dict(path: &Path) -> Result<ObsDict, PvfError> {
    let layout = read_layout(path)?;
    let wrapped = layout
        .description
        .as_map()
        .ok_or_else(|| parse_error(path, "description is not a dictionary"))?;
    let placeholders = wrapped
        .get(OBSDICT_KEY)
        .and_then(MetaValue::as_map)
        .ok_or_else(|| parse_error(path, format!("description has no {OBSDICT_KEY} table")))?;

    let mut entries = BTreeMap::new();
    for (key, placeholder) in placeholders {
        let index: usize = placeholder
            .as_str()
            .and_then(|text| text.strip_prefix(PLACEHOLDER_PREFIX))
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| parse_error(path, format!("invalid placeholder for {key}")))?;
        let entry = layout
            .obsdata
            .get(index)
            .ok_or_else(|| {
                parse_error(path, format!("placeholder for {key} points past the data"))
            })?;
        entries.insert(key.clone(), list_from_entry(entry, path)?);
    }
    Ok(ObsDict {
        provenance: layout.provenance.clone(),
        description: wrapped.get("description").cloned().unwrap_or_default(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entries_share_one_row_per_configuration() {
        let a = Obs::from_samples(vec![1.0, 2.0, 3.0, 4.0, 5.0], "ens").expect("a");
        let b = Obs::from_samples(vec![2.0, 2.0, 2.0, 2.0, 7.0], "ens").expect("b");
        let entry = entry_from_list(&[a, b]);
        assert_eq!(entry.kind, "List");
        assert_eq!(entry.layout, "2");
        let rows = &entry.data[0].replica[0].deltas;
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0][0], Value::from(1u64));
        assert_eq!(rows[4][2].as_f64(), Some(4.0));
    }
}
