//! Results written by earlier analysis steps.

use std::collections::BTreeMap;
use std::path::Path;

use pvf_core::{Described, ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_obs::{load_dict, load_obs, read_bytes, Obs};

/// Named observables together with the description they were saved with.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRecord {
    /// Path of the result file.
    pub filename: String,
    /// Description entries, plus `filename`.
    pub metadata: Metadata,
    /// Named observable lists; empty for plain JSON results.
    pub entries: BTreeMap<String, Vec<Obs>>,
}

impl Described for FitRecord {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl FitRecord {
    /// Observable list stored under `key`.
    pub fn entry(&self, key: &str) -> Result<&[Obs], PvfError> {
        self.entries.get(key).map(Vec::as_slice).ok_or_else(|| {
            PvfError::Metadata(
                ErrorInfo::new("missing-entry", format!("result has no entry {key}"))
                    .with_context("filename", self.filename.clone()),
            )
        })
    }
}

/// Observables stored as a plain list, with their description.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsRecord {
    /// Path of the result file.
    pub filename: String,
    /// Description entries, plus `filename`.
    pub metadata: Metadata,
    /// Stored observable lists.
    pub obsdata: Vec<Vec<Obs>>,
}

impl Described for ObsRecord {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl ObsRecord {
    /// First stored observable.
    pub fn first(&self) -> Result<&Obs, PvfError> {
        self.obsdata.first().and_then(|list| list.first()).ok_or_else(|| {
            PvfError::Parse(
                ErrorInfo::new("empty-result", "result file holds no observables")
                    .with_context("filename", self.filename.clone()),
            )
        })
    }
}

fn merge_description(metadata: &mut Metadata, description: MetaValue) {
    match description {
        MetaValue::Map(entries) => metadata.extend(entries),
        MetaValue::Null => {}
        other => {
            metadata.insert("description".to_string(), other);
        }
    }
}

fn with_filename(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("filename".to_string(), path.display().to_string().into());
    metadata
}

/// Reads one result file.
///
/// With `pyerrors` set, the file is an observable dictionary whose entries
/// become named observable lists. Otherwise it is plain (optionally gzipped)
/// JSON whose `description.description` and `description.OBSDICT` tables are
/// flattened into the metadata.
pub fn read_fit_result(path: &Path, pyerrors: bool) -> Result<FitRecord, PvfError> {
    let mut metadata = with_filename(path);
    if pyerrors {
        let dict = load_dict(path)?;
        merge_description(&mut metadata, dict.description);
        return Ok(FitRecord {
            filename: path.display().to_string(),
            metadata,
            entries: dict.entries,
        });
    }

    let bytes = read_bytes(path)?;
    let document: MetaValue = serde_json::from_slice(&bytes).map_err(|err| {
        PvfError::Serde(ErrorInfo::new("decode-failed", err.to_string()).with_path(path))
    })?;
    let outer = document
        .as_map()
        .and_then(|map| map.get("description"))
        .and_then(MetaValue::as_map)
        .ok_or_else(|| {
            PvfError::Parse(
                ErrorInfo::new("malformed-result", "result has no description table")
                    .with_path(path),
            )
        })?;
    if let Some(inner) = outer.get("description") {
        merge_description(&mut metadata, inner.clone());
    }
    if let Some(MetaValue::Map(obsdict)) = outer.get("OBSDICT") {
        metadata.extend(obsdict.clone());
    }
    Ok(FitRecord {
        filename: path.display().to_string(),
        metadata,
        entries: BTreeMap::new(),
    })
}

/// Reads many result files of the same kind.
pub fn read_all_fit_results<P: AsRef<Path>>(
    paths: &[P],
    pyerrors: bool,
) -> Result<Vec<FitRecord>, PvfError> {
    paths
        .iter()
        .map(|path| read_fit_result(path.as_ref(), pyerrors))
        .collect()
}

/// Reads an observable list file such as a PCAC or critical mass result.
pub fn read_obs_result(path: &Path) -> Result<ObsRecord, PvfError> {
    let file = load_obs(path)?;
    let mut metadata = with_filename(path);
    merge_description(&mut metadata, file.description);
    Ok(ObsRecord {
        filename: path.display().to_string(),
        metadata,
        obsdata: file.obsdata,
    })
}

/// Reads many observable list files.
pub fn read_all_obs_results<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ObsRecord>, PvfError> {
    paths.iter().map(|path| read_obs_result(path.as_ref())).collect()
}
