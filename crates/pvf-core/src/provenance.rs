//! Provenance descriptors and metadata consistency checks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PvfError};
use crate::meta::{Described, MetaValue, Metadata};

/// Version of the observable file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version incremented for breaking changes.
    pub major: u32,
    /// Minor version incremented for additive changes.
    pub minor: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Renders the version the way it is stored in observable files.
    pub fn label(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Header written alongside every dumped observable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Program that produced the file.
    pub program: String,
    /// Layout version.
    pub version: String,
    /// User that ran the program.
    pub who: String,
    /// Local timestamp of the dump.
    pub date: String,
    /// Host the program ran on.
    pub host: String,
}

impl RunProvenance {
    /// Captures the provenance of the current process.
    pub fn capture(program: impl Into<String>) -> Self {
        let who = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
        Self {
            program: program.into(),
            version: SchemaVersion::default().label(),
            who,
            date: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string(),
            host,
        }
    }
}

fn metadata_error(code: &str, message: impl Into<String>) -> PvfError {
    PvfError::Metadata(ErrorInfo::new(code, message.into()))
}

fn lookup<'a, T: Described>(datum: &'a T, key: &str) -> Result<&'a MetaValue, PvfError> {
    datum.metadata().get(key).ok_or_else(|| {
        metadata_error("missing-key", format!("metadata key {key} is not present"))
            .with_key(key)
    })
}

impl PvfError {
    fn with_key(self, key: &str) -> Self {
        match self {
            PvfError::Metadata(info) => PvfError::Metadata(info.with_context("key", key)),
            other => other,
        }
    }
}

fn render_set(values: &BTreeSet<&MetaValue>) -> String {
    let rendered: Vec<String> = values.iter().map(|value| value.to_string()).collect();
    format!("{{{}}}", rendered.join(", "))
}

/// Returns the single value of `key` shared by all inputs.
///
/// Returns `Ok(None)` when `data` is empty and an error when the inputs
/// disagree.
pub fn consistent_metadata<T: Described>(
    data: &[T],
    key: &str,
) -> Result<Option<MetaValue>, PvfError> {
    let mut values = BTreeSet::new();
    for datum in data {
        values.insert(lookup(datum, key)?);
    }
    if values.len() > 1 {
        return Err(metadata_error(
            "inconsistent-metadata",
            format!(
                "Different {key} values {} cannot be combined in one fit.",
                render_set(&values)
            ),
        )
        .with_key(key));
    }
    Ok(values.into_iter().next().cloned())
}

/// Requires every key to take exactly one value across the inputs.
pub fn require_consistent<T: Described>(data: &[T], keys: &[&str]) -> Result<Metadata, PvfError> {
    let mut metadata = Metadata::new();
    for key in keys {
        let mut values = BTreeSet::new();
        for datum in data {
            values.insert(lookup(datum, key)?);
        }
        if values.len() != 1 {
            return Err(metadata_error(
                "inconsistent-metadata",
                format!("Multiple ({}) values found for {key}", values.len()),
            )
            .with_key(key));
        }
        if let Some(value) = values.into_iter().next() {
            metadata.insert(key.to_string(), value.clone());
        }
    }
    Ok(metadata)
}

/// Builds the description stored with a combined result.
///
/// `specific_keys` are recorded per input under `data_sources`;
/// `consistent_keys` must agree across inputs and are recorded once.
pub fn describe_inputs<T: Described>(
    data: &[T],
    description: &str,
    specific_keys: &[&str],
    consistent_keys: &[&str],
    extra: Metadata,
) -> Result<Metadata, PvfError> {
    let mut sources = Vec::with_capacity(data.len());
    for datum in data {
        let mut source = Metadata::new();
        for key in specific_keys {
            source.insert(key.to_string(), lookup(datum, key)?.clone());
        }
        sources.push(MetaValue::Map(source));
    }

    let mut result = Metadata::new();
    result.insert("_description".to_string(), description.into());
    result.insert("data_sources".to_string(), MetaValue::List(sources));
    for key in consistent_keys {
        let value = consistent_metadata(data, key)?;
        result.insert(key.to_string(), value.into());
    }
    result.extend(extra);
    Ok(result)
}

/// Groups inputs by the values they take for `keys`, in sorted key order.
pub fn group_by_keys<'a, T: Described>(
    items: &'a [T],
    keys: &[&str],
) -> Result<BTreeMap<Vec<MetaValue>, Vec<&'a T>>, PvfError> {
    let mut groups: BTreeMap<Vec<MetaValue>, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        let mut signature = Vec::with_capacity(keys.len());
        for key in keys {
            signature.push(lookup(item, key)?.clone());
        }
        groups.entry(signature).or_default().push(item);
    }
    Ok(groups)
}
