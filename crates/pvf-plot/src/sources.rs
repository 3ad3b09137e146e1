//! Metadata lookups shared by the figures.

use pvf_core::{ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_obs::Obs;
use pvf_read::{FitRecord, Operator};

fn missing(key: &str, filename: &str, what: &str) -> PvfError {
    PvfError::Metadata(
        ErrorInfo::new("missing-key", format!("result has no {what} {key}"))
            .with_context("key", key)
            .with_context("filename", filename),
    )
}

/// Numeric metadata entry.
pub(crate) fn number(metadata: &Metadata, key: &str, filename: &str) -> Result<f64, PvfError> {
    metadata
        .get(key)
        .and_then(MetaValue::as_f64)
        .ok_or_else(|| missing(key, filename, "numeric"))
}

/// Metadata entry rendered as text, `null` when absent.
pub(crate) fn text(metadata: &Metadata, key: &str) -> String {
    metadata.get(key).cloned().unwrap_or_default().to_string()
}

/// Metadata entry, [`MetaValue::Null`] when absent.
pub(crate) fn value(metadata: &Metadata, key: &str) -> MetaValue {
    metadata.get(key).cloned().unwrap_or_default()
}

/// Entries of the `data_sources` list.
pub fn data_sources<'a>(
    metadata: &'a Metadata,
    filename: &str,
) -> Result<Vec<&'a Metadata>, PvfError> {
    let sources = metadata
        .get("data_sources")
        .and_then(MetaValue::as_list)
        .ok_or_else(|| missing("data_sources", filename, "list"))?;
    sources
        .iter()
        .map(|source| source.as_map().ok_or_else(|| missing("data_sources", filename, "table in")))
        .collect()
}

/// File names of the inputs a result was computed from.
pub fn data_source_filenames(metadata: &Metadata, filename: &str) -> Result<Vec<String>, PvfError> {
    data_sources(metadata, filename)?
        .into_iter()
        .map(|source| {
            source
                .get("filename")
                .and_then(MetaValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| missing("filename", filename, "data source"))
        })
        .collect()
}

/// First observable stored under `key`.
pub(crate) fn first_entry(record: &FitRecord, key: &str) -> Result<Obs, PvfError> {
    record.entry(key)?.first().cloned().ok_or_else(|| {
        PvfError::Parse(
            ErrorInfo::new("empty-entry", format!("{key} holds no observables"))
                .with_context("filename", record.filename.clone()),
        )
    })
}

/// Long name of a flow operator code; unknown codes are shown as given.
pub(crate) fn operator_name(operator: &str) -> String {
    operator
        .parse::<Operator>()
        .map(|op| op.display_name().to_string())
        .unwrap_or_else(|_| operator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(sources: Vec<MetaValue>) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("data_sources".to_string(), MetaValue::List(sources));
        metadata
    }

    #[test]
    fn filenames_are_read_from_every_source() {
        let source = |name: &str| {
            let mut entry = Metadata::new();
            entry.insert("filename".to_string(), name.into());
            entry.insert("beta".to_string(), 2.0.into());
            MetaValue::from(entry)
        };
        let metadata = described(vec![source("a.json"), source("b.json")]);
        assert_eq!(
            data_source_filenames(&metadata, "fit.json").expect("filenames"),
            vec!["a.json", "b.json"]
        );
    }

    #[test]
    fn sources_without_filenames_are_rejected() {
        let metadata = described(vec![MetaValue::from(Metadata::new())]);
        let err = data_source_filenames(&metadata, "fit.json").unwrap_err();
        assert_eq!(err.info().code, "missing-key");
        assert_eq!(err.info().context["key"], "filename");
    }

    #[test]
    fn operator_codes_get_long_names() {
        assert_eq!(operator_name("sym"), "Symmetric");
        assert_eq!(operator_name("clover"), "clover");
    }
}
