//! Ensemble parameters encoded in gradient-flow output file names.

use std::path::Path;

use pvf_core::{ErrorInfo, Metadata, PvfError};

const STEM: &str = "/out_wflow_";

fn leading<'a>(text: &'a str, accept: impl Fn(char) -> bool) -> Option<(&'a str, &'a str)> {
    let end = text.find(|c: char| !accept(c)).unwrap_or(text.len());
    (end > 0).then(|| text.split_at(end))
}

fn digits(text: &str) -> Option<(&str, &str)> {
    leading(text, |c| c.is_ascii_digit())
}

fn decimal(text: &str) -> Option<(&str, &str)> {
    leading(text, |c| c.is_ascii_digit() || c == '.')
}

fn parse_components(name: &str) -> Option<(i64, f64, f64, i64)> {
    // The last directory separator before the stem anchors the match.
    let start = name.rfind(STEM)? + STEM.len();
    let rest = &name[start..];
    let (npv, rest) = digits(rest)?;
    let rest = rest.strip_prefix("pv_beta")?;
    let (beta, rest) = decimal(rest)?;
    let rest = rest.strip_prefix("_mpv")?;
    let (mpv, rest) = decimal(rest)?;
    let rest = rest.strip_prefix("_L")?;
    let (extent, _) = digits(rest)?;
    Some((
        npv.parse().ok()?,
        beta.parse().ok()?,
        mpv.parse().ok()?,
        extent.parse().ok()?,
    ))
}

/// Reads `Npv`, `beta`, `mpv` and the lattice extent from a path of the form
/// `.../out_wflow_<Npv>pv_beta<beta>_mpv<mpv>_L<L>...`.
///
/// The lattice is hypercubic, so `NT`, `NX`, `NY` and `NZ` all take `L`.
pub fn metadata_from_filename(path: &Path) -> Result<Metadata, PvfError> {
    let name = path.to_string_lossy();
    let (npv, beta, mpv, extent) = parse_components(&name).ok_or_else(|| {
        PvfError::Parse(
            ErrorInfo::new(
                "unrecognised-filename",
                "file name does not encode the ensemble parameters",
            )
            .with_path(path)
            .with_hint("expected .../out_wflow_<Npv>pv_beta<beta>_mpv<mpv>_L<L>"),
        )
    })?;

    let mut metadata = Metadata::new();
    for key in ["NT", "NX", "NY", "NZ"] {
        metadata.insert(key.to_string(), extent.into());
    }
    metadata.insert("Npv".to_string(), npv.into());
    metadata.insert("mpv".to_string(), mpv.into());
    metadata.insert("beta".to_string(), beta.into());
    Ok(metadata)
}
