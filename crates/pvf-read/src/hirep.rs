//! Line-level parsing shared by the HiRep log readers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use pvf_core::{ErrorInfo, PvfError};

/// Prefix of the lines announcing a configuration read from disk.
pub const CONFIGURATION_PREFIX: &str = "[IO][0]Configuration";

pub(crate) fn parse_error(path: &Path, line_number: usize, message: impl Into<String>) -> PvfError {
    PvfError::Parse(
        ErrorInfo::new("malformed-log", message.into())
            .with_path(path)
            .with_context("line", (line_number + 1).to_string()),
    )
}

/// Iterates the lines of a text file together with their zero-based number.
pub(crate) fn numbered_lines(
    path: &Path,
) -> Result<impl Iterator<Item = Result<(usize, String), PvfError>> + '_, PvfError> {
    let file = File::open(path).map_err(|err| PvfError::io("read-failed", path, err))?;
    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .map(move |(number, line)| {
            line.map(|line| (number, line))
                .map_err(|err| PvfError::io("read-failed", path, err))
        }))
}

/// Configuration announced by a `[IO][0]Configuration` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationLine {
    /// Run name, the part of the file name before the first underscore.
    pub run: String,
    /// Configuration index, the number after the last `n` of the file name.
    pub index: usize,
    /// Average plaquette printed with the configuration.
    pub plaquette: f64,
}

/// Parses `[IO][0]Configuration [<dir>/<run>_...n<index>] read ... Plaquette=<p>`.
pub fn parse_configuration_line(line: &str) -> Option<ConfigurationLine> {
    if !line.starts_with(CONFIGURATION_PREFIX) {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let cfg = tokens.get(1)?.trim_matches(|c| c == '[' || c == ']');
    let basename = cfg.rsplit('/').next()?;
    let run = basename.split('_').next()?.to_string();
    let index = cfg.rsplit('n').next()?.parse().ok()?;
    let plaquette = tokens
        .iter()
        .find(|token| token.starts_with("Plaquette="))
        .or_else(|| tokens.get(5))?
        .rsplit('=')
        .next()?
        .parse()
        .ok()?;
    Some(ConfigurationLine {
        run,
        index,
        plaquette,
    })
}

/// Parses the lattice extent from `Global size is TxXxYxZ`.
pub fn parse_global_size(line: &str) -> Option<[usize; 4]> {
    let (_, rest) = line.split_once("Global size is")?;
    let mut dims = rest.split_whitespace().next()?.split('x');
    let mut extent = [0usize; 4];
    for slot in extent.iter_mut() {
        *slot = dims.next()?.parse().ok()?;
    }
    if dims.next().is_some() {
        return None;
    }
    Some(extent)
}

/// Parses the number of colours from the first `SU(N)` on the line.
pub fn parse_gauge_group(line: &str) -> Option<i64> {
    let (_, rest) = line.split_once("SU(")?;
    let (digits, _) = rest.split_once(')')?;
    digits.trim().parse().ok()
}

/// Configuration file name announced by a `[IO][0]Configuration` line.
pub fn configuration_name(line: &str) -> Option<&str> {
    if !line.starts_with(CONFIGURATION_PREFIX) {
        return None;
    }
    let cfg = line.split_whitespace().nth(1)?.trim_matches(|c| c == '[' || c == ']');
    cfg.rsplit('/').next()
}

/// Splits the ensemble part of a HiRep configuration name into tags.
///
/// `run1_32x16x16x16nc2rADJnf2b2.250000m-1.050000n100` yields
/// `nc=2`, `r=ADJ`, `nf=2`, `b=2.250000`, `m=-1.050000` and `n=100`.
pub fn configuration_tags(name: &str) -> Vec<(&str, &str)> {
    let rest = name.split_once('_').map_or(name, |(_, rest)| rest);
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == 'x');
    let mut tags = Vec::new();
    let mut remaining = rest;
    while !remaining.is_empty() {
        let tag_end = remaining
            .find(|c: char| !c.is_ascii_lowercase())
            .unwrap_or(remaining.len());
        let (tag, after) = remaining.split_at(tag_end);
        let value_end = after
            .find(|c: char| c.is_ascii_lowercase())
            .unwrap_or(after.len());
        let (value, next) = after.split_at(value_end);
        if tag.is_empty() || value.is_empty() {
            break;
        }
        tags.push((tag, value));
        remaining = next;
    }
    tags
}

/// Short name of a HiRep fermion representation.
pub fn representation_name(tag: &str) -> String {
    let tag = tag.trim_start_matches("REPR_");
    match tag {
        "ADJ" | "ADJOINT" => "adj".to_string(),
        "FUN" | "FUNDAMENTAL" => "fun".to_string(),
        "AS" | "ANTISYMMETRIC" => "as".to_string(),
        "S" | "SYMMETRIC" => "s".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_lines_give_run_index_and_plaquette() {
        let line = "[IO][0]Configuration [cnfg/run1_48x24x24x24nc2b2.25m-0.1n120] read: [0.5 sec] Plaquette=0.5871234";
        let parsed = parse_configuration_line(line).expect("parsed");
        assert_eq!(parsed.run, "run1");
        assert_eq!(parsed.index, 120);
        assert!((parsed.plaquette - 0.5871234).abs() < 1e-12);
    }

    #[test]
    fn geometry_and_group() {
        assert_eq!(
            parse_global_size("[GEOMETRY_INIT][0]Global size is 48x24x24x24"),
            Some([48, 24, 24, 24])
        );
        assert_eq!(parse_gauge_group("[SYSTEM][0]Gauge group: SU(2)"), Some(2));
        assert_eq!(parse_global_size("[GEOMETRY_INIT][0]Global size is 48x24"), None);
    }

    #[test]
    fn configuration_names_split_into_tags() {
        let tags = configuration_tags("run1_32x16x16x16nc2rADJnf2b2.250000m-1.050000n100");
        assert_eq!(
            tags,
            vec![
                ("nc", "2"),
                ("r", "ADJ"),
                ("nf", "2"),
                ("b", "2.250000"),
                ("m", "-1.050000"),
                ("n", "100"),
            ]
        );
        assert_eq!(representation_name("REPR_ADJOINT"), "adj");
    }
}
