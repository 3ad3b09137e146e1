use std::path::Path;

use pvf_core::{ErrorInfo, PvfError};
use pvf_obs::Obs;

use crate::hirep::{numbered_lines, parse_configuration_line};

/// Average plaquette of the configurations listed in a flow log.
///
/// Only the configuration lines are read, so this is much cheaper than a
/// full [`crate::read_flows`]. Replicas are named like those of the flows.
pub fn read_plaquette_from_flows(path: &Path) -> Result<Obs, PvfError> {
    let mut runs: Vec<(String, Vec<usize>, Vec<f64>)> = Vec::new();
    for entry in numbered_lines(path)? {
        let (_, line) = entry?;
        let Some(config) = parse_configuration_line(&line) else {
            continue;
        };
        match runs.iter_mut().find(|(run, _, _)| *run == config.run) {
            Some((_, indices, plaquettes)) => {
                indices.push(config.index);
                plaquettes.push(config.plaquette);
            }
            None => runs.push((config.run, vec![config.index], vec![config.plaquette])),
        }
    }
    if runs.is_empty() {
        return Err(PvfError::Parse(
            ErrorInfo::new("no-configurations", "log lists no configurations").with_path(path),
        ));
    }

    let ensemble = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let single = runs.len() == 1;
    let mut names = Vec::with_capacity(runs.len());
    let mut idl = Vec::with_capacity(runs.len());
    let mut samples = Vec::with_capacity(runs.len());
    for (run, indices, plaquettes) in runs {
        names.push(if single {
            ensemble.clone()
        } else {
            format!("{ensemble}|{run}")
        });
        // Restarted runs may list configurations out of order.
        let mut pairs: Vec<(usize, f64)> = indices.into_iter().zip(plaquettes).collect();
        pairs.sort_by_key(|(index, _)| *index);
        let (indices, plaquettes): (Vec<usize>, Vec<f64>) = pairs.into_iter().unzip();
        idl.push(indices);
        samples.push(plaquettes);
    }
    Obs::new(samples, names, Some(idl))
}
