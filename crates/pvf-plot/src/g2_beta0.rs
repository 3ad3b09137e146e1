//! Coupling and plaquette against the bare coupling.

use std::path::Path;

use pvf_core::{group_by_keys, MetaValue, PvfError};
use pvf_obs::{weighted_mean_by_uncertainty, Obs};
use pvf_read::{read_plaquette_from_flows, FitRecord};

use crate::figure::{error_points, Element, Figure, LineStyle};
use crate::registry::PropRegistry;
use crate::sources::{data_source_filenames, first_entry, number};
use crate::style::PlotStyle;

/// Infinite-volume coupling and mean plaquette of one Pauli-Villars setting.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingSeries {
    pub npv: MetaValue,
    pub mpv: MetaValue,
    /// Bare couplings, ascending.
    pub beta: Vec<f64>,
    pub coupling: Vec<Obs>,
    pub plaquette: Vec<Obs>,
}

/// Groups extrapolation results by `Npv` and `mpv` and reads the plaquette
/// of the ensembles behind each one.
pub fn coupling_series(fits: &[FitRecord]) -> Result<Vec<CouplingSeries>, PvfError> {
    let groups = group_by_keys(fits, &["Npv", "mpv"])?;
    let mut series = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut ordered = members
            .into_iter()
            .map(|record| Ok((number(&record.metadata, "beta", &record.filename)?, record)))
            .collect::<Result<Vec<_>, PvfError>>()?;
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut entry = CouplingSeries {
            npv: key.first().cloned().unwrap_or_default(),
            mpv: key.get(1).cloned().unwrap_or_default(),
            beta: Vec::with_capacity(ordered.len()),
            coupling: Vec::with_capacity(ordered.len()),
            plaquette: Vec::with_capacity(ordered.len()),
        };
        for (beta, record) in ordered {
            let plaquettes = data_source_filenames(&record.metadata, &record.filename)?
                .iter()
                .map(|filename| read_plaquette_from_flows(Path::new(filename)))
                .collect::<Result<Vec<_>, _>>()?;
            entry.beta.push(beta);
            entry.coupling.push(first_entry(record, "gGF^2")?);
            entry.plaquette.push(weighted_mean_by_uncertainty(&plaquettes)?);
        }
        series.push(entry);
    }
    Ok(series)
}

/// Coupling above, plaquette below, one marker per Pauli-Villars setting.
pub fn g2_beta0_figure(series: &[CouplingSeries], style: &PlotStyle) -> Result<Figure, PvfError> {
    let mut figure = Figure::grid(2, 1, (3.5, 5.0));
    let mut colours = PropRegistry::colours(style);
    let mut markers = PropRegistry::markers("o^s")?;
    for entry in series {
        let key = (entry.npv.clone(), entry.mpv.clone());
        let colour = colours.get(key.clone())?;
        let marker = markers.get(key)?;
        let label = format!("{}PV, mPV = {}", entry.npv, entry.mpv);
        for (row, values) in [&entry.coupling, &entry.plaquette].into_iter().enumerate() {
            figure.panel_mut(row, 0)?.push(Element::ErrorBars {
                points: error_points(&entry.beta, values),
                colour,
                marker,
                label: (row == 0).then(|| label.clone()),
                joined: Some(LineStyle::DOTTED),
            });
        }
    }
    figure.panel_mut(0, 0)?.labels("", "g²_GF");
    figure.panel_mut(1, 0)?.labels("β0", "<P>");
    figure.share_x();
    Ok(figure)
}
