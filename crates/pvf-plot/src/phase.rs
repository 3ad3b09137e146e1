//! Plaquette phase diagram figures.

use pvf_core::{ErrorInfo, PvfError};
use pvf_phys::phase::select;
use pvf_phys::{PhasePoint, PhaseScan, PvSpec};

use crate::figure::{Element, ErrorPoint, Figure, LineStyle, Marker};
use crate::style::{Colour, PlotStyle};

fn spec_title(spec: &PvSpec) -> String {
    match spec.mpv {
        Some(mpv) if spec.npv > 0 => format!("Npv={}, mpv={mpv:.1}", spec.npv),
        _ => format!("Npv={}", spec.npv),
    }
}

fn plaquette_points(points: &[&PhasePoint]) -> Vec<ErrorPoint> {
    points
        .iter()
        .map(|point| ErrorPoint::at(point.mass, &point.plaquette))
        .collect()
}

/// Every Pauli-Villars setting on one set of axes.
pub fn phase_overlaid_figure(
    points: &[PhasePoint],
    scan: &PhaseScan,
    style: &PlotStyle,
) -> Result<Figure, PvfError> {
    let mut figure = Figure::grid(1, 1, (5.0, 4.0)).with_title(scan.title.clone());
    let panel = figure.panel_mut(0, 0)?;
    panel.labels("am_0", "<P>");
    for (index, spec) in scan.pv_specs.iter().enumerate() {
        let colour = style.colour(index);
        let marker = Marker::CYCLE[index % Marker::CYCLE.len()];
        let mut label = Some(spec_title(spec));
        for &beta in &scan.betas {
            let selected = select(points, spec, beta);
            if selected.is_empty() {
                continue;
            }
            panel.push(Element::ErrorBars {
                points: plaquette_points(&selected),
                colour,
                marker,
                label: label.take(),
                joined: Some(LineStyle::Solid),
            });
        }
    }
    Ok(figure)
}

fn log_fraction(beta: f64, betas: &[f64]) -> f64 {
    let (lo, hi) = betas
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(*b), hi.max(*b)));
    let span = hi.ln() - lo.ln();
    if span.is_finite() && span > 0.0 {
        (beta.ln() - lo.ln()) / span
    } else {
        0.0
    }
}

/// One panel per Pauli-Villars setting with data, coloured by coupling.
///
/// The plaquette of the heaviest negative mass without Pauli-Villars
/// fields is marked in every panel for reference.
pub fn phase_panels_figure(
    points: &[PhasePoint],
    scan: &PhaseScan,
    style: &PlotStyle,
) -> Result<Figure, PvfError> {
    let specs: Vec<&PvSpec> = scan
        .pv_specs
        .iter()
        .filter(|spec| scan.betas.iter().any(|beta| !select(points, spec, *beta).is_empty()))
        .collect();
    if specs.is_empty() {
        return Err(PvfError::Plot(ErrorInfo::new(
            "empty-phase-diagram",
            "no scanned points match the Pauli-Villars settings",
        )));
    }
    let cols = specs.len();
    let mut figure =
        Figure::grid(1, cols, (1.0 + 2.5 * cols as f64, 4.0)).with_title(scan.title.clone());

    let reference_spec = PvSpec { npv: 0, mpv: None };
    let references: Vec<(f64, Colour)> = scan
        .betas
        .iter()
        .filter_map(|beta| {
            select(points, &reference_spec, *beta)
                .into_iter()
                .filter(|point| point.mass < 0.0)
                .last()
                .map(|point| {
                    let colour = Colour::plasma(log_fraction(*beta, &scan.betas));
                    (point.plaquette.value(), colour)
                })
        })
        .collect();

    for (col, spec) in specs.iter().enumerate() {
        let panel = figure.panel_mut(0, col)?;
        panel.title = Some(spec_title(spec));
        panel.labels("am_0", if col == 0 { "<P>" } else { "" });
        for (index, &beta) in scan.betas.iter().enumerate() {
            let selected = select(points, spec, beta);
            if selected.is_empty() {
                continue;
            }
            panel.errorbars(
                plaquette_points(&selected),
                Colour::plasma(log_fraction(beta, &scan.betas)),
                Marker::CYCLE[index % Marker::CYCLE.len()],
                (col == cols - 1).then(|| format!("β={beta}")),
            );
        }
        for (plaquette, colour) in &references {
            panel.hline(*plaquette, *colour, LineStyle::DASHED);
        }
    }
    figure.share_y();
    tracing::debug!(panels = cols, references = references.len(), "phase diagram laid out");
    Ok(figure)
}
