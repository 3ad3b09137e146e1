//! Finite-volume coupling and beta function with their extrapolations.

use pvf_core::{ErrorInfo, MetaValue, Metadata, PvfError};
use pvf_fit::{error_band, Linear, Model};
use pvf_obs::Obs;
use pvf_phys::{finite_volume_points, read_all_flow_observables, Scale};
use pvf_read::{FitRecord, FlowCache, Operator, ReaderKind};

use crate::figure::{error_points, linspace, Anchor, Figure, LineStyle, Marker};
use crate::registry::PropRegistry;
use crate::sources::{data_source_filenames, data_sources, number, text, value};
use crate::style::{Colour, PlotStyle};

/// Finite-volume points of one scale with the fitted `[a0, a1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleFit {
    pub scale: Scale,
    /// `1/L⁴`.
    pub x: Vec<f64>,
    pub y: Vec<Obs>,
    pub params: Vec<Obs>,
}

/// One extrapolation result with the data it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeFit {
    pub npv: MetaValue,
    pub mpv: MetaValue,
    pub beta: MetaValue,
    pub time: f64,
    /// Spatial extents of the ensembles.
    pub extents: Vec<f64>,
    pub scales: Vec<ScaleFit>,
}

impl VolumeFit {
    fn group(&self) -> (MetaValue, MetaValue, MetaValue) {
        (self.npv.clone(), self.mpv.clone(), self.beta.clone())
    }
}

fn source_reader(record: &FitRecord) -> Result<ReaderKind, PvfError> {
    let mut readers: Vec<&str> = data_sources(&record.metadata, &record.filename)?
        .into_iter()
        .filter_map(|source| source.get("reader").and_then(MetaValue::as_str))
        .collect();
    readers.sort_unstable();
    readers.dedup();
    match readers.as_slice() {
        [] => Ok(ReaderKind::Hirep),
        [reader] => reader.parse(),
        _ => Err(PvfError::Metadata(
            ErrorInfo::new(
                "inconsistent-readers",
                format!("data sources were read with {}", readers.join(", ")),
            )
            .with_context("filename", record.filename.clone()),
        )),
    }
}

/// Re-reads the flows behind each extrapolation.
pub fn volume_fits(records: &[FitRecord], cache: &FlowCache) -> Result<Vec<VolumeFit>, PvfError> {
    records
        .iter()
        .map(|record| {
            let time = number(&record.metadata, "time", &record.filename)?;
            let operator: Operator = text(&record.metadata, "operator").parse()?;
            let reader = source_reader(record)?;
            let mut extra = Metadata::new();
            if let Some(nc) = record.metadata.get("Nc") {
                extra.insert("Nc".to_string(), nc.clone());
            }
            let filenames = data_source_filenames(&record.metadata, &record.filename)?;
            let data = read_all_flow_observables(&filenames, reader, operator, &extra, cache)?;
            let extents = data
                .iter()
                .map(|datum| datum.spatial_extent())
                .collect::<Result<Vec<_>, _>>()?;
            let scales = Scale::EXTRAPOLATED
                .iter()
                .map(|scale| {
                    let (x, y) = finite_volume_points(&data, *scale, time)?;
                    Ok(ScaleFit {
                        scale: *scale,
                        x,
                        y,
                        params: record.entry(scale.key())?.to_vec(),
                    })
                })
                .collect::<Result<Vec<_>, PvfError>>()?;
            Ok(VolumeFit {
                npv: value(&record.metadata, "Npv"),
                mpv: value(&record.metadata, "mpv"),
                beta: value(&record.metadata, "beta"),
                time,
                extents,
                scales,
            })
        })
        .collect()
}

fn scale_label(scale: Scale) -> &'static str {
    match scale {
        Scale::T2E => "t²E",
        Scale::CouplingSquared => "g²_GF",
        Scale::Beta => "β_GF",
    }
}

/// One row per `(Npv, mpv, beta)`, one column per extrapolated scale.
pub fn infinite_volume_figure(fits: &[VolumeFit], style: &PlotStyle) -> Result<Figure, PvfError> {
    let mut groups: Vec<_> = fits.iter().map(VolumeFit::group).collect();
    groups.sort();
    groups.dedup();
    let rows = groups.len().max(1);
    let cols = Scale::EXTRAPOLATED.len();
    let mut figure = Figure::grid(rows, cols, (7.0, 1.0 + 2.0 * rows as f64));

    let x_max = fits
        .iter()
        .flat_map(|fit| fit.scales.iter().flat_map(|scale| scale.x.iter().copied()))
        .fold(0.0, f64::max)
        * 1.1;
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };
    let xs = linspace(0.0, x_max, 200);

    let mut colours = PropRegistry::colours(style);
    let mut labelled: Vec<f64> = Vec::new();
    for fit in fits {
        let row = groups.iter().position(|group| *group == fit.group()).unwrap_or(0);
        let colour = colours.get(fit.time)?;
        for (col, scale_fit) in fit.scales.iter().enumerate() {
            let label = (row == 0 && col == 0 && !labelled.contains(&fit.time)).then(|| {
                labelled.push(fit.time);
                format!("t/a² = {}", fit.time)
            });
            let panel = figure.panel_mut(row, col)?;
            panel.errorbars(error_points(&scale_fit.x, &scale_fit.y), colour, Marker::Cross, label);

            let params: Vec<f64> = scale_fit.params.iter().map(Obs::value).collect();
            if params.len() != Linear.n_params() {
                continue;
            }
            let centre: Vec<f64> = xs.iter().map(|x| Linear.eval(&params, *x)).collect();
            let errors = error_band(&xs, &Linear, &scale_fit.params)?;
            panel.band(&xs, &centre, &errors, colour, style.band_opacity);
            panel.line(xs.iter().copied().zip(centre).collect(), colour, LineStyle::DASHED);
            for extent in &fit.extents {
                panel.vline(extent.powi(4).recip(), Colour::GREY, 0.2);
            }
        }
    }

    for (cell, panel) in figure.panels_mut() {
        panel.vline(0.0, Colour::BLACK, 0.2);
        panel.x_range = Some((0.0, x_max));
        let x_label = if cell.row == rows - 1 { "(a/L)^4" } else { "" };
        let y_label = Scale::EXTRAPOLATED
            .get(cell.col)
            .copied()
            .map(scale_label)
            .unwrap_or_default();
        panel.labels(x_label, y_label);
        if let Some((npv, mpv, beta)) = groups.get(cell.row) {
            panel.text(0.05, 0.95, format!("Npv={npv}, mpv={mpv}, β={beta}"), Anchor::TopLeft);
        }
    }
    Ok(figure)
}
