//! Nonperturbative beta function against the perturbative curves.

use pvf_core::{MetaValue, PvfError};
use pvf_fit::{error_band, BetaInterpolation, Model};
use pvf_obs::Obs;
use pvf_phys::{extrapolated_points, perturbative_beta, Representation, BETA_INTERPOLATION_KEY};
use pvf_read::{read_all_fit_results, FitRecord};

use crate::figure::{linspace, obs_error_points, Anchor, Element, Figure, LineStyle, Marker};
use crate::registry::PropRegistry;
use crate::sources::{data_source_filenames, number, operator_name, text, value};
use crate::style::{Colour, PlotStyle};

const Y_RANGE: (f64, f64) = (-5.0, 0.6);
const PERTURBATIVE: [(usize, &str, LineStyle); 3] = [
    (1, "1-loop univ.", LineStyle::Dashed(8, 3)),
    (2, "2-loop univ.", LineStyle::Dashed(2, 2)),
    (3, "3-loop GF", LineStyle::Dashed(8, 2)),
];

/// One fitted beta function with the points it was fitted to.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaCurve {
    pub operator: String,
    pub npv: MetaValue,
    pub time: f64,
    pub order: usize,
    /// Interpolation coefficients.
    pub coefficients: Vec<Obs>,
    /// Infinite-volume couplings.
    pub coupling: Vec<Obs>,
    /// Infinite-volume beta function.
    pub beta: Vec<Obs>,
}

/// Loads the extrapolations each fit was made from.
pub fn beta_curves(fits: &[FitRecord]) -> Result<Vec<BetaCurve>, PvfError> {
    fits.iter()
        .map(|fit| {
            let filenames = data_source_filenames(&fit.metadata, &fit.filename)?;
            let sources = read_all_fit_results(&filenames, true)?;
            let (coupling, beta) = extrapolated_points(&sources)?;
            Ok(BetaCurve {
                operator: text(&fit.metadata, "operator"),
                npv: value(&fit.metadata, "Npv"),
                time: number(&fit.metadata, "time", &fit.filename)?,
                order: number(&fit.metadata, "order", &fit.filename)? as usize,
                coefficients: fit.entry(BETA_INTERPOLATION_KEY)?.to_vec(),
                coupling,
                beta,
            })
        })
        .collect()
}

fn sorted_unique<T: Clone + PartialOrd>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::new();
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    unique
}

/// Grid of operators by Pauli-Villars count with one band per flow time.
pub fn beta_figure(curves: &[BetaCurve], style: &PlotStyle) -> Result<Figure, PvfError> {
    let operators = sorted_unique(curves.iter().map(|curve| curve.operator.clone()));
    let npvs = sorted_unique(curves.iter().map(|curve| curve.npv.clone()));
    let (rows, cols) = (operators.len().max(1), npvs.len().max(1));
    let mut figure = Figure::grid(rows, cols, (1.5 + 3.0 * cols as f64, 1.0 + 2.5 * rows as f64));

    let x_max = curves
        .iter()
        .flat_map(|curve| &curve.coupling)
        .map(|g2| g2.value() + g2.dvalue())
        .fold(0.0, f64::max)
        * 1.05;
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };

    let mut colours = PropRegistry::colours(style);
    for curve in curves {
        let row = operators.iter().position(|op| *op == curve.operator).unwrap_or(0);
        let col = npvs.iter().position(|npv| *npv == curve.npv).unwrap_or(0);
        let colour = colours.get(curve.time)?;
        let panel = figure.panel_mut(row, col)?;
        panel.errorbars(
            obs_error_points(&curve.coupling, &curve.beta),
            colour,
            Marker::Circle,
            Some(format!("t/a² = {}", curve.time)),
        );

        let (lo, hi) = curve
            .coupling
            .iter()
            .map(Obs::value)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g2| (lo.min(g2), hi.max(g2)));
        if lo > hi {
            continue;
        }
        let model = BetaInterpolation { order: curve.order };
        let params: Vec<f64> = curve.coefficients.iter().map(Obs::value).collect();
        let xs = linspace(lo, hi, 200);
        let centre: Vec<f64> = xs.iter().map(|x| model.eval(&params, *x)).collect();
        let errors = error_band(&xs, &model, &curve.coefficients)?;
        panel.band(&xs, &centre, &errors, colour, style.band_opacity);
    }

    let xs = linspace(0.0, x_max, 200);
    let legend_cell = (rows - 1, 0);
    for (cell, panel) in figure.panels_mut() {
        for (loops, label, line_style) in PERTURBATIVE {
            panel.push(Element::Line {
                points: xs
                    .iter()
                    .map(|g2| (*g2, perturbative_beta(*g2, loops, Representation::Adj, 2.0, 2.0)))
                    .collect(),
                colour: Colour::GREY,
                style: line_style,
                label: Some(label.to_string()),
            });
        }
        panel.hline(0.0, Colour::BLACK, LineStyle::Solid);
        panel.x_range = Some((0.0, x_max));
        panel.y_range = Some(Y_RANGE);
        if (cell.row, cell.col) != legend_cell {
            panel.clear_labels();
        }
        let x_label = if cell.row == rows - 1 { "g²_GF(t; g0²)" } else { "" };
        let y_label = if cell.col == 0 { "β_GF(t; g0²)" } else { "" };
        panel.labels(x_label, y_label);
        if rows * cols > 1 {
            let npv = npvs.get(cell.col).map(ToString::to_string).unwrap_or_default();
            let operator = operators.get(cell.row).map(|op| operator_name(op)).unwrap_or_default();
            panel.text(0.95, 0.05, format!("{npv}PV, {operator}"), Anchor::BottomRight);
        }
    }
    Ok(figure)
}
