//! Fixed-point coupling and anomalous dimension across flow-time windows.

use pvf_core::PvfError;
use pvf_read::FitRecord;

use crate::figure::{Anchor, Element, ErrorPoint, Figure, Marker};
use crate::registry::PropRegistry;
use crate::sources::{number, operator_name, text};
use crate::style::PlotStyle;

const OBSERVABLES: [(&str, &str); 2] = [("g_star_squared", "g²_GF*"), ("gamma_star", "γ*_g")];

/// Rows of `g*²` and `γ*`, one column per operator, coloured by `t_max`.
pub fn fixed_point_figure(records: &[FitRecord], style: &PlotStyle) -> Result<Figure, PvfError> {
    let mut operators: Vec<String> = records
        .iter()
        .map(|record| text(&record.metadata, "operator"))
        .collect();
    operators.sort();
    operators.dedup();
    let cols = operators.len().max(1);
    let mut figure = Figure::grid(OBSERVABLES.len(), cols, (1.0 + 3.0 * cols as f64, 5.0));
    let mut colours = PropRegistry::<f64, _>::colours(style);

    for record in records {
        let operator = text(&record.metadata, "operator");
        let col = operators.iter().position(|op| *op == operator).unwrap_or(0);
        let min_time = number(&record.metadata, "min_time", &record.filename)?;
        let max_time = number(&record.metadata, "max_time", &record.filename)?;
        let colour = colours.get(max_time)?;
        for (row, (key, _)) in OBSERVABLES.iter().enumerate() {
            let point = ErrorPoint {
                x: min_time,
                y: number(&record.metadata, &format!("value_{key}"), &record.filename)?,
                x_err: None,
                y_err: Some(number(
                    &record.metadata,
                    &format!("uncertainty_{key}"),
                    &record.filename,
                )?),
            };
            figure.panel_mut(row, col)?.errorbars(vec![point], colour, Marker::Square, None);
        }
    }

    let legend: Vec<Element> = colours
        .items()
        .map(|(time, colour)| Element::ErrorBars {
            points: Vec::new(),
            colour: *colour,
            marker: Marker::Square,
            label: Some(format!("t_max/a²={time:.1}")),
            joined: None,
        })
        .collect();
    let last_row = OBSERVABLES.len() - 1;
    for (cell, panel) in figure.panels_mut() {
        let x_label = if cell.row == last_row { "t_min/a²" } else { "" };
        let y_label = if cell.col == 0 { OBSERVABLES[cell.row].1 } else { "" };
        panel.labels(x_label, y_label);
        if let Some(operator) = operators.get(cell.col) {
            panel.text(0.05, 0.05, operator_name(operator), Anchor::BottomLeft);
        }
        if cell.row == 0 && cell.col == cols - 1 {
            panel.elements.extend(legend.iter().cloned());
        }
    }
    figure.share_x();
    figure.share_y_by_row();
    Ok(figure)
}
