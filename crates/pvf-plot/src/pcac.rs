//! Effective PCAC mass, window fits and their weights.

use pvf_core::PvfError;
use pvf_obs::Obs;
use pvf_phys::PcacMass;

use crate::figure::{Cell, Element, ErrorPoint, Figure, LineStyle, Marker, Panel};
use crate::style::{Colour, PlotStyle};

fn mark_result(panel: &mut Panel, mass: &Obs, colour: Colour) {
    let (value, error) = (mass.value(), mass.dvalue());
    panel
        .hline(value, colour, LineStyle::Solid)
        .hline(value + error, colour, LineStyle::DASHED)
        .hline(value - error, colour, LineStyle::DASHED);
}

/// Effective mass with the averaged result, the fitted constant of each
/// window and `-AIC` of each window.
pub fn pcac_figure(result: &PcacMass, style: &PlotStyle) -> Result<Figure, PvfError> {
    let colour = style.colour(0);
    let result_colour = style.colour(1);

    let mut eff_panel = Panel::new();
    eff_panel.labels("t", "m_eff");
    let points = result
        .eff_mass
        .plottable()
        .into_iter()
        .map(|(t, value, error)| ErrorPoint {
            x: t as f64,
            y: value,
            x_err: None,
            y_err: Some(error),
        })
        .collect();
    eff_panel.errorbars(points, colour, Marker::Circle, None);
    mark_result(&mut eff_panel, &result.mass, result_colour);

    let indices = (-0.5, result.windows.len() as f64 - 0.5);
    let mut window_panel = Panel::new();
    window_panel.labels("", "m_eff");
    let constants = result
        .windows
        .iter()
        .enumerate()
        .filter_map(|(index, window)| {
            window.fit.params.first().map(|p| ErrorPoint::at(index as f64, p))
        })
        .collect();
    window_panel.errorbars(constants, colour, Marker::Square, None);
    mark_result(&mut window_panel, &result.mass, result_colour);
    window_panel.x_range = Some(indices);

    let mut weight_panel = Panel::new();
    weight_panel.labels("Window", "-AIC");
    weight_panel.push(Element::Scatter {
        points: result
            .windows
            .iter()
            .enumerate()
            .map(|(index, window)| (index as f64, -window.aic))
            .collect(),
        colour,
        marker: Marker::Circle,
    });
    weight_panel.x_range = Some(indices);

    let figure = Figure::with_layout(
        2,
        2,
        (7.0, 4.5),
        vec![
            (Cell::at(0, 0).spanning(2, 1), eff_panel),
            (Cell::at(0, 1), window_panel),
            (Cell::at(1, 1), weight_panel),
        ],
    )?;
    Ok(figure.with_title(Some(format!("m_PCAC = {}", result.mass))))
}
