//! PCAC mass against bare mass with the critical-mass fits.

use pvf_core::{ErrorInfo, PvfError};
use pvf_fit::{Model, PowerLaw};
use pvf_phys::CriticalMassFit;

use crate::figure::{
    error_points, linspace, Cell, Element, ErrorPoint, Figure, LineStyle, Marker, Panel,
};
use crate::style::{Colour, PlotStyle};

fn fit_colour(skip: usize, style: &PlotStyle) -> Colour {
    match skip {
        0 => Colour::DARK_ORANGE,
        1 => Colour::DARK_GREEN,
        n => style.colour(n),
    }
}

/// Data, fitted power laws and normalised residuals of the unskipped fit.
pub fn critical_mass_figure(
    fits: &[CriticalMassFit],
    style: &PlotStyle,
) -> Result<Figure, PvfError> {
    let main = fits
        .iter()
        .find(|fit| fit.skip == 0)
        .or_else(|| fits.first())
        .ok_or_else(|| PvfError::Plot(ErrorInfo::new("no-fits", "no critical mass fits to plot")))?;
    let critical = main.critical_mass()?;
    let x_min = critical.value() - critical.dvalue();
    let heaviest = main.masses.iter().copied().fold(x_min, f64::max);
    let x_max = heaviest + 0.05 * (heaviest - x_min);
    let colour = style.colour(0);

    let mut fit_panel = Panel::new();
    fit_panel.labels("", "am_PCAC");
    fit_panel.errorbars(error_points(&main.masses, &main.pcac), colour, Marker::Circle, None);
    let xs = linspace(x_min, x_max, 500);
    for fit in fits {
        let params = fit.fit.values();
        let label = (fit.skip > 0).then(|| format!("Fit (omit {} lightest)", fit.skip));
        fit_panel.push(Element::Line {
            points: xs.iter().map(|x| (*x, PowerLaw.eval(&params, *x))).collect(),
            colour: fit_colour(fit.skip, style),
            style: LineStyle::Solid,
            label,
        });
    }
    let y_max = fit_panel.y_limits().1;
    fit_panel.x_range = Some((x_min, x_max));
    fit_panel.y_range = Some((0.0, y_max));

    let params = main.fit.values();
    let residuals = main
        .masses
        .iter()
        .zip(&main.pcac)
        .map(|(mass, pcac)| ErrorPoint {
            x: *mass,
            y: (pcac.value() - PowerLaw.eval(&params, *mass)) / pcac.dvalue(),
            x_err: None,
            y_err: Some(1.0),
        })
        .collect();
    let mut residual_panel = Panel::new();
    residual_panel
        .labels("am_0", "Residuals")
        .band(&[x_min, x_max], &[0.0, 0.0], &[1.0, 1.0], Colour::GREY, style.band_opacity)
        .hline(0.0, Colour::BLACK, LineStyle::Solid)
        .errorbars(residuals, colour, Marker::Circle, None);
    residual_panel.x_range = Some((x_min, x_max));

    Figure::with_layout(
        4,
        1,
        (4.5, 5.0),
        vec![
            (Cell::at(0, 0).spanning(3, 1), fit_panel),
            (Cell::at(3, 0), residual_panel),
        ],
    )
}
