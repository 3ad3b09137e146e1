//! Rendering of [`Figure`]s with plotters.

use std::fmt::Display;
use std::path::Path;

use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use pvf_core::{ErrorInfo, PvfError};

use crate::figure::{Anchor, Element, Figure, LineStyle, Marker, Panel};
use crate::style::{Colour, PlotStyle};

/// Figure path that is accepted but never written.
pub const DISCARD: &str = "/dev/null";

const CAP_WIDTH: u32 = 6;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_error(err: impl Display) -> PvfError {
    PvfError::Plot(ErrorInfo::new("render-failed", err.to_string()))
}

fn rgb(colour: Colour) -> RGBColor {
    RGBColor(colour.r, colour.g, colour.b)
}

fn finite((x, y): &(f64, f64)) -> bool {
    x.is_finite() && y.is_finite()
}

/// Writes `figure` to `path` as SVG.
///
/// Without a path the figure is skipped with a log message; [`DISCARD`] skips
/// it silently.
pub fn save_figure(
    figure: &Figure,
    path: Option<&Path>,
    style: &PlotStyle,
) -> Result<(), PvfError> {
    let Some(path) = path else {
        tracing::info!(
            title = figure.title.as_deref().unwrap_or_default(),
            "no plot filename given; figure not written"
        );
        return Ok(());
    };
    if path == Path::new(DISCARD) {
        return Ok(());
    }
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));
    if !is_svg {
        return Err(PvfError::Plot(
            ErrorInfo::new("unsupported-plot-format", "figures are written as SVG")
                .with_path(path)
                .with_hint("use a file name ending in .svg"),
        ));
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| PvfError::io("create-dir-failed", parent, err))?;
    }

    let root = SVGBackend::new(path, style.pixels(figure.size)).into_drawing_area();
    draw_figure(&root, figure, style)?;
    root.present().map_err(render_error)?;
    tracing::info!(path = %path.display(), "figure written");
    Ok(())
}

/// Renders `figure` to an SVG document in memory.
pub fn render_svg(figure: &Figure, style: &PlotStyle) -> Result<String, PvfError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, style.pixels(figure.size)).into_drawing_area();
        draw_figure(&root, figure, style)?;
        root.present().map_err(render_error)?;
    }
    Ok(svg)
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
    style: &PlotStyle,
) -> Result<(), PvfError> {
    root.fill(&WHITE).map_err(render_error)?;
    let body = match &figure.title {
        Some(title) => root
            .titled(title, (style.font_family.as_str(), style.font_size + 4))
            .map_err(render_error)?,
        None => root.clone(),
    };
    let (width, height) = body.dim_in_pixel();
    let cell_width = width / figure.cols as u32;
    let cell_height = height / figure.rows as u32;
    for (cell, panel) in figure.panels() {
        let area = body.clone().shrink(
            (cell.col as u32 * cell_width, cell.row as u32 * cell_height),
            (cell.col_span as u32 * cell_width, cell.row_span as u32 * cell_height),
        );
        draw_panel(&area, panel, style)?;
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    style: &PlotStyle,
) -> Result<(), PvfError> {
    let (x0, x1) = panel.x_limits();
    let (y0, y1) = panel.y_limits();
    let font = (style.font_family.as_str(), style.font_size);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(style.margin)
        .x_label_area_size(style.font_size * 3)
        .y_label_area_size(style.font_size * 4);
    if let Some(title) = &panel.title {
        builder.caption(title, font);
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1).map_err(render_error)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(5)
        .y_labels(5)
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .label_style(font)
        .axis_desc_style(font)
        .draw()
        .map_err(render_error)?;

    for element in &panel.elements {
        draw_element(&mut chart, element, (x0, x1), (y0, y1), style)?;
    }

    for annotation in &panel.annotations {
        let position = (x0 + annotation.x * (x1 - x0), y0 + annotation.y * (y1 - y0));
        let (h_pos, v_pos) = match annotation.anchor {
            Anchor::TopLeft => (HPos::Left, VPos::Top),
            Anchor::TopRight => (HPos::Right, VPos::Top),
            Anchor::BottomLeft => (HPos::Left, VPos::Bottom),
            Anchor::BottomRight => (HPos::Right, VPos::Bottom),
        };
        let text_style = TextStyle::from(font).pos(Pos::new(h_pos, v_pos));
        chart
            .draw_series(std::iter::once(Text::new(annotation.text.clone(), position, text_style)))
            .map_err(render_error)?;
    }

    if panel.has_legend() {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(font)
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(render_error)?;
    }
    Ok(())
}

fn draw_element<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    element: &Element,
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
    style: &PlotStyle,
) -> Result<(), PvfError> {
    let width = style.line_width;
    match element {
        Element::ErrorBars {
            points,
            colour,
            marker,
            label,
            joined,
        } => {
            let shape = rgb(*colour).stroke_width(width);
            if let Some(line_style) = joined {
                let path = points.iter().map(|point| (point.x, point.y)).collect();
                draw_line(chart, path, shape, *line_style, None)?;
            }
            chart
                .draw_series(points.iter().filter_map(|point| {
                    point.y_err.filter(|err| err.is_finite()).map(|err| {
                        ErrorBar::new_vertical(
                            point.x,
                            point.y - err,
                            point.y,
                            point.y + err,
                            shape,
                            CAP_WIDTH,
                        )
                    })
                }))
                .map_err(render_error)?;
            chart
                .draw_series(points.iter().filter_map(|point| {
                    point.x_err.filter(|err| err.is_finite()).map(|err| {
                        ErrorBar::new_horizontal(
                            point.y,
                            point.x - err,
                            point.x,
                            point.x + err,
                            shape,
                            CAP_WIDTH,
                        )
                    })
                }))
                .map_err(render_error)?;
            let centres = points.iter().map(|point| (point.x, point.y)).collect();
            draw_markers(chart, centres, *marker, rgb(*colour), style.marker_size, label.as_deref())
        }
        Element::Line {
            points,
            colour,
            style: line_style,
            label,
        } => draw_line(
            chart,
            points.clone(),
            rgb(*colour).stroke_width(width),
            *line_style,
            label.as_deref(),
        ),
        Element::Band {
            x,
            lower,
            upper,
            colour,
            opacity,
        } => {
            let outline: Vec<(f64, f64)> = x
                .iter()
                .zip(upper)
                .map(|(x, y)| (*x, *y))
                .chain(x.iter().zip(lower).rev().map(|(x, y)| (*x, *y)))
                .filter(finite)
                .collect();
            if outline.len() < 3 {
                return Ok(());
            }
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline,
                    rgb(*colour).mix(*opacity).filled(),
                )))
                .map_err(render_error)?;
            Ok(())
        }
        Element::HLine {
            y,
            colour,
            style: line_style,
        } => draw_line(
            chart,
            vec![(x0, *y), (x1, *y)],
            rgb(*colour).stroke_width(width),
            *line_style,
            None,
        ),
        Element::VLine { x, colour, opacity } => {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(*x, y0), (*x, y1)],
                    rgb(*colour).mix(*opacity).stroke_width(width),
                )))
                .map_err(render_error)?;
            Ok(())
        }
        Element::Scatter {
            points,
            colour,
            marker,
        } => draw_markers(chart, points.clone(), *marker, rgb(*colour), style.marker_size, None),
    }
}

fn draw_line<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    points: Vec<(f64, f64)>,
    shape: ShapeStyle,
    line_style: LineStyle,
    label: Option<&str>,
) -> Result<(), PvfError> {
    let points: Vec<(f64, f64)> = points.into_iter().filter(finite).collect();
    let annotation = match line_style {
        LineStyle::Solid => chart.draw_series(LineSeries::new(points, shape)),
        LineStyle::Dashed(dash, gap) => {
            chart.draw_series(DashedLineSeries::new(points, dash, gap, shape))
        }
    }
    .map_err(render_error)?;
    if let Some(label) = label {
        annotation
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], shape));
    }
    Ok(())
}

fn draw_markers<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    points: Vec<(f64, f64)>,
    marker: Marker,
    colour: RGBColor,
    size: u32,
    label: Option<&str>,
) -> Result<(), PvfError> {
    let s = size as i32;
    let fill = colour.filled();
    let stroke = colour.stroke_width(1);
    let centres = points.into_iter().filter(finite);
    let annotation = match marker {
        Marker::Circle => chart.draw_series(centres.map(|centre| Circle::new(centre, s, fill))),
        Marker::Square => chart.draw_series(centres.map(|centre| {
            EmptyElement::at(centre) + Rectangle::new([(-s, -s), (s, s)], fill)
        })),
        Marker::TriangleUp => {
            chart.draw_series(centres.map(|centre| TriangleMarker::new(centre, s, fill)))
        }
        Marker::TriangleDown => chart.draw_series(centres.map(|centre| {
            EmptyElement::at(centre) + Polygon::new(vec![(-s, -s), (s, -s), (0, s)], fill)
        })),
        Marker::Diamond => chart.draw_series(centres.map(|centre| {
            EmptyElement::at(centre) + Polygon::new(vec![(0, -s), (s, 0), (0, s), (-s, 0)], fill)
        })),
        Marker::Cross => chart.draw_series(centres.map(|centre| Cross::new(centre, s, stroke))),
        Marker::Plus => chart.draw_series(centres.map(|centre| {
            EmptyElement::at(centre)
                + PathElement::new(vec![(-s, 0), (s, 0), (0, 0), (0, -s), (0, s)], stroke)
        })),
    }
    .map_err(render_error)?;
    if let Some(label) = label {
        annotation
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x - s, y - s), (x + s, y + s)], fill));
    }
    Ok(())
}
