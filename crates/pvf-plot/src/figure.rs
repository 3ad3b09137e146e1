//! Backend-independent description of a figure.
//!
//! A [`Figure`] is a grid of [`Panel`]s, each holding drawable [`Element`]s in
//! data coordinates. Rendering lives in [`crate::render`].

use pvf_core::{ErrorInfo, PvfError};
use pvf_obs::Obs;

use crate::style::Colour;

/// Point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Circle,
    Square,
    TriangleUp,
    TriangleDown,
    Diamond,
    Cross,
    Plus,
}

impl Marker {
    /// Markers in the order scans cycle through them.
    pub const CYCLE: [Marker; 7] = [
        Marker::Circle,
        Marker::Square,
        Marker::TriangleUp,
        Marker::TriangleDown,
        Marker::Diamond,
        Marker::Cross,
        Marker::Plus,
    ];

    /// Marker for a single-character code (`o s ^ v D x +`).
    pub fn from_code(code: char) -> Result<Self, PvfError> {
        match code {
            'o' => Ok(Marker::Circle),
            's' => Ok(Marker::Square),
            '^' => Ok(Marker::TriangleUp),
            'v' => Ok(Marker::TriangleDown),
            'D' => Ok(Marker::Diamond),
            'x' => Ok(Marker::Cross),
            '+' => Ok(Marker::Plus),
            other => Err(PvfError::Plot(
                ErrorInfo::new("unknown-marker", format!("no marker with code {other}"))
                    .with_hint("available codes: o s ^ v D x +"),
            )),
        }
    }
}

/// Stroke pattern of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    /// Dash and gap lengths in pixels.
    Dashed(u32, u32),
}

impl LineStyle {
    pub const DASHED: LineStyle = LineStyle::Dashed(6, 4);
    pub const DOTTED: LineStyle = LineStyle::Dashed(2, 3);
}

/// Value with optional symmetric errors in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPoint {
    pub x: f64,
    pub y: f64,
    pub x_err: Option<f64>,
    pub y_err: Option<f64>,
}

impl ErrorPoint {
    /// Exact `x` against an observable.
    pub fn at(x: f64, y: &Obs) -> Self {
        Self {
            x,
            y: y.value(),
            x_err: None,
            y_err: Some(y.dvalue()),
        }
    }

    /// Observables on both axes.
    pub fn from_obs(x: &Obs, y: &Obs) -> Self {
        Self {
            x: x.value(),
            y: y.value(),
            x_err: Some(x.dvalue()),
            y_err: Some(y.dvalue()),
        }
    }

    fn x_span(&self) -> (f64, f64) {
        let err = self.x_err.unwrap_or(0.0);
        (self.x - err, self.x + err)
    }

    fn y_span(&self) -> (f64, f64) {
        let err = self.y_err.unwrap_or(0.0);
        (self.y - err, self.y + err)
    }
}

/// Pairs exact abscissae with observables.
pub fn error_points(x: &[f64], y: &[Obs]) -> Vec<ErrorPoint> {
    x.iter().zip(y).map(|(x, y)| ErrorPoint::at(*x, y)).collect()
}

/// Pairs observables on both axes.
pub fn obs_error_points(x: &[Obs], y: &[Obs]) -> Vec<ErrorPoint> {
    x.iter().zip(y).map(|(x, y)| ErrorPoint::from_obs(x, y)).collect()
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Drawable item in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    ErrorBars {
        points: Vec<ErrorPoint>,
        colour: Colour,
        marker: Marker,
        label: Option<String>,
        /// Joins consecutive points when set.
        joined: Option<LineStyle>,
    },
    Line {
        points: Vec<(f64, f64)>,
        colour: Colour,
        style: LineStyle,
        label: Option<String>,
    },
    /// Filled region between `lower` and `upper`.
    Band {
        x: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        colour: Colour,
        opacity: f64,
    },
    HLine {
        y: f64,
        colour: Colour,
        style: LineStyle,
    },
    VLine {
        x: f64,
        colour: Colour,
        opacity: f64,
    },
    Scatter {
        points: Vec<(f64, f64)>,
        colour: Colour,
        marker: Marker,
    },
}

impl Element {
    fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::default();
        match self {
            Element::ErrorBars { points, .. } => {
                for point in points {
                    bounds.include_x(point.x_span());
                    bounds.include_y(point.y_span());
                }
            }
            Element::Line { points, .. } | Element::Scatter { points, .. } => {
                for (x, y) in points {
                    bounds.include_x((*x, *x));
                    bounds.include_y((*y, *y));
                }
            }
            Element::Band { x, lower, upper, .. } => {
                for ((x, low), high) in x.iter().zip(lower).zip(upper) {
                    bounds.include_x((*x, *x));
                    bounds.include_y((*low, *high));
                }
            }
            Element::HLine { y, .. } => bounds.include_y((*y, *y)),
            Element::VLine { x, .. } => bounds.include_x((*x, *x)),
        }
        bounds
    }

    /// Legend label, if the element carries one.
    pub fn label(&self) -> Option<&str> {
        match self {
            Element::ErrorBars { label, .. } | Element::Line { label, .. } => label.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bounds {
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
}

fn widen(range: Option<(f64, f64)>, (low, high): (f64, f64)) -> Option<(f64, f64)> {
    if !(low.is_finite() && high.is_finite()) {
        return range;
    }
    Some(match range {
        Some((min, max)) => (min.min(low), max.max(high)),
        None => (low, high),
    })
}

impl Bounds {
    fn include_x(&mut self, span: (f64, f64)) {
        self.x = widen(self.x, span);
    }

    fn include_y(&mut self, span: (f64, f64)) {
        self.y = widen(self.y, span);
    }

    fn merge(self, other: Bounds) -> Bounds {
        Bounds {
            x: other.x.map_or(self.x, |span| widen(self.x, span)),
            y: other.y.map_or(self.y, |span| widen(self.y, span)),
        }
    }
}

fn padded(range: Option<(f64, f64)>) -> (f64, f64) {
    match range {
        None => (0.0, 1.0),
        Some((low, high)) if high - low <= f64::EPSILON * high.abs().max(1.0) => {
            let pad = 0.05 * low.abs().max(1.0);
            (low - pad, high + pad)
        }
        Some((low, high)) => {
            let pad = 0.05 * (high - low);
            (low - pad, high + pad)
        }
    }
}

/// Text placed at a fraction of the panel's axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub anchor: Anchor,
}

/// Corner of the text box placed at the annotation position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// One set of axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    /// Fixed x limits; taken from the data when unset.
    pub x_range: Option<(f64, f64)>,
    /// Fixed y limits; taken from the data when unset.
    pub y_range: Option<(f64, f64)>,
    pub elements: Vec<Element>,
    pub annotations: Vec<Annotation>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&mut self, x: impl Into<String>, y: impl Into<String>) -> &mut Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn push(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Error bars without a joining line.
    pub fn errorbars(
        &mut self,
        points: Vec<ErrorPoint>,
        colour: Colour,
        marker: Marker,
        label: Option<String>,
    ) -> &mut Self {
        self.push(Element::ErrorBars {
            points,
            colour,
            marker,
            label,
            joined: None,
        })
    }

    pub fn line(&mut self, points: Vec<(f64, f64)>, colour: Colour, style: LineStyle) -> &mut Self {
        self.push(Element::Line {
            points,
            colour,
            style,
            label: None,
        })
    }

    /// Band of half-width `errors` around `centre`.
    pub fn band(
        &mut self,
        x: &[f64],
        centre: &[f64],
        errors: &[f64],
        colour: Colour,
        opacity: f64,
    ) -> &mut Self {
        let lower = centre.iter().zip(errors).map(|(c, e)| c - e).collect();
        let upper = centre.iter().zip(errors).map(|(c, e)| c + e).collect();
        self.push(Element::Band {
            x: x.to_vec(),
            lower,
            upper,
            colour,
            opacity,
        })
    }

    pub fn hline(&mut self, y: f64, colour: Colour, style: LineStyle) -> &mut Self {
        self.push(Element::HLine { y, colour, style })
    }

    pub fn vline(&mut self, x: f64, colour: Colour, opacity: f64) -> &mut Self {
        self.push(Element::VLine { x, colour, opacity })
    }

    pub fn text(&mut self, x: f64, y: f64, text: impl Into<String>, anchor: Anchor) -> &mut Self {
        self.annotations.push(Annotation {
            x,
            y,
            text: text.into(),
            anchor,
        });
        self
    }

    fn data_bounds(&self) -> Bounds {
        self.elements
            .iter()
            .map(Element::bounds)
            .fold(Bounds::default(), Bounds::merge)
    }

    /// Horizontal limits used when drawing.
    pub fn x_limits(&self) -> (f64, f64) {
        self.x_range.unwrap_or_else(|| padded(self.data_bounds().x))
    }

    /// Vertical limits used when drawing.
    pub fn y_limits(&self) -> (f64, f64) {
        self.y_range.unwrap_or_else(|| padded(self.data_bounds().y))
    }

    /// Drops every legend label.
    pub fn clear_labels(&mut self) {
        for element in &mut self.elements {
            if let Element::ErrorBars { label, .. } | Element::Line { label, .. } = element {
                *label = None;
            }
        }
    }

    /// Whether any element carries a legend label.
    pub fn has_legend(&self) -> bool {
        self.elements.iter().any(|element| element.label().is_some())
    }
}

/// Grid cell occupied by a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl Cell {
    pub fn at(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            row_span: 1,
            col_span: 1,
        }
    }

    pub fn spanning(mut self, rows: usize, cols: usize) -> Self {
        self.row_span = rows.max(1);
        self.col_span = cols.max(1);
        self
    }
}

/// Panels laid out on a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: Option<String>,
    pub rows: usize,
    pub cols: usize,
    /// Width and height in inches.
    pub size: (f64, f64),
    panels: Vec<(Cell, Panel)>,
}

fn plot_error(code: &str, message: String) -> PvfError {
    PvfError::Plot(ErrorInfo::new(code, message))
}

impl Figure {
    /// Figure with one empty panel per grid cell.
    pub fn grid(rows: usize, cols: usize, size: (f64, f64)) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let panels = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (Cell::at(row, col), Panel::new())))
            .collect();
        Self {
            title: None,
            rows,
            cols,
            size,
            panels,
        }
    }

    /// Figure with explicitly placed panels.
    pub fn with_layout(
        rows: usize,
        cols: usize,
        size: (f64, f64),
        panels: Vec<(Cell, Panel)>,
    ) -> Result<Self, PvfError> {
        for (cell, _) in &panels {
            if cell.row + cell.row_span > rows || cell.col + cell.col_span > cols {
                return Err(plot_error(
                    "panel-outside-grid",
                    format!("panel at {cell:?} does not fit a {rows}x{cols} grid"),
                ));
            }
        }
        Ok(Self {
            title: None,
            rows,
            cols,
            size,
            panels,
        })
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn panels(&self) -> impl Iterator<Item = &(Cell, Panel)> {
        self.panels.iter()
    }

    pub fn panels_mut(&mut self) -> impl Iterator<Item = &mut (Cell, Panel)> {
        self.panels.iter_mut()
    }

    /// Panel whose cell starts at `row`, `col`.
    pub fn panel(&self, row: usize, col: usize) -> Option<&Panel> {
        self.panels
            .iter()
            .find(|(cell, _)| cell.row == row && cell.col == col)
            .map(|(_, panel)| panel)
    }

    pub fn panel_mut(&mut self, row: usize, col: usize) -> Result<&mut Panel, PvfError> {
        let (rows, cols) = (self.rows, self.cols);
        self.panels
            .iter_mut()
            .find(|(cell, _)| cell.row == row && cell.col == col)
            .map(|(_, panel)| panel)
            .ok_or_else(|| {
                plot_error(
                    "missing-panel",
                    format!("no panel at row {row}, column {col} of a {rows}x{cols} grid"),
                )
            })
    }

    /// Gives every panel the union of their horizontal limits.
    pub fn share_x(&mut self) {
        let union = self
            .panels
            .iter()
            .map(|(_, panel)| panel.x_limits())
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));
        if let Some(range) = union {
            for (_, panel) in &mut self.panels {
                panel.x_range = Some(range);
            }
        }
    }

    /// Gives the panels of each row the union of their vertical limits.
    pub fn share_y_by_row(&mut self) {
        for row in 0..self.rows {
            let union = self
                .panels
                .iter()
                .filter(|(cell, _)| cell.row == row)
                .map(|(_, panel)| panel.y_limits())
                .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));
            if let Some(range) = union {
                for (cell, panel) in &mut self.panels {
                    if cell.row == row {
                        panel.y_range = Some(range);
                    }
                }
            }
        }
    }

    /// Gives every panel the union of their vertical limits.
    pub fn share_y(&mut self) {
        let union = self
            .panels
            .iter()
            .map(|(_, panel)| panel.y_limits())
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));
        if let Some(range) = union {
            for (_, panel) in &mut self.panels {
                panel.y_range = Some(range);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_the_data_with_padding() {
        let mut panel = Panel::new();
        panel.push(Element::ErrorBars {
            points: vec![
                ErrorPoint {
                    x: 0.0,
                    y: 1.0,
                    x_err: None,
                    y_err: Some(0.5),
                },
                ErrorPoint {
                    x: 10.0,
                    y: 2.0,
                    x_err: Some(1.0),
                    y_err: None,
                },
            ],
            colour: Colour::BLACK,
            marker: Marker::Circle,
            label: None,
            joined: None,
        });
        let (x0, x1) = panel.x_limits();
        assert!((x0 + 0.55).abs() < 1e-12);
        assert!((x1 - 11.55).abs() < 1e-12);
        let (y0, y1) = panel.y_limits();
        assert!((y0 - 0.425).abs() < 1e-12);
        assert!((y1 - 2.075).abs() < 1e-12);
    }

    #[test]
    fn non_finite_values_are_ignored_and_empty_panels_get_unit_limits() {
        let mut panel = Panel::new();
        assert_eq!(panel.x_limits(), (0.0, 1.0));
        panel.line(vec![(1.0, f64::NAN), (2.0, 3.0)], Colour::BLACK, LineStyle::Solid);
        let (y0, y1) = panel.y_limits();
        assert!(y0 < 3.0 && y1 > 3.0);
    }

    #[test]
    fn shared_axes_take_the_union() {
        let mut figure = Figure::grid(1, 2, (4.0, 3.0));
        figure
            .panel_mut(0, 0)
            .expect("left")
            .line(vec![(0.0, 0.0), (1.0, 1.0)], Colour::BLACK, LineStyle::Solid);
        figure
            .panel_mut(0, 1)
            .expect("right")
            .line(vec![(2.0, -1.0), (3.0, 0.0)], Colour::BLACK, LineStyle::Solid);
        figure.share_x();
        figure.share_y_by_row();
        let left = figure.panel(0, 0).expect("left");
        let right = figure.panel(0, 1).expect("right");
        assert_eq!(left.x_limits(), right.x_limits());
        assert_eq!(left.y_limits(), right.y_limits());
        assert!(figure.panel_mut(1, 0).is_err());
    }

    #[test]
    fn layouts_must_fit_the_grid() {
        let panels = vec![(Cell::at(0, 0).spanning(3, 1), Panel::new())];
        assert!(Figure::with_layout(2, 1, (3.0, 3.0), panels).is_err());
    }

    #[test]
    fn linspace_includes_both_ends() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
    }
}
