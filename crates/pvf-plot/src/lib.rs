//! Figures for the pvflow analyses.
//!
//! Each analysis builds a [`Figure`] from its results; [`save_figure`]
//! renders it to SVG with plotters.

pub mod beta;
pub mod critical;
pub mod figure;
pub mod fixed_point;
pub mod g2_beta0;
pub mod infinite_volume;
pub mod pcac;
pub mod phase;
pub mod registry;
pub mod render;
mod sources;
pub mod style;

pub use beta::{beta_curves, beta_figure, BetaCurve};
pub use critical::critical_mass_figure;
pub use figure::{
    error_points, linspace, obs_error_points, Anchor, Annotation, Cell, Element, ErrorPoint, Figure,
    LineStyle, Marker, Panel,
};
pub use fixed_point::fixed_point_figure;
pub use g2_beta0::{coupling_series, g2_beta0_figure, CouplingSeries};
pub use infinite_volume::{infinite_volume_figure, volume_fits, ScaleFit, VolumeFit};
pub use pcac::pcac_figure;
pub use phase::{phase_overlaid_figure, phase_panels_figure};
pub use registry::PropRegistry;
pub use render::{render_svg, save_figure, DISCARD};
pub use sources::{data_source_filenames, data_sources};
pub use style::{Colour, PlotStyle};
