pub mod collate;
pub mod critical_mf;
pub mod extrapolate;
pub mod fit_beta;
pub mod mpcac;
pub mod phasediagram;
pub mod plots;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_core::PvfError;
use pvf_obs::Obs;
use pvf_plot::{save_figure, Figure, PlotStyle};

/// Figure destination shared by every command that draws.
#[derive(Args, Debug, Clone, Default)]
pub struct PlotArgs {
    /// SVG file to write; `/dev/null` discards the figure.
    #[arg(long)]
    pub plot_filename: Option<PathBuf>,
    /// YAML plot style; built-in defaults when absent.
    #[arg(long)]
    pub plot_styles: Option<PathBuf>,
}

impl PlotArgs {
    /// Builds and writes a figure, or logs that it was skipped.
    pub fn save(
        &self,
        what: &str,
        build: impl FnOnce(&PlotStyle) -> Result<Figure, PvfError>,
    ) -> Result<(), Box<dyn Error>> {
        let Some(path) = &self.plot_filename else {
            tracing::info!(figure = what, "no plot filename given; skipping figure");
            return Ok(());
        };
        let style = PlotStyle::load(self.plot_styles.as_deref())?;
        let figure = build(&style)?;
        save_figure(&figure, Some(path), &style)?;
        tracing::info!(figure = what, path = %path.display(), "figure written");
        Ok(())
    }
}

/// Every file name as a string, in argument order.
pub fn display_names(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|path| path.display().to_string()).collect()
}

/// `[a, b, ...]` with each observable as `value(error)`.
pub fn format_list(list: &[Obs]) -> String {
    let items: Vec<String> = list.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}
