use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_plot::{
    beta_curves, beta_figure, coupling_series, fixed_point_figure, g2_beta0_figure,
    infinite_volume_figure, volume_fits,
};
use pvf_read::{read_all_fit_results, FlowCache, DEFAULT_CACHE_DIR};

use super::PlotArgs;

#[derive(Args, Debug)]
pub struct FitPlotArgs {
    /// Result files to plot.
    #[arg(value_name = "FIT_FILENAME", required = true)]
    pub fit_filenames: Vec<PathBuf>,
    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Args, Debug)]
pub struct VolumePlotArgs {
    #[command(flatten)]
    pub fits: FitPlotArgs,
    /// Directory memoising parsed flow logs.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,
}

pub fn run_beta(args: &FitPlotArgs) -> Result<(), Box<dyn Error>> {
    let fits = read_all_fit_results(&args.fit_filenames, true)?;
    args.plot.save("beta function", |style| beta_figure(&beta_curves(&fits)?, style))
}

pub fn run_fixed_point(args: &FitPlotArgs) -> Result<(), Box<dyn Error>> {
    let fits = read_all_fit_results(&args.fit_filenames, false)?;
    args.plot.save("fixed point scan", |style| fixed_point_figure(&fits, style))
}

pub fn run_g2_beta0(args: &FitPlotArgs) -> Result<(), Box<dyn Error>> {
    let fits = read_all_fit_results(&args.fit_filenames, true)?;
    args.plot.save("coupling against bare coupling", |style| {
        g2_beta0_figure(&coupling_series(&fits)?, style)
    })
}

pub fn run_infinite_volume(args: &VolumePlotArgs) -> Result<(), Box<dyn Error>> {
    let fits = read_all_fit_results(&args.fits.fit_filenames, true)?;
    let cache = FlowCache::new(args.cache_dir.clone());
    args.fits.plot.save("infinite volume extrapolation", |style| {
        infinite_volume_figure(&volume_fits(&fits, &cache)?, style)
    })
}
