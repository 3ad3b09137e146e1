use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_obs::dump_obs;
use pvf_phys::{consistent_ensemble_metadata, critical_mass_description, fit_critical_mass};
use pvf_plot::critical_mass_figure;
use pvf_read::read_all_obs_results;

use super::{display_names, PlotArgs};

#[derive(Args, Debug)]
pub struct CriticalMfArgs {
    /// PCAC mass files written by `pvf mpcac`.
    #[arg(value_name = "PCAC_MASS_FILENAME", required = true)]
    pub pcac_mass_filenames: Vec<PathBuf>,
    /// Observable file to write; the critical mass is printed when absent.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
    #[command(flatten)]
    pub plot: PlotArgs,
}

pub fn run(args: &CriticalMfArgs) -> Result<(), Box<dyn Error>> {
    let records = read_all_obs_results(&args.pcac_mass_filenames)?;
    let metadata = consistent_ensemble_metadata(&records)?;
    let fit = fit_critical_mass(&records, 0)?;
    let critical = fit.critical_mass()?.clone();

    match &args.output_filename {
        Some(path) => {
            let filenames = display_names(&args.pcac_mass_filenames);
            let description = critical_mass_description(&fit.fit, &filenames, metadata);
            dump_obs(path, &[vec![critical.clone()]], description.into())?;
            tracing::info!(
                path = %path.display(),
                critical_mass = %critical,
                "critical mass written"
            );
        }
        None => println!("{critical}"),
    }

    args.plot.save("critical mass", |style| {
        let without_lightest = fit_critical_mass(&records, 1)?;
        critical_mass_figure(&[fit, without_lightest], style)
    })
}
