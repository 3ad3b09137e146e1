use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_obs::dump_dict;
use pvf_phys::{fit_beta_function, BETA_INTERPOLATION_KEY};
use pvf_read::read_all_fit_results;

use super::format_list;

#[derive(Args, Debug)]
pub struct FitBetaArgs {
    /// Infinite-volume extrapolations, one per bare coupling.
    #[arg(value_name = "INPUT_FILENAME", required = true)]
    pub input_filenames: Vec<PathBuf>,
    /// Number of interpolation coefficients.
    #[arg(long, default_value_t = 4)]
    pub order: usize,
    /// Observable dictionary to write; the coefficients are printed when absent.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
}

pub fn run(args: &FitBetaArgs) -> Result<(), Box<dyn Error>> {
    let records = read_all_fit_results(&args.input_filenames, true)?;
    let result = fit_beta_function(&records, args.order)?;
    tracing::info!(
        chisquare_by_dof = result.fit.chisquare_by_dof,
        iterations = result.fit.iterations,
        "beta function interpolated"
    );
    match &args.output_filename {
        Some(path) => {
            let entries = BTreeMap::from([(BETA_INTERPOLATION_KEY.to_string(), result.fit.params)]);
            dump_dict(path, &entries, result.description.into())?;
        }
        None => println!("beta(g^2) interpolation: {}", format_list(&result.fit.params)),
    }
    Ok(())
}
