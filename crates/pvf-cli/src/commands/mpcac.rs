use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_core::{MetaValue, Metadata};
use pvf_obs::dump_obs;
use pvf_phys::mpcac;
use pvf_plot::pcac_figure;
use pvf_read::read_correlators_hirep;

use super::PlotArgs;

#[derive(Args, Debug)]
pub struct MpcacArgs {
    /// HiRep meson correlator log.
    pub correlator_filename: PathBuf,
    /// Observable file to write; the result is printed when absent.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
    #[command(flatten)]
    pub plot: PlotArgs,
    /// Number of Pauli-Villars fields, stored with the result.
    #[arg(long = "Npv")]
    pub npv: Option<i64>,
    /// Pauli-Villars mass, stored with the result.
    #[arg(long)]
    pub mpv: Option<f64>,
}

pub fn run(args: &MpcacArgs) -> Result<(), Box<dyn Error>> {
    let correlators = read_correlators_hirep(&args.correlator_filename)?;
    let mut extra = Metadata::new();
    extra.insert("Npv".to_string(), MetaValue::from(args.npv));
    extra.insert("mpv".to_string(), MetaValue::from(args.mpv));
    let result = mpcac(&correlators, extra)?;

    match &args.output_filename {
        Some(path) => {
            dump_obs(path, &[vec![result.mass.clone()]], result.description.clone().into())?;
            tracing::info!(path = %path.display(), mass = %result.mass, "PCAC mass written");
        }
        None => println!("mPCAC = {}", result.mass),
    }
    args.plot.save("pcac", |style| pcac_figure(&result, style))
}
