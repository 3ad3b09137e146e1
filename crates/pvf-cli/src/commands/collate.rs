use std::error::Error;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Args;
use pvf_core::PvfError;
use pvf_phys::{collate_critical_masses, write_collated_csv};
use pvf_read::read_all_obs_results;

#[derive(Args, Debug)]
pub struct CollateArgs {
    /// Critical mass files written by `pvf critical-mf`.
    #[arg(value_name = "CRITICAL_MF_FILENAME", required = true)]
    pub critical_mf_filenames: Vec<PathBuf>,
    /// CSV file to write; standard output when absent.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
}

pub fn run(args: &CollateArgs) -> Result<(), Box<dyn Error>> {
    let records = read_all_obs_results(&args.critical_mf_filenames)?;
    let rows = collate_critical_masses(&records)?;
    match &args.output_filename {
        Some(path) => {
            let file = File::create(path).map_err(|err| PvfError::io("write-failed", path, err))?;
            write_collated_csv(&rows, file)?;
            tracing::info!(rows = rows.len(), path = %path.display(), "critical masses collated");
        }
        None => write_collated_csv(&rows, io::stdout().lock())?,
    }
    Ok(())
}
