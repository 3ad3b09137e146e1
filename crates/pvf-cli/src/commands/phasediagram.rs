use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Args;
use pvf_core::PvfError;
use pvf_phys::{scan_phase_diagram, write_phase_table, PhaseScan};
use pvf_plot::{phase_overlaid_figure, phase_panels_figure, save_figure, PlotStyle};

#[derive(Args, Debug)]
pub struct PhaseDiagramArgs {
    /// YAML scan definition; the standard scan when absent.
    #[arg(long)]
    pub scan: Option<PathBuf>,
    /// CSV table of the scanned plaquettes.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
    /// Directory receiving `phasediagram*.svg`; no figures when absent.
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,
    /// Appended to the figure names as `_<suffix>`.
    #[arg(long, default_value = "")]
    pub file_suffix: String,
    /// YAML plot style; built-in defaults when absent.
    #[arg(long)]
    pub plot_styles: Option<PathBuf>,
}

fn figure_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        dir.join(format!("{stem}.svg"))
    } else {
        dir.join(format!("{stem}_{suffix}.svg"))
    }
}

pub fn run(args: &PhaseDiagramArgs) -> Result<(), Box<dyn Error>> {
    let scan = match &args.scan {
        Some(path) => PhaseScan::from_yaml_file(path)?,
        None => PhaseScan::default(),
    };
    let points = scan_phase_diagram(&scan)?;

    match &args.output_filename {
        Some(path) => {
            let file = File::create(path).map_err(|err| PvfError::io("write-failed", path, err))?;
            write_phase_table(&points, file)?;
        }
        None => println!("{} phase diagram points found", points.len()),
    }

    let Some(dir) = &args.plot_dir else {
        tracing::info!("no plot directory given; skipping phase diagram figures");
        return Ok(());
    };
    if points.is_empty() {
        tracing::warn!(
            pattern = %scan.raw_data.join(&scan.subdir).display(),
            "no usable HMC logs; no figures drawn"
        );
        return Ok(());
    }
    let style = PlotStyle::load(args.plot_styles.as_deref())?;
    let panels = phase_panels_figure(&points, &scan, &style)?;
    save_figure(&panels, Some(&figure_path(dir, "phasediagram", &args.file_suffix)), &style)?;
    let overlaid = phase_overlaid_figure(&points, &scan, &style)?;
    save_figure(
        &overlaid,
        Some(&figure_path(dir, "phasediagram_overlaid", &args.file_suffix)),
        &style,
    )?;
    Ok(())
}
