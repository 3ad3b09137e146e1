use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use pvf_core::{MetaValue, Metadata};
use pvf_obs::dump_dict;
use pvf_phys::{extrapolate_infinite_volume, read_all_flow_observables};
use pvf_read::{FlowCache, Operator, ReaderKind, DEFAULT_CACHE_DIR};

use super::format_list;

const NC: i64 = 2;

#[derive(Args, Debug)]
pub struct ExtrapolateArgs {
    /// Gradient flow logs, one per volume.
    #[arg(value_name = "FLOW_FILENAME", required = true)]
    pub flow_filenames: Vec<PathBuf>,
    /// Log format of the flow files.
    #[arg(long, default_value = "hirep")]
    pub reader: String,
    /// Energy density discretisation: `plaq` or `sym`.
    #[arg(long, default_value = "sym")]
    pub operator: String,
    /// Observable dictionary to write; the results are printed when absent.
    #[arg(long)]
    pub output_filename: Option<PathBuf>,
    /// Flow time `t/a²` at which to extrapolate.
    #[arg(long)]
    pub time: f64,
    #[arg(long = "Npv")]
    pub npv: Option<i64>,
    #[arg(long)]
    pub mpv: Option<f64>,
    #[arg(long)]
    pub beta: Option<f64>,
    /// Directory memoising parsed flow logs.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,
    /// Parse every flow log afresh.
    #[arg(long)]
    pub no_cache: bool,
}

pub fn run(args: &ExtrapolateArgs) -> Result<(), Box<dyn Error>> {
    let reader: ReaderKind = args.reader.parse()?;
    let operator: Operator = args.operator.parse()?;
    let cache = if args.no_cache {
        FlowCache::disabled()
    } else {
        FlowCache::new(args.cache_dir.clone())
    };
    let mut extra = Metadata::new();
    extra.insert("Nc".to_string(), NC.into());
    extra.insert("Npv".to_string(), MetaValue::from(args.npv));
    extra.insert("mpv".to_string(), MetaValue::from(args.mpv));
    extra.insert("beta".to_string(), MetaValue::from(args.beta));

    let data = read_all_flow_observables(&args.flow_filenames, reader, operator, &extra, &cache)?;
    let result = extrapolate_infinite_volume(&data, args.time, operator)?;
    match &args.output_filename {
        Some(path) => {
            dump_dict(path, &result.results, result.description.into())?;
            tracing::info!(path = %path.display(), volumes = data.len(), "extrapolation written");
        }
        None => {
            for (observable, value) in &result.results {
                println!("{observable}: {}", format_list(value));
            }
        }
    }
    Ok(())
}
