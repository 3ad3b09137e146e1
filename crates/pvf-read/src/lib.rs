//! Readers for simulation logs and stored analysis results.

pub mod cache;
pub mod filename;
pub mod fit_results;
pub mod flows;
pub mod hirep;
pub mod hmc;
pub mod mesons;
mod plaquette;

pub use cache::{stable_hash_string, FlowCache, DEFAULT_CACHE_DIR};
pub use filename::metadata_from_filename;
pub use fit_results::{
    read_all_fit_results, read_all_obs_results, read_fit_result, read_obs_result, FitRecord,
    ObsRecord,
};
pub use flows::{read_flows, read_flows_hirep, FlowConfiguration, Flows, Operator, ReaderKind};
pub use hmc::{read_hmc_log, HmcOpts, HmcStream};
pub use mesons::{read_correlators_hirep, MesonCorrelators, MesonKey};
pub use plaquette::read_plaquette_from_flows;
