//! Observables with autocorrelation-aware statistical errors.
//!
//! An [`Obs`] keeps the per-configuration fluctuations of every replica it
//! was built from. Arithmetic propagates them linearly and the Gamma method
//! turns them into an error estimate when one is requested.

pub mod aggregate;
pub mod corr;
mod format;
pub mod gamma;
pub mod json;
mod obs;
mod ops;
pub mod synthetic;

pub use aggregate::{weighted_mean, weighted_mean_by_uncertainty};
pub use corr::{Corr, DerivVariant};
pub use format::format_with_error;
pub use gamma::{covariance, EnsembleAnalysis, GammaAnalysis, GammaOpts, DEFAULT_S};
pub use json::{dump_dict, dump_obs, load_dict, load_obs, read_bytes, ObsDict, ObsFile};
pub use obs::{ensemble_name, Obs, Series, MIN_SAMPLES, REPLICA_SEPARATOR};
pub use synthetic::Ar1;
