//! Least-squares fits whose parameters carry the fluctuations of the data.

mod band;
mod combinations;
mod fit;
mod lm;
pub mod model;
mod propagate;

use pvf_core::{ErrorInfo, PvfError};

pub use band::error_band;
pub use combinations::{aic, zip_combinations};
pub use fit::{least_squares, total_least_squares, FitMethod, FitOpts, FitResult};
pub use model::{BetaInterpolation, Constant, FnModel, Linear, Model, PowerLaw};

pub(crate) fn fit_error(code: &str, message: impl Into<String>) -> PvfError {
    PvfError::Fit(ErrorInfo::new(code, message.into()))
}
