//! Physics analyses built on flow, meson and HMC measurements.

pub mod beta_fit;
pub mod coupling;
pub mod critical;
pub mod extrapolate;
pub mod flow_obs;
pub mod pcac;
pub mod perturbative;
pub mod phase;

pub use beta_fit::{extrapolated_points, fit_beta_function, BetaFit, BETA_INTERPOLATION_KEY};
pub use coupling::{jacobi_theta3, normalize_coupling, t_d_dt};
pub use critical::{
    collate_critical_masses, consistent_ensemble_metadata, critical_mass_description,
    fit_critical_mass, write_collated_csv, CollatedRow, CriticalMassFit,
};
pub use extrapolate::{extrapolate_infinite_volume, finite_volume_points, InfiniteVolume};
pub use flow_obs::{read_all_flow_observables, FlowObservables, Scale};
pub use pcac::{mpcac, pcac_eff_mass, pcac_windows, PcacMass, PcacWindow};
pub use perturbative::{perturbative_beta, Representation};
pub use phase::{scan_phase_diagram, write_phase_table, PhasePoint, PhaseScan, PvSpec};
