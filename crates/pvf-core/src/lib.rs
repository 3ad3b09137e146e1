#![deny(missing_docs)]
#![doc = "Core error, metadata and provenance types shared by the pvflow analysis crates."]

pub mod errors;
mod meta;
pub mod provenance;
pub mod rng;

pub use errors::{ErrorInfo, PvfError};
pub use meta::{Described, MetaValue, Metadata};
pub use provenance::{
    consistent_metadata, describe_inputs, group_by_keys, require_consistent, RunProvenance,
    SchemaVersion,
};
pub use rng::{derive_substream_seed, RngHandle};
