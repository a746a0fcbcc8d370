//! linefit-algorithms: Hit-reduction stages for single-line reconstruction.
//!
//! This crate provides the noise-suppression cascade:
//! - **Merge** - combine pulses on one module within a time window
//! - **Amplitude** - time-over-threshold cut
//! - **First hit** - earliest hit per optical module
//! - **Coincidence** - local coincidences on neighbouring floors
//!
#![warn(missing_docs)]

mod amplitude;
mod coincidence;
mod first_hit;
mod merge;
pub mod module_index;
mod processing;
mod weights;

pub use amplitude::AmplitudeFilter;
pub use coincidence::CoincidenceSelector;
pub use first_hit::FirstHitReducer;
pub use merge::HitMerger;
pub use module_index::ModuleIndex;
pub use processing::{reduce_hits, ReducedHits};
pub use weights::hit_weights;

// Re-export core configuration
pub use linefit_core::config::{HitWeighting, ReductionConfig};
