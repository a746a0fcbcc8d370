//! linefit-core: Core traits and types for single-line track reconstruction.
//!
//! This crate provides the foundational abstractions shared by the hit
//! reduction cascade and the track fitter: hits, pulse clusters, detector
//! geometry, configuration, fit results and run statistics.

#![warn(missing_docs)]

pub mod cluster;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod statistics;
pub mod track;

pub use cluster::Cluster;
pub use config::{FitConfig, HitWeighting, MediumConstants, ReductionConfig, ZenithConvention};
pub use error::{Error, Result};
pub use event::{Event, TruthTrack};
pub use geometry::{DetectorGeometry, Geometry, ModuleKey, Position, SensorId, SensorLocation};
pub use hit::{Hit, HitData};
pub use statistics::{FitConstants, FitStatistics};
pub use track::{FitOutcome, FitResult, TrackParameters, TRACK_PARAMETER_COUNT};
