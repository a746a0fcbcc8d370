//! linefit-fit: Track fitting for single-line reconstruction.
//!
//! This crate provides:
//! - [`QualityModel`] - the Cherenkov arrival-time score of a track hypothesis
//! - [`VariableMetric`] - a bounded quasi-Newton minimizer behind [`Minimizer`]
//! - [`TrackFitter`] - initial guess, bounds and failure handling for one event
//! - [`Reconstructor`] - reduction, weighting and fit of whole events
//!
#![warn(missing_docs)]

pub mod error;
mod fitter;
pub mod minimizer;
mod quality;
mod reconstruction;

pub use error::{FitError, Result};
pub use fitter::{FitHit, TrackFitter};
pub use minimizer::{Minimizer, Minimum, ParameterSpec, VariableMetric};
pub use quality::QualityModel;
pub use reconstruction::{EventReport, Reconstructor};
