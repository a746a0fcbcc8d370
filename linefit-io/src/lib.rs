//! linefit-io: File formats for linefit.
//!
//! This crate reads events (JSON Lines), detector geometry and run
//! configuration (JSON), and writes run statistics as JSON or CSV.
//!

mod config;
mod error;
mod geometry;
mod reader;
mod writer;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use geometry::{read_geometry, write_geometry, GeometryFile};
pub use reader::{EventReader, EventWriter};
pub use writer::{read_statistics, StatisticsFormat, StatisticsWriter};
