//! Detector geometry files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use linefit_core::geometry::{DetectorGeometry, SensorLocation};

use crate::{Error, Result};

/// On-disk layout of a geometry file: a flat list of sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryFile {
    /// All sensors of the detector.
    pub sensors: Vec<SensorLocation>,
}

impl GeometryFile {
    /// Builds the in-memory geometry, rejecting duplicate sensor ids.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] on a repeated sensor id.
    pub fn into_geometry(self) -> Result<DetectorGeometry> {
        let mut seen = HashSet::with_capacity(self.sensors.len());
        if let Some(duplicate) = self.sensors.iter().find(|s| !seen.insert(s.sensor_id)) {
            return Err(Error::InvalidFormat(format!(
                "sensor {} listed more than once",
                duplicate.sensor_id
            )));
        }
        Ok(self.sensors.into_iter().collect())
    }
}

impl From<&DetectorGeometry> for GeometryFile {
    fn from(geometry: &DetectorGeometry) -> Self {
        let mut sensors: Vec<SensorLocation> = geometry.iter().copied().collect();
        sensors.sort_by_key(|s| s.sensor_id);
        Self { sensors }
    }
}

/// Reads a JSON geometry file.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn read_geometry<P: AsRef<Path>>(path: P) -> Result<DetectorGeometry> {
    let file = File::open(path)?;
    let layout: GeometryFile = serde_json::from_reader(BufReader::new(file))?;
    let geometry = layout.into_geometry()?;
    log::debug!("loaded geometry with {} sensors", geometry.len());
    Ok(geometry)
}

/// Writes a geometry as JSON, sensors sorted by id.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_geometry<P: AsRef<Path>>(path: P, geometry: &DetectorGeometry) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &GeometryFile::from(geometry))?;
    writer.flush()?;
    Ok(())
}
