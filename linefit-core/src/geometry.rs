//! Detector geometry: sensor identifiers, module keys and positions.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a single sensor (PMT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SensorId(pub u32);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optical module address: detector line plus floor index along the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleKey {
    /// Detector line.
    pub line: u32,
    /// Module (floor) index along the line.
    pub module: u32,
}

impl ModuleKey {
    /// Creates a new module key.
    #[inline]
    #[must_use]
    pub fn new(line: u32, module: u32) -> Self {
        Self { line, module }
    }

    /// Module `delta` floors away on the same line, if it exists.
    #[inline]
    #[must_use]
    pub fn offset(&self, delta: i32) -> Option<Self> {
        self.module
            .checked_add_signed(delta)
            .map(|module| Self::new(self.line, module))
    }

    /// Number of floors between two modules, `None` on different lines.
    #[inline]
    #[must_use]
    pub fn floor_distance(&self, other: &Self) -> Option<u32> {
        (self.line == other.line).then(|| self.module.abs_diff(other.module))
    }
}

/// Cartesian position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Location of a sensor inside the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorLocation {
    /// Sensor this location belongs to.
    pub sensor_id: SensorId,
    /// Detector line.
    pub line_id: u32,
    /// Module (floor) index along the line.
    pub module_index: u32,
    /// Sensor index inside the module.
    pub sensor_index: u32,
    /// Sensor position.
    pub position: Position,
}

impl SensorLocation {
    /// Returns the module key of this sensor.
    #[inline]
    #[must_use]
    pub fn module_key(&self) -> ModuleKey {
        ModuleKey::new(self.line_id, self.module_index)
    }
}

/// Trait for geometry providers.
///
/// Translates sensor identifiers to positions and line/floor topology.
/// Implementations are read-only; nothing in linefit mutates geometry.
pub trait Geometry: Send + Sync {
    /// Looks up a sensor.
    fn locate(&self, sensor: SensorId) -> Option<SensorLocation>;

    /// Returns all line identifiers, ascending.
    fn lines(&self) -> Vec<u32>;

    /// Looks up a sensor, failing for unknown ids.
    fn resolve(&self, sensor: SensorId) -> Result<SensorLocation> {
        self.locate(sensor).ok_or(Error::UnknownSensor(sensor))
    }

    /// Module key of a sensor.
    fn module_of(&self, sensor: SensorId) -> Result<ModuleKey> {
        self.resolve(sensor).map(|location| location.module_key())
    }

    /// Height (z) of a sensor.
    fn height_of(&self, sensor: SensorId) -> Result<f64> {
        self.resolve(sensor).map(|location| location.position.z)
    }
}

/// In-memory geometry table.
#[derive(Debug, Clone, Default)]
pub struct DetectorGeometry {
    sensors: HashMap<SensorId, SensorLocation>,
}

impl DetectorGeometry {
    /// Creates an empty geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a sensor location.
    pub fn insert(&mut self, location: SensorLocation) {
        self.sensors.insert(location.sensor_id, location);
    }

    /// Number of known sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Returns true if no sensors are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Iterates over all sensor locations (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &SensorLocation> {
        self.sensors.values()
    }

    /// Builds a single vertical line at `(x, y)`.
    ///
    /// Modules are numbered from 1 upwards, module `m` sits at
    /// `z = first_height + (m - 1) * spacing`, and sensor ids are assigned
    /// consecutively starting at `line * 10_000`.
    #[must_use]
    pub fn vertical_line(
        line: u32,
        (x, y): (f64, f64),
        modules: u32,
        sensors_per_module: u32,
        first_height: f64,
        spacing: f64,
    ) -> Self {
        let mut geometry = Self::new();
        let mut next_id = line * 10_000;
        for module in 1..=modules {
            let z = first_height + f64::from(module - 1) * spacing;
            for sensor_index in 0..sensors_per_module {
                geometry.insert(SensorLocation {
                    sensor_id: SensorId(next_id),
                    line_id: line,
                    module_index: module,
                    sensor_index,
                    position: Position::new(x, y, z),
                });
                next_id += 1;
            }
        }
        geometry
    }

    /// Sensor id of `sensor_index` on `module`, if present.
    #[must_use]
    pub fn sensor_at(&self, module: ModuleKey, sensor_index: u32) -> Option<SensorId> {
        self.sensors
            .values()
            .find(|l| l.module_key() == module && l.sensor_index == sensor_index)
            .map(|l| l.sensor_id)
    }
}

impl FromIterator<SensorLocation> for DetectorGeometry {
    fn from_iter<I: IntoIterator<Item = SensorLocation>>(iter: I) -> Self {
        let mut geometry = Self::new();
        for location in iter {
            geometry.insert(location);
        }
        geometry
    }
}

impl Geometry for DetectorGeometry {
    fn locate(&self, sensor: SensorId) -> Option<SensorLocation> {
        self.sensors.get(&sensor).copied()
    }

    fn lines(&self) -> Vec<u32> {
        self.sensors
            .values()
            .map(|l| l.line_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_key_offset() {
        let key = ModuleKey::new(1, 2);
        assert_eq!(key.offset(1), Some(ModuleKey::new(1, 3)));
        assert_eq!(key.offset(-2), Some(ModuleKey::new(1, 0)));
        assert_eq!(key.offset(-3), None);
    }

    #[test]
    fn test_floor_distance() {
        let a = ModuleKey::new(1, 5);
        assert_eq!(a.floor_distance(&ModuleKey::new(1, 3)), Some(2));
        assert_eq!(a.floor_distance(&ModuleKey::new(2, 5)), None);
    }

    #[test]
    fn test_vertical_line() {
        let geometry = DetectorGeometry::vertical_line(3, (10.0, -5.0), 4, 2, 100.0, 15.0);
        assert_eq!(geometry.len(), 8);
        assert_eq!(geometry.lines(), vec![3]);

        let sensor = geometry.sensor_at(ModuleKey::new(3, 4), 1).unwrap();
        assert_eq!(sensor, SensorId(30_007));
        let location = geometry.resolve(sensor).unwrap();
        assert_eq!(location.module_key(), ModuleKey::new(3, 4));
        assert!((location.position.z - 145.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_sensor() {
        let geometry = DetectorGeometry::new();
        assert_eq!(
            geometry.module_of(SensorId(42)),
            Err(Error::UnknownSensor(SensorId(42)))
        );
    }
}
