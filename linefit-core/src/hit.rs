//! Hit traits and types for optical module data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::SensorId;

/// Core data structure for a single sensor pulse.
///
/// Raw pulses, merged pulses and every selected subset share this layout;
/// whether a hit is "selected" only depends on which stage output holds it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitData {
    /// Sensor (PMT) that recorded the pulse.
    pub sensor_id: SensorId,
    /// Leading-edge time in nanoseconds.
    pub time: f64,
    /// Time over threshold in nanoseconds (amplitude proxy).
    pub tot: f64,
}

impl HitData {
    /// Creates a new hit.
    #[inline]
    #[must_use]
    pub fn new(sensor_id: u32, time: f64, tot: f64) -> Self {
        Self {
            sensor_id: SensorId(sensor_id),
            time,
            tot,
        }
    }
}

/// Trait for timed sensor hits.
///
/// The reduction stages are generic over this trait so that callers can
/// feed their own hit representation without copying into [`HitData`].
pub trait Hit: Send + Sync {
    /// Returns the sensor that recorded the hit.
    fn sensor_id(&self) -> SensorId;

    /// Returns the hit time (ns).
    fn time(&self) -> f64;

    /// Returns the time over threshold (ns).
    fn tot(&self) -> f64;

    /// Time difference `other - self` in nanoseconds.
    #[inline]
    fn delay_to<H: Hit + ?Sized>(&self, other: &H) -> f64 {
        other.time() - self.time()
    }
}

impl Hit for HitData {
    #[inline]
    fn sensor_id(&self) -> SensorId {
        self.sensor_id
    }

    #[inline]
    fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    fn tot(&self) -> f64 {
        self.tot
    }
}

/// Sorts hits in place by ascending time, keeping input order for ties.
pub fn sort_by_time<H: Hit>(hits: &mut [H]) {
    hits.sort_by(|a, b| a.time().total_cmp(&b.time()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_data() {
        let hit = HitData::new(7, 1000.5, 24.0);
        assert_eq!(hit.sensor_id(), SensorId(7));
        assert!((hit.time() - 1000.5).abs() < f64::EPSILON);
        assert!((hit.tot() - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delay_to() {
        let a = HitData::new(1, 100.0, 10.0);
        let b = HitData::new(2, 150.0, 10.0);
        assert!((a.delay_to(&b) - 50.0).abs() < f64::EPSILON);
        assert!((b.delay_to(&a) + 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sort_by_time_is_stable() {
        let mut hits = vec![
            HitData::new(3, 20.0, 1.0),
            HitData::new(1, 10.0, 1.0),
            HitData::new(2, 10.0, 1.0),
        ];
        sort_by_time(&mut hits);
        let ids: Vec<u32> = hits.iter().map(|h| h.sensor_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
