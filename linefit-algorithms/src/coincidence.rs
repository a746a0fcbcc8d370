//! Local coincidence selection along a line.
//!
//! A trigger hit on floor `m` is confirmed by candidate hits on floors
//! `m ± 1` that arrive within `adjacent_window` after it, or on floors
//! `m ± 2` within `next_adjacent_window`. Confirmed candidates and their
//! triggers form the output; uncorrelated noise rarely has such a partner.

use std::collections::HashSet;

use linefit_core::config::ReductionConfig;
use linefit_core::error::Result;
use linefit_core::geometry::{Geometry, SensorId};
use linefit_core::hit::Hit;

use crate::module_index::ModuleIndex;

/// Largest floor distance that can confirm a trigger.
const MAX_FLOOR_DISTANCE: i32 = 2;

/// Selects hits in local coincidence with a trigger hit.
#[derive(Clone, Debug)]
pub struct CoincidenceSelector {
    adjacent_window: f64,
    next_adjacent_window: f64,
}

impl Default for CoincidenceSelector {
    fn default() -> Self {
        Self::from_config(&ReductionConfig::default())
    }
}

impl CoincidenceSelector {
    /// Create a selector with explicit windows (ns).
    pub fn new(adjacent_window: f64, next_adjacent_window: f64) -> Self {
        Self {
            adjacent_window,
            next_adjacent_window,
        }
    }

    /// Create a selector from the reduction configuration.
    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(config.adjacent_window, config.next_adjacent_window)
    }

    /// Window (ns) for a candidate `floors` away from the trigger, in
    /// either direction.
    pub fn window_for(&self, floors: i32) -> Option<f64> {
        match floors.unsigned_abs() {
            1 => Some(self.adjacent_window),
            2 => Some(self.next_adjacent_window),
            _ => None,
        }
    }

    /// Select `triggers` and `candidates` that form coincidences.
    ///
    /// Each sensor appears at most once in the output, in the order it was
    /// first confirmed.
    pub fn select<T, C, G>(&self, triggers: &[T], candidates: &[C], geometry: &G) -> Result<Vec<C>>
    where
        T: Hit + Clone + Into<C>,
        C: Hit + Clone,
        G: Geometry + ?Sized,
    {
        let index = ModuleIndex::from_hits(candidates, geometry)?;
        let mut selected = Vec::new();
        let mut used: HashSet<SensorId> = HashSet::new();

        for trigger in triggers {
            let module = geometry.module_of(trigger.sensor_id())?;
            for delta in 1..=MAX_FLOOR_DISTANCE {
                let Some(window) = self.window_for(delta) else {
                    continue;
                };
                for candidate in index.query_floors(module, delta) {
                    let dt = trigger.delay_to(candidate);
                    if !(0.0..=window).contains(&dt) {
                        continue;
                    }
                    if used.insert(candidate.sensor_id()) {
                        selected.push(candidate.clone());
                    }
                    if used.insert(trigger.sensor_id()) {
                        selected.push(trigger.clone().into());
                    }
                }
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linefit_core::geometry::{DetectorGeometry, ModuleKey};
    use linefit_core::hit::HitData;

    fn geometry() -> DetectorGeometry {
        DetectorGeometry::vertical_line(1, (0.0, 0.0), 6, 2, 0.0, 10.0)
    }

    fn hit(geometry: &DetectorGeometry, module: u32, index: u32, time: f64) -> HitData {
        HitData {
            sensor_id: geometry.sensor_at(ModuleKey::new(1, module), index).unwrap(),
            time,
            tot: 30.0,
        }
    }

    #[test]
    fn test_adjacent_coincidence() {
        let geometry = geometry();
        let trigger = hit(&geometry, 3, 0, 100.0);
        let partner = hit(&geometry, 4, 1, 250.0);
        let noise = hit(&geometry, 6, 0, 110.0);

        let selector = CoincidenceSelector::new(200.0, 400.0);
        let selected = selector
            .select(&[trigger], &[partner, noise], &geometry)
            .unwrap();
        assert_eq!(selected, vec![partner, trigger]);
    }

    #[test]
    fn test_windows_by_floor_distance() {
        let geometry = geometry();
        let trigger = hit(&geometry, 3, 0, 0.0);
        let adjacent_late = hit(&geometry, 2, 0, 300.0);
        let next_in_time = hit(&geometry, 5, 0, 300.0);

        let selector = CoincidenceSelector::new(200.0, 400.0);
        let selected = selector
            .select(&[trigger], &[adjacent_late, next_in_time], &geometry)
            .unwrap();
        assert_eq!(selected, vec![next_in_time, trigger]);
    }

    #[test]
    fn test_earlier_candidates_rejected() {
        let geometry = geometry();
        let trigger = hit(&geometry, 3, 0, 100.0);
        let earlier = hit(&geometry, 4, 0, 99.0);
        let selected = CoincidenceSelector::default()
            .select(&[trigger], &[earlier], &geometry)
            .unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_same_module_is_not_a_coincidence() {
        let geometry = geometry();
        let trigger = hit(&geometry, 3, 0, 100.0);
        let same_module = hit(&geometry, 3, 1, 120.0);
        let selected = CoincidenceSelector::default()
            .select(&[trigger], &[same_module], &geometry)
            .unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_deduplicates_by_sensor() {
        let geometry = geometry();
        let low = hit(&geometry, 2, 0, 0.0);
        let high = hit(&geometry, 4, 0, 10.0);
        let middle = hit(&geometry, 3, 0, 50.0);

        // Both triggers confirm `middle`; `middle` is also a trigger itself.
        let selected = CoincidenceSelector::default()
            .select(&[low, high, middle], &[middle, high], &geometry)
            .unwrap();
        assert_eq!(selected, vec![middle, low, high]);
    }

    #[test]
    fn test_window_for() {
        let selector = CoincidenceSelector::new(200.0, 400.0);
        assert_eq!(selector.window_for(1), Some(200.0));
        assert_eq!(selector.window_for(2), Some(400.0));
        assert_eq!(selector.window_for(-2), Some(400.0));
        assert_eq!(selector.window_for(0), None);
        assert_eq!(selector.window_for(3), None);
    }

    #[test]
    fn test_three_floors_apart_never_coincide() {
        let geometry = geometry();
        let trigger = hit(&geometry, 1, 0, 0.0);
        let far = hit(&geometry, 4, 0, 5.0);
        let selector = CoincidenceSelector::new(1000.0, 1000.0);
        let selected = selector.select(&[trigger], &[far], &geometry).unwrap();
        assert!(selected.is_empty());
    }
}
