//! Earliest hit per optical module.

use std::collections::HashSet;

use linefit_core::error::Result;
use linefit_core::geometry::Geometry;
use linefit_core::hit::Hit;

/// Keeps the earliest hit of every module.
///
/// Hits are stably sorted by time and the first hit seen for each
/// `(line, module)` key wins, so equal times resolve to input order.
#[derive(Clone, Debug, Default)]
pub struct FirstHitReducer;

impl FirstHitReducer {
    /// Create a reducer.
    pub fn new() -> Self {
        Self
    }

    /// Reduce hits to one per module, in ascending time order.
    pub fn reduce<H, G>(&self, hits: &[H], geometry: &G) -> Result<Vec<H>>
    where
        H: Hit + Clone,
        G: Geometry + ?Sized,
    {
        let mut keyed = hits
            .iter()
            .map(|hit| Ok((geometry.module_of(hit.sensor_id())?, hit)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(_, a), (_, b)| a.time().total_cmp(&b.time()));

        let mut seen = HashSet::with_capacity(keyed.len());
        Ok(keyed
            .into_iter()
            .filter(|(module, _)| seen.insert(*module))
            .map(|(_, hit)| hit.clone())
            .collect())
    }
}
