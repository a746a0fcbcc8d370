//! The full hit-reduction cascade for one event.

use linefit_core::config::ReductionConfig;
use linefit_core::error::Result;
use linefit_core::geometry::Geometry;
use linefit_core::hit::HitData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::amplitude::AmplitudeFilter;
use crate::coincidence::CoincidenceSelector;
use crate::first_hit::FirstHitReducer;
use crate::merge::HitMerger;

/// Output of every stage of the reduction cascade.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReducedHits {
    /// Merged hits, ascending in time.
    pub merged: Vec<HitData>,
    /// Merged hits passing the time-over-threshold cut.
    pub long_tot: Vec<HitData>,
    /// Earliest long hit per module.
    pub first: Vec<HitData>,
    /// Raw hits in coincidence with a first hit, plus those first hits.
    pub coincident: Vec<HitData>,
    /// Hits handed to the fit.
    pub selected: Vec<HitData>,
}

/// Runs merge, amplitude cut, first-hit reduction and coincidence selection.
///
/// The first hits act as triggers and the raw hits as candidates. With
/// `reduce_coincidences` set, the coincident hits are reduced to the
/// earliest one per module once more.
pub fn reduce_hits<G: Geometry + ?Sized>(
    raw: &[HitData],
    geometry: &G,
    config: &ReductionConfig,
) -> Result<ReducedHits> {
    let merged = HitMerger::from_config(config).merge(raw, geometry)?;
    let long_tot = AmplitudeFilter::from_config(config).filter(&merged);
    let reducer = FirstHitReducer::new();
    let first = reducer.reduce(&long_tot, geometry)?;
    let coincident = CoincidenceSelector::from_config(config).select(&first, raw, geometry)?;
    let selected = if config.reduce_coincidences {
        reducer.reduce(&coincident, geometry)?
    } else {
        coincident.clone()
    };

    log::debug!(
        "reduced {} raw hits: {} merged, {} long, {} first, {} coincident, {} selected",
        raw.len(),
        merged.len(),
        long_tot.len(),
        first.len(),
        coincident.len(),
        selected.len()
    );

    Ok(ReducedHits {
        merged,
        long_tot,
        first,
        coincident,
        selected,
    })
}
