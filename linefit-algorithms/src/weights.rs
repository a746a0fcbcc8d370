//! Per-hit weights for the light-yield term of the fit.

use linefit_core::config::HitWeighting;
use linefit_core::error::Result;
use linefit_core::geometry::Geometry;
use linefit_core::hit::Hit;

use crate::module_index::ModuleIndex;

/// Computes one weight per selected hit.
///
/// With [`HitWeighting::HitCount`] the weight of a selected hit is the
/// number of `raw` hits on the same module in `[t, t + window)`, so a
/// selected hit that is itself among the raw hits weighs at least one.
#[allow(clippy::cast_precision_loss)]
pub fn hit_weights<S, R, G>(
    selected: &[S],
    raw: &[R],
    geometry: &G,
    weighting: HitWeighting,
) -> Result<Vec<f64>>
where
    S: Hit,
    R: Hit + Clone,
    G: Geometry + ?Sized,
{
    match weighting {
        HitWeighting::Uniform => Ok(vec![1.0; selected.len()]),
        HitWeighting::Amplitude => Ok(selected.iter().map(Hit::tot).collect()),
        HitWeighting::HitCount { window } => {
            let index = ModuleIndex::from_hits(raw, geometry)?;
            selected
                .iter()
                .map(|hit| {
                    let module = geometry.module_of(hit.sensor_id())?;
                    let count = index
                        .get(&module)
                        .iter()
                        .filter(|other| {
                            let dt = hit.delay_to(*other);
                            (0.0..window).contains(&dt)
                        })
                        .count();
                    Ok(count as f64)
                })
                .collect()
        }
    }
}
