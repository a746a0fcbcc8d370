//! Time-over-threshold cut.

use linefit_core::config::ReductionConfig;
use linefit_core::hit::Hit;

/// Keeps hits with at least `min_amplitude` time over threshold.
#[derive(Clone, Debug)]
pub struct AmplitudeFilter {
    min_amplitude: f64,
}

impl AmplitudeFilter {
    /// Create a filter with the given threshold (ns).
    pub fn new(min_amplitude: f64) -> Self {
        Self { min_amplitude }
    }

    /// Create a filter from the reduction configuration.
    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(config.min_amplitude)
    }

    /// Returns true if the hit passes the cut.
    #[inline]
    pub fn accepts<H: Hit>(&self, hit: &H) -> bool {
        hit.tot() >= self.min_amplitude
    }

    /// Order-preserving subsequence of hits passing the cut.
    pub fn filter<H: Hit + Clone>(&self, hits: &[H]) -> Vec<H> {
        hits.iter().filter(|hit| self.accepts(*hit)).cloned().collect()
    }
}

impl Default for AmplitudeFilter {
    fn default() -> Self {
        Self::from_config(&ReductionConfig::default())
    }
}
