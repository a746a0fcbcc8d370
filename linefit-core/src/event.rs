//! Events: one burst of raw hits plus optional simulation truth.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ZenithConvention;
use crate::hit::HitData;

/// Simulated track used to validate reconstructions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TruthTrack {
    /// Direction of travel (need not be normalised).
    pub direction: [f64; 3],
}

impl TruthTrack {
    /// Creates a truth track from a direction of travel.
    #[must_use]
    pub fn new(direction: [f64; 3]) -> Self {
        Self { direction }
    }

    /// z component of the normalised direction.
    #[must_use]
    pub fn uz(&self) -> f64 {
        let [x, y, z] = self.direction;
        let norm = (x * x + y * y + z * z).sqrt();
        if norm > 0.0 {
            z / norm
        } else {
            0.0
        }
    }

    /// True zenith in degrees under `convention`.
    #[must_use]
    pub fn zenith_deg(&self, convention: ZenithConvention) -> f64 {
        convention.zenith_deg(self.uz())
    }
}

/// A single triggered event.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Event number.
    pub id: u64,
    /// Raw hits in arbitrary order.
    pub hits: Vec<HitData>,
    /// Simulation truth, if known.
    #[cfg_attr(feature = "serde", serde(default))]
    pub truth: Option<TruthTrack>,
}

impl Event {
    /// Creates an event without truth information.
    #[must_use]
    pub fn new(id: u64, hits: Vec<HitData>) -> Self {
        Self {
            id,
            hits,
            truth: None,
        }
    }

    /// Attaches truth information.
    #[must_use]
    pub fn with_truth(mut self, truth: TruthTrack) -> Self {
        self.truth = Some(truth);
        self
    }
}
