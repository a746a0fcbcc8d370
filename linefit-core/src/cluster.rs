//! Pulse clusters: temporally adjacent hits on one optical module.

use crate::hit::{Hit, HitData};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A group of hits on the same module, in ascending time order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster<H = HitData> {
    /// Hits belonging to this cluster.
    pub hits: Vec<H>,
}

impl<H> Default for Cluster<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Cluster<H> {
    /// Creates an empty cluster.
    pub fn new() -> Self {
        Self { hits: Vec::new() }
    }

    /// Creates a cluster with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Adds a hit to the cluster.
    pub fn push(&mut self, hit: H) {
        self.hits.push(hit);
    }

    /// Returns the number of hits in the cluster.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the cluster is empty.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns true if the cluster holds more than one hit.
    pub fn is_merge(&self) -> bool {
        self.hits.len() > 1
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &H> {
        self.hits.iter()
    }

    /// Most recently added hit.
    pub fn last(&self) -> Option<&H> {
        self.hits.last()
    }
}

impl<H: Hit> Cluster<H> {
    /// Combines the cluster into one hit.
    ///
    /// The result carries the sensor and time of the earliest member and the
    /// summed time over threshold. Returns `None` for an empty cluster.
    pub fn combine(&self) -> Option<HitData> {
        let earliest = self
            .hits
            .iter()
            .min_by(|a, b| a.time().total_cmp(&b.time()))?;
        Some(HitData {
            sensor_id: earliest.sensor_id(),
            time: earliest.time(),
            tot: self.hits.iter().map(Hit::tot).sum(),
        })
    }
}

impl<H> FromIterator<H> for Cluster<H> {
    fn from_iter<I: IntoIterator<Item = H>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}
