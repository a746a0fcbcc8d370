//! Hit merging on single optical modules.
//!
//! Pulses on one module that follow each other within the merge window are
//! combined into a single hit: the earliest contributor provides sensor and
//! time, the time-over-threshold values are summed.
//!
//! Clusters are built by a single scan over the time-sorted hits. A cluster
//! closes as soon as the gap to its latest member exceeds the window; the
//! pending cluster at the end of the scan is closed the same way.

use linefit_core::cluster::Cluster;
use linefit_core::config::ReductionConfig;
use linefit_core::error::Result;
use linefit_core::geometry::Geometry;
use linefit_core::hit::{sort_by_time, Hit, HitData};

use crate::module_index::ModuleIndex;

/// Merges temporally adjacent hits on the same module.
#[derive(Clone, Debug)]
pub struct HitMerger {
    time_window: f64,
    keep_unmerged: bool,
}

impl Default for HitMerger {
    fn default() -> Self {
        Self::from_config(&ReductionConfig::default())
    }
}

impl HitMerger {
    /// Create a merger with an explicit window (ns).
    pub fn new(time_window: f64, keep_unmerged: bool) -> Self {
        Self {
            time_window,
            keep_unmerged,
        }
    }

    /// Create a merger from the reduction configuration.
    pub fn from_config(config: &ReductionConfig) -> Self {
        Self::new(config.time_window, config.keep_unmerged)
    }

    /// Merge window (ns).
    pub fn time_window(&self) -> f64 {
        self.time_window
    }

    /// Split one module's hits into time clusters.
    ///
    /// Every input hit ends up in exactly one cluster; clusters and their
    /// members are in ascending time order.
    pub fn cluster_module<H: Hit + Clone>(&self, hits: &[H]) -> Vec<Cluster<H>> {
        let mut sorted = hits.to_vec();
        sort_by_time(&mut sorted);

        let mut clusters = Vec::new();
        let mut pending: Cluster<H> = Cluster::new();
        for hit in sorted {
            let gap = pending.last().map(|last| last.delay_to(&hit));
            if gap.is_some_and(|gap| gap > self.time_window) {
                clusters.push(std::mem::take(&mut pending));
            }
            pending.push(hit);
        }
        if !pending.is_empty() {
            clusters.push(pending);
        }
        clusters
    }

    /// Merge one module's hits.
    ///
    /// Clusters with two or more members become one merged hit. Single hits
    /// are passed through unchanged or dropped depending on `keep_unmerged`.
    pub fn merge_module<H: Hit + Clone>(&self, hits: &[H]) -> Vec<HitData> {
        self.cluster_module(hits)
            .iter()
            .filter(|cluster| self.keep_unmerged || cluster.is_merge())
            .filter_map(Cluster::combine)
            .collect()
    }

    /// Merge an event's hits module by module.
    ///
    /// Returns the merged hits of all modules in ascending time order.
    pub fn merge<H, G>(&self, hits: &[H], geometry: &G) -> Result<Vec<HitData>>
    where
        H: Hit + Clone,
        G: Geometry + ?Sized,
    {
        let index = ModuleIndex::from_hits(hits, geometry)?;
        let mut merged: Vec<HitData> = index
            .iter()
            .flat_map(|(_, module_hits)| self.merge_module(module_hits))
            .collect();
        sort_by_time(&mut merged);
        Ok(merged)
    }
}
