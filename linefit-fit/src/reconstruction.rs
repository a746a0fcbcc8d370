//! Event-level reconstruction: reduction, weighting and fit.

use rayon::prelude::*;

use linefit_algorithms::{hit_weights, reduce_hits, ReducedHits};
use linefit_core::config::{FitConfig, ReductionConfig};
use linefit_core::event::Event;
use linefit_core::geometry::Geometry;
use linefit_core::hit::HitData;
use linefit_core::statistics::FitStatistics;
use linefit_core::track::FitOutcome;

use crate::error::Result;
use crate::fitter::{FitHit, TrackFitter};

/// Per-event summary returned by [`Reconstructor::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    /// Event identifier.
    pub event_id: u64,
    /// Number of hits handed to the fit.
    pub selected_hits: usize,
    /// Fit outcome.
    pub outcome: FitOutcome,
}

/// Runs the full chain on events against one detector geometry.
#[derive(Debug)]
pub struct Reconstructor<G> {
    geometry: G,
    reduction: ReductionConfig,
    fitter: TrackFitter,
}

impl<G: Geometry> Reconstructor<G> {
    /// Creates a reconstructor after validating both configurations.
    ///
    /// # Errors
    /// Returns a configuration error if either configuration is out of range.
    pub fn new(geometry: G, reduction: ReductionConfig, fit: FitConfig) -> Result<Self> {
        reduction.validate()?;
        fit.validate()?;
        Ok(Self {
            geometry,
            reduction,
            fitter: TrackFitter::new(fit),
        })
    }

    /// Detector geometry.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Reduction configuration.
    pub fn reduction_config(&self) -> &ReductionConfig {
        &self.reduction
    }

    /// Fit configuration.
    pub fn fit_config(&self) -> &FitConfig {
        self.fitter.config()
    }

    /// An empty accumulator for this configuration.
    pub fn statistics(&self) -> FitStatistics {
        FitStatistics::for_config(self.fitter.config())
    }

    /// Runs the reduction cascade and prepares the fit input.
    ///
    /// # Errors
    /// Fails on sensors unknown to the geometry.
    pub fn prepare(&self, raw: &[HitData]) -> Result<(ReducedHits, Vec<FitHit>)> {
        let reduced = reduce_hits(raw, &self.geometry, &self.reduction)?;
        let weights = hit_weights(
            &reduced.selected,
            raw,
            &self.geometry,
            self.fitter.config().weighting,
        )?;
        let hits = reduced
            .selected
            .iter()
            .zip(weights)
            .map(|(hit, weight)| {
                let height = self.geometry.height_of(hit.sensor_id)?;
                Ok(FitHit::new(hit.time, height, weight))
            })
            .collect::<linefit_core::Result<Vec<_>>>()?;
        Ok((reduced, hits))
    }

    /// Reconstructs one event without touching any statistics.
    ///
    /// # Errors
    /// Fails on sensors unknown to the geometry; fit failures are reported
    /// in the outcome instead.
    pub fn reconstruct(&self, event: &Event) -> Result<EventReport> {
        let (_, hits) = self.prepare(&event.hits)?;
        let outcome = self.fitter.fit(&hits);
        Ok(EventReport {
            event_id: event.id,
            selected_hits: hits.len(),
            outcome,
        })
    }

    /// Reconstructs one event and accounts it in `statistics`.
    ///
    /// # Errors
    /// See [`Reconstructor::reconstruct`].
    pub fn process(&self, event: &Event, statistics: &mut FitStatistics) -> Result<EventReport> {
        let report = self.reconstruct(event)?;
        let true_zenith = event
            .truth
            .map(|truth| truth.zenith_deg(self.fitter.config().zenith));
        statistics.record(event.id, &report.outcome, true_zenith);
        Ok(report)
    }

    /// Reconstructs all events in parallel.
    ///
    /// Each worker folds into its own accumulator; the partial results are
    /// merged in event order. An event whose hits cannot be resolved against
    /// the geometry is logged and counted as rejected, the rest of the run
    /// continues.
    pub fn process_all(&self, events: &[Event]) -> FitStatistics {
        let statistics = events
            .par_iter()
            .fold(
                || self.statistics(),
                |mut partial, event| {
                    if let Err(err) = self.process(event, &mut partial) {
                        log::warn!("event {} rejected: {err}", event.id);
                        partial.reject();
                    }
                    partial
                },
            )
            .reduce(
                || self.statistics(),
                |mut left, right| {
                    left.merge(right);
                    left
                },
            );

        log::info!(
            "processed {} events: {} attempted, {} valid, {} failed, {} skipped, {} rejected",
            statistics.processed_events,
            statistics.attempted_fits,
            statistics.valid_fits,
            statistics.failed_fits,
            statistics.skipped_events,
            statistics.rejected_events
        );
        statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FitError;
    use linefit_core::geometry::{DetectorGeometry, ModuleKey};

    fn geometry() -> DetectorGeometry {
        DetectorGeometry::vertical_line(1, (0.0, 0.0), 10, 3, 0.0, 10.0)
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let fit = FitConfig::default().with_dc_bounds(50.0, 10.0);
        let err = Reconstructor::new(geometry(), ReductionConfig::default(), fit).unwrap_err();
        assert!(matches!(err, FitError::Core(linefit_core::Error::Config(_))));
    }

    #[test]
    fn test_empty_event_is_skipped() {
        let reconstructor =
            Reconstructor::new(geometry(), ReductionConfig::default(), FitConfig::default())
                .unwrap();
        let mut statistics = reconstructor.statistics();
        let report = reconstructor
            .process(&Event::new(7, Vec::new()), &mut statistics)
            .unwrap();
        assert_eq!(report.outcome, FitOutcome::Skipped { hits: 0 });
        assert_eq!(statistics.processed_events, 1);
        assert_eq!(statistics.skipped_events, 1);
        assert_eq!(statistics.attempted_fits, 0);
    }

    #[test]
    fn test_prepare_resolves_heights() {
        let geometry = geometry();
        let sensor = |module| geometry.sensor_at(ModuleKey::new(1, module), 0).unwrap();
        let raw = vec![
            HitData { sensor_id: sensor(3), time: 100.0, tot: 30.0 },
            HitData { sensor_id: sensor(4), time: 130.0, tot: 30.0 },
        ];
        let reconstructor =
            Reconstructor::new(geometry.clone(), ReductionConfig::default(), FitConfig::default())
                .unwrap();
        let (reduced, hits) = reconstructor.prepare(&raw).unwrap();
        assert_eq!(reduced.selected.len(), 2);
        let mut heights: Vec<f64> = hits.iter().map(|h| h.height).collect();
        heights.sort_by(f64::total_cmp);
        assert_eq!(heights, vec![20.0, 30.0]);
        assert!(hits.iter().all(|h| (h.weight - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_unknown_sensor_is_an_error() {
        let reconstructor =
            Reconstructor::new(geometry(), ReductionConfig::default(), FitConfig::default())
                .unwrap();
        let event = Event::new(1, vec![HitData::new(5, 0.0, 30.0)]);
        assert!(reconstructor.reconstruct(&event).is_err());
    }

    #[test]
    fn test_unknown_sensor_rejects_only_its_event() {
        let geometry = geometry();
        let sensor = |module| geometry.sensor_at(ModuleKey::new(1, module), 0).unwrap();
        let good = Event::new(
            1,
            vec![
                HitData { sensor_id: sensor(3), time: 100.0, tot: 30.0 },
                HitData { sensor_id: sensor(4), time: 130.0, tot: 30.0 },
            ],
        );
        let bad = Event::new(2, vec![HitData::new(5, 0.0, 30.0)]);
        let reconstructor =
            Reconstructor::new(geometry.clone(), ReductionConfig::default(), FitConfig::default())
                .unwrap();

        let statistics = reconstructor.process_all(&[good, bad, Event::new(3, Vec::new())]);
        assert_eq!(statistics.processed_events, 3);
        assert_eq!(statistics.rejected_events, 1);
        assert_eq!(statistics.skipped_events, 2);
        assert_eq!(statistics.attempted_fits, 0);
    }
}
