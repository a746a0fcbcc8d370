//! Track fit driver.

use linefit_core::config::FitConfig;
use linefit_core::track::{FitOutcome, FitResult, TrackParameters, TRACK_PARAMETER_COUNT};

use crate::error::{FitError, Result};
use crate::minimizer::{Minimizer, ParameterSpec, VariableMetric};
use crate::quality::QualityModel;

const INITIAL_UZ: f64 = -0.75;
const INITIAL_DC: f64 = 20.0;
const UZ_STEP: f64 = 0.01;
const DEFAULT_STEP: f64 = 1.0;

/// One selected hit as seen by the fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitHit {
    /// Arrival time (ns).
    pub time: f64,
    /// Sensor height (m).
    pub height: f64,
    /// Light-yield weight.
    pub weight: f64,
}

impl FitHit {
    /// Creates a new fit hit.
    #[must_use]
    pub fn new(time: f64, height: f64, weight: f64) -> Self {
        Self {
            time,
            height,
            weight,
        }
    }
}

/// Fits track parameters to the selected hits of one event.
#[derive(Debug, Clone, Default)]
pub struct TrackFitter {
    config: FitConfig,
}

impl TrackFitter {
    /// Creates a fitter; `config` is expected to be validated.
    #[must_use]
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    /// Fit configuration.
    #[must_use]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Starting point: mid height, earliest time, fixed `uz` and `dc`.
    #[must_use]
    pub fn initial_guess(hits: &[FitHit]) -> TrackParameters {
        let (z_min, z_max) = height_range(hits);
        let t_min = hits.iter().map(|h| h.time).fold(f64::INFINITY, f64::min);
        TrackParameters::new(INITIAL_UZ, 0.5 * (z_min + z_max), INITIAL_DC, t_min)
    }

    /// Parameter descriptions handed to the minimizer.
    #[must_use]
    pub fn parameter_specs(&self, hits: &[FitHit]) -> [ParameterSpec; TRACK_PARAMETER_COUNT] {
        let guess = Self::initial_guess(hits);
        let (z_min, z_max) = height_range(hits);
        let [uz, zc, dc, tc] = TrackParameters::NAMES;
        [
            ParameterSpec::new(uz, guess.uz, UZ_STEP).with_bounds(-1.0, 1.0),
            ParameterSpec::new(zc, guess.zc, DEFAULT_STEP).with_bounds(z_min, z_max),
            ParameterSpec::new(dc, guess.dc, DEFAULT_STEP)
                .with_bounds(self.config.dc_min, self.config.dc_max),
            ParameterSpec::new(tc, guess.tc, DEFAULT_STEP),
        ]
    }

    /// Fits with the built-in [`VariableMetric`] minimizer.
    #[must_use]
    pub fn fit(&self, hits: &[FitHit]) -> FitOutcome {
        let minimizer = VariableMetric::new(self.config.tolerance, self.config.max_calls);
        self.fit_with(&minimizer, hits)
    }

    /// Fits with the given minimizer.
    ///
    /// Too few hits give [`FitOutcome::Skipped`] without calling the
    /// minimizer; minimizer errors give [`FitOutcome::Failed`].
    pub fn fit_with<M: Minimizer>(&self, minimizer: &M, hits: &[FitHit]) -> FitOutcome {
        if hits.len() < self.config.min_hits {
            return FitOutcome::Skipped { hits: hits.len() };
        }
        match self.try_fit(minimizer, hits) {
            Ok(result) => FitOutcome::Fitted(result),
            Err(err) => {
                log::warn!("track fit failed on {} hits: {err}", hits.len());
                FitOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn try_fit<M: Minimizer>(&self, minimizer: &M, hits: &[FitHit]) -> Result<FitResult> {
        let model = QualityModel::new(
            hits.iter().map(|h| h.time).collect(),
            hits.iter().map(|h| h.height).collect(),
            hits.iter().map(|h| h.weight).collect(),
            &self.config,
        )?;
        let specs = self.parameter_specs(hits);
        let minimum = minimizer.minimize(|values| model.evaluate(values), &specs)?;

        let parameters = TrackParameters::from_slice(&minimum.values)
            .ok_or_else(|| unexpected_length("values", minimum.values.len()))?;
        let parameter_errors = TrackParameters::from_slice(&minimum.errors)
            .ok_or_else(|| unexpected_length("errors", minimum.errors.len()))?;

        log::debug!(
            "fit {} hits: valid={} score={:.4} calls={} uz={:.4}",
            hits.len(),
            minimum.is_valid,
            minimum.fval,
            minimum.calls,
            parameters.uz
        );

        Ok(FitResult {
            parameters,
            parameter_errors,
            score: minimum.fval,
            degrees_of_freedom: hits.len() as i64 - TRACK_PARAMETER_COUNT as i64,
            is_valid: minimum.is_valid,
            reconstructed_zenith_deg: self.config.zenith.zenith_deg(parameters.uz),
            edm: minimum.edm,
            function_calls: minimum.calls,
        })
    }
}

fn height_range(hits: &[FitHit]) -> (f64, f64) {
    hits.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| {
            (lo.min(h.height), hi.max(h.height))
        })
}

fn unexpected_length(what: &str, len: usize) -> FitError {
    FitError::NumericalFailure(format!(
        "minimizer returned {len} {what}, expected {TRACK_PARAMETER_COUNT}"
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, clippy::cast_precision_loss)]
    use super::*;
    use crate::minimizer::Minimum;
    use std::cell::Cell;

    /// Minimizer stub counting invocations and returning a canned answer.
    struct Scripted {
        calls: Cell<usize>,
        answer: std::result::Result<Minimum, FitError>,
    }

    impl Scripted {
        fn new(answer: std::result::Result<Minimum, FitError>) -> Self {
            Self {
                calls: Cell::new(0),
                answer,
            }
        }
    }

    impl Minimizer for Scripted {
        fn minimize<F>(&self, f: F, parameters: &[ParameterSpec]) -> Result<Minimum>
        where
            F: Fn(&[f64]) -> f64,
        {
            self.calls.set(self.calls.get() + 1);
            let start: Vec<f64> = parameters.iter().map(|p| p.start).collect();
            assert!(f(&start).is_finite());
            self.answer.clone()
        }
    }

    fn hits(n: usize) -> Vec<FitHit> {
        (0..n)
            .map(|i| FitHit::new(100.0 + 20.0 * i as f64, 10.0 * i as f64, 1.0))
            .collect()
    }

    fn minimum(is_valid: bool) -> Minimum {
        Minimum {
            values: vec![-0.5, 12.0, 8.0, 95.0],
            errors: vec![0.01, 0.5, 0.5, 1.0],
            fval: 3.2,
            edm: 1e-4,
            calls: 150,
            is_valid,
        }
    }

    #[test]
    fn test_initial_guess() {
        let guess = TrackFitter::initial_guess(&hits(5));
        assert_eq!(guess, TrackParameters::new(-0.75, 20.0, 20.0, 100.0));
    }

    #[test]
    fn test_parameter_specs() {
        let fitter = TrackFitter::new(FitConfig::default().with_dc_bounds(3.0, 80.0));
        let specs = fitter.parameter_specs(&hits(4));
        assert_eq!(specs[0].bounds, Some((-1.0, 1.0)));
        assert_eq!(specs[0].step, 0.01);
        assert_eq!(specs[1].bounds, Some((0.0, 30.0)));
        assert_eq!(specs[2].bounds, Some((3.0, 80.0)));
        assert_eq!(specs[3].bounds, None);
        assert_eq!(specs[3].name, "tc");
    }

    #[test]
    fn test_too_few_hits_are_skipped() {
        let stub = Scripted::new(Ok(minimum(true)));
        let outcome = TrackFitter::default().fit_with(&stub, &hits(3));
        assert_eq!(outcome, FitOutcome::Skipped { hits: 3 });
        assert_eq!(stub.calls.get(), 0);
    }

    #[test]
    fn test_minimizer_failure_is_caught() {
        let stub = Scripted::new(Err(FitError::NumericalFailure("diverged".into())));
        let outcome = TrackFitter::default().fit_with(&stub, &hits(5));
        assert_eq!(stub.calls.get(), 1);
        match outcome {
            FitOutcome::Failed { reason } => assert!(reason.contains("diverged")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_result_fields() {
        let stub = Scripted::new(Ok(minimum(true)));
        let outcome = TrackFitter::default().fit_with(&stub, &hits(6));
        let result = outcome.valid_result().unwrap();
        assert_eq!(result.parameters, TrackParameters::new(-0.5, 12.0, 8.0, 95.0));
        assert_eq!(result.parameter_errors.zc, 0.5);
        assert_eq!(result.degrees_of_freedom, 2);
        assert_eq!(result.function_calls, 150);
        approx::assert_relative_eq!(result.reconstructed_zenith_deg, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_minimum_is_kept_but_flagged() {
        let stub = Scripted::new(Ok(minimum(false)));
        let outcome = TrackFitter::default().fit_with(&stub, &hits(4));
        assert!(outcome.was_attempted());
        assert!(outcome.valid_result().is_none());
    }

    #[test]
    fn test_degenerate_heights_fail() {
        let flat: Vec<FitHit> = (0..5).map(|i| FitHit::new(f64::from(i), 10.0, 1.0)).collect();
        assert!(matches!(TrackFitter::default().fit(&flat), FitOutcome::Failed { .. }));
    }

    #[test]
    fn test_fit_stays_in_bounds() {
        // Times far from any physical track push parameters to their limits.
        let hits: Vec<FitHit> = [0.0, 10.0, 20.0, 30.0, 40.0]
            .iter()
            .zip([500.0, 20.0, 900.0, 5.0, 300.0])
            .map(|(&z, t)| FitHit::new(t, z, 2.0))
            .collect();
        let config = FitConfig::default();
        let outcome = TrackFitter::new(config.clone()).fit(&hits);
        match outcome {
            FitOutcome::Fitted(result) => {
                let p = result.parameters;
                assert!((-1.0..=1.0).contains(&p.uz));
                assert!((0.0..=40.0).contains(&p.zc));
                assert!((config.dc_min..=config.dc_max).contains(&p.dc));
                assert!(result.score.is_finite());
            }
            other => panic!("expected a fit, got {other:?}"),
        }
    }
}
