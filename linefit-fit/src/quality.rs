//! Cherenkov arrival-time model and fit score.
//!
//! A muon with direction `uz`, passing the line at height `zc` and distance
//! `dc` at time `tc`, emits Cherenkov photons at a fixed angle. For a sensor
//! at height `z` the model predicts:
//!
//! ```text
//! D(z)     = n / sqrt(n² - 1) · sqrt(dc² + (z - zc)² (1 - uz²))
//! T(z)     = tc + ((z - zc) uz + (n² - 1) D(z) / n) / c
//! cosθ(z)  = (1 - uz²)(z - zc) / D(z) + uz / n
//! ```
//!
//! The score adds the squared timing residuals in units of `sigma_t` and a
//! light-yield term penalising long photon paths for hits with low weight.

use linefit_core::config::{FitConfig, MediumConstants};
use linefit_core::error::{Error, Result};
use linefit_core::track::TrackParameters;

/// Score function of one event's selected hits.
///
/// Immutable once built: evaluating the score has no side effects, so the
/// same model can be evaluated any number of times and from any thread.
#[derive(Debug, Clone)]
pub struct QualityModel {
    times: Vec<f64>,
    heights: Vec<f64>,
    weights: Vec<f64>,
    medium: MediumConstants,
    sigma_t: f64,
    d0: f64,
    d1: f64,
    light_yield: bool,
}

impl QualityModel {
    /// Builds the model from per-hit times (ns), heights (m) and weights.
    ///
    /// # Errors
    /// [`Error::NoHits`] for empty input and [`Error::LengthMismatch`] when
    /// the three arrays differ in length.
    pub fn new(
        times: Vec<f64>,
        heights: Vec<f64>,
        weights: Vec<f64>,
        config: &FitConfig,
    ) -> Result<Self> {
        if times.len() != heights.len() || times.len() != weights.len() {
            return Err(Error::LengthMismatch {
                times: times.len(),
                heights: heights.len(),
                weights: weights.len(),
            });
        }
        if times.is_empty() {
            return Err(Error::NoHits);
        }
        Ok(Self {
            times,
            heights,
            weights,
            medium: config.medium,
            sigma_t: config.sigma_t,
            d0: config.d0,
            d1: config.d1,
            light_yield: config.light_yield,
        })
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false; construction rejects empty input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Hit times (ns).
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Hit heights (m).
    #[must_use]
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Photon path length from emission to a sensor at height `z`.
    #[inline]
    #[must_use]
    pub fn photon_path(&self, track: &TrackParameters, z: f64) -> f64 {
        let dz = z - track.zc;
        let transverse = 1.0 - track.uz * track.uz;
        self.medium.path_factor() * (track.dc * track.dc + dz * dz * transverse).sqrt()
    }

    /// Predicted photon arrival time at height `z`.
    #[inline]
    #[must_use]
    pub fn arrival_time(&self, track: &TrackParameters, z: f64) -> f64 {
        let n = self.medium.refractive_index;
        let path = self.photon_path(track, z);
        track.tc + ((z - track.zc) * track.uz + (n * n - 1.0) * path / n) / self.medium.light_speed
    }

    /// Cosine of the photon incidence angle on a sensor at height `z`.
    #[inline]
    #[must_use]
    pub fn cos_incidence(&self, track: &TrackParameters, z: f64) -> f64 {
        let transverse = 1.0 - track.uz * track.uz;
        transverse * (z - track.zc) / self.photon_path(track, z)
            + track.uz / self.medium.refractive_index
    }

    /// Observed minus predicted arrival times.
    #[must_use]
    pub fn residuals(&self, track: &TrackParameters) -> Vec<f64> {
        self.times
            .iter()
            .zip(&self.heights)
            .map(|(&t, &z)| t - self.arrival_time(track, z))
            .collect()
    }

    /// Score of a track hypothesis; lower is better.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn score(&self, track: &TrackParameters) -> f64 {
        let timing: f64 = self
            .residuals(track)
            .iter()
            .map(|r| r * r / (self.sigma_t * self.sigma_t))
            .sum();
        if !self.light_yield {
            return timing;
        }

        let aip: Vec<f64> = self
            .heights
            .iter()
            .zip(&self.weights)
            .map(|(&z, &w)| 2.0 * w / (self.cos_incidence(track, z) + 1.0))
            .collect();
        let avg_aip = aip.iter().sum::<f64>() / aip.len() as f64;
        if avg_aip <= 0.0 {
            return timing;
        }

        let yield_term: f64 = self
            .heights
            .iter()
            .zip(&aip)
            .map(|(&z, &a)| {
                let path = self.photon_path(track, z);
                let distance = (self.d1 * self.d1 + path * path).sqrt();
                a * distance / (avg_aip * self.d0)
            })
            .sum();
        timing + yield_term
    }

    /// Score of `[uz, zc, dc, tc]`; NaN for a slice of the wrong length.
    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        TrackParameters::from_slice(values).map_or(f64::NAN, |track| self.score(&track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> FitConfig {
        FitConfig::default().with_medium(MediumConstants::new(std::f64::consts::SQRT_2, 1.0))
    }

    #[test]
    fn test_horizontal_track_at_closest_approach() {
        let track = TrackParameters::new(0.0, 0.0, 10.0, 0.0);
        let model = QualityModel::new(vec![0.0], vec![0.0], vec![1.0], &config()).unwrap();

        // n = sqrt(2): path factor sqrt(2), (n² - 1) / n = 1 / sqrt(2).
        assert_relative_eq!(model.photon_path(&track, 0.0), 10.0 * 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(model.arrival_time(&track, 0.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(model.cos_incidence(&track, 0.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_track_arrival_time() {
        let model = QualityModel::new(vec![0.0], vec![0.0], vec![1.0], &config()).unwrap();
        let down = TrackParameters::new(-1.0, 20.0, 10.0, 5.0);
        // uz = -1: T = tc + (zc - z + sqrt(n² - 1) dc) / c.
        assert_relative_eq!(model.arrival_time(&down, 0.0), 5.0 + 20.0 + 10.0, epsilon = 1e-12);
        assert_relative_eq!(model.arrival_time(&down, 30.0), 5.0 - 10.0 + 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_score_terms() {
        let track = TrackParameters::new(0.0, 0.0, 10.0, 0.0);
        let model = QualityModel::new(vec![10.0], vec![0.0], vec![3.0], &config()).unwrap();
        // Timing term vanishes; yield term is sqrt(d1² + D²) / d0 = 15 / 50.
        assert_relative_eq!(model.score(&track), 0.3, epsilon = 1e-12);

        let no_yield = QualityModel::new(
            vec![18.0],
            vec![0.0],
            vec![3.0],
            &config().with_light_yield(false),
        )
        .unwrap();
        assert_relative_eq!(no_yield.score(&track), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_weights_skip_light_yield() {
        let track = TrackParameters::new(0.0, 0.0, 10.0, 0.0);
        let model = QualityModel::new(vec![10.0, 10.0], vec![0.0, 0.0], vec![0.0, 0.0], &config())
            .unwrap();
        assert_relative_eq!(model.score(&track), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_matches_score() {
        let model = QualityModel::new(
            vec![100.0, 120.0, 150.0],
            vec![0.0, 10.0, 20.0],
            vec![1.0, 2.0, 1.0],
            &FitConfig::default(),
        )
        .unwrap();
        let track = TrackParameters::new(-0.5, 10.0, 15.0, 90.0);
        assert_relative_eq!(model.evaluate(&track.to_array()), model.score(&track));
        assert!(model.evaluate(&[1.0, 2.0]).is_nan());
    }

    #[test]
    fn test_rejects_bad_input() {
        let config = FitConfig::default();
        assert_eq!(
            QualityModel::new(vec![], vec![], vec![], &config).unwrap_err(),
            Error::NoHits
        );
        assert!(matches!(
            QualityModel::new(vec![1.0], vec![1.0, 2.0], vec![1.0], &config),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
