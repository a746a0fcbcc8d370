//! Configuration for hit reduction and track fitting.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the hit-reduction cascade.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReductionConfig {
    /// Maximum gap (ns) between consecutive hits merged on one module.
    pub time_window: f64,
    /// Pass hits that did not merge with anything through unchanged.
    pub keep_unmerged: bool,
    /// Minimum time over threshold (ns) of a merged hit.
    pub min_amplitude: f64,
    /// Coincidence window (ns) for the adjacent floors.
    pub adjacent_window: f64,
    /// Coincidence window (ns) for the next-to-adjacent floors.
    pub next_adjacent_window: f64,
    /// Keep only the first coincident hit per module.
    pub reduce_coincidences: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            time_window: 10.0,
            keep_unmerged: true,
            min_amplitude: 20.0,
            adjacent_window: 200.0,
            next_adjacent_window: 400.0,
            reduce_coincidences: true,
        }
    }
}

impl ReductionConfig {
    /// Creates a new reduction configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge time window.
    #[must_use]
    pub fn with_time_window(mut self, window: f64) -> Self {
        self.time_window = window;
        self
    }

    /// Sets whether unmerged single hits are kept.
    #[must_use]
    pub fn with_keep_unmerged(mut self, keep: bool) -> Self {
        self.keep_unmerged = keep;
        self
    }

    /// Sets the amplitude threshold.
    #[must_use]
    pub fn with_min_amplitude(mut self, threshold: f64) -> Self {
        self.min_amplitude = threshold;
        self
    }

    /// Sets both coincidence windows.
    #[must_use]
    pub fn with_coincidence_windows(mut self, adjacent: f64, next_adjacent: f64) -> Self {
        self.adjacent_window = adjacent;
        self.next_adjacent_window = next_adjacent;
        self
    }

    /// Sets whether coincident hits are reduced to one per module.
    #[must_use]
    pub fn with_reduce_coincidences(mut self, reduce: bool) -> Self {
        self.reduce_coincidences = reduce;
        self
    }

    /// Checks that every window and threshold is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("time_window", self.time_window),
            ("min_amplitude", self.min_amplitude),
            ("adjacent_window", self.adjacent_window),
            ("next_adjacent_window", self.next_adjacent_window),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Optical properties of the detector medium.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MediumConstants {
    /// Group refractive index.
    pub refractive_index: f64,
    /// Speed of light in m/ns.
    pub light_speed: f64,
}

impl Default for MediumConstants {
    fn default() -> Self {
        Self::SEA_WATER
    }
}

impl MediumConstants {
    /// Deep sea water with the vacuum speed of light.
    pub const SEA_WATER: Self = Self {
        refractive_index: 1.3797,
        light_speed: 0.299_792_458,
    };

    /// Creates a new set of medium constants.
    #[must_use]
    pub fn new(refractive_index: f64, light_speed: f64) -> Self {
        Self {
            refractive_index,
            light_speed,
        }
    }

    /// `n / sqrt(n² - 1)`, the Cherenkov path length factor.
    #[inline]
    #[must_use]
    pub fn path_factor(&self) -> f64 {
        let n = self.refractive_index;
        n / (n * n - 1.0).sqrt()
    }

    /// Checks `n > 1` and `c > 0`.
    pub fn validate(&self) -> Result<()> {
        if !(self.refractive_index.is_finite() && self.refractive_index > 1.0) {
            return Err(Error::config(format!(
                "refractive index must be greater than 1, got {}",
                self.refractive_index
            )));
        }
        if !(self.light_speed.is_finite() && self.light_speed > 0.0) {
            return Err(Error::config(format!(
                "light speed must be positive, got {}",
                self.light_speed
            )));
        }
        Ok(())
    }
}

/// How per-hit weights for the light-yield term are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HitWeighting {
    /// Every hit weighs 1.
    Uniform,
    /// Weight is the hit's time over threshold.
    Amplitude,
    /// Weight is the number of raw hits on the same module within
    /// `[t, t + window)` of the selected hit.
    HitCount {
        /// Counting window (ns).
        window: f64,
    },
}

impl Default for HitWeighting {
    fn default() -> Self {
        Self::HitCount { window: 15.0 }
    }
}

/// Conversion from the fitted `uz` to a zenith angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ZenithConvention {
    /// `180 - acos(uz)` in degrees: zenith of the direction the track
    /// comes from, so a down-going track (`uz = -1`) has zenith 0.
    #[default]
    ArccosComplement,
    /// `asin(uz)` in degrees.
    Arcsin,
}

impl ZenithConvention {
    /// Converts the z component of a unit direction to degrees.
    #[must_use]
    pub fn zenith_deg(self, uz: f64) -> f64 {
        let uz = uz.clamp(-1.0, 1.0);
        match self {
            Self::ArccosComplement => 180.0 - uz.acos().to_degrees(),
            Self::Arcsin => uz.asin().to_degrees(),
        }
    }
}

/// Configuration of the track fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FitConfig {
    /// Minimum number of selected hits for a fit attempt.
    pub min_hits: usize,
    /// Assumed timing resolution per hit (ns).
    pub sigma_t: f64,
    /// Light-yield normalisation distance (m).
    pub d0: f64,
    /// Minimum-distance regulariser (m).
    pub d1: f64,
    /// Lower bound on the closest-approach distance (m).
    pub dc_min: f64,
    /// Upper bound on the closest-approach distance (m).
    pub dc_max: f64,
    /// Optical constants of the medium.
    pub medium: MediumConstants,
    /// Include the light-yield term in the score.
    pub light_yield: bool,
    /// Per-hit weight derivation.
    pub weighting: HitWeighting,
    /// Minimizer tolerance; convergence when `EDM < 0.002 * tolerance`.
    pub tolerance: f64,
    /// Maximum number of score evaluations per fit.
    pub max_calls: usize,
    /// Zenith convention used for reconstructed and true directions.
    pub zenith: ZenithConvention,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_hits: 4,
            sigma_t: 8.0,
            d0: 50.0,
            d1: 5.0,
            dc_min: 2.0,
            dc_max: 100.0,
            medium: MediumConstants::default(),
            light_yield: true,
            weighting: HitWeighting::default(),
            tolerance: 1.0,
            max_calls: 2000,
            zenith: ZenithConvention::default(),
        }
    }
}

impl FitConfig {
    /// Creates a new fit configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum number of hits.
    #[must_use]
    pub fn with_min_hits(mut self, min_hits: usize) -> Self {
        self.min_hits = min_hits;
        self
    }

    /// Sets the timing resolution.
    #[must_use]
    pub fn with_sigma_t(mut self, sigma_t: f64) -> Self {
        self.sigma_t = sigma_t;
        self
    }

    /// Sets the light-yield distances `d0` and `d1`.
    #[must_use]
    pub fn with_light_yield_distances(mut self, d0: f64, d1: f64) -> Self {
        self.d0 = d0;
        self.d1 = d1;
        self
    }

    /// Sets the closest-approach distance bounds.
    #[must_use]
    pub fn with_dc_bounds(mut self, dc_min: f64, dc_max: f64) -> Self {
        self.dc_min = dc_min;
        self.dc_max = dc_max;
        self
    }

    /// Sets the medium constants.
    #[must_use]
    pub fn with_medium(mut self, medium: MediumConstants) -> Self {
        self.medium = medium;
        self
    }

    /// Enables or disables the light-yield term.
    #[must_use]
    pub fn with_light_yield(mut self, enabled: bool) -> Self {
        self.light_yield = enabled;
        self
    }

    /// Sets the hit weighting.
    #[must_use]
    pub fn with_weighting(mut self, weighting: HitWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Sets the minimizer tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the evaluation budget.
    #[must_use]
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    /// Sets the zenith convention.
    #[must_use]
    pub fn with_zenith(mut self, zenith: ZenithConvention) -> Self {
        self.zenith = zenith;
        self
    }

    /// Checks ranges; any failure is fatal for a run.
    pub fn validate(&self) -> Result<()> {
        if self.min_hits == 0 {
            return Err(Error::config("min_hits must be at least 1"));
        }
        for (name, value) in [
            ("sigma_t", self.sigma_t),
            ("d0", self.d0),
            ("tolerance", self.tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.d1.is_finite() && self.d1 >= 0.0) {
            return Err(Error::config(format!(
                "d1 must be non-negative, got {}",
                self.d1
            )));
        }
        if !(self.dc_min.is_finite() && self.dc_max.is_finite()) || self.dc_min <= 0.0 {
            return Err(Error::config(format!(
                "dc bounds must be finite and positive, got [{}, {}]",
                self.dc_min, self.dc_max
            )));
        }
        if self.dc_min >= self.dc_max {
            return Err(Error::config(format!(
                "dc_min ({}) must be smaller than dc_max ({})",
                self.dc_min, self.dc_max
            )));
        }
        if let HitWeighting::HitCount { window } = self.weighting {
            if !(window.is_finite() && window > 0.0) {
                return Err(Error::config(format!(
                    "hit count window must be positive, got {window}"
                )));
            }
        }
        if self.max_calls == 0 {
            return Err(Error::config("max_calls must be at least 1"));
        }
        self.medium.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reduction_defaults() {
        let config = ReductionConfig::default();
        assert_abs_diff_eq!(config.time_window, 10.0);
        assert_abs_diff_eq!(config.min_amplitude, 20.0);
        assert_abs_diff_eq!(config.adjacent_window, 200.0);
        assert_abs_diff_eq!(config.next_adjacent_window, 400.0);
        assert!(config.keep_unmerged);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reduction_builder() {
        let config = ReductionConfig::new()
            .with_time_window(20.0)
            .with_min_amplitude(45.0)
            .with_coincidence_windows(100.0, 300.0)
            .with_keep_unmerged(false);
        assert_abs_diff_eq!(config.time_window, 20.0);
        assert_abs_diff_eq!(config.min_amplitude, 45.0);
        assert_abs_diff_eq!(config.next_adjacent_window, 300.0);
        assert!(!config.keep_unmerged);
    }

    #[test]
    fn test_reduction_rejects_negative_window() {
        let config = ReductionConfig::new().with_time_window(-1.0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_fit_defaults_validate() {
        let config = FitConfig::default();
        assert_eq!(config.min_hits, 4);
        assert_abs_diff_eq!(config.sigma_t, 8.0);
        assert_abs_diff_eq!(config.d0, 50.0);
        assert_abs_diff_eq!(config.d1, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fit_rejects_inverted_dc_bounds() {
        let config = FitConfig::new().with_dc_bounds(100.0, 2.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dc_min"));
    }

    #[test]
    fn test_fit_rejects_bad_medium() {
        let config = FitConfig::new().with_medium(MediumConstants::new(0.9, 0.3));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zenith_conventions() {
        let down = ZenithConvention::ArccosComplement;
        assert_abs_diff_eq!(down.zenith_deg(-1.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(down.zenith_deg(1.0), 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(down.zenith_deg(0.0), 90.0, epsilon = 1e-12);

        let arcsin = ZenithConvention::Arcsin;
        assert_abs_diff_eq!(arcsin.zenith_deg(-1.0), -90.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arcsin.zenith_deg(0.5), 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_path_factor() {
        let medium = MediumConstants::new(1.3797, 0.2256);
        let expected = 1.3797 / (1.3797_f64 * 1.3797 - 1.0).sqrt();
        assert_abs_diff_eq!(medium.path_factor(), expected, epsilon = 1e-12);
    }
}
