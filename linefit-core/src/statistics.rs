//! Per-run reconstruction statistics.
//!
//! A [`FitStatistics`] accumulator is owned by exactly one worker. Parallel
//! runs give each worker its own accumulator and combine them afterwards with
//! [`FitStatistics::merge`].

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::track::{FitOutcome, FitResult};

/// Names of the recorded series.
pub mod series {
    /// Identifier of the event.
    pub const EVENT_ID: &str = "event_id";
    /// Truth zenith (degrees).
    pub const MC_ZENITH: &str = "mc_zenith";
    /// Reconstructed zenith (degrees).
    pub const RECO_ZENITH: &str = "reco_zenith";
    /// Truth minus reconstructed zenith (degrees).
    pub const ANGULAR_ERROR: &str = "angular_error";
    /// Score at the minimum.
    pub const SCORE: &str = "score";
    /// Score per fitted parameter.
    pub const QUALITY_PARAMETER: &str = "quality_parameter";
    /// Fitted vertical direction component.
    pub const UZ: &str = "uz";
    /// Fitted closest-approach height (m).
    pub const ZC: &str = "zc";
    /// Fitted closest-approach distance (m).
    pub const DC: &str = "dc";
    /// Fitted closest-approach time (ns).
    pub const TC: &str = "tc";
    /// Error on `uz`.
    pub const UZ_ERR: &str = "uz_err";
    /// Error on `zc` (m).
    pub const ZC_ERR: &str = "zc_err";
    /// Error on `dc` (m).
    pub const DC_ERR: &str = "dc_err";
    /// Error on `tc` (ns).
    pub const TC_ERR: &str = "tc_err";
}

/// Fit constants stored alongside the statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitConstants {
    /// Light-yield reference distance (m).
    pub d0: f64,
    /// Light-yield distance offset (m).
    pub d1: f64,
    /// Timing resolution (ns).
    pub sigma_t: f64,
}

impl From<&FitConfig> for FitConstants {
    fn from(config: &FitConfig) -> Self {
        Self {
            d0: config.d0,
            d1: config.d1,
            sigma_t: config.sigma_t,
        }
    }
}

/// Accumulated counters and named value series of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitStatistics {
    /// Events seen.
    pub processed_events: usize,
    /// Events with enough hits to attempt a fit.
    pub attempted_fits: usize,
    /// Attempted fits the minimizer flagged valid.
    pub valid_fits: usize,
    /// Attempted fits aborted by a numerical failure.
    pub failed_fits: usize,
    /// Events skipped for lack of hits.
    pub skipped_events: usize,
    /// Events whose hits could not be resolved against the geometry.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rejected_events: usize,
    /// Constants the run was configured with.
    pub fit_parameters: FitConstants,
    /// Per valid fit values keyed by series name.
    pub series: BTreeMap<String, Vec<f64>>,
}

impl FitStatistics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new(fit_parameters: FitConstants) -> Self {
        Self {
            processed_events: 0,
            attempted_fits: 0,
            valid_fits: 0,
            failed_fits: 0,
            skipped_events: 0,
            rejected_events: 0,
            fit_parameters,
            series: BTreeMap::new(),
        }
    }

    /// Creates an empty accumulator for `config`.
    #[must_use]
    pub fn for_config(config: &FitConfig) -> Self {
        Self::new(FitConstants::from(config))
    }

    /// Appends a value to a named series.
    pub fn save(&mut self, name: &str, value: f64) {
        self.series.entry(name.to_string()).or_default().push(value);
    }

    /// Values of a named series (empty if never saved).
    #[must_use]
    pub fn values(&self, name: &str) -> &[f64] {
        self.series.get(name).map_or(&[], Vec::as_slice)
    }

    /// Accounts one processed event.
    ///
    /// `true_zenith` is the truth zenith in degrees under the same
    /// convention as the fit; truth series are only filled when present.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, event_id: u64, outcome: &FitOutcome, true_zenith: Option<f64>) {
        self.processed_events += 1;
        match outcome {
            FitOutcome::Skipped { .. } => self.skipped_events += 1,
            FitOutcome::Failed { .. } => {
                self.attempted_fits += 1;
                self.failed_fits += 1;
            }
            FitOutcome::Fitted(result) => {
                self.attempted_fits += 1;
                if result.is_valid {
                    self.valid_fits += 1;
                    self.save(series::EVENT_ID, event_id as f64);
                    self.save_result(result, true_zenith);
                }
            }
        }
    }

    fn save_result(&mut self, result: &FitResult, true_zenith: Option<f64>) {
        let reco = result.reconstructed_zenith_deg;
        if let Some(mc) = true_zenith {
            self.save(series::MC_ZENITH, mc);
            self.save(series::ANGULAR_ERROR, mc - reco);
        }
        self.save(series::RECO_ZENITH, reco);
        self.save(series::SCORE, result.score);
        self.save(series::QUALITY_PARAMETER, result.quality());

        let values = result.parameters;
        let errors = result.parameter_errors;
        self.save(series::UZ, values.uz);
        self.save(series::ZC, values.zc);
        self.save(series::DC, values.dc);
        self.save(series::TC, values.tc);
        self.save(series::UZ_ERR, errors.uz);
        self.save(series::ZC_ERR, errors.zc);
        self.save(series::DC_ERR, errors.dc);
        self.save(series::TC_ERR, errors.tc);
    }

    /// Accounts an event that never reached the fit.
    pub fn reject(&mut self) {
        self.processed_events += 1;
        self.rejected_events += 1;
    }

    /// Folds another accumulator into this one.
    ///
    /// Counters are summed and series concatenated (`self` first).
    pub fn merge(&mut self, other: Self) {
        self.processed_events += other.processed_events;
        self.attempted_fits += other.attempted_fits;
        self.valid_fits += other.valid_fits;
        self.failed_fits += other.failed_fits;
        self.skipped_events += other.skipped_events;
        self.rejected_events += other.rejected_events;
        for (name, values) in other.series {
            self.series.entry(name).or_default().extend(values);
        }
    }

    /// Fraction of attempted fits that were valid.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn valid_fraction(&self) -> Option<f64> {
        (self.attempted_fits > 0).then(|| self.valid_fits as f64 / self.attempted_fits as f64)
    }

    /// Median of `|angular_error|`, if any truth was recorded.
    #[must_use]
    pub fn median_angular_error(&self) -> Option<f64> {
        let mut errors: Vec<f64> = self
            .values(series::ANGULAR_ERROR)
            .iter()
            .map(|e| e.abs())
            .collect();
        if errors.is_empty() {
            return None;
        }
        errors.sort_by(f64::total_cmp);
        let mid = errors.len() / 2;
        Some(if errors.len() % 2 == 0 {
            (errors[mid - 1] + errors[mid]) / 2.0
        } else {
            errors[mid]
        })
    }
}

impl Default for FitStatistics {
    fn default() -> Self {
        Self::for_config(&FitConfig::default())
    }
}
