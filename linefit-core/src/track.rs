//! Track parameters and fit results.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of free track parameters.
pub const TRACK_PARAMETER_COUNT: usize = 4;

/// Closest-approach description of a track passing near one line.
///
/// A single line cannot resolve the azimuth, so only the vertical
/// direction component is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackParameters {
    /// z component of the unit direction.
    pub uz: f64,
    /// Height of the point of closest approach (m).
    pub zc: f64,
    /// Distance of closest approach to the line (m).
    pub dc: f64,
    /// Time at closest approach (ns).
    pub tc: f64,
}

impl TrackParameters {
    /// Parameter names in vector order.
    pub const NAMES: [&'static str; TRACK_PARAMETER_COUNT] = ["uz", "zc", "dc", "tc"];

    /// Creates a new parameter set.
    #[inline]
    #[must_use]
    pub fn new(uz: f64, zc: f64, dc: f64, tc: f64) -> Self {
        Self { uz, zc, dc, tc }
    }

    /// Parameters as `[uz, zc, dc, tc]`.
    #[inline]
    #[must_use]
    pub fn to_array(&self) -> [f64; TRACK_PARAMETER_COUNT] {
        [self.uz, self.zc, self.dc, self.tc]
    }

    /// Builds parameters from `[uz, zc, dc, tc]`.
    #[inline]
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match *values {
            [uz, zc, dc, tc] => Some(Self { uz, zc, dc, tc }),
            _ => None,
        }
    }
}

/// Result of one converged track fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResult {
    /// Best-fit parameters.
    pub parameters: TrackParameters,
    /// One-sigma parameter uncertainties.
    pub parameter_errors: TrackParameters,
    /// Score at the minimum.
    pub score: f64,
    /// Number of hits used minus the number of parameters.
    pub degrees_of_freedom: i64,
    /// Minimizer validity flag.
    pub is_valid: bool,
    /// Reconstructed zenith in degrees.
    pub reconstructed_zenith_deg: f64,
    /// Estimated distance to minimum reported by the minimizer.
    pub edm: f64,
    /// Number of score evaluations.
    pub function_calls: usize,
}

impl FitResult {
    /// Score per fitted parameter.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn quality(&self) -> f64 {
        self.score / TRACK_PARAMETER_COUNT as f64
    }
}

/// Outcome of processing one event through the fitter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitOutcome {
    /// Too few selected hits; no fit attempted.
    Skipped {
        /// Number of selected hits.
        hits: usize,
    },
    /// The minimizer signalled a numerical failure.
    Failed {
        /// Failure description.
        reason: String,
    },
    /// The minimizer returned a minimum, valid or not.
    Fitted(FitResult),
}

impl FitOutcome {
    /// Returns true if a fit was attempted.
    #[must_use]
    pub fn was_attempted(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    /// Returns the valid fit result, if any.
    #[must_use]
    pub fn valid_result(&self) -> Option<&FitResult> {
        match self {
            Self::Fitted(result) if result.is_valid => Some(result),
            _ => None,
        }
    }
}
