//! Bounded nonlinear minimization.
//!
//! [`VariableMetric`] is a quasi-Newton minimizer in the style of Migrad:
//! the inverse Hessian is built up with rank-two BFGS updates from
//! central-difference gradients. Once the estimated distance to the minimum
//! (EDM, `g·V·g / 2`) drops below `0.002 · tolerance`, the full Hessian is
//! computed numerically and the EDM is recomputed with its inverse; the
//! minimum is accepted only if that estimate is also below the threshold.
//! Otherwise the search continues from the Hessian metric.
//!
//! Doubly bounded parameters are mapped to an unbounded internal variable
//! with the sine transform `v = lo + (hi - lo) (sin x + 1) / 2`, so the
//! score is never evaluated outside the bounds.

use nalgebra::{DMatrix, DVector};

use crate::error::{FitError, Result};

const EDM_SCALE: f64 = 0.002;
const ARMIJO: f64 = 1e-4;
const LINE_SEARCH_TRIES: usize = 30;
const GRADIENT_STEP: f64 = 1e-5;
const MIN_CURVATURE: f64 = 1e-300;
const HESSIAN_STEP: f64 = 1e-4;
const MAX_HESSIAN_CHECKS: usize = 5;
const POS_DEF_EPS: f64 = 1e-6;
const POS_DEF_SHIFT: f64 = 1e-3;
const SADDLE_STEPS: [f64; 4] = [1.0, 0.5, 0.25, 0.125];

/// Description of one minimization parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Name used in diagnostics.
    pub name: String,
    /// Starting value.
    pub start: f64,
    /// Initial step size in external units.
    pub step: f64,
    /// Optional inclusive `(lower, upper)` limits.
    pub bounds: Option<(f64, f64)>,
}

impl ParameterSpec {
    /// Creates an unbounded parameter.
    pub fn new(name: impl Into<String>, start: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            start,
            step,
            bounds: None,
        }
    }

    /// Restricts the parameter to `[lower, upper]`.
    #[must_use]
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.bounds = Some((lower, upper));
        self
    }

    fn transform(&self) -> Result<Transform> {
        let invalid = |reason: String| FitError::InvalidParameter {
            name: self.name.clone(),
            reason,
        };
        if !self.start.is_finite() {
            return Err(invalid(format!("start value {} is not finite", self.start)));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(invalid(format!("step {} must be positive", self.step)));
        }
        match self.bounds {
            None => Ok(Transform::Free),
            Some((lower, upper)) if lower.is_finite() && upper.is_finite() && lower < upper => {
                Ok(Transform::Bounded { lower, upper })
            }
            Some((lower, upper)) => Err(invalid(format!("empty bounds [{lower}, {upper}]"))),
        }
    }
}

/// Minimum found by a [`Minimizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Parameter values at the minimum.
    pub values: Vec<f64>,
    /// Parabolic one-sigma errors from the inverse Hessian.
    pub errors: Vec<f64>,
    /// Function value at the minimum.
    pub fval: f64,
    /// Estimated distance to the minimum.
    pub edm: f64,
    /// Number of function evaluations.
    pub calls: usize,
    /// True when the convergence criterion was met.
    pub is_valid: bool,
}

/// A bounded minimizer of scalar functions.
pub trait Minimizer {
    /// Minimizes `f` over the given parameters.
    ///
    /// Returning `Ok` with `is_valid == false` means the search ran but did
    /// not converge; `Err` signals that no meaningful minimum exists.
    fn minimize<F>(&self, f: F, parameters: &[ParameterSpec]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64;
}

#[derive(Debug, Clone, Copy)]
enum Transform {
    Free,
    Bounded { lower: f64, upper: f64 },
}

impl Transform {
    fn to_internal(self, value: f64) -> f64 {
        match self {
            Self::Free => value,
            Self::Bounded { lower, upper } => {
                (2.0 * (value - lower) / (upper - lower) - 1.0).clamp(-1.0, 1.0).asin()
            }
        }
    }

    fn to_external(self, x: f64) -> f64 {
        match self {
            Self::Free => x,
            Self::Bounded { lower, upper } => {
                (lower + (upper - lower) * 0.5 * (x.sin() + 1.0)).clamp(lower, upper)
            }
        }
    }

    /// d(external) / d(internal).
    fn derivative(self, x: f64) -> f64 {
        match self {
            Self::Free => 1.0,
            Self::Bounded { lower, upper } => (upper - lower) * 0.5 * x.cos(),
        }
    }
}

/// The score seen in internal coordinates, counting evaluations.
struct Objective<F> {
    f: F,
    transforms: Vec<Transform>,
    external: Vec<f64>,
    calls: usize,
}

impl<F: Fn(&[f64]) -> f64> Objective<F> {
    fn new(f: F, transforms: Vec<Transform>) -> Self {
        let external = vec![0.0; transforms.len()];
        Self {
            f,
            transforms,
            external,
            calls: 0,
        }
    }

    fn to_external(&self, x: &DVector<f64>) -> Vec<f64> {
        self.transforms
            .iter()
            .zip(x.iter())
            .map(|(t, &xi)| t.to_external(xi))
            .collect()
    }

    fn eval(&mut self, x: &DVector<f64>) -> f64 {
        self.calls += 1;
        for ((slot, t), &xi) in self.external.iter_mut().zip(&self.transforms).zip(x.iter()) {
            *slot = t.to_external(xi);
        }
        (self.f)(&self.external)
    }

    /// Central-difference first and second derivatives at `x`.
    fn gradient(
        &mut self,
        x: &DVector<f64>,
        fx: f64,
        steps: &DVector<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>)> {
        let n = x.len();
        let mut first = DVector::zeros(n);
        let mut second = DVector::zeros(n);
        let mut shifted = x.clone();
        for i in 0..n {
            let h = steps[i];
            shifted[i] = x[i] + h;
            let plus = self.eval(&shifted);
            shifted[i] = x[i] - h;
            let minus = self.eval(&shifted);
            shifted[i] = x[i];
            first[i] = (plus - minus) / (2.0 * h);
            second[i] = (plus + minus - 2.0 * fx) / (h * h);
        }
        if first.iter().any(|g| !g.is_finite()) {
            return Err(FitError::NumericalFailure(format!(
                "non-finite gradient at {:?}",
                self.to_external(x)
            )));
        }
        Ok((first, second))
    }

    fn eval_shifted(&mut self, x: &DVector<f64>, shifts: &[(usize, f64)]) -> f64 {
        let mut shifted = x.clone();
        for &(i, delta) in shifts {
            shifted[i] += delta;
        }
        self.eval(&shifted)
    }

    /// Full central-difference Hessian at `x`.
    fn hessian(&mut self, x: &DVector<f64>, fx: f64) -> Result<DMatrix<f64>> {
        let n = x.len();
        let steps = x.map(|xi| HESSIAN_STEP * xi.abs().max(1.0));
        let mut hessian = DMatrix::zeros(n, n);
        for i in 0..n {
            let hi = steps[i];
            let plus = self.eval_shifted(x, &[(i, hi)]);
            let minus = self.eval_shifted(x, &[(i, -hi)]);
            hessian[(i, i)] = (plus + minus - 2.0 * fx) / (hi * hi);
            for j in 0..i {
                let hj = steps[j];
                let value = (self.eval_shifted(x, &[(i, hi), (j, hj)])
                    - self.eval_shifted(x, &[(i, hi), (j, -hj)])
                    - self.eval_shifted(x, &[(i, -hi), (j, hj)])
                    + self.eval_shifted(x, &[(i, -hi), (j, -hj)]))
                    / (4.0 * hi * hj);
                hessian[(i, j)] = value;
                hessian[(j, i)] = value;
            }
        }
        if hessian.iter().any(|h| !h.is_finite()) {
            return Err(FitError::NumericalFailure(format!(
                "non-finite Hessian at {:?}",
                self.to_external(x)
            )));
        }
        Ok(hessian)
    }

    /// Steps off a saddle point along `direction`, trying both signs.
    fn leave_saddle(
        &mut self,
        x: &DVector<f64>,
        fx: f64,
        direction: &DVector<f64>,
    ) -> Option<(DVector<f64>, f64)> {
        for length in SADDLE_STEPS {
            for sign in [1.0, -1.0] {
                let candidate = x + direction * (sign * length);
                let value = self.eval(&candidate);
                if value < fx {
                    return Some((candidate, value));
                }
            }
        }
        None
    }
}

/// Inverse of a numerical Hessian, made positive definite.
struct Curvature {
    inverse: DMatrix<f64>,
    /// Direction of negative curvature, present at a saddle point.
    descent: Option<DVector<f64>>,
}

impl Curvature {
    /// Works on the Hessian scaled to unit diagonal. Eigenvalues at or below
    /// `POS_DEF_EPS` are lifted by a common shift before inverting.
    fn from_hessian(hessian: &DMatrix<f64>) -> Self {
        let n = hessian.nrows();
        let scale = DVector::from_fn(n, |i, _| {
            let d = hessian[(i, i)];
            if d > 0.0 {
                1.0 / d.sqrt()
            } else {
                1.0
            }
        });
        let scaled = DMatrix::from_fn(n, n, |i, j| hessian[(i, j)] * scale[i] * scale[j]);
        let eigen = scaled.symmetric_eigen();

        let (lowest_index, lowest) = eigen
            .eigenvalues
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |low, (i, l)| if l < low.1 { (i, l) } else { low });
        let highest = eigen.eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let q = &eigen.eigenvectors;
        let descent = (lowest < -POS_DEF_EPS)
            .then(|| DVector::from_fn(n, |i, _| q[(i, lowest_index)] * scale[i]));
        let shift = if lowest <= POS_DEF_EPS {
            POS_DEF_SHIFT * highest.max(1.0) - lowest
        } else {
            0.0
        };
        let inverse_eigenvalues = eigen.eigenvalues.map(|l| 1.0 / (l + shift));
        let inner = q * DMatrix::from_diagonal(&inverse_eigenvalues) * q.transpose();
        let inverse = DMatrix::from_fn(n, n, |i, j| inner[(i, j)] * scale[i] * scale[j]);
        Self { inverse, descent }
    }
}

/// Migrad-style variable metric minimizer.
#[derive(Debug, Clone)]
pub struct VariableMetric {
    tolerance: f64,
    max_calls: usize,
}

impl Default for VariableMetric {
    fn default() -> Self {
        Self {
            tolerance: 1.0,
            max_calls: 2000,
        }
    }
}

impl VariableMetric {
    /// Creates a minimizer with the given tolerance and call budget.
    #[must_use]
    pub fn new(tolerance: f64, max_calls: usize) -> Self {
        Self {
            tolerance,
            max_calls,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of function evaluations.
    #[must_use]
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    /// Convergence threshold on the EDM.
    #[must_use]
    pub fn edm_threshold(&self) -> f64 {
        EDM_SCALE * self.tolerance
    }
}

/// Inverse of the diagonal curvature, falling back to the squared step.
fn diagonal_metric(curvature: &DVector<f64>, steps: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_diagonal(&curvature.zip_map(steps, |c, h| if c > 0.0 { 1.0 / c } else { h * h }))
}

impl Minimizer for VariableMetric {
    fn minimize<F>(&self, f: F, parameters: &[ParameterSpec]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        if parameters.is_empty() {
            return Err(FitError::NumericalFailure("no parameters to minimize".into()));
        }
        let transforms = parameters
            .iter()
            .map(ParameterSpec::transform)
            .collect::<Result<Vec<_>>>()?;

        let n = parameters.len();
        let mut x = DVector::from_iterator(
            n,
            parameters
                .iter()
                .zip(&transforms)
                .map(|(p, t)| t.to_internal(p.start)),
        );
        let initial_steps = DVector::from_iterator(
            n,
            parameters.iter().zip(&transforms).zip(x.iter()).map(|((p, t), &xi)| {
                let scale = t.derivative(xi).abs();
                if scale > 1e-8 {
                    p.step / scale
                } else {
                    p.step
                }
            }),
        );

        let mut objective = Objective::new(f, transforms);
        let mut fx = objective.eval(&x);
        if !fx.is_finite() {
            return Err(FitError::NonFiniteStart { value: fx });
        }
        let (mut g, mut g2) = objective.gradient(&x, fx, &initial_steps)?;
        let mut v = diagonal_metric(&g2, &initial_steps);

        let edm_max = self.edm_threshold();
        let mut edm = f64::INFINITY;
        let mut hessian_checks = 0;
        while objective.calls < self.max_calls {
            let mut step = -(&v * &g);
            let mut slope = g.dot(&step);
            if slope >= 0.0 {
                // Not a descent direction: restart from the diagonal metric.
                v = diagonal_metric(&g2, &initial_steps);
                step = -(&v * &g);
                slope = g.dot(&step);
            }
            edm = -0.5 * slope;
            if edm < edm_max {
                let curvature = Curvature::from_hessian(&objective.hessian(&x, fx)?);
                edm = 0.5 * g.dot(&(&curvature.inverse * &g));
                if curvature.descent.is_none() && edm < edm_max {
                    return Ok(finish(&objective, &x, fx, &curvature.inverse, edm, true));
                }
                hessian_checks += 1;
                log::debug!(
                    "Hessian check {hessian_checks} rejected the minimum (edm {edm:e}, saddle {})",
                    curvature.descent.is_some()
                );
                if hessian_checks > MAX_HESSIAN_CHECKS {
                    return Ok(finish(&objective, &x, fx, &curvature.inverse, edm, false));
                }
                v = curvature.inverse;
                if let Some(direction) = curvature.descent {
                    let Some((next, next_value)) = objective.leave_saddle(&x, fx, &direction)
                    else {
                        return Ok(finish(&objective, &x, fx, &v, edm, false));
                    };
                    let steps = next.map(|xi| GRADIENT_STEP * xi.abs().max(1.0));
                    (g, g2) = objective.gradient(&next, next_value, &steps)?;
                    x = next;
                    fx = next_value;
                }
                continue;
            }

            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..LINE_SEARCH_TRIES {
                let candidate = &x + &step * alpha;
                let value = objective.eval(&candidate);
                if value <= fx + ARMIJO * alpha * slope {
                    accepted = Some((candidate, value));
                    break;
                }
                let parabolic = -slope * alpha * alpha / (2.0 * (value - fx - slope * alpha));
                alpha = parabolic.min(0.5 * alpha).max(0.1 * alpha);
            }
            let Some((next, next_value)) = accepted else {
                log::debug!("line search failed after {} calls (edm {edm:e})", objective.calls);
                return Ok(finish(&objective, &x, fx, &v, edm, false));
            };

            let steps = next.map(|xi| GRADIENT_STEP * xi.abs().max(1.0));
            let (next_g, next_g2) = objective.gradient(&next, next_value, &steps)?;

            let dx = &next - &x;
            let dg = &next_g - &g;
            let dy = dx.dot(&dg);
            if dy > MIN_CURVATURE {
                let vdg = &v * &dg;
                let gvg = dg.dot(&vdg);
                v += &dx * dx.transpose() * ((dy + gvg) / (dy * dy))
                    - (&vdg * dx.transpose() + &dx * vdg.transpose()) / dy;
            }

            x = next;
            fx = next_value;
            g = next_g;
            g2 = next_g2;
        }

        log::debug!("call limit {} reached (edm {edm:e})", self.max_calls);
        Ok(finish(&objective, &x, fx, &v, edm, false))
    }
}

fn finish<F: Fn(&[f64]) -> f64>(
    objective: &Objective<F>,
    x: &DVector<f64>,
    fval: f64,
    v: &DMatrix<f64>,
    edm: f64,
    is_valid: bool,
) -> Minimum {
    let errors = objective
        .transforms
        .iter()
        .zip(x.iter())
        .enumerate()
        .map(|(i, (t, &xi))| (2.0 * v[(i, i)]).max(0.0).sqrt() * t.derivative(xi).abs())
        .collect();
    Minimum {
        values: objective.to_external(x),
        errors,
        fval,
        edm,
        calls: objective.calls,
        is_valid,
    }
}
