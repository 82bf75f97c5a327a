//! Poisson intervals and pulls for single bins.

use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use statrs::function::gamma;

/// Coverage of the central intervals, the usual one-sigma approximation.
pub const ONE_SIGMA: f64 = 0.6827;

const MAX_ITERATIONS: usize = 1024;
const RELATIVE_TOLERANCE: f64 = 1e-12;

/// Asymmetric uncertainty of a central value. Both components are non-negative magnitudes.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Uncertainty {
    /// Distance from the central value to the upper edge.
    pub up: f64,
    /// Distance from the central value to the lower edge.
    pub down: f64,
}

impl Uncertainty {
    /// Constructor.
    #[must_use]
    pub const fn new(up: f64, down: f64) -> Self {
        Self { up, down }
    }
}

fn lower_regularized(shape: f64, x: f64) -> Result<f64> {
    if x <= 0.0 {
        return Ok(0.0);
    }

    gamma::checked_gamma_lr(shape, x).map_err(|err| Error::Statistics(err.to_string()))
}

fn upper_regularized(shape: f64, x: f64) -> Result<f64> {
    if x <= 0.0 {
        return Ok(1.0);
    }

    gamma::checked_gamma_ur(shape, x).map_err(|err| Error::Statistics(err.to_string()))
}

fn check_arguments(probability: f64, shape: f64) -> Result<()> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(Error::Statistics(format!(
            "probability {probability} is outside of (0, 1)"
        )));
    }

    if !(shape > 0.0 && shape.is_finite()) {
        return Err(Error::Statistics(format!(
            "shape parameter {shape} is not positive and finite"
        )));
    }

    Ok(())
}

/// Finds `x` with `f(x) = target` for a monotonically increasing (`increasing = true`) or
/// decreasing function `f` on `[0, inf)`.
fn invert<F>(f: F, target: f64, increasing: bool) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    // `true` if the root lies to the right of `x`
    let right_of = |x: f64| -> Result<bool> {
        let value = f(x)?;
        Ok(if increasing {
            value < target
        } else {
            value > target
        })
    };

    let mut low = 0.0;
    let mut high = 1.0;
    let mut iterations = 0;

    while right_of(high)? {
        low = high;
        high *= 2.0;
        iterations += 1;

        if iterations == MAX_ITERATIONS {
            return Err(Error::Statistics(format!(
                "could not bracket the quantile for target {target}"
            )));
        }
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (low + high);

        if right_of(mid)? {
            low = mid;
        } else {
            high = mid;
        }

        if high - low <= RELATIVE_TOLERANCE * high {
            break;
        }
    }

    Ok(0.5 * (low + high))
}

/// Quantile of the gamma distribution with unit scale: the `x` for which the lower tail
/// probability equals `probability`.
///
/// # Errors
///
/// Returns an error if `probability` is not in `(0, 1)` or `shape` is not positive.
pub fn gamma_quantile(probability: f64, shape: f64) -> Result<f64> {
    check_arguments(probability, shape)?;
    invert(|x| lower_regularized(shape, x), probability, true)
}

/// Complementary quantile of the gamma distribution with unit scale: the `x` for which the
/// upper tail probability equals `probability`.
///
/// # Errors
///
/// Returns an error if `probability` is not in `(0, 1)` or `shape` is not positive.
pub fn gamma_quantile_c(probability: f64, shape: f64) -> Result<f64> {
    check_arguments(probability, shape)?;
    invert(|x| upper_regularized(shape, x), probability, false)
}

/// Central [`ONE_SIGMA`] confidence interval `(low, high)` of a Poisson mean given `count`
/// observed events. `count` may be non-integer, which is used for expected yields.
///
/// # Errors
///
/// Returns an error if `count` is negative or not finite.
pub fn poisson_interval(count: f64) -> Result<(f64, f64)> {
    if !(count >= 0.0 && count.is_finite()) {
        return Err(Error::Statistics(format!(
            "count {count} is not a non-negative number"
        )));
    }

    let alpha = 1.0 - ONE_SIGMA;
    let low = if count == 0.0 {
        0.0
    } else {
        gamma_quantile(0.5 * alpha, count)?
    };
    let high = gamma_quantile_c(0.5 * alpha, count + 1.0)?;

    Ok((low, high))
}

/// Poisson errors of `count`, see [`poisson_interval`].
///
/// # Errors
///
/// See [`poisson_interval`].
pub fn poisson_errors(count: f64) -> Result<Uncertainty> {
    let (low, high) = poisson_interval(count)?;

    Ok(Uncertainty::new(high - count, count - low))
}

/// Pull of `observed` against `expected`. Both values are combined using inverse-variance
/// weights, and the residual of `observed` with respect to the combination is divided by its
/// standard deviation. The result equals `(observed - expected) / hypot(observed_error,
/// expected_error)`.
///
/// # Errors
///
/// Returns an error if one of the errors is zero or not finite.
pub fn combined_pull(
    observed: f64,
    observed_error: f64,
    expected: f64,
    expected_error: f64,
) -> Result<f64> {
    for (what, error) in [("observed", observed_error), ("expected", expected_error)] {
        if !(error.is_finite() && error > 0.0) {
            return Err(Error::Statistics(format!(
                "{what} uncertainty {error} must be positive and finite"
            )));
        }
    }

    let weight_observed = observed_error.powi(-2);
    let weight_expected = expected_error.powi(-2);
    let weight_sum = weight_observed + weight_expected;

    let combined_error = weight_sum.sqrt().recip();
    let combined = expected.mul_add(weight_expected, observed * weight_observed) / weight_sum;
    let residual_error = observed_error
        .mul_add(observed_error, -combined_error.powi(2))
        .sqrt();

    Ok((observed - combined) / residual_error)
}

/// Pull of `observed` against `expected` using the errors that face each other: if
/// `below` is `true`, the observation lies below the expectation and the upward error of the
/// observation is combined with the downward error of the expectation. Otherwise the
/// opposite sides are used.
///
/// # Errors
///
/// See [`combined_pull`].
pub fn facing_pull(
    observed: f64,
    observed_error: Uncertainty,
    expected: f64,
    expected_error: Uncertainty,
    below: bool,
) -> Result<f64> {
    let (observed_error, expected_error) = if below {
        (observed_error.up, expected_error.down)
    } else {
        (observed_error.down, expected_error.up)
    };

    combined_pull(observed, observed_error, expected, expected_error)
}
