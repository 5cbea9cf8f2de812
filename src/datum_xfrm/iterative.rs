//! Iterative inverse of a forward-only method.
//!
//! Starting from the target point, the guess is corrected by the residual
//! of the forward evaluation until the residual falls below the convergence
//! threshold or the iteration budget is spent:
//!
//! ```text
//! guess_0     = target
//! guess_{k+1} = guess_k + (target - forward(guess_k))
//! ```
//!
//! The correction is a fixed-point step, which converges whenever the shift
//! varies slowly compared to itself, as every grid and regression shift does.

use crate::{constants::LlhPoint, geoframe_errors::GeoframeError};

use super::{IterationControls, Shift};

/// Result of [`iterative_inverse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IterationOutcome {
    /// Residual below `cnvrg_value`.
    Converged(LlhPoint),
    /// Budget spent, residual within `error_value`.
    Loose(LlhPoint),
    /// Budget spent, residual above `error_value`.
    Diverged(LlhPoint),
    /// The forward method has no data at some guess.
    OutOfRange,
}

/// Invert `forward` at `target`.
///
/// Arguments
/// -----------------
/// * `forward`: The forward method.
/// * `target`: The point whose preimage is wanted.
/// * `controls`: Iteration budget and thresholds, in degrees.
///
/// Return
/// ----------
/// * The outcome carrying the last guess; heights are corrected along with
///   the horizontal position.
pub fn iterative_inverse<F>(
    forward: F,
    target: &LlhPoint,
    controls: &IterationControls,
) -> Result<IterationOutcome, GeoframeError>
where
    F: Fn(&LlhPoint) -> Result<Shift, GeoframeError>,
{
    let mut guess = *target;
    let mut residual = f64::INFINITY;

    for _ in 0..controls.max_iterations.max(1) {
        let image = match forward(&guess)? {
            Shift::Shifted(p) => p,
            Shift::OutOfRange => return Ok(IterationOutcome::OutOfRange),
        };
        let d_lng = target[0] - image[0];
        let d_lat = target[1] - image[1];
        guess[0] += d_lng;
        guess[1] += d_lat;
        guess[2] += target[2] - image[2];

        residual = d_lng.abs().max(d_lat.abs());
        if residual < controls.cnvrg_value {
            return Ok(IterationOutcome::Converged(guess));
        }
    }

    if residual <= controls.error_value {
        Ok(IterationOutcome::Loose(guess))
    } else {
        Ok(IterationOutcome::Diverged(guess))
    }
}

#[cfg(test)]
mod test_iterative {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Shift that grows with latitude, 1 arc-second per degree.
    fn sloped(p: &LlhPoint) -> Result<Shift, GeoframeError> {
        Ok(Shift::Shifted([p[0] + 1e-4, p[1] + p[1] / 3600.0, p[2] + 2.0]))
    }

    #[test]
    fn test_converges_on_smooth_shift() {
        let target = [10.0001, 45.0125, 102.0];
        let outcome = iterative_inverse(sloped, &target, &IterationControls::default()).unwrap();
        let IterationOutcome::Converged(p) = outcome else {
            panic!("expected convergence, got {outcome:?}");
        };
        assert_abs_diff_eq!(p[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[1], 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[2], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_budget_exhaustion_classified_by_error_value() {
        let target = [10.0001, 45.0125, 0.0];
        let one_step = IterationControls {
            max_iterations: 1,
            cnvrg_value: 1e-12,
            error_value: 1.0,
        };
        assert!(matches!(
            iterative_inverse(sloped, &target, &one_step).unwrap(),
            IterationOutcome::Loose(_)
        ));

        let strict = IterationControls {
            error_value: 1e-12,
            ..one_step
        };
        assert!(matches!(
            iterative_inverse(sloped, &target, &strict).unwrap(),
            IterationOutcome::Diverged(_)
        ));
    }

    #[test]
    fn test_out_of_range_propagates() {
        let outcome = iterative_inverse(
            |_| Ok(Shift::OutOfRange),
            &[0.0, 0.0, 0.0],
            &IterationControls::default(),
        )
        .unwrap();
        assert_eq!(outcome, IterationOutcome::OutOfRange);
    }
}
