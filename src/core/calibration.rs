//! Bias correction and confidence intervals for judge-scored accuracy.
//!
//! With judge specificity `q0` and sensitivity `q1`, the judged-correct rate
//! has expectation `(q0 + q1 - 1) * theta + (1 - q0)`. Inverting that line
//! gives the corrected accuracy; the interval propagates the sampling error
//! of `p`, `q0` and `q1` after add-z²/add-two smoothing.

use crate::domain::model::{AccuracyEstimate, EstimateInput, Interval};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{validate_open_unit, validate_probability};
use statrs::distribution::{ContinuousCDF, Normal};

/// Below this |q0 + q1 - 1| the correction is undefined.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

pub fn clip(x: f64, low: f64, high: f64) -> f64 {
    low.max(high.min(x))
}

pub fn clip_unit(x: f64) -> f64 {
    clip(x, 0.0, 1.0)
}

/// Expected judged-correct rate for true accuracy `theta`.
pub fn expected_observed_rate(theta: f64, q0: f64, q1: f64) -> f64 {
    (q0 + q1 - 1.0) * theta + (1.0 - q0)
}

/// Accuracy at which the raw rate is unbiased. Below it the judge
/// overestimates, above it underestimates. `None` for a perfect judge.
pub fn bias_turning_point(q0: f64, q1: f64) -> Option<f64> {
    let denominator = 2.0 - q0 - q1;
    if denominator.abs() < DEGENERATE_TOLERANCE {
        return None;
    }
    Some((1.0 - q0) / denominator)
}

/// Two-sided standard normal critical value, Φ⁻¹(1 - α/2).
pub fn z_critical(alpha: f64) -> Result<f64> {
    validate_open_unit("alpha", alpha)?;
    let normal = Normal::new(0.0, 1.0).map_err(|e| ReportError::ProcessingError {
        message: format!("standard normal: {}", e),
    })?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

fn check_rates(p: f64, q0: f64, q1: f64) -> Result<()> {
    validate_probability("p", p)?;
    validate_probability("q0", q0)?;
    validate_probability("q1", q1)?;
    Ok(())
}

/// Bias-corrected accuracy, clipped to [0, 1].
pub fn point_estimator(p: f64, q0: f64, q1: f64) -> Result<f64> {
    check_rates(p, q0, q1)?;
    let youden = q0 + q1 - 1.0;
    if youden.abs() < DEGENERATE_TOLERANCE {
        return Err(ReportError::DegenerateJudgeError { q0, q1 });
    }
    Ok(clip_unit((p + q0 - 1.0) / youden))
}

/// Confidence interval for the corrected accuracy at level `1 - alpha`.
///
/// `n` is the test-set size; `m0`/`m1` are the numbers of truly incorrect and
/// truly correct calibration items `q0`/`q1` were measured on.
pub fn confidence_interval(
    p: f64,
    q0: f64,
    q1: f64,
    n: u64,
    m0: u64,
    m1: u64,
    alpha: f64,
) -> Result<Interval> {
    check_rates(p, q0, q1)?;
    if n == 0 {
        return Err(ReportError::invalid_argument("n", "test set size must be positive"));
    }
    let z = z_critical(alpha)?;
    let z2 = z * z;

    let (n, m0, m1) = (n as f64, m0 as f64, m1 as f64);
    let p = (n * p + z2 / 2.0) / (n + z2);
    let q0 = (m0 * q0 + 1.0) / (m0 + 2.0);
    let q1 = (m1 * q1 + 1.0) / (m1 + 2.0);
    let n = n + z2;
    let m0 = m0 + 2.0;
    let m1 = m1 + 2.0;

    let youden = q0 + q1 - 1.0;
    if youden.abs() < DEGENERATE_TOLERANCE {
        return Err(ReportError::DegenerateJudgeError { q0, q1 });
    }

    let theta = (p + q0 - 1.0) / youden;
    let var_q0 = q0 * (1.0 - q0) / m0;
    let var_q1 = q1 * (1.0 - q1) / m1;
    let shift = 2.0 * z2 * (-(1.0 - theta) * var_q0 + theta * var_q1);
    let se = (p * (1.0 - p) / n + (1.0 - theta).powi(2) * var_q0 + theta.powi(2) * var_q1)
        .sqrt()
        / youden.abs();

    let center = theta + shift;
    Ok(Interval::new(
        clip_unit(center - z * se),
        clip_unit(center + z * se),
    ))
}

/// Wald interval for the raw judged-correct rate.
pub fn naive_interval(p: f64, n: u64, alpha: f64) -> Result<Interval> {
    validate_probability("p", p)?;
    if n == 0 {
        return Err(ReportError::invalid_argument("n", "test set size must be positive"));
    }
    let z = z_critical(alpha)?;
    let se = (p * (1.0 - p) / n as f64).sqrt();
    Ok(Interval::new(clip_unit(p - z * se), clip_unit(p + z * se)))
}

pub fn estimate(input: &EstimateInput, alpha: f64) -> Result<AccuracyEstimate> {
    let corrected = point_estimator(input.p_hat, input.q0, input.q1)?;
    let interval = confidence_interval(
        input.p_hat,
        input.q0,
        input.q1,
        input.n,
        input.m0,
        input.m1,
        alpha,
    )?;
    let naive_interval = naive_interval(input.p_hat, input.n, alpha)?;

    tracing::debug!(
        "p_hat={:.4} q0={:.4} q1={:.4} -> theta_hat={:.4} CI=[{:.4}, {:.4}]",
        input.p_hat,
        input.q0,
        input.q1,
        corrected,
        interval.lower,
        interval.upper
    );

    Ok(AccuracyEstimate {
        observed: input.p_hat,
        corrected,
        interval,
        naive_interval,
        alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_z_critical_matches_normal_table() {
        assert_abs_diff_eq!(z_critical(0.05).unwrap(), 1.959964, epsilon = 1e-5);
        assert_abs_diff_eq!(z_critical(0.10).unwrap(), 1.644854, epsilon = 1e-5);
        assert!(z_critical(0.0).is_err());
        assert!(z_critical(1.0).is_err());
    }

    #[test]
    fn test_point_estimator_inverts_expected_rate() {
        for &theta in &[0.0, 0.1, 0.35, 0.5, 0.8, 1.0] {
            let p = expected_observed_rate(theta, 0.7, 0.9);
            assert_abs_diff_eq!(point_estimator(p, 0.7, 0.9).unwrap(), theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_point_estimator_known_value_and_clipping() {
        assert_abs_diff_eq!(point_estimator(0.5, 0.7, 0.9).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
        // below the false-positive floor 1 - q0
        assert_eq!(point_estimator(0.1, 0.7, 0.9).unwrap(), 0.0);
        // above the sensitivity ceiling
        assert_eq!(point_estimator(0.99, 0.7, 0.9).unwrap(), 1.0);
    }

    #[test]
    fn test_point_estimator_rejects_coin_flip_judge() {
        let err = point_estimator(0.5, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, ReportError::DegenerateJudgeError { .. }));
    }

    #[test]
    fn test_worse_than_random_judge_is_still_inverted() {
        // q0 + q1 < 1: labels are anti-correlated but informative
        let theta = 0.3;
        let p = expected_observed_rate(theta, 0.2, 0.3);
        assert_abs_diff_eq!(point_estimator(p, 0.2, 0.3).unwrap(), theta, epsilon = 1e-12);
    }

    #[test]
    fn test_point_estimator_rejects_out_of_range_rates() {
        assert!(point_estimator(1.2, 0.7, 0.9).is_err());
        assert!(point_estimator(0.5, -0.1, 0.9).is_err());
    }

    #[test]
    fn test_turning_point() {
        assert_abs_diff_eq!(bias_turning_point(0.7, 0.9).unwrap(), 0.75, epsilon = 1e-12);
        let p = expected_observed_rate(0.75, 0.7, 0.9);
        assert_abs_diff_eq!(p, 0.75, epsilon = 1e-12);
        assert!(bias_turning_point(1.0, 1.0).is_none());
    }

    #[test]
    fn test_interval_brackets_estimate() {
        let interval = confidence_interval(0.6, 0.7, 0.9, 1000, 500, 500, 0.05).unwrap();
        let theta_hat = point_estimator(0.6, 0.7, 0.9).unwrap();
        assert!(interval.lower < theta_hat && theta_hat < interval.upper);
        assert!(interval.length() > 0.05 && interval.length() < 0.2);
    }

    #[test]
    fn test_interval_shrinks_with_more_calibration() {
        let small = confidence_interval(0.6, 0.7, 0.9, 100_000, 100, 100, 0.05).unwrap();
        let large = confidence_interval(0.6, 0.7, 0.9, 100_000, 10_000, 10_000, 0.05).unwrap();
        assert!(large.length() < small.length());
    }

    #[test]
    fn test_interval_is_wider_than_naive() {
        let corrected = confidence_interval(0.6, 0.7, 0.9, 1000, 500, 500, 0.05).unwrap();
        let naive = naive_interval(0.6, 1000, 0.05).unwrap();
        assert!(corrected.length() > naive.length());
    }

    #[test]
    fn test_interval_stays_in_unit_range() {
        for &p in &[0.0, 0.05, 0.3, 0.95, 1.0] {
            let interval = confidence_interval(p, 0.7, 0.9, 50, 10, 10, 0.05).unwrap();
            assert!(0.0 <= interval.lower && interval.lower <= interval.upper);
            assert!(interval.upper <= 1.0);
        }
    }

    #[test]
    fn test_interval_accepts_empty_calibration_class() {
        let interval = confidence_interval(0.6, 0.7, 0.9, 1000, 0, 500, 0.05).unwrap();
        assert!(interval.length() > 0.0);
        assert!(confidence_interval(0.6, 0.7, 0.9, 0, 10, 10, 0.05).is_err());
    }

    #[test]
    fn test_naive_interval() {
        let interval = naive_interval(0.5, 100, 0.05).unwrap();
        assert_abs_diff_eq!(interval.lower, 0.5 - 1.959964 * 0.05, epsilon = 1e-5);
        assert_abs_diff_eq!(interval.upper, 0.5 + 1.959964 * 0.05, epsilon = 1e-5);
        let degenerate = naive_interval(0.0, 100, 0.05).unwrap();
        assert_eq!(degenerate, Interval::new(0.0, 0.0));
    }

    #[test]
    fn test_estimate_combines_parts() {
        let input = EstimateInput {
            p_hat: 0.6,
            q0: 0.7,
            q1: 0.9,
            n: 1000,
            m0: 500,
            m1: 500,
        };
        let estimate = estimate(&input, 0.05).unwrap();
        assert_eq!(estimate.observed, 0.6);
        assert_abs_diff_eq!(estimate.corrected, 0.5, epsilon = 1e-12);
        assert!(estimate.interval.contains(0.5));
        assert!(estimate.naive_interval.contains(0.6));
        assert!(!estimate.naive_interval.contains(0.5));
    }
}
