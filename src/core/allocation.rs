//! Splitting a calibration budget between truly-incorrect (m0) and
//! truly-correct (m1) items so the corrected interval is as short as possible.
//!
//! The optimal ratio is `m0 / m1 ≈ (1/p - 1) * sqrt(kappa)` with
//! `kappa = (1 - q0) / (1 - q1)`, estimated from pilot samples when available.

use crate::domain::model::{Allocation, AllocationPlan, CalibrationSummary};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::validate_probability;

pub(crate) const EPS: f64 = 1e-6;

/// Allocate `m` calibration samples given the judged-correct rate `p`.
///
/// `m_pilot` samples per class have already been collected; both sides of
/// the result keep at least that many.
pub fn allocate_calibration_sample(
    m: u64,
    p: f64,
    q0_pilot: f64,
    q1_pilot: f64,
    m_pilot: u64,
) -> Result<Allocation> {
    if m_pilot == 0 && p >= EPS {
        warn_pilotless_kappa();
    }
    split_budget(m, p, q0_pilot, q1_pilot, m_pilot)
}

pub(crate) fn warn_pilotless_kappa() {
    tracing::warn!("m_pilot is 0; kappa is computed from q0/q1 taken as given values");
}

/// Same as [`allocate_calibration_sample`] without the pilot-less warning,
/// for sweeps that report it once themselves.
pub(crate) fn split_budget(
    m: u64,
    p: f64,
    q0_pilot: f64,
    q1_pilot: f64,
    m_pilot: u64,
) -> Result<Allocation> {
    validate_probability("p", p)?;
    validate_probability("q0_pilot", q0_pilot)?;
    validate_probability("q1_pilot", q1_pilot)?;
    if m == 0 {
        return Err(ReportError::invalid_argument("m", "budget must be positive"));
    }
    if m_pilot.checked_mul(2).map_or(true, |needed| m < needed) {
        return Err(ReportError::invalid_argument(
            "m_pilot",
            format!("budget {} cannot hold {} pilot samples per class", m, m_pilot),
        ));
    }

    let m1 = if p < EPS {
        m - m_pilot
    } else {
        let kappa = if m_pilot == 0 {
            let q1 = q1_pilot.min(1.0 - EPS);
            (1.0 - q0_pilot) / (1.0 - q1)
        } else {
            let pilot = m_pilot as f64;
            (pilot * (1.0 - q0_pilot) + 1.0) / (pilot * (1.0 - q1_pilot) + 1.0)
        };
        let ideal = m as f64 / (1.0 + (1.0 / p - 1.0) * kappa.sqrt());
        let capped = ideal.min((m - m_pilot) as f64).round_ties_even();
        (capped as u64).max(m_pilot)
    };

    Ok(Allocation { m0: m - m1, m1 })
}

/// Baseline split: half of the budget to each class.
pub fn equal_allocation(m: u64) -> Allocation {
    Allocation {
        m0: m / 2,
        m1: m / 2,
    }
}

/// Plan how many more calibration items of each class to label, treating the
/// already-labelled set as the pilot.
pub fn plan_allocation(
    budget: u64,
    p_hat: f64,
    calibration: &CalibrationSummary,
) -> Result<AllocationPlan> {
    let quality = calibration.quality().ok_or_else(|| {
        ReportError::invalid_argument(
            "calibration",
            "both truly-correct and truly-incorrect items are needed to plan allocation",
        )
    })?;
    let pilot = calibration.m0.min(calibration.m1);
    let target = allocate_calibration_sample(
        budget,
        p_hat,
        quality.specificity,
        quality.sensitivity,
        pilot,
    )?;

    Ok(AllocationPlan {
        budget,
        target,
        additional_m0: target.m0.saturating_sub(calibration.m0),
        additional_m1: target.m1.saturating_sub(calibration.m1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_without_pilot() {
        // kappa = 0.3 / 0.1 = 3
        let allocation = allocate_calibration_sample(1000, 0.5, 0.7, 0.9, 0).unwrap();
        assert_eq!(allocation, Allocation { m0: 634, m1: 366 });

        let allocation = allocate_calibration_sample(1000, 0.9, 0.7, 0.9, 0).unwrap();
        assert_eq!(allocation, Allocation { m0: 161, m1: 839 });
    }

    #[test]
    fn test_allocation_with_pilot_smooths_kappa() {
        // kappa = (10*0.3 + 1) / (10*0.1 + 1) = 2
        let allocation = allocate_calibration_sample(1000, 0.5, 0.7, 0.9, 10).unwrap();
        assert_eq!(allocation, Allocation { m0: 586, m1: 414 });
    }

    #[test]
    fn test_symmetric_judge_at_half_splits_evenly() {
        let allocation = allocate_calibration_sample(100, 0.5, 0.8, 0.8, 5).unwrap();
        assert_eq!(allocation, Allocation { m0: 50, m1: 50 });
    }

    #[test]
    fn test_allocation_respects_pilot_floor() {
        let allocation = allocate_calibration_sample(100, 0.999, 0.7, 0.9, 10).unwrap();
        assert_eq!(allocation.total(), 100);
        assert!(allocation.m0 >= 10);
        assert!(allocation.m1 >= 10);

    }

    #[test]
    fn test_zero_judged_rate_sends_rest_to_correct_class() {
        let allocation = allocate_calibration_sample(100, 0.0, 0.7, 0.9, 10).unwrap();
        assert_eq!(allocation, Allocation { m0: 10, m1: 90 });

        let allocation = allocate_calibration_sample(100, 0.0, 0.7, 0.9, 0).unwrap();
        assert_eq!(allocation, Allocation { m0: 0, m1: 100 });
    }

    #[test]
    fn test_huge_pilot_is_rejected_not_overflowed() {
        let err = allocate_calibration_sample(100, 0.5, 0.7, 0.9, u64::MAX / 2 + 1).unwrap_err();
        assert!(matches!(err, ReportError::InvalidArgumentError { .. }));
        assert!(allocate_calibration_sample(100, 0.5, 0.7, 0.9, u64::MAX).is_err());
    }

    #[test]
    fn test_perfect_sensitivity_without_pilot_is_finite() {
        let allocation = allocate_calibration_sample(200, 0.5, 0.7, 1.0, 0).unwrap();
        assert_eq!(allocation.total(), 200);
        assert!(allocation.m0 > allocation.m1);
    }

    #[test]
    fn test_allocation_rejects_bad_arguments() {
        assert!(allocate_calibration_sample(0, 0.5, 0.7, 0.9, 0).is_err());
        assert!(allocate_calibration_sample(10, 1.5, 0.7, 0.9, 0).is_err());
        assert!(allocate_calibration_sample(10, 0.5, 0.7, 0.9, 6).is_err());
    }

    #[test]
    fn test_equal_allocation_floors_odd_budget() {
        assert_eq!(equal_allocation(101), Allocation { m0: 50, m1: 50 });
    }

    #[test]
    fn test_plan_allocation_counts_remaining_labels() {
        let calibration = CalibrationSummary {
            m0: 20,
            m1: 30,
            true_negatives: 14,
            true_positives: 27,
        };
        let plan = plan_allocation(500, 0.5, &calibration).unwrap();
        assert_eq!(plan.target.total(), 500);
        assert_eq!(plan.additional_m0, plan.target.m0 - 20);
        assert_eq!(plan.additional_m1, plan.target.m1 - 30);
        assert!(plan.target.m0 > plan.target.m1);
    }

    #[test]
    fn test_plan_allocation_requires_both_classes() {
        let calibration = CalibrationSummary {
            m0: 0,
            m1: 30,
            true_negatives: 0,
            true_positives: 27,
        };
        assert!(plan_allocation(500, 0.5, &calibration).is_err());
    }
}
