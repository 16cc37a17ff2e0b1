//! Monte Carlo check of the corrected interval.
//!
//! For each true accuracy on a grid, simulate a noisy judge over a test set,
//! estimate `q0`/`q1` on a calibration set split either evenly or adaptively,
//! and record whether each interval covers the truth.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::core::allocation::{allocate_calibration_sample, equal_allocation};
use crate::core::calibration::{confidence_interval, naive_interval, point_estimator};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_open_unit, validate_positive_number, validate_probability, validate_range, Validate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    pub theta_start: f64,
    pub theta_stop: f64,
    pub theta_num: usize,
    pub replication: usize,
    pub q0: f64,
    pub q1: f64,
    pub n: u64,
    pub m: u64,
    pub m_pilot: u64,
    pub alpha: f64,
    pub seed: u64,
    pub workers: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            theta_start: 0.0,
            theta_stop: 1.0,
            theta_num: 21,
            replication: 10_000,
            q0: 0.7,
            q1: 0.9,
            n: 1000,
            m: 500,
            m_pilot: 10,
            alpha: 0.05,
            seed: 1234,
            workers: 4,
        }
    }
}

impl Validate for SimulationParams {
    fn validate(&self) -> Result<()> {
        validate_probability("theta_start", self.theta_start)?;
        validate_probability("theta_stop", self.theta_stop)?;
        validate_positive_number("theta_num", self.theta_num as u64, 1)?;
        validate_positive_number("replication", self.replication as u64, 1)?;
        validate_probability("q0", self.q0)?;
        validate_probability("q1", self.q1)?;
        validate_positive_number("n", self.n, 1)?;
        validate_positive_number("m_pilot", self.m_pilot, 1)?;
        validate_open_unit("alpha", self.alpha)?;
        validate_range("workers", self.workers, 1, 1024)?;

        if self.m % 2 != 0 {
            return Err(ReportError::InvalidConfigValueError {
                field: "m".to_string(),
                value: self.m.to_string(),
                reason: "calibration size must be even".to_string(),
            });
        }
        match self.m_pilot.checked_mul(2) {
            Some(needed) if self.m >= needed => {}
            Some(needed) => {
                return Err(ReportError::InvalidConfigValueError {
                    field: "m".to_string(),
                    value: self.m.to_string(),
                    reason: format!("must be at least {} to include the pilot samples", needed),
                });
            }
            None => {
                return Err(ReportError::InvalidConfigValueError {
                    field: "m_pilot".to_string(),
                    value: self.m_pilot.to_string(),
                    reason: "pilot size is too large".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    Equal,
    Adaptive,
}

impl Arm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Equal => "equal",
            Arm::Adaptive => "adaptive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateResult {
    pub arm: Arm,
    pub theta: f64,
    pub theta_hat: f64,
    pub theta_lo: f64,
    pub theta_hi: f64,
    pub theta_covered: bool,
    pub p_hat: f64,
    pub p_lo: f64,
    pub p_hi: f64,
    pub p_covered: bool,
    pub m0: u64,
    pub m1: u64,
}

/// One replicate; an arm is `None` when its estimated judge was degenerate.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateOutcome {
    pub equal: Option<ReplicateResult>,
    pub adaptive: Option<ReplicateResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThetaBatch {
    pub theta: f64,
    pub equal: Vec<ReplicateResult>,
    pub adaptive: Vec<ReplicateResult>,
    pub skipped_equal: usize,
    pub skipped_adaptive: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub arm: Arm,
    pub theta: f64,
    pub replicates: usize,
    pub skipped: usize,
    pub mean_theta_hat: f64,
    pub mean_p_hat: f64,
    pub theta_coverage: f64,
    pub p_coverage: f64,
    pub mean_ci_length: f64,
    pub mean_naive_length: f64,
    pub mean_m0: f64,
    pub mean_m1: f64,
}

/// Evenly spaced points from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

fn binomial<R: Rng>(rng: &mut R, trials: u64, p: f64) -> Result<u64> {
    let distribution = Binomial::new(trials, p).map_err(|e| ReportError::ProcessingError {
        message: format!("binomial({}, {}): {}", trials, p, e),
    })?;
    Ok(distribution.sample(rng))
}

fn score_arm(
    arm: Arm,
    theta: f64,
    p_hat: f64,
    q0_hat: f64,
    q1_hat: f64,
    params: &SimulationParams,
    m0: u64,
    m1: u64,
) -> Result<Option<ReplicateResult>> {
    let theta_hat = match point_estimator(p_hat, q0_hat, q1_hat) {
        Ok(value) => value,
        Err(ReportError::DegenerateJudgeError { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let interval = match confidence_interval(p_hat, q0_hat, q1_hat, params.n, m0, m1, params.alpha) {
        Ok(interval) => interval,
        Err(ReportError::DegenerateJudgeError { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let naive = naive_interval(p_hat, params.n, params.alpha)?;

    Ok(Some(ReplicateResult {
        arm,
        theta,
        theta_hat,
        theta_lo: interval.lower,
        theta_hi: interval.upper,
        theta_covered: interval.contains(theta),
        p_hat,
        p_lo: naive.lower,
        p_hi: naive.upper,
        p_covered: naive.contains(theta),
        m0,
        m1,
    }))
}

pub fn simulate_once<R: Rng>(
    theta: f64,
    params: &SimulationParams,
    rng: &mut R,
) -> Result<ReplicateOutcome> {
    let (q0, q1, n) = (params.q0, params.q1, params.n);

    // Test set: true labels, then the noisy judge.
    let n_true = binomial(rng, n, theta)?;
    let judged_correct = binomial(rng, n - n_true, 1.0 - q0)? + binomial(rng, n_true, q1)?;
    let p_hat = judged_correct as f64 / n as f64;

    // Equal split.
    let split = equal_allocation(params.m);
    let q0_hat = binomial(rng, split.m0, q0)? as f64 / split.m0 as f64;
    let q1_hat = binomial(rng, split.m1, q1)? as f64 / split.m1 as f64;
    let equal = score_arm(Arm::Equal, theta, p_hat, q0_hat, q1_hat, params, split.m0, split.m1)?;

    // Adaptive split seeded by pilot samples from each class.
    let pilot = params.m_pilot;
    let pilot_q0 = binomial(rng, pilot, q0)?;
    let pilot_q1 = binomial(rng, pilot, q1)?;
    let allocation = allocate_calibration_sample(
        params.m,
        p_hat,
        pilot_q0 as f64 / pilot as f64,
        pilot_q1 as f64 / pilot as f64,
        pilot,
    )?;
    let q0_hat =
        (binomial(rng, allocation.m0 - pilot, q0)? + pilot_q0) as f64 / allocation.m0 as f64;
    let q1_hat =
        (binomial(rng, allocation.m1 - pilot, q1)? + pilot_q1) as f64 / allocation.m1 as f64;
    let adaptive = score_arm(
        Arm::Adaptive,
        theta,
        p_hat,
        q0_hat,
        q1_hat,
        params,
        allocation.m0,
        allocation.m1,
    )?;

    Ok(ReplicateOutcome { equal, adaptive })
}

/// All replicates for one grid point, on its own RNG stream.
pub fn simulate_theta(theta: f64, params: &SimulationParams, seed: u64) -> Result<ThetaBatch> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut batch = ThetaBatch {
        theta,
        equal: Vec::with_capacity(params.replication),
        adaptive: Vec::with_capacity(params.replication),
        skipped_equal: 0,
        skipped_adaptive: 0,
    };

    for _ in 0..params.replication {
        let outcome = simulate_once(theta, params, &mut rng)?;
        match outcome.equal {
            Some(result) => batch.equal.push(result),
            None => batch.skipped_equal += 1,
        }
        match outcome.adaptive {
            Some(result) => batch.adaptive.push(result),
            None => batch.skipped_adaptive += 1,
        }
    }

    if batch.skipped_equal + batch.skipped_adaptive > 0 {
        tracing::warn!(
            "theta={:.3}: skipped {} equal / {} adaptive replicates with a degenerate judge estimate",
            theta,
            batch.skipped_equal,
            batch.skipped_adaptive
        );
    }
    Ok(batch)
}

/// Validate `params` and simulate its θ grid.
pub async fn run_simulation(params: &SimulationParams) -> Result<Vec<ThetaBatch>> {
    params.validate()?;
    let thetas = linspace(params.theta_start, params.theta_stop, params.theta_num);
    simulate_grid(params, thetas).await
}

/// Run every grid point on the blocking pool, at most `workers` at a time.
/// Grid point `i` uses seed `seed + i`, so output is reproducible.
/// `params` must already be validated.
pub async fn simulate_grid(params: &SimulationParams, thetas: Vec<f64>) -> Result<Vec<ThetaBatch>> {
    let semaphore = Arc::new(Semaphore::new(params.workers));
    let shared = Arc::new(params.clone());

    tracing::info!(
        "🎲 Simulating {} grid points x {} replicates ({} workers)",
        thetas.len(),
        params.replication,
        params.workers
    );

    let mut handles = Vec::with_capacity(thetas.len());
    for (index, theta) in thetas.into_iter().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ReportError::ProcessingError {
                message: format!("worker pool closed: {}", e),
            })?;
        let params = Arc::clone(&shared);
        let seed = params.seed.wrapping_add(index as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            simulate_theta(theta, &params, seed)
        }));
    }

    let mut batches = Vec::with_capacity(handles.len());
    for handle in handles {
        let batch = handle.await??;
        tracing::debug!(
            "theta={:.3}: {} equal / {} adaptive replicates",
            batch.theta,
            batch.equal.len(),
            batch.adaptive.len()
        );
        batches.push(batch);
    }
    Ok(batches)
}

fn summarize_arm(arm: Arm, theta: f64, results: &[ReplicateResult], skipped: usize) -> SummaryRow {
    let count = results.len();
    let mean = |f: &dyn Fn(&ReplicateResult) -> f64| -> f64 {
        if count == 0 {
            return f64::NAN;
        }
        results.iter().map(f).sum::<f64>() / count as f64
    };

    SummaryRow {
        arm,
        theta,
        replicates: count,
        skipped,
        mean_theta_hat: mean(&|r| r.theta_hat),
        mean_p_hat: mean(&|r| r.p_hat),
        theta_coverage: mean(&|r| if r.theta_covered { 1.0 } else { 0.0 }),
        p_coverage: mean(&|r| if r.p_covered { 1.0 } else { 0.0 }),
        mean_ci_length: mean(&|r| r.theta_hi - r.theta_lo),
        mean_naive_length: mean(&|r| r.p_hi - r.p_lo),
        mean_m0: mean(&|r| r.m0 as f64),
        mean_m1: mean(&|r| r.m1 as f64),
    }
}

/// Per-grid-point means for both arms, equal arm first.
pub fn summarize(batches: &[ThetaBatch]) -> Vec<SummaryRow> {
    batches
        .iter()
        .flat_map(|batch| {
            [
                summarize_arm(Arm::Equal, batch.theta, &batch.equal, batch.skipped_equal),
                summarize_arm(
                    Arm::Adaptive,
                    batch.theta,
                    &batch.adaptive,
                    batch.skipped_adaptive,
                ),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_params() -> SimulationParams {
        SimulationParams {
            theta_start: 0.2,
            theta_stop: 0.8,
            theta_num: 3,
            replication: 300,
            workers: 2,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn test_linspace_includes_endpoints() {
        let grid = linspace(0.0, 1.0, 21);
        assert_eq!(grid.len(), 21);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[20], 1.0);
        assert_abs_diff_eq!(grid[10], 0.5, epsilon = 1e-12);
        assert_eq!(linspace(0.3, 0.9, 1), vec![0.3]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_params_validation() {
        assert!(SimulationParams::default().validate().is_ok());
        let odd = SimulationParams {
            m: 501,
            ..SimulationParams::default()
        };
        assert!(odd.validate().is_err());
        let no_pilot = SimulationParams {
            m_pilot: 0,
            ..SimulationParams::default()
        };
        assert!(no_pilot.validate().is_err());
        let tiny_budget = SimulationParams {
            m: 10,
            m_pilot: 10,
            ..SimulationParams::default()
        };
        assert!(tiny_budget.validate().is_err());
        let huge_pilot = SimulationParams {
            m_pilot: u64::MAX / 2 + 1,
            ..SimulationParams::default()
        };
        assert!(matches!(
            huge_pilot.validate(),
            Err(ReportError::InvalidConfigValueError { ref field, .. }) if field == "m_pilot"
        ));
    }

    #[test]
    fn test_simulate_once_respects_budget() {
        let params = small_params();
        let mut rng = StdRng::seed_from_u64(7);
        let outcome = simulate_once(0.5, &params, &mut rng).unwrap();
        let equal = outcome.equal.unwrap();
        let adaptive = outcome.adaptive.unwrap();
        assert_eq!(equal.m0 + equal.m1, params.m);
        assert_eq!(adaptive.m0 + adaptive.m1, params.m);
        assert!(adaptive.m0 >= params.m_pilot && adaptive.m1 >= params.m_pilot);
        assert_eq!(equal.p_hat, adaptive.p_hat);
        assert!(equal.theta_lo <= equal.theta_hi);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let params = small_params();
        let first = simulate_theta(0.4, &params, 99).unwrap();
        let second = simulate_theta(0.4, &params, 99).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrected_interval_covers_where_naive_fails() {
        let params = small_params();
        let batch = simulate_theta(0.2, &params, 2024).unwrap();
        let rows = summarize(std::slice::from_ref(&batch));
        let equal = &rows[0];
        let adaptive = &rows[1];

        assert_eq!(equal.arm, Arm::Equal);
        assert_eq!(adaptive.arm, Arm::Adaptive);
        assert!(equal.theta_coverage > 0.85, "coverage {}", equal.theta_coverage);
        assert!(adaptive.theta_coverage > 0.85, "coverage {}", adaptive.theta_coverage);
        // E[p_hat] = 0.42 at theta = 0.2, far outside the raw interval
        assert!(equal.p_coverage < 0.05);
        assert_abs_diff_eq!(equal.mean_theta_hat, 0.2, epsilon = 0.03);
    }

    #[test]
    fn test_run_simulation_orders_grid() {
        let params = SimulationParams {
            replication: 20,
            ..small_params()
        };
        let batches = tokio_test::block_on(run_simulation(&params)).unwrap();
        let thetas: Vec<f64> = batches.iter().map(|b| b.theta).collect();
        assert_eq!(thetas.len(), 3);
        assert_abs_diff_eq!(thetas[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(thetas[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(thetas[2], 0.8, epsilon = 1e-12);
        for batch in &batches {
            assert_eq!(batch.equal.len() + batch.skipped_equal, 20);
        }
    }

    #[test]
    fn test_simulate_grid_uses_given_points() {
        let params = SimulationParams {
            replication: 10,
            ..small_params()
        };
        let batches = tokio_test::block_on(simulate_grid(&params, vec![0.9, 0.1])).unwrap();
        let thetas: Vec<f64> = batches.iter().map(|b| b.theta).collect();
        assert_eq!(thetas, vec![0.9, 0.1]);
    }

    #[test]
    fn test_binomial_edge_probabilities() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(binomial(&mut rng, 50, 0.0).unwrap(), 0);
        assert_eq!(binomial(&mut rng, 50, 1.0).unwrap(), 50);
        assert_eq!(binomial(&mut rng, 0, 0.4).unwrap(), 0);
        let draw = binomial(&mut rng, 1000, 0.3).unwrap();
        assert!((200..=400).contains(&draw));
        assert!(binomial(&mut rng, 10, 1.5).is_err());
    }
}
