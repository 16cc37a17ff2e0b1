//! Deterministic curves: how the raw rate is biased across true accuracy,
//! and how interval length falls with calibration budget under equal versus
//! adaptive allocation.

use serde::{Deserialize, Serialize};

use crate::core::allocation::{equal_allocation, split_budget, warn_pilotless_kappa, EPS};
use crate::core::calibration::{
    bias_turning_point, confidence_interval, expected_observed_rate, point_estimator,
};
use crate::core::simulation::linspace;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_open_unit, validate_positive_number, validate_probability, Validate,
};

const BIAS_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasCurveParams {
    pub q0: f64,
    pub q1: f64,
    pub n: u64,
    pub m0: u64,
    pub m1: u64,
    pub points: usize,
    pub alpha: f64,
}

impl Default for BiasCurveParams {
    fn default() -> Self {
        Self {
            q0: 0.7,
            q1: 0.9,
            n: 1_000_000_000,
            m0: 500,
            m1: 500,
            points: 200,
            alpha: 0.05,
        }
    }
}

impl Validate for BiasCurveParams {
    fn validate(&self) -> Result<()> {
        validate_probability("q0", self.q0)?;
        validate_probability("q1", self.q1)?;
        validate_positive_number("n", self.n, 1)?;
        validate_positive_number("points", self.points as u64, 2)?;
        validate_open_unit("alpha", self.alpha)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasDirection {
    Over,
    Under,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasPoint {
    pub theta: f64,
    pub expected_p_hat: f64,
    pub bias: f64,
    pub direction: BiasDirection,
    pub theta_hat: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasCurve {
    pub turning_point: Option<f64>,
    pub points: Vec<BiasPoint>,
}

pub fn bias_curve(params: &BiasCurveParams) -> Result<BiasCurve> {
    params.validate()?;
    let (q0, q1) = (params.q0, params.q1);

    let points = linspace(0.0, 1.0, params.points)
        .into_iter()
        .map(|theta| {
            let expected = expected_observed_rate(theta, q0, q1);
            let bias = expected - theta;
            let direction = if bias > BIAS_TOLERANCE {
                BiasDirection::Over
            } else if bias < -BIAS_TOLERANCE {
                BiasDirection::Under
            } else {
                BiasDirection::None
            };
            let interval =
                confidence_interval(expected, q0, q1, params.n, params.m0, params.m1, params.alpha)?;
            Ok(BiasPoint {
                theta,
                expected_p_hat: expected,
                bias,
                direction,
                theta_hat: point_estimator(expected, q0, q1)?,
                ci_lower: interval.lower,
                ci_upper: interval.upper,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BiasCurve {
        turning_point: bias_turning_point(q0, q1),
        points,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiSweepParams {
    pub p_list: Vec<f64>,
    pub q0: f64,
    pub q1: f64,
    pub alpha: f64,
    pub n: u64,
    pub m_start: u64,
    pub m_stop: u64,
    pub m_step: u64,
}

impl Default for CiSweepParams {
    fn default() -> Self {
        Self {
            p_list: vec![0.3, 0.5, 0.7, 0.9],
            q0: 0.7,
            q1: 0.9,
            alpha: 0.05,
            n: 1_000_000_000,
            m_start: 100,
            m_stop: 10_000,
            m_step: 10,
        }
    }
}

impl Validate for CiSweepParams {
    fn validate(&self) -> Result<()> {
        if self.p_list.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "p_list".to_string(),
            });
        }
        for &p in &self.p_list {
            validate_probability("p_list", p)?;
        }
        validate_probability("q0", self.q0)?;
        validate_probability("q1", self.q1)?;
        validate_open_unit("alpha", self.alpha)?;
        validate_positive_number("n", self.n, 1)?;
        validate_positive_number("m_start", self.m_start, 2)?;
        validate_positive_number("m_step", self.m_step, 1)?;
        validate_positive_number("m_stop", self.m_stop, self.m_start)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiLengthPoint {
    pub p: f64,
    pub m: u64,
    pub equal_length: f64,
    pub adaptive_length: f64,
    pub adaptive_m0: u64,
    pub adaptive_m1: u64,
}

/// Parse a comma-separated list such as `0.3,0.5,0.7`.
pub fn parse_p_list(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value.parse::<f64>().map_err(|_| ReportError::InvalidConfigValueError {
                field: "p_list".to_string(),
                value: value.to_string(),
                reason: "not a number".to_string(),
            })
        })
        .collect()
}

pub fn ci_length_sweep(params: &CiSweepParams) -> Result<Vec<CiLengthPoint>> {
    params.validate()?;
    if params.p_list.iter().any(|&p| p >= EPS) {
        warn_pilotless_kappa();
    }
    let mut rows = Vec::new();

    for &p in &params.p_list {
        let mut m = params.m_start;
        while m <= params.m_stop {
            let equal = equal_allocation(m);
            let equal_ci = confidence_interval(
                p, params.q0, params.q1, params.n, equal.m0, equal.m1, params.alpha,
            )?;
            let adaptive = split_budget(m, p, params.q0, params.q1, 0)?;
            let adaptive_ci = confidence_interval(
                p,
                params.q0,
                params.q1,
                params.n,
                adaptive.m0,
                adaptive.m1,
                params.alpha,
            )?;
            rows.push(CiLengthPoint {
                p,
                m,
                equal_length: equal_ci.length(),
                adaptive_length: adaptive_ci.length(),
                adaptive_m0: adaptive.m0,
                adaptive_m1: adaptive.m1,
            });
            m += params.m_step;
        }
    }

    Ok(rows)
}
