use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed interval inside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Specificity (q0) and sensitivity (q1) of a judge against human labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgeQuality {
    pub specificity: f64,
    pub sensitivity: f64,
}

impl JudgeQuality {
    pub fn new(specificity: f64, sensitivity: f64) -> Self {
        Self {
            specificity,
            sensitivity,
        }
    }

    /// q0 + q1 - 1; zero means the judge is no better than a coin flip.
    pub fn youden(&self) -> f64 {
        self.specificity + self.sensitivity - 1.0
    }
}

/// Summary statistics an accuracy estimate is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateInput {
    pub p_hat: f64,
    pub q0: f64,
    pub q1: f64,
    pub n: u64,
    pub m0: u64,
    pub m1: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyEstimate {
    /// Raw judged-correct rate.
    pub observed: f64,
    /// Bias-corrected accuracy.
    pub corrected: f64,
    pub interval: Interval,
    /// Wald interval around the raw rate, ignoring judge error.
    pub naive_interval: Interval,
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub m0: u64,
    pub m1: u64,
}

impl Allocation {
    pub fn total(&self) -> u64 {
        self.m0 + self.m1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub budget: u64,
    pub target: Allocation,
    pub additional_m0: u64,
    pub additional_m1: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeRecord {
    pub judge_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRecord {
    pub human_correct: bool,
    pub judge_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetSummary {
    pub n: u64,
    pub judged_correct: u64,
}

impl TestSetSummary {
    pub fn p_hat(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        self.judged_correct as f64 / self.n as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    /// Items humans marked incorrect.
    pub m0: u64,
    /// Items humans marked correct.
    pub m1: u64,
    /// Incorrect items the judge also marked incorrect.
    pub true_negatives: u64,
    /// Correct items the judge also marked correct.
    pub true_positives: u64,
}

impl CalibrationSummary {
    pub fn q0_hat(&self) -> Option<f64> {
        (self.m0 > 0).then(|| self.true_negatives as f64 / self.m0 as f64)
    }

    pub fn q1_hat(&self) -> Option<f64> {
        (self.m1 > 0).then(|| self.true_positives as f64 / self.m1 as f64)
    }

    pub fn quality(&self) -> Option<JudgeQuality> {
        Some(JudgeQuality::new(self.q0_hat()?, self.q1_hat()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub test_set: TestSetSummary,
    pub calibration: CalibrationSummary,
    pub judge_quality: JudgeQuality,
    pub estimate: AccuracyEstimate,
    pub allocation_plan: Option<AllocationPlan>,
}
