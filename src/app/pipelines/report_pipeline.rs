use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::adapters::input::{
    calibration_records, judge_records, parse_rows, summarize_calibration, summarize_test_set,
    InputFormat,
};
use crate::core::allocation::plan_allocation;
use crate::core::calibration::estimate;
use crate::core::{ConfigProvider, EstimateInput, Pipeline, Storage};
use crate::domain::model::{CalibrationRecord, EvaluationReport, JudgeRecord};
use crate::utils::error::{ReportError, Result};

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_CSV: &str = "report.csv";

pub struct ReportInput {
    pub test_set: Vec<JudgeRecord>,
    pub calibration: Vec<CalibrationRecord>,
}

/// Judge outputs + calibration labels in, bias-corrected accuracy report out.
pub struct ReportPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> ReportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn read_rows(&self, path: &str) -> Result<Vec<crate::adapters::input::Row>> {
        let format = InputFormat::from_path(path)?;
        let bytes = self.storage.read_file(path).await?;
        parse_rows(path, format, &bytes)
    }
}

/// One flat line per report, for spreadsheets.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    generated_at: String,
    n: u64,
    judged_correct: u64,
    m0: u64,
    m1: u64,
    q0_hat: f64,
    q1_hat: f64,
    observed: f64,
    corrected: f64,
    ci_lower: f64,
    ci_upper: f64,
    naive_lower: f64,
    naive_upper: f64,
    alpha: f64,
    plan_m0: Option<u64>,
    plan_m1: Option<u64>,
}

pub fn report_csv(report: &EvaluationReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.serialize(ReportRow {
        name: &report.name,
        generated_at: report.generated_at.to_rfc3339(),
        n: report.test_set.n,
        judged_correct: report.test_set.judged_correct,
        m0: report.calibration.m0,
        m1: report.calibration.m1,
        q0_hat: report.judge_quality.specificity,
        q1_hat: report.judge_quality.sensitivity,
        observed: report.estimate.observed,
        corrected: report.estimate.corrected,
        ci_lower: report.estimate.interval.lower,
        ci_upper: report.estimate.interval.upper,
        naive_lower: report.estimate.naive_interval.lower,
        naive_upper: report.estimate.naive_interval.upper,
        alpha: report.estimate.alpha,
        plan_m0: report.allocation_plan.map(|plan| plan.target.m0),
        plan_m1: report.allocation_plan.map(|plan| plan.target.m1),
    })?;
    writer.into_inner().map_err(|e| ReportError::ProcessingError {
        message: format!("flushing report CSV: {}", e),
    })
}

/// Human-readable summary printed after a run.
pub fn render_summary(report: &EvaluationReport) -> String {
    let estimate = &report.estimate;
    let confidence = (1.0 - estimate.alpha) * 100.0;
    let mut lines = vec![
        format!("📋 {}", report.name),
        format!(
            "  Test set: n={} judged correct={} (raw accuracy {:.4})",
            report.test_set.n, report.test_set.judged_correct, estimate.observed
        ),
        format!(
            "  Calibration: m0={} m1={} specificity={:.4} sensitivity={:.4}",
            report.calibration.m0,
            report.calibration.m1,
            report.judge_quality.specificity,
            report.judge_quality.sensitivity
        ),
        format!(
            "  Corrected accuracy: {:.4}  {:.0}% CI [{:.4}, {:.4}]",
            estimate.corrected, confidence, estimate.interval.lower, estimate.interval.upper
        ),
        format!(
            "  Uncorrected {:.0}% CI: [{:.4}, {:.4}]",
            confidence, estimate.naive_interval.lower, estimate.naive_interval.upper
        ),
    ];
    if let Some(plan) = &report.allocation_plan {
        lines.push(format!(
            "  Budget {}: target m0={} m1={} (label {} more incorrect, {} more correct)",
            plan.budget, plan.target.m0, plan.target.m1, plan.additional_m0, plan.additional_m1
        ));
    }
    lines.join("\n")
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReportPipeline<S, C> {
    type Input = ReportInput;
    type Output = EvaluationReport;

    fn name(&self) -> &str {
        "report"
    }

    async fn extract(&self) -> Result<ReportInput> {
        let test_path = self.config.test_set_path();
        let calibration_path = self.config.calibration_path();

        let test_rows = self.read_rows(test_path).await?;
        let test_set = judge_records(test_path, &test_rows, self.config.judge_column())?;
        tracing::debug!("Read {} test items from {}", test_set.len(), test_path);

        let calibration_rows = self.read_rows(calibration_path).await?;
        let calibration = calibration_records(
            calibration_path,
            &calibration_rows,
            self.config.human_column(),
            self.config.calibration_judge_column(),
        )?;
        tracing::debug!(
            "Read {} calibration items from {}",
            calibration.len(),
            calibration_path
        );

        Ok(ReportInput {
            test_set,
            calibration,
        })
    }

    async fn transform(&self, input: ReportInput) -> Result<EvaluationReport> {
        let test_set = summarize_test_set(self.config.test_set_path(), &input.test_set)?;
        let calibration = summarize_calibration(&input.calibration);
        let judge_quality = calibration.quality().ok_or_else(|| {
            ReportError::invalid_input(
                self.config.calibration_path(),
                0,
                format!(
                    "calibration needs both human-correct and human-incorrect items (found m0={}, m1={})",
                    calibration.m0, calibration.m1
                ),
            )
        })?;

        let p_hat = test_set.p_hat();
        let estimate = estimate(
            &EstimateInput {
                p_hat,
                q0: judge_quality.specificity,
                q1: judge_quality.sensitivity,
                n: test_set.n,
                m0: calibration.m0,
                m1: calibration.m1,
            },
            self.config.alpha(),
        )?;

        let allocation_plan = self
            .config
            .budget()
            .map(|budget| plan_allocation(budget, p_hat, &calibration))
            .transpose()?;

        tracing::info!(
            "✅ Corrected accuracy {:.4} [{:.4}, {:.4}] (raw {:.4})",
            estimate.corrected,
            estimate.interval.lower,
            estimate.interval.upper,
            estimate.observed
        );

        Ok(EvaluationReport {
            name: self.config.report_name().to_string(),
            generated_at: Utc::now(),
            test_set,
            calibration,
            judge_quality,
            estimate,
            allocation_plan,
        })
    }

    async fn load(&self, report: EvaluationReport) -> Result<String> {
        let output_dir = Path::new(self.config.output_path());
        let mut written = Vec::new();

        for format in self.config.output_formats() {
            let (file_name, data) = match format.as_str() {
                "json" => (REPORT_JSON, serde_json::to_vec_pretty(&report)?),
                "csv" => (REPORT_CSV, report_csv(&report)?),
                other => {
                    return Err(ReportError::InvalidConfigValueError {
                        field: "output.formats".to_string(),
                        value: other.to_string(),
                        reason: "Supported formats: json, csv".to_string(),
                    })
                }
            };
            let path = output_dir.join(file_name).to_string_lossy().into_owned();
            self.storage.write_file(&path, &data).await?;
            written.push(path);
        }

        println!("{}", render_summary(&report));

        written.into_iter().next().ok_or_else(|| ReportError::ConfigError {
            message: "no output formats selected".to_string(),
        })
    }
}
