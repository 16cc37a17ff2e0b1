use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::adapters::input::SUPPORTED_EXTENSIONS;
use crate::core::simulation::SimulationParams;
use crate::core::sweep::{parse_p_list, BiasCurveParams, CiSweepParams};
use crate::core::ConfigProvider;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_open_unit, validate_path,
    Validate,
};

pub const VALID_FORMATS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Parser)]
#[command(name = "judge-report")]
#[command(about = "Bias-corrected accuracy and confidence intervals for LLM-as-a-judge evaluations")]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Log CPU and memory usage per phase
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Correct a judge-scored test set using human-labelled calibration data
    Report(ReportArgs),
    /// Correct summary statistics directly
    Estimate(EstimateArgs),
    /// Split a calibration budget between incorrect and correct items
    Allocate(AllocateArgs),
    /// Monte Carlo coverage study of equal vs adaptive calibration
    Simulate(SimulateArgs),
    /// Bias of the raw judged rate across true accuracy
    BiasCurve(BiasCurveArgs),
    /// Interval length across calibration budget
    CiSweep(CiSweepArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct ReportArgs {
    /// Test-set judge outputs (csv, tsv, json, jsonl)
    #[arg(long)]
    pub test_set: String,

    /// Calibration set with human labels and judge outputs
    #[arg(long)]
    pub calibration: String,

    /// Judge verdict column in the test set
    #[arg(long, default_value = "judge")]
    pub judge_column: String,

    /// Human label column in the calibration set
    #[arg(long, default_value = "human")]
    pub human_column: String,

    /// Judge verdict column in the calibration set
    #[arg(long, default_value = "judge")]
    pub calibration_judge_column: String,

    #[arg(long, default_value = "0.05")]
    pub alpha: f64,

    /// Total calibration budget to plan an allocation for
    #[arg(long)]
    pub budget: Option<u64>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_values = ["json", "csv"])]
    pub formats: Vec<String>,

    #[arg(long, default_value = "llm-judge-report")]
    pub name: String,
}

impl ConfigProvider for ReportArgs {
    fn report_name(&self) -> &str {
        &self.name
    }

    fn test_set_path(&self) -> &str {
        &self.test_set
    }

    fn calibration_path(&self) -> &str {
        &self.calibration
    }

    fn judge_column(&self) -> &str {
        &self.judge_column
    }

    fn human_column(&self) -> &str {
        &self.human_column
    }

    fn calibration_judge_column(&self) -> &str {
        &self.calibration_judge_column
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn budget(&self) -> Option<u64> {
        self.budget
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Err(ReportError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    for format in formats {
        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(ReportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!("Unsupported format. Valid formats: {}", VALID_FORMATS.join(", ")),
            });
        }
    }
    Ok(())
}

impl Validate for ReportArgs {
    fn validate(&self) -> Result<()> {
        validate_path("test_set", &self.test_set)?;
        validate_path("calibration", &self.calibration)?;
        validate_file_extensions(
            "inputs",
            &[self.test_set.clone(), self.calibration.clone()],
            SUPPORTED_EXTENSIONS,
        )?;
        validate_non_empty_string("judge_column", &self.judge_column)?;
        validate_non_empty_string("human_column", &self.human_column)?;
        validate_non_empty_string("calibration_judge_column", &self.calibration_judge_column)?;
        validate_open_unit("alpha", self.alpha)?;
        validate_path("output_path", &self.output_path)?;
        validate_output_formats("formats", &self.formats)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub struct EstimateArgs {
    /// Judged-correct rate on the test set
    #[arg(long)]
    pub p_hat: f64,

    /// Judge specificity
    #[arg(long)]
    pub q0: f64,

    /// Judge sensitivity
    #[arg(long)]
    pub q1: f64,

    /// Test set size
    #[arg(long)]
    pub n: u64,

    /// Truly incorrect calibration items
    #[arg(long)]
    pub m0: u64,

    /// Truly correct calibration items
    #[arg(long)]
    pub m1: u64,

    #[arg(long, default_value = "0.05")]
    pub alpha: f64,
}

#[derive(Debug, Clone, Args)]
pub struct AllocateArgs {
    /// Total calibration budget
    #[arg(long)]
    pub m: u64,

    /// Judged-correct rate on the test set
    #[arg(long)]
    pub p: f64,

    #[arg(long, default_value = "0.9")]
    pub q0: f64,

    #[arg(long, default_value = "0.9")]
    pub q1: f64,

    /// Pilot samples already collected per class
    #[arg(long, default_value = "0")]
    pub m_pilot: u64,
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    #[arg(long, default_value = "0.0")]
    pub theta_start: f64,

    #[arg(long, default_value = "1.0")]
    pub theta_stop: f64,

    #[arg(long, default_value = "21")]
    pub theta_num: usize,

    /// Replicates per grid point
    #[arg(long, default_value = "10000")]
    pub replication: usize,

    #[arg(long, default_value = "0.7")]
    pub q0: f64,

    #[arg(long, default_value = "0.9")]
    pub q1: f64,

    #[arg(long, default_value = "1000")]
    pub n: u64,

    /// Calibration budget (even)
    #[arg(long, default_value = "500")]
    pub m: u64,

    /// Pilot samples per class for the adaptive split
    #[arg(long, default_value = "10")]
    pub m_pilot: u64,

    #[arg(long, default_value = "0.05")]
    pub alpha: f64,

    #[arg(long, default_value = "1234")]
    pub seed: u64,

    /// Grid points simulated concurrently
    #[arg(long, default_value = "4")]
    pub workers: usize,

    /// Also write every replicate
    #[arg(long)]
    pub replicates: bool,

    #[arg(long, default_value = "./output")]
    pub output_path: String,
}

impl From<&SimulateArgs> for SimulationParams {
    fn from(args: &SimulateArgs) -> Self {
        SimulationParams {
            theta_start: args.theta_start,
            theta_stop: args.theta_stop,
            theta_num: args.theta_num,
            replication: args.replication,
            q0: args.q0,
            q1: args.q1,
            n: args.n,
            m: args.m,
            m_pilot: args.m_pilot,
            alpha: args.alpha,
            seed: args.seed,
            workers: args.workers,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct BiasCurveArgs {
    #[arg(long, default_value = "0.7")]
    pub q0: f64,

    #[arg(long, default_value = "0.9")]
    pub q1: f64,

    #[arg(long, default_value = "1000000000")]
    pub n: u64,

    #[arg(long, default_value = "500")]
    pub m0: u64,

    #[arg(long, default_value = "500")]
    pub m1: u64,

    /// Grid points for theta
    #[arg(long, default_value = "200")]
    pub points: usize,

    #[arg(long, default_value = "0.05")]
    pub alpha: f64,

    #[arg(long, default_value = "./output")]
    pub output_path: String,
}

impl From<&BiasCurveArgs> for BiasCurveParams {
    fn from(args: &BiasCurveArgs) -> Self {
        BiasCurveParams {
            q0: args.q0,
            q1: args.q1,
            n: args.n,
            m0: args.m0,
            m1: args.m1,
            points: args.points,
            alpha: args.alpha,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CiSweepArgs {
    /// Comma-separated judged-correct rates
    #[arg(long, default_value = "0.3,0.5,0.7,0.9")]
    pub p_list: String,

    #[arg(long, default_value = "0.7")]
    pub q0: f64,

    #[arg(long, default_value = "0.9")]
    pub q1: f64,

    #[arg(long, default_value = "0.05")]
    pub alpha: f64,

    #[arg(long, default_value = "1000000000")]
    pub n: u64,

    #[arg(long, default_value = "100")]
    pub m_start: u64,

    #[arg(long, default_value = "10000")]
    pub m_stop: u64,

    #[arg(long, default_value = "10")]
    pub m_step: u64,

    #[arg(long, default_value = "./output")]
    pub output_path: String,
}

impl TryFrom<&CiSweepArgs> for CiSweepParams {
    type Error = ReportError;

    fn try_from(args: &CiSweepArgs) -> Result<Self> {
        Ok(CiSweepParams {
            p_list: parse_p_list(&args.p_list)?,
            q0: args.q0,
            q1: args.q1,
            alpha: args.alpha,
            n: args.n,
            m_start: args.m_start,
            m_stop: args.m_stop,
            m_step: args.m_step,
        })
    }
}
