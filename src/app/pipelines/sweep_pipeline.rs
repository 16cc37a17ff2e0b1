use std::path::Path;

use crate::app::pipelines::simulation_pipeline::to_csv;
use crate::core::sweep::{
    bias_curve, ci_length_sweep, BiasCurve, BiasCurveParams, CiLengthPoint, CiSweepParams,
};
use crate::core::{Pipeline, Storage};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

pub const BIAS_CURVE_CSV: &str = "bias_curve.csv";
pub const CI_LENGTH_CSV: &str = "ci_length.csv";

#[derive(Debug, Clone)]
pub enum Sweep {
    BiasCurve(BiasCurveParams),
    CiLength(CiSweepParams),
}

pub enum SweepTable {
    BiasCurve(BiasCurve),
    CiLength(Vec<CiLengthPoint>),
}

/// Deterministic curves written as CSV.
pub struct SweepPipeline<S: Storage> {
    storage: S,
    sweep: Sweep,
    output_path: String,
}

impl<S: Storage> SweepPipeline<S> {
    pub fn new(storage: S, sweep: Sweep, output_path: String) -> Self {
        Self {
            storage,
            sweep,
            output_path,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SweepPipeline<S> {
    type Input = Sweep;
    type Output = SweepTable;

    fn name(&self) -> &str {
        match self.sweep {
            Sweep::BiasCurve(_) => "bias-curve",
            Sweep::CiLength(_) => "ci-sweep",
        }
    }

    async fn extract(&self) -> Result<Sweep> {
        match &self.sweep {
            Sweep::BiasCurve(params) => params.validate()?,
            Sweep::CiLength(params) => params.validate()?,
        }
        Ok(self.sweep.clone())
    }

    async fn transform(&self, sweep: Sweep) -> Result<SweepTable> {
        match sweep {
            Sweep::BiasCurve(params) => Ok(SweepTable::BiasCurve(bias_curve(&params)?)),
            Sweep::CiLength(params) => Ok(SweepTable::CiLength(ci_length_sweep(&params)?)),
        }
    }

    async fn load(&self, table: SweepTable) -> Result<String> {
        let (file_name, data) = match &table {
            SweepTable::BiasCurve(curve) => {
                match curve.turning_point {
                    Some(theta) => tracing::info!("Bias changes sign at θ={:.4}", theta),
                    None => tracing::info!("Judge is perfect; no bias to correct"),
                }
                (BIAS_CURVE_CSV, to_csv(&curve.points)?)
            }
            SweepTable::CiLength(rows) => {
                tracing::info!("{} interval lengths computed", rows.len());
                (CI_LENGTH_CSV, to_csv(rows)?)
            }
        };

        let path = Path::new(&self.output_path)
            .join(file_name)
            .to_string_lossy()
            .into_owned();
        self.storage.write_file(&path, &data).await?;
        Ok(path)
    }
}
