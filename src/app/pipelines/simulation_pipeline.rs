use std::path::Path;

use serde::Serialize;

use crate::core::simulation::{linspace, simulate_grid, summarize, SimulationParams, ThetaBatch};
use crate::core::{Pipeline, Storage};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::Validate;

pub const SUMMARY_CSV: &str = "simulation_summary.csv";
pub const REPLICATES_CSV: &str = "simulation_replicates.csv";

/// Monte Carlo coverage study written as CSV tables.
pub struct SimulationPipeline<S: Storage> {
    storage: S,
    params: SimulationParams,
    output_path: String,
    write_replicates: bool,
}

impl<S: Storage> SimulationPipeline<S> {
    pub fn new(storage: S, params: SimulationParams, output_path: String) -> Self {
        Self {
            storage,
            params,
            output_path,
            write_replicates: false,
        }
    }

    pub fn with_replicates(mut self, write_replicates: bool) -> Self {
        self.write_replicates = write_replicates;
        self
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(&self.output_path)
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

pub(crate) fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| ReportError::ProcessingError {
        message: format!("flushing CSV: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SimulationPipeline<S> {
    type Input = Vec<f64>;
    type Output = Vec<ThetaBatch>;

    fn name(&self) -> &str {
        "simulation"
    }

    async fn extract(&self) -> Result<Vec<f64>> {
        self.params.validate()?;
        Ok(linspace(
            self.params.theta_start,
            self.params.theta_stop,
            self.params.theta_num,
        ))
    }

    async fn transform(&self, grid: Vec<f64>) -> Result<Vec<ThetaBatch>> {
        tracing::debug!("theta grid: {:?}", grid);
        simulate_grid(&self.params, grid).await
    }

    async fn load(&self, batches: Vec<ThetaBatch>) -> Result<String> {
        let summary = summarize(&batches);
        for row in &summary {
            tracing::info!(
                "θ={:.2} {:<8} coverage={:.3} naive={:.3} length={:.4}",
                row.theta,
                row.arm.as_str(),
                row.theta_coverage,
                row.p_coverage,
                row.mean_ci_length
            );
        }

        let summary_path = self.output_file(SUMMARY_CSV);
        self.storage
            .write_file(&summary_path, &to_csv(&summary)?)
            .await?;

        if self.write_replicates {
            let replicates = batches
                .iter()
                .flat_map(|batch| batch.equal.iter().chain(batch.adaptive.iter()));
            let replicates_path = self.output_file(REPLICATES_CSV);
            self.storage
                .write_file(&replicates_path, &to_csv(replicates)?)
                .await?;
        }

        Ok(summary_path)
    }
}
