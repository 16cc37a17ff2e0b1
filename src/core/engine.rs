use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through extract, transform and load.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {} pipeline", name);
        self.monitor.log_stats("start");

        tracing::info!("📥 Extracting...");
        let input = self.pipeline.extract().await?;
        self.monitor.log_stats("extract");

        tracing::info!("🧮 Computing...");
        let output = self.pipeline.transform(input).await?;
        self.monitor.log_stats("transform");

        tracing::info!("💾 Writing results...");
        let output_path = self.pipeline.load(output).await?;
        self.monitor.log_stats("load");

        self.monitor.log_final_stats();
        tracing::info!("📁 {} output saved to: {}", name, output_path);
        Ok(output_path)
    }
}
