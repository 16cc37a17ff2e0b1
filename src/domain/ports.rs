use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Settings a report run needs, independent of where they came from
/// (command line or TOML file).
pub trait ConfigProvider: Send + Sync {
    fn report_name(&self) -> &str;
    fn test_set_path(&self) -> &str;
    fn calibration_path(&self) -> &str;
    fn judge_column(&self) -> &str;
    fn human_column(&self) -> &str;
    fn calibration_judge_column(&self) -> &str;
    fn alpha(&self) -> f64;
    fn budget(&self) -> Option<u64>;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Input>;
    async fn transform(&self, input: Self::Input) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<String>;
}
