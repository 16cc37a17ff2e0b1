pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command, ReportArgs};

pub use adapters::LocalStorage;
pub use app::pipelines::{ReportPipeline, SimulationPipeline, Sweep, SweepPipeline};
pub use config::TomlConfig;
pub use core::{
    allocation::allocate_calibration_sample,
    calibration::{confidence_interval, point_estimator},
    engine::ReportEngine,
};
pub use utils::error::{ReportError, Result};
