pub mod report_pipeline;
pub mod simulation_pipeline;
pub mod sweep_pipeline;

pub use report_pipeline::ReportPipeline;
pub use simulation_pipeline::SimulationPipeline;
pub use sweep_pipeline::{Sweep, SweepPipeline};
