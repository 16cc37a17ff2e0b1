pub mod allocation;
pub mod calibration;
pub mod engine;
pub mod simulation;
pub mod sweep;

pub use crate::domain::model::{AccuracyEstimate, Allocation, EstimateInput, Interval};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
