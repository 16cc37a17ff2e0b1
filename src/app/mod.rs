// Application layer: concrete pipelines wiring adapters to the statistics core.

pub mod pipelines;
