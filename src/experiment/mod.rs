//! Experiment layer: configuration, repeated runs and reporting.

pub mod config;
pub mod runner;

pub use config::{ArrivalMode, IntersectionConfig, PolicyKind};
pub use runner::{simulate, ExperimentRunner, ExperimentSummary, PolicyComparison, RunReport};
