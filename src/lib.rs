pub mod core;
pub mod experiment;
pub mod intersection;

// Re-export commonly used types
pub use crate::core::errors::SimError;
pub use crate::core::execution::{ConcurrencyMode, ExecutionConfig};
pub use crate::core::simulation_engine::{Context, Process, Simulation, Wait};
pub use crate::core::types::{ProcessId, ResourceId, SimTime};
pub use crate::experiment::{
    ArrivalMode, ExperimentRunner, ExperimentSummary, IntersectionConfig, PolicyComparison,
    PolicyKind, RunReport,
};
pub use crate::intersection::{ArrivalPattern, Axis, Direction, LightPolicy, ScriptedArrival};
