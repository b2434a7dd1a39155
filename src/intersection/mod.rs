//! The intersection model: light controller, cars, arrivals and statistics,
//! built on the engine in [`crate::core`].

pub mod arrivals;
pub mod car;
pub mod direction;
pub mod light;
pub mod queues;
pub mod stats;
pub mod world;

pub use arrivals::{ArrivalGenerator, ArrivalPattern, ScriptedArrival};
pub use car::{Car, CarId, CarPhase, CarProcess, LIGHT_POLL_INTERVAL};
pub use direction::{Axis, Direction};
pub use light::{LightController, LightPolicy, LightState, PhaseChange, SignalProcess, SignalTiming};
pub use queues::{DirectionalQueues, QueueSnapshot};
pub use stats::RunStatistics;
pub use world::IntersectionWorld;
