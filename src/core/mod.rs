//! Generic discrete-event engine: clock, process scheduling and resources.

pub mod errors;
pub mod event_scheduler;
pub mod execution;
pub mod resource;
pub mod simulation_engine;
pub mod types;

#[cfg(test)]
mod tests;
