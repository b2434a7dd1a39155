//! Repeated independent runs of the intersection model and their reports.

use super::config::{IntersectionConfig, PolicyKind};
use crate::core::errors::SimError;
use crate::core::execution::{ConcurrencyMode, ExecutionConfig};
use crate::core::simulation_engine::Simulation;
use crate::intersection::stats::mean;
use crate::intersection::{
    ArrivalGenerator, ArrivalPattern, Axis, IntersectionWorld, LightController, SignalProcess,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Execute one run with the given arrival stream and return the final model
/// state. Processes still waiting at the horizon are dropped.
pub fn simulate(
    config: &IntersectionConfig,
    arrivals: ArrivalPattern,
    seed: u64,
) -> Result<IntersectionWorld, SimError> {
    config.validate()?;

    let light = LightController::new(config.light_policy(), config.signal_timing())?;
    let mut sim = Simulation::new(IntersectionWorld::new(light));
    let crossing = sim.add_resource("crossing", 1)?;

    let generator = ArrivalGenerator::new(
        arrivals,
        StdRng::seed_from_u64(seed),
        crossing,
        config.drive_time,
    )?
    .with_initial_cars(config.initial_cars, config.initial_direction)
    .with_max_cars(config.max_cars);

    sim.schedule_now(SignalProcess::new(config.sample_interval));
    sim.schedule_now(generator);
    sim.run(config.simulation_time)?;

    if let Some(gate) = sim.resource(crossing) {
        debug!(
            "[Run] seed {}: gate granted {} times, {} still waiting",
            seed,
            gate.grants(),
            gate.waiting()
        );
    }
    Ok(sim.into_world())
}

/// Per-run aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// One-based run number
    pub run: usize,
    pub seed: u64,
    pub policy: PolicyKind,
    pub cars_completed: u64,
    /// Cars still queued or crossing when the run stopped
    pub cars_abandoned: usize,
    pub mean_queue_time: Option<f64>,
    pub mean_total_wait: Option<f64>,
    pub mean_queue_ns: Option<f64>,
    pub mean_queue_ew: Option<f64>,
    pub phase_changes: usize,
}

impl RunReport {
    pub fn from_world(run: usize, seed: u64, policy: PolicyKind, world: &IntersectionWorld) -> Self {
        let stats = &world.stats;
        Self {
            run,
            seed,
            policy,
            cars_completed: stats.car_count(),
            cars_abandoned: world.cars_in_intersection(),
            mean_queue_time: stats.mean_queue_time(),
            mean_total_wait: stats.mean_total_wait(),
            mean_queue_ns: stats.mean_queue_length(Axis::NorthSouth),
            mean_queue_ew: stats.mean_queue_length(Axis::EastWest),
            phase_changes: world.light.phase_changes(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.cars_completed > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mean_queue_time {
            Some(queue_time) if self.has_data() => write!(
                f,
                "run {}: mean queue time {:.2} s, mean NS queue {:.2} cars, mean EW queue {:.2} cars",
                self.run,
                queue_time,
                self.mean_queue_ns.unwrap_or(0.0),
                self.mean_queue_ew.unwrap_or(0.0)
            ),
            _ => write!(f, "run {}: no cars completed", self.run),
        }
    }
}

/// Simple average of per-run means over the runs that produced data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub policy: PolicyKind,
    pub runs: usize,
    pub runs_with_data: usize,
    pub total_cars: u64,
    pub mean_queue_time: Option<f64>,
    pub mean_queue_ns: Option<f64>,
    pub mean_queue_ew: Option<f64>,
}

impl ExperimentSummary {
    pub fn from_reports(policy: PolicyKind, reports: &[RunReport]) -> Self {
        let with_data: Vec<&RunReport> = reports.iter().filter(|r| r.has_data()).collect();
        Self {
            policy,
            runs: reports.len(),
            runs_with_data: with_data.len(),
            total_cars: reports.iter().map(|r| r.cars_completed).sum(),
            mean_queue_time: mean(with_data.iter().filter_map(|r| r.mean_queue_time)),
            mean_queue_ns: mean(with_data.iter().filter_map(|r| r.mean_queue_ns)),
            mean_queue_ew: mean(with_data.iter().filter_map(|r| r.mean_queue_ew)),
        }
    }
}

fn or_no_data(value: Option<f64>) -> String {
    value.map_or_else(|| "no data".to_string(), |v| format!("{:.2}", v))
}

impl fmt::Display for ExperimentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} over {} runs ({} with data, {} cars): mean queue time {}, mean NS queue {}, mean EW queue {}",
            self.policy,
            self.runs,
            self.runs_with_data,
            self.total_cars,
            or_no_data(self.mean_queue_time),
            or_no_data(self.mean_queue_ns),
            or_no_data(self.mean_queue_ew)
        )
    }
}

/// Runs `num_runs` independent simulations of one configuration
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    config: IntersectionConfig,
    execution: ExecutionConfig,
}

impl ExperimentRunner {
    pub fn new(config: IntersectionConfig, execution: ExecutionConfig) -> Result<Self, SimError> {
        config.validate()?;
        if execution.thread_pool_size == Some(0) {
            return Err(SimError::InvalidConfig(
                "thread pool size must be at least 1".to_string(),
            ));
        }
        Ok(Self { config, execution })
    }

    pub fn config(&self) -> &IntersectionConfig {
        &self.config
    }

    /// Execute the run with the given zero-based index
    pub fn run_once(&self, run_index: usize) -> Result<RunReport, SimError> {
        let seed = self.config.run_seed(run_index);
        let world = simulate(&self.config, self.config.arrival_pattern(), seed)?;
        let report = RunReport::from_world(run_index + 1, seed, self.config.policy, &world);

        if report.cars_abandoned > 0 {
            warn!(
                "[Run {}] {} cars still in the intersection at t={}",
                report.run, report.cars_abandoned, self.config.simulation_time
            );
        }
        info!(
            "[Run {}] {} policy, seed {}: {} cars completed, {} phase changes",
            report.run, report.policy, seed, report.cars_completed, report.phase_changes
        );
        Ok(report)
    }

    /// Execute every run; reports come back in run order regardless of the
    /// concurrency mode.
    pub fn run_all(&self) -> Result<Vec<RunReport>, SimError> {
        let runs = self.config.num_runs;
        debug!(
            "[Runner] {} runs of {} s, parallel: {}",
            runs,
            self.config.simulation_time,
            self.execution.is_parallel()
        );
        let reports: Vec<RunReport> = match self.execution.concurrency_mode {
            ConcurrencyMode::Sequential => (0..runs)
                .map(|run_index| self.run_once(run_index))
                .collect::<Result<Vec<_>, _>>()?,
            ConcurrencyMode::Rayon => {
                let mut builder = rayon::ThreadPoolBuilder::new();
                if let Some(size) = self.execution.thread_pool_size {
                    builder = builder.num_threads(size);
                }
                let pool = builder.build().map_err(|e| {
                    SimError::InvalidConfig(format!("cannot build thread pool: {}", e))
                })?;
                pool.install(|| {
                    (0..runs)
                        .into_par_iter()
                        .map(|run_index| self.run_once(run_index))
                        .collect::<Result<Vec<_>, _>>()
                })?
            }
        };

        let empty = reports.iter().filter(|r| !r.has_data()).count();
        if empty > 0 {
            warn!("{} of {} runs completed no cars", empty, runs);
        }
        Ok(reports)
    }

    pub fn summarize(&self, reports: &[RunReport]) -> ExperimentSummary {
        ExperimentSummary::from_reports(self.config.policy, reports)
    }
}

/// Both policies over identical per-run seeds
#[derive(Debug, Clone, Serialize)]
pub struct PolicyComparison {
    pub fixed_cycle: Vec<RunReport>,
    pub adaptive: Vec<RunReport>,
}

impl PolicyComparison {
    pub fn run(config: &IntersectionConfig, execution: &ExecutionConfig) -> Result<Self, SimError> {
        let fixed = ExperimentRunner::new(
            config.clone().with_policy(PolicyKind::FixedCycle),
            execution.clone(),
        )?;
        let adaptive = ExperimentRunner::new(
            config.clone().with_policy(PolicyKind::Adaptive),
            execution.clone(),
        )?;

        Ok(Self {
            fixed_cycle: fixed.run_all()?,
            adaptive: adaptive.run_all()?,
        })
    }

    pub fn summaries(&self) -> (ExperimentSummary, ExperimentSummary) {
        (
            ExperimentSummary::from_reports(PolicyKind::FixedCycle, &self.fixed_cycle),
            ExperimentSummary::from_reports(PolicyKind::Adaptive, &self.adaptive),
        )
    }
}
