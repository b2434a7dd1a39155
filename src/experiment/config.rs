use crate::core::errors::SimError;
use crate::core::types::SimTime;
use crate::intersection::{ArrivalPattern, Direction, LightPolicy, SignalTiming};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    #[default]
    FixedCycle,
    Adaptive,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::FixedCycle => f.write_str("fixed-cycle"),
            PolicyKind::Adaptive => f.write_str("adaptive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrivalMode {
    /// Exponential gaps with mean `arrival_mean`
    #[default]
    Poisson,
    /// One car every `arrival_mean` seconds
    Fixed,
}

/// Parameters of one intersection experiment. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionConfig {
    pub green_time_ns: SimTime,
    pub green_time_ew: SimTime,
    pub red_time: SimTime,
    pub arrival_mean: SimTime,
    pub simulation_time: SimTime,
    pub drive_time: SimTime,
    /// Approach queue length that makes the adaptive light switch
    pub queue_threshold: usize,
    pub initial_cars: usize,
    pub initial_direction: Direction,
    pub num_runs: usize,
    /// Base seed; run `i` uses `seed + i`
    pub seed: u64,
    pub policy: PolicyKind,
    pub arrival_mode: ArrivalMode,
    /// Cap on generated cars per run, initial cars excluded
    pub max_cars: Option<u64>,
    /// Spacing of queue-length samples
    pub sample_interval: SimTime,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            green_time_ns: 60.0,
            green_time_ew: 60.0,
            red_time: 2.0,
            arrival_mean: 3.0,
            simulation_time: 100.0,
            drive_time: 1.0,
            queue_threshold: 5,
            initial_cars: 1,
            initial_direction: Direction::North,
            num_runs: 20,
            seed: 42,
            policy: PolicyKind::FixedCycle,
            arrival_mode: ArrivalMode::Poisson,
            max_cars: None,
            sample_interval: 1.0,
        }
    }
}

fn require_positive(name: &str, value: SimTime) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidConfig(format!(
            "{} must be a positive number of seconds, got {}",
            name, value
        )))
    }
}

impl IntersectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_signal_timing(mut self, green_ns: SimTime, green_ew: SimTime, red: SimTime) -> Self {
        self.green_time_ns = green_ns;
        self.green_time_ew = green_ew;
        self.red_time = red;
        self
    }

    pub fn with_arrival_mean(mut self, mean: SimTime) -> Self {
        self.arrival_mean = mean;
        self
    }

    pub fn with_arrival_mode(mut self, mode: ArrivalMode) -> Self {
        self.arrival_mode = mode;
        self
    }

    pub fn with_simulation_time(mut self, time: SimTime) -> Self {
        self.simulation_time = time;
        self
    }

    pub fn with_drive_time(mut self, time: SimTime) -> Self {
        self.drive_time = time;
        self
    }

    pub fn with_queue_threshold(mut self, threshold: usize) -> Self {
        self.queue_threshold = threshold;
        self
    }

    pub fn with_initial_cars(mut self, count: usize, direction: Direction) -> Self {
        self.initial_cars = count;
        self.initial_direction = direction;
        self
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.num_runs = runs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_cars(mut self, max_cars: Option<u64>) -> Self {
        self.max_cars = max_cars;
        self
    }

    /// Reject anything that cannot describe a meaningful run. Values are never
    /// clamped.
    pub fn validate(&self) -> Result<(), SimError> {
        require_positive("green_time_ns", self.green_time_ns)?;
        require_positive("green_time_ew", self.green_time_ew)?;
        require_positive("red_time", self.red_time)?;
        require_positive("arrival_mean", self.arrival_mean)?;
        require_positive("simulation_time", self.simulation_time)?;
        require_positive("drive_time", self.drive_time)?;
        require_positive("sample_interval", self.sample_interval)?;

        if self.queue_threshold == 0 {
            return Err(SimError::InvalidConfig(
                "queue_threshold must be at least 1".to_string(),
            ));
        }
        if self.num_runs == 0 {
            return Err(SimError::InvalidConfig("num_runs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn signal_timing(&self) -> SignalTiming {
        SignalTiming {
            green_ns: self.green_time_ns,
            green_ew: self.green_time_ew,
            red: self.red_time,
        }
    }

    pub fn light_policy(&self) -> LightPolicy {
        match self.policy {
            PolicyKind::FixedCycle => LightPolicy::FixedCycle,
            PolicyKind::Adaptive => LightPolicy::Adaptive {
                threshold: self.queue_threshold,
            },
        }
    }

    pub fn arrival_pattern(&self) -> ArrivalPattern {
        match self.arrival_mode {
            ArrivalMode::Poisson => ArrivalPattern::Poisson {
                mean: self.arrival_mean,
            },
            ArrivalMode::Fixed => ArrivalPattern::Fixed {
                interval: self.arrival_mean,
            },
        }
    }

    /// Seed of the run with the given zero-based index
    pub fn run_seed(&self, run_index: usize) -> u64 {
        self.seed.wrapping_add(run_index as u64)
    }
}
