//! Car arrival stream.
//!
//! The generator is itself a process: it spawns a [`CarProcess`] per arrival
//! and sleeps until the next one. It never stops on its own for the random
//! patterns; the run horizon bounds it.

use super::car::{Car, CarId, CarProcess};
use super::direction::Direction;
use super::world::IntersectionWorld;
use crate::core::errors::SimError;
use crate::core::simulation_engine::{Context, Process, Wait};
use crate::core::types::{ResourceId, SimTime};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Exp};

/// One arrival of a scripted stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedArrival {
    pub at: SimTime,
    pub direction: Direction,
}

impl ScriptedArrival {
    pub fn new(at: SimTime, direction: Direction) -> Self {
        Self { at, direction }
    }
}

/// How arrival times (and, for scripts, directions) are produced
#[derive(Debug, Clone, PartialEq)]
pub enum ArrivalPattern {
    /// Exponential gaps with the given mean; uniformly random directions
    Poisson { mean: SimTime },
    /// First car at t=0, then one every `interval`; uniformly random directions
    Fixed { interval: SimTime },
    /// Exact arrival times and directions
    Scripted(Vec<ScriptedArrival>),
}

#[derive(Debug, Clone)]
enum Source {
    Poisson(Exp<f64>),
    Fixed(SimTime),
    Scripted(Vec<ScriptedArrival>),
}

#[derive(Debug)]
pub struct ArrivalGenerator {
    source: Source,
    rng: StdRng,
    crossing: ResourceId,
    drive_time: SimTime,
    initial_cars: usize,
    initial_direction: Direction,
    max_cars: Option<u64>,
    next_id: u64,
    generated: u64,
    script_cursor: usize,
    started: bool,
}

impl ArrivalGenerator {
    pub fn new(
        pattern: ArrivalPattern,
        rng: StdRng,
        crossing: ResourceId,
        drive_time: SimTime,
    ) -> Result<Self, SimError> {
        let source = match pattern {
            ArrivalPattern::Poisson { mean } => {
                if !(mean.is_finite() && mean > 0.0) {
                    return Err(SimError::InvalidConfig(format!(
                        "arrival mean must be positive, got {}",
                        mean
                    )));
                }
                let gaps = Exp::new(1.0 / mean).map_err(|e| {
                    SimError::InvalidConfig(format!("arrival mean {}: {}", mean, e))
                })?;
                Source::Poisson(gaps)
            }
            ArrivalPattern::Fixed { interval } => {
                if !(interval.is_finite() && interval > 0.0) {
                    return Err(SimError::InvalidConfig(format!(
                        "arrival interval must be positive, got {}",
                        interval
                    )));
                }
                Source::Fixed(interval)
            }
            ArrivalPattern::Scripted(mut script) => {
                if let Some(bad) = script.iter().find(|a| !(a.at.is_finite() && a.at >= 0.0)) {
                    return Err(SimError::InvalidConfig(format!(
                        "scripted arrival at invalid time {}",
                        bad.at
                    )));
                }
                script.sort_by(|a, b| a.at.total_cmp(&b.at));
                Source::Scripted(script)
            }
        };

        Ok(Self {
            source,
            rng,
            crossing,
            drive_time,
            initial_cars: 0,
            initial_direction: Direction::North,
            max_cars: None,
            next_id: 1,
            generated: 0,
            script_cursor: 0,
            started: false,
        })
    }

    /// Cars placed on one approach at t=0, ahead of the stream
    pub fn with_initial_cars(mut self, count: usize, direction: Direction) -> Self {
        self.initial_cars = count;
        self.initial_direction = direction;
        self
    }

    /// Stop after this many stream cars (initial cars not counted)
    pub fn with_max_cars(mut self, max_cars: Option<u64>) -> Self {
        self.max_cars = max_cars;
        self
    }

    /// Cars created so far, initial cars included
    pub fn cars_created(&self) -> u64 {
        self.next_id - 1
    }

    fn cap_reached(&self) -> bool {
        self.max_cars.is_some_and(|max| self.generated >= max)
    }

    fn create_car(&mut self, direction: Direction) -> CarProcess {
        let id = CarId(self.next_id);
        self.next_id += 1;
        CarProcess::new(Car::new(id, direction), self.crossing, self.drive_time)
    }

    fn random_direction(&mut self) -> Direction {
        Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())]
    }

    fn emit(&mut self, ctx: &mut Context<'_, IntersectionWorld>) {
        let direction = match &self.source {
            Source::Scripted(script) => match script.get(self.script_cursor) {
                Some(arrival) => {
                    self.script_cursor += 1;
                    arrival.direction
                }
                None => return,
            },
            Source::Poisson(_) | Source::Fixed(_) => self.random_direction(),
        };

        let car = self.create_car(direction);
        debug!("[Arrivals] t={:.2}: {} from {}", ctx.now(), car.car().id, direction);
        ctx.spawn(car);
        self.generated += 1;
    }

    fn next_wait(&mut self, now: SimTime) -> Wait {
        if self.cap_reached() {
            return Wait::Done;
        }

        match &self.source {
            Source::Poisson(gaps) => Wait::Timeout(gaps.sample(&mut self.rng)),
            Source::Fixed(interval) => Wait::Timeout(*interval),
            Source::Scripted(script) => match script.get(self.script_cursor) {
                Some(arrival) => Wait::Until(arrival.at.max(now)),
                None => Wait::Done,
            },
        }
    }
}

impl Process<IntersectionWorld> for ArrivalGenerator {
    fn name(&self) -> String {
        "arrivals".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, IntersectionWorld>) -> Result<Wait, SimError> {
        if self.started {
            self.emit(ctx);
        } else {
            self.started = true;
            for _ in 0..self.initial_cars {
                let car = self.create_car(self.initial_direction);
                ctx.spawn(car);
            }
            if matches!(self.source, Source::Fixed(_)) && !self.cap_reached() {
                self.emit(ctx);
            }
        }

        Ok(self.next_wait(ctx.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const GATE: ResourceId = ResourceId(0);

    #[test]
    fn test_rejects_bad_patterns() {
        let rng = || StdRng::seed_from_u64(1);
        assert!(ArrivalGenerator::new(ArrivalPattern::Poisson { mean: 0.0 }, rng(), GATE, 1.0).is_err());
        assert!(ArrivalGenerator::new(ArrivalPattern::Poisson { mean: -3.0 }, rng(), GATE, 1.0).is_err());
        assert!(ArrivalGenerator::new(ArrivalPattern::Fixed { interval: f64::NAN }, rng(), GATE, 1.0).is_err());

        let script = vec![ScriptedArrival::new(-1.0, Direction::East)];
        assert!(ArrivalGenerator::new(ArrivalPattern::Scripted(script), rng(), GATE, 1.0).is_err());
    }

    #[test]
    fn test_scripted_waits_follow_sorted_script() {
        let script = vec![
            ScriptedArrival::new(4.0, Direction::West),
            ScriptedArrival::new(1.5, Direction::North),
        ];
        let mut generator =
            ArrivalGenerator::new(ArrivalPattern::Scripted(script), StdRng::seed_from_u64(1), GATE, 1.0).unwrap();

        assert_eq!(generator.next_wait(0.0), Wait::Until(1.5));
        generator.script_cursor = 1;
        assert_eq!(generator.next_wait(1.5), Wait::Until(4.0));
        generator.script_cursor = 2;
        assert_eq!(generator.next_wait(4.0), Wait::Done);
    }

    #[test]
    fn test_poisson_gaps_are_positive_and_near_mean() {
        let mut generator = ArrivalGenerator::new(
            ArrivalPattern::Poisson { mean: 3.0 },
            StdRng::seed_from_u64(99),
            GATE,
            1.0,
        )
        .unwrap();

        let mut total = 0.0;
        let samples = 20_000;
        for _ in 0..samples {
            match generator.next_wait(0.0) {
                Wait::Timeout(gap) => {
                    assert!(gap >= 0.0);
                    total += gap;
                }
                other => panic!("unexpected wait {:?}", other),
            }
        }
        let mean = total / samples as f64;
        assert!((mean - 3.0).abs() < 0.15, "sample mean {}", mean);
    }

    #[test]
    fn test_cap_stops_stream() {
        let mut generator = ArrivalGenerator::new(
            ArrivalPattern::Fixed { interval: 2.0 },
            StdRng::seed_from_u64(5),
            GATE,
            1.0,
        )
        .unwrap()
        .with_max_cars(Some(2));

        assert_eq!(generator.next_wait(0.0), Wait::Timeout(2.0));
        generator.generated = 2;
        assert_eq!(generator.next_wait(4.0), Wait::Done);
    }
}
