use super::direction::Direction;
use super::world::IntersectionWorld;
use crate::core::errors::SimError;
use crate::core::simulation_engine::{Context, Process, Wait};
use crate::core::types::{ResourceId, SimTime};
use log::debug;
use std::fmt;

/// How often a waiting car looks at the light again
pub const LIGHT_POLL_INTERVAL: SimTime = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub u64);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car#{}", self.0)
    }
}

/// A vehicle and the timestamps of its trip through the intersection
#[derive(Debug, Clone, PartialEq)]
pub struct Car {
    pub id: CarId,
    pub direction: Direction,
    pub arrival: Option<SimTime>,
    pub crossing_start: Option<SimTime>,
    pub departure: Option<SimTime>,
}

impl Car {
    pub fn new(id: CarId, direction: Direction) -> Self {
        Self {
            id,
            direction,
            arrival: None,
            crossing_start: None,
            departure: None,
        }
    }

    /// Time from arrival until the car entered the intersection
    pub fn queue_time(&self) -> Option<SimTime> {
        Some(self.crossing_start? - self.arrival?)
    }

    /// Time from arrival until the car left the intersection
    pub fn total_wait_time(&self) -> Option<SimTime> {
        Some(self.departure? - self.arrival?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarPhase {
    Created,
    /// Registered on its approach, polling the light
    Queued,
    /// Light was green; waiting for the crossing gate
    WaitingForGate,
    /// Holding the gate for the drive time
    Crossing,
    Departed,
}

/// Lifecycle of one car: arrive, queue, wait for green, cross, depart.
///
/// The car stays in its approach queue until it departs, including while it
/// waits for or holds the crossing gate.
#[derive(Debug, Clone)]
pub struct CarProcess {
    car: Car,
    phase: CarPhase,
    crossing: ResourceId,
    drive_time: SimTime,
}

impl CarProcess {
    pub fn new(car: Car, crossing: ResourceId, drive_time: SimTime) -> Self {
        Self {
            car,
            phase: CarPhase::Created,
            crossing,
            drive_time,
        }
    }

    pub fn car(&self) -> &Car {
        &self.car
    }

    fn check_light(&mut self, ctx: &Context<'_, IntersectionWorld>) -> Wait {
        if ctx.world().light.is_green(self.car.direction.axis()) {
            self.phase = CarPhase::WaitingForGate;
            Wait::Acquire(self.crossing)
        } else {
            Wait::Timeout(LIGHT_POLL_INTERVAL)
        }
    }
}

impl Process<IntersectionWorld> for CarProcess {
    fn name(&self) -> String {
        self.car.id.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, IntersectionWorld>) -> Result<Wait, SimError> {
        let now = ctx.now();

        match self.phase {
            CarPhase::Created => {
                self.car.arrival = Some(now);
                ctx.world_mut().queues.join(self.car.direction, self.car.id);
                self.phase = CarPhase::Queued;
                debug!("[Car:{}] arrived from {} at t={:.2}", self.car.id, self.car.direction, now);
                Ok(self.check_light(ctx))
            }
            CarPhase::Queued => Ok(self.check_light(ctx)),
            CarPhase::WaitingForGate => {
                self.car.crossing_start = Some(now);
                self.phase = CarPhase::Crossing;
                debug!("[Car:{}] entering intersection at t={:.2}", self.car.id, now);
                Ok(Wait::Timeout(self.drive_time))
            }
            CarPhase::Crossing => {
                ctx.release(self.crossing)?;
                self.car.departure = Some(now);

                let world = ctx.world_mut();
                world.queues.leave(self.car.direction, self.car.id)?;
                world.stats.record_departure(&self.car)?;
                self.phase = CarPhase::Departed;
                debug!(
                    "[Car:{}] departed at t={:.2} (queued {:.2}s)",
                    self.car.id,
                    now,
                    self.car.queue_time().unwrap_or_default()
                );
                Ok(Wait::Done)
            }
            CarPhase::Departed => Err(SimError::InvariantViolation(format!(
                "{} resumed after departing",
                self.car.id
            ))),
        }
    }
}
