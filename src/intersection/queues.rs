use super::car::CarId;
use super::direction::{Axis, Direction};
use crate::core::errors::SimError;

/// Cars registered as waiting on each approach, in arrival order.
///
/// Only membership and length matter; crossing order is decided by the gate.
#[derive(Debug, Clone, Default)]
pub struct DirectionalQueues {
    lanes: [Vec<CarId>; 4],
}

impl DirectionalQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, direction: Direction, car: CarId) {
        self.lanes[direction.index()].push(car);
    }

    /// Remove a car from its approach. A car that is not there indicates a
    /// broken join/leave pairing.
    pub fn leave(&mut self, direction: Direction, car: CarId) -> Result<(), SimError> {
        let lane = &mut self.lanes[direction.index()];
        let position = lane.iter().position(|queued| *queued == car).ok_or_else(|| {
            SimError::InvariantViolation(format!(
                "car {} left the {} queue without being in it",
                car, direction
            ))
        })?;
        lane.remove(position);
        Ok(())
    }

    pub fn len(&self, direction: Direction) -> usize {
        self.lanes[direction.index()].len()
    }

    pub fn contains(&self, direction: Direction, car: CarId) -> bool {
        self.lanes[direction.index()].contains(&car)
    }

    /// Cars on all four approaches
    pub fn total(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            lengths: [
                self.len(Direction::North),
                self.len(Direction::South),
                self.len(Direction::East),
                self.len(Direction::West),
            ],
        }
    }
}

/// Queue lengths of all four approaches at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSnapshot {
    lengths: [usize; 4],
}

impl QueueSnapshot {
    pub fn from_lengths(north: usize, south: usize, east: usize, west: usize) -> Self {
        Self {
            lengths: [north, south, east, west],
        }
    }

    pub fn len(&self, direction: Direction) -> usize {
        self.lengths[direction.index()]
    }

    /// Sum of both approaches of an axis
    pub fn axis_total(&self, axis: Axis) -> usize {
        axis.directions().iter().map(|d| self.len(*d)).sum()
    }

    /// Longest single approach of an axis
    pub fn axis_peak(&self, axis: Axis) -> usize {
        axis.directions()
            .iter()
            .map(|d| self.len(*d))
            .max()
            .unwrap_or(0)
    }
}
