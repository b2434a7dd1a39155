use super::car::Car;
use super::direction::Axis;
use crate::core::errors::SimError;
use crate::core::types::SimTime;

/// Measurements collected during one run.
///
/// Appended to while the run executes; only read once it has ended.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    car_count: u64,
    queue_times: Vec<SimTime>,
    wait_times: Vec<SimTime>,
    queue_lengths_ns: Vec<usize>,
    queue_lengths_ew: Vec<usize>,
    total_wait_time: SimTime,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a car that has crossed. Cars without complete timestamps are
    /// rejected.
    pub fn record_departure(&mut self, car: &Car) -> Result<(), SimError> {
        let (Some(queue_time), Some(wait_time)) = (car.queue_time(), car.total_wait_time()) else {
            return Err(SimError::InvariantViolation(format!(
                "{} recorded as departed without complete timestamps",
                car.id
            )));
        };

        self.car_count += 1;
        self.queue_times.push(queue_time);
        self.wait_times.push(wait_time);
        self.total_wait_time += wait_time;
        Ok(())
    }

    pub fn record_queue_sample(&mut self, ns: usize, ew: usize) {
        self.queue_lengths_ns.push(ns);
        self.queue_lengths_ew.push(ew);
    }

    pub fn car_count(&self) -> u64 {
        self.car_count
    }

    pub fn queue_times(&self) -> &[SimTime] {
        &self.queue_times
    }

    pub fn wait_times(&self) -> &[SimTime] {
        &self.wait_times
    }

    pub fn queue_lengths(&self, axis: Axis) -> &[usize] {
        match axis {
            Axis::NorthSouth => &self.queue_lengths_ns,
            Axis::EastWest => &self.queue_lengths_ew,
        }
    }

    pub fn total_wait_time(&self) -> SimTime {
        self.total_wait_time
    }

    pub fn mean_queue_time(&self) -> Option<f64> {
        mean(self.queue_times.iter().copied())
    }

    pub fn mean_total_wait(&self) -> Option<f64> {
        if self.car_count == 0 {
            None
        } else {
            Some(self.total_wait_time / self.car_count as f64)
        }
    }

    pub fn mean_queue_length(&self, axis: Axis) -> Option<f64> {
        mean(self.queue_lengths(axis).iter().map(|len| *len as f64))
    }
}

/// Arithmetic mean, `None` for an empty sample
pub fn mean<I: IntoIterator<Item = f64>>(samples: I) -> Option<f64> {
    let (sum, count) = samples
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersection::car::CarId;
    use crate::intersection::direction::Direction;

    fn crossed(id: u64, arrival: SimTime, start: SimTime, departure: SimTime) -> Car {
        let mut car = Car::new(CarId(id), Direction::North);
        car.arrival = Some(arrival);
        car.crossing_start = Some(start);
        car.departure = Some(departure);
        car
    }

    #[test]
    fn test_empty_statistics_have_no_data() {
        let stats = RunStatistics::new();
        assert_eq!(stats.car_count(), 0);
        assert_eq!(stats.mean_queue_time(), None);
        assert_eq!(stats.mean_total_wait(), None);
        assert_eq!(stats.mean_queue_length(Axis::NorthSouth), None);
    }

    #[test]
    fn test_means() {
        let mut stats = RunStatistics::new();
        stats.record_departure(&crossed(1, 0.0, 2.0, 3.0)).unwrap();
        stats.record_departure(&crossed(2, 1.0, 5.0, 6.0)).unwrap();
        stats.record_queue_sample(4, 0);
        stats.record_queue_sample(1, 2);

        assert_eq!(stats.car_count(), 2);
        assert_eq!(stats.mean_queue_time(), Some(3.0));
        assert_eq!(stats.total_wait_time(), 8.0);
        assert_eq!(stats.mean_total_wait(), Some(4.0));
        assert_eq!(stats.mean_queue_length(Axis::NorthSouth), Some(2.5));
        assert_eq!(stats.mean_queue_length(Axis::EastWest), Some(1.0));
    }

    #[test]
    fn test_incomplete_car_rejected() {
        let mut stats = RunStatistics::new();
        let mut car = Car::new(CarId(7), Direction::West);
        car.arrival = Some(1.0);

        assert!(stats.record_departure(&car).is_err());
        assert_eq!(stats.car_count(), 0);
        assert!(stats.queue_times().is_empty());
    }
}
