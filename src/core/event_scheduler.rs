use super::types::{ProcessId, SimTime};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A pending resumption of a process at an absolute simulated time
#[derive(Debug, Clone, Copy)]
pub struct ScheduledWakeup {
    pub time: OrderedFloat<SimTime>,
    pub sequence_num: u64,
    pub process: ProcessId,
}

impl PartialEq for ScheduledWakeup {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence_num == other.sequence_num
    }
}

impl Eq for ScheduledWakeup {}

impl PartialOrd for ScheduledWakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledWakeup {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}

/// Time-ordered queue of process wakeups.
///
/// Wakeups due at the same instant come out in the order they were scheduled.
#[derive(Debug, Default)]
pub struct EventScheduler {
    wakeups: BinaryHeap<ScheduledWakeup>,
    sequence_counter: u64,
}

impl EventScheduler {
    /// Create a new EventScheduler
    pub fn new() -> Self {
        Self {
            wakeups: BinaryHeap::new(),
            sequence_counter: 0,
        }
    }

    /// Schedule a process to resume at the given absolute time
    pub fn schedule(&mut self, time: SimTime, process: ProcessId) {
        let wakeup = ScheduledWakeup {
            time: OrderedFloat(time),
            sequence_num: self.sequence_counter,
            process,
        };

        self.wakeups.push(wakeup);
        self.sequence_counter += 1;
    }

    /// Remove and return the earliest wakeup
    pub fn pop_next(&mut self) -> Option<ScheduledWakeup> {
        self.wakeups.pop()
    }

    /// Time of the earliest wakeup without removing it
    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.wakeups.peek().map(|wakeup| wakeup.time.into_inner())
    }

    /// Check if there are any wakeups remaining in the queue
    pub fn has_events(&self) -> bool {
        !self.wakeups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earliest_time_first() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(5.0, ProcessId(1));
        scheduler.schedule(1.5, ProcessId(2));
        scheduler.schedule(3.0, ProcessId(3));

        let order: Vec<u64> = std::iter::from_fn(|| scheduler.pop_next())
            .map(|w| w.process.id())
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut scheduler = EventScheduler::new();
        for id in [7, 3, 9, 1] {
            scheduler.schedule(2.0, ProcessId(id));
        }
        scheduler.schedule(1.0, ProcessId(42));

        assert_eq!(scheduler.peek_next_time(), Some(1.0));
        assert_eq!(scheduler.pop_next().map(|w| w.process), Some(ProcessId(42)));

        let order: Vec<u64> = std::iter::from_fn(|| scheduler.pop_next())
            .map(|w| w.process.id())
            .collect();
        assert_eq!(order, vec![7, 3, 9, 1]);
        assert!(!scheduler.has_events());
    }
}
