use super::errors::SimError;
use super::types::ProcessId;
use std::collections::VecDeque;

/// A counted resource with a FIFO waiting line.
///
/// With capacity 1 this is a mutual-exclusion gate: at most one process holds
/// it, and waiters are granted in the order they asked.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    capacity: usize,
    holders: Vec<ProcessId>,
    waiters: VecDeque<ProcessId>,
    grants: u64,
}

impl Resource {
    /// Create a resource. A capacity of zero could never be granted and is
    /// rejected.
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self, SimError> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimError::InvalidConfig(format!(
                "resource '{}' needs a capacity of at least 1",
                name
            )));
        }
        Ok(Self {
            name,
            capacity,
            holders: Vec::with_capacity(capacity),
            waiters: VecDeque::new(),
            grants: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask for the resource. Returns true when granted immediately, false when
    /// the process was placed at the back of the waiting line.
    pub fn request(&mut self, process: ProcessId) -> Result<bool, SimError> {
        if self.holders.contains(&process) || self.waiters.contains(&process) {
            return Err(SimError::InvariantViolation(format!(
                "{} requested resource '{}' twice",
                process, self.name
            )));
        }

        if self.holders.len() < self.capacity {
            self.holders.push(process);
            self.grants += 1;
            Ok(true)
        } else {
            self.waiters.push_back(process);
            Ok(false)
        }
    }

    /// Give the resource back. Returns the waiter that now holds it, if any.
    pub fn release(&mut self, process: ProcessId) -> Result<Option<ProcessId>, SimError> {
        let position = self
            .holders
            .iter()
            .position(|holder| *holder == process)
            .ok_or_else(|| {
                SimError::InvariantViolation(format!(
                    "{} released resource '{}' it does not hold",
                    process, self.name
                ))
            })?;
        self.holders.remove(position);

        match self.waiters.pop_front() {
            Some(next) => {
                self.holders.push(next);
                self.grants += 1;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    pub fn holders(&self) -> &[ProcessId] {
        &self.holders
    }

    pub fn is_held_by(&self, process: ProcessId) -> bool {
        self.holders.contains(&process)
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Total number of grants over the resource's lifetime
    pub fn grants(&self) -> u64 {
        self.grants
    }
}
