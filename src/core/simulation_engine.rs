use super::errors::SimError;
use super::event_scheduler::EventScheduler;
use super::resource::Resource;
use super::types::{ProcessId, ResourceId, SimTime};
use log::{debug, trace};
use std::collections::HashMap;

/// What a process is suspended on when it hands control back to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wait {
    /// Resume after the given simulated duration
    Timeout(SimTime),
    /// Resume at the given absolute time
    Until(SimTime),
    /// Resume once the resource has been granted to this process
    Acquire(ResourceId),
    /// Finished; the engine drops the process
    Done,
}

/// A suspendable unit of work driven by the engine.
///
/// `resume` runs until the next suspension point and reports what the process
/// waits for. `W` is the shared model state the process reads and mutates.
pub trait Process<W> {
    fn name(&self) -> String;

    fn resume(&mut self, ctx: &mut Context<'_, W>) -> Result<Wait, SimError>;
}

/// View of the engine handed to a process while it runs
pub struct Context<'a, W> {
    now: SimTime,
    process: ProcessId,
    world: &'a mut W,
    scheduler: &'a mut EventScheduler,
    resources: &'a mut [Resource],
    next_process_id: &'a mut u64,
    spawned: &'a mut Vec<(ProcessId, Box<dyn Process<W>>)>,
}

impl<'a, W> Context<'a, W> {
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Id of the process currently running
    pub fn process_id(&self) -> ProcessId {
        self.process
    }

    pub fn world(&self) -> &W {
        self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        self.world
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    /// Start a new process at the current instant, after everything already
    /// due now
    pub fn spawn<P: Process<W> + 'static>(&mut self, process: P) -> ProcessId {
        let id = allocate_id(self.next_process_id);
        trace!("[Engine] {} spawns {} ({}) at t={:.3}", self.process, id, process.name(), self.now);
        self.scheduler.schedule(self.now, id);
        self.spawned.push((id, Box::new(process)));
        id
    }

    /// Give back a resource held by the running process. The next waiter, if
    /// any, is resumed at the current instant.
    pub fn release(&mut self, resource: ResourceId) -> Result<(), SimError> {
        let gate = self.resources.get_mut(resource.0).ok_or_else(|| {
            SimError::InvariantViolation(format!("unknown resource {}", resource))
        })?;

        if let Some(next) = gate.release(self.process)? {
            trace!("[Engine] {} hands '{}' to {} at t={:.3}", self.process, gate.name(), next, self.now);
            self.scheduler.schedule(self.now, next);
        }
        Ok(())
    }
}

fn allocate_id(counter: &mut u64) -> ProcessId {
    let id = ProcessId(*counter);
    *counter += 1;
    id
}

fn checked_delay(delay: SimTime) -> Result<SimTime, SimError> {
    if delay.is_finite() && delay >= 0.0 {
        Ok(delay)
    } else {
        Err(SimError::InvalidTime(format!(
            "delay {} must be finite and non-negative",
            delay
        )))
    }
}

fn checked_deadline(now: SimTime, at: SimTime) -> Result<SimTime, SimError> {
    if at.is_finite() && at >= now {
        Ok(at)
    } else {
        Err(SimError::InvalidTime(format!(
            "deadline {} lies before current time {}",
            at, now
        )))
    }
}

/// Discrete-event engine: one simulated clock, processes resumed in time
/// order, ties broken by scheduling order.
pub struct Simulation<W> {
    world: W,
    scheduler: EventScheduler,
    processes: HashMap<ProcessId, Box<dyn Process<W>>>,
    resources: Vec<Resource>,
    now: SimTime,
    next_process_id: u64,
    steps: u64,
}

impl<W> Simulation<W> {
    /// Create an engine at time zero around the given model state
    pub fn new(world: W) -> Self {
        Self {
            world,
            scheduler: EventScheduler::new(),
            processes: HashMap::new(),
            resources: Vec::new(),
            now: 0.0,
            next_process_id: 0,
            steps: 0,
        }
    }

    /// Get current simulation time
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Consume the engine, dropping any unfinished processes
    pub fn into_world(self) -> W {
        self.world
    }

    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<ResourceId, SimError> {
        self.resources.push(Resource::new(name, capacity)?);
        Ok(ResourceId(self.resources.len() - 1))
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    /// Start a process at the current instant
    pub fn schedule_now<P: Process<W> + 'static>(&mut self, process: P) -> ProcessId {
        let id = allocate_id(&mut self.next_process_id);
        self.scheduler.schedule(self.now, id);
        self.processes.insert(id, Box::new(process));
        id
    }

    /// Start a process after the given delay
    pub fn schedule_after<P: Process<W> + 'static>(
        &mut self,
        delay: SimTime,
        process: P,
    ) -> Result<ProcessId, SimError> {
        let delay = checked_delay(delay)?;
        let id = allocate_id(&mut self.next_process_id);
        self.scheduler.schedule(self.now + delay, id);
        self.processes.insert(id, Box::new(process));
        Ok(id)
    }

    /// Number of processes that have not finished yet
    pub fn live_processes(&self) -> usize {
        self.processes.len()
    }

    /// Number of process resumptions so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Check if any process is scheduled to resume
    pub fn has_pending_events(&self) -> bool {
        self.scheduler.has_events()
    }

    /// Resume the next due process, returns true if wakeups remain
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(wakeup) = self.scheduler.pop_next() else {
            return Ok(false);
        };

        let time = wakeup.time.into_inner();
        if time < self.now {
            return Err(SimError::InvariantViolation(format!(
                "wakeup for {} at {} is before current time {}",
                wakeup.process, time, self.now
            )));
        }
        self.now = time;

        let pid = wakeup.process;
        let mut process = self.processes.remove(&pid).ok_or_else(|| {
            SimError::InvariantViolation(format!("{} woke up but is not registered", pid))
        })?;

        let mut spawned = Vec::new();
        let wait = {
            let mut ctx = Context {
                now: self.now,
                process: pid,
                world: &mut self.world,
                scheduler: &mut self.scheduler,
                resources: self.resources.as_mut_slice(),
                next_process_id: &mut self.next_process_id,
                spawned: &mut spawned,
            };
            process.resume(&mut ctx)?
        };
        self.steps += 1;

        for (child_id, child) in spawned {
            self.processes.insert(child_id, child);
        }

        match wait {
            Wait::Timeout(delay) => {
                let delay = checked_delay(delay)?;
                self.scheduler.schedule(self.now + delay, pid);
                self.processes.insert(pid, process);
            }
            Wait::Until(at) => {
                let at = checked_deadline(self.now, at)?;
                self.scheduler.schedule(at, pid);
                self.processes.insert(pid, process);
            }
            Wait::Acquire(resource) => {
                let gate = self.resources.get_mut(resource.0).ok_or_else(|| {
                    SimError::InvariantViolation(format!("unknown resource {}", resource))
                })?;
                if gate.request(pid)? {
                    self.scheduler.schedule(self.now, pid);
                } else {
                    trace!("[Engine] {} queued on '{}' ({} waiting)", pid, gate.name(), gate.waiting());
                }
                self.processes.insert(pid, process);
            }
            Wait::Done => {
                trace!("[Engine] {} ({}) finished at t={:.3}", pid, process.name(), self.now);
            }
        }

        Ok(self.scheduler.has_events())
    }

    /// Run until the given horizon. Wakeups at exactly `until` are left
    /// unprocessed; the clock ends at `until`.
    pub fn run(&mut self, until: SimTime) -> Result<SimTime, SimError> {
        let until = checked_deadline(self.now, until)?;

        while let Some(next) = self.scheduler.peek_next_time() {
            if next >= until {
                break;
            }
            self.step()?;
        }
        self.now = until;

        debug!(
            "[Engine] stopped at t={:.2} after {} steps, {} processes unfinished",
            self.now,
            self.steps,
            self.processes.len()
        );
        Ok(self.now)
    }
}
