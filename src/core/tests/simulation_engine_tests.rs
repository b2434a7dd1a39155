// Tests for the process-based Simulation engine
use crate::core::errors::SimError;
use crate::core::simulation_engine::{Context, Process, Simulation, Wait};
use crate::core::types::{ResourceId, SimTime};

#[derive(Default)]
struct Log {
    entries: Vec<(String, SimTime)>,
    occupancy: usize,
    max_occupancy: usize,
}

/// Logs each resume, then sleeps through the listed delays
struct Ticker {
    name: &'static str,
    delays: Vec<SimTime>,
}

impl Process<Log> for Ticker {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, Log>) -> Result<Wait, SimError> {
        let now = ctx.now();
        ctx.world_mut().entries.push((self.name.to_string(), now));
        if self.delays.is_empty() {
            Ok(Wait::Done)
        } else {
            Ok(Wait::Timeout(self.delays.remove(0)))
        }
    }
}

/// Acquires the gate, holds it for `hold`, releases
struct User {
    gate: ResourceId,
    hold: SimTime,
    holding: bool,
}

impl Process<Log> for User {
    fn name(&self) -> String {
        "user".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, Log>) -> Result<Wait, SimError> {
        if !self.holding {
            if ctx.resource(self.gate).map_or(false, |g| g.is_held_by(ctx.process_id())) {
                self.holding = true;
                let log = ctx.world_mut();
                log.occupancy += 1;
                log.max_occupancy = log.max_occupancy.max(log.occupancy);
                return Ok(Wait::Timeout(self.hold));
            }
            return Ok(Wait::Acquire(self.gate));
        }

        ctx.world_mut().occupancy -= 1;
        ctx.release(self.gate)?;
        let now = ctx.now();
        ctx.world_mut().entries.push(("released".to_string(), now));
        Ok(Wait::Done)
    }
}

struct Spawner;

impl Process<Log> for Spawner {
    fn name(&self) -> String {
        "spawner".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, Log>) -> Result<Wait, SimError> {
        ctx.spawn(Ticker { name: "child", delays: vec![] });
        let now = ctx.now();
        ctx.world_mut().entries.push(("spawner".to_string(), now));
        Ok(Wait::Done)
    }
}

struct BadSleeper;

impl Process<Log> for BadSleeper {
    fn name(&self) -> String {
        "bad".to_string()
    }

    fn resume(&mut self, _ctx: &mut Context<'_, Log>) -> Result<Wait, SimError> {
        Ok(Wait::Timeout(-1.0))
    }
}

fn names(log: &Log) -> Vec<&str> {
    log.entries.iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn test_run_stops_before_horizon() {
    let mut sim = Simulation::new(Log::default());
    sim.schedule_now(Ticker { name: "a", delays: vec![5.0, 5.0, 5.0] });

    let end = sim.run(10.0).unwrap();

    assert_eq!(end, 10.0);
    assert_eq!(sim.now(), 10.0);
    // The wakeup at exactly t=10 is not processed
    let times: Vec<SimTime> = sim.world().entries.iter().map(|(_, t)| *t).collect();
    assert_eq!(times, vec![0.0, 5.0]);
    assert!(sim.has_pending_events());
    assert_eq!(sim.live_processes(), 1);

    sim.run(10.5).unwrap();
    assert_eq!(sim.world().entries.len(), 3);
}

#[test]
fn test_same_instant_runs_in_scheduling_order() {
    let mut sim = Simulation::new(Log::default());
    sim.schedule_now(Ticker { name: "first", delays: vec![2.0] });
    sim.schedule_now(Ticker { name: "second", delays: vec![2.0] });
    sim.schedule_after(2.0, Ticker { name: "third", delays: vec![] }).unwrap();

    sim.run(100.0).unwrap();

    assert_eq!(
        names(sim.world()),
        vec!["first", "second", "third", "first", "second"]
    );
    assert_eq!(sim.live_processes(), 0);
    assert_eq!(sim.steps(), 5);
}

#[test]
fn test_spawned_process_runs_at_same_instant() {
    let mut sim = Simulation::new(Log::default());
    sim.schedule_after(3.0, Spawner).unwrap();

    sim.run(4.0).unwrap();

    assert_eq!(
        sim.world().entries,
        vec![("spawner".to_string(), 3.0), ("child".to_string(), 3.0)]
    );
}

#[test]
fn test_invalid_times_are_rejected() {
    let mut sim = Simulation::new(Log::default());
    assert!(matches!(
        sim.schedule_after(-0.5, Spawner),
        Err(SimError::InvalidTime(_))
    ));
    assert!(sim.schedule_after(f64::NAN, Spawner).is_err());

    sim.schedule_now(BadSleeper);
    assert!(matches!(sim.run(1.0), Err(SimError::InvalidTime(_))));

    let mut sim = Simulation::new(Log::default());
    sim.run(5.0).unwrap();
    assert!(sim.run(4.0).is_err());
}

#[test]
fn test_step_on_empty_engine() {
    let mut sim = Simulation::new(Log::default());
    assert!(!sim.step().unwrap());
    assert_eq!(sim.steps(), 0);
}

#[test]
fn test_gate_serializes_same_instant_requests() {
    let mut sim = Simulation::new(Log::default());
    let gate = sim.add_resource("gate", 1).unwrap();
    for _ in 0..50 {
        sim.schedule_now(User { gate, hold: 1.0, holding: false });
    }

    sim.run(1000.0).unwrap();

    let log = sim.world();
    assert_eq!(log.max_occupancy, 1);
    assert_eq!(log.occupancy, 0);
    let releases: Vec<SimTime> = log.entries.iter().map(|(_, t)| *t).collect();
    let expected: Vec<SimTime> = (1..=50).map(|i| i as SimTime).collect();
    assert_eq!(releases, expected);

    let gate = sim.resource(gate).unwrap();
    assert_eq!(gate.grants(), 50);
    assert_eq!(gate.waiting(), 0);
    assert!(gate.holders().is_empty());
}

#[test]
fn test_wider_gate_admits_capacity() {
    let mut sim = Simulation::new(Log::default());
    let gate = sim.add_resource("lanes", 3).unwrap();
    for _ in 0..10 {
        sim.schedule_now(User { gate, hold: 2.0, holding: false });
    }

    sim.run(100.0).unwrap();

    assert_eq!(sim.world().max_occupancy, 3);
    assert_eq!(sim.world().entries.len(), 10);
}

#[test]
fn test_zero_capacity_resource_rejected() {
    let mut sim = Simulation::new(Log::default());
    assert!(matches!(
        sim.add_resource("closed", 0),
        Err(SimError::InvalidConfig(_))
    ));
}
