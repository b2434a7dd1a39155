//! Traffic light state machine and the process that drives it on the clock.
//!
//! The controller itself is clock-agnostic: it is told the current time via
//! [`LightController::tick`] and queue pressure via
//! [`LightController::on_queue_sample`]. [`SignalProcess`] wires it to the
//! engine, waking at every phase deadline and every sampling tick.

use super::direction::Axis;
use super::queues::QueueSnapshot;
use super::world::IntersectionWorld;
use crate::core::errors::SimError;
use crate::core::simulation_engine::{Context, Process, Wait};
use crate::core::types::SimTime;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightState {
    GreenNs,
    /// All red while right-of-way passes from NS to EW
    RedNsToEw,
    GreenEw,
    /// All red while right-of-way passes from EW to NS
    RedEwToNs,
}

impl LightState {
    /// The axis allowed to cross, if any
    pub fn green_axis(self) -> Option<Axis> {
        match self {
            LightState::GreenNs => Some(Axis::NorthSouth),
            LightState::GreenEw => Some(Axis::EastWest),
            LightState::RedNsToEw | LightState::RedEwToNs => None,
        }
    }

    pub fn is_transition(self) -> bool {
        self.green_axis().is_none()
    }

    /// Successor in the signal cycle
    pub fn next(self) -> LightState {
        match self {
            LightState::GreenNs => LightState::RedNsToEw,
            LightState::RedNsToEw => LightState::GreenEw,
            LightState::GreenEw => LightState::RedEwToNs,
            LightState::RedEwToNs => LightState::GreenNs,
        }
    }

    fn leaving(axis: Axis) -> LightState {
        match axis {
            Axis::NorthSouth => LightState::RedNsToEw,
            Axis::EastWest => LightState::RedEwToNs,
        }
    }
}

/// Phase durations in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTiming {
    pub green_ns: SimTime,
    pub green_ew: SimTime,
    pub red: SimTime,
}

impl SignalTiming {
    pub fn green(&self, axis: Axis) -> SimTime {
        match axis {
            Axis::NorthSouth => self.green_ns,
            Axis::EastWest => self.green_ew,
        }
    }

    pub fn duration(&self, state: LightState) -> SimTime {
        match state.green_axis() {
            Some(axis) => self.green(axis),
            None => self.red,
        }
    }

    /// Every phase must last a finite, positive time or the cycle never
    /// advances past its deadline.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [("green_ns", self.green_ns), ("green_ew", self.green_ew), ("red", self.red)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{} phase must last a positive number of seconds, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPolicy {
    /// Timed cycle that ignores queue contents
    FixedCycle,
    /// Hold green until the opposing axis has an approach queue of at least
    /// `threshold` cars, then switch through a red transition
    Adaptive { threshold: usize },
}

/// A phase the controller entered and when
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseChange {
    pub at: SimTime,
    pub state: LightState,
}

#[derive(Debug, Clone)]
pub struct LightController {
    policy: LightPolicy,
    timing: SignalTiming,
    state: LightState,
    phase_started: SimTime,
    /// Deadline of the current phase; `None` while an adaptive green is held
    phase_ends: Option<SimTime>,
    phase_log: Vec<PhaseChange>,
}

impl LightController {
    /// Fixed-cycle starts all red with an immediate deadline, so its first
    /// green begins at t=0. Adaptive starts directly in NS green.
    pub fn new(policy: LightPolicy, timing: SignalTiming) -> Result<Self, SimError> {
        timing.validate()?;
        if let LightPolicy::Adaptive { threshold: 0 } = policy {
            return Err(SimError::InvalidConfig(
                "adaptive threshold must be at least 1".to_string(),
            ));
        }

        let (state, phase_ends) = match policy {
            LightPolicy::FixedCycle => (LightState::RedEwToNs, Some(0.0)),
            LightPolicy::Adaptive { .. } => (LightState::GreenNs, None),
        };

        Ok(Self {
            policy,
            timing,
            state,
            phase_started: 0.0,
            phase_ends,
            phase_log: vec![PhaseChange { at: 0.0, state }],
        })
    }

    pub fn timing(&self) -> SignalTiming {
        self.timing
    }

    pub fn current_state(&self) -> LightState {
        self.state
    }

    /// Axis currently holding right-of-way
    pub fn current_axis(&self) -> Option<Axis> {
        self.state.green_axis()
    }

    pub fn is_green(&self, axis: Axis) -> bool {
        self.current_axis() == Some(axis)
    }

    pub fn phase_started(&self) -> SimTime {
        self.phase_started
    }

    /// When the current phase ends on its own, if it has a deadline
    pub fn next_transition(&self) -> Option<SimTime> {
        self.phase_ends
    }

    /// Every phase entered so far, starting with the initial state
    pub fn phase_log(&self) -> &[PhaseChange] {
        &self.phase_log
    }

    /// Number of phase changes after the initial state
    pub fn phase_changes(&self) -> usize {
        self.phase_log.len().saturating_sub(1)
    }

    /// Apply every timed transition whose deadline is at or before `now`.
    /// Returns the number of transitions applied.
    pub fn tick(&mut self, now: SimTime) -> usize {
        let mut applied = 0;
        while let Some(end) = self.phase_ends {
            if end > now {
                break;
            }
            self.enter(self.state.next(), end);
            applied += 1;
        }
        applied
    }

    /// Feed a queue sample. Only the adaptive policy reacts; returns true if
    /// the sample triggered a preemption.
    pub fn on_queue_sample(&mut self, now: SimTime, snapshot: &QueueSnapshot) -> bool {
        let LightPolicy::Adaptive { threshold } = self.policy else {
            return false;
        };
        let Some(serving) = self.state.green_axis() else {
            return false;
        };

        // minimum green: the axis's own green time
        if now < self.phase_started + self.timing.green(serving) {
            return false;
        }

        let demanding = serving.opposite();
        if snapshot.axis_peak(demanding) >= threshold {
            debug!(
                "[Light] t={:.2}: {} queue peak {} >= {}, preempting {} green",
                now,
                demanding,
                snapshot.axis_peak(demanding),
                threshold,
                serving
            );
            self.enter(LightState::leaving(serving), now);
            true
        } else {
            false
        }
    }

    fn enter(&mut self, state: LightState, at: SimTime) {
        self.state = state;
        self.phase_started = at;
        self.phase_ends = match (self.policy, state.green_axis()) {
            (LightPolicy::Adaptive { .. }, Some(_)) => None,
            _ => Some(at + self.timing.duration(state)),
        };
        self.phase_log.push(PhaseChange { at, state });
        debug!("[Light] t={:.2}: entered {:?}", at, state);
    }
}

/// Drives the world's light controller: applies phase deadlines and takes one
/// queue-length sample per sampling interval.
#[derive(Debug, Clone)]
pub struct SignalProcess {
    sample_interval: SimTime,
    samples_taken: u64,
}

impl SignalProcess {
    pub fn new(sample_interval: SimTime) -> Self {
        Self {
            sample_interval,
            samples_taken: 0,
        }
    }

    fn next_sample_at(&self) -> SimTime {
        self.samples_taken as SimTime * self.sample_interval
    }
}

impl Process<IntersectionWorld> for SignalProcess {
    fn name(&self) -> String {
        "signal".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, IntersectionWorld>) -> Result<Wait, SimError> {
        let now = ctx.now();
        let sample_due = now >= self.next_sample_at();
        let world = ctx.world_mut();

        world.light.tick(now);

        if sample_due {
            let snapshot = world.queues.snapshot();
            world.stats.record_queue_sample(
                snapshot.axis_total(Axis::NorthSouth),
                snapshot.axis_total(Axis::EastWest),
            );
            world.light.on_queue_sample(now, &snapshot);
            self.samples_taken += 1;
        }

        let next_sample = self.next_sample_at();
        let wake = match world.light.next_transition() {
            Some(deadline) if deadline < next_sample => deadline,
            _ => next_sample,
        };
        Ok(Wait::Until(wake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> SignalTiming {
        SignalTiming {
            green_ns: 10.0,
            green_ew: 6.0,
            red: 2.0,
        }
    }

    #[test]
    fn test_fixed_cycle_sequence() {
        let mut light = LightController::new(LightPolicy::FixedCycle, timing()).unwrap();
        assert_eq!(light.current_state(), LightState::RedEwToNs);
        assert_eq!(light.current_axis(), None);

        light.tick(0.0);
        assert_eq!(light.current_state(), LightState::GreenNs);
        assert_eq!(light.next_transition(), Some(10.0));

        light.tick(9.99);
        assert!(light.is_green(Axis::NorthSouth));
        light.tick(10.0);
        assert_eq!(light.current_state(), LightState::RedNsToEw);
        light.tick(12.0);
        assert_eq!(light.current_state(), LightState::GreenEw);
        light.tick(18.0);
        assert_eq!(light.current_state(), LightState::RedEwToNs);
        light.tick(20.0);
        assert_eq!(light.current_state(), LightState::GreenNs);
        assert_eq!(light.phase_started(), 20.0);
    }

    #[test]
    fn test_tick_catches_up_on_missed_deadlines() {
        let mut light = LightController::new(LightPolicy::FixedCycle, timing()).unwrap();
        let applied = light.tick(19.0);

        assert_eq!(applied, 4);
        assert_eq!(light.current_state(), LightState::RedEwToNs);
        let starts: Vec<SimTime> = light.phase_log().iter().map(|p| p.at).collect();
        assert_eq!(starts, vec![0.0, 0.0, 10.0, 12.0, 18.0]);
    }

    #[test]
    fn test_fixed_cycle_ignores_queue_pressure() {
        let mut light = LightController::new(LightPolicy::FixedCycle, timing()).unwrap();
        light.tick(0.0);
        let jammed = QueueSnapshot::from_lengths(0, 0, 500, 500);

        for t in 0..10 {
            assert!(!light.on_queue_sample(t as SimTime, &jammed));
            light.tick(t as SimTime);
            assert_eq!(light.current_state(), LightState::GreenNs);
        }
    }

    #[test]
    fn test_adaptive_holds_without_demand() {
        let mut light = LightController::new(LightPolicy::Adaptive { threshold: 3 }, timing()).unwrap();
        assert_eq!(light.current_state(), LightState::GreenNs);
        assert_eq!(light.next_transition(), None);

        let light_traffic = QueueSnapshot::from_lengths(9, 9, 2, 2);
        for t in 0..100 {
            light.tick(t as SimTime);
            assert!(!light.on_queue_sample(t as SimTime, &light_traffic));
        }
        assert_eq!(light.current_state(), LightState::GreenNs);
        assert_eq!(light.phase_changes(), 0);
    }

    #[test]
    fn test_adaptive_respects_minimum_green() {
        let mut light = LightController::new(LightPolicy::Adaptive { threshold: 3 }, timing()).unwrap();
        let demand = QueueSnapshot::from_lengths(0, 0, 3, 0);

        assert!(!light.on_queue_sample(5.0, &demand));
        assert!(!light.on_queue_sample(9.0, &demand));
        assert!(light.on_queue_sample(10.0, &demand));
        assert_eq!(light.current_state(), LightState::RedNsToEw);
        assert_eq!(light.next_transition(), Some(12.0));

        // no decisions while all red
        let reverse = QueueSnapshot::from_lengths(8, 0, 0, 0);
        assert!(!light.on_queue_sample(11.0, &reverse));

        light.tick(12.0);
        assert_eq!(light.current_state(), LightState::GreenEw);
        assert_eq!(light.next_transition(), None);

        // EW green of 6s must pass before NS can take it back
        assert!(!light.on_queue_sample(17.0, &reverse));
        assert!(light.on_queue_sample(18.0, &reverse));
        assert_eq!(light.current_state(), LightState::RedEwToNs);
        light.tick(20.0);
        assert!(light.is_green(Axis::NorthSouth));
    }

    #[test]
    fn test_never_two_axes_green() {
        let mut light = LightController::new(LightPolicy::FixedCycle, timing()).unwrap();
        let mut t = 0.0;
        while t < 200.0 {
            light.tick(t);
            assert!(!(light.is_green(Axis::NorthSouth) && light.is_green(Axis::EastWest)));
            t += 0.25;
        }
    }

    #[test]
    fn test_degenerate_timing_rejected() {
        let bad = [
            SignalTiming { green_ns: 0.0, green_ew: 0.0, red: 0.0 },
            SignalTiming { green_ns: f64::NAN, ..timing() },
            SignalTiming { green_ew: -6.0, ..timing() },
            SignalTiming { red: f64::INFINITY, ..timing() },
        ];
        for timing in bad {
            let result = LightController::new(LightPolicy::FixedCycle, timing);
            assert!(matches!(result, Err(SimError::InvalidConfig(_))), "accepted {:?}", timing);
        }
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = LightController::new(LightPolicy::Adaptive { threshold: 0 }, timing());
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }
}
