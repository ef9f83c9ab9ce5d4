//! MotionUnit: drives a set of property channels from timestamps.
//!
//! A unit is either tweened (easing over a fixed duration) or physics-driven (one
//! channel integrated until its velocity decays). Both share the same state machine:
//!
//! `Stopped -> (Delayed) -> Moving <-> Paused -> Stopped`
//!
//! Timers are absolute timestamps. Pausing remembers the last seen timestamp and the
//! first update after resuming shifts every timer by the time spent paused, so
//! output is continuous across a pause.

use std::fmt;

use log::{debug, trace, warn};

use crate::additive::{AdditiveRegistry, AdditiveSnapshot, BlendSpan, SnapshotCell};
use crate::channel::PropertyChannel;
use crate::config::{Config, UnitCfg};
use crate::easing::Easing;
use crate::events::{EventHub, MotionEvent};
use crate::ids::OperationId;
use crate::moveable::{
    CyclePolicy, MotionDirection, MotionState, Moveable, MoveableKind, TempoSubscription,
};
use crate::physics::PhysicsIntegrator;

/// Range below which progress falls back to elapsed time.
const RANGE_EPSILON: f64 = 1e-12;

#[derive(Clone, Debug)]
enum Driver {
    Tween {
        easing: Easing,
        reverse_easing: Option<Easing>,
    },
    Physics {
        integrator: PhysicsIntegrator,
        /// Odd number of direction flips applied since the last reset.
        flipped: bool,
    },
}

#[derive(Debug)]
struct AdditiveLink {
    registry: AdditiveRegistry,
    snapshot: SnapshotCell,
    operation: Option<OperationId>,
}

pub struct MotionUnit {
    name: String,
    channels: Vec<PropertyChannel>,
    driver: Driver,
    state: MotionState,
    direction: MotionDirection,
    delay: f64,
    duration: f64,
    policy: CyclePolicy,
    additive: Option<AdditiveLink>,
    additive_weighting: f64,
    starts_resolved: bool,
    /// Single backward pass started by [`Moveable::begin_reverse`].
    playing_back: bool,

    start_time: Option<f64>,
    end_time: f64,
    delay_started: Option<f64>,
    pause_timestamp: Option<f64>,
    last_timestamp: Option<f64>,

    motion_progress: f64,
    cycle_progress: f64,
    total_progress: f64,
    cycles_completed: u32,

    events: EventHub,
    tempo: TempoSubscription,
}

impl MotionUnit {
    /// Tweened unit over `duration` seconds with linear easing.
    pub fn new(channels: Vec<PropertyChannel>, duration: f64) -> Self {
        Self::with_driver(
            channels,
            duration,
            Driver::Tween {
                easing: Easing::Linear,
                reverse_easing: None,
            },
        )
    }

    /// Physics-driven unit moving one channel from its start value.
    /// When collisions are enabled the channel's start and end are the walls.
    pub fn physics(channel: PropertyChannel, integrator: PhysicsIntegrator) -> Self {
        Self::with_driver(
            vec![channel],
            0.0,
            Driver::Physics {
                integrator,
                flipped: false,
            },
        )
    }

    fn with_driver(channels: Vec<PropertyChannel>, duration: f64, driver: Driver) -> Self {
        Self {
            name: String::new(),
            channels,
            driver,
            state: MotionState::Stopped,
            direction: MotionDirection::Forward,
            delay: 0.0,
            duration: duration.max(0.0),
            policy: CyclePolicy::default(),
            additive: None,
            additive_weighting: 1.0,
            starts_resolved: false,
            playing_back: false,
            start_time: None,
            end_time: 0.0,
            delay_started: None,
            pause_timestamp: None,
            last_timestamp: None,
            motion_progress: 0.0,
            cycle_progress: 0.0,
            total_progress: 0.0,
            cycles_completed: 0,
            events: EventHub::default(),
            tempo: TempoSubscription::Detached,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        if let Driver::Tween { easing: e, .. } = &mut self.driver {
            *e = easing;
        }
        self
    }

    /// Easing for the reverse half; defaults to the forward easing.
    pub fn with_reverse_easing(mut self, easing: Easing) -> Self {
        if let Driver::Tween { reverse_easing, .. } = &mut self.driver {
            *reverse_easing = Some(easing);
        }
        self
    }

    /// Repeat `cycles` extra times ([`REPEAT_INFINITE`](crate::config::REPEAT_INFINITE) for forever).
    pub fn repeating(mut self, cycles: u32) -> Self {
        self.policy.repeating = true;
        self.policy.repeat_cycles = cycles;
        self
    }

    pub fn reversing(mut self, reversing: bool) -> Self {
        self.policy.reversing = reversing;
        self
    }

    /// Compose with other additive units on the same properties through `registry`.
    pub fn additive(mut self, registry: &AdditiveRegistry) -> Self {
        self.additive = Some(AdditiveLink {
            registry: registry.clone(),
            snapshot: SnapshotCell::default(),
            operation: None,
        });
        self
    }

    pub fn with_additive_weighting(mut self, weighting: f64) -> Self {
        self.set_additive_weighting(weighting);
        self
    }

    /// Apply a [`UnitCfg`]. An additive config without a registry gets a private one.
    pub fn with_cfg(mut self, cfg: UnitCfg) -> Self {
        let cfg = cfg.sanitized();
        self.duration = cfg.duration;
        self.delay = cfg.delay;
        self.policy = CyclePolicy {
            repeating: cfg.repeating,
            repeat_cycles: cfg.repeat_cycles,
            reversing: cfg.reversing,
        };
        self.additive_weighting = cfg.additive_weighting;
        if let Driver::Tween {
            easing,
            reverse_easing,
        } = &mut self.driver
        {
            *easing = cfg.easing;
            *reverse_easing = cfg.reverse_easing;
        }
        if cfg.additive && self.additive.is_none() {
            debug!(
                "unit '{}' additive without registry; using a private one",
                self.name
            );
            self = self.additive(&AdditiveRegistry::new());
        } else if !cfg.additive {
            self.additive = None;
        }
        self
    }

    /// Apply engine-wide settings (event queue size, physics solver constants).
    pub fn with_config(mut self, config: &Config) -> Self {
        self.events.set_max_pending(config.max_pending_events);
        if let Driver::Physics { integrator, .. } = &mut self.driver {
            *integrator = integrator.clone().with_cfg(config.physics);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &[PropertyChannel] {
        &self.channels
    }

    pub fn channel(&self, path: &str) -> Option<&PropertyChannel> {
        self.channels.iter().find(|c| c.path() == path)
    }

    /// Add a channel while stopped; ignored otherwise.
    pub fn add_channel(&mut self, channel: PropertyChannel) {
        if self.state != MotionState::Stopped {
            trace!(
                "unit '{}': add_channel ignored while {}",
                self.name, self.state
            );
            return;
        }
        self.channels.push(channel);
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn set_delay(&mut self, delay: f64) {
        self.delay = delay.max(0.0);
    }

    pub fn policy(&self) -> CyclePolicy {
        self.policy
    }

    pub fn is_additive(&self) -> bool {
        self.additive.is_some()
    }

    pub fn additive_weighting(&self) -> f64 {
        self.additive_weighting
    }

    /// Clamped to [0, 1].
    pub fn set_additive_weighting(&mut self, weighting: f64) {
        self.additive_weighting = weighting.clamp(0.0, 1.0);
        if let Some(link) = &self.additive {
            link.snapshot.borrow_mut().weighting = self.additive_weighting;
        }
    }

    /// Registry token while an additive unit is active.
    pub fn operation_id(&self) -> Option<OperationId> {
        self.additive.as_ref().and_then(|l| l.operation)
    }

    pub fn motion_progress(&self) -> f64 {
        self.motion_progress
    }

    pub fn physics_integrator(&self) -> Option<&PhysicsIntegrator> {
        match &self.driver {
            Driver::Physics { integrator, .. } => Some(integrator),
            Driver::Tween { .. } => None,
        }
    }

    fn is_physics(&self) -> bool {
        matches!(self.driver, Driver::Physics { .. })
    }

    fn refresh_progress(&mut self) {
        if self.playing_back {
            self.cycle_progress = self.motion_progress;
            self.total_progress = self.motion_progress;
            return;
        }
        self.cycle_progress = self.policy.cycle_progress(self.motion_progress, self.direction);
        self.total_progress = self
            .policy
            .total_progress(self.cycles_completed, self.cycle_progress);
    }

    fn zero_progress(&mut self) {
        self.motion_progress = 0.0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
    }

    fn register_additive(&mut self) {
        if let Some(link) = self.additive.as_mut() {
            if let Some(old) = link.operation.take() {
                link.registry.unregister(old);
            }
            {
                let mut snap = link.snapshot.borrow_mut();
                snap.weighting = self.additive_weighting;
                snap.spans.clear();
            }
            link.operation = Some(link.registry.register(&link.snapshot));
        }
    }

    fn publish_spans(&self) {
        if let Some(link) = &self.additive {
            let mut snap = link.snapshot.borrow_mut();
            *snap = AdditiveSnapshot {
                weighting: self.additive_weighting,
                spans: self
                    .channels
                    .iter()
                    .map(|c| BlendSpan {
                        key: c.key().clone(),
                        start: c.start,
                        end: c.end,
                    })
                    .collect(),
            };
        }
    }

    /// Seed lazily resolved starts: additive blend, else the live value.
    fn resolve_starts(&mut self) {
        if self.starts_resolved {
            return;
        }
        self.starts_resolved = true;
        let operation = self.operation_id();
        for ch in self.channels.iter_mut() {
            let blended = self
                .additive
                .as_ref()
                .and_then(|l| l.registry.blend_value(ch.key(), operation));
            let start = match blended {
                Some(v) => Some(v),
                None if self.additive.is_some() || ch.use_existing_start_value => {
                    match ch.read_live() {
                        Ok(v) => Some(v),
                        Err(err) => {
                            warn!("unit '{}': cannot read '{}': {err}", self.name, ch.path());
                            None
                        }
                    }
                }
                None => None,
            };
            if let Some(start) = start {
                ch.start = start;
            }
        }
        self.publish_spans();
    }

    fn push_values(&mut self) {
        let weighting = self.additive.as_ref().map(|_| self.additive_weighting);
        for ch in &self.channels {
            if let Err(err) = ch.push(weighting) {
                warn!(
                    "unit '{}': write to '{}' failed: {err}",
                    self.name,
                    ch.path()
                );
            }
        }
    }

    /// First update after entering `Moving`: initialize timers and push once.
    fn begin_movement(&mut self, timestamp: f64) {
        if self.direction == MotionDirection::Forward {
            self.resolve_starts();
        }
        let reverse = self.direction == MotionDirection::Reverse;
        for ch in self.channels.iter_mut() {
            let from = if reverse { ch.end } else { ch.start };
            ch.jump_to(from);
        }
        self.start_time = Some(timestamp);
        self.end_time = timestamp + self.duration;
        self.last_timestamp = Some(timestamp);

        if let Driver::Physics { integrator, .. } = &mut self.driver {
            integrator.reset();
            if let Some(ch) = self.channels.first() {
                if integrator.use_collision_detection() {
                    integrator.set_bounds(Some((ch.start, ch.end)));
                }
                integrator.solve(ch.current, timestamp);
            }
        }
        trace!("unit '{}' movement begins at {timestamp}", self.name);
        self.push_values();
    }

    fn step_tween(&mut self, timestamp: f64) {
        let Some(start_time) = self.start_time else {
            return;
        };
        let finished = timestamp >= self.end_time;
        let elapsed = (timestamp.min(self.end_time) - start_time).max(0.0);
        let easing = match (&self.driver, self.direction) {
            (Driver::Tween { easing, .. }, MotionDirection::Forward) => *easing,
            (
                Driver::Tween {
                    easing,
                    reverse_easing,
                },
                MotionDirection::Reverse,
            ) => reverse_easing.unwrap_or(*easing),
            (Driver::Physics { .. }, _) => return,
        };
        let reverse = self.direction == MotionDirection::Reverse;
        for ch in self.channels.iter_mut() {
            let (from, to) = if reverse {
                (ch.end, ch.start)
            } else {
                (ch.start, ch.end)
            };
            let value = if finished {
                to
            } else {
                easing.ease(elapsed, from, to - from, self.duration)
            };
            ch.advance_to(value);
        }
        self.motion_progress = self.measure_progress(elapsed);
        self.refresh_progress();
        self.push_values();
        self.events.emit(MotionEvent::Updated {
            total_progress: self.total_progress,
        });
        if finished {
            self.finish_pass();
        }
    }

    fn measure_progress(&self, elapsed: f64) -> f64 {
        if let Some(ch) = self.channels.first() {
            let range = ch.end - ch.start;
            if range.abs() > RANGE_EPSILON {
                let covered = match self.direction {
                    MotionDirection::Forward => ch.current - ch.start,
                    MotionDirection::Reverse => ch.end - ch.current,
                };
                return (covered / range).clamp(0.0, 1.0);
            }
        }
        if self.duration <= 0.0 {
            1.0
        } else {
            (elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    fn step_physics(&mut self, timestamp: f64) {
        let Driver::Physics { integrator, .. } = &mut self.driver else {
            return;
        };
        let Some(ch) = self.channels.first_mut() else {
            return;
        };
        let position = integrator.solve(ch.current, timestamp);
        ch.advance_to(position);
        let settled = integrator.has_settled();
        self.motion_progress = integrator.decay_progress();
        self.refresh_progress();
        self.push_values();
        self.events.emit(MotionEvent::Updated {
            total_progress: self.total_progress,
        });
        if settled {
            self.finish_pass();
        }
    }

    /// A forward or reverse pass reached its end.
    fn finish_pass(&mut self) {
        if self.playing_back {
            self.complete();
        } else if self.policy.reversing && self.direction == MotionDirection::Forward {
            self.flip_to_reverse();
        } else if self.policy.has_cycles_remaining(self.cycles_completed) {
            self.next_cycle();
        } else {
            self.complete();
        }
    }

    fn flip_to_reverse(&mut self) {
        self.direction = MotionDirection::Reverse;
        self.motion_progress = 0.0;
        self.refresh_progress();
        self.start_time = Some(self.end_time);
        self.end_time += self.duration;
        if let Driver::Physics {
            integrator,
            flipped,
        } = &mut self.driver
        {
            integrator.reset();
            integrator.reverse_direction();
            *flipped = !*flipped;
        }
        debug!("unit '{}' reversing", self.name);
        self.events.emit(MotionEvent::Reversed);
        self.events.emit(MotionEvent::HalfCompleted);
    }

    fn next_cycle(&mut self) {
        self.cycles_completed += 1;
        self.direction = MotionDirection::Forward;
        self.motion_progress = 0.0;
        self.refresh_progress();
        for ch in self.channels.iter_mut() {
            ch.advance_to(ch.start);
        }
        self.start_time = Some(self.end_time);
        self.end_time += self.duration;
        if let Driver::Physics {
            integrator,
            flipped,
        } = &mut self.driver
        {
            integrator.reset();
            if *flipped {
                integrator.reverse_direction();
                *flipped = false;
            }
        }
        self.push_values();
        debug!(
            "unit '{}' repeating (cycle {})",
            self.name, self.cycles_completed
        );
        self.events.emit(MotionEvent::Repeated {
            cycles_completed: self.cycles_completed,
        });
    }

    fn complete(&mut self) {
        let reverse = self.direction == MotionDirection::Reverse;
        let physics = self.is_physics();
        for ch in self.channels.iter_mut() {
            // A forward physics pass ends wherever friction stopped it.
            let target = match (reverse, physics) {
                (true, _) => ch.start,
                (false, false) => ch.end,
                (false, true) => ch.current,
            };
            ch.advance_to(target);
        }
        self.push_values();
        self.motion_progress = 1.0;
        self.cycle_progress = 1.0;
        self.total_progress = 1.0;
        self.cycles_completed += 1;
        self.state = MotionState::Stopped;
        self.playing_back = false;
        self.teardown();
        debug!("unit '{}' completed", self.name);
        self.events.emit(MotionEvent::Completed);
    }

    /// Release the tempo subscription and the additive registration. Idempotent.
    fn teardown(&mut self) {
        if let Some(link) = self.additive.as_mut() {
            if let Some(op) = link.operation.take() {
                link.registry.unregister(op);
            }
        }
        self.tempo.on_teardown();
        self.start_time = None;
        self.delay_started = None;
        self.pause_timestamp = None;
    }

    fn enter_moving(&mut self) {
        self.state = MotionState::Moving;
        self.start_time = None;
        self.pause_timestamp = None;
    }
}

impl Moveable for MotionUnit {
    fn kind(&self) -> MoveableKind {
        MoveableKind::Unit
    }

    fn start(&mut self) {
        if self.state != MotionState::Stopped {
            trace!("unit '{}': start ignored while {}", self.name, self.state);
            return;
        }
        self.direction = MotionDirection::Forward;
        self.cycles_completed = 0;
        self.zero_progress();
        self.starts_resolved = false;
        self.playing_back = false;
        self.delay_started = None;
        self.last_timestamp = None;
        self.register_additive();
        self.tempo.on_start();
        if self.delay > 0.0 {
            self.state = MotionState::Delayed;
            debug!("unit '{}' delayed {}s", self.name, self.delay);
        } else {
            self.enter_moving();
            debug!("unit '{}' started", self.name);
            self.events.emit(MotionEvent::Started);
        }
    }

    fn stop(&mut self) {
        if self.state == MotionState::Stopped {
            trace!("unit '{}': stop ignored while stopped", self.name);
            return;
        }
        self.state = MotionState::Stopped;
        self.playing_back = false;
        self.zero_progress();
        self.teardown();
        debug!("unit '{}' stopped", self.name);
        self.events.emit(MotionEvent::Stopped);
    }

    fn pause(&mut self) {
        if self.state != MotionState::Moving {
            trace!("unit '{}': pause ignored while {}", self.name, self.state);
            return;
        }
        self.pause_timestamp = self.last_timestamp;
        self.state = MotionState::Paused;
        self.events.emit(MotionEvent::Paused);
    }

    fn resume(&mut self) {
        if self.state != MotionState::Paused {
            trace!("unit '{}': resume ignored while {}", self.name, self.state);
            return;
        }
        self.state = MotionState::Moving;
        self.events.emit(MotionEvent::Resumed);
    }

    fn reset(&mut self) {
        self.teardown();
        self.state = MotionState::Stopped;
        self.direction = MotionDirection::Forward;
        self.cycles_completed = 0;
        self.zero_progress();
        self.starts_resolved = false;
        self.playing_back = false;
        self.last_timestamp = None;
        for ch in self.channels.iter_mut() {
            ch.rewind();
        }
        if let Driver::Physics {
            integrator,
            flipped,
        } = &mut self.driver
        {
            if *flipped {
                integrator.reverse_direction();
                *flipped = false;
            }
            integrator.reset();
        }
    }

    fn update(&mut self, timestamp: f64) {
        match self.state {
            MotionState::Stopped | MotionState::Paused => return,
            MotionState::Delayed => {
                let began = *self.delay_started.get_or_insert(timestamp);
                if timestamp - began < self.delay {
                    return;
                }
                self.enter_moving();
                debug!("unit '{}' started after delay", self.name);
                self.events.emit(MotionEvent::Started);
            }
            MotionState::Moving => {}
        }

        if let Some(paused_at) = self.pause_timestamp.take() {
            let shift = (timestamp - paused_at).max(0.0);
            if let Some(start) = self.start_time.as_mut() {
                *start += shift;
                self.end_time += shift;
            }
            if let Driver::Physics { integrator, .. } = &mut self.driver {
                integrator.shift_timestamp(shift);
            }
        }

        if self.start_time.is_none() {
            self.begin_movement(timestamp);
            if self.is_physics() || self.duration > 0.0 {
                return;
            }
        }
        self.last_timestamp = Some(timestamp);
        if self.is_physics() {
            self.step_physics(timestamp);
        } else {
            self.step_tween(timestamp);
        }
    }

    fn begin_reverse(&mut self) {
        if self.state != MotionState::Stopped {
            trace!(
                "unit '{}': begin_reverse ignored while {}",
                self.name, self.state
            );
            return;
        }
        self.direction = MotionDirection::Reverse;
        self.playing_back = true;
        self.cycles_completed = 0;
        self.motion_progress = 0.0;
        self.refresh_progress();
        self.last_timestamp = None;
        self.register_additive();
        self.publish_spans();
        self.tempo.on_start();
        if let Driver::Physics {
            integrator,
            flipped,
        } = &mut self.driver
        {
            integrator.reverse_direction();
            *flipped = !*flipped;
        }
        self.enter_moving();
        debug!("unit '{}' playing backward", self.name);
        self.events.emit(MotionEvent::Reversed);
    }

    fn state(&self) -> MotionState {
        self.state
    }

    fn direction(&self) -> MotionDirection {
        self.direction
    }

    fn total_progress(&self) -> f64 {
        self.total_progress
    }

    fn cycle_progress(&self) -> f64 {
        self.cycle_progress
    }

    fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    fn is_reversing(&self) -> bool {
        self.policy.reversing
    }

    fn set_reversing(&mut self, reversing: bool) {
        self.policy.reversing = reversing;
    }

    fn events(&mut self) -> &mut EventHub {
        &mut self.events
    }

    fn tempo(&self) -> TempoSubscription {
        self.tempo
    }

    fn set_tempo(&mut self, subscription: TempoSubscription) {
        self.tempo = subscription;
    }
}

impl Drop for MotionUnit {
    fn drop(&mut self) {
        if let Some(link) = self.additive.as_mut() {
            if let Some(op) = link.operation.take() {
                link.registry.unregister(op);
            }
        }
    }
}

impl fmt::Debug for MotionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionUnit")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("channels", &self.channels)
            .field("total_progress", &self.total_progress)
            .field("cycles_completed", &self.cycles_completed)
            .finish()
    }
}

impl fmt::Display for MotionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "unit"
        } else {
            &self.name
        };
        write!(
            f,
            "{name} [{} {:?}] {:.1}%",
            self.state,
            self.direction,
            self.total_progress * 100.0
        )?;
        for ch in &self.channels {
            write!(f, "\n  {} = {:.4}", ch.path(), ch.current)?;
            write!(f, " ({} -> {})", ch.start, ch.end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{shared, Shared};

    fn unit(t: &Shared<f64>, end: f64, duration: f64) -> MotionUnit {
        let ch = PropertyChannel::bind(t, "value", 0.0, end).unwrap();
        MotionUnit::new(vec![ch], duration)
    }

    #[test]
    fn invalid_transitions_are_no_ops() {
        let t = shared(0.0_f64);
        let mut u = unit(&t, 1.0, 1.0);
        u.pause();
        u.resume();
        u.stop();
        assert_eq!(u.state(), MotionState::Stopped);
        assert!(u.take_events().is_empty());
        u.start();
        u.start();
        assert_eq!(u.take_events(), vec![MotionEvent::Started]);
    }

    #[test]
    fn negative_settings_are_clamped() {
        let t = shared(0.0_f64);
        let u = unit(&t, 1.0, -3.0)
            .with_delay(-1.0)
            .with_additive_weighting(2.0);
        assert_eq!(u.duration(), 0.0);
        assert_eq!(u.delay(), 0.0);
        assert_eq!(u.additive_weighting(), 1.0);
    }

    #[test]
    fn zero_duration_completes_on_first_update() {
        let t = shared(0.0_f64);
        let mut u = unit(&t, 3.0, 0.0);
        u.start();
        u.update(5.0);
        assert_eq!(u.state(), MotionState::Stopped);
        assert_eq!(*t.borrow(), 3.0);
        assert_eq!(u.total_progress(), 1.0);
    }

    #[test]
    fn additive_unit_unregisters_when_dropped() {
        let reg = AdditiveRegistry::new();
        let t = shared(0.0_f64);
        {
            let mut u = unit(&t, 1.0, 1.0).additive(&reg);
            u.start();
            let op = u.operation_id().unwrap();
            assert!(reg.contains(op));
        }
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.prune(), 0);
    }
}
