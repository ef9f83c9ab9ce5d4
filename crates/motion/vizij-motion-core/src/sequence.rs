//! MotionSequence: runs its steps one after another.
//!
//! Only the step at `current_step` is driven. How a reversing sequence comes back
//! depends on its [`ReversingMode`]:
//!
//! - `Sequential`: steps never reverse themselves. After the last step the index
//!   walks backward and each earlier step is replayed forward from scratch.
//! - `Contiguous`: every step is made reversing. A step that finishes its forward
//!   half is held (paused) and the next one starts. When the last step turns around
//!   the sequence turns with it, and each completion resumes the previous held step,
//!   so the whole chain plays back as one continuous motion.

use std::fmt;

use log::{debug, trace};

use crate::events::{EventHub, MotionEvent};
use crate::moveable::{
    CyclePolicy, MotionDirection, MotionState, Moveable, MoveableKind, ReversingMode,
    TempoSubscription,
};

pub struct MotionSequence {
    name: String,
    steps: Vec<Box<dyn Moveable>>,
    current: usize,
    state: MotionState,
    direction: MotionDirection,
    delay: f64,
    delay_started: Option<f64>,
    policy: CyclePolicy,
    mode: ReversingMode,
    /// Steps we turned reversing on ourselves, so they can be turned off again.
    propagated: bool,
    /// Steps paused between their two halves.
    held: Vec<bool>,
    playing_back: bool,
    cycle_progress: f64,
    total_progress: f64,
    cycles_completed: u32,
    events: EventHub,
    tempo: TempoSubscription,
}

impl Default for MotionSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSequence {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            steps: Vec::new(),
            current: 0,
            state: MotionState::Stopped,
            direction: MotionDirection::Forward,
            delay: 0.0,
            delay_started: None,
            policy: CyclePolicy::default(),
            mode: ReversingMode::Sequential,
            propagated: false,
            held: Vec::new(),
            playing_back: false,
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

    pub fn with_step(mut self, step: impl Moveable + 'static) -> Self {
        self.add(Box::new(step));
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn repeating(mut self, cycles: u32) -> Self {
        self.policy.repeating = true;
        self.policy.repeat_cycles = cycles;
        self
    }

    pub fn reversing(mut self, reversing: bool) -> Self {
        self.set_reversing(reversing);
        self
    }

    pub fn with_reversing_mode(mut self, mode: ReversingMode) -> Self {
        self.set_reversing_mode(mode);
        self
    }

    /// Append a step; the sequence drives it from now on.
    pub fn add(&mut self, mut step: Box<dyn Moveable>) {
        if self.state != MotionState::Stopped {
            trace!("sequence '{}': add ignored while {}", self.name, self.state);
            return;
        }
        step.set_tempo(TempoSubscription::Managed);
        if self.contiguous() {
            Self::make_contiguous(step.as_mut());
        }
        self.steps.push(step);
        self.held.push(false);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Box<dyn Moveable>] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&dyn Moveable> {
        self.steps.get(index).map(|s| s.as_ref())
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut (dyn Moveable + 'static)> {
        self.steps.get_mut(index).map(|s| s.as_mut())
    }

    /// Index of the step being driven.
    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn reversing_mode(&self) -> ReversingMode {
        self.mode
    }

    fn contiguous(&self) -> bool {
        self.policy.reversing && self.mode == ReversingMode::Contiguous
    }

    fn make_contiguous(step: &mut dyn Moveable) {
        match step.kind() {
            MoveableKind::Sequence => step.set_reversing_mode(ReversingMode::Contiguous),
            MoveableKind::Unit | MoveableKind::Group => {}
        }
        step.set_reversing(true);
    }

    fn propagate(&mut self) {
        if self.contiguous() {
            for s in self.steps.iter_mut() {
                Self::make_contiguous(s.as_mut());
            }
            self.propagated = true;
        } else if self.propagated {
            for s in self.steps.iter_mut() {
                s.set_reversing(false);
            }
            self.propagated = false;
        }
    }

    fn refresh_progress(&mut self) {
        let n = self.steps.len();
        let mean = |steps: &[Box<dyn Moveable>]| {
            if steps.is_empty() {
                0.0
            } else {
                steps.iter().map(|s| s.total_progress()).sum::<f64>() / steps.len() as f64
            }
        };
        self.cycle_progress = if self.policy.reversing
            && self.mode == ReversingMode::Sequential
            && !self.playing_back
        {
            match self.direction {
                MotionDirection::Forward => mean(&self.steps) * 0.5,
                MotionDirection::Reverse if n > 1 => 0.5 + mean(&self.steps[..n - 1]) * 0.5,
                MotionDirection::Reverse => 1.0,
            }
        } else {
            mean(&self.steps)
        };
        self.total_progress = self
            .policy
            .total_progress(self.cycles_completed, self.cycle_progress);
    }

    fn advance_to(&mut self, index: usize) {
        self.current = index;
        debug!("sequence '{}' step {index}", self.name);
        self.events.emit(MotionEvent::StepAdvanced { step: index });
    }

    /// Start `index` from scratch.
    fn launch(&mut self, index: usize) {
        self.advance_to(index);
        let step = &mut self.steps[index];
        step.reset();
        step.start();
    }

    fn flip_to_reverse(&mut self) {
        self.direction = MotionDirection::Reverse;
        debug!("sequence '{}' reversing", self.name);
        self.events.emit(MotionEvent::Reversed);
        self.events.emit(MotionEvent::HalfCompleted);
    }

    /// Resume the nearest held step before `index`. Returns false when none is left.
    fn walk_back(&mut self, index: usize) -> bool {
        let Some(prev) = (0..index).rev().find(|j| self.held[*j]) else {
            return false;
        };
        self.held[prev] = false;
        self.advance_to(prev);
        let step = &mut self.steps[prev];
        step.resume();
        step.take_events();
        true
    }

    /// React to the events of the current step. Returns true if another step became current.
    fn handle_step_events(&mut self, index: usize, events: Vec<MotionEvent>) -> bool {
        for event in events {
            match event {
                MotionEvent::HalfCompleted
                    if self.contiguous()
                        && !self.playing_back
                        && self.direction == MotionDirection::Forward =>
                {
                    if index + 1 < self.steps.len() {
                        let step = &mut self.steps[index];
                        step.pause();
                        step.take_events();
                        self.held[index] = true;
                        self.launch(index + 1);
                        return true;
                    }
                    self.flip_to_reverse();
                }
                MotionEvent::Completed => return self.step_completed(index),
                MotionEvent::Stopped => {
                    trace!("sequence '{}': step {index} stopped externally", self.name);
                    return self.step_completed(index);
                }
                _ => {}
            }
        }
        false
    }

    fn step_completed(&mut self, index: usize) -> bool {
        let last = self.steps.len() - 1;
        if self.playing_back {
            if index == 0 {
                self.complete();
                return false;
            }
            self.advance_to(index - 1);
            self.steps[index - 1].begin_reverse();
            return true;
        }
        if !self.policy.reversing {
            if index < last {
                self.launch(index + 1);
                return true;
            }
            return self.finish_cycle();
        }
        match (self.mode, self.direction) {
            (_, MotionDirection::Forward) if index < last => {
                self.launch(index + 1);
                true
            }
            (ReversingMode::Sequential, MotionDirection::Forward) => {
                self.flip_to_reverse();
                if last == 0 {
                    return self.finish_cycle();
                }
                for s in self.steps[..last].iter_mut() {
                    s.reset();
                }
                self.launch(last - 1);
                true
            }
            (ReversingMode::Sequential, MotionDirection::Reverse) => {
                if index == 0 {
                    return self.finish_cycle();
                }
                self.launch(index - 1);
                true
            }
            (ReversingMode::Contiguous, MotionDirection::Forward) => {
                self.flip_to_reverse();
                self.walk_back(index) || self.finish_cycle()
            }
            (ReversingMode::Contiguous, MotionDirection::Reverse) => {
                self.walk_back(index) || self.finish_cycle()
            }
        }
    }

    /// Both directions are exhausted. Returns true if a new cycle started.
    fn finish_cycle(&mut self) -> bool {
        if self.policy.has_cycles_remaining(self.cycles_completed) {
            self.next_cycle();
            !self.steps.is_empty()
        } else {
            self.complete();
            false
        }
    }

    fn next_cycle(&mut self) {
        self.cycles_completed += 1;
        self.direction = MotionDirection::Forward;
        self.held.iter_mut().for_each(|h| *h = false);
        for s in self.steps.iter_mut() {
            s.reset();
        }
        debug!(
            "sequence '{}' repeating (cycle {})",
            self.name, self.cycles_completed
        );
        self.events.emit(MotionEvent::Repeated {
            cycles_completed: self.cycles_completed,
        });
        if !self.steps.is_empty() {
            self.launch(0);
        }
    }

    fn complete(&mut self) {
        self.cycle_progress = 1.0;
        self.total_progress = 1.0;
        self.cycles_completed += 1;
        self.state = MotionState::Stopped;
        self.playing_back = false;
        self.teardown();
        debug!("sequence '{}' completed", self.name);
        self.events.emit(MotionEvent::Completed);
    }

    fn teardown(&mut self) {
        self.tempo.on_teardown();
        self.delay_started = None;
    }

    fn begin(&mut self) {
        self.state = MotionState::Moving;
        debug!("sequence '{}' started", self.name);
        self.events.emit(MotionEvent::Started);
        if !self.steps.is_empty() {
            self.launch(0);
        }
    }
}

impl Moveable for MotionSequence {
    fn kind(&self) -> MoveableKind {
        MoveableKind::Sequence
    }

    fn start(&mut self) {
        if self.state != MotionState::Stopped {
            trace!(
                "sequence '{}': start ignored while {}",
                self.name, self.state
            );
            return;
        }
        self.direction = MotionDirection::Forward;
        self.current = 0;
        self.cycles_completed = 0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
        self.delay_started = None;
        self.held.iter_mut().for_each(|h| *h = false);
        self.tempo.on_start();
        if self.delay > 0.0 {
            self.state = MotionState::Delayed;
            debug!("sequence '{}' delayed {}s", self.name, self.delay);
        } else {
            self.begin();
        }
    }

    fn stop(&mut self) {
        if self.state == MotionState::Stopped {
            return;
        }
        for s in self.steps.iter_mut() {
            s.stop();
            s.take_events();
        }
        self.held.iter_mut().for_each(|h| *h = false);
        self.state = MotionState::Stopped;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
        self.teardown();
        debug!("sequence '{}' stopped", self.name);
        self.events.emit(MotionEvent::Stopped);
    }

    fn pause(&mut self) {
        if self.state != MotionState::Moving {
            trace!(
                "sequence '{}': pause ignored while {}",
                self.name, self.state
            );
            return;
        }
        if let Some(step) = self.steps.get_mut(self.current) {
            step.pause();
            step.take_events();
        }
        self.state = MotionState::Paused;
        self.events.emit(MotionEvent::Paused);
    }

    fn resume(&mut self) {
        if self.state != MotionState::Paused {
            trace!(
                "sequence '{}': resume ignored while {}",
                self.name, self.state
            );
            return;
        }
        if let Some(step) = self.steps.get_mut(self.current) {
            step.resume();
            step.take_events();
        }
        self.state = MotionState::Moving;
        self.events.emit(MotionEvent::Resumed);
    }

    fn reset(&mut self) {
        for s in self.steps.iter_mut() {
            s.reset();
            s.take_events();
        }
        self.teardown();
        self.held.iter_mut().for_each(|h| *h = false);
        self.state = MotionState::Stopped;
        self.direction = MotionDirection::Forward;
        self.current = 0;
        self.cycles_completed = 0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
    }

    fn update(&mut self, timestamp: f64) {
        match self.state {
            MotionState::Stopped | MotionState::Paused => return,
            MotionState::Delayed => {
                let began = *self.delay_started.get_or_insert(timestamp);
                if timestamp - began < self.delay {
                    return;
                }
                self.begin();
            }
            MotionState::Moving => {}
        }

        if self.steps.is_empty() {
            self.finish_cycle();
            return;
        }

        // Each hand-off drives the new step at the same timestamp; bounded so that
        // zero-length steps cannot spin forever.
        let mut budget = self.steps.len() * 2 + 2;
        loop {
            let index = self.current;
            self.steps[index].update(timestamp);
            let events = self.steps[index].take_events();
            let moved = self.handle_step_events(index, events);
            if !moved || self.state != MotionState::Moving || budget == 0 {
                break;
            }
            budget -= 1;
        }

        if self.state == MotionState::Moving {
            self.refresh_progress();
            self.events.emit(MotionEvent::Updated {
                total_progress: self.total_progress,
            });
        }
    }

    fn begin_reverse(&mut self) {
        if self.state != MotionState::Stopped {
            trace!(
                "sequence '{}': begin_reverse ignored while {}",
                self.name, self.state
            );
            return;
        }
        self.direction = MotionDirection::Reverse;
        self.playing_back = true;
        self.cycles_completed = 0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.held.iter_mut().for_each(|h| *h = false);
        self.tempo.on_start();
        self.state = MotionState::Moving;
        debug!("sequence '{}' playing backward", self.name);
        self.events.emit(MotionEvent::Reversed);
        if let Some(last) = self.steps.len().checked_sub(1) {
            self.advance_to(last);
            self.steps[last].begin_reverse();
        }
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
        self.propagate();
    }

    fn set_reversing_mode(&mut self, mode: ReversingMode) {
        self.mode = mode;
        self.propagate();
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

impl fmt::Debug for MotionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionSequence")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("mode", &self.mode)
            .field("current", &self.current)
            .field("steps", &self.steps)
            .field("total_progress", &self.total_progress)
            .finish()
    }
}

impl fmt::Display for MotionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "sequence"
        } else {
            &self.name
        };
        write!(
            f,
            "{name} [{} {:?} {:?}] step {}/{} {:.1}%",
            self.state,
            self.direction,
            self.mode,
            self.current + 1,
            self.steps.len(),
            self.total_progress * 100.0
        )
    }
}
