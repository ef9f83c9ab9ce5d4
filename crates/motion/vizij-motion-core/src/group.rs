//! MotionGroup: runs its members concurrently.
//!
//! Every command is forwarded to all members. The group finishes once every member
//! has completed, and reports the mean of their total progress.
//!
//! With `sync_when_reversing`, members do not reverse on their own: each plays its
//! forward pass, and once all of them are done the group flips and asks every member
//! to play backward together.

use std::fmt;

use log::{debug, trace};

use crate::events::{EventHub, MotionEvent};
use crate::moveable::{
    CyclePolicy, MotionDirection, MotionState, Moveable, MoveableKind, TempoSubscription,
};

pub struct MotionGroup {
    name: String,
    members: Vec<Box<dyn Moveable>>,
    state: MotionState,
    direction: MotionDirection,
    delay: f64,
    delay_started: Option<f64>,
    policy: CyclePolicy,
    sync_when_reversing: bool,
    /// Members we turned reversing on ourselves, so they can be turned off again.
    propagated: bool,
    /// Member finished its forward half.
    half_done: Vec<bool>,
    /// Member completed.
    done: Vec<bool>,
    /// Playing backward because of [`Moveable::begin_reverse`].
    playing_back: bool,
    cycle_progress: f64,
    total_progress: f64,
    cycles_completed: u32,
    events: EventHub,
    tempo: TempoSubscription,
}

impl Default for MotionGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionGroup {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            members: Vec::new(),
            state: MotionState::Stopped,
            direction: MotionDirection::Forward,
            delay: 0.0,
            delay_started: None,
            policy: CyclePolicy::default(),
            sync_when_reversing: false,
            propagated: false,
            half_done: Vec::new(),
            done: Vec::new(),
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

    pub fn with_member(mut self, member: impl Moveable + 'static) -> Self {
        self.add(Box::new(member));
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

    pub fn sync_when_reversing(mut self, sync: bool) -> Self {
        self.sync_when_reversing = sync;
        self.propagate_reversing();
        self
    }

    /// Adopt a member; the group drives it from now on.
    pub fn add(&mut self, mut member: Box<dyn Moveable>) {
        if self.state != MotionState::Stopped {
            trace!("group '{}': add ignored while {}", self.name, self.state);
            return;
        }
        member.set_tempo(TempoSubscription::Managed);
        if self.propagated {
            member.set_reversing(true);
        }
        self.members.push(member);
        self.half_done.push(false);
        self.done.push(false);
    }

    /// Detach and return the member at `index` (only while stopped).
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Moveable>> {
        if self.state != MotionState::Stopped || index >= self.members.len() {
            return None;
        }
        self.half_done.remove(index);
        self.done.remove(index);
        let mut member = self.members.remove(index);
        member.set_tempo(TempoSubscription::Detached);
        Some(member)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Box<dyn Moveable>] {
        &self.members
    }

    pub fn member(&self, index: usize) -> Option<&dyn Moveable> {
        self.members.get(index).map(|m| m.as_ref())
    }

    pub fn member_mut(&mut self, index: usize) -> Option<&mut (dyn Moveable + 'static)> {
        self.members.get_mut(index).map(|m| m.as_mut())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_synced_when_reversing(&self) -> bool {
        self.sync_when_reversing
    }

    fn propagate_reversing(&mut self) {
        if self.policy.reversing && !self.sync_when_reversing {
            for m in self.members.iter_mut() {
                m.set_reversing(true);
            }
            self.propagated = true;
        } else if self.propagated {
            for m in self.members.iter_mut() {
                m.set_reversing(false);
            }
            self.propagated = false;
        }
    }

    fn clear_flags(&mut self) {
        self.half_done.iter_mut().for_each(|f| *f = false);
        self.done.iter_mut().for_each(|f| *f = false);
    }

    fn synced(&self) -> bool {
        self.policy.reversing && self.sync_when_reversing
    }

    fn refresh_progress(&mut self) {
        let mean = if self.members.is_empty() {
            0.0
        } else {
            let sum: f64 = self.members.iter().map(|m| m.total_progress()).sum();
            sum / self.members.len() as f64
        };
        self.cycle_progress = if self.synced() && !self.playing_back {
            match self.direction {
                MotionDirection::Forward => mean * 0.5,
                MotionDirection::Reverse => 0.5 + mean * 0.5,
            }
        } else {
            mean
        };
        self.total_progress = self
            .policy
            .total_progress(self.cycles_completed, self.cycle_progress);
    }

    fn launch_members(&mut self) {
        self.clear_flags();
        for m in self.members.iter_mut() {
            m.start();
        }
    }

    fn drive_members(&mut self, timestamp: f64) {
        for (i, m) in self.members.iter_mut().enumerate() {
            if self.done[i] {
                continue;
            }
            m.update(timestamp);
            for event in m.take_events() {
                match event {
                    MotionEvent::HalfCompleted => self.half_done[i] = true,
                    MotionEvent::Completed => {
                        self.half_done[i] = true;
                        self.done[i] = true;
                    }
                    MotionEvent::Stopped => self.done[i] = true,
                    _ => {}
                }
            }
        }
    }

    fn flip_to_reverse(&mut self) {
        self.direction = MotionDirection::Reverse;
        debug!("group '{}' reversing", self.name);
        self.events.emit(MotionEvent::Reversed);
        self.events.emit(MotionEvent::HalfCompleted);
    }

    fn check_transitions(&mut self) {
        let all_half = self.half_done.iter().all(|f| *f);
        let all_done = self.done.iter().all(|f| *f);

        if self.synced() && !self.playing_back {
            if !all_done {
                return;
            }
            if self.direction == MotionDirection::Forward {
                self.flip_to_reverse();
                self.clear_flags();
                for m in self.members.iter_mut() {
                    m.begin_reverse();
                }
                return;
            }
        } else if self.policy.reversing
            && !self.playing_back
            && self.direction == MotionDirection::Forward
            && all_half
        {
            self.flip_to_reverse();
        }

        if !all_done {
            return;
        }
        if !self.playing_back && self.policy.has_cycles_remaining(self.cycles_completed) {
            self.next_cycle();
        } else {
            self.complete();
        }
    }

    fn next_cycle(&mut self) {
        self.cycles_completed += 1;
        self.direction = MotionDirection::Forward;
        for m in self.members.iter_mut() {
            m.reset();
        }
        self.launch_members();
        self.refresh_progress();
        debug!(
            "group '{}' repeating (cycle {})",
            self.name, self.cycles_completed
        );
        self.events.emit(MotionEvent::Repeated {
            cycles_completed: self.cycles_completed,
        });
    }

    fn complete(&mut self) {
        self.cycle_progress = 1.0;
        self.total_progress = 1.0;
        self.cycles_completed += 1;
        self.state = MotionState::Stopped;
        self.playing_back = false;
        self.teardown();
        debug!("group '{}' completed", self.name);
        self.events.emit(MotionEvent::Completed);
    }

    fn teardown(&mut self) {
        self.tempo.on_teardown();
        self.delay_started = None;
    }
}

impl Moveable for MotionGroup {
    fn kind(&self) -> MoveableKind {
        MoveableKind::Group
    }

    fn start(&mut self) {
        if self.state != MotionState::Stopped {
            trace!("group '{}': start ignored while {}", self.name, self.state);
            return;
        }
        self.direction = MotionDirection::Forward;
        self.cycles_completed = 0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
        self.delay_started = None;
        self.clear_flags();
        self.tempo.on_start();
        if self.delay > 0.0 {
            self.state = MotionState::Delayed;
            debug!("group '{}' delayed {}s", self.name, self.delay);
        } else {
            self.state = MotionState::Moving;
            self.launch_members();
            debug!("group '{}' started", self.name);
            self.events.emit(MotionEvent::Started);
        }
    }

    fn stop(&mut self) {
        if self.state == MotionState::Stopped {
            return;
        }
        for m in self.members.iter_mut() {
            m.stop();
            m.take_events();
        }
        self.state = MotionState::Stopped;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
        self.teardown();
        debug!("group '{}' stopped", self.name);
        self.events.emit(MotionEvent::Stopped);
    }

    fn pause(&mut self) {
        if self.state != MotionState::Moving {
            trace!("group '{}': pause ignored while {}", self.name, self.state);
            return;
        }
        for m in self.members.iter_mut() {
            m.pause();
            m.take_events();
        }
        self.state = MotionState::Paused;
        self.events.emit(MotionEvent::Paused);
    }

    fn resume(&mut self) {
        if self.state != MotionState::Paused {
            trace!("group '{}': resume ignored while {}", self.name, self.state);
            return;
        }
        for m in self.members.iter_mut() {
            m.resume();
            m.take_events();
        }
        self.state = MotionState::Moving;
        self.events.emit(MotionEvent::Resumed);
    }

    fn reset(&mut self) {
        for m in self.members.iter_mut() {
            m.reset();
            m.take_events();
        }
        self.teardown();
        self.state = MotionState::Stopped;
        self.direction = MotionDirection::Forward;
        self.cycles_completed = 0;
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.playing_back = false;
        self.clear_flags();
    }

    fn update(&mut self, timestamp: f64) {
        match self.state {
            MotionState::Stopped | MotionState::Paused => return,
            MotionState::Delayed => {
                let began = *self.delay_started.get_or_insert(timestamp);
                if timestamp - began < self.delay {
                    return;
                }
                self.state = MotionState::Moving;
                self.launch_members();
                debug!("group '{}' started after delay", self.name);
                self.events.emit(MotionEvent::Started);
            }
            MotionState::Moving => {}
        }
        self.drive_members(timestamp);
        self.refresh_progress();
        self.events.emit(MotionEvent::Updated {
            total_progress: self.total_progress,
        });
        self.check_transitions();
    }

    fn begin_reverse(&mut self) {
        if self.state != MotionState::Stopped {
            trace!(
                "group '{}': begin_reverse ignored while {}",
                self.name, self.state
            );
            return;
        }
        self.direction = MotionDirection::Reverse;
        self.playing_back = true;
        self.cycles_completed = 0;
        self.clear_flags();
        self.cycle_progress = 0.0;
        self.total_progress = 0.0;
        self.tempo.on_start();
        for m in self.members.iter_mut() {
            m.begin_reverse();
        }
        self.state = MotionState::Moving;
        debug!("group '{}' playing backward", self.name);
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
        self.propagate_reversing();
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

impl fmt::Debug for MotionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionGroup")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("members", &self.members)
            .field("total_progress", &self.total_progress)
            .finish()
    }
}

impl fmt::Display for MotionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() {
            "group"
        } else {
            &self.name
        };
        write!(
            f,
            "{name} [{} {:?}] {:.1}% ({} members)",
            self.state,
            self.direction,
            self.total_progress * 100.0,
            self.members.len()
        )
    }
}
