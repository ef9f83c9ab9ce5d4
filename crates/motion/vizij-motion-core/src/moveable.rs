//! The capability shared by units, groups and sequences.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::REPEAT_INFINITE;
use crate::events::{EventHub, MotionEvent};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionState {
    Stopped,
    Delayed,
    Moving,
    Paused,
}

impl MotionState {
    pub fn name(self) -> &'static str {
        match self {
            MotionState::Stopped => "stopped",
            MotionState::Delayed => "delayed",
            MotionState::Moving => "moving",
            MotionState::Paused => "paused",
        }
    }

    /// Delayed or moving.
    pub fn is_running(self) -> bool {
        matches!(self, MotionState::Delayed | MotionState::Moving)
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionDirection {
    #[default]
    Forward,
    Reverse,
}

/// Variant tag; used where behavior must be chosen exhaustively per kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveableKind {
    Unit,
    Group,
    Sequence,
}

/// How a reversing sequence plays its way back.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReversingMode {
    /// Earlier steps replay forward in reverse order.
    #[default]
    Sequential,
    /// Every step plays its own reverse half, last step first.
    Contiguous,
}

/// Who delivers timestamps to a moveable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TempoSubscription {
    /// Not driven (initial, or after teardown).
    #[default]
    Detached,
    /// Driven by a [`TempoDriver`](crate::tempo::TempoDriver).
    Subscribed,
    /// Driven by the owning group or sequence; never subscribes itself.
    Managed,
}

impl TempoSubscription {
    pub(crate) fn on_start(&mut self) {
        if *self != TempoSubscription::Managed {
            *self = TempoSubscription::Subscribed;
        }
    }

    pub(crate) fn on_teardown(&mut self) {
        if *self == TempoSubscription::Subscribed {
            *self = TempoSubscription::Detached;
        }
    }
}

/// Repeat and reverse settings with the progress arithmetic built on them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CyclePolicy {
    pub repeating: bool,
    /// Extra cycles after the first; [`REPEAT_INFINITE`] repeats forever.
    pub repeat_cycles: u32,
    pub reversing: bool,
}

impl CyclePolicy {
    /// Whether another cycle follows once `cycles_completed` cycles are done.
    pub fn has_cycles_remaining(&self, cycles_completed: u32) -> bool {
        self.repeating
            && (self.repeat_cycles == REPEAT_INFINITE || cycles_completed < self.repeat_cycles)
    }

    /// Cycle progress for a pass progress, split in halves when reversing.
    pub fn cycle_progress(&self, motion_progress: f64, direction: MotionDirection) -> f64 {
        if !self.reversing {
            return motion_progress;
        }
        match direction {
            MotionDirection::Forward => motion_progress * 0.5,
            MotionDirection::Reverse => 0.5 + motion_progress * 0.5,
        }
    }

    /// Progress across all finite cycles; infinite repeats report the current cycle.
    pub fn total_progress(&self, cycles_completed: u32, cycle_progress: f64) -> f64 {
        if self.repeating && self.repeat_cycles != REPEAT_INFINITE {
            let cycles = self.repeat_cycles as f64 + 1.0;
            let done = (cycles_completed as f64 + cycle_progress) / cycles;
            done.clamp(0.0, 1.0)
        } else {
            cycle_progress
        }
    }
}

/// Something that can be started, driven by timestamps, paused and reversed.
pub trait Moveable {
    fn kind(&self) -> MoveableKind;

    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Back to stopped, forward, zero progress; no notifications.
    fn reset(&mut self);
    fn update(&mut self, timestamp: f64);
    /// Play backward from the end state to the start state, then complete.
    fn begin_reverse(&mut self);

    fn state(&self) -> MotionState;
    fn direction(&self) -> MotionDirection;
    fn total_progress(&self) -> f64;
    fn cycle_progress(&self) -> f64;
    fn cycles_completed(&self) -> u32;

    fn is_reversing(&self) -> bool;
    fn set_reversing(&mut self, reversing: bool);
    /// Only sequences have a reversing mode; others ignore it.
    fn set_reversing_mode(&mut self, _mode: ReversingMode) {}

    fn events(&mut self) -> &mut EventHub;
    fn take_events(&mut self) -> Vec<MotionEvent> {
        self.events().take_events()
    }

    fn tempo(&self) -> TempoSubscription;
    fn set_tempo(&mut self, subscription: TempoSubscription);
}

impl fmt::Debug for dyn Moveable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Moveable")
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("direction", &self.direction())
            .field("total_progress", &self.total_progress())
            .finish()
    }
}
