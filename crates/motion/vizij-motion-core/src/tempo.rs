//! Clock sources and the driver that feeds top-level moveables.

use std::fmt;
use std::time::Instant;

use log::trace;

use crate::events::MotionEvent;
use crate::ids::{DriveId, IdAllocator};
use crate::moveable::{Moveable, TempoSubscription};

/// Source of monotonically non-decreasing timestamps, in seconds.
pub trait Tempo {
    fn now(&self) -> f64;
}

/// Clock advanced explicitly by the host (tests, offline rendering, fixed-step loops).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualTempo {
    now: f64,
}

impl ManualTempo {
    pub fn new(start: f64) -> Self {
        Self { now: start }
    }

    /// Move forward by `dt` seconds; negative steps are ignored.
    pub fn advance(&mut self, dt: f64) -> f64 {
        self.now += dt.max(0.0);
        self.now
    }

    /// Jump to `t` unless that would move backward.
    pub fn set(&mut self, t: f64) {
        self.now = self.now.max(t);
    }
}

impl Tempo for ManualTempo {
    fn now(&self) -> f64 {
        self.now
    }
}

/// Wall clock measured from construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemTempo {
    origin: Instant,
}

impl Default for SystemTempo {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Tempo for SystemTempo {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Owns top-level moveables and updates the subscribed ones on every beat.
///
/// Each beat drains the event queue of every owned moveable into a per-beat list, so
/// queues never back up while driven. Observers registered on a moveable still fire
/// as events are emitted.
pub struct TempoDriver<T: Tempo> {
    tempo: T,
    ids: IdAllocator,
    entries: Vec<(DriveId, Box<dyn Moveable>)>,
    events: Vec<(DriveId, MotionEvent)>,
}

impl<T: Tempo> TempoDriver<T> {
    pub fn new(tempo: T) -> Self {
        Self {
            tempo,
            ids: IdAllocator::new(),
            entries: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn tempo(&self) -> &T {
        &self.tempo
    }

    pub fn tempo_mut(&mut self) -> &mut T {
        &mut self.tempo
    }

    pub fn attach(&mut self, moveable: impl Moveable + 'static) -> DriveId {
        self.attach_boxed(Box::new(moveable))
    }

    pub fn attach_boxed(&mut self, moveable: Box<dyn Moveable>) -> DriveId {
        let id = self.ids.alloc_drive();
        self.entries.push((id, moveable));
        id
    }

    /// Remove and return a moveable; it is torn down from the driver's point of view.
    pub fn detach(&mut self, id: DriveId) -> Option<Box<dyn Moveable>> {
        let idx = self.entries.iter().position(|(eid, _)| *eid == id)?;
        let (_, mut moveable) = self.entries.remove(idx);
        if moveable.tempo() == TempoSubscription::Subscribed {
            moveable.set_tempo(TempoSubscription::Detached);
        }
        Some(moveable)
    }

    pub fn get(&self, id: DriveId) -> Option<&dyn Moveable> {
        self.entries
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, m)| m.as_ref())
    }

    pub fn get_mut(&mut self, id: DriveId) -> Option<&mut (dyn Moveable + 'static)> {
        self.entries
            .iter_mut()
            .find(|(eid, _)| *eid == id)
            .map(|(_, m)| m.as_mut())
    }

    /// Moveables currently subscribed to this driver's beat.
    pub fn active_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, m)| m.tempo() == TempoSubscription::Subscribed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events collected during the last beat, tagged with the emitting entry.
    pub fn events(&self) -> &[(DriveId, MotionEvent)] {
        &self.events
    }

    /// Read the tempo once and update every subscribed moveable with that timestamp.
    /// Returns the timestamp used.
    pub fn beat(&mut self) -> f64 {
        let now = self.tempo.now();
        self.events.clear();
        let mut driven = 0;
        for (id, m) in self.entries.iter_mut() {
            if m.tempo() == TempoSubscription::Subscribed {
                m.update(now);
                driven += 1;
            }
            let drained = m.take_events().into_iter().map(|e| (*id, e));
            self.events.extend(drained);
        }
        trace!(
            "beat at {now}: {driven} moveables, {} events",
            self.events.len()
        );
        now
    }
}

impl TempoDriver<ManualTempo> {
    /// Advance the manual clock by `dt` and beat.
    pub fn advance(&mut self, dt: f64) -> f64 {
        self.tempo.advance(dt);
        self.beat()
    }
}

impl<T: Tempo + fmt::Debug> fmt::Debug for TempoDriver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempoDriver")
            .field("tempo", &self.tempo)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_tempo_never_goes_backward() {
        let mut t = ManualTempo::new(1.0);
        t.advance(-0.5);
        assert_eq!(t.now(), 1.0);
        t.set(0.5);
        assert_eq!(t.now(), 1.0);
        t.set(2.0);
        assert_eq!(t.advance(0.25), 2.25);
    }

    #[test]
    fn system_tempo_is_monotonic() {
        let t = SystemTempo::default();
        let a = t.now();
        let b = t.now();
        assert!(b >= a);
    }
}
