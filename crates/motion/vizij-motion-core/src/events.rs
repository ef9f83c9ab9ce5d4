//! Discrete motion signals and the per-moveable observer hub.
//!
//! Every moveable owns an [`EventHub`]. Emitted events are delivered synchronously to
//! observers and also queued, so a parent collection (or the host) can drain them
//! after each update.

use std::collections::VecDeque;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ids::{IdAllocator, ObserverId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Started,
    Stopped,
    Updated,
    Reversed,
    Repeated,
    Paused,
    Resumed,
    Completed,
    StepAdvanced,
    /// Forward half of a reversing motion finished.
    HalfCompleted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionEvent {
    Started,
    Stopped,
    Updated { total_progress: f64 },
    Reversed,
    Repeated { cycles_completed: u32 },
    Paused,
    Resumed,
    Completed,
    StepAdvanced { step: usize },
    HalfCompleted,
}

impl MotionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MotionEvent::Started => EventKind::Started,
            MotionEvent::Stopped => EventKind::Stopped,
            MotionEvent::Updated { .. } => EventKind::Updated,
            MotionEvent::Reversed => EventKind::Reversed,
            MotionEvent::Repeated { .. } => EventKind::Repeated,
            MotionEvent::Paused => EventKind::Paused,
            MotionEvent::Resumed => EventKind::Resumed,
            MotionEvent::Completed => EventKind::Completed,
            MotionEvent::StepAdvanced { .. } => EventKind::StepAdvanced,
            MotionEvent::HalfCompleted => EventKind::HalfCompleted,
        }
    }
}

pub type Observer = Box<dyn FnMut(&MotionEvent)>;

struct Subscription {
    id: ObserverId,
    filter: Option<EventKind>,
    callback: Observer,
}

pub struct EventHub {
    ids: IdAllocator,
    subscriptions: Vec<Subscription>,
    pending: VecDeque<MotionEvent>,
    max_pending: usize,
    dropped: u64,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(crate::config::Config::default().max_pending_events)
    }
}

impl EventHub {
    pub fn new(max_pending: usize) -> Self {
        Self {
            ids: IdAllocator::new(),
            subscriptions: Vec::new(),
            pending: VecDeque::new(),
            max_pending: max_pending.max(1),
            dropped: 0,
        }
    }

    /// Call `callback` for every event of `kind`.
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&MotionEvent) + 'static,
    ) -> ObserverId {
        self.subscribe(Some(kind), Box::new(callback))
    }

    /// Call `callback` for every event.
    pub fn on_any(&mut self, callback: impl FnMut(&MotionEvent) + 'static) -> ObserverId {
        self.subscribe(None, Box::new(callback))
    }

    fn subscribe(&mut self, filter: Option<EventKind>, callback: Observer) -> ObserverId {
        let id = self.ids.alloc_observer();
        self.subscriptions.push(Subscription {
            id,
            filter,
            callback,
        });
        id
    }

    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    pub fn observer_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn emit(&mut self, event: MotionEvent) {
        let kind = event.kind();
        for sub in self.subscriptions.iter_mut() {
            if sub.filter.map_or(true, |k| k == kind) {
                (sub.callback)(&event);
            }
        }
        if self.pending.len() >= self.max_pending {
            self.pending.pop_front();
            self.dropped += 1;
            if self.dropped == 1 {
                warn!(
                    "event queue full ({} entries); dropping oldest",
                    self.max_pending
                );
            }
        }
        self.pending.push_back(event);
    }

    /// Drain queued events in emission order.
    pub fn take_events(&mut self) -> Vec<MotionEvent> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &MotionEvent> {
        self.pending.iter()
    }

    /// Events discarded because nobody drained the queue in time.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn set_max_pending(&mut self, max_pending: usize) {
        self.max_pending = max_pending.max(1);
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("observers", &self.subscriptions.len())
            .field("pending", &self.pending.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observers_filter_by_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new(8);
        let s = Rc::clone(&seen);
        let record = move |e: &MotionEvent| s.borrow_mut().push(e.kind());
        hub.on(EventKind::Completed, record);
        hub.emit(MotionEvent::Started);
        hub.emit(MotionEvent::Completed);
        assert_eq!(*seen.borrow(), vec![EventKind::Completed]);
        assert_eq!(hub.take_events().len(), 2);
        assert_eq!(hub.pending().count(), 0);
    }

    #[test]
    fn unregister_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut hub = EventHub::new(8);
        let c = Rc::clone(&count);
        let id = hub.on_any(move |_| *c.borrow_mut() += 1);
        hub.emit(MotionEvent::Paused);
        assert!(hub.unregister(id));
        hub.emit(MotionEvent::Resumed);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut hub = EventHub::new(2);
        hub.emit(MotionEvent::Started);
        hub.emit(MotionEvent::Paused);
        hub.emit(MotionEvent::Resumed);
        assert_eq!(hub.dropped(), 1);
        assert_eq!(
            hub.take_events(),
            vec![MotionEvent::Paused, MotionEvent::Resumed]
        );
    }
}
