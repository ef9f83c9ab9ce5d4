//! Identifiers and simple allocators for registry entries, observers and driven motions.

use serde::{Deserialize, Serialize};

/// Registration token of an additive unit. Higher values were registered later.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u64);

/// Handle returned when subscribing to an [`EventHub`](crate::events::EventHub).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u32);

/// Handle of a moveable attached to a [`TempoDriver`](crate::tempo::TempoDriver).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DriveId(pub u32);

/// Monotonic allocator for ObserverId and DriveId.
/// IDs are opaque externally and never reused by one allocator.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_observer: u32,
    next_drive: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_observer(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer = self.next_observer.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_drive(&mut self) -> DriveId {
        let id = DriveId(self.next_drive);
        self.next_drive = self.next_drive.wrapping_add(1);
        id
    }
}

/// Strictly increasing operation counter owned by an additive registry.
/// Starts at 1 so that 0 never names a live registration.
#[derive(Debug)]
pub struct OperationCounter(u64);

impl Default for OperationCounter {
    fn default() -> Self {
        Self(1)
    }
}

impl OperationCounter {
    #[inline]
    pub fn issue(&mut self) -> OperationId {
        let id = OperationId(self.0);
        self.0 += 1;
        id
    }
}
