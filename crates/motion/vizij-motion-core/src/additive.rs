//! Ledger of active additive operations.
//!
//! Additive units publish the start/end of their channels into a snapshot cell and
//! register a weak reference to it here. A unit starting on a property that another
//! additive unit is already moving seeds its start from the most recently registered
//! match, so their per-frame deltas compose on the live value.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use log::trace;

use crate::ids::{OperationCounter, OperationId};
use crate::property::PropertyKey;

/// Published range of one channel of an additive unit.
#[derive(Clone, Debug)]
pub struct BlendSpan {
    pub key: PropertyKey,
    pub start: f64,
    pub end: f64,
}

/// What an additive unit exposes to later units on the same properties.
#[derive(Clone, Debug)]
pub struct AdditiveSnapshot {
    pub weighting: f64,
    pub spans: Vec<BlendSpan>,
}

impl Default for AdditiveSnapshot {
    fn default() -> Self {
        Self {
            weighting: 1.0,
            spans: Vec::new(),
        }
    }
}

impl AdditiveSnapshot {
    /// `start + (end - start) * weighting` for the matching span.
    fn blend_for(&self, key: &PropertyKey) -> Option<f64> {
        self.spans
            .iter()
            .find(|s| &s.key == key)
            .map(|s| s.start + (s.end - s.start) * self.weighting)
    }
}

pub type SnapshotCell = Rc<RefCell<AdditiveSnapshot>>;

#[derive(Default, Debug)]
struct Ledger {
    counter: OperationCounter,
    entries: HashMap<OperationId, Weak<RefCell<AdditiveSnapshot>>>,
}

/// Cheaply cloneable handle; clones share one ledger. Create one per animation context.
#[derive(Clone, Default, Debug)]
pub struct AdditiveRegistry {
    ledger: Rc<RefCell<Ledger>>,
}

impl AdditiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot and hand out a fresh, strictly increasing id.
    pub fn register(&self, snapshot: &SnapshotCell) -> OperationId {
        let mut ledger = self.ledger.borrow_mut();
        let id = ledger.counter.issue();
        ledger.entries.insert(id, Rc::downgrade(snapshot));
        trace!("additive register {id:?}");
        id
    }

    /// Remove a registration. Unknown ids are ignored.
    pub fn unregister(&self, id: OperationId) -> bool {
        let removed = self.ledger.borrow_mut().entries.remove(&id).is_some();
        if removed {
            trace!("additive unregister {id:?}");
        }
        removed
    }

    /// Blend starting point for `key`, skipping `requester` and dead entries.
    /// Newest registration wins.
    pub fn blend_value(&self, key: &PropertyKey, requester: Option<OperationId>) -> Option<f64> {
        let candidates: Vec<(OperationId, Weak<RefCell<AdditiveSnapshot>>)> = {
            let ledger = self.ledger.borrow();
            let mut v: Vec<_> = ledger
                .entries
                .iter()
                .filter(|(id, _)| Some(**id) != requester)
                .map(|(id, w)| (*id, w.clone()))
                .collect();
            v.sort_by(|a, b| b.0.cmp(&a.0));
            v
        };
        candidates.into_iter().find_map(|(_, weak)| {
            let cell = weak.upgrade()?;
            let snapshot = cell.try_borrow().ok()?;
            snapshot.blend_for(key)
        })
    }

    pub fn contains(&self, id: OperationId) -> bool {
        self.ledger.borrow().entries.contains_key(&id)
    }

    /// Registrations whose owner is still alive.
    pub fn live_count(&self) -> usize {
        self.ledger
            .borrow()
            .entries
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drop entries whose owner went away without unregistering.
    pub fn prune(&self) -> usize {
        let mut ledger = self.ledger.borrow_mut();
        let before = ledger.entries.len();
        ledger.entries.retain(|_, w| w.strong_count() > 0);
        before - ledger.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{shared, Bound, PropertyAccessor};

    fn key_for(t: &crate::property::Shared<f64>) -> PropertyKey {
        Bound::new(t, "value").unwrap().key().clone()
    }

    fn cell(key: &PropertyKey, start: f64, end: f64, weighting: f64) -> SnapshotCell {
        Rc::new(RefCell::new(AdditiveSnapshot {
            weighting,
            spans: vec![BlendSpan {
                key: key.clone(),
                start,
                end,
            }],
        }))
    }

    #[test]
    fn newest_registration_wins_and_requester_is_skipped() {
        let t = shared(0.0_f64);
        let key = key_for(&t);
        let reg = AdditiveRegistry::new();
        let a = cell(&key, 0.0, 10.0, 1.0);
        let b = cell(&key, 10.0, -10.0, 0.5);
        let ia = reg.register(&a);
        let ib = reg.register(&b);
        assert!(ib > ia);
        assert_eq!(reg.blend_value(&key, None), Some(0.0));
        assert_eq!(reg.blend_value(&key, Some(ib)), Some(10.0));
    }

    #[test]
    fn dropped_owner_is_skipped_and_pruned() {
        let t = shared(0.0_f64);
        let key = key_for(&t);
        let reg = AdditiveRegistry::new();
        let a = cell(&key, 0.0, 4.0, 1.0);
        reg.register(&a);
        {
            let gone = cell(&key, 0.0, 99.0, 1.0);
            reg.register(&gone);
        }
        assert_eq!(reg.blend_value(&key, None), Some(4.0));
        assert_eq!(reg.live_count(), 1);
        assert_eq!(reg.prune(), 1);
    }

    #[test]
    fn unregister_removes_and_other_targets_do_not_match() {
        let t = shared(0.0_f64);
        let other = shared(0.0_f64);
        let reg = AdditiveRegistry::new();
        let a = cell(&key_for(&t), 0.0, 4.0, 1.0);
        let id = reg.register(&a);
        assert_eq!(reg.blend_value(&key_for(&other), None), None);
        assert!(reg.unregister(id));
        assert!(!reg.unregister(id));
        assert_eq!(reg.blend_value(&key_for(&t), None), None);
    }
}
