//! Property access layer.
//!
//! Hosts implement [`Animatable`] on their objects; motions hold a type-erased
//! [`PropertyAccessor`] per channel. Identity (target pointer + path) is what the
//! additive registry matches on.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::{MotionError, Result};

/// Shared, interiorly mutable target handle.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value so motions can bind to it.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Objects whose scalar properties can be read and written by path.
pub trait Animatable {
    /// `None` when the path is not supported.
    fn get_property(&self, path: &str) -> Option<f64>;
    /// Returns `false` when the path is not writable.
    fn set_property(&mut self, path: &str, value: f64) -> bool;
}

/// A bare scalar answers to `"value"`.
impl Animatable for f64 {
    fn get_property(&self, path: &str) -> Option<f64> {
        (path == "value").then_some(*self)
    }

    fn set_property(&mut self, path: &str, value: f64) -> bool {
        if path != "value" {
            return false;
        }
        *self = value;
        true
    }
}

/// Pointer identity of a shared target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    pub fn of<T: ?Sized>(target: &Rc<T>) -> Self {
        TargetId(Rc::as_ptr(target) as *const () as usize)
    }
}

/// Stable identity of one scalar property on one target.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyKey {
    pub target: TargetId,
    pub path: String,
}

/// Type-erased read/write access to one scalar property.
pub trait PropertyAccessor {
    fn key(&self) -> &PropertyKey;
    fn read(&self) -> Result<f64>;
    fn write(&self, value: f64) -> Result<()>;
}

/// Accessor bound to a shared [`Animatable`] target.
pub struct Bound<T: Animatable> {
    target: Shared<T>,
    key: PropertyKey,
}

impl<T: Animatable> Bound<T> {
    /// Validates the path against the target before binding.
    pub fn new(target: &Shared<T>, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(MotionError::EmptyPath);
        }
        let supported = target
            .try_borrow()
            .map_err(|_| MotionError::TargetBusy { path: path.clone() })?
            .get_property(&path)
            .is_some();
        if !supported {
            return Err(MotionError::UnsupportedProperty { path });
        }
        Ok(Self {
            key: PropertyKey {
                target: TargetId::of(target),
                path,
            },
            target: Rc::clone(target),
        })
    }

    pub fn target(&self) -> &Shared<T> {
        &self.target
    }

    fn busy(&self) -> MotionError {
        MotionError::TargetBusy {
            path: self.key.path.clone(),
        }
    }
}

impl<T: Animatable> PropertyAccessor for Bound<T> {
    fn key(&self) -> &PropertyKey {
        &self.key
    }

    fn read(&self) -> Result<f64> {
        let Ok(target) = self.target.try_borrow() else {
            return Err(self.busy());
        };
        target
            .get_property(&self.key.path)
            .ok_or_else(|| MotionError::UnsupportedProperty {
                path: self.key.path.clone(),
            })
    }

    fn write(&self, value: f64) -> Result<()> {
        let Ok(mut target) = self.target.try_borrow_mut() else {
            return Err(self.busy());
        };
        if target.set_property(&self.key.path, value) {
            Ok(())
        } else {
            Err(MotionError::UnsupportedProperty {
                path: self.key.path.clone(),
            })
        }
    }
}
