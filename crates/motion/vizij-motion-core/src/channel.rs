//! A single interpolated scalar bound to one property of one target.

use std::fmt;

use crate::errors::Result;
use crate::property::{Animatable, Bound, PropertyAccessor, PropertyKey, Shared};

pub struct PropertyChannel {
    accessor: Box<dyn PropertyAccessor>,
    pub start: f64,
    pub end: f64,
    pub current: f64,
    /// Change applied by the most recent update.
    pub delta: f64,
    /// Resolve `start` from the live value when movement begins.
    pub use_existing_start_value: bool,
}

impl PropertyChannel {
    pub fn new(accessor: Box<dyn PropertyAccessor>, start: f64, end: f64) -> Self {
        Self {
            accessor,
            start,
            end,
            current: start,
            delta: 0.0,
            use_existing_start_value: false,
        }
    }

    /// Channel whose start is read from the target when the motion begins.
    pub fn from_current(accessor: Box<dyn PropertyAccessor>, end: f64) -> Self {
        let start = accessor.read().unwrap_or(end);
        Self {
            use_existing_start_value: true,
            ..Self::new(accessor, start, end)
        }
    }

    /// Bind `path` on `target`, failing if the target does not expose it.
    pub fn bind<T: Animatable + 'static>(
        target: &Shared<T>,
        path: &str,
        start: f64,
        end: f64,
    ) -> Result<Self> {
        Ok(Self::new(Box::new(Bound::new(target, path)?), start, end))
    }

    /// Like [`bind`](Self::bind) with the start taken from the target at movement.
    pub fn bind_to<T: Animatable + 'static>(
        target: &Shared<T>,
        path: &str,
        end: f64,
    ) -> Result<Self> {
        Ok(Self::from_current(Box::new(Bound::new(target, path)?), end))
    }

    pub fn key(&self) -> &PropertyKey {
        self.accessor.key()
    }

    pub fn path(&self) -> &str {
        &self.accessor.key().path
    }

    /// Live value currently held by the target.
    pub fn read_live(&self) -> Result<f64> {
        self.accessor.read()
    }

    /// Move `current` to `value`, recording the step in `delta`.
    pub fn advance_to(&mut self, value: f64) {
        self.delta = value - self.current;
        self.current = value;
    }

    /// Write the channel out. Additive channels add `delta * weighting` onto the live value.
    pub(crate) fn push(&self, additive_weighting: Option<f64>) -> Result<()> {
        match additive_weighting {
            None => self.accessor.write(self.current),
            Some(w) => {
                if self.delta == 0.0 {
                    return Ok(());
                }
                let live = self.accessor.read()?;
                self.accessor.write(live + self.delta * w)
            }
        }
    }

    /// Place `current` without recording a step.
    pub(crate) fn jump_to(&mut self, value: f64) {
        self.current = value;
        self.delta = 0.0;
    }

    pub(crate) fn rewind(&mut self) {
        self.current = self.start;
        self.delta = 0.0;
    }
}

impl fmt::Debug for PropertyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChannel")
            .field("path", &self.path())
            .field("start", &self.start)
            .field("end", &self.end)
            .field("current", &self.current)
            .field("delta", &self.delta)
            .finish()
    }
}
