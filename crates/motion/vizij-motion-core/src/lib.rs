//! Vizij Motion Core (engine-agnostic)
//!
//! Tweening and motion composition driven by externally supplied timestamps.
//! A [`MotionUnit`] moves scalar [`PropertyChannel`]s on host objects with an easing
//! curve or a physics integrator; [`MotionGroup`] and [`MotionSequence`] compose any
//! [`Moveable`] concurrently or one after another. Everything is single-threaded and
//! cooperative: nothing advances unless `update(timestamp)` is called, either by the
//! host or by a [`TempoDriver`].

pub mod additive;
pub mod assistant;
pub mod channel;
pub mod config;
pub mod easing;
pub mod errors;
pub mod events;
pub mod group;
pub mod ids;
pub mod moveable;
pub mod path;
pub mod physics;
pub mod property;
pub mod sequence;
pub mod tempo;
pub mod unit;
pub mod value;

// Re-exports for consumers (adapters)
pub use additive::{AdditiveRegistry, AdditiveSnapshot, BlendSpan};
pub use assistant::{channels_for, component_channel, component_path, read_value};
pub use channel::PropertyChannel;
pub use config::{Config, PhysicsCfg, UnitCfg, REPEAT_INFINITE};
pub use easing::{Easing, EasingFn};
pub use errors::{MotionError, Result};
pub use events::{EventHub, EventKind, MotionEvent};
pub use group::MotionGroup;
pub use ids::{DriveId, ObserverId, OperationId};
pub use moveable::{
    CyclePolicy, MotionDirection, MotionState, Moveable, MoveableKind, ReversingMode,
    TempoSubscription,
};
pub use path::{ArcLengthPath, LookupTable, PathFollower, PathGeometry, Point, Polyline};
pub use physics::PhysicsIntegrator;
pub use property::{shared, Animatable, Bound, PropertyAccessor, PropertyKey, Shared, TargetId};
pub use sequence::MotionSequence;
pub use tempo::{ManualTempo, SystemTempo, Tempo, TempoDriver};
pub use unit::MotionUnit;
pub use value::{Value, ValueKind};
