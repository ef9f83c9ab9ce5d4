//! Error types surfaced while configuring motions.
//!
//! Runtime stepping never fails; only channel setup and configuration loading
//! return errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ValueKind;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionError {
    /// The target does not expose a scalar at this property path.
    #[error("unsupported property path '{path}'")]
    UnsupportedProperty { path: String },

    /// Start and end values describe different shapes.
    #[error("value kind mismatch: expected {expected:?}, got {actual:?}")]
    ValueKindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A component name that does not exist for the value kind.
    #[error("kind {kind:?} has no component '{component}'")]
    ComponentMismatch { kind: ValueKind, component: String },

    /// The target is mutably borrowed elsewhere while the motion tried to touch it.
    #[error("target of '{path}' is busy")]
    TargetBusy { path: String },

    #[error("property path must not be empty")]
    EmptyPath,

    /// A configuration payload could not be decoded.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MotionError {
    /// Short stable label, handy for log fields and host-side matching.
    pub fn category(&self) -> &'static str {
        match self {
            MotionError::UnsupportedProperty { .. } => "unsupported_property",
            MotionError::ValueKindMismatch { .. } => "kind_mismatch",
            MotionError::ComponentMismatch { .. } => "component_mismatch",
            MotionError::TargetBusy { .. } => "target_busy",
            MotionError::EmptyPath => "empty_path",
            MotionError::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<serde_json::Error> for MotionError {
    fn from(err: serde_json::Error) -> Self {
        MotionError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MotionError>;
