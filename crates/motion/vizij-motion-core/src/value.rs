//! Structured values that decompose into scalar channels.
//!
//! Motion channels are always scalar (f64). Composite values are split into one
//! channel per component, addressed as `<base>.<component>`.

use serde::{Deserialize, Serialize};

/// Lightweight kind tag used for mismatch reporting and quick dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Color,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    Scalar(f64),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Vec4([f64; 4]),
    /// RGBA, components addressed as r/g/b/a.
    Color([f64; 4]),
}

const XY: [&str; 2] = ["x", "y"];
const XYZ: [&str; 3] = ["x", "y", "z"];
const XYZW: [&str; 4] = ["x", "y", "z", "w"];
const RGBA: [&str; 4] = ["r", "g", "b", "a"];

impl ValueKind {
    /// Component suffixes in channel order. Scalars have none.
    pub fn components(self) -> &'static [&'static str] {
        match self {
            ValueKind::Scalar => &[],
            ValueKind::Vec2 => &XY,
            ValueKind::Vec3 => &XYZ,
            ValueKind::Vec4 => &XYZW,
            ValueKind::Color => &RGBA,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            ValueKind::Scalar => 1,
            other => other.components().len(),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Vec4(_) => ValueKind::Vec4,
            Value::Color(_) => ValueKind::Color,
        }
    }

    /// Flatten into component order.
    pub fn to_components(&self) -> Vec<f64> {
        match self {
            Value::Scalar(v) => vec![*v],
            Value::Vec2(a) => a.to_vec(),
            Value::Vec3(a) => a.to_vec(),
            Value::Vec4(a) | Value::Color(a) => a.to_vec(),
        }
    }

    /// Read one named component (`None` for scalars or unknown names).
    pub fn component(&self, name: &str) -> Option<f64> {
        let idx = self.kind().components().iter().position(|c| *c == name)?;
        self.to_components().get(idx).copied()
    }

    /// Rebuild a value of `kind` from components; missing entries default to 0.
    pub fn from_components(kind: ValueKind, comps: &[f64]) -> Value {
        let at = |i: usize| comps.get(i).copied().unwrap_or(0.0);
        match kind {
            ValueKind::Scalar => Value::Scalar(at(0)),
            ValueKind::Vec2 => Value::Vec2([at(0), at(1)]),
            ValueKind::Vec3 => Value::Vec3([at(0), at(1), at(2)]),
            ValueKind::Vec4 => Value::Vec4([at(0), at(1), at(2), at(3)]),
            ValueKind::Color => Value::Color([at(0), at(1), at(2), at(3)]),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}
