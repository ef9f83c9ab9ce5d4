//! Expansion of structured values into per-component channels.

use log::trace;

use crate::channel::PropertyChannel;
use crate::errors::{MotionError, Result};
use crate::property::{Animatable, Shared};
use crate::value::{Value, ValueKind};

/// Channel path for one component of `base` (`base.x`, `tint.a`, or `base` for scalars).
pub fn component_path(base: &str, component: Option<&str>) -> String {
    match component {
        Some(c) => format!("{base}.{c}"),
        None => base.to_string(),
    }
}

/// Build one channel per component of `end`, bound at `base.<component>`.
///
/// With `start == None` every channel resolves its start from the target when
/// movement begins.
pub fn channels_for<T: Animatable + 'static>(
    target: &Shared<T>,
    base: &str,
    start: Option<Value>,
    end: Value,
) -> Result<Vec<PropertyChannel>> {
    if base.is_empty() {
        return Err(MotionError::EmptyPath);
    }
    let kind = end.kind();
    if let Some(s) = &start {
        if s.kind() != kind {
            return Err(MotionError::ValueKindMismatch {
                expected: kind,
                actual: s.kind(),
            });
        }
    }
    let ends = end.to_components();
    let starts = start.map(|s| s.to_components());
    let names: Vec<Option<&str>> = match kind {
        ValueKind::Scalar => vec![None],
        other => other.components().iter().map(|c| Some(*c)).collect(),
    };

    let mut out = Vec::with_capacity(names.len());
    for (i, name) in names.into_iter().enumerate() {
        let path = component_path(base, name);
        let channel = match &starts {
            Some(s) => PropertyChannel::bind(target, &path, s[i], ends[i])?,
            None => PropertyChannel::bind_to(target, &path, ends[i])?,
        };
        out.push(channel);
    }
    trace!("expanded {kind:?} at '{base}' into {} channels", out.len());
    Ok(out)
}

/// Bind one component of a structured property, e.g. only `pos.y` of a `Vec2`.
pub fn component_channel<T: Animatable + 'static>(
    target: &Shared<T>,
    base: &str,
    kind: ValueKind,
    component: &str,
    start: Option<f64>,
    end: f64,
) -> Result<PropertyChannel> {
    if !kind.components().iter().any(|c| *c == component) {
        return Err(MotionError::ComponentMismatch {
            kind,
            component: component.to_string(),
        });
    }
    let path = component_path(base, Some(component));
    match start {
        Some(s) => PropertyChannel::bind(target, &path, s, end),
        None => PropertyChannel::bind_to(target, &path, end),
    }
}

/// Read a structured value back from its component channels on `target`.
pub fn read_value<T: Animatable>(target: &Shared<T>, base: &str, kind: ValueKind) -> Result<Value> {
    let t = target
        .try_borrow()
        .map_err(|_| MotionError::TargetBusy {
            path: base.to_string(),
        })?;
    let mut comps = Vec::with_capacity(kind.arity());
    match kind {
        ValueKind::Scalar => comps.push(
            t.get_property(base)
                .ok_or_else(|| MotionError::UnsupportedProperty {
                    path: base.to_string(),
                })?,
        ),
        other => {
            for c in other.components() {
                let path = component_path(base, Some(c));
                let v = t
                    .get_property(&path)
                    .ok_or(MotionError::UnsupportedProperty { path })?;
                comps.push(v);
            }
        }
    }
    Ok(Value::from_components(kind, &comps))
}
