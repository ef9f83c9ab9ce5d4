//! Easing strategies.
//!
//! Every strategy follows the `(elapsed, start, range, duration) -> value` contract.
//! Polynomial and sine curves are evaluated in f64. The remaining catalogue curves
//! come from `simple_easing` (normalized `t -> t'`) and are rescaled onto the
//! channel range.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use simple_easing::*;

/// Raw easing function: `(elapsed, start, range, duration) -> value`.
pub type EasingFn = fn(f64, f64, f64, f64) -> f64;

/// See <https://easings.net> for the curve shapes.
#[derive(Default, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    /// Host supplied function. Not serializable.
    #[serde(skip)]
    Custom(EasingFn),
}

impl Easing {
    /// Evaluate at `elapsed` seconds of `duration`, moving from `start` by `range`.
    pub fn ease(&self, elapsed: f64, start: f64, range: f64, duration: f64) -> f64 {
        if let Easing::Custom(f) = self {
            return f(elapsed, start, range, duration);
        }
        if duration <= 0.0 {
            return start + range;
        }
        let t = (elapsed / duration).clamp(0.0, 1.0);
        start + range * self.curve(t)
    }

    /// Normalized curve; exact at both ends.
    fn curve(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear | Easing::Custom(_) => t,
            Easing::QuadIn => power_in(t, 2),
            Easing::QuadOut => power_out(t, 2),
            Easing::QuadInOut => power_in_out(t, 2),
            Easing::CubicIn => power_in(t, 3),
            Easing::CubicOut => power_out(t, 3),
            Easing::CubicInOut => power_in_out(t, 3),
            Easing::QuartIn => power_in(t, 4),
            Easing::QuartOut => power_out(t, 4),
            Easing::QuartInOut => power_in_out(t, 4),
            Easing::QuintIn => power_in(t, 5),
            Easing::QuintOut => power_out(t, 5),
            Easing::QuintInOut => power_in_out(t, 5),
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => (1.0 - (t * PI).cos()) / 2.0,
            other => other.catalogue(t),
        }
    }

    /// `simple_easing` works in f32, so these curves carry f32 rounding (relative
    /// error around 1e-7 of the range) between the exact endpoints.
    fn catalogue(&self, t: f64) -> f64 {
        let f: fn(f32) -> f32 = match self {
            Easing::ExpoIn => expo_in,
            Easing::ExpoOut => expo_out,
            Easing::ExpoInOut => expo_in_out,
            Easing::CircIn => circ_in,
            Easing::CircOut => circ_out,
            Easing::CircInOut => circ_in_out,
            Easing::BackIn => back_in,
            Easing::BackOut => back_out,
            Easing::BackInOut => back_in_out,
            Easing::ElasticIn => elastic_in,
            Easing::ElasticOut => elastic_out,
            Easing::ElasticInOut => elastic_in_out,
            Easing::BounceIn => bounce_in,
            Easing::BounceOut => bounce_out,
            Easing::BounceInOut => bounce_in_out,
            _ => return t,
        };
        f(t as f32) as f64
    }
}

fn power_in(t: f64, n: i32) -> f64 {
    t.powi(n)
}

fn power_out(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

fn power_in_out(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (2.0 - 2.0 * t).powi(n) / 2.0
    }
}

impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Easing::Custom(a), Easing::Custom(b)) => {
                std::ptr::eq(*a as *const (), *b as *const ())
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl From<EasingFn> for Easing {
    fn from(f: EasingFn) -> Self {
        Easing::Custom(f)
    }
}
