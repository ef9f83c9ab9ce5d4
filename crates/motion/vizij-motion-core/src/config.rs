//! Configuration for motion units and engine-wide knobs.

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::errors::Result;

/// Repeat count meaning "repeat forever".
pub const REPEAT_INFINITE: u32 = 0;

/// Smallest accepted integration step; keeps a frame to a bounded number of steps.
pub const MIN_TIMESTEP: f64 = 1e-6;

/// Engine-wide sizing and solver settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum events a moveable retains before the oldest are dropped.
    pub max_pending_events: usize,
    pub physics: PhysicsCfg,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pending_events: 1024,
            physics: PhysicsCfg::default(),
        }
    }
}

/// Fixed-step solver constants used by [`PhysicsIntegrator`](crate::physics::PhysicsIntegrator).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsCfg {
    /// Internal integration step in seconds.
    pub timestep: f64,
    /// Largest frame delta processed per call; longer gaps are truncated.
    pub max_frame_time: f64,
    /// Speed under which a physics pass counts as finished.
    pub velocity_threshold: f64,
    /// Nudge applied after a bounce, scaled by the reflected speed.
    pub collision_nudge: f64,
}

impl Default for PhysicsCfg {
    fn default() -> Self {
        Self {
            timestep: 0.0001,
            max_frame_time: 0.2,
            velocity_threshold: 0.0001,
            collision_nudge: 0.001,
        }
    }
}

impl PhysicsCfg {
    /// Clamp into a range the solver can run with. NaN falls back to the lower bound.
    pub fn sanitized(mut self) -> Self {
        self.timestep = self.timestep.max(MIN_TIMESTEP);
        self.max_frame_time = self.max_frame_time.max(0.0);
        self.velocity_threshold = self.velocity_threshold.max(0.0);
        self.collision_nudge = self.collision_nudge.max(0.0);
        self
    }
}

/// Per-unit timing and behavior configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitCfg {
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
    /// Used for the reverse half; falls back to `easing`.
    pub reverse_easing: Option<Easing>,
    pub repeating: bool,
    /// Extra cycles after the first; [`REPEAT_INFINITE`] repeats forever.
    pub repeat_cycles: u32,
    pub reversing: bool,
    pub additive: bool,
    pub additive_weighting: f64,
}

impl Default for UnitCfg {
    fn default() -> Self {
        Self {
            duration: 1.0,
            delay: 0.0,
            easing: Easing::Linear,
            reverse_easing: None,
            repeating: false,
            repeat_cycles: REPEAT_INFINITE,
            reversing: false,
            additive: false,
            additive_weighting: 1.0,
        }
    }
}

impl UnitCfg {
    /// Decode from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Clamp values that have no meaning outside their range.
    pub fn sanitized(mut self) -> Self {
        self.duration = self.duration.max(0.0);
        self.delay = self.delay.max(0.0);
        self.additive_weighting = self.additive_weighting.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "duration": 0.4, "reversing": true, "easing": "QuadOut" }"#;
        let cfg = UnitCfg::from_json(json).expect("decode");
        assert_eq!(cfg.duration, 0.4);
        assert!(cfg.reversing);
        assert_eq!(cfg.easing, Easing::QuadOut);
        assert_eq!(cfg.additive_weighting, 1.0);
        assert_eq!(cfg.repeat_cycles, REPEAT_INFINITE);
    }

    #[test]
    fn bad_json_is_invalid_config() {
        let err = UnitCfg::from_json("{ duration: }").unwrap_err();
        assert_eq!(err.category(), "invalid_config");
    }

    #[test]
    fn sanitize_clamps_out_of_range() {
        let cfg = UnitCfg {
            duration: -1.0,
            delay: -0.5,
            additive_weighting: 3.0,
            ..UnitCfg::default()
        }
        .sanitized();
        assert_eq!(cfg.duration, 0.0);
        assert_eq!(cfg.delay, 0.0);
        assert_eq!(cfg.additive_weighting, 1.0);
    }

    #[test]
    fn physics_sanitize_clamps_solver_constants() {
        let json = r#"{ "physics": { "timestep": 0.0, "max_frame_time": -1.0 } }"#;
        let cfg: Config = serde_json::from_str(json).expect("decode");
        let physics = cfg.physics.sanitized();
        assert_eq!(physics.timestep, MIN_TIMESTEP);
        assert_eq!(physics.max_frame_time, 0.0);
        let defaults = PhysicsCfg::default();
        assert_eq!(physics.velocity_threshold, defaults.velocity_threshold);

        let odd = PhysicsCfg {
            timestep: f64::NAN,
            collision_nudge: -0.5,
            ..PhysicsCfg::default()
        }
        .sanitized();
        assert_eq!(odd.timestep, MIN_TIMESTEP);
        assert_eq!(odd.collision_nudge, 0.0);
    }
}
