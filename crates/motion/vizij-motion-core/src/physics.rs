//! Fixed-timestep velocity integrator with friction and optional boundary collisions.
//!
//! Frames are split into `PhysicsCfg::timestep` sized steps; whatever is left over is
//! carried to the next call and used to blend between the last two simulated
//! positions, which keeps output independent of the host frame rate.

use log::trace;

use crate::config::PhysicsCfg;

/// Stand-in for zero friction; (1 - f)^dt must stay below 1.
const MIN_FRICTION: f64 = 1e-6;

#[derive(Clone, Debug)]
pub struct PhysicsIntegrator {
    cfg: PhysicsCfg,
    velocity: f64,
    initial_velocity: f64,
    friction: f64,
    restitution: f64,
    use_collision_detection: bool,
    bounds: Option<(f64, f64)>,
    last_timestamp: Option<f64>,
    accumulator: f64,
    steps: u64,
    position: f64,
    previous: f64,
}

impl PhysicsIntegrator {
    pub fn new(velocity: f64, friction: f64) -> Self {
        let mut p = Self {
            cfg: PhysicsCfg::default(),
            velocity,
            initial_velocity: velocity,
            friction: 1.0,
            restitution: 0.0,
            use_collision_detection: false,
            bounds: None,
            last_timestamp: None,
            accumulator: 0.0,
            steps: 0,
            position: 0.0,
            previous: 0.0,
        };
        p.set_friction(friction);
        p
    }

    /// Out-of-range solver constants are clamped, never rejected.
    pub fn with_cfg(mut self, cfg: PhysicsCfg) -> Self {
        self.cfg = cfg.sanitized();
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.set_restitution(restitution);
        self
    }

    /// Bounce between `bounds` (in either order).
    pub fn with_collisions(mut self, bounds: (f64, f64)) -> Self {
        self.use_collision_detection = true;
        self.bounds = Some(bounds);
        self
    }

    pub fn cfg(&self) -> &PhysicsCfg {
        &self.cfg
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn initial_velocity(&self) -> f64 {
        self.initial_velocity
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Clamped to (0, 1]; zero is replaced by a tiny positive value.
    pub fn set_friction(&mut self, friction: f64) {
        let clamped = if friction <= 0.0 {
            MIN_FRICTION
        } else {
            friction.min(1.0)
        };
        if clamped != friction {
            trace!("friction {friction} clamped to {clamped}");
        }
        self.friction = clamped;
    }

    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Clamped to [0, 1].
    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution.clamp(0.0, 1.0);
    }

    pub fn use_collision_detection(&self) -> bool {
        self.use_collision_detection
    }

    pub fn set_collision_detection(&mut self, enabled: bool) {
        self.use_collision_detection = enabled;
    }

    pub fn set_bounds(&mut self, bounds: Option<(f64, f64)>) {
        self.bounds = bounds;
    }

    /// Per-step velocity decay factor.
    pub fn friction_multiplier(&self) -> f64 {
        (1.0 - self.friction).powf(self.cfg.timestep)
    }

    /// True once the speed has decayed below the configured threshold.
    pub fn has_settled(&self) -> bool {
        self.velocity.abs() < self.cfg.velocity_threshold
    }

    /// Fraction of the initial speed already lost, in [0, 1].
    pub fn decay_progress(&self) -> f64 {
        if self.initial_velocity == 0.0 {
            return 1.0;
        }
        let lost = 1.0 - self.velocity.abs() / self.initial_velocity.abs();
        lost.clamp(0.0, 1.0)
    }

    /// Advance to `timestamp`. The first call after construction or [`reset`](Self::reset)
    /// only records the baseline and seeds the simulation with `position`.
    pub fn solve(&mut self, position: f64, timestamp: f64) -> f64 {
        let Some(last) = self.last_timestamp else {
            self.last_timestamp = Some(timestamp);
            self.position = position;
            self.previous = position;
            return position;
        };
        let dt = (timestamp - last).clamp(0.0, self.cfg.max_frame_time);
        self.last_timestamp = Some(timestamp);
        self.accumulator += dt;

        let step = self.cfg.timestep;
        let decay = self.friction_multiplier();
        while self.accumulator >= step {
            self.previous = self.position;
            self.velocity *= decay;
            self.position += self.velocity * step;
            self.accumulator -= step;
            self.steps += 1;
            self.collide();
        }

        let alpha = (self.accumulator / step).clamp(0.0, 1.0);
        self.previous + (self.position - self.previous) * alpha
    }

    fn collide(&mut self) {
        if !self.use_collision_detection || self.steps == 0 {
            return;
        }
        let Some((a, b)) = self.bounds else {
            return;
        };
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let outward_high = self.position > hi && self.velocity > 0.0;
        let outward_low = self.position < lo && self.velocity < 0.0;
        if !(outward_high || outward_low) {
            return;
        }
        self.velocity = -self.velocity * self.restitution;
        let nudge = self.velocity.abs() * self.cfg.collision_nudge;
        self.position = if outward_high { hi - nudge } else { lo + nudge };
        self.previous = self.previous.clamp(lo, hi);
        trace!(
            "collision at {}, velocity now {}",
            self.position, self.velocity
        );
    }

    /// Restore the initial velocity and forget the timing baseline.
    pub fn reset(&mut self) {
        self.velocity = self.initial_velocity;
        self.last_timestamp = None;
        self.accumulator = 0.0;
        self.steps = 0;
    }

    /// Flip both the live and the initial velocity.
    pub fn reverse_direction(&mut self) {
        self.velocity = -self.velocity;
        self.initial_velocity = -self.initial_velocity;
    }

    /// Move the timing baseline forward, e.g. by the time spent paused.
    pub fn shift_timestamp(&mut self, offset: f64) {
        if let Some(last) = self.last_timestamp.as_mut() {
            *last += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn friction_and_restitution_are_clamped() {
        let mut p = PhysicsIntegrator::new(1.0, 0.0);
        assert!(p.friction() > 0.0 && p.friction() < 1e-3);
        p.set_friction(4.0);
        assert_eq!(p.friction(), 1.0);
        p.set_restitution(-2.0);
        assert_eq!(p.restitution(), 0.0);
        p.set_restitution(1.5);
        assert_eq!(p.restitution(), 1.0);
    }

    #[test]
    fn first_call_only_records_baseline() {
        let mut p = PhysicsIntegrator::new(5.0, 0.5);
        assert_eq!(p.solve(2.0, 10.0), 2.0);
        assert_eq!(p.velocity(), 5.0);
    }

    #[test]
    fn matches_constant_deceleration_estimate() {
        let mut p = PhysicsIntegrator::new(1.0, 0.1);
        p.solve(0.0, 0.0);
        let pos = p.solve(0.0, 0.1);
        approx(pos, 1.0 * 0.1 - 0.5 * 0.1 * 0.1 * 0.1, 0.001);
    }

    #[test]
    fn long_frames_are_truncated() {
        let mut a = PhysicsIntegrator::new(1.0, 0.1);
        let mut b = PhysicsIntegrator::new(1.0, 0.1);
        a.solve(0.0, 0.0);
        b.solve(0.0, 0.0);
        let pa = a.solve(0.0, 5.0);
        let pb = b.solve(0.0, 0.2);
        approx(pa, pb, 1e-12);
    }

    #[test]
    fn bounce_reflects_with_restitution_and_stays_inside() {
        let mut p = PhysicsIntegrator::new(10.0, 0.0)
            .with_restitution(0.5)
            .with_collisions((0.0, 1.0));
        p.solve(0.0, 0.0);
        let pos = p.solve(0.0, 0.15);
        approx(p.velocity(), -5.0, 0.1);
        assert!(pos > 0.0 && pos < 1.0, "pos={pos}");
    }

    #[test]
    fn reset_and_reverse_direction() {
        let mut p = PhysicsIntegrator::new(2.0, 0.5);
        p.solve(0.0, 0.0);
        p.solve(0.0, 0.1);
        assert!(p.velocity() < 2.0);
        p.reset();
        assert_eq!(p.velocity(), 2.0);
        assert_eq!(p.solve(3.0, 7.0), 3.0);
        p.reverse_direction();
        assert_eq!(p.velocity(), -2.0);
        assert_eq!(p.initial_velocity(), -2.0);
    }

    #[test]
    fn zero_timestep_and_negative_frame_cap_still_terminate() {
        let cfg = PhysicsCfg {
            timestep: 0.0,
            max_frame_time: -1.0,
            ..PhysicsCfg::default()
        };
        let mut p = PhysicsIntegrator::new(1.0, 0.1).with_cfg(cfg);
        assert!(p.cfg().timestep > 0.0);
        p.solve(0.0, 0.0);
        // Frames are capped at zero length, so nothing moves.
        assert_eq!(p.solve(0.0, 0.1), 0.0);

        let mut p = PhysicsIntegrator::new(1.0, 0.1).with_cfg(PhysicsCfg {
            timestep: -0.5,
            ..PhysicsCfg::default()
        });
        p.solve(0.0, 0.0);
        approx(p.solve(0.0, 0.1), 1.0 * 0.1 - 0.5 * 0.1 * 0.1 * 0.1, 0.001);
    }

    #[test]
    fn shifted_baseline_skips_paused_time() {
        let mut p = PhysicsIntegrator::new(1.0, 0.5);
        p.solve(0.0, 0.0);
        let before = p.solve(0.0, 0.05);
        p.shift_timestamp(10.0);
        let after = p.solve(0.0, 10.05);
        approx(after, before, 1e-9);
    }
}
