//! Path geometry helpers for motions that follow a 2D path.
//!
//! A motion animates the `percent` property of a [`PathFollower`]; the follower maps
//! it onto the path and exposes the resulting point as `x`/`y`.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::property::Animatable;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Maps a percentage in [0, 1] along a path to a point.
pub trait PathGeometry {
    fn point_at(&self, pct: f64) -> Point;
}

/// Straight segments through `points`, parameterized evenly per segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

impl PathGeometry for Polyline {
    fn point_at(&self, pct: f64) -> Point {
        match self.points.len() {
            0 => Point::default(),
            1 => self.points[0],
            n => {
                let scaled = pct.clamp(0.0, 1.0) * (n - 1) as f64;
                let seg = (scaled.floor() as usize).min(n - 2);
                self.points[seg].lerp(self.points[seg + 1], scaled - seg as f64)
            }
        }
    }
}

/// Arc-length table: sampled path parameters with their cumulative distance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupTable {
    params: Vec<f64>,
    distances: Vec<f64>,
}

impl LookupTable {
    /// Sample `path` at `samples + 1` evenly spaced parameters.
    pub fn build(path: &dyn PathGeometry, samples: usize) -> Self {
        let samples = samples.max(1);
        let mut params = Vec::with_capacity(samples + 1);
        let mut distances = Vec::with_capacity(samples + 1);
        let mut prev = path.point_at(0.0);
        let mut total = 0.0;
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            let p = path.point_at(t);
            total += prev.distance(p);
            prev = p;
            params.push(t);
            distances.push(total);
        }
        trace!("lookup table: {} samples, length {total}", samples + 1);
        Self { params, distances }
    }

    pub fn total_length(&self) -> f64 {
        self.distances.last().copied().unwrap_or(0.0)
    }

    /// Path parameter at which `pct` of the total length has been covered.
    pub fn param_for(&self, pct: f64) -> f64 {
        let total = self.total_length();
        if total <= 0.0 {
            return pct.clamp(0.0, 1.0);
        }
        let target = pct.clamp(0.0, 1.0) * total;
        let hi = self.distances.partition_point(|d| *d < target);
        if hi == 0 {
            return self.params[0];
        }
        if hi >= self.distances.len() {
            return 1.0;
        }
        let (d0, d1) = (self.distances[hi - 1], self.distances[hi]);
        let (p0, p1) = (self.params[hi - 1], self.params[hi]);
        if d1 <= d0 {
            return p1;
        }
        p0 + (p1 - p0) * (target - d0) / (d1 - d0)
    }
}

/// Path with optional constant-speed remapping through a [`LookupTable`].
#[derive(Clone, Debug)]
pub struct ArcLengthPath<P: PathGeometry> {
    path: P,
    table: Option<LookupTable>,
}

impl<P: PathGeometry> ArcLengthPath<P> {
    pub fn new(path: P) -> Self {
        Self { path, table: None }
    }

    /// Precompute the table; must be done before the motion starts to take effect.
    pub fn build_lookup_table(&mut self, samples: usize) {
        self.table = Some(LookupTable::build(&self.path, samples));
    }

    pub fn has_lookup_table(&self) -> bool {
        self.table.is_some()
    }

    pub fn inner(&self) -> &P {
        &self.path
    }
}

impl<P: PathGeometry> PathGeometry for ArcLengthPath<P> {
    fn point_at(&self, pct: f64) -> Point {
        match &self.table {
            Some(table) => self.path.point_at(table.param_for(pct)),
            None => self.path.point_at(pct),
        }
    }
}

/// Animatable adapter: write `percent`, read the point as `x`/`y`.
#[derive(Clone, Debug)]
pub struct PathFollower<P: PathGeometry> {
    path: P,
    percent: f64,
    point: Point,
}

impl<P: PathGeometry> PathFollower<P> {
    pub fn new(path: P) -> Self {
        let point = path.point_at(0.0);
        Self {
            path,
            percent: 0.0,
            point,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn point(&self) -> Point {
        self.point
    }

    /// Clamped to [0, 1].
    pub fn set_percent(&mut self, pct: f64) {
        self.percent = pct.clamp(0.0, 1.0);
        self.point = self.path.point_at(self.percent);
    }
}

impl<P: PathGeometry> Animatable for PathFollower<P> {
    fn get_property(&self, path: &str) -> Option<f64> {
        match path {
            "percent" => Some(self.percent),
            "x" => Some(self.point.x),
            "y" => Some(self.point.y),
            _ => None,
        }
    }

    fn set_property(&mut self, path: &str, value: f64) -> bool {
        if path != "percent" {
            return false;
        }
        self.set_percent(value);
        true
    }
}
