//! Timestamped position + orientation.

use serde::{Deserialize, Serialize};

use crate::Vector;

/// Where `v` falls inside the window `[min, max]` as a fraction.
///
/// Not clamped. A degenerate window (`max == min`) yields `0`.
#[inline]
pub fn project(v: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (v - min) / (max - min)
    }
}

/// Position, forward and up vectors at time `t` (seconds on the audio clock).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub t: f64,
    pub p: Vector,
    pub f: Vector,
    pub u: Vector,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            t: 0.0,
            p: Vector::new(0.0, 0.0, 0.0),
            f: Vector::new(0.0, 0.0, 1.0),
            u: Vector::new(0.0, 1.0, 0.0),
        }
    }
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        px: f32,
        py: f32,
        pz: f32,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
    ) {
        self.p.set(px, py, pz);
        self.f.set(fx, fy, fz);
        self.u.set(ux, uy, uz);
    }

    pub fn copy(&mut self, other: &Pose) {
        self.t = other.t;
        self.p.copy(&other.p);
        self.f.copy(&other.f);
        self.u.copy(&other.u);
    }

    /// Writes the pose `start → end` takes at time `t`.
    ///
    /// Three cases: at or before `start.t` the result is exactly `start`,
    /// at or after `end.t` it is exactly `end`, and in between position is
    /// lerped while forward/up are slerped, stamped with `t`.
    pub fn interpolate(&mut self, start: &Pose, end: &Pose, t: f64) {
        if t <= start.t {
            self.copy(start);
        } else if end.t <= t {
            self.copy(end);
        } else {
            let p = project(t, start.t, end.t) as f32;
            self.p.lerp(&start.p, &end.p, p);
            self.f.slerp(&start.f, &end.f, p);
            self.u.slerp(&start.u, &end.u, p);
            self.t = t;
        }
    }
}
