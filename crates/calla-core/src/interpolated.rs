//! Pose transitions driven by the audio clock.

use crate::Pose;

/// Anything that renders a pose: the seam between interpolation and the
/// audio backend.
pub trait PoseTarget {
    /// Push the entity's `pose` into the backend. `listener` is the local
    /// user's pose for the same tick (the entity's own pose when the entity
    /// is the listener).
    fn update(&mut self, pose: &Pose, listener: &Pose, t: f64);

    /// Release every backend resource. Must be idempotent.
    fn dispose(&mut self);
}

/// A `start → end` transition plus the pose sampled from it on the last
/// update, optionally bound to one renderer.
///
/// Each pose slot is owned here and never aliased; rebinding the renderer
/// disposes the previous one first.
pub struct InterpolatedPose<S: PoseTarget> {
    pub start: Pose,
    pub current: Pose,
    pub end: Pose,
    spatializer: Option<S>,
}

impl<S: PoseTarget> Default for InterpolatedPose<S> {
    fn default() -> Self {
        Self {
            start: Pose::default(),
            current: Pose::default(),
            end: Pose::default(),
            spatializer: None,
        }
    }
}

impl<S: PoseTarget> InterpolatedPose<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin moving from wherever the pose currently is to the given pose,
    /// arriving `dt` seconds after `t`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_target(
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
        t: f64,
        dt: f64,
    ) {
        self.start.copy(&self.current);
        self.start.t = t;
        self.end.set(px, py, pz, fx, fy, fz, ux, uy, uz);
        self.end.t = t + dt;
    }

    /// Like [`set_target`](Self::set_target), keeping the last target orientation.
    pub fn set_target_position(&mut self, px: f32, py: f32, pz: f32, t: f64, dt: f64) {
        let (f, u) = (self.end.f, self.end.u);
        self.set_target(px, py, pz, f.x, f.y, f.z, u.x, u.y, u.z, t, dt);
    }

    /// Like [`set_target`](Self::set_target), keeping the last target position.
    #[allow(clippy::too_many_arguments)]
    pub fn set_target_orientation(
        &mut self,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
        t: f64,
        dt: f64,
    ) {
        let p = self.end.p;
        self.set_target(p.x, p.y, p.z, fx, fy, fz, ux, uy, uz, t, dt);
    }

    /// Sample the transition at `t` and forward the result to the bound
    /// renderer, treating this pose as its own listener.
    pub fn update(&mut self, t: f64) {
        self.update_relative(t, None);
    }

    /// Sample the transition at `t` and forward the result along with the
    /// listener's pose for this tick.
    pub fn update_relative(&mut self, t: f64, listener: Option<&Pose>) {
        self.current.interpolate(&self.start, &self.end, t);
        if let Some(spatializer) = self.spatializer.as_mut() {
            let listener = listener.unwrap_or(&self.current);
            spatializer.update(&self.current, listener, t);
        }
    }

    pub fn spatializer(&self) -> Option<&S> {
        self.spatializer.as_ref()
    }

    pub fn spatializer_mut(&mut self) -> Option<&mut S> {
        self.spatializer.as_mut()
    }

    pub fn is_bound(&self) -> bool {
        self.spatializer.is_some()
    }

    /// Install `spatializer`, disposing whatever was bound before.
    pub fn bind(&mut self, spatializer: S) {
        self.dispose();
        self.spatializer = Some(spatializer);
    }

    /// Unbind without disposing, handing ownership to the caller.
    pub fn take_spatializer(&mut self) -> Option<S> {
        self.spatializer.take()
    }

    /// Dispose and unbind the current renderer, if any.
    pub fn dispose(&mut self) {
        if let Some(mut old) = self.spatializer.take() {
            old.dispose();
        }
    }
}

impl<S: PoseTarget> Drop for InterpolatedPose<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
