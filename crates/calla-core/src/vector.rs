//! Mutable 3-component vector.
//!
//! Every operation writes into `self` and reads from its arguments, so a pose
//! slot can be updated every frame without allocating.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn set(&mut self, x: f32, y: f32, z: f32) {
        self.x = x;
        self.y = y;
        self.z = z;
    }

    #[inline]
    pub fn copy(&mut self, other: &Vector) {
        self.x = other.x;
        self.y = other.y;
        self.z = other.z;
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Writes `a - b`.
    #[inline]
    pub fn sub(&mut self, a: &Vector, b: &Vector) {
        self.x = a.x - b.x;
        self.y = a.y - b.y;
        self.z = a.z - b.z;
    }

    #[inline]
    pub fn len_sq(&self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn len(&self) -> f32 {
        self.len_sq().sqrt()
    }

    /// Scale to unit length. Zero-length vectors are left untouched.
    pub fn normalize(&mut self) {
        let len = self.len();
        if len != 0.0 {
            self.x /= len;
            self.y /= len;
            self.z /= len;
        }
    }

    /// Component-wise `(1 - p) * a + p * b`. `p` is not clamped.
    #[inline]
    pub fn lerp(&mut self, a: &Vector, b: &Vector, p: f32) {
        let q = 1.0 - p;
        self.x = q * a.x + p * b.x;
        self.y = q * a.y + p * b.y;
        self.z = q * a.z + p * b.z;
    }

    /// Spherical interpolation from `a` to `b`.
    ///
    /// When the angle between the two is zero (or the sine of it vanishes,
    /// as for exactly opposite vectors) no interpolation happens and the
    /// result is `a`.
    pub fn slerp(&mut self, a: &Vector, b: &Vector, p: f32) {
        // acos is undefined just outside [-1, 1], which rounding can reach
        let angle = a.dot(b).clamp(-1.0, 1.0).acos();
        let sin_angle = angle.sin();
        // f32 sin(pi) is about -8.7e-8, not zero
        if angle == 0.0 || sin_angle.abs() < 1e-6 {
            self.copy(a);
            return;
        }

        let ta = ((1.0 - p) * angle).sin() / sin_angle;
        let tb = (p * angle).sin() / sin_angle;
        self.x = ta * a.x + tb * b.x;
        self.y = ta * a.y + tb * b.y;
        self.z = ta * a.z + tb * b.z;
    }
}

impl From<[f32; 3]> for Vector {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}
