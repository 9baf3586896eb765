//! Tolerance constants for pose and gain assertions.

/// Floating point rounding errors on exact lerp results.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Slerp and normalization go through trig and square roots.
pub const ANGLE_EPSILON: f32 = 1e-4;

/// Manual volume is quantized to hundredths.
pub const VOLUME_STEP: f32 = 0.01;
