//! Distance rolloff for tiers without a native 3D panner.

use calla_core::{project, Vector};

/// Gain and stereo pan for one source relative to the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// 0..=1, quantized to hundredths
    pub volume: f32,
    /// -1 ..= 1, from listener minus source
    pub pan: f32,
}

/// Compute the manual rolloff of a source at `source` heard from `listener`.
///
/// Volume falls off linearly between `min_distance` and `max_distance`, is
/// then squared and rounded to the nearest 1/100. Pan is the x component of
/// the unit vector from source to listener, so a source at +x pans to -1.
pub fn attenuate(
    source: &Vector,
    listener: &Vector,
    min_distance: f32,
    max_distance: f32,
) -> Attenuation {
    let mut delta = Vector::default();
    delta.sub(listener, source);
    let dist = delta.len();

    let dist_scale = project(dist as f64, min_distance as f64, max_distance as f64);
    let volume = 1.0 - dist_scale.clamp(0.0, 1.0);
    let volume = ((100.0 * volume * volume).round() / 100.0) as f32;

    let pan = if dist > 0.0 { delta.x / dist } else { 0.0 };

    Attenuation { volume, pan }
}
