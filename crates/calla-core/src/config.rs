//! Audio session configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Distance, timing and analysis settings shared by every spatializer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Distance at which attenuation begins.
    pub min_distance: f32,
    /// Distance at which a source becomes silent.
    pub max_distance: f32,
    pub rolloff: f32,
    /// Seconds a pose change takes to land, also used as the time constant
    /// for scheduled backend parameter changes.
    pub transition_time: f64,
    /// Analyser FFT size.
    pub buffer_size: usize,
    /// Allow the 3D-renderer tier when the backend offers one.
    pub use_renderer: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 10.0,
            rolloff: 1.0,
            transition_time: 0.5,
            buffer_size: 1024,
            use_renderer: true,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_distance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_distance {} must be non-negative",
                self.min_distance
            )));
        }
        if !(self.max_distance > self.min_distance) {
            return Err(Error::InvalidConfig(format!(
                "max_distance {} must exceed min_distance {}",
                self.max_distance, self.min_distance
            )));
        }
        if !(self.rolloff >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "rolloff {} must be non-negative",
                self.rolloff
            )));
        }
        if !(self.transition_time >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "transition_time {} must be non-negative",
                self.transition_time
            )));
        }
        if !self.buffer_size.is_power_of_two() || !(32..=32768).contains(&self.buffer_size) {
            return Err(Error::InvalidConfig(format!(
                "buffer_size {} must be a power of two in 32-32768",
                self.buffer_size
            )));
        }
        Ok(())
    }
}
