//! Builder for configuring and constructing an `AudioManager`.

use calla_core::AudioConfig;

use crate::{AudioManager, Result};

/// Distance and timing settings are validated together on [`build`](Self::build).
/// The audio context is not created here: call
/// [`AudioManager::start`] once the platform allows audio playback.
///
/// # Example
///
/// ```
/// use calla::prelude::*;
///
/// let audio = AudioManager::builder()
///     .distance(0.5, 20.0)
///     .transition_time(0.25)
///     .build()?;
///
/// assert!(!audio.is_ready());
/// # Ok::<(), calla::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AudioManagerBuilder {
    config: AudioConfig,
}

impl AudioManagerBuilder {
    /// Replace every setting at once, e.g. with a deserialized config.
    pub fn config(mut self, config: AudioConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 1.0 to 10.0
    pub fn distance(mut self, min_distance: f32, max_distance: f32) -> Self {
        self.config.min_distance = min_distance;
        self.config.max_distance = max_distance;
        self
    }

    /// Default: 1.0
    pub fn rolloff(mut self, rolloff: f32) -> Self {
        self.config.rolloff = rolloff;
        self
    }

    /// Seconds. Default: 0.5
    pub fn transition_time(mut self, seconds: f64) -> Self {
        self.config.transition_time = seconds;
        self
    }

    /// Analyser FFT size. Default: 1024
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Allow the 3D-renderer tier. Default: true
    pub fn use_renderer(mut self, enabled: bool) -> Self {
        self.config.use_renderer = enabled;
        self
    }

    pub fn build(self) -> Result<AudioManager> {
        self.config.validate()?;
        Ok(AudioManager::new(self.config))
    }
}
