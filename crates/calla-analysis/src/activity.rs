//! Voice-activity detection with hysteresis.
//!
//! Each tick averages the decibel spectrum over the voice fundamental band
//! and nudges a bounded counter up or down. A source counts as active only
//! once the counter climbs past a small threshold, so short dips in the
//! signal do not flicker the indicator.

use crate::FrequencySource;

/// Lower edge of the averaged band in Hz
pub const VOICE_BAND_LOW_HZ: f32 = 85.0;
/// Upper edge of the averaged band in Hz
pub const VOICE_BAND_HIGH_HZ: f32 = 255.0;

pub const ACTIVITY_COUNTER_MIN: u32 = 0;
pub const ACTIVITY_COUNTER_MAX: u32 = 60;
/// Counter values strictly above this are active
pub const ACTIVITY_COUNTER_THRESHOLD: u32 = 5;

/// Level at or above which a tick counts towards activity
pub const ACTIVITY_LEVEL: f32 = 0.5;

/// Raised when a source starts or stops talking.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ActivityEvent {
    pub source_id: String,
    pub is_active: bool,
}

/// Map a frequency to a spectrum bin, clamped to `[0, bin_count]`.
pub fn frequency_to_index(frequency: f32, sample_rate: f32, bin_count: usize) -> usize {
    let nyquist = sample_rate / 2.0;
    let index = (frequency / nyquist * bin_count as f32).round();
    (index.max(0.0) as usize).min(bin_count)
}

/// Mean of `frequencies` over the bins covering `[min_hz, max_hz)`.
/// An empty band averages to `0`.
pub fn band_average(frequencies: &[f32], sample_rate: f32, min_hz: f32, max_hz: f32) -> f32 {
    let bin_count = frequencies.len();
    let start = frequency_to_index(min_hz, sample_rate, bin_count);
    let end = frequency_to_index(max_hz, sample_rate, bin_count);
    if end <= start {
        return 0.0;
    }

    let sum: f32 = frequencies[start..end].iter().sum();
    sum / (end - start) as f32
}

/// Hysteresis-smoothed activity state for one source.
#[derive(Debug, Clone)]
pub struct ActivityDetector {
    buffer: Vec<f32>,
    counter: u32,
    was_active: bool,
}

impl ActivityDetector {
    /// `bin_count` is the analyser's frequency bin count.
    pub fn new(bin_count: usize) -> Self {
        Self {
            buffer: vec![0.0; bin_count],
            counter: ACTIVITY_COUNTER_MIN,
            was_active: false,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_active(&self) -> bool {
        self.was_active
    }

    pub fn reset(&mut self) {
        self.counter = ACTIVITY_COUNTER_MIN;
        self.was_active = false;
    }

    /// Read one spectrum from `source` and advance the detector.
    ///
    /// Returns `Some(is_active)` only when the state changed on this tick.
    pub fn tick<S: FrequencySource + ?Sized>(&mut self, source: &mut S) -> Option<bool> {
        let bins = source.frequency_bin_count();
        if self.buffer.len() != bins {
            self.buffer.resize(bins, 0.0);
        }
        source.get_float_frequency_data(&mut self.buffer);

        let average = 1.1
            + band_average(
                &self.buffer,
                source.sample_rate(),
                VOICE_BAND_LOW_HZ,
                VOICE_BAND_HIGH_HZ,
            ) / 100.0;
        self.process_level(average)
    }

    /// Advance the counter with an already computed level.
    pub fn process_level(&mut self, average: f32) -> Option<bool> {
        if average >= ACTIVITY_LEVEL && self.counter < ACTIVITY_COUNTER_MAX {
            self.counter += 1;
        } else if average < ACTIVITY_LEVEL && self.counter > ACTIVITY_COUNTER_MIN {
            self.counter -= 1;
        }

        let is_active = self.counter > ACTIVITY_COUNTER_THRESHOLD;
        if is_active != self.was_active {
            self.was_active = is_active;
            Some(is_active)
        } else {
            None
        }
    }
}
