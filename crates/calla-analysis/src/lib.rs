//! # Calla Analysis
//!
//! Frequency analysis for live voice sources:
//! - **Spectrum**: [`FftAnalyser`], a sliding-window FFT reporting smoothed dB magnitudes
//! - **Activity**: [`ActivityDetector`], counter-based talking detection with hysteresis
//!
//! All analysis works on plain `&[f32]` buffers and the [`FrequencySource`]
//! trait, so an audio backend can supply its own analyser instead.
//!
//! ## Example
//!
//! ```rust
//! use calla_analysis::{ActivityDetector, FftAnalyser, FrequencySource};
//!
//! let mut analyser = FftAnalyser::new(48000.0, 1024);
//! let mut detector = ActivityDetector::new(analyser.frequency_bin_count());
//!
//! analyser.push_samples(&vec![0.0; 1024]);
//! assert_eq!(detector.tick(&mut analyser), None);
//! ```

pub mod activity;
pub mod spectrum;

pub use activity::{
    band_average, frequency_to_index, ActivityDetector, ActivityEvent, ACTIVITY_COUNTER_MAX,
    ACTIVITY_COUNTER_MIN, ACTIVITY_COUNTER_THRESHOLD,
};
pub use spectrum::{FftAnalyser, FrequencySource};
