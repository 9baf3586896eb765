//! Frequency-domain analysis of a live source.
//!
//! [`FftAnalyser`] keeps the most recent `fft_size` samples of a signal and
//! produces a smoothed decibel spectrum on demand, the same data a browser
//! analyser node reports as float frequency data.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Default time smoothing between successive spectra.
pub const DEFAULT_SMOOTHING: f32 = 0.8;

/// Floor for reported magnitudes. Silence reads as this instead of -inf.
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;

/// Anything that can report a magnitude spectrum in decibels.
pub trait FrequencySource: Send {
    /// Number of bins written by [`get_float_frequency_data`](Self::get_float_frequency_data).
    fn frequency_bin_count(&self) -> usize;

    fn sample_rate(&self) -> f32;

    /// Fill `out` with per-bin magnitudes in dB. Writes at most
    /// `frequency_bin_count()` values.
    fn get_float_frequency_data(&mut self, out: &mut [f32]);
}

/// FFT spectrum analyser over a sliding window of samples.
pub struct FftAnalyser {
    sample_rate: f32,
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Circular history of the last `fft_size` samples
    history: Vec<f32>,
    write_pos: usize,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes
    smoothed: Vec<f32>,
}

impl FftAnalyser {
    /// Create an analyser. `fft_size` is rounded up to a power of two.
    pub fn new(sample_rate: f32, fft_size: usize) -> Self {
        let fft_size = fft_size.max(2).next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            sample_rate,
            fft_size,
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            fft,
            window: Self::create_blackman_window(fft_size),
            history: vec![0.0; fft_size],
            write_pos: 0,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Set time smoothing (0.0 = none, values near 1.0 = heavy)
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 1.0);
    }

    pub fn set_min_decibels(&mut self, min_decibels: f32) {
        self.min_decibels = min_decibels;
    }

    /// Append samples to the analysis window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Forget history and smoothing state
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.smoothed.fill(0.0);
        self.write_pos = 0;
    }

    fn create_blackman_window(size: usize) -> Vec<f32> {
        const A0: f32 = 0.42;
        const A1: f32 = 0.5;
        const A2: f32 = 0.08;
        (0..size)
            .map(|i| {
                let phase = 2.0 * core::f32::consts::PI * i as f32 / size as f32;
                A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
            })
            .collect()
    }

    /// Window the history (oldest sample first), transform, and fold the
    /// magnitudes into the smoothed spectrum.
    fn analyse(&mut self) {
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = self.history[(self.write_pos + i) % self.fft_size];
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.scratch.iter()) {
            let magnitude = bin.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }
    }
}

impl FrequencySource for FftAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn get_float_frequency_data(&mut self, out: &mut [f32]) {
        self.analyse();
        for (o, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            let db = 20.0 * magnitude.log10();
            *o = if db.is_finite() {
                db.max(self.min_decibels)
            } else {
                self.min_decibels
            };
        }
    }
}
