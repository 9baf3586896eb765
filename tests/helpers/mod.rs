//! Test helpers and fixtures for Calla integration tests
//!
//! Every fixture runs on the recording mock backend with a manual clock, so
//! tests step time explicitly and assert on what the spatializers wrote.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact lerp results
//! - `ANGLE_EPSILON` (1e-4): Slerped orientations
//! - `VOLUME_STEP` (0.01): Quantized manual volume

#![allow(dead_code)]

pub mod tolerances;

use std::sync::{Arc, Once};

use calla::prelude::*;
use calla::ManualClock;
use calla_spatial::backend::mock::{MockClip, MockContext, MockStream};

/// Matches the default analyser size
pub const TEST_BUFFER_SIZE: usize = 1024;

/// Install a tracing subscriber once per test binary. Set `RUST_LOG` to see output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A started manager on a mock backend declaring `capabilities`.
pub struct Fixture {
    pub audio: AudioManager,
    pub mock: Arc<MockContext>,
    pub clock: ManualClock,
}

impl Fixture {
    pub fn new(capabilities: BackendCapabilities) -> Self {
        Self::with_builder(capabilities, AudioManager::builder())
    }

    pub fn with_builder(capabilities: BackendCapabilities, builder: AudioManagerBuilder) -> Self {
        init_tracing();
        let mock = Arc::new(MockContext::new(capabilities));
        let clock = mock.clock();
        let mut audio = builder.build().expect("Failed to build audio manager");
        audio
            .start(Some(mock.clone()))
            .expect("Failed to start audio manager");
        Self { audio, mock, clock }
    }

    /// Move the clock forward and run one frame.
    pub fn step(&mut self, dt: f64) {
        self.clock.advance(dt);
        self.audio.update();
    }

    /// Run `frames` frames without moving the clock.
    pub fn frames(&mut self, frames: usize) {
        for _ in 0..frames {
            self.audio.update();
        }
    }
}

/// A started manager with no positioning primitives at all.
pub fn bare_fixture() -> Fixture {
    Fixture::new(BackendCapabilities::NONE)
}

/// A started manager with every tier available.
pub fn full_fixture() -> Fixture {
    Fixture::new(BackendCapabilities::ALL)
}

pub fn stream(id: &str) -> SourceInput {
    SourceInput::Stream(Arc::new(MockStream::new(id)))
}

pub fn silent_stream(id: &str) -> SourceInput {
    SourceInput::Stream(Arc::new(MockStream {
        id: id.to_owned(),
        audio_tracks: 0,
    }))
}

pub fn clip(src: &str) -> SourceInput {
    SourceInput::Element(Arc::new(MockClip(src.to_owned())))
}
