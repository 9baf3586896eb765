//! # Calla - Spatial Voice Chat Audio
//!
//! Places every participant of a voice chat in 3D space around the local
//! listener, on whatever the audio backend can do.
//!
//! ## Architecture
//!
//! Calla is an umbrella crate that coordinates:
//! - **calla-core** - Vectors, poses and clock-driven pose interpolation
//! - **calla-analysis** - FFT spectrum and voice activity detection
//! - **calla-spatial** - Backend traits and the spatializer tiers, from a 3D renderer down to plain volume
//!
//! ## Quick Start
//!
//! ```ignore
//! use calla::prelude::*;
//!
//! let mut audio = AudioManager::builder().build()?;
//! audio.start(Some(platform_context))?;
//!
//! audio.add_user("alice");
//! audio.set_user_source("alice", SourceInput::Stream(alice_stream)).await?;
//!
//! // every frame
//! audio.set_user_position("alice", 3.0, 0.0, -2.0, 0.5)?;
//! audio.update();
//!
//! for event in audio.activity_events().try_iter() {
//!     println!("{} talking: {}", event.source_id, event.is_active);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `mock` - Recording audio backend for tests
//! - `serialization` - Serde support for activity events

/// Re-export of calla-core for direct access
pub use calla_core as core;

/// Re-export of calla-analysis for direct access
pub use calla_analysis as analysis;

/// Re-export of calla-spatial for direct access
pub use calla_spatial as spatial;

pub use calla_core::{
    AudioConfig, Clock, Error, InterpolatedPose, ManualClock, MockClock, Pose, PoseTarget, Result,
    Vector,
};

pub use calla_analysis::ActivityEvent;

pub use calla_spatial::{
    AudioContext, BackendCapabilities, HeadlessContext, ListenerStrategy, SourceInput,
    Spatializer, Tier,
};

mod manager;
pub use manager::{AudioManager, ClipOptions};

mod builder;
pub use builder::AudioManagerBuilder;

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        ActivityEvent, AudioConfig, AudioContext, AudioManager, AudioManagerBuilder,
        BackendCapabilities, ClipOptions, Error, Pose, Result, SourceInput, Tier,
    };
}
