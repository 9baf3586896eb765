//! Pose interpolation kernel for spatial voice chat.
//!
//! # Primary API
//!
//! - [`Vector`] / [`Pose`]: in-place geometry with lerp/slerp
//! - [`InterpolatedPose`]: clock-driven transitions bound to a [`PoseTarget`]
//! - [`Clock`]: audio clock abstraction with [`MockClock`] and [`ManualClock`]
//! - [`AudioConfig`]: distance and timing settings
//!
//! # Example
//!
//! ```
//! use calla_core::{InterpolatedPose, Pose, PoseTarget};
//!
//! struct Print;
//! impl PoseTarget for Print {
//!     fn update(&mut self, pose: &Pose, _listener: &Pose, _t: f64) {
//!         let _ = pose.p.x;
//!     }
//!     fn dispose(&mut self) {}
//! }
//!
//! let mut pose = InterpolatedPose::<Print>::new();
//! pose.set_target(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 2.0);
//! pose.update(1.0);
//! assert_eq!(pose.current.p.x, 0.5);
//! ```

pub mod error;
pub use error::{Error, Result};

mod vector;
pub use vector::Vector;

mod pose;
pub use pose::{project, Pose};

mod interpolated;
pub use interpolated::{InterpolatedPose, PoseTarget};

pub mod clock;
pub use clock::{Clock, ManualClock, MockClock};

pub mod config;
pub use config::AudioConfig;
