//! Integration test modules for Calla
//!
//! - manager: lifecycle, listener, interpolation over the audio clock
//! - sources: replacement ordering, tier fallback, activity events
//! - clips: sound effects
//! - properties: proptest checks on interpolation and manual volume

pub mod manager;
pub mod properties;
pub mod sources;
