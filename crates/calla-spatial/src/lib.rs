//! Spatializers for voice chat: each remote source and the local listener get
//! one, built on the best tier the audio backend supports, from a vendored 3D
//! renderer down to manual volume on a plain media element.

pub mod backend;
pub use backend::{
    AudioContext, BackendCapabilities, HeadlessContext, MediaElementSource, MediaStream, NodeId,
    SourceInput,
};

mod attenuation;
pub use attenuation::{attenuate, Attenuation};

mod spatializer;
pub use spatializer::{PositionStyle, SpatialProperties, Spatializer, Tier};

mod strategy;
pub use strategy::ListenerStrategy;
