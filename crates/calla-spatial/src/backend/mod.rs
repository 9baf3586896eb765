//! Boundary to the platform audio backend.
//!
//! The spatializers only configure nodes; everything that actually makes
//! sound lives behind these traits. [`HeadlessContext`] stands in when no
//! platform backend exists.

use std::fmt;
use std::sync::Arc;

use calla_analysis::FrequencySource;
use calla_core::{Error, Result};

mod headless;
pub use headless::{HeadlessContext, SilentElement};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// Handle to a node in the backend's audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Positioning and panning primitives a backend declares.
///
/// Read once when the listener strategy starts; tiers that fail are cleared
/// from the strategy's copy for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// A vendored 3D renderer is available
    pub spatial_renderer: bool,
    /// Panner/listener parameters accept time-scheduled changes
    pub modern_positioning: bool,
    /// Panner/listener expose immediate `set_position`/`set_orientation`
    pub legacy_positioning: bool,
    /// A 2-channel stereo panner node can be created
    pub stereo_panner: bool,
}

impl BackendCapabilities {
    /// Nothing but plain media element volume.
    pub const NONE: Self = Self {
        spatial_renderer: false,
        modern_positioning: false,
        legacy_positioning: false,
        stereo_panner: false,
    };

    pub const ALL: Self = Self {
        spatial_renderer: true,
        modern_positioning: true,
        legacy_positioning: true,
        stereo_panner: true,
    };
}

/// A live stream, typically a remote participant's microphone.
pub trait MediaStream: Send + Sync {
    fn id(&self) -> &str;
    fn audio_track_count(&self) -> usize;
}

/// A playable media resource such as a sound effect file.
pub trait MediaElementSource: Send + Sync {
    fn src(&self) -> &str;
}

/// What a source spatializer plays.
#[derive(Clone, Default)]
pub enum SourceInput {
    #[default]
    None,
    Stream(Arc<dyn MediaStream>),
    Element(Arc<dyn MediaElementSource>),
}

impl SourceInput {
    /// Reject inputs no backend could play.
    pub fn validate(&self) -> Result<()> {
        match self {
            SourceInput::Stream(stream) if stream.audio_track_count() == 0 => Err(
                Error::InvalidStream(format!("stream {} has no audio tracks", stream.id())),
            ),
            SourceInput::Element(element) if element.src().is_empty() => {
                Err(Error::InvalidStream("media element has no source".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SourceInput::None)
    }

    /// Live streams get activity analysis; files do not.
    pub fn is_live(&self) -> bool {
        matches!(self, SourceInput::Stream(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, SourceInput::Element(_))
    }
}

impl fmt::Debug for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInput::None => write!(f, "None"),
            SourceInput::Stream(s) => write!(f, "Stream({})", s.id()),
            SourceInput::Element(e) => write!(f, "Element({})", e.src()),
        }
    }
}

pub trait AudioNode: Send {
    fn id(&self) -> NodeId;
}

/// Full 3D panner node.
pub trait PannerNode: AudioNode {
    fn set_position(&mut self, x: f32, y: f32, z: f32);
    fn set_orientation(&mut self, x: f32, y: f32, z: f32);
    /// Approach the position from `start_time` with the given time constant
    fn schedule_position(&mut self, x: f32, y: f32, z: f32, start_time: f64, time_constant: f64);
    fn schedule_orientation(&mut self, x: f32, y: f32, z: f32, start_time: f64, time_constant: f64);
    fn set_distance(&mut self, min_distance: f32, max_distance: f32, rolloff: f32);
}

pub trait StereoPannerNode: AudioNode {
    /// -1 = hard left, 1 = hard right
    fn set_pan(&mut self, pan: f32);
}

pub trait GainNode: AudioNode {
    fn set_gain(&mut self, gain: f32);
}

pub trait AnalyserNode: AudioNode + FrequencySource {}

impl<T: AudioNode + FrequencySource> AnalyserNode for T {}

/// A playing media element. Its volume is the only control the lowest tier has.
pub trait MediaElement: Send {
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn set_looping(&mut self, looping: bool);
}

/// The context's listener.
#[allow(clippy::too_many_arguments)]
pub trait AudioListener: Send {
    fn set_position(&mut self, x: f32, y: f32, z: f32);
    fn set_orientation(&mut self, fx: f32, fy: f32, fz: f32, ux: f32, uy: f32, uz: f32);
    fn schedule_position(&mut self, x: f32, y: f32, z: f32, start_time: f64, time_constant: f64);
    fn schedule_orientation(
        &mut self,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
        start_time: f64,
        time_constant: f64,
    );
}

/// Vendored 3D rendering engine.
pub trait SpatialRenderer: Send + Sync {
    fn create_source(&self) -> Result<Box<dyn RendererSource>>;
    fn set_listener_position(&self, x: f32, y: f32, z: f32);
    #[allow(clippy::too_many_arguments)]
    fn set_listener_orientation(&self, fx: f32, fy: f32, fz: f32, ux: f32, uy: f32, uz: f32);
}

/// One source inside the vendored renderer.
pub trait RendererSource: AudioNode {
    fn set_position(&mut self, x: f32, y: f32, z: f32);
    #[allow(clippy::too_many_arguments)]
    fn set_orientation(&mut self, fx: f32, fy: f32, fz: f32, ux: f32, uy: f32, uz: f32);
    fn set_min_distance(&mut self, distance: f32);
    fn set_max_distance(&mut self, distance: f32);
}

/// Platform audio context: clock, graph wiring and node factories.
pub trait AudioContext: Send + Sync {
    /// Seconds, monotonically increasing
    fn current_time(&self) -> f64;
    fn sample_rate(&self) -> f32;
    fn capabilities(&self) -> BackendCapabilities;

    fn destination(&self) -> NodeId;
    fn connect(&self, from: NodeId, to: NodeId) -> Result<()>;
    /// Remove every connection to and from `node`
    fn disconnect(&self, node: NodeId);

    /// Graph node reading from a stream or element
    fn create_source(&self, input: &SourceInput) -> Result<Box<dyn AudioNode>>;
    fn create_analyser(&self, fft_size: usize) -> Result<Box<dyn AnalyserNode>>;
    fn create_panner(&self) -> Result<Box<dyn PannerNode>>;
    fn create_stereo_panner(&self) -> Result<Box<dyn StereoPannerNode>>;
    fn create_gain(&self) -> Result<Box<dyn GainNode>>;
    fn create_media_element(&self, input: &SourceInput) -> Result<Box<dyn MediaElement>>;

    fn listener(&self) -> Result<Box<dyn AudioListener>>;
    fn renderer(&self) -> Option<Arc<dyn SpatialRenderer>>;
}
