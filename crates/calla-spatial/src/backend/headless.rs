//! Backend used when the platform has no audio API.
//!
//! Poses keep interpolating against the supplied clock; every source ends up
//! on the volume-only tier with a silent element, so nothing is audible.

use std::sync::Arc;

use calla_core::{Clock, Error, MockClock, Result};

use super::{
    AnalyserNode, AudioContext, AudioListener, AudioNode, BackendCapabilities, GainNode,
    MediaElement, NodeId, PannerNode, SourceInput, SpatialRenderer, StereoPannerNode,
};

pub struct HeadlessContext {
    clock: Arc<dyn Clock>,
    sample_rate: f32,
}

impl HeadlessContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sample_rate: 48000.0,
        }
    }

    /// Headless context over a wall-clock [`MockClock`].
    pub fn with_mock_clock() -> Self {
        Self::new(Arc::new(MockClock::new()))
    }
}

impl AudioContext for HeadlessContext {
    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::NONE
    }

    fn destination(&self) -> NodeId {
        NodeId(0)
    }

    fn connect(&self, _from: NodeId, _to: NodeId) -> Result<()> {
        Err(Error::Unsupported("audio graph"))
    }

    fn disconnect(&self, _node: NodeId) {}

    fn create_source(&self, _input: &SourceInput) -> Result<Box<dyn AudioNode>> {
        Err(Error::Unsupported("source node"))
    }

    fn create_analyser(&self, _fft_size: usize) -> Result<Box<dyn AnalyserNode>> {
        Err(Error::Unsupported("analyser node"))
    }

    fn create_panner(&self) -> Result<Box<dyn PannerNode>> {
        Err(Error::Unsupported("panner node"))
    }

    fn create_stereo_panner(&self) -> Result<Box<dyn StereoPannerNode>> {
        Err(Error::Unsupported("stereo panner node"))
    }

    fn create_gain(&self) -> Result<Box<dyn GainNode>> {
        Err(Error::Unsupported("gain node"))
    }

    fn create_media_element(&self, _input: &SourceInput) -> Result<Box<dyn MediaElement>> {
        Ok(Box::new(SilentElement::default()))
    }

    fn listener(&self) -> Result<Box<dyn AudioListener>> {
        Err(Error::Unsupported("audio listener"))
    }

    fn renderer(&self) -> Option<Arc<dyn SpatialRenderer>> {
        None
    }
}

/// Media element that tracks its state but produces no sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SilentElement {
    pub volume: f32,
    pub playing: bool,
    pub looping: bool,
}

impl Default for SilentElement {
    fn default() -> Self {
        Self {
            volume: 1.0,
            playing: false,
            looping: false,
        }
    }
}

impl MediaElement for SilentElement {
    fn play(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }
}
