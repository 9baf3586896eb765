//! Recording backend for tests.
//!
//! Every node created through [`MockContext`] writes what it is told into a
//! shared [`MockState`], so tests can assert on positions, pans, gains and
//! graph teardown. Node creation can be made to fail per kind to exercise the
//! tier cascade.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use calla_analysis::FrequencySource;
use calla_core::{Clock, Error, ManualClock, Result};
use parking_lot::{Mutex, MutexGuard};

use super::{
    AnalyserNode, AudioContext, AudioListener, AudioNode, BackendCapabilities, GainNode,
    MediaElement, NodeId, PannerNode, RendererSource, SourceInput, SpatialRenderer,
    StereoPannerNode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Source,
    Analyser,
    Panner,
    StereoPanner,
    Gain,
    RendererSource,
    Element,
    Listener,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementState {
    pub volume: f32,
    pub playing: bool,
    pub looping: bool,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_id: u64,
    pub kinds: HashMap<NodeId, NodeKind>,
    pub connections: Vec<(NodeId, NodeId)>,
    /// One entry per `disconnect` call
    pub disconnects: Vec<NodeId>,
    pub positions: HashMap<NodeId, [f32; 3]>,
    /// Whether the last position change on a node was scheduled
    pub scheduled: HashMap<NodeId, bool>,
    pub orientations: HashMap<NodeId, [f32; 3]>,
    pub distances: HashMap<NodeId, (f32, f32, f32)>,
    pub pans: HashMap<NodeId, f32>,
    pub gains: HashMap<NodeId, f32>,
    pub elements: Vec<ElementState>,
    pub listener_position: Option<[f32; 3]>,
    pub listener_scheduled: bool,
    pub renderer_listener_position: Option<[f32; 3]>,
    pub failing: HashSet<NodeKind>,
    /// Level every analyser bin reports, in dB
    pub analyser_db: f32,
}

impl MockState {
    fn allocate(&mut self, kind: NodeKind) -> Result<NodeId> {
        if self.failing.contains(&kind) {
            return Err(Error::Backend(format!("mock {:?} creation failed", kind)));
        }
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.kinds.insert(id, kind);
        Ok(id)
    }
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockContext {
    state: Shared,
    clock: ManualClock,
    capabilities: BackendCapabilities,
    renderer: Option<Arc<MockRenderer>>,
}

impl MockContext {
    pub fn new(capabilities: BackendCapabilities) -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            analyser_db: -100.0,
            ..Default::default()
        }));
        let renderer = capabilities.spatial_renderer.then(|| {
            Arc::new(MockRenderer {
                state: state.clone(),
            })
        });

        Self {
            state,
            clock: ManualClock::new(0.0),
            capabilities,
            renderer,
        }
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    /// Make every later creation of `kind` fail.
    pub fn fail(&self, kind: NodeKind) {
        self.state.lock().failing.insert(kind);
    }

    pub fn set_analyser_level(&self, db: f32) {
        self.state.lock().analyser_db = db;
    }

    pub fn nodes_of(&self, kind: NodeKind) -> Vec<NodeId> {
        let state = self.state.lock();
        let mut ids: Vec<NodeId> = state
            .kinds
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn created(&self, kind: NodeKind) -> usize {
        self.nodes_of(kind).len()
    }

    pub fn disconnect_count(&self, id: NodeId) -> usize {
        self.state
            .lock()
            .disconnects
            .iter()
            .filter(|d| **d == id)
            .count()
    }

    /// Graph nodes created and never disconnected.
    pub fn live_nodes(&self) -> usize {
        let state = self.state.lock();
        let gone: HashSet<NodeId> = state.disconnects.iter().copied().collect();
        state
            .kinds
            .iter()
            .filter(|(id, kind)| {
                !matches!(kind, NodeKind::Element | NodeKind::Listener) && !gone.contains(id)
            })
            .count()
    }

    pub fn element(&self, index: usize) -> Option<ElementState> {
        self.state.lock().elements.get(index).copied()
    }
}

impl AudioContext for MockContext {
    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn sample_rate(&self) -> f32 {
        48000.0
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn destination(&self) -> NodeId {
        NodeId(0)
    }

    fn connect(&self, from: NodeId, to: NodeId) -> Result<()> {
        self.state.lock().connections.push((from, to));
        Ok(())
    }

    fn disconnect(&self, node: NodeId) {
        let mut state = self.state.lock();
        state.disconnects.push(node);
        state.connections.retain(|(a, b)| *a != node && *b != node);
    }

    fn create_source(&self, input: &SourceInput) -> Result<Box<dyn AudioNode>> {
        if input.is_none() {
            return Err(Error::InvalidStream("no input to read from".into()));
        }
        let id = self.state.lock().allocate(NodeKind::Source)?;
        Ok(Box::new(MockNode { id }))
    }

    fn create_analyser(&self, fft_size: usize) -> Result<Box<dyn AnalyserNode>> {
        let id = self.state.lock().allocate(NodeKind::Analyser)?;
        Ok(Box::new(MockAnalyser {
            id,
            bins: fft_size / 2,
            state: self.state.clone(),
        }))
    }

    fn create_panner(&self) -> Result<Box<dyn PannerNode>> {
        let id = self.state.lock().allocate(NodeKind::Panner)?;
        Ok(Box::new(MockPanner {
            id,
            state: self.state.clone(),
        }))
    }

    fn create_stereo_panner(&self) -> Result<Box<dyn StereoPannerNode>> {
        let id = self.state.lock().allocate(NodeKind::StereoPanner)?;
        Ok(Box::new(MockStereoPanner {
            id,
            state: self.state.clone(),
        }))
    }

    fn create_gain(&self) -> Result<Box<dyn GainNode>> {
        let id = self.state.lock().allocate(NodeKind::Gain)?;
        Ok(Box::new(MockGain {
            id,
            state: self.state.clone(),
        }))
    }

    fn create_media_element(&self, _input: &SourceInput) -> Result<Box<dyn MediaElement>> {
        let mut state = self.state.lock();
        state.allocate(NodeKind::Element)?;
        state.elements.push(ElementState {
            volume: 1.0,
            ..Default::default()
        });
        Ok(Box::new(MockElement {
            index: state.elements.len() - 1,
            state: self.state.clone(),
        }))
    }

    fn listener(&self) -> Result<Box<dyn AudioListener>> {
        self.state.lock().allocate(NodeKind::Listener)?;
        Ok(Box::new(MockListener {
            state: self.state.clone(),
        }))
    }

    fn renderer(&self) -> Option<Arc<dyn SpatialRenderer>> {
        self.renderer
            .clone()
            .map(|r| r as Arc<dyn SpatialRenderer>)
    }
}

struct MockNode {
    id: NodeId,
}

impl AudioNode for MockNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

struct MockAnalyser {
    id: NodeId,
    bins: usize,
    state: Shared,
}

impl AudioNode for MockAnalyser {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl FrequencySource for MockAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.bins
    }

    fn sample_rate(&self) -> f32 {
        48000.0
    }

    fn get_float_frequency_data(&mut self, out: &mut [f32]) {
        out.fill(self.state.lock().analyser_db);
    }
}

struct MockPanner {
    id: NodeId,
    state: Shared,
}

impl AudioNode for MockPanner {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl PannerNode for MockPanner {
    fn set_position(&mut self, x: f32, y: f32, z: f32) {
        let mut state = self.state.lock();
        state.positions.insert(self.id, [x, y, z]);
        state.scheduled.insert(self.id, false);
    }

    fn set_orientation(&mut self, x: f32, y: f32, z: f32) {
        self.state.lock().orientations.insert(self.id, [x, y, z]);
    }

    fn schedule_position(&mut self, x: f32, y: f32, z: f32, _start: f64, _tc: f64) {
        let mut state = self.state.lock();
        state.positions.insert(self.id, [x, y, z]);
        state.scheduled.insert(self.id, true);
    }

    fn schedule_orientation(&mut self, x: f32, y: f32, z: f32, _start: f64, _tc: f64) {
        self.state.lock().orientations.insert(self.id, [x, y, z]);
    }

    fn set_distance(&mut self, min_distance: f32, max_distance: f32, rolloff: f32) {
        self.state
            .lock()
            .distances
            .insert(self.id, (min_distance, max_distance, rolloff));
    }
}

struct MockStereoPanner {
    id: NodeId,
    state: Shared,
}

impl AudioNode for MockStereoPanner {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl StereoPannerNode for MockStereoPanner {
    fn set_pan(&mut self, pan: f32) {
        self.state.lock().pans.insert(self.id, pan);
    }
}

struct MockGain {
    id: NodeId,
    state: Shared,
}

impl AudioNode for MockGain {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl GainNode for MockGain {
    fn set_gain(&mut self, gain: f32) {
        self.state.lock().gains.insert(self.id, gain);
    }
}

struct MockElement {
    index: usize,
    state: Shared,
}

impl MediaElement for MockElement {
    fn play(&mut self) -> Result<()> {
        self.state.lock().elements[self.index].playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().elements[self.index].playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().elements[self.index].volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().elements[self.index].volume
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().elements[self.index].looping = looping;
    }
}

struct MockListener {
    state: Shared,
}

impl AudioListener for MockListener {
    fn set_position(&mut self, x: f32, y: f32, z: f32) {
        let mut state = self.state.lock();
        state.listener_position = Some([x, y, z]);
        state.listener_scheduled = false;
    }

    fn set_orientation(&mut self, _fx: f32, _fy: f32, _fz: f32, _ux: f32, _uy: f32, _uz: f32) {}

    fn schedule_position(&mut self, x: f32, y: f32, z: f32, _start: f64, _tc: f64) {
        let mut state = self.state.lock();
        state.listener_position = Some([x, y, z]);
        state.listener_scheduled = true;
    }

    fn schedule_orientation(
        &mut self,
        _fx: f32,
        _fy: f32,
        _fz: f32,
        _ux: f32,
        _uy: f32,
        _uz: f32,
        _start: f64,
        _tc: f64,
    ) {
    }
}

pub struct MockRenderer {
    state: Shared,
}

impl SpatialRenderer for MockRenderer {
    fn create_source(&self) -> Result<Box<dyn RendererSource>> {
        let id = self.state.lock().allocate(NodeKind::RendererSource)?;
        Ok(Box::new(MockRendererSource {
            id,
            state: self.state.clone(),
        }))
    }

    fn set_listener_position(&self, x: f32, y: f32, z: f32) {
        self.state.lock().renderer_listener_position = Some([x, y, z]);
    }

    fn set_listener_orientation(&self, _fx: f32, _fy: f32, _fz: f32, _ux: f32, _uy: f32, _uz: f32) {
    }
}

struct MockRendererSource {
    id: NodeId,
    state: Shared,
}

impl AudioNode for MockRendererSource {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl RendererSource for MockRendererSource {
    fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.state.lock().positions.insert(self.id, [x, y, z]);
    }

    fn set_orientation(&mut self, fx: f32, fy: f32, fz: f32, _ux: f32, _uy: f32, _uz: f32) {
        self.state.lock().orientations.insert(self.id, [fx, fy, fz]);
    }

    fn set_min_distance(&mut self, distance: f32) {
        let mut state = self.state.lock();
        let entry = state.distances.entry(self.id).or_insert((0.0, 0.0, 1.0));
        entry.0 = distance;
    }

    fn set_max_distance(&mut self, distance: f32) {
        let mut state = self.state.lock();
        let entry = state.distances.entry(self.id).or_insert((0.0, 0.0, 1.0));
        entry.1 = distance;
    }
}

/// Media stream stand-in with a fixed id and track count.
pub struct MockStream {
    pub id: String,
    pub audio_tracks: usize,
}

impl MockStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            audio_tracks: 1,
        }
    }
}

impl super::MediaStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn audio_track_count(&self) -> usize {
        self.audio_tracks
    }
}

/// Media file stand-in.
pub struct MockClip(pub String);

impl super::MediaElementSource for MockClip {
    fn src(&self) -> &str {
        &self.0
    }
}
