//! One renderer per entity, composed at construction from the parts its tier
//! needs: a positioner, an optional media element, an optional analyser.

use std::fmt;
use std::sync::Arc;

use calla_analysis::{ActivityDetector, ActivityEvent};
use calla_core::{AudioConfig, Error, Pose, PoseTarget, Result};
use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::attenuation::attenuate;
use crate::backend::{
    AnalyserNode, AudioContext, AudioListener, AudioNode, GainNode, MediaElement, NodeId,
    PannerNode, RendererSource, SourceInput, SpatialRenderer, StereoPannerNode,
};

/// Capability levels, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Vendored 3D renderer does all the work
    Renderer,
    /// Native panner with time-scheduled parameters
    NativeModern,
    /// Native panner with immediate setters
    NativeLegacy,
    /// Manual gain + 2-channel pan
    StereoPan,
    /// Manual volume on a plain media element
    VolumeOnly,
}

impl Tier {
    pub const CASCADE: [Tier; 5] = [
        Tier::Renderer,
        Tier::NativeModern,
        Tier::NativeLegacy,
        Tier::StereoPan,
        Tier::VolumeOnly,
    ];
}

/// How positions reach a native panner or listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStyle {
    Scheduled,
    Immediate,
}

/// Distance and timing settings a spatializer applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialProperties {
    pub min_distance: f32,
    pub max_distance: f32,
    pub rolloff: f32,
    pub transition_time: f64,
}

impl Default for SpatialProperties {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for SpatialProperties {
    fn from(config: &AudioConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            rolloff: config.rolloff,
            transition_time: config.transition_time,
        }
    }
}

pub(crate) enum Positioner {
    /// Nothing positioned yet (also non-spatialized clips)
    Unpositioned,
    Renderer(Box<dyn RendererSource>),
    Panner {
        node: Box<dyn PannerNode>,
        style: PositionStyle,
    },
    StereoPan {
        gain: Box<dyn GainNode>,
        panner: Box<dyn StereoPannerNode>,
    },
    VolumeOnly,
    RendererListener(Arc<dyn SpatialRenderer>),
    NativeListener {
        listener: Box<dyn AudioListener>,
        style: PositionStyle,
    },
    /// Manual tiers read the listener pose per tick; nothing to drive here
    ManualListener,
}

impl Positioner {
    fn name(&self) -> &'static str {
        match self {
            Positioner::Unpositioned => "unpositioned",
            Positioner::Renderer(_) => "renderer",
            Positioner::Panner {
                style: PositionStyle::Scheduled,
                ..
            } => "panner-scheduled",
            Positioner::Panner { .. } => "panner-immediate",
            Positioner::StereoPan { .. } => "stereo-pan",
            Positioner::VolumeOnly => "volume-only",
            Positioner::RendererListener(_) => "renderer-listener",
            Positioner::NativeListener { .. } => "native-listener",
            Positioner::ManualListener => "manual-listener",
        }
    }

    fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Positioner::Renderer(source) => vec![source.id()],
            Positioner::Panner { node, .. } => vec![node.id()],
            Positioner::StereoPan { gain, panner } => vec![gain.id(), panner.id()],
            _ => Vec::new(),
        }
    }
}

struct Analysis {
    analyser: Box<dyn AnalyserNode>,
    detector: ActivityDetector,
}

/// Renders one entity's pose through the audio backend.
pub struct Spatializer {
    id: String,
    context: Arc<dyn AudioContext>,
    properties: SpatialProperties,
    tier: Option<Tier>,
    positioner: Positioner,
    source: Option<Box<dyn AudioNode>>,
    analysis: Option<Analysis>,
    element: Option<Box<dyn MediaElement>>,
    volume: f32,
    activity: Option<Sender<ActivityEvent>>,
    disposed: bool,
}

impl Spatializer {
    fn bare(id: &str, context: Arc<dyn AudioContext>, properties: SpatialProperties) -> Self {
        Self {
            id: id.to_owned(),
            context,
            properties,
            tier: None,
            positioner: Positioner::Unpositioned,
            source: None,
            analysis: None,
            element: None,
            volume: 1.0,
            activity: None,
            disposed: false,
        }
    }

    /// Build a source-side spatializer on exactly `tier`.
    ///
    /// Partially built backend resources are released on failure.
    pub fn source(
        tier: Tier,
        id: &str,
        context: Arc<dyn AudioContext>,
        input: &SourceInput,
        buffer_size: usize,
        properties: SpatialProperties,
    ) -> Result<Self> {
        input.validate()?;
        let mut spatializer = Self::bare(id, context, properties);
        spatializer.tier = Some(tier);

        match spatializer.attach_source(tier, input, buffer_size) {
            Ok(()) => {
                debug!(id, positioner = spatializer.positioner.name(), "created spatializer");
                Ok(spatializer)
            }
            Err(e) => {
                spatializer.dispose();
                Err(e)
            }
        }
    }

    /// Build a spatializer that plays `input` without positioning it.
    pub fn unpositioned(
        id: &str,
        context: Arc<dyn AudioContext>,
        input: &SourceInput,
        properties: SpatialProperties,
    ) -> Result<Self> {
        input.validate()?;
        let mut spatializer = Self::bare(id, context, properties);
        if !input.is_none() {
            spatializer.element = Some(spatializer.context.create_media_element(input)?);
        }
        Ok(spatializer)
    }

    /// Build the listener-side spatializer matching `tier`.
    pub fn listener(
        tier: Tier,
        context: Arc<dyn AudioContext>,
        properties: SpatialProperties,
    ) -> Result<Self> {
        let positioner = match tier {
            Tier::Renderer => Positioner::RendererListener(
                context
                    .renderer()
                    .ok_or(Error::Unsupported("spatial renderer"))?,
            ),
            Tier::NativeModern => Positioner::NativeListener {
                listener: context.listener()?,
                style: PositionStyle::Scheduled,
            },
            Tier::NativeLegacy => Positioner::NativeListener {
                listener: context.listener()?,
                style: PositionStyle::Immediate,
            },
            Tier::StereoPan | Tier::VolumeOnly => {
                return Ok(Self::manual_listener(tier, context, properties))
            }
        };

        let mut spatializer = Self::bare("listener", context, properties);
        spatializer.tier = Some(tier);
        spatializer.positioner = positioner;
        debug!(positioner = spatializer.positioner.name(), "created listener");
        Ok(spatializer)
    }

    /// Listener for the manual tiers. Sources read its pose each tick, so
    /// there is nothing in the backend to drive and nothing that can fail.
    pub fn manual_listener(
        tier: Tier,
        context: Arc<dyn AudioContext>,
        properties: SpatialProperties,
    ) -> Self {
        let mut spatializer = Self::bare("listener", context, properties);
        spatializer.tier = Some(tier);
        spatializer.positioner = Positioner::ManualListener;
        spatializer
    }

    fn attach_source(&mut self, tier: Tier, input: &SourceInput, buffer_size: usize) -> Result<()> {
        let context = self.context.clone();

        if input.is_element() {
            self.element = Some(context.create_media_element(input)?);
        }
        let props = self.properties;

        match tier {
            Tier::VolumeOnly => {
                if self.element.is_none() && !input.is_none() {
                    self.element = Some(context.create_media_element(input)?);
                }
                self.positioner = Positioner::VolumeOnly;
                if input.is_live() {
                    match context.create_source(input) {
                        Ok(source) => self.source = Some(source),
                        Err(e) => debug!(id = %self.id, error = %e, "no source node for analysis"),
                    }
                }
            }
            Tier::Renderer => {
                let source = self.attach_input(input)?;
                let renderer = context
                    .renderer()
                    .ok_or(Error::Unsupported("spatial renderer"))?;
                let mut handle = renderer.create_source()?;
                handle.set_min_distance(props.min_distance);
                handle.set_max_distance(props.max_distance);
                let node = handle.id();
                self.positioner = Positioner::Renderer(handle);
                if let Some(source) = source {
                    context.connect(source, node)?;
                }
            }
            Tier::NativeModern | Tier::NativeLegacy => {
                let source = self.attach_input(input)?;
                let mut node = context.create_panner()?;
                node.set_distance(props.min_distance, props.max_distance, props.rolloff);
                let panner = node.id();
                let style = if tier == Tier::NativeModern {
                    PositionStyle::Scheduled
                } else {
                    PositionStyle::Immediate
                };
                self.positioner = Positioner::Panner { node, style };
                if let Some(source) = source {
                    context.connect(source, panner)?;
                }
                context.connect(panner, context.destination())?;
            }
            Tier::StereoPan => {
                let source = self.attach_input(input)?;
                let gain = context.create_gain()?;
                let panner = match context.create_stereo_panner() {
                    Ok(panner) => panner,
                    Err(e) => {
                        context.disconnect(gain.id());
                        return Err(e);
                    }
                };
                let (gain_id, panner_id) = (gain.id(), panner.id());
                self.positioner = Positioner::StereoPan { gain, panner };
                if let Some(source) = source {
                    context.connect(source, gain_id)?;
                }
                context.connect(gain_id, panner_id)?;
                context.connect(panner_id, context.destination())?;
            }
        }

        self.attach_analysis(input, buffer_size);
        Ok(())
    }

    /// Graph node reading `input`, for the tiers that route it through panners.
    fn attach_input(&mut self, input: &SourceInput) -> Result<Option<NodeId>> {
        if input.is_none() {
            return Ok(None);
        }
        let source = self.context.create_source(input)?;
        let id = source.id();
        self.source = Some(source);
        Ok(Some(id))
    }

    /// Analysis is optional: a backend without analysers still renders.
    fn attach_analysis(&mut self, input: &SourceInput, buffer_size: usize) {
        if !input.is_live() {
            return;
        }
        let Some(source) = self.source.as_ref().map(|s| s.id()) else {
            return;
        };

        let analyser = match self.context.create_analyser(buffer_size) {
            Ok(analyser) => analyser,
            Err(Error::Unsupported(what)) => {
                debug!(id = %self.id, what, "activity analysis unavailable");
                return;
            }
            Err(e) => {
                warn!(id = %self.id, error = %e, "failed to create analyser");
                return;
            }
        };
        if let Err(e) = self.context.connect(source, analyser.id()) {
            warn!(id = %self.id, error = %e, "failed to connect analyser");
            self.context.disconnect(analyser.id());
            return;
        }

        let detector = ActivityDetector::new(analyser.frequency_bin_count());
        self.analysis = Some(Analysis { analyser, detector });
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tier this spatializer was built for. `None` for unpositioned clips.
    pub fn tier(&self) -> Option<Tier> {
        self.tier
    }

    pub fn properties(&self) -> SpatialProperties {
        self.properties
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn has_analysis(&self) -> bool {
        self.analysis.is_some()
    }

    /// Whether the activity detector currently reports talking.
    pub fn is_active(&self) -> bool {
        self.analysis
            .as_ref()
            .is_some_and(|a| a.detector.is_active())
    }

    pub fn set_audio_properties(
        &mut self,
        min_distance: f32,
        max_distance: f32,
        rolloff: f32,
        transition_time: f64,
    ) {
        self.properties = SpatialProperties {
            min_distance,
            max_distance,
            rolloff,
            transition_time,
        };
        if self.disposed {
            return;
        }

        match &mut self.positioner {
            Positioner::Renderer(source) => {
                source.set_min_distance(min_distance);
                source.set_max_distance(max_distance);
            }
            Positioner::Panner { node, .. } => {
                node.set_distance(min_distance, max_distance, rolloff);
            }
            _ => {}
        }
    }

    /// Route activity transitions to `sender`.
    pub fn set_activity_listener(&mut self, sender: Sender<ActivityEvent>) {
        self.activity = Some(sender);
    }

    pub fn clear_activity_listener(&mut self) {
        self.activity = None;
    }

    pub fn play(&mut self) -> Result<()> {
        match self.element.as_mut() {
            Some(element) if !self.disposed => element.play(),
            _ => Ok(()),
        }
    }

    pub fn stop(&mut self) {
        if let Some(element) = self.element.as_mut() {
            element.stop();
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        if let Some(element) = self.element.as_mut() {
            element.set_looping(looping);
        }
    }

    /// Base volume, before any distance attenuation.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        // manual tiers fold this in on the next update
        if !matches!(
            self.positioner,
            Positioner::VolumeOnly | Positioner::StereoPan { .. }
        ) {
            if let Some(element) = self.element.as_mut() {
                element.set_volume(self.volume);
            }
        }
    }

    fn update_activity(&mut self) {
        let Some(analysis) = self.analysis.as_mut() else {
            return;
        };
        if let Some(is_active) = analysis.detector.tick(&mut *analysis.analyser) {
            if let Some(sender) = &self.activity {
                let _ = sender.send(ActivityEvent {
                    source_id: self.id.clone(),
                    is_active,
                });
            }
        }
    }
}

impl PoseTarget for Spatializer {
    fn update(&mut self, pose: &Pose, listener: &Pose, t: f64) {
        if self.disposed {
            return;
        }

        let (p, f, u) = (&pose.p, &pose.f, &pose.u);
        let props = self.properties;
        match &mut self.positioner {
            Positioner::Unpositioned | Positioner::ManualListener => {}
            Positioner::Renderer(source) => {
                // the renderer expects distances alongside every pose
                source.set_position(p.x, p.y, p.z);
                source.set_orientation(f.x, f.y, f.z, u.x, u.y, u.z);
                source.set_min_distance(props.min_distance);
                source.set_max_distance(props.max_distance);
            }
            Positioner::Panner {
                node,
                style: PositionStyle::Scheduled,
            } => {
                node.schedule_position(p.x, p.y, p.z, t, props.transition_time);
                node.schedule_orientation(f.x, f.y, f.z, t, props.transition_time);
            }
            Positioner::Panner {
                node,
                style: PositionStyle::Immediate,
            } => {
                node.set_position(p.x, p.y, p.z);
                node.set_orientation(f.x, f.y, f.z);
            }
            Positioner::StereoPan { gain, panner } => {
                let a = attenuate(p, &listener.p, props.min_distance, props.max_distance);
                gain.set_gain(a.volume * self.volume);
                panner.set_pan(a.pan);
            }
            Positioner::VolumeOnly => {
                if let Some(element) = self.element.as_mut() {
                    let a = attenuate(p, &listener.p, props.min_distance, props.max_distance);
                    element.set_volume(a.volume * self.volume);
                }
            }
            Positioner::RendererListener(renderer) => {
                renderer.set_listener_position(p.x, p.y, p.z);
                renderer.set_listener_orientation(f.x, f.y, f.z, u.x, u.y, u.z);
            }
            Positioner::NativeListener {
                listener,
                style: PositionStyle::Scheduled,
            } => {
                listener.schedule_position(p.x, p.y, p.z, t, props.transition_time);
                listener.schedule_orientation(
                    f.x,
                    f.y,
                    f.z,
                    u.x,
                    u.y,
                    u.z,
                    t,
                    props.transition_time,
                );
            }
            Positioner::NativeListener {
                listener,
                style: PositionStyle::Immediate,
            } => {
                listener.set_position(p.x, p.y, p.z);
                listener.set_orientation(f.x, f.y, f.z, u.x, u.y, u.z);
            }
        }

        self.update_activity();
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.activity = None;

        if let Some(element) = self.element.as_mut() {
            element.stop();
        }
        if let Some(analysis) = self.analysis.take() {
            self.context.disconnect(analysis.analyser.id());
        }
        for node in self.positioner.node_ids() {
            self.context.disconnect(node);
        }
        if let Some(source) = self.source.take() {
            self.context.disconnect(source.id());
        }
        self.positioner = Positioner::Unpositioned;
        self.element = None;
        debug!(id = %self.id, "disposed spatializer");
    }
}

impl Drop for Spatializer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Spatializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spatializer")
            .field("id", &self.id)
            .field("tier", &self.tier)
            .field("positioner", &self.positioner.name())
            .field("analysis", &self.analysis.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}
