//! AudioManager: owns every pose in the session and drives it from the audio clock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use calla_analysis::ActivityEvent;
use calla_core::{AudioConfig, Error, InterpolatedPose, Pose, PoseTarget, Result};
use calla_spatial::{
    AudioContext, HeadlessContext, ListenerStrategy, SourceInput, SpatialProperties, Spatializer,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Playback options for a sound effect clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipOptions {
    pub looping: bool,
    /// Start playing as soon as the clip is created
    pub autoplay: bool,
    /// Position the clip in the scene. Unspatialized clips play at full volume.
    pub spatialize: bool,
    pub volume: f32,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            looping: false,
            autoplay: false,
            spatialize: true,
            volume: 1.0,
        }
    }
}

/// A remote participant's pose and the generation of its latest source request.
struct UserSlot {
    pose: InterpolatedPose<Spatializer>,
    generation: u64,
    /// Kept so the source can be rebuilt on a lower tier
    input: SourceInput,
}

struct ClipSlot {
    pose: InterpolatedPose<Spatializer>,
    input: SourceInput,
    options: ClipOptions,
    playing: bool,
}

type SharedStrategy = Arc<Mutex<Option<ListenerStrategy>>>;

/// Session audio coordinator.
///
/// Holds the local listener, every remote user and every clip. Nothing is
/// audible until [`start`](Self::start) creates the audio context; poses can
/// be set before that and catch up on the first [`update`](Self::update).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use calla::prelude::*;
/// use calla::{HeadlessContext, ManualClock};
///
/// let clock = ManualClock::new(0.0);
/// let mut audio = AudioManager::builder().build()?;
/// audio.start(Some(Arc::new(HeadlessContext::new(Arc::new(clock.clone())))))?;
///
/// audio.add_user("alice");
/// audio.set_user_position("alice", 3.0, 0.0, 0.0, 1.0)?;
/// clock.advance(0.5);
/// audio.update();
///
/// let pose = audio.user_pose("alice").unwrap();
/// assert_eq!(pose.p.x, 1.5);
/// # Ok::<(), calla::Error>(())
/// ```
pub struct AudioManager {
    config: AudioConfig,
    context: Option<Arc<dyn AudioContext>>,
    strategy: SharedStrategy,
    ready: watch::Sender<bool>,

    listener: InterpolatedPose<Spatializer>,
    /// Strategy generation every bound spatializer was checked against
    tier_generation: u64,
    /// A source was installed on a tier struck off after the last check
    rebuild_pending: bool,

    users: HashMap<String, UserSlot>,
    clips: HashMap<String, ClipSlot>,
    next_generation: u64,

    activity_tx: Sender<ActivityEvent>,
    activity_rx: Receiver<ActivityEvent>,
    closed: bool,
}

impl AudioManager {
    pub fn builder() -> crate::AudioManagerBuilder {
        crate::AudioManagerBuilder::default()
    }

    pub(crate) fn new(config: AudioConfig) -> Self {
        let (ready, _) = watch::channel(false);
        let (activity_tx, activity_rx) = crossbeam_channel::unbounded();

        Self {
            config,
            context: None,
            strategy: Arc::new(Mutex::new(None)),
            ready,
            listener: InterpolatedPose::new(),
            tier_generation: 0,
            rebuild_pending: false,
            users: HashMap::new(),
            clips: HashMap::new(),
            next_generation: 0,
            activity_tx,
            activity_rx,
            closed: false,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Create the audio context. Call once, after the user has interacted
    /// with the page or app; later calls are no-ops.
    ///
    /// Without a platform context a [`HeadlessContext`] keeps time moving so
    /// poses still interpolate, silently.
    pub fn start(&mut self, context: Option<Arc<dyn AudioContext>>) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        if self.context.is_some() {
            return Ok(());
        }

        let context = context.unwrap_or_else(|| {
            info!("no audio backend, running headless");
            Arc::new(HeadlessContext::with_mock_clock())
        });
        info!(sample_rate = context.sample_rate(), "audio context started");

        let mut strategy = ListenerStrategy::new(context.clone(), &self.config);
        self.listener.bind(strategy.create_listener());
        self.tier_generation = strategy.generation();

        *self.strategy.lock() = Some(strategy);
        self.context = Some(context);
        self.ready.send_replace(true);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        !self.closed && self.context.is_some()
    }

    pub fn context(&self) -> Option<&Arc<dyn AudioContext>> {
        self.context.as_ref()
    }

    /// Audio clock in seconds. Zero before [`start`](Self::start).
    pub fn current_time(&self) -> f64 {
        self.context.as_ref().map_or(0.0, |c| c.current_time())
    }

    /// Advance every pose to the current audio time. Call once per frame.
    pub fn update(&mut self) {
        if !self.is_ready() {
            return;
        }
        let t = self.current_time();

        self.refresh_tiers();
        self.listener.update(t);
        let listener = self.listener.current;

        for slot in self.users.values_mut() {
            slot.pose.update_relative(t, Some(&listener));
        }
        for slot in self.clips.values_mut() {
            slot.pose.update_relative(t, Some(&listener));
        }
    }

    /// Rebuild every spatializer whose tier was struck off since the last
    /// check, listener included. Rebuilding can strike off further tiers, so
    /// this repeats until the strategy settles.
    fn refresh_tiers(&mut self) {
        let shared = self.strategy.clone();
        let mut guard = shared.lock();
        let Some(strategy) = guard.as_mut() else {
            return;
        };
        if strategy.generation() == self.tier_generation && !self.rebuild_pending {
            return;
        }
        self.rebuild_pending = false;

        loop {
            let generation = strategy.generation();
            let capabilities = strategy.capabilities();
            let stale = |pose: &InterpolatedPose<Spatializer>| {
                pose.spatializer()
                    .and_then(Spatializer::tier)
                    .is_some_and(|tier| !capabilities.supports(tier))
            };

            for (id, slot) in self.users.iter_mut().filter(|(_, slot)| stale(&slot.pose)) {
                slot.pose.dispose();
                match strategy.create_source(id, &slot.input, self.config.buffer_size) {
                    Ok(mut spatializer) => {
                        debug!(id = %id, tier = ?spatializer.tier(), "rebuilt user source");
                        spatializer.set_activity_listener(self.activity_tx.clone());
                        slot.pose.bind(spatializer);
                    }
                    Err(e) => warn!(id = %id, error = %e, "failed to rebuild user source"),
                }
            }

            for (name, slot) in self.clips.iter_mut().filter(|(_, slot)| stale(&slot.pose)) {
                slot.pose.dispose();
                match strategy.create_source(name, &slot.input, self.config.buffer_size) {
                    Ok(mut spatializer) => {
                        debug!(name = %name, tier = ?spatializer.tier(), "rebuilt clip");
                        spatializer.set_looping(slot.options.looping);
                        spatializer.set_volume(slot.options.volume);
                        if slot.playing {
                            if let Err(e) = spatializer.play() {
                                warn!(name = %name, error = %e, "rebuilt clip failed to resume");
                            }
                        }
                        slot.pose.bind(spatializer);
                    }
                    Err(e) => warn!(name = %name, error = %e, "failed to rebuild clip"),
                }
            }

            if stale(&self.listener) {
                debug!(tier = ?strategy.listener_tier(), "rebuilding listener");
                self.listener.bind(strategy.create_listener());
            }

            if strategy.generation() == generation {
                break;
            }
        }
        self.tier_generation = strategy.generation();
    }

    // Listener

    #[allow(clippy::too_many_arguments)]
    pub fn set_local_pose(
        &mut self,
        px: f32,
        py: f32,
        pz: f32,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
    ) {
        let (t, dt) = (self.current_time(), self.config.transition_time);
        self.listener
            .set_target(px, py, pz, fx, fy, fz, ux, uy, uz, t, dt);
    }

    pub fn set_local_position(&mut self, px: f32, py: f32, pz: f32) {
        let (t, dt) = (self.current_time(), self.config.transition_time);
        self.listener.set_target_position(px, py, pz, t, dt);
    }

    pub fn set_local_orientation(&mut self, fx: f32, fy: f32, fz: f32, ux: f32, uy: f32, uz: f32) {
        let (t, dt) = (self.current_time(), self.config.transition_time);
        self.listener
            .set_target_orientation(fx, fy, fz, ux, uy, uz, t, dt);
    }

    pub fn local_pose(&self) -> Pose {
        self.listener.current
    }

    pub fn listener(&self) -> Option<&Spatializer> {
        self.listener.spatializer()
    }

    // Users

    /// Track a remote user. Returns `false` if the id was already known.
    pub fn add_user(&mut self, id: &str) -> bool {
        if self.users.contains_key(id) {
            return false;
        }
        self.users.insert(
            id.to_owned(),
            UserSlot {
                pose: InterpolatedPose::new(),
                generation: 0,
                input: SourceInput::None,
            },
        );
        true
    }

    /// Forget a user, disposing its spatializer. Pending creations for it
    /// are dropped when they resolve.
    pub fn remove_user(&mut self, id: &str) -> bool {
        self.users.remove(id).is_some()
    }

    pub fn has_user(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    /// The pose sampled on the last update.
    pub fn user_pose(&self, id: &str) -> Option<Pose> {
        self.users.get(id).map(|slot| slot.pose.current)
    }

    pub fn user_spatializer(&self, id: &str) -> Option<&Spatializer> {
        self.users.get(id).and_then(|slot| slot.pose.spatializer())
    }

    fn user_mut(&mut self, id: &str) -> Result<&mut UserSlot> {
        self.users
            .get_mut(id)
            .ok_or_else(|| Error::UnknownEntity(id.to_owned()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_user_pose(
        &mut self,
        id: &str,
        px: f32,
        py: f32,
        pz: f32,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
        dt: f64,
    ) -> Result<()> {
        let t = self.current_time();
        self.user_mut(id)?
            .pose
            .set_target(px, py, pz, fx, fy, fz, ux, uy, uz, t, dt);
        Ok(())
    }

    pub fn set_user_position(&mut self, id: &str, px: f32, py: f32, pz: f32, dt: f64) -> Result<()> {
        let t = self.current_time();
        self.user_mut(id)?
            .pose
            .set_target_position(px, py, pz, t, dt);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_user_orientation(
        &mut self,
        id: &str,
        fx: f32,
        fy: f32,
        fz: f32,
        ux: f32,
        uy: f32,
        uz: f32,
        dt: f64,
    ) -> Result<()> {
        let t = self.current_time();
        self.user_mut(id)?
            .pose
            .set_target_orientation(fx, fy, fz, ux, uy, uz, t, dt);
        Ok(())
    }

    /// Replace the user's audio source.
    ///
    /// The old spatializer is disposed before the new one is requested.
    /// Resolves to `false` when the request went stale while pending (a newer
    /// request or removal of the user) or when `input` is empty.
    pub async fn set_user_source(&mut self, id: &str, input: SourceInput) -> Result<bool> {
        let ticket = self.begin_user_source(id, &input)?;
        if input.is_none() {
            return Ok(false);
        }
        let spatializer = self
            .create_spatializer(id, input, self.config.buffer_size)
            .await?;
        self.install_user_source(id, ticket, spatializer)
    }

    /// First half of [`set_user_source`](Self::set_user_source): dispose the
    /// current spatializer and hand out a ticket for the replacement built
    /// from `input`.
    pub fn begin_user_source(&mut self, id: &str, input: &SourceInput) -> Result<u64> {
        self.next_generation += 1;
        let generation = self.next_generation;

        let slot = self.user_mut(id)?;
        slot.pose.dispose();
        slot.generation = generation;
        slot.input = input.clone();
        Ok(generation)
    }

    /// Second half of [`set_user_source`](Self::set_user_source). Binds
    /// `spatializer` if `ticket` is still the user's latest request,
    /// otherwise disposes it and returns `false`.
    pub fn install_user_source(
        &mut self,
        id: &str,
        ticket: u64,
        mut spatializer: Spatializer,
    ) -> Result<bool> {
        if self.closed {
            spatializer.dispose();
            return Err(Error::Closed);
        }

        let props = SpatialProperties::from(&self.config);
        let activity = self.activity_tx.clone();
        let struck_off = {
            let guard = self.strategy.lock();
            let capabilities = guard.as_ref().map(ListenerStrategy::capabilities);
            spatializer
                .tier()
                .zip(capabilities)
                .is_some_and(|(tier, capabilities)| !capabilities.supports(tier))
        };
        let Some(slot) = self.users.get_mut(id).filter(|s| s.generation == ticket) else {
            debug!(id, ticket, "dropping stale spatializer");
            spatializer.dispose();
            return Ok(false);
        };

        spatializer.set_audio_properties(
            props.min_distance,
            props.max_distance,
            props.rolloff,
            props.transition_time,
        );
        spatializer.set_activity_listener(activity);
        slot.pose.bind(spatializer);
        // built before a failure elsewhere; the next update moves it down
        self.rebuild_pending |= struck_off;
        Ok(true)
    }

    /// Build a spatializer for `input` once the context has started.
    ///
    /// The returned future borrows nothing from the manager, so several can
    /// be in flight at once. It fails with [`Error::Closed`] if the manager
    /// shuts down first.
    pub fn create_spatializer(
        &self,
        id: &str,
        input: SourceInput,
        buffer_size: usize,
    ) -> impl Future<Output = Result<Spatializer>> + Send + 'static {
        let strategy = self.strategy.clone();
        let mut ready = self.ready.subscribe();
        let id = id.to_owned();

        async move {
            ready
                .wait_for(|ready| *ready)
                .await
                .map_err(|_| Error::Closed)?;

            let mut guard = strategy.lock();
            let strategy = guard.as_mut().ok_or(Error::Closed)?;
            strategy.create_source(&id, &input, buffer_size)
        }
    }

    // Clips

    /// Load a sound effect. Requires a started context.
    pub fn create_clip(&mut self, name: &str, input: SourceInput, options: ClipOptions) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }

        let mut spatializer = {
            let mut guard = self.strategy.lock();
            let strategy = guard.as_mut().ok_or(Error::NotStarted)?;
            if options.spatialize {
                strategy.create_source(name, &input, self.config.buffer_size)?
            } else {
                strategy.create_unpositioned(name, &input)?
            }
        };
        spatializer.set_looping(options.looping);
        spatializer.set_volume(options.volume);
        if options.autoplay {
            spatializer.play()?;
        }

        let mut pose = InterpolatedPose::new();
        pose.bind(spatializer);
        let slot = ClipSlot {
            pose,
            input,
            options,
            playing: options.autoplay,
        };
        // replacing a clip drops, and so disposes, the old one
        self.clips.insert(name.to_owned(), slot);
        debug!(name, ?options, "created clip");
        Ok(())
    }

    fn clip_mut(&mut self, name: &str) -> Result<&mut ClipSlot> {
        self.clips
            .get_mut(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_owned()))
    }

    pub fn play_clip(&mut self, name: &str) -> Result<()> {
        let slot = self.clip_mut(name)?;
        slot.playing = true;
        match slot.pose.spatializer_mut() {
            Some(spatializer) => spatializer.play(),
            None => Ok(()),
        }
    }

    pub fn stop_clip(&mut self, name: &str) -> Result<()> {
        let slot = self.clip_mut(name)?;
        slot.playing = false;
        if let Some(spatializer) = slot.pose.spatializer_mut() {
            spatializer.stop();
        }
        Ok(())
    }

    pub fn set_clip_volume(&mut self, name: &str, volume: f32) -> Result<()> {
        let slot = self.clip_mut(name)?;
        slot.options.volume = volume;
        if let Some(spatializer) = slot.pose.spatializer_mut() {
            spatializer.set_volume(volume);
        }
        Ok(())
    }

    pub fn set_clip_position(&mut self, name: &str, px: f32, py: f32, pz: f32) -> Result<()> {
        let (t, dt) = (self.current_time(), self.config.transition_time);
        self.clip_mut(name)?
            .pose
            .set_target_position(px, py, pz, t, dt);
        Ok(())
    }

    pub fn remove_clip(&mut self, name: &str) -> bool {
        self.clips.remove(name).is_some()
    }

    pub fn has_clip(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn clip_pose(&self, name: &str) -> Option<Pose> {
        self.clips.get(name).map(|slot| slot.pose.current)
    }

    // Properties and events

    /// Change distance and timing settings for every bound source and for
    /// sources created afterwards.
    pub fn set_audio_properties(
        &mut self,
        min_distance: f32,
        max_distance: f32,
        rolloff: f32,
        transition_time: f64,
    ) -> Result<()> {
        let config = AudioConfig {
            min_distance,
            max_distance,
            rolloff,
            transition_time,
            ..self.config
        };
        config.validate()?;
        self.config = config;

        if let Some(strategy) = self.strategy.lock().as_mut() {
            strategy.set_properties(SpatialProperties::from(&config));
        }
        let spatializers = self
            .users
            .values_mut()
            .map(|slot| &mut slot.pose)
            .chain(self.clips.values_mut().map(|slot| &mut slot.pose))
            .chain(std::iter::once(&mut self.listener))
            .filter_map(|pose| pose.spatializer_mut());
        for spatializer in spatializers {
            spatializer.set_audio_properties(min_distance, max_distance, rolloff, transition_time);
        }
        Ok(())
    }

    /// Talking start/stop events from every analysed user source.
    pub fn activity_events(&self) -> Receiver<ActivityEvent> {
        self.activity_rx.clone()
    }

    /// Tear down every spatializer. Pending creations resolve to
    /// [`Error::Closed`].
    pub fn dispose(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.users.clear();
        self.clips.clear();
        self.listener.dispose();
        *self.strategy.lock() = None;
        // wake pending creations so they observe the missing strategy
        self.ready.send_replace(true);
        info!("audio manager disposed");
    }
}

impl Drop for AudioManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
