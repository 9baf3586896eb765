//! Tier selection with sticky fallback.
//!
//! The strategy copies the backend's capabilities once. Every source creation
//! walks the tiers best first, skipping any the copy rules out; a tier whose
//! construction fails is struck from the copy for the rest of the session and
//! the walk continues one tier down. Only an invalid input reaches the caller.

use std::sync::Arc;

use calla_core::{AudioConfig, Error, Result};
use tracing::{debug, info, warn};

use crate::backend::{AudioContext, BackendCapabilities, SourceInput};
use crate::spatializer::{SpatialProperties, Spatializer, Tier};

impl BackendCapabilities {
    /// Whether `tier` may still be attempted.
    pub fn supports(&self, tier: Tier) -> bool {
        match tier {
            Tier::Renderer => self.spatial_renderer && self.stereo_panner,
            Tier::NativeModern => self.modern_positioning && self.stereo_panner,
            Tier::NativeLegacy => self.legacy_positioning && self.stereo_panner,
            Tier::StereoPan => self.stereo_panner,
            Tier::VolumeOnly => true,
        }
    }

    /// Copy with the flag backing `tier` cleared.
    pub fn without(mut self, tier: Tier) -> Self {
        match tier {
            Tier::Renderer => self.spatial_renderer = false,
            Tier::NativeModern => self.modern_positioning = false,
            Tier::NativeLegacy => self.legacy_positioning = false,
            Tier::StereoPan => self.stereo_panner = false,
            Tier::VolumeOnly => {}
        }
        self
    }

    /// Best tier these capabilities allow.
    pub fn best_tier(&self) -> Tier {
        Tier::CASCADE
            .into_iter()
            .find(|tier| self.supports(*tier))
            .unwrap_or(Tier::VolumeOnly)
    }
}

/// Builds spatializers on the best tier the backend still supports.
pub struct ListenerStrategy {
    context: Arc<dyn AudioContext>,
    capabilities: BackendCapabilities,
    properties: SpatialProperties,
    generation: u64,
}

impl ListenerStrategy {
    pub fn new(context: Arc<dyn AudioContext>, config: &AudioConfig) -> Self {
        let mut capabilities = context.capabilities();
        if !config.use_renderer {
            capabilities = capabilities.without(Tier::Renderer);
        }
        info!(tier = ?capabilities.best_tier(), ?capabilities, "listener strategy ready");

        Self {
            context,
            capabilities,
            properties: SpatialProperties::from(config),
            generation: 0,
        }
    }

    pub fn context(&self) -> &Arc<dyn AudioContext> {
        &self.context
    }

    /// Capabilities left after every failure so far.
    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Tier a new listener would be built on.
    pub fn listener_tier(&self) -> Tier {
        self.capabilities.best_tier()
    }

    /// Bumped whenever a tier is struck off.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn properties(&self) -> SpatialProperties {
        self.properties
    }

    pub fn set_properties(&mut self, properties: SpatialProperties) {
        self.properties = properties;
    }

    fn downgrade(&mut self, tier: Tier, error: &Error) {
        warn!(?tier, %error, "spatializer tier failed, falling back");
        self.capabilities = self.capabilities.without(tier);
        self.generation += 1;
    }

    /// Build the listener-side spatializer. Never fails: the manual tiers
    /// need nothing from the backend.
    pub fn create_listener(&mut self) -> Spatializer {
        for tier in Tier::CASCADE {
            if !self.capabilities.supports(tier) {
                continue;
            }
            if matches!(tier, Tier::StereoPan | Tier::VolumeOnly) {
                break;
            }
            match Spatializer::listener(tier, self.context.clone(), self.properties) {
                Ok(listener) => return listener,
                Err(e) => self.downgrade(tier, &e),
            }
        }

        Spatializer::manual_listener(self.listener_tier(), self.context.clone(), self.properties)
    }

    /// Build a source spatializer for `input`, falling back tier by tier.
    ///
    /// Fails only when `input` itself is unusable or the lowest tier cannot
    /// be built.
    pub fn create_source(
        &mut self,
        id: &str,
        input: &SourceInput,
        buffer_size: usize,
    ) -> Result<Spatializer> {
        input.validate()?;

        for tier in Tier::CASCADE {
            if !self.capabilities.supports(tier) {
                continue;
            }
            let result = Spatializer::source(
                tier,
                id,
                self.context.clone(),
                input,
                buffer_size,
                self.properties,
            );
            match result {
                Ok(spatializer) => return Ok(spatializer),
                Err(e) if tier == Tier::VolumeOnly => return Err(e),
                Err(e) => self.downgrade(tier, &e),
            }
        }

        // VolumeOnly is always supported, so the loop has returned
        Err(Error::Unsupported("volume-only playback"))
    }

    /// Build a spatializer that plays `input` without positioning.
    pub fn create_unpositioned(&self, id: &str, input: &SourceInput) -> Result<Spatializer> {
        debug!(id, "creating unpositioned source");
        Spatializer::unpositioned(id, self.context.clone(), input, self.properties)
    }
}
