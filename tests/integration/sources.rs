//! Source replacement, tier fallback and activity tests

use approx::assert_relative_eq;
use calla::prelude::*;
use calla_spatial::backend::mock::{MockContext, NodeKind};
use std::sync::Arc;

use crate::helpers::tolerances::VOLUME_STEP;
use crate::helpers::*;

/// With no positioning primitives the user still gets a working source.
#[tokio::test]
async fn test_no_capabilities_falls_to_volume_only() {
    let mut fx = bare_fixture();
    fx.audio.add_user("alice");
    assert!(fx.audio.set_user_source("alice", stream("alice")).await.unwrap());

    let spatializer = fx.audio.user_spatializer("alice").unwrap();
    assert_eq!(spatializer.tier(), Some(Tier::VolumeOnly));

    fx.audio
        .set_user_position("alice", 0.0, 0.0, 5.5, 0.0)
        .unwrap();
    fx.step(0.1);
    fx.frames(3);
    assert_relative_eq!(fx.mock.element(0).unwrap().volume, 0.25, epsilon = VOLUME_STEP);
}

/// Replacing a source disposes the old one exactly once, before the new one exists.
#[tokio::test]
async fn test_replacing_source_disposes_first() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");

    fx.audio.set_user_source("alice", stream("a")).await.unwrap();
    let first = fx.mock.nodes_of(NodeKind::RendererSource);
    assert_eq!(first.len(), 1);

    fx.audio.set_user_source("alice", stream("b")).await.unwrap();
    let all = fx.mock.nodes_of(NodeKind::RendererSource);
    assert_eq!(all.len(), 2);
    let second = all[1];

    assert_eq!(fx.mock.disconnect_count(first[0]), 1);
    assert_eq!(fx.mock.disconnect_count(second), 0);
    // nothing created for the replacement had been torn down
    assert!(fx.mock.state().disconnects.iter().all(|id| *id < second));

    // source, renderer handle and analyser of the replacement
    assert_eq!(fx.mock.live_nodes(), 3);
}

/// Two overlapping requests: only the latest is bound.
#[tokio::test]
async fn test_stale_resolution_is_disposed() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");

    let (a, b) = (stream("a"), stream("b"));
    let old_ticket = fx.audio.begin_user_source("alice", &a).unwrap();
    let old = fx.audio.create_spatializer("alice", a, TEST_BUFFER_SIZE);
    let new_ticket = fx.audio.begin_user_source("alice", &b).unwrap();
    let new = fx.audio.create_spatializer("alice", b, TEST_BUFFER_SIZE);

    let new = new.await.unwrap();
    assert!(fx.audio.install_user_source("alice", new_ticket, new).unwrap());

    let old = old.await.unwrap();
    assert!(!fx.audio.install_user_source("alice", old_ticket, old).unwrap());

    let handles = fx.mock.nodes_of(NodeKind::RendererSource);
    assert_eq!(fx.mock.disconnect_count(handles[0]), 0);
    assert_eq!(fx.mock.disconnect_count(handles[1]), 1);
    assert!(fx.audio.user_spatializer("alice").is_some());
}

#[tokio::test]
async fn test_resolution_for_removed_user_is_disposed() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");
    let input = stream("a");
    let ticket = fx.audio.begin_user_source("alice", &input).unwrap();
    let pending = fx.audio.create_spatializer("alice", input, TEST_BUFFER_SIZE);
    fx.audio.remove_user("alice");

    let spatializer = pending.await.unwrap();
    assert!(!fx.audio.install_user_source("alice", ticket, spatializer).unwrap());
    assert_eq!(fx.mock.live_nodes(), 0);
}

/// Creation waits for `start` instead of failing.
#[tokio::test]
async fn test_creation_waits_for_start() {
    let mut audio = AudioManager::builder().build().unwrap();
    let pending = tokio::spawn(audio.create_spatializer("alice", stream("a"), TEST_BUFFER_SIZE));
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());

    let mock = Arc::new(MockContext::new(BackendCapabilities::ALL));
    audio.start(Some(mock.clone())).unwrap();

    let spatializer = pending.await.unwrap().unwrap();
    assert_eq!(spatializer.tier(), Some(Tier::Renderer));
}

#[tokio::test]
async fn test_pending_creation_fails_when_closed() {
    let audio = AudioManager::builder().build().unwrap();
    let pending = audio.create_spatializer("alice", stream("a"), TEST_BUFFER_SIZE);
    drop(audio);
    assert!(matches!(pending.await, Err(Error::Closed)));
}

#[tokio::test]
async fn test_invalid_stream_is_reported() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");
    let result = fx.audio.set_user_source("alice", silent_stream("a")).await;
    assert!(matches!(result, Err(Error::InvalidStream(_))));
    assert_eq!(fx.mock.created(NodeKind::RendererSource), 0);
    assert!(fx.audio.user_spatializer("alice").is_none());
}

#[tokio::test]
async fn test_empty_source_just_clears() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");
    fx.audio.set_user_source("alice", stream("a")).await.unwrap();
    assert!(!fx.audio.set_user_source("alice", SourceInput::None).await.unwrap());
    assert!(fx.audio.user_spatializer("alice").is_none());
    assert_eq!(fx.mock.live_nodes(), 0);
}

/// A failed tier stays off for every later source and the listener follows.
#[tokio::test]
async fn test_tier_failure_is_sticky() {
    let mut fx = full_fixture();
    fx.mock.fail(NodeKind::RendererSource);

    fx.audio.add_user("a");
    fx.audio.set_user_source("a", stream("a")).await.unwrap();
    assert_eq!(
        fx.audio.user_spatializer("a").unwrap().tier(),
        Some(Tier::NativeModern)
    );

    fx.mock.state().failing.clear();
    fx.audio.add_user("b");
    fx.audio.set_user_source("b", stream("b")).await.unwrap();
    assert_eq!(
        fx.audio.user_spatializer("b").unwrap().tier(),
        Some(Tier::NativeModern)
    );
    assert_eq!(fx.mock.created(NodeKind::RendererSource), 0);

    fx.step(0.1);
    assert_eq!(fx.audio.listener().unwrap().tier(), Some(Tier::NativeModern));
}

/// Sources bound before a tier failure move down with the listener.
#[tokio::test]
async fn test_downgrade_rebuilds_bound_sources() {
    let mut fx = full_fixture();
    fx.audio.add_user("a");
    fx.audio.set_user_source("a", stream("a")).await.unwrap();
    let old = fx.mock.nodes_of(NodeKind::RendererSource)[0];

    fx.mock.fail(NodeKind::RendererSource);
    fx.audio.add_user("b");
    fx.audio.set_user_source("b", stream("b")).await.unwrap();

    fx.audio.set_local_position(5.0, 0.0, 0.0);
    fx.step(1.0);

    assert_eq!(
        fx.audio.user_spatializer("a").unwrap().tier(),
        Some(Tier::NativeModern)
    );
    assert_eq!(fx.audio.listener().unwrap().tier(), Some(Tier::NativeModern));
    assert_eq!(fx.mock.state().listener_position, Some([5.0, 0.0, 0.0]));
    assert_eq!(fx.mock.disconnect_count(old), 1);
    assert_eq!(fx.mock.created(NodeKind::RendererSource), 1);
}

/// A source built before the failure but installed after the rebuild still moves down.
#[tokio::test]
async fn test_late_install_on_struck_tier_is_rebuilt() {
    let mut fx = full_fixture();
    fx.audio.add_user("a");
    let input = stream("a");
    let ticket = fx.audio.begin_user_source("a", &input).unwrap();
    let built = fx
        .audio
        .create_spatializer("a", input, TEST_BUFFER_SIZE)
        .await
        .unwrap();
    assert_eq!(built.tier(), Some(Tier::Renderer));

    fx.mock.fail(NodeKind::RendererSource);
    fx.audio.add_user("b");
    fx.audio.set_user_source("b", stream("b")).await.unwrap();
    fx.step(0.1);

    assert!(fx.audio.install_user_source("a", ticket, built).unwrap());
    assert_eq!(
        fx.audio.user_spatializer("a").unwrap().tier(),
        Some(Tier::Renderer)
    );
    fx.step(0.1);
    assert_eq!(
        fx.audio.user_spatializer("a").unwrap().tier(),
        Some(Tier::NativeModern)
    );
}

/// A playing clip keeps playing, with its options, after it is rebuilt.
#[tokio::test]
async fn test_downgrade_rebuilds_playing_clip() {
    let mut fx = full_fixture();
    let options = ClipOptions {
        autoplay: true,
        looping: true,
        volume: 0.7,
        ..Default::default()
    };
    fx.audio.create_clip("chime", clip("chime.mp3"), options).unwrap();

    fx.mock.fail(NodeKind::RendererSource);
    fx.audio.add_user("b");
    fx.audio.set_user_source("b", stream("b")).await.unwrap();
    fx.step(0.1);

    assert!(fx.audio.has_clip("chime"));
    assert!(!fx.mock.element(0).unwrap().playing);
    let rebuilt = fx.mock.element(1).unwrap();
    assert!(rebuilt.playing);
    assert!(rebuilt.looping);
    assert_relative_eq!(rebuilt.volume, 0.7);
}

/// Stereo tier: gain and pan follow the source relative to the moving listener.
#[tokio::test]
async fn test_stereo_pan_tracks_listener() {
    let caps = BackendCapabilities {
        stereo_panner: true,
        ..BackendCapabilities::NONE
    };
    let mut fx = Fixture::new(caps);
    fx.audio.add_user("alice");
    fx.audio.set_user_source("alice", stream("alice")).await.unwrap();
    fx.audio
        .set_user_position("alice", 3.0, 0.0, 0.0, 0.0)
        .unwrap();
    fx.step(0.1);

    let gain = fx.mock.nodes_of(NodeKind::Gain)[0];
    let pan = fx.mock.nodes_of(NodeKind::StereoPanner)[0];
    assert_relative_eq!(fx.mock.state().gains[&gain], 0.6, epsilon = VOLUME_STEP);
    assert_relative_eq!(fx.mock.state().pans[&pan], -1.0);

    // step behind alice: she is now straight ahead, same distance
    fx.audio.set_local_position(3.0, 0.0, 3.0);
    fx.step(1.0);
    assert_relative_eq!(fx.mock.state().gains[&gain], 0.6, epsilon = VOLUME_STEP);
    assert_relative_eq!(fx.mock.state().pans[&pan], 0.0);
}

#[tokio::test]
async fn test_audio_properties_broadcast() {
    let builder = AudioManager::builder().use_renderer(false);
    let mut fx = Fixture::with_builder(BackendCapabilities::ALL, builder);
    fx.audio.add_user("a");
    fx.audio.set_user_source("a", stream("a")).await.unwrap();

    fx.audio.set_audio_properties(2.0, 20.0, 0.5, 0.1).unwrap();
    fx.audio.add_user("b");
    fx.audio.set_user_source("b", stream("b")).await.unwrap();

    let state = fx.mock.state();
    for panner in state
        .kinds
        .iter()
        .filter(|(_, kind)| **kind == NodeKind::Panner)
        .map(|(id, _)| id)
    {
        assert_eq!(state.distances[panner], (2.0, 20.0, 0.5));
    }
}

#[tokio::test]
async fn test_activity_events_on_transitions() {
    let mut fx = full_fixture();
    let events = fx.audio.activity_events();
    fx.audio.add_user("alice");
    fx.audio.set_user_source("alice", stream("alice")).await.unwrap();

    fx.mock.set_analyser_level(-30.0);
    fx.frames(20);
    fx.mock.set_analyser_level(-100.0);
    fx.frames(20);

    let seen: Vec<_> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            ActivityEvent {
                source_id: "alice".into(),
                is_active: true,
            },
            ActivityEvent {
                source_id: "alice".into(),
                is_active: false,
            },
        ]
    );
}

/// A replaced source never reports activity again.
#[tokio::test]
async fn test_disposed_source_is_silent() {
    let mut fx = full_fixture();
    let events = fx.audio.activity_events();
    fx.audio.add_user("alice");
    fx.audio.set_user_source("alice", stream("alice")).await.unwrap();
    fx.audio.remove_user("alice");

    fx.mock.set_analyser_level(-30.0);
    fx.frames(20);
    assert!(events.try_recv().is_err());
}
