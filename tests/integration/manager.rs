//! Manager lifecycle and pose interpolation tests
//!
//! Poses are driven by the mock backend's manual clock, so every position
//! below is exact for the time the test stepped to.

use approx::assert_relative_eq;
use calla::prelude::*;
use calla_spatial::backend::mock::{MockContext, NodeKind};
use std::sync::Arc;

use crate::helpers::tolerances::{ANGLE_EPSILON, FLOAT_EPSILON};
use crate::helpers::*;

/// Halfway through a two second move the user is halfway there.
#[test]
fn test_user_pose_interpolates_over_audio_clock() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");
    fx.audio
        .set_user_pose("alice", 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 2.0)
        .unwrap();

    fx.step(1.0);
    let pose = fx.audio.user_pose("alice").unwrap();
    assert_relative_eq!(pose.p.x, 0.5, epsilon = FLOAT_EPSILON);

    fx.step(5.0);
    let pose = fx.audio.user_pose("alice").unwrap();
    assert_eq!(pose.p.x, 1.0);
}

/// Turning a quarter circle passes through the diagonal.
#[test]
fn test_user_orientation_slerps() {
    let mut fx = full_fixture();
    fx.audio.add_user("alice");
    fx.audio
        .set_user_orientation("alice", 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 2.0)
        .unwrap();

    fx.step(1.0);
    let f = fx.audio.user_pose("alice").unwrap().f;
    let diagonal = std::f32::consts::FRAC_1_SQRT_2;
    assert_relative_eq!(f.x, diagonal, epsilon = ANGLE_EPSILON);
    assert_relative_eq!(f.z, diagonal, epsilon = ANGLE_EPSILON);
    assert_relative_eq!(f.len(), 1.0, epsilon = ANGLE_EPSILON);
}

#[test]
fn test_listener_follows_local_pose() {
    let mut fx = full_fixture();
    assert_eq!(fx.audio.listener().unwrap().tier(), Some(Tier::Renderer));

    fx.audio.set_local_position(2.0, 0.0, -1.0);
    fx.step(1.0);

    assert_eq!(fx.audio.local_pose().p.x, 2.0);
    assert_eq!(
        fx.mock.state().renderer_listener_position,
        Some([2.0, 0.0, -1.0])
    );
}

#[test]
fn test_native_listener_is_scheduled() {
    let builder = AudioManager::builder().use_renderer(false);
    let mut fx = Fixture::with_builder(BackendCapabilities::ALL, builder);
    assert_eq!(fx.audio.listener().unwrap().tier(), Some(Tier::NativeModern));

    fx.audio.set_local_position(0.0, 1.5, 0.0);
    fx.step(1.0);
    let state = fx.mock.state();
    assert_eq!(state.listener_position, Some([0.0, 1.5, 0.0]));
    assert!(state.listener_scheduled);
}

/// Poses set before `start` still land once the clock runs.
#[test]
fn test_poses_before_start() {
    let mut audio = AudioManager::builder().build().unwrap();
    audio.add_user("bob");
    audio.set_user_position("bob", 4.0, 0.0, 0.0, 0.0).unwrap();
    audio.update();
    assert_eq!(audio.user_pose("bob").unwrap().p.x, 0.0);

    let mock = Arc::new(MockContext::new(BackendCapabilities::NONE));
    audio.start(Some(mock.clone())).unwrap();
    mock.clock().advance(0.1);
    audio.update();
    assert_eq!(audio.user_pose("bob").unwrap().p.x, 4.0);
}

/// No platform backend: time still moves and nothing panics.
#[test]
fn test_headless_start() {
    let mut audio = AudioManager::builder().build().unwrap();
    audio.start(None).unwrap();
    assert!(audio.is_ready());
    assert_eq!(audio.listener().unwrap().tier(), Some(Tier::VolumeOnly));

    audio.add_user("bob");
    audio.set_user_position("bob", 1.0, 2.0, 3.0, 0.0).unwrap();
    let before = audio.current_time();
    std::thread::sleep(std::time::Duration::from_millis(5));
    audio.update();
    assert!(audio.current_time() >= before);
    assert_eq!(audio.user_pose("bob").unwrap().p.z, 3.0);
}

#[test]
fn test_user_bookkeeping() {
    let mut fx = bare_fixture();
    assert!(fx.audio.add_user("a"));
    assert!(fx.audio.add_user("b"));
    assert!(!fx.audio.add_user("a"));

    let mut ids: Vec<&str> = fx.audio.user_ids().collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);

    assert!(fx.audio.remove_user("a"));
    assert!(!fx.audio.remove_user("a"));
    assert!(!fx.audio.has_user("a"));
    assert!(fx.audio.user_pose("a").is_none());
    assert_eq!(
        fx.audio.set_user_position("a", 0.0, 0.0, 0.0, 0.0),
        Err(Error::UnknownEntity("a".into()))
    );
}

#[tokio::test]
async fn test_drop_tears_down_graph() {
    let mut fx = full_fixture();
    for id in ["a", "b", "c"] {
        fx.audio.add_user(id);
        fx.audio.set_user_source(id, stream(id)).await.unwrap();
    }
    assert_eq!(fx.mock.created(NodeKind::RendererSource), 3);
    assert!(fx.mock.live_nodes() > 0);

    let Fixture { audio, mock, .. } = fx;
    drop(audio);
    assert_eq!(mock.live_nodes(), 0);
}
