//! Property tests for poses driven through the manager

use calla::prelude::*;
use proptest::prelude::*;

use crate::helpers::*;

/// Lerp rounding over coordinates up to 50 apart
const PATH_EPSILON: f32 = 1e-4;

fn between(v: f32, a: f32, b: f32) -> bool {
    v >= a.min(b) - PATH_EPSILON && v <= a.max(b) + PATH_EPSILON
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Sampled mid-move, a user never leaves the segment between its endpoints.
    #[test]
    fn user_position_stays_on_its_path(
        start in prop::array::uniform3(-50.0f32..50.0),
        end in prop::array::uniform3(-50.0f32..50.0),
        duration in 0.1f64..5.0,
        fraction in 0.0f64..1.5,
    ) {
        let mut fx = bare_fixture();
        fx.audio.add_user("u");
        fx.audio.set_user_position("u", start[0], start[1], start[2], 0.0).unwrap();
        fx.step(0.01);

        fx.audio.set_user_position("u", end[0], end[1], end[2], duration).unwrap();
        fx.step(duration * fraction);

        let p = fx.audio.user_pose("u").unwrap().p;
        prop_assert!(between(p.x, start[0], end[0]));
        prop_assert!(between(p.y, start[1], end[1]));
        prop_assert!(between(p.z, start[2], end[2]));
        if fraction >= 1.0 {
            prop_assert_eq!([p.x, p.y, p.z], end);
        }
    }

    /// Volume-only playback is always a valid gain, whatever the distance.
    #[test]
    fn manual_volume_stays_in_range(x in -100.0f32..100.0, z in -100.0f32..100.0) {
        let mut fx = bare_fixture();
        fx.audio.create_clip("c", clip("c.mp3"), ClipOptions::default()).unwrap();
        fx.audio.set_clip_position("c", x, 0.0, z).unwrap();
        fx.step(1.0);

        let volume = fx.mock.element(0).unwrap().volume;
        prop_assert!((0.0..=1.0).contains(&volume));
    }
}
