//! Synthetic landmark generator for `stub://` sources.
//!
//! Produces a repeating cycle of a held hand shape followed by a rest period
//! with no hands, with a little positional jitter so consecutive frames are
//! not identical.

use rand::Rng;

use crate::frame::{Frame, Landmark, HAND_LANDMARKS, POSE_LANDMARKS};

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Frames per second used for timestamps.
    pub fps: u32,
    /// Frames with a visible hand per cycle.
    pub gesture_frames: u64,
    /// Frames without hands per cycle.
    pub rest_frames: u64,
    /// Max positional noise added to every coordinate.
    pub jitter: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            gesture_frames: 40,
            rest_frames: 15,
            jitter: 0.005,
        }
    }
}

pub struct SyntheticLandmarks {
    config: SyntheticConfig,
    frame_count: u64,
    start_ms: u64,
}

impl SyntheticLandmarks {
    pub fn new(config: SyntheticConfig, start_ms: u64) -> Self {
        Self {
            config,
            frame_count: 0,
            start_ms,
        }
    }

    pub fn frames_generated(&self) -> u64 {
        self.frame_count
    }

    pub fn next_frame(&mut self) -> Frame {
        let index = self.frame_count;
        self.frame_count += 1;

        let fps = u64::from(self.config.fps.max(1));
        let timestamp = self.start_ms + index * 1000 / fps;
        let cycle = (self.config.gesture_frames + self.config.rest_frames).max(1);
        let in_gesture = index % cycle < self.config.gesture_frames;

        let mut rng = rand::thread_rng();
        let jitter = self.config.jitter.abs();
        let mut noisy = |value: f32| {
            if jitter > 0.0 {
                value + rng.gen_range(-jitter..=jitter)
            } else {
                value
            }
        };

        let pose = (0..POSE_LANDMARKS)
            .map(|i| {
                let t = i as f32 / POSE_LANDMARKS as f32;
                Landmark::new(noisy(0.3 + 0.4 * t), noisy(0.2 + 0.6 * t), noisy(-0.1))
                    .with_visibility(0.95)
            })
            .collect();
        let mut frame = Frame::new(timestamp).with_pose(pose);

        if in_gesture {
            let hand = (0..HAND_LANDMARKS)
                .map(|i| {
                    let finger = (i / 4) as f32;
                    let joint = (i % 4) as f32;
                    Landmark::new(
                        noisy(0.55 + 0.02 * finger),
                        noisy(0.6 - 0.03 * joint),
                        noisy(-0.02 * joint),
                    )
                })
                .collect();
            frame = frame.with_right_hand(hand);
        }
        frame
    }
}
