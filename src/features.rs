//! Landmark frame adapter.
//!
//! Turns a loosely shaped `Frame` into a `FeatureVector` of exactly
//! `FEATURES_PER_FRAME` values laid out as pose, face, left hand, right hand.
//! The layout MUST match the one the classifier was trained on.
//!
//! Missing groups, short groups and missing fields become zeros. Long groups
//! are truncated to capacity. Coordinates are used as delivered by the
//! tracker; no further normalization happens here.

use crate::frame::{
    Frame, Landmark, FACE_LANDMARKS, FEATURES_PER_FRAME, HAND_LANDMARKS, POINT_DIMS,
    POSE_DIMS, POSE_LANDMARKS,
};

/// Offset of the first pose value in a feature vector.
pub const POSE_OFFSET: usize = 0;
/// Offset of the first face value in a feature vector.
pub const FACE_OFFSET: usize = POSE_OFFSET + POSE_LANDMARKS * POSE_DIMS;
/// Offset of the first left-hand value in a feature vector.
pub const LEFT_HAND_OFFSET: usize = FACE_OFFSET + FACE_LANDMARKS * POINT_DIMS;
/// Offset of the first right-hand value in a feature vector.
pub const RIGHT_HAND_OFFSET: usize = LEFT_HAND_OFFSET + HAND_LANDMARKS * POINT_DIMS;

/// Fixed-length numeric encoding of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self(vec![0.0; FEATURES_PER_FRAME])
    }

    /// Wrap raw values, padding with zeros or truncating to `FEATURES_PER_FRAME`.
    pub fn from_values(mut values: Vec<f32>) -> Self {
        values.resize(FEATURES_PER_FRAME, 0.0);
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Adapt one frame. Pure: the same frame always yields the same vector.
pub fn adapt(frame: &Frame) -> FeatureVector {
    let mut values = Vec::with_capacity(FEATURES_PER_FRAME);
    push_group(&mut values, &frame.pose, POSE_LANDMARKS, true);
    push_group(&mut values, &frame.face, FACE_LANDMARKS, false);
    push_group(&mut values, &frame.left_hand, HAND_LANDMARKS, false);
    push_group(&mut values, &frame.right_hand, HAND_LANDMARKS, false);

    if values.len() != FEATURES_PER_FRAME {
        log::debug!(
            "adapted frame has {} values, forcing to {}",
            values.len(),
            FEATURES_PER_FRAME
        );
    }
    FeatureVector::from_values(values)
}

/// Adapt a recorded sequence frame by frame.
pub fn adapt_all(frames: &[Frame]) -> Vec<FeatureVector> {
    frames.iter().map(adapt).collect()
}

fn push_group(out: &mut Vec<f32>, group: &[Landmark], capacity: usize, with_visibility: bool) {
    for index in 0..capacity {
        let landmark = group.get(index).copied().unwrap_or_default();
        out.push(finite_or_zero(landmark.x));
        out.push(finite_or_zero(landmark.y));
        out.push(finite_or_zero(landmark.z));
        if with_visibility {
            out.push(finite_or_zero(landmark.visibility.unwrap_or(0.0)));
        }
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
