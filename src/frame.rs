//! Landmark frames as delivered by the external pose/hand tracker.
//!
//! A `Frame` is one detection cycle: four named landmark groups plus a
//! capture timestamp. Groups may be missing, shorter than their capacity or
//! longer than it; the feature adapter resolves all of those by zero
//! substitution and truncation, so nothing here validates shape.
//!
//! Tracker JSON is loose (`null` coordinates, absent groups), so the serde
//! impls accept `null` wherever a number or array is expected.

use serde::{Deserialize, Deserializer, Serialize};

/// Frames per gesture window.
pub const SEQUENCE_LENGTH: usize = 30;

/// Pose landmark capacity.
pub const POSE_LANDMARKS: usize = 33;

/// Face mesh landmark capacity. The face group is optional and often empty.
pub const FACE_LANDMARKS: usize = 468;

/// Landmark capacity of each hand.
pub const HAND_LANDMARKS: usize = 21;

/// Pose landmarks carry x, y, z and visibility.
pub const POSE_DIMS: usize = 4;

/// Face and hand landmarks carry x, y, z.
pub const POINT_DIMS: usize = 3;

/// Length of one adapted frame. Derived here and nowhere else.
pub const FEATURES_PER_FRAME: usize = POSE_LANDMARKS * POSE_DIMS
    + FACE_LANDMARKS * POINT_DIMS
    + HAND_LANDMARKS * POINT_DIMS * 2;

/// A single tracked keypoint in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(default, deserialize_with = "number_or_zero")]
    pub x: f32,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub y: f32,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub z: f32,
    /// Present on pose landmarks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// One detection cycle of landmarks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Capture time in milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "millis_or_zero")]
    pub timestamp: u64,
    #[serde(default, deserialize_with = "group_or_empty")]
    pub pose: Vec<Landmark>,
    #[serde(default, deserialize_with = "group_or_empty")]
    pub face: Vec<Landmark>,
    #[serde(default, deserialize_with = "group_or_empty")]
    pub left_hand: Vec<Landmark>,
    #[serde(default, deserialize_with = "group_or_empty")]
    pub right_hand: Vec<Landmark>,
}

impl Frame {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn with_pose(mut self, pose: Vec<Landmark>) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_face(mut self, face: Vec<Landmark>) -> Self {
        self.face = face;
        self
    }

    pub fn with_left_hand(mut self, hand: Vec<Landmark>) -> Self {
        self.left_hand = hand;
        self
    }

    pub fn with_right_hand(mut self, hand: Vec<Landmark>) -> Self {
        self.right_hand = hand;
        self
    }

    /// True when at least one hand group is non-empty.
    pub fn hands_present(&self) -> bool {
        !self.left_hand.is_empty() || !self.right_hand.is_empty()
    }

    /// Parse a single tracker frame from JSON.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Fractional milliseconds are truncated; negative or missing times become 0.
fn millis_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if millis.is_finite() && millis > 0.0 {
        Ok(millis as u64)
    } else {
        Ok(0)
    }
}

/// A `null` entry inside a group is a zero landmark, not a bad frame.
fn group_or_empty<'de, D>(deserializer: D) -> Result<Vec<Landmark>, D::Error>
where
    D: Deserializer<'de>,
{
    let group = Option::<Vec<Option<Landmark>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(group.into_iter().map(Option::unwrap_or_default).collect())
}
