//! Tensor builder.
//!
//! Stacks a window of feature vectors into the fixed shape a classifier
//! expects. The builder's `TensorShape` is also the configuration every
//! installed classifier is checked against.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::frame::{FEATURES_PER_FRAME, SEQUENCE_LENGTH};

/// Input layout of a classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorShape {
    /// `[SEQUENCE_LENGTH, FEATURES_PER_FRAME]` for sequence-aware models.
    #[default]
    Sequence,
    /// `[SEQUENCE_LENGTH * FEATURES_PER_FRAME]` for flat (dense) models.
    Flat,
}

impl TensorShape {
    pub fn dims(self) -> Vec<usize> {
        match self {
            TensorShape::Sequence => vec![SEQUENCE_LENGTH, FEATURES_PER_FRAME],
            TensorShape::Flat => vec![SEQUENCE_LENGTH * FEATURES_PER_FRAME],
        }
    }

    pub fn element_count(self) -> usize {
        SEQUENCE_LENGTH * FEATURES_PER_FRAME
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorShape::Sequence => write!(f, "sequence{:?}", self.dims()),
            TensorShape::Flat => write!(f, "flat{:?}", self.dims()),
        }
    }
}

impl FromStr for TensorShape {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequence" => Ok(TensorShape::Sequence),
            "flat" => Ok(TensorShape::Flat),
            other => Err(anyhow!("unknown tensor shape '{}' (sequence|flat)", other)),
        }
    }
}

/// How windows that are not exactly `SEQUENCE_LENGTH` long are fitted.
///
/// `PadTruncate` is positional: a short gesture is padded with trailing zero
/// frames and a long one loses everything after frame `SEQUENCE_LENGTH`.
/// `Resample` stretches or squeezes the observed frames over the full window
/// by linear interpolation, which preserves the whole motion but changes the
/// time base the model sees. Models must be trained with the same policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    #[default]
    PadTruncate,
    Resample,
}

impl FromStr for LengthPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pad_truncate" | "pad" => Ok(LengthPolicy::PadTruncate),
            "resample" => Ok(LengthPolicy::Resample),
            other => Err(anyhow!(
                "unknown length policy '{}' (pad_truncate|resample)",
                other
            )),
        }
    }
}

/// Dense row-major `f32` tensor handed to classifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: TensorShape,
    data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: TensorShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.element_count()],
        }
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn dims(&self) -> Vec<usize> {
        self.shape.dims()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Feature values of time step `index`, regardless of layout.
    pub fn step(&self, index: usize) -> Option<&[f32]> {
        if index >= SEQUENCE_LENGTH {
            return None;
        }
        let start = index * FEATURES_PER_FRAME;
        self.data.get(start..start + FEATURES_PER_FRAME)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TensorBuilder {
    shape: TensorShape,
    policy: LengthPolicy,
}

impl TensorBuilder {
    pub fn new(shape: TensorShape) -> Self {
        Self {
            shape,
            policy: LengthPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LengthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn policy(&self) -> LengthPolicy {
        self.policy
    }

    /// Build a tensor from a window. An empty window yields all zeros.
    pub fn build(&self, window: &[FeatureVector]) -> Tensor {
        if window.is_empty() {
            return Tensor::zeros(self.shape);
        }
        let data = match self.policy {
            LengthPolicy::PadTruncate => pad_truncate(window),
            LengthPolicy::Resample => resample(window),
        };
        Tensor {
            shape: self.shape,
            data,
        }
    }
}

fn pad_truncate(window: &[FeatureVector]) -> Vec<f32> {
    let mut data = Vec::with_capacity(SEQUENCE_LENGTH * FEATURES_PER_FRAME);
    for vector in window.iter().take(SEQUENCE_LENGTH) {
        data.extend_from_slice(vector.as_slice());
    }
    data.resize(SEQUENCE_LENGTH * FEATURES_PER_FRAME, 0.0);
    data
}

fn resample(window: &[FeatureVector]) -> Vec<f32> {
    let mut data = Vec::with_capacity(SEQUENCE_LENGTH * FEATURES_PER_FRAME);
    let last = window.len() - 1;
    for step in 0..SEQUENCE_LENGTH {
        let position = if SEQUENCE_LENGTH > 1 {
            step as f32 * last as f32 / (SEQUENCE_LENGTH - 1) as f32
        } else {
            0.0
        };
        let lower = (position.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let weight = position - lower as f32;
        let a = window[lower].as_slice();
        let b = window[upper].as_slice();
        data.extend(a.iter().zip(b).map(|(a, b)| a + (b - a) * weight));
    }
    data
}
