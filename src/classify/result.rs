use serde::{Deserialize, Serialize};

/// Top class of one inference call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    /// Probability of `label`, in [0, 1].
    pub confidence: f32,
}

impl PredictionResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Outcome of `InferenceEngine::predict`.
#[derive(Clone, Debug, PartialEq)]
pub enum Inference {
    /// Top class at or above the confidence threshold.
    Label(PredictionResult),
    /// Top class below the threshold: no prediction. The best guess is kept
    /// so the stability filter can observe the confidence drop.
    Uncertain(PredictionResult),
    /// No classifier loaded, reload in progress, or the forward pass failed.
    Unavailable,
}

impl Inference {
    pub fn label(&self) -> Option<&PredictionResult> {
        match self {
            Inference::Label(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Inference::Unavailable)
    }
}
