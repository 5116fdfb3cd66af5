use anyhow::{anyhow, Result};

use crate::tensor::Tensor;

use super::handle::ModelHandle;
use super::model::LoadedModel;
use super::result::{Inference, PredictionResult};

/// Default minimum probability for accepting the top class.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Runs the serving classifier and applies the confidence gate.
///
/// The engine holds no per-call state; clones share the same `ModelHandle`.
#[derive(Clone)]
pub struct InferenceEngine {
    models: ModelHandle,
    threshold: f32,
}

impl InferenceEngine {
    pub fn new(models: ModelHandle, threshold: f32) -> Self {
        Self { models, threshold }
    }

    pub fn models(&self) -> &ModelHandle {
        &self.models
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify one tensor.
    ///
    /// Never fails: a missing model or a failed forward pass is reported as
    /// `Inference::Unavailable` so the frame loop keeps running.
    pub fn predict(&self, input: &Tensor) -> Inference {
        let Some(model) = self.models.snapshot() else {
            return Inference::Unavailable;
        };
        match run(&model, input) {
            Ok(result) if result.confidence >= self.threshold => Inference::Label(result),
            Ok(result) => Inference::Uncertain(result),
            Err(e) => {
                log::warn!("inference skipped (model {}): {:#}", model.fingerprint(), e);
                Inference::Unavailable
            }
        }
    }
}

fn run(model: &LoadedModel, input: &Tensor) -> Result<PredictionResult> {
    if input.shape() != model.input_shape() {
        return Err(anyhow!(
            "tensor layout {} does not match model layout {}",
            input.shape(),
            model.input_shape()
        ));
    }
    let probabilities = model.classifier().predict(input)?;
    if probabilities.len() != model.labels().len() {
        return Err(anyhow!(
            "classifier returned {} probabilities for {} labels",
            probabilities.len(),
            model.labels().len()
        ));
    }
    let (index, confidence) =
        arg_max(&probabilities).ok_or_else(|| anyhow!("classifier returned no usable scores"))?;
    let label = model
        .label(index)
        .ok_or_else(|| anyhow!("no label for class {}", index))?;
    Ok(PredictionResult::new(label, confidence))
}

/// Index and value of the largest score. Ties go to the first index; NaN is skipped.
pub(crate) fn arg_max(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StubClassifier;
    use crate::tensor::TensorShape;

    fn engine_with(probs: Vec<f32>, labels: &[&str]) -> InferenceEngine {
        let handle = ModelHandle::new();
        handle
            .install(
                LoadedModel::new(
                    Box::new(StubClassifier::new(probs)),
                    labels.iter().map(|l| l.to_string()).collect(),
                ),
                TensorShape::Sequence,
            )
            .expect("install stub model");
        InferenceEngine::new(handle, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    #[test]
    fn arg_max_prefers_first_of_equal_scores() {
        assert_eq!(arg_max(&[0.4, 0.4, 0.2]), Some((0, 0.4)));
        assert_eq!(arg_max(&[f32::NAN, 0.1, 0.3]), Some((2, 0.3)));
        assert_eq!(arg_max(&[]), None);
    }

    #[test]
    fn confident_top_class_is_a_label() {
        let engine = engine_with(vec![0.1, 0.85, 0.05], &["a", "b", "c"]);
        let inference = engine.predict(&Tensor::zeros(TensorShape::Sequence));
        assert_eq!(inference, Inference::Label(PredictionResult::new("b", 0.85)));
    }

    #[test]
    fn low_confidence_is_no_prediction() {
        let engine = engine_with(vec![0.65, 0.35], &["hola", "adios"]);
        let inference = engine.predict(&Tensor::zeros(TensorShape::Sequence));
        assert_eq!(
            inference,
            Inference::Uncertain(PredictionResult::new("hola", 0.65))
        );
        assert!(inference.label().is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let engine = engine_with(vec![0.7, 0.3], &["si", "no"]);
        let inference = engine.predict(&Tensor::zeros(TensorShape::Sequence));
        assert_eq!(inference.label().map(|r| r.label.as_str()), Some("si"));
    }

    #[test]
    fn missing_model_is_unavailable() {
        let engine = InferenceEngine::new(ModelHandle::new(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(engine
            .predict(&Tensor::zeros(TensorShape::Sequence))
            .is_unavailable());
    }

    #[test]
    fn wrong_tensor_layout_is_unavailable() {
        let engine = engine_with(vec![1.0], &["a"]);
        assert!(engine.predict(&Tensor::zeros(TensorShape::Flat)).is_unavailable());
    }
}
