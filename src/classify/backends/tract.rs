#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::Classifier;
use crate::tensor::{Tensor, TensorShape};

/// Tract-based classifier for ONNX gesture models.
///
/// Loads a local model file once and runs it on `[1, SEQ, FEAT]` or
/// `[1, SEQ * FEAT]` inputs depending on the configured layout. The first
/// model output is read as the class probability vector.
pub struct TractClassifier {
    model: TypedRunnableModel<TypedModel>,
    shape: TensorShape,
    num_classes: usize,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        shape: TensorShape,
        num_classes: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let mut dims: TVec<usize> = tvec!(1);
        dims.extend(shape.dims());
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), dims))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            shape,
            num_classes,
        })
    }

    fn build_input(&self, input: &Tensor) -> Result<tract_onnx::prelude::Tensor> {
        if input.shape() != self.shape {
            return Err(anyhow!(
                "input layout {} does not match model layout {}",
                input.shape(),
                self.shape
            ));
        }
        let mut dims = vec![1];
        dims.extend(self.shape.dims());
        tract_onnx::prelude::Tensor::from_shape(&dims, input.data())
            .context("failed to build model input tensor")
    }

    fn extract_scores(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Ok(scores.iter().copied().collect())
    }
}

impl Classifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_shape(&self) -> TensorShape {
        self.shape
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        let input = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_scores(outputs)
    }

    fn warm_up(&self) -> Result<()> {
        let scores = self.predict(&Tensor::zeros(self.shape))?;
        if scores.len() != self.num_classes {
            return Err(anyhow!(
                "model outputs {} scores but {} labels were provided",
                scores.len(),
                self.num_classes
            ));
        }
        Ok(())
    }
}
