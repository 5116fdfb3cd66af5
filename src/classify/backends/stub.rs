use anyhow::{anyhow, Result};

use crate::classify::backend::Classifier;
use crate::tensor::{Tensor, TensorShape};

/// Stub classifier for testing. Returns the same probability vector for every
/// input of the right shape.
#[derive(Clone, Debug)]
pub struct StubClassifier {
    probabilities: Vec<f32>,
    shape: TensorShape,
}

impl StubClassifier {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            shape: TensorShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: TensorShape) -> Self {
        self.shape = shape;
        self
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_shape(&self) -> TensorShape {
        self.shape
    }

    fn num_classes(&self) -> usize {
        self.probabilities.len()
    }

    fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        if input.shape() != self.shape {
            return Err(anyhow!(
                "stub classifier expects {} but received {}",
                self.shape,
                input.shape()
            ));
        }
        Ok(self.probabilities.clone())
    }
}
