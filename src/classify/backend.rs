use anyhow::Result;

use crate::tensor::{Tensor, TensorShape};

/// Gesture classifier trait.
///
/// A classifier is a black box: one tensor in, one probability vector out,
/// one entry per class. The vector is expected to come from a softmax-like
/// layer; nothing here renormalizes it.
///
/// Implementations are shared read-only between sessions and swapped whole
/// on reload, so `predict` takes `&self` and must not keep per-call state.
pub trait Classifier: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Tensor layout this classifier was built for.
    fn input_shape(&self) -> TensorShape;

    /// Length of the probability vector returned by `predict`.
    fn num_classes(&self) -> usize;

    /// Run one forward pass.
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Warm-up hook, run once before the classifier starts serving.
    fn warm_up(&self) -> Result<()> {
        self.predict(&Tensor::zeros(self.input_shape())).map(|_| ())
    }
}
