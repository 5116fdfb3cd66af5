use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::tensor::TensorShape;

use super::backend::Classifier;

/// Model file expected inside a model directory.
pub const MODEL_FILE_NAME: &str = "model.onnx";

/// Label list written next to the model by the trainer.
pub const MODEL_INFO_FILE_NAME: &str = "model_info.json";

/// Contents of `model_info.json`: output index -> label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub labels: Vec<String>,
}

impl ModelInfo {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model info {}", path.display()))?;
        let info: ModelInfo = serde_json::from_str(&raw)
            .with_context(|| format!("invalid model info {}", path.display()))?;
        if info.labels.is_empty() {
            return Err(anyhow!("model info {} lists no labels", path.display()));
        }
        Ok(info)
    }
}

/// A classifier paired with its label list. Immutable once built.
pub struct LoadedModel {
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
    fingerprint: String,
}

impl LoadedModel {
    pub fn new(classifier: Box<dyn Classifier>, labels: Vec<String>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(classifier.name().as_bytes());
        hasher.update(classifier.input_shape().to_string().as_bytes());
        for label in &labels {
            hasher.update((label.len() as u64).to_le_bytes());
            hasher.update(label.as_bytes());
        }
        let digest: [u8; 32] = hasher.finalize().into();
        Self {
            classifier,
            labels,
            fingerprint: hex::encode(&digest[..8]),
        }
    }

    /// Override the fingerprint, e.g. with a digest of the model file.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn input_shape(&self) -> TensorShape {
        self.classifier.input_shape()
    }

    /// Short identifier used in logs to tell model generations apart.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Check the model against the tensor layout the pipeline produces.
    pub fn validate(&self, expected: TensorShape) -> Result<()> {
        if self.labels.is_empty() {
            return Err(anyhow!("model {} has no labels", self.fingerprint));
        }
        if self.labels.len() != self.classifier.num_classes() {
            return Err(anyhow!(
                "model {} declares {} classes but {} labels",
                self.fingerprint,
                self.classifier.num_classes(),
                self.labels.len()
            ));
        }
        if self.input_shape() != expected {
            return Err(anyhow!(
                "model {} expects input {} but the tensor builder produces {}",
                self.fingerprint,
                self.input_shape(),
                expected
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("backend", &self.classifier.name())
            .field("input_shape", &self.input_shape())
            .field("labels", &self.labels)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Load `model.onnx` and `model_info.json` from a model directory.
///
/// The returned model is not yet validated; `ModelHandle::install` does that.
pub fn load_model_dir(dir: &Path, shape: TensorShape) -> Result<LoadedModel> {
    let info = ModelInfo::read(&dir.join(MODEL_INFO_FILE_NAME))?;
    let model_path = dir.join(MODEL_FILE_NAME);
    if !model_path.is_file() {
        return Err(anyhow!("model file {} not found", model_path.display()));
    }

    #[cfg(feature = "backend-tract")]
    {
        let bytes = std::fs::read(&model_path)
            .with_context(|| format!("failed to read {}", model_path.display()))?;
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        let classifier =
            super::backends::TractClassifier::new(&model_path, shape, info.labels.len())?;
        Ok(LoadedModel::new(Box::new(classifier), info.labels)
            .with_fingerprint(hex::encode(&digest[..8])))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        let _ = (shape, info);
        Err(anyhow!(
            "loading {} requires the backend-tract feature",
            model_path.display()
        ))
    }
}
