mod backend;
mod backends;
mod engine;
mod handle;
mod model;
mod result;

pub use backend::Classifier;
pub use backends::StubClassifier;
#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;
pub use engine::{InferenceEngine, DEFAULT_CONFIDENCE_THRESHOLD};
pub use handle::ModelHandle;
pub use model::{load_model_dir, LoadedModel, ModelInfo, MODEL_FILE_NAME, MODEL_INFO_FILE_NAME};
pub use result::{Inference, PredictionResult};
