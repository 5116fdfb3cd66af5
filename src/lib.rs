//! Gesture Kernel
//!
//! This crate recognizes sign-language gestures from a live stream of
//! body/hand landmark frames produced by an upstream pose tracker.
//!
//! # Architecture
//!
//! Every frame flows through the same pipeline:
//!
//! 1. **Adapt**: a tracker `Frame` becomes a fixed-length `FeatureVector`
//!    (missing landmark groups are zero-filled).
//! 2. **Window**: vectors are grouped into candidate gesture windows, either
//!    a trailing sliding window or hand-presence segmentation with debounce.
//! 3. **Build**: a window becomes a `Tensor` in the classifier's input shape.
//! 4. **Classify**: the currently installed model produces a probability
//!    vector; arg-max and the confidence threshold give a prediction.
//! 5. **Filter**: repeats of the same label are suppressed until the
//!    confidence drops below threshold or the label changes.
//!
//! # Module Structure
//!
//! - `frame`: Tracker frame model and landmark group constants
//! - `features`: Frame -> feature vector adapter
//! - `window`: Trailing and presence windowing policies
//! - `tensor`: Window -> model input tensor
//! - `classify`: Classifier backends, model loading and hot swap
//! - `filter`: Stability (repeat suppression) filter
//! - `session`: Per-stream recognition session
//! - `stream`: Channel-driven session runner
//! - `ingest`: Frame sources (JSON lines, stdin, synthetic)
//! - `dataset`: Sample recording and the labeled dataset file
//! - `config`: Recognizer configuration (file + env)

pub mod classify;
pub mod config;
pub mod dataset;
pub mod features;
pub mod filter;
pub mod frame;
pub mod ingest;
pub mod session;
pub mod stream;
pub mod tensor;
pub mod window;

pub use classify::{
    load_model_dir, Classifier, Inference, InferenceEngine, LoadedModel, ModelHandle, ModelInfo,
    PredictionResult, StubClassifier, DEFAULT_CONFIDENCE_THRESHOLD,
};
#[cfg(feature = "backend-tract")]
pub use classify::TractClassifier;
pub use config::{ModelSettings, RecognizerConfig, RecorderSettings};
pub use dataset::{validate_label, GestureDataset, GestureSample, SampleRecorder};
pub use features::{adapt, FeatureVector};
pub use filter::{FilterState, StabilityFilter};
pub use frame::{
    Frame, Landmark, FACE_LANDMARKS, FEATURES_PER_FRAME, HAND_LANDMARKS, POSE_LANDMARKS,
    SEQUENCE_LENGTH,
};
pub use ingest::{FrameSource, SourceConfig, SourceStats, SyntheticConfig};
pub use session::{Emission, RecognitionSession, SessionStats};
pub use stream::{FrameSender, RunnerHandle, SessionRunner};
pub use tensor::{LengthPolicy, Tensor, TensorBuilder, TensorShape};
pub use window::{WindowPolicy, WindowSettings, Windower};
