use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{InferenceEngine, ModelHandle, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::dataset::{DEFAULT_RECORD_DURATION, DEFAULT_RECORD_MIN_FRAMES};
use crate::session::RecognitionSession;
use crate::stream::DEFAULT_CHANNEL_CAPACITY;
use crate::tensor::{LengthPolicy, TensorBuilder, TensorShape};
use crate::window::{
    WindowPolicy, WindowSettings, DEFAULT_DEBOUNCE, DEFAULT_MAX_FRAMES, DEFAULT_MIN_FRAMES,
    DEFAULT_STRIDE,
};

const DEFAULT_MODEL_DIR: &str = "model";
const DEFAULT_DATASET_PATH: &str = "data/gestures.json";

#[derive(Debug, Deserialize, Default)]
struct RecognizerConfigFile {
    model: Option<ModelConfigFile>,
    window: Option<WindowConfigFile>,
    stream: Option<StreamConfigFile>,
    recorder: Option<RecorderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    dir: Option<PathBuf>,
    threshold: Option<f32>,
    shape: Option<TensorShape>,
    length_policy: Option<LengthPolicy>,
}

#[derive(Debug, Deserialize, Default)]
struct WindowConfigFile {
    policy: Option<WindowPolicy>,
    stride: Option<usize>,
    debounce_ms: Option<u64>,
    min_frames: Option<usize>,
    max_frames: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamConfigFile {
    channel_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RecorderConfigFile {
    duration_ms: Option<u64>,
    min_frames: Option<usize>,
    dataset_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub model: ModelSettings,
    pub window: WindowSettings,
    pub channel_capacity: usize,
    pub recorder: RecorderSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub threshold: f32,
    pub shape: TensorShape,
    pub length_policy: LengthPolicy,
}

#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub duration: Duration,
    pub min_frames: usize,
    pub dataset_path: PathBuf,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self::from_file(RecognizerConfigFile::default())
    }
}

impl RecognizerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GESTURE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RecognizerConfigFile) -> Self {
        let model_file = file.model.unwrap_or_default();
        let window_file = file.window.unwrap_or_default();
        let recorder_file = file.recorder.unwrap_or_default();

        let model = ModelSettings {
            dir: model_file
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            threshold: model_file.threshold.unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            shape: model_file.shape.unwrap_or_default(),
            length_policy: model_file.length_policy.unwrap_or_default(),
        };
        let window = WindowSettings {
            policy: window_file.policy.unwrap_or_default(),
            stride: window_file.stride.unwrap_or(DEFAULT_STRIDE),
            debounce: window_file
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DEBOUNCE),
            min_frames: window_file.min_frames.unwrap_or(DEFAULT_MIN_FRAMES),
            max_frames: window_file.max_frames.unwrap_or(DEFAULT_MAX_FRAMES),
        };
        let channel_capacity = file
            .stream
            .and_then(|stream| stream.channel_capacity)
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let recorder = RecorderSettings {
            duration: recorder_file
                .duration_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RECORD_DURATION),
            min_frames: recorder_file.min_frames.unwrap_or(DEFAULT_RECORD_MIN_FRAMES),
            dataset_path: recorder_file
                .dataset_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
        };
        Self {
            model,
            window,
            channel_capacity,
            recorder,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("GESTURE_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model.dir = PathBuf::from(dir);
            }
        }
        if let Ok(threshold) = std::env::var("GESTURE_THRESHOLD") {
            self.model.threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("GESTURE_THRESHOLD must be a number in (0, 1]"))?;
        }
        if let Ok(shape) = std::env::var("GESTURE_TENSOR_SHAPE") {
            self.model.shape = shape.parse()?;
        }
        if let Ok(policy) = std::env::var("GESTURE_WINDOW_POLICY") {
            self.window.policy = policy.parse()?;
        }
        if let Ok(debounce) = std::env::var("GESTURE_DEBOUNCE_MS") {
            let millis: u64 = debounce.trim().parse().map_err(|_| {
                anyhow!("GESTURE_DEBOUNCE_MS must be an integer number of milliseconds")
            })?;
            self.window.debounce = Duration::from_millis(millis);
        }
        if let Ok(min_frames) = std::env::var("GESTURE_MIN_FRAMES") {
            self.window.min_frames = min_frames
                .trim()
                .parse()
                .map_err(|_| anyhow!("GESTURE_MIN_FRAMES must be an integer"))?;
        }
        if let Ok(capacity) = std::env::var("GESTURE_CHANNEL_CAPACITY") {
            self.channel_capacity = capacity
                .trim()
                .parse()
                .map_err(|_| anyhow!("GESTURE_CHANNEL_CAPACITY must be an integer"))?;
        }
        Ok(())
    }

    pub fn tensor_builder(&self) -> TensorBuilder {
        TensorBuilder::new(self.model.shape).with_policy(self.model.length_policy)
    }

    /// Session wired to a shared model slot with this configuration.
    pub fn session(&self, models: ModelHandle) -> RecognitionSession {
        let engine = InferenceEngine::new(models, self.model.threshold);
        RecognitionSession::new(engine, self.tensor_builder(), &self.window)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.model.threshold > 0.0 && self.model.threshold <= 1.0) {
            return Err(anyhow!(
                "confidence threshold must be in (0, 1], got {}",
                self.model.threshold
            ));
        }
        if self.window.stride == 0 {
            return Err(anyhow!("window stride must be at least 1"));
        }
        if self.window.debounce.is_zero() {
            return Err(anyhow!("debounce must be greater than zero"));
        }
        if self.window.min_frames == 0 {
            return Err(anyhow!("min_frames must be at least 1"));
        }
        if self.window.max_frames < self.window.min_frames {
            return Err(anyhow!(
                "max_frames ({}) must not be below min_frames ({})",
                self.window.max_frames,
                self.window.min_frames
            ));
        }
        if self.channel_capacity == 0 {
            return Err(anyhow!("channel capacity must be at least 1"));
        }
        if self.recorder.duration.is_zero() || self.recorder.min_frames == 0 {
            return Err(anyhow!("recorder duration and min_frames must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<RecognizerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: RecognizerConfigFile = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
