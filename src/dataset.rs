//! Labeled gesture samples.
//!
//! `SampleRecorder` captures frames for a fixed time while the user performs
//! one sign; `GestureDataset` keeps the recorded samples in a JSON file of
//! the form `[{"label": "...", "sequence": [Frame, ...]}, ...]`, which is
//! what an external trainer consumes.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::features::{adapt_all, FeatureVector};
use crate::frame::Frame;

pub const DEFAULT_RECORD_DURATION: Duration = Duration::from_secs(2);
pub const DEFAULT_RECORD_MIN_FRAMES: usize = 10;

/// Label allowlist: 1..64 letters, digits, spaces, `_` or `-`.
pub fn validate_label(label: &str) -> Result<String> {
    static LABEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = LABEL_RE.get_or_init(|| regex::Regex::new(r"^[\p{L}\p{N} _-]{1,64}$").unwrap());

    let trimmed = label.trim();
    if !re.is_match(trimmed) {
        return Err(anyhow!(
            "label '{}' must be 1-64 letters, digits, spaces, '_' or '-'",
            trimmed
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    pub label: String,
    pub sequence: Vec<Frame>,
}

impl GestureSample {
    /// Per-frame feature vectors in the layout the classifier is trained on.
    pub fn features(&self) -> Vec<FeatureVector> {
        adapt_all(&self.sequence)
    }
}

// ----------------------------------------------------------------------------
// Recorder
// ----------------------------------------------------------------------------

/// Records one labeled sample over a fixed capture window.
pub struct SampleRecorder {
    duration: Duration,
    min_frames: usize,
    label: String,
    started: Instant,
    frames: Vec<Frame>,
}

impl SampleRecorder {
    pub fn start(label: &str, duration: Duration, min_frames: usize, now: Instant) -> Result<Self> {
        let label = validate_label(label)?;
        log::info!("recording '{}' for {} ms", label, duration.as_millis());
        Ok(Self {
            duration,
            min_frames,
            label,
            started: now,
            frames: Vec::new(),
        })
    }

    /// Record a frame. Returns false once the capture window has elapsed;
    /// such frames are not recorded.
    pub fn push(&mut self, frame: Frame, now: Instant) -> bool {
        if self.is_finished(now) {
            return false;
        }
        self.frames.push(frame);
        true
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Close the capture. Too few frames means the capture failed.
    pub fn finish(self) -> Result<GestureSample> {
        if self.frames.len() < self.min_frames {
            return Err(anyhow!(
                "capture of '{}' failed: {} frames recorded, at least {} required",
                self.label,
                self.frames.len(),
                self.min_frames
            ));
        }
        log::info!("captured '{}' ({} frames)", self.label, self.frames.len());
        Ok(GestureSample {
            label: self.label,
            sequence: self.frames,
        })
    }
}

// ----------------------------------------------------------------------------
// Dataset file
// ----------------------------------------------------------------------------

pub struct GestureDataset {
    path: PathBuf,
}

impl GestureDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All samples. A missing file is an empty dataset.
    pub fn load(&self) -> Result<Vec<GestureSample>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read dataset {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid dataset {}", self.path.display()))
    }

    /// Append a sample and return the new sample count.
    pub fn append(&self, sample: GestureSample) -> Result<usize> {
        let mut samples = self.load()?;
        samples.push(sample);
        self.write_all(&samples)?;
        Ok(samples.len())
    }

    /// Drop every sample with this label and return how many were removed.
    pub fn remove_label(&self, label: &str) -> Result<usize> {
        let mut samples = self.load()?;
        let before = samples.len();
        samples.retain(|sample| sample.label != label);
        let removed = before - samples.len();
        if removed > 0 {
            self.write_all(&samples)?;
        }
        Ok(removed)
    }

    /// Unique labels in first-seen order (the trainer's output index order).
    pub fn labels(&self) -> Result<Vec<String>> {
        let mut labels: Vec<String> = Vec::new();
        for sample in self.load()? {
            if !labels.contains(&sample.label) {
                labels.push(sample.label);
            }
        }
        Ok(labels)
    }

    fn write_all(&self, samples: &[GestureSample]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec(samples)?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
