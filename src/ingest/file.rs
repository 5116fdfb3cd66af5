//! Landmark frame source.
//!
//! `FrameSource` reads tracker frames from:
//! - a local JSON-lines file (one `Frame` object per line)
//! - standard input (`-`)
//! - a synthetic generator (`stub://<name>`) for demos and tests
//!
//! Malformed lines are logged and skipped; a single bad frame never ends
//! the stream. The source MUST NOT fetch remote URLs.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use super::synthetic::{SyntheticConfig, SyntheticLandmarks};
use crate::frame::Frame;

/// Configuration for a frame source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Local file path, `-` for stdin, or `stub://<name>`.
    pub uri: String,
    /// Stop after this many frames (required for `stub://`).
    pub max_frames: Option<u64>,
    /// Synthetic generator parameters (`stub://` only).
    pub synthetic: SyntheticConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "stub://demo".to_string(),
            max_frames: Some(300),
            synthetic: SyntheticConfig::default(),
        }
    }
}

pub struct FrameSource {
    backend: SourceBackend,
    uri: String,
    max_frames: Option<u64>,
    frames_read: u64,
    frames_skipped: u64,
}

enum SourceBackend {
    Synthetic(SyntheticLandmarks),
    Lines {
        reader: Box<dyn BufRead + Send>,
        line_no: u64,
    },
}

impl FrameSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        if !is_local_source(&config.uri) {
            return Err(anyhow!(
                "frame sources only support local paths, '-' or stub:// (got '{}')",
                config.uri
            ));
        }
        let backend = if config.uri.starts_with("stub://") {
            if config.max_frames.is_none() {
                return Err(anyhow!("stub:// sources require a frame limit"));
            }
            let start_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)?
                .as_millis() as u64;
            SourceBackend::Synthetic(SyntheticLandmarks::new(config.synthetic.clone(), start_ms))
        } else if config.uri == "-" {
            SourceBackend::Lines {
                reader: Box::new(BufReader::new(io::stdin())),
                line_no: 0,
            }
        } else {
            let file = File::open(&config.uri)
                .with_context(|| format!("failed to open frame file {}", config.uri))?;
            SourceBackend::Lines {
                reader: Box::new(BufReader::new(file)),
                line_no: 0,
            }
        };
        log::info!("frame source opened: {}", config.uri);
        Ok(Self {
            backend,
            uri: config.uri,
            max_frames: config.max_frames,
            frames_read: 0,
            frames_skipped: 0,
        })
    }

    /// Next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.max_frames.is_some_and(|max| self.frames_read >= max) {
            return Ok(None);
        }
        let frame = match &mut self.backend {
            SourceBackend::Synthetic(generator) => Some(generator.next_frame()),
            SourceBackend::Lines { reader, line_no } => {
                let mut skipped = 0;
                let frame = next_line_frame(reader.as_mut(), line_no, &mut skipped)?;
                self.frames_skipped += skipped;
                frame
            }
        };
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            frames_skipped: self.frames_skipped,
            uri: self.uri.clone(),
        }
    }
}

impl Iterator for FrameSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub frames_skipped: u64,
    pub uri: String,
}

fn next_line_frame(
    reader: &mut dyn BufRead,
    line_no: &mut u64,
    skipped: &mut u64,
) -> Result<Option<Frame>> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).context("failed to read frame line")?;
        if read == 0 {
            return Ok(None);
        }
        *line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match Frame::from_json(trimmed) {
            Ok(frame) => return Ok(Some(frame)),
            Err(e) => {
                *skipped += 1;
                log::warn!("skipping malformed frame on line {}: {}", line_no, e);
            }
        }
    }
}

fn is_local_source(uri: &str) -> bool {
    if uri.trim().is_empty() {
        return false;
    }
    if uri == "-" || uri.starts_with("stub://") {
        return true;
    }
    !uri.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_json_lines_and_skips_garbage() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, r#"{{"timestamp": 1, "rightHand": [{{"x": 0.5, "y": 0.5, "z": 0}}]}}"#)?;
        writeln!(file)?;
        writeln!(file, "not json")?;
        writeln!(file, r#"{{"timestamp": 2}}"#)?;

        let mut source = FrameSource::open(SourceConfig {
            uri: file.path().display().to_string(),
            max_frames: None,
            ..SourceConfig::default()
        })?;
        let frames: Vec<Frame> = source.by_ref().collect::<Result<_>>()?;

        assert_eq!(frames.len(), 2);
        assert!(frames[0].hands_present());
        assert_eq!(frames[1].timestamp, 2);
        let stats = source.stats();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(stats.frames_skipped, 1);
        Ok(())
    }

    #[test]
    fn stub_source_honours_frame_limit() -> Result<()> {
        let mut source = FrameSource::open(SourceConfig {
            uri: "stub://test".to_string(),
            max_frames: Some(7),
            ..SourceConfig::default()
        })?;
        let mut count = 0;
        while source.next_frame()?.is_some() {
            count += 1;
        }
        assert_eq!(count, 7);
        Ok(())
    }

    #[test]
    fn remote_and_unbounded_stub_sources_are_rejected() {
        assert!(FrameSource::open(SourceConfig {
            uri: "http://camera/frames".to_string(),
            ..SourceConfig::default()
        })
        .is_err());
        assert!(FrameSource::open(SourceConfig {
            uri: "stub://forever".to_string(),
            max_frames: None,
            ..SourceConfig::default()
        })
        .is_err());
    }
}
