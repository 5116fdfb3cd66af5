//! Sequence windowing.
//!
//! The windower is the scheduling point of the pipeline: it decides when a
//! live stream holds enough evidence to run inference. Two policies:
//!
//! - `TrailingWindow`: always the latest `SEQUENCE_LENGTH` frames, ready on
//!   every `stride`-th frame once full.
//! - `PresenceSegmenter`: accumulate while a hand is visible; after the hands
//!   disappear for longer than the debounce delay, flush the accumulated
//!   frames as one gesture candidate.
//!
//! Time is passed in explicitly (`now`), so the debounce timer is a deadline
//! the caller polls rather than a callback. Per-frame work is O(1).

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::frame::SEQUENCE_LENGTH;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_MIN_FRAMES: usize = 30;
pub const DEFAULT_MAX_FRAMES: usize = 300;
pub const DEFAULT_STRIDE: usize = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    #[default]
    Trailing,
    Presence,
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowPolicy::Trailing => f.write_str("trailing"),
            WindowPolicy::Presence => f.write_str("presence"),
        }
    }
}

impl FromStr for WindowPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trailing" => Ok(WindowPolicy::Trailing),
            "presence" => Ok(WindowPolicy::Presence),
            other => Err(anyhow!(
                "unknown window policy '{}' (trailing|presence)",
                other
            )),
        }
    }
}

/// Windowing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSettings {
    pub policy: WindowPolicy,
    /// Trailing policy: run inference every `stride` frames once full.
    pub stride: usize,
    /// Presence policy: how long hands may vanish before the gesture ends.
    pub debounce: Duration,
    /// Presence policy: shorter candidates are discarded as tracking noise.
    pub min_frames: usize,
    /// Presence policy: accumulator cap; later frames are dropped.
    pub max_frames: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            policy: WindowPolicy::default(),
            stride: DEFAULT_STRIDE,
            debounce: DEFAULT_DEBOUNCE,
            min_frames: DEFAULT_MIN_FRAMES,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

// ----------------------------------------------------------------------------
// Trailing buffer
// ----------------------------------------------------------------------------

/// FIFO of the most recent `SEQUENCE_LENGTH` feature vectors.
pub struct TrailingWindow {
    frames: VecDeque<FeatureVector>,
    stride: usize,
    until_next: usize,
}

impl TrailingWindow {
    pub fn new(stride: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(SEQUENCE_LENGTH + 1),
            stride: stride.max(1),
            until_next: 0,
        }
    }

    /// Push a frame; returns a window when inference is due.
    pub fn push(&mut self, vector: FeatureVector) -> Option<Vec<FeatureVector>> {
        self.frames.push_back(vector);
        while self.frames.len() > SEQUENCE_LENGTH {
            self.frames.pop_front();
        }
        if self.frames.len() < SEQUENCE_LENGTH {
            return None;
        }
        if self.until_next > 0 {
            self.until_next -= 1;
            return None;
        }
        self.until_next = self.stride - 1;
        Some(self.frames.iter().cloned().collect())
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == SEQUENCE_LENGTH
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.until_next = 0;
    }
}

// ----------------------------------------------------------------------------
// Presence-triggered segmentation
// ----------------------------------------------------------------------------

/// Accumulates frames while hands are visible and cuts gestures at hand loss.
pub struct PresenceSegmenter {
    accumulator: Vec<FeatureVector>,
    hands_present: bool,
    deadline: Option<Instant>,
    debounce: Duration,
    min_frames: usize,
    max_frames: usize,
    dropped: u64,
}

impl PresenceSegmenter {
    pub fn new(debounce: Duration, min_frames: usize, max_frames: usize) -> Self {
        Self {
            accumulator: Vec::new(),
            hands_present: false,
            deadline: None,
            debounce,
            min_frames,
            max_frames: max_frames.max(min_frames),
            dropped: 0,
        }
    }

    /// Push a frame observed at `now`. Returns a completed gesture candidate if
    /// a pending debounce deadline expired before this frame.
    pub fn push(
        &mut self,
        vector: FeatureVector,
        hands_present: bool,
        now: Instant,
    ) -> Option<Vec<FeatureVector>> {
        let flushed = self.poll(now);

        if hands_present {
            if self.deadline.take().is_some() {
                log::debug!(
                    "hands back before debounce expired, continuing gesture ({} frames)",
                    self.accumulator.len()
                );
            }
            if self.accumulator.len() < self.max_frames {
                self.accumulator.push(vector);
            } else {
                self.dropped += 1;
                if self.dropped == 1 {
                    log::debug!(
                        "gesture accumulator full at {} frames, dropping further frames",
                        self.max_frames
                    );
                }
            }
        } else if self.hands_present {
            self.deadline = Some(now + self.debounce);
        }
        self.hands_present = hands_present;

        flushed
    }

    /// Fire the debounce timer if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<FeatureVector>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.flush()
            }
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.accumulator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulator.is_empty()
    }

    /// Clear the accumulator and cancel any pending deadline.
    pub fn clear(&mut self) {
        self.accumulator.clear();
        self.hands_present = false;
        self.deadline = None;
        self.dropped = 0;
    }

    fn flush(&mut self) -> Option<Vec<FeatureVector>> {
        let frames = std::mem::take(&mut self.accumulator);
        self.dropped = 0;
        if frames.len() >= self.min_frames {
            log::debug!("gesture candidate complete ({} frames)", frames.len());
            Some(frames)
        } else {
            if !frames.is_empty() {
                log::debug!(
                    "discarding {} frame candidate (minimum {})",
                    frames.len(),
                    self.min_frames
                );
            }
            None
        }
    }
}

// ----------------------------------------------------------------------------
// Policy dispatch
// ----------------------------------------------------------------------------

pub enum Windower {
    Trailing(TrailingWindow),
    Presence(PresenceSegmenter),
}

impl Windower {
    pub fn new(settings: &WindowSettings) -> Self {
        match settings.policy {
            WindowPolicy::Trailing => Windower::Trailing(TrailingWindow::new(settings.stride)),
            WindowPolicy::Presence => Windower::Presence(PresenceSegmenter::new(
                settings.debounce,
                settings.min_frames,
                settings.max_frames,
            )),
        }
    }

    pub fn policy(&self) -> WindowPolicy {
        match self {
            Windower::Trailing(_) => WindowPolicy::Trailing,
            Windower::Presence(_) => WindowPolicy::Presence,
        }
    }

    pub fn push(
        &mut self,
        vector: FeatureVector,
        hands_present: bool,
        now: Instant,
    ) -> Option<Vec<FeatureVector>> {
        match self {
            Windower::Trailing(window) => window.push(vector),
            Windower::Presence(segmenter) => segmenter.push(vector, hands_present, now),
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<Vec<FeatureVector>> {
        match self {
            Windower::Trailing(_) => None,
            Windower::Presence(segmenter) => segmenter.poll(now),
        }
    }

    /// When `poll` should next be called, if a timer is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self {
            Windower::Trailing(_) => None,
            Windower::Presence(segmenter) => segmenter.deadline(),
        }
    }

    /// Frames currently buffered.
    pub fn buffered(&self) -> usize {
        match self {
            Windower::Trailing(window) => window.len(),
            Windower::Presence(segmenter) => segmenter.len(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Windower::Trailing(window) => window.clear(),
            Windower::Presence(segmenter) => segmenter.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_INTERVAL: Duration = Duration::from_millis(33);

    fn vector(tag: f32) -> FeatureVector {
        FeatureVector::from_values(vec![tag])
    }

    #[test]
    fn trailing_window_fires_once_full_and_keeps_latest() {
        let mut window = TrailingWindow::new(1);
        for i in 0..(SEQUENCE_LENGTH - 1) {
            assert!(window.push(vector(i as f32)).is_none());
        }
        let first = window.push(vector(29.0)).expect("full window");
        assert_eq!(first.len(), SEQUENCE_LENGTH);
        assert_eq!(first[0].as_slice()[0], 0.0);

        let second = window.push(vector(30.0)).expect("every frame once full");
        assert_eq!(second.len(), SEQUENCE_LENGTH);
        assert_eq!(second[0].as_slice()[0], 1.0);
        assert_eq!(second[SEQUENCE_LENGTH - 1].as_slice()[0], 30.0);
        assert_eq!(window.len(), SEQUENCE_LENGTH);
    }

    #[test]
    fn trailing_window_honours_stride() {
        let mut window = TrailingWindow::new(5);
        let fired: Vec<usize> = (0..45)
            .filter(|i| window.push(vector(*i as f32)).is_some())
            .collect();
        assert_eq!(fired, vec![29, 34, 39, 44]);
    }

    #[test]
    fn presence_flushes_only_hand_frames_after_debounce() {
        let mut segmenter =
            PresenceSegmenter::new(DEFAULT_DEBOUNCE, DEFAULT_MIN_FRAMES, DEFAULT_MAX_FRAMES);
        let start = Instant::now();
        let mut now = start;
        let mut flushes = Vec::new();

        for i in 0..40 {
            if let Some(frames) = segmenter.push(vector(i as f32), true, now) {
                flushes.push(frames);
            }
            now += FRAME_INTERVAL;
        }
        for _ in 0..5 {
            if let Some(frames) = segmenter.push(vector(-1.0), false, now) {
                flushes.push(frames);
            }
            now += FRAME_INTERVAL;
        }
        if let Some(frames) = segmenter.poll(now + DEFAULT_DEBOUNCE) {
            flushes.push(frames);
        }

        assert_eq!(flushes.len(), 1);
        assert_eq!(flushes[0].len(), 40);
        assert!(flushes[0].iter().all(|v| v.as_slice()[0] >= 0.0));
        assert!(segmenter.is_empty());
        assert!(segmenter.deadline().is_none());
    }

    #[test]
    fn presence_dropout_within_debounce_keeps_accumulating() {
        let mut segmenter =
            PresenceSegmenter::new(DEFAULT_DEBOUNCE, DEFAULT_MIN_FRAMES, DEFAULT_MAX_FRAMES);
        let mut now = Instant::now();

        for i in 0..40 {
            assert!(segmenter.push(vector(i as f32), true, now).is_none());
            now += FRAME_INTERVAL;
        }
        for _ in 0..2 {
            assert!(segmenter.push(vector(0.0), false, now).is_none());
            now += FRAME_INTERVAL;
        }
        assert!(segmenter.deadline().is_some());

        for i in 0..10 {
            assert!(segmenter.push(vector(i as f32), true, now).is_none());
            now += FRAME_INTERVAL;
        }
        assert!(segmenter.deadline().is_none());
        assert!(segmenter.poll(now + Duration::from_secs(5)).is_none());
        assert_eq!(segmenter.len(), 50);
    }

    #[test]
    fn presence_discards_short_candidates() {
        let mut segmenter =
            PresenceSegmenter::new(DEFAULT_DEBOUNCE, DEFAULT_MIN_FRAMES, DEFAULT_MAX_FRAMES);
        let now = Instant::now();
        for _ in 0..12 {
            segmenter.push(vector(1.0), true, now);
        }
        segmenter.push(vector(0.0), false, now);
        assert!(segmenter.poll(now + DEFAULT_DEBOUNCE).is_none());
        assert!(segmenter.is_empty());
    }

    #[test]
    fn presence_caps_accumulator() {
        let mut segmenter = PresenceSegmenter::new(DEFAULT_DEBOUNCE, 2, 5);
        let now = Instant::now();
        for i in 0..9 {
            segmenter.push(vector(i as f32), true, now);
        }
        assert_eq!(segmenter.len(), 5);
        segmenter.push(vector(0.0), false, now);
        let frames = segmenter.poll(now + DEFAULT_DEBOUNCE).expect("flush");
        assert_eq!(frames.last().map(|v| v.as_slice()[0]), Some(4.0));
    }

    #[test]
    fn reset_cancels_pending_deadline() {
        let mut windower = Windower::new(&WindowSettings {
            policy: WindowPolicy::Presence,
            min_frames: 1,
            ..WindowSettings::default()
        });
        let now = Instant::now();
        windower.push(vector(1.0), true, now);
        windower.push(vector(0.0), false, now);
        assert!(windower.next_deadline().is_some());

        windower.reset();
        assert!(windower.next_deadline().is_none());
        assert_eq!(windower.buffered(), 0);
        assert!(windower.poll(now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn policy_parses_from_config_strings() -> Result<()> {
        assert_eq!("presence".parse::<WindowPolicy>()?, WindowPolicy::Presence);
        assert_eq!(" Trailing ".parse::<WindowPolicy>()?, WindowPolicy::Trailing);
        assert!("sliding".parse::<WindowPolicy>().is_err());
        Ok(())
    }
}
