//! Per-stream recognition session.
//!
//! A `RecognitionSession` owns the mutable state of one live stream (the
//! windower buffer, pending debounce deadline and stability filter) and
//! wires the pipeline: adapt -> window -> build -> predict -> filter.
//! Sessions never share state; the classifier is shared read-only through
//! the engine's `ModelHandle`.

use std::time::Instant;

use serde::Serialize;

use crate::classify::{Inference, InferenceEngine, PredictionResult};
use crate::features::{adapt, FeatureVector};
use crate::filter::StabilityFilter;
use crate::frame::Frame;
use crate::tensor::TensorBuilder;
use crate::window::{WindowSettings, Windower};

/// What a session hands to the UI/session layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Emission {
    /// A newly recognized gesture.
    Label(PredictionResult),
    /// No classifier is serving. Reported once per outage.
    Unavailable,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub windows: u64,
    pub inferences: u64,
    pub labels: u64,
    pub unavailable: u64,
}

/// Mutable recognition state of one session.
pub struct RecognitionState {
    windower: Windower,
    filter: StabilityFilter,
    unavailable_reported: bool,
    active: bool,
}

impl RecognitionState {
    pub fn new(window: &WindowSettings, threshold: f32) -> Self {
        Self {
            windower: Windower::new(window),
            filter: StabilityFilter::new(threshold),
            unavailable_reported: false,
            active: false,
        }
    }

    pub fn reset(&mut self) {
        self.windower.reset();
        self.filter.reset();
        self.unavailable_reported = false;
    }

    pub fn windower(&self) -> &Windower {
        &self.windower
    }

    pub fn filter(&self) -> &StabilityFilter {
        &self.filter
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

pub struct RecognitionSession {
    state: RecognitionState,
    builder: TensorBuilder,
    engine: InferenceEngine,
    stats: SessionStats,
}

impl RecognitionSession {
    pub fn new(engine: InferenceEngine, builder: TensorBuilder, window: &WindowSettings) -> Self {
        Self {
            state: RecognitionState::new(window, engine.threshold()),
            builder,
            engine,
            stats: SessionStats::default(),
        }
    }

    /// Begin accepting frames from a fresh state.
    pub fn start(&mut self) {
        self.state.reset();
        self.state.active = true;
        self.stats = SessionStats::default();
        log::info!(
            "recognition session started ({} windowing)",
            self.state.windower.policy()
        );
    }

    /// Stop accepting frames. Buffers are cleared and any pending debounce
    /// deadline is cancelled, so nothing can be emitted after this returns.
    pub fn stop(&mut self) {
        if self.state.active {
            log::info!(
                "recognition session stopped: frames={} windows={} labels={} unavailable={}",
                self.stats.frames,
                self.stats.windows,
                self.stats.labels,
                self.stats.unavailable
            );
        }
        self.state.active = false;
        self.state.reset();
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &RecognitionState {
        &self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Feed one tracker frame observed at `now`.
    pub fn on_frame(&mut self, frame: &Frame, now: Instant) -> Option<Emission> {
        if !self.state.active {
            return None;
        }
        self.stats.frames += 1;
        let vector = adapt(frame);
        let window = self
            .state
            .windower
            .push(vector, frame.hands_present(), now)?;
        self.infer(&window)
    }

    /// Fire an expired debounce deadline, if any.
    pub fn poll(&mut self, now: Instant) -> Option<Emission> {
        if !self.state.active {
            return None;
        }
        let window = self.state.windower.poll(now)?;
        self.infer(&window)
    }

    /// When `poll` should next run.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state.active {
            self.state.windower.next_deadline()
        } else {
            None
        }
    }

    fn infer(&mut self, window: &[FeatureVector]) -> Option<Emission> {
        self.stats.windows += 1;
        let tensor = self.builder.build(window);
        match self.engine.predict(&tensor) {
            Inference::Label(result) | Inference::Uncertain(result) => {
                self.stats.inferences += 1;
                self.state.unavailable_reported = false;
                let emitted = self.state.filter.observe(&result)?;
                self.stats.labels += 1;
                log::info!(
                    "gesture '{}' recognized (confidence {:.2})",
                    emitted.label,
                    emitted.confidence
                );
                Some(Emission::Label(emitted))
            }
            Inference::Unavailable => {
                self.stats.unavailable += 1;
                if self.state.unavailable_reported {
                    return None;
                }
                self.state.unavailable_reported = true;
                log::warn!("classifier unavailable, skipping gesture windows");
                Some(Emission::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{LoadedModel, ModelHandle, StubClassifier, DEFAULT_CONFIDENCE_THRESHOLD};
    use crate::frame::{Landmark, HAND_LANDMARKS, SEQUENCE_LENGTH};
    use crate::tensor::TensorShape;
    use crate::window::WindowPolicy;
    use std::time::Duration;

    fn session(probs: Option<Vec<f32>>, policy: WindowPolicy) -> RecognitionSession {
        let handle = ModelHandle::new();
        if let Some(probs) = probs {
            handle
                .install(
                    LoadedModel::new(
                        Box::new(StubClassifier::new(probs)),
                        vec!["a".into(), "b".into(), "c".into()],
                    ),
                    TensorShape::Sequence,
                )
                .expect("install");
        }
        let engine = InferenceEngine::new(handle, DEFAULT_CONFIDENCE_THRESHOLD);
        let settings = WindowSettings {
            policy,
            ..WindowSettings::default()
        };
        let mut session =
            RecognitionSession::new(engine, TensorBuilder::new(TensorShape::Sequence), &settings);
        session.start();
        session
    }

    fn hand_frame(ts: u64) -> Frame {
        Frame::new(ts).with_right_hand(vec![Landmark::new(0.4, 0.6, -0.02); HAND_LANDMARKS])
    }

    #[test]
    fn trailing_session_emits_once_while_held() {
        let mut session = session(Some(vec![0.1, 0.85, 0.05]), WindowPolicy::Trailing);
        let now = Instant::now();
        let emissions: Vec<_> = (0..(SEQUENCE_LENGTH as u64 + 20))
            .filter_map(|i| session.on_frame(&hand_frame(i), now))
            .collect();

        assert_eq!(
            emissions,
            vec![Emission::Label(PredictionResult::new("b", 0.85))]
        );
        assert_eq!(session.stats().windows, 21);
        assert_eq!(session.stats().labels, 1);
    }

    #[test]
    fn unavailable_is_reported_once_per_outage() {
        let mut session = session(None, WindowPolicy::Trailing);
        let now = Instant::now();
        let emissions: Vec<_> = (0..40)
            .filter_map(|i| session.on_frame(&hand_frame(i), now))
            .collect();
        assert_eq!(emissions, vec![Emission::Unavailable]);
        assert_eq!(session.stats().unavailable, 11);
    }

    #[test]
    fn stopped_session_ignores_frames_and_pending_deadline() {
        let mut session = session(Some(vec![0.0, 1.0, 0.0]), WindowPolicy::Presence);
        let mut now = Instant::now();
        for i in 0..40 {
            assert!(session.on_frame(&hand_frame(i), now).is_none());
            now += Duration::from_millis(33);
        }
        assert!(session.on_frame(&Frame::new(41), now).is_none());
        assert!(session.next_deadline().is_some());

        session.stop();
        assert!(session.next_deadline().is_none());
        assert!(session.poll(now + Duration::from_secs(1)).is_none());
        assert!(session.on_frame(&hand_frame(42), now).is_none());
        assert_eq!(session.state().windower().buffered(), 0);
    }

    #[test]
    fn presence_session_emits_after_hands_leave() {
        let mut session = session(Some(vec![0.05, 0.05, 0.9]), WindowPolicy::Presence);
        let mut now = Instant::now();
        for i in 0..35 {
            assert!(session.on_frame(&hand_frame(i), now).is_none());
            now += Duration::from_millis(33);
        }
        assert!(session.on_frame(&Frame::new(36), now).is_none());

        let emission = session.poll(now + Duration::from_millis(100));
        assert_eq!(
            emission,
            Some(Emission::Label(PredictionResult::new("c", 0.9)))
        );
    }
}
