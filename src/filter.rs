//! Stability / de-duplication filter.
//!
//! Live inference runs many times per second while a user holds one sign.
//! The filter turns that stream into one emission per held gesture:
//!
//! - below threshold: forget the last label, emit nothing
//! - at or above threshold, same label as last emitted: emit nothing (held)
//! - at or above threshold, new label: remember it and emit

use crate::classify::PredictionResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterState {
    /// No label emitted since the last reset or confidence drop.
    Idle,
    /// A label was emitted and is still being held.
    Held,
}

#[derive(Clone, Debug)]
pub struct StabilityFilter {
    threshold: f32,
    last_emitted_label: Option<String>,
    last_above_threshold: bool,
}

impl StabilityFilter {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            last_emitted_label: None,
            last_above_threshold: false,
        }
    }

    /// Feed one prediction. Returns the prediction when it should be emitted.
    pub fn observe(&mut self, result: &PredictionResult) -> Option<PredictionResult> {
        if result.confidence < self.threshold {
            if self.last_emitted_label.take().is_some() {
                log::debug!("confidence dropped to {:.2}, filter reset", result.confidence);
            }
            self.last_above_threshold = false;
            return None;
        }

        self.last_above_threshold = true;
        if self.last_emitted_label.as_deref() == Some(result.label.as_str()) {
            return None;
        }
        self.last_emitted_label = Some(result.label.clone());
        Some(result.clone())
    }

    pub fn reset(&mut self) {
        self.last_emitted_label = None;
        self.last_above_threshold = false;
    }

    pub fn state(&self) -> FilterState {
        if self.last_emitted_label.is_some() {
            FilterState::Held
        } else {
            FilterState::Idle
        }
    }

    pub fn last_emitted_label(&self) -> Option<&str> {
        self.last_emitted_label.as_deref()
    }

    pub fn last_above_threshold(&self) -> bool {
        self.last_above_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(label: &str, confidence: f32) -> PredictionResult {
        PredictionResult::new(label, confidence)
    }

    #[test]
    fn held_gesture_emits_once_then_change_emits() {
        let mut filter = StabilityFilter::new(0.7);
        let emitted: Vec<_> = [
            p("hola", 0.9),
            p("hola", 0.92),
            p("hola", 0.88),
            p("adios", 0.95),
        ]
        .iter()
        .map(|r| filter.observe(r).map(|e| e.label))
        .collect();

        assert_eq!(
            emitted,
            vec![Some("hola".to_string()), None, None, Some("adios".to_string())]
        );
        assert_eq!(filter.state(), FilterState::Held);
    }

    #[test]
    fn low_confidence_resets_and_emits_nothing() {
        let mut filter = StabilityFilter::new(0.7);
        assert!(filter.observe(&p("hola", 0.9)).is_some());

        assert!(filter.observe(&p("hola", 0.65)).is_none());
        assert_eq!(filter.last_emitted_label(), None);
        assert_eq!(filter.state(), FilterState::Idle);
        assert!(!filter.last_above_threshold());

        // The same sign after a drop counts as a new gesture.
        assert_eq!(filter.observe(&p("hola", 0.8)).map(|e| e.label), Some("hola".into()));
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut filter = StabilityFilter::new(0.7);
        filter.observe(&p("gracias", 0.99));
        filter.reset();
        assert_eq!(filter.state(), FilterState::Idle);
        assert!(filter.observe(&p("gracias", 0.99)).is_some());
    }
}
