use std::time::{Duration, Instant};

use gesture_kernel::{
    Emission, Frame, InferenceEngine, Landmark, LoadedModel, ModelHandle, PredictionResult,
    RecognitionSession, StubClassifier, TensorBuilder, TensorShape, WindowPolicy, WindowSettings,
    DEFAULT_CONFIDENCE_THRESHOLD, HAND_LANDMARKS, POSE_LANDMARKS, SEQUENCE_LENGTH,
};

const FRAME_GAP: Duration = Duration::from_millis(33);

fn stub_model(probs: Vec<f32>, labels: &[&str], shape: TensorShape) -> LoadedModel {
    LoadedModel::new(
        Box::new(StubClassifier::new(probs).with_shape(shape)),
        labels.iter().map(|label| label.to_string()).collect(),
    )
}

fn session_with(
    models: ModelHandle,
    policy: WindowPolicy,
    shape: TensorShape,
) -> RecognitionSession {
    let engine = InferenceEngine::new(models, DEFAULT_CONFIDENCE_THRESHOLD);
    let settings = WindowSettings {
        policy,
        ..WindowSettings::default()
    };
    let mut session = RecognitionSession::new(engine, TensorBuilder::new(shape), &settings);
    session.start();
    session
}

fn signing_frame(ts: u64) -> Frame {
    Frame::new(ts)
        .with_pose(vec![Landmark::new(0.5, 0.4, -0.1).with_visibility(0.9); POSE_LANDMARKS])
        .with_right_hand(vec![Landmark::new(0.6, 0.55, -0.03); HAND_LANDMARKS])
}

fn resting_frame(ts: u64) -> Frame {
    Frame::new(ts)
        .with_pose(vec![Landmark::new(0.5, 0.4, -0.1).with_visibility(0.9); POSE_LANDMARKS])
}

fn labels(emissions: &[Emission]) -> Vec<&str> {
    emissions
        .iter()
        .filter_map(|emission| match emission {
            Emission::Label(result) => Some(result.label.as_str()),
            Emission::Unavailable => None,
        })
        .collect()
}

#[test]
fn thirty_identical_frames_yield_single_label() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.1, 0.85, 0.05], &["a", "b", "c"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let mut session = session_with(models, WindowPolicy::Trailing, TensorShape::Sequence);

    let now = Instant::now();
    let emissions: Vec<Emission> = (0..SEQUENCE_LENGTH as u64)
        .filter_map(|i| session.on_frame(&signing_frame(i), now))
        .collect();

    assert_eq!(
        emissions,
        vec![Emission::Label(PredictionResult::new("b", 0.85))]
    );
}

#[test]
fn flat_layout_runs_end_to_end() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.95, 0.05], &["hola", "adios"], TensorShape::Flat),
            TensorShape::Flat,
        )
        .expect("install");
    let mut session = session_with(models, WindowPolicy::Trailing, TensorShape::Flat);

    let now = Instant::now();
    let emissions: Vec<Emission> = (0..40)
        .filter_map(|i| session.on_frame(&signing_frame(i), now))
        .collect();

    assert_eq!(labels(&emissions), vec!["hola"]);
}

#[test]
fn hot_swap_takes_effect_on_next_window() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.1, 0.85, 0.05], &["a", "b", "c"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let mut session = session_with(models.clone(), WindowPolicy::Trailing, TensorShape::Sequence);
    let now = Instant::now();

    let mut emissions = Vec::new();
    for i in 0..35 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
    }
    let old_fingerprint = models.snapshot().expect("model").fingerprint().to_string();

    models
        .install(
            stub_model(vec![0.9, 0.1], &["gracias", "hola"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("swap");
    assert_ne!(
        models.snapshot().expect("model").fingerprint(),
        old_fingerprint
    );

    for i in 35..40 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
    }

    assert_eq!(labels(&emissions), vec!["b", "gracias"]);
}

#[test]
fn mismatched_install_is_rejected_and_old_model_keeps_serving() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.1, 0.85, 0.05], &["a", "b", "c"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let serving = models.snapshot().expect("model").fingerprint().to_string();

    let wrong_shape = stub_model(vec![0.5, 0.5], &["x", "y"], TensorShape::Flat);
    assert!(models.install(wrong_shape, TensorShape::Sequence).is_err());

    let wrong_labels = stub_model(vec![0.5, 0.5], &["x"], TensorShape::Sequence);
    assert!(models.install(wrong_labels, TensorShape::Sequence).is_err());

    assert_eq!(models.snapshot().expect("model").fingerprint(), serving);

    let mut session = session_with(models, WindowPolicy::Trailing, TensorShape::Sequence);
    let now = Instant::now();
    let emissions: Vec<Emission> = (0..SEQUENCE_LENGTH as u64)
        .filter_map(|i| session.on_frame(&signing_frame(i), now))
        .collect();
    assert_eq!(labels(&emissions), vec!["b"]);
}

#[test]
fn outage_reports_unavailable_without_resetting_filter() {
    let models = ModelHandle::new();
    let model = || stub_model(vec![0.1, 0.85, 0.05], &["a", "b", "c"], TensorShape::Sequence);
    models.install(model(), TensorShape::Sequence).expect("install");
    let mut session = session_with(models.clone(), WindowPolicy::Trailing, TensorShape::Sequence);
    let now = Instant::now();

    let mut emissions = Vec::new();
    for i in 0..30 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
    }
    models.clear();
    for i in 30..35 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
    }
    models.install(model(), TensorShape::Sequence).expect("reinstall");
    for i in 35..40 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
    }

    assert_eq!(
        emissions,
        vec![
            Emission::Label(PredictionResult::new("b", 0.85)),
            Emission::Unavailable,
        ]
    );
}

#[test]
fn presence_gesture_flushes_once_after_hands_leave() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.05, 0.9, 0.05], &["hola", "adios", "gracias"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let mut session = session_with(models, WindowPolicy::Presence, TensorShape::Sequence);
    let mut now = Instant::now();
    let mut emissions = Vec::new();

    for i in 0..40 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
        now += FRAME_GAP;
    }
    assert!(emissions.is_empty());

    for i in 40..45 {
        emissions.extend(session.on_frame(&resting_frame(i), now));
        now += FRAME_GAP;
    }
    emissions.extend(session.poll(now + Duration::from_secs(1)));

    assert_eq!(labels(&emissions), vec!["adios"]);
    assert_eq!(session.stats().windows, 1);
    assert_eq!(session.state().windower().buffered(), 0);
}

#[test]
fn brief_dropout_within_debounce_keeps_one_gesture() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.05, 0.9, 0.05], &["hola", "adios", "gracias"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let mut session = session_with(models, WindowPolicy::Presence, TensorShape::Sequence);
    let mut now = Instant::now();
    let mut emissions = Vec::new();

    for i in 0..35 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
        now += FRAME_GAP;
    }
    for i in 35..37 {
        emissions.extend(session.on_frame(&resting_frame(i), now));
        now += FRAME_GAP;
    }
    for i in 37..47 {
        emissions.extend(session.on_frame(&signing_frame(i), now));
        now += FRAME_GAP;
    }
    assert!(emissions.is_empty());
    assert_eq!(session.state().windower().buffered(), 45);

    emissions.extend(session.on_frame(&resting_frame(47), now));
    emissions.extend(session.poll(now + Duration::from_millis(100)));

    assert_eq!(labels(&emissions), vec!["adios"]);
    assert_eq!(session.stats().windows, 1);
}

#[test]
fn short_presence_burst_is_discarded() {
    let models = ModelHandle::new();
    models
        .install(
            stub_model(vec![0.05, 0.9, 0.05], &["hola", "adios", "gracias"], TensorShape::Sequence),
            TensorShape::Sequence,
        )
        .expect("install");
    let mut session = session_with(models, WindowPolicy::Presence, TensorShape::Sequence);
    let mut now = Instant::now();

    for i in 0..12 {
        assert!(session.on_frame(&signing_frame(i), now).is_none());
        now += FRAME_GAP;
    }
    assert!(session.on_frame(&resting_frame(12), now).is_none());
    assert!(session.poll(now + Duration::from_secs(1)).is_none());
    assert_eq!(session.stats().windows, 0);
    assert_eq!(session.state().windower().buffered(), 0);
}
