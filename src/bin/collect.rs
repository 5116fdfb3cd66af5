//! collect - record labeled gesture samples into a dataset file

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use gesture_kernel::{
    validate_label, FrameSource, GestureDataset, RecognizerConfig, SampleRecorder, SourceConfig,
    SyntheticConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Label of the gesture being recorded.
    #[arg(long)]
    label: Option<String>,
    /// Frame source: JSON-lines file, '-' for stdin, or stub://<name>.
    #[arg(long, default_value = "stub://collect")]
    source: String,
    /// Dataset file (defaults to the configured recorder dataset path).
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// Frames per second used to pace the source.
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Print the dataset's labels and exit.
    #[arg(long)]
    list_labels: bool,
    /// Remove every sample with this label and exit.
    #[arg(long)]
    delete: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RecognizerConfig::load()?;
    let dataset = GestureDataset::new(
        args.dataset
            .clone()
            .unwrap_or_else(|| cfg.recorder.dataset_path.clone()),
    );

    if args.list_labels {
        for label in dataset.labels()? {
            println!("{}", label);
        }
        return Ok(());
    }

    if let Some(label) = &args.delete {
        let label = validate_label(label)?;
        let removed = dataset.remove_label(&label)?;
        log::info!(
            "removed {} samples of '{}' from {}",
            removed,
            label,
            dataset.path().display()
        );
        return Ok(());
    }

    let label = args
        .label
        .as_deref()
        .ok_or_else(|| anyhow!("--label is required to record a sample"))?;

    let fps = args.fps.max(1);
    // One extra second of stub frames so the capture window always closes first.
    let capture_frames = cfg.recorder.duration.as_millis() as u64 * u64::from(fps) / 1000
        + u64::from(fps);
    let mut source = FrameSource::open(SourceConfig {
        uri: args.source.clone(),
        max_frames: args.source.starts_with("stub://").then_some(capture_frames),
        synthetic: SyntheticConfig {
            fps,
            ..SyntheticConfig::default()
        },
    })?;

    let frame_interval = Duration::from_secs(1) / fps;
    let mut recorder = SampleRecorder::start(
        label,
        cfg.recorder.duration,
        cfg.recorder.min_frames,
        Instant::now(),
    )?;

    for frame in source.by_ref() {
        if !recorder.push(frame?, Instant::now()) {
            break;
        }
        std::thread::sleep(frame_interval);
    }

    let sample = recorder.finish()?;
    let frames = sample.sequence.len();
    let label = sample.label.clone();
    let total = dataset.append(sample)?;
    log::info!(
        "saved '{}' ({} frames) to {}; dataset now holds {} samples",
        label,
        frames,
        dataset.path().display(),
        total
    );
    Ok(())
}
