//! recognize - live gesture recognition over a landmark frame stream
//!
//! This tool:
//! 1. Opens a frame source (JSON-lines file, stdin, or stub://)
//! 2. Installs a classifier (ONNX model directory or a fixed stub)
//! 3. Runs one recognition session on a worker thread
//! 4. Prints every emission to stdout as a JSON line
//! 5. Optionally hot-swaps the model when its file changes on disk

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use gesture_kernel::classify::MODEL_FILE_NAME;
use gesture_kernel::{
    load_model_dir, FrameSource, LoadedModel, ModelHandle, RecognizerConfig, SessionRunner,
    SourceConfig, StubClassifier, SyntheticConfig, TensorShape,
};

const DEFAULT_STUB_FRAMES: u64 = 300;
const MODEL_WATCH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame source: JSON-lines file, '-' for stdin, or stub://<name>.
    #[arg(long, default_value = "stub://demo")]
    source: String,
    /// Stop after this many frames (stub sources default to 300).
    #[arg(long)]
    frames: Option<u64>,
    /// Replay pace in frames per second (0 = as fast as possible).
    #[arg(long, default_value_t = 30)]
    fps: u32,
    /// Model directory containing model.onnx and model_info.json.
    #[arg(long, env = "GESTURE_MODEL_DIR")]
    model_dir: Option<PathBuf>,
    /// Use a stub classifier returning these probabilities (comma separated).
    #[arg(long, value_delimiter = ',')]
    stub_probs: Vec<f32>,
    /// Labels for the stub classifier (comma separated).
    #[arg(long, value_delimiter = ',')]
    stub_labels: Vec<String>,
    /// Window policy override: trailing or presence.
    #[arg(long)]
    policy: Option<String>,
    /// Reload the model when model.onnx changes on disk.
    #[arg(long)]
    watch_model: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = RecognizerConfig::load()?;
    if let Some(dir) = &args.model_dir {
        cfg.model.dir = dir.clone();
    }
    if let Some(policy) = &args.policy {
        cfg.window.policy = policy.parse()?;
    }
    cfg.validate()?;

    let models = ModelHandle::new();
    let stub_model = !args.stub_probs.is_empty();
    let installed = if stub_model {
        stub_model_from_args(&args, cfg.model.shape)
            .and_then(|model| models.install(model, cfg.model.shape))
    } else {
        load_model_dir(&cfg.model.dir, cfg.model.shape)
            .and_then(|model| models.install(model, cfg.model.shape))
    };
    if let Err(e) = installed {
        log::warn!("starting without a classifier: {}", e);
    }

    let mut source = FrameSource::open(SourceConfig {
        max_frames: args.frames.or_else(|| {
            args.source
                .starts_with("stub://")
                .then_some(DEFAULT_STUB_FRAMES)
        }),
        synthetic: SyntheticConfig {
            fps: args.fps.max(1),
            ..SyntheticConfig::default()
        },
        uri: args.source.clone(),
    })?;

    let session = cfg.session(models.clone());
    let (handle, emissions) = SessionRunner::new(session, cfg.channel_capacity).spawn()?;
    let sender = handle.sender();

    let printer = std::thread::Builder::new()
        .name("gesture-printer".to_string())
        .spawn(move || -> Result<()> {
            let stdout = std::io::stdout();
            for emission in emissions {
                let mut out = stdout.lock();
                writeln!(out, "{}", serde_json::to_string(&emission)?)?;
                out.flush()?;
            }
            Ok(())
        })?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::SeqCst);
    })?;

    let mut watcher = (args.watch_model && !stub_model)
        .then(|| ModelWatcher::new(&cfg.model.dir, cfg.model.shape));
    let frame_interval = (args.fps > 0).then(|| Duration::from_secs(1) / args.fps);

    log::info!(
        "recognize running: source={} window={} threshold={:.2}",
        args.source,
        cfg.window.policy,
        cfg.model.threshold
    );

    for frame in source.by_ref() {
        if stop.load(Ordering::SeqCst) {
            log::info!("interrupted, stopping session");
            break;
        }
        sender.send(frame?);
        if let Some(watcher) = watcher.as_mut() {
            watcher.check(&models);
        }
        if let Some(interval) = frame_interval {
            std::thread::sleep(interval);
        }
    }

    // Give a trailing gesture its debounce before stopping.
    if !stop.load(Ordering::SeqCst) {
        std::thread::sleep(cfg.window.debounce + Duration::from_millis(50));
    }

    let dropped = sender.dropped();
    drop(sender);
    let stats = handle.stop()?;
    printer
        .join()
        .map_err(|_| anyhow!("printer thread panicked"))??;

    let source_stats = source.stats();
    log::info!(
        "done: frames_read={} skipped={} dropped={} windows={} labels={} unavailable={}",
        source_stats.frames_read,
        source_stats.frames_skipped,
        dropped,
        stats.windows,
        stats.labels,
        stats.unavailable
    );
    Ok(())
}

fn stub_model_from_args(args: &Args, shape: TensorShape) -> Result<LoadedModel> {
    let labels = if args.stub_labels.is_empty() {
        (0..args.stub_probs.len())
            .map(|i| format!("class_{}", i))
            .collect()
    } else {
        args.stub_labels.clone()
    };
    let classifier = StubClassifier::new(args.stub_probs.clone()).with_shape(shape);
    Ok(LoadedModel::new(Box::new(classifier), labels))
}

/// Polls the model file's modification time and reinstalls on change.
struct ModelWatcher {
    dir: PathBuf,
    shape: TensorShape,
    modified: Option<SystemTime>,
    last_check: Instant,
}

impl ModelWatcher {
    fn new(dir: &Path, shape: TensorShape) -> Self {
        Self {
            dir: dir.to_path_buf(),
            shape,
            modified: modified_time(&dir.join(MODEL_FILE_NAME)),
            last_check: Instant::now(),
        }
    }

    fn check(&mut self, models: &ModelHandle) {
        if self.last_check.elapsed() < MODEL_WATCH_INTERVAL {
            return;
        }
        self.last_check = Instant::now();
        let modified = modified_time(&self.dir.join(MODEL_FILE_NAME));
        if modified.is_none() || modified == self.modified {
            return;
        }
        self.modified = modified;
        log::info!("model file changed, reloading from {}", self.dir.display());
        let reloaded = load_model_dir(&self.dir, self.shape)
            .and_then(|model| models.install(model, self.shape));
        if let Err(e) = reloaded {
            log::warn!("model reload failed, keeping current model: {}", e);
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
}
