//! Channel-driven session runner.
//!
//! Frames arrive over a bounded channel and are consumed by one worker
//! thread that owns the `RecognitionSession`. The worker waits on the channel
//! with a timeout equal to the session's next debounce deadline, so the
//! timer fires even when no frame arrives. Producers never block: a full
//! channel drops the frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::session::{Emission, RecognitionSession, SessionStats};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Upper bound on how long the worker sleeps before rechecking shutdown.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Producer side of the frame channel. Cheap to clone.
#[derive(Clone)]
pub struct FrameSender {
    tx: SyncSender<Frame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    /// Queue a frame without blocking. Returns false if it was dropped
    /// (channel full) or the runner has stopped.
    pub fn send(&self, frame: Frame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 100 == 0 {
                    log::warn!("frame channel full, {} frames dropped so far", dropped);
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct RunnerHandle {
    frames: FrameSender,
    shutdown: Arc<AtomicBool>,
    emissions: Arc<EmissionGate>,
    join: Option<JoinHandle<SessionStats>>,
}

impl RunnerHandle {
    pub fn sender(&self) -> FrameSender {
        self.frames.clone()
    }

    /// Stop the session and wait for the worker. Queued frames are
    /// discarded and no emission is produced after this returns.
    pub fn stop(mut self) -> Result<SessionStats> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.emissions.close();
        let join = self
            .join
            .take()
            .ok_or_else(|| anyhow!("session runner already stopped"))?;
        join.join()
            .map_err(|_| anyhow!("session runner thread panicked"))
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.emissions.close();
    }
}

pub struct SessionRunner {
    session: RecognitionSession,
    capacity: usize,
}

impl SessionRunner {
    pub fn new(session: RecognitionSession, capacity: usize) -> Self {
        Self {
            session,
            capacity: capacity.max(1),
        }
    }

    /// Start the worker. Emissions are delivered on the returned receiver,
    /// which disconnects once the worker exits.
    pub fn spawn(self) -> Result<(RunnerHandle, Receiver<Emission>)> {
        let (frame_tx, frame_rx) = mpsc::sync_channel(self.capacity);
        let (emission_tx, emission_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();
        let gate = Arc::new(EmissionGate::new(emission_tx));
        let worker_gate = gate.clone();
        let mut session = self.session;

        let join = std::thread::Builder::new()
            .name("gesture-session".to_string())
            .spawn(move || {
                session.start();
                run_worker(&mut session, &frame_rx, &worker_gate, &worker_shutdown);
                session.stop();
                session.stats()
            })?;

        let handle = RunnerHandle {
            frames: FrameSender {
                tx: frame_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            shutdown,
            emissions: gate,
            join: Some(join),
        };
        Ok((handle, emission_rx))
    }
}

fn run_worker(
    session: &mut RecognitionSession,
    frames: &Receiver<Frame>,
    emissions: &EmissionGate,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::SeqCst) {
        let wait = session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT)
            .min(IDLE_WAIT);

        let emission = match frames.recv_timeout(wait) {
            Ok(frame) => session.on_frame(&frame, Instant::now()),
            Err(RecvTimeoutError::Timeout) => session.poll(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(emission) = emission {
            if !emissions.deliver(emission) {
                break;
            }
        }
    }
}

/// Emission sender guarded by an open flag. `close` takes the same lock as
/// `deliver`, so once it returns no further emission can be sent.
struct EmissionGate {
    open: Mutex<bool>,
    tx: Sender<Emission>,
}

impl EmissionGate {
    fn new(tx: Sender<Emission>) -> Self {
        Self {
            open: Mutex::new(true),
            tx,
        }
    }

    fn deliver(&self, emission: Emission) -> bool {
        let open = match self.open.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        if !*open {
            return false;
        }
        if self.tx.send(emission).is_err() {
            log::debug!("emission receiver dropped, stopping session worker");
            return false;
        }
        true
    }

    fn close(&self) {
        match self.open.lock() {
            Ok(mut open) => *open = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }
    }
}
