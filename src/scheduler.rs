//! Bounded worker pool for a directory run.
//!
//! One coordinator (the calling thread) owns the queue and every counter;
//! workers on a dedicated rayon pool only report results back over a channel.
//! Each file moves through:
//!
//! ```text
//! Queued -> InFlight -> Completed
//!                    \-> Failed
//! ```
//!
//! At most `concurrency` files are in flight. Whenever one finishes, the
//! coordinator dispatches the next queued file right away, so the pool never
//! waits for a whole batch to drain.
//!
//! ## Events
//!
//! Progress is streamed as [`RunEvent`]s over an optional channel. After every
//! transition the coordinator emits a [`RunStats`] snapshot, where
//! `queued + in_flight + completed + failed == total` always holds. The run
//! ends with exactly one terminal event: `Finished`, `Stopped`, or `Fatal`.
//!
//! ## Cancellation
//!
//! [`CancelToken::cancel`] is cooperative. The coordinator checks it before
//! every dispatch; files already in flight run to completion so no output is
//! left half written. Files that were never dispatched stay `queued` in the
//! final snapshot.

use crate::config::{Config, ConfigError, effective_workers};
use crate::container::{ContainerError, ImageContainer};
use crate::imaging::{ImageBackend, Quality, RustBackend};
use crate::pipeline::{ProcessingError, ProcessorChain};
use crate::scan::{ScanError, list_images};
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long the coordinator waits for a result before re-checking the
/// cancel flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors that stop a run before any file is dispatched.
#[derive(Error, Debug)]
pub enum RunSetupError {
    #[error("input directory unreadable: {0}")]
    InputUnreadable(#[from] ScanError),
    #[error("cannot create output directory {path}: {source}")]
    OutputUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid run settings: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single file failed. Never stops the run.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("open failed: {0}")]
    Open(#[source] ContainerError),
    #[error("processing failed: {0}")]
    Process(#[source] ProcessingError),
    #[error("save failed: {0}")]
    Save(#[source] ContainerError),
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Per-run inputs, captured once when the run starts.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub quality: Quality,
    pub use_equivalent_focal_length: bool,
}

impl RunSettings {
    /// Settings from a config snapshot. `workers` overrides `processing.max_workers`.
    pub fn from_config(
        config: &Config,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        workers: Option<usize>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            concurrency: effective_workers(&config.processing, workers),
            quality: Quality::new(config.base.quality),
            use_equivalent_focal_length: config.global.use_equivalent_focal_length,
        }
    }
}

/// Cooperative stop flag shared between the caller and the coordinator.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counter snapshot emitted after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    /// Completed files per second; 0 until the first completion.
    pub rate: f64,
}

impl RunStats {
    /// Share of files in a terminal state, 0-100. An empty run is complete.
    pub fn progress(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed + self.failed) * 100 / self.total) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    AllSucceeded,
    CompletedWithFailures { failed: usize },
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub stats: RunStats,
    pub failures: Vec<FileFailure>,
    /// Files left undispatched by a cancellation.
    pub not_started: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { total: usize, concurrency: usize },
    Stats(RunStats),
    Progress(u8),
    FileCompleted { file: String },
    FileFailed { file: String, message: String },
    Finished(RunSummary),
    Stopped(RunSummary),
    Fatal(String),
}

/// Coordinator-owned counters. Only the coordinator thread touches these.
struct Tracker {
    total: usize,
    queued: usize,
    in_flight: usize,
    completed: usize,
    failed: usize,
    started: Instant,
}

impl Tracker {
    fn new(total: usize) -> Self {
        Self {
            total,
            queued: total,
            in_flight: 0,
            completed: 0,
            failed: 0,
            started: Instant::now(),
        }
    }

    fn dispatch(&mut self) {
        self.queued -= 1;
        self.in_flight += 1;
    }

    fn finish(&mut self, ok: bool) {
        self.in_flight -= 1;
        if ok {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    fn snapshot(&self) -> RunStats {
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if self.completed == 0 || elapsed == 0.0 {
            0.0
        } else {
            self.completed as f64 / elapsed
        };
        RunStats {
            total: self.total,
            queued: self.queued,
            in_flight: self.in_flight,
            completed: self.completed,
            failed: self.failed,
            elapsed_secs: elapsed,
            rate,
        }
    }
}

/// Run a directory with the default codec backend.
pub fn run(
    chain: &ProcessorChain,
    settings: &RunSettings,
    cancel: &CancelToken,
    events: Option<Sender<RunEvent>>,
) -> Result<RunSummary, RunSetupError> {
    run_with_backend(&RustBackend::new(), chain, settings, cancel, events)
}

/// Run a directory using a specific backend (allows testing with mock).
pub fn run_with_backend<B: ImageBackend>(
    backend: &B,
    chain: &ProcessorChain,
    settings: &RunSettings,
    cancel: &CancelToken,
    events: Option<Sender<RunEvent>>,
) -> Result<RunSummary, RunSetupError> {
    let emit = |event: RunEvent| {
        if let Some(tx) = &events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    };

    let (files, pool) = match setup(settings) {
        Ok(ready) => ready,
        Err(e) => {
            emit(RunEvent::Fatal(e.to_string()));
            return Err(e);
        }
    };

    let concurrency = settings.concurrency;
    let mut queue: VecDeque<PathBuf> = files.into();
    let mut tracker = Tracker::new(queue.len());
    let mut failures = Vec::new();
    let mut last_progress = 0u8;

    info!(
        total = tracker.total,
        concurrency,
        input = %settings.input_dir.display(),
        "run started"
    );
    emit(RunEvent::Started {
        total: tracker.total,
        concurrency,
    });
    emit(RunEvent::Stats(tracker.snapshot()));
    emit(RunEvent::Progress(0));

    let (done_tx, done_rx) = mpsc::channel::<(String, Result<(), FileError>)>();

    pool.in_place_scope(|scope| {
        loop {
            while tracker.in_flight < concurrency && !cancel.is_cancelled() {
                let Some(path) = queue.pop_front() else {
                    break;
                };
                tracker.dispatch();
                debug!(file = %path.display(), "dispatched");
                emit(RunEvent::Stats(tracker.snapshot()));

                let tx = done_tx.clone();
                scope.spawn(move |_| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        process_file(backend, chain, &path, settings)
                    }))
                    .unwrap_or_else(|payload| Err(FileError::Panicked(panic_message(&*payload))));
                    let _ = tx.send((file_name(&path), result));
                });
            }

            if tracker.in_flight == 0 {
                break;
            }

            let (file, result) = match done_rx.recv_timeout(POLL_INTERVAL) {
                Ok(done) => done,
                Err(RecvTimeoutError::Timeout) => continue,
                // The coordinator holds a sender, so this cannot happen
                Err(RecvTimeoutError::Disconnected) => break,
            };

            tracker.finish(result.is_ok());
            match result {
                Ok(()) => {
                    debug!(file = %file, "completed");
                    emit(RunEvent::FileCompleted { file });
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(file = %file, error = %message, "file failed");
                    failures.push(FileFailure {
                        file: file.clone(),
                        message: message.clone(),
                    });
                    emit(RunEvent::FileFailed { file, message });
                }
            }

            let stats = tracker.snapshot();
            emit(RunEvent::Stats(stats));
            let progress = stats.progress();
            if progress > last_progress {
                last_progress = progress;
                emit(RunEvent::Progress(progress));
            }
        }
    });

    let stats = tracker.snapshot();
    let stopped = !queue.is_empty();
    if last_progress < 100 && (stopped || stats.progress() == 100) {
        emit(RunEvent::Progress(100));
    }
    emit(RunEvent::Stats(stats));

    let outcome = if stopped {
        RunOutcome::Stopped
    } else if stats.failed > 0 {
        RunOutcome::CompletedWithFailures {
            failed: stats.failed,
        }
    } else {
        RunOutcome::AllSucceeded
    };
    let summary = RunSummary {
        outcome,
        stats,
        failures,
        not_started: queue.iter().map(|p| file_name(p)).collect(),
    };

    if stopped {
        info!(
            completed = stats.completed,
            failed = stats.failed,
            not_started = stats.queued,
            "run stopped"
        );
        emit(RunEvent::Stopped(summary.clone()));
    } else {
        info!(
            completed = stats.completed,
            failed = stats.failed,
            elapsed = stats.elapsed_secs,
            "run finished"
        );
        emit(RunEvent::Finished(summary.clone()));
    }

    Ok(summary)
}

/// Everything that can fail before the first dispatch.
fn setup(settings: &RunSettings) -> Result<(Vec<PathBuf>, rayon::ThreadPool), RunSetupError> {
    if settings.concurrency == 0 {
        return Err(ConfigError::Validation("concurrency must be at least 1".into()).into());
    }
    let files = list_images(&settings.input_dir)?;
    std::fs::create_dir_all(&settings.output_dir).map_err(|source| {
        RunSetupError::OutputUncreatable {
            path: settings.output_dir.clone(),
            source,
        }
    })?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.concurrency)
        .thread_name(|i| format!("exifmark-worker-{i}"))
        .build()?;
    Ok((files, pool))
}

/// Open, process, save, close. The container is closed on every path.
fn process_file(
    backend: &impl ImageBackend,
    chain: &ProcessorChain,
    path: &Path,
    settings: &RunSettings,
) -> Result<(), FileError> {
    let mut container = ImageContainer::open_with(backend, path).map_err(FileError::Open)?;
    container.set_equivalent_focal_length(settings.use_equivalent_focal_length);

    let target = settings.output_dir.join(file_name(path));
    let result = chain
        .process(&mut container)
        .map_err(FileError::Process)
        .and_then(|()| {
            container
                .save_with(backend, &target, settings.quality)
                .map_err(FileError::Save)
        });

    if let Err(e) = container.close() {
        debug!(file = %path.display(), error = %e, "close after run");
    }
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
