//! Periodic memory sampling.
//!
//! On each tick the sampler reads the process memory counters, appends an
//! immutable `Sample` to the in-memory history and logs a status line. The
//! history has a single writer and is append-only; samples are never
//! destroyed during the process lifetime.

use crate::context::AppContext;
use crate::error::Result;
use crate::heap::{self, ProcStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// One point-in-time memory observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
    /// Live heap bytes per the counting allocator
    pub allocated_bytes: u64,
    /// Resident set size in bytes
    pub system_bytes: u64,
    /// Collection passes run so far
    pub collection_count: u64,
    /// Tasks alive on the runtime
    pub active_task_count: usize,
    /// Blocks held by the retention list
    pub retained_blocks: usize,
}

/// Append-only, single-writer sequence of samples
#[derive(Debug, Default)]
pub struct SampleHistory {
    samples: RwLock<Vec<Sample>>,
}

impl SampleHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Insertion order is time order.
    pub fn append(&self, sample: Sample) {
        if let Ok(mut samples) = self.samples.write() {
            samples.push(sample);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.read().map(|s| s.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent sample, if any
    #[must_use]
    pub fn latest(&self) -> Option<Sample> {
        self.samples
            .read()
            .ok()
            .and_then(|s| s.last().cloned())
    }

    /// Clone of the full history, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<Sample> {
        self.samples.read().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Reads memory counters and records them in the context's history.
pub struct Sampler<'a> {
    ctx: &'a AppContext,
}

impl<'a> Sampler<'a> {
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Take one sample and append it to the history.
    ///
    /// # Errors
    ///
    /// Returns `CountersUnavailable` if the process memory counters cannot
    /// be read. Callers treat this as fatal to the sampler.
    pub fn sample_once(&self) -> Result<Sample> {
        let status = ProcStatus::read()?;

        let sample = Sample {
            timestamp: Utc::now(),
            allocated_bytes: heap::allocated_bytes(),
            system_bytes: status.rss_bytes(),
            collection_count: heap::collection_count(),
            active_task_count: heap::alive_tasks(),
            retained_blocks: self.ctx.retention().len(),
        };

        self.ctx.history().append(sample.clone());
        Ok(sample)
    }
}

/// Handle for stopping a background sampler.
#[derive(Debug)]
pub struct SamplerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Signal the sampler to stop after the current tick.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the sampler and wait for its task to finish.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }
}

/// Spawn the sampler as a cancellable background task.
///
/// Fires every `sample_interval` until stopped, independent of the leak
/// generator. Each tick appends a sample and logs a status line; an
/// unreadable counter stops the task since nothing downstream can recover.
pub fn spawn_sampler(ctx: Arc<AppContext>) -> SamplerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let interval = ctx.config().sample_interval();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        info!(interval_ms = interval.as_millis() as u64, "sampler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sampler = Sampler::new(&ctx);
                    match sampler.sample_once() {
                        Ok(sample) => log_status(&sample),
                        Err(e) => {
                            error!(error = %e, "sampler stopping");
                            break;
                        }
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("sampler stopped");
                        break;
                    }
                }
            }
        }
    });

    SamplerHandle { stop_tx, task }
}

/// Emit the periodic console status line.
fn log_status(sample: &Sample) {
    info!(
        allocated_mb = sample.allocated_bytes / (1024 * 1024),
        system_mb = sample.system_bytes / (1024 * 1024),
        collections = sample.collection_count,
        tasks = sample.active_task_count,
        retained_blocks = sample.retained_blocks,
        "memory status"
    );
}
