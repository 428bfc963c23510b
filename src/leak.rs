//! The deliberate fault: a generator that allocates fixed-size blocks on a
//! timer and retains them forever.
//!
//! The retention list is append-only with a single writer (the generator),
//! so readers only ever take the lock briefly for length and size queries.

use crate::config::SimConfig;
use crate::context::AppContext;
use crate::heap;
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// An opaque fixed-size byte buffer that is never released.
#[derive(Debug)]
pub struct LeakedBlock {
    bytes: Vec<u8>,
}

impl LeakedBlock {
    /// Allocate a block of exactly `size` bytes.
    ///
    /// The buffer is filled with a nonzero pattern so every page is touched
    /// and committed memory actually grows. Allocation failure aborts the
    /// process; this harness does not handle exhaustion.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0x5A; size],
        }
    }

    /// Size of the block in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Append-only list of leaked blocks, alive for the whole process lifetime.
#[derive(Debug, Default)]
pub struct RetentionList {
    blocks: RwLock<Vec<LeakedBlock>>,
    retained_bytes: AtomicUsize,
}

impl RetentionList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block. The only mutation this list ever sees.
    pub fn append(&self, block: LeakedBlock) {
        self.retained_bytes.fetch_add(block.len(), Ordering::Relaxed);
        if let Ok(mut blocks) = self.blocks.write() {
            blocks.push(block);
        }
    }

    /// Number of retained blocks. Non-decreasing over the process lifetime.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().map(|blocks| blocks.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held by retained blocks.
    #[must_use]
    pub fn retained_bytes(&self) -> usize {
        self.retained_bytes.load(Ordering::Relaxed)
    }

    /// Sizes of all retained blocks, in insertion order.
    #[must_use]
    pub fn block_sizes(&self) -> Vec<usize> {
        self.blocks
            .read()
            .map(|blocks| blocks.iter().map(LeakedBlock::len).collect())
            .unwrap_or_default()
    }
}

/// Handle for stopping a background leak generator.
#[derive(Debug)]
pub struct LeakHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LeakHandle {
    /// Signal the generator to stop after the current tick.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the generator and wait for its task to finish.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }
}

/// Allocates one fixed-size block per tick and retains it in the given list.
pub struct LeakGenerator<'a> {
    config: &'a SimConfig,
    retention: &'a RetentionList,
}

impl<'a> LeakGenerator<'a> {
    #[must_use]
    pub const fn new(config: &'a SimConfig, retention: &'a RetentionList) -> Self {
        Self { config, retention }
    }

    /// Perform one leak tick: allocate, retain, run a collection pass.
    ///
    /// The collection pass mirrors the original demo, which forced a GC after
    /// every leak to show that retained memory survives collection.
    pub fn tick(&self) {
        let block = LeakedBlock::new(self.config.block_size());
        self.retention.append(block);
        heap::run_collection();

        debug!(
            retained_blocks = self.retention.len(),
            retained_mb = self.retention.retained_bytes() / (1024 * 1024),
            "leaked one block"
        );
    }
}

/// Spawn the leak generator as a cancellable background task.
///
/// Fires every `leak_interval` until the returned handle is stopped. The
/// context owns the retention list; the task only appends to it.
pub fn spawn_leak_generator(ctx: Arc<AppContext>) -> LeakHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let interval = ctx.config().leak_interval();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first interval tick completes immediately; consume it so the
        // first block lands one full period after start, like a ticker.
        ticker.tick().await;

        info!(
            interval_ms = interval.as_millis() as u64,
            block_bytes = ctx.config().block_size(),
            "leak generator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let generator = LeakGenerator::new(ctx.config(), ctx.retention());
                    generator.tick();
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("leak generator stopped");
                        break;
                    }
                }
            }
        }
    });

    LeakHandle { stop_tx, task }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::time::Duration;

    fn test_config(block_size: usize) -> SimConfig {
        SimConfig::new(
            Duration::from_millis(50),
            block_size,
            Duration::from_millis(50),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_leaked_block_has_exact_size() {
        let block = LeakedBlock::new(4096);
        assert_eq!(block.len(), 4096);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_retention_list_append_grows_length_and_bytes() {
        let list = RetentionList::new();
        assert!(list.is_empty());

        list.append(LeakedBlock::new(1024));
        list.append(LeakedBlock::new(1024));

        assert_eq!(list.len(), 2);
        assert_eq!(list.retained_bytes(), 2048);
        assert_eq!(list.block_sizes(), vec![1024, 1024]);
    }

    #[test]
    fn test_tick_appends_one_block_and_runs_a_collection_pass() {
        let config = test_config(2048);
        let list = RetentionList::new();
        let generator = LeakGenerator::new(&config, &list);

        let collections_before = heap::collection_count();
        generator.tick();

        assert_eq!(list.len(), 1);
        assert_eq!(list.retained_bytes(), 2048);
        assert!(heap::collection_count() > collections_before);
    }

    #[test]
    fn test_length_is_non_decreasing_across_ticks() {
        let config = test_config(512);
        let list = RetentionList::new();
        let generator = LeakGenerator::new(&config, &list);

        let mut last_len = list.len();
        for _ in 0..10 {
            generator.tick();
            let len = list.len();
            assert!(len >= last_len);
            last_len = len;
        }
        assert_eq!(last_len, 10);
    }
}
