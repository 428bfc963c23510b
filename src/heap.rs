//! Process-wide memory counters.
//!
//! Live and peak heap bytes come from a counting global allocator, resident
//! and virtual sizes from `/proc/self/status`. The collection counter is the
//! Rust rendition of a forced GC pass: Rust frees eagerly, so a pass only
//! advances the counter and reads the allocator's live-bytes figure, which
//! already excludes transient garbage.

use crate::error::{LeakSimError, Result};
use peak_alloc::PeakAlloc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[global_allocator]
static HEAP: PeakAlloc = PeakAlloc;

static COLLECTIONS: AtomicU64 = AtomicU64::new(0);

/// Bytes currently live on the heap, as counted by the global allocator.
#[must_use]
pub fn allocated_bytes() -> u64 {
    HEAP.current_usage() as u64
}

/// High-water mark of live heap bytes since process start.
#[must_use]
pub fn peak_bytes() -> u64 {
    HEAP.peak_usage() as u64
}

/// Run one collection pass and return the new pass count.
///
/// The leak generator runs a pass on every tick and the snapshot exporter
/// runs one before every capture, so `collection_count` advances exactly as
/// often as the original demo forced a GC.
pub fn run_collection() -> u64 {
    COLLECTIONS.fetch_add(1, Ordering::SeqCst) + 1
}

/// Number of collection passes run so far.
#[must_use]
pub fn collection_count() -> u64 {
    COLLECTIONS.load(Ordering::SeqCst)
}

/// Tasks currently alive on the tokio runtime, or zero outside a runtime.
#[must_use]
pub fn alive_tasks() -> usize {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks())
        .unwrap_or(0)
}

/// Memory sizes from `/proc/self/status`, in kilobytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcStatus {
    /// Resident set size
    pub rss_kb: u64,
    /// Virtual memory size
    pub vm_size_kb: u64,
    /// Peak resident set size
    pub vm_peak_kb: u64,
}

impl ProcStatus {
    /// Read the current process's memory sizes.
    ///
    /// # Errors
    ///
    /// Returns `CountersUnavailable` if `/proc/self/status` cannot be read
    /// or the `VmRSS` field is missing. Callers treat this as fatal.
    pub fn read() -> Result<Self> {
        let status = std::fs::read_to_string("/proc/self/status")
            .map_err(|e| LeakSimError::CountersUnavailable(format!("/proc/self/status: {e}")))?;
        Self::parse(&status)
    }

    /// Parse the contents of a `/proc/[pid]/status` file.
    fn parse(status: &str) -> Result<Self> {
        let mut rss_kb = None;
        let mut vm_size_kb = None;
        let mut vm_peak_kb = None;

        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                rss_kb = parse_kb_field(rest);
            } else if let Some(rest) = line.strip_prefix("VmSize:") {
                vm_size_kb = parse_kb_field(rest);
            } else if let Some(rest) = line.strip_prefix("VmHWM:") {
                vm_peak_kb = parse_kb_field(rest);
            }
        }

        let rss_kb = rss_kb
            .ok_or_else(|| LeakSimError::CountersUnavailable("VmRSS not found".to_string()))?;

        // VmSize/VmHWM are present on every kernel this targets, but fall
        // back to RSS rather than failing the whole sample.
        Ok(Self {
            rss_kb,
            vm_size_kb: vm_size_kb.unwrap_or(rss_kb),
            vm_peak_kb: vm_peak_kb.unwrap_or(rss_kb),
        })
    }

    /// Resident set size in bytes
    #[must_use]
    pub const fn rss_bytes(&self) -> u64 {
        self.rss_kb * 1024
    }
}

/// Parse the numeric part of a "`   12345 kB`" status field.
fn parse_kb_field(rest: &str) -> Option<u64> {
    rest.split_whitespace().next()?.parse::<u64>().ok()
}
