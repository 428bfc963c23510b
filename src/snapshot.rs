//! On-demand heap profile capture.
//!
//! A capture runs a collection pass, reads every counter under the quiesced
//! view and serializes the result to bytes. Captures are independent of each
//! other; comparing two snapshots by byte size is an advisory growth check
//! only, with the threshold left to the caller.

use crate::context::AppContext;
use crate::error::{LeakSimError, Result};
use crate::heap::{self, ProcStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Serialized form of one heap capture
#[derive(Debug, Clone, Serialize)]
struct HeapProfile {
    captured_at: DateTime<Utc>,
    collection_count: u64,
    allocated_bytes: u64,
    peak_allocated_bytes: u64,
    system: ProcStatus,
    retained: RetentionSummary,
    active_task_count: usize,
    uptime_secs: u64,
}

/// Retention totals included in every profile
#[derive(Debug, Clone, Copy, Serialize)]
struct RetentionSummary {
    blocks: usize,
    bytes: usize,
}

/// A point-in-time serialized capture of heap state
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    captured_at: DateTime<Utc>,
    bytes: Vec<u8>,
}

impl ProfileSnapshot {
    /// When the capture was taken
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// The serialized profile
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the serialized profile in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the snapshot, returning the serialized bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the snapshot to a file for external tooling.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotIo` if the file cannot be written. The caller decides
    /// whether to retry; this module never does.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)
            .map_err(|e| LeakSimError::SnapshotIo(format!("{}: {e}", path.display())))
    }
}

/// Captures heap profiles from a shared application context.
pub struct SnapshotExporter<'a> {
    ctx: &'a AppContext,
}

impl<'a> SnapshotExporter<'a> {
    #[must_use]
    pub const fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Capture the current heap state.
    ///
    /// Runs a collection pass first so the profile reflects retained memory
    /// rather than transient garbage, making two captures comparable.
    ///
    /// # Errors
    ///
    /// Returns `CountersUnavailable` if process counters cannot be read, or
    /// `SnapshotIo` if serialization fails.
    pub fn capture(&self) -> Result<ProfileSnapshot> {
        let collection_count = heap::run_collection();
        let status = ProcStatus::read()?;
        let captured_at = Utc::now();

        let profile = HeapProfile {
            captured_at,
            collection_count,
            allocated_bytes: heap::allocated_bytes(),
            peak_allocated_bytes: heap::peak_bytes(),
            system: status,
            retained: RetentionSummary {
                blocks: self.ctx.retention().len(),
                bytes: self.ctx.retention().retained_bytes(),
            },
            active_task_count: heap::alive_tasks(),
            uptime_secs: self.ctx.uptime_secs(),
        };

        let bytes = serde_json::to_vec_pretty(&profile)?;
        Ok(ProfileSnapshot { captured_at, bytes })
    }
}

/// Advisory size ratio between two snapshots (`after` over `before`).
///
/// Snapshot byte size is a weak proxy for live heap size; what ratio counts
/// as pathological is policy for the caller, not this crate.
#[must_use]
pub fn growth_ratio(before: &ProfileSnapshot, after: &ProfileSnapshot) -> f64 {
    if before.len() == 0 {
        return f64::INFINITY;
    }
    after.len() as f64 / before.len() as f64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::SimConfig;
    use crate::leak::LeakedBlock;

    fn test_ctx() -> AppContext {
        AppContext::new(SimConfig::default())
    }

    #[test]
    fn test_capture_produces_valid_json() {
        let ctx = test_ctx();
        let snapshot = SnapshotExporter::new(&ctx).capture().unwrap();

        assert!(!snapshot.is_empty());
        let value: serde_json::Value = serde_json::from_slice(snapshot.as_bytes()).unwrap();
        assert!(value["allocated_bytes"].is_u64());
        assert_eq!(value["retained"]["blocks"], 0);
    }

    #[test]
    fn test_capture_runs_a_collection_pass() {
        let ctx = test_ctx();
        let before = heap::collection_count();
        let _ = SnapshotExporter::new(&ctx).capture().unwrap();
        assert!(heap::collection_count() > before);
    }

    #[test]
    fn test_capture_sees_retained_blocks() {
        let ctx = test_ctx();
        ctx.retention().append(LeakedBlock::new(2048));

        let snapshot = SnapshotExporter::new(&ctx).capture().unwrap();
        let value: serde_json::Value = serde_json::from_slice(snapshot.as_bytes()).unwrap();
        assert_eq!(value["retained"]["blocks"], 1);
        assert_eq!(value["retained"]["bytes"], 2048);
    }

    #[test]
    fn test_write_to_persists_the_bytes() {
        let ctx = test_ctx();
        let snapshot = SnapshotExporter::new(&ctx).capture().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heap.json");
        snapshot.write_to(&path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, snapshot.as_bytes());
    }

    #[test]
    fn test_write_to_unwritable_path_is_snapshot_io() {
        let ctx = test_ctx();
        let snapshot = SnapshotExporter::new(&ctx).capture().unwrap();

        let err = snapshot
            .write_to(Path::new("/nonexistent-dir/heap.json"))
            .unwrap_err();
        assert!(matches!(err, LeakSimError::SnapshotIo(_)));
    }

    #[test]
    fn test_growth_ratio_of_equal_snapshots_is_near_one() {
        let ctx = test_ctx();
        let exporter = SnapshotExporter::new(&ctx);

        let a = exporter.capture().unwrap();
        let b = exporter.capture().unwrap();

        let ratio = growth_ratio(&a, &b);
        assert!(ratio > 0.5 && ratio < 1.5, "ratio was {ratio}");
    }
}
