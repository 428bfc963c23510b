//! Explicitly-owned application state.
//!
//! The retention list and sample history live here rather than in globals, so
//! the generator, sampler and exporter are all handed the same context at
//! construction and tests can build isolated instances.

use crate::config::SimConfig;
use crate::leak::RetentionList;
use crate::sampler::SampleHistory;
use std::time::Instant;

/// Shared state for one simulator instance
#[derive(Debug)]
pub struct AppContext {
    config: SimConfig,
    retention: RetentionList,
    history: SampleHistory,
    started_at: Instant,
}

impl AppContext {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            retention: RetentionList::new(),
            history: SampleHistory::new(),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub const fn retention(&self) -> &RetentionList {
        &self.retention
    }

    #[must_use]
    pub const fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Seconds since this context was created
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
