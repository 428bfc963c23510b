//! Error taxonomy for the leak simulator.
//!
//! Startup failures are fatal and surface as a nonzero exit code. Snapshot IO
//! failures are reported to the caller of the exporter and never retried.

use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, LeakSimError>;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum LeakSimError {
    /// The debug server could not bind its port. Fatal at startup.
    #[error("failed to bind debug server on {addr}: {source}")]
    Startup {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A heap snapshot could not be serialized or written.
    #[error("snapshot IO failed: {0}")]
    SnapshotIo(String),

    /// Process memory counters could not be read. Fatal to the sampler.
    #[error("memory counters unavailable: {0}")]
    CountersUnavailable(String),

    /// Configuration validation failed at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for LeakSimError {
    fn from(err: serde_json::Error) -> Self {
        Self::SnapshotIo(err.to_string())
    }
}
