//! Compiled-in simulator configuration with constructor-time validation.
//!
//! There is no configuration file and no persisted state. The four recognized
//! options are the leak interval, the leaked block size, the sample interval
//! and the debug port; defaults match the original demo and CLI flags may
//! override them for test runs.

use crate::error::{LeakSimError, Result};
use std::time::Duration;

/// How often the leak generator allocates a new block.
pub const DEFAULT_LEAK_INTERVAL: Duration = Duration::from_secs(5);

/// Size of each leaked block in bytes (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// How often the sampler reads memory counters.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Local port for the pprof-style debug endpoint.
pub const DEFAULT_DEBUG_PORT: u16 = 6060;

/// Upper bound on a single leaked block (1 GiB). Larger values are almost
/// certainly a typo in a CLI flag, not an intended fault.
const MAX_BLOCK_SIZE: usize = 1024 * 1024 * 1024;

/// Validated simulator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    leak_interval: Duration,
    block_size: usize,
    sample_interval: Duration,
    debug_port: u16,
}

impl SimConfig {
    /// Create a configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if either interval is zero, or the block size
    /// is zero or above the 1 GiB sanity limit.
    pub fn new(
        leak_interval: Duration,
        block_size: usize,
        sample_interval: Duration,
        debug_port: u16,
    ) -> Result<Self> {
        if leak_interval.is_zero() {
            return Err(LeakSimError::InvalidConfig(
                "leak interval must be greater than zero".to_string(),
            ));
        }
        if sample_interval.is_zero() {
            return Err(LeakSimError::InvalidConfig(
                "sample interval must be greater than zero".to_string(),
            ));
        }
        if block_size == 0 {
            return Err(LeakSimError::InvalidConfig(
                "block size must be greater than zero".to_string(),
            ));
        }
        if block_size > MAX_BLOCK_SIZE {
            return Err(LeakSimError::InvalidConfig(format!(
                "block size {block_size} exceeds maximum {MAX_BLOCK_SIZE}"
            )));
        }

        Ok(Self {
            leak_interval,
            block_size,
            sample_interval,
            debug_port,
        })
    }

    /// Get the leak generator tick period
    #[must_use]
    pub const fn leak_interval(&self) -> Duration {
        self.leak_interval
    }

    /// Get the leaked block size in bytes
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Get the sampler tick period
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Get the debug endpoint port
    #[must_use]
    pub const fn debug_port(&self) -> u16 {
        self.debug_port
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            leak_interval: DEFAULT_LEAK_INTERVAL,
            block_size: DEFAULT_BLOCK_SIZE,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            debug_port: DEFAULT_DEBUG_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults_match_demo_constants() {
        let config = SimConfig::default();
        assert_eq!(config.leak_interval(), Duration::from_secs(5));
        assert_eq!(config.block_size(), 1024 * 1024);
        assert_eq!(config.sample_interval(), Duration::from_secs(10));
        assert_eq!(config.debug_port(), 6060);
    }

    #[test]
    fn test_valid_config() {
        let config = SimConfig::new(
            Duration::from_millis(100),
            4096,
            Duration::from_millis(250),
            0,
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_zero_leak_interval_rejected() {
        let config = SimConfig::new(Duration::ZERO, 4096, Duration::from_secs(1), 6060);
        assert!(matches!(config, Err(LeakSimError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_sample_interval_rejected() {
        let config = SimConfig::new(Duration::from_secs(1), 4096, Duration::ZERO, 6060);
        assert!(matches!(config, Err(LeakSimError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = SimConfig::new(
            Duration::from_secs(1),
            0,
            Duration::from_secs(1),
            6060,
        );
        assert!(matches!(config, Err(LeakSimError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_block_rejected() {
        let config = SimConfig::new(
            Duration::from_secs(1),
            2 * 1024 * 1024 * 1024,
            Duration::from_secs(1),
            6060,
        );
        assert!(matches!(config, Err(LeakSimError::InvalidConfig(_))));
    }
}
