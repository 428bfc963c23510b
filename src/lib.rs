//! # leaksim
//!
//! A deliberate memory-leak simulator and growth observation harness.
//!
//! The process leaks a fixed-size block on a timer, samples its own memory
//! counters on an independent timer, and exposes a pprof-style debug endpoint
//! for heap profile captures. The leak is the point: the harness exists to
//! observe unbounded growth, not to prevent or detect it.
//!
//! Background tasks are cancellable through explicit stop handles so tests
//! can terminate them deterministically instead of relying on process exit.

pub mod config;
pub mod context;
pub mod error;
pub mod heap;
pub mod leak;
pub mod sampler;
pub mod server;
pub mod snapshot;

pub use config::SimConfig;
pub use context::AppContext;
pub use error::{LeakSimError, Result};
pub use leak::{LeakGenerator, LeakHandle, LeakedBlock, RetentionList, spawn_leak_generator};
pub use sampler::{Sample, SampleHistory, Sampler, SamplerHandle, spawn_sampler};
pub use snapshot::{ProfileSnapshot, SnapshotExporter, growth_ratio};
