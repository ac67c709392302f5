/// procwatch - runtime introspection for long-running processes
///
/// This library samples thread and heap statistics of the current process on
/// a fixed interval, hands each snapshot to a caller-supplied callback, and
/// can expose a small set of profiling routes over HTTP.
pub mod allocator;
pub mod category;
pub mod cli;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod formatting;
pub mod introspection;
pub mod pprof;
pub mod scheduler;
pub mod task_manager;

// Re-export the types most embedders need.
pub use allocator::CountingAllocator;
pub use category::MetricCategory;
pub use collector::{MetricCollector, ProcessProbe};
pub use config::SchedulerConfig;
pub use core::{MemoryStats, RuntimeProbe, Snapshot, TracingSink, VerboseSink};
pub use error::ConfigError;
pub use scheduler::{LifecycleState, Scheduler, SnapshotCallback};
