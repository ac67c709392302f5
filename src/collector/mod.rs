//! # Metric Collector
//!
//! Turns a selector and a [`RuntimeProbe`] reading into a [`Snapshot`] of
//! human-readable strings.
//!
//! Collection is a pure query against the probe: it has no side effects on
//! the monitored process and no error path.

use crate::category::MetricCategory;
use crate::core::{MemoryStats, RuntimeProbe, Snapshot};
use crate::formatting::{format_bytes, format_magnitude};
use std::sync::Arc;

pub mod process;

pub use process::ProcessProbe;

/// Collects the selected metric categories from a probe.
#[derive(Clone)]
pub struct MetricCollector {
    probe: Arc<dyn RuntimeProbe>,
}

impl std::fmt::Debug for MetricCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCollector").finish_non_exhaustive()
    }
}

impl Default for MetricCollector {
    fn default() -> Self {
        Self::new(Arc::new(ProcessProbe::new()))
    }
}

impl MetricCollector {
    pub fn new(probe: Arc<dyn RuntimeProbe>) -> Self {
        Self { probe }
    }

    /// Collects one snapshot containing exactly the categories in `selector`.
    pub fn collect(&self, selector: MetricCategory) -> Snapshot {
        let mut snapshot = Snapshot::new();

        if selector.contains(MetricCategory::THREADS) {
            snapshot.insert(MetricCategory::THREADS, self.probe.live_threads().to_string());
        }

        if selector.contains(MetricCategory::MEMORY) {
            snapshot.insert(
                MetricCategory::MEMORY,
                render_memory(&self.probe.memory_stats()),
            );
        }

        snapshot
    }

    /// The probe backing this collector.
    pub fn probe(&self) -> &Arc<dyn RuntimeProbe> {
        &self.probe
    }
}

/// Renders heap counters as one `Label: value` line per field.
pub fn render_memory(stats: &MemoryStats) -> String {
    [
        format!("Allocated: {}", format_bytes(stats.alloc_bytes)),
        format!("Total allocated: {}", format_bytes(stats.total_alloc_bytes)),
        format!("GC cycles: {}", format_magnitude(stats.gc_cycles, "")),
        format!("Allocations: {}", format_magnitude(stats.mallocs, "")),
        format!("Deallocations: {}", format_magnitude(stats.frees, "")),
        format!("Live objects: {}", format_magnitude(stats.live_objects(), "")),
    ]
    .join("\n")
}
