//! Core domain types and collaborator traits for procwatch
//!
//! This module defines the snapshot produced by each collection pass and the
//! trait contracts through which the monitor reaches the host runtime and the
//! verbose log sink.

use crate::category::MetricCategory;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Raw heap counters reported by a [`RuntimeProbe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Bytes allocated and still reachable.
    pub alloc_bytes: u64,
    /// Bytes allocated over the lifetime of the process.
    pub total_alloc_bytes: u64,
    /// Completed garbage-collection cycles. Zero for runtimes without a collector.
    pub gc_cycles: u64,
    /// Cumulative allocation count.
    pub mallocs: u64,
    /// Cumulative deallocation count.
    pub frees: u64,
}

impl MemoryStats {
    /// Estimated number of live heap objects.
    pub fn live_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

/// Query interface onto the host runtime.
///
/// Implementations must be cheap enough to call once per tick and must never
/// fail: a reading that cannot be obtained is reported as zero.
pub trait RuntimeProbe: Send + Sync {
    /// Number of live concurrently scheduled units (OS threads).
    fn live_threads(&self) -> usize;

    /// Current heap counters.
    fn memory_stats(&self) -> MemoryStats;
}

/// Destination for verbose lifecycle messages.
pub trait VerboseSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Default sink: forwards each message as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl VerboseSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "procwatch", "{}", message);
    }
}

/// The formatted readings produced by one collection pass.
///
/// Holds exactly one entry per category selected for the pass, ordered by
/// category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<MetricCategory, String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, category: MetricCategory, value: String) {
        self.entries.insert(category, value);
    }

    pub fn get(&self, category: MetricCategory) -> Option<&str> {
        self.entries.get(&category).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = MetricCategory> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricCategory, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (category, value)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}:\n{}", category, value)?;
        }
        Ok(())
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, value) in &self.entries {
            map.serialize_entry(category.key(), value)?;
        }
        map.end()
    }
}
