//! # Process Probe
//!
//! The default [`RuntimeProbe`]: reads thread and memory figures for the
//! current process.
//!
//! Thread counts come from `/proc/self/task` on Linux and from the `sysinfo`
//! task list elsewhere. Heap counters come from the [`CountingAllocator`]
//! when the host installed it as its global allocator; otherwise the resident
//! set size reported by `sysinfo` stands in for both the current and the
//! cumulative byte count, and the remaining counters read zero.

use crate::allocator::CountingAllocator;
use crate::core::{MemoryStats, RuntimeProbe};
use sysinfo::{Pid, System};

/// Reads runtime figures for the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessProbe;

impl ProcessProbe {
    pub fn new() -> Self {
        Self
    }

    /// Refreshes `sysinfo` for this process only and applies `read` to it.
    fn with_process<T>(read: impl FnOnce(&sysinfo::Process) -> T) -> Option<T> {
        let pid: Pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(read)
    }

    #[cfg(target_os = "linux")]
    fn proc_task_count() -> Option<usize> {
        std::fs::read_dir("/proc/self/task")
            .ok()
            .map(|entries| entries.count())
    }

    #[cfg(not(target_os = "linux"))]
    fn proc_task_count() -> Option<usize> {
        None
    }
}

impl RuntimeProbe for ProcessProbe {
    fn live_threads(&self) -> usize {
        Self::proc_task_count()
            .or_else(|| Self::with_process(|p| p.tasks().map(|t| t.len())).flatten())
            // A running process has at least the thread asking.
            .unwrap_or(1)
    }

    fn memory_stats(&self) -> MemoryStats {
        match CountingAllocator::counters() {
            Some(counters) => MemoryStats {
                alloc_bytes: counters.allocated_bytes,
                total_alloc_bytes: counters.total_allocated_bytes,
                gc_cycles: 0,
                mallocs: counters.allocations,
                frees: counters.deallocations,
            },
            None => {
                let resident = Self::with_process(|p| p.memory()).unwrap_or(0);
                MemoryStats {
                    alloc_bytes: resident,
                    // Nothing counts cumulative bytes here; never report less
                    // than what is held right now.
                    total_alloc_bytes: resident,
                    ..Default::default()
                }
            }
        }
    }
}
