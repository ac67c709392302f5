use procwatch::{MemoryStats, RuntimeProbe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A probe returning whatever the test put into it.
#[derive(Debug, Default)]
pub struct FakeProbe {
    threads: AtomicUsize,
    memory: Mutex<MemoryStats>,
}

impl FakeProbe {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: AtomicUsize::new(threads),
            memory: Mutex::new(MemoryStats {
                alloc_bytes: 2048,
                total_alloc_bytes: 1024 * 1024,
                gc_cycles: 0,
                mallocs: 100,
                frees: 40,
            }),
        }
    }

    pub fn set_threads(&self, threads: usize) {
        self.threads.store(threads, Ordering::SeqCst);
    }

    pub fn set_memory(&self, stats: MemoryStats) {
        *self.memory.lock().unwrap() = stats;
    }
}

impl RuntimeProbe for FakeProbe {
    fn live_threads(&self) -> usize {
        self.threads.load(Ordering::SeqCst)
    }

    fn memory_stats(&self) -> MemoryStats {
        *self.memory.lock().unwrap()
    }
}
