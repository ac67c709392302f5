//! # Counting Allocator
//!
//! A [`GlobalAlloc`] wrapper around the system allocator that keeps
//! process-wide allocation counters. Rust has no managed heap to query, so a
//! host that wants real heap statistics in its snapshots installs this type:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: procwatch::CountingAllocator = procwatch::CountingAllocator;
//! ```
//!
//! Without it, [`ProcessProbe`](crate::ProcessProbe) falls back to the
//! resident set size reported by the operating system.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static TOTAL_ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// System allocator that records every allocation and deallocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

/// A point-in-time copy of the allocator counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocationCounters {
    /// Bytes currently allocated and not yet freed.
    pub allocated_bytes: u64,
    /// Bytes allocated since the process started.
    pub total_allocated_bytes: u64,
    /// Number of allocations since the process started.
    pub allocations: u64,
    /// Number of deallocations since the process started.
    pub deallocations: u64,
}

impl CountingAllocator {
    /// Reads the counters, or `None` when the allocator was never installed.
    pub fn counters() -> Option<AllocationCounters> {
        let allocations = ALLOCATIONS.load(Ordering::Relaxed);
        if allocations == 0 {
            return None;
        }
        Some(AllocationCounters {
            allocated_bytes: ALLOCATED_BYTES.load(Ordering::Relaxed),
            total_allocated_bytes: TOTAL_ALLOCATED_BYTES.load(Ordering::Relaxed),
            allocations,
            deallocations: DEALLOCATIONS.load(Ordering::Relaxed),
        })
    }

    fn record_alloc(size: usize) {
        let size = size as u64;
        ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed);
        TOTAL_ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed);
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dealloc(size: usize) {
        ALLOCATED_BYTES.fetch_sub(size as u64, Ordering::Relaxed);
        DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    }
}

// The counters must not allocate: everything here is a relaxed atomic update.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        Self::record_dealloc(layout.size());
    }

    /// A successful reallocation counts as one free of the old block and one
    /// allocation of the new block.
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            Self::record_dealloc(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}
