#![allow(unsafe_code)]
#![warn(clippy::pedantic)]

//! Heap usage reporting.
//!
//! [`TrackingAlloc`] wraps the system allocator and keeps a count of live
//! bytes. Installed as the `#[global_allocator]` it plays the role of the
//! runtime's heap: [`AllocatorReporter`] reads the count, and an optional
//! budget makes allocations past the configured maximum fail, which aborts
//! the process through the standard allocation error handler.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

pub trait HeapReporter {
    /// Maximum heap size in bytes.
    fn max_bytes(&self) -> u64;
    /// Bytes in use right now. Never cached.
    fn used_bytes(&self) -> u64;
}

impl<T: HeapReporter + ?Sized> HeapReporter for &T {
    fn max_bytes(&self) -> u64 {
        (**self).max_bytes()
    }
    fn used_bytes(&self) -> u64 {
        (**self).used_bytes()
    }
}

/// Budget value meaning "no hard limit".
const UNBOUNDED: usize = 0;

pub struct TrackingAlloc {
    used: AtomicUsize,
    budget: AtomicUsize,
}

impl TrackingAlloc {
    pub const fn new() -> Self {
        Self {
            used: AtomicUsize::new(0),
            budget: AtomicUsize::new(UNBOUNDED),
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Acquire)
    }

    /// `None` removes the limit.
    pub fn set_budget(&self, bytes: Option<usize>) {
        self.budget.store(bytes.unwrap_or(UNBOUNDED), Relaxed);
    }

    pub fn budget(&self) -> Option<usize> {
        match self.budget.load(Relaxed) {
            UNBOUNDED => None,
            b => Some(b),
        }
    }

    /// Account for `size` more bytes, failing if that would pass the budget.
    fn reserve(&self, size: usize) -> bool {
        let budget = self.budget.load(Relaxed);
        let mut used = self.used.load(Acquire);
        loop {
            let Some(next) = used.checked_add(size) else {
                return false;
            };
            if budget != UNBOUNDED && next > budget {
                return false;
            }
            match self.used.compare_exchange(used, next, AcqRel, Acquire) {
                Ok(_) => return true,
                Err(prev) => used = prev,
            }
        }
    }

    fn release(&self, size: usize) {
        self.used.fetch_sub(size, AcqRel);
    }
}

impl Default for TrackingAlloc {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: every call is forwarded to `System` with the caller's layout; the
// counter is only adjusted around it.
unsafe impl GlobalAlloc for TrackingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if !self.reserve(layout.size()) {
            return std::ptr::null_mut();
        }
        let ptr = System.alloc(layout);
        if ptr.is_null() {
            self.release(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        self.release(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if !self.reserve(layout.size()) {
            return std::ptr::null_mut();
        }
        let ptr = System.alloc_zeroed(layout);
        if ptr.is_null() {
            self.release(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        if new_size > old_size && !self.reserve(new_size - old_size) {
            return std::ptr::null_mut();
        }
        let new_ptr = System.realloc(ptr, layout, new_size);
        if new_ptr.is_null() {
            if new_size > old_size {
                self.release(new_size - old_size);
            }
        } else if new_size < old_size {
            self.release(old_size - new_size);
        }
        new_ptr
    }
}

/// Reads a [`TrackingAlloc`] against a configured maximum.
#[derive(Clone, Copy)]
pub struct AllocatorReporter {
    alloc: &'static TrackingAlloc,
    max: u64,
}

impl AllocatorReporter {
    pub fn new(alloc: &'static TrackingAlloc, max: u64) -> Self {
        Self { alloc, max }
    }
}

impl HeapReporter for AllocatorReporter {
    fn max_bytes(&self) -> u64 {
        self.max
    }
    fn used_bytes(&self) -> u64 {
        self.alloc.used() as u64
    }
}
