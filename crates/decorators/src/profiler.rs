//! Heap tracing allocator.
//!
//! [`TracingAllocator`] delegates to the system allocator and, while a tracing
//! session is active, keeps a running total of bytes allocated minus bytes
//! freed plus the highest total seen. A binary opts in with:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: sa360_decorators::TracingAllocator = sa360_decorators::TracingAllocator;
//! ```
//!
//! Without it every snapshot reads zero.
//!
//! Counters are process-wide: allocations from any thread during a session
//! are counted. Frees of blocks allocated before the session started pull
//! the running total down; snapshots clamp it at zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);
static ACTIVE: AtomicBool = AtomicBool::new(false);
static DEPTH: AtomicUsize = AtomicUsize::new(0);
static CURRENT: AtomicIsize = AtomicIsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

/// Global allocator that feeds the tracing counters.
pub struct TracingAllocator;

unsafe impl GlobalAlloc for TracingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            on_free(layout.size());
            on_alloc(new_size);
        }
        new_ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe {
            System.dealloc(ptr, layout);
        }
        on_free(layout.size());
    }
}

#[inline]
fn on_alloc(size: usize) {
    if !INSTALLED.load(Ordering::Relaxed) {
        INSTALLED.store(true, Ordering::Relaxed);
    }
    if !ACTIVE.load(Ordering::Relaxed) {
        return;
    }
    let size = size as isize;
    let now = CURRENT.fetch_add(size, Ordering::SeqCst) + size;
    if now > 0 {
        PEAK.fetch_max(now as usize, Ordering::SeqCst);
    }
}

#[inline]
fn on_free(size: usize) {
    if ACTIVE.load(Ordering::Relaxed) {
        CURRENT.fetch_sub(size as isize, Ordering::SeqCst);
    }
}

/// Traced memory at a point in time, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub current: usize,
    pub peak: usize,
}

impl MemoryUsage {
    pub fn current_mb(&self) -> f64 {
        self.current as f64 / 1_000_000.0
    }

    pub fn peak_mb(&self) -> f64 {
        self.peak as f64 / 1_000_000.0
    }
}

/// Whether [`TracingAllocator`] is the process's global allocator.
///
/// Reads `false` until the allocator has served at least one allocation.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

pub fn is_tracing() -> bool {
    ACTIVE.load(Ordering::SeqCst)
}

/// Begin (or join) a tracing session.
///
/// Only the outermost `start` resets the counters. Returns `true` when this
/// call opened the session.
pub fn start() -> bool {
    if DEPTH.fetch_add(1, Ordering::SeqCst) == 0 {
        CURRENT.store(0, Ordering::SeqCst);
        PEAK.store(0, Ordering::SeqCst);
        ACTIVE.store(true, Ordering::SeqCst);
        true
    } else {
        false
    }
}

/// Leave a tracing session. The last `stop` ends tracing.
///
/// Unbalanced calls are ignored.
pub fn stop() {
    let left = DEPTH.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| {
        depth.checked_sub(1)
    });
    if left == Ok(1) {
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Current and peak traced memory since the session started.
pub fn snapshot() -> MemoryUsage {
    MemoryUsage {
        current: CURRENT.load(Ordering::SeqCst).max(0) as usize,
        peak: PEAK.load(Ordering::SeqCst),
    }
}

/// RAII tracing session: starts on creation, stops on drop (including
/// during unwinding).
#[derive(Debug)]
pub struct TracingSession {
    _private: (),
}

impl TracingSession {
    pub fn begin() -> Self {
        start();
        Self { _private: () }
    }

    pub fn snapshot(&self) -> MemoryUsage {
        snapshot()
    }
}

impl Drop for TracingSession {
    fn drop(&mut self) {
        stop();
    }
}
