//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for hosts that run
//! their own event loop. Construct a [`StdRuntime`], hand its runtime to
//! [`bublo_core::Renderer::with_runtime`], and flush whenever
//! [`StdRuntime::take_flush_request`] reports pending work.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::task::Waker;

use bublo_core::{Runtime, RuntimeHandle, RuntimeScheduler};
use futures_task::ArcWake;

type FlushWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records flush requests in atomics and optionally pokes the
/// host through a registered waker.
pub struct StdScheduler {
    flush_requested: AtomicBool,
    requests: AtomicUsize,
    flush_waker: RwLock<Option<FlushWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            flush_requested: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            flush_waker: RwLock::new(None),
        }
    }

    /// Returns whether a flush has been requested since the last call.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    pub fn is_flush_requested(&self) -> bool {
        self.flush_requested.load(Ordering::SeqCst)
    }

    /// Number of flush requests received over the scheduler's lifetime.
    pub fn total_flush_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Registers a callback invoked whenever a new flush is requested.
    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_flush_waker(&self) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Task waker that requests a flush when woken, so futures resolving
    /// off the UI thread can nudge the host loop.
    pub fn waker(self: &Arc<Self>) -> Waker {
        futures_task::waker(Arc::clone(self))
    }

    fn wake(&self) {
        let waker = self
            .flush_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "flush_requested",
                &self.flush_requested.load(Ordering::SeqCst),
            )
            .field("requests", &self.requests.load(Ordering::SeqCst))
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_flush(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.flush_requested.store(true, Ordering::SeqCst);
        log::trace!("flush requested");
        self.wake();
    }

    fn cancel_flush(&self) {
        self.flush_requested.store(false, Ordering::SeqCst);
    }
}

impl ArcWake for StdScheduler {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.schedule_flush();
    }
}

/// Convenience container bundling the standard scheduler with a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    /// Returns a [`bublo_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a flush was requested since the last poll.
    pub fn take_flush_request(&self) -> bool {
        self.scheduler.take_flush_request()
    }

    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_flush_waker(waker);
    }

    pub fn clear_flush_waker(&self) {
        self.scheduler.clear_flush_waker();
    }

    pub fn waker(&self) -> Waker {
        self.scheduler.waker()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
