//! Platform abstraction for the render runtime.
//!
//! The runtime never drives its own loop. It asks the host for a flush and
//! the host calls [`crate::Renderer::flush`] when it gets around to it.

/// Schedules deferred render flushes on behalf of the runtime.
///
/// Implementations must be safe to share across threads so hosts can wake
/// their event loop from anywhere, even though rendering itself happens on
/// a single thread.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host run one flush soon.
    fn schedule_flush(&self);

    /// Withdraw an outstanding flush request. Called when the runtime
    /// flushes synchronously ahead of the scheduled pass.
    fn cancel_flush(&self) {}
}
