use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::platform::RuntimeScheduler;
use crate::renderer::View;
use crate::TargetId;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    queue: RefCell<IndexMap<TargetId, View>>,
    flush_scheduled: Cell<bool>,
    views: RefCell<HashMap<TargetId, View>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            queue: RefCell::new(IndexMap::new()),
            flush_scheduled: Cell::new(false),
            views: RefCell::new(HashMap::default()),
        }
    }

    /// Last writer wins; a target already queued keeps its position.
    fn enqueue(&self, target: TargetId, view: View) {
        self.queue.borrow_mut().insert(target, view);
        if !self.flush_scheduled.replace(true) {
            log::trace!("scheduling flush for target {target}");
            self.scheduler.schedule_flush();
        }
    }

    fn request_rerender(&self, target: TargetId) {
        let view = self.views.borrow().get(&target).cloned();
        match view {
            Some(view) => self.enqueue(target, view),
            None => log::debug!("ignoring re-render of target {target}: nothing rendered there"),
        }
    }

    fn take_queue(&self) -> Vec<(TargetId, View)> {
        self.flush_scheduled.set(false);
        self.queue.borrow_mut().drain(..).collect()
    }

    fn cancel_flush(&self) {
        if self.flush_scheduled.replace(false) {
            self.scheduler.cancel_flush();
        }
    }

    fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }
}

/// Render queue and flush bookkeeping shared by a renderer and the state
/// setters it hands out.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn flush_scheduled(&self) -> bool {
        self.inner.flush_scheduled.get()
    }

    pub fn pending_targets(&self) -> Vec<TargetId> {
        self.inner.queue.borrow().keys().copied().collect()
    }

    pub(crate) fn enqueue(&self, target: TargetId, view: View) {
        self.inner.enqueue(target, view);
    }

    pub(crate) fn take_queue(&self) -> Vec<(TargetId, View)> {
        self.inner.take_queue()
    }

    pub(crate) fn cancel_flush(&self) {
        self.inner.cancel_flush();
    }

    pub(crate) fn record_view(&self, target: TargetId, view: View) {
        self.inner.views.borrow_mut().insert(target, view);
    }

    pub(crate) fn forget_view(&self, target: TargetId) {
        self.inner.views.borrow_mut().remove(&target);
    }
}

/// Weak handle to a [`Runtime`]; requests made after the runtime is gone are
/// dropped.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    /// Queues the view last rendered into `target` for the next flush.
    pub fn request_rerender(&self, target: TargetId) {
        match self.0.upgrade() {
            Some(inner) => inner.request_rerender(target),
            None => log::trace!("runtime dropped; re-render of target {target} ignored"),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingScheduler {
        scheduled: AtomicUsize,
        cancelled: AtomicUsize,
    }

    impl RuntimeScheduler for CountingScheduler {
        fn schedule_flush(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }

        fn cancel_flush(&self) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn view(tag: &'static str) -> View {
        View::new(move |_| node!(tag))
    }

    #[test]
    fn requests_coalesce_into_one_flush() {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        runtime.enqueue(1, view("a"));
        runtime.enqueue(2, view("b"));
        runtime.enqueue(1, view("c"));
        assert_eq!(scheduler.scheduled.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.pending_targets(), vec![1, 2]);

        let queue = runtime.take_queue();
        assert_eq!(queue.len(), 2);
        assert!(!runtime.flush_scheduled());
        assert!(!runtime.has_pending());

        runtime.enqueue(1, view("d"));
        assert_eq!(scheduler.scheduled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn last_request_wins() {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let first = view("a");
        let second = view("b");
        runtime.enqueue(7, first);
        runtime.enqueue(7, second.clone());
        let queue = runtime.take_queue();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].1.id(), second.id());
    }

    #[test]
    fn rerender_uses_recorded_view() {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let handle = runtime.handle();
        handle.request_rerender(3);
        assert!(!runtime.has_pending());

        let recorded = view("a");
        runtime.record_view(3, recorded.clone());
        handle.request_rerender(3);
        let queue = runtime.take_queue();
        assert_eq!(queue[0].1.id(), recorded.id());

        runtime.forget_view(3);
        handle.request_rerender(3);
        assert!(!runtime.has_pending());
    }

    #[test]
    fn cancel_only_withdraws_outstanding_requests() {
        let scheduler = Arc::new(CountingScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        runtime.cancel_flush();
        assert_eq!(scheduler.cancelled.load(Ordering::SeqCst), 0);
        runtime.enqueue(1, view("a"));
        runtime.cancel_flush();
        assert_eq!(scheduler.cancelled.load(Ordering::SeqCst), 1);
        assert!(runtime.has_pending());
    }

    #[test]
    fn handle_outliving_runtime_is_inert() {
        let runtime = Runtime::new(Arc::new(DefaultScheduler));
        let handle = runtime.handle();
        drop(runtime);
        assert!(!handle.is_alive());
        handle.request_rerender(1);
    }
}
