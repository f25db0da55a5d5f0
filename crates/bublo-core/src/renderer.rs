//! Render targets, batching and the render → patch → effects cycle.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collections::map::HashMap;
use crate::hooks::{HookStore, RenderScope};
use crate::node::{compatible, VNode};
use crate::props::PropertyConventions;
use crate::reconciler::Reconciler;
use crate::retained::RetainedNode;
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};
use crate::surface::{HandleId, Surface, SurfaceError};
use crate::{next_view_id, panic_message, RenderError, TargetId, ViewId};

type RenderFn = dyn Fn(&mut RenderScope<'_>) -> VNode;

/// A UI-producing function.
///
/// Hook cells are keyed by the view's id, so a view must be created once and
/// cloned for later requests; two `View::new` calls never share state.
#[derive(Clone)]
pub struct View {
    id: ViewId,
    render: Rc<RenderFn>,
}

impl View {
    pub fn new(render: impl Fn(&mut RenderScope<'_>) -> VNode + 'static) -> Self {
        Self {
            id: next_view_id(),
            render: Rc::new(render),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    fn invoke(&self, scope: &mut RenderScope<'_>) -> VNode {
        (self.render)(scope)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").field("id", &self.id).finish()
    }
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub conventions: PropertyConventions,
    /// Fail renders whose hook calls differ from the previous render.
    pub strict_hook_order: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            conventions: PropertyConventions::default(),
            strict_hook_order: cfg!(debug_assertions),
        }
    }
}

/// Outcome of one [`Renderer::flush`].
#[derive(Debug, Default)]
pub struct FlushReport {
    pub rendered: Vec<TargetId>,
    pub failed: Vec<(TargetId, RenderError)>,
    /// Wall time spent rendering, patching and running effects.
    pub elapsed: Duration,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty() && self.failed.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Running totals over every entry this renderer has processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub renders: usize,
    pub failures: usize,
    pub total_time: Duration,
}

impl RenderStats {
    /// Mean time per successful render, or zero before the first one.
    pub fn average_render_time(&self) -> Duration {
        match u32::try_from(self.renders) {
            Ok(0) => Duration::ZERO,
            Ok(renders) => self.total_time / renders,
            Err(_) => self.total_time.div_f64(self.renders as f64),
        }
    }

    fn record(&mut self, elapsed: Duration, ok: bool) {
        if ok {
            self.renders += 1;
            self.total_time += elapsed;
        } else {
            self.failures += 1;
        }
    }
}

struct RenderTarget {
    container: HandleId,
    root: Option<RetainedNode>,
    view: Option<View>,
}

pub struct Renderer<S: Surface> {
    surface: S,
    runtime: Runtime,
    reconciler: Reconciler,
    hooks: HookStore,
    targets: HashMap<TargetId, RenderTarget>,
    next_target: TargetId,
    strict_hook_order: bool,
    stats: RenderStats,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S) -> Self {
        Self::with_runtime(surface, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(surface: S, runtime: Runtime) -> Self {
        Self::with_config(surface, runtime, RendererConfig::default())
    }

    pub fn with_config(surface: S, runtime: Runtime, config: RendererConfig) -> Self {
        Self {
            surface,
            runtime,
            reconciler: Reconciler::new(config.conventions),
            hooks: HookStore::default(),
            targets: HashMap::default(),
            next_target: 1,
            strict_hook_order: config.strict_hook_order,
            stats: RenderStats::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Registers `container` as a render target.
    pub fn create_target(&mut self, container: HandleId) -> TargetId {
        let id = self.next_target;
        self.next_target += 1;
        self.targets.insert(
            id,
            RenderTarget {
                container,
                root: None,
                view: None,
            },
        );
        id
    }

    pub fn container(&self, target: TargetId) -> Option<HandleId> {
        self.targets.get(&target).map(|entry| entry.container)
    }

    pub fn retained_root(&self, target: TargetId) -> Option<&RetainedNode> {
        self.targets.get(&target).and_then(|entry| entry.root.as_ref())
    }

    /// Queues `view` for `target`, replacing any pending request for it.
    pub fn request_render(&self, view: &View, target: TargetId) -> Result<(), RenderError> {
        if !self.targets.contains_key(&target) {
            return Err(RenderError::UnknownTarget { target });
        }
        self.runtime.enqueue(target, view.clone());
        Ok(())
    }

    pub fn render(&self, view: &View, target: TargetId) -> Result<(), RenderError> {
        self.request_render(view, target)
    }

    /// Renders now instead of waiting for the scheduled flush. Everything
    /// already queued is flushed along with it.
    pub fn render_sync(&mut self, view: &View, target: TargetId) -> Result<FlushReport, RenderError> {
        if !self.targets.contains_key(&target) {
            return Err(RenderError::UnknownTarget { target });
        }
        self.runtime.enqueue(target, view.clone());
        self.runtime.cancel_flush();
        Ok(self.flush())
    }

    pub fn has_pending(&self) -> bool {
        self.runtime.has_pending()
    }

    pub fn should_flush(&self) -> bool {
        self.has_pending()
    }

    /// Processes every queued request. Requests made while flushing land in
    /// the next flush. A failing entry is logged and reported; the others
    /// still render.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let queue = self.runtime.take_queue();
        log::trace!("flushing {} render request(s)", queue.len());
        let flush_start = Instant::now();
        for (target, view) in queue {
            let started = Instant::now();
            let result = self.render_entry(target, view);
            self.stats.record(started.elapsed(), result.is_ok());
            match result {
                Ok(()) => report.rendered.push(target),
                Err(err) => {
                    log::error!("render of target {target} failed: {err}");
                    report.failed.push((target, err));
                }
            }
        }
        report.elapsed = flush_start.elapsed();
        if !report.is_empty() {
            log::debug!(
                "flushed {} target(s) in {:?} (average render {:?})",
                report.rendered.len() + report.failed.len(),
                report.elapsed,
                self.stats.average_render_time()
            );
        }
        report
    }

    /// Render counts and timings accumulated since construction.
    pub fn render_stats(&self) -> RenderStats {
        self.stats
    }

    /// Tears down the target's retained tree and hook cells. The target stays
    /// registered, so a later render mounts from scratch.
    pub fn remove_render_target(&mut self, target: TargetId) -> Result<(), RenderError> {
        let entry = self
            .targets
            .get_mut(&target)
            .ok_or(RenderError::UnknownTarget { target })?;
        entry.view = None;
        let root = entry.root.take();
        let container = entry.container;
        self.runtime.forget_view(target);
        self.hooks.discard_target(target);
        if let Some(root) = root {
            self.reconciler.unmount(&mut self.surface, container, root)?;
        }
        Ok(())
    }

    /// Swaps the target's content for a freshly mounted `vnode` right away.
    pub fn replace_render_target(&mut self, target: TargetId, vnode: &VNode) -> Result<(), RenderError> {
        let entry = self
            .targets
            .get_mut(&target)
            .ok_or(RenderError::UnknownTarget { target })?;
        let old = entry.root.take();
        let root = mount_fresh(&self.reconciler, &mut self.surface, entry.container, old, vnode)?;
        entry.root = Some(root);
        Ok(())
    }

    fn render_entry(&mut self, target: TargetId, view: View) -> Result<(), RenderError> {
        let entry = self
            .targets
            .get_mut(&target)
            .ok_or(RenderError::UnknownTarget { target })?;
        if let Some(previous) = entry.view.replace(view.clone()) {
            if previous.id() != view.id() {
                self.hooks.discard(previous.id(), target);
            }
        }
        self.runtime.record_view(target, view.clone());

        let slots = self.hooks.slots_mut(view.id(), target);
        let mut scope = RenderScope::new(
            slots,
            self.runtime.handle(),
            view.id(),
            target,
            self.strict_hook_order,
        );
        let vnode = panic::catch_unwind(AssertUnwindSafe(|| view.invoke(&mut scope))).map_err(
            |payload| RenderError::ViewPanicked {
                target,
                message: panic_message(&*payload),
            },
        )?;
        let effects = scope.finish()?;

        let entry = self
            .targets
            .get_mut(&target)
            .ok_or(RenderError::UnknownTarget { target })?;
        let container = entry.container;
        // Dropped on failure; the next render mounts fresh.
        let old = entry.root.take();
        let attached = old
            .as_ref()
            .is_some_and(|old| self.surface.child_at(container, 0) == Some(old.handle()));
        if old.is_some() && !attached {
            log::debug!("target {target} lost its root; mounting fresh");
        }
        let root = match old {
            Some(old) if attached && compatible(old.vnode(), &vnode) => self
                .reconciler
                .patch(&mut self.surface, container, Some(old), Some(&vnode), 0)?,
            old => Some(mount_fresh(
                &self.reconciler,
                &mut self.surface,
                container,
                old,
                &vnode,
            )?),
        };
        entry.root = root;

        for effect in effects {
            effect.run();
        }
        Ok(())
    }
}

/// Clears `container` and mounts `vnode` as its only child.
fn mount_fresh(
    reconciler: &Reconciler,
    surface: &mut dyn Surface,
    container: HandleId,
    old: Option<RetainedNode>,
    vnode: &VNode,
) -> Result<RetainedNode, SurfaceError> {
    let root = reconciler.mount(surface, vnode)?;
    let stale = old.map(|mut old| {
        old.detach_listeners(surface);
        old.handle()
    });
    while let Some(child) = surface.child_at(container, 0) {
        surface.remove_child(container, child)?;
        surface.release(child);
    }
    // A root the host already detached is no longer reachable from the container.
    if let Some(stale) = stale {
        surface.release(stale);
    }
    surface.append_children(container, &[root.handle()])?;
    Ok(root)
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
