use bublo_core::{
    Event, FlushReport, HandleId, MemorySurface, MutationStats, RenderError, Renderer,
    RendererConfig, RetainedNode, Surface, TargetId, View,
};
use bublo_runtime_std::StdRuntime;

/// Upper bound on flushes per [`TestRenderer::pump_until_idle`] call. A view
/// that keeps scheduling itself hits this instead of hanging the test.
const MAX_PUMPED_FLUSHES: usize = 64;

/// Headless harness for exercising views in tests.
///
/// Owns a [`Renderer`] over a [`MemorySurface`] with a single `root`
/// container registered as its target, and exposes helpers for driving
/// flushes and dispatching events without a real host.
pub struct TestRenderer {
    runtime: StdRuntime,
    renderer: Renderer<MemorySurface>,
    container: HandleId,
    target: TargetId,
    content: Option<View>,
}

impl TestRenderer {
    /// Create a harness with strict hook-order checking.
    pub fn new() -> Self {
        Self::with_config(RendererConfig {
            strict_hook_order: true,
            ..RendererConfig::default()
        })
    }

    pub fn with_config(config: RendererConfig) -> Self {
        let runtime = StdRuntime::new();
        let mut surface = MemorySurface::new();
        let container = surface.create_container("root");
        let mut renderer = Renderer::with_config(surface, runtime.runtime(), config);
        let target = renderer.create_target(container);
        Self {
            runtime,
            renderer,
            container,
            target,
            content: None,
        }
    }

    /// Install `view` as the harness content and render it synchronously.
    pub fn set_content(&mut self, view: View) -> Result<FlushReport, RenderError> {
        let report = self.renderer.render_sync(&view, self.target)?;
        self.content = Some(view);
        Ok(report)
    }

    /// Queue another render of the installed content.
    pub fn request(&mut self) -> Result<(), RenderError> {
        match &self.content {
            Some(view) => self.renderer.request_render(view, self.target),
            None => Ok(()),
        }
    }

    /// Flush until nothing is queued. Returns the number of flushes run;
    /// the first failed entry is returned as an error.
    pub fn pump_until_idle(&mut self) -> Result<usize, RenderError> {
        let mut flushes = 0;
        while self.renderer.should_flush() {
            if flushes == MAX_PUMPED_FLUSHES {
                log::warn!("render queue still busy after {flushes} flushes");
                break;
            }
            self.runtime.take_flush_request();
            let report = self.renderer.flush();
            flushes += 1;
            if let Some((_, err)) = report.failed.into_iter().next() {
                return Err(err);
            }
        }
        Ok(flushes)
    }

    /// Dispatch `event` to the first node under the root whose `id`
    /// attribute equals `id`. Returns the number of handlers invoked.
    pub fn dispatch(&self, id: &str, event: &str) -> usize {
        self.dispatch_event(id, event, None)
    }

    /// Like [`TestRenderer::dispatch`], with an event value such as the text
    /// of an input.
    pub fn dispatch_value(&self, id: &str, event: &str, value: &str) -> usize {
        self.dispatch_event(id, event, Some(value))
    }

    fn dispatch_event(&self, id: &str, event: &str, value: Option<&str>) -> usize {
        let surface = self.renderer.surface();
        let Some(node) = surface.find_by_attribute(self.container, "id", id) else {
            log::warn!("no node with id `{id}` to receive `{event}`");
            return 0;
        };
        let mut event = Event::new(event, node);
        if let Some(value) = value {
            event = event.with_value(value);
        }
        surface.dispatch(&event)
    }

    pub fn find(&self, id: &str) -> Option<HandleId> {
        self.renderer
            .surface()
            .find_by_attribute(self.container, "id", id)
    }

    /// Serialized content of the root container.
    pub fn markup(&self) -> String {
        self.renderer.surface().inner_markup(self.container)
    }

    pub fn dump_tree(&self) -> String {
        self.renderer.surface().dump_tree(Some(self.container))
    }

    pub fn stats(&self) -> MutationStats {
        self.renderer.surface().stats()
    }

    pub fn reset_stats(&mut self) {
        self.renderer.surface_mut().reset_stats();
    }

    pub fn root_handle(&self) -> Option<HandleId> {
        self.renderer.surface().child_at(self.container, 0)
    }

    pub fn retained_root(&self) -> Option<&RetainedNode> {
        self.renderer.retained_root(self.target)
    }

    pub fn surface(&self) -> &MemorySurface {
        self.renderer.surface()
    }

    pub fn surface_mut(&mut self) -> &mut MemorySurface {
        self.renderer.surface_mut()
    }

    pub fn renderer(&mut self) -> &mut Renderer<MemorySurface> {
        &mut self.renderer
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn container(&self) -> HandleId {
        self.container
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`TestRenderer`].
pub fn run_test_render<R>(f: impl FnOnce(&mut TestRenderer) -> R) -> R {
    let mut harness = TestRenderer::new();
    f(&mut harness)
}
