#![doc = r"Core of the Bublo retained-mode UI engine: virtual nodes, the render surface abstraction, reconciliation, hooks and render scheduling."]

pub mod applier;
pub mod collections;
pub mod hooks;
pub mod memory_surface;
pub mod node;
pub mod platform;
pub mod props;
pub mod reconciler;
pub mod renderer;
pub mod retained;
pub mod runtime;
pub mod surface;

pub use applier::PropertyApplier;
pub use hooks::{
    Dep, Deps, EffectResult, HookCategory, HookCounts, HookMismatch, HookOrderError, Ref,
    RenderScope, StateSetter,
};
pub use memory_surface::{MemorySurface, MutationStats, SurfaceNode, SurfaceNodeKind};
pub use node::{compatible, make_node, Child, Element, NodeKey, Primitive, VNode};
pub use platform::RuntimeScheduler;
pub use props::{EventHandler, PropValue, PropertyConventions, PropertyKind, Props, Style};
pub use reconciler::Reconciler;
pub use renderer::{FlushReport, RenderStats, Renderer, RendererConfig, View};
pub use retained::{ListenerRegistry, RetainedNode};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use surface::{Event, HandleId, ListenerId, Surface, SurfaceError};

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identity of a [`View`]; shared by its clones.
pub type ViewId = usize;
/// Render target registered with a [`Renderer`].
pub type TargetId = usize;

static NEXT_VIEW_ID: AtomicUsize = AtomicUsize::new(1);

fn next_view_id() -> ViewId {
    NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    UnknownTarget { target: TargetId },
    ViewPanicked { target: TargetId, message: String },
    HookOrder(HookOrderError),
    Surface(SurfaceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownTarget { target } => write!(f, "render target {target} not registered"),
            RenderError::ViewPanicked { target, message } => {
                write!(f, "view rendering into target {target} panicked: {message}")
            }
            RenderError::HookOrder(err) => write!(f, "hook order violated: {err}"),
            RenderError::Surface(err) => write!(f, "surface error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::HookOrder(err) => Some(err),
            RenderError::Surface(err) => Some(err),
            RenderError::UnknownTarget { .. } | RenderError::ViewPanicked { .. } => None,
        }
    }
}

impl From<SurfaceError> for RenderError {
    fn from(err: SurfaceError) -> Self {
        RenderError::Surface(err)
    }
}

impl From<HookOrderError> for RenderError {
    fn from(err: HookOrderError) -> Self {
        RenderError::HookOrder(err)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
