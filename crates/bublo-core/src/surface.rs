//! Render surface abstraction.
//!
//! A surface owns the persistent, host-side nodes that the reconciler
//! mutates. Handles are plain ids; the surface decides what they point at.

use crate::props::EventHandler;

pub type HandleId = usize;
pub type ListenerId = u64;

/// Event delivered to an [`EventHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub target: HandleId,
    pub value: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: HandleId) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    Missing { id: HandleId },
    NotAnElement { id: HandleId },
    NotText { id: HandleId },
    NotAChild { parent: HandleId, child: HandleId },
    UnknownListener { id: HandleId, listener: ListenerId },
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::Missing { id } => write!(f, "surface node {id} missing"),
            SurfaceError::NotAnElement { id } => write!(f, "surface node {id} is not an element"),
            SurfaceError::NotText { id } => write!(f, "surface node {id} is not a text node"),
            SurfaceError::NotAChild { parent, child } => {
                write!(f, "surface node {child} is not a child of {parent}")
            }
            SurfaceError::UnknownListener { id, listener } => {
                write!(f, "listener {listener} not attached to surface node {id}")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

pub trait Surface {
    /// Whether `tag` names an element type this surface can create.
    fn supports_tag(&self, tag: &str) -> bool {
        !tag.is_empty()
    }

    fn create_element(&mut self, tag: &str) -> HandleId;
    fn create_text(&mut self, text: &str) -> HandleId;
    fn set_text(&mut self, node: HandleId, text: &str) -> Result<(), SurfaceError>;

    fn set_attribute(&mut self, node: HandleId, name: &str, value: &str)
        -> Result<(), SurfaceError>;
    fn remove_attribute(&mut self, node: HandleId, name: &str) -> Result<(), SurfaceError>;
    fn set_style(&mut self, node: HandleId, property: &str, value: &str)
        -> Result<(), SurfaceError>;
    fn remove_style(&mut self, node: HandleId, property: &str) -> Result<(), SurfaceError>;
    /// Replaces the node's inline style with verbatim declarations.
    fn set_style_text(&mut self, node: HandleId, css: &str) -> Result<(), SurfaceError>;
    /// Drops every inline declaration, whether set per property or verbatim.
    /// Plain attributes are untouched, including one literally named `style`.
    fn clear_styles(&mut self, node: HandleId) -> Result<(), SurfaceError>;
    /// Replaces the node's content wholesale with host markup.
    fn set_raw_markup(&mut self, node: HandleId, markup: &str) -> Result<(), SurfaceError>;

    fn add_listener(
        &mut self,
        node: HandleId,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId, SurfaceError>;
    fn remove_listener(&mut self, node: HandleId, listener: ListenerId)
        -> Result<(), SurfaceError>;

    /// Inserts `child` under `parent` before `before`, or appends when
    /// `before` is `None`. A child that is already attached is moved.
    fn insert_before(
        &mut self,
        parent: HandleId,
        child: HandleId,
        before: Option<HandleId>,
    ) -> Result<(), SurfaceError>;

    /// Appends `children` in order as one batched insertion.
    fn append_children(
        &mut self,
        parent: HandleId,
        children: &[HandleId],
    ) -> Result<(), SurfaceError> {
        for &child in children {
            self.insert_before(parent, child, None)?;
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: HandleId, child: HandleId) -> Result<(), SurfaceError>;

    /// Frees `node` and its descendants. Releasing an unknown handle is a no-op.
    fn release(&mut self, node: HandleId);

    fn child_at(&self, parent: HandleId, index: usize) -> Option<HandleId>;
    fn child_count(&self, parent: HandleId) -> usize;
}
