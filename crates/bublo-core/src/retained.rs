use indexmap::IndexMap;

use crate::node::{NodeKey, VNode};
use crate::surface::{HandleId, ListenerId, Surface};

/// Event name to the listener currently attached for it.
pub type ListenerRegistry = IndexMap<String, ListenerId>;

/// Live counterpart of a [`VNode`] on the render surface.
#[derive(Debug)]
pub struct RetainedNode {
    handle: HandleId,
    vnode: VNode,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) children: Vec<RetainedNode>,
    text_fallback: bool,
}

impl RetainedNode {
    pub(crate) fn new(handle: HandleId, vnode: VNode) -> Self {
        Self {
            handle,
            vnode,
            listeners: ListenerRegistry::new(),
            children: Vec::new(),
            text_fallback: false,
        }
    }

    /// A tagged node whose tag the surface rejected, materialized as text.
    pub(crate) fn fallback(handle: HandleId, vnode: VNode) -> Self {
        Self {
            text_fallback: true,
            ..Self::new(handle, vnode)
        }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn vnode(&self) -> &VNode {
        &self.vnode
    }

    pub(crate) fn set_vnode(&mut self, vnode: VNode) {
        self.vnode = vnode;
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.vnode.key()
    }

    pub fn children(&self) -> &[RetainedNode] {
        &self.children
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn is_text_fallback(&self) -> bool {
        self.text_fallback
    }

    /// Listeners attached across this subtree.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
            + self
                .children
                .iter()
                .map(RetainedNode::listener_count)
                .sum::<usize>()
    }

    /// Detaches every listener in this subtree from the surface.
    pub(crate) fn detach_listeners(&mut self, surface: &mut dyn Surface) {
        for (event, listener) in self.listeners.drain(..) {
            if let Err(err) = surface.remove_listener(self.handle, listener) {
                log::warn!("failed to detach `{event}` listener: {err}");
            }
        }
        for child in &mut self.children {
            child.detach_listeners(surface);
        }
    }
}
