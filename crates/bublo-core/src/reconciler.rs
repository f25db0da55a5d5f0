//! Diff/patch between a retained tree and a new virtual tree.

use std::mem;

use crate::applier::PropertyApplier;
use crate::collections::map::HashMap;
use crate::node::{compatible, NodeKey, VNode};
use crate::props::{PropertyConventions, Props};
use crate::retained::RetainedNode;
use crate::surface::{HandleId, Surface, SurfaceError};

#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    applier: PropertyApplier,
}

impl Reconciler {
    pub fn new(conventions: PropertyConventions) -> Self {
        Self {
            applier: PropertyApplier::new(conventions),
        }
    }

    pub fn applier(&self) -> &PropertyApplier {
        &self.applier
    }

    /// Materializes `vnode` as a detached subtree.
    pub fn mount(&self, surface: &mut dyn Surface, vnode: &VNode) -> Result<RetainedNode, SurfaceError> {
        let element = match vnode {
            VNode::Text(value) => {
                let handle = surface.create_text(&value.to_text());
                return Ok(RetainedNode::new(handle, vnode.clone()));
            }
            VNode::Element(element) => element,
        };
        if !surface.supports_tag(element.tag()) {
            log::warn!("unsupported tag `{}` rendered as text", element.tag());
            let handle = surface.create_text(element.tag());
            return Ok(RetainedNode::fallback(handle, vnode.clone()));
        }
        let handle = surface.create_element(element.tag());
        let mut node = RetainedNode::new(handle, vnode.clone());
        self.applier
            .apply(surface, handle, &mut node.listeners, &Props::new(), element.props());
        if !element.children().is_empty() {
            node.children = self.mount_all(surface, handle, element.children())?;
        }
        Ok(node)
    }

    /// Detaches listeners in `node`'s subtree, removes it from `parent` and
    /// releases it.
    pub fn unmount(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        mut node: RetainedNode,
    ) -> Result<(), SurfaceError> {
        node.detach_listeners(surface);
        surface.remove_child(parent, node.handle())?;
        surface.release(node.handle());
        Ok(())
    }

    /// Reconciles one child slot of `parent`.
    pub fn patch(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        old: Option<RetainedNode>,
        new: Option<&VNode>,
        index: usize,
    ) -> Result<Option<RetainedNode>, SurfaceError> {
        match (old, new) {
            (None, None) => Ok(None),
            (None, Some(vnode)) => {
                let node = self.mount(surface, vnode)?;
                let before = surface.child_at(parent, index);
                surface.insert_before(parent, node.handle(), before)?;
                Ok(Some(node))
            }
            (Some(node), None) => {
                self.unmount(surface, parent, node)?;
                Ok(None)
            }
            (Some(node), Some(vnode)) if !compatible(node.vnode(), vnode) => {
                self.replace(surface, parent, node, vnode).map(Some)
            }
            (Some(mut node), Some(vnode)) => {
                self.update(surface, &mut node, vnode)?;
                Ok(Some(node))
            }
        }
    }

    /// Reconciles the children of `parent`, returning the retained children in
    /// their new order.
    pub fn reconcile_children(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        old: Vec<RetainedNode>,
        new: &[VNode],
    ) -> Result<Vec<RetainedNode>, SurfaceError> {
        if new.is_empty() {
            for node in old.into_iter().rev() {
                self.unmount(surface, parent, node)?;
            }
            return Ok(Vec::new());
        }
        if old.is_empty() {
            return self.mount_all(surface, parent, new);
        }
        if new.iter().any(|child| child.key().is_some()) {
            self.reconcile_keyed(surface, parent, old, new)
        } else {
            self.reconcile_positional(surface, parent, old, new)
        }
    }

    fn replace(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        old: RetainedNode,
        vnode: &VNode,
    ) -> Result<RetainedNode, SurfaceError> {
        let node = self.mount(surface, vnode)?;
        surface.insert_before(parent, node.handle(), Some(old.handle()))?;
        self.unmount(surface, parent, old)?;
        Ok(node)
    }

    /// Patches a compatible live node in place.
    fn update(
        &self,
        surface: &mut dyn Surface,
        node: &mut RetainedNode,
        vnode: &VNode,
    ) -> Result<(), SurfaceError> {
        if node.vnode().same_allocation(vnode) {
            return Ok(());
        }
        let previous = node.vnode().clone();
        match (&previous, vnode) {
            (VNode::Text(old), VNode::Text(new)) => {
                let text = new.to_text();
                if old.to_text() != text {
                    surface.set_text(node.handle(), &text)?;
                }
            }
            (VNode::Element(old), VNode::Element(new)) if !node.is_text_fallback() => {
                self.applier.apply(
                    surface,
                    node.handle(),
                    &mut node.listeners,
                    old.props(),
                    new.props(),
                );
                let children = mem::take(&mut node.children);
                node.children =
                    self.reconcile_children(surface, node.handle(), children, new.children())?;
            }
            // Same unsupported tag: the fallback text already reads the same.
            _ => {}
        }
        node.set_vnode(vnode.clone());
        Ok(())
    }

    fn mount_all(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        vnodes: &[VNode],
    ) -> Result<Vec<RetainedNode>, SurfaceError> {
        let nodes = vnodes
            .iter()
            .map(|vnode| self.mount(surface, vnode))
            .collect::<Result<Vec<_>, _>>()?;
        let handles: Vec<HandleId> = nodes.iter().map(RetainedNode::handle).collect();
        surface.append_children(parent, &handles)?;
        Ok(nodes)
    }

    fn reconcile_positional(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        old: Vec<RetainedNode>,
        new: &[VNode],
    ) -> Result<Vec<RetainedNode>, SurfaceError> {
        let shared = old.len().min(new.len());
        let mut old = old.into_iter();
        let mut retained = Vec::with_capacity(new.len());
        for (index, vnode) in new[..shared].iter().enumerate() {
            if let Some(node) = self.patch(surface, parent, old.next(), Some(vnode), index)? {
                retained.push(node);
            }
        }
        if new.len() > shared {
            retained.extend(self.mount_all(surface, parent, &new[shared..])?);
        }
        for node in old.rev() {
            self.unmount(surface, parent, node)?;
        }
        Ok(retained)
    }

    fn reconcile_keyed(
        &self,
        surface: &mut dyn Surface,
        parent: HandleId,
        old: Vec<RetainedNode>,
        new: &[VNode],
    ) -> Result<Vec<RetainedNode>, SurfaceError> {
        let mut keyed: HashMap<NodeKey, (usize, RetainedNode)> = HashMap::default();
        let mut leftovers = Vec::new();
        for (index, node) in old.into_iter().enumerate() {
            match node.key().cloned() {
                Some(key) => {
                    if let Some((_, displaced)) = keyed.insert(key, (index, node)) {
                        leftovers.push(displaced);
                    }
                }
                None => leftovers.push(node),
            }
        }

        let mut placed = Vec::with_capacity(new.len());
        for vnode in new {
            let matched = vnode.key().and_then(|key| keyed.remove(key));
            let node = match matched {
                Some((_, mut node)) if compatible(node.vnode(), vnode) => {
                    self.update(surface, &mut node, vnode)?;
                    node
                }
                Some((_, node)) => {
                    // Same key, different tag: the old node cannot be reused.
                    self.unmount(surface, parent, node)?;
                    self.mount(surface, vnode)?
                }
                None => self.mount(surface, vnode)?,
            };
            placed.push(node);
        }

        let mut unused: Vec<(usize, RetainedNode)> = keyed.into_values().collect();
        unused.sort_by_key(|(index, _)| *index);
        for (_, node) in unused.into_iter().rev() {
            self.unmount(surface, parent, node)?;
        }

        for (index, node) in placed.iter().enumerate() {
            let current = surface.child_at(parent, index);
            if current == Some(node.handle()) {
                continue;
            }
            surface.insert_before(parent, node.handle(), current)?;
        }

        for node in leftovers {
            self.unmount(surface, parent, node)?;
        }
        while surface.child_count(parent) > placed.len() {
            let Some(stray) = surface.child_at(parent, placed.len()) else {
                break;
            };
            log::debug!("trimming untracked surface node {stray}");
            surface.remove_child(parent, stray)?;
            surface.release(stray);
        }
        Ok(placed)
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
