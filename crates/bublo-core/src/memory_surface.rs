//! In-memory [`Surface`] used by headless hosts and tests.

use indexmap::IndexMap;

use crate::props::EventHandler;
use crate::surface::{Event, HandleId, ListenerId, Surface, SurfaceError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceNodeKind {
    Element { tag: String },
    Text { text: String },
}

pub struct SurfaceNode {
    kind: SurfaceNodeKind,
    parent: Option<HandleId>,
    children: Vec<HandleId>,
    attributes: IndexMap<String, String>,
    styles: IndexMap<String, String>,
    style_text: Option<String>,
    markup: Option<String>,
    listeners: IndexMap<ListenerId, (String, EventHandler)>,
    data: IndexMap<String, String>,
}

impl SurfaceNode {
    fn new(kind: SurfaceNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            styles: IndexMap::new(),
            style_text: None,
            markup: None,
            listeners: IndexMap::new(),
            data: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &SurfaceNodeKind {
        &self.kind
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            SurfaceNodeKind::Element { tag } => Some(tag),
            SurfaceNodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            SurfaceNodeKind::Text { text } => Some(text),
            SurfaceNodeKind::Element { .. } => None,
        }
    }

    pub fn parent(&self) -> Option<HandleId> {
        self.parent
    }

    pub fn children(&self) -> &[HandleId] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    /// Inline style set verbatim rather than per property.
    pub fn style_text(&self) -> Option<&str> {
        self.style_text.as_deref()
    }

    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn listens_to(&self, event: &str) -> bool {
        self.listeners.values().any(|(name, _)| name == event)
    }
}

/// Mutation counters; every surface write bumps exactly one of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationStats {
    pub created: usize,
    pub text_updates: usize,
    pub attribute_writes: usize,
    pub style_writes: usize,
    pub markup_writes: usize,
    pub listeners_added: usize,
    pub listeners_removed: usize,
    pub inserts: usize,
    pub removals: usize,
}

impl MutationStats {
    pub fn total(&self) -> usize {
        self.created
            + self.text_updates
            + self.attribute_writes
            + self.style_writes
            + self.markup_writes
            + self.listeners_added
            + self.listeners_removed
            + self.inserts
            + self.removals
    }
}

#[derive(Default)]
pub struct MemorySurface {
    nodes: Vec<Option<SurfaceNode>>,
    next_listener: ListenerId,
    stats: MutationStats,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element meant to serve as a render target container.
    pub fn create_container(&mut self, tag: &str) -> HandleId {
        self.push(SurfaceNode::new(SurfaceNodeKind::Element {
            tag: tag.to_string(),
        }))
    }

    pub fn node(&self, id: HandleId) -> Option<&SurfaceNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn children(&self, id: HandleId) -> &[HandleId] {
        self.node(id).map(SurfaceNode::children).unwrap_or(&[])
    }

    pub fn contains(&self, id: HandleId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MutationStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MutationStats::default();
    }

    pub fn total_listeners(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .map(SurfaceNode::listener_count)
            .sum()
    }

    /// Host-side state attached to a node without going through props, the
    /// way a focused input or scroll offset lives outside the virtual tree.
    pub fn set_node_data(&mut self, id: HandleId, key: &str, value: &str) {
        if let Ok(node) = self.node_mut(id) {
            node.data.insert(key.to_string(), value.to_string());
        }
    }

    pub fn node_data(&self, id: HandleId, key: &str) -> Option<&str> {
        self.node(id)
            .and_then(|node| node.data.get(key))
            .map(String::as_str)
    }

    /// Invokes every handler on `target` registered for `event.name`.
    /// Returns the number of handlers called.
    pub fn dispatch(&self, event: &Event) -> usize {
        let handlers: Vec<EventHandler> = match self.node(event.target) {
            Some(node) => node
                .listeners
                .values()
                .filter(|(name, _)| *name == event.name)
                .map(|(_, handler)| handler.clone())
                .collect(),
            None => return 0,
        };
        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    /// Depth-first search for the first descendant of `root` whose attribute
    /// `name` equals `value`.
    pub fn find_by_attribute(&self, root: HandleId, name: &str, value: &str) -> Option<HandleId> {
        let node = self.node(root)?;
        if node.attribute(name) == Some(value) {
            return Some(root);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_attribute(child, name, value))
    }

    /// Serializes the children of `id` as compact markup, e.g.
    /// `<ul><li class="a">one</li></ul>`.
    pub fn inner_markup(&self, id: HandleId) -> String {
        let mut output = String::new();
        for &child in self.children(id) {
            self.write_markup(&mut output, child);
        }
        output
    }

    pub fn outer_markup(&self, id: HandleId) -> String {
        let mut output = String::new();
        self.write_markup(&mut output, id);
        output
    }

    fn write_markup(&self, output: &mut String, id: HandleId) {
        let Some(node) = self.node(id) else {
            output.push_str("<!--missing-->");
            return;
        };
        match &node.kind {
            SurfaceNodeKind::Text { text } => output.push_str(text),
            SurfaceNodeKind::Element { tag } => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in &node.attributes {
                    output.push_str(&format!(" {name}=\"{value}\""));
                }
                let declarations: Vec<String> = node
                    .style_text
                    .iter()
                    .cloned()
                    .chain(node.styles.iter().map(|(k, v)| format!("{k}: {v}")))
                    .collect();
                if !declarations.is_empty() {
                    output.push_str(&format!(" style=\"{}\"", declarations.join("; ")));
                }
                output.push('>');
                if let Some(markup) = &node.markup {
                    output.push_str(markup);
                }
                for &child in &node.children {
                    self.write_markup(output, child);
                }
                output.push_str(&format!("</{tag}>"));
            }
        }
    }

    pub fn dump_tree(&self, root: Option<HandleId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: HandleId, depth: usize) {
        let indent = "  ".repeat(depth);
        if let Some(node) = self.node(id) {
            match &node.kind {
                SurfaceNodeKind::Element { tag } => {
                    output.push_str(&format!("{indent}[{id}] <{tag}>\n"));
                }
                SurfaceNodeKind::Text { text } => {
                    output.push_str(&format!("{indent}[{id}] {text:?}\n"));
                }
            }
            for &child in &node.children {
                self.dump_node(output, child, depth + 1);
            }
        } else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
        }
    }

    fn push(&mut self, node: SurfaceNode) -> HandleId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    fn node_mut(&mut self, id: HandleId) -> Result<&mut SurfaceNode, SurfaceError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(SurfaceError::Missing { id })
    }

    fn element_mut(&mut self, id: HandleId) -> Result<&mut SurfaceNode, SurfaceError> {
        let node = self.node_mut(id)?;
        match node.kind {
            SurfaceNodeKind::Element { .. } => Ok(node),
            SurfaceNodeKind::Text { .. } => Err(SurfaceError::NotAnElement { id }),
        }
    }

    fn detach(&mut self, child: HandleId) -> Result<(), SurfaceError> {
        let parent = self.node_mut(child)?.parent.take();
        if let Some(parent) = parent {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|&id| id != child);
        }
        Ok(())
    }
}

impl Surface for MemorySurface {
    fn supports_tag(&self, tag: &str) -> bool {
        let mut chars = tag.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
            }
            _ => false,
        }
    }

    fn create_element(&mut self, tag: &str) -> HandleId {
        self.stats.created += 1;
        self.push(SurfaceNode::new(SurfaceNodeKind::Element {
            tag: tag.to_string(),
        }))
    }

    fn create_text(&mut self, text: &str) -> HandleId {
        self.stats.created += 1;
        self.push(SurfaceNode::new(SurfaceNodeKind::Text {
            text: text.to_string(),
        }))
    }

    fn set_text(&mut self, node: HandleId, text: &str) -> Result<(), SurfaceError> {
        let target = self.node_mut(node)?;
        match &mut target.kind {
            SurfaceNodeKind::Text { text: current } => {
                *current = text.to_string();
            }
            SurfaceNodeKind::Element { .. } => {
                return Err(SurfaceError::NotText { id: node });
            }
        }
        self.stats.text_updates += 1;
        Ok(())
    }

    fn set_attribute(
        &mut self,
        node: HandleId,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        self.stats.attribute_writes += 1;
        Ok(())
    }

    fn remove_attribute(&mut self, node: HandleId, name: &str) -> Result<(), SurfaceError> {
        self.element_mut(node)?.attributes.shift_remove(name);
        self.stats.attribute_writes += 1;
        Ok(())
    }

    fn set_style(&mut self, node: HandleId, property: &str, value: &str) -> Result<(), SurfaceError> {
        self.element_mut(node)?
            .styles
            .insert(property.to_string(), value.to_string());
        self.stats.style_writes += 1;
        Ok(())
    }

    fn remove_style(&mut self, node: HandleId, property: &str) -> Result<(), SurfaceError> {
        self.element_mut(node)?.styles.shift_remove(property);
        self.stats.style_writes += 1;
        Ok(())
    }

    fn set_style_text(&mut self, node: HandleId, css: &str) -> Result<(), SurfaceError> {
        let element = self.element_mut(node)?;
        element.styles.clear();
        element.style_text = Some(css.to_string());
        self.stats.style_writes += 1;
        Ok(())
    }

    fn clear_styles(&mut self, node: HandleId) -> Result<(), SurfaceError> {
        let element = self.element_mut(node)?;
        element.styles.clear();
        element.style_text = None;
        self.stats.style_writes += 1;
        Ok(())
    }

    fn set_raw_markup(&mut self, node: HandleId, markup: &str) -> Result<(), SurfaceError> {
        let element = self.element_mut(node)?;
        element.markup = if markup.is_empty() {
            None
        } else {
            Some(markup.to_string())
        };
        self.stats.markup_writes += 1;
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: HandleId,
        event: &str,
        handler: EventHandler,
    ) -> Result<ListenerId, SurfaceError> {
        let id = self.next_listener;
        self.element_mut(node)?
            .listeners
            .insert(id, (event.to_string(), handler));
        self.next_listener += 1;
        self.stats.listeners_added += 1;
        Ok(id)
    }

    fn remove_listener(&mut self, node: HandleId, listener: ListenerId) -> Result<(), SurfaceError> {
        self.node_mut(node)?
            .listeners
            .shift_remove(&listener)
            .ok_or(SurfaceError::UnknownListener { id: node, listener })?;
        self.stats.listeners_removed += 1;
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HandleId,
        child: HandleId,
        before: Option<HandleId>,
    ) -> Result<(), SurfaceError> {
        self.element_mut(parent)?;
        self.node_mut(child)?;
        self.detach(child)?;
        let siblings = &mut self.element_mut(parent)?.children;
        let index = match before {
            Some(anchor) => siblings
                .iter()
                .position(|&id| id == anchor)
                .ok_or(SurfaceError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => siblings.len(),
        };
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.stats.inserts += 1;
        Ok(())
    }

    fn append_children(
        &mut self,
        parent: HandleId,
        children: &[HandleId],
    ) -> Result<(), SurfaceError> {
        self.element_mut(parent)?;
        for &child in children {
            self.node_mut(child)?;
            self.detach(child)?;
            self.element_mut(parent)?.children.push(child);
            self.node_mut(child)?.parent = Some(parent);
        }
        self.stats.inserts += 1;
        Ok(())
    }

    fn remove_child(&mut self, parent: HandleId, child: HandleId) -> Result<(), SurfaceError> {
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings
            .iter()
            .position(|&id| id == child)
            .ok_or(SurfaceError::NotAChild { parent, child })?;
        siblings.remove(index);
        self.node_mut(child)?.parent = None;
        self.stats.removals += 1;
        Ok(())
    }

    fn release(&mut self, node: HandleId) {
        let children = match self.node(node) {
            Some(entry) => entry.children.clone(),
            None => return,
        };
        for child in children {
            self.release(child);
        }
        // Ignore a parent that has already been released.
        let _ = self.detach(node);
        if let Some(slot) = self.nodes.get_mut(node) {
            slot.take();
        }
    }

    fn child_at(&self, parent: HandleId, index: usize) -> Option<HandleId> {
        self.node(parent)
            .and_then(|node| node.children.get(index))
            .copied()
    }

    fn child_count(&self, parent: HandleId) -> usize {
        self.children(parent).len()
    }
}
