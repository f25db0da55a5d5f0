//! Virtual node model.

use std::fmt;
use std::rc::Rc;

use crate::props::{PropValue, Props, KEY};

/// Identity token distinguishing siblings in a keyed list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Int(value) => write!(f, "{value}"),
            NodeKey::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for NodeKey {
    fn from(value: i64) -> Self {
        NodeKey::Int(value)
    }
}

impl From<i32> for NodeKey {
    fn from(value: i32) -> Self {
        NodeKey::Int(value as i64)
    }
}

impl From<usize> for NodeKey {
    fn from(value: usize) -> Self {
        NodeKey::Int(value as i64)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        NodeKey::Str(value.into())
    }
}

impl From<String> for NodeKey {
    fn from(value: String) -> Self {
        NodeKey::Str(value.into())
    }
}

impl NodeKey {
    fn from_prop(value: PropValue) -> Option<Self> {
        match value {
            PropValue::Int(value) => Some(NodeKey::Int(value)),
            PropValue::Str(value) => Some(NodeKey::Str(value)),
            other => other.to_attribute_value().map(NodeKey::from),
        }
    }
}

/// Text-like leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
}

impl Primitive {
    pub fn to_text(&self) -> String {
        match self {
            Primitive::Str(value) => value.to_string(),
            Primitive::Int(value) => value.to_string(),
            Primitive::Float(value) => value.to_string(),
        }
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Str(value.into())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Str(value.into())
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Int(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Int(value as i64)
    }
}

impl From<usize> for Primitive {
    fn from(value: usize) -> Self {
        Primitive::Int(value as i64)
    }
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Float(value)
    }
}

/// Tagged node payload.
#[derive(Debug, PartialEq)]
pub struct Element {
    tag: String,
    key: Option<NodeKey>,
    props: Props,
    children: Vec<VNode>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }
}

/// Immutable description of a piece of UI.
///
/// Elements are reference counted, so cloning a tree only bumps counts and a
/// subtree reused verbatim between renders is recognised by pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Text(Primitive),
    Element(Rc<Element>),
}

impl VNode {
    pub fn text(value: impl Into<Primitive>) -> Self {
        VNode::Text(value.into())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, VNode::Text(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            VNode::Element(element) => Some(element),
            VNode::Text(_) => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(Element::tag)
    }

    pub fn key(&self) -> Option<&NodeKey> {
        self.as_element().and_then(Element::key)
    }

    pub fn children(&self) -> &[VNode] {
        self.as_element().map(Element::children).unwrap_or(&[])
    }

    /// Returns true when both values are the same element allocation.
    pub fn same_allocation(&self, other: &VNode) -> bool {
        match (self, other) {
            (VNode::Element(a), VNode::Element(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        VNode::text(value)
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        VNode::text(value)
    }
}

impl From<Primitive> for VNode {
    fn from(value: Primitive) -> Self {
        VNode::Text(value)
    }
}

/// Child argument accepted by [`make_node`].
///
/// Lists are spliced one level deep; [`Child::Empty`] stands for "nothing to
/// render" and is dropped.
#[derive(Clone, Debug)]
pub enum Child {
    Node(VNode),
    List(Vec<VNode>),
    Empty,
}

impl From<VNode> for Child {
    fn from(value: VNode) -> Self {
        Child::Node(value)
    }
}

impl From<Vec<VNode>> for Child {
    fn from(value: Vec<VNode>) -> Self {
        Child::List(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<usize> for Child {
    fn from(value: usize) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Node(VNode::text(value))
    }
}

impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Child::Empty)
    }
}

/// Builds a tagged virtual node.
///
/// A `key` property is lifted out of `props` and becomes the node identity.
/// The tag is not validated here; the reconciler falls back to a text node
/// for tags the surface does not recognise.
pub fn make_node(
    tag: impl Into<String>,
    props: Option<Props>,
    children: impl IntoIterator<Item = Child>,
) -> VNode {
    let mut props = props.unwrap_or_default();
    let key = props.remove(KEY).and_then(NodeKey::from_prop);
    let mut flat = Vec::new();
    for child in children {
        match child {
            Child::Node(node) => flat.push(node),
            Child::List(nodes) => flat.extend(nodes),
            Child::Empty => {}
        }
    }
    VNode::Element(Rc::new(Element {
        tag: tag.into(),
        key,
        props,
        children: flat,
    }))
}

/// Decides whether `new` may patch the live node produced by `old`.
pub fn compatible(a: &VNode, b: &VNode) -> bool {
    match (a, b) {
        (VNode::Text(_), VNode::Text(_)) => true,
        (VNode::Element(a), VNode::Element(b)) => a.tag == b.tag && a.key == b.key,
        _ => false,
    }
}

/// Variadic form of [`make_node`].
///
/// ```
/// use bublo_core::{node, Props};
///
/// let list = node!("ul", None, node!("li", Some(Props::new().with("key", 1)), "one"));
/// assert_eq!(list.children().len(), 1);
/// ```
#[macro_export]
macro_rules! node {
    ($tag:expr) => {
        $crate::make_node($tag, None, ::std::iter::empty())
    };
    ($tag:expr, $props:expr $(, $child:expr)* $(,)?) => {
        $crate::make_node($tag, $props, [$($crate::Child::from($child)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_extracted_from_props() {
        let node = make_node(
            "li",
            Some(Props::new().with("key", "a").with("class", "item")),
            [],
        );
        let element = node.as_element().expect("element");
        assert_eq!(element.key(), Some(&NodeKey::from("a")));
        assert!(!element.props().contains("key"));
        assert!(element.props().contains("class"));
    }

    #[test]
    fn null_key_means_positional() {
        let node = make_node("li", Some(Props::new().with("key", PropValue::Null)), []);
        assert_eq!(node.key(), None);
    }

    #[test]
    fn children_are_flattened_one_level() {
        let items = vec![VNode::text("b"), VNode::text("c")];
        let node = crate::node!(
            "div",
            None,
            "a",
            items,
            false,
            Option::<VNode>::None,
            (),
            VNode::text(4)
        );
        let texts: Vec<String> = node
            .children()
            .iter()
            .map(|child| match child {
                VNode::Text(value) => value.to_text(),
                VNode::Element(_) => String::from("<element>"),
            })
            .collect();
        assert_eq!(texts, vec!["a", "b", "c", "4"]);
    }

    #[test]
    fn compatibility_rules() {
        let div = crate::node!("div");
        let other_div = crate::node!("div", Some(Props::new().with("id", "x")));
        let span = crate::node!("span");
        let keyed = crate::node!("div", Some(Props::new().with("key", 1)));
        let text = VNode::text("hi");

        assert!(compatible(&div, &other_div));
        assert!(!compatible(&div, &span));
        assert!(!compatible(&div, &keyed));
        assert!(!compatible(&div, &text));
        assert!(compatible(&text, &VNode::text(3)));
    }
}
