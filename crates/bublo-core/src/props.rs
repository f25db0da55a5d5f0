//! Property values carried by virtual nodes and the naming conventions that
//! decide how each property reaches the render surface.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::surface::Event;

/// Name of the reserved property holding a node's children.
pub const CHILDREN: &str = "children";

/// Name of the property extracted as node identity by [`crate::make_node`].
pub const KEY: &str = "key";

/// Callback attached to the surface for an event property.
///
/// Handlers compare by pointer identity: two handlers are equal only when
/// they are clones of the same allocation.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<dyn Fn(&Event)>,
}

impl EventHandler {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.callback))
    }
}

/// Inline style declarations, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Style {
    rules: IndexMap<String, String>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.rules.insert(property.into(), value.into());
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.rules.get(property).map(String::as_str)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.rules.contains_key(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Serializes the declarations the way an inline `style` attribute reads.
    pub fn to_css(&self) -> String {
        self.rules
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Style(Style),
    Handler(EventHandler),
    Markup(Rc<str>),
}

impl PropValue {
    pub fn markup(html: impl Into<Rc<str>>) -> Self {
        PropValue::Markup(html.into())
    }

    pub fn handler(callback: impl Fn(&Event) + 'static) -> Self {
        PropValue::Handler(EventHandler::new(callback))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Text used when the value lands on a plain attribute.
    ///
    /// `None` means the attribute should be absent: null, `false`, and
    /// handlers (which have no textual form).
    pub fn to_attribute_value(&self) -> Option<String> {
        match self {
            PropValue::Null | PropValue::Bool(false) | PropValue::Handler(_) => None,
            PropValue::Bool(true) => Some(String::new()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Str(value) | PropValue::Markup(value) => Some(value.to_string()),
            PropValue::Style(style) => Some(style.to_css()),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Style> for PropValue {
    fn from(value: Style) -> Self {
        PropValue::Style(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropValue::Null)
    }
}

/// Ordered property map of a tagged node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: IndexMap<String, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn on(self, event: &str, callback: impl Fn(&Event) + 'static) -> Self {
        self.with(event, PropValue::handler(callback))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.entries.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

/// How a property name is routed to the surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind<'a> {
    Children,
    /// Event subscription; carries the surface event name.
    Event(String),
    Style,
    RawMarkup,
    /// Plain attribute; carries the attribute name after alias resolution.
    Attribute(&'a str),
}

/// Naming table used by the property classifier.
#[derive(Clone, Debug)]
pub struct PropertyConventions {
    pub event_prefix: String,
    pub style: String,
    pub raw_markup: String,
    pub attribute_aliases: IndexMap<String, String>,
}

impl Default for PropertyConventions {
    fn default() -> Self {
        let mut attribute_aliases = IndexMap::new();
        attribute_aliases.insert("className".to_string(), "class".to_string());
        attribute_aliases.insert("htmlFor".to_string(), "for".to_string());
        Self {
            event_prefix: "on".to_string(),
            style: "style".to_string(),
            raw_markup: "dangerouslySetInnerHTML".to_string(),
            attribute_aliases,
        }
    }
}

impl PropertyConventions {
    pub fn classify<'a>(&'a self, name: &'a str) -> PropertyKind<'a> {
        if name == CHILDREN {
            return PropertyKind::Children;
        }
        if let Some(event) = name.strip_prefix(self.event_prefix.as_str()) {
            if !event.is_empty() && !self.event_prefix.is_empty() {
                return PropertyKind::Event(event.to_ascii_lowercase());
            }
        }
        if name == self.style {
            return PropertyKind::Style;
        }
        if name == self.raw_markup {
            return PropertyKind::RawMarkup;
        }
        let attribute = self
            .attribute_aliases
            .get(name)
            .map(String::as_str)
            .unwrap_or(name);
        PropertyKind::Attribute(attribute)
    }
}
