//! Synchronizes a surface node's attributes, styles and listeners with a
//! property map.

use crate::props::{PropValue, PropertyConventions, PropertyKind, Props};
use crate::retained::ListenerRegistry;
use crate::surface::{HandleId, Surface, SurfaceError};

/// Applies property diffs to surface nodes.
///
/// The applier never fails: values that cannot be represented are logged and
/// skipped, and surface errors are logged rather than propagated.
#[derive(Clone, Debug, Default)]
pub struct PropertyApplier {
    conventions: PropertyConventions,
}

impl PropertyApplier {
    pub fn new(conventions: PropertyConventions) -> Self {
        Self { conventions }
    }

    pub fn conventions(&self) -> &PropertyConventions {
        &self.conventions
    }

    pub fn apply(
        &self,
        surface: &mut dyn Surface,
        node: HandleId,
        listeners: &mut ListenerRegistry,
        old: &Props,
        new: &Props,
    ) {
        for (name, previous) in old.iter() {
            if !new.contains(name) {
                self.apply_one(surface, node, listeners, name, Some(previous), None);
            }
        }
        for (name, value) in new.iter() {
            let previous = old.get(name);
            if previous == Some(value) {
                continue;
            }
            self.apply_one(surface, node, listeners, name, previous, Some(value));
        }
    }

    fn apply_one(
        &self,
        surface: &mut dyn Surface,
        node: HandleId,
        listeners: &mut ListenerRegistry,
        name: &str,
        old: Option<&PropValue>,
        new: Option<&PropValue>,
    ) {
        match self.conventions.classify(name) {
            PropertyKind::Children => {}
            PropertyKind::Event(event) => {
                if let Some(listener) = listeners.shift_remove(&event) {
                    report(name, surface.remove_listener(node, listener));
                }
                match new {
                    Some(PropValue::Handler(handler)) => {
                        match surface.add_listener(node, &event, handler.clone()) {
                            Ok(listener) => {
                                listeners.insert(event, listener);
                            }
                            Err(err) => log::warn!("failed to attach `{name}`: {err}"),
                        }
                    }
                    None | Some(PropValue::Null) | Some(PropValue::Bool(false)) => {}
                    Some(other) => {
                        log::warn!("ignoring non-handler value {other:?} for event property `{name}`")
                    }
                }
            }
            PropertyKind::Style => self.apply_style(surface, node, name, old, new),
            PropertyKind::RawMarkup => {
                let markup = new
                    .and_then(PropValue::to_attribute_value)
                    .unwrap_or_default();
                report(name, surface.set_raw_markup(node, &markup));
            }
            PropertyKind::Attribute(attribute) => match new {
                Some(PropValue::Handler(_)) => {
                    log::warn!("ignoring handler for non-event property `{name}`");
                }
                Some(value) => match value.to_attribute_value() {
                    Some(text) => report(name, surface.set_attribute(node, attribute, &text)),
                    None => report(name, surface.remove_attribute(node, attribute)),
                },
                None => report(name, surface.remove_attribute(node, attribute)),
            },
        }
    }

    fn apply_style(
        &self,
        surface: &mut dyn Surface,
        node: HandleId,
        name: &str,
        old: Option<&PropValue>,
        new: Option<&PropValue>,
    ) {
        match (old, new) {
            (Some(PropValue::Style(previous)), Some(PropValue::Style(next))) => {
                for (property, _) in previous.iter() {
                    if !next.contains(property) {
                        report(name, surface.remove_style(node, property));
                    }
                }
                for (property, value) in next.iter() {
                    if previous.get(property) != Some(value) {
                        report(name, surface.set_style(node, property, value));
                    }
                }
            }
            (_, Some(PropValue::Style(next))) => {
                if old.is_some() {
                    report(name, surface.clear_styles(node));
                }
                for (property, value) in next.iter() {
                    report(name, surface.set_style(node, property, value));
                }
            }
            (_, Some(value)) => match value.to_attribute_value() {
                Some(text) => report(name, surface.set_style_text(node, &text)),
                None => report(name, surface.clear_styles(node)),
            },
            (_, None) => report(name, surface.clear_styles(node)),
        }
    }
}

fn report(name: &str, result: Result<(), SurfaceError>) {
    if let Err(err) = result {
        log::warn!("failed to apply property `{name}`: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_surface::MemorySurface;
    use crate::props::{EventHandler, Style};
    use crate::surface::Event;
    use std::cell::Cell;
    use std::rc::Rc;

    fn element(surface: &mut MemorySurface) -> HandleId {
        surface.create_element("div")
    }

    #[test]
    fn attributes_are_set_and_removed() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();

        let first = Props::new()
            .with("id", "main")
            .with("className", "card")
            .with("hidden", true)
            .with("tabindex", 3);
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &first);
        let view = surface.node(node).expect("node");
        assert_eq!(view.attribute("id"), Some("main"));
        assert_eq!(view.attribute("class"), Some("card"));
        assert_eq!(view.attribute("hidden"), Some(""));
        assert_eq!(view.attribute("tabindex"), Some("3"));

        let second = Props::new()
            .with("id", "main")
            .with("className", PropValue::Null)
            .with("hidden", false);
        surface.reset_stats();
        applier.apply(&mut surface, node, &mut listeners, &first, &second);
        let view = surface.node(node).expect("node");
        assert_eq!(view.attribute("id"), Some("main"));
        assert_eq!(view.attribute("class"), None);
        assert_eq!(view.attribute("hidden"), None);
        assert_eq!(view.attribute("tabindex"), None);
        // `id` is unchanged; the other three are removed.
        assert_eq!(surface.stats().attribute_writes, 3);
    }

    #[test]
    fn handlers_are_swapped_exactly() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();
        let hits = Rc::new(Cell::new(0));

        let first_hits = Rc::clone(&hits);
        let first = Props::new().on("onClick", move |_| first_hits.set(first_hits.get() + 1));
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &first);
        assert_eq!(listeners.len(), 1);

        let second_hits = Rc::clone(&hits);
        let second = Props::new().on("onClick", move |_| second_hits.set(second_hits.get() + 10));
        applier.apply(&mut surface, node, &mut listeners, &first, &second);
        assert_eq!(surface.node(node).expect("node").listener_count(), 1);

        surface.dispatch(&Event::new("click", node));
        assert_eq!(hits.get(), 10);

        applier.apply(&mut surface, node, &mut listeners, &second, &Props::new());
        assert!(listeners.is_empty());
        assert_eq!(surface.total_listeners(), 0);
    }

    #[test]
    fn identical_handler_is_not_reattached() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();
        let handler = EventHandler::new(|_| {});
        let props = Props::new().with("onInput", handler.clone());
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &props);
        surface.reset_stats();
        let again = Props::new().with("onInput", handler);
        applier.apply(&mut surface, node, &mut listeners, &props, &again);
        assert_eq!(surface.stats().total(), 0);
    }

    #[test]
    fn style_maps_are_diffed_per_property() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();

        let first = Props::new().with(
            "style",
            Style::new().with("color", "red").with("margin", "0"),
        );
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &first);

        let second = Props::new().with(
            "style",
            Style::new().with("color", "red").with("padding", "4px"),
        );
        surface.reset_stats();
        applier.apply(&mut surface, node, &mut listeners, &first, &second);

        let view = surface.node(node).expect("node");
        assert_eq!(view.style("color"), Some("red"));
        assert_eq!(view.style("margin"), None);
        assert_eq!(view.style("padding"), Some("4px"));
        // margin cleared, padding set; color untouched.
        assert_eq!(surface.stats().style_writes, 2);
    }

    #[test]
    fn style_text_and_maps_replace_each_other() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();

        let text = Props::new().with("style", "color: blue");
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &text);
        assert_eq!(surface.outer_markup(node), "<div style=\"color: blue\"></div>");

        let map = Props::new().with("style", Style::new().with("margin", "0"));
        applier.apply(&mut surface, node, &mut listeners, &text, &map);
        let view = surface.node(node).expect("node");
        assert_eq!(view.style_text(), None);
        assert_eq!(view.style("margin"), Some("0"));

        applier.apply(&mut surface, node, &mut listeners, &map, &Props::new());
        assert_eq!(surface.outer_markup(node), "<div></div>");
    }

    #[test]
    fn renamed_style_property_leaves_style_attribute_alone() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::new(crate::props::PropertyConventions {
            style: "css".to_string(),
            ..Default::default()
        });

        let first = Props::new()
            .with("css", Style::new().with("color", "red"))
            .with("style", "legacy");
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &first);
        assert_eq!(surface.node(node).expect("node").attribute("style"), Some("legacy"));

        let second = Props::new().with("css", Style::new().with("color", "red"));
        applier.apply(&mut surface, node, &mut listeners, &first, &second);
        let view = surface.node(node).expect("node");
        assert_eq!(view.attribute("style"), None);
        assert_eq!(view.style("color"), Some("red"));
    }

    #[test]
    fn raw_markup_replaces_content() {
        let mut surface = MemorySurface::new();
        let node = element(&mut surface);
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();
        let props = Props::new().with("dangerouslySetInnerHTML", PropValue::markup("<b>hi</b>"));
        applier.apply(&mut surface, node, &mut listeners, &Props::new(), &props);
        assert_eq!(surface.outer_markup(node), "<div><b>hi</b></div>");
        applier.apply(&mut surface, node, &mut listeners, &props, &Props::new());
        assert_eq!(surface.outer_markup(node), "<div></div>");
    }

    #[test]
    fn malformed_values_never_fail() {
        let mut surface = MemorySurface::new();
        let text = surface.create_text("plain");
        let mut listeners = ListenerRegistry::new();
        let applier = PropertyApplier::default();
        let props = Props::new()
            .with("onClick", "not a handler")
            .with("title", EventHandler::new(|_| {}))
            .with("id", "x");
        // Attribute writes on a text node fail on the surface and are only logged.
        applier.apply(&mut surface, text, &mut listeners, &Props::new(), &props);
        assert!(listeners.is_empty());
    }
}
