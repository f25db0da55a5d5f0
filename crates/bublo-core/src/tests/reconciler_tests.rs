use super::*;
use crate::memory_surface::MemorySurface;
use crate::node;
use crate::props::{EventHandler, Props};

fn keyed(tag: &str, key: i64, label: &str) -> VNode {
    node!(tag, Some(Props::new().with("key", key)), label)
}

fn item(label: &str) -> VNode {
    node!("li", None, label)
}

fn list(children: Vec<VNode>) -> VNode {
    node!("ul", None, children)
}

struct Fixture {
    surface: MemorySurface,
    reconciler: Reconciler,
    container: HandleId,
    root: Option<RetainedNode>,
}

impl Fixture {
    fn new() -> Self {
        let mut surface = MemorySurface::new();
        let container = surface.create_container("main");
        Self {
            surface,
            reconciler: Reconciler::default(),
            container,
            root: None,
        }
    }

    fn render(&mut self, vnode: &VNode) {
        let old = self.root.take();
        self.root = self
            .reconciler
            .patch(&mut self.surface, self.container, old, Some(vnode), 0)
            .expect("patch succeeds");
    }

    fn root_handle(&self) -> HandleId {
        self.root.as_ref().expect("mounted").handle()
    }

    fn child_handles(&self) -> Vec<HandleId> {
        self.surface.children(self.root_handle()).to_vec()
    }

    fn markup(&self) -> String {
        self.surface.inner_markup(self.container)
    }
}

#[test]
fn mount_builds_full_subtree() {
    let mut fixture = Fixture::new();
    fixture.render(&node!(
        "div",
        Some(Props::new().with("id", "app")),
        node!("h1", None, "Title"),
        "body",
        7
    ));
    assert_eq!(
        fixture.markup(),
        "<div id=\"app\"><h1>Title</h1>body7</div>"
    );
}

#[test]
fn unchanged_tree_patches_without_mutations() {
    let mut fixture = Fixture::new();
    let build = || {
        node!(
            "div",
            Some(Props::new().with("class", "box")),
            list(vec![item("a"), item("b")]),
            "tail"
        )
    };
    fixture.render(&build());
    fixture.surface.reset_stats();
    fixture.render(&build());
    assert_eq!(fixture.surface.stats().total(), 0);
}

#[test]
fn same_allocation_is_skipped() {
    let mut fixture = Fixture::new();
    let tree = list(vec![item("a")]);
    fixture.render(&tree);
    fixture.surface.reset_stats();
    fixture.render(&tree.clone());
    assert_eq!(fixture.surface.stats().total(), 0);
}

#[test]
fn text_is_rewritten_only_when_it_differs() {
    let mut fixture = Fixture::new();
    fixture.render(&node!("p", None, "one"));
    fixture.surface.reset_stats();
    fixture.render(&node!("p", None, "two"));
    assert_eq!(fixture.surface.stats().text_updates, 1);
    assert_eq!(fixture.markup(), "<p>two</p>");

    fixture.surface.reset_stats();
    fixture.render(&node!("p", None, 3));
    fixture.render(&node!("p", None, "3"));
    assert_eq!(fixture.surface.stats().text_updates, 1);
}

#[test]
fn unkeyed_shrink_removes_trailing_nodes() {
    let mut fixture = Fixture::new();
    fixture.render(&list((0..5).map(|i| item(&i.to_string())).collect()));
    let before = fixture.child_handles();

    fixture.surface.reset_stats();
    fixture.render(&list(vec![item("x"), item("y")]));
    let after = fixture.child_handles();

    assert_eq!(after, before[..2].to_vec());
    assert_eq!(fixture.surface.stats().removals, 3);
    assert_eq!(fixture.surface.stats().created, 0);
    assert_eq!(fixture.markup(), "<ul><li>x</li><li>y</li></ul>");
    for removed in &before[2..] {
        assert!(!fixture.surface.contains(*removed));
    }
}

#[test]
fn unkeyed_growth_appends_in_one_batch() {
    let mut fixture = Fixture::new();
    fixture.render(&list(vec![item("a")]));
    fixture.surface.reset_stats();
    fixture.render(&list(vec![item("a"), item("b"), item("c")]));
    assert_eq!(fixture.surface.stats().inserts, 1);
    assert_eq!(fixture.markup(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
}

#[test]
fn emptying_a_list_tears_down_children() {
    let mut fixture = Fixture::new();
    let handler = EventHandler::new(|_| {});
    fixture.render(&list(vec![
        node!("li", Some(Props::new().with("onClick", handler.clone())), "a"),
        node!("li", Some(Props::new().with("onClick", handler)), "b"),
    ]));
    assert_eq!(fixture.surface.total_listeners(), 2);
    fixture.render(&list(Vec::new()));
    assert_eq!(fixture.surface.total_listeners(), 0);
    assert_eq!(fixture.markup(), "<ul></ul>");
}

#[test]
fn keyed_reorder_moves_without_recreating() {
    let mut fixture = Fixture::new();
    fixture.render(&list(vec![
        keyed("li", 1, "A"),
        keyed("li", 2, "B"),
        keyed("li", 3, "C"),
    ]));
    let handles = fixture.child_handles();
    for (handle, focus) in handles.iter().zip(["a", "b", "c"]) {
        fixture.surface.set_node_data(*handle, "focus", focus);
    }

    fixture.surface.reset_stats();
    fixture.render(&list(vec![
        keyed("li", 3, "C"),
        keyed("li", 1, "A"),
        keyed("li", 2, "B"),
    ]));

    let reordered = fixture.child_handles();
    assert_eq!(reordered, vec![handles[2], handles[0], handles[1]]);
    let stats = fixture.surface.stats();
    assert_eq!(stats.created, 0);
    assert_eq!(stats.removals, 0);
    assert_eq!(stats.inserts, 1);
    assert_eq!(fixture.surface.node_data(reordered[0], "focus"), Some("c"));
    assert_eq!(fixture.surface.node_data(reordered[1], "focus"), Some("a"));
    assert_eq!(fixture.markup(), "<ul><li>C</li><li>A</li><li>B</li></ul>");
}

#[test]
fn keyed_list_drops_unused_and_mounts_new_keys() {
    let mut fixture = Fixture::new();
    fixture.render(&list(vec![
        keyed("li", 1, "A"),
        keyed("li", 2, "B"),
        keyed("li", 3, "C"),
    ]));
    let handles = fixture.child_handles();

    fixture.render(&list(vec![
        keyed("li", 3, "C!"),
        keyed("li", 4, "D"),
        keyed("li", 1, "A"),
    ]));

    let next = fixture.child_handles();
    assert_eq!(next.len(), 3);
    assert_eq!(next[0], handles[2]);
    assert_eq!(next[2], handles[0]);
    assert!(!handles.contains(&next[1]));
    assert!(!fixture.surface.contains(handles[1]));
    assert_eq!(
        fixture.markup(),
        "<ul><li>C!</li><li>D</li><li>A</li></ul>"
    );
}

#[test]
fn unkeyed_children_in_keyed_list_are_never_reused() {
    let mut fixture = Fixture::new();
    fixture.render(&list(vec![keyed("li", 1, "A"), item("loose")]));
    let handles = fixture.child_handles();

    fixture.render(&list(vec![item("loose"), keyed("li", 1, "A")]));
    let next = fixture.child_handles();
    assert_eq!(next[1], handles[0]);
    assert_ne!(next[0], handles[1]);
    assert!(!fixture.surface.contains(handles[1]));
    assert_eq!(fixture.markup(), "<ul><li>loose</li><li>A</li></ul>");
}

#[test]
fn key_reused_with_different_tag_is_replaced() {
    let mut fixture = Fixture::new();
    fixture.render(&node!("div", None, keyed("p", 1, "text")));
    let old = fixture.child_handles()[0];
    fixture.render(&node!("div", None, keyed("span", 1, "text")));
    let new = fixture.child_handles()[0];
    assert_ne!(old, new);
    assert!(!fixture.surface.contains(old));
    assert_eq!(fixture.markup(), "<div><span>text</span></div>");
}

#[test]
fn incompatible_child_is_inserted_before_removal() {
    let mut fixture = Fixture::new();
    fixture.render(&node!("div", None, node!("p", None, "a"), "b"));
    fixture.render(&node!("div", None, node!("section", None, "a"), "b"));
    assert_eq!(
        fixture.markup(),
        "<div><section>a</section>b</div>"
    );
}

#[test]
fn replacing_root_detaches_listeners() {
    let mut fixture = Fixture::new();
    let handler = EventHandler::new(|_| {});
    fixture.render(&node!(
        "div",
        Some(Props::new().with("onClick", handler.clone())),
        node!("button", Some(Props::new().with("onClick", handler)))
    ));
    assert_eq!(fixture.surface.total_listeners(), 2);
    fixture.render(&node!("span", None, "swapped"));
    assert_eq!(fixture.surface.total_listeners(), 0);
    assert_eq!(fixture.surface.stats().listeners_removed, 2);
    assert_eq!(fixture.markup(), "<span>swapped</span>");
}

#[test]
fn unsupported_tag_renders_as_text() {
    let mut fixture = Fixture::new();
    fixture.render(&node!(
        "div",
        None,
        node!("not a tag", None, "ignored"),
        node!("p", None, "fine")
    ));
    assert_eq!(fixture.markup(), "<div>not a tag<p>fine</p></div>");
    let fallback = &fixture.root.as_ref().expect("mounted").children()[0];
    assert!(fallback.is_text_fallback());

    fixture.surface.reset_stats();
    fixture.render(&node!(
        "div",
        None,
        node!("not a tag", None, "still ignored"),
        node!("p", None, "fine")
    ));
    assert_eq!(fixture.surface.stats().total(), 0);
}

#[test]
fn patch_mounts_at_requested_position() {
    let mut fixture = Fixture::new();
    fixture.render(&node!("div", None, "a", "c"));
    let root = fixture.root_handle();
    let inserted = fixture
        .reconciler
        .patch(&mut fixture.surface, root, None, Some(&VNode::text("b")), 1)
        .expect("mount")
        .expect("retained");
    assert_eq!(fixture.surface.children(root)[1], inserted.handle());
    assert_eq!(fixture.markup(), "<div>abc</div>");

    let removed = fixture
        .reconciler
        .patch(&mut fixture.surface, root, Some(inserted), None, 1)
        .expect("unmount");
    assert!(removed.is_none());
    assert_eq!(fixture.markup(), "<div>ac</div>");
}
