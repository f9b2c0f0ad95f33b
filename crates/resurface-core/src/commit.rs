//! Commit engine: applies the effects accumulated by a completed walk.
//!
//! Effects are computed during the interruptible walk but applied here in one
//! uninterrupted pass, so the surface only ever shows fully committed render
//! cycles. Removals recorded during the walk go first (their units are not
//! reachable from the new tree), then the new tree is walked depth-first
//! applying placements and updates.

use crate::element::Props;
use crate::fiber::{EffectTag, FiberArena, FiberId};
use crate::surface::{NodeId, Surface};
use serde::{Deserialize, Serialize};

/// Counts of what one commit pass did to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// PLACE units whose node was appended.
    pub placements: usize,
    /// UPDATE units visited (their diff may have been empty).
    pub updates: usize,
    /// Surface nodes detached by removals.
    pub removals: usize,
    /// Attribute and listener mutations performed by update diffs.
    pub mutations: usize,
}

/// Diff `prev` against `next` and apply the difference to `node`.
///
/// Order matches the update protocol: drop listeners that are gone or
/// changed, clear attributes absent from the new set, set new or changed
/// attributes, then attach new or changed listeners. Returns the number of
/// surface mutations performed; identical props produce zero.
pub(crate) fn apply_props<S: Surface>(
    surface: &mut S,
    node: NodeId,
    prev: &Props,
    next: &Props,
) -> usize {
    let mut mutations = 0;

    for (event, listener) in &prev.listeners {
        if next.listeners.get(event) != Some(listener) {
            surface.remove_listener(node, event, listener);
            mutations += 1;
        }
    }
    for name in prev.attrs.keys() {
        if !next.attrs.contains_key(name) {
            surface.clear_attribute(node, name);
            mutations += 1;
        }
    }
    for (name, value) in &next.attrs {
        if prev.attrs.get(name) != Some(value) {
            surface.set_attribute(node, name, value);
            mutations += 1;
        }
    }
    for (event, listener) in &next.listeners {
        if prev.listeners.get(event) != Some(listener) {
            surface.add_listener(node, event, listener);
            mutations += 1;
        }
    }

    mutations
}

/// Apply every recorded removal, then the PLACE/UPDATE effects of the
/// completed in-progress tree, in tree order.
pub(crate) fn commit_root<S: Surface>(
    arena: &mut FiberArena,
    surface: &mut S,
    deletions: &[FiberId],
    wip_root: FiberId,
) -> CommitSummary {
    let mut summary = CommitSummary::default();
    for &removed in deletions {
        let parent_node = surface_parent(arena, removed);
        commit_removal(arena, surface, &mut summary, removed, parent_node);
    }
    let first = arena[wip_root].child;
    commit_work(arena, surface, &mut summary, first);
    summary
}

/// Detach the nearest surface-owning descendants of a REMOVE unit.
///
/// A component unit owns no node, so removal descends through its child
/// chain until it finds nodes to detach. Siblings of the REMOVE unit itself
/// are never touched, only its own subtree.
fn commit_removal<S: Surface>(
    arena: &FiberArena,
    surface: &mut S,
    summary: &mut CommitSummary,
    fiber: FiberId,
    parent_node: NodeId,
) {
    if let Some(node) = arena[fiber].surface_node {
        surface.remove_child(parent_node, node);
        summary.removals += 1;
    } else {
        let mut child = arena[fiber].child;
        while let Some(id) = child {
            commit_removal(arena, surface, summary, id, parent_node);
            child = arena[id].sibling;
        }
    }
}

/// Depth-first effect application: a unit is processed before its children
/// and its children before its siblings.
fn commit_work<S: Surface>(
    arena: &mut FiberArena,
    surface: &mut S,
    summary: &mut CommitSummary,
    fiber: Option<FiberId>,
) {
    let Some(id) = fiber else { return };

    match (arena[id].effect, arena[id].surface_node) {
        (EffectTag::Place, Some(node)) => {
            let parent_node = surface_parent(arena, id);
            surface.append_child(parent_node, node);
            summary.placements += 1;
        }
        (EffectTag::Update, Some(node)) => {
            let counterpart = arena[id]
                .counterpart
                .expect("update units keep their counterpart until commit");
            summary.mutations +=
                apply_props(surface, node, &arena[counterpart].props, &arena[id].props);
            summary.updates += 1;
        }
        // Component units and untouched units are skipped for surface
        // mutation but still traversed below.
        _ => {}
    }
    arena[id].effect = EffectTag::None;
    arena[id].counterpart = None;

    let child = arena[id].child;
    commit_work(arena, surface, summary, child);
    let sibling = arena[id].sibling;
    commit_work(arena, surface, summary, sibling);
}

/// The nearest ancestor's surface node: the surface parent new nodes are
/// appended to and removed nodes are detached from. Component ancestors own
/// no node and are skipped.
fn surface_parent(arena: &FiberArena, fiber: FiberId) -> NodeId {
    let mut cursor = arena[fiber].parent;
    while let Some(id) = cursor {
        if let Some(node) = arena[id].surface_node {
            return node;
        }
        cursor = arena[id].parent;
    }
    panic!("work unit has no surface-owning ancestor; the root must own the container node");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AttrValue, Element, Listener};
    use crate::surface::{MemorySurface, SurfaceOp};

    fn props_of(element: Element) -> Props {
        element.props().clone()
    }

    #[test]
    fn test_apply_props_from_empty_sets_everything() {
        let mut surface = MemorySurface::new();
        let node = surface.create_node("div");
        let next = props_of(
            Element::host("div")
                .with_attr("class", "a")
                .with_attr("id", "x")
                .on("click", Listener::new(|_| {})),
        );

        let mutations = apply_props(&mut surface, node, &Props::new(), &next);
        assert_eq!(mutations, 3);
        assert_eq!(surface.attr(node, "class"), Some(&AttrValue::from("a")));
        assert!(surface.has_listener(node, "click"));
    }

    #[test]
    fn test_apply_props_identical_is_no_op() {
        let mut surface = MemorySurface::new();
        let node = surface.create_node("div");
        let listener = Listener::new(|_| {});
        let props = props_of(
            Element::host("div")
                .with_attr("class", "a")
                .on("click", listener),
        );

        apply_props(&mut surface, node, &Props::new(), &props);
        surface.take_ops();

        let mutations = apply_props(&mut surface, node, &props.clone(), &props);
        assert_eq!(mutations, 0);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_apply_props_clears_stale_attributes() {
        let mut surface = MemorySurface::new();
        let node = surface.create_node("div");
        let prev = props_of(Element::host("div").with_attr("class", "a").with_attr("id", "x"));
        let next = props_of(Element::host("div").with_attr("class", "b"));

        apply_props(&mut surface, node, &Props::new(), &prev);
        let mutations = apply_props(&mut surface, node, &prev, &next);

        assert_eq!(mutations, 2); // clear id, set class
        assert_eq!(surface.attr(node, "class"), Some(&AttrValue::from("b")));
        assert_eq!(surface.attr(node, "id"), None);
    }

    #[test]
    fn test_apply_props_swaps_changed_listener() {
        let mut surface = MemorySurface::new();
        let node = surface.create_node("div");
        let first = Listener::new(|_| {});
        let second = Listener::new(|_| {});
        let prev = props_of(Element::host("div").on("click", first));
        let next = props_of(Element::host("div").on("click", second));

        apply_props(&mut surface, node, &Props::new(), &prev);
        surface.take_ops();
        let mutations = apply_props(&mut surface, node, &prev, &next);

        assert_eq!(mutations, 2); // remove then add
        assert_eq!(
            surface.ops(),
            &[
                SurfaceOp::RemoveListener {
                    node,
                    event: "click".to_string()
                },
                SurfaceOp::AddListener {
                    node,
                    event: "click".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_apply_props_keeps_unchanged_listener() {
        let mut surface = MemorySurface::new();
        let node = surface.create_node("div");
        let listener = Listener::new(|_| {});
        let prev = props_of(Element::host("div").on("click", listener.clone()));
        let next = props_of(Element::host("div").on("click", listener));

        apply_props(&mut surface, node, &Props::new(), &prev);
        let mutations = apply_props(&mut surface, node, &prev, &next);
        assert_eq!(mutations, 0);
    }
}
