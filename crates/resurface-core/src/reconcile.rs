//! Reconciliation engine: the unit-of-work walk and the child diff.
//!
//! [`begin_work`] processes exactly one work unit and returns the next unit
//! of the resumable pre-order walk, which is what lets the scheduler suspend
//! between units. [`reconcile_children`] is the positional diff that compares
//! the previous child chain against the new element sequence and tags each
//! produced unit with its effect.

use crate::commit;
use crate::element::{Element, ElementKind, Props, TEXT_TAG};
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};
use crate::scheduler::RenderError;
use crate::surface::Surface;

/// Perform one unit of work.
///
/// Component units invoke their mapping function and diff against the single
/// produced element; host units materialize their surface node on first
/// visit (with the full attribute set applied as a from-empty update, safe
/// because the node is not yet attached) and diff against their children
/// sequence. Returns the next unit to visit, or `None` when the walk of the
/// in-progress tree is exhausted.
pub(crate) fn begin_work<S: Surface>(
    arena: &mut FiberArena,
    surface: &mut S,
    deletions: &mut Vec<FiberId>,
    unit: FiberId,
) -> Result<Option<FiberId>, RenderError> {
    match arena[unit].kind.clone() {
        ElementKind::Component(component) => {
            let produced = component
                .invoke(&arena[unit].props)
                .map_err(RenderError::Component)?;
            reconcile_children(arena, deletions, unit, vec![produced]);
        }
        ElementKind::Host(tag) => {
            if arena[unit].surface_node.is_none() {
                let node = if tag == TEXT_TAG {
                    surface.create_text_node()
                } else {
                    surface.create_node(&tag)
                };
                commit::apply_props(surface, node, &Props::new(), &arena[unit].props);
                arena[unit].surface_node = Some(node);
            }
            // The children sequence is consumed by the diff: each element's
            // props move into the child fiber built from it. Only host units
            // give their children up; component props stay whole since their
            // child element comes from invocation.
            let elements = std::mem::take(&mut arena[unit].props.children);
            reconcile_children(arena, deletions, unit, elements);
        }
    }
    Ok(next_unit(arena, unit))
}

/// Pre-order successor of `unit`: its first child if any, otherwise the next
/// unvisited sibling of the nearest ancestor that has one.
fn next_unit(arena: &FiberArena, unit: FiberId) -> Option<FiberId> {
    if let Some(child) = arena[unit].child {
        return Some(child);
    }
    let mut cursor = Some(unit);
    while let Some(id) = cursor {
        if let Some(sibling) = arena[id].sibling {
            return Some(sibling);
        }
        cursor = arena[id].parent;
    }
    None
}

/// Diff the previous child chain of `parent` against the new element
/// sequence, in lockstep by index.
///
/// A kind match at a position reuses the previous unit's surface node and
/// tags the new unit UPDATE; a new element without a matching previous child
/// becomes a PLACE unit with no node yet; a previous child without a matching
/// element is tagged REMOVE and recorded in `deletions`, since nothing in the
/// new tree will reach it again. A kind change at a shared position produces
/// both a PLACE and a REMOVE, never an in-place patch.
///
/// Matching is purely positional. Reordering children without changing kinds
/// is reported as attribute updates at each position, not as moves; this
/// mirrors the engine's intentional lack of keying.
pub(crate) fn reconcile_children(
    arena: &mut FiberArena,
    deletions: &mut Vec<FiberId>,
    parent: FiberId,
    elements: Vec<Element>,
) {
    let mut old = arena[parent].counterpart.and_then(|c| arena[c].child);
    let mut prev: Option<FiberId> = None;
    let mut first = true;
    let mut elements = elements.into_iter();

    loop {
        let element = elements.next();
        if element.is_none() && old.is_none() {
            break;
        }

        let same_kind = match (old, &element) {
            (Some(old_id), Some(el)) => arena[old_id].kind == el.kind,
            _ => false,
        };

        let new_fiber = match element {
            Some(el) if same_kind => {
                let old_id = old.expect("a kind match implies a previous child");
                let mut fiber = Fiber::new(el.kind, el.props);
                fiber.surface_node = arena[old_id].surface_node;
                fiber.parent = Some(parent);
                fiber.counterpart = Some(old_id);
                fiber.effect = EffectTag::Update;
                Some(arena.alloc(fiber))
            }
            Some(el) => {
                let mut fiber = Fiber::new(el.kind, el.props);
                fiber.parent = Some(parent);
                fiber.effect = EffectTag::Place;
                Some(arena.alloc(fiber))
            }
            None => None,
        };

        if let Some(old_id) = old {
            if !same_kind {
                arena[old_id].effect = EffectTag::Remove;
                deletions.push(old_id);
            }
            old = arena[old_id].sibling;
        }

        if first {
            arena[parent].child = new_fiber;
            first = false;
        } else if let (Some(prev_id), Some(id)) = (prev, new_fiber) {
            arena[prev_id].sibling = Some(id);
        }
        if new_fiber.is_some() {
            prev = new_fiber;
        }
    }
}
