//! The mutable incremental render tree.
//!
//! Each [`Fiber`] is one unit of work: one host node (or one component
//! invocation) for one render pass. Fibers live in a [`FiberArena`] and link
//! to each other by id: `child` and `sibling` form the owning chains,
//! `parent` is the non-owning back-reference the resumable walk ascends
//! through, and `counterpart` points at the matching fiber of the previous
//! completed tree.
//!
//! The arena recycles slots through a free list: after a commit the previous
//! tree is released, and a superseded in-progress tree is released when a new
//! render overwrites it, so a long-running session stays bounded by the size
//! of two trees.

use crate::element::{ElementKind, Props};
use crate::surface::NodeId;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Effect computed during reconciliation and consumed during commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectTag {
    /// No surface mutation required
    #[default]
    None,
    /// Append the materialized node to its surface parent
    Place,
    /// Apply an attribute/listener diff to the carried-forward node
    Update,
    /// Detach the nearest surface-owning descendants from the surface
    Remove,
}

/// Identifier of one fiber slot in a [`FiberArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FiberId(u32);

/// One work unit of the render tree.
#[derive(Debug)]
pub(crate) struct Fiber {
    /// Host tag or component function this unit renders.
    pub(crate) kind: ElementKind,
    /// The element props for this render.
    pub(crate) props: Props,
    /// Created surface node; absent for component units and
    /// not-yet-materialized host units.
    pub(crate) surface_node: Option<NodeId>,
    /// Enclosing work unit.
    pub(crate) parent: Option<FiberId>,
    /// First child.
    pub(crate) child: Option<FiberId>,
    /// Next sibling.
    pub(crate) sibling: Option<FiberId>,
    /// Matching unit from the previous completed tree.
    pub(crate) counterpart: Option<FiberId>,
    /// Effect to apply at commit.
    pub(crate) effect: EffectTag,
}

impl Fiber {
    /// Create a detached fiber with no links and no effect.
    #[must_use]
    pub(crate) fn new(kind: ElementKind, props: Props) -> Self {
        Self {
            kind,
            props,
            surface_node: None,
            parent: None,
            child: None,
            sibling: None,
            counterpart: None,
            effect: EffectTag::None,
        }
    }
}

/// Slot arena holding the fibers of the current and in-progress trees.
#[derive(Debug, Default)]
pub(crate) struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<u32>,
}

impl FiberArena {
    /// Create an empty arena.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a fiber, reusing a free slot when one exists.
    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(fiber);
                FiberId(index)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Some(fiber));
                FiberId(index)
            }
        }
    }

    /// Release a single slot back to the free list.
    pub(crate) fn release(&mut self, id: FiberId) {
        if self.slots[id.0 as usize].take().is_some() {
            self.free.push(id.0);
        }
    }

    /// Release the whole subtree reachable from `root` through the
    /// `child`/`sibling` chains. `counterpart` links are never followed.
    pub(crate) fn release_tree(&mut self, root: FiberId) {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if let Some(fiber) = self.slots[id.0 as usize].take() {
                self.free.push(id.0);
                if let Some(child) = fiber.child {
                    pending.push(child);
                }
                if let Some(sibling) = fiber.sibling {
                    pending.push(sibling);
                }
            }
        }
    }

    /// Number of live fibers.
    #[must_use]
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether a slot is currently live.
    #[must_use]
    pub(crate) fn contains(&self, id: FiberId) -> bool {
        self.slots
            .get(id.0 as usize)
            .is_some_and(Option::is_some)
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        self.slots[id.0 as usize]
            .as_ref()
            .expect("fiber slot was released while still referenced")
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        self.slots[id.0 as usize]
            .as_mut()
            .expect("fiber slot was released while still referenced")
    }
}
