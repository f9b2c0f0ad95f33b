//! Incremental reconciliation engine for declarative surface trees.
//!
//! resurface converts an immutable tree of [`Element`] descriptions into a
//! mutable tree of rendering-surface nodes, and on subsequent renders
//! computes and applies a minimal set of mutations instead of rebuilding the
//! surface from scratch.
//!
//! # Architecture
//!
//! The pipeline per render cycle:
//!
//! ```text
//! Element tree -> fiber walk (interruptible) -> effect tags -> commit -> surface
//! ```
//!
//! - The **element model** ([`Element`], [`Props`]) describes the desired
//!   tree: host elements map to surface nodes, [`Component`] elements are
//!   pure props-to-element functions.
//! - The **reconciliation engine** walks a fiber tree one unit of work at a
//!   time, diffing each unit's children positionally against the previous
//!   committed tree and tagging units PLACE, UPDATE, or REMOVE.
//! - The **work scheduler** ([`Renderer`]) drives the walk across
//!   cooperative time slices granted through the [`Deadline`] trait,
//!   suspending only between units.
//! - The **commit engine** applies the accumulated effects to the
//!   [`Surface`] in one uninterrupted pass and promotes the new tree, so the
//!   surface never shows a half-rendered cycle.
//!
//! The diff is positional and unkeyed: reordering children is seen as
//! per-position updates, and a kind change at a position always replaces the
//! node rather than patching it.
//!
//! # Example
//!
//! ```
//! use resurface_core::{Element, MemorySurface, Renderer};
//!
//! let mut surface = MemorySurface::new();
//! let container = surface.create_root();
//! let mut renderer = Renderer::new(surface);
//!
//! let tree = Element::host("div").with_child(Element::host("span").with_child("x"));
//! let summary = renderer.render_sync(tree, container)?;
//! assert_eq!(summary.placements, 3);
//!
//! // Re-rendering reuses the surface nodes and applies only the diff.
//! let tree = Element::host("div")
//!     .with_child(Element::host("span").with_attr("class", "a").with_child("x"));
//! let summary = renderer.render_sync(tree, container)?;
//! assert_eq!(summary.placements, 0);
//! assert_eq!(summary.mutations, 1);
//! # Ok::<(), resurface_core::RenderError>(())
//! ```

mod commit;
mod element;
mod fiber;
mod reconcile;
mod scheduler;
mod surface;

pub use commit::CommitSummary;
pub use element::{
    AttrValue, Component, ComponentError, ComponentResult, Element, ElementKind, Event, Listener,
    Props, TEXT_ATTR, TEXT_TAG,
};
pub use fiber::EffectTag;
pub use scheduler::{Deadline, RenderError, Renderer, TimeBudget, Unlimited};
pub use surface::{MemorySurface, NodeId, Surface, SurfaceOp};
