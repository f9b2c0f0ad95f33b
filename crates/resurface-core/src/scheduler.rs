//! Work scheduler: drives the walk across cooperative time slices.
//!
//! A [`Renderer`] is one render session: it owns the surface, the fiber
//! arena, and the cycle state (current tree, in-progress root, next unit,
//! pending removals). The host grants it time slices by calling
//! [`Renderer::work_loop`] with a [`Deadline`], re-invoking it per granted
//! slice in the style of an idle-callback loop; idle slices are a no-op.
//! Suspension happens only between units of work, never mid-unit, and the
//! commit at the end of a completed walk runs without yielding.
//!
//! Exactly one cycle is in progress at a time. Calling
//! [`Renderer::render`] while a cycle is active overwrites it
//! (last-call-wins, no queuing): the superseded tree is discarded before any
//! of its effects could have reached the surface.

use crate::commit::{self, CommitSummary};
use crate::element::{ComponentError, Element, ElementKind, Props};
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId};
use crate::reconcile;
use crate::surface::{NodeId, Surface};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Kind tag given to the synthetic root work unit of each cycle.
const ROOT_TAG: &str = "#root";

/// A slice yields once the remaining budget drops below this, matching the
/// host idle-callback convention the original loop was written against.
const YIELD_THRESHOLD: Duration = Duration::from_millis(1);

/// Error returned when a render cycle is abandoned.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A component mapping function failed. The in-progress tree was
    /// discarded before commit; the previously committed tree and the
    /// surface are fully intact.
    #[error("component render failed: {0}")]
    Component(ComponentError),
}

/// Remaining-time estimator supplied by the cooperative scheduler, one per
/// granted slice.
pub trait Deadline {
    /// Estimate of the time left in the current slice.
    fn time_remaining(&self) -> Duration;
}

/// Deadline that never expires; a slice with it runs the walk to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl Deadline for Unlimited {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Wall-clock slice budget measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    start: Instant,
    budget: Duration,
}

impl TimeBudget {
    /// Start a slice budget now.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }
}

impl Deadline for TimeBudget {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }
}

/// A render session: reconciles element trees onto one surface.
#[derive(Debug)]
pub struct Renderer<S: Surface> {
    surface: S,
    arena: FiberArena,
    current: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    deletions: Vec<FiberId>,
}

impl<S: Surface> Renderer<S> {
    /// Create a session that renders onto `surface`.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            arena: FiberArena::new(),
            current: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
        }
    }

    /// The surface this session renders onto.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface (e.g. to dispatch events on it).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Consume the session, returning the surface.
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Whether no render cycle is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.wip_root.is_none()
    }

    /// Start a render cycle for `element` inside `container`.
    ///
    /// Seeds a root work unit owning the container node, with the previously
    /// committed tree as its counterpart and `element` as its sole child.
    /// Any cycle already in progress is discarded, unseen by the surface.
    /// The cycle makes progress only through subsequent [`Self::work_loop`]
    /// slices.
    pub fn render(&mut self, element: Element, container: NodeId) {
        self.discard_in_progress();

        let mut props = Props::new();
        props.children.push(element);
        let mut root = Fiber::new(ElementKind::Host(ROOT_TAG.to_string()), props);
        root.surface_node = Some(container);
        root.counterpart = self.current;

        let root = self.arena.alloc(root);
        self.wip_root = Some(root);
        self.next_unit = Some(root);
    }

    /// Run one cooperative slice.
    ///
    /// Performs units of work until the deadline runs out or the walk
    /// completes; at least one unit runs per non-idle slice. When the walk
    /// completes, the accumulated effects are committed in one uninterrupted
    /// pass, the tree is promoted to current, and the commit summary is
    /// returned. `Ok(None)` means work remains (or the session was idle) and
    /// the host should grant another slice.
    ///
    /// # Errors
    ///
    /// A failing component abandons the cycle and returns
    /// [`RenderError::Component`]; the committed tree and surface are left
    /// exactly as they were.
    pub fn work_loop(&mut self, deadline: &impl Deadline) -> Result<Option<CommitSummary>, RenderError> {
        let mut committed = None;
        while self.wip_root.is_some() {
            let unit = self
                .next_unit
                .expect("an active render cycle always has a next unit");
            match reconcile::begin_work(&mut self.arena, &mut self.surface, &mut self.deletions, unit)
            {
                Ok(next) => {
                    self.next_unit = next;
                    if next.is_none() {
                        committed = Some(self.complete());
                    }
                }
                Err(err) => {
                    self.discard_in_progress();
                    return Err(err);
                }
            }
            if deadline.time_remaining() < YIELD_THRESHOLD {
                break;
            }
        }
        Ok(committed)
    }

    /// Render synchronously: schedule `element` and run the walk to
    /// completion in one unlimited slice.
    ///
    /// # Errors
    ///
    /// See [`Self::work_loop`].
    pub fn render_sync(
        &mut self,
        element: Element,
        container: NodeId,
    ) -> Result<CommitSummary, RenderError> {
        self.render(element, container);
        Ok(self
            .work_loop(&Unlimited)?
            .expect("an unlimited slice completes the walk"))
    }

    /// Commit the completed walk and promote the tree to current.
    fn complete(&mut self) -> CommitSummary {
        let wip = self
            .wip_root
            .take()
            .expect("commit requires an in-progress root");
        let deletions = std::mem::take(&mut self.deletions);
        let summary = commit::commit_root(&mut self.arena, &mut self.surface, &deletions, wip);

        // The whole previous tree (including the fibers marked for removal,
        // which live in its chains) is obsolete once promoted.
        if let Some(old) = self.arena[wip].counterpart.take() {
            self.arena.release_tree(old);
        }
        self.current = Some(wip);
        self.next_unit = None;
        summary
    }

    /// Discard a superseded or failed in-progress cycle.
    ///
    /// Nothing from it has been attached to the surface, so dropping the
    /// fibers and resetting the removal marks restores the pre-cycle state.
    fn discard_in_progress(&mut self) {
        for id in self.deletions.drain(..) {
            if self.arena.contains(id) {
                self.arena[id].effect = EffectTag::None;
            }
        }
        if let Some(wip) = self.wip_root.take() {
            self.arena.release_tree(wip);
        }
        self.next_unit = None;
    }

    #[cfg(test)]
    pub(crate) fn live_fibers(&self) -> usize {
        self.arena.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AttrValue, Component, Listener};
    use crate::surface::{MemorySurface, SurfaceOp};

    /// Deadline that expires immediately: each slice performs exactly one
    /// unit of work.
    struct SingleUnit;

    impl Deadline for SingleUnit {
        fn time_remaining(&self) -> Duration {
            Duration::ZERO
        }
    }

    fn session() -> (Renderer<MemorySurface>, NodeId) {
        let mut surface = MemorySurface::new();
        let container = surface.create_root();
        (Renderer::new(surface), container)
    }

    #[test]
    fn test_idle_slice_is_noop() {
        let (mut renderer, _) = session();
        assert!(renderer.is_idle());
        let outcome = renderer.work_loop(&Unlimited).expect("nothing to fail");
        assert_eq!(outcome, None);
    }

    #[test]
    fn test_render_sync_builds_surface_tree() {
        let (mut renderer, container) = session();
        let tree = Element::host("div").with_child(Element::host("span").with_child("x"));

        let summary = renderer.render_sync(tree, container).expect("hosts only");
        assert_eq!(summary.placements, 3); // div, span, text
        assert_eq!(summary.removals, 0);

        let surface = renderer.surface();
        let div = surface.children(container)[0];
        let span = surface.children(div)[0];
        let text = surface.children(span)[0];
        assert_eq!(surface.tag(div), "div");
        assert_eq!(surface.tag(span), "span");
        assert_eq!(
            surface.attr(text, crate::element::TEXT_ATTR),
            Some(&AttrValue::from("x"))
        );
    }

    #[test]
    fn test_sliced_render_commits_only_at_completion() {
        let (mut renderer, container) = session();
        let tree = Element::host("div")
            .with_child(Element::host("h1"))
            .with_child(Element::host("h2"));
        renderer.render(tree, container);

        let mut slices = 0;
        let summary = loop {
            slices += 1;
            if let Some(summary) = renderer.work_loop(&SingleUnit).expect("hosts only") {
                break summary;
            }
            // Until the walk completes, nothing is attached to the surface.
            assert!(renderer.surface().children(container).is_empty());
        };

        // Root, div, h1, h2: four units, one per slice.
        assert_eq!(slices, 4);
        assert_eq!(summary.placements, 3);
        assert!(renderer.is_idle());
        assert_eq!(renderer.surface().children(container).len(), 1);
    }

    #[test]
    fn test_rerender_reuses_nodes_and_applies_diff() {
        let (mut renderer, container) = session();
        let listener = Listener::new(|_| {});

        let first = Element::host("div").with_child(
            Element::host("span")
                .with_attr("class", "a")
                .on("click", listener.clone()),
        );
        renderer.render_sync(first, container).expect("hosts only");
        let div = renderer.surface().children(container)[0];
        let span = renderer.surface().children(div)[0];
        renderer.surface_mut().take_ops();

        let second = Element::host("div").with_child(
            Element::host("span")
                .with_attr("class", "b")
                .on("click", listener),
        );
        let summary = renderer.render_sync(second, container).expect("hosts only");

        assert_eq!(summary.placements, 0);
        assert_eq!(summary.removals, 0);
        assert_eq!(summary.mutations, 1);
        // Same node identity, new attribute, unchanged listener untouched.
        assert_eq!(renderer.surface().children(div), &[span]);
        assert_eq!(
            renderer.surface().ops(),
            &[SurfaceOp::SetAttr {
                node: span,
                name: "class".to_string()
            }]
        );
    }

    #[test]
    fn test_idempotent_rerender_has_zero_mutations() {
        let (mut renderer, container) = session();
        let build = || {
            Element::host("div")
                .with_attr("id", "root")
                .with_child(Element::host("span").with_child("x"))
        };

        renderer.render_sync(build(), container).expect("hosts only");
        renderer.surface_mut().take_ops();
        let summary = renderer.render_sync(build(), container).expect("hosts only");

        assert_eq!(summary.placements, 0);
        assert_eq!(summary.removals, 0);
        assert_eq!(summary.mutations, 0);
        assert_eq!(summary.updates, 3); // div, span, text revisited
        assert!(renderer.surface().ops().is_empty());
    }

    #[test]
    fn test_kind_change_replaces_node() {
        let (mut renderer, container) = session();
        renderer
            .render_sync(
                Element::host("div").with_child(Element::host("span")),
                container,
            )
            .expect("hosts only");
        let div = renderer.surface().children(container)[0];
        let span = renderer.surface().children(div)[0];

        let summary = renderer
            .render_sync(
                Element::host("div").with_child(Element::host("p")),
                container,
            )
            .expect("hosts only");

        assert_eq!(summary.removals, 1);
        assert_eq!(summary.placements, 1);
        let children = renderer.surface().children(div);
        assert_eq!(children.len(), 1);
        assert_ne!(children[0], span);
        assert_eq!(renderer.surface().tag(children[0]), "p");
        // The div itself kept its identity.
        assert_eq!(renderer.surface().children(container), &[div]);
    }

    #[test]
    fn test_component_error_leaves_surface_intact() {
        let (mut renderer, container) = session();
        renderer
            .render_sync(Element::host("div").with_child("ok"), container)
            .expect("hosts only");
        let div = renderer.surface().children(container)[0];

        let failing = Component::new(|_| Err("component exploded".into()));
        let err = renderer
            .render_sync(
                Element::host("div").with_child(Element::component(failing)),
                container,
            )
            .expect_err("component raises");

        assert!(matches!(err, RenderError::Component(_)));
        assert!(renderer.is_idle());
        assert_eq!(renderer.surface().children(container), &[div]);

        // The session recovers on the next render.
        let summary = renderer
            .render_sync(Element::host("div").with_child("ok"), container)
            .expect("hosts only");
        assert_eq!(summary.removals, 0);
    }

    #[test]
    fn test_render_overwrites_in_progress_cycle() {
        let (mut renderer, container) = session();
        renderer
            .render_sync(Element::host("div").with_child(Element::host("h1")), container)
            .expect("hosts only");

        // Start a second cycle but give it only one unit of work.
        renderer.render(
            Element::host("div").with_child(Element::host("h2")),
            container,
        );
        renderer.work_loop(&SingleUnit).expect("hosts only");
        assert!(!renderer.is_idle());

        // Last call wins: the third render supersedes the unfinished second.
        let summary = renderer
            .render_sync(
                Element::host("div").with_child(Element::host("h3")),
                container,
            )
            .expect("hosts only");
        assert_eq!(summary.removals, 1); // h1 replaced by h3

        let surface = renderer.surface();
        let div = surface.children(container)[0];
        assert_eq!(surface.tag(surface.children(div)[0]), "h3");
    }

    #[test]
    fn test_committed_trees_do_not_accumulate() {
        let (mut renderer, container) = session();
        let build = || {
            Element::host("div")
                .with_child(Element::host("h1"))
                .with_child(Element::host("h2"))
        };

        renderer.render_sync(build(), container).expect("hosts only");
        let live_after_first = renderer.live_fibers();
        for _ in 0..5 {
            renderer.render_sync(build(), container).expect("hosts only");
        }

        // Only the current tree stays live: root + div + h1 + h2.
        assert_eq!(live_after_first, 4);
        assert_eq!(renderer.live_fibers(), live_after_first);
    }

    #[test]
    fn test_component_tree_renders_through() {
        let (mut renderer, container) = session();
        let greeter = Component::pure(|props| {
            let name = props
                .attr("name")
                .map(ToString::to_string)
                .unwrap_or_default();
            Element::host("h1").with_child(Element::text(format!("hello {name}")))
        });

        renderer
            .render_sync(
                Element::component(greeter.clone()).with_attr("name", "world"),
                container,
            )
            .expect("pure component");
        let h1 = renderer.surface().children(container)[0];
        let text = renderer.surface().children(h1)[0];
        assert_eq!(
            renderer.surface().attr(text, crate::element::TEXT_ATTR),
            Some(&AttrValue::from("hello world"))
        );

        // Same component handle, new props: the h1 and text nodes survive.
        let summary = renderer
            .render_sync(
                Element::component(greeter).with_attr("name", "fiber"),
                container,
            )
            .expect("pure component");
        assert_eq!(summary.placements, 0);
        assert_eq!(summary.mutations, 1);
        assert_eq!(renderer.surface().children(container), &[h1]);
    }

    #[test]
    fn test_time_budget_deadline_expires() {
        let budget = TimeBudget::new(Duration::ZERO);
        assert_eq!(budget.time_remaining(), Duration::ZERO);
        assert_eq!(Unlimited.time_remaining(), Duration::MAX);
    }
}
