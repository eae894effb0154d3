//! Reconciliation: turn a fresh layout into enter/update/exit changes.
//!
//! Nodes are keyed by their render id, links by the id of their target
//! node. New nodes grow out of the source node's previous position,
//! vanishing nodes shrink into its new position, everything else moves from
//! its cached `(x0, y0)` to its new place. After a pass the cache holds the
//! new layout, never an in-flight value.

use generational_arena::Index;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::application::layout::Layout;
use crate::domain::{DomainResult, NodeId, Point, TreeArena, TreeNode};
use crate::infrastructure::traits::DrawingSurface;

/// Cubic ease-in-out over `t` in [0, 1].
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Movement of one endpoint over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub from: Point,
    pub to: Point,
    pub duration: f64,
}

impl Transition {
    pub fn new(from: Point, to: Point, duration: f64) -> Self {
        Self { from, to, duration }
    }

    pub fn progress(&self, elapsed: f64) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Eased position `elapsed` time units after the start.
    pub fn position_at(&self, elapsed: f64) -> Point {
        self.from
            .lerp(self.to, ease_cubic_in_out(self.progress(elapsed)))
    }

    pub fn is_finished(&self, elapsed: f64) -> bool {
        self.progress(elapsed) >= 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

/// What happens to one node during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeChange {
    pub id: NodeId,
    /// Model handle; `None` for nodes of a replaced document
    #[serde(skip)]
    pub index: Option<Index>,
    pub label: String,
    /// Has hidden children
    pub collapsed: bool,
    /// Has children, shown or hidden
    pub container: bool,
    pub phase: Phase,
    pub transition: Transition,
}

/// What happens to one parent-child link during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkChange {
    /// Id of the child node, which identifies the link
    pub target: NodeId,
    pub phase: Phase,
    /// Parent end
    pub start: Transition,
    /// Child end
    pub end: Transition,
}

/// Changes produced by one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    /// Node the pass was triggered from
    pub source: NodeId,
    pub duration: f64,
    pub nodes: Vec<NodeChange>,
    pub links: Vec<LinkChange>,
}

impl RenderPlan {
    pub fn nodes_in(&self, phase: Phase) -> impl Iterator<Item = &NodeChange> {
        self.nodes.iter().filter(move |n| n.phase == phase)
    }

    pub fn links_in(&self, phase: Phase) -> impl Iterator<Item = &LinkChange> {
        self.links.iter().filter(move |l| l.phase == phase)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeChange> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Hand every change to the drawing surface.
    pub fn draw(&self, surface: &mut dyn DrawingSurface) {
        for node in &self.nodes {
            match node.phase {
                Phase::Enter => surface.enter_node(node),
                Phase::Update => surface.update_node(node),
                Phase::Exit => surface.exit_node(node),
            }
        }
        for link in &self.links {
            match link.phase {
                Phase::Enter => surface.enter_link(link),
                Phase::Update => surface.update_link(link),
                Phase::Exit => surface.exit_link(link),
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Rendered {
    index: Option<Index>,
    label: String,
    collapsed: bool,
    container: bool,
    position: Point,
    parent_position: Option<Point>,
}

/// Keeps track of what was drawn last and hands out render ids.
#[derive(Debug, Default)]
pub struct Reconciler {
    next_id: u64,
    rendered: IndexMap<NodeId, Rendered>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `node`, assigning the next one on first use.
    pub fn assign_id(&mut self, node: &mut TreeNode) -> NodeId {
        *node.id.get_or_insert_with(|| {
            self.next_id += 1;
            NodeId(self.next_id)
        })
    }

    pub fn is_rendered(&self, id: NodeId) -> bool {
        self.rendered.contains_key(&id)
    }

    /// Forget the model handles of everything on screen.
    ///
    /// Called when the document is replaced; the old nodes still exit on the
    /// next pass but no longer point into the new arena.
    pub fn detach_model(&mut self) {
        for entry in self.rendered.values_mut() {
            entry.index = None;
        }
    }

    /// Ids drawn by the last pass, root first.
    pub fn rendered_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rendered.keys().copied()
    }

    #[instrument(level = "debug", skip_all)]
    pub fn reconcile(
        &mut self,
        tree: &mut TreeArena,
        source: Index,
        layout: &Layout,
        duration: f64,
    ) -> DomainResult<RenderPlan> {
        let source_node = tree.node_mut(source)?;
        let source_id = self.assign_id(source_node);
        let source_before = source_node.position();
        let source_after = layout.position(source).unwrap_or(source_before);

        let mut nodes = Vec::with_capacity(layout.nodes.len());
        let mut links = Vec::with_capacity(layout.links.len());
        let mut rendered = IndexMap::with_capacity(layout.nodes.len());

        for &idx in &layout.nodes {
            let Some(to) = layout.position(idx) else {
                continue;
            };
            let parent_to = tree
                .get_node(idx)
                .and_then(|n| n.parent)
                .and_then(|p| layout.position(p));
            let Some(node) = tree.get_node_mut(idx) else {
                continue;
            };
            let id = self.assign_id(node);
            let entry = Rendered {
                index: Some(idx),
                label: node.data.name.clone(),
                collapsed: node.is_collapsed(),
                container: node.has_children(),
                position: to,
                parent_position: parent_to,
            };

            let (phase, from) = match self.rendered.get(&id) {
                Some(_) => (Phase::Update, node.position()),
                None => (Phase::Enter, source_before),
            };
            nodes.push(change_for(id, &entry, phase, Transition::new(from, to, duration)));

            if let Some(parent_to) = parent_to {
                let previous = self
                    .rendered
                    .get(&id)
                    .and_then(|r| r.parent_position.map(|pp| (pp, r.position)));
                let (phase, start_from, end_from) = match previous {
                    Some((pp, p)) => (Phase::Update, pp, p),
                    None => (Phase::Enter, source_before, source_before),
                };
                links.push(LinkChange {
                    target: id,
                    phase,
                    start: Transition::new(start_from, parent_to, duration),
                    end: Transition::new(end_from, to, duration),
                });
            }

            node.set_position(to);
            rendered.insert(id, entry);
        }

        for (&id, old) in &self.rendered {
            if rendered.contains_key(&id) {
                continue;
            }
            trace!("reconcile: {} exits", id);
            nodes.push(change_for(
                id,
                old,
                Phase::Exit,
                Transition::new(old.position, source_after, duration),
            ));
            if let Some(pp) = old.parent_position {
                links.push(LinkChange {
                    target: id,
                    phase: Phase::Exit,
                    start: Transition::new(pp, source_after, duration),
                    end: Transition::new(old.position, source_after, duration),
                });
            }
        }

        self.rendered = rendered;
        let plan = RenderPlan {
            source: source_id,
            duration,
            nodes,
            links,
        };
        debug!(
            "reconcile: source {} enter={} update={} exit={}",
            source_id,
            plan.nodes_in(Phase::Enter).count(),
            plan.nodes_in(Phase::Update).count(),
            plan.nodes_in(Phase::Exit).count()
        );
        Ok(plan)
    }
}

fn change_for(id: NodeId, entry: &Rendered, phase: Phase, transition: Transition) -> NodeChange {
    NodeChange {
        id,
        index: entry.index,
        label: entry.label.clone(),
        collapsed: entry.collapsed,
        container: entry.container,
        phase,
        transition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::layout::{compute_layout, LabelMetrics};
    use crate::config::LayoutConfig;
    use crate::domain::{import, Viewport};

    fn pass(reconciler: &mut Reconciler, tree: &mut TreeArena, source: Index) -> RenderPlan {
        let layout = compute_layout(
            tree,
            &LabelMetrics::measure(tree),
            Viewport::new(800.0, 600.0),
            &LayoutConfig::default(),
        );
        reconciler.reconcile(tree, source, &layout, 750.0).unwrap()
    }

    #[test]
    fn test_first_pass_enters_everything_from_source() {
        let mut tree = import("<r><a/><b><c/></b></r>").unwrap();
        let root = tree.root().unwrap();
        tree.node_mut(root).unwrap().set_position(Point::new(300.0, 0.0));
        let mut reconciler = Reconciler::new();

        let plan = pass(&mut reconciler, &mut tree, root);

        assert_eq!(plan.nodes_in(Phase::Enter).count(), 4);
        assert_eq!(plan.links_in(Phase::Enter).count(), 3);
        for node in &plan.nodes {
            assert_eq!(node.transition.from, Point::new(300.0, 0.0));
        }
        for (_, node) in tree.iter() {
            assert!(node.id.is_some());
        }
    }

    #[test]
    fn test_ids_are_monotonic_and_stable() {
        let mut tree = import("<r><a/><b/></r>").unwrap();
        let root = tree.root().unwrap();
        let mut reconciler = Reconciler::new();

        pass(&mut reconciler, &mut tree, root);
        let first: Vec<_> = tree.iter().map(|(_, n)| n.id.unwrap()).collect();
        assert_eq!(first, vec![NodeId(1), NodeId(2), NodeId(3)]);

        let plan = pass(&mut reconciler, &mut tree, root);
        let second: Vec<_> = tree.iter().map(|(_, n)| n.id.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(plan.nodes_in(Phase::Update).count(), 3);
    }

    #[test]
    fn test_collapse_exits_towards_new_source_position() {
        let mut tree = import("<r><a><x/><y/></a><b/></r>").unwrap();
        let root = tree.root().unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut reconciler = Reconciler::new();
        pass(&mut reconciler, &mut tree, root);

        tree.node_mut(a).unwrap().branch.collapse();
        let plan = pass(&mut reconciler, &mut tree, a);

        let a_after = tree.get_node(a).unwrap().position();
        let exiting: Vec<_> = plan.nodes_in(Phase::Exit).collect();
        assert_eq!(exiting.len(), 2);
        for node in exiting {
            assert_eq!(node.transition.to, a_after);
            assert!(!reconciler.is_rendered(node.id));
            assert!(node.index.is_some());
        }
        assert_eq!(plan.links_in(Phase::Exit).count(), 2);
        assert!(plan.node(tree.get_node(a).unwrap().id.unwrap()).unwrap().collapsed);
    }

    #[test]
    fn test_update_starts_from_cached_position() {
        let mut tree = import("<r><a/><b/></r>").unwrap();
        let root = tree.root().unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut reconciler = Reconciler::new();
        pass(&mut reconciler, &mut tree, root);

        let settled = tree.get_node(a).unwrap().position();
        tree.node_mut(a).unwrap().set_position(Point::new(-5.0, 99.0));
        let plan = pass(&mut reconciler, &mut tree, root);

        let change = plan.node(tree.get_node(a).unwrap().id.unwrap()).unwrap();
        assert_eq!(change.phase, Phase::Update);
        assert_eq!(change.transition.from, Point::new(-5.0, 99.0));
        assert_eq!(change.transition.to, settled);
        assert_eq!(tree.get_node(a).unwrap().position(), settled);
    }

    #[test]
    fn test_transition_easing_endpoints() {
        let t = Transition::new(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 750.0);
        assert_eq!(t.position_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(t.position_at(375.0), Point::new(5.0, 10.0));
        assert_eq!(t.position_at(2000.0), Point::new(10.0, 20.0));
        assert!(t.is_finished(750.0));
        assert!(!t.is_finished(10.0));
    }
}
