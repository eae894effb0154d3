//! Layout engine: positions for the currently visible tree.
//!
//! The across-depth coordinate comes from a tidy tree layout
//! (Reingold-Tilford with Walker's linear-time improvements). Siblings are
//! one unit apart, cousins two. The result is scaled so that the whole
//! tree spans `max_level_width * row_pitch`. The along-depth coordinate is
//! `depth * max_label_length * label_char_width`.

use std::collections::HashMap;

use generational_arena::Index;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::LayoutConfig;
use crate::domain::{Point, TreeArena, Viewport};

/// Longest label over the visible tree.
///
/// Measured on import and on structural rebuilds only. Collapsing,
/// expanding and drops in between leave it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelMetrics {
    pub max_label_length: usize,
}

impl LabelMetrics {
    pub fn measure(tree: &TreeArena) -> Self {
        let max_label_length = tree
            .iter()
            .map(|(_, node)| node.data.name.chars().count())
            .max()
            .unwrap_or(0);
        Self { max_label_length }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Parent-child edge between two visible nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: Index,
    pub target: Index,
}

/// Positions computed for one render pass.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Visible nodes, post-order reversed (root first)
    pub nodes: Vec<Index>,
    /// One link per visible non-root node, in `nodes` order
    pub links: Vec<Link>,
    /// Number of visible nodes per depth
    pub level_widths: Vec<usize>,
    pub size: Size,
    positions: HashMap<Index, Point>,
    depths: HashMap<Index, usize>,
}

impl Layout {
    pub fn position(&self, idx: Index) -> Option<Point> {
        self.positions.get(&idx).copied()
    }

    pub fn depth(&self, idx: Index) -> Option<usize> {
        self.depths.get(&idx).copied()
    }

    pub fn is_visible(&self, idx: Index) -> bool {
        self.positions.contains_key(&idx)
    }

    pub fn max_level_width(&self) -> usize {
        self.level_widths.iter().copied().max().unwrap_or(0)
    }
}

/// Count visible nodes per depth; collapsed subtrees contribute nothing.
pub fn level_widths(tree: &TreeArena) -> Vec<usize> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };
    let mut widths = vec![1];
    let mut stack = vec![(root, 0usize)];
    while let Some((idx, level)) = stack.pop() {
        let Some(node) = tree.get_node(idx) else {
            continue;
        };
        let children = node.visible_children();
        if children.is_empty() {
            continue;
        }
        if widths.len() <= level + 1 {
            widths.push(0);
        }
        widths[level + 1] += children.len();
        stack.extend(children.iter().map(|&c| (c, level + 1)));
    }
    widths
}

/// Compute positions for every visible node.
#[instrument(level = "debug", skip_all)]
pub fn compute_layout(
    tree: &TreeArena,
    metrics: &LabelMetrics,
    viewport: Viewport,
    config: &LayoutConfig,
) -> Layout {
    let Some(root) = tree.root() else {
        return Layout::default();
    };

    let level_widths = level_widths(tree);
    let max_width = level_widths.iter().copied().max().unwrap_or(1);
    let size = Size {
        width: viewport.width,
        height: max_width as f64 * config.row_pitch,
    };

    let mut walker = TidyTree::wrap(tree, root);
    walker.run();
    let depth_step = metrics.max_label_length as f64 * config.label_char_width;

    let mut positions = HashMap::with_capacity(walker.nodes.len());
    let mut depths = HashMap::with_capacity(walker.nodes.len());
    for (idx, x, depth) in walker.normalized(size.height) {
        positions.insert(idx, Point::new(x, depth as f64 * depth_step));
        depths.insert(idx, depth);
    }

    let mut nodes: Vec<Index> = tree.iter_postorder().map(|(i, _)| i).collect();
    nodes.reverse();
    let links = nodes
        .iter()
        .filter_map(|&target| {
            let source = tree.get_node(target)?.parent?;
            Some(Link { source, target })
        })
        .collect();

    debug!(
        "compute_layout: {} nodes, level widths {:?}, height {}",
        nodes.len(),
        level_widths,
        size.height
    );
    Layout {
        nodes,
        links,
        level_widths,
        size,
        positions,
        depths,
    }
}

#[derive(Debug)]
struct WalkNode {
    /// Model node, None for the synthetic super-root
    node: Option<Index>,
    parent: usize,
    children: Vec<usize>,
    /// Position among siblings
    number: usize,
    depth: usize,
    ancestor: usize,
    default_ancestor: Option<usize>,
    thread: Option<usize>,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    x: f64,
}

impl WalkNode {
    fn new(id: usize, node: Option<Index>, parent: usize, number: usize, depth: usize) -> Self {
        Self {
            node,
            parent,
            children: Vec::new(),
            number,
            depth,
            ancestor: id,
            default_ancestor: None,
            thread: None,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            x: 0.0,
        }
    }
}

const SUPER_ROOT: usize = 0;
const ROOT: usize = 1;

/// Working copy of the visible tree for the tidy layout walks.
struct TidyTree {
    nodes: Vec<WalkNode>,
}

impl TidyTree {
    fn wrap(tree: &TreeArena, root: Index) -> Self {
        let mut nodes = vec![
            WalkNode::new(SUPER_ROOT, None, SUPER_ROOT, 0, 0),
            WalkNode::new(ROOT, Some(root), SUPER_ROOT, 0, 0),
        ];
        nodes[SUPER_ROOT].children.push(ROOT);

        let mut queue = vec![ROOT];
        while let Some(current) = queue.pop() {
            let Some(children) = nodes[current]
                .node
                .and_then(|idx| tree.get_node(idx))
                .map(|n| n.visible_children().to_vec())
            else {
                continue;
            };
            let depth = nodes[current].depth + 1;
            for (number, child) in children.into_iter().enumerate() {
                let id = nodes.len();
                nodes.push(WalkNode::new(id, Some(child), current, number, depth));
                nodes[current].children.push(id);
                queue.push(id);
            }
        }
        Self { nodes }
    }

    fn run(&mut self) {
        for v in self.post_order() {
            self.first_walk(v);
        }
        self.nodes[SUPER_ROOT].modifier = -self.nodes[ROOT].prelim;
        for v in self.pre_order() {
            self.second_walk(v);
        }
    }

    fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend(self.nodes[v].children.iter().rev());
        }
        order
    }

    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(v) = stack.pop() {
            order.push(v);
            stack.extend(self.nodes[v].children.iter());
        }
        order.reverse();
        order
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.nodes[a].parent == self.nodes[b].parent {
            1.0
        } else {
            2.0
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.first().copied().or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.last().copied().or(self.nodes[v].thread)
    }

    fn left_sibling(&self, v: usize) -> Option<usize> {
        let number = self.nodes[v].number;
        (number > 0).then(|| self.nodes[self.nodes[v].parent].children[number - 1])
    }

    fn first_walk(&mut self, v: usize) {
        let parent = self.nodes[v].parent;
        let w = self.left_sibling(v);

        if let (Some(&first), Some(&last)) =
            (self.nodes[v].children.first(), self.nodes[v].children.last())
        {
            self.execute_shifts(v);
            let midpoint = (self.nodes[first].prelim + self.nodes[last].prelim) / 2.0;
            if let Some(w) = w {
                self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
                self.nodes[v].modifier = self.nodes[v].prelim - midpoint;
            } else {
                self.nodes[v].prelim = midpoint;
            }
        } else if let Some(w) = w {
            self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
        }

        let default_ancestor = self.nodes[parent]
            .default_ancestor
            .unwrap_or(self.nodes[parent].children[0]);
        let ancestor = self.apportion(v, w, default_ancestor);
        self.nodes[parent].default_ancestor = Some(ancestor);
    }

    fn second_walk(&mut self, v: usize) {
        let parent_modifier = self.nodes[self.nodes[v].parent].modifier;
        let node = &mut self.nodes[v];
        node.x = node.prelim + parent_modifier;
        node.modifier += parent_modifier;
    }

    /// Push the subtree of `v` right until it clears its left siblings.
    fn apportion(&mut self, v: usize, w: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = w else {
            return ancestor;
        };
        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = self.nodes[self.nodes[v].parent].children[0];
        let mut sip = self.nodes[vip].modifier;
        let mut sop = self.nodes[vop].modifier;
        let mut sim = self.nodes[vim].modifier;
        let mut som = self.nodes[vom].modifier;

        let (next_vim, next_vip) = loop {
            let next_vim = self.next_right(vim);
            let next_vip = self.next_left(vip);
            let (Some(nvim), Some(nvip)) = (next_vim, next_vip) else {
                break (next_vim, next_vip);
            };
            vim = nvim;
            vip = nvip;
            vom = self.next_left(vom).unwrap_or(vom);
            vop = self.next_right(vop).unwrap_or(vop);
            self.nodes[vop].ancestor = v;

            let shift = self.nodes[vim].prelim + sim - self.nodes[vip].prelim - sip
                + self.separation(vim, vip);
            if shift > 0.0 {
                let moved = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(moved, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.nodes[vim].modifier;
            sip += self.nodes[vip].modifier;
            som += self.nodes[vom].modifier;
            sop += self.nodes[vop].modifier;
        };

        if next_vim.is_some() && self.next_right(vop).is_none() {
            self.nodes[vop].thread = next_vim;
            self.nodes[vop].modifier += sim - sop;
        }
        if next_vip.is_some() && self.next_left(vom).is_none() {
            self.nodes[vom].thread = next_vip;
            self.nodes[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let candidate = self.nodes[vim].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let subtrees = self.nodes[wp].number as f64 - self.nodes[wm].number as f64;
        let change = shift / subtrees;
        self.nodes[wp].change -= change;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += change;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.nodes[v].children.clone();
        for &w in children.iter().rev() {
            let node = &mut self.nodes[w];
            node.prelim += shift;
            node.modifier += shift;
            change += node.change;
            shift += node.shift + change;
        }
    }

    /// Scale across-depth coordinates into `[0, extent]`.
    fn normalized(&self, extent: f64) -> Vec<(Index, f64, usize)> {
        let order = self.pre_order();
        let (mut left, mut right) = (ROOT, ROOT);
        for &v in &order {
            if self.nodes[v].x < self.nodes[left].x {
                left = v;
            }
            if self.nodes[v].x > self.nodes[right].x {
                right = v;
            }
        }
        let tx = self.separation(left, right) / 2.0 - self.nodes[left].x;
        let kx = extent / (self.nodes[right].x + self.separation(right, left) / 2.0 + tx);

        order
            .into_iter()
            .filter_map(|v| {
                let node = &self.nodes[v];
                node.node.map(|idx| (idx, (node.x + tx) * kx, node.depth))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import;

    fn layout_of(tree: &TreeArena) -> Layout {
        compute_layout(
            tree,
            &LabelMetrics::measure(tree),
            Viewport::new(800.0, 600.0),
            &LayoutConfig::default(),
        )
    }

    fn at(tree: &TreeArena, layout: &Layout, path: &str) -> Point {
        layout.position(tree.find_path(path).unwrap()).unwrap()
    }

    #[test]
    fn test_concrete_document_positions() {
        let tree = import(r#"<root><a>1</a><b x="1"><c>2</c></b></root>"#).unwrap();
        let layout = layout_of(&tree);

        assert_eq!(layout.level_widths, vec![1, 2, 1]);
        assert_eq!(layout.size.height, 50.0);
        assert_eq!(at(&tree, &layout, "root"), Point::new(25.0, 0.0));
        assert_eq!(at(&tree, &layout, "root/a"), Point::new(12.5, 40.0));
        assert_eq!(at(&tree, &layout, "root/b"), Point::new(37.5, 40.0));
        assert_eq!(at(&tree, &layout, "root/b/c"), Point::new(37.5, 80.0));
    }

    #[test]
    fn test_single_node_is_centered() {
        let tree = import("<only/>").unwrap();
        let layout = layout_of(&tree);
        assert_eq!(layout.size.height, 25.0);
        assert_eq!(at(&tree, &layout, "only"), Point::new(12.5, 0.0));
        assert!(layout.links.is_empty());
    }

    #[test]
    fn test_collapsed_subtree_contributes_nothing() {
        let mut tree = import("<r><a><x/><y/><z/></a><b/></r>").unwrap();
        assert_eq!(level_widths(&tree), vec![1, 2, 3]);

        let a = tree.find_path("r/a").unwrap();
        tree.node_mut(a).unwrap().branch.collapse();
        assert_eq!(level_widths(&tree), vec![1, 2]);

        let layout = layout_of(&tree);
        assert_eq!(layout.nodes.len(), 3);
        assert!(!layout.is_visible(tree.find_path("r/a/x").unwrap()));
    }

    #[test]
    fn test_siblings_do_not_overlap_and_follow_sort_order() {
        let tree = import("<r><b><b1/><b2/></b><a><a1/><a2/><a3/></a><c/></r>").unwrap();
        let layout = layout_of(&tree);

        let xs: Vec<f64> = ["r/a", "r/b", "r/c"]
            .iter()
            .map(|p| at(&tree, &layout, p).x)
            .collect();
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);

        let leaves: Vec<f64> = ["r/a/a1", "r/a/a2", "r/a/a3", "r/b/b1", "r/b/b2"]
            .iter()
            .map(|p| at(&tree, &layout, p).x)
            .collect();
        for pair in leaves.windows(2) {
            assert!(pair[0] < pair[1], "overlap in {leaves:?}");
        }
        for (_, p) in layout.nodes.iter().map(|&i| (i, layout.position(i).unwrap())) {
            assert!(p.x >= 0.0 && p.x <= layout.size.height);
        }
    }

    #[test]
    fn test_depth_uses_longest_label() {
        let tree = import("<r><longname><x/></longname></r>").unwrap();
        let layout = layout_of(&tree);
        assert_eq!(at(&tree, &layout, "r/longname/x").y, 2.0 * 8.0 * 10.0);
    }

    #[test]
    fn test_nodes_start_at_root_and_links_point_to_parents() {
        let tree = import("<r><a><b/></a></r>").unwrap();
        let layout = layout_of(&tree);
        assert_eq!(layout.nodes[0], tree.root().unwrap());
        assert_eq!(layout.links.len(), 2);
        for link in &layout.links {
            assert_eq!(tree.get_node(link.target).unwrap().parent, Some(link.source));
        }
    }
}
