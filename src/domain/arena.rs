use std::fmt;
use std::mem;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{Attributes, NodeId, Point};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::order::compare_names;

/// Element payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeData {
    /// Element tag, verbatim
    pub name: String,
    /// Attributes in document order
    pub attributes: Attributes,
    /// Character data, only meaningful while the node has no children
    pub text: Option<String>,
}

impl NodeData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Children of a node, either shown or hidden.
///
/// Collapsing moves the list from one variant to the other, so a node can
/// never hold visible and hidden children at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Expanded(Vec<Index>),
    Collapsed(Vec<Index>),
}

impl Default for Branch {
    fn default() -> Self {
        Branch::Expanded(Vec::new())
    }
}

impl Branch {
    /// Logical children, regardless of collapse state.
    pub fn indices(&self) -> &[Index] {
        match self {
            Branch::Expanded(children) | Branch::Collapsed(children) => children,
        }
    }

    fn indices_mut(&mut self) -> &mut Vec<Index> {
        match self {
            Branch::Expanded(children) | Branch::Collapsed(children) => children,
        }
    }

    /// Children that take part in layout.
    pub fn visible(&self) -> &[Index] {
        match self {
            Branch::Expanded(children) => children,
            Branch::Collapsed(_) => &[],
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Branch::Collapsed(_))
    }

    /// Hide the children. Returns false if there was nothing to hide.
    pub fn collapse(&mut self) -> bool {
        match self {
            Branch::Expanded(children) if !children.is_empty() => {
                *self = Branch::Collapsed(mem::take(children));
                true
            }
            _ => false,
        }
    }

    /// Show the children. Returns false if they were already shown.
    pub fn expand(&mut self) -> bool {
        match self {
            Branch::Collapsed(children) => {
                *self = Branch::Expanded(mem::take(children));
                true
            }
            Branch::Expanded(_) => false,
        }
    }

    // An empty hidden list is just a leaf.
    fn normalize(&mut self) {
        if let Branch::Collapsed(children) = self {
            if children.is_empty() {
                *self = Branch::Expanded(Vec::new());
            }
        }
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Element data for this node
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Child indices, shown or hidden
    pub branch: Branch,
    /// Render identity, assigned on first render
    pub id: Option<NodeId>,
    /// Last rendered across-depth coordinate
    pub x0: f64,
    /// Last rendered along-depth coordinate
    pub y0: f64,
}

impl TreeNode {
    fn new(data: NodeData, parent: Option<Index>) -> Self {
        Self {
            data,
            parent,
            branch: Branch::default(),
            id: None,
            x0: 0.0,
            y0: 0.0,
        }
    }

    pub fn children(&self) -> &[Index] {
        self.branch.indices()
    }

    pub fn visible_children(&self) -> &[Index] {
        self.branch.visible()
    }

    pub fn has_children(&self) -> bool {
        !self.branch.indices().is_empty()
    }

    pub fn is_collapsed(&self) -> bool {
        self.branch.is_collapsed()
    }

    pub fn position(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    pub fn set_position(&mut self, position: Point) {
        self.x0 = position.x;
        self.y0 = position.y;
    }
}

/// Which children a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only expanded children
    Visible,
    /// Expanded and collapsed children
    Logical,
}

impl Scope {
    fn children(self, node: &TreeNode) -> &[Index] {
        match self {
            Scope::Visible => node.visible_children(),
            Scope::Logical => node.children(),
        }
    }
}

/// Arena-based tree structure holding one XML document.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Parent links are plain indices, so re-parenting never touches ownership.
#[derive(Debug)]
pub struct TreeArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node and append it to `parent`'s children.
    ///
    /// Inserting without a parent makes the node the root.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node_idx = self.arena.insert(TreeNode::new(data, parent));

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.branch.indices_mut().push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    /// Like [`get_node`](Self::get_node), failing with `NodeNotFound`.
    pub fn node(&self, idx: Index) -> DomainResult<&TreeNode> {
        self.arena.get(idx).ok_or(DomainError::NodeNotFound)
    }

    pub fn node_mut(&mut self, idx: Index) -> DomainResult<&mut TreeNode> {
        self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound)
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn is_root(&self, idx: Index) -> bool {
        self.root == Some(idx)
    }

    /// Number of nodes in the model, collapsed ones included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn name_of(&self, idx: Index) -> &str {
        self.arena
            .get(idx)
            .map(|node| node.data.name.as_str())
            .unwrap_or_default()
    }

    /// Visible nodes in pre-order.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root, Scope::Visible)
    }

    /// All nodes in pre-order, collapsed subtrees included.
    pub fn iter_logical(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root, Scope::Logical)
    }

    /// Pre-order traversal of the subtree below `start`.
    pub fn iter_from(&self, start: Index, scope: Scope) -> TreeIterator<'_> {
        TreeIterator::new(self, Some(start), scope)
    }

    /// Visible nodes in post-order.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, Scope::Visible)
    }

    /// Height of the logical tree, 0 for an empty tree.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children()
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Distance from the root, 0 for the root itself.
    pub fn depth_of(&self, idx: Index) -> usize {
        self.ancestors(idx).count()
    }

    /// Parents of `idx`, nearest first.
    pub fn ancestors(&self, idx: Index) -> impl Iterator<Item = Index> + '_ {
        std::iter::successors(self.get_node(idx).and_then(|n| n.parent), move |&p| {
            self.get_node(p).and_then(|n| n.parent)
        })
    }

    /// True when `idx` lies in the subtree rooted at `ancestor` (inclusive).
    pub fn is_within(&self, idx: Index, ancestor: Index) -> bool {
        idx == ancestor || self.ancestors(idx).any(|a| a == ancestor)
    }

    /// Remove `idx` from its parent's children.
    ///
    /// Returns the former parent. The root cannot be detached.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, idx: Index) -> DomainResult<Index> {
        let parent_idx = self
            .node(idx)?
            .parent
            .ok_or(DomainError::RootNotDraggable)?;
        let parent = self.node_mut(parent_idx)?;
        let children = parent.branch.indices_mut();
        if let Some(pos) = children.iter().position(|&c| c == idx) {
            children.remove(pos);
        }
        parent.branch.normalize();
        self.node_mut(idx)?.parent = None;
        Ok(parent_idx)
    }

    /// Append a detached node to `parent`'s children.
    ///
    /// A leaf parent becomes a container; a collapsed parent stays collapsed.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, idx: Index, parent_idx: Index) -> DomainResult<()> {
        if self.node(idx)?.parent.is_some() || self.is_root(idx) {
            return Err(DomainError::InvalidDropTarget(
                "node is still attached".to_string(),
            ));
        }
        if self.is_within(parent_idx, idx) {
            return Err(DomainError::InvalidDropTarget(
                "cannot attach a node below itself".to_string(),
            ));
        }
        self.node_mut(parent_idx)?.branch.indices_mut().push(idx);
        self.node_mut(idx)?.parent = Some(parent_idx);
        Ok(())
    }

    /// Drop a node and its whole subtree from the model.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, idx: Index) -> DomainResult<usize> {
        if self.is_root(idx) {
            self.root = None;
        } else {
            self.detach(idx)?;
        }
        let doomed: Vec<Index> = self.iter_from(idx, Scope::Logical).map(|(i, _)| i).collect();
        for i in &doomed {
            self.arena.remove(*i);
        }
        Ok(doomed.len())
    }

    /// Stable case-insensitive sort of `idx`'s children by name.
    pub fn sort_children(&mut self, idx: Index) -> DomainResult<()> {
        let mut children = mem::take(self.node_mut(idx)?.branch.indices_mut());
        children.sort_by(|a, b| compare_names(self.name_of(*a), self.name_of(*b)));
        *self.node_mut(idx)?.branch.indices_mut() = children;
        Ok(())
    }

    /// Sort every children list in the model.
    #[instrument(level = "debug", skip(self))]
    pub fn sort_all(&mut self) {
        let all: Vec<Index> = self.iter_logical().map(|(i, _)| i).collect();
        for idx in all {
            // every index was just collected from the arena
            let _ = self.sort_children(idx);
        }
    }

    /// Slash-separated names from the root down to `idx`.
    pub fn path_of(&self, idx: Index) -> String {
        let mut names: Vec<&str> = self.ancestors(idx).map(|a| self.name_of(a)).collect();
        names.reverse();
        names.push(self.name_of(idx));
        names.join("/")
    }

    /// Resolve a slash-separated name path, first match at every level.
    pub fn find_path(&self, path: &str) -> Option<Index> {
        let mut segments = path.trim_matches('/').split('/');
        let mut current = self.root?;
        if segments.next()? != self.name_of(current) {
            return None;
        }
        for segment in segments {
            current = *self
                .get_node(current)?
                .children()
                .iter()
                .find(|&&c| self.name_of(c) == segment)?;
        }
        Some(current)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
    scope: Scope,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena, start: Option<Index>, scope: Scope) -> Self {
        Self {
            arena,
            stack: start.into_iter().collect(),
            scope,
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in self.scope.children(node).iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<(Index, bool)>,
    scope: Scope,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a TreeArena, scope: Scope) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push((root, false));
        }
        Self {
            arena,
            stack,
            scope,
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in self.scope.children(node).iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
