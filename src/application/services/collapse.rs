//! Collapse and expand subtrees
//!
//! Collapsing moves a node's child list into the hidden branch; nothing is
//! copied and the logical model never changes.

use generational_arena::Index;
use tracing::debug;

use crate::domain::{DomainResult, Scope, TreeArena};

/// Flip the branch of `idx`. Returns true when the node ends up collapsed.
///
/// A leaf has nothing to hide and stays expanded.
pub fn toggle(tree: &mut TreeArena, idx: Index) -> DomainResult<bool> {
    let node = tree.node_mut(idx)?;
    let collapsed = if node.branch.is_collapsed() {
        node.branch.expand();
        false
    } else {
        node.branch.collapse()
    };
    debug!("toggle: <{}> collapsed={}", node.data.name, collapsed);
    Ok(collapsed)
}

/// Expand `idx` and every hidden branch below it. Returns how many branches changed.
pub fn expand_all(tree: &mut TreeArena, idx: Index) -> DomainResult<usize> {
    let subtree = logical_subtree(tree, idx)?;
    let mut changed = 0;
    for i in subtree {
        if tree.node_mut(i)?.branch.expand() {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Collapse `idx` and every shown branch below it. Returns how many branches changed.
pub fn collapse_all(tree: &mut TreeArena, idx: Index) -> DomainResult<usize> {
    let subtree = logical_subtree(tree, idx)?;
    let mut changed = 0;
    for i in subtree {
        if tree.node_mut(i)?.branch.collapse() {
            changed += 1;
        }
    }
    Ok(changed)
}

fn logical_subtree(tree: &TreeArena, idx: Index) -> DomainResult<Vec<Index>> {
    tree.node(idx)?;
    Ok(tree.iter_from(idx, Scope::Logical).map(|(i, _)| i).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import;

    #[test]
    fn test_toggle_twice_restores_children() {
        let mut tree = import("<r><a><x/><y/></a></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let before = tree.node(a).unwrap().children().to_vec();

        assert!(toggle(&mut tree, a).unwrap());
        assert!(tree.node(a).unwrap().visible_children().is_empty());
        assert!(!toggle(&mut tree, a).unwrap());

        assert_eq!(tree.node(a).unwrap().visible_children(), before.as_slice());
    }

    #[test]
    fn test_toggle_leaf_is_noop() {
        let mut tree = import("<r><a/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        assert!(!toggle(&mut tree, a).unwrap());
        assert!(!tree.node(a).unwrap().is_collapsed());
    }

    #[test]
    fn test_collapse_all_then_expand_all() {
        let mut tree = import("<r><a><b><c/></b></a><d/></r>").unwrap();
        let root = tree.root().unwrap();

        assert_eq!(collapse_all(&mut tree, root).unwrap(), 3);
        assert_eq!(tree.iter().count(), 1);
        assert_eq!(tree.iter_logical().count(), 5);

        assert_eq!(expand_all(&mut tree, root).unwrap(), 3);
        assert_eq!(tree.iter().count(), 5);
        assert_eq!(expand_all(&mut tree, root).unwrap(), 0);
    }
}
