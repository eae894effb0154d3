//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use generational_arena::Index;
use itertools::Itertools;
use termtree::Tree;

use crate::domain::{NodeData, TreeArena};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print completed action (green label) to stderr, keeping stdout for data
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for documents and machine-readable data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// One-line summary of an element: name, attributes, text.
pub fn node_label(data: &NodeData) -> String {
    let mut label = data.name.clone();
    if !data.attributes.is_empty() {
        let attrs = data
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .join(" ");
        label.push_str(&format!(" [{}]", attrs));
    }
    if let Some(text) = &data.text {
        label.push_str(&format!(" = {:?}", text));
    }
    label
}

/// Logical hierarchy for display, collapsed branches included.
pub fn tree_view(tree: &TreeArena) -> Tree<String> {
    fn build(tree: &TreeArena, idx: Index) -> Tree<String> {
        match tree.get_node(idx) {
            Some(node) => Tree::new(node_label(&node.data))
                .with_leaves(node.children().iter().map(|&c| build(tree, c))),
            None => Tree::new(String::new()),
        }
    }

    match tree.root() {
        Some(root) => build(tree, root),
        None => Tree::new("Empty tree".to_string()),
    }
}
