//! Tree builder for turning XML text into a document hierarchy.

use generational_arena::Index;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, instrument};

use crate::domain::arena::{NodeData, TreeArena};
use crate::domain::error::{DomainError, DomainResult};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Constructs a [`TreeArena`] from an XML document.
///
/// Only the root element and its element descendants become nodes.
/// Comments and processing instructions are skipped. Character data is kept
/// only for elements without element children.
pub struct TreeBuilder {
    allow_dtd: bool,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { allow_dtd: true }
    }

    /// Reject documents carrying a DOCTYPE declaration.
    pub fn deny_dtd(mut self) -> Self {
        self.allow_dtd = false;
        self
    }

    #[instrument(level = "debug", skip_all, fields(len = xml.len()))]
    pub fn build_from_str(&self, xml: &str) -> DomainResult<TreeArena> {
        if xml.trim().is_empty() {
            return Err(DomainError::parse("empty document"));
        }
        check_encoding(xml)?;

        let options = ParsingOptions {
            allow_dtd: self.allow_dtd,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options)
            .map_err(|e| DomainError::parse(e.to_string()))?;

        let tree = self.build_tree(doc.root_element());
        debug!(
            "build_from_str: {} nodes, depth {}",
            tree.node_count(),
            tree.depth()
        );
        Ok(tree)
    }

    fn build_tree(&self, root: Node<'_, '_>) -> TreeArena {
        let mut tree = TreeArena::new();
        let mut stack: Vec<(Node<'_, '_>, Option<Index>)> = vec![(root, None)];

        while let Some((element, parent_idx)) = stack.pop() {
            let current_idx = tree.insert_node(node_data(element), parent_idx);

            // Push in reverse so children are inserted in document order
            let children: Vec<Node<'_, '_>> = element.children().filter(Node::is_element).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(current_idx)));
            }
        }

        tree.sort_all();
        tree
    }
}

/// Parse XML text into a tree with the default builder.
pub fn import(xml: &str) -> DomainResult<TreeArena> {
    TreeBuilder::new().build_from_str(xml)
}

fn node_data(element: Node<'_, '_>) -> NodeData {
    let mut data = NodeData::new(qualified_name(
        element,
        element.tag_name().namespace(),
        element.tag_name().name(),
    ));

    for (prefix, uri) in declared_namespaces(element) {
        let key = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        data.attributes.insert(key, uri.to_string());
    }
    for attr in element.attributes() {
        data.attributes.insert(
            qualified_name(element, attr.namespace(), attr.name()),
            attr.value().to_string(),
        );
    }

    // Mixed content: element children win, interleaved text is dropped
    if !element.children().any(|n| n.is_element()) {
        let text: String = element
            .children()
            .filter(Node::is_text)
            .filter_map(|n| n.text())
            .collect();
        if !text.is_empty() {
            data.text = Some(text);
        }
    }
    data
}

fn qualified_name(element: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|uri| element.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Namespace declarations introduced by this element rather than inherited.
fn declared_namespaces<'a>(element: Node<'a, '_>) -> Vec<(Option<&'a str>, &'a str)> {
    let inherited: Vec<(Option<&str>, &str)> = element
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    element
        .namespaces()
        .map(|ns| (ns.name(), ns.uri()))
        .filter(|(_, uri)| *uri != XML_NAMESPACE)
        .filter(|decl| !inherited.contains(decl))
        .collect()
}

/// Text handed to us is already UTF-8; a declaration claiming anything else
/// cannot be honoured.
fn check_encoding(xml: &str) -> DomainResult<()> {
    let Some(decl) = xml.trim_start().strip_prefix("<?xml") else {
        return Ok(());
    };
    let Some(end) = decl.find("?>") else {
        return Ok(());
    };
    let decl = &decl[..end];
    let Some(pos) = decl.find("encoding") else {
        return Ok(());
    };
    let value = decl[pos + "encoding".len()..]
        .trim_start()
        .trim_start_matches('=')
        .trim_start();
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(());
    };
    let encoding = value[1..].split(quote).next().unwrap_or_default();
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(()),
        other => Err(DomainError::parse(format!("unsupported encoding: {other}"))),
    }
}
