//! XML serialization of the document hierarchy.
//!
//! Serialization follows the logical model: collapsed children are written
//! exactly like expanded ones.

use generational_arena::Index;
use tracing::instrument;

use crate::domain::arena::TreeArena;
use crate::domain::error::DomainResult;

/// Fixed declaration prefixed to every exported document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize the whole tree, declaration included.
#[instrument(level = "debug", skip_all, fields(nodes = tree.node_count()))]
pub fn export(tree: &TreeArena) -> String {
    let mut out = String::from(XML_DECLARATION);
    if let Some(root) = tree.root() {
        write_element(tree, root, &mut out);
    }
    out
}

/// Serialize a single subtree without declaration.
pub fn export_subtree(tree: &TreeArena, idx: Index) -> DomainResult<String> {
    tree.node(idx)?;
    let mut out = String::new();
    write_element(tree, idx, &mut out);
    Ok(out)
}

fn write_element(tree: &TreeArena, idx: Index, out: &mut String) {
    let Some(node) = tree.get_node(idx) else {
        return;
    };
    let name = node.data.name.as_str();

    out.push('<');
    out.push_str(name);
    for (key, value) in &node.data.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr_into(out, value);
        out.push('"');
    }
    out.push('>');

    if node.has_children() {
        for &child in node.children() {
            write_element(tree, child, out);
        }
    } else if let Some(text) = &node.data.text {
        escape_text_into(out, text);
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_text_into(&mut out, text);
    out
}

fn escape_text_into(out: &mut String, text: &str) {
    escape_into(out, text, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\r' => Some("&#13;"),
        _ => None,
    });
}

// Whitespace is written as character references so that attribute-value
// normalization on re-import does not turn it into spaces.
fn escape_attr_into(out: &mut String, text: &str) {
    escape_into(out, text, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'"' => Some("&quot;"),
        b'\'' => Some("&apos;"),
        b'\t' => Some("&#9;"),
        b'\n' => Some("&#10;"),
        b'\r' => Some("&#13;"),
        _ => None,
    });
}

fn escape_into(out: &mut String, text: &str, escape: impl Fn(u8) -> Option<&'static str>) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let Some(esc) = escape(b) else {
            continue;
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}
