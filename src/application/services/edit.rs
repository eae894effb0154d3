//! Node field editing
//!
//! An edit is validated against the node as it is now and either applied
//! completely or not at all.

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::{DomainError, DomainResult, FieldSet, TreeArena};

/// What an applied edit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The element name changed; labels and sibling order may be stale
    Renamed,
    /// Only attribute or text values changed
    Updated,
}

/// Editable fields of a node. Text is only offered for nodes without children.
pub fn fields_of(tree: &TreeArena, idx: Index) -> DomainResult<FieldSet> {
    let node = tree.node(idx)?;
    let text = if node.has_children() {
        None
    } else {
        Some(node.data.text.clone().unwrap_or_default())
    };
    Ok(FieldSet {
        name: node.data.name.clone(),
        text,
        attributes: node
            .data
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// XML `Name` without colons.
fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

fn prefix_in_scope(tree: &TreeArena, idx: Index, prefix: &str) -> bool {
    let key = format!("xmlns:{prefix}");
    prefix == "xml"
        || std::iter::once(idx)
            .chain(tree.ancestors(idx))
            .filter_map(|i| tree.get_node(i))
            .any(|n| n.data.attributes.contains_key(&key))
}

/// The name must survive export and re-import: a qualified XML name whose
/// prefix, if any, is declared on the node or one of its ancestors.
fn validate_name(tree: &TreeArena, idx: Index, name: &str) -> DomainResult<()> {
    let invalid = |reason: String| {
        Err(DomainError::InvalidField {
            field: "name".to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return invalid("must not be empty".to_string());
    }
    let (prefix, local) = match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    };
    if !is_ncname(local) || !prefix.map_or(true, is_ncname) {
        return invalid(format!("'{name}' is not a valid XML name"));
    }
    if let Some(prefix) = prefix {
        if !prefix_in_scope(tree, idx, prefix) {
            return invalid(format!("namespace prefix '{prefix}' is not declared"));
        }
    }
    Ok(())
}

/// Write `fields` into the node at `idx`.
///
/// Renaming re-sorts the node among its siblings.
#[instrument(level = "debug", skip(tree, fields))]
pub fn apply(tree: &mut TreeArena, idx: Index, fields: &FieldSet) -> DomainResult<EditOutcome> {
    let node = tree.node(idx)?;
    validate_name(tree, idx, &fields.name)?;
    let conflict = |field: &str| DomainError::EditConflict {
        node: node.data.name.clone(),
        field: field.to_string(),
    };
    if let Some((key, _)) = fields
        .attributes
        .iter()
        .find(|(key, _)| !node.data.attributes.contains_key(key))
    {
        return Err(conflict(key));
    }
    if fields.text.is_some() && node.has_children() {
        return Err(conflict("text"));
    }

    let parent = node.parent;
    let node = tree.node_mut(idx)?;
    let renamed = node.data.name != fields.name;
    if renamed {
        debug!("edit: rename <{}> to <{}>", node.data.name, fields.name);
        node.data.name = fields.name.clone();
    }
    for (key, value) in &fields.attributes {
        if let Some(slot) = node.data.attributes.get_mut(key) {
            *slot = value.clone();
        }
    }
    if let Some(text) = &fields.text {
        node.data.text = (!text.is_empty()).then(|| text.clone());
    }

    if renamed {
        if let Some(parent) = parent {
            tree.sort_children(parent)?;
        }
        Ok(EditOutcome::Renamed)
    } else {
        Ok(EditOutcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{export, import, NodeData};
    use rstest::rstest;

    #[test]
    fn test_fields_of_leaf_and_container() {
        let tree = import(r#"<r><a k="v">1</a><b><c/></b></r>"#).unwrap();
        let a = tree.find_path("r/a").unwrap();
        let b = tree.find_path("r/b").unwrap();

        let fields = fields_of(&tree, a).unwrap();
        assert_eq!(fields.name, "a");
        assert_eq!(fields.text.as_deref(), Some("1"));
        assert_eq!(fields.attributes, vec![("k".to_string(), "v".to_string())]);

        assert_eq!(fields_of(&tree, b).unwrap().text, None);
    }

    #[test]
    fn test_apply_updates_in_place() {
        let mut tree = import(r#"<r><a k="v">1</a></r>"#).unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut fields = fields_of(&tree, a).unwrap();
        fields.text = Some("2".to_string());
        assert!(fields.set_attribute("k", "w"));

        assert_eq!(apply(&mut tree, a, &fields).unwrap(), EditOutcome::Updated);
        assert!(export(&tree).ends_with(r#"<r><a k="w">2</a></r>"#));
    }

    #[test]
    fn test_unknown_attribute_discards_whole_edit() {
        let mut tree = import(r#"<r><a k="v">1</a></r>"#).unwrap();
        let a = tree.find_path("r/a").unwrap();
        let before = export(&tree);
        let mut fields = fields_of(&tree, a).unwrap();
        fields.text = Some("changed".to_string());
        fields.attributes.push(("gone".to_string(), "x".to_string()));

        let err = apply(&mut tree, a, &fields).unwrap_err();

        assert!(matches!(err, DomainError::EditConflict { ref field, .. } if field == "gone"));
        assert_eq!(export(&tree), before);
    }

    #[test]
    fn test_text_on_container_conflicts() {
        let mut tree = import("<r><a/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut fields = fields_of(&tree, a).unwrap();
        // the node gained a child after the fields were read
        tree.insert_node(NodeData::new("b"), Some(a));
        fields.text = Some("x".to_string());

        assert!(matches!(
            apply(&mut tree, a, &fields),
            Err(DomainError::EditConflict { .. })
        ));
    }

    #[test]
    fn test_rename_resorts_siblings() {
        let mut tree = import("<r><a/><b/></r>").unwrap();
        let root = tree.root().unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut fields = fields_of(&tree, a).unwrap();
        fields.name = "z".to_string();

        assert_eq!(apply(&mut tree, a, &fields).unwrap(), EditOutcome::Renamed);
        let names: Vec<&str> = tree
            .node(root)
            .unwrap()
            .children()
            .iter()
            .map(|&c| tree.name_of(c))
            .collect();
        assert_eq!(names, vec!["b", "z"]);
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    #[case("a<b")]
    #[case("1bad")]
    #[case("-x")]
    #[case("a!b")]
    #[case("a;b")]
    #[case(".x")]
    #[case("a:b:c")]
    #[case(":a")]
    #[case("undeclared:a")]
    fn test_invalid_names_are_rejected(#[case] name: &str) {
        let mut tree = import("<r><a/></r>").unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut fields = fields_of(&tree, a).unwrap();
        fields.name = name.to_string();

        assert!(matches!(
            apply(&mut tree, a, &fields),
            Err(DomainError::InvalidField { .. })
        ));
        assert_eq!(tree.name_of(a), "a");
    }

    #[rstest]
    #[case("x-1.y")]
    #[case("_a")]
    #[case("\u{e9}t\u{e9}")]
    #[case("p:item")]
    fn test_valid_names_survive_export(#[case] name: &str) {
        let mut tree = import(r#"<r xmlns:p="urn:p"><a/></r>"#).unwrap();
        let a = tree.find_path("r/a").unwrap();
        let mut fields = fields_of(&tree, a).unwrap();
        fields.name = name.to_string();

        assert_eq!(apply(&mut tree, a, &fields).unwrap(), EditOutcome::Renamed);
        let reimported = import(&export(&tree)).unwrap();
        assert!(reimported.iter().any(|(_, n)| n.data.name == name));
    }
}
