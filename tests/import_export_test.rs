//! Integration tests for XML import and export

use rstest::rstest;

use xmlflux::domain::{export, import, DomainError, Scope, TreeArena, XML_DECLARATION};

const DOC: &str = r#"<root><a>1</a><b x="1"><c>2</c></b></root>"#;

type Shape = (String, Vec<(String, String)>, Option<String>, usize);

/// Every node in document order with its name, attributes, text and child count.
fn shape(tree: &TreeArena) -> Vec<Shape> {
    tree.iter_logical()
        .map(|(_, n)| {
            let attributes = n
                .data
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (n.data.name.clone(), attributes, n.data.text.clone(), n.children().len())
        })
        .collect()
}

#[test]
fn given_sample_document_when_importing_then_builds_expected_model() {
    // Arrange / Act
    let tree = import(DOC).unwrap();

    // Assert
    let root = tree.root().unwrap();
    assert_eq!(tree.name_of(root), "root");
    let children = tree.node(root).unwrap().children().to_vec();
    assert_eq!(children.len(), 2);

    let a = tree.node(children[0]).unwrap();
    assert_eq!(a.data.name, "a");
    assert_eq!(a.data.text.as_deref(), Some("1"));

    let b = tree.node(children[1]).unwrap();
    assert_eq!(b.data.name, "b");
    assert_eq!(b.data.attributes.get("x").map(String::as_str), Some("1"));
    assert_eq!(b.children().len(), 1);
    let c = tree.node(b.children()[0]).unwrap();
    assert_eq!((c.data.name.as_str(), c.data.text.as_deref()), ("c", Some("2")));
}

#[test]
fn given_sample_document_when_exporting_unchanged_then_reproduces_it() {
    // Arrange
    let tree = import(DOC).unwrap();

    // Act
    let xml = export(&tree);

    // Assert
    assert_eq!(xml, format!("{}{}", XML_DECLARATION, DOC));
}

#[rstest]
#[case(r#"<r><e k2="2" k1="1" k3="3"/></r>"#)]
#[case(r#"<r><e q="say &quot;hi&quot; &amp; 'bye'">a &lt; b &amp;&amp; c &gt; d</e></r>"#)]
#[case("<r><a><b><c><d>deep</d></c></b></a></r>")]
#[case(r#"<r xmlns:p="urn:p"><p:x p:attr="v"/></r>"#)]
#[case("<r><e>line\nbreak</e></r>")]
#[case("<r><e>a&#13;b</e><f>x&#13;&#10;y</f></r>")]
#[case(r#"<r><e k="a&#9;b&#10;c&#13;d">t</e></r>"#)]
#[case("<r><Zed/><alpha>1</alpha><beta><x/><y>2</y></beta></r>")]
#[case("<r><e><![CDATA[<raw> & ]]></e></r>")]
fn given_document_when_round_tripping_then_model_is_preserved(#[case] xml: &str) {
    // Arrange
    let original = import(xml).unwrap();

    // Act
    let exported = export(&original);
    let reimported = import(&exported).unwrap();

    // Assert
    assert_eq!(shape(&reimported), shape(&original));
    assert_eq!(export(&reimported), exported);
}

#[test]
fn given_escaped_content_when_round_tripping_then_values_are_decoded_exactly() {
    // Arrange
    let xml = r#"<r><e q="say &quot;hi&quot;&#10;now">a &lt; b &amp;&amp; c&#13;</e></r>"#;

    // Act
    let tree = import(&export(&import(xml).unwrap())).unwrap();

    // Assert
    let e = tree.node(tree.find_path("r/e").unwrap()).unwrap();
    assert_eq!(e.data.attributes.get("q").map(String::as_str), Some("say \"hi\"\nnow"));
    assert_eq!(e.data.text.as_deref(), Some("a < b && c\r"));
}

#[test]
fn given_attributes_when_round_tripping_then_document_order_is_kept() {
    // Arrange
    let tree = import(r#"<r zeta="1" alpha="2" mid="3"/>"#).unwrap();

    // Act
    let xml = export(&tree);

    // Assert
    assert!(xml.ends_with(r#"<r zeta="1" alpha="2" mid="3"></r>"#));
}

#[test]
fn given_mixed_content_when_importing_then_text_beside_elements_is_dropped() {
    // Arrange / Act
    let tree = import("<r>lead<a>x</a>tail</r>").unwrap();

    // Assert
    let root = tree.root().unwrap();
    assert_eq!(tree.node(root).unwrap().data.text, None);
    assert!(export(&tree).ends_with("<r><a>x</a></r>"));
}

#[test]
fn given_unsorted_children_when_importing_then_siblings_sort_case_insensitively() {
    // Arrange / Act
    let tree = import("<r><b/><C/><a/><B/></r>").unwrap();

    // Assert
    let names: Vec<&str> = tree.iter().skip(1).map(|(_, n)| n.data.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "B", "C"]);
}

#[test]
fn given_collapsed_subtree_when_exporting_then_hidden_children_are_written() {
    // Arrange
    let mut tree = import(DOC).unwrap();
    let b = tree.find_path("root/b").unwrap();
    tree.node_mut(b).unwrap().branch.collapse();

    // Act
    let xml = export(&tree);

    // Assert
    assert_eq!(tree.iter_from(b, Scope::Visible).count(), 1);
    assert_eq!(xml, format!("{}{}", XML_DECLARATION, DOC));
}

#[rstest]
#[case("")]
#[case("   \n")]
#[case("<root><a></root>")]
#[case("not xml at all")]
#[case("<a/><b/>")]
fn given_invalid_input_when_importing_then_parse_error(#[case] xml: &str) {
    // Act
    let result = import(xml);

    // Assert
    assert!(matches!(result, Err(DomainError::Parse { .. })));
}
