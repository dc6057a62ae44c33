use super::*;
use crate::blueprint::Address;
use crate::dom::Namespace;

fn note(steps: Vec<usize>) -> Note {
    Note {
        kind: HoleKind::Node,
        address: Address::new(steps),
        name: None,
    }
}

#[test]
fn note_resolves_through_child_indices() {
    let mut document = Document::new();
    let root = document.create_fragment();
    let div = document.create_element("div", Namespace::Html);
    let marker = document.create_comment("hole");
    document.append_child(root, div).unwrap();
    document.append_child(div, marker).unwrap();

    assert_eq!(resolve_note(&document, root, &note(vec![0, 0])), Ok(marker));
}

#[test]
fn unresolved_note_reports_its_address() {
    let mut document = Document::new();
    let root = document.create_fragment();
    let div = document.create_element("div", Namespace::Html);
    document.append_child(root, div).unwrap();

    let err = resolve_note(&document, root, &note(vec![0, 3])).unwrap_err();

    assert_eq!(
        err,
        ConstructionError::UnresolvedAddress {
            address: "/0/3".to_string()
        }
    );
    assert_eq!(
        RenderError::from(err).to_string(),
        "template construction failed: hole address /0/3 does not exist in the instance"
    );
}
