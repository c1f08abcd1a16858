//! Saving a tree and loading it back yields the same tree.

use confpatch::format::writer::to_string;
use confpatch::{ConfigurationFile, SectionId, SectionTree};
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Section {
    values: BTreeMap<String, String>,
    sections: BTreeMap<String, Section>,
}

fn tag_name() -> impl Strategy<Value = String> {
    "k[a-z0-9_]{0,8}"
}

fn section_name() -> impl Strategy<Value = String> {
    "S[a-zA-Z0-9_]{0,8}"
}

/// Values that read back verbatim; see `write_section` for the ones that do not.
fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.,()/-]{1,12}"
}

fn section() -> impl Strategy<Value = Section> {
    let leaf = prop::collection::btree_map(tag_name(), value(), 0..4).prop_map(|values| Section {
        values,
        sections: BTreeMap::new(),
    });
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop::collection::btree_map(tag_name(), value(), 0..4),
            prop::collection::btree_map(section_name(), inner, 0..3),
        )
            .prop_map(|(values, sections)| Section { values, sections })
    })
}

fn build(tree: &mut SectionTree, id: SectionId, section: &Section) {
    for (name, child) in &section.sections {
        let child_id = tree.add_subsection(id, name);
        build(tree, child_id, child);
    }
    for (tag, value) in &section.values {
        tree.add_tag_value(id, tag, value);
    }
}

proptest! {
    #[test]
    fn save_then_load_preserves_tree(root in section()) {
        let mut tree = SectionTree::new();
        let root_id = tree.root();
        build(&mut tree, root_id, &root);

        let text = to_string(&mut tree);
        prop_assert!(!tree.is_edited(root_id));

        let mut config = ConfigurationFile::new();
        config.merge_str(&text, "roundtrip.cfg").unwrap();
        prop_assert_eq!(
            config.tree().snapshot(config.root()),
            tree.snapshot(root_id)
        );

        // A second save is byte-identical.
        let again = to_string(config.tree_mut());
        prop_assert_eq!(again, text);
    }
}

#[test]
fn save_as_then_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.cfg");

    let mut config = ConfigurationFile::new();
    config.store_tag_value("/Video/width", "800");
    config.store_tag_value("/Video/Modes/list", "(640x480, 800x600)");
    config.store_tag_value("/name", "\"quoted value\"");
    assert!(config.is_edited());

    config.save_as(&path).unwrap();
    assert!(!config.is_edited());
    assert_eq!(config.file_name(), Some(path.as_path()));

    let reopened = ConfigurationFile::open(&path).unwrap();
    assert_eq!(
        reopened.tree().snapshot(reopened.root()),
        config.tree().snapshot(config.root())
    );
}
