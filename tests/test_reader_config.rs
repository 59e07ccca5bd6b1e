//! Integration tests for YAML reader definitions: loading from disk,
//! building, running extraction end to end, and exporting the results.

use std::io::Write;

use gleaner::config::{BuiltReader, ConfigError, ReaderDef, TransformRegistry};
use gleaner::document::FieldValue;
use gleaner::serialization::NdjsonWriter;
use gleaner::tree::Tree;

const PLAY_READER_YAML: &str = r#"
reader:
  format: tree
  entry:
    - descendant: lines
      attrs:
        character: "*"
  fields:
    - name: character
      extractor:
        type: tree_query
        attribute: character
        transform: lowercase
    - name: lines
      extractor:
        type: tree_query
        steps:
          - child: l
        multiple: true
    - name: position
      extractor:
        type: order
"#;

fn nested_play() -> Tree {
    let mut tree = Tree::new("play");
    let scene = tree.add_element(tree.root(), "scene");
    let hamlet = tree.add_element(scene, "lines");
    tree.set_attribute(hamlet, "character", "HAMLET");
    tree.add_text_element(hamlet, "l", "Whither wilt thou lead me?");
    let ghost = tree.add_element(scene, "lines");
    tree.set_attribute(ghost, "character", "GHOST");
    tree.add_text_element(ghost, "l", "Mark me.");
    tree.add_text_element(ghost, "l", "My hour is almost come,");
    tree
}

#[test]
fn test_reader_definition_from_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("play_reader.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(PLAY_READER_YAML.as_bytes()).unwrap();

    let def = ReaderDef::from_yaml_file(&path).unwrap();
    let registry = TransformRegistry::with_builtins();
    let BuiltReader::Tree(reader) = def.build(&registry).unwrap() else {
        panic!("expected a tree reader");
    };

    let tree = nested_play();
    let documents: Vec<_> = reader
        .documents(&tree, None)
        .map(|result| result.unwrap().document)
        .collect();

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].get("character"), Some(&FieldValue::String("hamlet".into())));
    assert_eq!(documents[1].get("character"), Some(&FieldValue::String("ghost".into())));
    assert_eq!(documents[1].get("position"), Some(&FieldValue::Int(1)));
    assert_eq!(
        documents[1].get("lines"),
        Some(&FieldValue::List(vec![
            FieldValue::String("Mark me.".into()),
            FieldValue::String("My hour is almost come,".into()),
        ]))
    );
}

#[test]
fn test_documents_export_as_ndjson() {
    let def = ReaderDef::from_yaml_str(PLAY_READER_YAML).unwrap();
    let registry = TransformRegistry::with_builtins();
    let BuiltReader::Tree(reader) = def.build(&registry).unwrap() else {
        panic!("expected a tree reader");
    };

    let tree = nested_play();
    let mut writer = NdjsonWriter::new(Vec::new());
    for result in reader.documents(&tree, None) {
        writer.write(&result.unwrap().document).unwrap();
    }

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "{\"character\":\"ghost\",\"lines\":[\"Mark me.\",\"My hour is almost come,\"],\"position\":1}"
    );
}

#[test]
fn test_missing_reader_key_is_rejected() {
    let result = ReaderDef::from_yaml_str("format: tree\nfields: []\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_registered_custom_transform_is_resolved() {
    let yaml = r#"
reader:
  format: rows
  fields:
    - name: character
      extractor:
        type: column
        column: character
        transform: shout
"#;
    let def = ReaderDef::from_yaml_str(yaml).unwrap();

    let mut registry = TransformRegistry::with_builtins();
    registry.register("shout", |value| match value {
        FieldValue::String(s) => Ok(FieldValue::String(format!("{}!", s.to_uppercase()))),
        other => Ok(other),
    });

    let BuiltReader::Rows(reader) = def.build(&registry).unwrap() else {
        panic!("expected a row reader");
    };

    let rows: Vec<gleaner::context::Row> =
        vec![[("character", "Ghost")].into_iter().collect()];
    let documents: Vec<_> = reader
        .documents(&rows, None)
        .map(|result| result.unwrap().document)
        .collect();

    assert_eq!(documents[0].get("character"), Some(&FieldValue::String("GHOST!".into())));
}
