//! Extraction context passed to every extractor.
//!
//! A context is the bag of named values available while extracting one
//! document: the current entry node, the toplevel node, the entry's rows,
//! source metadata and the entry's ordinal index. Readers populate the keys
//! that exist for their source type; extractors use only what they need.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::document::FieldValue;
use crate::tree::{NodeId, Tree};

/// Metadata attached to a source, available to extractors for every entry.
///
/// Holds values that come from outside the data itself, such as a filename
/// or a title derived from it.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    values: HashMap<String, FieldValue>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reference to a column of a [`Row`], by name or by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

/// One row of a tabular source: an ordered mapping of column name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: IndexMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a column by name or position.
    pub fn get(&self, column: &ColumnRef) -> Option<&str> {
        match column {
            ColumnRef::Name(name) => self.values.get(name).map(|v| v.as_str()),
            ColumnRef::Index(index) => self.values.get_index(*index).map(|(_, v)| v.as_str()),
        }
    }

    /// Whether the row has a value for the column, regardless of content.
    pub fn has_column(&self, column: &ColumnRef) -> bool {
        self.get(column).is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The bag of values offered to extractors for one entry.
///
/// All keys are optional; which ones are populated depends on the reader.
/// Tree readers supply `tree`, `entry` and `toplevel`; row readers supply
/// `rows`. An extractor that needs a key its reader never supplies fails
/// with a configuration error rather than an opaque internal one.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext<'a> {
    /// The parsed tree, for tree-structured sources.
    pub tree: Option<&'a Tree>,
    /// Root of the current entry within the tree.
    pub entry: Option<NodeId>,
    /// Root of the whole source, shared between entries.
    pub toplevel: Option<NodeId>,
    /// The rows that make up the current entry, for tabular sources.
    pub rows: Option<Vec<&'a Row>>,
    /// Source metadata, if the reader was given any.
    pub metadata: Option<&'a SourceMetadata>,
    /// Zero-based ordinal of this entry within its source.
    pub index: Option<usize>,
}

impl<'a> ExtractionContext<'a> {
    /// An empty context; populate it with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(mut self, tree: &'a Tree, entry: NodeId, toplevel: NodeId) -> Self {
        self.tree = Some(tree);
        self.entry = Some(entry);
        self.toplevel = Some(toplevel);
        self
    }

    pub fn with_rows(mut self, rows: &'a [Row]) -> Self {
        self.rows = Some(rows.iter().collect());
        self
    }

    pub fn with_row_refs(mut self, rows: Vec<&'a Row>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_metadata(mut self, metadata: &'a SourceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}
