//! # Gleaner: Declarative Document Extraction Library
//!
//! Gleaner pulls structured documents (ordered mappings of field name to
//! value) out of heterogeneous sources, tree-structured or tabular, from a
//! small set of composable declarations, without a bespoke parser loop per
//! dataset.
//!
//! ## Features
//!
//! - **Tag query algebra**: declarative, composable paths through a tree
//!   (child, descendant, parent, sibling steps plus an escape hatch)
//! - **Extractor protocol**: pluggable value producers over a shared
//!   extraction context; built-ins for constants, metadata, ordinals, tree
//!   queries, tabular columns and combinators
//! - **Field and document assembly**: per-field failure isolation with
//!   explicit strict/lenient modes
//! - **Reader orchestration**: lazy per-entry iteration for tree and row
//!   sources, with the entry boundary itself expressed as a tag query
//! - **YAML reader definitions**: describe a reader in configuration and
//!   build it against a transform registry
//!
//! ## Example: tree source
//!
//! ```
//! use gleaner::document::{Field, FieldSet};
//! use gleaner::extract::TreeQuery;
//! use gleaner::query::TagQuery;
//! use gleaner::reader::TreeReader;
//! use gleaner::tree::Tree;
//!
//! // <play><lines character="GHOST"><l>Mark me.</l></lines></play>
//! let mut tree = Tree::new("play");
//! let lines = tree.add_element(tree.root(), "lines");
//! tree.set_attribute(lines, "character", "GHOST");
//! tree.add_text_element(lines, "l", "Mark me.");
//!
//! let fields = FieldSet::new(vec![
//!     Field::new("character", TreeQuery::new(TagQuery::new()).attribute("character")),
//!     Field::new("text", TreeQuery::new(TagQuery::new().child("l"))),
//! ]).unwrap();
//! let reader = TreeReader::new(TagQuery::new().child("lines"), fields);
//!
//! let documents: Vec<_> = reader.documents(&tree, None)
//!     .map(|result| result.unwrap().document)
//!     .collect();
//! assert_eq!(documents.len(), 1);
//! ```
//!
//! ## Example: YAML reader definition
//!
//! ```yaml
//! reader:
//!   format: tree
//!   entry:
//!     - descendant: lines
//!   fields:
//!     - name: character
//!       extractor:
//!         type: tree_query
//!         attribute: character
//! ```

// Core modules
pub mod tree;
pub mod query;
pub mod context;
pub mod document;
pub mod extract;
pub mod reader;

// Declarative reader definitions and transform registry
pub mod config;

// Document serialization
pub mod serialization;

// Re-export key types
pub use tree::{NodeId, Tree};
pub use query::{AttrMatch, AttributeFilter, QueryMode, SiblingDirection, TagQuery, TagQueryStep};
pub use context::{ColumnRef, ExtractionContext, Row, SourceMetadata};
pub use document::{
    assemble, AssembledDocument, AssemblyError, Document, Field, FieldFailure, FieldSet,
    FieldSetError, FieldValue, Strictness,
};
pub use extract::{ApplicableFn, CombineFn, ExtractError, Extractor, TransformFn};
pub use reader::{DocumentError, RowReader, TreeReader};

// Re-export config types
pub use config::{BuiltReader, ConfigError, ReaderDef, TransformRegistry};

// Re-export serialization types
pub use serialization::{JsonArrayWriter, NdjsonWriter, SerializationError};
