//! Readers: entry iteration and document orchestration.
//!
//! A reader owns a field set and the description of where one entry ends
//! and the next begins. Given an already-parsed data object (a [`Tree`] or
//! a slice of [`Row`]s) and optional source metadata, it produces a lazy,
//! single-pass sequence of extraction contexts, and from those a lazy
//! sequence of assembled documents. Iteration is pull-based; the reader
//! never retains the data object past the call that borrowed it.

use std::fmt;

use crate::context::{ColumnRef, ExtractionContext, Row, SourceMetadata};
use crate::document::{
    assemble, AssembledDocument, AssemblyError, Document, FieldSet, Strictness,
};
use crate::extract::ExtractError;
use crate::query::TagQuery;
use crate::tree::Tree;

/// Error type for a document that could not be assembled, located by its
/// entry index within the source.
#[derive(Debug)]
pub struct DocumentError {
    pub index: usize,
    pub field: String,
    pub error: ExtractError,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document {}: failed to extract field '{}': {}",
            self.index, self.field, self.error
        )
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn document_from_context<'a>(
    fields: &FieldSet,
    strictness: Strictness,
    context: &ExtractionContext<'a>,
) -> Option<Result<AssembledDocument, DocumentError>> {
    let index = context.index.unwrap_or(0);
    match assemble(fields, context, strictness) {
        Ok(assembled) => {
            if has_required_fields(fields, &assembled.document) {
                Some(Ok(assembled))
            } else {
                None
            }
        }
        Err(AssemblyError { field, error }) => Some(Err(DocumentError {
            index,
            field,
            error,
        })),
    }
}

fn has_required_fields(fields: &FieldSet, document: &Document) -> bool {
    fields
        .required_names()
        .all(|name| document.get(name).map_or(false, |value| !value.is_null()))
}

/// Reader for tree-structured sources.
///
/// The entry boundary is itself a tag query: it is evaluated against the
/// toplevel node with `All` semantics, and every match becomes one entry.
/// The empty entry query means the whole source is a single entry. An
/// optional toplevel query first narrows the search scope to its first
/// match; when it matches nothing, the source yields no documents and a
/// warning is logged.
pub struct TreeReader {
    toplevel: Option<TagQuery>,
    entry: TagQuery,
    fields: FieldSet,
    strictness: Strictness,
}

impl TreeReader {
    pub fn new(entry: TagQuery, fields: FieldSet) -> Self {
        Self {
            toplevel: None,
            entry,
            fields,
            strictness: Strictness::Lenient,
        }
    }

    pub fn with_toplevel(mut self, query: TagQuery) -> Self {
        self.toplevel = Some(query);
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Lazily produce one extraction context per entry, in document order.
    ///
    /// The entry index is a zero-based counter per call: it restarts at 0
    /// for every source.
    pub fn iterate<'a>(
        &'a self,
        tree: &'a Tree,
        metadata: Option<&'a SourceMetadata>,
    ) -> impl Iterator<Item = ExtractionContext<'a>> + 'a {
        let toplevel = match &self.toplevel {
            None => Some(tree.root()),
            Some(query) => {
                let found = query.first(tree, tree.root());
                if found.is_none() {
                    tracing::warn!("toplevel query matched nothing in source");
                }
                found
            }
        };

        toplevel.into_iter().flat_map(move |top| {
            self.entry
                .all(tree, top)
                .into_iter()
                .enumerate()
                .map(move |(index, entry)| {
                    let mut context = ExtractionContext::new()
                        .with_tree(tree, entry, top)
                        .with_index(index);
                    if let Some(metadata) = metadata {
                        context = context.with_metadata(metadata);
                    }
                    context
                })
        })
    }

    /// Lazily produce one assembled document per entry. Documents missing a
    /// value for a required field are dropped.
    pub fn documents<'a>(
        &'a self,
        tree: &'a Tree,
        metadata: Option<&'a SourceMetadata>,
    ) -> impl Iterator<Item = Result<AssembledDocument, DocumentError>> + 'a {
        self.iterate(tree, metadata)
            .filter_map(move |context| document_from_context(&self.fields, self.strictness, &context))
    }
}

/// Reader for tabular sources.
///
/// Each row is one entry by default. With an entry column configured,
/// consecutive rows sharing that column's value are grouped into a single
/// entry (a document spanning multiple rows). Rows with an empty value in
/// the required column are skipped before grouping.
pub struct RowReader {
    fields: FieldSet,
    entry_column: Option<String>,
    required_column: Option<String>,
    strictness: Strictness,
}

impl RowReader {
    pub fn new(fields: FieldSet) -> Self {
        Self {
            fields,
            entry_column: None,
            required_column: None,
            strictness: Strictness::Lenient,
        }
    }

    /// Group consecutive rows sharing this column's value into one entry.
    pub fn with_entry_column(mut self, name: impl Into<String>) -> Self {
        self.entry_column = Some(name.into());
        self
    }

    /// Skip rows whose value for this column is absent or empty.
    pub fn with_required_column(mut self, name: impl Into<String>) -> Self {
        self.required_column = Some(name.into());
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Lazily produce one extraction context per entry.
    ///
    /// As with [`TreeReader::iterate`], the entry index restarts at 0 for
    /// every call.
    pub fn iterate<'a>(
        &'a self,
        rows: &'a [Row],
        metadata: Option<&'a SourceMetadata>,
    ) -> impl Iterator<Item = ExtractionContext<'a>> + 'a {
        RowEntries {
            rows,
            entry_column: self.entry_column.clone().map(ColumnRef::Name),
            required_column: self.required_column.clone().map(ColumnRef::Name),
            pos: 0,
        }
        .enumerate()
        .map(move |(index, group)| {
            let mut context = ExtractionContext::new()
                .with_row_refs(group)
                .with_index(index);
            if let Some(metadata) = metadata {
                context = context.with_metadata(metadata);
            }
            context
        })
    }

    /// Lazily produce one assembled document per entry. Documents missing a
    /// value for a required field are dropped.
    pub fn documents<'a>(
        &'a self,
        rows: &'a [Row],
        metadata: Option<&'a SourceMetadata>,
    ) -> impl Iterator<Item = Result<AssembledDocument, DocumentError>> + 'a {
        self.iterate(rows, metadata)
            .filter_map(move |context| document_from_context(&self.fields, self.strictness, &context))
    }
}

/// Lazy grouping of rows into entries.
struct RowEntries<'a> {
    rows: &'a [Row],
    entry_column: Option<ColumnRef>,
    required_column: Option<ColumnRef>,
    pos: usize,
}

impl<'a> RowEntries<'a> {
    fn is_skipped(&self, row: &Row) -> bool {
        match &self.required_column {
            Some(column) => row.get(column).map_or(true, |value| value.is_empty()),
            None => false,
        }
    }
}

impl<'a> Iterator for RowEntries<'a> {
    type Item = Vec<&'a Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group: Vec<&'a Row> = Vec::new();
        let mut group_id: Option<&str> = None;

        while self.pos < self.rows.len() {
            let row = &self.rows[self.pos];
            if self.is_skipped(row) {
                self.pos += 1;
                continue;
            }
            let Some(column) = &self.entry_column else {
                self.pos += 1;
                return Some(vec![row]);
            };
            let id = row.get(column);
            if group.is_empty() {
                group_id = id;
                group.push(row);
                self.pos += 1;
            } else if id.is_some() && id == group_id {
                group.push(row);
                self.pos += 1;
            } else {
                // Next entry starts here; leave the row for the next call.
                return Some(group);
            }
        }

        if group.is_empty() {
            None
        } else {
            Some(group)
        }
    }
}
