//! Extractors that produce field values from an extraction context.
//!
//! An extractor is a stateless value-producer: given the bag of named
//! context values for one entry, it produces a single [`FieldValue`],
//! possibly null. Some extractors are generic and work with any reader
//! ([`Constant`], [`Order`], [`Metadata`], the combinators); others are
//! format-specific ([`TreeQuery`] for tree sources, [`Column`] for tabular
//! ones). Custom extractors implement the same [`Extractor`] trait.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::context::{ColumnRef, ExtractionContext, SourceMetadata};
use crate::document::FieldValue;
use crate::query::{TagQuery, QueryMode};
use crate::tree::{NodeId, Tree};

/// Error type for extractor application.
#[derive(Debug, Clone)]
pub enum ExtractError {
    /// The extractor needs a context key that the reader in use never
    /// supplies. This is a configuration error and is fatal under both
    /// strictness modes.
    MissingContext {
        extractor: &'static str,
        key: &'static str,
    },
    /// A transform function failed on the extracted value.
    Transform(String),
    /// A custom extractor failed.
    Custom(String),
}

impl ExtractError {
    /// Fatal errors abort document assembly regardless of strictness.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::MissingContext { .. })
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::MissingContext { extractor, key } => {
                write!(
                    f,
                    "{} extractor requires context key '{}', which this reader does not supply",
                    extractor, key
                )
            }
            ExtractError::Transform(msg) => write!(f, "Transform failed: {}", msg),
            ExtractError::Custom(msg) => write!(f, "Extraction failed: {}", msg),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Post-processing function applied to an extractor's final value.
pub type TransformFn = Arc<dyn Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync>;

/// Predicate deciding, from the source metadata, whether an extractor
/// applies at all. An inapplicable extractor produces null.
pub type ApplicableFn = Arc<dyn Fn(Option<&SourceMetadata>) -> bool + Send + Sync>;

/// Fold function for the [`Combined`] extractor.
pub type CombineFn = Arc<dyn Fn(Vec<FieldValue>) -> FieldValue + Send + Sync>;

/// The extractor contract: produce one value from a context.
///
/// Implementors provide [`extract`](Extractor::extract); callers go through
/// [`apply`](Extractor::apply), which layers the applicability check and the
/// optional transform on top. Applying an extractor never mutates the
/// context or the tree.
pub trait Extractor: Send + Sync {
    /// Produce the raw value for this extractor. Structural absence maps to
    /// `FieldValue::Null`, not an error.
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError>;

    /// The configured post-processing transform, if any.
    fn transform_fn(&self) -> Option<&TransformFn> {
        None
    }

    /// The configured applicability predicate, if any.
    fn applicable_fn(&self) -> Option<&ApplicableFn> {
        None
    }

    /// Whether this extractor applies for the given metadata.
    fn is_applicable(&self, metadata: Option<&SourceMetadata>) -> bool {
        self.applicable_fn().map_or(true, |pred| pred(metadata))
    }

    /// Check applicability, extract, and post-process.
    fn apply(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        if !self.is_applicable(context.metadata) {
            return Ok(FieldValue::Null);
        }
        let value = self.extract(context)?;
        match self.transform_fn() {
            Some(transform) => transform(value),
            None => Ok(value),
        }
    }
}

/// Extracts the same value every time, regardless of input.
///
/// Especially useful in combination with [`Backup`] or [`Choice`].
pub struct Constant {
    value: FieldValue,
    transform: Option<TransformFn>,
    applicable: Option<ApplicableFn>,
}

impl Constant {
    pub fn new(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            transform: None,
            applicable: None,
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn applicable_if(
        mut self,
        predicate: impl Fn(Option<&SourceMetadata>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable = Some(Arc::new(predicate));
        self
    }
}

impl Extractor for Constant {
    fn extract(&self, _context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        Ok(self.value.clone())
    }

    fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }

    fn applicable_fn(&self) -> Option<&ApplicableFn> {
        self.applicable.as_ref()
    }
}

/// Returns the zero-based index of the entry within its source.
///
/// The index is assigned by the reader's iteration, not recomputed here;
/// readers in this crate all populate it, custom context construction may
/// not, in which case the value is null.
#[derive(Debug, Default)]
pub struct Order;

impl Order {
    pub fn new() -> Self {
        Order
    }
}

impl Extractor for Order {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        Ok(context
            .index
            .map(|i| FieldValue::Int(i as i64))
            .unwrap_or(FieldValue::Null))
    }
}

/// Extracts a value from the source metadata.
///
/// An absent key yields null; a reader that supplies no metadata at all is
/// a configuration error.
pub struct Metadata {
    key: String,
    transform: Option<TransformFn>,
    applicable: Option<ApplicableFn>,
}

impl Metadata {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            transform: None,
            applicable: None,
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn applicable_if(
        mut self,
        predicate: impl Fn(Option<&SourceMetadata>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable = Some(Arc::new(predicate));
        self
    }
}

impl Extractor for Metadata {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        let metadata = context.metadata.ok_or(ExtractError::MissingContext {
            extractor: "Metadata",
            key: "metadata",
        })?;
        Ok(metadata.get(&self.key).cloned().unwrap_or(FieldValue::Null))
    }

    fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }

    fn applicable_fn(&self) -> Option<&ApplicableFn> {
        self.applicable.as_ref()
    }
}

/// Passes the value of another extractor through unchanged.
///
/// Useful to stack multiple transforms: the inner extractor's transform
/// runs first, then this one's.
pub struct Pass {
    inner: Box<dyn Extractor>,
    transform: Option<TransformFn>,
}

impl Pass {
    pub fn new(inner: impl Extractor + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            transform: None,
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl Extractor for Pass {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        self.inner.apply(context)
    }

    fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }
}

/// Applies all given extractors and folds their results.
///
/// Without a combine function the result is the ordered list of
/// sub-extractor values. Sub-extractors are evaluated in declaration order,
/// which matters for order-sensitive combine functions.
pub struct Combined {
    extractors: Vec<Box<dyn Extractor>>,
    combine: Option<CombineFn>,
}

impl Combined {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self {
            extractors,
            combine: None,
        }
    }

    pub fn with_combine(
        mut self,
        combine: impl Fn(Vec<FieldValue>) -> FieldValue + Send + Sync + 'static,
    ) -> Self {
        self.combine = Some(Arc::new(combine));
        self
    }
}

impl Extractor for Combined {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        let mut results = Vec::with_capacity(self.extractors.len());
        for extractor in &self.extractors {
            results.push(extractor.apply(context)?);
        }
        match &self.combine {
            Some(combine) => Ok(combine(results)),
            None => Ok(FieldValue::List(results)),
        }
    }
}

/// Tries all given extractors in order and returns the first truthy result.
///
/// Truthiness follows [`FieldValue::is_truthy`]: null, empty strings, empty
/// lists, zero and `false` all fall through to the next extractor. Note the
/// difference with [`Choice`]: `Backup` decides on extracted values, not on
/// metadata.
pub struct Backup {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Backup {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }
}

impl Extractor for Backup {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        for extractor in &self.extractors {
            let result = extractor.apply(context)?;
            if result.is_truthy() {
                return Ok(result);
            }
        }
        Ok(FieldValue::Null)
    }
}

/// Uses the first applicable extractor from a list.
///
/// Extractors should be listed in descending order of preference. Note the
/// difference with [`Backup`]: `Choice` decides on metadata, not on
/// extracted values.
pub struct Choice {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Choice {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }
}

impl Extractor for Choice {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        for extractor in &self.extractors {
            if extractor.is_applicable(context.metadata) {
                return extractor.apply(context);
            }
        }
        Ok(FieldValue::Null)
    }
}

/// Extracts from a tree source by evaluating a tag query.
///
/// The query runs from the current entry node, or from the toplevel node
/// when `toplevel` is set. With `multiple`, every match contributes a value
/// and the result is an ordered list (empty on zero matches); otherwise the
/// first match's value is extracted, null on zero matches.
///
/// A matched position's value is its concatenated text content, or the
/// value of `attribute` when one is configured (null per position when the
/// attribute is absent). `flatten` collapses whitespace runs and soft line
/// breaks in text content.
pub struct TreeQuery {
    query: TagQuery,
    attribute: Option<String>,
    multiple: bool,
    toplevel: bool,
    flatten: bool,
    transform: Option<TransformFn>,
    applicable: Option<ApplicableFn>,
}

impl TreeQuery {
    pub fn new(query: TagQuery) -> Self {
        Self {
            query,
            attribute: None,
            multiple: false,
            toplevel: false,
            flatten: false,
            transform: None,
            applicable: None,
        }
    }

    /// Extract the value of an attribute instead of text content.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Collect every match instead of stopping at the first.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Evaluate the query from the toplevel node instead of the entry node.
    pub fn toplevel(mut self) -> Self {
        self.toplevel = true;
        self
    }

    /// Collapse whitespace runs and soft line breaks in text content.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn applicable_if(
        mut self,
        predicate: impl Fn(Option<&SourceMetadata>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable = Some(Arc::new(predicate));
        self
    }

    fn value_of(&self, tree: &Tree, node: NodeId) -> FieldValue {
        if let Some(attribute) = &self.attribute {
            return match tree.attribute(node, attribute) {
                Some(value) => FieldValue::String(value.to_string()),
                None => FieldValue::Null,
            };
        }
        let text = tree.text_content(node);
        if self.flatten {
            FieldValue::String(collapse_whitespace(&text))
        } else {
            FieldValue::String(text)
        }
    }
}

impl Extractor for TreeQuery {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        let tree = context.tree.ok_or(ExtractError::MissingContext {
            extractor: "TreeQuery",
            key: "tree",
        })?;
        let start = if self.toplevel {
            context.toplevel.ok_or(ExtractError::MissingContext {
                extractor: "TreeQuery",
                key: "toplevel",
            })?
        } else {
            context.entry.ok_or(ExtractError::MissingContext {
                extractor: "TreeQuery",
                key: "entry",
            })?
        };

        if self.multiple {
            let values = self
                .query
                .evaluate(tree, start, QueryMode::All)
                .into_iter()
                .map(|node| self.value_of(tree, node))
                .collect();
            Ok(FieldValue::List(values))
        } else {
            Ok(self
                .query
                .first(tree, start)
                .map(|node| self.value_of(tree, node))
                .unwrap_or(FieldValue::Null))
        }
    }

    fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }

    fn applicable_fn(&self) -> Option<&ApplicableFn> {
        self.applicable.as_ref()
    }
}

/// Collapse tabs, soft line breaks and whitespace runs, preserving
/// paragraph breaks as single newlines.
fn collapse_whitespace(text: &str) -> String {
    static TABS: OnceLock<Regex> = OnceLock::new();
    static SOFTBREAK: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static NEWLINES: OnceLock<Regex> = OnceLock::new();

    let tabs = TABS.get_or_init(|| Regex::new(r"\t+").unwrap());
    let softbreak = SOFTBREAK.get_or_init(|| Regex::new(r"(\S)\n(\S)").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r" +").unwrap());
    let newlines = NEWLINES.get_or_init(|| Regex::new(r"\n+").unwrap());

    let text = tabs.replace_all(text, "");
    let text = softbreak.replace_all(&text, "${1} ${2}");
    let text = spaces.replace_all(&text, " ");
    let text = newlines.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Extracts a column value from the rows of a tabular entry.
///
/// With `multiple`, the value from every row of the entry is collected into
/// a list; otherwise only the first row is read. A column absent from the
/// entry's first row yields null. Empty values, and any value listed in
/// `convert_to_none`, become null.
pub struct Column {
    column: ColumnRef,
    multiple: bool,
    convert_to_none: Vec<String>,
    transform: Option<TransformFn>,
    applicable: Option<ApplicableFn>,
}

impl Column {
    pub fn new(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            multiple: false,
            convert_to_none: Vec::new(),
            transform: None,
            applicable: None,
        }
    }

    /// Collect the value from every row of the entry.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Values to convert to null, in addition to the empty string.
    pub fn convert_to_none(mut self, values: Vec<String>) -> Self {
        self.convert_to_none = values;
        self
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn applicable_if(
        mut self,
        predicate: impl Fn(Option<&SourceMetadata>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.applicable = Some(Arc::new(predicate));
        self
    }

    fn format(&self, value: Option<&str>) -> FieldValue {
        match value {
            Some(v) if !v.is_empty() && !self.convert_to_none.iter().any(|c| c == v) => {
                FieldValue::String(v.to_string())
            }
            _ => FieldValue::Null,
        }
    }
}

impl Extractor for Column {
    fn extract(&self, context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
        let rows = context.rows.as_ref().ok_or(ExtractError::MissingContext {
            extractor: "Column",
            key: "rows",
        })?;
        let Some(first) = rows.first() else {
            return Ok(FieldValue::Null);
        };
        if !first.has_column(&self.column) {
            return Ok(FieldValue::Null);
        }
        if self.multiple {
            Ok(FieldValue::List(
                rows.iter()
                    .map(|row| self.format(row.get(&self.column)))
                    .collect(),
            ))
        } else {
            Ok(self.format(first.get(&self.column)))
        }
    }

    fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }

    fn applicable_fn(&self) -> Option<&ApplicableFn> {
        self.applicable.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Row;

    fn ghost_tree() -> Tree {
        let mut tree = Tree::new("play");
        let lines = tree.add_element(tree.root(), "lines");
        tree.set_attribute(lines, "character", "GHOST");
        tree.add_text_element(lines, "l", "My hour is almost come,");
        tree.add_text_element(lines, "l", "Must render up myself.");
        tree
    }

    fn tree_context<'a>(tree: &'a Tree, entry: NodeId) -> ExtractionContext<'a> {
        ExtractionContext::new().with_tree(tree, entry, tree.root())
    }

    #[test]
    fn test_constant() {
        let extractor = Constant::new("foo");
        let context = ExtractionContext::new();

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::String("foo".into()));
    }

    #[test]
    fn test_constant_with_transform() {
        let extractor = Constant::new("foo").with_transform(|value| match value {
            FieldValue::String(s) => Ok(FieldValue::String(s.to_uppercase())),
            other => Ok(other),
        });
        let context = ExtractionContext::new();

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::String("FOO".into()));
    }

    #[test]
    fn test_order_without_index_is_null() {
        let extractor = Order::new();
        let context = ExtractionContext::new();

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_metadata_missing_key_is_null() {
        let metadata = SourceMetadata::new().with_value("title", "Hamlet");
        let context = ExtractionContext::new().with_metadata(&metadata);

        let extractor = Metadata::new("author");
        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_metadata_missing_map_is_fatal() {
        let extractor = Metadata::new("title");
        let context = ExtractionContext::new();

        let error = extractor.apply(&context).unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn test_pass_stacks_transforms() {
        let inner = Constant::new("foo  ").with_transform(|value| match value {
            FieldValue::String(s) => Ok(FieldValue::String(s.to_uppercase())),
            other => Ok(other),
        });
        let extractor = Pass::new(inner).with_transform(|value| match value {
            FieldValue::String(s) => Ok(FieldValue::String(s.trim().to_string())),
            other => Ok(other),
        });

        let context = ExtractionContext::new();
        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::String("FOO".into()));
    }

    #[test]
    fn test_combined_returns_list_by_default() {
        let extractor = Combined::new(vec![
            Box::new(Constant::new("foo")),
            Box::new(Constant::new("bar")),
        ]);
        let context = ExtractionContext::new();

        assert_eq!(
            extractor.apply(&context).unwrap(),
            FieldValue::List(vec![
                FieldValue::String("foo".into()),
                FieldValue::String("bar".into()),
            ])
        );
    }

    #[test]
    fn test_combined_with_combine_fn() {
        let extractor = Combined::new(vec![
            Box::new(Constant::new(false)),
            Box::new(Constant::new(true)),
        ])
        .with_combine(|values| FieldValue::Bool(values.iter().any(|v| v.is_truthy())));
        let context = ExtractionContext::new();

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::Bool(true));
    }

    #[test]
    fn test_backup_returns_first_truthy() {
        let extractor = Backup::new(vec![
            Box::new(Constant::new(FieldValue::Null)),
            Box::new(Constant::new("")),
            Box::new(Constant::new("foo")),
        ]);
        let context = ExtractionContext::new();

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::String("foo".into()));
    }

    #[test]
    fn test_choice_picks_first_applicable() {
        let metadata = SourceMetadata::new().with_value("edition", "quarto");
        let context = ExtractionContext::new().with_metadata(&metadata);

        let extractor = Choice::new(vec![
            Box::new(Constant::new("folio only").applicable_if(|metadata| {
                metadata
                    .and_then(|m| m.get("edition"))
                    .and_then(|v| v.as_str())
                    == Some("folio")
            })),
            Box::new(Constant::new("fallback")),
        ]);

        assert_eq!(extractor.apply(&context).unwrap(), FieldValue::String("fallback".into()));
    }

    #[test]
    fn test_tree_query_single_and_multiple() {
        let tree = ghost_tree();
        let entry = TagQuery::new().child("lines").first(&tree, tree.root()).unwrap();
        let context = tree_context(&tree, entry);

        let single = TreeQuery::new(TagQuery::new().child("l"));
        assert_eq!(
            single.apply(&context).unwrap(),
            FieldValue::String("My hour is almost come,".into())
        );

        let multiple = TreeQuery::new(TagQuery::new().child("l")).multiple();
        assert_eq!(
            multiple.apply(&context).unwrap(),
            FieldValue::List(vec![
                FieldValue::String("My hour is almost come,".into()),
                FieldValue::String("Must render up myself.".into()),
            ])
        );
    }

    #[test]
    fn test_tree_query_no_match() {
        let tree = ghost_tree();
        let entry = TagQuery::new().child("lines").first(&tree, tree.root()).unwrap();
        let context = tree_context(&tree, entry);

        let single = TreeQuery::new(TagQuery::new().child("stage_direction"));
        assert_eq!(single.apply(&context).unwrap(), FieldValue::Null);

        let multiple = TreeQuery::new(TagQuery::new().child("stage_direction")).multiple();
        assert_eq!(multiple.apply(&context).unwrap(), FieldValue::List(vec![]));
    }

    #[test]
    fn test_tree_query_attribute_absent_is_null() {
        let tree = ghost_tree();
        let entry = TagQuery::new().child("lines").first(&tree, tree.root()).unwrap();
        let context = tree_context(&tree, entry);

        let present = TreeQuery::new(TagQuery::new()).attribute("character");
        assert_eq!(present.apply(&context).unwrap(), FieldValue::String("GHOST".into()));

        let absent = TreeQuery::new(TagQuery::new()).attribute("n");
        assert_eq!(absent.apply(&context).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_tree_query_without_tree_is_fatal() {
        let extractor = TreeQuery::new(TagQuery::new());
        let context = ExtractionContext::new();

        assert!(extractor.apply(&context).unwrap_err().is_fatal());
    }

    #[test]
    fn test_collapse_whitespace() {
        let text = "My hour is almost come,\nMust  render \t up   myself.\n";
        assert_eq!(
            collapse_whitespace(text),
            "My hour is almost come, Must render up myself."
        );
    }

    #[test]
    fn test_column_single_and_multiple() {
        let rows: Vec<Row> = vec![
            [("character", "GHOST"), ("line", "Mark me.")].into_iter().collect(),
            [("character", "GHOST"), ("line", "My hour is almost come,")].into_iter().collect(),
        ];
        let context = ExtractionContext::new().with_rows(&rows);

        let single = Column::new("line");
        assert_eq!(single.apply(&context).unwrap(), FieldValue::String("Mark me.".into()));

        let multiple = Column::new("line").multiple();
        assert_eq!(
            multiple.apply(&context).unwrap(),
            FieldValue::List(vec![
                FieldValue::String("Mark me.".into()),
                FieldValue::String("My hour is almost come,".into()),
            ])
        );
    }

    #[test]
    fn test_column_missing_and_empty_values() {
        let rows: Vec<Row> = vec![[("act", ""), ("scene", "N/A")].into_iter().collect()];
        let context = ExtractionContext::new().with_rows(&rows);

        assert_eq!(Column::new("missing").apply(&context).unwrap(), FieldValue::Null);
        assert_eq!(Column::new("act").apply(&context).unwrap(), FieldValue::Null);

        let converted = Column::new("scene").convert_to_none(vec!["N/A".to_string()]);
        assert_eq!(converted.apply(&context).unwrap(), FieldValue::Null);
    }

    #[test]
    fn test_column_without_rows_is_fatal() {
        let extractor = Column::new("line");
        let context = ExtractionContext::new();

        assert!(extractor.apply(&context).unwrap_err().is_fatal());
    }
}
