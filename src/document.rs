//! Field values, fields, and document assembly.
//!
//! A [`Field`] binds a name to an extractor; a [`Document`] is the ordered
//! name-to-value mapping produced by applying every field of a [`FieldSet`]
//! to one extraction context. Assembly isolates per-field failures so one
//! bad field cannot corrupt its siblings' values.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::ExtractionContext;
use crate::extract::{ExtractError, Extractor};

/// Represents the different types of values a field can hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Truthiness in the Python sense: null, empty strings, empty lists,
    /// zero and `false` are all falsy. Used by the `Backup` extractor and
    /// documented there.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Bool(b) => *b,
            FieldValue::List(l) => !l.is_empty(),
            FieldValue::Null => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::List(l) => write!(f, "{:?}", l),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        FieldValue::List(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Null
                }
            }
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Array(arr) => {
                FieldValue::List(arr.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Null => FieldValue::Null,
            // Nested objects have no field value shape; keep them as JSON text.
            serde_json::Value::Object(_) => FieldValue::String(value.to_string()),
        }
    }
}

/// An ordered mapping of field name to extracted value.
///
/// Iteration order is field declaration order. Documents are created fresh
/// per entry and never mutated after assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    values: IndexMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert document to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Convert document to pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// A named element of information to extract from each document.
pub struct Field {
    name: String,
    extractor: Box<dyn Extractor>,
    required: bool,
    skip: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, extractor: impl Extractor + 'static) -> Self {
        Self::from_boxed(name, Box::new(extractor))
    }

    /// Build a field from an already-boxed extractor.
    pub fn from_boxed(name: impl Into<String>, extractor: Box<dyn Extractor>) -> Self {
        Self {
            name: name.into(),
            extractor,
            required: false,
            skip: false,
        }
    }

    /// Mark the field as required: readers drop documents where its value
    /// is null.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as skipped: it is not evaluated and does not appear
    /// in the output.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extractor(&self) -> &dyn Extractor {
        self.extractor.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("skip", &self.skip)
            .finish()
    }
}

/// Error type for field set construction.
#[derive(Debug, Clone)]
pub enum FieldSetError {
    /// Two fields share a name. Duplicate names are rejected at
    /// construction time rather than overwriting in assembly order.
    DuplicateName(String),
}

impl fmt::Display for FieldSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSetError::DuplicateName(name) => {
                write!(f, "Duplicate field name: {}", name)
            }
        }
    }
}

impl std::error::Error for FieldSetError {}

/// An ordered list of fields with unique names.
#[derive(Debug)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Build a field set, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self, FieldSetError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == field.name) {
                return Err(FieldSetError::DuplicateName(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The name of every field, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    /// Names of all required fields.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name())
    }
}

/// Failure-isolation policy for document assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// The first recoverable field failure aborts the whole document.
    Strict,
    /// Recoverable field failures are caught: the field's value becomes
    /// null, the failure is recorded and logged, and the remaining fields
    /// are still evaluated.
    Lenient,
}

/// A recoverable failure that lenient assembly caught for one field.
#[derive(Debug)]
pub struct FieldFailure {
    pub field: String,
    pub error: ExtractError,
}

/// An assembled document plus the per-field failures caught while
/// assembling it (always empty under strict assembly).
#[derive(Debug)]
pub struct AssembledDocument {
    pub document: Document,
    pub failures: Vec<FieldFailure>,
}

/// Error type for a document that could not be assembled.
#[derive(Debug)]
pub struct AssemblyError {
    pub field: String,
    pub error: ExtractError,
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to extract field '{}': {}", self.field, self.error)
    }
}

impl std::error::Error for AssemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Apply every field of `fields` to `context`, in declaration order.
///
/// Skipped fields are not evaluated. Configuration errors propagate under
/// both strictness modes; recoverable failures follow the chosen
/// [`Strictness`].
pub fn assemble(
    fields: &FieldSet,
    context: &ExtractionContext,
    strictness: Strictness,
) -> Result<AssembledDocument, AssemblyError> {
    let mut document = Document::new();
    let mut failures = Vec::new();

    for field in fields.fields() {
        if field.is_skipped() {
            continue;
        }
        match field.extractor().apply(context) {
            Ok(value) => document.insert(field.name(), value),
            Err(error) if error.is_fatal() || strictness == Strictness::Strict => {
                return Err(AssemblyError {
                    field: field.name().to_string(),
                    error,
                });
            }
            Err(error) => {
                tracing::error!(field = field.name(), %error, "field extraction failed, value set to null");
                document.insert(field.name(), FieldValue::Null);
                failures.push(FieldFailure {
                    field: field.name().to_string(),
                    error,
                });
            }
        }
    }

    Ok(AssembledDocument { document, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Constant, Metadata};

    struct Failing;

    impl Extractor for Failing {
        fn extract(&self, _context: &ExtractionContext) -> Result<FieldValue, ExtractError> {
            Err(ExtractError::Custom("broken".to_string()))
        }
    }

    #[test]
    fn test_field_value_serialization_is_untagged() {
        let value = FieldValue::List(vec![
            FieldValue::String("a".into()),
            FieldValue::Int(2),
            FieldValue::Null,
        ]);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"["a",2,null]"#);
    }

    #[test]
    fn test_field_value_truthiness() {
        assert!(!FieldValue::Null.is_truthy());
        assert!(!FieldValue::String(String::new()).is_truthy());
        assert!(!FieldValue::List(vec![]).is_truthy());
        assert!(FieldValue::String("x".into()).is_truthy());
        assert!(FieldValue::Int(-1).is_truthy());
    }

    #[test]
    fn test_document_preserves_insertion_order() {
        let mut document = Document::new();
        document.insert("zulu", FieldValue::Int(1));
        document.insert("alpha", FieldValue::Int(2));
        document.insert("mike", FieldValue::Int(3));

        let names: Vec<_> = document.names().collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_field_set_rejects_duplicate_names() {
        let result = FieldSet::new(vec![
            Field::new("title", Constant::new("a")),
            Field::new("title", Constant::new("b")),
        ]);

        assert!(matches!(result, Err(FieldSetError::DuplicateName(name)) if name == "title"));
    }

    #[test]
    fn test_assemble_in_declaration_order() {
        let fields = FieldSet::new(vec![
            Field::new("second", Constant::new(2i64)),
            Field::new("first", Constant::new(1i64)),
        ])
        .unwrap();

        let context = ExtractionContext::new();
        let assembled = assemble(&fields, &context, Strictness::Strict).unwrap();
        let names: Vec<_> = assembled.document.names().collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_lenient_assembly_isolates_failures() {
        let fields = FieldSet::new(vec![
            Field::new("before", Constant::new("ok")),
            Field::new("bad", Failing),
            Field::new("after", Constant::new("also ok")),
        ])
        .unwrap();

        let context = ExtractionContext::new();
        let assembled = assemble(&fields, &context, Strictness::Lenient).unwrap();

        assert_eq!(assembled.document.get("before"), Some(&FieldValue::String("ok".into())));
        assert_eq!(assembled.document.get("bad"), Some(&FieldValue::Null));
        assert_eq!(assembled.document.get("after"), Some(&FieldValue::String("also ok".into())));
        assert_eq!(assembled.failures.len(), 1);
        assert_eq!(assembled.failures[0].field, "bad");
    }

    #[test]
    fn test_strict_assembly_aborts_on_failure() {
        let fields = FieldSet::new(vec![
            Field::new("bad", Failing),
            Field::new("after", Constant::new("unreached")),
        ])
        .unwrap();

        let context = ExtractionContext::new();
        let result = assemble(&fields, &context, Strictness::Strict);

        assert!(matches!(result, Err(AssemblyError { field, .. }) if field == "bad"));
    }

    #[test]
    fn test_configuration_errors_propagate_even_when_lenient() {
        // A metadata extractor on a context without metadata is a
        // configuration error, not a recoverable field failure.
        let fields = FieldSet::new(vec![Field::new("title", Metadata::new("title"))]).unwrap();

        let context = ExtractionContext::new();
        let result = assemble(&fields, &context, Strictness::Lenient);

        assert!(result.is_err());
    }

    #[test]
    fn test_skipped_fields_are_omitted() {
        let fields = FieldSet::new(vec![
            Field::new("kept", Constant::new(1i64)),
            Field::new("hidden", Failing).skip(),
        ])
        .unwrap();

        let context = ExtractionContext::new();
        let assembled = assemble(&fields, &context, Strictness::Strict).unwrap();

        assert_eq!(assembled.document.len(), 1);
        assert!(assembled.document.get("hidden").is_none());
    }
}
