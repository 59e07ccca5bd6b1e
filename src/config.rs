//! Declarative reader definitions loaded from YAML.
//!
//! A reader can be described entirely in YAML: the source format, the entry
//! boundary, and one extractor definition per field. Definitions are built
//! into [`TreeReader`]/[`RowReader`] values against a [`TransformRegistry`],
//! which resolves transform names to registered functions. Custom
//! extractors and `Transform` query steps carry arbitrary code and are
//! therefore code-only; everything else round-trips through configuration.
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
//!     - name: lines
//!       extractor:
//!         type: tree_query
//!         steps:
//!           - child: l
//!         multiple: true
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::context::ColumnRef;
use crate::document::{Field, FieldSet, FieldValue, Strictness};
use crate::extract::{
    Backup, Column, Combined, Constant, ExtractError, Extractor, Metadata, Order, TransformFn,
    TreeQuery,
};
use crate::query::{AttrMatch, AttributeFilter, TagQuery, TagQueryStep};
use crate::reader::{RowReader, TreeReader};

/// Error type for reader configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    UnknownTransform(String),
    InvalidStep(String),
    DuplicateField(String),
    ExtractorMismatch {
        field: String,
        extractor: &'static str,
    },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::UnknownTransform(name) => {
                write!(f, "Transform not registered: {}", name)
            }
            ConfigError::InvalidStep(msg) => write!(f, "Invalid query step: {}", msg),
            ConfigError::DuplicateField(name) => write!(f, "Duplicate field name: {}", name),
            ConfigError::ExtractorMismatch { field, extractor } => {
                write!(
                    f,
                    "Field '{}' uses a {} extractor, which cannot be used with this format",
                    field, extractor
                )
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid reader definition: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

/// Registry resolving transform names in reader definitions to functions.
///
/// Callers register domain-specific transforms under a name; definitions
/// reference them with `transform: <name>`.
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Create a registry preloaded with the built-in transforms:
    /// `int`, `float`, `trim`, `uppercase`, `lowercase`, `join_lines`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("int", parse_int);
        registry.register("float", parse_float);
        registry.register("trim", |value| string_transform(value, |s| s.trim().to_string()));
        registry.register("uppercase", |value| string_transform(value, |s| s.to_uppercase()));
        registry.register("lowercase", |value| string_transform(value, |s| s.to_lowercase()));
        registry.register("join_lines", join_lines);
        registry
    }

    /// Register a transform function under a name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        transform: impl Fn(FieldValue) -> Result<FieldValue, ExtractError> + Send + Sync + 'static,
    ) {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Look up a transform by name.
    pub fn get(&self, name: &str) -> Option<TransformFn> {
        self.transforms.get(name).cloned()
    }

    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Names of all registered transforms, sorted.
    pub fn transform_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_int(value: FieldValue) -> Result<FieldValue, ExtractError> {
    match value {
        FieldValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| ExtractError::Transform(format!("'{}' is not an integer: {}", s, e))),
        FieldValue::Int(_) => Ok(value),
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(ExtractError::Transform(format!(
            "cannot convert {} to an integer",
            other
        ))),
    }
}

fn parse_float(value: FieldValue) -> Result<FieldValue, ExtractError> {
    match value {
        FieldValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|e| ExtractError::Transform(format!("'{}' is not a number: {}", s, e))),
        FieldValue::Int(i) => Ok(FieldValue::Float(i as f64)),
        FieldValue::Float(_) => Ok(value),
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(ExtractError::Transform(format!(
            "cannot convert {} to a number",
            other
        ))),
    }
}

fn string_transform(
    value: FieldValue,
    func: impl Fn(&str) -> String,
) -> Result<FieldValue, ExtractError> {
    fn transform_impl(
        value: FieldValue,
        func: &dyn Fn(&str) -> String,
    ) -> Result<FieldValue, ExtractError> {
        match value {
            FieldValue::String(s) => Ok(FieldValue::String(func(&s))),
            FieldValue::List(items) => Ok(FieldValue::List(
                items
                    .into_iter()
                    .map(|item| transform_impl(item, func))
                    .collect::<Result<_, _>>()?,
            )),
            FieldValue::Null => Ok(FieldValue::Null),
            other => Ok(other),
        }
    }
    transform_impl(value, &func)
}

fn join_lines(value: FieldValue) -> Result<FieldValue, ExtractError> {
    match value {
        FieldValue::List(items) => {
            let lines: Vec<String> = items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(|item| item.to_string())
                .collect();
            Ok(FieldValue::String(lines.join("\n")))
        }
        FieldValue::String(_) => Ok(value),
        FieldValue::Null => Ok(FieldValue::Null),
        other => Err(ExtractError::Transform(format!(
            "cannot join {} into lines",
            other
        ))),
    }
}

/// Source format of a reader definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatDef {
    Tree,
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictnessDef {
    Strict,
    #[default]
    Lenient,
}

impl From<StrictnessDef> for Strictness {
    fn from(def: StrictnessDef) -> Self {
        match def {
            StrictnessDef::Strict => Strictness::Strict,
            StrictnessDef::Lenient => Strictness::Lenient,
        }
    }
}

/// One tag query step in a definition. Exactly one selector key must be
/// set. Attribute constraints go in `attrs`; the value `"*"` means the
/// attribute only has to be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    #[serde(default)]
    pub child: Option<String>,
    #[serde(default)]
    pub descendant: Option<String>,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub preceding_sibling: Option<String>,
    #[serde(default)]
    pub following_sibling: Option<String>,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
}

impl StepDef {
    fn build(&self) -> Result<TagQueryStep, ConfigError> {
        let selectors = [
            self.child.is_some(),
            self.descendant.is_some(),
            self.parent.is_some(),
            self.preceding_sibling.is_some(),
            self.following_sibling.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count();
        if selectors != 1 {
            return Err(ConfigError::InvalidStep(
                "exactly one of child, descendant, parent, preceding_sibling, \
                 following_sibling must be set"
                    .to_string(),
            ));
        }

        let filters = self.build_filters();

        if let Some(name) = &self.child {
            return Ok(TagQueryStep::Child {
                name: name.clone(),
                filters,
                recursive: false,
            });
        }
        if let Some(name) = &self.descendant {
            return Ok(TagQueryStep::Child {
                name: name.clone(),
                filters,
                recursive: true,
            });
        }
        if let Some(name) = &self.preceding_sibling {
            return Ok(TagQueryStep::Sibling {
                name: name.clone(),
                direction: crate::query::SiblingDirection::Preceding,
                filters,
            });
        }
        if let Some(name) = &self.following_sibling {
            return Ok(TagQueryStep::Sibling {
                name: name.clone(),
                direction: crate::query::SiblingDirection::Following,
                filters,
            });
        }
        // Only `parent` is left.
        if !self.attrs.is_empty() {
            return Err(ConfigError::InvalidStep(
                "parent steps do not take attribute constraints".to_string(),
            ));
        }
        let levels = self.parent.unwrap_or(1);
        if levels == 0 {
            return Err(ConfigError::InvalidStep(
                "parent must ascend at least one level".to_string(),
            ));
        }
        Ok(TagQueryStep::Parent { levels })
    }

    fn build_filters(&self) -> Vec<AttributeFilter> {
        self.attrs
            .iter()
            .map(|(name, value)| AttributeFilter {
                name: name.clone(),
                expected: if value == "*" {
                    AttrMatch::Any
                } else {
                    AttrMatch::Value(value.clone())
                },
            })
            .collect()
    }
}

fn build_query(steps: &[StepDef]) -> Result<TagQuery, ConfigError> {
    let mut query = TagQuery::new();
    for step in steps {
        query = query.step(step.build()?);
    }
    Ok(query)
}

/// Column reference in a definition: a name or a zero-based position.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnDef {
    Index(usize),
    Name(String),
}

impl From<&ColumnDef> for ColumnRef {
    fn from(def: &ColumnDef) -> Self {
        match def {
            ColumnDef::Name(name) => ColumnRef::Name(name.clone()),
            ColumnDef::Index(index) => ColumnRef::Index(*index),
        }
    }
}

/// Declarative extractor definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractorDef {
    Constant {
        value: serde_yaml::Value,
        #[serde(default)]
        transform: Option<String>,
    },
    Order,
    Metadata {
        key: String,
        #[serde(default)]
        transform: Option<String>,
    },
    TreeQuery {
        #[serde(default)]
        steps: Vec<StepDef>,
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        toplevel: bool,
        #[serde(default)]
        flatten: bool,
        #[serde(default)]
        transform: Option<String>,
    },
    Column {
        column: ColumnDef,
        #[serde(default)]
        multiple: bool,
        #[serde(default)]
        convert_to_none: Option<Vec<String>>,
        #[serde(default)]
        transform: Option<String>,
    },
    Backup {
        extractors: Vec<ExtractorDef>,
    },
    Combined {
        extractors: Vec<ExtractorDef>,
    },
}

/// One field of a reader definition.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub extractor: ExtractorDef,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub skip: bool,
}

/// A complete reader definition, loadable from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderDef {
    pub format: FormatDef,
    /// Tag query narrowing the search scope (tree format only).
    #[serde(default)]
    pub toplevel: Option<Vec<StepDef>>,
    /// Tag query for the entry boundary (tree format only). Empty means
    /// the whole source is one entry.
    #[serde(default)]
    pub entry: Vec<StepDef>,
    /// Column grouping consecutive rows into entries (rows format only).
    #[serde(default)]
    pub entry_column: Option<String>,
    /// Column whose empty rows are skipped (rows format only).
    #[serde(default)]
    pub required_column: Option<String>,
    #[serde(default)]
    pub strictness: StrictnessDef,
    pub fields: Vec<FieldDef>,
}

/// A reader built from a definition.
pub enum BuiltReader {
    Tree(TreeReader),
    Rows(RowReader),
}

impl BuiltReader {
    pub fn fields(&self) -> &FieldSet {
        match self {
            BuiltReader::Tree(reader) => reader.fields(),
            BuiltReader::Rows(reader) => reader.fields(),
        }
    }
}

impl ReaderDef {
    /// Parse a definition from YAML text. The definition lives under a
    /// top-level `reader` key.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents)?;
        let reader_yaml = yaml
            .get("reader")
            .ok_or_else(|| ConfigError::Invalid("missing top-level 'reader' key".to_string()))?;
        Ok(serde_yaml::from_value(reader_yaml.clone())?)
    }

    /// Load a definition from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build the definition into a reader, resolving transform names
    /// against `registry`. Validation is eager: unknown transforms,
    /// malformed steps, duplicate field names and format/extractor
    /// mismatches all fail here, not at extraction time.
    pub fn build(&self, registry: &TransformRegistry) -> Result<BuiltReader, ConfigError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field_def in &self.fields {
            let extractor =
                build_extractor(&field_def.extractor, registry, self.format, &field_def.name)?;
            let mut field = Field::from_boxed(field_def.name.as_str(), extractor);
            if field_def.required {
                field = field.required();
            }
            if field_def.skip {
                field = field.skip();
            }
            fields.push(field);
        }
        let fields = FieldSet::new(fields)
            .map_err(|e| ConfigError::DuplicateField(e.to_string()))?;

        match self.format {
            FormatDef::Tree => {
                if self.entry_column.is_some() || self.required_column.is_some() {
                    return Err(ConfigError::Invalid(
                        "entry_column and required_column only apply to the rows format"
                            .to_string(),
                    ));
                }
                let mut reader = TreeReader::new(build_query(&self.entry)?, fields)
                    .with_strictness(self.strictness.into());
                if let Some(toplevel) = &self.toplevel {
                    reader = reader.with_toplevel(build_query(toplevel)?);
                }
                Ok(BuiltReader::Tree(reader))
            }
            FormatDef::Rows => {
                if self.toplevel.is_some() || !self.entry.is_empty() {
                    return Err(ConfigError::Invalid(
                        "toplevel and entry queries only apply to the tree format".to_string(),
                    ));
                }
                let mut reader =
                    RowReader::new(fields).with_strictness(self.strictness.into());
                if let Some(column) = &self.entry_column {
                    reader = reader.with_entry_column(column.clone());
                }
                if let Some(column) = &self.required_column {
                    reader = reader.with_required_column(column.clone());
                }
                Ok(BuiltReader::Rows(reader))
            }
        }
    }
}

fn resolve_transform(
    name: &Option<String>,
    registry: &TransformRegistry,
) -> Result<Option<TransformFn>, ConfigError> {
    match name {
        None => Ok(None),
        Some(name) => registry
            .get(name)
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownTransform(name.clone())),
    }
}

fn build_extractor(
    def: &ExtractorDef,
    registry: &TransformRegistry,
    format: FormatDef,
    field: &str,
) -> Result<Box<dyn Extractor>, ConfigError> {
    match def {
        ExtractorDef::Constant { value, transform } => {
            let mut extractor = Constant::new(yaml_to_field_value(value));
            if let Some(t) = resolve_transform(transform, registry)? {
                extractor = extractor.with_transform(move |v| t(v));
            }
            Ok(Box::new(extractor))
        }
        ExtractorDef::Order => Ok(Box::new(Order::new())),
        ExtractorDef::Metadata { key, transform } => {
            let mut extractor = Metadata::new(key.clone());
            if let Some(t) = resolve_transform(transform, registry)? {
                extractor = extractor.with_transform(move |v| t(v));
            }
            Ok(Box::new(extractor))
        }
        ExtractorDef::TreeQuery {
            steps,
            attribute,
            multiple,
            toplevel,
            flatten,
            transform,
        } => {
            if format == FormatDef::Rows {
                return Err(ConfigError::ExtractorMismatch {
                    field: field.to_string(),
                    extractor: "tree_query",
                });
            }
            let mut extractor = TreeQuery::new(build_query(steps)?);
            if let Some(attribute) = attribute {
                extractor = extractor.attribute(attribute.clone());
            }
            if *multiple {
                extractor = extractor.multiple();
            }
            if *toplevel {
                extractor = extractor.toplevel();
            }
            if *flatten {
                extractor = extractor.flatten();
            }
            if let Some(t) = resolve_transform(transform, registry)? {
                extractor = extractor.with_transform(move |v| t(v));
            }
            Ok(Box::new(extractor))
        }
        ExtractorDef::Column {
            column,
            multiple,
            convert_to_none,
            transform,
        } => {
            if format == FormatDef::Tree {
                return Err(ConfigError::ExtractorMismatch {
                    field: field.to_string(),
                    extractor: "column",
                });
            }
            let mut extractor = Column::new(ColumnRef::from(column));
            if *multiple {
                extractor = extractor.multiple();
            }
            if let Some(values) = convert_to_none {
                extractor = extractor.convert_to_none(values.clone());
            }
            if let Some(t) = resolve_transform(transform, registry)? {
                extractor = extractor.with_transform(move |v| t(v));
            }
            Ok(Box::new(extractor))
        }
        ExtractorDef::Backup { extractors } => {
            let built = extractors
                .iter()
                .map(|sub| build_extractor(sub, registry, format, field))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(Backup::new(built)))
        }
        ExtractorDef::Combined { extractors } => {
            let built = extractors
                .iter()
                .map(|sub| build_extractor(sub, registry, format, field))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(Combined::new(built)))
        }
    }
}

fn yaml_to_field_value(value: &serde_yaml::Value) -> FieldValue {
    match value {
        serde_yaml::Value::String(s) => FieldValue::String(s.clone()),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::Null
            }
        }
        serde_yaml::Value::Bool(b) => FieldValue::Bool(*b),
        serde_yaml::Value::Sequence(items) => {
            FieldValue::List(items.iter().map(yaml_to_field_value).collect())
        }
        serde_yaml::Value::Null => FieldValue::Null,
        // Mappings and tags have no field value shape.
        _ => FieldValue::Null,
    }
}
