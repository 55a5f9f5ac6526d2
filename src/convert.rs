//! Conversion of each column from and to text, chosen from the field descriptor
use crate::catalog::Catalog;
use crate::error::{FieldParseError, SchemaConfigError};
use crate::schema::{ColumnMapEntry, FeedScope, FieldDescriptor, FieldKind, Schema};
use crate::store::{Fields, Record};
use crate::value::{format_date, parse_date, FeedId, Value};

/// How the related record of a relation column is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Related schema
    pub target: String,
    /// Field of the related schema holding the natural key
    pub field: String,
    /// Conversion of the natural key
    pub converter: Box<ImportConverter>,
    /// Field of the related schema pointing to the feed, if any
    pub feed_field: Option<String>,
    /// Values of a related record created from its natural key alone
    pub defaults: Fields,
}

/// Transient key used to find or create a related record in the current feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationKey {
    /// Related schema
    pub target: String,
    /// Field of the related schema pointing to the feed, if any
    pub feed_field: Option<String>,
    /// Natural key
    pub fields: Fields,
    /// Other values of the related record, when it has to be created
    pub defaults: Fields,
}

impl RelationKey {
    /// Fields used to find the related record in `feed`, and the other values it is created with
    pub fn into_fields(self, feed: FeedId) -> (Fields, Fields) {
        let mut fields = self.fields;
        if let Some(feed_field) = self.feed_field {
            fields.insert(feed_field, Value::Feed(feed));
        }
        (fields, self.defaults)
    }
}

/// Result of the conversion of one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converted {
    /// Final value of the field
    Value(Value),
    /// The field references a record that still has to be resolved; [None] for an empty cell
    Relation(Option<RelationKey>),
}

/// How the text of a column is turned into a value on import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportConverter {
    /// `YYYYMMDD`. An empty cell takes `blank`, or is an error when there is none
    Date {
        /// Value of an empty cell
        blank: Option<Value>,
    },
    /// `1` is true, anything else false
    Boolean,
    /// Empty stays an empty string
    Text,
    /// Empty is null, otherwise a reference to a related record
    Relation(Lookup),
    /// Like [ImportConverter::Relation], but accumulated into a set
    ManyRelation(Lookup),
    /// Empty is null, otherwise the text
    Null,
    /// Empty is the default, otherwise the text
    Default(Value),
    /// The text as is
    PassThrough,
}

impl ImportConverter {
    /// Converts the raw text of `column`
    pub fn convert(&self, column: &str, text: &str) -> Result<Converted, FieldParseError> {
        let value = match self {
            ImportConverter::Date { blank } => match (text.is_empty(), blank) {
                (true, Some(blank)) => blank.clone(),
                _ => Value::Date(parse_date(text).map_err(|reason| FieldParseError {
                    column: column.to_owned(),
                    value: text.to_owned(),
                    reason,
                })?),
            },
            ImportConverter::Boolean => Value::Bool(text == "1"),
            ImportConverter::Text => Value::text(text),
            ImportConverter::Relation(lookup) | ImportConverter::ManyRelation(lookup) => {
                if text.is_empty() {
                    return Ok(Converted::Relation(None));
                }
                return lookup.key(column, text).map(|k| Converted::Relation(Some(k)));
            }
            ImportConverter::Null if text.is_empty() => Value::Null,
            ImportConverter::Default(default) if text.is_empty() => default.clone(),
            ImportConverter::Null | ImportConverter::Default(_) | ImportConverter::PassThrough => {
                Value::text(text)
            }
        };
        Ok(Converted::Value(value))
    }

    /// Does the converter feed a many relation
    pub fn is_many(&self) -> bool {
        matches!(self, ImportConverter::ManyRelation(_))
    }
}

impl Lookup {
    fn key(&self, column: &str, text: &str) -> Result<RelationKey, FieldParseError> {
        let value = match self.converter.convert(column, text)? {
            Converted::Value(v) => v,
            // lookup fields are never relations, see Catalog::validate
            Converted::Relation(_) => Value::text(text),
        };
        let mut fields = Fields::new();
        fields.insert(self.field.clone(), value);
        Ok(RelationKey {
            target: self.target.clone(),
            feed_field: self.feed_field.clone(),
            fields,
            defaults: self.defaults.clone(),
        })
    }
}

/// Conversion of a field that is not a relation
fn plain_converter(field: &FieldDescriptor) -> ImportConverter {
    match &field.kind {
        FieldKind::Date => ImportConverter::Date {
            blank: field
                .default
                .clone()
                .or_else(|| field.nullable.then_some(Value::Null)),
        },
        FieldKind::Boolean => ImportConverter::Boolean,
        FieldKind::Text if !field.nullable => ImportConverter::Text,
        _ if field.nullable => ImportConverter::Null,
        _ => match &field.default {
            Some(default) => ImportConverter::Default(default.clone()),
            None => ImportConverter::PassThrough,
        },
    }
}

/// Chooses the import converter of a column of `schema`
pub fn resolve_import(
    catalog: &Catalog,
    schema: &Schema,
    column: &ColumnMapEntry,
) -> Result<ImportConverter, SchemaConfigError> {
    let field = schema.column_field(column);
    let target = match &field.kind {
        FieldKind::Relation { target } | FieldKind::ManyRelation { target } => target,
        _ => return Ok(plain_converter(field)),
    };
    let invalid_lookup = || SchemaConfigError::InvalidLookup {
        schema: schema.name().to_owned(),
        field: field.name.clone(),
        target: target.clone(),
        lookup: column.path.related.clone().unwrap_or_default(),
    };
    let target_schema = catalog.schema(target)?;
    let lookup_field = column
        .path
        .related
        .as_deref()
        .and_then(|f| target_schema.field(f))
        .filter(|f| !f.is_relation())
        .ok_or_else(invalid_lookup)?;
    let lookup = Lookup {
        target: target.clone(),
        field: lookup_field.name.clone(),
        converter: Box::new(plain_converter(lookup_field)),
        feed_field: match target_schema.feed_scope() {
            FeedScope::Field(f) => Some(f.clone()),
            FeedScope::Inherited => None,
        },
        defaults: stub_values(target_schema, &lookup_field.name),
    };
    Ok(if field.is_many() {
        ImportConverter::ManyRelation(lookup)
    } else {
        ImportConverter::Relation(lookup)
    })
}

/// Every field of `schema` but the natural key, at its default or blank value.
///
/// Many relations are left out, they start empty
fn stub_values(schema: &Schema, lookup: &str) -> Fields {
    schema
        .fields()
        .iter()
        .filter(|f| f.name != lookup && !f.is_many())
        .map(|f| {
            (
                f.name.clone(),
                f.default.clone().unwrap_or_else(|| f.blank_value()),
            )
        })
        .collect()
}

/// When a column is written in an exported file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRule {
    /// The column is always written
    Always,
    /// The column is only written if at least one record has a non blank value
    IfUsed,
}

/// How a value is turned into text on export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSerializer {
    /// The value of the field itself
    Plain,
    /// The natural key of the referenced record
    Related {
        /// Natural key field of the related record
        lookup: String,
    },
    /// The natural key of each member of the set, one line per member
    ManyRelated {
        /// Natural key field of the related records
        lookup: String,
    },
}

/// A column of the column map, ready to be exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    /// Column name in the GTFS file
    pub external_name: String,
    /// Field exported in the column
    pub field: String,
    /// When the column is written
    pub rule: ExportRule,
    /// How the cells are written
    pub serializer: ExportSerializer,
    /// Value of the field when it is not used
    pub blank: Value,
}

impl ExportColumn {
    /// Is the field of `record` at its blank value.
    ///
    /// A missing value is blank; a many relation is blank when empty
    pub fn is_blank(&self, record: &Record) -> bool {
        match self.serializer {
            ExportSerializer::ManyRelated { .. } => record.related(&self.field).next().is_none(),
            _ => record
                .get(&self.field)
                .map(|v| *v == self.blank)
                .unwrap_or(true),
        }
    }
}

/// Chooses how a column of `schema` is exported
pub fn resolve_export(schema: &Schema, column: &ColumnMapEntry) -> ExportColumn {
    let field = schema.column_field(column);
    let lookup = column.path.related.clone().unwrap_or_default();
    let serializer = match field.kind {
        FieldKind::Relation { .. } => ExportSerializer::Related { lookup },
        FieldKind::ManyRelation { .. } => ExportSerializer::ManyRelated { lookup },
        _ => ExportSerializer::Plain,
    };
    ExportColumn {
        external_name: column.external_name.clone(),
        field: field.name.clone(),
        rule: if field.is_optional() {
            ExportRule::IfUsed
        } else {
            ExportRule::Always
        },
        serializer,
        blank: field.blank_value(),
    }
}

/// Writes a value that is not a reference. [None] for [Value::Ref] and [Value::Feed]
pub fn serialize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Text(s) => Some(s.clone()),
        Value::Bool(true) => Some("1".to_owned()),
        Value::Bool(false) => Some(String::new()),
        Value::Date(d) => Some(format_date(d)),
        Value::Ref(_) | Value::Feed(_) => None,
    }
}
