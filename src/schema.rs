//! Declaration of record types: their fields and their column map
use rustc_hash::FxHashMap;

use crate::error::SchemaConfigError;
use crate::value::Value;

/// Separator between a relation field and the field of the related record used as lookup key
pub const PATH_SEPARATOR: &str = "::";

/// What a field holds, and therefore how it is converted from and to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// String-like scalar. When not nullable, an empty cell is an empty string
    Text,
    /// Any other scalar (numbers, enumerations…). The text is kept as is
    Scalar,
    /// A day in the `YYYYMMDD` format
    Date,
    /// `1` is true, anything else is false
    Boolean,
    /// Reference to one record of the `target` schema
    Relation {
        /// Name of the related schema
        target: String,
    },
    /// Set of references to records of the `target` schema
    ManyRelation {
        /// Name of the related schema
        target: String,
    },
}

/// Description of one field of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name of the field in the record
    pub name: String,
    /// Kind of the field
    pub kind: FieldKind,
    /// Blank is stored as [Value::Null]
    pub nullable: bool,
    /// The column may be left blank in a GTFS file
    pub blank: bool,
    /// Value used for blank cells
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// A mandatory field of the given kind
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            blank: false,
            default: None,
        }
    }

    /// A string-like field
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// A scalar that is not string-like
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    /// A date
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// A boolean
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// A reference to a record of `target`
    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Relation {
                target: target.into(),
            },
        )
    }

    /// A set of references to records of `target`
    pub fn many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::ManyRelation {
                target: target.into(),
            },
        )
    }

    /// The column may be omitted or left empty
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// The column may be omitted, and blank is stored as [Value::Null]
    pub fn null(mut self) -> Self {
        self.blank = true;
        self.nullable = true;
        self
    }

    /// Blank cells take this value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Does the field declare a default value
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Optional fields are only exported when at least one record uses them
    pub fn is_optional(&self) -> bool {
        self.blank && !self.has_default()
    }

    /// Name of the related schema, for relation fields
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { target } | FieldKind::ManyRelation { target } => Some(target),
            _ => None,
        }
    }

    /// Is it a [FieldKind::Relation] or a [FieldKind::ManyRelation]
    pub fn is_relation(&self) -> bool {
        self.target().is_some()
    }

    /// Is it a [FieldKind::ManyRelation]
    pub fn is_many(&self) -> bool {
        matches!(self.kind, FieldKind::ManyRelation { .. })
    }

    /// The value a record holds when nothing was given for this field
    ///
    /// Many relations are blank when their set is empty; this returns [Value::Null] for them.
    pub fn blank_value(&self) -> Value {
        if self.nullable {
            return Value::Null;
        }
        match self.kind {
            FieldKind::Text | FieldKind::Scalar => Value::Text(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Date | FieldKind::Relation { .. } | FieldKind::ManyRelation { .. } => {
                Value::Null
            }
        }
    }
}

/// Where a column takes its value: a local field, or the lookup field of a related record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// Local field
    pub field: String,
    /// Field of the related record used as natural key
    pub related: Option<String>,
}

impl FieldPath {
    /// Parses `field` or `field::related_field`
    pub fn parse(path: &str) -> Option<Self> {
        let mut parts = path.split(PATH_SEPARATOR);
        let field = parts.next().filter(|f| !f.is_empty())?;
        let related = match parts.next() {
            Some(r) if !r.is_empty() => Some(r.to_owned()),
            Some(_) => return None,
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            field: field.to_owned(),
            related,
        })
    }
}

/// One column of a GTFS file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapEntry {
    /// Column name in the GTFS file
    pub external_name: String,
    /// Field fed by the column
    pub path: FieldPath,
}

/// How the records of a schema are attached to their feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// The named field is set to [Value::Feed] on import and is part of the record identity
    Field(String),
    /// The records only belong to the feed through their relations
    Inherited,
}

impl Default for FeedScope {
    fn default() -> Self {
        FeedScope::Field("feed".to_owned())
    }
}

/// A record type: its fields, its column map and its relation to the feed
///
/// Built with [SchemaBuilder]; immutable afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
    field_index: FxHashMap<String, usize>,
    columns: Vec<ColumnMapEntry>,
    column_index: FxHashMap<String, usize>,
    feed_scope: FeedScope,
}

impl Schema {
    /// Starts the declaration of a schema
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            columns: Vec::new(),
            feed_scope: FeedScope::default(),
        }
    }

    /// Name of the schema
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor of a field
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|i| &self.fields[*i])
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The column map, in export order
    pub fn columns(&self) -> &[ColumnMapEntry] {
        &self.columns
    }

    /// Entry of the column map for an external column name
    pub fn column(&self, external_name: &str) -> Option<&ColumnMapEntry> {
        self.column_index
            .get(external_name)
            .map(|i| &self.columns[*i])
    }

    /// External names of all the columns
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.external_name.clone())
            .collect()
    }

    /// How the records are attached to their feed
    pub fn feed_scope(&self) -> &FeedScope {
        &self.feed_scope
    }

    /// Descriptor of the field behind a column.
    ///
    /// Always present, as it is checked by [SchemaBuilder::build]
    pub(crate) fn column_field(&self, column: &ColumnMapEntry) -> &FieldDescriptor {
        &self.fields[self.field_index[&column.path.field]]
    }
}

/// Declares a [Schema]
///
/// ```
/// use gtfs_mapping::{FieldDescriptor, Schema};
///
/// let stop = Schema::builder("stop")
///     .field(FieldDescriptor::text("stop_id"))
///     .field(FieldDescriptor::relation("zone", "zone").null())
///     .column("stop_id", "stop_id")
///     .column("zone_id", "zone::zone_id")
///     .build()?;
/// assert_eq!(2, stop.columns().len());
/// # Ok::<(), gtfs_mapping::SchemaConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    columns: Vec<(String, String)>,
    feed_scope: FeedScope,
}

impl SchemaBuilder {
    /// Declares a field
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a column to the column map. `path` is `field` or `field::related_field`
    pub fn column(mut self, external_name: impl Into<String>, path: impl Into<String>) -> Self {
        self.columns.push((external_name.into(), path.into()));
        self
    }

    /// Sets how the records are attached to their feed (default: a `feed` field)
    pub fn feed_scope(mut self, feed_scope: FeedScope) -> Self {
        self.feed_scope = feed_scope;
        self
    }

    /// Checks the declaration and builds the schema
    pub fn build(self) -> Result<Schema, SchemaConfigError> {
        let schema = self.name;
        let mut field_index = FxHashMap::default();
        for (i, field) in self.fields.iter().enumerate() {
            if field_index.insert(field.name.clone(), i).is_some() {
                return Err(SchemaConfigError::DuplicateField {
                    schema,
                    field: field.name.clone(),
                });
            }
        }

        let mut columns = Vec::with_capacity(self.columns.len());
        let mut column_index = FxHashMap::default();
        for (external_name, raw_path) in self.columns {
            let path = FieldPath::parse(&raw_path).ok_or_else(|| SchemaConfigError::InvalidPath {
                schema: schema.clone(),
                path: raw_path.clone(),
            })?;
            let field = match field_index.get(&path.field) {
                Some(i) => &self.fields[*i],
                None => {
                    return Err(SchemaConfigError::UndeclaredField {
                        schema,
                        column: external_name,
                        field: path.field,
                    })
                }
            };
            match (field.is_relation(), path.related.is_some()) {
                (true, false) => {
                    return Err(SchemaConfigError::MissingLookupField {
                        schema,
                        column: external_name,
                    })
                }
                (false, true) => {
                    return Err(SchemaConfigError::UnexpectedLookupField {
                        schema,
                        column: external_name,
                    })
                }
                _ => {}
            }
            if column_index
                .insert(external_name.clone(), columns.len())
                .is_some()
            {
                return Err(SchemaConfigError::DuplicateColumn {
                    schema,
                    column: external_name,
                });
            }
            columns.push(ColumnMapEntry {
                external_name,
                path,
            });
        }

        Ok(Schema {
            name: schema,
            fields: self.fields,
            field_index,
            columns,
            column_index,
            feed_scope: self.feed_scope,
        })
    }
}
