use rustc_hash::FxHashMap;

use crate::error::SchemaConfigError;
use crate::schema::Schema;

/// All the schemas of a feed, so that relations can be resolved
///
/// A catalog is built once at startup with [Catalog::from_schemas] and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: Vec<Schema>,
    index: FxHashMap<String, usize>,
}

impl Catalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers all `schemas` then checks their relations
    pub fn from_schemas<I>(schemas: I) -> Result<Self, SchemaConfigError>
    where
        I: IntoIterator<Item = Schema>,
    {
        let mut catalog = Self::new();
        for schema in schemas {
            catalog.register(schema)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Adds a schema. Its relations are only checked by [Catalog::validate]
    pub fn register(&mut self, schema: Schema) -> Result<(), SchemaConfigError> {
        if self.index.contains_key(schema.name()) {
            return Err(SchemaConfigError::DuplicateSchema(schema.name().to_owned()));
        }
        self.index.insert(schema.name().to_owned(), self.schemas.len());
        self.schemas.push(schema);
        Ok(())
    }

    /// Checks that every relation targets a registered schema,
    /// and that the lookup field of every relation column is a plain field of the target
    pub fn validate(&self) -> Result<(), SchemaConfigError> {
        for schema in &self.schemas {
            for field in schema.fields() {
                if let Some(target) = field.target() {
                    if self.get(target).is_none() {
                        return Err(SchemaConfigError::UnknownTarget {
                            schema: schema.name().to_owned(),
                            field: field.name.clone(),
                            target: target.to_owned(),
                        });
                    }
                }
            }
            for column in schema.columns() {
                let field = schema.column_field(column);
                let (Some(target), Some(lookup)) = (field.target(), &column.path.related) else {
                    continue;
                };
                let valid = self
                    .get(target)
                    .and_then(|t| t.field(lookup))
                    .map(|f| !f.is_relation())
                    .unwrap_or(false);
                if !valid {
                    return Err(SchemaConfigError::InvalidLookup {
                        schema: schema.name().to_owned(),
                        field: field.name.clone(),
                        target: target.to_owned(),
                        lookup: lookup.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// A schema by name
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.index.get(name).map(|i| &self.schemas[*i])
    }

    /// A schema by name, as an error if it is missing
    pub fn schema(&self, name: &str) -> Result<&Schema, SchemaConfigError> {
        self.get(name)
            .ok_or_else(|| SchemaConfigError::UnknownSchema(name.to_owned()))
    }

    /// All schemas in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter()
    }

    /// Number of schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Is the catalog empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
