use log::{debug, info, warn};
use std::io::Read;

use crate::catalog::Catalog;
use crate::convert::{resolve_import, Converted, ImportConverter, RelationKey};
use crate::error::{Error, FieldParseError};
use crate::row::{Row, RowReader};
use crate::schema::{FeedScope, Schema};
use crate::store::{Fields, RecordStore};
use crate::value::{FeedId, Value};

/// What to do with a row holding a value that cannot be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorPolicy {
    /// The row is not imported, it is listed in [ImportReport::skipped] and the import goes on
    #[default]
    SkipRow,
    /// The import stops at the first invalid row
    AbortFile,
}

/// Allows to parameterize how the rows are imported
///
/// ```
/// use gtfs_mapping::{Catalog, FeedId, FieldDescriptor, Importer, MemoryStore, ParseErrorPolicy, Schema};
///
/// let catalog = Catalog::from_schemas([Schema::builder("agency")
///     .field(FieldDescriptor::text("agency_name"))
///     .column("agency_name", "agency_name")
///     .build()?])?;
/// let mut store = MemoryStore::new();
/// let report = Importer::default()
///     .parse_error_policy(ParseErrorPolicy::AbortFile)
///     .for_schema(&catalog, "agency")?
///     .import_txt("agency_name\nBus Co\n".as_bytes(), &mut store, FeedId(1))?;
/// assert_eq!(1, report.created);
/// # Ok::<(), gtfs_mapping::Error>(())
/// ```
#[derive(Derivative, Debug, Clone, Copy)]
#[derivative(Default)]
pub struct Importer {
    /// Remove the spaces around the values and the headers
    #[derivative(Default(value = "true"))]
    pub trim_fields: bool,
    /// What to do with a row that cannot be converted
    pub parse_error_policy: ParseErrorPolicy,
}

impl Importer {
    /// Should the fields be trimmed (default: true)
    ///
    /// Returns Self and can be chained
    pub fn trim_fields(mut self, trim_fields: bool) -> Self {
        self.trim_fields = trim_fields;
        self
    }

    /// What to do with a row that cannot be converted (default: [ParseErrorPolicy::SkipRow])
    ///
    /// Returns Self and can be chained
    pub fn parse_error_policy(mut self, policy: ParseErrorPolicy) -> Self {
        self.parse_error_policy = policy;
        self
    }

    /// Resolves the converters of every column of `schema`
    pub fn for_schema<'a>(
        self,
        catalog: &'a Catalog,
        schema: &str,
    ) -> Result<SchemaImporter<'a>, Error> {
        let schema = catalog.schema(schema)?;
        let columns = schema
            .columns()
            .iter()
            .map(|c| {
                Ok(PlannedColumn {
                    external_name: c.external_name.clone(),
                    field: c.path.field.clone(),
                    converter: resolve_import(catalog, schema, c)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(SchemaImporter {
            options: self,
            schema,
            columns,
            file_name: schema.name().to_owned(),
        })
    }
}

#[derive(Debug)]
struct PlannedColumn {
    external_name: String,
    field: String,
    converter: ImportConverter,
}

/// A row that was not imported because of [ParseErrorPolicy::SkipRow]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Number of the data line, starting at 1
    pub line: usize,
    /// The row
    pub row: Row,
    /// The conversion that failed
    pub error: FieldParseError,
}

/// Summary of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Number of data lines read
    pub rows: usize,
    /// Number of records created from the rows
    pub created: usize,
    /// Number of rows added to a record created by a previous row
    pub merged: usize,
    /// Number of related records created because they were referenced
    pub related_created: usize,
    /// Rows that could not be converted
    pub skipped: Vec<SkippedRow>,
}

/// What happened to one row
enum Outcome {
    Created,
    Merged,
}

/// Imports the rows of one schema. Built by [Importer::for_schema]
#[derive(Debug)]
pub struct SchemaImporter<'a> {
    options: Importer,
    schema: &'a Schema,
    columns: Vec<PlannedColumn>,
    file_name: String,
}

impl<'a> SchemaImporter<'a> {
    /// Name used in the errors and the logs (default: the schema name)
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Imports a GTFS text file into `feed`
    pub fn import_txt<R, S>(
        &self,
        reader: R,
        store: &mut S,
        feed: FeedId,
    ) -> Result<ImportReport, Error>
    where
        R: Read,
        S: RecordStore + ?Sized,
    {
        let rows = RowReader::new(reader, &self.file_name, self.options.trim_fields)?;
        self.import(rows, store, feed)
    }

    /// Imports rows that were already split into columns
    pub fn import_rows<I, S>(&self, rows: I, store: &mut S, feed: FeedId) -> Result<ImportReport, Error>
    where
        I: IntoIterator<Item = Row>,
        S: RecordStore + ?Sized,
    {
        self.import(rows.into_iter().map(Ok), store, feed)
    }

    fn import<I, S>(&self, rows: I, store: &mut S, feed: FeedId) -> Result<ImportReport, Error>
    where
        I: Iterator<Item = Result<Row, Error>>,
        S: RecordStore + ?Sized,
    {
        info!("Importing {} into {}", self.file_name, feed);
        let mut report = ImportReport::default();
        for (i, row) in rows.enumerate() {
            let row = row?;
            let line = i + 1;
            report.rows += 1;
            match self.import_row(&row, line, store, feed, &mut report) {
                Ok(Outcome::Created) => report.created += 1,
                Ok(Outcome::Merged) => report.merged += 1,
                Err(Error::FieldParse { source, .. })
                    if self.options.parse_error_policy == ParseErrorPolicy::SkipRow =>
                {
                    warn!("{} line {}: {}, row skipped", self.file_name, line, source);
                    report.skipped.push(SkippedRow {
                        line,
                        row,
                        error: source,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "{}: {} rows, {} records created, {} merged, {} skipped",
            self.file_name,
            report.rows,
            report.created,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Converts the whole row before touching the store, so that a failing row commits nothing
    fn import_row<S>(
        &self,
        row: &Row,
        line: usize,
        store: &mut S,
        feed: FeedId,
        report: &mut ImportReport,
    ) -> Result<Outcome, Error>
    where
        S: RecordStore + ?Sized,
    {
        for (column, value) in row.iter() {
            if !value.is_empty() && self.schema.column(column).is_none() {
                return Err(Error::UnexpectedColumn {
                    column: column.to_owned(),
                    row: row.clone(),
                    expected: self.schema.column_names(),
                });
            }
        }

        let mut fields = Fields::new();
        if let FeedScope::Field(feed_field) = self.schema.feed_scope() {
            fields.insert(feed_field.clone(), Value::Feed(feed));
        }
        let mut relations: Vec<(&str, RelationKey)> = Vec::new();
        let mut many: Vec<(&str, Option<RelationKey>)> = Vec::new();
        let mut has_many = false;
        for column in &self.columns {
            let text = row.get(&column.external_name);
            if column.converter.is_many() && text.is_none() {
                continue;
            }
            let converted = column
                .converter
                .convert(&column.external_name, text.unwrap_or_default())
                .map_err(|source| Error::FieldParse {
                    file_name: self.file_name.clone(),
                    line,
                    source,
                })?;
            match converted {
                Converted::Relation(key) if column.converter.is_many() => {
                    has_many = true;
                    many.push((column.field.as_str(), key));
                }
                Converted::Relation(Some(key)) => relations.push((column.field.as_str(), key)),
                Converted::Relation(None) => {
                    fields.insert(column.field.clone(), Value::Null);
                }
                Converted::Value(v) => {
                    fields.insert(column.field.clone(), v);
                }
            }
        }

        for (field, key) in relations {
            let id = self.resolve(key, store, feed, report)?;
            fields.insert(field.to_owned(), Value::Ref(id));
        }

        if !has_many {
            let id = store.create(self.schema.name(), feed, fields)?;
            debug!("{} line {}: created {}", self.file_name, line, id);
            return Ok(Outcome::Created);
        }

        let (id, created) =
            store.get_or_create(self.schema.name(), feed, fields, Fields::new())?;
        for (field, key) in many {
            if let Some(key) = key {
                let related = self.resolve(key, store, feed, report)?;
                store.add_relation(id, field, related)?;
            }
        }
        debug!(
            "{} line {}: {} {}",
            self.file_name,
            line,
            if created { "created" } else { "merged into" },
            id
        );
        Ok(if created {
            Outcome::Created
        } else {
            Outcome::Merged
        })
    }

    fn resolve<S>(
        &self,
        key: RelationKey,
        store: &mut S,
        feed: FeedId,
        report: &mut ImportReport,
    ) -> Result<crate::RecordId, Error>
    where
        S: RecordStore + ?Sized,
    {
        let target = key.target.clone();
        let (fields, defaults) = key.into_fields(feed);
        let (id, created) = store.get_or_create(&target, feed, fields, defaults)?;
        if created {
            debug!("{}: created the referenced {} {}", self.file_name, target, id);
            report.related_created += 1;
        }
        Ok(id)
    }
}
