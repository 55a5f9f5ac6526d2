use log::{debug, info};
use std::io::{self, Write};

use crate::catalog::Catalog;
use crate::convert::{resolve_export, serialize_value, ExportColumn, ExportRule, ExportSerializer};
use crate::error::Error;
use crate::schema::Schema;
use crate::store::{Record, RecordStore};
use crate::value::{FeedId, RecordId, Value};

/// Allows to parameterize how the records are written
///
/// ```
/// use gtfs_mapping::{Catalog, Exporter, FeedId, FieldDescriptor, MemoryStore, Schema};
///
/// let catalog = Catalog::from_schemas([Schema::builder("agency")
///     .field(FieldDescriptor::text("agency_name"))
///     .column("agency_name", "agency_name")
///     .build()?])?;
/// let store = MemoryStore::new();
/// let txt = Exporter::default()
///     .for_schema(&catalog, "agency")?
///     .export_txt(&store, FeedId(1))?;
/// assert_eq!(None, txt);
/// # Ok::<(), gtfs_mapping::Error>(())
/// ```
#[derive(Derivative, Debug, Clone, Copy)]
#[derivative(Default)]
pub struct Exporter {
    /// End the lines with `\r\n` instead of `\n`
    #[derivative(Default(value = "false"))]
    pub crlf: bool,
}

impl Exporter {
    /// Should the lines end with `\r\n` (default: false)
    ///
    /// Returns Self and can be chained
    pub fn crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }

    /// Resolves how every column of `schema` is exported
    pub fn for_schema<'a>(
        self,
        catalog: &'a Catalog,
        schema: &str,
    ) -> Result<SchemaExporter<'a>, Error> {
        let schema = catalog.schema(schema)?;
        Ok(SchemaExporter {
            options: self,
            schema,
            columns: schema
                .columns()
                .iter()
                .map(|c| resolve_export(schema, c))
                .collect(),
            file_name: schema.name().to_owned(),
        })
    }
}

/// Exports the records of one schema. Built by [Exporter::for_schema]
#[derive(Debug)]
pub struct SchemaExporter<'a> {
    options: Exporter,
    schema: &'a Schema,
    columns: Vec<ExportColumn>,
    file_name: String,
}

impl<'a> SchemaExporter<'a> {
    /// Name used in the errors and the logs (default: the schema name)
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// The records of `feed` as a GTFS text file. [None] when there is no record
    pub fn export_txt<S>(&self, store: &S, feed: FeedId) -> Result<Option<String>, Error>
    where
        S: RecordStore + ?Sized,
    {
        let mut buf = Vec::new();
        if !self.write_txt(store, feed, &mut buf)? {
            return Ok(None);
        }
        String::from_utf8(buf)
            .map(Some)
            .map_err(|e| Error::IO(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Writes the records of `feed` in `writer`.
    ///
    /// Returns false, and writes nothing, when there is no record
    pub fn write_txt<S, W>(&self, store: &S, feed: FeedId, writer: W) -> Result<bool, Error>
    where
        S: RecordStore + ?Sized,
        W: Write,
    {
        let name = self.schema.name();
        if !store.exists(name, feed, &|_| true)? {
            info!("No {} in {}, nothing to export", name, feed);
            return Ok(false);
        }

        let mut included = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let used = match column.rule {
                ExportRule::Always => true,
                ExportRule::IfUsed => store.exists(name, feed, &|r| !column.is_blank(r))?,
            };
            if used {
                included.push(column);
            } else {
                debug!("{}: optional column {} is not used", self.file_name, column.external_name);
            }
        }
        info!(
            "Exporting {} of {} with {} columns",
            self.file_name,
            feed,
            included.len()
        );

        let mut wtr = csv::WriterBuilder::new()
            .terminator(if self.options.crlf {
                csv::Terminator::CRLF
            } else {
                csv::Terminator::Any(b'\n')
            })
            .from_writer(writer);
        wtr.write_record(included.iter().map(|c| c.external_name.as_str()))
            .map_err(|e| self.csv_error(e))?;
        for record in store.filter(name, feed, &|_| true)? {
            for line in self.lines(&record, &included, store)? {
                wtr.write_record(&line).map_err(|e| self.csv_error(e))?;
            }
        }
        wtr.flush()?;
        Ok(true)
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::CSVError {
            file_name: self.file_name.clone(),
            source,
            line_in_error: None,
        }
    }

    /// The lines of a record: one, or one per combination of members of its many relations
    fn lines<S>(
        &self,
        record: &Record,
        columns: &[&ExportColumn],
        store: &S,
    ) -> Result<Vec<Vec<String>>, Error>
    where
        S: RecordStore + ?Sized,
    {
        let mut lines = vec![Vec::with_capacity(columns.len())];
        for column in columns {
            let cells = self.cells(record, column, store)?;
            lines = match cells.as_slice() {
                [cell] => {
                    lines.iter_mut().for_each(|l| l.push(cell.clone()));
                    lines
                }
                cells => lines
                    .iter()
                    .flat_map(move |l| {
                        cells.iter().map(move |cell| {
                            let mut l = l.clone();
                            l.push(cell.clone());
                            l
                        })
                    })
                    .collect(),
            };
        }
        Ok(lines)
    }

    /// Text of a column for a record. Many relations give one cell per member
    fn cells<S>(&self, record: &Record, column: &ExportColumn, store: &S) -> Result<Vec<String>, Error>
    where
        S: RecordStore + ?Sized,
    {
        let lookup = match &column.serializer {
            ExportSerializer::ManyRelated { lookup } => {
                let cells = record
                    .related(&column.field)
                    .map(|id| related_key(store, id, lookup))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(if cells.is_empty() {
                    vec![String::new()]
                } else {
                    cells
                });
            }
            ExportSerializer::Related { lookup } => Some(lookup),
            ExportSerializer::Plain => None,
        };
        let value = match record.get(&column.field) {
            Some(v) => v,
            None if column.rule == ExportRule::IfUsed => return Ok(vec![String::new()]),
            None => {
                return Err(Error::MissingField {
                    record: record.id,
                    feed: record.feed,
                    field: column.field.clone(),
                })
            }
        };
        let cell = match (value, lookup) {
            (Value::Ref(id), Some(lookup)) => related_key(store, *id, lookup)?,
            _ => serialize_value(value).ok_or_else(|| Error::Unserializable {
                record: record.id,
                field: column.field.clone(),
            })?,
        };
        Ok(vec![cell])
    }
}

/// Natural key of a related record
fn related_key<S>(store: &S, id: RecordId, lookup: &str) -> Result<String, Error>
where
    S: RecordStore + ?Sized,
{
    let related = store.get(id)?;
    let value = related.get(lookup).ok_or_else(|| Error::MissingField {
        record: related.id,
        feed: related.feed,
        field: lookup.to_owned(),
    })?;
    serialize_value(value).ok_or_else(|| Error::Unserializable {
        record: related.id,
        field: lookup.to_owned(),
    })
}
