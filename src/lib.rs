/*! Declarative mapping between [GTFS](https://gtfs.org/) text files and typed records.

A GTFS feed is a collection of CSV files. Each file holds the objects of one type (stops, routes, trips…),
linked together by natural keys such as `stop_id` or `zone_id`.

This crate converts those files into records of a [RecordStore] and back, driven only by a [Schema]
declaring the fields of a record type and its column map.

## Design decisions

### Schemas are data

A [Schema] lists [FieldDescriptor]s and [ColumnMapEntry]s. The kind of each field ([FieldKind]) decides
how a cell is converted: dates are `YYYYMMDD`, booleans are `1`, relations are written as the natural key
of the related record (`zone::zone_id`). Schemas are grouped in a [Catalog] so that relations can be checked
once, at startup.

### Import

[Importer] reads rows, converts every cell, finds or creates the referenced records in the same feed, then
creates the record. When the schema has a many relation, rows sharing the same single-valued fields are merged
into one record and the relation accumulates one member per row.

A cell that cannot be converted skips its row by default ([ParseErrorPolicy]); a non empty value in an
unknown column aborts the whole file.

### Export

[Exporter] writes every mandatory column, and the optional columns only when at least one record uses them.
When there is no record, nothing is written at all, not even the header.

### Storage

The pipelines only know the [RecordStore] trait. [MemoryStore] is a simple implementation keeping everything
in memory.
*/
#![warn(missing_docs)]

#[macro_use]
extern crate derivative;

mod catalog;
pub mod convert;
pub mod error;
mod export;
mod import;
mod memory;
mod row;
mod schema;
mod store;
mod value;

#[cfg(test)]
mod tests;

pub use catalog::Catalog;
pub use error::{Error, FieldParseError, SchemaConfigError, StoreError};
pub use export::{Exporter, SchemaExporter};
pub use import::{ImportReport, Importer, ParseErrorPolicy, SchemaImporter, SkippedRow};
pub use memory::MemoryStore;
pub use row::{extra_column, Row, RowReader};
pub use schema::{
    ColumnMapEntry, FeedScope, FieldDescriptor, FieldKind, FieldPath, Schema, SchemaBuilder,
};
pub use store::{Fields, Record, RecordStore};
pub use value::{FeedId, RecordId, Value};
