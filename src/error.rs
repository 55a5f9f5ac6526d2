//! Module for the error management
use thiserror::Error;

use crate::row::Row;
use crate::value::{FeedId, RecordId};

/// Specific line from a CSV file that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// Headers of the CSV file
    pub headers: Vec<String>,
    /// Values of the line that could not be parsed
    pub values: Vec<String>,
}

/// A mistake in the declaration of a schema or of a catalog.
///
/// Those are raised when the schemas are built, before any row is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaConfigError {
    /// A column of the column map points to a field that was never declared
    #[error("column '{column}' of '{schema}' references the undeclared field '{field}'")]
    UndeclaredField {
        /// Schema being built
        schema: String,
        /// External column name
        column: String,
        /// Field name in the path
        field: String,
    },
    /// Two fields share the same name
    #[error("field '{field}' is declared twice in '{schema}'")]
    DuplicateField {
        /// Schema being built
        schema: String,
        /// Duplicated field name
        field: String,
    },
    /// Two columns share the same external name
    #[error("column '{column}' is declared twice in '{schema}'")]
    DuplicateColumn {
        /// Schema being built
        schema: String,
        /// Duplicated column name
        column: String,
    },
    /// A field path is neither `field` nor `field::related_field`
    #[error("'{path}' is not a valid field path in '{schema}'")]
    InvalidPath {
        /// Schema being built
        schema: String,
        /// The offending path
        path: String,
    },
    /// A relation column must name the field used to look the related record up
    #[error("column '{column}' of '{schema}' is a relation and needs a `field::lookup` path")]
    MissingLookupField {
        /// Schema being built
        schema: String,
        /// External column name
        column: String,
    },
    /// Only relation columns may reach into another record
    #[error("column '{column}' of '{schema}' is not a relation but uses a `::` path")]
    UnexpectedLookupField {
        /// Schema being built
        schema: String,
        /// External column name
        column: String,
    },
    /// A relation points to a schema that is not registered in the catalog
    #[error("field '{field}' of '{schema}' targets the unknown schema '{target}'")]
    UnknownTarget {
        /// Owning schema
        schema: String,
        /// Relation field
        field: String,
        /// Missing target schema
        target: String,
    },
    /// A relation looks the related record up by a field the target does not have
    #[error("'{schema}.{field}' looks up '{target}' by '{lookup}', which is not a plain field of '{target}'")]
    InvalidLookup {
        /// Owning schema
        schema: String,
        /// Relation field
        field: String,
        /// Target schema
        target: String,
        /// Lookup field in the target schema
        lookup: String,
    },
    /// The catalog already contains a schema of that name
    #[error("schema '{0}' is registered twice")]
    DuplicateSchema(String),
    /// The catalog does not contain a schema of that name
    #[error("schema '{0}' is not registered")]
    UnknownSchema(String),
}

/// A text value that could not be converted to the kind of its field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("impossible to convert '{value}' of column '{column}': {reason}")]
pub struct FieldParseError {
    /// External column name
    pub column: String,
    /// Raw text value
    pub value: String,
    /// What was expected
    pub reason: String,
}

/// An error reported by a [crate::RecordStore]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist
    #[error("the record {0} is not known")]
    UnknownRecord(RecordId),
    /// Any failure of an external storage backend
    #[error("storage failure: {0}")]
    Backend(String),
}

/// An error that can occur when importing or exporting GTFS data.
#[derive(Error, Debug)]
pub enum Error {
    /// The schemas are badly declared
    #[error(transparent)]
    SchemaConfig(#[from] SchemaConfigError),
    /// A row carries data in a column that the schema does not know
    #[error("unexpected column name '{column}' in row {row:?}, expecting {expected:?}")]
    UnexpectedColumn {
        /// The offending column
        column: String,
        /// The whole row
        row: Row,
        /// Columns declared by the schema
        expected: Vec<String>,
    },
    /// A value of a row could not be converted
    #[error("impossible to import line {line} of '{file_name}'")]
    FieldParse {
        /// Name of the file (or schema when reading rows)
        file_name: String,
        /// 1-based number of the data line
        line: usize,
        /// The conversion error
        #[source]
        source: FieldParseError,
    },
    /// The record store failed
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A record lacks a column that is always exported
    #[error("record {record} of feed {feed} has no value for the mandatory field '{field}'")]
    MissingField {
        /// The incomplete record
        record: RecordId,
        /// Its feed
        feed: FeedId,
        /// The missing field
        field: String,
    },
    /// A value cannot be written as text
    #[error("field '{field}' of record {record} holds a value that cannot be written as text")]
    Unserializable {
        /// The record
        record: RecordId,
        /// The field
        field: String,
    },
    /// Generic Input/Output error while reading or writing a file
    #[error("impossible to read or write file")]
    IO(#[from] std::io::Error),
    /// Impossible to read or write a CSV file
    #[error("impossible to process csv file '{file_name}'")]
    CSVError {
        /// File name that could not be parsed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
        /// The line that could not be parsed by the csv library
        line_in_error: Option<LineError>,
    },
}
