use std::io::{self, Read};

use crate::error::{Error, LineError};

const BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// One line of a GTFS file: the raw text of each column, by column name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(Vec<(String, String)>);

impl Row {
    /// An empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.push((column.into(), value.into()));
    }

    /// Raw text of a column, if the row has it
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Columns in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Has the row no column
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs a line with the headers of its file.
    ///
    /// Values beyond the last header are kept under the name given by [extra_column]
    fn from_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        Row(record
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let column = headers
                    .get(i)
                    .map(str::to_owned)
                    .unwrap_or_else(|| extra_column(i + 1));
                (column, v.to_owned())
            })
            .collect())
    }
}

/// Column name of the `position`th value (starting at 1) of a line longer than the headers
pub fn extra_column(position: usize) -> String {
    format!("<extra value {position}>")
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

/// Streams the [Row] of a GTFS file, one line at a time
pub struct RowReader<R: Read> {
    reader: csv::Reader<io::Chain<io::Cursor<Vec<u8>>, R>>,
    headers: csv::StringRecord,
    record: csv::StringRecord,
    file_name: String,
    line: usize,
}

impl<R: Read> RowReader<R> {
    /// Reads the headers of the file. A leading UTF-8 BOM is skipped
    pub fn new(mut reader: R, file_name: &str, trim_fields: bool) -> Result<Self, Error> {
        let mut head = Vec::with_capacity(BOM.len());
        (&mut reader)
            .take(BOM.len() as u64)
            .read_to_end(&mut head)?;
        if head == BOM {
            head.clear();
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(if trim_fields {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(io::Cursor::new(head).chain(reader));
        // We store the headers to be able to return them in case of errors
        let headers = reader
            .headers()
            .map_err(|e| Error::CSVError {
                file_name: file_name.to_owned(),
                source: e,
                line_in_error: None,
            })?
            .clone();

        Ok(Self {
            reader,
            headers,
            record: csv::StringRecord::new(),
            file_name: file_name.to_owned(),
            line: 0,
        })
    }

    /// Column names of the file
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Number of the last data line read, starting at 1
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.line += 1;
                Some(Ok(Row::from_record(&self.headers, &self.record)))
            }
            Ok(false) => None,
            Err(e) => Some(Err(Error::CSVError {
                file_name: self.file_name.clone(),
                source: e,
                line_in_error: Some(LineError {
                    headers: self.headers.iter().map(String::from).collect(),
                    values: self.record.iter().map(String::from).collect(),
                }),
            })),
        }
    }
}
