/*! The [GTFS](https://gtfs.org/reference/static) record types, declared with [gtfs_mapping].

[catalog] holds every schema. [FILES] lists the text files of a feed in the order they must be imported,
so that referenced records already exist when a row points to them.

```
use gtfs_mapping::{FeedId, MemoryStore};

let mut store = MemoryStore::new();
let agency = "agency_id,agency_name,agency_url,agency_timezone\nBC,Bus Co,https://bus.co,Europe/Paris\n";
let report = gtfs_schemas::import_file("agency.txt", agency.as_bytes(), &mut store, FeedId(1))?;
assert_eq!(1, report.created);
# Ok::<(), gtfs_mapping::Error>(())
```
*/
#![warn(missing_docs)]

use gtfs_mapping::{
    Catalog, Error, Exporter, FeedId, ImportReport, Importer, RecordStore, SchemaConfigError,
};
use lazy_static::lazy_static;
use log::info;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub mod objects;


/// The files of a feed and the schema of their records, in import order
pub const FILES: [(&str, &str); 8] = [
    ("agency.txt", "agency"),
    ("stops.txt", "stop"),
    ("routes.txt", "route"),
    ("calendar.txt", "service"),
    ("calendar_dates.txt", "service_date"),
    ("trips.txt", "trip"),
    ("stop_times.txt", "stop_time"),
    ("feed_info.txt", "feed_info"),
];

lazy_static! {
    static ref CATALOG: Result<Catalog, SchemaConfigError> = build_catalog();
}

fn build_catalog() -> Result<Catalog, SchemaConfigError> {
    Catalog::from_schemas([
        objects::agency()?,
        objects::zone()?,
        objects::stop()?,
        objects::route()?,
        objects::service()?,
        objects::service_date()?,
        objects::trip()?,
        objects::stop_time()?,
        objects::feed_info()?,
    ])
}

/// Every GTFS schema. Built on first use
pub fn catalog() -> Result<&'static Catalog, SchemaConfigError> {
    CATALOG.as_ref().map_err(Clone::clone)
}

/// Schema of the records of a GTFS file
pub fn schema_for(file_name: &str) -> Option<&'static str> {
    FILES
        .iter()
        .find(|(f, _)| *f == file_name)
        .map(|(_, schema)| *schema)
}

fn file_schema(file_name: &str) -> Result<&'static str, Error> {
    schema_for(file_name).ok_or_else(|| SchemaConfigError::UnknownSchema(file_name.to_owned()).into())
}

/// Imports one GTFS file, with the default [Importer]
pub fn import_file<R, S>(
    file_name: &str,
    reader: R,
    store: &mut S,
    feed: FeedId,
) -> Result<ImportReport, Error>
where
    R: Read,
    S: RecordStore + ?Sized,
{
    Importer::default()
        .for_schema(catalog()?, file_schema(file_name)?)?
        .file_name(file_name)
        .import_txt(reader, store, feed)
}

/// Exports one GTFS file, with the default [Exporter]. [None] when the feed has no such record
pub fn export_file<S>(file_name: &str, store: &S, feed: FeedId) -> Result<Option<String>, Error>
where
    S: RecordStore + ?Sized,
{
    Exporter::default()
        .for_schema(catalog()?, file_schema(file_name)?)?
        .file_name(file_name)
        .export_txt(store, feed)
}

/// Imports the files of a feed found in `dir`, in [FILES] order. Missing files are skipped
pub fn import_dir<S>(
    importer: Importer,
    dir: &Path,
    store: &mut S,
    feed: FeedId,
) -> Result<Vec<(&'static str, ImportReport)>, Error>
where
    S: RecordStore + ?Sized,
{
    let catalog = catalog()?;
    let mut reports = Vec::new();
    for (file_name, schema) in FILES {
        let path = dir.join(file_name);
        if !path.exists() {
            info!("No {} in {}", file_name, dir.display());
            continue;
        }
        let report = importer
            .for_schema(catalog, schema)?
            .file_name(file_name)
            .import_txt(File::open(path)?, store, feed)?;
        reports.push((file_name, report));
    }
    Ok(reports)
}

/// Writes the files of `feed` in `dir`. Returns the names of the written files
pub fn export_dir<S>(
    exporter: Exporter,
    store: &S,
    feed: FeedId,
    dir: &Path,
) -> Result<Vec<&'static str>, Error>
where
    S: RecordStore + ?Sized,
{
    let catalog = catalog()?;
    let mut written = Vec::new();
    for (file_name, schema) in FILES {
        let schema_exporter = exporter.for_schema(catalog, schema)?.file_name(file_name);
        let path = dir.join(file_name);
        let mut buf = Vec::new();
        if schema_exporter.write_txt(store, feed, &mut buf)? {
            std::fs::write(&path, buf)?;
            written.push(file_name);
        }
    }
    info!("{} files written in {}", written.len(), dir.display());
    Ok(written)
}
