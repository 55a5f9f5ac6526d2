use crate::*;
use chrono::NaiveDate;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn catalog() -> Catalog {
    let zone = Schema::builder("zone")
        .field(FieldDescriptor::text("zone_id"))
        .column("zone_id", "zone_id")
        .build()
        .unwrap();
    let stop = Schema::builder("stop")
        .field(FieldDescriptor::text("code"))
        .field(FieldDescriptor::text("name"))
        .field(FieldDescriptor::relation("zone", "zone").null())
        .field(
            FieldDescriptor::boolean("wheelchair_accessible")
                .blank()
                .with_default(false),
        )
        .column("stop_id", "code")
        .column("stop_name", "name")
        .column("zone_id", "zone::zone_id")
        .column("wheelchair_accessible", "wheelchair_accessible")
        .build()
        .unwrap();
    let service = Schema::builder("service")
        .field(FieldDescriptor::text("service_id"))
        .field(FieldDescriptor::date("start_date"))
        .column("service_id", "service_id")
        .column("start_date", "start_date")
        .build()
        .unwrap();
    let trip = Schema::builder("trip")
        .field(FieldDescriptor::text("trip_id"))
        .field(FieldDescriptor::text("headsign").blank())
        .field(FieldDescriptor::many("services", "service").blank())
        .column("trip_id", "trip_id")
        .column("trip_headsign", "headsign")
        .column("service_id", "services::service_id")
        .build()
        .unwrap();
    let stop_time = Schema::builder("stop_time")
        .field(FieldDescriptor::relation("trip", "trip"))
        .field(FieldDescriptor::scalar("stop_sequence"))
        .column("trip_id", "trip::trip_id")
        .column("stop_sequence", "stop_sequence")
        .feed_scope(FeedScope::Inherited)
        .build()
        .unwrap();
    Catalog::from_schemas([zone, stop, service, trip, stop_time]).unwrap()
}

fn import(
    catalog: &Catalog,
    schema: &str,
    txt: &str,
    store: &mut MemoryStore,
    feed: FeedId,
) -> Result<ImportReport, Error> {
    Importer::default()
        .for_schema(catalog, schema)?
        .import_txt(txt.as_bytes(), store, feed)
}

fn export(catalog: &Catalog, schema: &str, store: &MemoryStore, feed: FeedId) -> Option<String> {
    Exporter::default()
        .for_schema(catalog, schema)
        .unwrap()
        .export_txt(store, feed)
        .unwrap()
}

const STOPS: &str = "stop_id,stop_name,zone_id,wheelchair_accessible\nS1,Main St,,0\nS2,Oak Ave,Z1,1\n";

#[test]
fn import_stops() {
    init_logs();
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let report = import(&catalog, "stop", STOPS, &mut store, feed).unwrap();
    assert_eq!(2, report.rows);
    assert_eq!(2, report.created);
    assert_eq!(1, report.related_created);
    assert!(report.skipped.is_empty());

    let s1 = store.find("stop", feed, "code", &Value::text("S1")).unwrap();
    assert_eq!(Some(&Value::Bool(false)), s1.get("wheelchair_accessible"));
    assert_eq!(Some(&Value::Null), s1.get("zone"));
    assert_eq!(Some(&Value::Feed(feed)), s1.get("feed"));

    let s2 = store.find("stop", feed, "code", &Value::text("S2")).unwrap();
    assert_eq!(Some(&Value::Bool(true)), s2.get("wheelchair_accessible"));
    let zone = store
        .get(s2.get("zone").and_then(Value::as_ref_id).unwrap())
        .unwrap();
    assert_eq!("zone", zone.schema);
    assert_eq!(Some(&Value::text("Z1")), zone.get("zone_id"));
    assert_eq!(Some(&Value::Feed(feed)), zone.get("feed"));
}

#[test]
fn existing_related_record_is_reused() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(&catalog, "zone", "zone_id\nZ1\n", &mut store, feed).unwrap();
    let report = import(&catalog, "stop", STOPS, &mut store, feed).unwrap();
    assert_eq!(0, report.related_created);
    assert_eq!(1, store.records("zone", feed).len());

    // zones are scoped by feed
    let report = import(&catalog, "stop", STOPS, &mut store, FeedId(2)).unwrap();
    assert_eq!(1, report.related_created);
    assert_eq!(2, store.records("zone", FeedId(2)).len() + store.records("zone", feed).len());
}

#[test]
fn export_stops() {
    init_logs();
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(&catalog, "stop", STOPS, &mut store, feed).unwrap();
    assert_eq!(
        Some("stop_id,stop_name,zone_id,wheelchair_accessible\nS1,Main St,,\nS2,Oak Ave,Z1,1\n".to_owned()),
        export(&catalog, "stop", &store, feed)
    );

    let crlf = Exporter::default()
        .crlf(true)
        .for_schema(&catalog, "stop")
        .unwrap()
        .export_txt(&store, feed)
        .unwrap();
    assert_eq!(
        Some("stop_id,stop_name,zone_id,wheelchair_accessible\r\nS1,Main St,,\r\nS2,Oak Ave,Z1,1\r\n".to_owned()),
        crlf
    );
}

#[test]
fn referenced_records_are_created_blank() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(&catalog, "trip", "trip_id,service_id\nT1,WE\n", &mut store, feed).unwrap();
    let we = store
        .find("service", feed, "service_id", &Value::text("WE"))
        .unwrap();
    assert_eq!(Some(&Value::Null), we.get("start_date"));
    assert_eq!(
        Some("service_id,start_date\nWE,\n".to_owned()),
        export(&catalog, "service", &store, feed)
    );
}

#[test]
fn unused_optional_column_is_omitted() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(
        &catalog,
        "stop",
        "stop_id,stop_name,zone_id,wheelchair_accessible\nS1,Main St,,1\nS3,Elm St,,\n",
        &mut store,
        feed,
    )
    .unwrap();
    assert_eq!(
        Some("stop_id,stop_name,wheelchair_accessible\nS1,Main St,1\nS3,Elm St,\n".to_owned()),
        export(&catalog, "stop", &store, feed)
    );
}

#[test]
fn missing_columns_take_their_blank_value() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(&catalog, "stop", "stop_id,stop_name\nS1,Main St\n", &mut store, feed).unwrap();
    let s1 = store.find("stop", feed, "code", &Value::text("S1")).unwrap();
    assert_eq!(Some(&Value::Null), s1.get("zone"));
    assert_eq!(Some(&Value::Bool(false)), s1.get("wheelchair_accessible"));
}

#[test]
fn round_trip() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    import(&catalog, "stop", STOPS, &mut store, FeedId(1)).unwrap();
    let exported = export(&catalog, "stop", &store, FeedId(1)).unwrap();
    import(&catalog, "stop", &exported, &mut store, FeedId(2)).unwrap();

    let plain = |feed| {
        store
            .records("stop", feed)
            .into_iter()
            .map(|r| {
                let mut values = r.values.clone();
                values.remove("feed");
                values.remove("zone");
                values
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(plain(FeedId(1)), plain(FeedId(2)));
    assert_eq!(Some(exported), export(&catalog, "stop", &store, FeedId(2)));
}

#[test]
fn many_relation_rows_are_merged() {
    init_logs();
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let report = import(
        &catalog,
        "trip",
        "trip_id,service_id\nT1,WE\nT1,SA\nT2,WE\nT1,WE\n",
        &mut store,
        feed,
    )
    .unwrap();
    assert_eq!(4, report.rows);
    assert_eq!(2, report.created);
    assert_eq!(2, report.merged);
    assert_eq!(2, report.related_created);

    let trips = store.records("trip", feed);
    assert_eq!(2, trips.len());
    assert_eq!(2, trips[0].related("services").count());
    assert_eq!(1, trips[1].related("services").count());
    assert_eq!(2, store.records("service", feed).len());
}

#[test]
fn many_relation_is_exported_one_row_per_member() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let txt = "trip_id,service_id\nT1,WE\nT1,SA\nT2,WE\n";
    import(&catalog, "trip", txt, &mut store, feed).unwrap();
    assert_eq!(Some(txt.to_owned()), export(&catalog, "trip", &store, feed));
}

#[test]
fn empty_many_relation_still_merges() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let report = import(
        &catalog,
        "trip",
        "trip_id,service_id\nT1,\nT1,WE\n",
        &mut store,
        feed,
    )
    .unwrap();
    assert_eq!(1, report.created);
    assert_eq!(1, report.merged);
    assert_eq!(1, store.records("trip", feed)[0].related("services").count());
}

#[test]
fn rows_without_many_relation_are_not_merged() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let report = import(&catalog, "trip", "trip_id\nT1\nT1\n", &mut store, feed).unwrap();
    assert_eq!(2, report.created);
    assert_eq!(2, store.records("trip", feed).len());
}

#[test]
fn unexpected_column() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);

    // empty values in unknown columns are tolerated
    import(&catalog, "stop", "stop_id,stop_name,platform\nS1,Main St,\n", &mut store, feed).unwrap();
    assert_eq!(1, store.len());

    let err = import(
        &catalog,
        "stop",
        "stop_id,stop_name,zone_id,platform\nS3,Elm St,Z9,P1\n",
        &mut store,
        feed,
    )
    .unwrap_err();
    match err {
        Error::UnexpectedColumn {
            column,
            row,
            expected,
        } => {
            assert_eq!("platform", column);
            assert_eq!(Some("S3"), row.get("stop_id"));
            assert_eq!(
                vec!["stop_id", "stop_name", "zone_id", "wheelchair_accessible"],
                expected
            );
        }
        e => panic!("unexpected error {e:?}"),
    }
    // nothing of the row was committed, not even its zone
    assert_eq!(1, store.len());
}

#[test]
fn values_beyond_the_headers() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let txt = "stop_id,stop_name,zone_id,wheelchair_accessible\nS1,Main St,,0,\nS2,Oak Ave,Z1,1,oops\n";
    let err = import(&catalog, "stop", txt, &mut store, FeedId(1)).unwrap_err();
    match err {
        Error::UnexpectedColumn { column, .. } => assert_eq!("<extra value 5>", column),
        e => panic!("unexpected error {e:?}"),
    }
    assert_eq!(1, store.records("stop", FeedId(1)).len());
}

#[test]
fn invalid_rows_are_skipped() {
    init_logs();
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let report = import(
        &catalog,
        "service",
        "service_id,start_date\nWE,20240106\nSA,2024-01-06\nSU,20240107\n",
        &mut store,
        feed,
    )
    .unwrap();
    assert_eq!(3, report.rows);
    assert_eq!(2, report.created);
    assert_eq!(1, report.skipped.len());
    assert_eq!(2, report.skipped[0].line);
    assert_eq!("start_date", report.skipped[0].error.column);
    assert_eq!(Some("SA"), report.skipped[0].row.get("service_id"));

    let we = store
        .find("service", feed, "service_id", &Value::text("WE"))
        .unwrap();
    assert_eq!(
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap())),
        we.get("start_date")
    );
}

#[test]
fn invalid_row_aborts_the_file() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let err = Importer::default()
        .parse_error_policy(ParseErrorPolicy::AbortFile)
        .for_schema(&catalog, "service")
        .unwrap()
        .file_name("calendar.txt")
        .import_txt(
            "service_id,start_date\nWE,20240106\nSA,2024016\nSU,20240107\n".as_bytes(),
            &mut store,
            FeedId(1),
        )
        .unwrap_err();
    match err {
        Error::FieldParse {
            file_name,
            line,
            source,
        } => {
            assert_eq!("calendar.txt", file_name);
            assert_eq!(2, line);
            assert_eq!("2024016", source.value);
        }
        e => panic!("unexpected error {e:?}"),
    }
    assert_eq!(1, store.len());
}

#[test]
fn empty_export_writes_nothing() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    import(&catalog, "stop", STOPS, &mut store, FeedId(1)).unwrap();
    assert_eq!(None, export(&catalog, "stop", &store, FeedId(2)));

    let mut buf = Vec::new();
    let written = Exporter::default()
        .for_schema(&catalog, "trip")
        .unwrap()
        .write_txt(&store, FeedId(1), &mut buf)
        .unwrap();
    assert!(!written);
    assert!(buf.is_empty());
}

#[test]
fn mandatory_field_missing_aborts_the_export() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(&catalog, "stop", STOPS, &mut store, feed).unwrap();
    let mut fields = Fields::new();
    fields.insert("code".to_owned(), Value::text("S9"));
    let id = store.create("stop", feed, fields).unwrap();
    let err = Exporter::default()
        .for_schema(&catalog, "stop")
        .unwrap()
        .export_txt(&store, feed)
        .unwrap_err();
    match err {
        Error::MissingField { record, field, .. } => {
            assert_eq!(id, record);
            assert_eq!("name", field);
        }
        e => panic!("unexpected error {e:?}"),
    }
}

/// A store whose backend is unreachable
struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Backend("connection refused".to_owned())
}

impl RecordStore for UnavailableStore {
    fn create(&mut self, _: &str, _: FeedId, _: Fields) -> Result<RecordId, StoreError> {
        Err(unavailable())
    }

    fn get_or_create(
        &mut self,
        _: &str,
        _: FeedId,
        _: Fields,
        _: Fields,
    ) -> Result<(RecordId, bool), StoreError> {
        Err(unavailable())
    }

    fn get(&self, _: RecordId) -> Result<Record, StoreError> {
        Err(unavailable())
    }

    fn filter(
        &self,
        _: &str,
        _: FeedId,
        _: &dyn Fn(&Record) -> bool,
    ) -> Result<Vec<Record>, StoreError> {
        Err(unavailable())
    }

    fn add_relation(&mut self, _: RecordId, _: &str, _: RecordId) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}

#[test]
fn store_failures_abort_the_file() {
    let catalog = catalog();
    for policy in [ParseErrorPolicy::SkipRow, ParseErrorPolicy::AbortFile] {
        for (schema, txt) in [("stop", STOPS), ("trip", "trip_id,service_id\nT1,WE\n")] {
            let err = Importer::default()
                .parse_error_policy(policy)
                .for_schema(&catalog, schema)
                .unwrap()
                .import_txt(txt.as_bytes(), &mut UnavailableStore, FeedId(1))
                .unwrap_err();
            assert!(
                matches!(err, Error::Store(StoreError::Backend(_))),
                "unexpected error {err:?}"
            );
        }
    }

    let mut buf = Vec::new();
    let err = Exporter::default()
        .for_schema(&catalog, "stop")
        .unwrap()
        .write_txt(&UnavailableStore, FeedId(1), &mut buf)
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::Backend(_))));
    assert!(buf.is_empty());
}

#[test]
fn inherited_feed_scope() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    import(
        &catalog,
        "stop_time",
        "trip_id,stop_sequence\nT1,1\nT1,2\n",
        &mut store,
        feed,
    )
    .unwrap();
    let stop_times = store.records("stop_time", feed);
    assert_eq!(2, stop_times.len());
    assert_eq!(None, stop_times[0].get("feed"));
    assert_eq!(stop_times[0].get("trip"), stop_times[1].get("trip"));
    assert_eq!(Some(&Value::text("2")), stop_times[1].get("stop_sequence"));
    assert_eq!(
        Some("trip_id,stop_sequence\nT1,1\nT1,2\n".to_owned()),
        export(&catalog, "stop_time", &store, feed)
    );
}

#[test]
fn import_prepared_rows() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let rows = vec![
        [("stop_id", "S1"), ("stop_name", "Main St")]
            .into_iter()
            .collect::<Row>(),
        [("stop_name", "Oak Ave"), ("stop_id", "S2"), ("zone_id", "Z1")]
            .into_iter()
            .collect::<Row>(),
    ];
    let report = Importer::default()
        .for_schema(&catalog, "stop")
        .unwrap()
        .import_rows(rows, &mut store, FeedId(1))
        .unwrap();
    assert_eq!(2, report.created);
    assert_eq!(
        Some("stop_id,stop_name,zone_id,wheelchair_accessible\nS1,Main St,,\nS2,Oak Ave,Z1,\n".to_owned()),
        export(&catalog, "stop", &store, FeedId(1))
    );
}

#[test]
fn fixture_feed() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    let feed = FeedId(1);
    let file = std::fs::File::open("fixtures/basic/stops.txt").unwrap();
    let report = Importer::default()
        .for_schema(&catalog, "stop")
        .unwrap()
        .file_name("stops.txt")
        .import_txt(file, &mut store, feed)
        .unwrap();
    assert_eq!(3, report.created);
    let s3 = store.find("stop", feed, "code", &Value::text("S3")).unwrap();
    assert_eq!(Some(&Value::text("Pine St, north")), s3.get("name"));
}

#[test]
fn serialization_deserialization() {
    let catalog = catalog();
    let mut store = MemoryStore::new();
    import(&catalog, "stop", STOPS, &mut store, FeedId(1)).unwrap();
    let records: Vec<Record> = store
        .records("stop", FeedId(1))
        .into_iter()
        .cloned()
        .collect();
    let string = serde_json::to_string(&records).unwrap();
    let parsed: Vec<Record> = serde_json::from_str(&string).unwrap();
    assert_eq!(records, parsed);
}
