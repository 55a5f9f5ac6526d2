//! In-memory record store
use rustc_hash::FxHashMap;

use crate::error::StoreError;
use crate::store::{Fields, Record, RecordStore};
use crate::value::{FeedId, RecordId, Value};

/// A [RecordStore] keeping everything in memory
///
/// Records are partitioned by schema and feed. `get_or_create` scans the partition, so it is
/// linear in the number of records of that schema in that feed.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<Record>,
    partitions: FxHashMap<(String, FeedId), Vec<usize>>,
}

impl MemoryStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Is the store empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All the records of a schema in a feed, in creation order
    pub fn records(&self, schema: &str, feed: FeedId) -> Vec<&Record> {
        self.partition(schema, feed)
            .iter()
            .map(|i| &self.records[*i])
            .collect()
    }

    /// First record of a schema in a feed with `field` equal to `value`
    pub fn find(&self, schema: &str, feed: FeedId, field: &str, value: &Value) -> Option<&Record> {
        self.partition(schema, feed)
            .iter()
            .map(|i| &self.records[*i])
            .find(|r| r.get(field) == Some(value))
    }

    fn partition(&self, schema: &str, feed: FeedId) -> &[usize] {
        self.partitions
            .get(&(schema.to_owned(), feed))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn record_mut(&mut self, id: RecordId) -> Result<&mut Record, StoreError> {
        self.records
            .get_mut(id.0 as usize)
            .ok_or(StoreError::UnknownRecord(id))
    }
}

impl RecordStore for MemoryStore {
    fn create(&mut self, schema: &str, feed: FeedId, fields: Fields) -> Result<RecordId, StoreError> {
        let idx = self.records.len();
        let id = RecordId(idx as u64);
        self.records.push(Record {
            id,
            schema: schema.to_owned(),
            feed,
            values: fields,
            relations: Default::default(),
        });
        self.partitions
            .entry((schema.to_owned(), feed))
            .or_default()
            .push(idx);
        Ok(id)
    }

    fn get_or_create(
        &mut self,
        schema: &str,
        feed: FeedId,
        fields: Fields,
        mut defaults: Fields,
    ) -> Result<(RecordId, bool), StoreError> {
        let existing = self
            .partition(schema, feed)
            .iter()
            .map(|i| &self.records[*i])
            .find(|r| fields.iter().all(|(k, v)| r.get(k) == Some(v)))
            .map(|r| r.id);
        match existing {
            Some(id) => Ok((id, false)),
            None => {
                defaults.extend(fields);
                self.create(schema, feed, defaults).map(|id| (id, true))
            }
        }
    }

    fn get(&self, id: RecordId) -> Result<Record, StoreError> {
        self.records
            .get(id.0 as usize)
            .cloned()
            .ok_or(StoreError::UnknownRecord(id))
    }

    fn filter(
        &self,
        schema: &str,
        feed: FeedId,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .partition(schema, feed)
            .iter()
            .map(|i| &self.records[*i])
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn exists(
        &self,
        schema: &str,
        feed: FeedId,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> Result<bool, StoreError> {
        Ok(self
            .partition(schema, feed)
            .iter()
            .any(|i| predicate(&self.records[*i])))
    }

    fn add_relation(
        &mut self,
        record: RecordId,
        field: &str,
        related: RecordId,
    ) -> Result<bool, StoreError> {
        if related.0 as usize >= self.records.len() {
            return Err(StoreError::UnknownRecord(related));
        }
        let record = self.record_mut(record)?;
        Ok(record
            .relations
            .entry(field.to_owned())
            .or_default()
            .insert(related))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::text(*v)))
            .collect()
    }

    #[test]
    fn get_or_create_matches_subset() {
        let mut store = MemoryStore::new();
        let feed = FeedId(1);
        let zone = store
            .create("zone", feed, fields(&[("zone_id", "Z1"), ("name", "Center")]))
            .unwrap();
        let (found, created) = store
            .get_or_create("zone", feed, fields(&[("zone_id", "Z1")]), Fields::new())
            .unwrap();
        assert_eq!(zone, found);
        assert!(!created);

        let (other, created) = store
            .get_or_create(
                "zone",
                FeedId(2),
                fields(&[("zone_id", "Z1")]),
                fields(&[("zone_id", "ignored"), ("name", "")]),
            )
            .unwrap();
        assert_ne!(zone, other);
        assert!(created);
        assert_eq!(2, store.len());
        let other = store.get(other).unwrap();
        assert_eq!(Some(&Value::text("Z1")), other.get("zone_id"));
        assert_eq!(Some(&Value::text("")), other.get("name"));
    }

    #[test]
    fn relations_are_sets() {
        let mut store = MemoryStore::new();
        let feed = FeedId(1);
        let trip = store.create("trip", feed, fields(&[("trip_id", "T1")])).unwrap();
        let service = store
            .create("service", feed, fields(&[("service_id", "WE")]))
            .unwrap();
        assert!(store.add_relation(trip, "services", service).unwrap());
        assert!(!store.add_relation(trip, "services", service).unwrap());
        let trip = store.get(trip).unwrap();
        assert_eq!(vec![service], trip.related("services").collect::<Vec<_>>());
        assert_eq!(
            Err(StoreError::UnknownRecord(RecordId(42))),
            store.add_relation(trip.id, "services", RecordId(42))
        );
    }

    #[test]
    fn filter_and_exists() {
        let mut store = MemoryStore::new();
        let feed = FeedId(1);
        store.create("stop", feed, fields(&[("stop_id", "S1")])).unwrap();
        store.create("stop", feed, fields(&[("stop_id", "S2")])).unwrap();
        let s2 = Value::text("S2");
        let found = store
            .filter("stop", feed, &|r| r.get("stop_id") == Some(&s2))
            .unwrap();
        assert_eq!(1, found.len());
        assert!(store.exists("stop", feed, &|_| true).unwrap());
        assert!(!store.exists("stop", FeedId(3), &|_| true).unwrap());
        assert!(store.find("stop", feed, "stop_id", &s2).is_some());
    }
}
