//! Boundary with the storage layer
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::value::{FeedId, RecordId, Value};

/// Field values of a record, by field name
pub type Fields = BTreeMap<String, Value>;

/// An instance of a schema, owned by a [RecordStore]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Technical identifier, never written in GTFS files
    pub id: RecordId,
    /// Name of the schema of the record
    pub schema: String,
    /// Feed the record belongs to
    pub feed: FeedId,
    /// Single-valued fields
    pub values: Fields,
    /// Members of the many relations, by field name
    pub relations: BTreeMap<String, BTreeSet<RecordId>>,
}

impl Record {
    /// Value of a single-valued field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Members of a many relation. Empty if the relation was never set
    pub fn related(&self, field: &str) -> impl Iterator<Item = RecordId> + '_ {
        self.relations.get(field).into_iter().flatten().copied()
    }
}

/// Operations the pipelines need from the storage layer.
///
/// Every operation is scoped to one schema (by name) and one feed.
/// Implementations are free to enforce the uniqueness of `get_or_create` with their own constraints;
/// the pipelines never retry a failed call.
pub trait RecordStore {
    /// Creates a record, even if an identical one exists
    fn create(&mut self, schema: &str, feed: FeedId, fields: Fields) -> Result<RecordId, StoreError>;

    /// Idempotent upsert: returns the first record whose values contain all `fields`,
    /// or creates one with `defaults` completed by `fields`. The boolean is true when the record was created
    fn get_or_create(
        &mut self,
        schema: &str,
        feed: FeedId,
        fields: Fields,
        defaults: Fields,
    ) -> Result<(RecordId, bool), StoreError>;

    /// A record by identifier
    fn get(&self, id: RecordId) -> Result<Record, StoreError>;

    /// All the records of `schema` in `feed` matching `predicate`, in creation order
    fn filter(
        &self,
        schema: &str,
        feed: FeedId,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> Result<Vec<Record>, StoreError>;

    /// Is there at least one record of `schema` in `feed` matching `predicate`
    fn exists(
        &self,
        schema: &str,
        feed: FeedId,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> Result<bool, StoreError> {
        self.filter(schema, feed, predicate).map(|r| !r.is_empty())
    }

    /// Adds `related` to the many relation `field` of `record`.
    ///
    /// Adding a member twice is a no-op; returns false in that case
    fn add_relation(
        &mut self,
        record: RecordId,
        field: &str,
        related: RecordId,
    ) -> Result<bool, StoreError>;
}
