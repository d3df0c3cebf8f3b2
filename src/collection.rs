use std::fmt;
use std::sync::Arc;

use crate::errors::AtlasError;
use crate::filter::{Filter, FilterEngine, Operator, find_by_identifier};
use crate::record::{Fields, Projection, Record};
use crate::schema::EntityMap;
use crate::value::Value;

/// Ordered records of one type.
///
/// Records are shared behind `Arc`, so cloning a set or narrowing it with a
/// filter never copies record data. There is no public append; sets are
/// populated through a `CollectionMutator`.
#[derive(Clone, Debug)]
pub struct RecordSet<R: Record> {
    map: Arc<EntityMap>,
    records: Vec<Arc<R>>,
}

impl<R: Record> RecordSet<R> {
    /// Empty set for the record type described by `map`.
    pub fn empty(map: Arc<EntityMap>) -> Self {
        Self {
            map,
            records: Vec::new(),
        }
    }

    /// Entity map of the record type.
    pub fn entity_map(&self) -> &Arc<EntityMap> {
        &self.map
    }

    /// Record type label.
    pub fn kind(&self) -> &'static str {
        R::KIND
    }

    /// Record at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&Arc<R>> {
        self.records.get(index)
    }

    /// First record, if any.
    pub fn first(&self) -> Option<&Arc<R>> {
        self.records.first()
    }

    /// Every record in insertion order.
    pub fn all(&self) -> &[Arc<R>] {
        &self.records
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<R>> {
        self.records.iter()
    }

    /// Number of records.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// True when the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Project every record onto `fields`, in set order.
    pub fn select<'a>(&self, fields: impl Into<Fields<'a>>) -> Result<Vec<Projection>, AtlasError> {
        let fields = fields.into();
        self.records
            .iter()
            .map(|record| record.select(fields.clone()))
            .collect()
    }

    /// Narrow to records whose `field` satisfies `operator` against `value`.
    pub fn filter(
        &self,
        field: &str,
        value: impl Into<Value>,
        operator: Operator,
    ) -> Result<RecordSet<R>, AtlasError> {
        let mut engine = FilterEngine::new(self.clone());
        engine.apply_filter(field, value, operator)?;
        Ok(engine.into_current())
    }

    /// Apply `filters` one after another; an empty list returns this set.
    pub fn multi_filter(&self, filters: &[Filter]) -> Result<RecordSet<R>, AtlasError> {
        let mut engine = FilterEngine::new(self.clone());
        engine.apply_filters(filters)?;
        Ok(engine.into_current())
    }

    /// First record matching `identifier` on any identifier field, ignoring case.
    pub fn find(&self, identifier: &str) -> Option<&Arc<R>> {
        find_by_identifier(self, identifier)
    }
}

impl<'s, R: Record> IntoIterator for &'s RecordSet<R> {
    type Item = &'s Arc<R>;
    type IntoIter = std::slice::Iter<'s, Arc<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<R: Record> fmt::Display for RecordSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.select(Fields::All).map_err(|_| fmt::Error)?;
        let json = serde_json::to_string_pretty(&rows).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Append capability for a `RecordSet` under construction.
///
/// Loaders and the filter engine own a mutator while they populate a set and
/// hand out the finished set with `finish`.
#[derive(Debug)]
pub struct CollectionMutator<R: Record> {
    set: RecordSet<R>,
}

impl<R: Record> CollectionMutator<R> {
    /// Start an empty set for the record type described by `map`.
    pub fn new(map: Arc<EntityMap>) -> Self {
        Self {
            set: RecordSet::empty(map),
        }
    }

    /// Continue appending to an existing set.
    pub fn wrap(set: RecordSet<R>) -> Self {
        Self { set }
    }

    /// Append one record at the end.
    pub fn append(&mut self, record: impl Into<Arc<R>>) -> &mut Self {
        self.set.records.push(record.into());
        self
    }

    /// Append records at the end, keeping their order.
    pub fn append_all<I>(&mut self, records: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<R>>,
    {
        self.set.records.extend(records.into_iter().map(Into::into));
        self
    }

    /// Records appended so far.
    pub fn len(&self) -> usize {
        self.set.count()
    }

    /// True when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Hand out the populated set.
    pub fn finish(self) -> RecordSet<R> {
        self.set
    }
}
