//! Record trait, per-record field storage, and name-based field access.
//!
//! Ownership model:
//! - Every record type stores its declared fields in a `FieldValues`, which
//!   also keeps the shared `EntityMap` the record was built against.
//! - `RecordAccessor<R>` is the only construction path for loaded data and
//!   enforces the required-field contract of the entity map.
//! - `Record::select` projects a record into a single value or an ordered row.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::MemoCache;
use crate::errors::AtlasError;
use crate::schema::{EntityMap, FieldDecl, entity_map};
use crate::types::{FieldName, RawEntry, RecordKind};
use crate::value::{SemanticType, Value};

/// A typed record whose fields are declared by a static schema table.
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    /// Record type label (`Country`, `Language`, ...).
    const KIND: RecordKind;

    /// Static field declarations, mapped and unmapped.
    fn declarations() -> &'static [FieldDecl];

    /// Wrap fully populated field storage into a record.
    fn from_values(values: FieldValues) -> Self;

    /// Field storage backing this record.
    fn field_values(&self) -> &FieldValues;

    /// Mutable field storage backing this record.
    fn field_values_mut(&mut self) -> &mut FieldValues;

    /// Current value of a declared field.
    fn value(&self, field: &str) -> Result<&Value, AtlasError> {
        self.field_values().value(field)
    }

    /// Mapped field values in entity map order.
    fn values(&self) -> IndexMap<FieldName, Value> {
        self.field_values().mapped_values()
    }

    /// Project this record onto `fields`.
    ///
    /// `Fields::All` yields the full row, `Fields::One` a single value, and
    /// `Fields::Many` a row restricted to the named fields in the requested
    /// order. Unknown names fail with `UnknownField` listing both the missing
    /// and the available mapped names.
    fn select<'a>(&self, fields: impl Into<Fields<'a>>) -> Result<Projection, AtlasError> {
        let storage = self.field_values();
        let map = storage.entity_map();
        match fields.into() {
            Fields::All => Ok(Projection::Row(storage.mapped_values())),
            Fields::Many(names) if names.is_empty() => Ok(Projection::Row(storage.mapped_values())),
            Fields::One(name) => {
                let meta = map.get(name).ok_or_else(|| unknown_fields(map, vec![name]))?;
                Ok(Projection::Value(storage.get(meta.name).cloned().unwrap_or_default()))
            }
            Fields::Many(names) => {
                let missing: Vec<&str> = names
                    .iter()
                    .copied()
                    .filter(|name| !map.contains(name))
                    .collect();
                if !missing.is_empty() {
                    return Err(unknown_fields(map, missing));
                }
                let mut row = IndexMap::with_capacity(names.len());
                for name in names {
                    let meta = map.meta(name)?;
                    row.insert(meta.name, storage.get(meta.name).cloned().unwrap_or_default());
                }
                Ok(Projection::Row(row))
            }
        }
    }

    /// Mapped field values as a JSON object.
    fn to_json(&self) -> Result<serde_json::Value, AtlasError> {
        Ok(serde_json::to_value(self.values())?)
    }
}

fn unknown_fields(map: &EntityMap, missing: Vec<&str>) -> AtlasError {
    AtlasError::UnknownField {
        kind: map.kind(),
        missing: missing.into_iter().map(str::to_string).collect(),
        available: map.field_names(),
    }
}

/// Field selection accepted by `select`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Fields<'a> {
    /// Every mapped field.
    #[default]
    All,
    /// A single field, projected as a bare value.
    One(&'a str),
    /// A subset of fields, projected as a row; empty means `All`.
    Many(Vec<&'a str>),
}

impl<'a> From<&'a str> for Fields<'a> {
    fn from(name: &'a str) -> Self {
        Fields::One(name)
    }
}

impl<'a> From<Vec<&'a str>> for Fields<'a> {
    fn from(names: Vec<&'a str>) -> Self {
        Fields::Many(names)
    }
}

impl<'a> From<&[&'a str]> for Fields<'a> {
    fn from(names: &[&'a str]) -> Self {
        Fields::Many(names.to_vec())
    }
}

impl<'a, const N: usize> From<[&'a str; N]> for Fields<'a> {
    fn from(names: [&'a str; N]) -> Self {
        Fields::Many(names.to_vec())
    }
}

/// Result of projecting one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Projection {
    /// Single field value.
    Value(Value),
    /// Ordered field name to value row.
    Row(IndexMap<FieldName, Value>),
}

impl Projection {
    /// The projected value when a single field was selected.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Projection::Value(value) => Some(value),
            Projection::Row(_) => None,
        }
    }

    /// The projected row when several (or all) fields were selected.
    pub fn as_row(&self) -> Option<&IndexMap<FieldName, Value>> {
        match self {
            Projection::Row(row) => Some(row),
            Projection::Value(_) => None,
        }
    }
}

/// Values for every declared field of one record.
///
/// Array fields start as an empty array and every other field as `Null`.
/// Stores are type-checked against the field's semantic type.
#[derive(Clone, Debug)]
pub struct FieldValues {
    map: Arc<EntityMap>,
    declarations: &'static [FieldDecl],
    values: IndexMap<FieldName, Value>,
}

impl FieldValues {
    /// Default-initialized storage for a record type.
    pub fn new(map: Arc<EntityMap>, declarations: &'static [FieldDecl]) -> Self {
        let values = declarations
            .iter()
            .map(|decl| {
                let semantic_type = map
                    .get(decl.name)
                    .map(|meta| meta.semantic_type)
                    .or_else(|| decl.declared_semantic_type());
                let default = match semantic_type {
                    Some(SemanticType::Array) => Value::Array(Vec::new()),
                    _ => Value::Null,
                };
                (decl.name, default)
            })
            .collect();
        Self {
            map,
            declarations,
            values,
        }
    }

    /// Entity map the record was built against.
    pub fn entity_map(&self) -> &Arc<EntityMap> {
        &self.map
    }

    /// Record type label.
    pub fn kind(&self) -> RecordKind {
        self.map.kind()
    }

    /// Current value of `field`, if declared.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Current value of `field`; undeclared names fail with `UnknownField`.
    pub fn value(&self, field: &str) -> Result<&Value, AtlasError> {
        self.values
            .get(field)
            .ok_or_else(|| self.unknown_declared(field))
    }

    /// Store `value` into a declared field.
    ///
    /// `Null` is accepted everywhere and integers are widened into `double`
    /// fields; any other type mismatch fails with `FieldTypeMismatch`.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), AtlasError> {
        let decl = self
            .declarations
            .iter()
            .find(|decl| decl.name == field)
            .ok_or_else(|| self.unknown_declared(field))?;
        let expected = self
            .map
            .get(decl.name)
            .map(|meta| meta.semantic_type)
            .or_else(|| decl.declared_semantic_type());
        let value = coerce(self.map.kind(), decl.name, expected, value.into())?;
        self.values.insert(decl.name, value);
        Ok(())
    }

    /// Mapped field values in entity map order.
    pub fn mapped_values(&self) -> IndexMap<FieldName, Value> {
        self.map
            .iter()
            .map(|meta| {
                let value = self.values.get(meta.name).cloned().unwrap_or_default();
                (meta.name, value)
            })
            .collect()
    }

    /// Declared field names, mapped or not.
    pub fn declared_names(&self) -> Vec<FieldName> {
        self.declarations.iter().map(|decl| decl.name).collect()
    }

    /// String value of `field`.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Boolean value of `field`.
    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Integer value of `field`.
    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Double value of `field`.
    pub fn double(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    /// Array items of `field`; empty when unset.
    pub fn array(&self, field: &str) -> &[Value] {
        self.get(field).and_then(Value::as_array).unwrap_or(&[])
    }

    /// String items of an array field, skipping non-strings.
    pub fn strings(&self, field: &str) -> Vec<&str> {
        self.array(field).iter().filter_map(Value::as_str).collect()
    }

    fn unknown_declared(&self, field: &str) -> AtlasError {
        AtlasError::UnknownField {
            kind: self.map.kind(),
            missing: vec![field.to_string()],
            available: self.declared_names(),
        }
    }
}

fn coerce(
    kind: RecordKind,
    field: FieldName,
    expected: Option<SemanticType>,
    value: Value,
) -> Result<Value, AtlasError> {
    let Some(expected) = expected else {
        return Ok(value);
    };
    match (expected, value) {
        (_, Value::Null) => Ok(Value::Null),
        (SemanticType::Double, Value::Integer(integer)) => Ok(Value::Double(integer as f64)),
        (expected, value) if value.semantic_type() == Some(expected) => Ok(value),
        (expected, value) => Err(AtlasError::FieldTypeMismatch {
            kind,
            field,
            expected,
            found: value.type_name(),
        }),
    }
}

/// Name-based access to the mapped fields of record type `R`.
#[derive(Clone, Debug)]
pub struct RecordAccessor<R: Record> {
    map: Arc<EntityMap>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordAccessor<R> {
    /// Accessor over an already derived entity map.
    pub fn new(map: Arc<EntityMap>) -> Self {
        Self {
            map,
            _record: PhantomData,
        }
    }

    /// Accessor over the memoized entity map of `R`.
    pub fn from_cache(cache: &MemoCache) -> Result<Self, AtlasError> {
        Ok(Self::new(entity_map::<R>(cache)?))
    }

    /// Entity map used by this accessor.
    pub fn entity_map(&self) -> &Arc<EntityMap> {
        &self.map
    }

    /// Value of a declared field of `record`.
    pub fn get_value<'r>(&self, record: &'r R, field: &str) -> Result<&'r Value, AtlasError> {
        record.field_values().value(field)
    }

    /// Overwrite a declared field of `record` in place.
    pub fn set_value(
        &self,
        record: &mut R,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), AtlasError> {
        record.field_values_mut().set(field, value)
    }

    /// Mapped field values of `record` in entity map order.
    pub fn all_values(&self, record: &R) -> IndexMap<FieldName, Value> {
        record.field_values().mapped_values()
    }

    /// Build a record from one flattened raw entry.
    ///
    /// A present source key is copied even when its value is `null`. A
    /// missing source key fails with `MissingRequiredField` for required
    /// fields and leaves the default otherwise.
    pub fn build_from_raw(&self, raw: &RawEntry) -> Result<R, AtlasError> {
        let mut values = FieldValues::new(Arc::clone(&self.map), R::declarations());
        for meta in self.map.iter() {
            match raw.get(meta.source) {
                Some(value) => values.set(meta.name, value.clone())?,
                None if meta.is_required => {
                    return Err(AtlasError::MissingRequiredField {
                        kind: self.map.kind(),
                        field: meta.name,
                        source_key: meta.source,
                    });
                }
                None => {}
            }
        }
        Ok(R::from_values(values))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small record type shared by unit tests across modules.

    use super::*;
    use crate::schema::MapAttr::{Flag, Text};
    use crate::schema::derive_entity_map;

    #[derive(Clone, Debug)]
    pub(crate) struct Place {
        values: FieldValues,
    }

    const PLACE_FIELDS: &[FieldDecl] = &[
        FieldDecl::mapped(
            "code",
            "string",
            &[
                ("source", Text("codes_alpha3")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(true)),
            ],
        ),
        FieldDecl::mapped(
            "name",
            "string",
            &[
                ("source", Text("name_short")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "altNames",
            "array",
            &[
                ("source", Text("name_alt")),
                ("isIdentifier", Flag(true)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "population",
            "int",
            &[
                ("source", Text("extra_population")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "area",
            "float",
            &[
                ("source", Text("extra_area")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "isIsland",
            "bool",
            &[
                ("source", Text("location_isIsland")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::mapped(
            "borders",
            "array",
            &[
                ("source", Text("location_borders")),
                ("isIdentifier", Flag(false)),
                ("isRequired", Flag(false)),
            ],
        ),
        FieldDecl::unmapped("note", "string"),
    ];

    impl Record for Place {
        const KIND: RecordKind = "Place";

        fn declarations() -> &'static [FieldDecl] {
            PLACE_FIELDS
        }

        fn from_values(values: FieldValues) -> Self {
            Self { values }
        }

        fn field_values(&self) -> &FieldValues {
            &self.values
        }

        fn field_values_mut(&mut self) -> &mut FieldValues {
            &mut self.values
        }
    }

    pub(crate) fn place_map() -> Arc<EntityMap> {
        Arc::new(derive_entity_map(Place::KIND, PLACE_FIELDS).expect("valid fixture schema"))
    }

    pub(crate) fn place(code: &str, name: &str, population: i64, borders: &[&str]) -> Place {
        let raw: RawEntry = [
            ("codes_alpha3".to_string(), Value::from(code)),
            ("name_short".to_string(), Value::from(name)),
            ("extra_population".to_string(), Value::from(population)),
            ("location_borders".to_string(), Value::from(borders.to_vec())),
        ]
        .into_iter()
        .collect();
        RecordAccessor::<Place>::new(place_map())
            .build_from_raw(&raw)
            .expect("fixture builds")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{Place, place, place_map};
    use super::*;

    fn raw(entries: &[(&str, Value)]) -> RawEntry {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn build_copies_present_sources_and_defaults_the_rest() {
        let accessor = RecordAccessor::<Place>::new(place_map());
        let record = accessor
            .build_from_raw(&raw(&[
                ("codes_alpha3", Value::from("DNK")),
                ("name_short", Value::Null),
                ("extra_area", Value::from(43094)),
            ]))
            .unwrap();
        assert_eq!(accessor.get_value(&record, "code").unwrap(), &Value::from("DNK"));
        assert_eq!(accessor.get_value(&record, "name").unwrap(), &Value::Null);
        assert_eq!(accessor.get_value(&record, "area").unwrap(), &Value::Double(43094.0));
        assert_eq!(accessor.get_value(&record, "borders").unwrap(), &Value::Array(vec![]));
        assert_eq!(accessor.get_value(&record, "note").unwrap(), &Value::Null);
    }

    #[test]
    fn missing_required_source_fails_the_build() {
        let accessor = RecordAccessor::<Place>::new(place_map());
        let err = accessor
            .build_from_raw(&raw(&[("name_short", Value::from("Denmark"))]))
            .unwrap_err();
        match err {
            AtlasError::MissingRequiredField {
                kind,
                field,
                source_key,
            } => {
                assert_eq!((kind, field, source_key), ("Place", "code", "codes_alpha3"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn mistyped_raw_value_is_rejected() {
        let accessor = RecordAccessor::<Place>::new(place_map());
        let err = accessor
            .build_from_raw(&raw(&[
                ("codes_alpha3", Value::from("DNK")),
                ("extra_population", Value::from("many")),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            AtlasError::FieldTypeMismatch {
                field: "population",
                expected: SemanticType::Integer,
                found: "string",
                ..
            }
        ));
    }

    #[test]
    fn set_value_mutates_in_place_and_checks_names() {
        let accessor = RecordAccessor::<Place>::new(place_map());
        let mut record = place("DNK", "Denmark", 5_593_790, &["DEU"]);
        accessor.set_value(&mut record, "population", 6_000_000).unwrap();
        accessor.set_value(&mut record, "note", "edited").unwrap();
        assert_eq!(record.field_values().integer("population"), Some(6_000_000));
        assert_eq!(record.field_values().str("note"), Some("edited"));

        let err = accessor.set_value(&mut record, "capital", "Copenhagen").unwrap_err();
        assert!(err.to_string().contains("note"), "{err}");
        assert!(accessor.get_value(&record, "capital").is_err());
    }

    #[test]
    fn all_values_follow_map_order_and_skip_unmapped() {
        let record = place("DNK", "Denmark", 5_593_790, &["DEU"]);
        let accessor = RecordAccessor::<Place>::new(place_map());
        let names: Vec<_> = accessor.all_values(&record).keys().copied().collect();
        assert_eq!(
            names,
            vec!["code", "name", "altNames", "population", "area", "isIsland", "borders"]
        );
    }

    #[test]
    fn select_projects_value_row_and_subset() {
        let record = place("DNK", "Denmark", 5_593_790, &["DEU"]);
        assert_eq!(
            record.select("population").unwrap(),
            Projection::Value(Value::Integer(5_593_790))
        );

        let row = record.select(["population", "code"]).unwrap();
        let keys: Vec<_> = row.as_row().unwrap().keys().copied().collect();
        assert_eq!(keys, vec!["population", "code"]);

        let everything = record.select(Fields::Many(Vec::new())).unwrap();
        assert_eq!(everything, record.select(Fields::All).unwrap());
    }

    #[test]
    fn select_reports_missing_and_available_fields() {
        let record = place("DNK", "Denmark", 5_593_790, &["DEU"]);
        let err = record.select(["population", "unknownField"]).unwrap_err();
        match &err {
            AtlasError::UnknownField {
                missing, available, ..
            } => {
                assert_eq!(missing, &vec!["unknownField".to_string()]);
                assert!(available.contains(&"population"));
                assert!(available.contains(&"borders"));
                assert!(!available.contains(&"note"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(record.select("note").is_err());
    }

    #[test]
    fn to_json_renders_mapped_fields() {
        let record = place("DNK", "Denmark", 5_593_790, &["DEU"]);
        let json = record.to_json().unwrap();
        assert_eq!(json["code"], "DNK");
        assert_eq!(json["borders"], serde_json::json!(["DEU"]));
        assert!(json.get("note").is_none());
    }
}
