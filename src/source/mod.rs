//! Resource documents and the loaders that turn them into record sets.
//!
//! Ownership model:
//! - `Resources` resolves a resource name to document text, either from the
//!   copies compiled into the crate or from a `ResourceDir`.
//! - A `RecordLoader` knows which document holds its record type and how to
//!   split the decoded document into flattened raw entries.
//! - `load` drives one loader end to end and returns a populated `RecordSet`.

use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::debug;

use crate::cache::MemoCache;
use crate::collection::{CollectionMutator, RecordSet};
use crate::config::ResourceLocation;
use crate::constants::resources::{
    COMPOUND_KEY_DELIMITER, COUNTRY_RESOURCE, CURRENCY_RESOURCE, LANGUAGE_RESOURCE,
    REGION_RESOURCE,
};
use crate::errors::AtlasError;
use crate::record::{Record, RecordAccessor};
use crate::transport::ResourceDir;
use crate::types::{RawEntry, ResourceName};
use crate::value::Value;

/// Built-in loaders for the bundled record types.
pub mod loaders;

pub use loaders::{ListLoader, RegionLoader, SubRegionLoader};

/// Splits one decoded resource document into raw entries for a record type.
pub trait RecordLoader {
    /// Record type produced from the entries.
    type Record: Record;

    /// Resource document holding the entries.
    fn resource_name(&self) -> ResourceName;

    /// Flattened raw entries, in document order.
    fn raw_entries(&self, document: JsonValue) -> Result<Vec<RawEntry>, AtlasError>;
}

/// Resolves resource names to document text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resources {
    /// Documents compiled into the crate.
    Bundled,
    /// Documents read from a directory.
    Directory(ResourceDir),
}

impl Resources {
    /// Reader for a configured location.
    pub fn from_location(location: &ResourceLocation) -> Self {
        match location {
            ResourceLocation::Bundled => Resources::Bundled,
            ResourceLocation::Directory(root) => Resources::Directory(ResourceDir::new(root)),
        }
    }

    /// Text of resource `name`.
    pub fn read(&self, name: ResourceName) -> Result<String, AtlasError> {
        match self {
            Resources::Bundled => bundled(name).map(str::to_string).ok_or_else(|| {
                AtlasError::ResourceUnavailable {
                    name,
                    reason: "no bundled resource with this name".to_string(),
                }
            }),
            Resources::Directory(dir) => dir.read(name),
        }
    }
}

fn bundled(name: ResourceName) -> Option<&'static str> {
    match name {
        COUNTRY_RESOURCE => Some(include_str!("../../resources/country.json")),
        LANGUAGE_RESOURCE => Some(include_str!("../../resources/language.json")),
        CURRENCY_RESOURCE => Some(include_str!("../../resources/currency.json")),
        REGION_RESOURCE => Some(include_str!("../../resources/region.json")),
        _ => None,
    }
}

/// Flatten one decoded object into a raw entry.
///
/// Nested non-empty objects are joined into `parent_child` keys. Arrays,
/// including arrays of objects, stay leaf values; an empty object becomes an
/// empty array.
pub fn flatten_entry(object: Map<String, JsonValue>) -> RawEntry {
    let mut flat = RawEntry::new();
    flatten_into(&mut flat, None, object);
    flat
}

fn flatten_into(flat: &mut RawEntry, prefix: Option<&str>, object: Map<String, JsonValue>) {
    for (key, value) in object {
        let key = match prefix {
            Some(prefix) => format!("{prefix}{COMPOUND_KEY_DELIMITER}{key}"),
            None => key,
        };
        match value {
            JsonValue::Object(nested) if nested.is_empty() => {
                flat.insert(key, Value::Array(Vec::new()));
            }
            JsonValue::Object(nested) => flatten_into(flat, Some(&key), nested),
            leaf => {
                flat.insert(key, Value::from(leaf));
            }
        }
    }
}

/// Decode the loader's resource and build one record per raw entry.
///
/// Any failing entry aborts the whole load.
pub fn load<L: RecordLoader>(
    loader: &L,
    resources: &Resources,
    cache: &MemoCache,
) -> Result<RecordSet<L::Record>, AtlasError> {
    let name = loader.resource_name();
    let text = resources.read(name)?;
    if text.trim().is_empty() {
        return Err(AtlasError::MalformedResource {
            name,
            reason: "document is empty".to_string(),
        });
    }
    let document: JsonValue =
        serde_json::from_str(&text).map_err(|err| AtlasError::MalformedResource {
            name,
            reason: err.to_string(),
        })?;

    let accessor = RecordAccessor::<L::Record>::from_cache(cache)?;
    let mut records = CollectionMutator::new(Arc::clone(accessor.entity_map()));
    for raw in loader.raw_entries(document)? {
        records.append(accessor.build_from_raw(&raw)?);
    }
    debug!(
        "[geoatlas:load] {} {} records from {}",
        records.len(),
        <L::Record as Record>::KIND,
        name
    );
    Ok(records.finish())
}

/// Objects of a JSON array, rejecting any other shape.
pub(crate) fn array_of_objects(
    name: ResourceName,
    value: JsonValue,
) -> Result<Vec<Map<String, JsonValue>>, AtlasError> {
    let items = match value {
        JsonValue::Array(items) => items,
        other => {
            return Err(AtlasError::MalformedResource {
                name,
                reason: format!("expected an array of objects, got {}", json_kind(&other)),
            });
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            JsonValue::Object(object) => Ok(object),
            other => Err(AtlasError::MalformedResource {
                name,
                reason: format!("entry {idx} is {}, expected an object", json_kind(&other)),
            }),
        })
        .collect()
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(object) => object,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn flatten_joins_nested_objects_and_keeps_arrays() {
        let flat = flatten_entry(object(json!({
            "name": {"official": "Kingdom of Denmark", "alt": ["Danmark"]},
            "iso3166": {"codes": {"alpha3": "DNK"}},
            "languages": [{"languageCode": "dan", "usagePercentage": 93}],
            "extra": {},
            "symbol": "kr"
        })));
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "name_official",
                "name_alt",
                "iso3166_codes_alpha3",
                "languages",
                "extra",
                "symbol"
            ]
        );
        assert_eq!(flat["iso3166_codes_alpha3"], Value::from("DNK"));
        assert_eq!(flat["extra"], Value::Array(Vec::new()));
        let languages = flat["languages"].as_array().unwrap();
        assert_eq!(
            languages[0].as_map().unwrap()["languageCode"],
            Value::from("dan")
        );
    }

    #[test]
    fn bundled_resources_resolve_known_names_only() {
        let resources = Resources::from_location(&ResourceLocation::Bundled);
        for name in [
            COUNTRY_RESOURCE,
            LANGUAGE_RESOURCE,
            CURRENCY_RESOURCE,
            REGION_RESOURCE,
        ] {
            let text = resources.read(name).unwrap();
            assert!(serde_json::from_str::<JsonValue>(&text).is_ok(), "{name}");
        }
        assert!(matches!(
            resources.read("planet.json"),
            Err(AtlasError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn array_of_objects_rejects_other_shapes() {
        assert!(array_of_objects("x.json", json!({"a": 1})).is_err());
        assert!(array_of_objects("x.json", json!([{"a": 1}, 2])).is_err());
        assert_eq!(array_of_objects("x.json", json!([{"a": 1}])).unwrap().len(), 1);
    }
}
