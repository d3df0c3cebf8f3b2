use indexmap::IndexMap;

use crate::value::Value;

/// Name of a declared record field.
/// Examples: `alpha3Code`, `population`, `altNames`
pub type FieldName = &'static str;
/// Flattened key looked up in a raw source entry.
/// Examples: `iso3166_codes_alpha3`, `extra_population`, `name_alt`
pub type SourceKey = &'static str;
/// Record type label used in maps, errors, and cache keys.
/// Examples: `Country`, `SubRegion`
pub type RecordKind = &'static str;
/// Natural key accepted by identifier lookups.
/// Examples: `DNK`, `denmark`, `Kingdom of Denmark`
pub type Identifier = String;
/// Name of a bundled resource file.
/// Examples: `country.json`, `region.json`
pub type ResourceName = &'static str;
/// Memo cache key derived from a type tag and its construction arguments.
pub type CacheKey = u64;
/// One flattened source entry handed to `RecordAccessor::build_from_raw`.
/// Example: `{"name_short": "Denmark", "iso3166_codes_alpha3": "DNK", ...}`
pub type RawEntry = IndexMap<String, Value>;
