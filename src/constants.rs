/// Constants used by field metadata blocks and semantic type names.
pub mod schema {
    /// Metadata attribute naming the raw source key.
    pub const MAP_ATTR_SOURCE: &str = "source";
    /// Metadata attribute overriding the declared value type.
    pub const MAP_ATTR_TYPE: &str = "type";
    /// Metadata attribute flagging a natural-key field.
    pub const MAP_ATTR_IS_IDENTIFIER: &str = "isIdentifier";
    /// Metadata attribute flagging a field that raw data must provide.
    pub const MAP_ATTR_IS_REQUIRED: &str = "isRequired";
    /// Attributes every metadata block must end up with, in report order.
    pub const REQUIRED_MAP_ATTRS: [&str; 3] =
        [MAP_ATTR_SOURCE, MAP_ATTR_IS_IDENTIFIER, MAP_ATTR_IS_REQUIRED];

    /// Semantic type name for booleans.
    pub const TYPE_BOOLEAN: &str = "boolean";
    /// Semantic type name for 64-bit integers.
    pub const TYPE_INTEGER: &str = "integer";
    /// Semantic type name for floating point numbers.
    pub const TYPE_DOUBLE: &str = "double";
    /// Semantic type name for strings.
    pub const TYPE_STRING: &str = "string";
    /// Semantic type name for arrays.
    pub const TYPE_ARRAY: &str = "array";

    /// Declared type aliases normalized before validation.
    pub const TYPE_ALIASES: [(&str, &str); 3] = [
        ("bool", TYPE_BOOLEAN),
        ("int", TYPE_INTEGER),
        ("float", TYPE_DOUBLE),
    ];

    /// Cache tag for derived entity maps.
    pub const ENTITY_MAP_CACHE_TAG: &str = "EntityMap";
}

/// Constants used by resource loading and flattening.
pub mod resources {
    /// Separator joining nested object keys into flat source keys.
    pub const COMPOUND_KEY_DELIMITER: &str = "_";
    /// Country resource file.
    pub const COUNTRY_RESOURCE: &str = "country.json";
    /// Language resource file.
    pub const LANGUAGE_RESOURCE: &str = "language.json";
    /// Currency resource file.
    pub const CURRENCY_RESOURCE: &str = "currency.json";
    /// Region and sub-region resource file.
    pub const REGION_RESOURCE: &str = "region.json";
    /// Top-level key holding the region list in `region.json`.
    pub const REGIONS_KEY: &str = "regions";
    /// Key holding a region's sub-region list.
    pub const SUB_REGIONS_KEY: &str = "subRegions";
    /// Raw key injected into sub-region entries with the parent region code.
    pub const PARENT_REGION_KEY: &str = "regionCode";
    /// Key naming the language inside a country's language usage entry.
    pub const LANGUAGE_CODE_KEY: &str = "languageCode";
    /// Environment variable consulted by the CLI for a resource directory.
    pub const RESOURCES_DIR_ENV: &str = "GEOATLAS_RESOURCES_DIR";
}

/// Constants used by the memo cache.
pub mod cache {
    use std::time::Duration;

    /// Default lifetime of memoized record sets (one day).
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);
    /// Cache tag for loaded record sets.
    pub const RECORD_SET_CACHE_TAG: &str = "RecordSet";
}
