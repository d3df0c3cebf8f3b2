#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Atlas facade: memoized record sets, queries, and lookups.
pub mod atlas;
/// Expiring, type-erased memo cache.
pub mod cache;
/// Ordered record sets and their builder.
pub mod collection;
/// Atlas configuration types.
pub mod config;
/// Centralized constants used across schema, loading, and caching.
pub mod constants;
/// Country, language, currency, region, and sub-region records.
pub mod entities;
/// Reusable example runners shared by demos.
pub mod example_apps;
/// Filter operators, filter chains, and identifier search.
pub mod filter;
mod hash;
/// Record trait, field storage, and projections.
pub mod record;
/// Field declarations and derived entity maps.
pub mod schema;
/// Resource documents and record loaders.
pub mod source;
/// Input transports used by loaders (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Dynamic field values and semantic types.
pub mod value;

mod errors;

pub use atlas::{Atlas, DatasetRecord};
pub use cache::MemoCache;
pub use collection::{CollectionMutator, RecordSet};
pub use config::{AtlasConfig, ResourceLocation};
pub use entities::{Country, Currency, Language, Region, SubRegion};
pub use errors::AtlasError;
pub use filter::{Filter, FilterEngine, Operator};
pub use record::{FieldValues, Fields, Projection, Record, RecordAccessor};
pub use schema::{EntityMap, FieldDecl, FieldMeta, MapAttr};
pub use types::{
    CacheKey, FieldName, Identifier, RawEntry, RecordKind, ResourceName, SourceKey,
};
pub use value::{SemanticType, Value};
