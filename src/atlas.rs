use std::sync::Arc;

use crate::cache::{MemoCache, memo_key};
use crate::collection::RecordSet;
use crate::config::AtlasConfig;
use crate::constants::cache::RECORD_SET_CACHE_TAG;
use crate::entities::{Country, Currency, Language, Region, SubRegion};
use crate::errors::AtlasError;
use crate::filter::Filter;
use crate::record::Record;
use crate::schema::{EntityMap, entity_map};
use crate::source::{RecordLoader, Resources, load};

/// Record type that ships with a loader for its resource document.
pub trait DatasetRecord: Record {
    /// Loader producing this record type.
    type Loader: RecordLoader<Record = Self>;

    /// Loader instance used by `Atlas`.
    fn loader() -> Self::Loader;
}

/// Query entry point over the reference dataset.
///
/// Owns the memo cache, so entity maps and decoded record sets are shared by
/// every query made through the same `Atlas` while caching is enabled.
pub struct Atlas {
    config: AtlasConfig,
    resources: Resources,
    cache: MemoCache,
}

impl Default for Atlas {
    fn default() -> Self {
        Self::with_config(AtlasConfig::default())
    }
}

impl Atlas {
    /// Atlas over the bundled resources with default caching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atlas with explicit configuration.
    pub fn with_config(config: AtlasConfig) -> Self {
        let resources = Resources::from_location(&config.resources);
        let cache = MemoCache::new(config.cache_enabled, config.cache_ttl);
        Self {
            config,
            resources,
            cache,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Memo cache owned by this atlas.
    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Entity map of `R`.
    pub fn entity_map<R: Record>(&self) -> Result<Arc<EntityMap>, AtlasError> {
        entity_map::<R>(&self.cache)
    }

    /// Every record of `R`, in document order.
    pub fn records<R: DatasetRecord>(&self) -> Result<RecordSet<R>, AtlasError> {
        let loader = R::loader();
        let key = memo_key(RECORD_SET_CACHE_TAG, &(R::KIND, loader.resource_name()));
        let set = self
            .cache
            .fetch_or_try_insert_with(key, self.cache.default_ttl(), || {
                load(&loader, &self.resources, &self.cache)
            })?;
        Ok((*set).clone())
    }

    /// Records of `R` passing every filter; no filters returns all records.
    pub fn query<R: DatasetRecord>(&self, filters: &[Filter]) -> Result<RecordSet<R>, AtlasError> {
        let all = self.records::<R>()?;
        if filters.is_empty() {
            return Ok(all);
        }
        all.multi_filter(filters)
    }

    /// First record of `R` matching `identifier` on any identifier field.
    pub fn lookup<R: DatasetRecord>(&self, identifier: &str) -> Result<Option<Arc<R>>, AtlasError> {
        Ok(self.records::<R>()?.find(identifier).cloned())
    }

    /// Country by name, ISO 3166 code, or numeric code.
    pub fn country(&self, identifier: &str) -> Result<Option<Arc<Country>>, AtlasError> {
        self.lookup(identifier)
    }

    /// Countries passing `filters`.
    pub fn countries(&self, filters: &[Filter]) -> Result<RecordSet<Country>, AtlasError> {
        self.query(filters)
    }

    /// Language by name or ISO 639 code.
    pub fn language(&self, identifier: &str) -> Result<Option<Arc<Language>>, AtlasError> {
        self.lookup(identifier)
    }

    /// Languages passing `filters`.
    pub fn languages(&self, filters: &[Filter]) -> Result<RecordSet<Language>, AtlasError> {
        self.query(filters)
    }

    /// Currency by name or ISO 4217 code.
    pub fn currency(&self, identifier: &str) -> Result<Option<Arc<Currency>>, AtlasError> {
        self.lookup(identifier)
    }

    /// Currencies passing `filters`.
    pub fn currencies(&self, filters: &[Filter]) -> Result<RecordSet<Currency>, AtlasError> {
        self.query(filters)
    }

    /// Region by code or name.
    pub fn region(&self, identifier: &str) -> Result<Option<Arc<Region>>, AtlasError> {
        self.lookup(identifier)
    }

    /// Regions passing `filters`.
    pub fn regions(&self, filters: &[Filter]) -> Result<RecordSet<Region>, AtlasError> {
        self.query(filters)
    }

    /// Sub-region by code or name.
    pub fn sub_region(&self, identifier: &str) -> Result<Option<Arc<SubRegion>>, AtlasError> {
        self.lookup(identifier)
    }

    /// Sub-regions passing `filters`.
    pub fn sub_regions(&self, filters: &[Filter]) -> Result<RecordSet<SubRegion>, AtlasError> {
        self.query(filters)
    }
}
