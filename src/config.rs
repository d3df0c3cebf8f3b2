use std::path::PathBuf;
use std::time::Duration;

use crate::constants::cache::DEFAULT_CACHE_TTL;

/// Where resource documents are read from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResourceLocation {
    /// Documents compiled into the crate.
    #[default]
    Bundled,
    /// Documents with the bundled file names inside a directory.
    Directory(PathBuf),
}

/// Top-level configuration for an `Atlas`.
#[derive(Clone, Debug)]
pub struct AtlasConfig {
    /// Source of the resource documents.
    pub resources: ResourceLocation,
    /// Whether entity maps and loaded record sets are memoized.
    pub cache_enabled: bool,
    /// Lifetime of memoized record sets; `None` keeps them until flushed.
    pub cache_ttl: Option<Duration>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            resources: ResourceLocation::Bundled,
            cache_enabled: true,
            cache_ttl: Some(DEFAULT_CACHE_TTL),
        }
    }
}

impl AtlasConfig {
    /// Read resources from `dir` instead of the bundled copies.
    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources = ResourceLocation::Directory(dir.into());
        self
    }

    /// Toggle memoization.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the lifetime of memoized record sets.
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_bundled_resources_with_one_day_cache() {
        let config = AtlasConfig::default();
        assert_eq!(config.resources, ResourceLocation::Bundled);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn builders_override_fields() {
        let config = AtlasConfig::default()
            .with_resources_dir("/tmp/atlas")
            .with_cache_enabled(false)
            .with_cache_ttl(None);
        assert_eq!(
            config.resources,
            ResourceLocation::Directory(PathBuf::from("/tmp/atlas"))
        );
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl, None);
    }
}
