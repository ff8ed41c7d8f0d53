//! Schema resolver
//!
//! Composition root: looks a file up in the [`DefinitionRegistry`] and
//! materializes the matching definition for a version and channel.
//! Materialization is deterministic, so results may be memoized for the life
//! of the process; the cache is append-only.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::config::{ProjectConfig, ResolverConfig};
use crate::engine;
use crate::error::{Result, SchemaError};
use crate::patch::{Channel, VersionedSchemaDefinition};
use crate::registry::DefinitionRegistry;
use crate::version::VersionOrdinal;
use crate::SchemaNode;

/// A materialized schema for one (definition, version, channel)
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub definition_id: String,
    pub version: VersionOrdinal,
    pub channel: Channel,
    pub schema: Arc<SchemaNode>,
    pub checksum: Checksum,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    definition: String,
    version: VersionOrdinal,
    channel: Channel,
}

/// Resolves file paths to effective schemas
#[derive(Debug)]
pub struct SchemaResolver {
    registry: Arc<DefinitionRegistry>,
    cache: Option<DashMap<CacheKey, ResolvedSchema>>,
}

impl SchemaResolver {
    /// Create a memoizing resolver over a registry
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            cache: Some(DashMap::new()),
        }
    }

    /// Enable or disable memoization
    pub fn with_memoization(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(DashMap::new);
        self
    }

    /// Build the registry and resolver described by a configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let registry = config.build_registry()?;
        Ok(Self::new(Arc::new(registry)).with_memoization(config.resolver.memoize))
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Number of memoized schemas
    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }

    /// Resolve with structured failures.
    ///
    /// `Ok(None)` when no definition covers the file.
    pub fn try_get_schema_for(
        &self,
        file_path: &str,
        version: &VersionOrdinal,
        channel: Channel,
    ) -> Result<Option<ResolvedSchema>> {
        let Some(definition) = self.registry.resolve(file_path)? else {
            return Ok(None);
        };
        self.materialize(definition, version, channel).map(Some)
    }

    /// Resolve for an interactive host.
    ///
    /// Every failure, including a malformed version string or broken patch
    /// data, degrades to `None` with a logged diagnostic.
    pub fn get_schema_for(
        &self,
        file_path: &str,
        version: &str,
        channel: Channel,
    ) -> Option<ResolvedSchema> {
        let version = match VersionOrdinal::parse(version) {
            Ok(version) => version,
            Err(e) => {
                warn!(path = file_path, error = %e, "Not resolving schema");
                return None;
            }
        };

        match self.try_get_schema_for(file_path, &version, channel) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(path = file_path, %version, %channel, error = %e, "Schema resolution failed");
                None
            }
        }
    }

    /// Resolve using a project's configured version and channel
    pub fn get_schema_for_project(
        &self,
        file_path: &str,
        project: &ProjectConfig,
    ) -> Option<ResolvedSchema> {
        self.get_schema_for(file_path, &project.target_version, project.channel)
    }

    /// Like [`Self::try_get_schema_for`], but an uncovered file is an error
    pub fn require_schema_for(
        &self,
        file_path: &str,
        version: &VersionOrdinal,
        channel: Channel,
    ) -> Result<ResolvedSchema> {
        self.try_get_schema_for(file_path, version, channel)?
            .ok_or_else(|| SchemaError::UnknownCategory(file_path.to_string()))
    }

    /// Materialize a definition, consulting the cache when enabled.
    ///
    /// Only the registry's own definitions are memoized; any other
    /// definition, even one sharing a registered id, is built fresh.
    pub fn materialize(
        &self,
        definition: &VersionedSchemaDefinition,
        version: &VersionOrdinal,
        channel: Channel,
    ) -> Result<ResolvedSchema> {
        let registered = self
            .registry
            .get(&definition.id)
            .is_some_and(|owned| std::ptr::eq(owned.as_ref(), definition));
        let cache = match &self.cache {
            Some(cache) if registered => cache,
            _ => return build(definition, version, channel),
        };

        let key = CacheKey {
            definition: definition.id.clone(),
            version: version.clone(),
            channel,
        };
        if let Some(hit) = cache.get(&key) {
            return Ok(hit.value().clone());
        }

        let resolved = build(definition, version, channel)?;
        Ok(cache.entry(key).or_insert(resolved).value().clone())
    }
}

fn build(
    definition: &VersionedSchemaDefinition,
    version: &VersionOrdinal,
    channel: Channel,
) -> Result<ResolvedSchema> {
    let schema = engine::materialize(definition, version, channel)?;
    let checksum = Checksum::from_json(&schema);
    debug!(definition = %definition.id, %version, %channel, %checksum, "Materialized schema");

    Ok(ResolvedSchema {
        definition_id: definition.id.clone(),
        version: version.clone(),
        channel,
        schema: Arc::new(schema),
        checksum,
    })
}
