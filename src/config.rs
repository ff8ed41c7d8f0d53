//! Configuration for the schema resolver
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-resolver.toml)
//! - Environment variables (SCHEMA_RESOLVER__*)
//!
//! ## Example config file (schema-resolver.toml):
//! ```toml
//! [project]
//! target_version = "1.21.90"
//! channel = "preview"
//!
//! [resolver]
//! memoize = true
//! builtin_definitions = true
//! definitions_dir = "./schema-definitions"
//! strict = false
//! case_insensitive_paths = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::patch::Channel;
use crate::registry::DefinitionRegistry;
use crate::version::VersionOrdinal;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// The project being edited
    #[serde(default)]
    pub project: ProjectConfig,

    /// Resolver behavior
    #[serde(default)]
    pub resolver: ResolverSettings,
}

/// Target version and channel of the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Product version the project targets (dotted integers)
    #[serde(default = "default_target_version")]
    pub target_version: String,

    /// Release channel
    #[serde(default)]
    pub channel: Channel,
}

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Cache resolved schemas for the lifetime of the process
    #[serde(default = "default_true")]
    pub memoize: bool,

    /// Register the definitions compiled into the crate
    #[serde(default = "default_true")]
    pub builtin_definitions: bool,

    /// Extra definition files to load
    #[serde(default)]
    pub definitions_dir: Option<PathBuf>,

    /// Reject definitions with lint errors
    #[serde(default)]
    pub strict: bool,

    /// Match file paths without regard to case
    #[serde(default)]
    pub case_insensitive_paths: bool,
}

// Default value functions
fn default_target_version() -> String {
    "1.21.0".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            channel: Channel::Stable,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            memoize: true,
            builtin_definitions: true,
            definitions_dir: None,
            strict: false,
            case_insensitive_paths: false,
        }
    }
}

impl ProjectConfig {
    /// Parse the configured target version
    pub fn target_version(&self) -> Result<VersionOrdinal> {
        VersionOrdinal::parse(&self.target_version)
    }
}

impl ResolverConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "schema-resolver.toml",
            ".schema-resolver.toml",
            "config/schema-resolver.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) =
            directories::ProjectDirs::from("dev", "bedrock", "schema-resolver")
        {
            let xdg_config = config_dir.config_dir().join("schema-resolver.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SCHEMA_RESOLVER__*)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_RESOLVER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Build the definition registry these settings describe
    pub fn build_registry(&self) -> Result<DefinitionRegistry> {
        let mut builder = DefinitionRegistry::builder()
            .strict(self.resolver.strict)
            .case_insensitive(self.resolver.case_insensitive_paths);

        if self.resolver.builtin_definitions {
            builder = builder.with_builtin()?;
        }
        if let Some(dir) = &self.resolver.definitions_dir {
            builder = builder.load_dir(dir)?;
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert!(config.resolver.memoize);
        assert!(config.resolver.builtin_definitions);
        assert_eq!(config.project.channel, Channel::Stable);
        assert!(config.project.target_version().is_ok());
    }

    #[test]
    fn test_serialize_config() {
        let config = ResolverConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[project]"));
        assert!(toml_str.contains("[resolver]"));
        assert!(toml_str.contains("channel = \"stable\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            concat!(
                "[project]\ntarget_version = \"1.21.90\"\nchannel = \"preview\"\n\n",
                "[resolver]\nmemoize = false\n",
            ),
        )
        .unwrap();

        let config = ResolverConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.project.channel, Channel::Preview);
        assert_eq!(
            config.project.target_version().unwrap(),
            VersionOrdinal::parse("1.21.90").unwrap()
        );
        assert!(!config.resolver.memoize);
        assert!(config.resolver.builtin_definitions);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ResolverConfig::default();
        config.project.target_version = "1.20.80".to_string();
        config.resolver.strict = true;
        config.save(path.to_str().unwrap()).unwrap();

        let reloaded = ResolverConfig::load_from(path.to_str()).unwrap();
        assert_eq!(reloaded.project.target_version, "1.20.80");
        assert!(reloaded.resolver.strict);
    }

    #[test]
    fn test_invalid_target_version() {
        let config = ResolverConfig {
            project: ProjectConfig {
                target_version: "latest".to_string(),
                channel: Channel::Stable,
            },
            ..Default::default()
        };
        assert!(config.project.target_version().is_err());
    }

    #[test]
    fn test_build_registry_without_builtin() {
        let mut config = ResolverConfig::default();
        config.resolver.builtin_definitions = false;
        assert!(config.build_registry().unwrap().is_empty());
    }
}
