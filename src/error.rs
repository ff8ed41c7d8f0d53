//! Error types for schema resolution

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema resolution errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid version string: {0:?}")]
    InvalidVersionString(String),

    #[error("Invalid channel: {0:?} (expected \"stable\" or \"preview\")")]
    InvalidChannel(String),

    #[error("Path not found: {path} ({reason})")]
    PathNotFound { path: String, reason: String },

    #[error("Ambiguous file match: {path} is claimed by {}", .definitions.join(", "))]
    AmbiguousFileMatch { path: String, definitions: Vec<String> },

    #[error("No schema definition covers {0}")]
    UnknownCategory(String),

    #[error("Invalid category pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Definition already registered: {0}")]
    DuplicateDefinition(String),

    #[error("Invalid definition {id}: {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Patch failed in {definition} at version {version}: {source}")]
    PatchFailed {
        definition: String,
        version: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub(crate) fn path_not_found(path: impl ToString, reason: impl Into<String>) -> Self {
        SchemaError::PathNotFound {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error, possibly wrapped by a patch failure, is a `PathNotFound`
    pub fn is_path_not_found(&self) -> bool {
        match self {
            SchemaError::PathNotFound { .. } => true,
            SchemaError::PatchFailed { source, .. } => source.is_path_not_found(),
            _ => false,
        }
    }
}
