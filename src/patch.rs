//! Versioned schema definitions and their patch operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;
use crate::path::SchemaPath;
use crate::version::VersionOrdinal;
use crate::SchemaNode;

/// Release channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    /// Experimental features enabled
    Preview,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Preview => "preview",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Channel::Stable),
            "preview" => Ok(Channel::Preview),
            _ => Err(SchemaError::InvalidChannel(s.to_string())),
        }
    }
}

/// A single edit to a schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Set a value, creating intermediate objects
    Add {
        target: SchemaPath,
        value: SchemaNode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// Delete a value if present
    Remove {
        target: SchemaPath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// Overwrite a value that must already exist
    Modify {
        target: SchemaPath,
        value: SchemaNode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl PatchOperation {
    pub fn add(target: SchemaPath, value: SchemaNode) -> Self {
        PatchOperation::Add {
            target,
            value,
            note: None,
        }
    }

    pub fn remove(target: SchemaPath) -> Self {
        PatchOperation::Remove { target, note: None }
    }

    pub fn modify(target: SchemaPath, value: SchemaNode) -> Self {
        PatchOperation::Modify {
            target,
            value,
            note: None,
        }
    }

    /// Attach an explanatory note
    pub fn with_note(mut self, text: impl Into<String>) -> Self {
        let slot = match &mut self {
            PatchOperation::Add { note, .. }
            | PatchOperation::Remove { note, .. }
            | PatchOperation::Modify { note, .. } => note,
        };
        *slot = Some(text.into());
        self
    }

    pub fn target(&self) -> &SchemaPath {
        match self {
            PatchOperation::Add { target, .. }
            | PatchOperation::Remove { target, .. }
            | PatchOperation::Modify { target, .. } => target,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            PatchOperation::Add { note, .. }
            | PatchOperation::Remove { note, .. }
            | PatchOperation::Modify { note, .. } => note.as_deref(),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            PatchOperation::Add { .. } => "add",
            PatchOperation::Remove { .. } => "remove",
            PatchOperation::Modify { .. } => "modify",
        }
    }
}

/// All operations introduced at one product version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub version: VersionOrdinal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub operations: Vec<PatchOperation>,
}

impl ChangeSet {
    pub fn new(version: VersionOrdinal) -> Self {
        Self {
            version,
            description: None,
            operations: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append an operation
    pub fn with(mut self, operation: PatchOperation) -> Self {
        self.operations.push(operation);
        self
    }
}

/// A base schema plus the change sets that evolve it, and the files it governs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedSchemaDefinition {
    /// Unique name of the definition (e.g., "behavior/blocks")
    pub id: String,
    /// Schema valid at the earliest supported version
    pub base_schema: SchemaNode,
    #[serde(default)]
    pub stable_changes: Vec<ChangeSet>,
    #[serde(default)]
    pub preview_changes: Vec<ChangeSet>,
    /// Project-relative glob patterns of the files this definition covers
    pub category_patterns: Vec<String>,
}

impl VersionedSchemaDefinition {
    pub fn new(id: impl Into<String>, base_schema: SchemaNode) -> Self {
        Self {
            id: id.into(),
            base_schema,
            stable_changes: Vec::new(),
            preview_changes: Vec::new(),
            category_patterns: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.category_patterns.push(pattern.into());
        self
    }

    pub fn with_stable(mut self, change_set: ChangeSet) -> Self {
        self.stable_changes.push(change_set);
        self
    }

    pub fn with_preview(mut self, change_set: ChangeSet) -> Self {
        self.preview_changes.push(change_set);
        self
    }

    /// Parse a definition from its JSON form
    pub fn from_json(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Change sets declared for a channel
    pub fn changes(&self, channel: Channel) -> &[ChangeSet] {
        match channel {
            Channel::Stable => &self.stable_changes,
            Channel::Preview => &self.preview_changes,
        }
    }

    /// Every version a channel declares a change set for, ascending and deduplicated
    pub fn versions(&self, channel: Channel) -> Vec<VersionOrdinal> {
        let mut versions: Vec<_> = self
            .changes(channel)
            .iter()
            .map(|set| set.version.clone())
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// The newest version a channel changes the schema at
    pub fn latest_version(&self, channel: Channel) -> Option<VersionOrdinal> {
        self.versions(channel).pop()
    }
}
