//! Content checksums for resolved schemas

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::SchemaNode;

/// SHA256 checksum of a schema tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a schema tree.
    ///
    /// Object keys are hashed in their stored order, so equal trees built by
    /// the same patch sequence always agree.
    pub fn from_json(value: &SchemaNode) -> Self {
        let canonical = serde_json::to_vec(value).unwrap_or_default();
        Self::from_bytes(&canonical)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that a tree matches this checksum
    pub fn verify_json(&self, value: &SchemaNode) -> bool {
        *self == Self::from_json(value)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
