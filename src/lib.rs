//! Bedrock Schemas
//!
//! Version-aware JSON Schema resolution for Bedrock add-on files. Each file
//! category has one definition: a base schema plus change sets tagged with the
//! product version that introduced them. Resolving a file picks its
//! definition by path pattern and replays every applicable change set.
//!
//! ## Features
//!
//! - **Structural versions**: `1.21.100` sorts after `1.21.90`
//! - **Channels**: preview change sets layer over stable ones
//! - **Path matching**: glob patterns map files to definitions, ambiguity is reported
//! - **Memoization**: resolved schemas are cached for the life of the process
//!
//! ## Architecture
//!
//! ```text
//! file path ──► DefinitionRegistry::resolve ──► VersionedSchemaDefinition
//!                                                    │
//! version, channel ───────────► engine::materialize ◄┘
//!                                       │
//!                                       ▼
//!                               ResolvedSchema
//! ```

pub mod checksum;
pub mod config;
pub mod engine;
pub mod error;
pub mod lint;
pub mod patch;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod version;

/// A JSON Schema document or fragment
pub type SchemaNode = serde_json::Value;

pub use checksum::Checksum;
pub use config::{ProjectConfig, ResolverConfig};
pub use engine::{materialize, materialize_with_report, MaterializeReport, PatchWarning};
pub use error::{Result, SchemaError};
pub use lint::{DefinitionLinter, LintResult};
pub use patch::{ChangeSet, Channel, PatchOperation, VersionedSchemaDefinition};
pub use path::{Segment, SchemaPath};
pub use registry::{normalize_path, DefinitionRegistry, RegistryBuilder};
pub use resolver::{ResolvedSchema, SchemaResolver};
pub use version::VersionOrdinal;
