//! Patch engine
//!
//! Rebuilds the effective schema of a definition for one target version and
//! channel by replaying its change sets over a fresh copy of the base schema.
//!
//! ## Selection
//!
//! 1. Stable change sets at or below the target, ascending by version
//!    (declaration order breaks ties).
//! 2. On the preview channel, preview change sets at or below the target, plus
//!    any declared at [`VersionOrdinal::unconditional_preview`], ascending.
//!    They are applied after every stable change set.
//!
//! Operations inside a change set run in declaration order.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{Result, SchemaError};
use crate::patch::{ChangeSet, Channel, PatchOperation, VersionedSchemaDefinition};
use crate::path::{self, SchemaPath};
use crate::version::VersionOrdinal;
use crate::SchemaNode;

/// A change set that was replayed during materialization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedChangeSet {
    pub channel: Channel,
    pub version: VersionOrdinal,
    pub operations: usize,
}

/// Something suspicious noticed while replaying patches
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchWarning {
    /// An `add` replaced a value that was still present
    OverwroteLiveValue {
        channel: Channel,
        version: VersionOrdinal,
        path: SchemaPath,
    },
}

/// The effective schema together with how it was produced
#[derive(Debug, Clone)]
pub struct MaterializeReport {
    pub schema: SchemaNode,
    pub applied: Vec<AppliedChangeSet>,
    pub warnings: Vec<PatchWarning>,
}

/// Change sets that apply to `target` on `channel`, in replay order
pub fn plan<'a>(
    definition: &'a VersionedSchemaDefinition,
    target: &VersionOrdinal,
    channel: Channel,
) -> Vec<(Channel, &'a ChangeSet)> {
    let mut stable: Vec<&ChangeSet> = definition
        .stable_changes
        .iter()
        .filter(|set| set.version.in_range(target))
        .collect();
    stable.sort_by(|a, b| a.version.cmp(&b.version));

    let mut ordered: Vec<_> = stable.into_iter().map(|set| (Channel::Stable, set)).collect();

    if channel == Channel::Preview {
        let mut preview: Vec<&ChangeSet> = definition
            .preview_changes
            .iter()
            .filter(|set| set.version.in_range(target) || set.version.is_unconditional_preview())
            .collect();
        preview.sort_by(|a, b| a.version.cmp(&b.version));
        ordered.extend(preview.into_iter().map(|set| (Channel::Preview, set)));
    }

    ordered
}

/// Compute the effective schema
pub fn materialize(
    definition: &VersionedSchemaDefinition,
    target: &VersionOrdinal,
    channel: Channel,
) -> Result<SchemaNode> {
    materialize_with_report(definition, target, channel).map(|report| report.schema)
}

/// Compute the effective schema and report which change sets were replayed
pub fn materialize_with_report(
    definition: &VersionedSchemaDefinition,
    target: &VersionOrdinal,
    channel: Channel,
) -> Result<MaterializeReport> {
    let mut schema = definition.base_schema.clone();
    let mut applied = Vec::new();
    let mut warnings = Vec::new();

    for (set_channel, change_set) in plan(definition, target, channel) {
        debug!(
            definition = %definition.id,
            channel = %set_channel,
            version = %change_set.version,
            operations = change_set.operations.len(),
            "Applying change set"
        );

        for operation in &change_set.operations {
            let overwrote =
                apply(&mut schema, operation).map_err(|source| SchemaError::PatchFailed {
                    definition: definition.id.clone(),
                    version: change_set.version.to_string(),
                    source: Box::new(source),
                })?;

            if overwrote {
                warn!(
                    definition = %definition.id,
                    version = %change_set.version,
                    path = %operation.target(),
                    "add overwrote a value that was never removed"
                );
                warnings.push(PatchWarning::OverwroteLiveValue {
                    channel: set_channel,
                    version: change_set.version.clone(),
                    path: operation.target().clone(),
                });
            }
        }

        applied.push(AppliedChangeSet {
            channel: set_channel,
            version: change_set.version.clone(),
            operations: change_set.operations.len(),
        });
    }

    Ok(MaterializeReport {
        schema,
        applied,
        warnings,
    })
}

/// Apply one operation; returns whether an `add` replaced a live value
fn apply(schema: &mut SchemaNode, operation: &PatchOperation) -> Result<bool> {
    match operation {
        PatchOperation::Add { target, value, .. } => {
            let previous = path::write(schema, target, value.clone())?;
            Ok(previous.is_some())
        }
        PatchOperation::Modify { target, value, .. } => {
            path::replace(schema, target, value.clone())?;
            Ok(false)
        }
        PatchOperation::Remove { target, note } => {
            if path::remove(schema, target).is_none() {
                trace!(
                    path = %target,
                    note = note.as_deref().unwrap_or(""),
                    "remove target absent"
                );
            }
            Ok(false)
        }
    }
}
