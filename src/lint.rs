//! Static checks for schema definitions
//!
//! The patch engine trusts definition data: it sorts change sets rather than
//! rejecting bad ordering, and it treats dangling removes as no-ops. The linter
//! reports those conditions so broken definitions are caught before they ship.
//!
//! ## Errors
//! - `NO_PATTERNS`: the definition governs no files
//! - `BASE_NOT_OBJECT`: the base schema is not a JSON object
//! - `DESCENDING_VERSION`: a change set is declared after a newer one
//! - `DUPLICATE_VERSION`: two change sets of one channel share a version
//!
//! ## Warnings
//! - `EMPTY_CHANGE_SET`: a change set with no operations
//! - `SENTINEL_IN_STABLE`: a stable change set at the unconditional preview version
//! - `REMOVE_WITHOUT_NOTE`: a remove that does not say why
//! - `UNKNOWN_EXTENSION`: an `x-*` key outside the known passthrough set

use std::collections::HashSet;

use crate::patch::{ChangeSet, Channel, PatchOperation, VersionedSchemaDefinition};
use crate::version::VersionOrdinal;
use crate::SchemaNode;

/// Result of linting a definition
#[derive(Debug, Default)]
pub struct LintResult {
    pub definition_id: String,
    pub errors: Vec<LintError>,
    pub warnings: Vec<LintWarning>,
}

impl LintResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug)]
pub struct LintError {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

#[derive(Debug)]
pub struct LintWarning {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

/// The definition linter
pub struct DefinitionLinter {
    /// Vendor extension keys consumed by downstream tooling
    known_extensions: HashSet<&'static str>,
}

impl Default for DefinitionLinter {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionLinter {
    pub fn new() -> Self {
        Self {
            known_extensions: [
                "x-dynamic-examples-source",
                "x-experimental_options",
                "x-deprecated",
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Lint one definition
    pub fn lint(&self, definition: &VersionedSchemaDefinition) -> LintResult {
        let mut result = LintResult {
            definition_id: definition.id.clone(),
            ..Default::default()
        };

        if definition.category_patterns.is_empty() {
            result.errors.push(LintError {
                code: "NO_PATTERNS",
                message: "Definition declares no category patterns".to_string(),
                path: "category_patterns".to_string(),
            });
        }

        if !definition.base_schema.is_object() {
            result.errors.push(LintError {
                code: "BASE_NOT_OBJECT",
                message: "Base schema must be a JSON object".to_string(),
                path: "base_schema".to_string(),
            });
        }
        self.check_extensions(&definition.base_schema, "base_schema", &mut result);

        for channel in [Channel::Stable, Channel::Preview] {
            self.check_change_sets(definition.changes(channel), channel, &mut result);
        }

        result
    }

    fn check_change_sets(&self, sets: &[ChangeSet], channel: Channel, result: &mut LintResult) {
        let field = match channel {
            Channel::Stable => "stable_changes",
            Channel::Preview => "preview_changes",
        };

        let mut seen: HashSet<&VersionOrdinal> = HashSet::new();
        let mut newest: Option<&VersionOrdinal> = None;

        for (idx, set) in sets.iter().enumerate() {
            let path = format!("{}[{}]", field, idx);

            if seen.contains(&set.version) {
                result.errors.push(LintError {
                    code: "DUPLICATE_VERSION",
                    message: format!("Version {} is declared twice", set.version),
                    path: path.clone(),
                });
            } else if let Some(newest) = newest.filter(|newest| set.version < **newest) {
                result.errors.push(LintError {
                    code: "DESCENDING_VERSION",
                    message: format!("Version {} is declared after {}", set.version, newest),
                    path: path.clone(),
                });
            }
            seen.insert(&set.version);
            if newest.map_or(true, |newest| set.version > *newest) {
                newest = Some(&set.version);
            }

            if set.operations.is_empty() {
                result.warnings.push(LintWarning {
                    code: "EMPTY_CHANGE_SET",
                    message: format!("Change set {} has no operations", set.version),
                    path: path.clone(),
                });
            }

            if channel == Channel::Stable && set.version.is_unconditional_preview() {
                result.warnings.push(LintWarning {
                    code: "SENTINEL_IN_STABLE",
                    message: format!(
                        "Stable change set at {} is only unconditional on the preview channel",
                        set.version
                    ),
                    path: path.clone(),
                });
            }

            for (op_idx, operation) in set.operations.iter().enumerate() {
                let op_path = format!("{}.operations[{}]", path, op_idx);
                match operation {
                    PatchOperation::Remove { note: None, target } => {
                        result.warnings.push(LintWarning {
                            code: "REMOVE_WITHOUT_NOTE",
                            message: format!("Removal of {} has no note", target),
                            path: op_path,
                        });
                    }
                    PatchOperation::Add { value, .. } | PatchOperation::Modify { value, .. } => {
                        self.check_extensions(value, &format!("{}.value", op_path), result);
                    }
                    PatchOperation::Remove { .. } => {}
                }
            }
        }
    }

    fn check_extensions(&self, node: &SchemaNode, path: &str, result: &mut LintResult) {
        match node {
            SchemaNode::Object(map) => {
                for (key, child) in map {
                    let child_path = format!("{}.{}", path, key);
                    if key.starts_with("x-") && !self.known_extensions.contains(key.as_str()) {
                        result.warnings.push(LintWarning {
                            code: "UNKNOWN_EXTENSION",
                            message: format!("Unknown extension key {}", key),
                            path: child_path.clone(),
                        });
                    }
                    self.check_extensions(child, &child_path, result);
                }
            }
            SchemaNode::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    self.check_extensions(child, &format!("{}[{}]", path, idx), result);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::SchemaPath;
    use serde_json::json;

    fn v(s: &str) -> VersionOrdinal {
        VersionOrdinal::parse(s).unwrap()
    }

    fn codes<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        items.collect()
    }

    #[test]
    fn test_clean_definition() {
        let base = json!({"type": "object", "x-deprecated": false});
        let def = VersionedSchemaDefinition::new("ok", base)
            .with_pattern("**/ok/*.json")
            .with_stable(ChangeSet::new(v("1.1")).with(PatchOperation::add(
                SchemaPath::from_pointer("/properties/a").unwrap(),
                json!({"type": "string"}),
            )));
        let result = DefinitionLinter::new().lint(&def);
        assert!(result.is_clean());
        assert!(!result.has_warnings());
        assert_eq!(result.definition_id, "ok");
    }

    #[test]
    fn test_ordering_errors() {
        let add = || PatchOperation::add(SchemaPath::root(), json!({}));
        let def = VersionedSchemaDefinition::new("order", json!({}))
            .with_pattern("**/x/*.json")
            .with_stable(ChangeSet::new(v("1.2")).with(add()))
            .with_stable(ChangeSet::new(v("1.1")).with(add()))
            .with_preview(ChangeSet::new(v("1.3")).with(add()))
            .with_preview(ChangeSet::new(v("1.3.0")).with(add()));

        let result = DefinitionLinter::new().lint(&def);
        assert_eq!(
            codes(result.errors.iter().map(|e| e.code)),
            ["DESCENDING_VERSION", "DUPLICATE_VERSION"]
        );
        assert_eq!(result.errors[0].path, "stable_changes[1]");
        assert_eq!(result.errors[1].path, "preview_changes[1]");
    }

    #[test]
    fn test_ordering_checks_every_earlier_set() {
        let add = || PatchOperation::add(SchemaPath::root(), json!({}));
        let def = VersionedSchemaDefinition::new("order", json!({}))
            .with_pattern("**/x/*.json")
            .with_stable(ChangeSet::new(v("1.1")).with(add()))
            .with_stable(ChangeSet::new(v("1.2")).with(add()))
            .with_stable(ChangeSet::new(v("1.1")).with(add()))
            .with_preview(ChangeSet::new(v("1.3")).with(add()))
            .with_preview(ChangeSet::new(v("1.1")).with(add()))
            .with_preview(ChangeSet::new(v("1.2")).with(add()));

        let result = DefinitionLinter::new().lint(&def);
        assert_eq!(
            codes(result.errors.iter().map(|e| e.code)),
            ["DUPLICATE_VERSION", "DESCENDING_VERSION", "DESCENDING_VERSION"]
        );
        assert_eq!(result.errors[0].path, "stable_changes[2]");
        assert_eq!(result.errors[1].path, "preview_changes[1]");
        assert_eq!(result.errors[2].path, "preview_changes[2]");
        assert!(result.errors[2].message.ends_with("after 1.3"));
    }

    #[test]
    fn test_structural_errors() {
        let def = VersionedSchemaDefinition::new("bad", json!(true));
        let result = DefinitionLinter::new().lint(&def);
        assert_eq!(codes(result.errors.iter().map(|e| e.code)), ["NO_PATTERNS", "BASE_NOT_OBJECT"]);
    }

    #[test]
    fn test_warnings() {
        let base = json!({"properties": {"a": {"x-custom": 1}}});
        let def = VersionedSchemaDefinition::new("warn", base)
            .with_pattern("**/w/*.json")
            .with_stable(ChangeSet::new(v("1.0.0")).with(PatchOperation::remove(
                SchemaPath::from_pointer("/properties/a").unwrap(),
            )))
            .with_preview(ChangeSet::new(v("1.1")));

        let result = DefinitionLinter::new().lint(&def);
        assert!(result.is_clean());
        assert_eq!(
            codes(result.warnings.iter().map(|w| w.code)),
            ["UNKNOWN_EXTENSION", "SENTINEL_IN_STABLE", "REMOVE_WITHOUT_NOTE", "EMPTY_CHANGE_SET"]
        );
        assert_eq!(result.warnings[0].path, "base_schema.properties.a.x-custom");
    }
}
