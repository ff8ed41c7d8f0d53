//! Definition registry
//!
//! Maps project-relative file paths to the one [`VersionedSchemaDefinition`]
//! that governs them. Every category pattern of every definition is compiled
//! once into a single [`GlobSet`]; a lookup normalizes the path and asks the
//! set which patterns match.
//!
//! Pattern syntax: `*` matches within one path segment, `**` matches any number
//! of whole segments, and `<all>` is accepted as a spelling of `*`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use include_dir::{include_dir, Dir};
use tracing::{debug, error, trace};
use walkdir::WalkDir;

use crate::error::{Result, SchemaError};
use crate::lint::DefinitionLinter;
use crate::patch::VersionedSchemaDefinition;

/// Definitions shipped with the crate
static BUILTIN_DEFINITIONS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/definitions");

/// Normalize a file path for matching: forward slashes, no leading `./` or `/`,
/// no empty or `.` segments
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Immutable lookup from file paths to definitions
#[derive(Debug)]
pub struct DefinitionRegistry {
    definitions: Vec<Arc<VersionedSchemaDefinition>>,
    by_id: HashMap<String, usize>,
    patterns: GlobSet,
    /// Definition index for each compiled pattern
    pattern_owners: Vec<usize>,
}

impl DefinitionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry of the definitions compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::builder().with_builtin()?.build()
    }

    /// Find the definition governing `file_path`.
    ///
    /// `Ok(None)` means no category covers the file, which is an ordinary
    /// outcome. Several distinct definitions matching is a registry defect.
    ///
    /// Ambiguity is counted per definition, not per pattern: when two
    /// patterns of the *same* definition both match, the file still resolves
    /// to that definition.
    pub fn resolve(&self, file_path: &str) -> Result<Option<&Arc<VersionedSchemaDefinition>>> {
        let normalized = normalize_path(file_path);

        let mut owners: Vec<usize> = self
            .patterns
            .matches(&normalized)
            .into_iter()
            .map(|pattern| self.pattern_owners[pattern])
            .collect();
        owners.sort_unstable();
        owners.dedup();

        match owners.as_slice() {
            [] => {
                trace!(path = %normalized, "No definition covers path");
                Ok(None)
            }
            [single] => Ok(Some(&self.definitions[*single])),
            many => {
                let definitions: Vec<String> =
                    many.iter().map(|&idx| self.definitions[idx].id.clone()).collect();
                error!(path = %normalized, ?definitions, "Path matches several definitions");
                Err(SchemaError::AmbiguousFileMatch {
                    path: normalized,
                    definitions,
                })
            }
        }
    }

    /// Get a definition by id
    pub fn get(&self, id: &str) -> Option<&Arc<VersionedSchemaDefinition>> {
        self.by_id.get(id).map(|&idx| &self.definitions[idx])
    }

    /// All definitions, in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<VersionedSchemaDefinition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Collects definitions and compiles them into a [`DefinitionRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<VersionedSchemaDefinition>,
    strict: bool,
    case_insensitive: bool,
}

impl RegistryBuilder {
    /// Add a definition
    pub fn register(mut self, definition: VersionedSchemaDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Reject definitions that have lint errors
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Match paths without regard to ASCII case
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Add the definitions compiled into the crate
    pub fn with_builtin(mut self) -> Result<Self> {
        let mut files = Vec::new();
        collect_embedded_files(&BUILTIN_DEFINITIONS, &mut files)?;
        files.sort_by(|a, b| a.0.cmp(b.0));

        for (path, content) in files {
            let definition = VersionedSchemaDefinition::from_json(content).map_err(|e| {
                SchemaError::InvalidDefinition {
                    id: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            self.definitions.push(definition);
        }
        Ok(self)
    }

    /// Add every `*.json` definition file under `dir`.
    ///
    /// Symlinked directories are not followed.
    pub fn load_dir(mut self, dir: impl AsRef<Path>) -> Result<Self> {
        for path in collect_json_files(dir.as_ref())? {
            let content = fs::read_to_string(&path)?;
            let definition = VersionedSchemaDefinition::from_json(&content).map_err(|e| {
                SchemaError::InvalidDefinition {
                    id: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            debug!(id = %definition.id, path = %path.display(), "Loaded definition");
            self.definitions.push(definition);
        }
        Ok(self)
    }

    /// Compile all patterns
    pub fn build(self) -> Result<DefinitionRegistry> {
        let linter = DefinitionLinter::new();
        let mut definitions = Vec::with_capacity(self.definitions.len());
        let mut by_id = HashMap::with_capacity(self.definitions.len());
        let mut set = GlobSetBuilder::new();
        let mut pattern_owners = Vec::new();

        for definition in self.definitions {
            if by_id.contains_key(&definition.id) {
                return Err(SchemaError::DuplicateDefinition(definition.id));
            }

            if self.strict {
                let lint = linter.lint(&definition);
                if !lint.is_clean() {
                    let codes: Vec<&str> = lint.errors.iter().map(|e| e.code).collect();
                    return Err(SchemaError::InvalidDefinition {
                        id: definition.id,
                        reason: format!("lint errors: {}", codes.join(", ")),
                    });
                }
            }

            let idx = definitions.len();
            for pattern in &definition.category_patterns {
                let glob = GlobBuilder::new(&pattern.replace("<all>", "*"))
                    .literal_separator(true)
                    .case_insensitive(self.case_insensitive)
                    .build()
                    .map_err(|source| SchemaError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                set.add(glob);
                pattern_owners.push(idx);
            }

            by_id.insert(definition.id.clone(), idx);
            definitions.push(Arc::new(definition));
        }

        let patterns = set.build().map_err(|source| SchemaError::InvalidPattern {
            pattern: "<combined set>".to_string(),
            source,
        })?;

        debug!(
            definitions = definitions.len(),
            patterns = pattern_owners.len(),
            "Built definition registry"
        );

        Ok(DefinitionRegistry {
            definitions,
            by_id,
            patterns,
            pattern_owners,
        })
    }
}

fn collect_embedded_files<'a>(dir: &'a Dir<'a>, out: &mut Vec<(&'a Path, &'a str)>) -> Result<()> {
    for file in dir.files() {
        if file.path().extension().is_some_and(|ext| ext == "json") {
            let content = file.contents_utf8().ok_or_else(|| SchemaError::InvalidDefinition {
                id: file.path().display().to_string(),
                reason: "file is not valid UTF-8".to_string(),
            })?;
            out.push((file.path(), content));
        }
    }
    for sub in dir.dirs() {
        collect_embedded_files(sub, out)?;
    }
    Ok(())
}

fn collect_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn def(id: &str, patterns: &[&str]) -> VersionedSchemaDefinition {
        patterns
            .iter()
            .fold(VersionedSchemaDefinition::new(id, json!({"type": "object"})), |d, p| {
                d.with_pattern(*p)
            })
    }

    fn registry() -> DefinitionRegistry {
        DefinitionRegistry::builder()
            .register(def("blocks", &["**/behavior_pack/blocks/**/*.json"]))
            .register(def("items", &["**/behavior_pack/items/**/*.json"]))
            .register(def("sounds", &["**/resource_pack/sounds/sound_definitions.json"]))
            .build()
            .unwrap()
    }

    fn resolved_id(registry: &DefinitionRegistry, path: &str) -> Option<String> {
        registry.resolve(path).unwrap().map(|d| d.id.clone())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(r".\behavior_pack\blocks\stone.json"),
            "behavior_pack/blocks/stone.json"
        );
        assert_eq!(normalize_path("/a//b/./c.json"), "a/b/c.json");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_matcher_precedence() {
        let registry = registry();
        assert_eq!(
            resolved_id(&registry, "behavior_pack/blocks/stone.json").as_deref(),
            Some("blocks")
        );
        assert_eq!(
            resolved_id(&registry, "addon/behavior_pack/blocks/nature/stone.json").as_deref(),
            Some("blocks")
        );
        assert_eq!(
            resolved_id(&registry, "behavior_pack/items/apple.json").as_deref(),
            Some("items")
        );
        assert_eq!(
            resolved_id(&registry, "resource_pack/sounds/sound_definitions.json").as_deref(),
            Some("sounds")
        );
    }

    #[test]
    fn test_unknown_category_is_none() {
        let registry = registry();
        assert_eq!(resolved_id(&registry, "behavior_pack/manifest.json"), None);
        assert_eq!(resolved_id(&registry, "resource_pack/sounds/other.json"), None);
        assert_eq!(resolved_id(&registry, "behavior_pack/blocks/stone.txt"), None);
    }

    #[test]
    fn test_ambiguous_match() {
        let registry = DefinitionRegistry::builder()
            .register(def("blocks", &["**/blocks/*.json"]))
            .register(def("legacy_blocks", &["**/behavior_pack/blocks/*.json"]))
            .build()
            .unwrap();

        match registry.resolve("behavior_pack/blocks/stone.json") {
            Err(SchemaError::AmbiguousFileMatch { path, definitions }) => {
                assert_eq!(path, "behavior_pack/blocks/stone.json");
                assert_eq!(definitions, ["blocks", "legacy_blocks"]);
            }
            other => panic!("Expected AmbiguousFileMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_overlapping_patterns_of_one_definition() {
        let registry = DefinitionRegistry::builder()
            .register(def("blocks", &["**/blocks/*.json", "**/behavior_pack/blocks/**/*.json"]))
            .build()
            .unwrap();
        assert_eq!(
            resolved_id(&registry, "behavior_pack/blocks/stone.json").as_deref(),
            Some("blocks")
        );
    }

    #[test]
    fn test_all_placeholder() {
        let registry = DefinitionRegistry::builder()
            .register(def("recipes", &["**/behavior_pack/recipes/<all>.json"]))
            .build()
            .unwrap();
        assert!(registry.resolve("behavior_pack/recipes/bread.json").unwrap().is_some());
        assert!(registry.resolve("behavior_pack/recipes/nested/bread.json").unwrap().is_none());
    }

    #[test]
    fn test_case_insensitive_matching() {
        let registry = DefinitionRegistry::builder()
            .register(def("blocks", &["**/behavior_pack/blocks/**/*.json"]))
            .case_insensitive(true)
            .build()
            .unwrap();
        assert!(registry.resolve("Behavior_Pack/Blocks/Stone.JSON").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_definition() {
        let result = DefinitionRegistry::builder()
            .register(def("blocks", &["**/a/*.json"]))
            .register(def("blocks", &["**/b/*.json"]))
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateDefinition(id)) if id == "blocks"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = DefinitionRegistry::builder()
            .register(def("broken", &["**/blocks/[a.json"]))
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_strict_rejects_lint_errors() {
        let result = DefinitionRegistry::builder()
            .register(def("no_patterns", &[]))
            .strict(true)
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_get_by_id() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("items").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("bp");
        fs::create_dir_all(&nested).unwrap();
        let content = serde_json::to_string(&def("loot", &["**/loot_tables/**/*.json"])).unwrap();
        fs::write(nested.join("loot.json"), content).unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let registry = DefinitionRegistry::builder().load_dir(dir.path()).unwrap().build().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            resolved_id(&registry, "behavior_pack/loot_tables/chests/village.json").as_deref(),
            Some("loot")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_load_dir_ignores_symlink_loop() {
        let dir = tempdir().unwrap();
        let content = serde_json::to_string(&def("d", &["**/d/*.json"])).unwrap();
        fs::write(dir.path().join("def.json"), content).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let registry = DefinitionRegistry::builder()
            .with_builtin()
            .unwrap()
            .load_dir(dir.path())
            .unwrap()
            .build()
            .unwrap();
        assert!(registry.get("d").is_some());
        assert!(registry.get("behavior_pack/blocks").is_some());
    }

    #[test]
    fn test_load_dir_reports_bad_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let result = DefinitionRegistry::builder().load_dir(dir.path());
        assert!(matches!(result, Err(SchemaError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_embedded_non_utf8_is_reported() {
        use include_dir::{DirEntry, File};

        static ENTRIES: [DirEntry<'static>; 1] =
            [DirEntry::File(File::new("bad.json", &[0xff, 0xfe, 0xfd]))];
        let dir = Dir::new("", &ENTRIES);

        let mut files = Vec::new();
        let result = collect_embedded_files(&dir, &mut files);
        assert!(matches!(
            result,
            Err(SchemaError::InvalidDefinition { id, .. }) if id == "bad.json"
        ));
    }

    #[test]
    fn test_builtin_definitions_are_clean() {
        let registry = DefinitionRegistry::builder()
            .with_builtin()
            .unwrap()
            .strict(true)
            .build()
            .unwrap();
        assert!(!registry.is_empty());
    }
}
