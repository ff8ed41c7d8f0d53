//! Product version ordinals
//!
//! Versions are dotted integer tuples of any length (`1.21`, `1.21.90`,
//! `1.21.100`). They compare component-wise as integers, with missing trailing
//! components treated as zero, so `1.21 == 1.21.0 < 1.21.1 < 1.21.90 < 1.21.100`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::SchemaError;

/// A parsed, comparable product version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionOrdinal {
    components: Vec<u64>,
}

impl VersionOrdinal {
    /// Parse a dotted integer version string
    pub fn parse(input: &str) -> Result<Self, SchemaError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::InvalidVersionString(input.to_string()));
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                // `u64::from_str` accepts a leading '+', which is not a version digit
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SchemaError::InvalidVersionString(input.to_string()))?;

        Ok(Self { components })
    }

    /// Build a version directly from its components
    pub fn from_components(components: impl Into<Vec<u64>>) -> Self {
        Self {
            components: components.into(),
        }
    }

    /// The version that marks a preview change set as unconditional.
    ///
    /// A preview change set declared at this version applies to every preview
    /// materialization, whatever the target version.
    pub fn unconditional_preview() -> Self {
        Self::from_components([1, 0, 0])
    }

    /// Whether this is the unconditional preview marker
    pub fn is_unconditional_preview(&self) -> bool {
        *self == Self::unconditional_preview()
    }

    /// The components as parsed
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Whether this version is at or below `upper_inclusive`
    pub fn in_range(&self, upper_inclusive: &VersionOrdinal) -> bool {
        self <= upper_inclusive
    }

    /// Components with insignificant trailing zeros dropped
    fn significant(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |idx| idx + 1);
        &self.components[..len]
    }
}

/// Compare two versions, padding the shorter one with zeros
pub fn compare(a: &VersionOrdinal, b: &VersionOrdinal) -> Ordering {
    a.cmp(b)
}

impl Ord for VersionOrdinal {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| {
                let lhs = self.components.get(i).copied().unwrap_or(0);
                let rhs = other.components.get(i).copied().unwrap_or(0);
                lhs.cmp(&rhs)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionOrdinal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionOrdinal {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for VersionOrdinal {}

impl Hash for VersionOrdinal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl fmt::Display for VersionOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for VersionOrdinal {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionOrdinal {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionOrdinal> for String {
    fn from(version: VersionOrdinal) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> VersionOrdinal {
        VersionOrdinal::parse(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        assert_eq!(v("1.21.90").components(), &[1, 21, 90]);
        assert_eq!(v(" 1.2 ").components(), &[1, 2]);
        assert_eq!(v("7").components(), &[7]);
    }

    #[test]
    fn test_invalid_versions() {
        for bad in ["", "   ", "1..2", "1.2.", ".1", "1.a", "v1.2", "1.-2", "1.+2", "1.2 .3"] {
            assert!(
                matches!(VersionOrdinal::parse(bad), Err(SchemaError::InvalidVersionString(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(VersionOrdinal::parse("1.99999999999999999999999").is_err());
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        assert_eq!(compare(&v("1.21.100"), &v("1.21.90")), Ordering::Greater);
        assert_eq!(compare(&v("1.9"), &v("1.10")), Ordering::Less);
    }

    #[test]
    fn test_padding_aware_equality() {
        assert_eq!(v("1.21"), v("1.21.0"));
        assert_eq!(compare(&v("1.21"), &v("1.21.0.0")), Ordering::Equal);
        assert!(v("1.21") < v("1.21.1"));

        let set: HashSet<_> = [v("1.21"), v("1.21.0"), v("1.21.0.0")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_in_range() {
        assert!(v("1.20.80").in_range(&v("1.21")));
        assert!(v("1.21.0").in_range(&v("1.21")));
        assert!(!v("1.21.1").in_range(&v("1.21")));
    }

    #[test]
    fn test_unconditional_preview_marker() {
        assert!(v("1.0.0").is_unconditional_preview());
        assert!(v("1").is_unconditional_preview());
        assert!(!v("1.0.1").is_unconditional_preview());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(v("1.21.90").to_string(), "1.21.90");
        let json = serde_json::to_string(&v("1.20")).unwrap();
        assert_eq!(json, "\"1.20\"");
        let back: VersionOrdinal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.20"));
        assert!(serde_json::from_str::<VersionOrdinal>("\"1.x\"").is_err());
    }
}
