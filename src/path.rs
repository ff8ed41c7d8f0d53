//! Addressing locations inside a schema tree
//!
//! A [`SchemaPath`] is a sequence of object keys and array indices. The
//! functions in this module are the only way the patch engine touches a tree:
//! [`read`], [`write`] (add), [`replace`] (modify) and [`remove`].

use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::Map;
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::SchemaNode;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Position in an array
    Index(usize),
    /// Field of an object
    Key(String),
}

impl Segment {
    fn is_key(&self) -> bool {
        matches!(self, Segment::Key(_))
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// A location in a schema tree; the empty path is the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaPath {
    segments: Vec<Segment>,
}

impl SchemaPath {
    /// The root path
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parse an RFC 6901 JSON Pointer.
    ///
    /// Tokens made only of digits (without a leading zero) become array indices.
    pub fn from_pointer(pointer: &str) -> Result<Self> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = pointer.strip_prefix('/') else {
            return Err(SchemaError::path_not_found(pointer, "JSON pointer must start with '/'"));
        };

        let segments = rest
            .split('/')
            .map(|token| {
                let is_index = !token.is_empty()
                    && token.bytes().all(|b| b.is_ascii_digit())
                    && (token == "0" || !token.starts_with('0'));
                match token.parse::<usize>() {
                    Ok(index) if is_index => Segment::Index(index),
                    _ => Segment::Key(token.replace("~1", "/").replace("~0", "~")),
                }
            })
            .collect();

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend the path by one segment
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Whether `self` is `other` or lies underneath it
    pub fn starts_with(&self, other: &SchemaPath) -> bool {
        self.segments.starts_with(&other.segments)
    }

    fn prefix(&self, len: usize) -> SchemaPath {
        Self {
            segments: self.segments[..len].to_vec(),
        }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Index(index) => write!(f, "/{}", index)?,
                Segment::Key(key) => write!(f, "/{}", key.replace('~', "~0").replace('/', "~1"))?,
            }
        }
        Ok(())
    }
}

impl<S: Into<Segment>> FromIterator<S> for SchemaPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into))
    }
}

fn kind(node: &SchemaNode) -> &'static str {
    match node {
        SchemaNode::Object(_) => "object",
        SchemaNode::Array(_) => "array",
        SchemaNode::String(_) => "string",
        SchemaNode::Number(_) => "number",
        SchemaNode::Bool(_) => "boolean",
        SchemaNode::Null => "null",
    }
}

fn step<'a>(
    node: &'a SchemaNode,
    segment: &Segment,
) -> std::result::Result<&'a SchemaNode, String> {
    match (node, segment) {
        (SchemaNode::Object(map), Segment::Key(key)) => {
            map.get(key).ok_or_else(|| "key not present".to_string())
        }
        (SchemaNode::Array(items), Segment::Index(index)) => items
            .get(*index)
            .ok_or_else(|| format!("index out of bounds (len {})", items.len())),
        (node, Segment::Key(_)) => Err(format!("expected object, found {}", kind(node))),
        (node, Segment::Index(_)) => Err(format!("expected array, found {}", kind(node))),
    }
}

fn step_mut<'a>(
    node: &'a mut SchemaNode,
    segment: &Segment,
) -> std::result::Result<&'a mut SchemaNode, String> {
    match (node, segment) {
        (SchemaNode::Object(map), Segment::Key(key)) => {
            map.get_mut(key).ok_or_else(|| "key not present".to_string())
        }
        (SchemaNode::Array(items), Segment::Index(index)) => {
            let len = items.len();
            items
                .get_mut(*index)
                .ok_or_else(|| format!("index out of bounds (len {})", len))
        }
        (node, Segment::Key(_)) => Err(format!("expected object, found {}", kind(node))),
        (node, Segment::Index(_)) => Err(format!("expected array, found {}", kind(node))),
    }
}

/// Walk to the parent of the terminal segment without creating anything
fn parent_mut<'a>(tree: &'a mut SchemaNode, path: &SchemaPath) -> Result<&'a mut SchemaNode> {
    let parents = &path.segments[..path.len().saturating_sub(1)];
    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        current = step_mut(current, segment)
            .map_err(|reason| SchemaError::path_not_found(path.prefix(depth + 1), reason))?;
    }
    Ok(current)
}

/// Read the node at `path`
pub fn read<'a>(tree: &'a SchemaNode, path: &SchemaPath) -> Result<&'a SchemaNode> {
    let mut current = tree;
    for (depth, segment) in path.segments.iter().enumerate() {
        current = step(current, segment)
            .map_err(|reason| SchemaError::path_not_found(path.prefix(depth + 1), reason))?;
    }
    Ok(current)
}

/// Check that every parent of the terminal segment exists or can be created
fn check_parents(tree: &SchemaNode, path: &SchemaPath) -> Result<()> {
    let parents = &path.segments[..path.len().saturating_sub(1)];
    let mut current = Some(tree);
    for (depth, segment) in parents.iter().enumerate() {
        let next = match (current, segment) {
            // Below an object this write would create
            (None, _) => None,
            (Some(SchemaNode::Object(map)), Segment::Key(key)) => map.get(key),
            (Some(node), segment) => Some(
                step(node, segment)
                    .map_err(|reason| SchemaError::path_not_found(path.prefix(depth + 1), reason))?,
            ),
        };
        if next.is_none() && !path.segments[depth + 1].is_key() {
            return Err(SchemaError::path_not_found(
                path.prefix(depth + 1),
                "missing array container is never created implicitly",
            ));
        }
        current = next;
    }
    Ok(())
}

/// Set the node at `path`, creating missing intermediate objects.
///
/// Arrays are never created: a missing container that the next segment would
/// index into is an error. An existing terminal value is overwritten and
/// returned. An index equal to the array length appends. On error the tree is
/// left unchanged.
pub fn write(
    tree: &mut SchemaNode,
    path: &SchemaPath,
    value: SchemaNode,
) -> Result<Option<SchemaNode>> {
    let Some((last, parents)) = path.segments.split_last() else {
        return Ok(Some(std::mem::replace(tree, value)));
    };
    check_parents(tree, path)?;

    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let next_is_key = path.segments[depth + 1].is_key();
        current = match (current, segment) {
            (SchemaNode::Object(map), Segment::Key(key)) => match map.entry(key.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(_) if !next_is_key => {
                    return Err(SchemaError::path_not_found(
                        path.prefix(depth + 1),
                        "missing array container is never created implicitly",
                    ));
                }
                Entry::Vacant(entry) => entry.insert(SchemaNode::Object(Map::new())),
            },
            (node, segment) => step_mut(node, segment)
                .map_err(|reason| SchemaError::path_not_found(path.prefix(depth + 1), reason))?,
        };
    }

    match (current, last) {
        (SchemaNode::Object(map), Segment::Key(key)) => Ok(map.insert(key.clone(), value)),
        (SchemaNode::Array(items), Segment::Index(index)) => {
            if *index < items.len() {
                Ok(Some(std::mem::replace(&mut items[*index], value)))
            } else if *index == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Err(SchemaError::path_not_found(
                    path,
                    format!("index out of bounds (len {})", items.len()),
                ))
            }
        }
        (node, segment) => {
            let expected = if segment.is_key() { "object" } else { "array" };
            Err(SchemaError::path_not_found(
                path,
                format!("expected {}, found {}", expected, kind(node)),
            ))
        }
    }
}

/// Overwrite the node at `path`, which must already exist
pub fn replace(tree: &mut SchemaNode, path: &SchemaPath, value: SchemaNode) -> Result<SchemaNode> {
    let Some(last) = path.segments.last() else {
        return Ok(std::mem::replace(tree, value));
    };

    let parent = parent_mut(tree, path)?;
    let slot = step_mut(parent, last).map_err(|reason| SchemaError::path_not_found(path, reason))?;
    Ok(std::mem::replace(slot, value))
}

/// Delete the node at `path` if it exists.
///
/// Absent leaves and absent parents are both no-ops. The root is never removed.
pub fn remove(tree: &mut SchemaNode, path: &SchemaPath) -> Option<SchemaNode> {
    let last = path.segments.last()?;
    let parent = parent_mut(tree, path).ok()?;

    match (parent, last) {
        (SchemaNode::Object(map), Segment::Key(key)) => map.shift_remove(key),
        (SchemaNode::Array(items), Segment::Index(index)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}
