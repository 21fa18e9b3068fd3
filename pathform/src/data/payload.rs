//! Reconstruction of a nested payload from flat path/value pairs.
//!
//! Paths that collide at a leaf/branch boundary (one path being a strict
//! prefix of another) are resolved last-write-wins in insertion order:
//!
//! - a leaf written under an existing leaf replaces that leaf with a branch;
//! - a leaf written at an existing branch replaces the whole branch.
//!
//! Nothing is reported in either case.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::data::field::PATH_SEPARATOR;

/// Edited values keyed by field path, in capture order.
///
/// Keys are unique; inserting an existing path replaces its value in place.
/// Two edits are equal when they map the same paths to the same values,
/// whatever their order.
#[derive(Debug, Clone, Default)]
pub struct FlatEdit {
    entries: Vec<(String, Value)>,
}

impl FlatEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `path`, returning the previous one.
    pub fn insert(&mut self, path: impl Into<String>, value: Value) -> Option<Value> {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.entries.push((path, value));
                None
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FlatEdit {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(path, value)| other.get(path) == Some(value))
    }
}

impl<P: Into<String>> FromIterator<(P, Value)> for FlatEdit {
    fn from_iter<T: IntoIterator<Item = (P, Value)>>(iter: T) -> Self {
        let mut edit = FlatEdit::new();
        for (path, value) in iter {
            edit.insert(path, value);
        }
        edit
    }
}

impl IntoIterator for FlatEdit {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FlatEdit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Nested configuration built from a [`FlatEdit`], keyed by path segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PayloadTree(Map<String, Value>);

impl PayloadTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unflatten `edit` into a fresh tree.
    pub fn from_flat(edit: &FlatEdit) -> Self {
        let mut tree = PayloadTree::new();
        for (path, value) in edit.iter() {
            tree.set(path, value.clone());
        }
        tree
    }

    /// Set the leaf at `path`, creating intermediate branches as needed.
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        set_in(&mut self.0, &segments, value);
    }

    /// Value at `path`, leaf or branch.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let first = self.0.get(segments.next()?)?;
        segments.try_fold(first, |node, seg| node.get(seg))
    }

    /// Flatten back into path/value pairs, in tree order.
    pub fn flatten(&self) -> FlatEdit {
        let mut edit = FlatEdit::new();
        flatten_into(&self.0, "", &mut edit);
        edit
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&FlatEdit> for PayloadTree {
    fn from(edit: &FlatEdit) -> Self {
        PayloadTree::from_flat(edit)
    }
}

impl From<PayloadTree> for Value {
    fn from(tree: PayloadTree) -> Self {
        tree.into_value()
    }
}

impl TryFrom<Value> for PayloadTree {
    type Error = Value;

    /// Only objects are trees; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(PayloadTree(map)),
            other => Err(other),
        }
    }
}

/// Write `value` at `segments` below `node`. Missing or non-object
/// intermediates become objects in place.
fn set_in(node: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            node.insert(leaf.to_string(), value);
        }
        [seg, rest @ ..] => {
            let slot = node.entry(*seg).or_insert(Value::Null);
            let mut child = match std::mem::take(slot) {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            set_in(&mut child, rest, value);
            *slot = Value::Object(child);
        }
    }
}

/// Flatten any JSON value into leaf paths. Non-object roots yield nothing.
pub fn flatten_value(value: &Value) -> FlatEdit {
    let mut edit = FlatEdit::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut edit);
    }
    edit
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut FlatEdit) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{key}")
        };
        match value {
            Value::Object(child) => flatten_into(child, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}
