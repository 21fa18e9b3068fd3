use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::kind::FieldKind;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Validation failure for a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("invalid field type `{kind}` for `{path}`")]
    UnknownKind { path: String, kind: String },
    #[error("invalid field path `{path}`")]
    InvalidPath { path: String },
    #[error("duplicate field path `{path}`")]
    DuplicatePath { path: String },
    #[error("malformed catalog entry #{index}: {reason}")]
    Malformed { index: usize, reason: String },
}

/// One configurable setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Dot-separated path, unique across the catalog.
    pub path: String,
    pub kind: FieldKind,
    /// Human-readable label.
    pub name: String,
    /// Current value, typed per `kind`.
    pub value: Value,
}

/// A catalog entry as it travels over the wire, before the kind is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub path: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Field {
    pub fn new(
        path: impl Into<String>,
        kind: FieldKind,
        name: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            name: name.into(),
            value,
        }
    }

    /// Path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split(PATH_SEPARATOR)
    }

    /// Nesting depth: number of segments minus one.
    pub fn depth(&self) -> usize {
        self.segments().count() - 1
    }

    /// All segments but the last, or `None` for a top-level field.
    pub fn section(&self) -> Option<&str> {
        section_of(&self.path)
    }

    /// The last path segment.
    pub fn key(&self) -> &str {
        split_path(&self.path).1
    }
}

impl RawField {
    /// Decode entry `index` of a catalog array.
    ///
    /// A `kind` that is not a string is reported as an unknown kind of the
    /// entry's path; any other shape error makes the entry malformed.
    pub fn from_entry(index: usize, entry: Value) -> Result<Self, FieldError> {
        if let (Some(path), Some(kind)) = (
            entry.get("path").and_then(Value::as_str),
            entry.get("kind"),
        ) && !kind.is_string()
        {
            return Err(FieldError::UnknownKind {
                path: path.to_string(),
                kind: kind.to_string(),
            });
        }
        RawField::deserialize(entry).map_err(|e| FieldError::Malformed {
            index,
            reason: e.to_string(),
        })
    }
}

impl From<Field> for RawField {
    fn from(f: Field) -> Self {
        RawField {
            path: f.path,
            kind: f.kind.as_str().to_string(),
            name: f.name,
            value: f.value,
        }
    }
}

impl TryFrom<RawField> for Field {
    type Error = FieldError;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        if !is_valid_path(&raw.path) {
            return Err(FieldError::InvalidPath { path: raw.path });
        }
        let kind = match raw.kind.parse::<FieldKind>() {
            Ok(kind) => kind,
            Err(_) => {
                return Err(FieldError::UnknownKind {
                    path: raw.path,
                    kind: raw.kind,
                });
            }
        };
        Ok(Field {
            path: raw.path,
            kind,
            name: raw.name,
            value: raw.value,
        })
    }
}

/// Split a path into `(parents, leaf)`; `parents` is empty for a top-level path.
pub fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once(PATH_SEPARATOR).unwrap_or(("", path))
}

/// The section (parent path) of `path`, if any.
pub fn section_of(path: &str) -> Option<&str> {
    path.rsplit_once(PATH_SEPARATOR).map(|(section, _)| section)
}

/// A path is one or more non-empty segments.
pub fn is_valid_path(path: &str) -> bool {
    path.split(PATH_SEPARATOR).all(|seg| !seg.is_empty())
}

/// An immutable, validated list of fields for one load cycle.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub fields: Vec<Field>,
    /// Entries rejected during validation.
    pub diagnostics: Vec<FieldError>,
}

impl Catalog {
    /// Validate the entries of a catalog array one by one.
    ///
    /// Rejected entries are logged and recorded in [`Catalog::diagnostics`];
    /// the remaining entries keep their order.
    pub fn from_values(entries: impl IntoIterator<Item = Value>) -> Self {
        let mut fields = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let result = RawField::from_entry(index, entry)
                .and_then(Field::try_from)
                .and_then(|field| {
                    if seen.insert(field.path.clone()) {
                        Ok(field)
                    } else {
                        Err(FieldError::DuplicatePath { path: field.path })
                    }
                });
            match result {
                Ok(field) => fields.push(field),
                Err(e) => {
                    warn!("{e}, field skipped");
                    diagnostics.push(e);
                }
            }
        }

        Catalog {
            fields,
            diagnostics,
        }
    }

    /// Parse a JSON catalog array and validate each entry.
    ///
    /// Only a body that is not an array of values fails as a whole.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        let entries: Vec<Value> = serde_json::from_str(s)?;
        Ok(Self::from_values(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.path == path)
    }
}
