//! Reading rendered controls back into typed values.
//!
//! Every control is coerced by the kind of its field; one failure rejects
//! the whole capture.

use crate::data::{
    kind::{CoerceError, FieldKind, RawInput},
    payload::FlatEdit,
    row::{FieldRow, Row},
};

/// A rendered control bound to a field path, with its current raw state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub path: String,
    pub kind: FieldKind,
    pub input: RawInput,
}

impl Binding {
    pub fn new(path: impl Into<String>, kind: FieldKind, input: RawInput) -> Self {
        Self {
            path: path.into(),
            kind,
            input,
        }
    }
}

impl From<&FieldRow> for Binding {
    /// Binding holding the row's initial state.
    fn from(row: &FieldRow) -> Self {
        Binding::new(row.path.clone(), row.kind, row.initial.clone())
    }
}

/// Bindings for every field row, in row order.
pub fn bindings(rows: &[Row]) -> Vec<Binding> {
    rows.iter().filter_map(Row::as_field).map(Binding::from).collect()
}

/// Inputs that could not be coerced, with the reason for each.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {}", describe(.failures))]
pub struct CaptureError {
    pub failures: Vec<(String, CoerceError)>,
}

fn describe(failures: &[(String, CoerceError)]) -> String {
    failures
        .iter()
        .map(|(path, e)| format!("`{path}`: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coerce every binding into a [`FlatEdit`].
///
/// All bindings are checked; any failure rejects the whole capture so a
/// partially coerced form is never submitted.
pub fn capture(bindings: impl IntoIterator<Item = Binding>) -> Result<FlatEdit, CaptureError> {
    let mut edit = FlatEdit::new();
    let mut failures = Vec::new();

    for binding in bindings {
        match binding.kind.coerce(&binding.input) {
            Ok(value) => {
                edit.insert(binding.path, value);
            }
            Err(e) => {
                debug!("capture `{}` failed: {e}", binding.path);
                failures.push((binding.path, e));
            }
        }
    }

    if failures.is_empty() {
        Ok(edit)
    } else {
        Err(CaptureError { failures })
    }
}
