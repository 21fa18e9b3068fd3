//! Grouping of a flat field list into depth-tagged display rows.

use std::collections::HashSet;

use serde_json::Value;

use crate::data::{
    field::Field,
    kind::{Constraints, FieldKind, RawInput},
};

/// Everything a renderer needs to build the control of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub path: String,
    pub name: String,
    pub kind: FieldKind,
    pub constraints: Constraints,
    /// Initial state of the control.
    pub initial: RawInput,
    pub value: Value,
}

impl From<&Field> for FieldRow {
    fn from(field: &Field) -> Self {
        FieldRow {
            path: field.path.clone(),
            name: field.name.clone(),
            kind: field.kind,
            constraints: field.kind.constraints(),
            initial: field.kind.initial_input(&field.value),
            value: field.value.clone(),
        }
    }
}

/// One display unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Heading introducing a section.
    Section { path: String, depth: usize },
    /// Interactive field.
    Field { field: FieldRow, depth: usize },
}

impl Row {
    pub fn depth(&self) -> usize {
        match self {
            Row::Section { depth, .. } | Row::Field { depth, .. } => *depth,
        }
    }

    /// Leading padding for `unit` cells per depth level.
    pub fn indent(&self, unit: usize) -> usize {
        self.depth() * unit
    }

    /// Section heading text, `None` for field rows.
    pub fn heading(&self) -> Option<String> {
        match self {
            Row::Section { path, .. } => Some(format!("/{path}")),
            Row::Field { .. } => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldRow> {
        match self {
            Row::Field { field, .. } => Some(field),
            Row::Section { .. } => None,
        }
    }
}

/// Group fields into rows, preserving catalog order.
///
/// A section row is emitted once, right before the first field that
/// introduces it. Both rows share the depth of that field.
pub fn group(fields: &[Field]) -> Vec<Row> {
    let mut emitted = HashSet::new();
    let mut rows = Vec::with_capacity(fields.len());

    for field in fields {
        let depth = field.depth();
        if let Some(section) = field.section()
            && emitted.insert(section)
        {
            rows.push(Row::Section {
                path: section.to_string(),
                depth,
            });
        }
        rows.push(Row::Field {
            field: FieldRow::from(field),
            depth,
        });
    }

    rows
}
