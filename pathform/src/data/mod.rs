//! Field catalog data structures and the flat/nested transformations.
//!
//! ## Architecture
//!
//! - [`kind`] - Field kinds, display constraints and value coercion
//! - [`field`] - Fields, wire entries and catalog validation
//! - [`schema`] - Catalog extraction from a JSON Schema
//! - [`row`] - Grouping of fields into depth-tagged display rows
//! - [`capture`] - Reading rendered controls back into typed values
//! - [`payload`] - Flat edits and the nested payload built from them

/// Field kinds and their constraints and coercion rules.
pub mod kind;

/// Fields and catalog validation.
pub mod field;

/// JSON Schema driven catalog extraction.
pub mod schema;

/// Display rows.
pub mod row;

/// Capture of rendered controls into flat edits.
pub mod capture;

/// Flat edits and nested payloads.
pub mod payload;

pub use capture::{Binding, CaptureError, capture};
pub use field::{Catalog, Field, FieldError, RawField};
pub use kind::{CoerceError, Constraints, Control, FieldKind, RawInput, Step};
pub use payload::{FlatEdit, PayloadTree};
pub use row::{FieldRow, Row, group};
