//! # pathform
//!
//! Terminal forms for configuration described as a flat list of
//! path-addressed fields.
//!
//! A catalog entry such as `{"path": "server.port", "kind": "int32"}` is
//! rendered as a control under a `/server` heading. Saving the form reads
//! every control back, coerces it to its kind, and rebuilds the nested
//! payload `{"server": {"port": 8080}}` for submission.
//!
//! ## Features
//!
//! - Field catalogs fetched from a remote server or extracted from a JSON Schema
//! - Hierarchical display with per-depth indentation
//! - Kind-aware controls with integer bounds and float validation
//! - TOML and JSON configuration files with optional backups
//! - A small HTTP server exposing a config to remote editors (`web` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use pathform::data::{Catalog, FlatEdit, PayloadTree, group};
//! use serde_json::json;
//!
//! let catalog = Catalog::from_json(
//!     r#"[{"path": "server.port", "kind": "int32", "name": "Port", "value": 8080}]"#,
//! )
//! .unwrap();
//! let rows = group(&catalog.fields);
//! assert_eq!(rows.len(), 2);
//!
//! let edit: FlatEdit = [("server.port".to_string(), json!(9090))].into_iter().collect();
//! let tree = PayloadTree::from_flat(&edit);
//! assert_eq!(tree.into_value(), json!({"server": {"port": 9090}}));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Catalogs, rows, coercion and payload reconstruction
//! - [`store`] - Config file formats and persistence
//! - [`manager`] - Live config with validation and change callbacks
//! - [`sync`] - Catalog fetch and payload submission
//! - [`ui`] - Cursive form rendering
//! - [`run`] - Editor entry points
//! - [`web`] - HTTP config server (requires `web` feature)

#[macro_use]
extern crate log;

/// Field catalogs and the flat/nested transformations.
pub mod data;

/// Live configuration state.
pub mod manager;

/// Editor entry points.
pub mod run;

/// Config file persistence.
pub mod store;

/// Catalog fetch and payload submission.
pub mod sync;

/// Cursive form rendering.
pub mod ui;

/// HTTP server for remote configuration editing.
///
/// This module is only available when the `web` feature is enabled.
#[cfg(feature = "web")]
pub mod web;

pub use manager::ConfigManager;
pub use run::*;
pub use serde_json::Value;
