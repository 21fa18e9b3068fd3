//! Catalog extraction from a JSON Schema and a current config value.
//!
//! Object properties become sections, scalar properties become fields.
//! Property order of the schema is the catalog order.

use serde_json::{Map, Value};

use crate::data::{
    field::{Field, PATH_SEPARATOR},
    kind::FieldKind,
};

/// Maximum number of `$ref`/`allOf` hops followed for one property.
const MAX_REF_DEPTH: usize = 32;

/// Schema shapes the extractor cannot work with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema root is not an object schema")]
    NotAnObject,
    #[error("unresolved schema reference `{0}`")]
    UnresolvedRef(String),
    #[error("schema reference chain too deep at `{0}`")]
    RefTooDeep(String),
}

/// List the editable fields described by `schema`, valued from `value`.
///
/// Unsupported property types are skipped with a warning.
pub fn extract_fields(schema: &Value, value: &Value) -> Result<Vec<Field>, SchemaError> {
    let mut walker = Walker {
        root: schema,
        fields: Vec::new(),
    };
    let root = walker.resolve(schema, "")?;
    let props = properties(root).ok_or(SchemaError::NotAnObject)?;
    walker.walk(props, "", Some(value))?;
    Ok(walker.fields)
}

struct Walker<'a> {
    root: &'a Value,
    fields: Vec<Field>,
}

impl<'a> Walker<'a> {
    fn walk(
        &mut self,
        props: &'a Map<String, Value>,
        prefix: &str,
        value: Option<&Value>,
    ) -> Result<(), SchemaError> {
        for (key, prop) in props {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}{PATH_SEPARATOR}{key}")
            };
            let current = value.and_then(|v| v.get(key));
            let resolved = self.resolve(prop, &path)?;

            if let Some(children) = properties(resolved) {
                self.walk(children, &path, current)?;
                continue;
            }

            let Some(kind) = kind_of(resolved) else {
                warn!(
                    "Field type {} not supported for field {path:?}",
                    type_name(resolved)
                );
                continue;
            };

            let value = current
                .or_else(|| prop.get("default"))
                .or_else(|| resolved.get("default"))
                .cloned()
                .unwrap_or_else(|| kind.zero_value());

            let name = label(prop)
                .or_else(|| label(resolved))
                .unwrap_or_else(|| key.clone());

            self.fields.push(Field::new(path, kind, name, value));
        }
        Ok(())
    }

    /// Follow `$ref` pointers and single-entry `allOf` wrappers.
    fn resolve(&self, mut schema: &'a Value, path: &str) -> Result<&'a Value, SchemaError> {
        for _ in 0..MAX_REF_DEPTH {
            if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
                schema = self.lookup(reference)?;
                continue;
            }
            if let Some([inner]) = schema.get("allOf").and_then(Value::as_array).map(Vec::as_slice)
            {
                schema = inner;
                continue;
            }
            return Ok(schema);
        }
        Err(SchemaError::RefTooDeep(path.to_string()))
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value, SchemaError> {
        reference
            .strip_prefix('#')
            .and_then(|pointer| self.root.pointer(pointer))
            .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))
    }
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties")?.as_object()
}

fn kind_of(schema: &Value) -> Option<FieldKind> {
    let format = schema.get("format").and_then(Value::as_str);
    let kind = match schema.get("type")?.as_str()? {
        "boolean" => FieldKind::Bool,
        "string" => FieldKind::String,
        "integer" => match format {
            Some("int8") => FieldKind::Int8,
            Some("int16") => FieldKind::Int16,
            Some("int32") => FieldKind::Int32,
            Some("int64") => FieldKind::Int64,
            Some("int") => FieldKind::Int,
            Some("uint8") => FieldKind::Uint8,
            Some("uint16") => FieldKind::Uint16,
            Some("uint32") => FieldKind::Uint32,
            Some("uint64") => FieldKind::Uint64,
            Some("uint") => FieldKind::Uint,
            _ if schema
                .get("minimum")
                .and_then(Value::as_f64)
                .is_some_and(|min| min >= 0.0) =>
            {
                FieldKind::Uint64
            }
            _ => FieldKind::Int64,
        },
        "number" => match format {
            Some("float") => FieldKind::Float32,
            _ => FieldKind::Float64,
        },
        _ => return None,
    };
    Some(kind)
}

fn label(schema: &Value) -> Option<String> {
    if let Some(title) = schema.get("title").and_then(Value::as_str) {
        return Some(title.to_string());
    }
    let line = schema
        .get("description")
        .and_then(Value::as_str)?
        .lines()
        .next()?
        .trim()
        .trim_end_matches('.');
    (!line.is_empty()).then(|| line.to_string())
}

fn type_name(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None if schema.get("enum").is_some() => "enum".to_string(),
        None if schema.get("oneOf").is_some() || schema.get("anyOf").is_some() => {
            "union".to_string()
        }
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize, JsonSchema)]
    struct TestConf {
        app_name: String,
        version: f32,
        /// Enable verbose output.
        debug: bool,
        database: TestDatabaseConf,
        tags: Vec<String>,
    }

    #[derive(Serialize, JsonSchema)]
    struct TestDatabaseConf {
        adapter: String,
        host: String,
        port: u16,
        pool: i64,
        timeout: f64,
    }

    fn conf() -> TestConf {
        TestConf {
            app_name: "Confection".into(),
            version: 1.5,
            debug: true,
            database: TestDatabaseConf {
                adapter: "mysql".into(),
                host: "localhost".into(),
                port: 3306,
                pool: -1,
                timeout: 2.5,
            },
            tags: vec![],
        }
    }

    #[test]
    fn test_extract_typed_config() {
        let schema = serde_json::to_value(schemars::schema_for!(TestConf)).unwrap();
        let value = serde_json::to_value(conf()).unwrap();
        let fields = extract_fields(&schema, &value).unwrap();

        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.path.as_str(), f.kind, f.value.clone()))
            .collect();
        assert_eq!(
            summary,
            [
                ("app_name", FieldKind::String, json!("Confection")),
                ("version", FieldKind::Float32, json!(1.5)),
                ("debug", FieldKind::Bool, json!(true)),
                ("database.adapter", FieldKind::String, json!("mysql")),
                ("database.host", FieldKind::String, json!("localhost")),
                ("database.port", FieldKind::Uint16, json!(3306)),
                ("database.pool", FieldKind::Int64, json!(-1)),
                ("database.timeout", FieldKind::Float64, json!(2.5)),
            ]
        );
        assert_eq!(fields[2].name, "Enable verbose output");
        assert_eq!(fields[0].name, "app_name");
    }

    #[test]
    fn test_missing_values_fall_back() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "title": "Name", "default": "svc"},
                "retries": {"type": "integer", "minimum": 0},
                "offset": {"type": "integer"},
                "ratio": {"type": "number"}
            }
        });
        let fields = extract_fields(&schema, &json!({})).unwrap();
        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.kind, f.value.clone()))
            .collect();
        assert_eq!(
            summary,
            [
                ("Name", FieldKind::String, json!("svc")),
                ("retries", FieldKind::Uint64, json!(0)),
                ("offset", FieldKind::Int64, json!(0)),
                ("ratio", FieldKind::Float64, json!(0.0)),
            ]
        );
    }

    #[test]
    fn test_definitions_and_all_of() {
        let schema = json!({
            "type": "object",
            "properties": {
                "server": {"allOf": [{"$ref": "#/definitions/Server"}], "description": "Server"},
                "mode": {"type": "string", "enum": ["a", "b"]},
                "opt": {"type": ["integer", "null"]}
            },
            "definitions": {
                "Server": {
                    "type": "object",
                    "properties": {"port": {"type": "integer", "format": "uint16"}}
                }
            }
        });
        let value = json!({"server": {"port": 80}});
        let fields = extract_fields(&schema, &value).unwrap();
        let paths: Vec<_> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["server.port", "mode"]);
        assert_eq!(fields[0].value, json!(80));
    }

    #[test]
    fn test_schema_errors() {
        assert_eq!(
            extract_fields(&json!({"type": "string"}), &json!(null)),
            Err(SchemaError::NotAnObject)
        );
        let dangling = json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/$defs/Missing"}}
        });
        assert_eq!(
            extract_fields(&dangling, &json!({})),
            Err(SchemaError::UnresolvedRef("#/$defs/Missing".into()))
        );
        let cyclic = json!({
            "type": "object",
            "properties": {"a": {"$ref": "#/$defs/A"}},
            "$defs": {"A": {"$ref": "#/$defs/A"}}
        });
        assert_eq!(
            extract_fields(&cyclic, &json!({})),
            Err(SchemaError::RefTooDeep("a".into()))
        );
    }
}
