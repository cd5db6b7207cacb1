//! Conversion between wire documents and instances.
//!
//! Wire documents use serialized (wire) names; instances use client field
//! names. Both directions are driven by the schema tree:
//!
//! | Situation | Deserialize (wire -> instance) | Serialize (instance -> wire) |
//! |-----------|--------------------------------|------------------------------|
//! | Unknown field | Dropped | Dropped |
//! | `null` on nullable node | Kept | Kept |
//! | `null` on other node | Field absent | Field absent |
//! | Read-only field | Kept | Dropped for requests |
//! | Client-only field | Ignored | Never written |
//! | Wrong JSON type | `SchemaMismatch` | `SchemaMismatch` |

use serde_json::{Map, Value};

use crate::error::OperationError;
use crate::schema::{NodeKind, SchemaNode};
use crate::types::{json_type_name, Direction};

/// Deserialize a wire document into an instance conforming to `node`.
///
/// # Errors
///
/// Returns `OperationError::SchemaMismatch` when the document's shape
/// contradicts the schema.
pub fn deserialize(node: &SchemaNode, wire: &Value) -> Result<Value, OperationError> {
    from_wire(node, wire, "")?.ok_or_else(|| mismatch(node, wire, ""))
}

/// Serialize an instance into a wire document for the given direction.
///
/// Requests drop read-only fields; responses keep them.
///
/// # Errors
///
/// Returns `OperationError::SchemaMismatch` when the instance does not
/// conform to the schema.
pub fn serialize(
    node: &SchemaNode,
    instance: &Value,
    direction: Direction,
) -> Result<Value, OperationError> {
    let writer = Writer {
        direction,
        flatten: false,
    };
    Ok(writer.write(node, instance, "")?.unwrap_or(Value::Null))
}

/// Render an instance for display: wire names, read-only fields kept and
/// client-flatten objects lifted into their parent.
pub fn render_output(node: &SchemaNode, instance: &Value) -> Result<Value, OperationError> {
    let writer = Writer {
        direction: Direction::Response,
        flatten: true,
    };
    Ok(writer.write(node, instance, "")?.unwrap_or(Value::Null))
}

fn from_wire(node: &SchemaNode, wire: &Value, path: &str) -> Result<Option<Value>, OperationError> {
    if wire.is_null() {
        return Ok(node.is_nullable().then_some(Value::Null));
    }

    match node.kind() {
        NodeKind::String | NodeKind::Int | NodeKind::Float | NodeKind::Bool => {
            if scalar_matches(node, wire) {
                Ok(Some(wire.clone()))
            } else {
                Err(mismatch(node, wire, path))
            }
        }
        NodeKind::Object(fields) | NodeKind::Identity(fields) => {
            let obj = wire.as_object().ok_or_else(|| mismatch(node, wire, path))?;
            let mut result = Map::new();
            for (name, child) in fields {
                if child.is_client_only() {
                    continue;
                }
                let wire_name = child.wire_name_for(name);
                let Some(value) = obj.get(wire_name) else {
                    continue;
                };
                let child_path = format!("{}/{}", path, wire_name);
                if let Some(value) = from_wire(child, value, &child_path)? {
                    result.insert(name.clone(), value);
                }
            }
            Ok(Some(Value::Object(result)))
        }
        NodeKind::List(element) => {
            let arr = wire.as_array().ok_or_else(|| mismatch(node, wire, path))?;
            let mut result = Vec::with_capacity(arr.len());
            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}/{}", path, i);
                // Dropping an element would shift every later index.
                match from_wire(element, item, &item_path)? {
                    Some(value) => result.push(value),
                    None => return Err(mismatch(element, item, &item_path)),
                }
            }
            Ok(Some(Value::Array(result)))
        }
        NodeKind::Dict(element) => {
            let obj = wire.as_object().ok_or_else(|| mismatch(node, wire, path))?;
            let mut result = Map::new();
            for (key, item) in obj {
                let item_path = format!("{}/{}", path, key);
                if let Some(value) = from_wire(element, item, &item_path)? {
                    result.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(result)))
        }
    }
}

struct Writer {
    direction: Direction,
    flatten: bool,
}

impl Writer {
    fn write(
        &self,
        node: &SchemaNode,
        instance: &Value,
        path: &str,
    ) -> Result<Option<Value>, OperationError> {
        if instance.is_null() {
            return Ok(node.is_nullable().then_some(Value::Null));
        }

        match node.kind() {
            NodeKind::String | NodeKind::Int | NodeKind::Float | NodeKind::Bool => {
                if scalar_matches(node, instance) {
                    Ok(Some(instance.clone()))
                } else {
                    Err(mismatch(node, instance, path))
                }
            }
            NodeKind::Object(fields) | NodeKind::Identity(fields) => {
                let obj = instance
                    .as_object()
                    .ok_or_else(|| mismatch(node, instance, path))?;
                let mut result = Map::new();
                for (name, child) in fields {
                    if child.is_client_only()
                        || (child.is_read_only() && !self.direction.includes_read_only())
                    {
                        continue;
                    }
                    let Some(value) = obj.get(name) else {
                        continue;
                    };
                    let wire_name = child.wire_name_for(name);
                    let child_path = format!("{}/{}", path, wire_name);
                    let Some(value) = self.write(child, value, &child_path)? else {
                        continue;
                    };
                    match value {
                        Value::Object(lifted) if self.flatten && child.is_client_flatten() => {
                            for (key, inner) in lifted {
                                result.entry(key).or_insert(inner);
                            }
                        }
                        value => {
                            result.insert(wire_name.to_string(), value);
                        }
                    }
                }
                Ok(Some(Value::Object(result)))
            }
            NodeKind::List(element) => {
                let arr = instance
                    .as_array()
                    .ok_or_else(|| mismatch(node, instance, path))?;
                let mut result = Vec::with_capacity(arr.len());
                for (i, item) in arr.iter().enumerate() {
                    let item_path = format!("{}/{}", path, i);
                    match self.write(element, item, &item_path)? {
                        Some(value) => result.push(value),
                        None => return Err(mismatch(element, item, &item_path)),
                    }
                }
                Ok(Some(Value::Array(result)))
            }
            NodeKind::Dict(element) => {
                let obj = instance
                    .as_object()
                    .ok_or_else(|| mismatch(node, instance, path))?;
                let mut result = Map::new();
                for (key, item) in obj {
                    let item_path = format!("{}/{}", path, key);
                    if let Some(value) = self.write(element, item, &item_path)? {
                        result.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(result)))
            }
        }
    }
}

fn scalar_matches(node: &SchemaNode, value: &Value) -> bool {
    match node.kind() {
        NodeKind::String => value.is_string(),
        NodeKind::Int => value.is_i64() || value.is_u64(),
        NodeKind::Float => value.is_number(),
        NodeKind::Bool => value.is_boolean(),
        _ => false,
    }
}

fn mismatch(node: &SchemaNode, value: &Value, path: &str) -> OperationError {
    let path = if path.is_empty() { "/" } else { path };
    OperationError::mismatch(
        path,
        format!(
            "expected {}, got {}",
            node.type_name(),
            json_type_name(value)
        ),
    )
}
