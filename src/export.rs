//! Export a schema tree as standard JSON Schema for one direction.
//!
//! | Field flag | Request | Response |
//! |------------|---------|----------|
//! | read-only | Omitted | Kept, `readOnly: true` |
//! | required | In `required` | In `required` |
//! | client-only | Omitted | Omitted |
//! | nullable | `type: [T, "null"]` | `type: [T, "null"]` |

use serde_json::{json, Map, Value};

use crate::schema::{NodeKind, SchemaNode};
use crate::types::Direction;

/// Build the JSON Schema a wire document of `direction` must satisfy.
pub fn to_json_schema(node: &SchemaNode, direction: Direction) -> Value {
    let mut schema = export_node(node, direction);
    if let Value::Object(map) = &mut schema {
        map.insert(
            "$schema".to_string(),
            json!("https://json-schema.org/draft/2020-12/schema"),
        );
    }
    schema
}

fn export_node(node: &SchemaNode, direction: Direction) -> Value {
    let mut result = Map::new();

    let type_name = match node.kind() {
        NodeKind::String => "string",
        NodeKind::Int => "integer",
        NodeKind::Float => "number",
        NodeKind::Bool => "boolean",
        NodeKind::List(_) => "array",
        NodeKind::Object(_) | NodeKind::Identity(_) | NodeKind::Dict(_) => "object",
    };
    let type_value = if node.is_nullable() {
        json!([type_name, "null"])
    } else {
        json!(type_name)
    };
    result.insert("type".to_string(), type_value);

    match node.kind() {
        NodeKind::Object(fields) | NodeKind::Identity(fields) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for (name, child) in fields {
                if child.is_client_only()
                    || (child.is_read_only() && !direction.includes_read_only())
                {
                    continue;
                }
                let wire_name = child.wire_name_for(name).to_string();
                let mut exported = export_node(child, direction);
                if child.is_read_only() {
                    if let Value::Object(map) = &mut exported {
                        map.insert("readOnly".to_string(), Value::Bool(true));
                    }
                }
                if child.is_required() {
                    required.push(Value::String(wire_name.clone()));
                }
                properties.insert(wire_name, exported);
            }
            result.insert("properties".to_string(), Value::Object(properties));
            if !required.is_empty() {
                result.insert("required".to_string(), Value::Array(required));
            }
        }
        NodeKind::List(element) => {
            result.insert("items".to_string(), export_node(element, direction));
        }
        NodeKind::Dict(element) => {
            result.insert(
                "additionalProperties".to_string(),
                export_node(element, direction),
            );
        }
        _ => {}
    }

    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> SchemaNode {
        SchemaNode::object()
            .field("id", SchemaNode::string().read_only())
            .field("location", SchemaNode::string().required())
            .field("tags", SchemaNode::dict(SchemaNode::string()))
            .field(
                "identity",
                SchemaNode::identity().field("type", SchemaNode::string().required()),
            )
    }

    #[test]
    fn request_omits_read_only() {
        let schema = to_json_schema(&resource(), Direction::Request);
        assert!(schema["properties"].get("id").is_none());
        assert_eq!(schema["required"], json!(["location"]));
    }

    #[test]
    fn response_marks_read_only() {
        let schema = to_json_schema(&resource(), Direction::Response);
        assert_eq!(schema["properties"]["id"]["readOnly"], true);
    }

    #[test]
    fn client_only_fields_never_exported() {
        let schema = to_json_schema(&resource(), Direction::Response);
        let identity = &schema["properties"]["identity"]["properties"];
        assert!(identity.get("system_assigned").is_none());
        assert!(identity.get("user_assigned").is_none());
        assert!(identity.get("type").is_some());
    }

    #[test]
    fn dict_uses_additional_properties() {
        let schema = to_json_schema(&resource(), Direction::Request);
        assert_eq!(
            schema["properties"]["tags"],
            json!({ "type": "object", "additionalProperties": { "type": "string" } })
        );
    }

    #[test]
    fn nullable_allows_null() {
        let node = SchemaNode::dict(SchemaNode::object().nullable());
        let schema = to_json_schema(&node, Direction::Request);
        assert_eq!(
            schema["additionalProperties"]["type"],
            json!(["object", "null"])
        );
    }

    #[test]
    fn top_level_declares_dialect() {
        let schema = to_json_schema(&SchemaNode::string(), Direction::Request);
        assert_eq!(
            schema["$schema"],
            "https://json-schema.org/draft/2020-12/schema"
        );
    }
}
