//! Wire document validation against a schema tree.

use serde_json::Value;

use crate::error::{FieldError, OperationError};
use crate::export::to_json_schema;
use crate::schema::SchemaNode;
use crate::types::Direction;

/// Validate a request body before it is submitted.
///
/// # Errors
///
/// Returns `OperationError::Validation` listing every violation, typically
/// required fields that are still absent after the update.
pub fn validate_request(node: &SchemaNode, wire: &Value) -> Result<(), OperationError> {
    validate_against_schema(&to_json_schema(node, Direction::Request), wire)
}

/// Validate a response body received from the server.
///
/// A response that violates the schema means client and server disagree
/// on the contract, so failures surface as `SchemaMismatch`.
pub fn validate_response(node: &SchemaNode, wire: &Value) -> Result<(), OperationError> {
    validate_against_schema(&to_json_schema(node, Direction::Response), wire).map_err(|e| match e {
        OperationError::Validation { errors } => {
            let path = errors
                .first()
                .map(|e| e.path.clone())
                .unwrap_or_else(|| "/".to_string());
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            OperationError::SchemaMismatch {
                path,
                message: format!("response violates schema: {}", message),
            }
        }
        other => other,
    })
}

/// Validate a document against an already-exported JSON Schema.
pub fn validate_against_schema(schema: &Value, document: &Value) -> Result<(), OperationError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| OperationError::mismatch("/", format!("invalid schema: {}", e)))?;

    let errors: Vec<FieldError> = validator
        .iter_errors(document)
        .map(|e| {
            let path = e.instance_path.to_string();
            FieldError {
                path: if path.is_empty() { "/".to_string() } else { path },
                message: e.to_string(),
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(OperationError::Validation { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource() -> SchemaNode {
        SchemaNode::object()
            .field("name", SchemaNode::string().read_only().required())
            .field("location", SchemaNode::string().required())
            .field(
                "properties",
                SchemaNode::object()
                    .field("enabled", SchemaNode::boolean().required())
                    .field(
                        "group_short_name",
                        SchemaNode::string().wire_name("groupShortName").required(),
                    ),
            )
    }

    #[test]
    fn valid_request() {
        let wire = json!({
            "location": "Global",
            "properties": { "enabled": true, "groupShortName": "ag" }
        });
        assert!(validate_request(&resource(), &wire).is_ok());
    }

    #[test]
    fn request_ignores_read_only_required() {
        let wire = json!({ "location": "Global" });
        assert!(validate_request(&resource(), &wire).is_ok());
    }

    #[test]
    fn missing_required_fields_are_collected() {
        let wire = json!({ "properties": {} });
        match validate_request(&resource(), &wire) {
            Err(OperationError::Validation { errors }) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().any(|e| e.path == "/"));
                assert!(errors.iter().any(|e| e.path == "/properties"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn response_violation_is_schema_mismatch() {
        let wire = json!({ "location": "Global" });
        let result = validate_response(&resource(), &wire);
        assert!(matches!(result, Err(OperationError::SchemaMismatch { .. })));
    }

    #[test]
    fn wrong_type_fails_validation() {
        let wire = json!({ "location": 7 });
        match validate_request(&resource(), &wire) {
            Err(OperationError::Validation { errors }) => assert_eq!(errors[0].path, "/location"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
