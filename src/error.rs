//! Error types for schema binding, instance updates and the request cycle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the partial-update engine and the request cycle.
#[derive(Debug, Error)]
pub enum OperationError {
    // Transport errors (exit code 3)
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{}", http_message(*status, body, error.as_ref()))]
    Http {
        status: u16,
        /// Raw response body, surfaced verbatim.
        body: String,
        /// Parsed ODataV4 error envelope, when the body carried one.
        error: Option<ODataError>,
    },

    // Contract errors (exit code 2)
    #[error("schema mismatch at {path}: {message}")]
    SchemaMismatch { path: String, message: String },

    #[error("invalid JSON in {context}: {source}")]
    InvalidJson {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // Validation errors (exit code 1)
    #[error("validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<FieldError> },
}

impl OperationError {
    /// Shorthand for a single-path schema mismatch.
    pub fn mismatch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a validation failure on one field.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            errors: vec![FieldError {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network { .. } | Self::Http { .. } => 3,
            Self::SchemaMismatch { .. } | Self::InvalidJson { .. } => 2,
            Self::Validation { .. } => 1,
        }
    }
}

fn http_message(status: u16, body: &str, error: Option<&ODataError>) -> String {
    match error {
        Some(e) => format!("server returned {}: ({}) {}", status, e.code, e.message),
        None if body.is_empty() => format!("server returned {}", status),
        None => format!("server returned {}: {}", status, body),
    }
}

/// Errors while loading local JSON documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the offending field, in wire names.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// ODataV4 error body returned by management endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ODataError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ODataError>,
}

#[derive(Deserialize)]
struct ODataEnvelope {
    error: ODataError,
}

impl ODataError {
    /// Parse an `{"error": {...}}` envelope. Returns `None` for any other body.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<ODataEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_exit_codes() {
        let err = OperationError::Http {
            status: 404,
            body: String::new(),
            error: None,
        };
        assert_eq!(err.exit_code(), 3);

        let err = OperationError::mismatch("/identity/foo", "unknown field");
        assert_eq!(err.exit_code(), 2);

        let err = OperationError::invalid("/location", "required");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("instance.json"),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            path: "/properties/groupShortName".into(),
            message: "is a required property".into(),
        };
        assert_eq!(
            err.to_string(),
            "/properties/groupShortName: is a required property"
        );
    }

    #[test]
    fn odata_envelope_parses_nested_details() {
        let body = r#"{
            "error": {
                "code": "ResourceNotFound",
                "message": "The Resource 'ag' was not found.",
                "details": [{ "code": "Inner", "message": "inner detail" }]
            }
        }"#;
        let error = ODataError::from_body(body).unwrap();
        assert_eq!(error.code, "ResourceNotFound");
        assert_eq!(error.details.len(), 1);
        assert_eq!(error.details[0].code, "Inner");
        assert!(error.target.is_none());
    }

    #[test]
    fn odata_envelope_rejects_other_bodies() {
        assert!(ODataError::from_body("not json").is_none());
        assert!(ODataError::from_body(r#"{"message":"x"}"#).is_none());
    }

    #[test]
    fn http_error_display_prefers_envelope() {
        let err = OperationError::Http {
            status: 404,
            body: "{}".into(),
            error: Some(ODataError {
                code: "ResourceNotFound".into(),
                message: "missing".into(),
                target: None,
                details: vec![],
            }),
        };
        assert_eq!(
            err.to_string(),
            "server returned 404: (ResourceNotFound) missing"
        );
    }
}
