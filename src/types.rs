//! Core types shared by the schema, update and request layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Which side of the wire a document is on.
///
/// Requests never carry read-only fields; responses may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    /// Whether read-only fields belong in a document of this direction.
    pub fn includes_read_only(&self) -> bool {
        matches!(self, Direction::Response)
    }

    /// Create direction from a request flag (true = Request, false = Response).
    pub fn from_request_flag(is_request: bool) -> Self {
        if is_request {
            Direction::Request
        } else {
            Direction::Response
        }
    }
}

/// Value of a resolved CLI argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// An explicit value.
    Value(Value),
    /// The flag was given without a value: apply the blank semantics.
    Blank,
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        ArgValue::Value(value)
    }
}

/// How a bound value is merged into the existing instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeAction {
    /// Set the field. Lists, dicts and objects follow the [`AssignPolicy`].
    #[default]
    Assign,
    /// Extend a list with the given elements.
    Append,
}

/// What `assign` does when the target already holds a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignPolicy {
    /// The bound value replaces the existing one.
    #[default]
    Replace,
    /// The bound value is merged into the existing one.
    Union,
}

impl AssignPolicy {
    /// Parse a policy name. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Some(AssignPolicy::Replace),
            "union" => Some(AssignPolicy::Union),
            _ => None,
        }
    }
}

/// Options for applying bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub assign_policy: AssignPolicy,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy used by `assign` on collections.
    pub fn assign_policy(mut self, policy: AssignPolicy) -> Self {
        self.assign_policy = policy;
        self
    }
}
