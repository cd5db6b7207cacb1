//! Instance update engine.
//!
//! Applies resolved argument bindings onto a fetched instance, producing the
//! document that is submitted back to the server.
//!
//! # Example
//!
//! ```
//! use mgmt_patch::{apply_updates, Binding, SchemaNode, UpdateOptions};
//! use serde_json::json;
//!
//! let node = SchemaNode::object()
//!     .field("location", SchemaNode::string().required())
//!     .field("tags", SchemaNode::dict(SchemaNode::string()));
//!
//! let mut instance = json!({ "location": "Global", "tags": { "env": "dev" } });
//! let bindings = [Binding::assign("tag_env", "tags.env", json!("prod"))];
//! apply_updates(&node, &mut instance, &bindings, UpdateOptions::new()).unwrap();
//!
//! assert_eq!(instance["tags"]["env"], "prod");
//! ```
//!
//! # Merge rules
//!
//! | Action | Target | Policy | Effect |
//! |--------|--------|--------|--------|
//! | `assign` | any | `replace` | Value replaces the field |
//! | `assign` | list | `union` | New elements appended when not present |
//! | `assign` | dict/object | `union` | Keys merged, bound keys win |
//! | `append` | list | any | Elements appended |
//! | blank | list/dict | any | Cleared to `[]`/`{}` |
//! | blank | other | any | Field unset |

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::codec::serialize;
use crate::error::OperationError;
use crate::path::{FieldPath, Segment};
use crate::schema::{
    NodeKind, SchemaNode, IDENTITY_TYPE_FIELD, SYSTEM_ASSIGNED_FIELD,
    USER_ASSIGNED_FIELD, USER_ASSIGNED_IDENTITIES_FIELD,
};
use crate::types::{json_type_name, ArgValue, AssignPolicy, Direction, MergeAction, UpdateOptions};
use crate::validator::validate_request;

/// A resolved argument bound to a target field.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Argument key, used in logs and error messages.
    pub key: String,
    pub value: ArgValue,
    /// Path expression relative to the node the binding is applied to.
    pub target: String,
    pub action: MergeAction,
    /// Value written when the argument is blank. Falls back to the target
    /// type's blank semantics when unset.
    pub blank: Option<Value>,
}

impl Binding {
    pub fn new(
        key: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<ArgValue>,
        action: MergeAction,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            target: target.into(),
            action,
            blank: None,
        }
    }

    pub fn assign(
        key: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<ArgValue>,
    ) -> Self {
        Self::new(key, target, value, MergeAction::Assign)
    }

    pub fn append(
        key: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<ArgValue>,
    ) -> Self {
        Self::new(key, target, value, MergeAction::Append)
    }

    /// Binding for an argument given without a value.
    pub fn blank(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(key, target, ArgValue::Blank, MergeAction::Assign)
    }

    pub fn with_blank(mut self, blank: Value) -> Self {
        self.blank = Some(blank);
        self
    }

    /// Resolve the target path and coerce the value against `node`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::SchemaMismatch` when the path is unknown,
    /// the target is read-only, `append` targets a non-list, or the value
    /// does not fit the target type.
    pub fn bind<'s>(&self, node: &'s SchemaNode) -> Result<BoundBinding<'s>, OperationError> {
        let (path, target) = FieldPath::parse(&self.target)?.resolve(node)?;
        let path_str = path.to_string();

        if target.is_read_only() {
            return Err(OperationError::mismatch(
                path_str,
                format!("argument '{}' targets a read-only field", self.key),
            ));
        }

        let raw = match &self.value {
            ArgValue::Value(value) => Some(value.clone()),
            ArgValue::Blank => self.blank.clone().or_else(|| target.blank_value()),
        };

        let value = match (raw, self.action) {
            (None, _) => None,
            (Some(value), MergeAction::Assign) => Some(coerce(target, value, &path_str)?),
            (Some(value), MergeAction::Append) => {
                let element = match target.kind() {
                    NodeKind::List(element) => element,
                    _ => {
                        return Err(OperationError::mismatch(
                            path_str,
                            format!("append requires a list, found {}", target.type_name()),
                        ));
                    }
                };
                match value {
                    Value::Array(_) => Some(coerce(target, value, &path_str)?),
                    single => Some(Value::Array(vec![coerce(element, single, &path_str)?])),
                }
            }
        };

        Ok(BoundBinding {
            key: self.key.clone(),
            path,
            target,
            value,
            action: self.action,
        })
    }
}

/// A binding whose path and value were checked against the schema.
#[derive(Debug, Clone)]
pub struct BoundBinding<'s> {
    key: String,
    path: FieldPath,
    target: &'s SchemaNode,
    /// `None` unsets the field.
    value: Option<Value>,
    action: MergeAction,
}

impl<'s> BoundBinding<'s> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn target(&self) -> &'s SchemaNode {
        self.target
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Bind every binding against `node`, stopping at the first failure.
pub fn bind_all<'s>(
    node: &'s SchemaNode,
    bindings: &[Binding],
) -> Result<Vec<BoundBinding<'s>>, OperationError> {
    bindings.iter().map(|b| b.bind(node)).collect()
}

/// Apply bindings onto `instance`, which must conform to `node`.
///
/// Bindings are bound first so a bad path leaves the instance untouched.
/// After all updates, identity objects are resolved and the result is
/// checked against the request shape of `node`.
///
/// # Errors
///
/// `SchemaMismatch` for bindings that do not fit the schema, `Validation`
/// when a required field is absent after the update.
pub fn apply_updates(
    node: &SchemaNode,
    instance: &mut Value,
    bindings: &[Binding],
    options: UpdateOptions,
) -> Result<(), OperationError> {
    let bound = bind_all(node, bindings)?;
    apply_bound(node, instance, &bound, options)
}

/// Apply already-bound bindings. See [`apply_updates`].
pub fn apply_bound(
    node: &SchemaNode,
    instance: &mut Value,
    bindings: &[BoundBinding<'_>],
    options: UpdateOptions,
) -> Result<(), OperationError> {
    for binding in bindings {
        debug!(key = %binding.key, path = %binding.path, "applying binding");
        apply_at(node, instance, binding.path.segments(), binding, options.assign_policy)
            .map_err(|e| with_path(e, &binding.path))?;
    }

    resolve_identities(node, instance, options.assign_policy)?;

    let wire = serialize(node, instance, Direction::Request)?;
    validate_request(node, &wire)
}

fn with_path(error: OperationError, path: &FieldPath) -> OperationError {
    match error {
        OperationError::SchemaMismatch { path: p, message } if p.is_empty() => {
            OperationError::SchemaMismatch {
                path: path.to_string(),
                message,
            }
        }
        other => other,
    }
}

fn apply_at(
    node: &SchemaNode,
    slot: &mut Value,
    segments: &[Segment],
    binding: &BoundBinding<'_>,
    policy: AssignPolicy,
) -> Result<(), OperationError> {
    let Some((first, rest)) = segments.split_first() else {
        // Root binding replaces or merges the whole value.
        *slot = match &binding.value {
            Some(value) => merge(node, Some(std::mem::take(slot)), value.clone(), binding.action, policy),
            None => node.empty_container().unwrap_or(Value::Null),
        };
        return Ok(());
    };

    if slot.is_null() {
        if let Some(empty) = node.empty_container() {
            *slot = empty;
        }
    }

    match first {
        Segment::Field(name) => {
            let child = child_node(node, name)?;
            let map = slot.as_object_mut().ok_or_else(|| {
                OperationError::mismatch("", format!("expected {}, found non-object value", node.type_name()))
            })?;

            if rest.is_empty() {
                match &binding.value {
                    None => {
                        map.shift_remove(name.as_str());
                    }
                    Some(value) => match map.get_mut(name.as_str()) {
                        Some(existing) => {
                            let previous = std::mem::take(existing);
                            *existing = merge(child, Some(previous), value.clone(), binding.action, policy);
                        }
                        None => {
                            map.insert(
                                name.clone(),
                                merge(child, None, value.clone(), binding.action, policy),
                            );
                        }
                    },
                }
                return Ok(());
            }

            let next = map
                .entry(name.clone())
                .or_insert_with(|| child.empty_container().unwrap_or(Value::Null));
            apply_at(child, next, rest, binding, policy)
        }
        Segment::Index(index) => {
            let NodeKind::List(element) = node.kind() else {
                return Err(OperationError::mismatch("", format!("cannot index a {}", node.type_name())));
            };
            let arr = slot.as_array_mut().ok_or_else(|| {
                OperationError::mismatch("", "expected list, found non-array value")
            })?;
            let index = *index;

            if index > arr.len() {
                return Err(OperationError::mismatch(
                    "",
                    format!("index {} out of range for list of length {}", index, arr.len()),
                ));
            }

            if rest.is_empty() {
                match &binding.value {
                    None if index < arr.len() => {
                        arr.remove(index);
                    }
                    None => {}
                    Some(value) if index == arr.len() => {
                        arr.push(merge(element, None, value.clone(), binding.action, policy));
                    }
                    Some(value) => {
                        let previous = std::mem::take(&mut arr[index]);
                        arr[index] = merge(element, Some(previous), value.clone(), binding.action, policy);
                    }
                }
                return Ok(());
            }

            if index == arr.len() {
                arr.push(element.empty_container().unwrap_or(Value::Null));
            }
            apply_at(element, &mut arr[index], rest, binding, policy)
        }
    }
}

fn child_node<'n>(node: &'n SchemaNode, name: &str) -> Result<&'n SchemaNode, OperationError> {
    match node.kind() {
        NodeKind::Dict(element) => Ok(element),
        NodeKind::Object(_) | NodeKind::Identity(_) => node
            .child(name)
            .map(|(_, child)| child)
            .ok_or_else(|| OperationError::mismatch("", format!("no field '{}'", name))),
        _ => Err(OperationError::mismatch(
            "",
            format!("cannot select '{}' on a {}", name, node.type_name()),
        )),
    }
}

fn merge(
    node: &SchemaNode,
    existing: Option<Value>,
    incoming: Value,
    action: MergeAction,
    policy: AssignPolicy,
) -> Value {
    let existing = match existing {
        Some(Value::Null) | None => return incoming,
        Some(existing) => existing,
    };

    match (action, policy, node.kind(), existing, incoming) {
        (MergeAction::Append, _, _, Value::Array(mut current), Value::Array(added)) => {
            current.extend(added);
            Value::Array(current)
        }
        (
            MergeAction::Assign,
            AssignPolicy::Union,
            NodeKind::List(_),
            Value::Array(mut current),
            Value::Array(added),
        ) => {
            for item in added {
                if !current.contains(&item) {
                    current.push(item);
                }
            }
            Value::Array(current)
        }
        (
            MergeAction::Assign,
            AssignPolicy::Union,
            NodeKind::Dict(_) | NodeKind::Object(_) | NodeKind::Identity(_),
            current @ Value::Object(_),
            added @ Value::Object(_),
        ) => deep_merge(current, added),
        (_, _, _, _, incoming) => incoming,
    }
}

/// Recursive object merge; keys from `patch` win, nested objects merge.
fn deep_merge(target: Value, patch: Value) -> Value {
    match (target, patch) {
        (Value::Object(mut target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let merged = match target_map.get_mut(&key) {
                    Some(existing) => deep_merge(std::mem::take(existing), patch_value),
                    None => patch_value,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, patch) => patch,
    }
}

/// Coerce a bound value to the target node, canonicalizing field names.
///
/// CLI values arrive as strings or as JSON, so numeric and boolean targets
/// accept their string spellings and string targets accept numbers and
/// booleans in their text form.
fn coerce(node: &SchemaNode, value: Value, path: &str) -> Result<Value, OperationError> {
    let wrong = |value: &Value| {
        OperationError::mismatch(
            path,
            format!("expected {}, got {}", node.type_name(), json_type_name(value)),
        )
    };

    if value.is_null() {
        return if node.is_nullable() {
            Ok(Value::Null)
        } else {
            Err(wrong(&value))
        };
    }

    match node.kind() {
        NodeKind::String => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(wrong(&other)),
        },
        NodeKind::Int => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| OperationError::mismatch(path, format!("'{}' is not an integer", s))),
            other => Err(wrong(other)),
        },
        NodeKind::Float => match &value {
            Value::Number(_) => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| OperationError::mismatch(path, format!("'{}' is not a number", s))),
            other => Err(wrong(other)),
        },
        NodeKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) => parse_flag(s)
                .map(Value::Bool)
                .ok_or_else(|| OperationError::mismatch(path, format!("'{}' is not a boolean", s))),
            other => Err(wrong(other)),
        },
        NodeKind::Object(_) | NodeKind::Identity(_) => {
            let map = match value {
                Value::Object(map) => map,
                other => return Err(wrong(&other)),
            };
            let mut result = Map::new();
            for (key, item) in map {
                let child_path = format!("{}.{}", path.trim_end_matches('.'), key);
                let (name, child) = node.child(&key).ok_or_else(|| {
                    OperationError::mismatch(&child_path, format!("no field '{}' in {}", key, node.type_name()))
                })?;
                if child.is_read_only() {
                    return Err(OperationError::mismatch(child_path, "read-only field cannot be set"));
                }
                result.insert(name.to_string(), coerce(child, item, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        NodeKind::List(element) => {
            let items = match value {
                Value::Array(items) => items,
                other => return Err(wrong(&other)),
            };
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| coerce(element, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        NodeKind::Dict(element) => {
            let map = match value {
                Value::Object(map) => map,
                other => return Err(wrong(&other)),
            };
            let mut result = Map::new();
            for (key, item) in map {
                let item_path = format!("{}[\"{}\"]", path, key);
                let coerced = coerce(element, item, &item_path)?;
                result.insert(key, coerced);
            }
            Ok(Value::Object(result))
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Resolve every identity object present in `instance`.
fn resolve_identities(
    node: &SchemaNode,
    instance: &mut Value,
    policy: AssignPolicy,
) -> Result<(), OperationError> {
    match node.kind() {
        NodeKind::Identity(_) => resolve_identity(node, instance, policy),
        NodeKind::Object(fields) => {
            if let Some(map) = instance.as_object_mut() {
                for (name, child) in fields {
                    if let Some(value) = map.get_mut(name.as_str()) {
                        resolve_identities(child, value, policy)?;
                    }
                }
            }
            Ok(())
        }
        NodeKind::List(element) => {
            if let Some(items) = instance.as_array_mut() {
                for item in items {
                    resolve_identities(element, item, policy)?;
                }
            }
            Ok(())
        }
        NodeKind::Dict(element) => {
            if let Some(map) = instance.as_object_mut() {
                for item in map.values_mut() {
                    resolve_identities(element, item, policy)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Fold the client-only `system_assigned`/`user_assigned` requests into the
/// wire fields `type` and `user_assigned_identities`.
fn resolve_identity(
    node: &SchemaNode,
    instance: &mut Value,
    policy: AssignPolicy,
) -> Result<(), OperationError> {
    for field in [IDENTITY_TYPE_FIELD, USER_ASSIGNED_IDENTITIES_FIELD] {
        if node.child(field).is_none() {
            return Err(OperationError::mismatch(
                format!(".{}", field),
                "identity schema lacks this field",
            ));
        }
    }

    let Some(map) = instance.as_object_mut() else {
        return Ok(());
    };

    let system_request = map.shift_remove(SYSTEM_ASSIGNED_FIELD);
    let user_request = map.shift_remove(USER_ASSIGNED_FIELD);

    let mut system = map
        .get(IDENTITY_TYPE_FIELD)
        .and_then(Value::as_str)
        .map(has_system_assigned)
        .unwrap_or(false);

    match system_request {
        None | Some(Value::Null) => {}
        Some(Value::String(flag)) => {
            if system_flag(&flag)? {
                system = true;
            }
        }
        Some(Value::Bool(flag)) => system |= flag,
        Some(other) => {
            return Err(OperationError::mismatch(
                format!(".{}", SYSTEM_ASSIGNED_FIELD),
                format!("expected string, got {}", json_type_name(&other)),
            ));
        }
    }

    let existing = match map.get(USER_ASSIGNED_IDENTITIES_FIELD) {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };

    let ids: Vec<String> = match user_request {
        None | Some(Value::Null) => existing.keys().cloned().collect(),
        Some(Value::Array(requested)) => {
            let requested = requested
                .iter()
                .map(|id| {
                    id.as_str().map(str::to_string).ok_or_else(|| {
                        OperationError::mismatch(
                            format!(".{}", USER_ASSIGNED_FIELD),
                            format!("expected string, got {}", json_type_name(id)),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut ids: Vec<String> = match policy {
                AssignPolicy::Replace => Vec::new(),
                AssignPolicy::Union => existing.keys().cloned().collect(),
            };
            // Resource ids compare case-insensitively; the first spelling wins.
            for id in requested {
                if !ids.iter().any(|known| known.eq_ignore_ascii_case(&id)) {
                    ids.push(id);
                }
            }
            ids
        }
        Some(other) => {
            return Err(OperationError::mismatch(
                format!(".{}", USER_ASSIGNED_FIELD),
                format!("expected list, got {}", json_type_name(&other)),
            ));
        }
    };

    let mut identities = Map::new();
    for id in ids {
        // Keep the server's entry for a known id.
        let entry = existing
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(&id))
            .map(|(_, entry)| entry.clone())
            .unwrap_or_else(|| json!({}));
        identities.entry(id).or_insert(entry);
    }

    let identity_type = match (system, !identities.is_empty()) {
        (true, true) => "SystemAssigned,UserAssigned",
        (true, false) => "SystemAssigned",
        (false, true) => "UserAssigned",
        (false, false) => "None",
    };
    map.insert(IDENTITY_TYPE_FIELD.to_string(), json!(identity_type));

    if identities.is_empty() {
        map.shift_remove(USER_ASSIGNED_IDENTITIES_FIELD);
    } else {
        map.insert(
            USER_ASSIGNED_IDENTITIES_FIELD.to_string(),
            Value::Object(identities),
        );
    }

    Ok(())
}

fn has_system_assigned(identity_type: &str) -> bool {
    identity_type
        .split(',')
        .any(|part| part.trim().eq_ignore_ascii_case("SystemAssigned"))
}

fn system_flag(flag: &str) -> Result<bool, OperationError> {
    if flag.trim().eq_ignore_ascii_case("SystemAssigned") {
        return Ok(true);
    }
    parse_flag(flag).ok_or_else(|| {
        OperationError::mismatch(
            format!(".{}", SYSTEM_ASSIGNED_FIELD),
            format!("'{}' is not a valid system-assigned flag", flag),
        )
    })
}
