//! Typed schema tree describing a remote resource's read/write shape.
//!
//! A [`SchemaNode`] is an immutable descriptor for one field or a whole
//! resource. Composite nodes carry their children: objects and identity
//! objects an ordered field list, lists and dicts a single element node.
//! Field names are the *client* names used inside instances; the wire name
//! defaults to the client name and can be overridden per node.
//!
//! # Example
//!
//! ```
//! use mgmt_patch::SchemaNode;
//!
//! let receiver = SchemaNode::object()
//!     .field("name", SchemaNode::string().required())
//!     .field("email_address", SchemaNode::string().wire_name("emailAddress").required())
//!     .field("status", SchemaNode::string().read_only());
//!
//! let (name, node) = receiver.child("emailAddress").unwrap();
//! assert_eq!(name, "email_address");
//! assert!(node.is_required());
//! ```

use serde_json::{Map, Value};

/// Client-only identity field carrying the system-assigned flag.
pub const SYSTEM_ASSIGNED_FIELD: &str = "system_assigned";
/// Client-only identity field carrying the user-assigned resource ids.
pub const USER_ASSIGNED_FIELD: &str = "user_assigned";
/// Identity field holding the computed identity type.
pub const IDENTITY_TYPE_FIELD: &str = "type";
/// Identity field holding the user-assigned identity map.
pub const USER_ASSIGNED_IDENTITIES_FIELD: &str = "user_assigned_identities";

/// Per-node metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// The server rejects a write, and a response is invalid, without it.
    pub required: bool,
    /// Set by the server; never sent by the client.
    pub read_only: bool,
    /// `null` is a meaningful value and survives serialization.
    pub nullable: bool,
    /// Children are lifted into the parent when rendering output.
    pub client_flatten: bool,
    /// Exists only on the client; never read from or written to the wire.
    pub client_only: bool,
}

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    String,
    Int,
    Float,
    Bool,
    Object(Vec<(String, SchemaNode)>),
    /// Managed identity object. Behaves like an object, plus the client-only
    /// `system_assigned`/`user_assigned` fields that are resolved into
    /// `type`/`user_assigned_identities` after an update.
    Identity(Vec<(String, SchemaNode)>),
    List(Box<SchemaNode>),
    Dict(Box<SchemaNode>),
}

/// Immutable type descriptor for one field or a whole resource.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    kind: NodeKind,
    wire_name: Option<String>,
    flags: Flags,
}

impl SchemaNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            wire_name: None,
            flags: Flags::default(),
        }
    }

    pub fn string() -> Self {
        Self::new(NodeKind::String)
    }

    pub fn int() -> Self {
        Self::new(NodeKind::Int)
    }

    pub fn float() -> Self {
        Self::new(NodeKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(NodeKind::Bool)
    }

    pub fn object() -> Self {
        Self::new(NodeKind::Object(Vec::new()))
    }

    /// Identity object pre-populated with its two client-only fields.
    ///
    /// Wire fields (`type`, `principal_id`, ...) are added by the caller.
    pub fn identity() -> Self {
        Self::new(NodeKind::Identity(vec![
            (
                SYSTEM_ASSIGNED_FIELD.to_string(),
                SchemaNode::string().client_only(),
            ),
            (
                USER_ASSIGNED_FIELD.to_string(),
                SchemaNode::list(SchemaNode::string()).client_only(),
            ),
        ]))
    }

    pub fn list(element: SchemaNode) -> Self {
        Self::new(NodeKind::List(Box::new(element)))
    }

    pub fn dict(element: SchemaNode) -> Self {
        Self::new(NodeKind::Dict(Box::new(element)))
    }

    /// Add a child field. Only meaningful on object and identity nodes.
    pub fn field(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        let kind_name = self.type_name();
        match &mut self.kind {
            NodeKind::Object(fields) | NodeKind::Identity(fields) => {
                fields.push((name.into(), node));
            }
            _ => debug_assert!(false, "field() called on a {} node", kind_name),
        }
        self
    }

    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.flags.nullable = true;
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flags.client_flatten = true;
        self
    }

    pub fn client_only(mut self) -> Self {
        self.flags.client_only = true;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_required(&self) -> bool {
        self.flags.required
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.read_only
    }

    pub fn is_nullable(&self) -> bool {
        self.flags.nullable
    }

    pub fn is_client_flatten(&self) -> bool {
        self.flags.client_flatten
    }

    pub fn is_client_only(&self) -> bool {
        self.flags.client_only
    }

    /// Wire name of this node when it sits under `field_name`.
    pub fn wire_name_for<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.wire_name.as_deref().unwrap_or(field_name)
    }

    /// Ordered child fields. Empty for non-object nodes.
    pub fn fields(&self) -> &[(String, SchemaNode)] {
        match &self.kind {
            NodeKind::Object(fields) | NodeKind::Identity(fields) => fields,
            _ => &[],
        }
    }

    /// Look up a child field by client name, falling back to wire name.
    ///
    /// Returns the canonical client name together with the node.
    pub fn child(&self, name: &str) -> Option<(&str, &SchemaNode)> {
        let fields = self.fields();
        fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .or_else(|| {
                fields
                    .iter()
                    .find(|(field_name, node)| node.wire_name_for(field_name) == name)
            })
            .map(|(field_name, node)| (field_name.as_str(), node))
    }

    /// Element node of a list or dict.
    pub fn element(&self) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::List(element) | NodeKind::Dict(element) => Some(element.as_ref()),
            _ => None,
        }
    }

    pub fn is_object_like(&self) -> bool {
        matches!(self.kind, NodeKind::Object(_) | NodeKind::Identity(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List(_))
    }

    /// The value a blank argument writes into a field of this type.
    ///
    /// Lists clear to `[]` and dicts to `{}`. Every other type has no blank
    /// value and is unset instead.
    pub fn blank_value(&self) -> Option<Value> {
        match self.kind {
            NodeKind::List(_) => Some(Value::Array(Vec::new())),
            NodeKind::Dict(_) => Some(Value::Object(Map::new())),
            _ => None,
        }
    }

    /// Empty container used when a path walks through an absent field.
    pub(crate) fn empty_container(&self) -> Option<Value> {
        match self.kind {
            NodeKind::Object(_) | NodeKind::Identity(_) | NodeKind::Dict(_) => {
                Some(Value::Object(Map::new()))
            }
            NodeKind::List(_) => Some(Value::Array(Vec::new())),
            _ => None,
        }
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::String => "string",
            NodeKind::Int => "integer",
            NodeKind::Float => "number",
            NodeKind::Bool => "boolean",
            NodeKind::Object(_) => "object",
            NodeKind::Identity(_) => "identity",
            NodeKind::List(_) => "list",
            NodeKind::Dict(_) => "dict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receiver() -> SchemaNode {
        SchemaNode::object()
            .field("name", SchemaNode::string().required())
            .field(
                "use_common_alert_schema",
                SchemaNode::boolean().wire_name("useCommonAlertSchema"),
            )
    }

    #[test]
    fn builder_sets_flags() {
        let node = SchemaNode::string().required().read_only().nullable();
        let flags = node.flags();
        assert!(flags.required && flags.read_only && flags.nullable);
        assert!(!flags.client_flatten && !flags.client_only);
    }

    #[test]
    fn wire_name_defaults_to_field_name() {
        let node = SchemaNode::string();
        assert_eq!(node.wire_name_for("location"), "location");
        let node = SchemaNode::string().wire_name("groupShortName");
        assert_eq!(node.wire_name_for("group_short_name"), "groupShortName");
    }

    #[test]
    fn field_lookup_by_client_or_wire_name() {
        let node = receiver();
        let (name, _) = node.child("use_common_alert_schema").unwrap();
        assert_eq!(name, "use_common_alert_schema");
        let (name, child) = node.child("useCommonAlertSchema").unwrap();
        assert_eq!(name, "use_common_alert_schema");
        assert_eq!(child.type_name(), "boolean");
        assert!(node.child("missing").is_none());
    }

    #[test]
    fn fields_preserve_definition_order() {
        let node = receiver();
        let names: Vec<&str> = node.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["name", "use_common_alert_schema"]);
    }

    #[test]
    fn identity_carries_client_only_fields() {
        let node = SchemaNode::identity().field("type", SchemaNode::string().required());
        let (_, system) = node.child(SYSTEM_ASSIGNED_FIELD).unwrap();
        assert!(system.is_client_only());
        let (_, user) = node.child(USER_ASSIGNED_FIELD).unwrap();
        assert!(user.is_client_only());
        assert!(user.is_list());
        assert!(node.is_object_like());
    }

    #[test]
    fn blank_values_by_type() {
        assert_eq!(
            SchemaNode::list(SchemaNode::string()).blank_value(),
            Some(json!([]))
        );
        assert_eq!(
            SchemaNode::dict(SchemaNode::string()).blank_value(),
            Some(json!({}))
        );
        assert_eq!(SchemaNode::string().blank_value(), None);
        assert_eq!(SchemaNode::object().blank_value(), None);
    }

    #[test]
    fn element_of_collections() {
        let list = SchemaNode::list(SchemaNode::int());
        assert_eq!(list.element().unwrap().type_name(), "integer");
        assert!(SchemaNode::string().element().is_none());
    }
}
