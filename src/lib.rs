//! Management-plane partial updates
//!
//! Typed schemas for management-plane resources and an engine that applies
//! argument bindings onto a fetched resource, producing the document that is
//! submitted back with PUT.
//!
//! # Example
//!
//! ```
//! use mgmt_patch::{
//!     apply_updates, build_schema, serialize, Binding, Direction, SchemaKind, UpdateOptions,
//! };
//! use serde_json::json;
//!
//! let identity = build_schema(SchemaKind::ManagedServiceIdentity);
//! let mut instance = json!({
//!     "principal_id": "p-1",
//!     "type": "UserAssigned",
//!     "user_assigned_identities": { "id1": {} }
//! });
//!
//! let bindings = [
//!     Binding::assign("mi_system_assigned", ".system_assigned", json!("True")),
//!     Binding::assign("mi_user_assigned", ".user_assigned", json!(["id2"])),
//! ];
//! apply_updates(identity, &mut instance, &bindings, UpdateOptions::new()).unwrap();
//!
//! // Read-only fields are dropped from the request body
//! let body = serialize(identity, &instance, Direction::Request).unwrap();
//! assert_eq!(
//!     body,
//!     json!({ "type": "SystemAssigned,UserAssigned", "userAssignedIdentities": { "id2": {} } })
//! );
//! ```
//!
//! # Field Flags
//!
//! | Flag | Request body | Response | Bindings |
//! |------|--------------|----------|----------|
//! | `required` | Must be present | Must be present | Allowed |
//! | `read_only` | Omitted | Kept | Rejected |
//! | `nullable` | `null` kept | `null` kept | `null` accepted |
//! | `client_only` | Omitted | Ignored | Allowed |
//! | `client_flatten` | Nested | Nested | Allowed |
//!
//! `client_flatten` only changes [`render_output`], which lifts the
//! object's fields into its parent.

mod catalog;
mod codec;
mod config;
mod constants;
mod error;
mod export;
mod http;
mod identity;
mod loader;
mod logging;
mod operation;
mod path;
mod schema;
mod types;
mod update;
mod validator;

pub use catalog::{
    build_schema, SchemaKind, ACTION_GROUP_API_VERSION, ACTION_GROUP_ENDPOINT, ACTION_GROUP_PATH,
};
pub use codec::{deserialize, render_output, serialize};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use constants::{headers, status, API_VERSION_PARAM, DEFAULT_ENDPOINT, USER_AGENT};
pub use error::{FieldError, LoadError, ODataError, OperationError};
pub use export::to_json_schema;
pub use http::{HttpRequest, HttpResponse, Method, MgmtClient, Transport};
pub use identity::{IdentityAssign, IDENTITY_SUBRESOURCE};
pub use loader::{load_document, load_document_auto, load_document_str};
pub use logging::{initialize_logging, LOG_ENV};
pub use operation::{InstanceUpdate, OperationHook, ResourceEndpoint, Stage, UpdateOutcome};
pub use path::{FieldPath, Segment};
pub use schema::{
    Flags, NodeKind, SchemaNode, IDENTITY_TYPE_FIELD, SYSTEM_ASSIGNED_FIELD, USER_ASSIGNED_FIELD,
    USER_ASSIGNED_IDENTITIES_FIELD,
};
pub use types::{json_type_name, ArgValue, AssignPolicy, Direction, MergeAction, UpdateOptions};
pub use update::{apply_bound, apply_updates, bind_all, Binding, BoundBinding};
pub use validator::{validate_against_schema, validate_request, validate_response};

#[cfg(feature = "remote")]
pub use http::ReqwestTransport;
