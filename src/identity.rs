//! Assigning managed identities to an action group.

use serde_json::{json, Value};

use crate::catalog::{build_schema, SchemaKind, ACTION_GROUP_ENDPOINT};
use crate::error::OperationError;
use crate::http::MgmtClient;
use crate::operation::{InstanceUpdate, OperationHook, UpdateOutcome};
use crate::path::FieldPath;
use crate::schema::{SYSTEM_ASSIGNED_FIELD, USER_ASSIGNED_FIELD};
use crate::types::{ArgValue, UpdateOptions};
use crate::update::Binding;

/// Subresource the command reads and writes.
pub const IDENTITY_SUBRESOURCE: &str = "identity";

/// Value written when `--system-assigned` is given without one.
pub const SYSTEM_ASSIGNED_BLANK: &str = "True";

/// Arguments of `identity assign`.
///
/// `None` means the argument was not given; [`ArgValue::Blank`] means it
/// was given without a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityAssign {
    pub action_group_name: String,
    pub resource_group: String,
    pub system_assigned: Option<ArgValue>,
    pub user_assigned: Option<ArgValue>,
}

impl IdentityAssign {
    pub fn new(action_group_name: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            action_group_name: action_group_name.into(),
            resource_group: resource_group.into(),
            ..Self::default()
        }
    }

    pub fn system_assigned(mut self, value: impl Into<ArgValue>) -> Self {
        self.system_assigned = Some(value.into());
        self
    }

    pub fn user_assigned<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<Value> = ids.into_iter().map(|id| Value::String(id.into())).collect();
        self.user_assigned = Some(ArgValue::Value(Value::Array(ids)));
        self
    }

    /// Bindings for the arguments that were given, relative to the identity
    /// subresource.
    pub fn bindings(&self) -> Vec<Binding> {
        let mut bindings = Vec::new();
        if let Some(value) = &self.system_assigned {
            bindings.push(
                Binding::assign(
                    "mi_system_assigned",
                    format!(".{}", SYSTEM_ASSIGNED_FIELD),
                    value.clone(),
                )
                .with_blank(json!(SYSTEM_ASSIGNED_BLANK)),
            );
        }
        if let Some(value) = &self.user_assigned {
            bindings.push(
                Binding::assign(
                    "mi_user_assigned",
                    format!(".{}", USER_ASSIGNED_FIELD),
                    value.clone(),
                )
                .with_blank(json!([])),
            );
        }
        bindings
    }

    /// Fetch the action group, assign the identities and submit it.
    ///
    /// The outcome's `output` is the resulting identity object.
    pub fn run(
        &self,
        client: &MgmtClient,
        subscription_id: &str,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome, OperationError> {
        self.run_with_hooks(client, subscription_id, options, Vec::new())
    }

    /// Like [`run`](Self::run), with extra hooks around the update.
    pub fn run_with_hooks<'a>(
        &self,
        client: &'a MgmtClient,
        subscription_id: &str,
        options: UpdateOptions,
        hooks: Vec<Box<dyn OperationHook + 'a>>,
    ) -> Result<UpdateOutcome, OperationError> {
        let mut update = InstanceUpdate::new(
            client,
            ACTION_GROUP_ENDPOINT,
            build_schema(SchemaKind::ActionGroup),
        )
        .param("subscriptionId", subscription_id)
        .param("resourceGroupName", self.resource_group.as_str())
        .param("actionGroupName", self.action_group_name.as_str())
        .subresource(FieldPath::parse(IDENTITY_SUBRESOURCE)?)
        .bindings(self.bindings())
        .options(options);

        for hook in hooks {
            update = update.boxed_hook(hook);
        }
        update.execute()
    }
}
