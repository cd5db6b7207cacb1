//! Built-in resource schemas.
//!
//! Each tree is built on first use and shared for the rest of the process.

use std::sync::OnceLock;

use crate::operation::ResourceEndpoint;
use crate::schema::SchemaNode;

/// API version the action group schema describes.
pub const ACTION_GROUP_API_VERSION: &str = "2024-10-01-preview";

pub const ACTION_GROUP_PATH: &str = "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Insights/actionGroups/{actionGroupName}";

pub const ACTION_GROUP_ENDPOINT: ResourceEndpoint = ResourceEndpoint {
    path_template: ACTION_GROUP_PATH,
    api_version: ACTION_GROUP_API_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Monitoring action group resource.
    ActionGroup,
    /// Managed service identity object on its own.
    ManagedServiceIdentity,
}

static ACTION_GROUP: OnceLock<SchemaNode> = OnceLock::new();
static MANAGED_SERVICE_IDENTITY: OnceLock<SchemaNode> = OnceLock::new();

/// The schema tree for `kind`. Repeated calls return the same reference.
pub fn build_schema(kind: SchemaKind) -> &'static SchemaNode {
    match kind {
        SchemaKind::ActionGroup => ACTION_GROUP.get_or_init(action_group),
        SchemaKind::ManagedServiceIdentity => MANAGED_SERVICE_IDENTITY.get_or_init(identity),
    }
}

fn string() -> SchemaNode {
    SchemaNode::string()
}

fn identity() -> SchemaNode {
    SchemaNode::identity()
        .field("principal_id", string().wire_name("principalId").read_only())
        .field("tenant_id", string().wire_name("tenantId").read_only())
        .field("type", string().required())
        .field(
            "user_assigned_identities",
            SchemaNode::dict(
                SchemaNode::object()
                    .nullable()
                    .field("client_id", string().wire_name("clientId").read_only())
                    .field("principal_id", string().wire_name("principalId").read_only()),
            )
            .wire_name("userAssignedIdentities"),
        )
}

fn action_group() -> SchemaNode {
    SchemaNode::object()
        .field("id", string().read_only())
        .field("identity", identity())
        .field("location", string().required())
        .field("name", string().read_only())
        .field("properties", properties().flatten())
        .field("tags", SchemaNode::dict(string()))
        .field("type", string().read_only())
}

fn properties() -> SchemaNode {
    SchemaNode::object()
        .field("enabled", SchemaNode::boolean().required())
        .field("group_short_name", string().wire_name("groupShortName").required())
        .field(
            "arm_role_receivers",
            SchemaNode::list(arm_role_receiver()).wire_name("armRoleReceivers"),
        )
        .field(
            "automation_runbook_receivers",
            SchemaNode::list(automation_runbook_receiver()).wire_name("automationRunbookReceivers"),
        )
        .field(
            "azure_app_push_receivers",
            SchemaNode::list(azure_app_push_receiver()).wire_name("azureAppPushReceivers"),
        )
        .field(
            "azure_function_receivers",
            SchemaNode::list(azure_function_receiver()).wire_name("azureFunctionReceivers"),
        )
        .field(
            "email_receivers",
            SchemaNode::list(email_receiver()).wire_name("emailReceivers"),
        )
        .field(
            "event_hub_receivers",
            SchemaNode::list(event_hub_receiver()).wire_name("eventHubReceivers"),
        )
        .field(
            "incident_receivers",
            SchemaNode::list(incident_receiver()).wire_name("incidentReceivers"),
        )
        .field(
            "itsm_receivers",
            SchemaNode::list(itsm_receiver()).wire_name("itsmReceivers"),
        )
        .field(
            "logic_app_receivers",
            SchemaNode::list(logic_app_receiver()).wire_name("logicAppReceivers"),
        )
        .field(
            "sms_receivers",
            SchemaNode::list(sms_receiver()).wire_name("smsReceivers"),
        )
        .field(
            "voice_receivers",
            SchemaNode::list(voice_receiver()).wire_name("voiceReceivers"),
        )
        .field(
            "webhook_receivers",
            SchemaNode::list(webhook_receiver()).wire_name("webhookReceivers"),
        )
}

// Fields shared by several receiver types.

fn name() -> SchemaNode {
    string().required()
}

fn managed_identity() -> SchemaNode {
    string().wire_name("managedIdentity")
}

fn use_common_alert_schema() -> SchemaNode {
    SchemaNode::boolean().wire_name("useCommonAlertSchema")
}

fn arm_role_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("name", name())
        .field("role_id", string().wire_name("roleId").required())
        .field("use_common_alert_schema", use_common_alert_schema())
}

fn automation_runbook_receiver() -> SchemaNode {
    SchemaNode::object()
        .field(
            "automation_account_id",
            string().wire_name("automationAccountId").required(),
        )
        .field(
            "is_global_runbook",
            SchemaNode::boolean().wire_name("isGlobalRunbook").required(),
        )
        .field("managed_identity", managed_identity())
        .field("name", string())
        .field("runbook_name", string().wire_name("runbookName").required())
        .field("service_uri", string().wire_name("serviceUri"))
        .field("use_common_alert_schema", use_common_alert_schema())
        .field(
            "webhook_resource_id",
            string().wire_name("webhookResourceId").required(),
        )
}

fn azure_app_push_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("email_address", string().wire_name("emailAddress").required())
        .field("name", name())
}

fn azure_function_receiver() -> SchemaNode {
    SchemaNode::object()
        .field(
            "function_app_resource_id",
            string().wire_name("functionAppResourceId").required(),
        )
        .field("function_name", string().wire_name("functionName").required())
        .field("http_trigger_url", string().wire_name("httpTriggerUrl").required())
        .field("managed_identity", managed_identity())
        .field("name", name())
        .field("use_common_alert_schema", use_common_alert_schema())
}

fn email_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("email_address", string().wire_name("emailAddress").required())
        .field("name", name())
        .field("status", string().read_only())
        .field("use_common_alert_schema", use_common_alert_schema())
}

fn event_hub_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("event_hub_name", string().wire_name("eventHubName").required())
        .field(
            "event_hub_name_space",
            string().wire_name("eventHubNameSpace").required(),
        )
        .field("managed_identity", managed_identity())
        .field("name", name())
        .field("subscription_id", string().wire_name("subscriptionId").required())
        .field("tenant_id", string().wire_name("tenantId"))
        .field("use_common_alert_schema", use_common_alert_schema())
}

fn incident_receiver() -> SchemaNode {
    SchemaNode::object()
        .field(
            "connection",
            SchemaNode::object()
                .required()
                .field("id", string().required())
                .field("name", name()),
        )
        .field(
            "incident_management_service",
            string().wire_name("incidentManagementService").required(),
        )
        .field("mappings", SchemaNode::dict(string()).required())
        .field("name", name())
}

fn itsm_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("connection_id", string().wire_name("connectionId").required())
        .field("name", name())
        .field("region", string().required())
        .field(
            "ticket_configuration",
            string().wire_name("ticketConfiguration").required(),
        )
        .field("workspace_id", string().wire_name("workspaceId").required())
}

fn logic_app_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("callback_url", string().wire_name("callbackUrl").required())
        .field("managed_identity", managed_identity())
        .field("name", name())
        .field("resource_id", string().wire_name("resourceId").required())
        .field("use_common_alert_schema", use_common_alert_schema())
}

fn sms_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("country_code", string().wire_name("countryCode").required())
        .field("name", name())
        .field("phone_number", string().wire_name("phoneNumber").required())
        .field("status", string().read_only())
}

fn voice_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("country_code", string().wire_name("countryCode").required())
        .field("name", name())
        .field("phone_number", string().wire_name("phoneNumber").required())
}

fn webhook_receiver() -> SchemaNode {
    SchemaNode::object()
        .field("identifier_uri", string().wire_name("identifierUri"))
        .field("managed_identity", managed_identity())
        .field("name", name())
        .field("object_id", string().wire_name("objectId"))
        .field("service_uri", string().wire_name("serviceUri").required())
        .field("tenant_id", string().wire_name("tenantId"))
        .field("use_aad_auth", SchemaNode::boolean().wire_name("useAadAuth"))
        .field("use_common_alert_schema", use_common_alert_schema())
}
