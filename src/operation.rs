//! Read-modify-write cycle for one resource.
//!
//! An [`InstanceUpdate`] moves through `Fetch -> PatchBuilt -> Submitted`
//! and ends in `Success` or an error:
//!
//! 1. bindings are bound against the schema and URL parameters checked,
//!    so nothing is sent when either is wrong;
//! 2. the resource is fetched (`200` only);
//! 3. the selected subresource is patched between the instance hooks;
//! 4. the whole resource is validated and submitted (`200` or `201`);
//! 5. the response is checked against the schema.

use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{deserialize, render_output, serialize};
use crate::constants::{status, API_VERSION_PARAM};
use crate::error::OperationError;
use crate::http::{HttpRequest, MgmtClient};
use crate::path::FieldPath;
use crate::schema::SchemaNode;
use crate::types::{Direction, UpdateOptions};
use crate::update::{apply_bound, bind_all, Binding};
use crate::validator::{validate_request, validate_response};

/// Addressing information for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEndpoint {
    /// Path with `{name}` placeholders, relative to the endpoint.
    pub path_template: &'static str,
    pub api_version: &'static str,
}

/// Stage reached by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    PatchBuilt,
    Submitted,
    Success,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::PatchBuilt => "patch-built",
            Stage::Submitted => "submitted",
            Stage::Success => "success",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

/// Extension points around an update. All methods default to no-ops.
///
/// Hooks run in the order they were added. An error from any hook aborts
/// the update.
pub trait OperationHook {
    /// Before anything is sent.
    fn pre_operations(&self) -> Result<(), OperationError> {
        Ok(())
    }

    /// On the selected subresource, before bindings are applied.
    fn pre_instance_update(&self, _instance: &mut Value) -> Result<(), OperationError> {
        Ok(())
    }

    /// On the selected subresource, after bindings are applied.
    fn post_instance_update(&self, _instance: &mut Value) -> Result<(), OperationError> {
        Ok(())
    }

    /// On the deserialized response, after it was validated.
    fn post_operations(&self, _instance: &Value) -> Result<(), OperationError> {
        Ok(())
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Response resource as an instance (client names).
    pub instance: Value,
    /// Selected subresource rendered for display.
    pub output: Value,
}

/// One GET/patch/PUT cycle against a resource.
pub struct InstanceUpdate<'a> {
    client: &'a MgmtClient,
    endpoint: ResourceEndpoint,
    schema: &'a SchemaNode,
    params: Vec<(String, String)>,
    selector: FieldPath,
    bindings: Vec<Binding>,
    options: UpdateOptions,
    hooks: Vec<Box<dyn OperationHook + 'a>>,
}

impl<'a> InstanceUpdate<'a> {
    pub fn new(client: &'a MgmtClient, endpoint: ResourceEndpoint, schema: &'a SchemaNode) -> Self {
        Self {
            client,
            endpoint,
            schema,
            params: Vec::new(),
            selector: FieldPath::root(),
            bindings: Vec::new(),
            options: UpdateOptions::new(),
            hooks: Vec::new(),
        }
    }

    /// Set a URL path parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Restrict bindings and output to a subresource. Defaults to the
    /// whole resource.
    pub fn subresource(mut self, selector: FieldPath) -> Self {
        self.selector = selector;
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn bindings(mut self, bindings: impl IntoIterator<Item = Binding>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    pub fn options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hook(mut self, hook: impl OperationHook + 'a) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn boxed_hook(mut self, hook: Box<dyn OperationHook + 'a>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Run the cycle.
    ///
    /// # Errors
    ///
    /// - `SchemaMismatch` for bad bindings or a response that violates the
    ///   schema
    /// - `Validation` for bad URL parameters or an invalid request body,
    ///   before anything is written
    /// - `Http` for an unexpected status, `Network` for transport failures
    pub fn execute(self) -> Result<UpdateOutcome, OperationError> {
        let mut stage = Stage::Fetch;
        let result = self.run(&mut stage);
        match &result {
            Ok(_) => info!(subresource = %self.selector, "update succeeded"),
            Err(e) => {
                warn!(stage = %stage, error = %e, "update failed");
                stage = Stage::Error;
            }
        }
        debug!(stage = %stage, "update finished");
        result
    }

    fn run(&self, stage: &mut Stage) -> Result<UpdateOutcome, OperationError> {
        let (selector, sub_node) = self.selector.resolve(self.schema)?;
        if !sub_node.is_object_like() {
            return Err(OperationError::mismatch(
                selector.to_string(),
                format!("cannot update a {} as a subresource", sub_node.type_name()),
            ));
        }
        let bound = bind_all(sub_node, &self.bindings)?;

        let params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let url = self.client.format_url(
            self.endpoint.path_template,
            &params,
            &[(API_VERSION_PARAM, self.endpoint.api_version)],
        )?;

        for hook in &self.hooks {
            hook.pre_operations()?;
        }

        transition(stage, Stage::Fetch);
        let response = self.client.send(&HttpRequest::get(&url))?;
        if response.status != status::OK {
            return Err(response.into_error());
        }
        let mut instance = deserialize(self.schema, &response.json("GET response")?)?;

        transition(stage, Stage::PatchBuilt);
        {
            let target = selector.select_mut(self.schema, &mut instance)?;
            for hook in &self.hooks {
                hook.pre_instance_update(target)?;
            }
            apply_bound(sub_node, target, &bound, self.options)?;
            for hook in &self.hooks {
                hook.post_instance_update(target)?;
            }
        }

        let body = serialize(self.schema, &instance, Direction::Request)?;
        validate_request(self.schema, &body)?;

        transition(stage, Stage::Submitted);
        let response = self.client.send(&HttpRequest::put_json(&url, &body))?;
        if response.status != status::OK && response.status != status::CREATED {
            return Err(response.into_error());
        }
        let wire = response.json("PUT response")?;
        validate_response(self.schema, &wire)?;
        let instance = deserialize(self.schema, &wire)?;

        for hook in &self.hooks {
            hook.post_operations(&instance)?;
        }
        transition(stage, Stage::Success);

        let output = match selector.select(&instance) {
            Some(value) => render_output(sub_node, value)?,
            None => Value::Null,
        };
        Ok(UpdateOutcome { instance, output })
    }
}

fn transition(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}
