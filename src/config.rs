//! Client configuration.

use std::time::Duration;

use crate::constants::DEFAULT_ENDPOINT;
use crate::error::OperationError;
use crate::types::{AssignPolicy, UpdateOptions};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every operation issued through one client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub subscription_id: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub assign_policy: AssignPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: None,
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
            assign_policy: AssignPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn subscription_id(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn assign_policy(mut self, policy: AssignPolicy) -> Self {
        self.assign_policy = policy;
        self
    }

    /// The configured subscription id.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Validation` when none is set or it is blank.
    pub fn require_subscription(&self) -> Result<&str, OperationError> {
        match self.subscription_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(OperationError::invalid("subscriptionId", "is required")),
        }
    }

    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions::new().assign_policy(self.assign_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "https://management.azure.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.assign_policy, AssignPolicy::Replace);
    }

    #[test]
    fn missing_subscription_is_validation_error() {
        let config = ClientConfig::default();
        assert!(matches!(
            config.require_subscription(),
            Err(OperationError::Validation { .. })
        ));
        let config = config.subscription_id("  ");
        assert!(config.require_subscription().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let config = ClientConfig::new("http://localhost:1")
            .subscription_id("sub")
            .access_token("t")
            .assign_policy(AssignPolicy::Union);
        assert_eq!(config.require_subscription().unwrap(), "sub");
        assert_eq!(config.update_options().assign_policy, AssignPolicy::Union);
        assert_eq!(config.access_token.as_deref(), Some("t"));
    }
}
