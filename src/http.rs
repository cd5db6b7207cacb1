//! HTTP plumbing: request/response types, the transport seam and the
//! management client that formats resource URLs.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::constants::{self, headers, APPLICATION_JSON};
use crate::error::{FieldError, ODataError, OperationError};

#[cfg(feature = "remote")]
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// GET accepting JSON.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: vec![(headers::ACCEPT.to_string(), APPLICATION_JSON.to_string())],
            body: None,
        }
    }

    /// PUT sending and accepting JSON.
    pub fn put_json(url: impl Into<String>, body: &Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            headers: vec![
                (headers::CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()),
                (headers::ACCEPT.to_string(), APPLICATION_JSON.to_string()),
            ],
            body: Some(body.to_string().into_bytes()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    pub fn json(&self, context: &str) -> Result<Value, OperationError> {
        serde_json::from_slice(&self.body).map_err(|source| OperationError::InvalidJson {
            context: context.to_string(),
            source,
        })
    }

    /// Turn a non-success response into an `Http` error carrying its body.
    pub fn into_error(self) -> OperationError {
        let body = self.text();
        let error = ODataError::from_body(&body);
        OperationError::Http {
            status: self.status,
            body,
            error,
        }
    }
}

/// Sends one request and returns the response, whatever its status.
///
/// Only failures before a status code is obtained are errors.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, OperationError>;
}

/// Blocking `reqwest` transport with an optional bearer token.
#[cfg(feature = "remote")]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

#[cfg(feature = "remote")]
impl ReqwestTransport {
    pub fn new(timeout: Duration, token: Option<String>) -> Result<Self, OperationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(|source| OperationError::Network {
                url: String::new(),
                source: Box::new(source),
            })?;
        Ok(Self { client, token })
    }
}

#[cfg(feature = "remote")]
impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, OperationError> {
        let network = |source: reqwest::Error| OperationError::Network {
            url: request.url.clone(),
            source: Box::new(source),
        };

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(network)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().map_err(network)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Client for one management endpoint.
pub struct MgmtClient {
    endpoint: String,
    transport: Box<dyn Transport>,
}

impl MgmtClient {
    pub fn new(endpoint: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            transport: Box::new(transport),
        }
    }

    /// Client over the `reqwest` transport, configured from `config`.
    #[cfg(feature = "remote")]
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self, OperationError> {
        let transport = ReqwestTransport::new(config.timeout, config.access_token.clone())?;
        Ok(Self::new(config.endpoint.clone(), transport))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Expand `{name}` placeholders in `template` and append `query`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Validation` when a placeholder has no value,
    /// or its value is empty or would change the path structure.
    pub fn format_url(
        &self,
        template: &str,
        params: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<String, OperationError> {
        let mut url = self.endpoint.clone();
        let mut errors = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            url.push_str(&rest[..open]);
            let name = &rest[open + 1..close];
            match params.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => match check_param(value) {
                    Ok(()) => url.push_str(value),
                    Err(message) => errors.push(FieldError {
                        path: name.to_string(),
                        message: message.to_string(),
                    }),
                },
                None => errors.push(FieldError {
                    path: name.to_string(),
                    message: "is required".to_string(),
                }),
            }
            rest = &rest[close + 1..];
        }
        url.push_str(rest);

        if !errors.is_empty() {
            return Err(OperationError::Validation { errors });
        }

        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }

        Ok(url)
    }

    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, OperationError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request)?;
        debug!(
            status = response.status,
            correlation_id = response.header(headers::CORRELATION_REQUEST_ID).unwrap_or("-"),
            "received response"
        );
        Ok(response)
    }
}

fn check_param(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("is required");
    }
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace())
    {
        return Err("contains characters not allowed in a path segment");
    }
    Ok(())
}
