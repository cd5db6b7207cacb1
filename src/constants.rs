//! HTTP status codes, header names and content types used on the wire.

/// HTTP status codes the request cycle checks for.
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const NOT_FOUND: u16 = 404;
}

/// Header names.
pub mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Correlation id echoed by the server; logged to tie client and server traces.
    pub const CORRELATION_REQUEST_ID: &str = "x-ms-correlation-request-id";
}

pub const APPLICATION_JSON: &str = "application/json";

pub const USER_AGENT: &str = concat!("mgmt-patch/", env!("CARGO_PKG_VERSION"));

/// Query parameter carrying the pinned API version.
pub const API_VERSION_PARAM: &str = "api-version";

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
