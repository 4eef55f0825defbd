//! Transport abstraction for the ONTAP REST API.
//!
//! Lifecycle code builds [`ApiRequest`] values and hands them to a
//! [`Transport`]. A [`Connector`] produces a fresh transport for each
//! operation from the endpoint and the current credential, so credential
//! rotation never leaves a long-lived client authenticating with a stale
//! password.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

use crate::credential::Credential;
use crate::resource::ManagementEndpoint;

mod http;

pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpConnector, HttpTransport};

/// HTTP methods used by the lifecycle manager.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    /// Collection reads.
    Get,
    /// Resource creation.
    Post,
    /// Resource deletion.
    Delete,
}

/// A single call against the management API.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API root, for example `/storage/volumes`.
    pub path: String,
    /// Query parameters in insertion order.
    pub query: Vec<(String, String)>,
    /// JSON body for mutating calls.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Builds a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    /// Builds a `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    /// Builds a `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, None)
    }

    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Returns the first value recorded for `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Status and raw body of an API response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl ApiResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Network-level failures, distinct from HTTP error statuses.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Raised when the HTTP client cannot be configured.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    /// Raised when the request exceeds the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Raised for connection, TLS and I/O failures.
    #[error("request failed: {0}")]
    Request(String),
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>>;

/// Sends authenticated requests to the management API.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Produces a transport bound to an endpoint and credential.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Builds a transport for a single lifecycle operation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the client cannot be built.
    fn connect(
        &self,
        endpoint: &ManagementEndpoint,
        credential: &Credential,
    ) -> Result<Self::Transport, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn query_value_returns_first_match() {
        let request = ApiRequest::get("/storage/volumes")
            .query("name", "vol1")
            .query("svm.name", "svm0");
        assert_eq!(request.query_value("svm.name"), Some("svm0"));
        assert_eq!(request.query_value("fields"), None);
    }

    #[rstest]
    #[case(200, true)]
    #[case(202, true)]
    #[case(299, true)]
    #[case(302, false)]
    #[case(404, false)]
    fn response_success_covers_2xx(#[case] status: u16, #[case] expected: bool) {
        let response = ApiResponse {
            status,
            body: String::new(),
        };
        assert_eq!(response.is_success(), expected);
    }
}
