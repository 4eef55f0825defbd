//! `reqwest`-backed transport for the ONTAP management endpoint.

use std::time::Duration;

use tracing::debug;

use super::{ApiRequest, ApiResponse, Connector, Method, Transport, TransportError, TransportFuture};
use crate::credential::Credential;
use crate::resource::ManagementEndpoint;

/// Request timeout applied to every management call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds [`HttpTransport`] clients.
///
/// Clients authenticate with basic auth and accept the management
/// endpoint's self-signed certificate.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    /// Creates a connector applying `timeout` to every request.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(
        &self,
        endpoint: &ManagementEndpoint,
        credential: &Credential,
    ) -> Result<HttpTransport, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Ok(HttpTransport {
            client,
            base_url: endpoint.base_url(),
            username: endpoint.username.clone(),
            password: credential.clone(),
        })
    }
}

/// Authenticated client scoped to a single lifecycle operation.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: Credential,
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, request.path);
            debug!(method = ?request.method, %url, "sending management request");

            let mut builder = self
                .client
                .request(to_reqwest(request.method), &url)
                .basic_auth(&self.username, Some(self.password.expose()));
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|err| classify(&err))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|err| classify(&err))?;
            debug!(status, %url, "management request completed");
            Ok(ApiResponse { status, body })
        })
    }
}
