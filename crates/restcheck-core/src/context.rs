//! Request context: target configuration and the captured response of one
//! scenario.

use crate::error::{HarnessError, NetworkErrorKind, Result};
use crate::method::HttpMethod;
use reqwest::{Client, Url};
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Status and body of one HTTP exchange. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResponse {
    status: u16,
    body: Value,
    raw_body: String,
}

impl CapturedResponse {
    pub fn new(status: u16, body: Value) -> Self {
        let raw_body = body.to_string();
        Self {
            status,
            body,
            raw_body,
        }
    }

    /// Parse `raw_body` as JSON. Bodies that are empty or not JSON are kept
    /// as `null` so the status code can still be asserted.
    pub fn from_raw(status: u16, raw_body: impl Into<String>) -> Self {
        let raw_body = raw_body.into();
        let body = if raw_body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw_body).unwrap_or_else(|e| {
                warn!(status, error = %e, "Response body is not JSON");
                Value::Null
            })
        };
        Self {
            status,
            body,
            raw_body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }
}

/// Per-scenario request state. Configured once, invoked once, then read by
/// assertions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    client: Client,
    target: Option<Url>,
    method: HttpMethod,
    response: Option<CapturedResponse>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// Set the request target. Only syntactic well-formedness is checked; no
    /// network call is made.
    #[instrument(skip(self))]
    pub fn configure(&mut self, base_uri: &str) -> Result<()> {
        let url = parse_absolute_uri(base_uri).map_err(|reason| HarnessError::InvalidUri {
            uri: base_uri.to_string(),
            reason,
        })?;
        debug!(target_uri = %url, "Request target configured");
        self.target = Some(url);
        Ok(())
    }

    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Send exactly one request to the configured target and capture the
    /// response. Fails with `NotConfigured` before touching the network when
    /// no target is set.
    #[instrument(skip(self), fields(target_uri = tracing::field::Empty))]
    pub async fn invoke(
        &mut self,
        method: HttpMethod,
        timeout: Duration,
    ) -> Result<&CapturedResponse> {
        let url = self.target.clone().ok_or(HarnessError::NotConfigured)?;
        tracing::Span::current().record("target_uri", tracing::field::display(&url));
        self.method = method;
        // A failed exchange must not leave the previous response assertable.
        self.response = None;

        let response = self
            .client
            .request(method.into(), url)
            .timeout(timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let raw_body = response.text().await.map_err(network_error)?;
        info!(%method, status, bytes = raw_body.len(), "Response captured");

        Ok(&*self
            .response
            .insert(CapturedResponse::from_raw(status, raw_body)))
    }

    /// The captured response, or `NoResponse` when nothing was sent yet.
    pub fn response(&self) -> Result<&CapturedResponse> {
        self.response.as_ref().ok_or(HarnessError::NoResponse)
    }
}

/// Parse `uri` as an absolute URI with a host.
pub(crate) fn parse_absolute_uri(uri: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(uri).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err("expected an absolute URI with a host".to_string());
    }
    Ok(url)
}

fn network_error(error: reqwest::Error) -> HarnessError {
    let kind = classify(&error);
    warn!(%kind, error = %error, "Request failed");
    HarnessError::Network {
        kind,
        reason: error_chain(&error),
    }
}

fn classify(error: &reqwest::Error) -> NetworkErrorKind {
    if error.is_timeout() {
        return NetworkErrorKind::Timeout;
    }
    let chain = error_chain(error).to_lowercase();
    if chain.contains("dns error") || chain.contains("lookup address") {
        NetworkErrorKind::DnsFailure
    } else {
        NetworkErrorKind::ConnectionFailed
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
