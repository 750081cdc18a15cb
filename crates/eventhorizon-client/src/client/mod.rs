//! Client construction and the shared request pipeline.
//!
//! Every endpoint follows one recipe: validate identifiers, build the URL
//! through the escaping builder, marshal the JSON body, set the standard
//! headers, run the auth adapter, execute, and dispatch on status. Endpoint
//! families live in the submodules.

pub mod environments;
pub mod flags;
pub mod github;
pub mod policies;
pub mod runners;
pub mod tasks;
pub mod tenants;
pub mod workstreams;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, IF_MATCH};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthAdapter, NoAuth};
use crate::error::{Error, decode_error};
use crate::paths::{UrlBuilder, normalize_base_url};
use crate::types::FeatureFlags;

/// Header carrying per-request feature-flag overrides as compact JSON.
pub const FEATURE_FLAGS_HEADER: &str = "X-EventHorizon-FeatureFlags";

/// Header resuming a server-sent-event log stream.
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Typed client for the EventHorizon control plane. Cheap to clone; the
/// underlying connection pool is shared.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    auth: Arc<dyn AuthAdapter>,
    cancellation: CancellationToken,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
            auth: Arc::new(NoAuth),
            cancellation: CancellationToken::new(),
        })
    }

    /// Selects the auth strategy. Exactly one adapter is active; there is no
    /// fallback or chaining.
    pub fn with_auth(mut self, auth: Arc<dyn AuthAdapter>) -> Self {
        self.auth = auth;
        self
    }

    /// Installs a token that aborts every in-flight call when cancelled.
    /// Individual calls are additionally cancelled by dropping their future.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a URL at the versioned API root.
    pub(crate) fn url(&self) -> UrlBuilder {
        UrlBuilder::new(&self.base_url).push("v1")
    }

    pub(crate) fn build_request(&self, parts: RequestParts) -> Result<reqwest::Request, Error> {
        let mut builder = self
            .http
            .request(parts.method, parts.url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");

        if let Some(body) = parts.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }
        if let Some(version) = parts.if_match {
            builder = builder.header(IF_MATCH, version.to_string());
        }
        if let Some(flags) = parts.feature_flags
            && !flags.is_empty()
        {
            builder = builder.header(FEATURE_FLAGS_HEADER, flags.header_value()?);
        }
        if let Some(last_event_id) = parts.last_event_id {
            builder = builder.header(LAST_EVENT_ID_HEADER, last_event_id.to_string());
        }

        let mut request = builder.build()?;
        self.auth.adapt(&mut request)?;
        Ok(request)
    }

    /// Sends the request, racing the client-wide cancellation token.
    pub(crate) async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, Error> {
        tokio::select! {
            () = self.cancellation.cancelled() => Err(Error::Cancelled),
            response = self.http.execute(request) => Ok(response?),
        }
    }

    /// Executes and decodes the expected-status JSON body; any other status
    /// runs the error decoder.
    pub(crate) async fn expect_json<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
        expected: StatusCode,
    ) -> Result<T, Error> {
        let response = self.execute(request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if status != expected {
            return Err(decode_error(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(Error::decode)
    }

    /// Executes expecting `204 No Content`.
    pub(crate) async fn expect_no_content(&self, request: reqwest::Request) -> Result<(), Error> {
        let response = self.execute(request).await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if status != StatusCode::NO_CONTENT {
            return Err(decode_error(status, &bytes));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Everything the pipeline needs to construct one HTTP request.
pub(crate) struct RequestParts {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub if_match: Option<u64>,
    pub feature_flags: Option<FeatureFlags>,
    pub last_event_id: Option<u64>,
}

impl RequestParts {
    pub fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            body: None,
            if_match: None,
            feature_flags: None,
            last_event_id: None,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_vec(body).map_err(Error::decode)?);
        Ok(self)
    }

    pub fn if_match(mut self, version: u64) -> Self {
        self.if_match = Some(version);
        self
    }

    pub fn feature_flags(mut self, flags: &FeatureFlags) -> Self {
        if !flags.is_empty() {
            self.feature_flags = Some(flags.clone());
        }
        self
    }

    pub fn last_event_id(mut self, id: Option<u64>) -> Self {
        self.last_event_id = id;
        self
    }
}

/// First-failure-wins identifier validation.
pub(crate) fn require(value: &str, message: &'static str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::validation(message));
    }
    Ok(())
}

pub(crate) const TENANT_ID_REQUIRED: &str = "tenant id is required";
pub(crate) const RUNNER_ID_REQUIRED: &str = "runner id is required";
pub(crate) const QUEUE_ID_REQUIRED: &str = "queue id is required";

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    pub(crate) fn test_client() -> Client {
        Client::new(ClientConfig::new("https://api.eventhorizon.example")).unwrap()
    }

    pub(crate) fn body_string(request: &reqwest::Request) -> String {
        let bytes = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .unwrap_or_default();
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn accept_header_is_always_set() {
        let client = test_client();
        let request = client
            .build_request(RequestParts::new(
                Method::GET,
                client.url().push("tenants").finish(),
            ))
            .unwrap();
        assert_eq!(request.headers()[ACCEPT], "application/json");
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn body_sets_content_type() {
        let client = test_client();
        let parts = RequestParts::new(Method::PUT, client.url().push("tenants").finish())
            .json(&serde_json::json!({"Name": "x"}))
            .unwrap();
        let request = client.build_request(parts).unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_string(&request), r#"{"Name":"x"}"#);
    }

    #[test]
    fn if_match_and_feature_flags_headers() {
        let client = test_client();
        let flags = FeatureFlags::default().set("fast-turns", true);
        let parts = RequestParts::new(Method::PATCH, client.url().push("tenants").finish())
            .if_match(3)
            .feature_flags(&flags);
        let request = client.build_request(parts).unwrap();
        assert_eq!(request.headers()[IF_MATCH], "3");
        assert_eq!(
            request.headers()[FEATURE_FLAGS_HEADER],
            r#"{"fast-turns":true}"#
        );
    }

    #[test]
    fn empty_feature_flags_omit_the_header() {
        let client = test_client();
        let parts = RequestParts::new(Method::GET, client.url().push("tenants").finish())
            .feature_flags(&FeatureFlags::default());
        let request = client.build_request(parts).unwrap();
        assert!(request.headers().get(FEATURE_FLAGS_HEADER).is_none());
    }

    #[test]
    fn last_event_id_header() {
        let client = test_client();
        let parts = RequestParts::new(Method::GET, client.url().push("logs").finish())
            .last_event_id(Some(42));
        let request = client.build_request(parts).unwrap();
        assert_eq!(request.headers()[LAST_EVENT_ID_HEADER], "42");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(Client::new(ClientConfig::new("   ")).is_err());
        assert!(Client::new(ClientConfig::new("gopher://old.example")).is_err());
    }
}
