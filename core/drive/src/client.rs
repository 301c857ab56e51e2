//! Authenticated HTTP context shared by the gateway components.

use oauth2::AccessToken;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;
use url::Url;

use drivegate_common::{Error, Result};

use crate::auth::AccessTokenSource;
use crate::config::Credentials;

/// Outcome of decoding a response body.
#[derive(Debug)]
pub(crate) enum Decoded<T> {
    Value(T),
    /// Nothing usable; the string says why.
    Empty(String),
}

impl<T: Default> Decoded<T> {
    /// Collapse to the default value, logging the reason.
    pub(crate) fn or_default(self, operation: &str) -> T {
        match self {
            Decoded::Value(value) => value,
            Decoded::Empty(reason) => {
                warn!(operation, %reason, "Remote response collapsed to empty result");
                T::default()
            }
        }
    }
}

/// Decode a JSON body, treating non-success statuses and blank bodies as empty.
pub(crate) fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Decoded<T> {
    if !status.is_success() {
        return Decoded::Empty(format!("status {}", status));
    }
    if body.trim().is_empty() {
        return Decoded::Empty("empty body".to_string());
    }
    match serde_json::from_str(body) {
        Ok(value) => Decoded::Value(value),
        Err(e) => Decoded::Empty(format!("unparseable body: {}", e)),
    }
}

/// HTTP client bound to one set of credentials.
pub struct ApiClient {
    http: Client,
    credentials: Arc<Credentials>,
    tokens: Arc<dyn AccessTokenSource>,
}

impl ApiClient {
    pub fn new(
        http: Client,
        credentials: Arc<Credentials>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            http,
            credentials,
            tokens,
        }
    }

    /// Build a shared HTTP client with the gateway's user agent.
    pub fn build_http() -> Result<Client> {
        Client::builder()
            .user_agent(concat!("DriveGate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch a fresh bearer token.
    pub async fn access_token(&self) -> AccessToken {
        self.tokens.access_token().await
    }

    /// Join path segments onto the API base, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.credentials.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `{base}/drive/v3/files[/segments...]`
    pub fn files_endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut all = vec!["drive", "v3", "files"];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    /// Attach the bearer token to a request.
    pub fn authorize(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Bearer {}", token.secret()))
    }

    /// Send a request, mapping transport failures to [`Error::Network`].
    pub async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} failed: {}", operation, e)))
    }

    /// Read the body and decode it.
    pub(crate) async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        operation: &str,
    ) -> Result<Decoded<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("{}: failed to read response: {}", operation, e)))?;
        Ok(decode_body(status, &body))
    }

    /// Read the body and decode it, collapsing any failure to `T::default()`.
    pub(crate) async fn decode_or_default<T: DeserializeOwned + Default>(
        &self,
        response: Response,
        operation: &str,
    ) -> Result<T> {
        Ok(self.decode(response, operation).await?.or_default(operation))
    }
}
