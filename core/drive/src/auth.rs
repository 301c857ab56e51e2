//! Bearer token acquisition for the remote API.

use async_trait::async_trait;
use oauth2::AccessToken;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

use drivegate_common::{Error, Result};

use crate::config::Credentials;

/// Source of bearer tokens for outbound calls.
///
/// Implementations never fail: an unusable credential yields an empty token,
/// which the remote API then rejects.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Get a token for the next sequence of calls.
    async fn access_token(&self) -> AccessToken;
}

/// Exchanges the refresh credential for a new access token on every call.
///
/// No caching or expiry tracking.
pub struct RefreshTokenProvider {
    http: Client,
    credentials: Arc<Credentials>,
}

impl RefreshTokenProvider {
    pub fn new(http: Client, credentials: Arc<Credentials>) -> Self {
        Self { http, credentials }
    }

    /// Request a token from the token endpoint.
    ///
    /// Returns an empty token when the response has no `access_token` field.
    ///
    /// # Errors
    /// - Network errors
    /// - Response body is not JSON
    pub async fn request_token(&self) -> Result<AccessToken> {
        let credentials = &self.credentials;

        let response = self
            .http
            .post(credentials.token_url.url().clone())
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.secret().as_str()),
                ("refresh_token", credentials.refresh_token.secret().as_str()),
                ("grant_type", credentials.grant_type.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read token response: {}", e)))?;

        if !status.is_success() {
            warn!(%status, "Token endpoint returned non-success status");
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Authentication(format!("Unparseable token response: {}", e)))?;

        let token = value
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        if token.is_empty() {
            warn!("Token response carried no access_token");
        }

        Ok(AccessToken::new(token.to_string()))
    }
}

#[async_trait]
impl AccessTokenSource for RefreshTokenProvider {
    async fn access_token(&self) -> AccessToken {
        match self.request_token().await {
            Ok(token) => {
                debug!("Fetched access token");
                token
            }
            Err(e) => {
                warn!(error = %e, "Access token unavailable, continuing unauthenticated");
                AccessToken::new(String::new())
            }
        }
    }
}

/// Fixed token, for callers that manage tokens themselves.
pub struct StaticToken(pub AccessToken);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> AccessToken {
        self.0.clone()
    }
}
