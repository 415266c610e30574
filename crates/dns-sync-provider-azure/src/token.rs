//! Azure AD client-credentials tokens
//!
//! One bearer token is fetched for the Resource Manager audience and reused
//! until it is close to expiry. Only the token is cached; nothing about the
//! DNS zone is.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dns_sync_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Azure AD authority for the public cloud
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Audience of Azure Resource Manager tokens
pub const RESOURCE_MANAGER_RESOURCE: &str = "https://management.azure.com/";

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 300;

/// HTTP timeout for token requests
const TOKEN_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A bearer token and its expiry
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token is still usable at `now`, keeping the refresh margin
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response
///
/// The v1 endpoint sends `expires_in` as a string, newer ones as a number.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Value,
}

/// Parse a token endpoint response body received at `now`
fn parse_token_response(body: &str, now: DateTime<Utc>) -> Result<AccessToken> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::auth(format!("invalid token response: {}", e)))?;

    let expires_in = match &response.expires_in {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::auth("invalid token response: bad expires_in"))?;

    Ok(AccessToken::new(
        response.access_token,
        now + chrono::Duration::seconds(expires_in),
    ))
}

/// Pull the human readable reason out of an Azure AD error body
fn error_description(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json["error_description"]
                .as_str()
                .or_else(|| json["error"].as_str())
                .map(|s| s.lines().next().unwrap_or(s).to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Acquires and caches service principal tokens
///
/// # Security
///
/// The Debug implementation does NOT expose the client secret or the token.
pub struct TokenProvider {
    tenant_id: String,
    client_id: String,

    /// ⚠️ NEVER log this value
    client_secret: String,

    authority: String,
    client: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("authority", &self.authority)
            .finish()
    }
}

impl TokenProvider {
    /// Create a token provider for the public cloud authority
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(TOKEN_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::auth(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            client,
            cached: Mutex::new(None),
        })
    }

    /// Use another Azure AD authority (sovereign clouds)
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    /// Token endpoint URL for this tenant
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/token", self.authority, self.tenant_id)
    }

    /// A valid bearer token, fetching a new one when the cached one is stale
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.secret().to_string());
            }
            tracing::debug!("Azure token expires at {}, refreshing", token.expires_at());
        }

        let token = self.fetch().await?;
        let secret = token.secret().to_string();
        *cached = Some(token);

        Ok(secret)
    }

    /// Request a new token with the client-credentials grant
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /{tenant}/oauth2/token
    /// Content-Type: application/x-www-form-urlencoded
    ///
    /// grant_type=client_credentials&client_id=...&client_secret=...&resource=https://management.azure.com/
    /// ```
    async fn fetch(&self) -> Result<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", RESOURCE_MANAGER_RESOURCE),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::auth(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::auth(format!(
                "token endpoint returned {}: {}",
                status,
                error_description(&body)
            )));
        }

        let token = parse_token_response(&body, Utc::now())?;
        tracing::debug!("Acquired Azure token valid until {}", token.expires_at());
        Ok(token)
    }
}
