//! Azure DNS record set client

use std::time::Duration;

use async_trait::async_trait;
use dns_sync_core::record::{RecordSet, RecordType};
use dns_sync_core::traits::{DnsZoneClient, UpsertResult};
use dns_sync_core::{Error, Result};
use reqwest::StatusCode;
use serde::Serialize;

use crate::credentials::AzureCredentials;
use crate::token::TokenProvider;

/// Azure Resource Manager endpoint for the public cloud
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";

/// DNS record sets API version
pub const DNS_API_VERSION: &str = "2018-05-01";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "azure";

/// Request body of a record set PUT
#[derive(Debug, Serialize)]
struct RecordSetBody {
    properties: RecordSetProperties,
}

#[derive(Debug, Serialize)]
struct RecordSetProperties {
    #[serde(rename = "TTL")]
    ttl: u32,

    #[serde(rename = "ARecords")]
    a_records: Vec<ARecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ARecord {
    ipv4_address: String,
}

/// Build the JSON body for `record_set`
pub fn record_set_body(record_set: &RecordSet) -> serde_json::Value {
    let body = RecordSetBody {
        properties: RecordSetProperties {
            ttl: record_set.ttl,
            a_records: record_set
                .address_strings()
                .into_iter()
                .map(|ipv4_address| ARecord { ipv4_address })
                .collect(),
        },
    };

    serde_json::json!(body)
}

/// Map a failed record set PUT to an error
fn status_error(status: StatusCode, body: &str, target: &str) -> Error {
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: service principal lacks access to {}. Status: {}",
            target, status
        ),
        404 => format!("Zone or resource group not found for {}. Status: {}", target, status),
        409 | 412 => format!(
            "Conflict: record set {} is being modified concurrently. Status: {}",
            target, status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Azure server error (transient): {} - {}", status, body),
        _ => format!("Failed to update record set {}: {} - {}", target, status, body),
    };

    Error::provider(PROVIDER_NAME, message)
}

/// Azure DNS zone client
///
/// Writes A record sets with a single `PUT` per call. The request replaces
/// the whole record set, so repeating it with the same arguments leaves the
/// zone unchanged.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client logs the intended `PUT` and its
/// payload and reports `Updated` without sending anything.
///
/// # Security
///
/// The Debug implementation does NOT expose credentials or tokens.
pub struct AzureDnsClient {
    subscription_id: String,
    tokens: TokenProvider,
    resource_manager: String,
    client: reqwest::Client,
    dry_run: bool,
}

impl std::fmt::Debug for AzureDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDnsClient")
            .field("subscription_id", &self.subscription_id)
            .field("tokens", &self.tokens)
            .field("resource_manager", &self.resource_manager)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AzureDnsClient {
    /// Create a client for the subscription in `credentials`
    ///
    /// No request is made; call [`AzureDnsClient::authorize`] to check the
    /// credentials up front.
    pub fn new(credentials: &AzureCredentials, dry_run: bool) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("failed to build HTTP client: {}", e)))?;

        let tokens = TokenProvider::new(
            &credentials.tenant_id,
            &credentials.aad_client_id,
            &credentials.aad_client_secret,
        )?;

        Ok(Self {
            subscription_id: credentials.subscription_id.clone(),
            tokens,
            resource_manager: DEFAULT_RESOURCE_MANAGER.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a client and fetch its first token
    pub async fn connect(credentials: &AzureCredentials, dry_run: bool) -> Result<Self> {
        let client = Self::new(credentials, dry_run)?;
        client.authorize().await?;
        Ok(client)
    }

    /// Use another Resource Manager endpoint (sovereign clouds)
    pub fn with_resource_manager(mut self, endpoint: impl Into<String>) -> Self {
        self.resource_manager = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another Azure AD authority (sovereign clouds)
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.tokens = self.tokens.with_authority(authority);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Fetch the service principal token so bad credentials fail at startup
    pub async fn authorize(&self) -> Result<()> {
        tracing::info!("Fetching Azure service principal token");
        self.tokens.token().await?;
        tracing::info!(" * successful");
        Ok(())
    }

    /// URL of a record set resource
    pub fn record_set_url(
        &self,
        resource_group: &str,
        zone: &str,
        record_type: RecordType,
        name: &str,
    ) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones/{}/{}/{}?api-version={}",
            self.resource_manager,
            self.subscription_id,
            resource_group,
            zone,
            record_type.as_str(),
            name,
            DNS_API_VERSION
        )
    }
}

#[async_trait]
impl DnsZoneClient for AzureDnsClient {
    /// Create or replace an A record set
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/dnsZones/{zone}/A/{name}?api-version=2018-05-01
    /// Authorization: Bearer <token>
    /// {
    ///   "properties": {
    ///     "TTL": 300,
    ///     "ARecords": [ { "ipv4Address": "10.0.0.1" } ]
    ///   }
    /// }
    /// ```
    async fn create_or_update_record(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
        record_set: &RecordSet,
    ) -> Result<UpsertResult> {
        let url = self.record_set_url(resource_group, zone, record_type, name);
        let body = record_set_body(record_set);
        let target = format!("{}/{}/{}", zone, record_type, name);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send PUT request to {} with payload: {}", url, body);
            return Ok(UpsertResult::Updated);
        }

        let token = self.tokens.token().await?;

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, &target));
        }

        let result = if status == StatusCode::CREATED {
            UpsertResult::Created
        } else {
            UpsertResult::Updated
        };

        tracing::debug!("Record set {} written ({})", target, status);
        Ok(result)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn credentials() -> AzureCredentials {
        AzureCredentials {
            tenant_id: "tenant".to_string(),
            subscription_id: "sub-123".to_string(),
            aad_client_id: "client".to_string(),
            aad_client_secret: "secret_value_12345".to_string(),
        }
    }

    #[test]
    fn test_record_set_url() {
        let client = AzureDnsClient::new(&credentials(), false).unwrap();

        assert_eq!(
            client.record_set_url("dns-rg", "example.com", RecordType::A, "www"),
            "https://management.azure.com/subscriptions/sub-123/resourceGroups/dns-rg/providers/Microsoft.Network/dnsZones/example.com/A/www?api-version=2018-05-01"
        );
    }

    #[test]
    fn test_record_set_url_with_custom_endpoint() {
        let client = AzureDnsClient::new(&credentials(), false)
            .unwrap()
            .with_resource_manager("https://management.usgovcloudapi.net/");

        assert!(
            client
                .record_set_url("rg", "example.com", RecordType::A, "@")
                .starts_with("https://management.usgovcloudapi.net/subscriptions/sub-123/")
        );
    }

    #[test]
    fn test_record_set_body() {
        let record_set = RecordSet::from_addresses(
            300,
            [Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 1)],
        );

        assert_eq!(
            record_set_body(&record_set),
            serde_json::json!({
                "properties": {
                    "TTL": 300,
                    "ARecords": [
                        { "ipv4Address": "10.0.0.1" },
                        { "ipv4Address": "10.0.0.2" }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_empty_record_set_body() {
        let record_set = RecordSet::from_addresses(60, []);
        assert_eq!(
            record_set_body(&record_set),
            serde_json::json!({ "properties": { "TTL": 60, "ARecords": [] } })
        );
    }

    #[test]
    fn test_status_error_mapping() {
        let cases = [
            (StatusCode::FORBIDDEN, "Authentication failed"),
            (StatusCode::UNAUTHORIZED, "Authentication failed"),
            (StatusCode::NOT_FOUND, "not found"),
            (StatusCode::CONFLICT, "Conflict"),
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit"),
            (StatusCode::SERVICE_UNAVAILABLE, "transient"),
            (StatusCode::BAD_REQUEST, "Failed to update record set"),
        ];

        for (status, expected) in cases {
            match status_error(status, "body", "example.com/A/www") {
                Error::Provider { provider, message } => {
                    assert_eq!(provider, "azure");
                    assert!(message.contains(expected), "{}: {}", status, message);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_new_rejects_incomplete_credentials() {
        let mut incomplete = credentials();
        incomplete.subscription_id.clear();

        let err = AzureDnsClient::new(&incomplete, false).unwrap_err();
        assert_eq!(err.field(), Some("subscriptionId"));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        // The authority is unroutable, so any request would fail
        let client = AzureDnsClient::new(&credentials(), true)
            .unwrap()
            .with_authority("http://127.0.0.1:9")
            .with_resource_manager("http://127.0.0.1:9");
        assert!(client.is_dry_run());

        let record_set = RecordSet::from_addresses(300, [Ipv4Addr::new(10, 0, 0, 1)]);
        let result = client
            .create_or_update_record("rg", "example.com", "www", RecordType::A, &record_set)
            .await
            .unwrap();

        assert_eq!(result, UpsertResult::Updated);
    }

    #[test]
    fn test_secrets_not_exposed_in_debug() {
        let client = AzureDnsClient::new(&credentials(), false).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_value_12345"));
        assert!(debug_str.contains("AzureDnsClient"));
        assert_eq!(client.provider_name(), "azure");
    }
}
