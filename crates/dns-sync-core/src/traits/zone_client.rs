// # DNS Zone Client Trait
//
// Defines the single capability the reconciliation engine needs from a
// cloud DNS provider: create or replace an address record set.
//
// ## Implementations
//
// - Azure DNS: `dns-sync-provider-azure` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_sync_core::record::{RecordSet, RecordType};
// use dns_sync_core::traits::DnsZoneClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* DnsZoneClient implementation */;
//
//     let record_set = RecordSet::from_addresses(300, ["10.0.0.1".parse()?]);
//     client
//         .create_or_update_record("dns-rg", "example.com", "www", RecordType::A, &record_set)
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::record::{RecordSet, RecordType};

/// Result of a create-or-update call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    /// The record set did not exist and was created
    Created,
    /// An existing record set was replaced
    Updated,
}

/// Trait for DNS zone clients
///
/// # Idempotency
///
/// `create_or_update_record` is an upsert: calling it repeatedly with the
/// same arguments must converge to the same remote state. The engine relies
/// on this and never sends different arguments for the same entry within a
/// cycle.
///
/// # Retries
///
/// Implementations perform a single attempt and return the error. The next
/// scheduled cycle is the only retry mechanism.
///
/// # Sharing
///
/// A client is constructed once (after authentication) and shared by the
/// engine across cycles. The engine never closes or re-creates it.
#[async_trait]
pub trait DnsZoneClient: Send + Sync {
    /// Create or replace the record set `name` of `record_type` in `zone`
    ///
    /// # Parameters
    ///
    /// - `resource_group`: Resource group that owns the zone
    /// - `zone`: DNS zone name (e.g. "example.com")
    /// - `name`: Record set name relative to the zone (e.g. "www" or "@")
    /// - `record_type`: Record type, always `A` for this system
    /// - `record_set`: TTL and addresses to publish
    async fn create_or_update_record(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
        record_set: &RecordSet,
    ) -> Result<UpsertResult, crate::Error>;

    /// Get the provider name (for logging and error messages)
    fn provider_name(&self) -> &'static str;
}
