// # Azure DNS Provider
//
// This crate provides the Azure DNS zone client for the DNS sync system.
//
// ## Implementation
//
// - ✅ One `PUT` per record set per cycle (create or replace)
// - ✅ Service principal authentication (client-credentials grant)
// - ✅ Token reuse until five minutes before expiry
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (the next scheduled cycle is the retry)
// - ❌ NO record set caching or diffing (every cycle rewrites every entry)
//
// ## Security Requirements
//
// - Client secret and bearer tokens NEVER appear in logs or Debug output
// - Incomplete credentials fail before any request is made
//
// ## API Reference
//
// - Azure AD v1 token endpoint: POST `/{tenant}/oauth2/token`
// - Record Sets - Create Or Update (2018-05-01):
//   PUT `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/dnsZones/{zone}/{type}/{name}`

pub mod client;
pub mod credentials;
pub mod token;

pub use client::{AzureDnsClient, DEFAULT_RESOURCE_MANAGER, DNS_API_VERSION, record_set_body};
pub use credentials::AzureCredentials;
pub use token::{AccessToken, TokenProvider};
