//! Core traits for the DNS sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Resolver`]: Forward address lookups for sync entries
//! - [`DnsZoneClient`]: Create-or-update of record sets in a cloud DNS zone

pub mod resolver;
pub mod zone_client;

pub use resolver::{DEFAULT_DNS_PORT, DEFAULT_RESOLVER_SERVERS, Resolver, ResolverFactory};
pub use zone_client::{DnsZoneClient, UpsertResult};
