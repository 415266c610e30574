//! Provider-agnostic record set representation
//!
//! A [`RecordSet`] is rebuilt from scratch on every cycle from the addresses
//! a resolver returned. It is never patched incrementally.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// DNS record type written by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TTL plus the address records to publish under one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub ttl: u32,
    pub addresses: Vec<Ipv4Addr>,
}

impl RecordSet {
    /// Build a record set from resolved addresses
    ///
    /// Addresses are sorted and de-duplicated, so two lookups returning the
    /// same set in a different order produce identical record sets. An empty
    /// input yields an empty record set.
    pub fn from_addresses(ttl: u32, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        let mut addresses: Vec<Ipv4Addr> = addresses.into_iter().collect();
        addresses.sort_unstable();
        addresses.dedup();

        Self { ttl, addresses }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Addresses rendered as strings, in record order
    pub fn address_strings(&self) -> Vec<String> {
        self.addresses.iter().map(|ip| ip.to_string()).collect()
    }
}
