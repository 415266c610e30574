//! Sync entries and their resolver bindings

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::traits::Resolver;

/// The resolver attached to a sync entry
///
/// Either scoped to the servers the entry declared, or the shared
/// process-wide default resolver.
#[derive(Clone)]
pub struct ResolverBinding {
    /// Servers declared by the entry (empty for the default resolver)
    servers: Vec<SocketAddr>,

    resolver: Arc<dyn Resolver>,
}

impl ResolverBinding {
    /// Bind to a resolver scoped to the entry's own servers
    pub fn scoped(servers: Vec<SocketAddr>, resolver: Arc<dyn Resolver>) -> Self {
        Self { servers, resolver }
    }

    /// Bind to the shared default resolver
    pub fn shared_default(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            servers: Vec::new(),
            resolver,
        }
    }

    pub fn is_default(&self) -> bool {
        self.servers.is_empty()
    }

    /// Servers the entry declared; empty when bound to the default
    pub fn declared_servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Servers the underlying resolver actually queries
    pub fn servers(&self) -> Vec<SocketAddr> {
        self.resolver.servers()
    }

    /// The underlying resolver handle
    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    /// Forward lookup of `hostname`
    ///
    /// Errors from the resolver are surfaced unchanged.
    pub async fn lookup(&self, hostname: &str) -> Result<Vec<Ipv4Addr>> {
        info!("   resolving {} using {:?}", hostname, self.servers());
        let addresses = self.resolver.lookup_ipv4(hostname).await?;
        info!("   resolved {} to {:?}", hostname, addresses);
        Ok(addresses)
    }
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBinding")
            .field("servers", &self.servers)
            .field("default", &self.is_default())
            .finish()
    }
}

/// Destination record of a sync entry in the cloud zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTarget {
    /// Record set name relative to the zone
    pub record_name: String,

    /// DNS zone name
    pub zone: String,

    /// Resource group owning the zone
    pub resource_group: String,
}

/// One hostname to cloud record mapping under management
///
/// Only built by the configuration loader after defaulting and validation,
/// so every field needed for a DNS write is present.
#[derive(Debug, Clone)]
pub struct SyncEntry {
    name: String,
    target: RecordTarget,
    ttl: u32,
    resolver: ResolverBinding,
}

impl SyncEntry {
    pub(crate) fn new(
        name: String,
        target: RecordTarget,
        ttl: u32,
        resolver: ResolverBinding,
    ) -> Self {
        debug_assert!(!name.is_empty() && ttl > 0);
        Self {
            name,
            target,
            ttl,
            resolver,
        }
    }

    /// Hostname to resolve
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &RecordTarget {
        &self.target
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn resolver(&self) -> &ResolverBinding {
        &self.resolver
    }

    /// Resolve this entry's hostname with its bound resolver
    pub async fn lookup(&self) -> Result<Vec<Ipv4Addr>> {
        debug!("Looking up {} for record {}", self.name, self.target.record_name);
        self.resolver.lookup(&self.name).await
    }
}
