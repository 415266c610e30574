// # Resolver Trait
//
// Defines the interface for forward address lookups of sync entry hostnames.
//
// ## Implementations
//
// - hickory-resolver backed: `dns-sync-resolver` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_sync_core::traits::Resolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* Resolver implementation */;
//
//     let addresses = resolver.lookup_ipv4("www.example.com").await?;
//     println!("resolved to {:?}", addresses);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Public recursive resolvers used by entries that declare no `dns` servers
pub const DEFAULT_RESOLVER_SERVERS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
    IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
];

/// Port assumed when a resolver server is given without one
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Trait for name resolution backends
///
/// # Caching
///
/// Implementations must not cache answers between calls. Every
/// reconciliation cycle re-resolves from scratch so the zone reflects the
/// current upstream state.
///
/// # Errors
///
/// A lookup that completes with no address records is `Ok(vec![])`.
/// Anything else that prevents an answer (NXDOMAIN, timeout, unreachable
/// server) is an [`Error::Resolution`](crate::Error::Resolution).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname` to its IPv4 addresses
    async fn lookup_ipv4(&self, hostname: &str) -> Result<Vec<Ipv4Addr>, crate::Error>;

    /// The name servers this resolver queries (for logging)
    fn servers(&self) -> Vec<SocketAddr>;
}

/// Helper trait for constructing resolvers while loading configuration
pub trait ResolverFactory: Send + Sync {
    /// Create a resolver scoped to exactly `servers`
    ///
    /// `servers` is never empty; entries without servers are bound to
    /// [`ResolverFactory::default_resolver`] instead.
    fn create(&self, servers: &[SocketAddr]) -> Result<Arc<dyn Resolver>, crate::Error>;

    /// The process-wide default resolver
    ///
    /// Every call must hand out the same shared instance.
    fn default_resolver(&self) -> Arc<dyn Resolver>;
}
