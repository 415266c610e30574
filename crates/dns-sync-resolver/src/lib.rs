// # hickory Resolver
//
// This crate provides the name resolution backend for the DNS sync system,
// built on `hickory-resolver`.
//
// ## Behaviour
//
// - Only A records are queried (IPv4 only)
// - Nothing is cached: every lookup builds a fresh resolver, so each
//   reconciliation cycle sees the current upstream answer
// - A NOERROR answer without address records is an empty result, not an error
// - Entries without `dns` servers share one default resolver
//   (8.8.8.8 and 8.8.4.4) created once per process

use dns_sync_core::traits::{DEFAULT_DNS_PORT, DEFAULT_RESOLVER_SERVERS, Resolver, ResolverFactory};
use dns_sync_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::lookup_ip::LookupIp;
use hickory_resolver::proto::op::ResponseCode;

/// Per-query timeout
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Attempts per server before a lookup fails
const DEFAULT_ATTEMPTS: usize = 2;

/// Resolver querying a fixed list of name servers
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    servers: Vec<SocketAddr>,
    timeout: Duration,
    attempts: usize,
}

impl HickoryResolver {
    /// Create a resolver for `servers`, each queried over UDP with TCP fallback
    pub fn new(servers: Vec<SocketAddr>) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::config("a resolver needs at least one name server"));
        }

        Ok(Self {
            servers,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            attempts: DEFAULT_ATTEMPTS,
        })
    }

    /// Resolver for the public default servers
    pub fn public_default() -> Self {
        Self {
            servers: DEFAULT_RESOLVER_SERVERS
                .iter()
                .map(|ip| SocketAddr::new(*ip, DEFAULT_DNS_PORT))
                .collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Set the per-query timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of attempts per server
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    fn resolver_config(&self) -> ResolverConfig {
        let mut name_servers = Vec::with_capacity(self.servers.len() * 2);
        for server in &self.servers {
            name_servers.push(NameServerConfig::new(*server, Protocol::Udp));
            name_servers.push(NameServerConfig::new(*server, Protocol::Tcp));
        }

        ResolverConfig::from_parts(None, vec![], name_servers)
    }

    fn resolver_opts(&self) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        opts.timeout = self.timeout;
        opts.attempts = self.attempts;
        opts.cache_size = 0;
        opts.use_hosts_file = false;
        opts
    }
}

#[async_trait::async_trait]
impl Resolver for HickoryResolver {
    async fn lookup_ipv4(&self, hostname: &str) -> Result<Vec<Ipv4Addr>> {
        let resolver = TokioAsyncResolver::tokio(self.resolver_config(), self.resolver_opts());

        tracing::debug!("Querying {:?} for A records of {}", self.servers, hostname);
        addresses_from(hostname, resolver.lookup_ip(hostname).await)
    }

    fn servers(&self) -> Vec<SocketAddr> {
        self.servers.clone()
    }
}

/// Turn a lookup outcome into IPv4 addresses
fn addresses_from(
    hostname: &str,
    result: std::result::Result<LookupIp, ResolveError>,
) -> Result<Vec<Ipv4Addr>> {
    match result {
        Ok(lookup) => Ok(lookup
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect()),
        Err(e) if is_empty_answer(e.kind()) => {
            tracing::debug!("{} has no A records", hostname);
            Ok(Vec::new())
        }
        Err(e) => Err(Error::resolution(hostname, e.to_string())),
    }
}

/// NOERROR with an empty answer section
fn is_empty_answer(kind: &ResolveErrorKind) -> bool {
    matches!(
        kind,
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError,
            ..
        }
    )
}

/// Factory for creating hickory resolvers
///
/// The default resolver is built on first use and shared afterwards.
#[derive(Default)]
pub struct HickoryResolverFactory {
    default: OnceLock<Arc<HickoryResolver>>,
}

impl HickoryResolverFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResolverFactory for HickoryResolverFactory {
    fn create(&self, servers: &[SocketAddr]) -> Result<Arc<dyn Resolver>> {
        Ok(Arc::new(HickoryResolver::new(servers.to_vec())?))
    }

    fn default_resolver(&self) -> Arc<dyn Resolver> {
        let resolver = self
            .default
            .get_or_init(|| Arc::new(HickoryResolver::public_default()));
        Arc::clone(resolver) as Arc<dyn Resolver>
    }
}
