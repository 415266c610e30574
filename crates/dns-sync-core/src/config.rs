//! Configuration loading for the DNS sync system
//!
//! The entry file is a YAML document with a list of entries and a block of
//! defaults:
//!
//! ```yaml
//! default:
//!   resourceGroup: dns-rg
//!   zone: example.com
//!   ttl: 300
//! entries:
//!   - name: www.google.com
//!     dns: [8.8.8.8]
//!     azure:
//!       name: google
//!       ttl: 60
//! ```
//!
//! Loading applies the defaults per field, validates every entry in
//! declaration order (stopping at the first missing field) and binds a
//! resolver to each entry. No network access happens here.

use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::entry::{RecordTarget, ResolverBinding, SyncEntry};
use crate::error::{Error, Result};
use crate::traits::{DEFAULT_DNS_PORT, ResolverFactory};

/// Field names reported by validation errors, in check order
pub mod field {
    pub const NAME: &str = "name";
    pub const TARGET_NAME: &str = "azure.name";
    pub const TARGET_ZONE: &str = "azure.zone";
    pub const TTL: &str = "azure.ttl";
    pub const RESOURCE_GROUP: &str = "azure.resourceGroup";
    pub const DNS: &str = "dns";
}

/// Raw entry file as written on disk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub entries: Vec<RawEntry>,

    #[serde(default)]
    pub default: RawDefaults,
}

/// Raw `default` block
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDefaults {
    #[serde(default)]
    pub resource_group: Option<String>,

    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Raw entry as written in the `entries` list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub name: Option<String>,

    /// Resolver servers; empty means the default resolver
    #[serde(default)]
    pub dns: Vec<String>,

    #[serde(default)]
    pub azure: RawTarget,
}

/// Raw `azure` block of an entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTarget {
    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ttl: Option<i64>,

    #[serde(default)]
    pub resource_group: Option<String>,
}

/// Configuration-wide defaults applied to entries missing a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub resource_group: String,
    pub zone: String,

    /// Zero when no default TTL is configured
    pub ttl: i64,
}

impl From<RawDefaults> for Defaults {
    fn from(raw: RawDefaults) -> Self {
        Self {
            resource_group: raw.resource_group.unwrap_or_default(),
            zone: raw.zone.unwrap_or_default(),
            ttl: raw.ttl.unwrap_or_default(),
        }
    }
}

/// Validated, ready-to-run set of sync entries
///
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    entries: Vec<SyncEntry>,
    defaults: Defaults,
}

impl SyncConfig {
    /// Load and validate the entry file at `path`
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Parse`] if the document is malformed
    /// - [`Error::Validation`] naming the first missing field
    pub fn load<P: AsRef<Path>>(path: P, resolvers: &dyn ResolverFactory) -> Result<Self> {
        let path = path.as_ref();
        info!("Parsing DNS configuration from {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let document: RawDocument = serde_yaml::from_reader(reader)?;

        Self::from_document(document, resolvers)
    }

    /// Parse and validate an entry document held in memory
    pub fn from_yaml_str(yaml: &str, resolvers: &dyn ResolverFactory) -> Result<Self> {
        let document: RawDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(document, resolvers)
    }

    /// Apply defaults, validate and bind resolvers for a parsed document
    pub fn from_document(document: RawDocument, resolvers: &dyn ResolverFactory) -> Result<Self> {
        let defaults = Defaults::from(document.default);

        let entries = document
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, raw)| build_entry(index, raw, &defaults, resolvers))
            .collect::<Result<Vec<_>>>()?;

        if entries.is_empty() {
            warn!("DNS configuration contains no entries");
        }
        info!("Loaded {} DNS sync entries", entries.len());

        Ok(Self { entries, defaults })
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[SyncEntry] {
        &self.entries
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<SyncEntry> {
        self.entries
    }
}

/// Parse a resolver server given as `ip` or `ip:port`
pub fn parse_resolver_server(server: &str) -> Option<SocketAddr> {
    let server = server.trim();

    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Some(addr);
    }

    server
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
}

fn build_entry(
    index: usize,
    raw: RawEntry,
    defaults: &Defaults,
    resolvers: &dyn ResolverFactory,
) -> Result<SyncEntry> {
    let RawEntry { name, dns, azure } = raw;

    let resource_group = or_default(azure.resource_group, &defaults.resource_group);
    let zone = or_default(azure.zone, &defaults.zone);
    let ttl = match azure.ttl {
        Some(ttl) if ttl != 0 => ttl,
        _ => defaults.ttl,
    };

    let name = name.unwrap_or_default();
    if name.is_empty() {
        return Err(Error::validation(index, field::NAME));
    }

    let record_name = azure.name.unwrap_or_default();
    if record_name.is_empty() {
        return Err(Error::validation(index, field::TARGET_NAME));
    }

    if zone.is_empty() {
        return Err(Error::validation(index, field::TARGET_ZONE));
    }

    let ttl = u32::try_from(ttl)
        .ok()
        .filter(|ttl| *ttl > 0)
        .ok_or_else(|| Error::validation(index, field::TTL))?;

    if resource_group.is_empty() {
        return Err(Error::validation(index, field::RESOURCE_GROUP));
    }

    let servers = dns
        .iter()
        .map(|server| parse_resolver_server(server))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::validation(index, field::DNS))?;

    let resolver = if servers.is_empty() {
        ResolverBinding::shared_default(resolvers.default_resolver())
    } else {
        let resolver = resolvers.create(&servers)?;
        ResolverBinding::scoped(servers, resolver)
    };

    debug!(
        "Entry #{}: {} -> {} in zone {} (RG:{}, ttl {}, default resolver: {})",
        index,
        name,
        record_name,
        zone,
        resource_group,
        ttl,
        resolver.is_default()
    );

    Ok(SyncEntry::new(
        name,
        RecordTarget {
            record_name,
            zone,
            resource_group,
        },
        ttl,
        resolver,
    ))
}

fn or_default(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}
