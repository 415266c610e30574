//! Test doubles and common utilities for contract tests
//!
//! These doubles stand in for real name servers and a real cloud zone. They
//! count calls and record arguments so tests can assert on what the engine
//! did, without any network access.

#![allow(dead_code)]

use dns_sync_core::error::{Error, Result};
use dns_sync_core::record::{RecordSet, RecordType};
use dns_sync_core::traits::{DnsZoneClient, Resolver, ResolverFactory, UpsertResult};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a [`StaticResolver`] answers for a hostname
#[derive(Debug, Clone)]
pub enum Answer {
    Addresses(Vec<Ipv4Addr>),
    Fail(String),
}

/// Hostname answers shared between resolvers built by the same factory
#[derive(Debug, Clone, Default)]
pub struct Answers {
    inner: Arc<Mutex<HashMap<String, Answer>>>,
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, hostname: &str, addresses: &[[u8; 4]]) {
        let addresses = addresses.iter().map(|octets| Ipv4Addr::from(*octets)).collect();
        self.inner
            .lock()
            .unwrap()
            .insert(hostname.to_string(), Answer::Addresses(addresses));
    }

    pub fn fail(&self, hostname: &str, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .insert(hostname.to_string(), Answer::Fail(message.to_string()));
    }

    fn get(&self, hostname: &str) -> Option<Answer> {
        self.inner.lock().unwrap().get(hostname).cloned()
    }
}

/// A resolver answering from a shared table, counting every lookup
pub struct StaticResolver {
    servers: Vec<SocketAddr>,
    answers: Answers,
    /// Hostnames looked up, in call order
    lookups: Arc<Mutex<Vec<String>>>,
}

impl StaticResolver {
    pub fn new(servers: Vec<SocketAddr>, answers: Answers) -> Self {
        Self {
            servers,
            answers,
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Resolver for StaticResolver {
    async fn lookup_ipv4(&self, hostname: &str) -> Result<Vec<Ipv4Addr>> {
        self.lookups.lock().unwrap().push(hostname.to_string());

        match self.answers.get(hostname) {
            Some(Answer::Addresses(addresses)) => Ok(addresses),
            Some(Answer::Fail(message)) => Err(Error::resolution(hostname, message)),
            None => Err(Error::resolution(hostname, "no such host")),
        }
    }

    fn servers(&self) -> Vec<SocketAddr> {
        self.servers.clone()
    }
}

/// A resolver factory handing out [`StaticResolver`]s
///
/// Keeps every resolver it built so tests can inspect which one served
/// which lookup.
pub struct MockResolverFactory {
    answers: Answers,
    default: Arc<StaticResolver>,
    /// Resolvers built by `create()`, in call order
    created: Mutex<Vec<Arc<StaticResolver>>>,
    /// Call counter for default_resolver()
    default_call_count: AtomicUsize,
    /// Server lists for which `create()` fails
    failing: Mutex<HashSet<Vec<SocketAddr>>>,
}

impl MockResolverFactory {
    pub fn new(answers: Answers) -> Self {
        let default_servers = dns_sync_core::traits::DEFAULT_RESOLVER_SERVERS
            .iter()
            .map(|ip| SocketAddr::new(*ip, dns_sync_core::traits::DEFAULT_DNS_PORT))
            .collect();

        Self {
            default: Arc::new(StaticResolver::new(default_servers, answers.clone())),
            answers,
            created: Mutex::new(Vec::new()),
            default_call_count: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn default_static(&self) -> Arc<StaticResolver> {
        Arc::clone(&self.default)
    }

    pub fn created(&self) -> Vec<Arc<StaticResolver>> {
        self.created.lock().unwrap().clone()
    }

    pub fn default_call_count(&self) -> usize {
        self.default_call_count.load(Ordering::SeqCst)
    }

    pub fn fail_create_for(&self, servers: Vec<SocketAddr>) {
        self.failing.lock().unwrap().insert(servers);
    }
}

impl ResolverFactory for MockResolverFactory {
    fn create(&self, servers: &[SocketAddr]) -> Result<Arc<dyn Resolver>> {
        if self.failing.lock().unwrap().contains(servers) {
            return Err(Error::resolution("", format!("cannot build resolver for {:?}", servers)));
        }

        let resolver = Arc::new(StaticResolver::new(servers.to_vec(), self.answers.clone()));
        self.created.lock().unwrap().push(Arc::clone(&resolver));
        Ok(resolver)
    }

    fn default_resolver(&self) -> Arc<dyn Resolver> {
        self.default_call_count.fetch_add(1, Ordering::SeqCst);
        self.default.clone()
    }
}

/// One recorded create-or-update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub resource_group: String,
    pub zone: String,
    pub name: String,
    pub record_type: RecordType,
    pub record_set: RecordSet,
}

/// A zone client that records calls and can be told to fail
pub struct RecordingZoneClient {
    /// Call counter for create_or_update_record()
    upsert_call_count: Arc<AtomicUsize>,
    /// Recorded arguments, in call order
    calls: Arc<Mutex<Vec<UpsertCall>>>,
    /// Record names whose upsert fails
    failing_records: Arc<Mutex<HashSet<String>>>,
    /// Record names already written, to answer Created vs Updated
    existing: Arc<Mutex<HashSet<String>>>,
    /// Error to return for failing records; `None` returns a provider error
    failure: Arc<Mutex<Option<Error>>>,
}

impl RecordingZoneClient {
    pub fn new() -> Self {
        Self {
            upsert_call_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_records: Arc::new(Mutex::new(HashSet::new())),
            existing: Arc::new(Mutex::new(HashSet::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the number of times create_or_update_record() was called
    pub fn upsert_call_count(&self) -> usize {
        self.upsert_call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<UpsertCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Record names of all upserts, in call order
    pub fn upserted_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.name).collect()
    }

    pub fn fail_record(&self, name: &str) {
        self.failing_records.lock().unwrap().insert(name.to_string());
    }

    pub fn recover_record(&self, name: &str) {
        self.failing_records.lock().unwrap().remove(name);
    }

    /// Fail with `error` instead of the default provider error
    pub fn fail_with(&self, error: Error) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Create a new RecordingZoneClient that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            upsert_call_count: Arc::clone(&other.upsert_call_count),
            calls: Arc::clone(&other.calls),
            failing_records: Arc::clone(&other.failing_records),
            existing: Arc::clone(&other.existing),
            failure: Arc::clone(&other.failure),
        }
    }
}

#[async_trait::async_trait]
impl DnsZoneClient for RecordingZoneClient {
    async fn create_or_update_record(
        &self,
        resource_group: &str,
        zone: &str,
        name: &str,
        record_type: RecordType,
        record_set: &RecordSet,
    ) -> Result<UpsertResult> {
        self.upsert_call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(UpsertCall {
            resource_group: resource_group.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
            record_type,
            record_set: record_set.clone(),
        });

        if self.failing_records.lock().unwrap().contains(name) {
            let failure = self.failure.lock().unwrap().take();
            return Err(failure.unwrap_or_else(|| Error::provider("recording", "zone unavailable")));
        }

        let key = format!("{}/{}/{}", resource_group, zone, name);
        if self.existing.lock().unwrap().insert(key) {
            Ok(UpsertResult::Created)
        } else {
            Ok(UpsertResult::Updated)
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Write `yaml` to a temporary entry file
pub fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yml")
        .tempfile()
        .expect("temp file can be created");
    file.write_all(yaml.as_bytes()).expect("temp file is writable");
    file
}

/// Three entries `a.example`, `b.example`, `c.example` sharing a zone
pub const THREE_ENTRIES: &str = r#"
default:
  resourceGroup: dns-rg
  zone: example.com
  ttl: 300
entries:
  - name: a.example
    azure:
      name: a
  - name: b.example
    azure:
      name: b
  - name: c.example
    azure:
      name: c
"#;
