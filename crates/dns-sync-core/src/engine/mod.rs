//! Reconciliation engine
//!
//! The SyncEngine is responsible for:
//! - Resolving every sync entry with its bound resolver
//! - Building a fresh record set from the resolved addresses
//! - Upserting the record set through the DNS zone client
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!   Scheduler ───▶ │  SyncEngine  │ ── EngineEvent ──▶ (observer)
//!                  └──────────────┘
//!                         │ per entry, in order
//!         ┌───────────────┼─────────────────────┐
//!         ▼               ▼                     ▼
//! ┌───────────────┐ ┌─────────────┐   ┌───────────────┐
//! │ResolverBinding│ │  RecordSet  │   │ DnsZoneClient │
//! │  (lookup)     │ │  (build)    │   │  (upsert)     │
//! └───────────────┘ └─────────────┘   └───────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve the entry's hostname
//! 2. Build the record set (TTL from the entry)
//! 3. Create or update the record set in the zone
//! 4. On any failure, stop the cycle and return the error
//!
//! Every cycle starts again from the first entry. Nothing is cached or
//! diffed between cycles.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::entry::SyncEntry;
use crate::error::{Error, Result};
use crate::record::{RecordSet, RecordType};
use crate::traits::{DnsZoneClient, UpsertResult};

/// Capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A cycle started
    CycleStarted {
        entries_count: usize,
    },

    /// An entry's hostname was resolved
    EntryResolved {
        name: String,
        addresses: Vec<std::net::Ipv4Addr>,
    },

    /// A record set was written to the zone
    RecordUpserted {
        name: String,
        record_name: String,
        zone: String,
        record_set: RecordSet,
        result: UpsertResult,
    },

    /// The cycle stopped at a failing entry
    CycleFailed {
        name: String,
        error: String,
    },

    /// Every entry was processed
    CycleCompleted {
        upserted: usize,
    },
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Hostnames whose record sets were upserted, in processing order
    pub upserted: Vec<String>,
}

/// Core reconciliation engine
///
/// Owns the validated entries and a shared handle to the DNS zone client.
/// Each call to [`SyncEngine::run`] performs exactly one cycle.
///
/// ## Concurrency
///
/// Entries are processed strictly sequentially. Callers must not run two
/// cycles at once; the [`Scheduler`](crate::scheduler::Scheduler) guarantees
/// this.
pub struct SyncEngine {
    /// Entries to reconcile, in declaration order
    entries: Vec<SyncEntry>,

    /// DNS zone client shared with whoever constructed it
    zone_client: Arc<dyn DnsZoneClient>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine from a loaded configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events.
    /// Dropping the receiver is fine; events are then discarded.
    pub fn new(
        config: SyncConfig,
        zone_client: Arc<dyn DnsZoneClient>,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        Self::with_event_capacity(config, zone_client, DEFAULT_EVENT_CHANNEL_CAPACITY)
    }

    /// Create a new engine with a custom event channel capacity
    pub fn with_event_capacity(
        config: SyncConfig,
        zone_client: Arc<dyn DnsZoneClient>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let engine = Self {
            entries: config.into_entries(),
            zone_client,
            event_tx: tx,
        };

        (engine, rx)
    }

    pub fn entries(&self) -> &[SyncEntry] {
        &self.entries
    }

    pub fn zone_client(&self) -> &Arc<dyn DnsZoneClient> {
        &self.zone_client
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: every entry was resolved and upserted
    /// - `Err(Error)`: the first failure; later entries were not processed
    pub async fn run(&self) -> Result<CycleReport> {
        self.emit_event(EngineEvent::CycleStarted {
            entries_count: self.entries.len(),
        });

        let mut report = CycleReport::default();

        for entry in &self.entries {
            let target = entry.target();
            info!(
                "Processing {} ({} in zone {})",
                entry.name(),
                target.record_name,
                target.zone
            );

            if let Err(e) = self.sync_entry(entry).await {
                error!("Failed to sync {}: {}", entry.name(), e);
                self.emit_event(EngineEvent::CycleFailed {
                    name: entry.name().to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }

            report.upserted.push(entry.name().to_string());
        }

        self.emit_event(EngineEvent::CycleCompleted {
            upserted: report.upserted.len(),
        });
        debug!("Cycle completed, {} record set(s) upserted", report.upserted.len());

        Ok(report)
    }

    /// Resolve, build and upsert a single entry
    async fn sync_entry(&self, entry: &SyncEntry) -> Result<UpsertResult> {
        let addresses = entry.lookup().await?;
        self.emit_event(EngineEvent::EntryResolved {
            name: entry.name().to_string(),
            addresses: addresses.clone(),
        });

        let record_set = RecordSet::from_addresses(entry.ttl(), addresses);
        if record_set.is_empty() {
            warn!("{} resolved to no addresses, writing an empty record set", entry.name());
        }

        let target = entry.target();
        info!(
            "   updating {} record {} in zone {} (RG:{})",
            self.zone_client.provider_name(),
            target.record_name,
            target.zone,
            target.resource_group
        );

        let result = self
            .zone_client
            .create_or_update_record(
                &target.resource_group,
                &target.zone,
                &target.record_name,
                RecordType::A,
                &record_set,
            )
            .await
            .map_err(|e| match e {
                Error::Provider { .. } => e,
                other => Error::provider(self.zone_client.provider_name(), other.to_string()),
            })?;

        info!("   {:?} {} with {:?}", result, target.record_name, record_set.addresses);
        self.emit_event(EngineEvent::RecordUpserted {
            name: entry.name().to_string(),
            record_name: target.record_name.clone(),
            zone: target.zone.clone(),
            record_set,
            result,
        });

        Ok(result)
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider draining engine events faster.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
