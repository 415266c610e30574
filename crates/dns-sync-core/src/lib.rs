// # dns-sync-core
//
// Core library for keeping cloud DNS A records in step with what a set of
// hostnames currently resolves to.
//
// ## Architecture Overview
//
// - **Resolver**: Trait for forward IPv4 lookups, bound per entry
// - **DnsZoneClient**: Trait for create-or-update of record sets in a zone
// - **SyncConfig**: Loads, defaults and validates the entry file
// - **SyncEngine**: Runs one fail-fast reconciliation cycle over all entries
// - **Scheduler**: Drives the engine on an `@every <duration>` trigger
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Resolution and zone writes sit behind traits
// 2. **Stateless Cycles**: Every cycle re-resolves and rewrites every entry
// 3. **Library-First**: The daemon is a thin wrapper around this crate

pub mod traits;
pub mod record;
pub mod entry;
pub mod config;
pub mod engine;
pub mod scheduler;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsZoneClient, Resolver, ResolverFactory, UpsertResult};
pub use record::{RecordSet, RecordType};
pub use entry::{RecordTarget, ResolverBinding, SyncEntry};
pub use config::{Defaults, SyncConfig};
pub use engine::{CycleReport, EngineEvent, SyncEngine};
pub use scheduler::{FailurePolicy, Schedule, Scheduler, SchedulerConfig, SchedulerSummary};
pub use error::{Error, Result};
