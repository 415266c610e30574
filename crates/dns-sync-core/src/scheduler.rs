//! Periodic driver for the reconciliation engine
//!
//! Triggers are written as `@every <duration>`, for example `@every 10m` or
//! `@every 1h30m`. The first cycle runs one interval after start unless
//! `run_on_start` is set. Cycles never overlap: a tick is only awaited once
//! the previous cycle has finished, and ticks missed while a cycle was
//! running are skipped. Ticks stay on the grid set by the first one, so a
//! 25 second cycle on `@every 10s` started at 10s runs again at 40s.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::engine::SyncEngine;
use crate::error::{Error, Result};

const EVERY_PREFIX: &str = "@every";

/// A fixed-interval trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every: Duration,
}

impl Schedule {
    /// Build a schedule from a period; zero periods are rejected
    pub fn every(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::config("schedule interval must be greater than zero"));
        }
        Ok(Self { every: period })
    }

    /// Parse an `@every <duration>` trigger
    pub fn parse(trigger: &str) -> Result<Self> {
        let trigger = trigger.trim();
        let rest = trigger
            .strip_prefix(EVERY_PREFIX)
            .ok_or_else(|| Error::config(format!("unsupported schedule '{}', expected '@every <duration>'", trigger)))?;

        // "@everyday" must not parse as "@every" + "day"
        if !rest.starts_with(char::is_whitespace) {
            return Err(Error::config(format!(
                "unsupported schedule '{}', expected '@every <duration>'",
                trigger
            )));
        }

        let period = parse_duration(rest.trim())
            .ok_or_else(|| Error::config(format!("invalid duration in schedule '{}'", trigger)))?;

        Self::every(period)
    }

    pub fn period(&self) -> Duration {
        self.every
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", EVERY_PREFIX, self.every)
    }
}

/// Parse one or more `<integer><unit>` groups, units `h`, `m`, `s`, `ms`
fn parse_duration(input: &str) -> Option<Duration> {
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => Duration::from_secs(value.checked_mul(3600)?),
            "m" => Duration::from_secs(value.checked_mul(60)?),
            "s" => Duration::from_secs(value),
            "ms" => Duration::from_millis(value),
            _ => return None,
        };
        rest = &rest[unit_len..];

        total = total.checked_add(part)?;
    }

    Some(total)
}

/// First grid tick after `last` that is not already behind `now`
///
/// A tick falling exactly on `now` is still due.
fn next_tick(last: Instant, period: Duration, now: Instant) -> Instant {
    let behind = now.saturating_duration_since(last);
    let period_nanos = period.as_nanos();
    let periods = behind.as_nanos().div_ceil(period_nanos).max(1);

    let offset = u64::try_from(period_nanos.saturating_mul(periods)).unwrap_or(u64::MAX);
    last + Duration::from_nanos(offset)
}

/// What the scheduler does when a cycle fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and return the cycle error
    #[default]
    Exit,

    /// Log the error and wait for the next tick
    Continue,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub schedule: Schedule,
    pub on_failure: FailurePolicy,

    /// Run a cycle immediately instead of after the first interval
    pub run_on_start: bool,
}

impl SchedulerConfig {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            on_failure: FailurePolicy::default(),
            run_on_start: false,
        }
    }
}

/// Counters for a finished scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub cycles_succeeded: usize,
    pub cycles_failed: usize,
}

/// Drives [`SyncEngine::run`] on a [`Schedule`]
pub struct Scheduler {
    engine: SyncEngine,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Tick until `shutdown` fires (or its sender is dropped)
    ///
    /// # Returns
    ///
    /// - `Ok(SchedulerSummary)`: shutdown was requested
    /// - `Err(Error)`: a cycle failed under [`FailurePolicy::Exit`]
    pub async fn run_until(&self, mut shutdown: oneshot::Receiver<()>) -> Result<SchedulerSummary> {
        let period = self.config.schedule.period();
        let start = if self.config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };

        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        info!(
            "Scheduler started ({}, run on start: {}, on failure: {:?})",
            self.config.schedule, self.config.run_on_start, self.config.on_failure
        );

        let mut summary = SchedulerSummary::default();

        loop {
            tokio::select! {
                // Shutdown wins over a tick that is ready at the same time
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received, scheduler stopped");
                    return Ok(summary);
                }

                Some(tick) = ticks.next() => {
                    debug!("Scheduler tick");
                    let outcome = self.engine.run().await;

                    let next = next_tick(tick, period, Instant::now());
                    if next > tick + period {
                        debug!("Cycle overran its interval, skipping missed ticks");
                    }
                    let interval: &mut Interval = ticks.as_mut();
                    interval.reset_at(next);

                    match outcome {
                        Ok(report) => {
                            summary.cycles_succeeded += 1;
                            info!("Cycle finished, {} record set(s) updated", report.upserted.len());
                        }
                        Err(e) => {
                            summary.cycles_failed += 1;
                            match self.config.on_failure {
                                FailurePolicy::Exit => {
                                    error!("Cycle failed, stopping scheduler: {}", e);
                                    return Err(e);
                                }
                                FailurePolicy::Continue => {
                                    warn!("Cycle failed, retrying on next tick: {}", e);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
