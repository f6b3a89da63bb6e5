//! Test doubles and common utilities for contract tests
//!
//! This module provides controllable implementations of the core traits
//! plus a manual clock, so the reporting cycle can be driven
//! deterministically without real sleeps or real network I/O.

use beacon_core::clock::Clock;
use beacon_core::config::{IntervalConfig, ReporterConfig};
use beacon_core::engine::{EngineEvent, ReportingEngine};
use beacon_core::traits::{DeliveryOutcome, IdentityResolver, ObservedIdentity, ReportTransport};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A clock that only moves when the test advances it
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock at a fixed, arbitrary starting instant
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            )),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, delta: std::time::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(delta).unwrap();
    }

    /// Current instant, for assertions
    pub fn current(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A resolver whose answer the test controls
#[derive(Clone)]
pub struct ControlledResolver {
    current: Arc<Mutex<Result<ObservedIdentity, String>>>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl ControlledResolver {
    /// Create a resolver that resolves to the given identity
    pub fn resolving(identity: ObservedIdentity) -> Self {
        Self {
            current: Arc::new(Mutex::new(Ok(identity))),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Change what the resolver reports from now on
    pub fn set_identity(&self, identity: ObservedIdentity) {
        *self.current.lock().unwrap() = Ok(identity);
    }

    /// Make resolution fail from now on
    pub fn fail_with(&self, error: impl Into<String>) {
        *self.current.lock().unwrap() = Err(error.into());
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityResolver for ControlledResolver {
    async fn resolve(&self) -> Result<ObservedIdentity, beacon_core::Error> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        self.current
            .lock()
            .unwrap()
            .clone()
            .map_err(beacon_core::Error::resolution)
    }
}

/// A transport that replays scripted outcomes and records deliveries
#[derive(Clone)]
pub struct ScriptedTransport {
    /// Outcomes consumed front-to-back; when empty, `fallback` is used
    scripted: Arc<Mutex<VecDeque<DeliveryOutcome>>>,
    fallback: Arc<Mutex<DeliveryOutcome>>,
    attempts: Arc<Mutex<Vec<ObservedIdentity>>>,
}

impl ScriptedTransport {
    /// A transport where every attempt is delivered
    pub fn delivering() -> Self {
        Self::with_fallback(DeliveryOutcome::Delivered)
    }

    /// A transport where every attempt finds the collector unreachable
    pub fn unreachable() -> Self {
        Self::with_fallback(DeliveryOutcome::Unreachable(
            "connection refused".to_string(),
        ))
    }

    /// A transport where every attempt is rejected by the collector
    pub fn rejecting() -> Self {
        Self::with_fallback(DeliveryOutcome::Rejected("500 internal error".to_string()))
    }

    fn with_fallback(fallback: DeliveryOutcome) -> Self {
        Self {
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(fallback)),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue an outcome for the next attempt (before the fallback applies)
    pub fn push_outcome(&self, outcome: DeliveryOutcome) {
        self.scripted.lock().unwrap().push_back(outcome);
    }

    /// Change the fallback outcome from now on
    pub fn set_fallback(&self, outcome: DeliveryOutcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    /// Number of delivery attempts made so far
    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// The identities of every attempt, in order
    pub fn attempts(&self) -> Vec<ObservedIdentity> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ReportTransport for ScriptedTransport {
    async fn deliver(&self, identity: &ObservedIdentity) -> DeliveryOutcome {
        self.attempts.lock().unwrap().push(identity.clone());
        self.scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

/// Shorthand for building an identity in tests
pub fn identity(hostname: &str, ip: &str) -> ObservedIdentity {
    let ip: IpAddr = ip.parse().expect("valid test IP");
    ObservedIdentity::new(hostname, ip)
}

/// Reporter configuration with the documented default intervals
pub fn test_config() -> ReporterConfig {
    ReporterConfig::new("collector.lan", 5000)
}

/// Reporter configuration with explicit intervals (seconds)
pub fn test_config_with_intervals(report: u64, retry: u64, max_retry: u64) -> ReporterConfig {
    let mut config = test_config();
    config.intervals = IntervalConfig {
        report_interval_secs: report,
        retry_interval_secs: retry,
        max_retry_duration_secs: max_retry,
    };
    config
}

/// Build an engine from doubles, returning the event receiver too
pub fn build_engine(
    resolver: &ControlledResolver,
    transport: &ScriptedTransport,
    clock: &ManualClock,
    config: ReporterConfig,
) -> (ReportingEngine, mpsc::Receiver<EngineEvent>) {
    ReportingEngine::new(
        Box::new(resolver.clone()),
        Box::new(transport.clone()),
        Box::new(clock.clone()),
        config,
    )
    .expect("engine construction succeeds")
}

/// Drain every event currently buffered in the receiver
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
