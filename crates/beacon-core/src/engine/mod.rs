//! Core reporting engine
//!
//! The ReportingEngine is responsible for:
//! - Resolving the local identity via IdentityResolver
//! - Detecting changes against the last adopted identity
//! - Delivering reports via ReportTransport
//! - Tracking the failure window and abandoning stale data points
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ IdentityResolver │─── ObservedIdentity ──┐
//! └──────────────────┘                       │
//!                                            ▼
//!                                  ┌─────────────────┐
//!                                  │ ReportingEngine │── ReportingState
//!                                  └─────────────────┘
//!                                            │
//!                        ┌───────────────────┼───────────────────┐
//!                        │                   │                   │
//!                        ▼                   ▼                   ▼
//!               ┌─────────────────┐  ┌──────────────┐   ┌─────────────┐
//!               │ ReportTransport │  │    Clock     │   │   Events    │
//!               │ (deliver)       │  │ (window math)│   │  (notify)   │
//!               └─────────────────┘  └──────────────┘   └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve identity; a resolution failure sleeps the retry interval
//!    without touching state
//! 2. If the identity differs from the last adopted one, reset the
//!    failure window and adopt it
//! 3. Deliver the report
//! 4. On success, clear the failure window and sleep the report interval
//! 5. On failure, open/extend the failure window; past the maximum retry
//!    duration, abandon the identity and sleep the report interval,
//!    otherwise sleep the retry interval and try again

use crate::clock::Clock;
use crate::config::ReporterConfig;
use crate::error::Result;
use crate::traits::{DeliveryOutcome, IdentityResolver, ObservedIdentity, ReportTransport};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Mutable state threaded through reporting cycles
///
/// A single instance is owned by [`ReportingEngine::run`] and passed by
/// exclusive borrow into each cycle; nothing else mutates it. It is
/// rebuilt from scratch (both fields unset) on process restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportingState {
    /// The identity last known to be in flight or successfully delivered
    pub last_reported: Option<ObservedIdentity>,

    /// When the first of the current run of consecutive send failures
    /// happened. `Some` only while failures have been accumulating for
    /// the same `last_reported` value; cleared on success, on identity
    /// change, and on abandonment.
    pub failure_window_start: Option<DateTime<Utc>>,
}

impl ReportingState {
    /// Create a fresh state (nothing reported, no failure window)
    pub fn new() -> Self {
        Self::default()
    }
}

/// Events emitted by the ReportingEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started,

    /// Local identity could not be resolved this cycle
    ResolutionFailed {
        error: String,
    },

    /// A new identity was adopted (data changed, or nothing was tracked)
    IdentityAdopted {
        identity: ObservedIdentity,
        previous: Option<ObservedIdentity>,
    },

    /// The collector accepted a report
    ReportDelivered {
        identity: ObservedIdentity,
    },

    /// A delivery attempt failed; the failure window stays open
    ReportFailed {
        identity: ObservedIdentity,
        reason: String,
        window_elapsed_secs: i64,
    },

    /// The identity was abandoned after exceeding the maximum retry
    /// duration; fresh resolution follows after the report interval
    IdentityAbandoned {
        identity: ObservedIdentity,
        window_elapsed_secs: i64,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core reporting engine
///
/// Drives the perpetual resolve → compare → send → wait cycle described
/// in the module docs. The engine never treats a failure as fatal: both
/// resolution and delivery failures adjust state and pick a pause, and
/// the loop continues until the process is terminated.
///
/// ## Lifecycle
///
/// 1. Create with [`ReportingEngine::new()`]
/// 2. Start with [`ReportingEngine::run()`], which does not return
///    under normal operation
///
/// ## Threading
///
/// The engine runs all cycles on a single async task; there is never a
/// concurrent invocation of the cycle, so `ReportingState` needs no
/// locking.
pub struct ReportingEngine {
    /// Local identity discovery
    resolver: Box<dyn IdentityResolver>,

    /// Report delivery
    transport: Box<dyn ReportTransport>,

    /// Wall-clock source for failure-window arithmetic
    clock: Box<dyn Clock>,

    /// Steady-state delay after a successful send (seconds); also the
    /// delay after abandoning an identity
    report_interval_secs: u64,

    /// Delay between failed attempts inside the failure window (seconds)
    retry_interval_secs: u64,

    /// Wall-clock span after which a continuously failing identity is
    /// abandoned (seconds)
    max_retry_duration_secs: u64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReportingEngine {
    /// Create a new reporting engine
    ///
    /// Interval values of zero are replaced with the documented defaults
    /// (with a warning); an invalid collector endpoint is a hard error.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        resolver: Box<dyn IdentityResolver>,
        transport: Box<dyn ReportTransport>,
        clock: Box<dyn Clock>,
        config: ReporterConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        let intervals = config.intervals.sanitized();

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            resolver,
            transport,
            clock,
            report_interval_secs: intervals.report_interval_secs,
            retry_interval_secs: intervals.retry_interval_secs,
            max_retry_duration_secs: intervals.max_retry_duration_secs,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// Loops forever, suspending only at the pause each cycle computes.
    /// Returns only after an external shutdown signal (SIGINT).
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine with a controlled shutdown signal (for testing)
    ///
    /// Production code should use [`ReportingEngine::run`], which hooks
    /// OS signals instead of a programmatic channel.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started);

        let mut state = ReportingState::new();

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                let pause = self.run_cycle(&mut state).await;
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                let pause = self.run_cycle(&mut state).await;
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Execute one reporting cycle and return the pause before the next
    ///
    /// This is the whole state machine; `run` merely loops it with real
    /// sleeps. Exposed so tests can drive cycles against a manual clock
    /// without sleeping.
    pub async fn run_cycle(&self, state: &mut ReportingState) -> Duration {
        // 1. Resolve. Resolution trouble is local-environment trouble,
        //    independent of the send-retry window: state stays untouched.
        let identity = match self.resolver.resolve().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(
                    "could not resolve local identity: {}; retrying in {}s",
                    e, self.retry_interval_secs
                );
                self.emit_event(EngineEvent::ResolutionFailed {
                    error: e.to_string(),
                });
                return Duration::from_secs(self.retry_interval_secs);
            }
        };

        // 2. Adopt on change. The new identity becomes "current" before
        //    delivery is confirmed, and any open failure window belonged
        //    to the old data point.
        if state.last_reported.as_ref() != Some(&identity) {
            info!("identity changed, now tracking {}", identity);
            self.emit_event(EngineEvent::IdentityAdopted {
                identity: identity.clone(),
                previous: state.last_reported.take(),
            });
            state.failure_window_start = None;
            state.last_reported = Some(identity.clone());
        }

        // 3. Deliver.
        match self.transport.deliver(&identity).await {
            DeliveryOutcome::Delivered => {
                info!(
                    "reported {}; next report in {}s",
                    identity, self.report_interval_secs
                );
                state.failure_window_start = None;
                self.emit_event(EngineEvent::ReportDelivered { identity });
                Duration::from_secs(self.report_interval_secs)
            }
            DeliveryOutcome::Rejected(reason) => {
                warn!("collector rejected report for {}: {}", identity, reason);
                self.after_failed_send(state, identity, reason)
            }
            DeliveryOutcome::Unreachable(reason) => {
                warn!("collector unreachable while reporting {}: {}", identity, reason);
                self.after_failed_send(state, identity, reason)
            }
        }
    }

    /// Failure-window bookkeeping after a failed delivery
    fn after_failed_send(
        &self,
        state: &mut ReportingState,
        identity: ObservedIdentity,
        reason: String,
    ) -> Duration {
        let now = self.clock.now();
        let window_start = *state.failure_window_start.get_or_insert(now);
        let elapsed = now.signed_duration_since(window_start);

        if elapsed > chrono::Duration::seconds(self.max_retry_duration_secs as i64) {
            warn!(
                "giving up on {} after {}s of failed deliveries; re-resolving in {}s",
                identity,
                elapsed.num_seconds(),
                self.report_interval_secs
            );
            self.emit_event(EngineEvent::IdentityAbandoned {
                identity,
                window_elapsed_secs: elapsed.num_seconds(),
            });
            state.failure_window_start = None;
            state.last_reported = None;
            Duration::from_secs(self.report_interval_secs)
        } else {
            self.emit_event(EngineEvent::ReportFailed {
                identity,
                reason,
                window_elapsed_secs: elapsed.num_seconds(),
            });
            Duration::from_secs(self.retry_interval_secs)
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "event channel full, dropping event; consider increasing event_channel_capacity"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_tracks_nothing() {
        let state = ReportingState::new();
        assert_eq!(state.last_reported, None);
        assert_eq!(state.failure_window_start, None);
    }

    #[test]
    fn engine_events_are_comparable() {
        let event = EngineEvent::ResolutionFailed {
            error: "no network".to_string(),
        };
        assert_eq!(event.clone(), event);
    }
}
