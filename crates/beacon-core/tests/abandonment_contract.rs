//! Contract Test: Abandonment After the Maximum Retry Duration
//!
//! A continuously failing identity is retried at the retry interval until
//! the first attempt whose elapsed window exceeds the maximum retry
//! duration; then both tracked fields are cleared and the engine waits a
//! full report interval before resolving fresh data.
//!
//! Constraints verified:
//! - Retries happen at exactly the retry interval inside the window
//! - An attempt landing exactly at the boundary still retries (the
//!   comparison is strictly greater-than)
//! - Abandonment clears both `last_reported` and `failure_window_start`
//! - After abandonment the same unchanged identity is re-adopted with a
//!   fresh window
//!
//! If this test fails, the engine either retries a stale data point
//! forever or gives up early.

mod common;

use beacon_core::engine::{EngineEvent, ReportingState};
use common::*;
use std::time::Duration;

#[tokio::test]
async fn boundary_attempt_still_retries_then_abandons() {
    // report 40s / retry 10s / max 30s: failing attempts land at elapsed
    // 0, 10, 20, 30 (boundary, still retried) and 40 (abandoned).
    let resolver = ControlledResolver::resolving(identity("db-3", "10.1.0.7"));
    let transport = ScriptedTransport::unreachable();
    let clock = ManualClock::new();
    let (engine, _rx) = build_engine(
        &resolver,
        &transport,
        &clock,
        test_config_with_intervals(40, 10, 30),
    );

    let mut state = ReportingState::new();

    for expected_elapsed in [0u64, 10, 20, 30] {
        let pause = engine.run_cycle(&mut state).await;
        assert_eq!(
            pause,
            Duration::from_secs(10),
            "attempt at elapsed {}s should still retry",
            expected_elapsed
        );
        assert!(state.failure_window_start.is_some());
        clock.advance(pause);
    }

    // elapsed 40s > 30s: abandon
    let pause = engine.run_cycle(&mut state).await;
    assert_eq!(pause, Duration::from_secs(40));
    assert_eq!(state.last_reported, None);
    assert_eq!(state.failure_window_start, None);
    assert_eq!(transport.attempt_count(), 5);
}

#[tokio::test]
async fn abandoned_identity_is_readopted_with_fresh_window() {
    let resolver = ControlledResolver::resolving(identity("db-3", "10.1.0.7"));
    let transport = ScriptedTransport::unreachable();
    let clock = ManualClock::new();
    let (engine, mut rx) = build_engine(
        &resolver,
        &transport,
        &clock,
        test_config_with_intervals(40, 10, 30),
    );

    let mut state = ReportingState::new();

    // Drive to abandonment
    loop {
        let pause = engine.run_cycle(&mut state).await;
        clock.advance(pause);
        if state.last_reported.is_none() {
            break;
        }
    }

    let events = drain_events(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::IdentityAbandoned { .. })),
        "expected an IdentityAbandoned event, got {:?}",
        events
    );

    // Next cycle: the environment still reports the same identity.
    // Comparison against the cleared state re-adopts it and the failure
    // window restarts from this attempt.
    let readoption_time = clock.current();
    let pause = engine.run_cycle(&mut state).await;

    assert_eq!(pause, Duration::from_secs(10));
    assert_eq!(state.last_reported, Some(identity("db-3", "10.1.0.7")));
    assert_eq!(state.failure_window_start, Some(readoption_time));
}

#[tokio::test]
async fn full_day_outage_retries_every_five_minutes_then_abandons() {
    // The documented default configuration: 1800s / 300s / 86400s.
    // Failing attempts land at elapsed 0, 300, ..., 86400 (all retried)
    // and 86700 (abandoned): 290 attempts, then an 1800s pause before
    // fresh resolution.
    let resolver = ControlledResolver::resolving(identity("web-1", "10.0.0.4"));
    let transport = ScriptedTransport::unreachable();
    let clock = ManualClock::new();
    let (engine, _rx) = build_engine(
        &resolver,
        &transport,
        &clock,
        test_config_with_intervals(1800, 300, 86400),
    );

    let mut state = ReportingState::new();

    let mut retry_pauses = 0usize;
    let final_pause = loop {
        let pause = engine.run_cycle(&mut state).await;
        clock.advance(pause);
        if state.last_reported.is_none() {
            break pause;
        }
        assert_eq!(pause, Duration::from_secs(300));
        retry_pauses += 1;
    };

    assert_eq!(retry_pauses, 289);
    assert_eq!(transport.attempt_count(), 290);
    assert_eq!(final_pause, Duration::from_secs(1800));
    assert_eq!(state.failure_window_start, None);

    // Every attempt carried the same identity: the engine never
    // re-resolved into a different data point mid-window.
    assert!(
        transport
            .attempts()
            .iter()
            .all(|id| *id == identity("web-1", "10.0.0.4"))
    );
}
